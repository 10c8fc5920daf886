//! Tree traversal and Markdown rendering.
//!
//! A pre-pass marks which subtrees can contribute output, then a recursive
//! visitor walks the tree, resolving a translator rule per element and
//! appending to a single output buffer. Inherited metadata (list nesting,
//! escape suppression, active rule table) is cloned per element so changes
//! never leak back into an ancestor's view; the list item ordinal is a
//! shared counter so siblings observe increments.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use regex::Regex;

use crate::dom::{Dom, NodeData, NodeId};
use crate::escape;
use crate::options::Options;
use crate::rules::defaults::CONTENTLESS_ELEMENTS;
use crate::rules::rule::{PostProcess, PostprocessContext, TranslatorContext};
use crate::rules::TranslatorCollection;
use crate::utilities::{collapse_whitespace, trim_newlines, trim_text};
use crate::{DownmarkError, Result};

/// Kind of the nearest enclosing list container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

/// Context inherited down the tree and extended per element.
///
/// Cloned on descent; only the item ordinal is shared (a counter created per
/// list container), so list item siblings see each other's increments while
/// everything else stays copy-on-write.
#[derive(Debug, Clone, Default)]
pub struct NodeMetadata {
    /// Nesting depth of the current list, starting at 0
    pub indent_level: Option<usize>,
    pub list_kind: Option<ListKind>,
    /// Suppress escaping for descendant text
    pub no_escape: bool,
    /// Keep whitespace in descendant text verbatim
    pub preserve_whitespace: bool,
    pub(crate) list_ordinal: Option<Rc<Cell<usize>>>,
    pub(crate) translators: Option<Arc<TranslatorCollection>>,
    pub(crate) table: Option<NodeId>,
}

impl NodeMetadata {
    /// Current 1-based ordinal within an ordered list
    pub fn ordinal(&self) -> Option<usize> {
        self.list_ordinal.as_ref().map(|cell| cell.get())
    }
}

/// Per-translation side storage shared between rules
#[derive(Debug, Default)]
pub struct Scratch {
    pub(crate) url_definitions: Vec<String>,
    pub(crate) table_captions: HashMap<usize, String>,
}

impl Scratch {
    /// 1-based reference label for a url, assigned on first use
    pub(crate) fn reference_for(&mut self, url: &str) -> usize {
        match self.url_definitions.iter().position(|u| u == url) {
            Some(index) => index + 1,
            None => {
                self.url_definitions.push(url.to_string());
                self.url_definitions.len()
            }
        }
    }
}

/// Append-only output accumulator with trailing-whitespace bookkeeping
#[derive(Debug, Default)]
struct OutputBuffer {
    text: String,
    trailing_whitespace: usize,
    trailing_newlines: usize,
}

impl OutputBuffer {
    fn recompute_trailing(&mut self) {
        self.trailing_whitespace = 0;
        self.trailing_newlines = 0;
        for c in self.text.chars().rev() {
            if !c.is_whitespace() {
                break;
            }
            self.trailing_whitespace += 1;
            if c == '\n' || c == '\r' {
                self.trailing_newlines += 1;
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn trailing_whitespace(&self) -> usize {
        self.trailing_whitespace
    }

    fn checkpoint(&self) -> usize {
        self.text.len()
    }

    fn slice_from(&self, pos: usize) -> &str {
        &self.text[pos..]
    }

    fn append(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.text.push_str(s);
        self.recompute_trailing();
    }

    /// Append with an optional guard space when the new content starts with
    /// the character already at the end of the buffer
    fn append_guarded(&mut self, s: &str, space_if_repeating: bool) {
        if s.is_empty() {
            return;
        }
        if space_if_repeating && self.text.chars().next_back() == s.chars().next() {
            self.text.push(' ');
        }
        self.text.push_str(s);
        self.recompute_trailing();
    }

    /// Top existing trailing newlines up to `count`, never duplicating
    fn append_newlines(&mut self, count: usize) {
        let needed = count.saturating_sub(self.trailing_newlines);
        if needed > 0 {
            for _ in 0..needed {
                self.text.push('\n');
            }
            self.recompute_trailing();
        }
    }

    fn rollback(&mut self, pos: usize) {
        self.text.truncate(pos);
        self.recompute_trailing();
    }

    /// Truncate to `pos`, then append the replacement
    fn splice(&mut self, pos: usize, s: &str, space_if_repeating: bool) {
        self.text.truncate(pos);
        self.append_guarded(s, space_if_repeating);
        if s.is_empty() {
            self.recompute_trailing();
        }
    }

    fn into_string(self) -> String {
        self.text
    }
}

/// Render a document tree to Markdown
pub(crate) fn render(
    dom: &Dom,
    options: &Options,
    translators: &TranslatorCollection,
) -> Result<String> {
    let mut visitor = Visitor {
        dom,
        options,
        translators,
        buffer: OutputBuffer::default(),
        preserve: vec![false; dom.len()],
        scratch: RefCell::new(Scratch::default()),
    };

    visitor.optimize(dom.root(), 0)?;
    visitor.visit(dom.root(), false, &NodeMetadata::default(), 0)?;
    visitor.finish()
}

/// A list item that produces no output must not consume a number
fn release_ordinal(tag: &str, metadata: &NodeMetadata) {
    if tag == "LI" {
        if let Some(cell) = &metadata.list_ordinal {
            let n = cell.get();
            if n > 0 {
                cell.set(n - 1);
            }
        }
    }
}

struct Visitor<'a> {
    dom: &'a Dom,
    options: &'a Options,
    translators: &'a TranslatorCollection,
    buffer: OutputBuffer,
    preserve: Vec<bool>,
    scratch: RefCell<Scratch>,
}

impl<'a> Visitor<'a> {
    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.options.max_depth {
            return Err(DownmarkError::DepthLimitExceeded(self.options.max_depth));
        }
        Ok(())
    }

    /// Flag nodes whose subtree can produce output. Text nodes and
    /// contentless-but-visible elements always count; childless elements
    /// count only when their rule is a factory or asks to fire when empty.
    fn optimize(&mut self, node: NodeId, depth: usize) -> Result<bool> {
        self.check_depth(depth)?;

        let preserved = match self.dom.data(node) {
            NodeData::Text { .. } => true,
            NodeData::Comment => false,
            NodeData::Element { tag, .. } if CONTENTLESS_ELEMENTS.contains(&tag.as_str()) => true,
            _ => {
                let children = self.dom.children(node);
                if children.is_empty() {
                    self.dom
                        .tag(node)
                        .and_then(|tag| self.translators.get(tag))
                        .is_some_and(|translator| translator.preserves_when_empty())
                } else {
                    let mut any = false;
                    for &child in children {
                        if self.optimize(child, depth + 1)? {
                            any = true;
                        }
                    }
                    any
                }
            }
        };

        self.preserve[node.index()] = preserved;
        Ok(preserved)
    }

    /// Collapse, escape and replace raw text per the inherited metadata
    fn process_text(&self, text: &str, metadata: &NodeMetadata) -> String {
        let trimmed = trim_text(text);
        let result = if metadata.preserve_whitespace {
            trimmed
        } else {
            collapse_whitespace(&trimmed)
        };
        if metadata.no_escape {
            result
        } else {
            escape::escape_text(&result, self.options)
        }
    }

    fn visit(
        &mut self,
        node: NodeId,
        text_only: bool,
        metadata: &NodeMetadata,
        depth: usize,
    ) -> Result<()> {
        self.check_depth(depth)?;

        if !self.preserve[node.index()] {
            return Ok(());
        }

        let tag = match self.dom.data(node) {
            NodeData::Text { text, whitespace } => {
                if *whitespace && !metadata.preserve_whitespace {
                    // Inter-tag whitespace: at most one space, and only
                    // after non-whitespace content
                    if !self.buffer.is_empty() && self.buffer.trailing_whitespace() == 0 {
                        self.buffer.append(" ");
                    }
                } else {
                    let processed = self.process_text(text, metadata);
                    self.buffer.append(&processed);
                }
                return Ok(());
            }
            NodeData::Comment => return Ok(()),
            NodeData::Document => {
                for &child in self.dom.children(node) {
                    self.visit(child, text_only, metadata, depth + 1)?;
                }
                return Ok(());
            }
            NodeData::Element { tag, .. } => tag.as_str(),
        };

        if text_only {
            return Ok(());
        }

        /* Update metadata with list / table detail */
        let mut md = metadata.clone();
        match tag {
            "UL" | "OL" => {
                md.list_ordinal = Some(Rc::new(Cell::new(0)));
                md.list_kind = Some(if tag == "OL" {
                    ListKind::Ordered
                } else {
                    ListKind::Unordered
                });
                md.indent_level = Some(metadata.indent_level.map_or(0, |level| level + 1));
            }
            "LI" => {
                if md.list_kind == Some(ListKind::Ordered) {
                    if let Some(cell) = &md.list_ordinal {
                        cell.set(cell.get() + 1);
                    }
                }
            }
            "PRE" => md.preserve_whitespace = true,
            "TABLE" => md.table = Some(node),
            _ => {}
        }

        /* Resolve the rule from the active table */
        let active = md.translators.clone();
        let table = active.as_deref().unwrap_or(self.translators);
        let translator = match table.get(tag) {
            Some(translator) => translator.clone(),
            None => {
                // Pass-through container
                for &child in self.dom.children(node) {
                    self.visit(child, text_only, &md, depth + 1)?;
                }
                return Ok(());
            }
        };

        let config = {
            let ctx = TranslatorContext {
                dom: self.dom,
                node,
                options: self.options,
                metadata: &md,
                scratch: &self.scratch,
            };
            translator.resolve(&ctx)
        };

        // Skip and don't check children if ignore flag set
        if config.ignore() {
            release_ordinal(tag, &md);
            return Ok(());
        }

        /* Extend metadata for this subtree where the rule asks for it */
        if config.no_escape() {
            md.no_escape = true;
        }
        if config.preserve_whitespace() {
            md.preserve_whitespace = true;
        }
        if let Some(child_translators) = &config.child_translators {
            md.translators = Some(child_translators.clone());
        }

        let start_outer = self.buffer.checkpoint();
        let newlines = config.surrounding_newlines();

        /* Write opening */
        if newlines > 0 {
            self.buffer.append_newlines(newlines);
        }
        if let Some(prefix) = &config.prefix {
            self.buffer.append(prefix);
        }

        /* Write inner content */
        if let Some(content) = &config.content {
            self.buffer
                .append_guarded(content, config.space_if_repeating_char());
        } else {
            let start_inner = self.buffer.checkpoint();
            for &child in self.dom.children(node) {
                self.visit(child, !config.recurse(), &md, depth + 1)?;
            }

            if let Some(postprocess) = &config.postprocess {
                let content = self.buffer.slice_from(start_inner).to_string();
                let mut ctx = PostprocessContext {
                    dom: self.dom,
                    node,
                    options: self.options,
                    metadata: &md,
                    content,
                    scratch: &self.scratch,
                };
                match postprocess(&mut ctx) {
                    PostProcess::RemoveNode => {
                        release_ordinal(tag, &md);
                        self.buffer.rollback(start_outer);
                        return Ok(());
                    }
                    PostProcess::Replace(replacement) => {
                        self.buffer
                            .splice(start_inner, &replacement, config.space_if_repeating_char());
                    }
                }
            }
        }

        /* Write closing */
        if let Some(postfix) = &config.postfix {
            self.buffer.append(postfix);
        }
        if newlines > 0 {
            self.buffer.append_newlines(newlines);
        }

        Ok(())
    }

    /// Final post-processing: link reference definitions, newline
    /// collapsing, edge trimming
    fn finish(self) -> Result<String> {
        let mut result = self.buffer.into_string();
        let scratch = self.scratch.into_inner();

        if self.options.use_link_reference_definitions && !scratch.url_definitions.is_empty() {
            if !result.is_empty() && !result.ends_with(['\n', '\r']) {
                result.push('\n');
            }
            for (index, url) in scratch.url_definitions.iter().enumerate() {
                result.push_str("\n[");
                result.push_str(&(index + 1).to_string());
                result.push_str("]: ");
                result.push_str(url);
            }
        }

        let max = self.options.max_consecutive_newlines;
        if max > 0 {
            let pattern = format!(r"(?:\r?\n\s*)+((?:\r?\n\s*){{{max}}})");
            let collapse = Regex::new(&pattern)?;
            result = collapse.replace_all(&result, "${1}").into_owned();
        }

        Ok(trim_newlines(&result).to_string())
    }
}

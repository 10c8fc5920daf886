//! Translator rule types.
//!
//! A [`Translator`] describes how one tag renders: either a fixed
//! [`TranslatorConfig`] or a factory closure computing one from per-node
//! context at render time. Factories can carry a base rule that their
//! result is shallow-merged over.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::dom::{Dom, NodeId};
use crate::options::Options;
use crate::rules::TranslatorCollection;
use crate::visitor::{NodeMetadata, Scratch};

/// Factory computing a config from per-node context
pub type FactoryFn = dyn Fn(&TranslatorContext) -> TranslatorConfig + Send + Sync;

/// Hook receiving a node's rendered inner content
pub type PostprocessFn = dyn Fn(&mut PostprocessContext) -> PostProcess + Send + Sync;

/// Outcome of a postprocess hook
pub enum PostProcess {
    /// Splice this string in place of the rendered inner content
    Replace(String),
    /// Discard the node's entire contribution, including prefix and
    /// surrounding newlines
    RemoveNode,
}

/// How a single tag renders. Every field is optional so configs can be
/// shallow-merged; accessor methods supply the defaults.
#[derive(Clone, Default)]
pub struct TranslatorConfig {
    /// Fixed output, short-circuits child rendering
    pub content: Option<String>,
    pub prefix: Option<String>,
    pub postfix: Option<String>,
    /// When false, children render as flattened literal text
    pub recurse: Option<bool>,
    /// Minimum newlines to guarantee on each side; `Some(0)` disables
    /// padding inherited from a base
    pub surrounding_newlines: Option<usize>,
    /// Skip the node and all descendants
    pub ignore: Option<bool>,
    /// Emit descendant text verbatim, without escaping
    pub no_escape: Option<bool>,
    /// Do not collapse whitespace in descendant text
    pub preserve_whitespace: Option<bool>,
    /// Render even when the element has no children
    pub preserve_if_empty: Option<bool>,
    /// Guard space when appended content would start with the character
    /// already at the end of the buffer
    pub space_if_repeating_char: Option<bool>,
    pub postprocess: Option<Arc<PostprocessFn>>,
    /// Rule table override for the remainder of this subtree
    pub child_translators: Option<Arc<TranslatorCollection>>,
}

impl TranslatorConfig {
    pub fn recurse(&self) -> bool {
        self.recurse.unwrap_or(true)
    }

    pub fn surrounding_newlines(&self) -> usize {
        self.surrounding_newlines.unwrap_or(0)
    }

    pub fn ignore(&self) -> bool {
        self.ignore.unwrap_or(false)
    }

    pub fn no_escape(&self) -> bool {
        self.no_escape.unwrap_or(false)
    }

    pub fn preserve_whitespace(&self) -> bool {
        self.preserve_whitespace.unwrap_or(false)
    }

    pub fn preserve_if_empty(&self) -> bool {
        self.preserve_if_empty.unwrap_or(false)
    }

    pub fn space_if_repeating_char(&self) -> bool {
        self.space_if_repeating_char.unwrap_or(false)
    }

    /// Shallow merge: fields set on `self` win, everything else comes
    /// from `base`
    pub fn merged_over(self, base: &TranslatorConfig) -> TranslatorConfig {
        TranslatorConfig {
            content: self.content.or_else(|| base.content.clone()),
            prefix: self.prefix.or_else(|| base.prefix.clone()),
            postfix: self.postfix.or_else(|| base.postfix.clone()),
            recurse: self.recurse.or(base.recurse),
            surrounding_newlines: self.surrounding_newlines.or(base.surrounding_newlines),
            ignore: self.ignore.or(base.ignore),
            no_escape: self.no_escape.or(base.no_escape),
            preserve_whitespace: self.preserve_whitespace.or(base.preserve_whitespace),
            preserve_if_empty: self.preserve_if_empty.or(base.preserve_if_empty),
            space_if_repeating_char: self.space_if_repeating_char.or(base.space_if_repeating_char),
            postprocess: self.postprocess.or_else(|| base.postprocess.clone()),
            child_translators: self.child_translators.or_else(|| base.child_translators.clone()),
        }
    }
}

impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("content", &self.content)
            .field("prefix", &self.prefix)
            .field("postfix", &self.postfix)
            .field("recurse", &self.recurse)
            .field("surrounding_newlines", &self.surrounding_newlines)
            .field("ignore", &self.ignore)
            .field("no_escape", &self.no_escape)
            .field("preserve_whitespace", &self.preserve_whitespace)
            .field("preserve_if_empty", &self.preserve_if_empty)
            .field("space_if_repeating_char", &self.space_if_repeating_char)
            .field("postprocess", &self.postprocess.is_some())
            .field("child_translators", &self.child_translators.is_some())
            .finish()
    }
}

/// A rule table entry: a fixed config or a factory over per-node context
#[derive(Clone)]
pub enum Translator {
    Static(TranslatorConfig),
    Dynamic {
        factory: Arc<FactoryFn>,
        /// Rule the factory's result merges over; populated when a factory
        /// replaces an existing rule with base preservation
        base: Option<Box<Translator>>,
    },
}

impl Translator {
    /// Wrap a closure as a dynamic rule without a base
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&TranslatorContext) -> TranslatorConfig + Send + Sync + 'static,
    {
        Translator::Dynamic {
            factory: Arc::new(f),
            base: None,
        }
    }

    /// Resolve to a concrete config for the given node
    pub fn resolve(&self, ctx: &TranslatorContext) -> TranslatorConfig {
        match self {
            Translator::Static(config) => config.clone(),
            Translator::Dynamic { factory, base } => {
                let config = factory(ctx);
                match base {
                    Some(base) => config.merged_over(&base.resolve(ctx)),
                    None => config,
                }
            }
        }
    }

    /// Whether the optimizer must keep a childless element carrying this
    /// rule: factories always fire, static rules only when they ask to
    pub fn preserves_when_empty(&self) -> bool {
        match self {
            Translator::Static(config) => config.preserve_if_empty(),
            Translator::Dynamic { .. } => true,
        }
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translator::Static(config) => f.debug_tuple("Static").field(config).finish(),
            Translator::Dynamic { base, .. } => f
                .debug_struct("Dynamic")
                .field("base", base)
                .finish_non_exhaustive(),
        }
    }
}

/// Per-node context handed to rule factories
pub struct TranslatorContext<'a> {
    pub dom: &'a Dom,
    pub node: NodeId,
    pub options: &'a Options,
    pub metadata: &'a NodeMetadata,
    pub(crate) scratch: &'a RefCell<Scratch>,
}

impl<'a> TranslatorContext<'a> {
    pub fn parent(&self) -> Option<NodeId> {
        self.dom.parent(self.node)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.dom.attr(self.node, name)
    }
}

/// Context handed to postprocess hooks, including the rendered inner content
pub struct PostprocessContext<'a> {
    pub dom: &'a Dom,
    pub node: NodeId,
    pub options: &'a Options,
    pub metadata: &'a NodeMetadata,
    /// The node's rendered inner content (between prefix and postfix)
    pub content: String,
    pub(crate) scratch: &'a RefCell<Scratch>,
}

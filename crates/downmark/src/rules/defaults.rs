//! Built-in translator rules.
//!
//! One constructor per tag family, plus assembly functions for the scoped
//! sub-tables (anchor interiors, table interiors, code block interiors).
//! The engine wires these together and layers user rules on top.

use std::mem;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::options::{CodeBlockStyle, Options};
use crate::rules::rule::{PostProcess, PostprocessContext, Translator, TranslatorConfig};
use crate::rules::TranslatorCollection;
use crate::utilities::{is_whitespace_only, longest_run, surround, tag_surround, trim_newlines};
use crate::visitor::ListKind;

/// Tags that always get blank-line padding around their output
pub(crate) const BLOCK_ELEMENTS: &[&str] = &[
    "ADDRESS", "ARTICLE", "ASIDE", "AUDIO", "BLOCKQUOTE", "BODY", "CANVAS", "CENTER", "DD", "DIR",
    "DIV", "DL", "DT", "FIELDSET", "FIGCAPTION", "FIGURE", "FOOTER", "FORM", "FRAMESET", "H1",
    "H2", "H3", "H4", "H5", "H6", "HEADER", "HGROUP", "HR", "HTML", "ISINDEX", "LI", "MAIN",
    "MENU", "NAV", "NOFRAMES", "NOSCRIPT", "OL", "OUTPUT", "P", "PRE", "SECTION", "TABLE",
    "TBODY", "TD", "TFOOT", "TH", "THEAD", "TR", "UL",
];

/// Tags skipped entirely, subtree included
pub(crate) const IGNORED_ELEMENTS: &[&str] = &[
    "AREA", "BASE", "COL", "COMMAND", "EMBED", "HEAD", "INPUT", "KEYGEN", "LINK", "META", "PARAM",
    "SCRIPT", "SOURCE", "STYLE", "TRACK", "WBR",
];

/// Tags that produce output despite having no children
pub(crate) const CONTENTLESS_ELEMENTS: &[&str] = &["BR", "HR", "IMG"];

static NEWLINE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n)+").expect("newline run pattern"));

static LIST_LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\r\n])(?:\r?\n)+").expect("list line break pattern"));

static LIST_TRAILING_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(\S+?)[^\S\r\n]+$").expect("list trailing space pattern"));

static BLOCKQUOTE_LINE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(>*)[^\S\r\n]?").expect("blockquote line start pattern"));

static LINE_STARTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^").expect("line start pattern"));

static TABLE_ROW_TRIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|?(.+)\s*\|\s*$").expect("table row trim pattern"));

static ROW_ENDS_WITH_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" \|\s*$").expect("row end pattern"));

static CODE_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"language-(\S+)").expect("code language pattern"));

/* ********************************************************************** */
// region: Rule constructors
/* ********************************************************************** */

fn fixed(content: &str) -> Translator {
    Translator::Static(TranslatorConfig {
        content: Some(content.to_string()),
        recurse: Some(false),
        ..Default::default()
    })
}

fn pre_rule() -> Translator {
    Translator::Static(TranslatorConfig {
        no_escape: Some(true),
        preserve_whitespace: Some(true),
        ..Default::default()
    })
}

fn heading_rule() -> Translator {
    Translator::factory(|ctx| {
        let level = ctx
            .dom
            .tag(ctx.node)
            .and_then(|tag| tag.get(1..))
            .and_then(|digits| digits.parse::<usize>().ok())
            .unwrap_or(1);
        TranslatorConfig {
            prefix: Some(format!("{} ", "#".repeat(level))),
            ..Default::default()
        }
    })
}

/// Bold, strikethrough and emphasis share one shape: wrap the visible part
/// of each line in the delimiter, or drop the node when it rendered nothing
fn inline_format_rule(delimiter: fn(&Options) -> &str) -> Translator {
    Translator::Static(TranslatorConfig {
        space_if_repeating_char: Some(true),
        postprocess: Some(Arc::new(move |ctx| {
            if is_whitespace_only(&ctx.content) {
                PostProcess::RemoveNode
            } else {
                PostProcess::Replace(tag_surround(&ctx.content, delimiter(ctx.options)))
            }
        })),
        ..Default::default()
    })
}

fn list_rule() -> Translator {
    Translator::factory(|ctx| TranslatorConfig {
        surrounding_newlines: Some(if ctx.metadata.list_kind.is_some() { 1 } else { 2 }),
        ..Default::default()
    })
}

fn list_item_rule() -> Translator {
    Translator::factory(|ctx| {
        let level = ctx.metadata.indent_level.unwrap_or(0);
        let marker = match (ctx.metadata.list_kind, ctx.metadata.ordinal()) {
            (Some(ListKind::Ordered), Some(ordinal)) => format!("{ordinal}. "),
            _ => format!("{} ", ctx.options.bullet_marker),
        };

        TranslatorConfig {
            prefix: Some(format!("{}{}", ctx.options.indent.repeat(level), marker)),
            surrounding_newlines: Some(1),
            postprocess: Some(Arc::new(|ctx| {
                if is_whitespace_only(&ctx.content) {
                    return PostProcess::RemoveNode;
                }
                let indent = ctx
                    .options
                    .indent
                    .repeat(ctx.metadata.indent_level.unwrap_or(0));
                // Hard-break inner lines and re-indent continuation text
                let joined = LIST_LINE_BREAKS
                    .replace_all(ctx.content.trim(), |caps: &Captures| {
                        format!("{}  \n{indent}", &caps[1])
                    })
                    .into_owned();
                PostProcess::Replace(
                    LIST_TRAILING_SPACES.replace_all(&joined, "${1}  ").into_owned(),
                )
            })),
            ..Default::default()
        }
    })
}

fn blockquote_rule() -> Translator {
    Translator::Static(TranslatorConfig {
        postprocess: Some(Arc::new(|ctx| {
            let trimmed = trim_newlines(&ctx.content);
            PostProcess::Replace(
                BLOCKQUOTE_LINE_START.replace_all(trimmed, ">${1} ").into_owned(),
            )
        })),
        ..Default::default()
    })
}

fn code_rule(code_block: Arc<TranslatorCollection>) -> Translator {
    Translator::factory(move |ctx| {
        let is_code_block = ctx.parent().is_some_and(|parent| {
            ctx.dom.tag(parent) == Some("PRE") && ctx.dom.children(parent).len() < 2
        });

        if !is_code_block {
            return TranslatorConfig {
                space_if_repeating_char: Some(true),
                no_escape: Some(true),
                postprocess: Some(Arc::new(|ctx| {
                    // One more backtick than the longest run inside, so the
                    // content cannot terminate the span
                    let delimiter = "`".repeat(longest_run(&ctx.content, '`') + 1);
                    let padding = if delimiter.len() > 1 { " " } else { "" };
                    PostProcess::Replace(surround(&surround(&ctx.content, padding), &delimiter))
                })),
                ..Default::default()
            };
        }

        match ctx.options.code_block_style {
            CodeBlockStyle::Fenced => {
                let language = ctx
                    .attr("class")
                    .and_then(|class| CODE_LANGUAGE.captures(class))
                    .map_or_else(String::new, |caps| caps[1].to_string());
                TranslatorConfig {
                    no_escape: Some(true),
                    preserve_whitespace: Some(true),
                    prefix: Some(format!("{}{language}\n", ctx.options.code_fence)),
                    postfix: Some(format!("\n{}", ctx.options.code_fence)),
                    child_translators: Some(code_block.clone()),
                    ..Default::default()
                }
            }
            CodeBlockStyle::Indented => TranslatorConfig {
                no_escape: Some(true),
                preserve_whitespace: Some(true),
                postprocess: Some(Arc::new(|ctx| {
                    PostProcess::Replace(LINE_STARTS.replace_all(&ctx.content, "    ").into_owned())
                })),
                child_translators: Some(code_block.clone()),
                ..Default::default()
            },
        }
    })
}

/// Percent-encode the characters that break Markdown link syntax
fn encode_href(href: &str) -> String {
    let mut encoded = String::with_capacity(href.len());
    for c in href.chars() {
        match c {
            '(' => encoded.push_str("%28"),
            ')' => encoded.push_str("%29"),
            '_' => encoded.push_str("%5F"),
            '*' => encoded.push_str("%2A"),
            _ => encoded.push(c),
        }
    }
    encoded
}

fn anchor_rule(a_tag: Arc<TranslatorCollection>) -> Translator {
    Translator::factory(move |ctx| {
        let href = match ctx.attr("href") {
            Some(href) if !href.is_empty() => href,
            _ => return TranslatorConfig::default(),
        };
        let encoded = encode_href(href);

        // Autolink when the label adds nothing
        if ctx.options.use_inline_links && ctx.dom.text_content(ctx.node) == href {
            return TranslatorConfig {
                content: Some(format!("<{encoded}>")),
                ..Default::default()
            };
        }

        let postfix = if ctx.options.use_link_reference_definitions {
            let id = ctx.scratch.borrow_mut().reference_for(&encoded);
            format!("][{id}]")
        } else {
            match ctx.attr("title") {
                Some(title) if !title.is_empty() => format!("]({encoded} \"{title}\")"),
                _ => format!("]({encoded})"),
            }
        };

        TranslatorConfig {
            prefix: Some("[".to_string()),
            postfix: Some(postfix),
            child_translators: Some(a_tag.clone()),
            postprocess: Some(Arc::new(|ctx| {
                PostProcess::Replace(NEWLINE_RUNS.replace_all(&ctx.content, " ").into_owned())
            })),
            ..Default::default()
        }
    })
}

fn image_rule() -> Translator {
    Translator::factory(|ctx| {
        let src = ctx.attr("src").unwrap_or("");
        let is_data_uri = src
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
        if src.is_empty() || (is_data_uri && !ctx.options.keep_data_images) {
            return TranslatorConfig {
                ignore: Some(true),
                ..Default::default()
            };
        }

        let alt = ctx.attr("alt").unwrap_or("");
        let content = match ctx.attr("title") {
            Some(title) if !title.is_empty() => format!("![{alt}]({src} \"{title}\")"),
            _ => format!("![{alt}]({src})"),
        };
        TranslatorConfig {
            content: Some(content),
            recurse: Some(false),
            ..Default::default()
        }
    })
}

fn table_rule(table: Arc<TranslatorCollection>) -> Translator {
    Translator::factory(move |_| TranslatorConfig {
        surrounding_newlines: Some(2),
        child_translators: Some(table.clone()),
        postprocess: Some(Arc::new(table_postprocess)),
        ..Default::default()
    })
}

fn table_postprocess(ctx: &mut PostprocessContext) -> PostProcess {
    /* Collect rows, tracking column widths */
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut widths: Vec<usize> = Vec::new();
    for line in ctx.content.lines() {
        let row = TABLE_ROW_TRIM.replace(line, "${1}");
        if row.is_empty() {
            continue;
        }

        let mut cols = Vec::new();
        for (i, cell) in row.split(" |").enumerate() {
            let cell = cell.trim().to_string();
            let width = cell.chars().count();
            if widths.len() < i + 1 {
                widths.push(width);
            } else if widths[i] < width {
                widths[i] = width;
            }
            cols.push(cell);
        }
        rows.push(cols);
    }

    if rows.is_empty() {
        return PostProcess::RemoveNode;
    }

    /* Compose the table, padding cells to their column width */
    let mut result = String::new();
    let caption = ctx
        .metadata
        .table
        .and_then(|table| ctx.scratch.borrow_mut().table_captions.remove(&table.index()));
    if let Some(caption) = caption {
        result.push_str(&caption);
        result.push('\n');
    }

    let last = widths.len() - 1;
    for (row_number, cols) in rows.iter().enumerate() {
        result.push_str("| ");
        for (i, &width) in widths.iter().enumerate() {
            let cell = cols.get(i).map_or("", String::as_str);
            result.push_str(cell);
            for _ in cell.chars().count()..width {
                result.push(' ');
            }
            result.push_str(" |");
            if i < last {
                result.push(' ');
            }
        }
        result.push('\n');

        // Header separator after the first row
        if row_number == 0 {
            result.push('|');
            for &width in &widths {
                result.push(' ');
                result.push_str(&"-".repeat(width));
                result.push_str(" |");
            }
            result.push('\n');
        }
    }

    PostProcess::Replace(result)
}

fn table_caption_rule(cell: Arc<TranslatorCollection>) -> Translator {
    Translator::factory(move |_| TranslatorConfig {
        surrounding_newlines: Some(0),
        child_translators: Some(cell.clone()),
        postprocess: Some(Arc::new(|ctx| {
            let caption = NEWLINE_RUNS.replace_all(&ctx.content, " ");
            let caption = caption.trim();
            if !caption.is_empty() {
                if let Some(table) = ctx.metadata.table {
                    ctx.scratch
                        .borrow_mut()
                        .table_captions
                        .insert(table.index(), format!("__{caption}__"));
                }
            }
            // The caption re-emerges from the table's own postprocess
            PostProcess::RemoveNode
        })),
        ..Default::default()
    })
}

fn table_row_rule(row: Arc<TranslatorCollection>) -> Translator {
    Translator::factory(move |_| TranslatorConfig {
        surrounding_newlines: Some(0),
        child_translators: Some(row.clone()),
        prefix: Some("| ".to_string()),
        postfix: Some("\n".to_string()),
        postprocess: Some(Arc::new(|ctx| {
            // A row that rendered no cell contributes nothing
            if ROW_ENDS_WITH_CELL.is_match(&ctx.content) {
                PostProcess::Replace(mem::take(&mut ctx.content))
            } else {
                PostProcess::RemoveNode
            }
        })),
        ..Default::default()
    })
}

fn table_cell_rule(cell: Arc<TranslatorCollection>) -> Translator {
    Translator::factory(move |_| TranslatorConfig {
        surrounding_newlines: Some(0),
        child_translators: Some(cell.clone()),
        prefix: Some(" ".to_string()),
        postfix: Some(" |".to_string()),
        postprocess: Some(Arc::new(|ctx| {
            let escaped = trim_newlines(&ctx.content).replace('|', "\\|");
            let joined = NEWLINE_RUNS.replace_all(&escaped, " ");
            PostProcess::Replace(joined.trim().to_string())
        })),
        ..Default::default()
    })
}

// endregion

/* ********************************************************************** */
// region: Table assembly
/* ********************************************************************** */

/// Rules active inside a link's label
pub(crate) fn a_tag_translators() -> TranslatorCollection {
    let mut collection = TranslatorCollection::new();
    collection.set("br", fixed("\n"));
    collection.set("hr", fixed("\n"));
    collection.set("pre", pre_rule());
    collection.set("strong,b", inline_format_rule(|options| &options.strong_delimiter));
    collection.set("del,s,strike", inline_format_rule(|options| &options.strike_delimiter));
    collection.set("em,i", inline_format_rule(|options| &options.em_delimiter));
    collection.set("img", image_rule());
    collection
}

/// Rules active inside a table cell or caption
pub(crate) fn table_cell_translators(a_tag: &Arc<TranslatorCollection>) -> TranslatorCollection {
    let mut collection = TranslatorCollection::new();
    collection.set("a", anchor_rule(a_tag.clone()));
    collection.set("strong,b", inline_format_rule(|options| &options.strong_delimiter));
    collection.set("del,s,strike", inline_format_rule(|options| &options.strike_delimiter));
    collection.set("em,i", inline_format_rule(|options| &options.em_delimiter));
    collection.set("img", image_rule());
    collection
}

/// Rules active inside a table row
pub(crate) fn table_row_translators(cell: &Arc<TranslatorCollection>) -> TranslatorCollection {
    let mut collection = TranslatorCollection::new();
    collection.set("th,td", table_cell_rule(cell.clone()));
    collection
}

/// Rules active inside a table
pub(crate) fn table_translators(
    cell: &Arc<TranslatorCollection>,
    row: &Arc<TranslatorCollection>,
) -> TranslatorCollection {
    let mut collection = TranslatorCollection::new();
    collection.set("caption", table_caption_rule(cell.clone()));
    collection.set("tr", table_row_rule(row.clone()));
    collection.set("th,td", table_cell_rule(cell.clone()));
    collection
}

/// The built-in rules for fenced and indented code block interiors, in
/// registration order
pub(crate) fn code_block_translators() -> Vec<(&'static str, Translator)> {
    vec![
        ("br", fixed("\n")),
        ("hr", fixed("---")),
        (
            "h1,h2,h3,h4,h5,h6",
            Translator::Static(TranslatorConfig {
                prefix: Some("[".to_string()),
                postfix: Some("]".to_string()),
                ..Default::default()
            }),
        ),
        (
            "ol,ul",
            Translator::Static(TranslatorConfig {
                surrounding_newlines: Some(0),
                ..Default::default()
            }),
        ),
        ("li", list_item_rule()),
        (
            "tr",
            Translator::Static(TranslatorConfig {
                surrounding_newlines: Some(0),
                ..Default::default()
            }),
        ),
        (
            "img",
            Translator::Static(TranslatorConfig {
                recurse: Some(false),
                ..Default::default()
            }),
        ),
    ]
}

/// The built-in main-table rules, in registration order
pub(crate) fn default_translators(
    a_tag: &Arc<TranslatorCollection>,
    code_block: &Arc<TranslatorCollection>,
    table: &Arc<TranslatorCollection>,
) -> Vec<(&'static str, Translator)> {
    vec![
        ("pre", pre_rule()),
        ("br", fixed("  \n")),
        ("hr", fixed("---")),
        ("h1,h2,h3,h4,h5,h6", heading_rule()),
        ("strong,b", inline_format_rule(|options| &options.strong_delimiter)),
        ("del,s,strike", inline_format_rule(|options| &options.strike_delimiter)),
        ("em,i", inline_format_rule(|options| &options.em_delimiter)),
        ("ol,ul", list_rule()),
        ("li", list_item_rule()),
        ("blockquote", blockquote_rule()),
        ("code", code_rule(code_block.clone())),
        ("table", table_rule(table.clone())),
        (
            "td,th",
            Translator::Static(TranslatorConfig {
                preserve_if_empty: Some(true),
                ..Default::default()
            }),
        ),
        ("a", anchor_rule(a_tag.clone())),
        ("img", image_rule()),
    ]
}

// endregion

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;
    use crate::visitor::{NodeMetadata, Scratch};
    use std::cell::RefCell;

    fn resolve(
        translator: &Translator,
        dom: &Dom,
        node: crate::dom::NodeId,
        options: &Options,
        metadata: &NodeMetadata,
    ) -> TranslatorConfig {
        let scratch = RefCell::new(Scratch::default());
        let ctx = crate::rules::rule::TranslatorContext {
            dom,
            node,
            options,
            metadata,
            scratch: &scratch,
        };
        translator.resolve(&ctx)
    }

    fn run_postprocess(config: &TranslatorConfig, content: &str) -> PostProcess {
        let dom = Dom::new();
        let options = Options::default();
        let metadata = NodeMetadata::default();
        let scratch = RefCell::new(Scratch::default());
        let mut ctx = PostprocessContext {
            node: dom.root(),
            dom: &dom,
            options: &options,
            metadata: &metadata,
            content: content.to_string(),
            scratch: &scratch,
        };
        config.postprocess.as_ref().map(|hook| hook(&mut ctx)).unwrap_or_else(|| {
            panic!("rule has no postprocess hook");
        })
    }

    #[test]
    fn test_heading_prefix_levels() {
        let mut dom = Dom::new();
        let h3 = dom.create_element(dom.root(), "h3", Vec::new());
        let options = Options::default();
        let config = resolve(&heading_rule(), &dom, h3, &options, &NodeMetadata::default());
        assert_eq!(config.prefix.as_deref(), Some("### "));
    }

    #[test]
    fn test_encode_href() {
        assert_eq!(encode_href("/a_b(c)*"), "/a%5Fb%28c%29%2A");
        assert_eq!(encode_href("https://x.com/page"), "https://x.com/page");
    }

    #[test]
    fn test_image_drops_data_uri_by_default() {
        let mut dom = Dom::new();
        let img = dom.create_element(
            dom.root(),
            "img",
            vec![("src".to_string(), "data:image/png;base64,xyz".to_string())],
        );
        let options = Options::default();
        let config = resolve(&image_rule(), &dom, img, &options, &NodeMetadata::default());
        assert!(config.ignore());

        let mut kept = Options::default();
        kept.keep_data_images = true;
        let config = resolve(&image_rule(), &dom, img, &kept, &NodeMetadata::default());
        assert_eq!(
            config.content.as_deref(),
            Some("![](data:image/png;base64,xyz)")
        );
    }

    #[test]
    fn test_inline_code_delimiter_escalates() {
        let mut dom = Dom::new();
        let code = dom.create_element(dom.root(), "code", Vec::new());
        let options = Options::default();
        let code_block = Arc::new(TranslatorCollection::new());
        let config = resolve(
            &code_rule(code_block),
            &dom,
            code,
            &options,
            &NodeMetadata::default(),
        );

        match run_postprocess(&config, "a `tick` b") {
            PostProcess::Replace(text) => assert_eq!(text, "`` a `tick` b ``"),
            PostProcess::RemoveNode => panic!("unexpected removal"),
        }
        match run_postprocess(&config, "plain") {
            PostProcess::Replace(text) => assert_eq!(text, "`plain`"),
            PostProcess::RemoveNode => panic!("unexpected removal"),
        }
    }

    #[test]
    fn test_inline_format_removes_empty_content() {
        let rule = inline_format_rule(|options| &options.strong_delimiter);
        let config = match &rule {
            Translator::Static(config) => config.clone(),
            Translator::Dynamic { .. } => panic!("expected static rule"),
        };
        assert!(matches!(
            run_postprocess(&config, "  \n "),
            PostProcess::RemoveNode
        ));
        match run_postprocess(&config, "word") {
            PostProcess::Replace(text) => assert_eq!(text, "**word**"),
            PostProcess::RemoveNode => panic!("unexpected removal"),
        }
    }

    #[test]
    fn test_blockquote_postprocess_nests() {
        let config = match blockquote_rule() {
            Translator::Static(config) => config,
            Translator::Dynamic { .. } => panic!("expected static rule"),
        };
        match run_postprocess(&config, "\nwords\n> inner\n") {
            PostProcess::Replace(text) => assert_eq!(text, "> words\n>> inner"),
            PostProcess::RemoveNode => panic!("unexpected removal"),
        }
    }

    #[test]
    fn test_table_postprocess_pads_columns() {
        let table = Arc::new(TranslatorCollection::new());
        let config = {
            let dom = Dom::new();
            let options = Options::default();
            resolve(
                &table_rule(table),
                &dom,
                dom.root(),
                &options,
                &NodeMetadata::default(),
            )
        };
        match run_postprocess(&config, "| col1 | verylong |\n| a | b |\n") {
            PostProcess::Replace(text) => assert_eq!(
                text,
                "| col1 | verylong |\n| ---- | -------- |\n| a    | b        |\n"
            ),
            PostProcess::RemoveNode => panic!("unexpected removal"),
        }
    }
}

//! Translation engine.
//!
//! [`Downmark`] owns the options and the fully-layered rule table. The table
//! is assembled once at construction: block-element padding bases, ignored
//! element bases, the built-in named behaviors, then user rules merged over
//! whatever they shadow. Options are plain data and may be changed between
//! calls; the element lists are the exception, they are baked into the table.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::dom::Dom;
use crate::options::Options;
use crate::rules::defaults::{self, BLOCK_ELEMENTS, IGNORED_ELEMENTS};
use crate::rules::rule::{Translator, TranslatorConfig};
use crate::rules::TranslatorCollection;
use crate::{visitor, Result};

/// HTML to Markdown translator
pub struct Downmark {
    options: Options,
    translators: TranslatorCollection,
}

impl Downmark {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self::with_translators(options, Vec::new(), Vec::new())
    }

    /// Build an engine with user rules layered over the defaults.
    ///
    /// A custom entry whose comma-separated key exactly matches a built-in
    /// key replaces that built-in behavior; otherwise it merges over the
    /// existing rule for each tag it names. `custom_code_block` does the same
    /// for the code-block interior table.
    pub fn with_translators(
        options: Options,
        custom: Vec<(String, Translator)>,
        custom_code_block: Vec<(String, Translator)>,
    ) -> Self {
        let mut translators = TranslatorCollection::new();
        let mut code_block = TranslatorCollection::new();

        /* Bases: blank-line padding for block elements, skip for ignored */
        for tag in block_elements(&options) {
            translators.set(tag, block_base());
            code_block.set(tag, block_base());
        }
        for tag in ignored_elements(&options) {
            translators.set(tag, ignore_base());
            code_block.set(tag, ignore_base());
        }

        /* Named behaviors, then user rules, merged over the bases */
        for (keys, translator) in layered(defaults::code_block_translators(), custom_code_block) {
            code_block.set_with_base(&keys, translator);
        }
        let code_block = Arc::new(code_block);

        let a_tag = Arc::new(defaults::a_tag_translators());
        let cell = Arc::new(defaults::table_cell_translators(&a_tag));
        let row = Arc::new(defaults::table_row_translators(&cell));
        let table = Arc::new(defaults::table_translators(&cell, &row));

        let main = defaults::default_translators(&a_tag, &code_block, &table);
        for (keys, translator) in layered(main, custom) {
            translators.set_with_base(&keys, translator);
        }

        Self {
            options,
            translators,
        }
    }

    /// Translate HTML source text to Markdown
    #[cfg(feature = "html")]
    pub fn translate(&self, html: &str) -> Result<String> {
        self.translate_dom(&crate::html::parse_html(html))
    }

    /// Translate a collection of named HTML documents, preserving key order.
    /// Each document is rendered independently.
    #[cfg(feature = "html")]
    pub fn translate_files(
        &self,
        files: &IndexMap<String, String>,
    ) -> Result<IndexMap<String, String>> {
        let mut output = IndexMap::with_capacity(files.len());
        for (name, html) in files {
            output.insert(name.clone(), self.translate(html)?);
        }
        Ok(output)
    }

    /// Translate an already-parsed document tree
    pub fn translate_dom(&self, dom: &Dom) -> Result<String> {
        visitor::render(dom, &self.options, &self.translators)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable options access; changes apply to subsequent calls
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    pub fn translators(&self) -> &TranslatorCollection {
        &self.translators
    }
}

impl Default for Downmark {
    fn default() -> Self {
        Self::new()
    }
}

fn block_base() -> Translator {
    Translator::Static(TranslatorConfig {
        surrounding_newlines: Some(2),
        ..Default::default()
    })
}

fn ignore_base() -> Translator {
    Translator::Static(TranslatorConfig {
        ignore: Some(true),
        recurse: Some(false),
        ..Default::default()
    })
}

fn block_elements(options: &Options) -> impl Iterator<Item = &str> {
    BLOCK_ELEMENTS
        .iter()
        .copied()
        .chain(options.block_elements.iter().map(String::as_str))
}

fn ignored_elements(options: &Options) -> impl Iterator<Item = &str> {
    IGNORED_ELEMENTS
        .iter()
        .copied()
        .chain(options.ignore_elements.iter().map(String::as_str))
}

/// Defaults with user entries shadowing matching keys, in registration order
fn layered(
    base: Vec<(&'static str, Translator)>,
    custom: Vec<(String, Translator)>,
) -> IndexMap<String, Translator> {
    let mut entries: IndexMap<String, Translator> = base
        .into_iter()
        .map(|(keys, translator)| (keys.to_string(), translator))
        .collect();
    for (keys, translator) in custom {
        entries.insert(keys, translator);
    }
    entries
}

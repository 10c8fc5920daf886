//! Markdown text escaping.
//!
//! Raw text is made Markdown-safe by two regex passes: a global
//! single-character escape, then a line-start pattern escape that keeps
//! prose from being misread as block markers (`# `, `> `, `1. `, ...).
//! User-supplied replacement pairs run after both.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::options::Options;
use crate::Result;

/// A compiled pattern plus its replacement text
#[derive(Debug, Clone)]
pub struct ReplacePair {
    pattern: Regex,
    replacement: String,
}

impl ReplacePair {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every match in `text`
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.replacement.as_str())
    }
}

static GLOBAL_ESCAPE: Lazy<ReplacePair> = Lazy::new(|| {
    ReplacePair::new(r"[\\`*_~\[\]]", r"\$0").expect("default global escape pattern")
});

static LINE_START_ESCAPE: Lazy<ReplacePair> = Lazy::new(|| {
    ReplacePair::new(
        r"(?m)^(\s*?)((?:\+\s)|(?:[=>-])|(?:#{1,6}\s))|(\d+)(\.\s)",
        r"${1}${3}\${2}${4}",
    )
    .expect("default line start escape pattern")
});

/// Default single-character escape: `\` `` ` `` `*` `_` `~` `[` `]`
pub fn default_global_escape() -> ReplacePair {
    GLOBAL_ESCAPE.clone()
}

/// Default line-start escape for `+`, `=`, `>`, `-`, headings and
/// ordered-list markers
pub fn default_line_start_escape() -> ReplacePair {
    LINE_START_ESCAPE.clone()
}

/// Build a single-character escape over a custom character set
pub fn single_char_escape(chars: &[char]) -> Result<ReplacePair> {
    let mut class = String::from("[");
    for &c in chars {
        class.push_str(&regex::escape(&c.to_string()));
    }
    class.push(']');
    ReplacePair::new(&class, r"\$0")
}

/// Apply the configured escape rules in order: global characters,
/// line-start patterns, then user replacement pairs
pub fn escape_text(text: &str, options: &Options) -> String {
    let text = options.global_escape.apply(text);
    let text = options.line_start_escape.apply(&text);
    let mut result = text.into_owned();
    for pair in &options.text_replace {
        result = pair.apply(&result).into_owned();
    }
    result
}

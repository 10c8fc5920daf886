//! Engine configuration.

use crate::escape::{self, ReplacePair};

/// How `<pre><code>` blocks are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeBlockStyle {
    /// Surround with a code fence, emitting a detected language after the
    /// opening fence
    #[default]
    Fenced,
    /// Indent every line by four spaces
    Indented,
}

/// Translation options.
///
/// All fields are plain and may be adjusted between calls on the same
/// engine instance. `ignore_elements` and `block_elements` are consulted
/// when the engine (and its rule table) is constructed.
#[derive(Debug, Clone)]
pub struct Options {
    /// Fence string for fenced code blocks
    pub code_fence: String,
    pub code_block_style: CodeBlockStyle,
    /// Marker for unordered list items
    pub bullet_marker: String,
    /// Indent unit for nested list content
    pub indent: String,
    pub em_delimiter: String,
    pub strong_delimiter: String,
    pub strike_delimiter: String,
    /// Longest run of newlines allowed in the final output; 0 disables
    /// collapsing
    pub max_consecutive_newlines: usize,
    /// Extra tag names to ignore entirely (merged with the built-in list)
    pub ignore_elements: Vec<String>,
    /// Extra tag names treated as block-level (merged with the built-in list)
    pub block_elements: Vec<String>,
    pub global_escape: ReplacePair,
    pub line_start_escape: ReplacePair,
    /// User replacement pairs applied to escaped prose text, in order
    pub text_replace: Vec<ReplacePair>,
    /// Render `<a>` whose text equals its href as `<href>` autolinks
    pub use_inline_links: bool,
    /// Render links as `[text][n]` with trailing `[n]: url` definitions
    pub use_link_reference_definitions: bool,
    /// Keep images with `data:` URIs instead of dropping them
    pub keep_data_images: bool,
    /// Recursion guard for pathologically nested input
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            code_fence: "```".to_string(),
            code_block_style: CodeBlockStyle::Fenced,
            bullet_marker: "*".to_string(),
            indent: "   ".to_string(),
            em_delimiter: "_".to_string(),
            strong_delimiter: "**".to_string(),
            strike_delimiter: "~~".to_string(),
            max_consecutive_newlines: 3,
            ignore_elements: Vec::new(),
            block_elements: Vec::new(),
            global_escape: escape::default_global_escape(),
            line_start_escape: escape::default_line_start_escape(),
            text_replace: Vec::new(),
            use_inline_links: true,
            use_link_reference_definitions: false,
            keep_data_images: false,
            max_depth: 512,
        }
    }
}

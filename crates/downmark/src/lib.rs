//! # downmark
//!
//! Translate HTML documents to Markdown.
//!
//! The engine walks a parsed DOM tree with a per-tag rule table
//! ("translators") and renders Markdown into an append-only buffer with
//! newline normalization, text escaping, and scoped rule overrides for
//! special contexts such as code blocks, anchor interiors, and tables.
//!
//! ## Design
//!
//! HTML parsing is kept at the edge: the core operates on an arena [`Dom`]
//! that any parser can produce. The default `html` feature converts a string
//! through scraper/html5ever. This allows:
//!
//! - **Parser agnostic**: Any HTML parser can fill the `Dom` arena
//! - **Smaller binaries**: No HTML parser bundled when the feature is off
//!
//! ## Example
//!
//! ```rust
//! use downmark::Downmark;
//!
//! let engine = Downmark::new();
//! let markdown = engine.translate("<h1>Title</h1><p>A <b>bold</b> word.</p>").unwrap();
//! assert_eq!(markdown, "# Title\n\nA **bold** word.");
//! ```

pub mod dom;
pub mod escape;
#[cfg(feature = "html")]
pub mod html;
mod options;
mod rules;
mod service;
mod utilities;
mod visitor;

pub use dom::{Dom, NodeData, NodeId};
pub use escape::ReplacePair;
#[cfg(feature = "html")]
pub use html::parse_html;
pub use options::{CodeBlockStyle, Options};
pub use rules::rule::{
    PostProcess, PostprocessContext, Translator, TranslatorConfig, TranslatorContext,
};
pub use rules::TranslatorCollection;
pub use service::Downmark;
pub use visitor::{ListKind, NodeMetadata};

/// Error type for translation operations
#[derive(Debug, thiserror::Error)]
pub enum DownmarkError {
    #[error("Maximum nesting depth of {0} exceeded")]
    DepthLimitExceeded(usize),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, DownmarkError>;

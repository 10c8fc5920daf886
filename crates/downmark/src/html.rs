//! HTML parsing support.
//!
//! Parses HTML strings with scraper/html5ever and converts the result into
//! the arena [`Dom`] used by the translation engine.

use ego_tree::iter::Edge;
use scraper::{Html, Node as ScraperNode};

use crate::dom::{Dom, NodeId};

/// Parse an HTML string into a [`Dom`] tree.
///
/// Doctype declarations and processing instructions are dropped; comments
/// are kept as comment nodes (the visitor emits nothing for them).
///
/// # Example
///
/// ```rust
/// use downmark::{parse_html, Downmark};
///
/// let dom = parse_html("<h1>Hello <em>World</em></h1>");
/// let engine = Downmark::new();
/// let markdown = engine.translate_dom(&dom).unwrap();
/// assert_eq!(markdown, "# Hello _World_");
/// ```
pub fn parse_html(html: &str) -> Dom {
    let document = Html::parse_document(html);
    let mut dom = Dom::new();
    let root = dom.root();

    // Each Open pushes the id that the node's children attach to; leaf node
    // kinds push their parent so Open/Close stay symmetric.
    let mut stack: Vec<NodeId> = Vec::new();
    for edge in document.tree.root().traverse() {
        match edge {
            Edge::Open(node) => {
                let parent = stack.last().copied().unwrap_or(root);
                let id = match node.value() {
                    ScraperNode::Element(element) => {
                        let attrs = element
                            .attrs()
                            .map(|(name, value)| (name.to_string(), value.to_string()))
                            .collect();
                        dom.create_element(parent, element.name(), attrs)
                    }
                    ScraperNode::Text(text) => {
                        dom.create_text(parent, &text.text);
                        parent
                    }
                    ScraperNode::Comment(_) => {
                        dom.create_comment(parent);
                        parent
                    }
                    _ => parent,
                };
                stack.push(id);
            }
            Edge::Close(_) => {
                stack.pop();
            }
        }
    }

    dom
}

//! Arena-backed DOM tree.
//!
//! Nodes live in a flat `Vec` and reference each other by [`NodeId`] index,
//! so parent back-references are plain integers and per-node side data (the
//! optimizer's preserve flags, metadata) can be kept in parallel arrays.
//! Any HTML parser can populate this structure; the `html` feature does so
//! via scraper.

/// Index of a node within a [`Dom`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena, usable as a key into parallel arrays
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a single DOM node
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Synthetic root of the tree
    Document,
    /// Element with an upper-cased tag name and its attributes
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    /// Text with a precomputed whitespace-only flag
    Text { text: String, whitespace: bool },
    Comment,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed document tree
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    /// Create a tree containing only the document root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the arena, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the arena retains the document root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append an element child; the tag name is stored upper-cased and
    /// attribute names lower-cased
    pub fn create_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let attrs = attrs
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        self.push(
            parent,
            NodeData::Element {
                tag: tag.to_ascii_uppercase(),
                attrs,
            },
        )
    }

    /// Append a text child, computing its whitespace-only flag
    pub fn create_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let whitespace = !text.contains(|c: char| !c.is_whitespace());
        self.push(
            parent,
            NodeData::Text {
                text: text.to_string(),
                whitespace,
            },
        )
    }

    pub fn create_comment(&mut self, parent: NodeId) -> NodeId {
        self.push(parent, NodeData::Comment)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Upper-cased tag name, or `None` for non-element nodes
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Attribute value by case-insensitive name
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Concatenated raw text of the node and all its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let node = &self.nodes[current.0];
            if let NodeData::Text { text, .. } = &node.data {
                result.push_str(text);
            }
            stack.extend(node.children.iter().rev());
        }

        result
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

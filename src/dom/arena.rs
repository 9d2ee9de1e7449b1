//! Arena-based tree storage.
//!
//! All nodes live in a contiguous vector; parent/child/sibling links are
//! indices into it. This keeps mutation cheap and traversal allocation-free.

use std::collections::HashMap;

use crate::dom::local_name;

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// XML attribute. Values are stored unescaped.
#[derive(Debug, Clone)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with its qualified name as written in the source.
    Element { name: String, attrs: Vec<Attr> },
    /// Text content (unescaped).
    Text(String),
    /// Entity reference by name, e.g. `nbsp` for `&nbsp;`.
    EntityRef(String),
    Comment(String),
    /// Doctype body (everything between `<!DOCTYPE ` and `>`).
    Doctype(String),
    /// Processing instruction body (between `<?` and `?>`).
    ProcessingInstruction(String),
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// One parsed page.
pub struct PageDom {
    nodes: Vec<Node>,
    document: NodeId,
    /// Inner text of the XML declaration, if the source had one.
    pub xml_decl: Option<String>,
    /// Namespace declarations on the root element (prefix -> URI). The
    /// default namespace is stored under the empty prefix.
    pub nsmap: HashMap<String, String>,
}

impl PageDom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
            xml_decl: None,
            nsmap: HashMap::new(),
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: impl Into<String>, attrs: Vec<Attr>) -> NodeId {
        self.alloc(Node::new(NodeData::Element {
            name: name.into(),
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text.into())))
    }

    pub fn create_node(&mut self, data: NodeData) -> NodeId {
        self.alloc(Node::new(data))
    }

    /// Append a child to a parent node.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
        }

        if last_child.is_some() {
            if let Some(last_node) = self.get_mut(last_child) {
                last_node.next_sibling = child;
            }
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Iterate over direct children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    /// Iterate over all descendants of a node in document order,
    /// excluding the node itself.
    pub fn descendants(&self, root: NodeId) -> DescendantsIter<'_> {
        let mut stack = Vec::new();
        let mut children: Vec<_> = self.children(root).collect();
        children.reverse();
        stack.extend(children);
        DescendantsIter { dom: self, stack }
    }

    /// Find the first element matching a predicate, in document order.
    pub fn find_element<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&str, &[Attr]) -> bool,
    {
        self.descendants(self.document)
            .find(|&id| match self.get(id).map(|n| &n.data) {
                Some(NodeData::Element { name, attrs }) => predicate(name, attrs),
                _ => false,
            })
    }

    /// Root element of the document.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.document).find(|&id| self.is_element(id))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Element local name, if the node is an element.
    pub fn element_local_name(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(local_name(name)),
            _ => None,
        })
    }

    /// Get an attribute value by exact qualified name.
    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    /// Set (or replace) an attribute on an element. No-op on non-elements.
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, value: &str) {
        if let Some(node) = self.get_mut(id) {
            if let NodeData::Element { attrs, .. } = &mut node.data {
                match attrs.iter_mut().find(|a| a.name == attr_name) {
                    Some(attr) => attr.value = value.to_string(),
                    None => attrs.push(Attr {
                        name: attr_name.to_string(),
                        value: value.to_string(),
                    }),
                }
            }
        }
    }

    /// Whether the `epub` namespace prefix is declared on the root element.
    pub fn has_epub_ns(&self) -> bool {
        self.nsmap.contains_key("epub")
    }

    /// Serialized text content of a subtree: text nodes concatenated (markup
    /// ignored, nested text kept), predefined entities resolved, trimmed.
    pub fn rendered_text(&self, root: NodeId) -> String {
        let mut out = String::new();
        let own = match self.get(root).map(|n| &n.data) {
            Some(NodeData::Text(t)) => Some(t.as_str()),
            _ => None,
        };
        if let Some(t) = own {
            out.push_str(t);
        }
        for id in self.descendants(root) {
            match self.get(id).map(|n| &n.data) {
                Some(NodeData::Text(t)) => out.push_str(t),
                Some(NodeData::EntityRef(name)) => out.push_str(resolve_entity(name)),
                _ => {}
            }
        }
        out.trim().to_string()
    }
}

impl Default for PageDom {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve predefined XML entities; unknown entities render as nothing.
fn resolve_entity(name: &str) -> &'static str {
    match name {
        "apos" => "'",
        "quot" => "\"",
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "nbsp" => "\u{a0}",
        _ => "",
    }
}

/// Iterator over direct children.
pub struct ChildrenIter<'a> {
    dom: &'a PageDom,
    current: NodeId,
}

impl<'a> Iterator for ChildrenIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Depth-first iterator over a subtree, in document order.
pub struct DescendantsIter<'a> {
    dom: &'a PageDom,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DescendantsIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let mut children: Vec<_> = self.dom.children(id).collect();
        children.reverse();
        self.stack.extend(children);
        Some(id)
    }
}

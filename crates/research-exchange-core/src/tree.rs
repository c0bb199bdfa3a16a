//! Content-tree abstraction consumed by the entry extractor.
//!
//! The extractor never touches HTML directly. It works through the
//! [`ContentTree`] trait, which exposes the handful of DOM-like queries it
//! needs: select by [`Predicate`], find the nearest identified ancestor,
//! read attributes and text, and write a synthesized id back.
//!
//! [`DocumentTree`] is the arena-backed in-memory implementation. The
//! application crate converts parsed HTML into one; tests build fixtures
//! with [`DocumentTree::append_element`] and [`DocumentTree::append_text`].

/// Element filter used by [`ContentTree::select_all`] and
/// [`ContentTree::select_first`].
#[derive(Debug, Clone, Copy)]
pub enum Predicate<'a> {
    /// Element whose `class` list contains this class.
    Class(&'a str),
    /// Element with this tag name (ASCII case-insensitive).
    Tag(&'a str),
    /// Element carrying this attribute, with any value.
    HasAttribute(&'a str),
    /// Element whose attribute value contains the given substring.
    AttributeContains(&'a str, &'a str),
    /// Every inner predicate matches.
    All(&'a [Predicate<'a>]),
}

impl Predicate<'_> {
    /// Evaluate against an element's tag and attribute list.
    pub fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        let attr = |name: &str| {
            attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        };
        match self {
            Predicate::Class(class) => attr("class")
                .map(|v| v.split_whitespace().any(|c| c == *class))
                .unwrap_or(false),
            Predicate::Tag(name) => tag.eq_ignore_ascii_case(name),
            Predicate::HasAttribute(name) => attr(*name).is_some(),
            Predicate::AttributeContains(name, needle) => {
                attr(*name).map(|v| v.contains(*needle)).unwrap_or(false)
            }
            Predicate::All(inner) => inner.iter().all(|p| p.matches(tag, attrs)),
        }
    }
}

/// DOM-like read access (plus id write-back) over rendered content.
///
/// Node handles are cheap `Copy` values that stay valid for the lifetime of
/// the tree. All selection methods return elements only, in document order.
pub trait ContentTree {
    type Node: Copy + Eq + std::fmt::Debug;

    /// All elements in the document matching `predicate`.
    fn select_all(&self, predicate: &Predicate<'_>) -> Vec<Self::Node>;

    /// All descendants of `scope` (excluding `scope`) matching `predicate`.
    fn select_within(&self, scope: Self::Node, predicate: &Predicate<'_>) -> Vec<Self::Node>;

    /// First descendant of `scope` (excluding `scope`) matching `predicate`.
    fn select_first(&self, scope: Self::Node, predicate: &Predicate<'_>) -> Option<Self::Node>;

    /// Nearest strict ancestor carrying a non-empty `id` attribute.
    fn closest_with_id(&self, node: Self::Node) -> Option<Self::Node>;

    /// First element whose `id` attribute equals `id`.
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Concatenated text of all descendant text nodes.
    fn text(&self, node: Self::Node) -> String;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);
}

/// Handle to a node in a [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed in-memory document.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<Node>,
}

impl DocumentTree {
    /// An empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append an element as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.push(
            parent,
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
            },
        )
    }

    /// Append a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeData::Text(text.to_string()))
    }

    /// Number of nodes, including the root and text nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn element(&self, node: NodeId) -> Option<(&str, &[(String, String)])> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, attrs } => Some((tag.as_str(), attrs.as_slice())),
            _ => None,
        }
    }

    /// Pre-order traversal of the descendants of `scope`, excluding `scope`.
    fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.nodes[scope.0].children.clone();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    fn matching<'t>(
        &'t self,
        scope: NodeId,
        predicate: &'t Predicate<'t>,
    ) -> impl Iterator<Item = NodeId> + 't {
        self.descendants(scope).filter(move |&n| {
            self.element(n)
                .map(|(tag, attrs)| predicate.matches(tag, attrs))
                .unwrap_or(false)
        })
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

struct Descendants<'t> {
    tree: &'t DocumentTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.nodes[node.0].children.iter().rev().copied());
        Some(node)
    }
}

impl ContentTree for DocumentTree {
    type Node = NodeId;

    fn select_all(&self, predicate: &Predicate<'_>) -> Vec<NodeId> {
        self.matching(self.root(), predicate).collect()
    }

    fn select_within(&self, scope: NodeId, predicate: &Predicate<'_>) -> Vec<NodeId> {
        self.matching(scope, predicate).collect()
    }

    fn select_first(&self, scope: NodeId, predicate: &Predicate<'_>) -> Option<NodeId> {
        self.matching(scope, predicate).next()
    }

    fn closest_with_id(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[node.0].parent;
        while let Some(n) = current {
            if self.attribute(n, "id").is_some_and(|id| !id.is_empty()) {
                return Some(n);
            }
            current = self.nodes[n.0].parent;
        }
        None
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&n| self.attribute(n, "id") == Some(id))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        let (_, attrs) = self.element(node)?;
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let NodeData::Text(t) = &self.nodes[node.0].data {
            out.push_str(t);
        }
        for n in self.descendants(node) {
            if let NodeData::Text(t) = &self.nodes[n.0].data {
                out.push_str(t);
            }
        }
        out
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DocumentTree, NodeId, NodeId, NodeId) {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let section = tree.append_element(root, "section", &[("id", "topic-a")]);
        let wrapper = tree.append_element(section, "div", &[("class", "list")]);
        let entry = tree.append_element(wrapper, "div", &[("class", "bib-entry featured")]);
        let p = tree.append_element(entry, "p", &[("class", "bib-citation")]);
        tree.append_text(p, "Hello ");
        let em = tree.append_element(p, "em", &[]);
        tree.append_text(em, "world");
        (tree, section, entry, p)
    }

    #[test]
    fn test_class_predicate_matches_any_class_in_list() {
        let (tree, _, entry, _) = sample();
        assert_eq!(tree.select_all(&Predicate::Class("featured")), vec![entry]);
        assert_eq!(tree.select_all(&Predicate::Class("bib-entry")), vec![entry]);
        assert!(tree.select_all(&Predicate::Class("bib")).is_empty());
    }

    #[test]
    fn test_text_concatenates_descendants() {
        let (tree, _, entry, p) = sample();
        assert_eq!(tree.text(p), "Hello world");
        assert_eq!(tree.text(entry), "Hello world");
    }

    #[test]
    fn test_closest_with_id_skips_self() {
        let (mut tree, section, entry, _) = sample();
        tree.set_attribute(entry, "id", "entry-0");
        assert_eq!(tree.closest_with_id(entry), Some(section));
        assert_eq!(tree.closest_with_id(section), None);
    }

    #[test]
    fn test_select_first_excludes_scope() {
        let (tree, section, entry, p) = sample();
        assert_eq!(tree.select_within(section, &Predicate::Tag("div")).len(), 2);
        assert_eq!(tree.select_first(entry, &Predicate::Tag("P")), Some(p));
        assert_eq!(tree.select_first(p, &Predicate::Tag("p")), None);
    }

    #[test]
    fn test_all_predicate() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        tree.append_element(root, "div", &[("class", "subtopic-card")]);
        let b = tree.append_element(
            root,
            "div",
            &[("class", "subtopic-card"), ("onclick", "go()")],
        );
        let found = tree.select_all(&Predicate::All(&[
            Predicate::Class("subtopic-card"),
            Predicate::HasAttribute("onclick"),
        ]));
        assert_eq!(found, vec![b]);
    }

    #[test]
    fn test_set_attribute_overwrites() {
        let (mut tree, section, _, _) = sample();
        tree.set_attribute(section, "id", "topic-b");
        assert_eq!(tree.attribute(section, "id"), Some("topic-b"));
        assert_eq!(tree.element_by_id("topic-b"), Some(section));
        assert_eq!(tree.element_by_id("topic-a"), None);
    }

    #[test]
    fn test_document_order() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let outer = tree.append_element(root, "div", &[("class", "x")]);
        let inner = tree.append_element(outer, "div", &[("class", "x")]);
        let sibling = tree.append_element(root, "div", &[("class", "x")]);
        assert_eq!(
            tree.select_all(&Predicate::Class("x")),
            vec![outer, inner, sibling]
        );
    }
}

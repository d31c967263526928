//! DOM Tree (arena-based allocation)

use crate::{DomError, ElementData, Node, NodeId, SelectorList, TokenList};

/// Arena-based element tree
///
/// Node 0 is the document; a fresh tree also carries an `html` document
/// element directly under it. Removed nodes are only detached, their IDs
/// stay valid for the lifetime of the tree.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    document_element: NodeId,
}

impl DomTree {
    /// Create a tree holding a document and its `html` element
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: vec![Node::document()],
            document_element: NodeId::NONE,
        };
        let html = tree.create_element("html");
        tree.append_child(NodeId::ROOT, html);
        tree.document_element = html;
        tree
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The `html` element
    #[inline]
    pub fn document_element(&self) -> NodeId {
        self.document_element
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena (detached ones included)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Element data for a node, `None` for the document or unknown IDs
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        self.get_mut(id)
            .and_then(Node::as_element_mut)
            .ok_or(DomError::UnknownNode(id))
    }

    /// Tag name of an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    // === Structure ===

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::element(tag));
        id
    }

    /// Create an element with attributes and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        if let Ok(element) = self.element_mut(id) {
            for (name, value) in attrs {
                element.attrs.set(name, *value);
            }
        }
        self.append_child(parent, id);
        id
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.get(parent).is_none() || self.get(child).is_none() {
            tracing::warn!("append_child: unknown node {} or {}", parent, child);
            return;
        }
        if child == parent || self.contains(child, parent) || child == NodeId::ROOT {
            tracing::warn!("append_child: {} cannot be moved under {}", child, parent);
            return;
        }

        self.remove(child);

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = last;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
    }

    /// Detach a node (with its subtree) from its parent
    pub fn remove(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Iterate over direct children
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        std::iter::successors(Some(first).filter(|c| c.is_valid()), move |&c| {
            Some(self.nodes[c.index()].next_sibling).filter(|n| n.is_valid())
        })
    }

    /// Iterate over ancestors, nearest first, excluding the node itself
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Iterate over descendants in document order, excluding the node itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Descendants {
            tree: self,
            scope: id,
            next,
        }
    }

    /// Check whether `node` lies strictly inside `ancestor`
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    // === Attributes ===

    /// Get an attribute value
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attrs.get(name))
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.attrs.set(name, value);
        Ok(())
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).ok()?.attrs.remove(name)
    }

    /// Check if attribute exists
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.attrs.contains(name))
    }

    /// Find a connected element by its `id` attribute
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(NodeId::ROOT)
            .find(|&n| self.element(n).and_then(ElementData::id) == Some(id))
    }

    // === Classes ===

    /// Parsed class list of a node
    pub fn class_list(&self, id: NodeId) -> TokenList {
        TokenList::from_string(self.get_attribute(id, "class").unwrap_or_default())
    }

    /// Apply `f` to the class list of a node and write it back
    pub fn update_class_list<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut TokenList) -> R,
    ) -> Result<R, DomError> {
        let mut list = self.class_list(id);
        let result = f(&mut list);
        self.element_mut(id)?.attrs.set("class", list.value());
        Ok(result)
    }

    /// Check for a class token
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    // === Selectors ===

    /// Check if a node matches a parsed selector
    pub fn matches(&self, id: NodeId, selector: &SelectorList) -> bool {
        selector.matches(self, id)
    }

    /// Parse `selector` and check if a node matches it
    pub fn matches_str(&self, id: NodeId, selector: &str) -> Result<bool, DomError> {
        Ok(SelectorList::parse(selector)?.matches(self, id))
    }

    /// All descendants of `scope` matching `selector`, in document order
    pub fn query_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&n| selector.matches(self, n))
            .collect()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator over a subtree
#[derive(Debug)]
pub struct Descendants<'a> {
    tree: &'a DomTree,
    scope: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next;
        if !current.is_valid() {
            return None;
        }

        let node = &self.tree.nodes[current.index()];
        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            // Climb until a node with a next sibling, stopping at the scope
            let mut cursor = current;
            loop {
                if cursor == self.scope {
                    break NodeId::NONE;
                }
                let n = &self.tree.nodes[cursor.index()];
                if n.next_sibling.is_valid() {
                    break n.next_sibling;
                }
                if !n.parent.is_valid() || n.parent == self.scope {
                    break NodeId::NONE;
                }
                cursor = n.parent;
            }
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let body = tree.append_element(tree.document_element(), "body", &[]);
        let div = tree.append_element(body, "div", &[("id", "main")]);
        let span = tree.append_element(div, "span", &[]);
        let p = tree.append_element(body, "p", &[]);
        (tree, body, div, span, p)
    }

    #[test]
    fn test_new_tree_has_document_element() {
        let tree = DomTree::new();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.tag(tree.document_element()), Some("html"));
        assert_eq!(tree.parent(tree.document_element()), Some(tree.root()));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (tree, body, div, span, p) = sample();
        let all: Vec<_> = tree.descendants(body).collect();
        assert_eq!(all, vec![div, span, p]);

        let inner: Vec<_> = tree.descendants(div).collect();
        assert_eq!(inner, vec![span]);
    }

    #[test]
    fn test_contains_is_strict() {
        let (tree, body, div, span, _) = sample();
        assert!(tree.contains(body, span));
        assert!(tree.contains(div, span));
        assert!(!tree.contains(span, span));
        assert!(!tree.contains(span, div));
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let (mut tree, body, div, span, p) = sample();
        tree.remove(div);

        let children: Vec<_> = tree.children(body).collect();
        assert_eq!(children, vec![p]);
        assert_eq!(tree.parent(div), None);
        assert_eq!(tree.parent(span), Some(div));
        assert_eq!(tree.get_element_by_id("main"), None);
    }

    #[test]
    fn test_append_child_moves_node() {
        let (mut tree, body, div, _, p) = sample();
        tree.append_child(p, div);

        assert_eq!(tree.parent(div), Some(p));
        let children: Vec<_> = tree.children(body).collect();
        assert_eq!(children, vec![p]);
    }

    #[test]
    fn test_append_child_rejects_cycles() {
        let (mut tree, _, div, span, _) = sample();
        tree.append_child(span, div);
        assert_eq!(tree.parent(span), Some(div));
    }

    #[test]
    fn test_class_list_update() {
        let (mut tree, _, div, _, _) = sample();
        tree.update_class_list(div, |c| c.add("active")).unwrap();
        assert!(tree.has_class(div, "active"));
        assert_eq!(tree.get_attribute(div, "class"), Some("active"));
    }

    #[test]
    fn test_set_attribute_on_document_fails() {
        let mut tree = DomTree::new();
        let root = tree.root();
        assert_eq!(
            tree.set_attribute(root, "id", "x"),
            Err(DomError::UnknownNode(root))
        );
    }
}

use crate::error::{DomError, DomResult};
use crate::provenance::Provenance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside a [`Tree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// Ordered attribute list. Lookups are linear; elements rarely carry more
/// than a handful of attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Set an attribute, keeping its original position when it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|(key, value)| keep(key, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Order-insensitive comparison that skips the `ignored` names on both sides
    pub fn same_set(&self, other: &Attributes, ignored: &[String]) -> bool {
        fn relevant<'x>(attrs: &'x Attributes, ignored: &[String]) -> Vec<(&'x str, &'x str)> {
            let mut pairs: Vec<_> = attrs
                .iter()
                .filter(|(k, _)| !ignored.iter().any(|i| i == k))
                .collect();
            pairs.sort_unstable();
            pairs
        }
        relevant(self, ignored) == relevant(other, ignored)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element { name: String, attrs: Attributes },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub provenance: Option<Provenance>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            provenance: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
        }
    }
}

/// Arena-backed document tree.
///
/// Nodes are never freed: detaching a subtree leaves its nodes in the arena,
/// unreachable from the root. Cloning a tree keeps every `NodeId` valid in
/// the copy, which is what lets an edited clone be diffed against its origin.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Create a tree holding a single root element
    pub fn new(root_name: &str) -> Self {
        let root = Node::new(NodeData::Element {
            name: root_name.to_string(),
            attrs: Attributes::new(),
        });
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Promote a detached element to be the document root
    pub fn set_root(&mut self, id: NodeId) -> DomResult<()> {
        self.check(id)?;
        self.detach(id);
        self.root = id;
        Ok(())
    }

    /// Number of arena slots, including detached nodes
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn check(&self, id: NodeId) -> DomResult<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::unknown_node(id))
        }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_string(),
            attrs: Attributes::new(),
        })
    }

    pub fn create_element_with(&mut self, name: &str, attrs: Attributes) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_string(),
            attrs,
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    // Structure

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.previous_sibling(id);
        while let Some(sib) = cur {
            if self.is_element(sib) {
                return Some(sib);
            }
            cur = self.previous_sibling(sib);
        }
        None
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(sib) = cur {
            if self.is_element(sib) {
                return Some(sib);
            }
            cur = self.next_sibling(sib);
        }
        None
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Pre-order traversal of `id` and everything below it
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Whether `id` is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    // Mutation

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Insert `child` before `reference`, which must be a child of `parent`
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> DomResult<()> {
        self.check(child)?;
        self.detach(child);
        let pos = self
            .children(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or_else(|| DomError::not_a_child(reference, parent))?;
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(pos, child);
        Ok(())
    }

    /// Unlink a node from its parent. The subtree stays intact in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Replace `id` with its own children, in place
    pub fn unwrap_node(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let Some(pos) = self.index_in_parent(id) else {
            return;
        };
        let children = std::mem::take(&mut self.node_mut(id).children);
        for &child in &children {
            self.node_mut(child).parent = Some(parent);
        }
        let siblings = &mut self.node_mut(parent).children;
        let _removed: Vec<NodeId> = siblings.splice(pos..pos + 1, children).collect();
        self.node_mut(id).parent = None;
    }

    /// Move every child of `from` to the end of `to`
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.node_mut(from).children);
        for &child in &children {
            self.node_mut(child).parent = Some(to);
        }
        self.node_mut(to).children.extend(children);
    }

    // Accessors

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Comment(_))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    /// Text or comment content
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t),
            NodeData::Element { .. } => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        match &mut self.node_mut(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => *t = value.into(),
            NodeData::Element { .. } => {}
        }
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        match &self.node(id).data {
            NodeData::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Attributes> {
        match &mut self.node_mut(id).data {
            NodeData::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id).and_then(|a| a.get(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> DomResult<()> {
        match self.attrs_mut(id) {
            Some(attrs) => {
                attrs.set(name, value);
                Ok(())
            }
            None => Err(DomError::not_an_element(id)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.attrs_mut(id).and_then(|a| a.remove(name))
    }

    pub fn provenance(&self, id: NodeId) -> Option<&Provenance> {
        self.node(id).provenance.as_ref()
    }

    pub fn set_provenance(&mut self, id: NodeId, provenance: Provenance) {
        self.node_mut(id).provenance = Some(provenance);
    }

    /// Concatenated text of every text node below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter(|&n| self.is_text(n))
            .filter_map(|n| self.text(n))
            .collect()
    }

    // Copying

    /// Copy the subtree at `id` in `source` into this arena, detached
    pub fn import_subtree(&mut self, source: &Tree, id: NodeId) -> NodeId {
        let src = source.node(id);
        let copy = self.push(src.data.clone());
        self.node_mut(copy).provenance = src.provenance.clone();
        for &child in &src.children {
            let child_copy = self.import_subtree(source, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// A fresh compact tree rooted at a copy of `id`.
    /// Node ids are renumbered in pre-order.
    pub fn subtree(&self, id: NodeId) -> Tree {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = tree.import_subtree(self, id);
        tree.root = root;
        tree
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let p = tree.create_element("p");
        let a = tree.create_text("a");
        let b = tree.create_text("b");
        tree.append_child(root, p);
        tree.append_child(p, a);
        tree.append_child(p, b);
        (tree, p, a, b)
    }

    #[test]
    fn test_siblings_and_parents() {
        let (tree, p, a, b) = sample();
        assert_eq!(tree.parent(a), Some(p));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.previous_sibling(b), Some(a));
        assert_eq!(tree.previous_sibling(a), None);
        assert_eq!(tree.ancestors(a).collect::<Vec<_>>(), vec![p, tree.root()]);
    }

    #[test]
    fn test_insert_before_and_detach() {
        let (mut tree, p, a, b) = sample();
        let c = tree.create_comment("x");
        tree.insert_before(p, c, b).unwrap();
        assert_eq!(tree.children(p), &[a, c, b]);

        tree.detach(a);
        assert_eq!(tree.children(p), &[c, b]);
        assert!(!tree.is_attached(a));
        assert!(tree.is_attached(b));
    }

    #[test]
    fn test_insert_before_rejects_foreign_reference() {
        let (mut tree, p, _, _) = sample();
        let orphan = tree.create_text("o");
        let other = tree.create_text("z");
        assert!(tree.insert_before(p, other, orphan).is_err());
    }

    #[test]
    fn test_unwrap_node_splices_children() {
        let mut tree = Tree::new("body");
        let root = tree.root();
        let span = tree.create_element("span");
        let x = tree.create_text("x");
        let y = tree.create_text("y");
        let tail = tree.create_text("!");
        tree.append_child(root, span);
        tree.append_child(root, tail);
        tree.append_child(span, x);
        tree.append_child(span, y);

        tree.unwrap_node(span);
        assert_eq!(tree.children(root), &[x, y, tail]);
        assert_eq!(tree.parent(x), Some(root));
    }

    #[test]
    fn test_clone_keeps_ids() {
        let (tree, p, a, _) = sample();
        let mut copy = tree.clone();
        copy.set_text(a, "changed");
        assert_eq!(tree.text(a), Some("a"));
        assert_eq!(copy.text(a), Some("changed"));
        assert_eq!(copy.parent(a), Some(p));
    }

    #[test]
    fn test_subtree_renumbers() {
        let (tree, p, _, _) = sample();
        let sub = tree.subtree(p);
        assert_eq!(sub.tag_name(sub.root()), Some("p"));
        assert_eq!(sub.text_content(sub.root()), "ab");
        assert_eq!(sub.capacity(), 3);
    }

    #[test]
    fn test_attributes_same_set_ignores_order() {
        let a: Attributes = [("href", "x"), ("about", "#mwt1")].into_iter().collect();
        let b: Attributes = [("about", "#mwt9"), ("href", "x")].into_iter().collect();
        assert!(!a.same_set(&b, &[]));
        assert!(a.same_set(&b, &["about".to_string()]));
    }
}

use crate::tree::{NodeData, NodeId, NodeKind, Tree};

/// Visitor pattern for traversing a tree immutably
///
/// Default implementations walk the entire subtree. Override specific
/// visit_* methods to act on nodes; call the matching walk_* function to
/// keep descending.
pub trait Visitor: Sized {
    fn visit_node(&mut self, tree: &Tree, id: NodeId) {
        walk_node(self, tree, id);
    }

    fn visit_element(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
    }

    fn visit_text(&mut self, _tree: &Tree, _id: NodeId, _text: &str) {
        // Leaf node, no children to walk
    }

    fn visit_comment(&mut self, _tree: &Tree, _id: NodeId, _text: &str) {
        // Leaf node, no children to walk
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, tree: &Tree, id: NodeId) {
    match &tree.node(id).data {
        NodeData::Element { .. } => visitor.visit_element(tree, id),
        NodeData::Text(text) => visitor.visit_text(tree, id, text),
        NodeData::Comment(text) => visitor.visit_comment(tree, id, text),
    }
}

pub fn walk_children<V: Visitor>(visitor: &mut V, tree: &Tree, id: NodeId) {
    for &child in tree.children(id) {
        visitor.visit_node(tree, child);
    }
}

/// Mutable visitor for transforming a tree in place
///
/// Children are snapshotted before walking, so a visit may detach, unwrap or
/// insert siblings of the node it is visiting.
pub trait VisitorMut: Sized {
    fn visit_node_mut(&mut self, tree: &mut Tree, id: NodeId) {
        walk_node_mut(self, tree, id);
    }

    fn visit_element_mut(&mut self, tree: &mut Tree, id: NodeId) {
        walk_children_mut(self, tree, id);
    }

    fn visit_text_mut(&mut self, _tree: &mut Tree, _id: NodeId) {
        // Leaf node, no children to walk
    }

    fn visit_comment_mut(&mut self, _tree: &mut Tree, _id: NodeId) {
        // Leaf node, no children to walk
    }
}

pub fn walk_node_mut<V: VisitorMut>(visitor: &mut V, tree: &mut Tree, id: NodeId) {
    match tree.kind(id) {
        NodeKind::Element => visitor.visit_element_mut(tree, id),
        NodeKind::Text => visitor.visit_text_mut(tree, id),
        NodeKind::Comment => visitor.visit_comment_mut(tree, id),
    }
}

pub fn walk_children_mut<V: VisitorMut>(visitor: &mut V, tree: &mut Tree, id: NodeId) {
    let children = tree.children(id).to_vec();
    for child in children {
        visitor.visit_node_mut(tree, child);
    }
}

//! Grouping of siblings into diff units
//!
//! Template and extension output can span several sibling nodes sharing one
//! grouping id. Such a run is compared, marked and serialized as one unit;
//! every other node is a unit on its own.

use crate::signature::{combine, Signature, Signatures};
use selser_dom::{NodeId, SelserConfig, Tree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Member nodes in sibling order, never empty
    pub nodes: Vec<NodeId>,
    pub signature: Signature,
    pub atomic: bool,
    /// Grouping id of an atomic unit
    pub about: Option<String>,
}

impl Unit {
    pub fn first(&self) -> NodeId {
        self.nodes[0]
    }
}

/// Whether `id` starts an atomic unit: template/extension output or a media
/// wrapper
pub fn is_atomic(tree: &Tree, id: NodeId, config: &SelserConfig) -> bool {
    tree.attr(id, "typeof")
        .map_or(false, |t| config.is_atomic_typeof(t))
}

/// Sibling runs of `parent` before signatures are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub nodes: Vec<NodeId>,
    pub atomic: bool,
    pub about: Option<String>,
}

pub fn group_children(tree: &Tree, parent: NodeId, config: &SelserConfig) -> Vec<Group> {
    let children = tree.children(parent);
    let mut groups = Vec::new();
    let mut i = 0;

    while i < children.len() {
        let first = children[i];
        let atomic = is_atomic(tree, first, config);
        let about = if atomic {
            tree.attr(first, &config.grouping_attribute).map(str::to_string)
        } else {
            None
        };

        let mut nodes = vec![first];
        if let Some(about) = &about {
            while let Some(&next) = children.get(i + nodes.len()) {
                if tree.attr(next, &config.grouping_attribute) != Some(about.as_str()) {
                    break;
                }
                nodes.push(next);
            }
        }
        i += nodes.len();
        groups.push(Group { nodes, atomic, about });
    }

    groups
}

/// Split the children of `parent` into units
pub fn units(tree: &Tree, parent: NodeId, signatures: &Signatures, config: &SelserConfig) -> Vec<Unit> {
    group_children(tree, parent, config)
        .into_iter()
        .map(|group| {
            let signature = match group.nodes.as_slice() {
                [only] => signatures.get(*only),
                many => combine(many.iter().map(|&id| signatures.get(id))),
            };
            Unit {
                nodes: group.nodes,
                signature,
                atomic: group.atomic,
                about: group.about,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use selser_dom::Attributes;

    #[test]
    fn test_about_siblings_form_one_unit() {
        let config = SelserConfig::default();
        let mut tree = Tree::new("body");
        let root = tree.root();
        let make = |tree: &mut Tree, attrs: &[(&str, &str)]| {
            let id = tree.create_element_with("span", attrs.iter().copied().collect::<Attributes>());
            tree.append_child(root, id);
            id
        };
        let a = make(&mut tree, &[("typeof", "mw:Transclusion"), ("about", "#mwt1")]);
        let b = make(&mut tree, &[("about", "#mwt1")]);
        let c = make(&mut tree, &[("about", "#mwt2")]);
        let d = make(&mut tree, &[("typeof", "mw:Image")]);

        let signatures = Signatures::compute(&tree, &config);
        let units = units(&tree, root, &signatures, &config);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].nodes, vec![a, b]);
        assert!(units[0].atomic);
        assert_eq!(units[0].about.as_deref(), Some("#mwt1"));
        assert_eq!(units[1].nodes, vec![c]);
        assert!(!units[1].atomic);
        assert_eq!(units[2].nodes, vec![d]);
        assert!(units[2].atomic);
        assert_eq!(units[2].about, None);
    }
}

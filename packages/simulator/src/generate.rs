//! Random change tree generation

use crate::alea::Alea;
use crate::change_tree::{has_change_markers, ChangeList, ChangeTree};
use selser_dom::{NodeId, SelserConfig, Tree};
use selser_engine::units::group_children;
use std::collections::HashSet;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Change(ChangeList),
    /// Every attempt produced a no-op or an already tested tree
    Unavailable { attempts: usize },
}

pub struct ChangeGenerator<'c> {
    config: &'c SelserConfig,
    alea: Alea,
}

impl<'c> ChangeGenerator<'c> {
    /// `seed` should identify the test case, so reruns produce the same trees
    pub fn new(config: &'c SelserConfig, seed: &str) -> Self {
        Self {
            config,
            alea: Alea::new(seed),
        }
    }

    /// A change tree for `tree` that is neither a no-op nor in `previous`
    pub fn generate(&mut self, tree: &Tree, previous: &[ChangeList]) -> Generated {
        let budget = self.config.change_retry_budget;
        for attempt in 1..=budget {
            let changes = self.changes_for(tree, tree.root());
            if changes.is_empty() {
                trace!(attempt, "generated a no-op change tree");
                continue;
            }
            if previous.contains(&changes) {
                trace!(attempt, "generated a duplicate change tree");
                continue;
            }
            debug!(attempt, "generated change tree");
            return Generated::Change(changes);
        }

        debug!(attempts = budget, "could not produce a unique change");
        Generated::Unavailable { attempts: budget }
    }

    fn changes_for(&mut self, tree: &Tree, node: NodeId) -> ChangeList {
        let encapsulated: HashSet<NodeId> = group_children(tree, node, self.config)
            .into_iter()
            .filter(|group| {
                tree.attr(group.nodes[0], "typeof")
                    .map_or(false, |t| self.config.is_encapsulation_typeof(t))
            })
            .flat_map(|group| group.nodes)
            .collect();

        let mut changes = Vec::with_capacity(tree.children(node).len());
        for &child in tree.children(node) {
            let mut change = ChangeTree::Code(0);

            if !encapsulated.contains(&child) && self.subtree_is_editable(tree, child) {
                if self.is_uneditable(tree, child) || self.alea.random() < 0.5 {
                    // Keeps sequences aligned with other generators
                    self.alea.uint32();
                    change = ChangeTree::Nested(self.changes_for(tree, child));
                } else if tree.is_element(child) {
                    change = ChangeTree::Code((self.alea.random() * 4.0).floor() as u8 + 1);
                } else {
                    // Text and comments cannot carry attributes
                    change = ChangeTree::Code((self.alea.random() * 3.0).floor() as u8 + 2);
                }
            }

            changes.push(change);
        }

        if has_change_markers(&changes) {
            changes
        } else {
            Vec::new()
        }
    }

    /// False when nothing below `id` may be touched: entity wrappers and
    /// classes such as reference lists
    fn subtree_is_editable(&self, tree: &Tree, id: NodeId) -> bool {
        if !tree.is_element(id) {
            return true;
        }
        if tree.attr(id, "typeof").map_or(false, |t| self.config.is_entity_typeof(t)) {
            return false;
        }
        let classes = tree.attr(id, "class").unwrap_or_default();
        !classes
            .split_whitespace()
            .any(|class| self.config.non_editable_classes.iter().any(|c| c == class))
    }

    /// Media wrappers and everything inside them except captions can only be
    /// descended into
    fn is_uneditable(&self, tree: &Tree, id: NodeId) -> bool {
        if !tree.is_element(id) {
            return false;
        }
        if tree.attr(id, "property").map_or(false, |p| p.contains("mw:objectAttr")) {
            return true;
        }
        if tree.attr(id, "typeof").map_or(false, |t| {
            self.config.is_media_typeof(t) || self.config.is_entity_typeof(t)
        }) {
            return true;
        }
        match tree.parent(id) {
            Some(parent) if !tree.is_tag(id, "figcaption") && parent != tree.root() => {
                self.is_uneditable(tree, parent)
            }
            _ => false,
        }
    }
}

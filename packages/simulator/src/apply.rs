//! Applying a change tree to a document

use crate::alea::Alea;
use crate::change_tree::{is_root_comment, ChangeKind, ChangeTree};
use crate::error::{SimulatorError, SimulatorResult};
use selser_dom::{NodeId, SelserConfig, Tree};
use tracing::trace;

/// Content of the comment appended by the root-level edit
pub const ROOT_COMMENT: &str = "ahseeyooxooZ8Oon0boh";

/// Parents whose direct text content would be fostered out of a table
const FOSTERING_PARENTS: &[&str] = &["table", "tbody", "thead", "tfoot"];

pub struct ChangeApplier<'c> {
    config: &'c SelserConfig,
    alea: Alea,
}

impl<'c> ChangeApplier<'c> {
    /// `seed` should match the one the change tree was generated with
    pub fn new(config: &'c SelserConfig, seed: &str) -> Self {
        Self {
            config,
            alea: Alea::new(seed),
        }
    }

    /// Apply `changes` to the children of the root of `tree`
    pub fn apply(&mut self, tree: &mut Tree, changes: &[ChangeTree]) -> SimulatorResult<()> {
        let root = tree.root();
        if is_root_comment(changes) {
            let comment = tree.create_comment(ROOT_COMMENT);
            tree.append_child(root, comment);
            return Ok(());
        }
        self.apply_to_children(tree, root, changes)
    }

    fn apply_to_children(&mut self, tree: &mut Tree, node: NodeId, changes: &[ChangeTree]) -> SimulatorResult<()> {
        // Mutations below shift sibling positions
        let children = tree.children(node).to_vec();

        for (index, change) in changes.iter().enumerate() {
            let child = *children
                .get(index)
                .ok_or_else(|| SimulatorError::missing_node(node, index))?;

            let code = match change {
                ChangeTree::Nested(nested) => {
                    self.apply_to_children(tree, child, nested)?;
                    continue;
                }
                ChangeTree::Code(code) => *code,
            };

            match ChangeKind::from_code(code) {
                Some(ChangeKind::None) => {}
                Some(ChangeKind::ModifyAttribute) => {
                    if !tree.is_element(child) {
                        return Err(SimulatorError::NotAnElement { node: child, code });
                    }
                    let value = self.alea.token();
                    tree.set_attr(child, &self.config.synthetic_attribute, value)?;
                }
                Some(ChangeKind::InsertBefore) => self.insert_before(tree, child)?,
                Some(ChangeKind::Delete) => tree.detach(child),
                Some(ChangeKind::Replace) => {
                    self.insert_before(tree, child)?;
                    tree.detach(child);
                }
                Some(ChangeKind::RootComment) | None => return Err(SimulatorError::UnknownCode(code)),
            }
            trace!(node = %child, code, "applied change");
        }

        Ok(())
    }

    /// Insert a fresh node before `reference`, wrapped so the surrounding
    /// structure stays valid
    fn insert_before(&mut self, tree: &mut Tree, reference: NodeId) -> SimulatorResult<()> {
        let Some(parent) = tree.parent(reference) else {
            return Ok(());
        };
        let text = self.alea.token();
        let parent_tag = tree.tag_name(parent).unwrap_or_default().to_string();

        let wrapper = if parent == tree.root() {
            Some("p".to_string())
        } else {
            match parent_tag.as_str() {
                "ol" | "ul" => Some("li".to_string()),
                "dl" => Some("dd".to_string()),
                "tr" => Some(
                    tree.previous_element_sibling(reference)
                        .or_else(|| tree.next_element_sibling(reference))
                        .and_then(|cell| tree.tag_name(cell))
                        .unwrap_or("td")
                        .to_string(),
                ),
                _ if tree.tag_name(reference).map_or(false, |t| self.config.is_block_tag(t)) => {
                    Some("p".to_string())
                }
                _ => None,
            }
        };

        let node = if FOSTERING_PARENTS.contains(&parent_tag.as_str()) {
            tree.create_comment(text)
        } else if let Some(wrapper) = wrapper {
            let element = tree.create_element(&wrapper);
            let content = tree.create_text(text);
            tree.append_child(element, content);
            element
        } else {
            tree.create_text(text)
        };

        tree.insert_before(parent, node, reference)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selser_dom::{inner_html, HtmlOptions};
    use selser_markup::parse;

    fn apply(source: &str, changes: &str) -> String {
        let mut tree = parse(source).unwrap();
        let changes: Vec<ChangeTree> = serde_json::from_str(changes).unwrap();
        let config = SelserConfig::default();
        ChangeApplier::new(&config, "seed").apply(&mut tree, &changes).unwrap();
        inner_html(&tree, tree.root(), &HtmlOptions::default())
    }

    fn token(n: usize) -> String {
        let mut alea = Alea::new("seed");
        (0..n).map(|_| alea.token()).last().unwrap()
    }

    #[test]
    fn test_delete_and_attribute() {
        let html = apply("<p>a</p><p>b</p>", "[1,3]");
        assert_eq!(html, format!("<p data-foobar=\"{}\">a</p>", token(1)));
    }

    #[test]
    fn test_insert_at_root_wraps_in_paragraph() {
        let html = apply("<p>a</p>", "[2]");
        assert_eq!(html, format!("<p>{}</p><p>a</p>", token(1)));
    }

    #[test]
    fn test_list_items_get_list_item_wrappers() {
        let html = apply("<ul><li>a</li></ul>", "[[4]]");
        assert_eq!(html, format!("<ul><li>{}</li></ul>", token(1)));
    }

    #[test]
    fn test_table_cells_match_their_siblings() {
        let html = apply("<table><tr><th>a</th><th>b</th></tr></table>", "[[[0,2]]]");
        assert_eq!(
            html,
            format!("<table><tr><th>a</th><th>{}</th><th>b</th></tr></table>", token(1))
        );
    }

    #[test]
    fn test_fosterable_position_gets_comment() {
        let html = apply("<table><tr><td>a</td></tr></table>", "[[2]]");
        assert_eq!(
            html,
            format!("<table><!--{}--><tr><td>a</td></tr></table>", token(1))
        );
    }

    #[test]
    fn test_inline_insert_is_bare_text() {
        let html = apply("<p>a<b>b</b></p>", "[[0,2]]");
        assert_eq!(html, format!("<p>a{}<b>b</b></p>", token(1)));
    }

    #[test]
    fn test_root_comment() {
        let html = apply("<p>a</p>", "[5]");
        assert_eq!(html, format!("<p>a</p><!--{}-->", ROOT_COMMENT));
    }

    #[test]
    fn test_invalid_trees_are_errors() {
        let config = SelserConfig::default();
        let mut tree = parse("text").unwrap();
        let mut applier = ChangeApplier::new(&config, "seed");

        let err = applier.apply(&mut tree, &[ChangeTree::Code(1)]).unwrap_err();
        assert!(matches!(err, SimulatorError::NotAnElement { code: 1, .. }));

        let err = applier
            .apply(&mut tree, &[ChangeTree::Code(0), ChangeTree::Code(3)])
            .unwrap_err();
        assert!(matches!(err, SimulatorError::MissingNode { index: 1, .. }));

        let err = applier.apply(&mut tree, &[ChangeTree::Code(9)]).unwrap_err();
        assert!(matches!(err, SimulatorError::UnknownCode(9)));
    }
}

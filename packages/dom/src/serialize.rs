use crate::tree::{NodeId, Tree};

/// Regenerates source markup for nodes that cannot be copied verbatim.
///
/// Implementations must be deterministic and must not depend on anything but
/// the tree and their own configuration.
pub trait NodeSerializer {
    /// Markup for `id` and its whole subtree
    fn serialize_node(&self, tree: &Tree, id: NodeId) -> String;

    /// Markup for a group of siblings forming one encapsulated unit.
    /// `ids` is never empty.
    fn serialize_unit(&self, tree: &Tree, ids: &[NodeId]) -> String {
        ids.iter().map(|&id| self.serialize_node(tree, id)).collect()
    }

    /// Opening markup for an element whose children are emitted separately.
    /// `None` when the element's form depends on its content and it can only
    /// be written whole.
    fn open_tag(&self, tree: &Tree, id: NodeId) -> Option<String>;

    /// Closing counterpart of [`NodeSerializer::open_tag`]
    fn close_tag(&self, tree: &Tree, id: NodeId) -> Option<String>;
}

/// Builds a provenance-carrying tree from source markup
pub trait SourceParser {
    type Error: std::error::Error + Send + Sync + 'static;

    fn parse_source(&self, source: &str) -> Result<Tree, Self::Error>;
}

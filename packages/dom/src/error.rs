use crate::tree::NodeId;
use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Unknown node {id}")]
    UnknownNode { id: NodeId },

    #[error("Node {id} is not an element")]
    NotAnElement { id: NodeId },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { child: NodeId, parent: NodeId },

    #[error("Invalid provenance record {record:?}: {source}")]
    InvalidProvenance {
        record: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomError {
    pub fn unknown_node(id: NodeId) -> Self {
        Self::UnknownNode { id }
    }

    pub fn not_an_element(id: NodeId) -> Self {
        Self::NotAnElement { id }
    }

    pub fn not_a_child(child: NodeId, parent: NodeId) -> Self {
        Self::NotAChild { child, parent }
    }

    pub fn invalid_provenance(record: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidProvenance {
            record: record.into(),
            source,
        }
    }
}

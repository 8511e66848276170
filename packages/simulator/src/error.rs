use selser_dom::{DomError, NodeId};
use selser_engine::EngineError;
use thiserror::Error;

pub type SimulatorResult<T> = Result<T, SimulatorError>;

#[derive(Error, Debug)]
pub enum SimulatorError {
    /// The change tree refers to a child the document does not have
    #[error("No child {index} under node {parent}; the document does not match the change tree")]
    MissingNode { parent: NodeId, index: usize },

    #[error("Change code {code} cannot be applied to non-element node {node}")]
    NotAnElement { node: NodeId, code: u8 },

    #[error("Unknown change code {0}")]
    UnknownCode(u8),

    #[error("Failed to parse {stage} source: {message}")]
    Parse { stage: &'static str, message: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl SimulatorError {
    pub fn missing_node(parent: NodeId, index: usize) -> Self {
        Self::MissingNode { parent, index }
    }

    pub fn parse(stage: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Parse {
            stage,
            message: error.to_string(),
        }
    }
}

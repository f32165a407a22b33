use thiserror::Error;

use crate::genome::{InnovationId, NodeId};

pub type Result<T> = std::result::Result<T, NeatError>;

/// Everything that can go wrong while building or evolving a population.
#[derive(Debug, Error)]
pub enum NeatError {
    /// Configuration rejected before any genome was built.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An edge names a node neither parent carries; the genetic history is corrupt.
    #[error("edge {edge} references node {node} absent from both parents")]
    MissingNode { edge: InnovationId, node: NodeId },
    #[error("genomes of incompatible encodings cannot be combined")]
    EncodingMismatch,
    #[error("cannot {operation} while population is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("failed to start assessment workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl NeatError {
    pub(crate) fn config<S: Into<String>>(message: S) -> Self {
        NeatError::InvalidConfig(message.into())
    }
}

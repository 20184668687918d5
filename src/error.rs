//! Error types for stateless block validation

use thiserror::Error;

/// Accumulator proof failures. Proofs are caller-supplied and not
/// self-correcting, so every variant is terminal for the block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtreexoError {
    #[error("accumulator proof does not recompute the stored root: {0}")]
    ProofMismatch(String),

    #[error("leaf index out of range: {0}")]
    InvalidLeafIndex(String),
}

/// Block validation failures. All variants reject the block as a whole:
/// no partial state effects are ever visible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("header merkle root disagrees with computed transaction root: {0}")]
    MerkleCommitmentMismatch(String),

    #[error("duplicate subtree in merkle tree: {0}")]
    DuplicateSubtreeDetected(String),

    #[error("invalid proof of work: {0}")]
    InvalidProofOfWork(String),

    #[error("spent output proof missing or unmatched: {0}")]
    MissingSpentProof(String),

    #[error("chain state invariant violated: {0}")]
    StateInvariantViolation(String),

    #[error("accumulator error: {0}")]
    Utreexo(#[from] UtreexoError),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

//! # Utreexo-Consensus
//!
//! Stateless validation core for Bitcoin chain verification.
//!
//! This crate provides pure, side-effect-free functions that extend a compact
//! chain state block by block without ever materializing the UTXO set. The
//! set is replaced by a Utreexo accumulator: a forest of perfect Merkle trees
//! whose roots, together with a handful of header-derived scalars, are all
//! the state a verifier carries.
//!
//! ## Architecture
//!
//! The system is a single transition function over value types:
//! - Chain state (accumulator roots + height, work, target, timestamps)
//! - Block validation (merkle commitment, proof of work)
//! - Accumulator updates (verify and delete spent outputs, add new ones)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: All functions are deterministic and side-effect-free
//! 2. **Whole-Block Atomicity**: A block either yields a successor state or an
//!    error; no partial effects are observable
//! 3. **Exact Version Pinning**: Consensus-critical dependencies pinned to
//!    exact versions
//!
//! ## Usage
//!
//! ```rust
//! use utreexo_consensus::utreexo::{UtreexoProof, UtreexoState};
//!
//! let mut accumulator = UtreexoState::new();
//! accumulator.add([7u8; 32]);
//!
//! let proof = UtreexoProof {
//!     leaf_index: 0,
//!     proof: vec![],
//! };
//! accumulator.verify_leaf([7u8; 32], &proof).unwrap();
//! ```

pub mod types;
pub mod constants;
pub mod uint;
pub mod hash;
pub mod merkle;
pub mod utreexo;
pub mod state;
pub mod pow;
pub mod block;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use block::{apply_block, SpentOutput};
pub use error::{Result, UtreexoError, ValidationError};
pub use state::ChainState;
pub use uint::U256;
pub use utreexo::{UtreexoBatchProof, UtreexoProof, UtreexoState};

/// Main stateless verification entry point
///
/// # Examples
///
/// ```
/// use utreexo_consensus::StatelessVerifier;
/// use utreexo_consensus::types::*;
///
/// let verifier = StatelessVerifier::new();
///
/// let tx = Transaction {
///     version: 1,
///     inputs: vec![TransactionInput {
///         prevout: OutPoint {
///             hash: [0u8; 32],
///             index: 0xffffffff,
///         },
///         script_sig: vec![0x51],
///         sequence: 0xffffffff,
///     }],
///     outputs: vec![TransactionOutput {
///         value: 5000000000, // 50 BTC in satoshis
///         script_pubkey: vec![0x51],
///     }],
///     lock_time: 0,
/// };
///
/// let txid = verifier.transaction_id(&tx);
/// let root = verifier.compute_merkle_root(&[txid]).unwrap();
/// assert_eq!(root, txid); // a single leaf is its own root
/// ```
pub struct StatelessVerifier;

impl StatelessVerifier {
    /// Create a new verifier instance
    ///
    /// # Examples
    ///
    /// ```
    /// use utreexo_consensus::StatelessVerifier;
    ///
    /// let verifier = StatelessVerifier::new();
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Compute the double-SHA-256 id of a transaction
    pub fn transaction_id(&self, tx: &Transaction) -> Hash {
        hash::tx_id(tx)
    }

    /// Compute the merkle root over transaction ids, rejecting the duplicate
    /// subtree construction of CVE-2012-2459
    ///
    /// # Examples
    ///
    /// ```
    /// use utreexo_consensus::StatelessVerifier;
    ///
    /// let verifier = StatelessVerifier::new();
    /// let root = verifier.compute_merkle_root(&[[1u8; 32], [2u8; 32]]).unwrap();
    /// assert_ne!(root, [1u8; 32]);
    /// ```
    pub fn compute_merkle_root(&self, txids: &[Hash]) -> Result<Hash> {
        merkle::merkle_root(txids)
    }

    /// Check a header's proof of work against an explicit target
    ///
    /// # Examples
    ///
    /// ```
    /// use utreexo_consensus::StatelessVerifier;
    /// use utreexo_consensus::types::*;
    /// use utreexo_consensus::uint::U256;
    ///
    /// let verifier = StatelessVerifier::new();
    /// let header = BlockHeader {
    ///     version: 1,
    ///     prev_block_hash: [0; 32],
    ///     merkle_root: [0; 32],
    ///     timestamp: 1234567890,
    ///     bits: 0x1d00ffff,
    ///     nonce: 0,
    /// };
    ///
    /// // Every hash satisfies the widest possible target.
    /// assert!(verifier.check_proof_of_work(&header, &U256::MAX));
    /// ```
    pub fn check_proof_of_work(&self, header: &BlockHeader, target: &U256) -> bool {
        pow::check_proof_of_work(header, target)
    }

    /// Expected work contributed by one block at the given target
    pub fn block_work(&self, target: &U256) -> U256 {
        pow::block_work(target)
    }

    /// Apply a block to a chain state, producing the successor state
    ///
    /// Spent-output proofs must be supplied in block order, one per input
    /// that spends an output confirmed before this block.
    pub fn apply_block(
        &self,
        prior: ChainState,
        block: &Block,
        spent_proofs: &[SpentOutput],
    ) -> Result<ChainState> {
        block::apply_block(prior, block, spent_proofs)
    }
}

impl Default for StatelessVerifier {
    /// Create a default verifier instance
    ///
    /// # Examples
    ///
    /// ```
    /// use utreexo_consensus::StatelessVerifier;
    ///
    /// let verifier = StatelessVerifier::default();
    /// ```
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_matches_free_function() {
        let verifier = StatelessVerifier::new();
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TransactionOutput {
                value: 1000,
                script_pubkey: vec![0x51],
            }],
            lock_time: 0,
        };
        assert_eq!(verifier.transaction_id(&tx), hash::tx_id(&tx));
    }

    #[test]
    fn test_compute_merkle_root_rejects_empty() {
        let verifier = StatelessVerifier::new();
        assert!(verifier.compute_merkle_root(&[]).is_err());
    }

    #[test]
    fn test_check_proof_of_work_widest_target() {
        let verifier = StatelessVerifier::default();
        let header = BlockHeader {
            version: 1,
            prev_block_hash: [0; 32],
            merkle_root: [0; 32],
            timestamp: 1234567890,
            bits: 0x1d00ffff,
            nonce: 0,
        };
        assert!(verifier.check_proof_of_work(&header, &U256::MAX));
        assert!(!verifier.check_proof_of_work(&header, &U256::ZERO));
    }

    #[test]
    fn test_apply_block_delegates() {
        let verifier = StatelessVerifier::new();
        let coinbase = Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint {
                    hash: ZERO_HASH,
                    index: 0xffffffff,
                },
                script_sig: vec![],
                sequence: 0xffffffff,
            }],
            outputs: vec![TransactionOutput {
                value: 5000000000,
                script_pubkey: vec![0x51],
            }],
            lock_time: 0,
        };
        let txid = hash::tx_id(&coinbase);
        let block = Block {
            header: BlockHeader {
                version: 1,
                prev_block_hash: ZERO_HASH,
                merkle_root: txid,
                timestamp: 1231006505,
                bits: MAX_TARGET_BITS,
                nonce: 0,
            },
            transactions: vec![coinbase],
        };
        let prior = ChainState::pre_genesis().retarget(U256::MAX);
        let state = verifier.apply_block(prior, &block, &[]).unwrap();
        assert_eq!(state.best_block_height, Some(0));
    }
}

//! Chain state: the minimal context threaded from one validated block to
//! the next
//!
//! One instance exists per validated height. A validation step consumes the
//! previous instance by value and produces a new one; a published state is
//! never mutated in place.

use crate::constants::{MAX_TARGET, TIMESTAMP_WINDOW};
use crate::error::{Result, ValidationError};
use crate::types::{Hash, ZERO_HASH};
use crate::uint::U256;
use crate::utreexo::UtreexoState;
use serde::{Deserialize, Serialize};

/// ChainState: ℕ? × ℕ₂₅₆ × ℍ × ℕ₂₅₆ × ℕ × ℕ¹¹ × 𝕌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// Height of the best block; `None` only for the pre-genesis state
    pub best_block_height: Option<u32>,
    /// Cumulative proof of work, strictly increasing across accepted blocks
    pub total_work: U256,
    pub best_block_hash: Hash,
    /// Difficulty target the next block must satisfy
    pub current_target: U256,
    /// Timestamp of the first block of the current difficulty epoch
    pub epoch_start_time: u32,
    /// The most recent block timestamps, oldest first, zero-padded before
    /// genesis; always exactly [`TIMESTAMP_WINDOW`] entries
    pub prev_timestamps: [u32; TIMESTAMP_WINDOW],
    pub utreexo_state: UtreexoState,
}

impl ChainState {
    /// The well-known pre-genesis state. A pure factory: no hidden shared
    /// storage, every call returns a fresh value.
    pub fn pre_genesis() -> Self {
        ChainState {
            best_block_height: None,
            total_work: U256::ZERO,
            best_block_hash: ZERO_HASH,
            current_target: MAX_TARGET,
            epoch_start_time: 0,
            prev_timestamps: [0; TIMESTAMP_WINDOW],
            utreexo_state: UtreexoState::new(),
        }
    }

    /// Height the next accepted block will occupy.
    pub fn next_height(&self) -> u32 {
        match self.best_block_height {
            None => 0,
            Some(height) => height + 1,
        }
    }

    /// Install a retargeted difficulty. Retarget computation itself belongs
    /// to the surrounding system; the core only carries the value.
    pub fn retarget(mut self, target: U256) -> Self {
        self.current_target = target;
        self
    }

    /// Advance the rolling timestamp window: drop the oldest entry, append
    /// the newest.
    pub fn pushed_timestamps(&self, timestamp: u32) -> [u32; TIMESTAMP_WINDOW] {
        let mut window = [0u32; TIMESTAMP_WINDOW];
        window[..TIMESTAMP_WINDOW - 1].copy_from_slice(&self.prev_timestamps[1..]);
        window[TIMESTAMP_WINDOW - 1] = timestamp;
        window
    }

    /// Programming-contract checks on a state about to be extended. A
    /// failure here is not a bad block but a corrupted state; validation
    /// must abort rather than attempt recovery.
    pub fn check_invariants(&self) -> Result<()> {
        if self.current_target.is_zero() {
            return Err(ValidationError::StateInvariantViolation(
                "difficulty target is zero".to_string(),
            ));
        }
        if self.best_block_height.is_some() && self.total_work.is_zero() {
            return Err(ValidationError::StateInvariantViolation(
                "accepted blocks but no accumulated work".to_string(),
            ));
        }
        if self.utreexo_state.roots.is_empty() {
            return Err(ValidationError::StateInvariantViolation(
                "accumulator has no root slots".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self::pre_genesis()
    }
}

//! Consensus constants used by the stateless verification core

use crate::uint::U256;

/// Difficulty adjustment interval: 2016 blocks per epoch
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u32 = 2016;

/// Number of recent block timestamps carried for median-time-past
pub const TIMESTAMP_WINDOW: usize = 11;

/// Maximum target (minimum difficulty) in compact representation
pub const MAX_TARGET_BITS: u32 = 0x1d00ffff;

/// Maximum target expanded: 0xffff × 2^208
pub const MAX_TARGET: U256 = U256([0, 0, 0, 0x0000_0000_ffff_0000]);

/// Coinbase prevout index
pub const COINBASE_INDEX: u32 = 0xffffffff;

//! Proof-of-work arithmetic: compact target decoding, header checks, and
//! per-block work pricing
//!
//! Retargeting (next-work computation, median time past) is an external
//! collaborator; this module only prices a header against the target the
//! chain state currently carries.

use crate::error::{Result, ValidationError};
use crate::hash::block_hash;
use crate::types::BlockHeader;
use crate::uint::U256;

/// ExpandTarget: ℕ → ℕ₂₅₆
///
/// Decode the compact target representation 0xEEMMMMMM: the target is
/// mantissa × 2^(8 × (exponent − 3)).
pub fn expand_target(bits: u32) -> Result<U256> {
    let exponent = (bits >> 24) as u8;
    let mantissa = bits & 0x00ffffff;

    if !(3..=32).contains(&exponent) {
        return Err(ValidationError::InvalidProofOfWork(format!(
            "invalid target exponent {exponent}"
        )));
    }
    if exponent > 29 {
        return Err(ValidationError::InvalidProofOfWork(format!(
            "target exponent {exponent} exceeds the representable range"
        )));
    }
    if mantissa == 0 {
        return Ok(U256::ZERO);
    }

    let mantissa = U256::from_u64(mantissa as u64);
    let shift = 8 * (exponent as u32 - 3);
    Ok(mantissa.shl(shift))
}

/// CheckProofOfWork: ℋ × ℕ₂₅₆ → {true, false}
///
/// SHA256(SHA256(header)), read as a little-endian 256-bit integer, must
/// not exceed the target.
pub fn check_proof_of_work(header: &BlockHeader, target: &U256) -> bool {
    let hash = block_hash(header);
    U256::from_le_bytes(&hash) <= *target
}

/// BlockWork: ℕ₂₅₆ → ℕ₂₅₆
///
/// Work contributed by a block meeting `target`:
/// ¬target / (target + 1) + 1, i.e. ⌊2^256 / (target + 1)⌋ without needing
/// a 257-bit numerator.
pub fn block_work(target: &U256) -> U256 {
    let denominator = match target.checked_add(&U256::ONE) {
        Some(d) => d,
        // target saturated at 2^256 - 1: every hash qualifies
        None => return U256::ONE,
    };
    let (quotient, _) = target.not().div_rem(&denominator);
    quotient
        .checked_add(&U256::ONE)
        .unwrap_or(U256::MAX)
}

//! 256-bit unsigned arithmetic for difficulty targets and cumulative work

use serde::{Deserialize, Serialize};

/// 256-bit unsigned integer, stored as four little-endian 64-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct U256(pub [u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0; 4]);
    pub const ONE: U256 = U256([1, 0, 0, 0]);
    pub const MAX: U256 = U256([u64::MAX; 4]);

    pub fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&x| x == 0)
    }

    /// Interpret 32 bytes as a little-endian 256-bit integer.
    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            *word = u64::from_le_bytes(chunk);
        }
        U256(words)
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, &word) in self.0.iter().enumerate() {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    pub fn bit(&self, index: usize) -> bool {
        (self.0[index / 64] >> (index % 64)) & 1 == 1
    }

    fn set_bit(&mut self, index: usize) {
        self.0[index / 64] |= 1 << (index % 64);
    }

    pub fn not(&self) -> Self {
        U256([!self.0[0], !self.0[1], !self.0[2], !self.0[3]])
    }

    pub fn shl(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }
        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..4 {
            if i + word_shift < 4 {
                result.0[i + word_shift] |= self.0[i] << bit_shift;
                if bit_shift > 0 && i + word_shift + 1 < 4 {
                    result.0[i + word_shift + 1] |= self.0[i] >> (64 - bit_shift);
                }
            }
        }
        result
    }

    pub fn shr(&self, shift: u32) -> Self {
        if shift >= 256 {
            return U256::ZERO;
        }
        let mut result = U256::ZERO;
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..4 {
            if i >= word_shift {
                result.0[i - word_shift] |= self.0[i] >> bit_shift;
                if bit_shift > 0 && i - word_shift >= 1 {
                    result.0[i - word_shift - 1] |= self.0[i] << (64 - bit_shift);
                }
            }
        }
        result
    }

    /// Addition returning `None` on overflow past 2^256.
    pub fn checked_add(&self, other: &U256) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut carry = false;
        for i in 0..4 {
            let (sum, c1) = self.0[i].overflowing_add(other.0[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            result[i] = sum;
            carry = c1 || c2;
        }
        if carry {
            None
        } else {
            Some(U256(result))
        }
    }

    /// Subtraction wrapping modulo 2^256. Callers compare first where
    /// underflow would be meaningful.
    pub fn wrapping_sub(&self, other: &U256) -> U256 {
        let mut result = [0u64; 4];
        let mut borrow = false;
        for i in 0..4 {
            let (diff, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (diff, b2) = diff.overflowing_sub(borrow as u64);
            result[i] = diff;
            borrow = b1 || b2;
        }
        U256(result)
    }

    /// Shift-subtract long division. `divisor` must be non-zero.
    pub fn div_rem(&self, divisor: &U256) -> (U256, U256) {
        debug_assert!(!divisor.is_zero());
        let mut quotient = U256::ZERO;
        let mut remainder = U256::ZERO;
        for i in (0..256).rev() {
            remainder = remainder.shl(1);
            if self.bit(i) {
                remainder.0[0] |= 1;
            }
            if remainder >= *divisor {
                remainder = remainder.wrapping_sub(divisor);
                quotient.set_bit(i);
            }
        }
        (quotient, remainder)
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
            match a.cmp(b) {
                std::cmp::Ordering::Equal => continue,
                order => return order,
            }
        }
        std::cmp::Ordering::Equal
    }
}

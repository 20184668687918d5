//! Hashing primitives: double-SHA256 for transaction trees and headers,
//! SHA-512/256 for accumulator node hashing

use crate::types::*;
use sha2::{Digest, Sha256, Sha512_256};

/// Neutral contextual binding value, used by the accumulator until node
/// hashing is wired to confirming-block data. See [`parent_hash`].
pub const NEUTRAL_BINDING: Hash = ZERO_HASH;

// Accumulator preimage tags. A leaf preimage with a 44-byte script has the
// same length as a parent preimage, so the two shapes must be separated by
// construction, not by length.
const LEAF_TAG: [u8; 1] = [0x00];
const PARENT_TAG: [u8; 1] = [0x01];

/// SHA256(SHA256(data))
pub fn sha256d(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&second);
    hash
}

/// Combine two transaction-tree nodes: SHA256(SHA256(left ‖ right)).
/// Order-sensitive by construction.
pub fn merkle_parent(left: &Hash, right: &Hash) -> Hash {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left);
    data[32..].copy_from_slice(right);
    sha256d(&data)
}

/// Combine two accumulator nodes into their parent.
///
/// `binding` is a contextual value the adversary cannot choose before the
/// leaf is confirmed (conventionally data from the confirming block); it
/// prevents front-running and cross-fork replay of leaves. Callers pass
/// [`NEUTRAL_BINDING`] until block wiring lands; the parameter is part of
/// the contract and must not be folded away.
pub fn parent_hash(left: &Hash, right: &Hash, binding: &Hash) -> Hash {
    let digest = Sha512_256::new()
        .chain_update(PARENT_TAG)
        .chain_update(left)
        .chain_update(right)
        .chain_update(binding)
        .finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// Accumulator leaf commitment for an unspent output.
///
/// Commits the owning txid, output position, value and locking script, so a
/// leaf is meaningless without the creating transaction.
pub fn leaf_hash(output: &UtreexoOutput) -> Hash {
    let digest = Sha512_256::new()
        .chain_update(LEAF_TAG)
        .chain_update(output.txid)
        .chain_update(output.vout.to_le_bytes())
        .chain_update(output.value.to_le_bytes())
        .chain_update((output.script_pubkey.len() as u64).to_le_bytes())
        .chain_update(&output.script_pubkey)
        .finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// TxId: 𝒯𝒳 → ℍ, double-SHA256 of the legacy serialization
pub fn tx_id(tx: &Transaction) -> Hash {
    sha256d(&serialize_transaction(tx))
}

/// BlockHash: ℋ → ℍ, double-SHA256 of the 80-byte header serialization
pub fn block_hash(header: &BlockHeader) -> Hash {
    sha256d(&serialize_header(header))
}

/// Serialize block header to its canonical 80 bytes
pub fn serialize_header(header: &BlockHeader) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(80);
    bytes.extend_from_slice(&header.version.to_le_bytes());
    bytes.extend_from_slice(&header.prev_block_hash);
    bytes.extend_from_slice(&header.merkle_root);
    bytes.extend_from_slice(&header.timestamp.to_le_bytes());
    bytes.extend_from_slice(&header.bits.to_le_bytes());
    bytes.extend_from_slice(&header.nonce.to_le_bytes());
    bytes
}

/// Serialize a transaction in the legacy (pre-witness) format
pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&tx.version.to_le_bytes());
    write_varint(&mut bytes, tx.inputs.len() as u64);
    for input in &tx.inputs {
        bytes.extend_from_slice(&input.prevout.hash);
        bytes.extend_from_slice(&input.prevout.index.to_le_bytes());
        write_varint(&mut bytes, input.script_sig.len() as u64);
        bytes.extend_from_slice(&input.script_sig);
        bytes.extend_from_slice(&input.sequence.to_le_bytes());
    }
    write_varint(&mut bytes, tx.outputs.len() as u64);
    for output in &tx.outputs {
        bytes.extend_from_slice(&output.value.to_le_bytes());
        write_varint(&mut bytes, output.script_pubkey.len() as u64);
        bytes.extend_from_slice(&output.script_pubkey);
    }
    bytes.extend_from_slice(&tx.lock_time.to_le_bytes());
    bytes
}

/// Bitcoin variable-length integer encoding
fn write_varint(bytes: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => bytes.push(value as u8),
        0xfd..=0xffff => {
            bytes.push(0xfd);
            bytes.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffffffff => {
            bytes.push(0xfe);
            bytes.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            bytes.push(0xff);
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
}

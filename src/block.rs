//! Block application: prove a block is a valid extension of the chain and
//! produce the successor chain state

use crate::constants::DIFFICULTY_ADJUSTMENT_INTERVAL;
use crate::error::{Result, ValidationError};
use crate::hash::{block_hash, leaf_hash, tx_id};
use crate::merkle::merkle_root;
use crate::pow::{block_work, check_proof_of_work};
use crate::state::ChainState;
use crate::types::*;
use crate::utreexo::UtreexoProof;
use std::collections::HashSet;

/// An output spent by the block together with its accumulator inclusion
/// proof, both valid against the prior chain state. Supplied by the caller
/// for every input that does not spend an output created earlier in the
/// same block, in block order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpentOutput {
    pub output: UtreexoOutput,
    pub proof: UtreexoProof,
}

/// ApplyBlock: 𝒞 × ℬ × 𝒮* → 𝒞
///
/// For prior state s, block b and spent-output proofs ps:
/// 1. MerkleRoot(txids(b)) must equal b.header.merkle_root
/// 2. b.header must satisfy the proof of work for s.current_target
/// 3. Every input not resolved intra-block is verified against the prior
///    accumulator and all of them are deleted as one forest update
/// 4. Every output not spent intra-block is added, in transaction-then-
///    output order
/// 5. The successor state carries height + 1, the accumulated work, the
///    new best hash and the advanced timestamp window
///
/// The prior state is consumed by value; on error none of its effects are
/// visible to the caller. Fully deterministic: identical inputs produce a
/// bit-identical successor state.
pub fn apply_block(
    prior: ChainState,
    block: &Block,
    spent_proofs: &[SpentOutput],
) -> Result<ChainState> {
    prior.check_invariants()?;

    // 1. Transaction commitment
    let txids: Vec<Hash> = block.transactions.iter().map(tx_id).collect();
    let computed_root = merkle_root(&txids)?;
    if computed_root != block.header.merkle_root {
        return Err(ValidationError::MerkleCommitmentMismatch(
            "header commits to a different transaction set".to_string(),
        ));
    }

    // 2. Proof of work against the target carried by the prior state
    if !check_proof_of_work(&block.header, &prior.current_target) {
        return Err(ValidationError::InvalidProofOfWork(
            "block hash exceeds the current target".to_string(),
        ));
    }

    // 3. Match externally resolved inputs with their supplied proofs
    let external_inputs = collect_external_inputs(block, &txids);
    if external_inputs.len() != spent_proofs.len() {
        return Err(ValidationError::MissingSpentProof(format!(
            "{} external inputs, {} proofs supplied",
            external_inputs.len(),
            spent_proofs.len()
        )));
    }
    for (input, spent) in external_inputs.iter().zip(spent_proofs) {
        if *input != spent.output.outpoint() {
            return Err(ValidationError::MissingSpentProof(format!(
                "proof order does not match block order at output index {}",
                input.index
            )));
        }
    }

    let mut state = prior;

    // Verify every spend against the prior accumulator, then apply all
    // deletions as a single forest update. Aggregation reconciles proofs
    // that overlap within one tree.
    for spent in spent_proofs {
        state
            .utreexo_state
            .verify(&spent.output, &spent.proof)
            .map_err(ValidationError::from)?;
    }
    let proofs: Vec<UtreexoProof> = spent_proofs.iter().map(|s| s.proof.clone()).collect();
    let batch = state
        .utreexo_state
        .aggregate_proofs(&proofs)
        .map_err(ValidationError::from)?;
    state
        .utreexo_state
        .delete_batch(&batch)
        .map_err(ValidationError::from)?;

    // 4. Add surviving outputs in transaction-then-output order. Outputs
    // created and spent within this block never touch the accumulator.
    let spent_in_block: HashSet<OutPoint> = block
        .transactions
        .iter()
        .filter(|tx| !is_coinbase(tx))
        .flat_map(|tx| tx.inputs.iter().map(|input| input.prevout.clone()))
        .collect();
    for (tx, txid) in block.transactions.iter().zip(&txids) {
        for (vout, output) in tx.outputs.iter().enumerate() {
            let outpoint = OutPoint {
                hash: *txid,
                index: vout as u32,
            };
            if spent_in_block.contains(&outpoint) {
                continue;
            }
            state.utreexo_state.add(leaf_hash(&UtreexoOutput {
                txid: *txid,
                vout: vout as u32,
                value: output.value,
                script_pubkey: output.script_pubkey.clone(),
            }));
        }
    }

    // 5. Successor scalars
    let height = state.next_height();
    let total_work = state
        .total_work
        .checked_add(&block_work(&state.current_target))
        .ok_or_else(|| {
            ValidationError::StateInvariantViolation("cumulative work overflow".to_string())
        })?;
    let epoch_start_time = if height % DIFFICULTY_ADJUSTMENT_INTERVAL == 0 {
        block.header.timestamp
    } else {
        state.epoch_start_time
    };
    let prev_timestamps = state.pushed_timestamps(block.header.timestamp);

    Ok(ChainState {
        best_block_height: Some(height),
        total_work,
        best_block_hash: block_hash(&block.header),
        current_target: state.current_target,
        epoch_start_time,
        prev_timestamps,
        utreexo_state: state.utreexo_state,
    })
}

/// Outpoints spent by the block that were not created by an earlier
/// transaction of the same block, in block order. Coinbase inputs resolve
/// to nothing and are skipped.
fn collect_external_inputs(block: &Block, txids: &[Hash]) -> Vec<OutPoint> {
    let mut created: HashSet<OutPoint> = HashSet::new();
    let mut external = Vec::new();
    for (tx, txid) in block.transactions.iter().zip(txids) {
        if !is_coinbase(tx) {
            for input in &tx.inputs {
                if !created.contains(&input.prevout) {
                    external.push(input.prevout.clone());
                }
            }
        }
        for vout in 0..tx.outputs.len() {
            created.insert(OutPoint {
                hash: *txid,
                index: vout as u32,
            });
        }
    }
    external
}

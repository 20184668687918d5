//! Utreexo accumulator: a forest of perfect Merkle trees standing in for
//! the full UTXO set
//!
//! The forest is a sparse ordered list of optional roots indexed by tree
//! height, plus `num_leaves`, the total number of leaves ever inserted.
//! The set of populated heights follows the binary representation of
//! `num_leaves`: adding a leaf is a carry-propagating increment, so fresh
//! outputs sit in small trees and carry short proofs.
//!
//! Deletion keeps tree shapes fixed and replaces the removed leaf with an
//! empty marker that is absorbed upward: the parent of an empty node and a
//! subtree is that subtree. A fully emptied tree leaves `None` at its root
//! slot, which restores the pre-addition forest for the round-trip case.

use crate::error::UtreexoError;
use crate::hash::{leaf_hash, parent_hash, NEUTRAL_BINDING};
use crate::types::{Hash, UtreexoOutput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// UtreexoState: 𝕆(ℍ)* × ℕ
///
/// `roots[h]` is the root of the forest's height-`h` tree, or `None` when no
/// such tree exists. `num_leaves` is monotonic: deletions never decrease it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtreexoState {
    pub roots: Vec<Option<Hash>>,
    pub num_leaves: u64,
}

/// Inclusion proof for a single leaf.
///
/// `leaf_index` encodes, bit by bit from the bottom level up, which side the
/// proven node occupies at each level (bit set = right child). The sibling
/// path runs leaf to root, so `proof.len()` is the tree height and selects
/// the forest slot the recomputed root is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtreexoProof {
    pub leaf_index: u64,
    pub proof: Vec<Hash>,
}

/// Inclusion proof for several leaves sharing one deduplicated sibling set.
///
/// `targets` are global leaf positions, ascending left to right across the
/// forest (trees laid out tallest first). `proof` holds the siblings not
/// derivable from the targets themselves, in sweep order: per affected tree,
/// level by level from the bottom, ascending node index within a level.
/// When two targets are siblings their parent is computed directly and no
/// proof hash is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtreexoBatchProof {
    pub targets: Vec<u64>,
    pub proof: Vec<Hash>,
}

/// A node value during forest recomputation: `None` is the empty marker left
/// behind by a deletion.
type NodeValue = Option<Hash>;

fn combine(left: NodeValue, right: NodeValue) -> NodeValue {
    match (left, right) {
        (Some(l), Some(r)) => Some(parent_hash(&l, &r, &NEUTRAL_BINDING)),
        (Some(l), None) => Some(l),
        (None, Some(r)) => Some(r),
        (None, None) => None,
    }
}

impl UtreexoState {
    /// The empty accumulator: one vacant slot, zero leaves.
    pub fn new() -> Self {
        UtreexoState {
            roots: vec![None],
            num_leaves: 0,
        }
    }

    /// Add: 𝕌 × ℍ → 𝕌
    ///
    /// Carry propagation of a binary-counter increment: scan from height 0
    /// upward with the new leaf as the carried value; a vacant slot absorbs
    /// the carry, an occupied slot combines (existing root left, carried
    /// value right) and keeps carrying. One trailing vacant slot is always
    /// kept above the highest occupied height.
    pub fn add(&mut self, leaf: Hash) {
        let mut carried = leaf;
        let mut height = 0;
        loop {
            if height == self.roots.len() {
                self.roots.push(None);
            }
            match self.roots[height].take() {
                None => {
                    self.roots[height] = Some(carried);
                    break;
                }
                Some(root) => {
                    carried = parent_hash(&root, &carried, &NEUTRAL_BINDING);
                    height += 1;
                }
            }
        }
        if self.roots.last().map_or(true, |slot| slot.is_some()) {
            self.roots.push(None);
        }
        self.num_leaves += 1;
    }

    /// Repeated single add, in the exact order given. Order changes the
    /// resulting roots, so callers add outputs in canonical block order.
    pub fn add_batch(&mut self, leaves: &[Hash]) {
        for leaf in leaves {
            self.add(*leaf);
        }
    }

    /// Verify: 𝕌 × 𝒰 × 𝒫 → {ok, err}
    ///
    /// Recomputes the root from the output's leaf commitment along the
    /// sibling path and compares it with the stored root at the tree height
    /// the proof addresses.
    pub fn verify(
        &self,
        output: &UtreexoOutput,
        proof: &UtreexoProof,
    ) -> Result<(), UtreexoError> {
        self.verify_leaf(leaf_hash(output), proof)
    }

    /// Verify a raw leaf commitment against a single-leaf proof.
    pub fn verify_leaf(&self, leaf: Hash, proof: &UtreexoProof) -> Result<(), UtreexoError> {
        let expected = self.root_for(proof)?;
        let mut node = leaf;
        for (level, sibling) in proof.proof.iter().enumerate() {
            node = if (proof.leaf_index >> level) & 1 == 1 {
                parent_hash(sibling, &node, &NEUTRAL_BINDING)
            } else {
                parent_hash(&node, sibling, &NEUTRAL_BINDING)
            };
        }
        if node == expected {
            Ok(())
        } else {
            Err(UtreexoError::ProofMismatch(format!(
                "leaf index {} does not recompute the height-{} root",
                proof.leaf_index,
                proof.proof.len()
            )))
        }
    }

    /// Delete: 𝕌 × 𝒫 → 𝕌
    ///
    /// Removes the leaf the proof addresses by propagating the empty marker
    /// upward: at each level the deleted side vanishes and the sibling is
    /// absorbed, so the proof alone determines the new root. A tree emptied
    /// entirely returns its slot to `None`. `num_leaves` is unchanged.
    ///
    /// Only structural consistency (height in range, root present, index in
    /// range) is checked here; callers must have verified the same proof
    /// against the leaf being removed, or the stored root is replaced with
    /// garbage. [`crate::block::apply_block`] always verifies first.
    pub fn delete(&mut self, proof: &UtreexoProof) -> Result<(), UtreexoError> {
        self.root_for(proof)?;
        let mut node: NodeValue = None;
        for (level, sibling) in proof.proof.iter().enumerate() {
            node = if (proof.leaf_index >> level) & 1 == 1 {
                combine(Some(*sibling), node)
            } else {
                combine(node, Some(*sibling))
            };
        }
        self.roots[proof.proof.len()] = node;
        Ok(())
    }

    /// Batch verify: every target's path must be consistent with the current
    /// roots using only the shared, deduplicated sibling set. `leaves` are
    /// the targets' leaf commitments, in target order.
    pub fn verify_batch(
        &self,
        leaves: &[Hash],
        batch: &UtreexoBatchProof,
    ) -> Result<(), UtreexoError> {
        if leaves.len() != batch.targets.len() {
            return Err(UtreexoError::ProofMismatch(format!(
                "{} leaf hashes supplied for {} targets",
                leaves.len(),
                batch.targets.len()
            )));
        }
        let values: Vec<NodeValue> = leaves.iter().map(|leaf| Some(*leaf)).collect();
        let recomputed = self.sweep_ordered(&batch.targets, &values, &batch.proof)?;
        for (height, root) in recomputed {
            if self.roots[height] != root {
                return Err(UtreexoError::ProofMismatch(format!(
                    "recomputed height-{height} root disagrees with accumulator"
                )));
            }
        }
        Ok(())
    }

    /// Batch delete: one atomic forest update removing every target.
    ///
    /// Produces the same roots as deleting each target individually in
    /// ascending index order. As with [`Self::delete`], digest-level
    /// verification of the targets is the caller's responsibility.
    pub fn delete_batch(&mut self, batch: &UtreexoBatchProof) -> Result<(), UtreexoError> {
        let values: Vec<NodeValue> = vec![None; batch.targets.len()];
        let new_roots = self.sweep_ordered(&batch.targets, &values, &batch.proof)?;
        for (height, root) in new_roots {
            self.roots[height] = root;
        }
        Ok(())
    }

    /// Fold single-leaf proofs, each valid against this accumulator, into
    /// one deduplicated batch proof covering all of them. Siblings shared by
    /// several proofs appear once; siblings that are themselves proven
    /// leaves (or their ancestors) are dropped entirely.
    pub fn aggregate_proofs(
        &self,
        proofs: &[UtreexoProof],
    ) -> Result<UtreexoBatchProof, UtreexoError> {
        let mut entries: Vec<(u64, &UtreexoProof)> = Vec::with_capacity(proofs.len());
        for proof in proofs {
            self.root_for(proof)?;
            let offset = self.tree_offset(proof.proof.len());
            entries.push((offset + proof.leaf_index, proof));
        }
        entries.sort_by_key(|(position, _)| *position);
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(UtreexoError::InvalidLeafIndex(format!(
                    "duplicate target {}",
                    pair[0].0
                )));
            }
        }

        // Every sibling any proof knows, keyed by its node coordinates.
        let mut known: HashMap<(usize, usize, u64), Hash> = HashMap::new();
        for (_, proof) in &entries {
            let height = proof.proof.len();
            for (level, sibling) in proof.proof.iter().enumerate() {
                known.insert((height, level, (proof.leaf_index >> level) ^ 1), *sibling);
            }
        }

        let targets: Vec<u64> = entries.iter().map(|(position, _)| *position).collect();
        let values: Vec<NodeValue> = vec![None; targets.len()];
        let mut ordered = Vec::new();
        self.sweep(&targets, &values, |height, level, position| {
            let sibling = *known.get(&(height, level, position)).ok_or_else(|| {
                UtreexoError::ProofMismatch(format!(
                    "no proof covers the height-{height} sibling at level {level}, position {position}"
                ))
            })?;
            ordered.push(sibling);
            Ok(sibling)
        })?;
        Ok(UtreexoBatchProof {
            targets,
            proof: ordered,
        })
    }

    /// First global leaf position of the tree rooted at `height`: the sum of
    /// the sizes of all taller populated trees.
    fn tree_offset(&self, height: usize) -> u64 {
        let mut offset = 0u64;
        for taller in (height + 1)..64 {
            if (self.num_leaves >> taller) & 1 == 1 {
                offset += 1u64 << taller;
            }
        }
        offset
    }

    /// Look up the root slot a single-leaf proof addresses.
    fn root_for(&self, proof: &UtreexoProof) -> Result<Hash, UtreexoError> {
        let height = proof.proof.len();
        if height >= 64 || height >= self.roots.len() {
            return Err(UtreexoError::InvalidLeafIndex(format!(
                "proof addresses height {height} beyond the forest"
            )));
        }
        if proof.leaf_index >> height != 0 {
            return Err(UtreexoError::InvalidLeafIndex(format!(
                "leaf index {} exceeds a height-{height} tree",
                proof.leaf_index
            )));
        }
        self.roots[height].ok_or_else(|| {
            UtreexoError::InvalidLeafIndex(format!("no root present at height {height}"))
        })
    }

    /// Map a global leaf position to (tree height, position within tree).
    /// Trees are laid out tallest first, following the set bits of
    /// `num_leaves` from the top.
    fn position_in_forest(&self, position: u64) -> Result<(usize, u64), UtreexoError> {
        if position >= self.num_leaves {
            return Err(UtreexoError::InvalidLeafIndex(format!(
                "target {position} exceeds {} leaves",
                self.num_leaves
            )));
        }
        let mut offset = 0u64;
        for height in (0..64usize).rev() {
            if (self.num_leaves >> height) & 1 == 1 {
                let size = 1u64 << height;
                if position < offset + size {
                    return Ok((height, position - offset));
                }
                offset += size;
            }
        }
        unreachable!("position bounded by num_leaves");
    }

    /// [`Self::sweep`] with siblings drawn from an ordered list, which must
    /// be consumed exactly.
    fn sweep_ordered(
        &self,
        targets: &[u64],
        values: &[NodeValue],
        proof: &[Hash],
    ) -> Result<Vec<(usize, NodeValue)>, UtreexoError> {
        let mut cursor = proof.iter();
        let results = self.sweep(targets, values, |_, _, _| {
            cursor.next().copied().ok_or_else(|| {
                UtreexoError::ProofMismatch(
                    "proof exhausted before all roots were recomputed".to_string(),
                )
            })
        })?;
        if cursor.next().is_some() {
            return Err(UtreexoError::ProofMismatch(
                "proof contains unused sibling hashes".to_string(),
            ));
        }
        Ok(results)
    }

    /// Recompute the root of every tree touched by `targets`, seeding the
    /// targets' level-0 slots with `values` and pulling missing siblings
    /// from `next_sibling` in sweep order: per tree (tallest first), level
    /// by level from the bottom, ascending node index. Sibling targets
    /// combine without requesting a sibling. Returns (height, computed
    /// root) pairs.
    fn sweep<F>(
        &self,
        targets: &[u64],
        values: &[NodeValue],
        mut next_sibling: F,
    ) -> Result<Vec<(usize, NodeValue)>, UtreexoError>
    where
        F: FnMut(usize, usize, u64) -> Result<Hash, UtreexoError>,
    {
        debug_assert_eq!(targets.len(), values.len());
        for pair in targets.windows(2) {
            if pair[0] >= pair[1] {
                return Err(UtreexoError::InvalidLeafIndex(
                    "targets must be strictly ascending".to_string(),
                ));
            }
        }

        let mut located = Vec::with_capacity(targets.len());
        for (target, value) in targets.iter().zip(values) {
            let (height, local) = self.position_in_forest(*target)?;
            // num_leaves is caller-supplied state (public field, serde
            // shape), so the derived height may exceed the roots vector.
            match self.roots.get(height) {
                Some(Some(_)) => {}
                _ => {
                    return Err(UtreexoError::InvalidLeafIndex(format!(
                        "target {target} addresses an absent height-{height} root"
                    )));
                }
            }
            located.push((height, local, *value));
        }

        let mut results = Vec::new();
        let mut i = 0;
        while i < located.len() {
            let height = located[i].0;
            let mut row: Vec<(u64, NodeValue)> = Vec::new();
            while i < located.len() && located[i].0 == height {
                row.push((located[i].1, located[i].2));
                i += 1;
            }
            for level in 0..height {
                let mut next: Vec<(u64, NodeValue)> = Vec::new();
                let mut j = 0;
                while j < row.len() {
                    let (pos, value) = row[j];
                    if j + 1 < row.len() && row[j + 1].0 == (pos ^ 1) {
                        // Sibling targets: parent is directly computable.
                        next.push((pos >> 1, combine(value, row[j + 1].1)));
                        j += 2;
                    } else {
                        let sibling = next_sibling(height, level, pos ^ 1)?;
                        let parent = if pos & 1 == 1 {
                            combine(Some(sibling), value)
                        } else {
                            combine(value, Some(sibling))
                        };
                        next.push((pos >> 1, parent));
                        j += 1;
                    }
                }
                row = next;
            }
            results.push((height, row[0].1));
        }
        Ok(results)
    }
}

impl Default for UtreexoState {
    fn default() -> Self {
        Self::new()
    }
}

//! Versioned leaf schema and sorted-pair BLAKE3 Merkle tree.
//!
//! This module is the single definition shared by the distribution builder
//! and the claim verifier. Schema v1 ([`LEAF_SCHEMA_VERSION`]):
//!
//! - Leaf: `BLAKE3(0x00 || participant[20] || beneficiary[20] || amount_be[32])`
//! - Internal node: `BLAKE3(0x01 || min(a, b) || max(a, b))`
//!
//! Leaf hashes are sorted ascending before the tree is built. Adjacent pairs
//! are combined with [`node_hash`]; a lone trailing hash is promoted to the
//! next layer unchanged. Because pairs are sorted inside [`node_hash`], a
//! proof is just the ordered list of sibling hashes.
//! Empty trees produce [`Hash256::ZERO`].

use crate::constants::{AMOUNT_WIDTH, LEAF_ENCODED_LEN, LEAF_SCHEMA_VERSION};
use crate::types::{Address, Hash256, ParticipantId};

/// Domain separation prefix for leaf hashes.
const LEAF_PREFIX: u8 = 0x00;

/// Domain separation prefix for internal node hashes.
const NODE_PREFIX: u8 = 0x01;

/// The schema version implemented here.
pub const fn schema_version() -> u8 {
    LEAF_SCHEMA_VERSION
}

/// Canonical leaf bytes: participant, beneficiary, 32-byte big-endian amount.
pub fn encode_leaf(
    participant: &ParticipantId,
    beneficiary: &Address,
    amount: u128,
) -> [u8; LEAF_ENCODED_LEN] {
    let mut out = [0u8; LEAF_ENCODED_LEN];
    out[..20].copy_from_slice(participant.as_bytes());
    out[20..40].copy_from_slice(beneficiary.as_bytes());
    // u128 occupies the low 16 bytes of the 32-byte word.
    out[40 + AMOUNT_WIDTH - 16..].copy_from_slice(&amount.to_be_bytes());
    out
}

/// Compute a domain-separated leaf hash: `BLAKE3(0x00 || encode_leaf(..))`.
pub fn leaf_hash(participant: &ParticipantId, beneficiary: &Address, amount: u128) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(&encode_leaf(participant, beneficiary, amount));
    Hash256(hasher.finalize().into())
}

/// Compute a domain-separated internal node hash over a sorted pair:
/// `BLAKE3(0x01 || min(a, b) || max(a, b))`.
pub fn node_hash(a: &Hash256, b: &Hash256) -> Hash256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    Hash256(hasher.finalize().into())
}

/// Compute the Merkle root from a set of leaf hashes (any order).
///
/// Returns [`Hash256::ZERO`] for an empty slice.
pub fn merkle_root(leaf_hashes: &[Hash256]) -> Hash256 {
    if leaf_hashes.is_empty() {
        return Hash256::ZERO;
    }

    let mut current = leaf_hashes.to_vec();
    current.sort_unstable();

    while current.len() > 1 {
        current = next_layer(&current);
    }

    current[0]
}

/// Recompute a root from a leaf hash and its sibling path.
pub fn compute_root(leaf: Hash256, proof: &[Hash256]) -> Hash256 {
    proof.iter().fold(leaf, |acc, sibling| node_hash(&acc, sibling))
}

/// Verify that `leaf` is committed under `root` via `proof`.
pub fn verify_proof(leaf: Hash256, proof: &[Hash256], root: &Hash256) -> bool {
    compute_root(leaf, proof) == *root
}

/// Compute the next layer of the tree from the current one.
///
/// Pairs adjacent hashes with [`node_hash`]. A lone trailing hash is
/// carried up unchanged.
fn next_layer(layer: &[Hash256]) -> Vec<Hash256> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => node_hash(left, right),
            [lone] => *lone,
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// Full Merkle tree supporting root computation and proof generation.
///
/// Stores all intermediate layers so that inclusion proofs can be extracted
/// for any leaf.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// `layers[0]` = sorted leaf hashes, `layers[last]` = `[root]`.
    layers: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes. Input order does not matter.
    pub fn from_leaf_hashes(leaf_hashes: &[Hash256]) -> Self {
        if leaf_hashes.is_empty() {
            return Self { layers: Vec::new() };
        }

        let mut leaves = leaf_hashes.to_vec();
        leaves.sort_unstable();

        let mut layers = vec![leaves];
        while let Some(prev) = layers.last().filter(|l| l.len() > 1) {
            let next = next_layer(prev);
            layers.push(next);
        }

        Self { layers }
    }

    /// The Merkle root. Returns [`Hash256::ZERO`] for an empty tree.
    pub fn root(&self) -> Hash256 {
        self.layers
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or(Hash256::ZERO)
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    /// Sorted leaf hashes.
    pub fn leaves(&self) -> &[Hash256] {
        self.layers.first().map_or(&[], Vec::as_slice)
    }

    /// Sibling path for the leaf at `index` in sorted order.
    ///
    /// Returns `None` if the index is out of bounds or the tree is empty.
    pub fn proof_at(&self, index: usize) -> Option<Vec<Hash256>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut path = Vec::with_capacity(self.layers.len().saturating_sub(1));
        let mut pos = index;

        // Walk from leaf layer to just below the root
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling_pos = pos ^ 1;
            // Promoted lone nodes have no sibling at this level.
            if let Some(sibling) = layer.get(sibling_pos) {
                path.push(*sibling);
            }
            pos /= 2;
        }

        Some(path)
    }

    /// Sibling path for a specific leaf hash.
    pub fn proof(&self, leaf: &Hash256) -> Option<Vec<Hash256>> {
        let index = self.leaves().binary_search(leaf).ok()?;
        self.proof_at(index)
    }
}

//! Merkle roots and inclusion proofs over batches of ledger entries.
//!
//! Leaves are the entries' `chain_hash` values, in the order given. Each
//! parent is `SHA-256(left_hex ‖ right_hex)` over the hex text of its
//! children. A level with an odd number of nodes pairs its last node with
//! itself. A single leaf is its own root; an empty batch has the root
//! `SHA-256("empty")`.

use serde::{Deserialize, Serialize};

use auditchain_contracts::entry::LedgerEntry;
use auditchain_core::hash::sha256_hex;

/// Root of an empty batch.
pub fn empty_root() -> String {
    sha256_hex(b"empty")
}

fn hash_pair(left: &str, right: &str) -> String {
    let mut combined = String::with_capacity(left.len() + right.len());
    combined.push_str(left);
    combined.push_str(right);
    sha256_hex(combined.as_bytes())
}

/// Merkle root of `entries`, order-sensitive.
pub fn merkle_root(entries: &[LedgerEntry]) -> String {
    MerkleTree::from_entries(entries).root().to_string()
}

/// Which side a sibling sits on when folding a proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// A fully materialized Merkle tree.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// Level 0 holds the leaves; the last level holds only the root.
    levels: Vec<Vec<String>>,
    root: String,
}

impl MerkleTree {
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        Self::from_leaves(entries.iter().map(|e| e.chain_hash.clone()).collect())
    }

    pub fn from_leaves(leaves: Vec<String>) -> Self {
        if leaves.is_empty() {
            return Self {
                levels: Vec::new(),
                root: empty_root(),
            };
        }

        let mut levels = vec![leaves];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next: Vec<String> = current
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }

        let root = levels
            .last()
            .and_then(|level| level.first())
            .cloned()
            .unwrap_or_else(empty_root);
        Self { levels, root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    /// Inclusion proof for the leaf at `index`, or `None` when out of range.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = self.levels.first()?.get(index)?.clone();
        let mut path = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_idx, side) = if idx % 2 == 0 {
                (idx + 1, Side::Right)
            } else {
                (idx - 1, Side::Left)
            };
            // An odd level pairs its last node with itself.
            let sibling = level.get(sibling_idx).unwrap_or(&level[idx]).clone();
            path.push(ProofStep { hash: sibling, side });
            idx /= 2;
        }

        Some(MerkleProof {
            leaf,
            path,
            root: self.root.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: String,
    pub side: Side,
}

/// Evidence that one `chain_hash` is included under a Merkle root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: String,
    pub path: Vec<ProofStep>,
    pub root: String,
}

impl MerkleProof {
    /// Fold the path from the leaf and compare with the claimed root.
    pub fn verify(&self) -> bool {
        let folded = self.path.iter().fold(self.leaf.clone(), |acc, step| match step.side {
            Side::Right => hash_pair(&acc, &step.hash),
            Side::Left => hash_pair(&step.hash, &acc),
        });
        folded == self.root
    }
}

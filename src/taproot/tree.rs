// Copyright 2019 Stichting Organism
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Taptree construction
//!
//! Two builders: one from leaves listed in depth first order with their
//! depths, one from weighted scripts merged Huffman style. Both record
//! the merkle path of every leaf, bottom up.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::debug;

use crate::config::TaptreeConfig;
use crate::errors::TaprootError;
use crate::taproot::{tap_branch_hash, tap_leaf_hash, tap_tweak_pubkey, ControlBlock};

/// A leaf to place at a given depth.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TapLeaf {
    /// Leaf script.
    pub script: Vec<u8>,
    /// Leaf version, `0xc0` for tapscript.
    pub leaf_version: u8,
    /// Distance from the root, the root being 0.
    pub depth: usize,
}

/// A leaf of a built tree with its merkle path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TapTreeLeaf {
    /// Leaf script.
    pub script: Vec<u8>,
    /// Leaf version.
    pub leaf_version: u8,
    /// Sibling hashes from the leaf up to the root.
    pub path: Vec<[u8; 32]>,
}

/// A built taptree. Leaves keep the order they were given in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TapTree {
    root: [u8; 32],
    leaves: Vec<TapTreeLeaf>,
}

// A subtree: its hash and the indices of the leaves below it.
struct Node {
    hash: [u8; 32],
    leaves: Vec<usize>,
}

fn combine(a: Node, b: Node, leaves: &mut [TapTreeLeaf]) -> Node {
    for i in &a.leaves {
        leaves[*i].path.push(b.hash);
    }
    for i in &b.leaves {
        leaves[*i].path.push(a.hash);
    }
    let mut all = a.leaves;
    all.extend(b.leaves);
    Node {
        hash: tap_branch_hash(&a.hash, &b.hash),
        leaves: all,
    }
}

impl TapTree {
    /// Build from leaves in depth first order.
    pub fn from_depth_first(leaves: &[TapLeaf], config: &TaptreeConfig) -> Result<TapTree, TaprootError> {
        if leaves.is_empty() {
            return Err(TaprootError::EmptyTree);
        }
        if let Some(l) = leaves.iter().find(|l| l.depth > config.max_depth) {
            return Err(TaprootError::DepthTooLarge { depth: l.depth });
        }

        let mut built: Vec<TapTreeLeaf> = leaves
            .iter()
            .map(|l| TapTreeLeaf {
                script: l.script.clone(),
                leaf_version: l.leaf_version,
                path: Vec::new(),
            })
            .collect();

        let mut next = 0;
        let root = Self::build_depth_first(leaves, &mut next, 0, &mut built)?;
        if next != leaves.len() {
            return Err(TaprootError::ExcessLeaves);
        }

        debug!(leaves = built.len(), "built depth first taptree");
        Ok(TapTree {
            root: root.hash,
            leaves: built,
        })
    }

    fn build_depth_first(
        leaves: &[TapLeaf],
        next: &mut usize,
        depth: usize,
        built: &mut [TapTreeLeaf],
    ) -> Result<Node, TaprootError> {
        let leaf = leaves.get(*next).ok_or(TaprootError::InsufficientLeaves)?;
        match leaf.depth.cmp(&depth) {
            Ordering::Equal => {
                let index = *next;
                *next += 1;
                Ok(Node {
                    hash: tap_leaf_hash(&leaf.script, leaf.leaf_version),
                    leaves: vec![index],
                })
            }
            // this branch needed a leaf here, the next one belongs higher up
            Ordering::Less => Err(TaprootError::InsufficientLeaves),
            Ordering::Greater => {
                let left = Self::build_depth_first(leaves, next, depth + 1, built)?;
                let right = Self::build_depth_first(leaves, next, depth + 1, built)?;
                Ok(combine(left, right, built))
            }
        }
    }

    /// Build from weighted scripts, repeatedly merging the two lightest nodes.
    ///
    /// Weights default to 1. Among equal weights the node queued first is
    /// merged first; leaves are queued in input order and every merged
    /// node is queued after all nodes that exist before it.
    pub fn from_huffman(
        scripts: &[Vec<u8>],
        weights: Option<&[u32]>,
        config: &TaptreeConfig,
    ) -> Result<TapTree, TaprootError> {
        if scripts.is_empty() {
            return Err(TaprootError::EmptyTree);
        }
        if let Some(w) = weights {
            if w.len() != scripts.len() {
                return Err(TaprootError::WeightMismatch {
                    scripts: scripts.len(),
                    weights: w.len(),
                });
            }
        }

        let mut built: Vec<TapTreeLeaf> = scripts
            .iter()
            .map(|s| TapTreeLeaf {
                script: s.clone(),
                leaf_version: config.default_leaf_version,
                path: Vec::new(),
            })
            .collect();

        let mut queue = BinaryHeap::new();
        for (i, leaf) in built.iter().enumerate() {
            let weight = weights.map_or(1, |w| w[i]);
            queue.push(Queued {
                weight: Reverse(weight),
                seq: Reverse(i),
                node: Node {
                    hash: tap_leaf_hash(&leaf.script, leaf.leaf_version),
                    leaves: vec![i],
                },
            });
        }

        let mut seq = scripts.len();
        let root = loop {
            let first = match queue.pop() {
                Some(q) => q,
                None => return Err(TaprootError::EmptyTree),
            };
            let second = match queue.pop() {
                Some(q) => q,
                None => break first.node,
            };
            queue.push(Queued {
                weight: Reverse(first.weight.0.saturating_add(second.weight.0)),
                seq: Reverse(seq),
                node: combine(first.node, second.node, &mut built),
            });
            seq += 1;
        };

        if let Some(depth) = built.iter().map(|l| l.path.len()).max() {
            if depth > config.max_depth {
                return Err(TaprootError::DepthTooLarge { depth });
            }
        }

        debug!(leaves = built.len(), "built huffman taptree");
        Ok(TapTree {
            root: root.hash,
            leaves: built,
        })
    }

    /// Merkle root.
    pub fn root(&self) -> &[u8; 32] {
        &self.root
    }

    /// Leaves in input order.
    pub fn leaves(&self) -> &[TapTreeLeaf] {
        &self.leaves
    }

    /// Merkle path of a leaf, bottom up.
    pub fn path(&self, leaf_index: usize) -> Result<&[[u8; 32]], TaprootError> {
        self.leaves
            .get(leaf_index)
            .map(|l| l.path.as_slice())
            .ok_or(TaprootError::UnknownLeaf { index: leaf_index })
    }

    /// Control block spending leaf `leaf_index` of an output built on `internal_key`.
    pub fn control_block(&self, leaf_index: usize, internal_key: &[u8]) -> Result<ControlBlock, TaprootError> {
        let leaf = self
            .leaves
            .get(leaf_index)
            .ok_or(TaprootError::UnknownLeaf { index: leaf_index })?;
        let (_, parity) = tap_tweak_pubkey(internal_key, Some(&self.root))?;

        let mut key = [0u8; 32];
        if internal_key.len() != key.len() {
            return Err(TaprootError::InvalidInternalKey);
        }
        key.copy_from_slice(internal_key);

        Ok(ControlBlock {
            leaf_version: leaf.leaf_version,
            parity,
            internal_key: key,
            path: leaf.path.clone(),
        })
    }
}

// Heap entry ordered by weight, then by queue order; the node itself is not compared.
struct Queued {
    weight: Reverse<u32>,
    seq: Reverse<usize>,
    node: Node,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.weight, self.seq).cmp(&(other.weight, other.seq))
    }
}

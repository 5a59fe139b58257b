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

//! Taproot output keys and script trees (BIP341).
//!
//! The tweak commits to the merkle root when there is one, and to
//! nothing at all otherwise. A key with no script path and a key with
//! an all zero root are different keys.

use bitcoin::consensus::encode;
use bitcoin::ScriptBuf;

use crate::curve;
use crate::errors::{MuSigError, TaprootError};
use crate::keys::{KeyAggContext, PublicKey};
use crate::tools::{Tag, TaggedHasher};

mod control_block;
pub use control_block::{
    is_valid_control_block, ControlBlock, ANNEX_TAG, TAPROOT_CONTROL_BASE_SIZE, TAPROOT_CONTROL_NODE_SIZE,
};

mod tree;
pub use tree::{TapLeaf, TapTree, TapTreeLeaf};

/// `H_TapLeaf(version || compact_size(script) || script)`
pub fn tap_leaf_hash(script: &[u8], leaf_version: u8) -> [u8; 32] {
    let script = encode::serialize(&ScriptBuf::from_bytes(script.to_vec()));
    let mut h = TaggedHasher::new(Tag::TapLeaf);
    h.append(&[leaf_version]).append(&script);
    h.finalize()
}

/// `H_TapBranch` over the two children in byte order.
pub fn tap_branch_hash(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut h = TaggedHasher::new(Tag::TapBranch);
    if a < b {
        h.append(a).append(b);
    } else {
        h.append(b).append(a);
    }
    h.finalize()
}

/// `H_TapTweak(P || root)`, root omitted when there is no script path.
pub fn tap_tweak_hash(internal_key: &[u8; 32], merkle_root: Option<&[u8; 32]>) -> [u8; 32] {
    let mut h = TaggedHasher::new(Tag::TapTweak);
    h.append(internal_key);
    if let Some(root) = merkle_root {
        h.append(root);
    }
    h.finalize()
}

/// Tweak an x-only internal key, returning the x-only output key and its Y parity.
pub fn tap_tweak_pubkey(
    internal_key: &[u8],
    merkle_root: Option<&[u8; 32]>,
) -> Result<([u8; 32], u8), TaprootError> {
    let p = curve::lift_x(internal_key).map_err(|_| TaprootError::InvalidInternalKey)?;
    let tweak = tap_tweak_hash(&curve::serialize_xonly(&p), merkle_root);
    let t = curve::scalar_from_bytes(&tweak).map_err(|_| TaprootError::InvalidTweak)?;

    let q = p + curve::mul_g(&t);
    if curve::is_infinity(&q) {
        return Err(TaprootError::InvalidTweak);
    }
    Ok((curve::serialize_xonly(&q), curve::odd_y(&q).unwrap_u8()))
}

/// Fold the leaf hash of `tapscript` up the control block path.
///
/// Each step orders the pair by value, independent of tree position.
pub fn taptree_root(control_block: &ControlBlock, tapscript: &[u8]) -> [u8; 32] {
    control_block
        .path
        .iter()
        .fold(tap_leaf_hash(tapscript, control_block.leaf_version), |k, e| {
            tap_branch_hash(&k, e)
        })
}

/// The output key committed to by a control block and tapscript.
pub fn taproot_output_key(control_block: &ControlBlock, tapscript: &[u8]) -> Result<[u8; 32], TaprootError> {
    let root = taptree_root(control_block, tapscript);
    tap_tweak_pubkey(&control_block.internal_key, Some(&root)).map(|(q, _)| q)
}

/// Whether a control block proves `tapscript` under `output_key`, parity included.
pub fn verify_control_block(output_key: &[u8; 32], control_block: &ControlBlock, tapscript: &[u8]) -> bool {
    let root = taptree_root(control_block, tapscript);
    match tap_tweak_pubkey(&control_block.internal_key, Some(&root)) {
        Ok((q, parity)) => &q == output_key && parity == control_block.parity,
        Err(_) => false,
    }
}

/// Legacy aggregation of taproot internal keys: x-only keys in sorted order.
pub fn aggregate_mu_sig_pubkeys(pubkeys: &[PublicKey]) -> Result<[u8; 32], MuSigError> {
    let mut keys: Vec<PublicKey> = pubkeys.iter().map(PublicKey::to_even_y).collect();
    keys.sort_by_key(|k| k.to_xonly());
    Ok(KeyAggContext::new_xonly(keys)?.aggregated_xonly())
}

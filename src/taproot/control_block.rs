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

//! Control blocks of taproot script path spends

use crate::config::TAPROOT_CONTROL_MAX_NODE_COUNT;
use crate::curve;
use crate::errors::TaprootError;

/// Length of the fixed part of a control block.
pub const TAPROOT_CONTROL_BASE_SIZE: usize = 33;

/// Length of one merkle path element.
pub const TAPROOT_CONTROL_NODE_SIZE: usize = 32;

/// Leaf version reserved so a control block cannot be read as an annex.
pub const ANNEX_TAG: u8 = 0x50;

/// A parsed control block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlBlock {
    /// Leaf version, low bit cleared.
    pub leaf_version: u8,
    /// Y parity of the output key, 0 or 1.
    pub parity: u8,
    /// Untweaked x-only internal key.
    pub internal_key: [u8; 32],
    /// Sibling hashes from the leaf up to the root.
    pub path: Vec<[u8; 32]>,
}

impl ControlBlock {
    /// Parse and validate a control block.
    pub fn from_bytes(bytes: &[u8]) -> Result<ControlBlock, TaprootError> {
        let length = bytes.len();
        if length < TAPROOT_CONTROL_BASE_SIZE
            || (length - TAPROOT_CONTROL_BASE_SIZE) % TAPROOT_CONTROL_NODE_SIZE != 0
            || (length - TAPROOT_CONTROL_BASE_SIZE) / TAPROOT_CONTROL_NODE_SIZE
                > TAPROOT_CONTROL_MAX_NODE_COUNT
        {
            return Err(TaprootError::InvalidControlBlockLength { length });
        }

        let leaf_version = bytes[0] & 0xfe;
        if leaf_version == ANNEX_TAG {
            return Err(TaprootError::InvalidLeafVersion {
                version: leaf_version,
            });
        }

        let mut internal_key = [0u8; 32];
        internal_key.copy_from_slice(&bytes[1..TAPROOT_CONTROL_BASE_SIZE]);
        if !curve::is_xonly_point(&internal_key) {
            return Err(TaprootError::InvalidInternalKey);
        }

        let path = bytes[TAPROOT_CONTROL_BASE_SIZE..]
            .chunks_exact(TAPROOT_CONTROL_NODE_SIZE)
            .map(|c| {
                let mut node = [0u8; 32];
                node.copy_from_slice(c);
                node
            })
            .collect();

        Ok(ControlBlock {
            leaf_version,
            parity: bytes[0] & 1,
            internal_key,
            path,
        })
    }

    /// Serialize back to consensus bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.push(self.leaf_version | (self.parity & 1));
        out.extend_from_slice(&self.internal_key);
        for node in &self.path {
            out.extend_from_slice(node);
        }
        out
    }

    /// Serialized length.
    pub fn size(&self) -> usize {
        TAPROOT_CONTROL_BASE_SIZE + TAPROOT_CONTROL_NODE_SIZE * self.path.len()
    }

    /// Depth of the proven leaf.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Whether bytes parse as a control block.
pub fn is_valid_control_block(bytes: &[u8]) -> bool {
    ControlBlock::from_bytes(bytes).is_ok()
}

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

//! Knobs for signing and taptree construction.
//!
//! Both structs deserialize with every field optional so they can sit
//! inside a caller's own configuration file.

use serde::{Deserialize, Serialize};

/// Leaf version of tapscript (BIP342).
pub const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;

/// Deepest leaf a control block can prove (BIP341).
pub const TAPROOT_CONTROL_MAX_NODE_COUNT: usize = 128;

/// Signing behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Verify each partial signature right after producing it.
    pub verify_partial_signatures: bool,
    /// Upper bound on secret nonces held in a store, `None` for no bound.
    pub max_nonce_store_entries: Option<usize>,
}

impl Default for SignerConfig {
    fn default() -> Self {
        SignerConfig {
            verify_partial_signatures: true,
            max_nonce_store_entries: None,
        }
    }
}

/// Taptree construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaptreeConfig {
    /// Leaf version used when a leaf does not name one.
    pub default_leaf_version: u8,
    /// Deepest allowed leaf.
    pub max_depth: usize,
}

impl Default for TaptreeConfig {
    fn default() -> Self {
        TaptreeConfig {
            default_leaf_version: TAPSCRIPT_LEAF_VERSION,
            max_depth: TAPROOT_CONTROL_MAX_NODE_COUNT,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_verify_partial_signatures() {
        assert!(SignerConfig::default().verify_partial_signatures);
        assert_eq!(TaptreeConfig::default().default_leaf_version, 0xc0);
    }

    #[test]
    fn bincode_round_trip() {
        let cfg = SignerConfig {
            verify_partial_signatures: false,
            max_nonce_store_entries: Some(16),
        };
        let bytes = bincode::serialize(&cfg).unwrap();
        let back: SignerConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(cfg, back);
    }
}

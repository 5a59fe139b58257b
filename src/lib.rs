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

//
// Cosigning for UTXO multisig and taproot inputs over secp256k1
//

//Useful links:
//https://github.com/bitcoin/bips/blob/master/bip-0327.mediawiki
//https://github.com/bitcoin/bips/blob/master/bip-0340.mediawiki
//https://github.com/bitcoin/bips/blob/master/bip-0341.mediawiki

//! MuSig2 signing, taproot output keys and script trees, and
//! classification of multisig and taproot input scripts.

#[macro_use]
mod ser;

pub mod config;
pub mod curve;
mod errors;
pub use errors::{MatchError, MuSigError, ParseError, SignerError, TaprootError};
pub mod tools;
pub mod keys;
pub mod signature;
pub mod musig;
pub mod taproot;
pub mod script;

// Export everything public in keys.
pub use crate::keys::*;
pub use crate::signature::{Signature, SIGNATURE_LENGTH};
pub use crate::config::{SignerConfig, TaptreeConfig};

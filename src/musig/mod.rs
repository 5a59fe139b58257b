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

//! Implementation of two round Schnorr multi-signatures over secp256k1,
//! "MuSig2: Simple Two-Round Schnorr Multi-Signatures" by
//! Jonas Nick, Tim Ruffing and Yannick Seurin
//! https://eprint.iacr.org/2020/1261
//! as specified for Bitcoin in BIP327.
//!
//! Round one exchanges `PublicNonce`s. Round two exchanges
//! `PartialSignature`s produced by a `Session`, which anyone holding all
//! of them can sum into a BIP340 signature for the aggregate key.
//!
//! Secret nonces never leave a `NonceStore` except to be consumed by
//! signing, so a nonce cannot sign twice.

mod commitment;
pub use commitment::{AggregateNonce, PublicNonce, SecretNonce, PUBLIC_NONCE_LENGTH, SECRET_NONCE_LENGTH};

mod nonce_store;
pub use nonce_store::NonceStore;

mod session;
pub use session::{deterministic_sign, PartialSignature, Session, PARTIAL_SIGNATURE_LENGTH};

mod parti;
pub use parti::{Ceremony, MuSigStateMachine, Parti};

pub mod p2tr;

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

//! The Extra Sauce
//!
//! Domain separated hashing as defined by BIP340:
//! `SHA256(SHA256(tag) || SHA256(tag) || data)`.
//!
//! A `TaggedHasher` plays the role a transcript plays in other Schnorr
//! constructions: it is created from a static tag, parts are appended
//! in order, and a 32 byte digest or a challenge scalar is drawn at the end.

use k256::Scalar;
use sha2::{Digest, Sha256};

use crate::curve;

/// Every domain separation tag used by this crate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    /// Hash of the ordered key list, `L`.
    KeyAggList,
    /// Per key aggregation coefficient `a_i`.
    KeyAggCoefficient,
    /// Mask applied to the secret key during nonce generation.
    MuSigAux,
    /// Nonce derivation.
    MuSigNonce,
    /// Nonce coefficient `b`.
    MuSigNonceCoef,
    /// Nonce derivation for deterministic signing.
    MuSigDeterministicNonce,
    /// BIP340 challenge `e`.
    Bip340Challenge,
    /// Taproot leaf hash.
    TapLeaf,
    /// Taproot branch hash.
    TapBranch,
    /// Taproot output key tweak.
    TapTweak,
}

impl Tag {
    /// The tag string hashed into the prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::KeyAggList => "KeyAgg list",
            Tag::KeyAggCoefficient => "KeyAgg coefficient",
            Tag::MuSigAux => "MuSig/aux",
            Tag::MuSigNonce => "MuSig/nonce",
            Tag::MuSigNonceCoef => "MuSig/noncecoef",
            Tag::MuSigDeterministicNonce => "MuSig/deterministic/nonce",
            Tag::Bip340Challenge => "BIP0340/challenge",
            Tag::TapLeaf => "TapLeaf",
            Tag::TapBranch => "TapBranch",
            Tag::TapTweak => "TapTweak",
        }
    }
}

/// A streaming BIP340 tagged hash.
#[derive(Clone)]
pub struct TaggedHasher(Sha256);

impl TaggedHasher {
    /// Start a hash for the given domain.
    pub fn new(tag: Tag) -> TaggedHasher {
        let prefix = Sha256::digest(tag.as_str().as_bytes());
        let mut h = Sha256::new();
        h.update(prefix);
        h.update(prefix);
        TaggedHasher(h)
    }

    /// Append a part to the hash.
    pub fn append(&mut self, bytes: &[u8]) -> &mut TaggedHasher {
        self.0.update(bytes);
        self
    }

    /// Append a part prefixed by its length as a single byte.
    pub fn append_len_u8(&mut self, bytes: &[u8]) -> &mut TaggedHasher {
        self.0.update([bytes.len() as u8]);
        self.0.update(bytes);
        self
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }

    /// Finish and reduce the digest modulo the curve order.
    pub fn challenge_scalar(self) -> Scalar {
        curve::scalar_reduce(&self.finalize())
    }
}

/// One shot tagged hash over a list of parts.
pub fn tagged_hash(tag: Tag, parts: &[&[u8]]) -> [u8; 32] {
    let mut h = TaggedHasher::new(tag);
    for p in parts {
        h.append(p);
    }
    h.finalize()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn streaming_matches_one_shot() {
        let mut h = TaggedHasher::new(Tag::TapBranch);
        h.append(b"left").append(b"right");
        assert_eq!(h.finalize(), tagged_hash(Tag::TapBranch, &[b"left", b"right"]));
    }

    #[test]
    fn tags_separate_domains() {
        let a = tagged_hash(Tag::TapLeaf, &[b"data"]);
        let b = tagged_hash(Tag::TapBranch, &[b"data"]);
        assert_ne!(a, b);
    }

    #[test]
    fn tagged_hash_prefix() {
        // SHA256(SHA256("TapTweak") || SHA256("TapTweak")) with no data
        let tag = Sha256::digest(b"TapTweak");
        let mut h = Sha256::new();
        h.update(tag);
        h.update(tag);
        let expected: [u8; 32] = h.finalize().into();
        assert_eq!(tagged_hash(Tag::TapTweak, &[]), expected);
    }
}

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

//! MuSig Key
//!
//! Key aggregation as defined by BIP327. The key list hash and the
//! second distinct key are computed once, when the context is built,
//! and travel with every context derived from it by tweaking.

use std::sync::Arc;

use k256::{ProjectivePoint, Scalar};
use tracing::trace;

use crate::curve;
use crate::errors::MuSigError;
use crate::keys::{PublicKey, SecretKey};
use crate::tools::{Tag, TaggedHasher};

/// How keys are encoded into the key list hash and coefficients.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyEncoding {
    /// 33 byte compressed keys (BIP327).
    Compressed,
    /// 32 byte x-only keys, each lifted to even Y.
    XOnly,
}

/// A tweak to apply to an aggregate key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tweak {
    /// Big endian tweak scalar, must be below the curve order.
    pub tweak: [u8; 32],
    /// Taproot style tweak of the even Y aggregate.
    pub xonly: bool,
}

#[derive(Debug)]
struct KeySet {
    encoding: KeyEncoding,
    keys: Vec<PublicKey>,
    list_hash: [u8; 32],
    second_key: Option<PublicKey>,
}

impl KeySet {
    fn encode(&self, pk: &PublicKey) -> Vec<u8> {
        match self.encoding {
            KeyEncoding::Compressed => pk.to_bytes().to_vec(),
            KeyEncoding::XOnly => pk.to_xonly().to_vec(),
        }
    }

    fn normalize(&self, pk: &PublicKey) -> PublicKey {
        match self.encoding {
            KeyEncoding::Compressed => *pk,
            KeyEncoding::XOnly => pk.to_even_y(),
        }
    }

    // a_i = 1 for the second distinct key, H(L || X_i) otherwise
    fn coefficient(&self, pk: &PublicKey) -> Scalar {
        if self.second_key.as_ref() == Some(pk) {
            return Scalar::ONE;
        }
        let mut h = TaggedHasher::new(Tag::KeyAggCoefficient);
        h.append(&self.list_hash).append(&self.encode(pk));
        h.challenge_scalar()
    }
}

/// MuSig aggregated key context
///
/// Immutable. Tweaking returns a new context sharing the key set.
#[derive(Clone, Debug)]
pub struct KeyAggContext {
    key_set: Arc<KeySet>,
    aggregated_key: ProjectivePoint,
    g_acc: Scalar,
    t_acc: Scalar,
}

impl KeyAggContext {
    /// Aggregate compressed keys in the given order.
    pub fn new(pubkeys: Vec<PublicKey>) -> Result<Self, MuSigError> {
        Self::with_encoding(pubkeys, KeyEncoding::Compressed)
    }

    /// Aggregate keys by their x coordinate.
    pub fn new_xonly(pubkeys: Vec<PublicKey>) -> Result<Self, MuSigError> {
        Self::with_encoding(pubkeys, KeyEncoding::XOnly)
    }

    /// Aggregate keys under the given encoding.
    pub fn with_encoding(pubkeys: Vec<PublicKey>, encoding: KeyEncoding) -> Result<Self, MuSigError> {
        if pubkeys.is_empty() {
            return Err(MuSigError::EmptyKeySet);
        }
        if pubkeys.len() > u32::MAX as usize {
            return Err(MuSigError::TooManyParticipants);
        }

        let mut key_set = KeySet {
            encoding,
            keys: Vec::with_capacity(pubkeys.len()),
            list_hash: [0u8; 32],
            second_key: None,
        };
        key_set.keys = pubkeys.iter().map(|pk| key_set.normalize(pk)).collect();

        // <L> = H(X_1 || X_2 || ... || X_n)
        let mut h = TaggedHasher::new(Tag::KeyAggList);
        for pk in &key_set.keys {
            h.append(&key_set.encode(pk));
        }
        key_set.list_hash = h.finalize();

        let first = key_set.encode(&key_set.keys[0]);
        key_set.second_key = key_set
            .keys
            .iter()
            .find(|pk| key_set.encode(pk) != first)
            .copied();

        // aggregated_key = sum_i ( a_i * X_i )
        let mut aggregated_key = ProjectivePoint::IDENTITY;
        for pk in &key_set.keys {
            let a = key_set.coefficient(pk);
            if a == Scalar::ONE {
                aggregated_key += pk.as_point();
            } else {
                aggregated_key += *pk.as_point() * a;
            }
        }

        if curve::is_infinity(&aggregated_key) {
            return Err(MuSigError::PointAtInfinity);
        }

        trace!(keys = key_set.keys.len(), ?encoding, "aggregated key set");

        Ok(KeyAggContext {
            key_set: Arc::new(key_set),
            aggregated_key,
            g_acc: Scalar::ONE,
            t_acc: Scalar::ZERO,
        })
    }

    /// Apply a plain or x-only tweak, returning the tweaked context.
    pub fn with_tweak(&self, tweak: &[u8; 32], xonly: bool) -> Result<Self, MuSigError> {
        let t = curve::scalar_from_bytes(tweak).map_err(|_| MuSigError::InvalidTweak)?;

        let flip = if xonly {
            curve::odd_y(&self.aggregated_key)
        } else {
            0u8.into()
        };
        let g = curve::scalar_negate_if(&Scalar::ONE, flip);

        // Q' = g*Q + t*G
        let aggregated_key = self.aggregated_key * g + curve::mul_g(&t);
        if curve::is_infinity(&aggregated_key) {
            return Err(MuSigError::PointAtInfinity);
        }

        Ok(KeyAggContext {
            key_set: self.key_set.clone(),
            aggregated_key,
            g_acc: g * self.g_acc,
            t_acc: t + g * self.t_acc,
        })
    }

    /// Apply tweaks in order.
    pub fn with_tweaks(&self, tweaks: &[Tweak]) -> Result<Self, MuSigError> {
        let mut ctx = self.clone();
        for t in tweaks {
            ctx = ctx.with_tweak(&t.tweak, t.xonly)?;
        }
        Ok(ctx)
    }

    /// Returns `a_i` factor for component key in aggregated key.
    pub fn key_coefficient(&self, pk: &PublicKey) -> Result<Scalar, MuSigError> {
        let pk = self.signer_key(pk)?;
        Ok(self.key_set.coefficient(&pk))
    }

    /// The key as it enters aggregation, i.e. lifted to even Y for x-only sets.
    pub fn signer_key(&self, pk: &PublicKey) -> Result<PublicKey, MuSigError> {
        let pk = self.key_set.normalize(pk);
        if !self.key_set.keys.contains(&pk) {
            return Err(MuSigError::KeyNotInSet);
        }
        Ok(pk)
    }

    /// The secret scalar matching `signer_key` of the secret's public key.
    pub(crate) fn signer_secret(&self, sk: &SecretKey) -> Scalar {
        let d = *sk.as_scalar();
        match self.key_set.encoding {
            KeyEncoding::Compressed => d,
            KeyEncoding::XOnly => {
                let p = curve::mul_g(&d);
                curve::scalar_negate_if(&d, curve::odd_y(&p))
            }
        }
    }

    /// Whether the key is part of the set.
    pub fn contains(&self, pk: &PublicKey) -> bool {
        self.signer_key(pk).is_ok()
    }

    /// Returns VerificationKey representation of aggregated key.
    pub fn aggregated_pubkey(&self) -> PublicKey {
        PublicKey(self.aggregated_key)
    }

    /// X coordinate of the aggregated key.
    pub fn aggregated_xonly(&self) -> [u8; 32] {
        curve::serialize_xonly(&self.aggregated_key)
    }

    /// Keys in aggregation order.
    pub fn pubkeys(&self) -> &[PublicKey] {
        &self.key_set.keys
    }

    /// Key encoding of this set.
    pub fn encoding(&self) -> KeyEncoding {
        self.key_set.encoding
    }

    /// Hash of the key list.
    pub fn list_hash(&self) -> [u8; 32] {
        self.key_set.list_hash
    }

    /// Accumulated sign of the tweak chain, `1` or `-1`.
    pub fn g_acc(&self) -> Scalar {
        self.g_acc
    }

    /// Accumulated tweak.
    pub fn t_acc(&self) -> Scalar {
        self.t_acc
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.key_set.keys.len()
    }

    /// Always false, a context holds at least one key.
    pub fn is_empty(&self) -> bool {
        self.key_set.keys.is_empty()
    }
}

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

//! MuSig Types
//!
//! A `Session` binds an aggregate nonce, a message and a (tweaked) key
//! aggregation context. Everything derived from them is computed once in
//! `Session::start` and read from there by signing, verification and
//! aggregation.

use std::fmt::Debug;

use bitcoin::hex::DisplayHex;
use k256::{ProjectivePoint, Scalar};
use subtle::Choice;
use tracing::{debug, trace, warn};

use crate::config::SignerConfig;
use crate::curve;
use crate::errors::{MuSigError, SignerError};
use crate::keys::{KeyAggContext, PublicKey, SecretKey};
use crate::musig::{AggregateNonce, NonceStore, PublicNonce, SecretNonce};
use crate::signature::Signature;
use crate::tools::{Tag, TaggedHasher};

/// Length of a partial signature.
pub const PARTIAL_SIGNATURE_LENGTH: usize = 32;

/// One signer's share `s_i` of the final signature.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct PartialSignature(pub(crate) Scalar);

impl Debug for PartialSignature {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "PartialSignature({})", self.to_bytes()[..].to_lower_hex_string())
    }
}

impl PartialSignature {
    pub(crate) const DESCRIPTION: &'static str = "A MuSig2 partial signature as a 32 byte scalar.";

    /// Big endian scalar bytes.
    pub fn to_bytes(&self) -> [u8; PARTIAL_SIGNATURE_LENGTH] {
        curve::scalar_to_bytes(&self.0)
    }

    /// Parse a scalar below the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<PartialSignature, SignerError> {
        if bytes.len() != PARTIAL_SIGNATURE_LENGTH {
            return Err(SignerError::BytesLength {
                name: "PartialSignature",
                length: PARTIAL_SIGNATURE_LENGTH,
            });
        }
        curve::scalar_from_bytes(bytes).map(PartialSignature)
    }
}

serde_boilerplate!(PartialSignature);

/// The signing session, holding every value derived at start.
#[derive(Clone, Debug)]
pub struct Session {
    key_agg_ctx: KeyAggContext,
    aggregate_nonce: AggregateNonce,
    message: Vec<u8>,
    /// Nonce coefficient
    b: Scalar,
    /// Challenge
    e: Scalar,
    /// Final nonce, never infinity
    r: ProjectivePoint,
    verify_partial_signatures: bool,
}

impl Session {
    /// Start a session with the default configuration.
    pub fn start(aggregate_nonce: &AggregateNonce, message: &[u8], key_agg_ctx: &KeyAggContext) -> Session {
        Session::with_config(aggregate_nonce, message, key_agg_ctx, &SignerConfig::default())
    }

    /// Start a session.
    pub fn with_config(
        aggregate_nonce: &AggregateNonce,
        message: &[u8],
        key_agg_ctx: &KeyAggContext,
        config: &SignerConfig,
    ) -> Session {
        let q = key_agg_ctx.aggregated_xonly();

        // b = H(aggnonce || x(Q) || m)
        let mut h = TaggedHasher::new(Tag::MuSigNonceCoef);
        h.append(&aggregate_nonce.to_bytes()).append(&q).append(message);
        let b = h.challenge_scalar();

        // R = R_1 + b*R_2, or G if that is infinity
        let mut r = aggregate_nonce.r1 + aggregate_nonce.r2 * b;
        if curve::is_infinity(&r) {
            r = ProjectivePoint::GENERATOR;
        }

        // e = H(x(R) || x(Q) || m)
        let mut h = TaggedHasher::new(Tag::Bip340Challenge);
        h.append(&curve::serialize_xonly(&r)).append(&q).append(message);
        let e = h.challenge_scalar();

        debug!(
            aggregate_key = %q[..].to_lower_hex_string(),
            signers = key_agg_ctx.len(),
            "started signing session"
        );

        Session {
            key_agg_ctx: key_agg_ctx.clone(),
            aggregate_nonce: *aggregate_nonce,
            message: message.to_vec(),
            b,
            e,
            r,
            verify_partial_signatures: config.verify_partial_signatures,
        }
    }

    /// The key aggregation context signed for.
    pub fn key_agg_ctx(&self) -> &KeyAggContext {
        &self.key_agg_ctx
    }

    /// The aggregate nonce.
    pub fn aggregate_nonce(&self) -> &AggregateNonce {
        &self.aggregate_nonce
    }

    /// The message signed.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Nonce coefficient `b`.
    pub fn nonce_coefficient(&self) -> Scalar {
        self.b
    }

    /// Challenge `e`.
    pub fn challenge(&self) -> Scalar {
        self.e
    }

    /// Final nonce point `R` before its Y is made even.
    pub fn final_nonce(&self) -> PublicKey {
        PublicKey(self.r)
    }

    // -1 when Q has odd Y
    fn key_parity(&self) -> Choice {
        curve::odd_y(self.key_agg_ctx.aggregated_pubkey().as_point())
    }

    /// Sign with the secret nonce stored for `public_nonce`.
    ///
    /// The secret nonce is removed from the store whether or not signing succeeds.
    pub fn partial_sign(
        &self,
        store: &NonceStore,
        secret_key: &SecretKey,
        public_nonce: &PublicNonce,
    ) -> Result<PartialSignature, MuSigError> {
        let secret_nonce = store.take(public_nonce)?;
        self.sign_with_nonce(secret_nonce, secret_key)
    }

    /// Sign with a secret nonce, consuming it.
    pub fn sign_with_nonce(
        &self,
        secret_nonce: SecretNonce,
        secret_key: &SecretKey,
    ) -> Result<PartialSignature, MuSigError> {
        let pubkey = PublicKey::from_secret(secret_key);
        if pubkey != secret_nonce.pubkey {
            return Err(MuSigError::SecretKeyMismatch);
        }
        let a = self.key_agg_ctx.key_coefficient(&pubkey)?;

        // d = g * gacc * d'
        let g = curve::scalar_negate_if(&self.key_agg_ctx.g_acc(), self.key_parity());
        let d = g * self.key_agg_ctx.signer_secret(secret_key);

        let flip = curve::odd_y(&self.r);
        let k1 = curve::scalar_negate_if(&secret_nonce.k1, flip);
        let k2 = curve::scalar_negate_if(&secret_nonce.k2, flip);

        // s = k1 + b*k2 + e*a*d
        let s = PartialSignature(k1 + self.b * k2 + self.e * a * d);
        let public_nonce = secret_nonce.public_nonce();
        drop(secret_nonce);

        trace!(signer = ?pubkey, "produced partial signature");

        if self.verify_partial_signatures && !self.partial_verify(&s, &pubkey, &public_nonce) {
            warn!(signer = ?pubkey, "partial signature failed self verification");
            return Err(MuSigError::InvalidPartialSignature {
                signer: pubkey.to_bytes()[..].to_lower_hex_string(),
            });
        }
        Ok(s)
    }

    /// Check one signer's share:
    /// `s*G == ±(R_1 + b*R_2) + e*a*g*gacc*P`
    pub fn partial_verify(
        &self,
        partial_signature: &PartialSignature,
        pubkey: &PublicKey,
        public_nonce: &PublicNonce,
    ) -> bool {
        let p = match self.key_agg_ctx.signer_key(pubkey) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let a = match self.key_agg_ctx.key_coefficient(&p) {
            Ok(a) => a,
            Err(_) => return false,
        };

        let re = public_nonce.r1 + public_nonce.r2 * self.b;
        let re = curve::negate_if(&re, curve::odd_y(&self.r));
        let g = curve::scalar_negate_if(&self.key_agg_ctx.g_acc(), self.key_parity());

        curve::mul_g(&partial_signature.0) == re + *p.as_point() * (self.e * a * g)
    }

    /// Verify a share, naming the signer on failure.
    pub fn verify_partial_signature(
        &self,
        partial_signature: &PartialSignature,
        pubkey: &PublicKey,
        public_nonce: &PublicNonce,
    ) -> Result<(), MuSigError> {
        if self.partial_verify(partial_signature, pubkey, public_nonce) {
            return Ok(());
        }
        Err(MuSigError::InvalidPartialSignature {
            signer: pubkey.to_bytes()[..].to_lower_hex_string(),
        })
    }

    /// Sum the shares into the final signature: `s = Σ s_i + e*g*tacc`
    pub fn aggregate_signatures(&self, partial_signatures: &[PartialSignature]) -> Signature {
        let g = curve::scalar_negate_if(&Scalar::ONE, self.key_parity());
        let s = partial_signatures
            .iter()
            .fold(self.e * g * self.key_agg_ctx.t_acc(), |acc, p| acc + p.0);
        Signature {
            r: curve::serialize_xonly(&self.r),
            s,
        }
    }
}

/// Sign without randomness, after every other signer has published a nonce.
///
/// Returns this signer's public nonce and partial signature. The nonce is
/// derived from the secret key, the other signers' aggregate nonce, the
/// tweaked aggregate key and the message, so it must be the last nonce
/// contributed to the session.
pub fn deterministic_sign(
    secret_key: &SecretKey,
    aggregate_other_nonce: &AggregateNonce,
    key_agg_ctx: &KeyAggContext,
    message: &[u8],
    rand: Option<&[u8; 32]>,
) -> Result<(PublicNonce, PartialSignature), MuSigError> {
    let (secret_nonce, public_nonce) =
        SecretNonce::deterministic(secret_key, aggregate_other_nonce, key_agg_ctx, message, rand)?;
    let aggregate_nonce = aggregate_other_nonce.combine(&public_nonce);
    let session = Session::start(&aggregate_nonce, message, key_agg_ctx);
    let s = session.sign_with_nonce(secret_nonce, secret_key)?;
    Ok((public_nonce, s))
}

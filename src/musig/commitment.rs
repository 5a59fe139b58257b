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

//! Commitments used in the first stage of musig
//!
//! Each signer contributes a pair of nonce points `(R_1, R_2)`. The
//! secret half never leaves the signer and is wiped when dropped.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use k256::{ProjectivePoint, Scalar};
use rand::{CryptoRng, RngCore};
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve;
use crate::errors::{MuSigError, SignerError};
use crate::keys::{KeyAggContext, PublicKey, SecretKey};
use crate::tools::{Tag, TaggedHasher};

/// Length of a public or aggregate nonce.
pub const PUBLIC_NONCE_LENGTH: usize = 66;

/// Length of a secret nonce: `k_1 || k_2 || pk`.
pub const SECRET_NONCE_LENGTH: usize = 97;

/// The public half of a signer's nonce pair. Neither point is infinity.
#[derive(Copy, Clone)]
pub struct PublicNonce {
    pub(crate) r1: ProjectivePoint,
    pub(crate) r2: ProjectivePoint,
}

/// Pointwise sum of every signer's public nonce.
///
/// A component may be infinity, encoded as 33 zero bytes.
#[derive(Copy, Clone)]
pub struct AggregateNonce {
    pub(crate) r1: ProjectivePoint,
    pub(crate) r2: ProjectivePoint,
}

/// The secret half of a signer's nonce pair, bound to the signer's key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretNonce {
    pub(crate) k1: Scalar,
    pub(crate) k2: Scalar,
    #[zeroize(skip)]
    pub(crate) pubkey: PublicKey,
}

fn encode_pair(r1: &ProjectivePoint, r2: &ProjectivePoint) -> [u8; PUBLIC_NONCE_LENGTH] {
    let mut bytes = [0u8; PUBLIC_NONCE_LENGTH];
    bytes[..33].copy_from_slice(&curve::serialize_compressed(r1));
    bytes[33..].copy_from_slice(&curve::serialize_compressed(r2));
    bytes
}

fn check_nonce_length(name: &'static str, bytes: &[u8]) -> Result<(), SignerError> {
    if bytes.len() != PUBLIC_NONCE_LENGTH {
        return Err(SignerError::BytesLength {
            name,
            length: PUBLIC_NONCE_LENGTH,
        });
    }
    Ok(())
}

impl PublicNonce {
    pub(crate) const DESCRIPTION: &'static str = "A MuSig2 public nonce as two 33 byte compressed points.";

    /// Serialize as two compressed points.
    pub fn to_bytes(&self) -> [u8; PUBLIC_NONCE_LENGTH] {
        encode_pair(&self.r1, &self.r2)
    }

    /// Parse two compressed points, neither of which may be infinity.
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicNonce, SignerError> {
        check_nonce_length("PublicNonce", bytes)?;
        let r1 = curve::point_from_bytes(&bytes[..33])
            .map_err(|_| SignerError::from(MuSigError::InvalidNonce))?;
        let r2 = curve::point_from_bytes(&bytes[33..])
            .map_err(|_| SignerError::from(MuSigError::InvalidNonce))?;
        Ok(PublicNonce { r1, r2 })
    }
}

impl AggregateNonce {
    pub(crate) const DESCRIPTION: &'static str =
        "A MuSig2 aggregate nonce as two 33 byte compressed points, zero bytes for infinity.";

    /// Sum public nonces component by component.
    pub fn sum(nonces: &[PublicNonce]) -> AggregateNonce {
        let mut agg = AggregateNonce {
            r1: ProjectivePoint::IDENTITY,
            r2: ProjectivePoint::IDENTITY,
        };
        for n in nonces {
            agg = agg.combine(n);
        }
        agg
    }

    /// Add one more public nonce.
    pub fn combine(&self, nonce: &PublicNonce) -> AggregateNonce {
        AggregateNonce {
            r1: self.r1 + nonce.r1,
            r2: self.r2 + nonce.r2,
        }
    }

    /// Serialize as two compressed points.
    pub fn to_bytes(&self) -> [u8; PUBLIC_NONCE_LENGTH] {
        encode_pair(&self.r1, &self.r2)
    }

    /// Parse two compressed points, allowing the infinity marker.
    pub fn from_bytes(bytes: &[u8]) -> Result<AggregateNonce, SignerError> {
        check_nonce_length("AggregateNonce", bytes)?;
        let r1 = curve::point_from_bytes_ext(&bytes[..33])
            .map_err(|_| SignerError::from(MuSigError::InvalidNonce))?;
        let r2 = curve::point_from_bytes_ext(&bytes[33..])
            .map_err(|_| SignerError::from(MuSigError::InvalidNonce))?;
        Ok(AggregateNonce { r1, r2 })
    }
}

macro_rules! nonce_eq_by_bytes { ($t:ty) => {
    impl PartialEq for $t {
        fn eq(&self, other: &Self) -> bool {
            self.r1 == other.r1 && self.r2 == other.r2
        }
    }

    impl Eq for $t {}

    impl Hash for $t {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.to_bytes().hash(state)
        }
    }

    impl Debug for $t {
        fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
            write!(f, "{}(", stringify!($t))?;
            for b in self.to_bytes().iter() {
                write!(f, "{:02x}", b)?;
            }
            write!(f, ")")
        }
    }
} }

nonce_eq_by_bytes!(PublicNonce);
nonce_eq_by_bytes!(AggregateNonce);

serde_boilerplate!(PublicNonce);
serde_boilerplate!(AggregateNonce);

impl Debug for SecretNonce {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "SecretNonce({:?}, ..)", self.pubkey)
    }
}

/// Overwrite nonce scalars with zero when they go out of scope.
fn nonzero(k: Scalar) -> Result<Scalar, MuSigError> {
    if curve::is_zero(&k) {
        return Err(MuSigError::ZeroNonce);
    }
    Ok(k)
}

// rand = sk XOR H_aux(rand')
fn mask_secret(sk: &SecretKey, rand: &[u8; 32]) -> [u8; 32] {
    let mut h = TaggedHasher::new(Tag::MuSigAux);
    h.append(rand);
    let mut masked = h.finalize();
    let mut secret = sk.to_bytes();
    for (m, s) in masked.iter_mut().zip(secret.iter()) {
        *m ^= s;
    }
    secret.zeroize();
    masked
}

impl SecretNonce {
    /// Generate a nonce pair from fresh randomness.
    ///
    /// Every optional argument that is known should be passed: they
    /// harden the nonce against a broken `csprng`.
    pub fn generate<R>(
        csprng: &mut R,
        secret_key: Option<&SecretKey>,
        pubkey: &PublicKey,
        aggregate_xonly: Option<&[u8]>,
        message: Option<&[u8]>,
        extra_input: &[u8],
    ) -> Result<(SecretNonce, PublicNonce), MuSigError>
    where
        R: CryptoRng + RngCore,
    {
        let mut session_id = [0u8; 32];
        csprng.fill_bytes(&mut session_id);
        let out = SecretNonce::from_session_id(
            &session_id,
            secret_key,
            pubkey,
            aggregate_xonly,
            message,
            extra_input,
        );
        session_id.zeroize();
        out
    }

    /// Derive a nonce pair from a caller supplied 32 byte session id.
    ///
    /// The session id must be uniformly random and never reused.
    pub fn from_session_id(
        session_id: &[u8; 32],
        secret_key: Option<&SecretKey>,
        pubkey: &PublicKey,
        aggregate_xonly: Option<&[u8]>,
        message: Option<&[u8]>,
        extra_input: &[u8],
    ) -> Result<(SecretNonce, PublicNonce), MuSigError> {
        let mut rand = match secret_key {
            Some(sk) => mask_secret(sk, session_id),
            None => *session_id,
        };

        let pk = pubkey.to_bytes();
        let aggpk = aggregate_xonly.unwrap_or(&[]);

        let mut h = TaggedHasher::new(Tag::MuSigNonce);
        h.append(&rand).append_len_u8(&pk).append_len_u8(aggpk);
        match message {
            None => {
                h.append(&[0u8]);
            }
            Some(m) => {
                h.append(&[1u8]).append(&(m.len() as u64).to_be_bytes()).append(m);
            }
        }
        h.append(&(extra_input.len() as u32).to_be_bytes()).append(extra_input);
        rand.zeroize();

        let derive = |i: u8| {
            let mut h_i = h.clone();
            h_i.append(&[i]);
            nonzero(h_i.challenge_scalar())
        };
        let secret = SecretNonce {
            k1: derive(0)?,
            k2: derive(1)?,
            pubkey: *pubkey,
        };
        let public = secret.public_nonce();

        trace!(nonce = ?public, "generated nonce pair");
        Ok((secret, public))
    }

    /// Derive a nonce pair with no randomness for deterministic signing.
    ///
    /// The other signers' nonces must already be aggregated into
    /// `aggregate_other_nonce`, and `key_agg_ctx` must be fully tweaked.
    pub fn deterministic(
        secret_key: &SecretKey,
        aggregate_other_nonce: &AggregateNonce,
        key_agg_ctx: &KeyAggContext,
        message: &[u8],
        rand: Option<&[u8; 32]>,
    ) -> Result<(SecretNonce, PublicNonce), MuSigError> {
        let mut seed = match rand {
            Some(r) => mask_secret(secret_key, r),
            None => secret_key.to_bytes(),
        };

        let mut h = TaggedHasher::new(Tag::MuSigDeterministicNonce);
        h.append(&seed)
            .append(&aggregate_other_nonce.to_bytes())
            .append(&key_agg_ctx.aggregated_xonly())
            .append(&(message.len() as u64).to_be_bytes())
            .append(message);
        seed.zeroize();

        let derive = |i: u8| {
            let mut h_i = h.clone();
            h_i.append(&[i]);
            nonzero(h_i.challenge_scalar())
        };
        let secret = SecretNonce {
            k1: derive(0)?,
            k2: derive(1)?,
            pubkey: PublicKey::from_secret(secret_key),
        };
        let public = secret.public_nonce();
        Ok((secret, public))
    }

    /// The public nonce matching this secret nonce.
    pub fn public_nonce(&self) -> PublicNonce {
        PublicNonce {
            r1: curve::mul_g(&self.k1),
            r2: curve::mul_g(&self.k2),
        }
    }

    /// The key this nonce was generated for.
    pub fn pubkey(&self) -> &PublicKey {
        &self.pubkey
    }

    /// Serialize as `k_1 || k_2 || pk`.
    pub fn to_bytes(&self) -> [u8; SECRET_NONCE_LENGTH] {
        let mut bytes = [0u8; SECRET_NONCE_LENGTH];
        bytes[..32].copy_from_slice(&curve::scalar_to_bytes(&self.k1));
        bytes[32..64].copy_from_slice(&curve::scalar_to_bytes(&self.k2));
        bytes[64..].copy_from_slice(&self.pubkey.to_bytes());
        bytes
    }

    /// Parse `k_1 || k_2 || pk`; both scalars must be non zero.
    pub fn from_bytes(bytes: &[u8]) -> Result<SecretNonce, SignerError> {
        if bytes.len() != SECRET_NONCE_LENGTH {
            return Err(SignerError::BytesLength {
                name: "SecretNonce",
                length: SECRET_NONCE_LENGTH,
            });
        }
        let k1 = curve::secret_scalar_from_bytes(&bytes[..32])?;
        let k2 = curve::secret_scalar_from_bytes(&bytes[32..64])?;
        let pubkey = PublicKey::from_bytes(&bytes[64..])?;
        Ok(SecretNonce { k1, k2, pubkey })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Keypair;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    #[test]
    fn generated_pair_matches() {
        let mut csprng = ChaChaRng::from_seed([0u8; 32]);
        let kp = Keypair::generate(&mut csprng);
        let (secret, public) =
            SecretNonce::generate(&mut csprng, Some(&kp.secret), &kp.public, None, None, b"").unwrap();
        assert_eq!(secret.public_nonce(), public);
        assert_eq!(secret.pubkey(), &kp.public);
    }

    #[test]
    fn zeroize_wipes_scalars_keeps_key() {
        let mut csprng = ChaChaRng::from_seed([7u8; 32]);
        let kp = Keypair::generate(&mut csprng);
        let (mut secret, _) = SecretNonce::generate(&mut csprng, None, &kp.public, None, None, b"").unwrap();
        secret.zeroize();
        let bytes = secret.to_bytes();
        assert_eq!(&bytes[..64], &[0u8; 64][..]);
        assert_eq!(&bytes[64..], &kp.public.to_bytes()[..]);
    }

    #[test]
    fn session_id_inputs_separate_nonces() {
        let kp = Keypair::generate(&mut ChaChaRng::from_seed([1u8; 32]));
        let id = [5u8; 32];
        let (_, a) = SecretNonce::from_session_id(&id, None, &kp.public, None, None, b"").unwrap();
        let (_, b) = SecretNonce::from_session_id(&id, None, &kp.public, None, Some(&[][..]), b"").unwrap();
        let (_, c) = SecretNonce::from_session_id(&id, Some(&kp.secret), &kp.public, None, None, b"").unwrap();
        let (_, a2) = SecretNonce::from_session_id(&id, None, &kp.public, None, None, b"").unwrap();
        // no message differs from an empty message
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a2);
    }

    #[test]
    fn aggregate_keeps_infinity() {
        let kp = Keypair::generate(&mut ChaChaRng::from_seed([2u8; 32]));
        let (_, public) = SecretNonce::from_session_id(&[3u8; 32], None, &kp.public, None, None, b"").unwrap();
        let negated = PublicNonce {
            r1: -public.r1,
            r2: public.r2,
        };
        let agg = AggregateNonce::sum(&[public, negated]);
        let bytes = agg.to_bytes();
        assert_eq!(&bytes[..33], &[0u8; 33][..]);
        assert_eq!(AggregateNonce::from_bytes(&bytes).unwrap(), agg);
        assert!(PublicNonce::from_bytes(&bytes).is_err());
    }

    #[test]
    fn secret_nonce_bytes() {
        let kp = Keypair::generate(&mut ChaChaRng::from_seed([4u8; 32]));
        let (secret, _) = SecretNonce::from_session_id(&[6u8; 32], None, &kp.public, None, None, b"").unwrap();
        let back = SecretNonce::from_bytes(&secret.to_bytes()).unwrap();
        assert_eq!(back.public_nonce(), secret.public_nonce());
        assert!(SecretNonce::from_bytes(&[0u8; SECRET_NONCE_LENGTH]).is_err());
    }
}

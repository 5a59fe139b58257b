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

//! BIP340 Schnorr signatures

use std::fmt::Debug;

use k256::Scalar;

use crate::curve;
use crate::errors::SignerError;
use crate::tools::{Tag, TaggedHasher};

/// The length of a BIP340 `Signature`, in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// A BIP340 Schnorr signature.
///
/// # Note
///
/// These signatures are "detached", that is they do **not** include a copy
/// of the message which has been signed.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Signature {
    /// `r` is the x coordinate of the nonce point `R`, which has even Y.
    pub(crate) r: [u8; 32],

    /// `s` is a `Scalar`, formed by s = k + ex
    /// e = HASH(r, PublicKey, message)
    pub(crate) s: Scalar,
}

impl Debug for Signature {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "Signature( r: {:?}, s: {:?} )", &self.r, &self.s)
    }
}

impl Signature {
    pub(crate) const DESCRIPTION: &'static str =
        "A 64 byte BIP340 signature: the x coordinate of R followed by s.";

    /// Convert this `Signature` to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes: [u8; SIGNATURE_LENGTH] = [0u8; SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&curve::scalar_to_bytes(&self.s));
        bytes
    }

    /// Construct a `Signature` from a slice of bytes.
    ///
    /// `s` must be below the curve order; `r` is checked on verification.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Signature, SignerError> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(SignerError::BytesLength {
                name: "Signature",
                length: SIGNATURE_LENGTH,
            });
        }
        let mut r = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        let s = curve::scalar_from_bytes(&bytes[32..])?;
        Ok(Signature { r, s })
    }

    /// The x coordinate of the nonce point.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// The response scalar.
    pub fn s(&self) -> &Scalar {
        &self.s
    }

    /// Verify this signature on `message` under the x-only key `xonly_key`.
    ///
    /// Checks `R = s*G - e*P` has even Y and `x(R) == r`, with
    /// `e = H_challenge(r || x(P) || m)`.
    pub fn verify(&self, message: &[u8], xonly_key: &[u8]) -> Result<(), SignerError> {
        let p = curve::lift_x(xonly_key)?;

        let mut h = TaggedHasher::new(Tag::Bip340Challenge);
        h.append(&self.r).append(xonly_key).append(message);
        let e = h.challenge_scalar();

        let r = curve::mul_g(&self.s) - p * e;
        if curve::is_infinity(&r) || !curve::has_even_y(&r) || curve::serialize_xonly(&r) != self.r {
            return Err(SignerError::Verify);
        }
        Ok(())
    }
}

serde_boilerplate!(Signature);

#[cfg(test)]
mod test {
    use super::*;
    use k256::schnorr::SigningKey;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[0x42u8; 32]).unwrap()
    }

    #[test]
    fn verifies_signatures_from_independent_signer() {
        let sk = signing_key();
        let xonly = sk.verifying_key().to_bytes();
        let message = b"All I want is to pet all of the dogs.";
        let sig = sk.sign_raw(message, &[0u8; 32]).unwrap();

        let ours = Signature::from_bytes(&sig.to_bytes()).unwrap();
        assert!(ours.verify(message, &xonly).is_ok());
        assert_eq!(ours.to_bytes(), sig.to_bytes());
    }

    #[test]
    fn rejects_wrong_message() {
        let sk = signing_key();
        let xonly = sk.verifying_key().to_bytes();
        let sig = sk.sign_raw(b"one", &[0u8; 32]).unwrap();

        let ours = Signature::from_bytes(&sig.to_bytes()).unwrap();
        assert_eq!(ours.verify(b"two", &xonly), Err(SignerError::Verify));
    }

    #[test]
    fn rejects_s_out_of_range() {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[32..].copy_from_slice(&[0xffu8; 32]);
        assert_eq!(Signature::from_bytes(&bytes), Err(SignerError::ScalarFormat));
    }

    #[test]
    fn serde_round_trip() {
        let sig = signing_key().sign_raw(b"m", &[1u8; 32]).unwrap();
        let ours = Signature::from_bytes(&sig.to_bytes()).unwrap();
        let encoded = bincode::serialize(&ours).unwrap();
        assert_eq!(bincode::deserialize::<Signature>(&encoded).unwrap(), ours);
    }
}

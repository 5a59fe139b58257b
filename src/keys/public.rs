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

//! secp256k1 Public Key generation,

use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use k256::ProjectivePoint;

use crate::curve;
use crate::keys::SecretKey;
use crate::SignerError;

/// The length of a compressed `PublicKey`, in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// The length of an x-only public key, in bytes.
pub const XONLY_PUBLIC_KEY_LENGTH: usize = 32;

/// A secp256k1 public key. Never the point at infinity.
#[derive(Copy, Clone)]
pub struct PublicKey(pub(crate) ProjectivePoint);

impl Debug for PublicKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "PublicKey(")?;
        for b in self.to_bytes().iter() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl PublicKey {
    pub(crate) const DESCRIPTION: &'static str = "A secp256k1 compressed public key as 33 bytes.";

    /// Access the point form
    pub fn as_point(&self) -> &ProjectivePoint {
        &self.0
    }

    /// Wrap a point, rejecting infinity.
    pub fn from_point(point: ProjectivePoint) -> Result<PublicKey, SignerError> {
        if curve::is_infinity(&point) {
            return Err(SignerError::PointDecompression);
        }
        Ok(PublicKey(point))
    }

    /// Convert this public key to its compressed encoding.
    #[inline]
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        curve::serialize_compressed(&self.0)
    }

    /// The x coordinate of this key.
    #[inline]
    pub fn to_xonly(&self) -> [u8; XONLY_PUBLIC_KEY_LENGTH] {
        curve::serialize_xonly(&self.0)
    }

    /// Whether the Y coordinate is even.
    pub fn has_even_y(&self) -> bool {
        curve::has_even_y(&self.0)
    }

    /// The same x coordinate with even Y.
    pub fn to_even_y(&self) -> PublicKey {
        PublicKey(curve::negate_if(&self.0, curve::odd_y(&self.0)))
    }

    /// Construct a `PublicKey` from a 33 byte compressed or 65 byte
    /// uncompressed encoding.
    ///
    /// # Returns
    ///
    /// A `Result` whose okay value is a `PublicKey` or whose error value
    /// is a `SignerError` describing the error that occurred.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey, SignerError> {
        curve::point_from_bytes(bytes).map(PublicKey)
    }

    /// Construct a `PublicKey` from a 32 byte x coordinate, choosing even Y.
    pub fn from_xonly(bytes: &[u8]) -> Result<PublicKey, SignerError> {
        curve::lift_x(bytes).map(PublicKey)
    }

    /// Derive this public key from its corresponding `SecretKey`.
    pub fn from_secret(secret_key: &SecretKey) -> PublicKey {
        PublicKey(curve::mul_g(secret_key.as_scalar()))
    }
}

impl From<&SecretKey> for PublicKey {
    fn from(source: &SecretKey) -> PublicKey {
        PublicKey::from_secret(source)
    }
}

// Ordering is lexicographic over the compressed encoding, the key sort order of BIP327.

impl PartialEq for PublicKey {
    fn eq(&self, other: &PublicKey) -> bool {
        self.0 == other.0
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state)
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &PublicKey) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

serde_boilerplate!(PublicKey);

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

//! secp256k1 Secret Key generation

use core::fmt::Debug;

use k256::elliptic_curve::Field;
use k256::Scalar;
use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve;
use crate::errors::SignerError;

/// The length of a secp256k1 `SecretKey`, in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// A secp256k1 secret key, a non zero scalar below the curve order.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(pub(crate) Scalar);

impl Debug for SecretKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "SecretKey(..)")
    }
}

impl Eq for SecretKey {}
impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).unwrap_u8() == 1u8
    }
}
impl ConstantTimeEq for SecretKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

/// Overwrite secret key material with null bytes when it goes out of scope.
impl SecretKey {
    /// Convert this secret key to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        curve::scalar_to_bytes(&self.0)
    }

    /// Construct a `SecretKey` from a slice of bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use utxo_musig::*;
    ///
    /// # fn doctest() -> Result<SecretKey, SignerError> {
    /// let mut secret_key_bytes = [0u8; SECRET_KEY_LENGTH];
    /// secret_key_bytes[31] = 3;
    ///
    /// let secret_key: SecretKey = SecretKey::from_bytes(&secret_key_bytes)?;
    /// #
    /// # Ok(secret_key)
    /// # }
    /// #
    /// # fn main() {
    /// #     let result = doctest();
    /// #     assert!(result.is_ok());
    /// # }
    /// ```
    ///
    /// # Returns
    ///
    /// A `Result` whose okay value is a `SecretKey` or whose error value
    /// is a `SignerError` describing the error that occurred. Zero and
    /// values at or above the curve order are rejected.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<SecretKey, SignerError> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(SignerError::BytesLength {
                name: "SecretKey",
                length: SECRET_KEY_LENGTH,
            });
        }
        curve::secret_scalar_from_bytes(bytes).map(SecretKey)
    }

    /// Generate a `SecretKey` from a `csprng`.
    ///
    /// # Input
    ///
    /// A CSPRNG with a `fill_bytes()` method, e.g. `rand_chacha::ChaChaRng`
    pub fn generate<T>(csprng: &mut T) -> SecretKey
    where
        T: CryptoRng + RngCore,
    {
        loop {
            let s = Scalar::random(&mut *csprng);
            if !curve::is_zero(&s) {
                return SecretKey(s);
            }
        }
    }

    /// View this secret key as a scalar.
    #[inline]
    pub fn as_scalar(&self) -> &Scalar {
        &self.0
    }

    /// Helper Method to Convert Scalar to Key
    pub fn from_scalar(s: Scalar) -> Result<SecretKey, SignerError> {
        if curve::is_zero(&s) {
            return Err(SignerError::ScalarFormat);
        }
        Ok(SecretKey(s))
    }
}

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

//! secp256k1 key pairs

use crate::keys::{PublicKey, SecretKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use crate::SignerError;
use rand::{CryptoRng, RngCore};

/// The length of a `Keypair`, in bytes.
pub const KEYPAIR_LENGTH: usize = SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH;

/// A secp256k1 keypair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    /// The secret half of this keypair.
    pub secret: SecretKey,
    /// The public half of this keypair.
    pub public: PublicKey,
}

impl From<SecretKey> for Keypair {
    fn from(secret: SecretKey) -> Keypair {
        let public = PublicKey::from_secret(&secret);
        Keypair { secret, public }
    }
}

impl Keypair {
    /// Convert this keypair to bytes.
    ///
    /// # Returns
    ///
    /// An array of bytes, `[u8; KEYPAIR_LENGTH]`.  The first
    /// `SECRET_KEY_LENGTH` of bytes is the `SecretKey`, and the next
    /// `PUBLIC_KEY_LENGTH` bytes is the compressed `PublicKey`
    pub fn to_bytes(&self) -> [u8; KEYPAIR_LENGTH] {
        let mut bytes: [u8; KEYPAIR_LENGTH] = [0u8; KEYPAIR_LENGTH];

        bytes[..SECRET_KEY_LENGTH].copy_from_slice(&self.secret.to_bytes());
        bytes[SECRET_KEY_LENGTH..].copy_from_slice(&self.public.to_bytes());
        bytes
    }

    /// Construct a `Keypair` from the bytes of a `SecretKey` and `PublicKey`.
    ///
    /// The public half must match the secret half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Keypair, SignerError> {
        if bytes.len() != KEYPAIR_LENGTH {
            return Err(SignerError::BytesLength {
                name: "Keypair",
                length: KEYPAIR_LENGTH,
            });
        }
        let secret = SecretKey::from_bytes(&bytes[..SECRET_KEY_LENGTH])?;
        let public = PublicKey::from_bytes(&bytes[SECRET_KEY_LENGTH..])?;

        if PublicKey::from_secret(&secret) != public {
            return Err(SignerError::Verify);
        }

        Ok(Keypair { secret, public })
    }

    /// Generate a keypair.
    ///
    /// # Example
    ///
    /// ```
    /// use rand::rngs::OsRng;
    /// use utxo_musig::*;
    ///
    /// let keypair: Keypair = Keypair::generate(&mut OsRng);
    /// assert_eq!(keypair.public, PublicKey::from_secret(&keypair.secret));
    /// ```
    pub fn generate<R>(csprng: &mut R) -> Keypair
    where
        R: CryptoRng + RngCore,
    {
        Keypair::from(SecretKey::generate(csprng))
    }

    /// Derive the `PublicKey` corresponding to this `SecretKey`.
    pub fn from_secret(s: &SecretKey) -> Keypair {
        Keypair {
            secret: s.clone(),
            public: PublicKey::from_secret(s),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    #[test]
    fn keypair_bytes_round_trip() {
        let keypair = Keypair::generate(&mut ChaChaRng::from_seed([0u8; 32]));
        let back = Keypair::from_bytes(&keypair.to_bytes()).unwrap();
        assert_eq!(back, keypair);
    }

    #[test]
    fn keypair_rejects_mismatched_halves() {
        let mut csprng = ChaChaRng::from_seed([0u8; 32]);
        let a = Keypair::generate(&mut csprng);
        let b = Keypair::generate(&mut csprng);
        let mut bytes = a.to_bytes();
        bytes[SECRET_KEY_LENGTH..].copy_from_slice(&b.public.to_bytes());
        assert_eq!(Keypair::from_bytes(&bytes), Err(SignerError::Verify));
    }
}

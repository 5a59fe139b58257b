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

//! Secret nonces waiting to be used, keyed by the bytes of their public nonce.
//!
//! A secret nonce leaves the store exactly once. Signing twice with the
//! same public nonce finds nothing the second time.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::{CryptoRng, RngCore};
use tracing::{debug, trace};

use crate::config::SignerConfig;
use crate::errors::MuSigError;
use crate::keys::{PublicKey, SecretKey};
use crate::musig::{PublicNonce, SecretNonce, PUBLIC_NONCE_LENGTH};

/// Thread safe single use secret nonce store.
#[derive(Debug, Default)]
pub struct NonceStore {
    entries: Mutex<HashMap<[u8; PUBLIC_NONCE_LENGTH], SecretNonce>>,
    max_entries: Option<usize>,
}

impl NonceStore {
    /// An unbounded store.
    pub fn new() -> NonceStore {
        NonceStore::default()
    }

    /// A store bounded as configured.
    pub fn with_config(config: &SignerConfig) -> NonceStore {
        NonceStore {
            entries: Mutex::new(HashMap::new()),
            max_entries: config.max_nonce_store_entries,
        }
    }

    /// Keep a secret nonce until its public nonce is signed with.
    pub fn insert(&self, public: &PublicNonce, secret: SecretNonce) -> Result<(), MuSigError> {
        let key = public.to_bytes();
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return Err(MuSigError::NonceReuse);
        }
        if let Some(max) = self.max_entries {
            if entries.len() >= max {
                return Err(MuSigError::NonceStoreFull);
            }
        }
        entries.insert(key, secret);
        trace!(stored = entries.len(), "stored secret nonce");
        Ok(())
    }

    /// Generate a nonce pair and keep the secret half.
    pub fn generate<R>(
        &self,
        csprng: &mut R,
        secret_key: Option<&SecretKey>,
        pubkey: &PublicKey,
        aggregate_xonly: Option<&[u8]>,
        message: Option<&[u8]>,
    ) -> Result<PublicNonce, MuSigError>
    where
        R: CryptoRng + RngCore,
    {
        let (secret, public) =
            SecretNonce::generate(csprng, secret_key, pubkey, aggregate_xonly, message, &[])?;
        self.insert(&public, secret)?;
        Ok(public)
    }

    /// Remove and return the secret nonce for a public nonce.
    pub fn take(&self, public: &PublicNonce) -> Result<SecretNonce, MuSigError> {
        let secret = self.entries.lock().remove(&public.to_bytes());
        match secret {
            Some(s) => {
                debug!(nonce = ?public, "consumed secret nonce");
                Ok(s)
            }
            None => Err(MuSigError::MissingNonce),
        }
    }

    /// Whether a secret nonce is held for a public nonce.
    pub fn contains(&self, public: &PublicNonce) -> bool {
        self.entries.lock().contains_key(&public.to_bytes())
    }

    /// Number of held secret nonces.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no secret nonce is held.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every held secret nonce.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

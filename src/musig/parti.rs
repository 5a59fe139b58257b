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

//! Protocol People
//!
//! A `Ceremony` tracks one signing run over a fixed key set from the
//! point of view of whoever collects nonces and partial signatures.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::SignerConfig;
use crate::errors::MuSigError;
use crate::keys::{KeyAggContext, PublicKey};
use crate::musig::{AggregateNonce, PartialSignature, PublicNonce, Session};
use crate::signature::Signature;

/// Musig State Machine, 2 round interactive protocol
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MuSigStateMachine {
    /// Collecting public nonces
    Uninitialized,
    /// Nonces aggregated, session values fixed
    SessionStarted,
    /// At least one partial signature accepted
    PartialSigned,
    /// Final signature computed
    Aggregated,
    /// A partial signature failed to verify; there is no way back
    Failed,
}

impl MuSigStateMachine {
    /// Name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            MuSigStateMachine::Uninitialized => "Uninitialized",
            MuSigStateMachine::SessionStarted => "SessionStarted",
            MuSigStateMachine::PartialSigned => "PartialSigned",
            MuSigStateMachine::Aggregated => "Aggregated",
            MuSigStateMachine::Failed => "Failed",
        }
    }
}

/// A member of the a MuSig protocol
#[derive(Clone, Debug)]
pub struct Parti {
    /// The position this member is in the key order
    pub(crate) position: usize,
    /// Round one contribution
    pub(crate) nonce: Option<PublicNonce>,
    /// Round two contribution, verified
    pub(crate) partial_sig: Option<PartialSignature>,
}

impl Parti {
    /// Create a new protocol member
    pub fn new(position: usize) -> Self {
        Parti {
            position,
            nonce: None,
            partial_sig: None,
        }
    }

    /// Position of the member in the key list.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// One signing run.
#[derive(Clone, Debug)]
pub struct Ceremony {
    key_agg_ctx: KeyAggContext,
    config: SignerConfig,
    /// All people in the protocol, by key
    parties: BTreeMap<PublicKey, Parti>,
    session: Option<Session>,
    signature: Option<Signature>,
    state: MuSigStateMachine,
}

impl Ceremony {
    /// Begin collecting nonces for the keys of `key_agg_ctx`.
    pub fn new(key_agg_ctx: KeyAggContext) -> Result<Ceremony, MuSigError> {
        Ceremony::with_config(key_agg_ctx, SignerConfig::default())
    }

    /// Begin with a signing configuration.
    ///
    /// Every key must appear once. A repeated key would need one nonce per
    /// occurrence, which `add_nonce` has no way to tell apart.
    pub fn with_config(key_agg_ctx: KeyAggContext, config: SignerConfig) -> Result<Ceremony, MuSigError> {
        let mut parties = BTreeMap::new();
        for (i, pk) in key_agg_ctx.pubkeys().iter().enumerate() {
            if parties.insert(*pk, Parti::new(i)).is_some() {
                return Err(MuSigError::DuplicateKey);
            }
        }
        Ok(Ceremony {
            key_agg_ctx,
            config,
            parties,
            session: None,
            signature: None,
            state: MuSigStateMachine::Uninitialized,
        })
    }

    /// Current state.
    pub fn state(&self) -> MuSigStateMachine {
        self.state
    }

    /// The session, once started.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The final signature, once aggregated.
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn invalid_transition(&self) -> MuSigError {
        MuSigError::InvalidTransition {
            state: self.state.name(),
        }
    }

    fn party_mut(&mut self, pk: &PublicKey) -> Result<&mut Parti, MuSigError> {
        let pk = self.key_agg_ctx.signer_key(pk)?;
        self.parties.get_mut(&pk).ok_or(MuSigError::KeyNotInSet)
    }

    /// Record a participant's public nonce.
    pub fn add_nonce(&mut self, pk: &PublicKey, nonce: PublicNonce) -> Result<(), MuSigError> {
        if self.state != MuSigStateMachine::Uninitialized {
            return Err(self.invalid_transition());
        }
        let party = self.party_mut(pk)?;
        if party.nonce.is_some() {
            return Err(MuSigError::NonceReuse);
        }
        party.nonce = Some(nonce);
        Ok(())
    }

    /// Whether every participant has published a nonce.
    pub fn has_all_nonces(&self) -> bool {
        self.parties.values().all(|p| p.nonce.is_some())
    }

    /// Aggregate the nonces and fix the message.
    pub fn start(&mut self, message: &[u8]) -> Result<&Session, MuSigError> {
        if self.state != MuSigStateMachine::Uninitialized {
            return Err(self.invalid_transition());
        }
        let mut nonces = Vec::with_capacity(self.parties.len());
        for party in self.parties.values() {
            nonces.push(party.nonce.ok_or(MuSigError::MissingNonce)?);
        }

        let session = Session::with_config(
            &AggregateNonce::sum(&nonces),
            message,
            &self.key_agg_ctx,
            &self.config,
        );
        self.state = MuSigStateMachine::SessionStarted;
        Ok(self.session.insert(session))
    }

    /// Verify and record a participant's partial signature.
    pub fn add_partial_signature(
        &mut self,
        pk: &PublicKey,
        partial_signature: PartialSignature,
    ) -> Result<(), MuSigError> {
        let session = match (&self.state, &self.session) {
            (MuSigStateMachine::SessionStarted, Some(s)) | (MuSigStateMachine::PartialSigned, Some(s)) => s.clone(),
            _ => return Err(self.invalid_transition()),
        };

        let party = self.party_mut(pk)?;
        if party.partial_sig.is_some() {
            return Err(self.invalid_transition());
        }
        let nonce = party.nonce.ok_or(MuSigError::MissingNonce)?;

        if let Err(e) = session.verify_partial_signature(&partial_signature, pk, &nonce) {
            warn!(signer = ?pk, "rejected partial signature, ceremony failed");
            self.state = MuSigStateMachine::Failed;
            return Err(e);
        }

        party.partial_sig = Some(partial_signature);
        self.state = MuSigStateMachine::PartialSigned;
        Ok(())
    }

    /// Whether every participant has a verified partial signature.
    pub fn has_all_partial_signatures(&self) -> bool {
        self.parties.values().all(|p| p.partial_sig.is_some())
    }

    /// Aggregate the partial signatures.
    pub fn finalize(&mut self) -> Result<Signature, MuSigError> {
        if self.state != MuSigStateMachine::PartialSigned || !self.has_all_partial_signatures() {
            return Err(self.invalid_transition());
        }
        let session = self.session.as_ref().ok_or_else(|| self.invalid_transition())?;

        let mut sigs = Vec::with_capacity(self.key_agg_ctx.len());
        for pk in self.key_agg_ctx.pubkeys() {
            let party = self.parties.get(pk).ok_or(MuSigError::KeyNotInSet)?;
            sigs.push(party.partial_sig.ok_or(MuSigError::MissingNonce)?);
        }

        let signature = session.aggregate_signatures(&sigs);
        debug!(signers = sigs.len(), "aggregated signature");
        self.signature = Some(signature);
        self.state = MuSigStateMachine::Aggregated;
        Ok(signature)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::musig::NonceStore;
    use crate::Keypair;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn ceremony(seed: u8) -> (Vec<Keypair>, NonceStore, Vec<PublicNonce>, Ceremony) {
        let mut csprng = ChaChaRng::from_seed([seed; 32]);
        let keypairs: Vec<Keypair> = (0..3).map(|_| Keypair::generate(&mut csprng)).collect();
        let ctx = KeyAggContext::new(keypairs.iter().map(|k| k.public).collect()).unwrap();
        let store = NonceStore::new();
        let nonces = keypairs
            .iter()
            .map(|k| store.generate(&mut csprng, Some(&k.secret), &k.public, None, None).unwrap())
            .collect();
        (keypairs, store, nonces, Ceremony::new(ctx).unwrap())
    }

    #[test]
    fn full_run() {
        let (keypairs, store, nonces, mut c) = ceremony(0);
        for (k, n) in keypairs.iter().zip(nonces.iter()) {
            c.add_nonce(&k.public, *n).unwrap();
        }
        assert!(c.has_all_nonces());
        let session = c.start(b"ceremony").unwrap().clone();
        assert_eq!(c.state(), MuSigStateMachine::SessionStarted);

        for (k, n) in keypairs.iter().zip(nonces.iter()) {
            let s = session.partial_sign(&store, &k.secret, n).unwrap();
            c.add_partial_signature(&k.public, s).unwrap();
        }
        let sig = c.finalize().unwrap();
        assert_eq!(c.state(), MuSigStateMachine::Aggregated);
        assert!(sig.verify(b"ceremony", &session.key_agg_ctx().aggregated_xonly()).is_ok());
    }

    #[test]
    fn start_needs_every_nonce() {
        let (keypairs, _, nonces, mut c) = ceremony(1);
        c.add_nonce(&keypairs[0].public, nonces[0]).unwrap();
        assert_eq!(c.start(b"m").unwrap_err(), MuSigError::MissingNonce);
        assert_eq!(c.finalize().unwrap_err(), MuSigError::InvalidTransition { state: "Uninitialized" });
    }

    #[test]
    fn bad_share_fails_ceremony() {
        let (keypairs, _, nonces, mut c) = ceremony(2);
        for (k, n) in keypairs.iter().zip(nonces.iter()) {
            c.add_nonce(&k.public, *n).unwrap();
        }
        c.start(b"m").unwrap();
        let bogus = PartialSignature::from_bytes(&[1u8; 32]).unwrap();
        assert!(matches!(
            c.add_partial_signature(&keypairs[0].public, bogus),
            Err(MuSigError::InvalidPartialSignature { .. })
        ));
        assert_eq!(c.state(), MuSigStateMachine::Failed);
        assert_eq!(
            c.add_partial_signature(&keypairs[1].public, bogus).unwrap_err(),
            MuSigError::InvalidTransition { state: "Failed" }
        );
    }

    #[test]
    fn unknown_key_and_nonce_reuse() {
        let (keypairs, _, nonces, mut c) = ceremony(3);
        let stranger = Keypair::generate(&mut ChaChaRng::from_seed([99u8; 32]));
        assert_eq!(c.add_nonce(&stranger.public, nonces[0]).unwrap_err(), MuSigError::KeyNotInSet);
        c.add_nonce(&keypairs[0].public, nonces[0]).unwrap();
        assert_eq!(c.add_nonce(&keypairs[0].public, nonces[0]).unwrap_err(), MuSigError::NonceReuse);
    }

    #[test]
    fn repeated_key_is_rejected() {
        let mut csprng = ChaChaRng::from_seed([4u8; 32]);
        let a = Keypair::generate(&mut csprng);
        let b = Keypair::generate(&mut csprng);
        let ctx = KeyAggContext::new(vec![a.public, a.public, b.public]).unwrap();
        assert_eq!(Ceremony::new(ctx).unwrap_err(), MuSigError::DuplicateKey);

        // x-only sets lift P and -P to the same key
        let ctx = KeyAggContext::new_xonly(vec![a.public, b.public, a.public]).unwrap();
        assert_eq!(Ceremony::new(ctx).unwrap_err(), MuSigError::DuplicateKey);
    }
}

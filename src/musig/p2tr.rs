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

//! MuSig2 key path spends of taproot outputs.
//!
//! The internal key is the BIP327 aggregate of the cosigners, in the
//! order given. The output key adds the x-only taproot tweak, so the
//! session signs for the tweaked key.

use bitcoin::TapSighashType;
use tracing::debug;

use crate::errors::{MuSigError, SignerError, TaprootError};
use crate::keys::{KeyAggContext, PublicKey, SecretKey};
use crate::musig::{session, AggregateNonce, NonceStore, PartialSignature, PublicNonce, Session};
use crate::musig::PARTIAL_SIGNATURE_LENGTH;
use crate::taproot::{tap_tweak_hash, tap_tweak_pubkey};

/// x-only aggregate of `pubkeys`, in order.
pub fn create_tap_internal_key(pubkeys: &[PublicKey]) -> Result<[u8; 32], MuSigError> {
    Ok(KeyAggContext::new(pubkeys.to_vec())?.aggregated_xonly())
}

/// TapTweak hash committing `internal_key` to `merkle_root`.
pub fn create_tap_tweak(internal_key: &[u8; 32], merkle_root: Option<&[u8; 32]>) -> [u8; 32] {
    tap_tweak_hash(internal_key, merkle_root)
}

/// x-only output key for `internal_key` and `merkle_root`.
pub fn create_tap_output_key(
    internal_key: &[u8; 32],
    merkle_root: Option<&[u8; 32]>,
) -> Result<[u8; 32], TaprootError> {
    tap_tweak_pubkey(internal_key, merkle_root).map(|(q, _)| q)
}

fn tweaked_key_agg_context(
    pubkeys: &[PublicKey],
    merkle_root: Option<&[u8; 32]>,
) -> Result<KeyAggContext, MuSigError> {
    let ctx = KeyAggContext::new(pubkeys.to_vec())?;
    let tweak = tap_tweak_hash(&ctx.aggregated_xonly(), merkle_root);
    ctx.with_tweak(&tweak, true)
}

/// Start a session signing `tx_hash` for the tweaked output key.
pub fn create_signing_session(
    public_nonces: &[PublicNonce],
    pubkeys: &[PublicKey],
    tx_hash: &[u8; 32],
    merkle_root: Option<&[u8; 32]>,
) -> Result<Session, MuSigError> {
    if public_nonces.len() != pubkeys.len() {
        return Err(MuSigError::MissingNonce);
    }
    let ctx = tweaked_key_agg_context(pubkeys, merkle_root)?;
    debug!(signers = pubkeys.len(), "creating p2tr signing session");
    Ok(Session::start(&AggregateNonce::sum(public_nonces), tx_hash, &ctx))
}

fn with_sighash(partial_signature: &PartialSignature, sighash_type: TapSighashType) -> Vec<u8> {
    let mut out = partial_signature.to_bytes().to_vec();
    if sighash_type != TapSighashType::Default {
        out.push(sighash_type as u8);
    }
    out
}

/// Partial signature for a p2tr key path input.
///
/// 32 bytes, or 33 when `sighash_type` is not `Default`.
pub fn partial_sign(
    secret_key: &SecretKey,
    public_nonce: &PublicNonce,
    session: &Session,
    store: &NonceStore,
    sighash_type: TapSighashType,
) -> Result<Vec<u8>, MuSigError> {
    let s = session.partial_sign(store, secret_key, public_nonce)?;
    Ok(with_sighash(&s, sighash_type))
}

/// Aggregate partial signatures that all carry the same sighash suffix.
pub fn aggregate_signatures(partial_signatures: &[Vec<u8>], session: &Session) -> Result<Vec<u8>, SignerError> {
    let suffix = partial_signatures.first().and_then(|p| p.get(PARTIAL_SIGNATURE_LENGTH)).copied();

    let mut shares = Vec::with_capacity(partial_signatures.len());
    for p in partial_signatures {
        if p.len() > PARTIAL_SIGNATURE_LENGTH + 1 {
            return Err(SignerError::BytesLength {
                name: "PartialSignature",
                length: PARTIAL_SIGNATURE_LENGTH,
            });
        }
        if p.get(PARTIAL_SIGNATURE_LENGTH).copied() != suffix {
            return Err(MuSigError::MixedSighashTypes.into());
        }
        shares.push(PartialSignature::from_bytes(&p[..p.len().min(PARTIAL_SIGNATURE_LENGTH)])?);
    }

    let mut out = session.aggregate_signatures(&shares).to_bytes().to_vec();
    out.extend(suffix);
    Ok(out)
}

/// Deterministic signing for the last signer of a two party p2tr session.
pub fn deterministic_sign(
    secret_key: &SecretKey,
    other_nonce: &PublicNonce,
    pubkeys: &[PublicKey],
    tx_hash: &[u8; 32],
    merkle_root: Option<&[u8; 32]>,
    rand: Option<&[u8; 32]>,
) -> Result<(PublicNonce, PartialSignature), MuSigError> {
    let ctx = tweaked_key_agg_context(pubkeys, merkle_root)?;
    let other = AggregateNonce::sum(&[*other_nonce]);
    session::deterministic_sign(secret_key, &other, &ctx, tx_hash, rand)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keys::Keypair;
    use crate::Signature;
    use k256::schnorr::{Signature as Bip340Signature, VerifyingKey};
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    const TX_HASH: [u8; 32] = [0x42; 32];

    fn cosigners() -> (ChaChaRng, Keypair, Keypair) {
        let mut csprng = ChaChaRng::from_seed([9u8; 32]);
        let user = Keypair::generate(&mut csprng);
        let bitgo = Keypair::generate(&mut csprng);
        (csprng, user, bitgo)
    }

    fn independent_verify(signature: &[u8], output_key: &[u8; 32]) {
        let vk = VerifyingKey::from_bytes(output_key).unwrap();
        let sig = Bip340Signature::try_from(&signature[..64]).unwrap();
        vk.verify_raw(&TX_HASH, &sig).unwrap();
    }

    #[test]
    fn key_path_round_trip() {
        let (mut csprng, user, bitgo) = cosigners();
        let pubkeys = [user.public, bitgo.public];
        let root = [7u8; 32];

        let internal = create_tap_internal_key(&pubkeys).unwrap();
        let output_key = create_tap_output_key(&internal, Some(&root)).unwrap();

        let store = NonceStore::new();
        let n_user = store.generate(&mut csprng, Some(&user.secret), &user.public, None, None).unwrap();
        let n_bitgo = store.generate(&mut csprng, Some(&bitgo.secret), &bitgo.public, None, None).unwrap();

        let session = create_signing_session(&[n_user, n_bitgo], &pubkeys, &TX_HASH, Some(&root)).unwrap();
        assert_eq!(session.key_agg_ctx().aggregated_xonly(), output_key);

        let s_user = partial_sign(&user.secret, &n_user, &session, &store, TapSighashType::Default).unwrap();
        let s_bitgo = partial_sign(&bitgo.secret, &n_bitgo, &session, &store, TapSighashType::Default).unwrap();
        assert_eq!(s_user.len(), 32);

        let sig = aggregate_signatures(&[s_user, s_bitgo], &session).unwrap();
        assert_eq!(sig.len(), 64);
        Signature::from_bytes(&sig).unwrap().verify(&TX_HASH, &output_key).unwrap();
        independent_verify(&sig, &output_key);
    }

    #[test]
    fn sighash_suffix_is_carried() {
        let (mut csprng, user, bitgo) = cosigners();
        let pubkeys = [user.public, bitgo.public];
        let store = NonceStore::new();
        let n_user = store.generate(&mut csprng, Some(&user.secret), &user.public, None, None).unwrap();
        let n_bitgo = store.generate(&mut csprng, Some(&bitgo.secret), &bitgo.public, None, None).unwrap();
        let session = create_signing_session(&[n_user, n_bitgo], &pubkeys, &TX_HASH, None).unwrap();

        let s_user = partial_sign(&user.secret, &n_user, &session, &store, TapSighashType::All).unwrap();
        let s_bitgo = partial_sign(&bitgo.secret, &n_bitgo, &session, &store, TapSighashType::All).unwrap();
        assert_eq!(s_user.len(), 33);
        assert_eq!(s_user[32], 0x01);

        let sig = aggregate_signatures(&[s_user.clone(), s_bitgo], &session).unwrap();
        assert_eq!(sig.len(), 65);
        assert_eq!(sig[64], 0x01);
        independent_verify(&sig, &session.key_agg_ctx().aggregated_xonly());

        assert_eq!(
            aggregate_signatures(&[s_user.clone(), s_user[..32].to_vec()], &session),
            Err(SignerError::MuSig {
                kind: MuSigError::MixedSighashTypes
            })
        );
    }

    #[test]
    fn nonce_count_must_match_keys() {
        let (mut csprng, user, bitgo) = cosigners();
        let store = NonceStore::new();
        let n_user = store.generate(&mut csprng, None, &user.public, None, None).unwrap();
        assert_eq!(
            create_signing_session(&[n_user], &[user.public, bitgo.public], &TX_HASH, None).err(),
            Some(MuSigError::MissingNonce)
        );
    }

    #[test]
    fn deterministic_last_signer() {
        let (mut csprng, user, bitgo) = cosigners();
        let pubkeys = [user.public, bitgo.public];
        let store = NonceStore::new();
        let n_user = store.generate(&mut csprng, Some(&user.secret), &user.public, None, None).unwrap();

        let (n_bitgo, s_bitgo) = deterministic_sign(&bitgo.secret, &n_user, &pubkeys, &TX_HASH, None, None).unwrap();
        // same inputs, same nonce
        let (again, _) = deterministic_sign(&bitgo.secret, &n_user, &pubkeys, &TX_HASH, None, None).unwrap();
        assert_eq!(n_bitgo, again);

        let session = create_signing_session(&[n_user, n_bitgo], &pubkeys, &TX_HASH, None).unwrap();
        let s_user = partial_sign(&user.secret, &n_user, &session, &store, TapSighashType::Default).unwrap();

        let sig = aggregate_signatures(&[s_user, s_bitgo.to_bytes().to_vec()], &session).unwrap();
        let internal = create_tap_internal_key(&pubkeys).unwrap();
        let output_key = create_tap_output_key(&internal, None).unwrap();
        independent_verify(&sig, &output_key);
    }
}

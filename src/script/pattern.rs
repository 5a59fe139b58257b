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

//! Declarative script shape matching.

use bitcoin::opcodes::Opcode;
use bitcoin::secp256k1::ecdsa;

use crate::curve;
use crate::errors::MatchError;
use crate::script::{decompile, Element};
use crate::taproot::ControlBlock;

/// One element of a pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Matcher {
    /// Exactly this opcode.
    Op(Opcode),
    /// The empty push, which is also `OP_0`.
    Empty,
    /// A 33 or 65 byte public key.
    Pubkey,
    /// A 32 byte x-only public key.
    PubkeyXOnly,
    /// A DER signature with sighash byte, or the empty placeholder.
    Signature,
    /// A 64 or 65 byte Schnorr signature, or the empty placeholder.
    SchnorrSignatureOrPlaceholder,
    /// A 64 or 65 byte Schnorr signature.
    SchnorrSignature,
    /// A well formed control block.
    ControlBlock,
    /// A pushed script matching the inner pattern.
    Script(Vec<Matcher>),
}

/// What a successful match captured, in element order.
///
/// A placeholder signature is captured as `None`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Captures {
    /// Compressed or uncompressed keys.
    pub pubkeys: Vec<Vec<u8>>,
    /// X-only keys.
    pub xonly_pubkeys: Vec<[u8; 32]>,
    /// Signatures and placeholders.
    pub signatures: Vec<Option<Vec<u8>>>,
    /// Control blocks, raw and parsed.
    pub control_blocks: Vec<(Vec<u8>, ControlBlock)>,
    /// Nested scripts.
    pub scripts: Vec<Vec<u8>>,
}

fn is_der_signature(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        Some((_sighash, der)) => ecdsa::Signature::from_der(der).is_ok(),
        None => false,
    }
}

// 65 byte signatures carry an explicit sighash type, which must not be 0x00
fn is_schnorr_signature(bytes: &[u8]) -> bool {
    match bytes.len() {
        64 => true,
        65 => bytes[64] != 0,
        _ => false,
    }
}

fn match_element(
    index: usize,
    element: &Element,
    matcher: &Matcher,
    captures: &mut Captures,
) -> Result<(), MatchError> {
    if let Matcher::Op(op) = matcher {
        return match element {
            Element::Op(e) if e == op => Ok(()),
            _ => Err(MatchError::UnexpectedElement { index }),
        };
    }

    let data = element
        .as_push()
        .ok_or(MatchError::UnexpectedElement { index })?;

    match matcher {
        Matcher::Op(_) => Err(MatchError::UnexpectedElement { index }),
        Matcher::Empty if data.is_empty() => Ok(()),
        Matcher::Empty => Err(MatchError::UnexpectedElement { index }),
        Matcher::Pubkey => {
            if !curve::is_point(data) {
                return Err(MatchError::InvalidPubkey { index });
            }
            captures.pubkeys.push(data.to_vec());
            Ok(())
        }
        Matcher::PubkeyXOnly => {
            if data.len() != 32 || !curve::is_xonly_point(data) {
                return Err(MatchError::InvalidPubkey { index });
            }
            let mut x = [0u8; 32];
            x.copy_from_slice(data);
            captures.xonly_pubkeys.push(x);
            Ok(())
        }
        Matcher::Signature => {
            if data.is_empty() {
                captures.signatures.push(None);
            } else if is_der_signature(data) {
                captures.signatures.push(Some(data.to_vec()));
            } else {
                return Err(MatchError::InvalidSignature { index });
            }
            Ok(())
        }
        Matcher::SchnorrSignatureOrPlaceholder => {
            if data.is_empty() {
                captures.signatures.push(None);
            } else if is_schnorr_signature(data) {
                captures.signatures.push(Some(data.to_vec()));
            } else {
                return Err(MatchError::InvalidSignature { index });
            }
            Ok(())
        }
        Matcher::SchnorrSignature => {
            if !is_schnorr_signature(data) {
                return Err(MatchError::InvalidSignature { index });
            }
            captures.signatures.push(Some(data.to_vec()));
            Ok(())
        }
        Matcher::ControlBlock => {
            let cb = ControlBlock::from_bytes(data).map_err(|_| MatchError::InvalidControlBlock { index })?;
            captures.control_blocks.push((data.to_vec(), cb));
            Ok(())
        }
        Matcher::Script(inner) => {
            let elements = decompile(data).map_err(|_| MatchError::Decompile { index })?;
            captures.scripts.push(data.to_vec());
            match_into(&elements, inner, captures)
        }
    }
}

fn match_into(elements: &[Element], pattern: &[Matcher], captures: &mut Captures) -> Result<(), MatchError> {
    if elements.len() != pattern.len() {
        return Err(MatchError::LengthMismatch {
            expected: pattern.len(),
            got: elements.len(),
        });
    }
    for (index, (e, m)) in elements.iter().zip(pattern).enumerate() {
        match_element(index, e, m, captures)?;
    }
    Ok(())
}

/// Match elements against a pattern, capturing typed fields.
///
/// A mismatch is a value naming why; callers try the next pattern.
pub fn match_script(elements: &[Element], pattern: &[Matcher]) -> Result<Captures, MatchError> {
    let mut captures = Captures::default();
    match_into(elements, pattern, &mut captures)?;
    Ok(captures)
}

#[cfg(test)]
mod test {
    use super::*;
    use bitcoin::opcodes::all::OP_CHECKSIG;
    use k256::ProjectivePoint;

    fn g() -> Vec<u8> {
        curve::serialize_compressed(&ProjectivePoint::GENERATOR).to_vec()
    }

    #[test]
    fn captures_in_order() {
        let elements = vec![Element::Push(vec![]), Element::Push(g()), Element::Op(OP_CHECKSIG)];
        let captures = match_script(
            &elements,
            &[Matcher::Signature, Matcher::Pubkey, Matcher::Op(OP_CHECKSIG)],
        )
        .unwrap();
        assert_eq!(captures.signatures, vec![None]);
        assert_eq!(captures.pubkeys, vec![g()]);
    }

    #[test]
    fn op_0_matches_empty() {
        let elements = crate::script::decompile(&[0x00]).unwrap();
        assert!(match_script(&elements, &[Matcher::Empty]).is_ok());
        assert_eq!(
            match_script(&[Element::Push(vec![1])], &[Matcher::Empty]),
            Err(MatchError::UnexpectedElement { index: 0 })
        );
    }

    #[test]
    fn length_and_element_mismatch() {
        let elements = vec![Element::Push(g())];
        assert_eq!(
            match_script(&elements, &[Matcher::Pubkey, Matcher::Op(OP_CHECKSIG)]),
            Err(MatchError::LengthMismatch { expected: 2, got: 1 })
        );
        assert_eq!(
            match_script(&elements, &[Matcher::Op(OP_CHECKSIG)]),
            Err(MatchError::UnexpectedElement { index: 0 })
        );
        // well formed prefix, x not on the curve
        let off_curve = hex::decode("02EEFDEA4CDB677750A420FEE807EACF21EB9898AE79B9768766E4FAA04A2D4A34").unwrap();
        assert_eq!(
            match_script(&[Element::Push(off_curve)], &[Matcher::Pubkey]),
            Err(MatchError::InvalidPubkey { index: 0 })
        );
    }

    #[test]
    fn schnorr_signature_rules() {
        assert!(match_script(&[Element::Push(vec![1u8; 64])], &[Matcher::SchnorrSignature]).is_ok());
        assert!(match_script(&[Element::Push(vec![1u8; 65])], &[Matcher::SchnorrSignature]).is_ok());
        assert_eq!(
            match_script(&[Element::Push(vec![])], &[Matcher::SchnorrSignature]),
            Err(MatchError::InvalidSignature { index: 0 })
        );
        let mut zero_sighash = vec![1u8; 65];
        zero_sighash[64] = 0;
        assert!(match_script(&[Element::Push(zero_sighash)], &[Matcher::SchnorrSignature]).is_err());
        assert!(match_script(&[Element::Push(vec![])], &[Matcher::SchnorrSignatureOrPlaceholder]).is_ok());
    }

    #[test]
    fn nested_script() {
        let inner = crate::script::p2pk_script(&g()).unwrap();
        let elements = vec![Element::Push(inner.to_bytes())];
        let captures = match_script(
            &elements,
            &[Matcher::Script(vec![Matcher::Pubkey, Matcher::Op(OP_CHECKSIG)])],
        )
        .unwrap();
        assert_eq!(captures.scripts, vec![inner.to_bytes()]);
        assert_eq!(captures.pubkeys, vec![g()]);
    }
}

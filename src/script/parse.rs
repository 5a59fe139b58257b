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

//! Classification of signature scripts and output-side scripts.

use std::fmt;
use std::str::FromStr;

use bitcoin::opcodes::all::{
    OP_CHECKMULTISIG, OP_CHECKSIG, OP_CHECKSIGVERIFY, OP_PUSHNUM_1, OP_PUSHNUM_2, OP_PUSHNUM_3,
};
use bitcoin::{Script, ScriptBuf, TxIn};
use tracing::{debug, trace};

use crate::config::TAPSCRIPT_LEAF_VERSION;
use crate::errors::{MatchError, ParseError};
use crate::script::{decompile, match_script, witness_elements, Captures, Element, Matcher};
use crate::taproot::tap_leaf_hash;

/// The spend types this module recognizes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InputScriptType {
    /// Legacy P2SH 2-of-3 multisig.
    P2sh,
    /// P2WSH 2-of-3 multisig wrapped in P2SH.
    P2shP2wsh,
    /// Native P2WSH 2-of-3 multisig.
    P2wsh,
    /// Single key behind P2SH.
    P2shP2pk,
    /// Taproot key path.
    TaprootKeyPathSpend,
    /// Taproot 2-of-2 tapscript.
    TaprootScriptPathSpend,
}

const CANDIDATES: [InputScriptType; 6] = [
    InputScriptType::P2sh,
    InputScriptType::P2shP2wsh,
    InputScriptType::P2wsh,
    InputScriptType::TaprootKeyPathSpend,
    InputScriptType::TaprootScriptPathSpend,
    InputScriptType::P2shP2pk,
];

impl InputScriptType {
    /// Name as used in PSBT tooling, e.g. `p2shP2wsh`.
    pub fn as_str(&self) -> &'static str {
        match self {
            InputScriptType::P2sh => "p2sh",
            InputScriptType::P2shP2wsh => "p2shP2wsh",
            InputScriptType::P2wsh => "p2wsh",
            InputScriptType::P2shP2pk => "p2shP2pk",
            InputScriptType::TaprootKeyPathSpend => "taprootKeyPathSpend",
            InputScriptType::TaprootScriptPathSpend => "taprootScriptPathSpend",
        }
    }
}

impl fmt::Display for InputScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputScriptType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CANDIDATES
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| ParseError::UnknownScriptType(s.to_string()))
    }
}

/// Which multisig wrapping a `ParsedP2ms` came from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum P2msScriptType {
    /// Legacy P2SH
    P2sh,
    /// P2WSH nested in P2SH
    P2shP2wsh,
    /// Native P2WSH
    P2wsh,
}

impl From<P2msScriptType> for InputScriptType {
    fn from(t: P2msScriptType) -> InputScriptType {
        match t {
            P2msScriptType::P2sh => InputScriptType::P2sh,
            P2msScriptType::P2shP2wsh => InputScriptType::P2shP2wsh,
            P2msScriptType::P2wsh => InputScriptType::P2wsh,
        }
    }
}

/// A 2-of-3 multisig spend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedP2ms {
    /// How the multisig script is wrapped.
    pub script_type: P2msScriptType,
    /// The three keys, in script order.
    pub public_keys: Vec<Vec<u8>>,
    /// Signature slots in script order, `None` for a placeholder.
    pub signatures: Vec<Option<Vec<u8>>>,
    /// The multisig script itself.
    pub pub_script: ScriptBuf,
    /// Set for P2SH and P2SH-P2WSH.
    pub redeem_script: Option<ScriptBuf>,
    /// Set for P2WSH and P2SH-P2WSH.
    pub witness_script: Option<ScriptBuf>,
}

/// A single key spend behind P2SH.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedP2shP2pk {
    /// Compressed or uncompressed key.
    pub public_key: Vec<u8>,
    /// `None` for a placeholder.
    pub signature: Option<Vec<u8>>,
    /// `<pk> OP_CHECKSIG`
    pub redeem_script: ScriptBuf,
}

/// A taproot key path spend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedTaprootKeyPath {
    /// 64 bytes, or 65 with an explicit sighash type.
    pub signature: Vec<u8>,
}

/// A taproot 2-of-2 script path spend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedTaprootScriptPath {
    /// x-only keys in tapscript order.
    pub public_keys: Vec<[u8; 32]>,
    /// In the order of `public_keys`.
    pub signatures: Vec<Option<Vec<u8>>>,
    /// Raw control block from the witness.
    pub control_block: Vec<u8>,
    /// Leaf version taken from the control block.
    pub leaf_version: u8,
    /// Depth of the tapscript in its tree.
    pub script_path_level: usize,
    /// The tapscript.
    pub pub_script: ScriptBuf,
}

/// A classified input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParsedSignatureScript {
    /// 2-of-3 multisig in any wrapping
    P2ms(ParsedP2ms),
    /// Single key behind P2SH
    P2shP2pk(ParsedP2shP2pk),
    /// Taproot key path
    TaprootKeyPath(ParsedTaprootKeyPath),
    /// Taproot 2-of-2 script path
    TaprootScriptPath(ParsedTaprootScriptPath),
}

impl ParsedSignatureScript {
    /// The input type this spend was classified as.
    pub fn script_type(&self) -> InputScriptType {
        match self {
            ParsedSignatureScript::P2ms(p) => p.script_type.into(),
            ParsedSignatureScript::P2shP2pk(_) => InputScriptType::P2shP2pk,
            ParsedSignatureScript::TaprootKeyPath(_) => InputScriptType::TaprootKeyPathSpend,
            ParsedSignatureScript::TaprootScriptPath(_) => InputScriptType::TaprootScriptPathSpend,
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedVariant {
            expected,
            got: self.script_type().as_str(),
        }
    }

    /// The multisig spend, or `UnexpectedVariant`.
    pub fn as_p2ms(&self) -> Result<&ParsedP2ms, ParseError> {
        match self {
            ParsedSignatureScript::P2ms(p) => Ok(p),
            _ => Err(self.unexpected("p2ms")),
        }
    }

    /// The P2SH-P2PK spend, or `UnexpectedVariant`.
    pub fn as_p2sh_p2pk(&self) -> Result<&ParsedP2shP2pk, ParseError> {
        match self {
            ParsedSignatureScript::P2shP2pk(p) => Ok(p),
            _ => Err(self.unexpected("p2shP2pk")),
        }
    }

    /// The key path spend, or `UnexpectedVariant`.
    pub fn as_taproot_key_path(&self) -> Result<&ParsedTaprootKeyPath, ParseError> {
        match self {
            ParsedSignatureScript::TaprootKeyPath(p) => Ok(p),
            _ => Err(self.unexpected("taprootKeyPathSpend")),
        }
    }

    /// The script path spend, or `UnexpectedVariant`.
    pub fn as_taproot_script_path(&self) -> Result<&ParsedTaprootScriptPath, ParseError> {
        match self {
            ParsedSignatureScript::TaprootScriptPath(p) => Ok(p),
            _ => Err(self.unexpected("taprootScriptPathSpend")),
        }
    }
}

fn multisig_2of3_pattern() -> Vec<Matcher> {
    vec![
        Matcher::Op(OP_PUSHNUM_2),
        Matcher::Pubkey,
        Matcher::Pubkey,
        Matcher::Pubkey,
        Matcher::Op(OP_PUSHNUM_3),
        Matcher::Op(OP_CHECKMULTISIG),
    ]
}

fn p2pk_pattern() -> Vec<Matcher> {
    vec![Matcher::Pubkey, Matcher::Op(OP_CHECKSIG)]
}

fn tapscript_2of2_pattern() -> Vec<Matcher> {
    vec![
        Matcher::PubkeyXOnly,
        Matcher::Op(OP_CHECKSIGVERIFY),
        Matcher::PubkeyXOnly,
        Matcher::Op(OP_CHECKSIG),
    ]
}

// OP_0 <sig|placeholder>{slots} <multisig script>
fn p2ms_stack_pattern(slots: usize) -> Vec<Matcher> {
    let mut pattern = vec![Matcher::Empty];
    pattern.extend(std::iter::repeat(Matcher::Signature).take(slots));
    pattern.push(Matcher::Script(multisig_2of3_pattern()));
    pattern
}

// half signed stacks keep all three slots, fully signed ones carry two signatures
fn match_p2ms_stack(elements: &[Element]) -> Result<Captures, MatchError> {
    match_script(elements, &p2ms_stack_pattern(3)).or_else(|_| match_script(elements, &p2ms_stack_pattern(2)))
}

fn expect_empty(elements: &[Element]) -> Result<(), MatchError> {
    if elements.is_empty() {
        Ok(())
    } else {
        Err(MatchError::LengthMismatch {
            expected: 0,
            got: elements.len(),
        })
    }
}

fn into_p2ms(script_type: P2msScriptType, captures: Captures) -> ParsedP2ms {
    let pub_script = ScriptBuf::from_bytes(captures.scripts[0].clone());
    let (redeem_script, witness_script) = match script_type {
        P2msScriptType::P2sh => (Some(pub_script.clone()), None),
        P2msScriptType::P2shP2wsh => (
            Some(ScriptBuf::new_p2wsh(&pub_script.wscript_hash())),
            Some(pub_script.clone()),
        ),
        P2msScriptType::P2wsh => (None, Some(pub_script.clone())),
    };
    ParsedP2ms {
        script_type,
        public_keys: captures.pubkeys,
        signatures: captures.signatures,
        pub_script,
        redeem_script,
        witness_script,
    }
}

fn try_parse(
    script_type: InputScriptType,
    script_sig: &[Element],
    witness: &[Element],
) -> Result<ParsedSignatureScript, MatchError> {
    match script_type {
        InputScriptType::P2sh => {
            expect_empty(witness)?;
            let captures = match_p2ms_stack(script_sig)?;
            Ok(ParsedSignatureScript::P2ms(into_p2ms(P2msScriptType::P2sh, captures)))
        }
        InputScriptType::P2shP2wsh => {
            let captures = match_p2ms_stack(witness)?;
            let parsed = into_p2ms(P2msScriptType::P2shP2wsh, captures);
            // the scriptSig pushes the witness program of the witness script
            let program = parsed.redeem_script.as_ref().map(|s| s.to_bytes());
            match script_sig {
                [Element::Push(data)] if Some(data) == program.as_ref() => {
                    Ok(ParsedSignatureScript::P2ms(parsed))
                }
                [_] => Err(MatchError::UnexpectedElement { index: 0 }),
                _ => Err(MatchError::LengthMismatch {
                    expected: 1,
                    got: script_sig.len(),
                }),
            }
        }
        InputScriptType::P2wsh => {
            expect_empty(script_sig)?;
            let captures = match_p2ms_stack(witness)?;
            Ok(ParsedSignatureScript::P2ms(into_p2ms(P2msScriptType::P2wsh, captures)))
        }
        InputScriptType::TaprootKeyPathSpend => {
            expect_empty(script_sig)?;
            let mut captures = match_script(witness, &[Matcher::SchnorrSignature])?;
            let signature = captures.signatures.remove(0).unwrap_or_default();
            Ok(ParsedSignatureScript::TaprootKeyPath(ParsedTaprootKeyPath { signature }))
        }
        InputScriptType::TaprootScriptPathSpend => {
            expect_empty(script_sig)?;
            let mut captures = match_script(
                witness,
                &[
                    Matcher::SchnorrSignatureOrPlaceholder,
                    Matcher::SchnorrSignatureOrPlaceholder,
                    Matcher::Script(tapscript_2of2_pattern()),
                    Matcher::ControlBlock,
                ],
            )?;
            // the first key is checked first, so its signature is on top of the stack
            captures.signatures.reverse();
            let (control_block, parsed) = captures.control_blocks.remove(0);
            Ok(ParsedSignatureScript::TaprootScriptPath(ParsedTaprootScriptPath {
                public_keys: captures.xonly_pubkeys,
                signatures: captures.signatures,
                control_block,
                leaf_version: parsed.leaf_version,
                script_path_level: parsed.depth(),
                pub_script: ScriptBuf::from_bytes(captures.scripts.remove(0)),
            }))
        }
        InputScriptType::P2shP2pk => {
            expect_empty(witness)?;
            let mut captures = match_script(script_sig, &[Matcher::Signature, Matcher::Script(p2pk_pattern())])?;
            Ok(ParsedSignatureScript::P2shP2pk(ParsedP2shP2pk {
                public_key: captures.pubkeys.remove(0),
                signature: captures.signatures.remove(0),
                redeem_script: ScriptBuf::from_bytes(captures.scripts.remove(0)),
            }))
        }
    }
}

fn parse_candidates(input: &TxIn, candidates: &[InputScriptType]) -> Result<ParsedSignatureScript, ParseError> {
    let script_sig = decompile(input.script_sig.as_bytes())?;
    let witness = witness_elements(&input.witness.to_vec());

    for &script_type in candidates {
        match try_parse(script_type, &script_sig, &witness) {
            Ok(parsed) => {
                debug!(script_type = script_type.as_str(), "parsed signature script");
                return Ok(parsed);
            }
            Err(reason) => {
                trace!(script_type = script_type.as_str(), %reason, "candidate did not match");
            }
        }
    }
    Err(ParseError::UnrecognizedScriptShape)
}

/// Classify an input by its scriptSig and witness.
///
/// Candidates are tried in a fixed order and the first match wins.
pub fn parse_signature_script(input: &TxIn) -> Result<ParsedSignatureScript, ParseError> {
    parse_candidates(input, &CANDIDATES)
}

/// Like `parse_signature_script`, without the single key shape.
pub fn parse_signature_script_2of3(input: &TxIn) -> Result<ParsedSignatureScript, ParseError> {
    parse_candidates(input, &CANDIDATES[..5])
}

/// Output side of a multisig input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedPubScriptP2ms {
    /// How the multisig script is wrapped.
    pub script_type: P2msScriptType,
    /// The three keys, in script order.
    pub public_keys: Vec<Vec<u8>>,
    /// The multisig script itself.
    pub pub_script: ScriptBuf,
    /// Set for P2SH and P2SH-P2WSH.
    pub redeem_script: Option<ScriptBuf>,
    /// Set for P2WSH and P2SH-P2WSH.
    pub witness_script: Option<ScriptBuf>,
    /// The scriptPubKey paying to this input.
    pub output_script: ScriptBuf,
}

/// Output side of a P2SH-P2PK input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedPubScriptP2shP2pk {
    /// Compressed or uncompressed key.
    pub public_key: Vec<u8>,
    /// `<pk> OP_CHECKSIG`
    pub redeem_script: ScriptBuf,
    /// The P2SH scriptPubKey.
    pub output_script: ScriptBuf,
}

/// Output side of a taproot key path input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedPubScriptTaprootKeyPath {
    /// The tweaked output key.
    pub public_key: [u8; 32],
    /// `OP_1 <output key>`
    pub output_script: ScriptBuf,
}

/// A tapscript leaf. Its output script depends on the rest of the tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedPubScriptTaprootScriptPath {
    /// x-only keys in tapscript order.
    pub public_keys: Vec<[u8; 32]>,
    /// The tapscript.
    pub pub_script: ScriptBuf,
    /// TapLeaf hash of the tapscript at the default leaf version.
    pub leaf_hash: [u8; 32],
}

/// An output-side script, before any witness exists.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParsedPubScript {
    /// 2-of-3 multisig in any wrapping
    P2ms(ParsedPubScriptP2ms),
    /// Single key behind P2SH
    P2shP2pk(ParsedPubScriptP2shP2pk),
    /// Taproot key path
    TaprootKeyPath(ParsedPubScriptTaprootKeyPath),
    /// Taproot 2-of-2 script path
    TaprootScriptPath(ParsedPubScriptTaprootScriptPath),
}

impl ParsedPubScript {
    /// The input type the script was parsed as.
    pub fn script_type(&self) -> InputScriptType {
        match self {
            ParsedPubScript::P2ms(p) => p.script_type.into(),
            ParsedPubScript::P2shP2pk(_) => InputScriptType::P2shP2pk,
            ParsedPubScript::TaprootKeyPath(_) => InputScriptType::TaprootKeyPathSpend,
            ParsedPubScript::TaprootScriptPath(_) => InputScriptType::TaprootScriptPathSpend,
        }
    }
}

/// Parse a redeem script, witness script, tapscript or taproot output
/// script as the given input type.
pub fn parse_pub_script(script: &Script, script_type: InputScriptType) -> Result<ParsedPubScript, ParseError> {
    let elements = decompile(script.as_bytes())?;
    let shape = |pattern: &[Matcher]| {
        match_script(&elements, pattern).map_err(|reason| ParseError::ShapeMismatch {
            script_type: script_type.as_str(),
            reason,
        })
    };

    let p2ms = |t: P2msScriptType, captures: Captures| {
        let (redeem_script, witness_script, output_script) = match t {
            P2msScriptType::P2sh => (
                Some(script.to_owned()),
                None,
                ScriptBuf::new_p2sh(&script.script_hash()),
            ),
            P2msScriptType::P2shP2wsh => {
                let redeem = ScriptBuf::new_p2wsh(&script.wscript_hash());
                let output = ScriptBuf::new_p2sh(&redeem.script_hash());
                (Some(redeem), Some(script.to_owned()), output)
            }
            P2msScriptType::P2wsh => (
                None,
                Some(script.to_owned()),
                ScriptBuf::new_p2wsh(&script.wscript_hash()),
            ),
        };
        ParsedPubScript::P2ms(ParsedPubScriptP2ms {
            script_type: t,
            public_keys: captures.pubkeys,
            pub_script: script.to_owned(),
            redeem_script,
            witness_script,
            output_script,
        })
    };

    match script_type {
        InputScriptType::P2sh => Ok(p2ms(P2msScriptType::P2sh, shape(&multisig_2of3_pattern())?)),
        InputScriptType::P2shP2wsh => Ok(p2ms(P2msScriptType::P2shP2wsh, shape(&multisig_2of3_pattern())?)),
        InputScriptType::P2wsh => Ok(p2ms(P2msScriptType::P2wsh, shape(&multisig_2of3_pattern())?)),
        InputScriptType::P2shP2pk => {
            let mut captures = shape(&p2pk_pattern())?;
            Ok(ParsedPubScript::P2shP2pk(ParsedPubScriptP2shP2pk {
                public_key: captures.pubkeys.remove(0),
                redeem_script: script.to_owned(),
                output_script: ScriptBuf::new_p2sh(&script.script_hash()),
            }))
        }
        InputScriptType::TaprootKeyPathSpend => {
            let captures = shape(&[Matcher::Op(OP_PUSHNUM_1), Matcher::PubkeyXOnly])?;
            Ok(ParsedPubScript::TaprootKeyPath(ParsedPubScriptTaprootKeyPath {
                public_key: captures.xonly_pubkeys[0],
                output_script: script.to_owned(),
            }))
        }
        InputScriptType::TaprootScriptPathSpend => {
            let captures = shape(&tapscript_2of2_pattern())?;
            Ok(ParsedPubScript::TaprootScriptPath(ParsedPubScriptTaprootScriptPath {
                public_keys: captures.xonly_pubkeys,
                pub_script: script.to_owned(),
                leaf_hash: tap_leaf_hash(script.as_bytes(), TAPSCRIPT_LEAF_VERSION),
            }))
        }
    }
}

/// Like `parse_pub_script`, refusing the single key type.
pub fn parse_pub_script_2of3(script: &Script, script_type: InputScriptType) -> Result<ParsedPubScript, ParseError> {
    if script_type == InputScriptType::P2shP2pk {
        return Err(ParseError::UnexpectedVariant {
            expected: "2of3",
            got: script_type.as_str(),
        });
    }
    parse_pub_script(script, script_type)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keys::Keypair;
    use crate::script::{multisig_2of3_script, p2pk_script, taproot_2of2_tapscript};
    use bitcoin::script::{Builder, PushBytesBuf};
    use bitcoin::secp256k1::{self, Message, Secp256k1};
    use bitcoin::{OutPoint, Sequence, Witness};
    use k256::ProjectivePoint;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn keys() -> [Keypair; 3] {
        let mut csprng = ChaChaRng::from_seed([3u8; 32]);
        [
            Keypair::generate(&mut csprng),
            Keypair::generate(&mut csprng),
            Keypair::generate(&mut csprng),
        ]
    }

    fn ecdsa_sig(seed: u8) -> Vec<u8> {
        let secp = Secp256k1::new();
        let sk = secp256k1::SecretKey::from_slice(&[seed; 32]).unwrap();
        let sig = secp.sign_ecdsa(&Message::from_digest([7u8; 32]), &sk);
        let mut bytes = sig.serialize_der().to_vec();
        bytes.push(0x01);
        bytes
    }

    fn push_all(items: &[Vec<u8>]) -> ScriptBuf {
        items
            .iter()
            .fold(Builder::new(), |b, item| {
                b.push_slice(PushBytesBuf::try_from(item.clone()).unwrap())
            })
            .into_script()
    }

    fn input(script_sig: ScriptBuf, witness: &[Vec<u8>]) -> TxIn {
        TxIn {
            previous_output: OutPoint::null(),
            script_sig,
            sequence: Sequence::MAX,
            witness: Witness::from_slice(witness),
        }
    }

    fn multisig() -> ScriptBuf {
        let k = keys();
        multisig_2of3_script(&[k[0].public, k[1].public, k[2].public])
    }

    #[test]
    fn script_type_names_round_trip() {
        for t in CANDIDATES {
            assert_eq!(t.as_str().parse::<InputScriptType>().unwrap(), t);
        }
        assert_eq!(
            "p2tr".parse::<InputScriptType>(),
            Err(ParseError::UnknownScriptType("p2tr".to_string()))
        );
    }

    #[test]
    fn half_signed_p2sh_keeps_slot_order() {
        let ms = multisig();
        let sig_a = ecdsa_sig(1);
        let sig_c = ecdsa_sig(2);
        let script_sig = push_all(&[vec![], sig_a.clone(), vec![], sig_c.clone(), ms.to_bytes()]);

        let parsed = parse_signature_script(&input(script_sig, &[])).unwrap();
        assert_eq!(parsed.script_type(), InputScriptType::P2sh);
        let p2ms = parsed.as_p2ms().unwrap();
        assert_eq!(p2ms.signatures, vec![Some(sig_a), None, Some(sig_c)]);
        assert_eq!(p2ms.public_keys.len(), 3);
        assert_eq!(p2ms.redeem_script, Some(ms));
        assert_eq!(p2ms.witness_script, None);
    }

    #[test]
    fn fully_signed_p2wsh() {
        let ms = multisig();
        let witness = vec![vec![], ecdsa_sig(1), ecdsa_sig(2), ms.to_bytes()];
        let parsed = parse_signature_script(&input(ScriptBuf::new(), &witness)).unwrap();
        assert_eq!(parsed.script_type(), InputScriptType::P2wsh);
        assert_eq!(parsed.as_p2ms().unwrap().signatures.len(), 2);
    }

    #[test]
    fn p2sh_p2wsh_checks_witness_program() {
        let ms = multisig();
        let witness = vec![vec![], ecdsa_sig(1), ecdsa_sig(2), ms.to_bytes()];
        let program = ScriptBuf::new_p2wsh(&ms.wscript_hash());

        let parsed = parse_signature_script(&input(push_all(&[program.to_bytes()]), &witness)).unwrap();
        assert_eq!(parsed.script_type(), InputScriptType::P2shP2wsh);
        assert_eq!(parsed.as_p2ms().unwrap().redeem_script, Some(program));

        let wrong = ScriptBuf::new_p2wsh(&p2pk_script(&keys()[0].public.to_bytes()).unwrap().wscript_hash());
        assert_eq!(
            parse_signature_script(&input(push_all(&[wrong.to_bytes()]), &witness)),
            Err(ParseError::UnrecognizedScriptShape)
        );
    }

    #[test]
    fn taproot_key_path() {
        let parsed = parse_signature_script(&input(ScriptBuf::new(), &[vec![9u8; 64]])).unwrap();
        assert_eq!(parsed.as_taproot_key_path().unwrap().signature, vec![9u8; 64]);

        let parsed = parse_signature_script(&input(ScriptBuf::new(), &[vec![9u8; 65]])).unwrap();
        assert_eq!(parsed.script_type(), InputScriptType::TaprootKeyPathSpend);

        // an empty signature is not a placeholder here
        assert_eq!(
            parse_signature_script(&input(ScriptBuf::new(), &[vec![]])),
            Err(ParseError::UnrecognizedScriptShape)
        );
    }

    #[test]
    fn taproot_script_path_reverses_signatures() {
        let k = keys();
        let xonly = [k[0].public.to_xonly(), k[1].public.to_xonly()];
        let tapscript = taproot_2of2_tapscript(&xonly);

        let mut control_block = vec![0xc1];
        control_block.extend_from_slice(&crate::curve::serialize_xonly(&ProjectivePoint::GENERATOR));
        control_block.extend_from_slice(&[5u8; 32]);

        let witness = vec![vec![2u8; 64], vec![], tapscript.to_bytes(), control_block.clone()];
        let parsed = parse_signature_script(&input(ScriptBuf::new(), &witness)).unwrap();
        let sp = parsed.as_taproot_script_path().unwrap();
        assert_eq!(sp.public_keys, xonly.to_vec());
        assert_eq!(sp.signatures, vec![None, Some(vec![2u8; 64])]);
        assert_eq!(sp.control_block, control_block);
        assert_eq!(sp.leaf_version, 0xc0);
        assert_eq!(sp.script_path_level, 1);
        assert_eq!(sp.pub_script, tapscript);

        assert_eq!(
            parsed.as_p2ms(),
            Err(ParseError::UnexpectedVariant {
                expected: "p2ms",
                got: "taprootScriptPathSpend"
            })
        );
    }

    #[test]
    fn p2sh_p2pk_only_in_full_parser() {
        let redeem = p2pk_script(&keys()[0].public.to_bytes()).unwrap();
        let sig = ecdsa_sig(4);
        let tx_in = input(push_all(&[sig.clone(), redeem.to_bytes()]), &[]);

        let parsed = parse_signature_script(&tx_in).unwrap();
        let p2pk = parsed.as_p2sh_p2pk().unwrap();
        assert_eq!(p2pk.signature, Some(sig));
        assert_eq!(p2pk.redeem_script, redeem);

        assert_eq!(
            parse_signature_script_2of3(&tx_in),
            Err(ParseError::UnrecognizedScriptShape)
        );
    }

    #[test]
    fn garbage_is_unrecognized() {
        init_logging();
        let tx_in = input(ScriptBuf::new(), &[vec![1, 2, 3], vec![4]]);
        assert_eq!(parse_signature_script(&tx_in), Err(ParseError::UnrecognizedScriptShape));
    }

    #[test]
    fn pub_script_outputs() {
        let ms = multisig();

        let p2sh = parse_pub_script(&ms, InputScriptType::P2sh).unwrap();
        match p2sh {
            ParsedPubScript::P2ms(p) => {
                assert_eq!(p.output_script, ScriptBuf::new_p2sh(&ms.script_hash()));
                assert!(p.output_script.is_p2sh());
            }
            other => panic!("unexpected {:?}", other),
        }

        match parse_pub_script(&ms, InputScriptType::P2shP2wsh).unwrap() {
            ParsedPubScript::P2ms(p) => {
                let redeem = ScriptBuf::new_p2wsh(&ms.wscript_hash());
                assert_eq!(p.redeem_script, Some(redeem.clone()));
                assert_eq!(p.output_script, ScriptBuf::new_p2sh(&redeem.script_hash()));
            }
            other => panic!("unexpected {:?}", other),
        }

        match parse_pub_script(&ms, InputScriptType::P2wsh).unwrap() {
            ParsedPubScript::P2ms(p) => assert!(p.output_script.is_p2wsh()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pub_script_shape_mismatch() {
        let ms = multisig();
        match parse_pub_script(&ms, InputScriptType::TaprootScriptPathSpend) {
            Err(ParseError::ShapeMismatch { script_type, .. }) => {
                assert_eq!(script_type, "taprootScriptPathSpend")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_pub_script_2of3(&ms, InputScriptType::P2shP2pk).is_err());
    }

    #[test]
    fn pub_script_taproot() {
        let k = keys();
        let xonly = [k[1].public.to_xonly(), k[2].public.to_xonly()];
        let tapscript = taproot_2of2_tapscript(&xonly);
        match parse_pub_script_2of3(&tapscript, InputScriptType::TaprootScriptPathSpend).unwrap() {
            ParsedPubScript::TaprootScriptPath(p) => {
                assert_eq!(p.public_keys, xonly.to_vec());
                assert_eq!(p.leaf_hash, tap_leaf_hash(tapscript.as_bytes(), TAPSCRIPT_LEAF_VERSION));
            }
            other => panic!("unexpected {:?}", other),
        }

        let output = Builder::new()
            .push_opcode(OP_PUSHNUM_1)
            .push_slice(xonly[0])
            .into_script();
        match parse_pub_script(&output, InputScriptType::TaprootKeyPathSpend).unwrap() {
            ParsedPubScript::TaprootKeyPath(p) => assert_eq!(p.public_key, xonly[0]),
            other => panic!("unexpected {:?}", other),
        }
    }
}

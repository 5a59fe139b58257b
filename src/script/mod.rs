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

//! Input and output script classification.
//!
//! Scripts and witness stacks are flattened into `Element`s and matched
//! against fixed patterns. The first pattern that fits decides the
//! script type.

use bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_CHECKSIG, OP_CHECKSIGVERIFY, OP_PUSHNUM_2, OP_PUSHNUM_3};
use bitcoin::opcodes::Opcode;
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::{Script, ScriptBuf};

use crate::errors::ParseError;
use crate::keys::PublicKey;

mod pattern;
pub use pattern::{match_script, Captures, Matcher};

mod parse;
pub use parse::{
    parse_pub_script, parse_pub_script_2of3, parse_signature_script, parse_signature_script_2of3,
    InputScriptType, ParsedP2ms, ParsedP2shP2pk, ParsedPubScript, ParsedPubScriptP2ms,
    ParsedPubScriptP2shP2pk, ParsedPubScriptTaprootKeyPath, ParsedPubScriptTaprootScriptPath,
    ParsedSignatureScript, ParsedTaprootKeyPath, ParsedTaprootScriptPath, P2msScriptType,
};

/// One decompiled script element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Element {
    /// Data push. `OP_0` is the empty push.
    Push(Vec<u8>),
    /// Any other opcode.
    Op(Opcode),
}

impl Element {
    /// Pushed bytes, if a push.
    pub fn as_push(&self) -> Option<&[u8]> {
        match self {
            Element::Push(data) => Some(data),
            Element::Op(_) => None,
        }
    }
}

/// Decompile a script into elements.
pub fn decompile(script: &[u8]) -> Result<Vec<Element>, ParseError> {
    Script::from_bytes(script)
        .instructions()
        .map(|ins| match ins {
            Ok(Instruction::PushBytes(data)) => Ok(Element::Push(data.as_bytes().to_vec())),
            Ok(Instruction::Op(op)) => Ok(Element::Op(op)),
            Err(_) => Err(ParseError::Decompile),
        })
        .collect()
}

/// Witness stack items are pushes.
pub fn witness_elements<T: AsRef<[u8]>>(witness: &[T]) -> Vec<Element> {
    witness.iter().map(|w| Element::Push(w.as_ref().to_vec())).collect()
}

fn push_data(builder: Builder, data: &[u8]) -> Result<Builder, ParseError> {
    let data = PushBytesBuf::try_from(data.to_vec()).map_err(|_| ParseError::Decompile)?;
    Ok(builder.push_slice(data))
}

/// `OP_2 <pk1> <pk2> <pk3> OP_3 OP_CHECKMULTISIG`
pub fn multisig_2of3_script(pubkeys: &[PublicKey; 3]) -> ScriptBuf {
    let mut builder = Builder::new().push_opcode(OP_PUSHNUM_2);
    for pk in pubkeys {
        builder = builder.push_slice(pk.to_bytes());
    }
    builder
        .push_opcode(OP_PUSHNUM_3)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script()
}

/// `<xpk1> OP_CHECKSIGVERIFY <xpk2> OP_CHECKSIG`
pub fn taproot_2of2_tapscript(xonly_keys: &[[u8; 32]; 2]) -> ScriptBuf {
    Builder::new()
        .push_slice(xonly_keys[0])
        .push_opcode(OP_CHECKSIGVERIFY)
        .push_slice(xonly_keys[1])
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// `<pk> OP_CHECKSIG`
pub fn p2pk_script(pubkey: &[u8]) -> Result<ScriptBuf, ParseError> {
    Ok(push_data(Builder::new(), pubkey)?.push_opcode(OP_CHECKSIG).into_script())
}

#[cfg(test)]
mod test {
    use super::*;
    use bitcoin::opcodes::OP_0;

    #[test]
    fn op_0_is_empty_push() {
        let script = Builder::new().push_opcode(OP_0).push_slice([1u8; 3]).into_script();
        let elements = decompile(script.as_bytes()).unwrap();
        assert_eq!(elements, vec![Element::Push(vec![]), Element::Push(vec![1, 1, 1])]);
    }

    #[test]
    fn truncated_push_fails() {
        // push of 5 bytes with only 2 present
        assert_eq!(decompile(&[0x05, 0x01, 0x02]), Err(ParseError::Decompile));
    }

    #[test]
    fn witness_items_are_pushes() {
        let w = vec![vec![], vec![0xaa]];
        assert_eq!(
            witness_elements(&w),
            vec![Element::Push(vec![]), Element::Push(vec![0xaa])]
        );
    }
}

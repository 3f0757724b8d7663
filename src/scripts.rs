//! Construction and classification of multisig witness scripts.

use serde::Serialize;

use crate::bitcoin::blockdata::opcodes::{Class, ClassifyContext};
use crate::bitcoin::blockdata::script::Instruction;
use crate::bitcoin::opcodes::all::OP_CHECKMULTISIG;
use crate::bitcoin::script::Builder;
use crate::bitcoin::secp256k1::PublicKey;
use crate::bitcoin::{Address, Network, Script, ScriptBuf};
use crate::error::MultiwalletError;

/// Build the canonical witness script `OP_m <pubkeys> OP_n OP_CHECKMULTISIG`
/// for the given leaf keys.
///
/// Keys are sorted by their compressed SEC encoding (BIP67), so the result is
/// a pure function of the key set: any enumeration order of the same keys
/// yields byte-identical script bytes.
pub fn multisig_witness_script(quorum_m: u32, leaf_keys: &[PublicKey]) -> ScriptBuf {
    let mut encodings: Vec<[u8; 33]> = leaf_keys.iter().map(|k| k.serialize()).collect();
    encodings.sort();

    let mut builder = Builder::new().push_int(quorum_m as i64);
    for encoding in &encodings {
        builder = builder.push_slice(encoding);
    }
    builder
        .push_int(encodings.len() as i64)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script()
}

/// Native-segwit P2WSH address for a witness script on the given network.
pub fn p2wsh_address(
    witness_script: &Script,
    network: Network,
) -> Result<Address, MultiwalletError> {
    let script_pubkey = witness_script.to_p2wsh();
    Address::from_script(&script_pubkey, network).map_err(|e| {
        MultiwalletError::PsbtParse(format!("could not encode p2wsh address: {}", e))
    })
}

/// Read the quorum `m` off the leading small-integer push of a witness
/// script. Anything else is not a multisig shape this tool understands.
pub fn leading_quorum_m(witness_script: &Script) -> Option<u32> {
    match witness_script.instructions().next() {
        Some(Ok(Instruction::Op(op))) => match op.classify(ClassifyContext::Legacy) {
            Class::PushNum(n) if n > 0 => Some(n as u32),
            _ => None,
        },
        _ => None,
    }
}

/// Whether `pubkey` appears as a key push in the witness script. Metadata
/// naming keys that are not in the script is lying about who controls it.
pub fn script_pushes_key(witness_script: &Script, pubkey: &PublicKey) -> bool {
    let encoding = pubkey.serialize();
    witness_script.instructions().any(|instruction| {
        matches!(instruction, Ok(Instruction::PushBytes(push)) if push.as_bytes() == encoding)
    })
}

/// Shape of an output's scriptPubKey, for display in transaction summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    OpReturn,
    NonStandard,
}

impl ScriptType {
    pub fn classify(script_pubkey: &Script) -> ScriptType {
        if script_pubkey.is_p2wsh() {
            ScriptType::P2wsh
        } else if script_pubkey.is_p2wpkh() {
            ScriptType::P2wpkh
        } else if script_pubkey.is_p2tr() {
            ScriptType::P2tr
        } else if script_pubkey.is_p2pkh() {
            ScriptType::P2pkh
        } else if script_pubkey.is_p2sh() {
            ScriptType::P2sh
        } else if script_pubkey.is_op_return() {
            ScriptType::OpReturn
        } else {
            ScriptType::NonStandard
        }
    }
}

impl std::fmt::Display for ScriptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScriptType::P2pkh => "P2PKH",
            ScriptType::P2sh => "P2SH",
            ScriptType::P2wpkh => "P2WPKH",
            ScriptType::P2wsh => "P2WSH",
            ScriptType::P2tr => "P2TR",
            ScriptType::OpReturn => "OP_RETURN",
            ScriptType::NonStandard => "NonStandard",
        };
        write!(f, "{}", name)
    }
}

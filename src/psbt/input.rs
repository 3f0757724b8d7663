//! Per-input inspection of a PSBT against the multisig quorum model.

use serde::Serialize;

use crate::bitcoin::psbt::Psbt;
use crate::bitcoin::Network;
use crate::digest::QuorumDigest;
use crate::error::MultiwalletError;
use crate::bitcoin::TxOut;
use crate::scripts::{leading_quorum_m, p2wsh_address, script_pushes_key};

/// Everything the validator learns about one input. Built fresh per
/// validation call and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedInput {
    pub index: usize,
    /// Quorum label, e.g. `2-of-3`.
    pub quorum: String,
    pub quorum_m: u32,
    /// Master-key fingerprints of every named public key on this input.
    pub root_fingerprints: Vec<String>,
    pub prev_txid: String,
    pub prev_index: u32,
    pub sequence: u32,
    pub sats: u64,
    pub address: String,
    pub witness_script_asm: String,
    pub quorum_digest: QuorumDigest,
}

impl ParsedInput {
    /// Scan input `index`: require a p2wsh witness script, read the quorum
    /// off its leading opcode, and collect the named-pubkey fingerprints
    /// that identify which wallet the input belongs to.
    pub fn parse(
        psbt: &Psbt,
        index: usize,
        network: Network,
    ) -> Result<ParsedInput, MultiwalletError> {
        let input = &psbt.inputs[index];
        let txin = &psbt.unsigned_tx.input[index];

        let witness_script = input
            .witness_script
            .as_ref()
            .ok_or(MultiwalletError::NonWitnessScriptInput { index })?;

        let quorum_m = leading_quorum_m(witness_script).ok_or_else(|| {
            MultiwalletError::UnrecognizedScriptShape {
                index,
                detail: witness_script.to_asm_string(),
            }
        })?;

        // The script and key metadata are attacker-supplied. Bind the
        // witness script to the coins actually being spent, and every named
        // pubkey to the script, before trusting either for quorum identity.
        let spent = spent_txout(psbt, index)?;
        if witness_script.to_p2wsh() != spent.script_pubkey {
            return Err(MultiwalletError::UnrecognizedScriptShape {
                index,
                detail: "witness script does not hash to the spent output's scriptPubKey"
                    .to_string(),
            });
        }
        for pubkey in input.bip32_derivation.keys() {
            if !script_pushes_key(witness_script, pubkey) {
                return Err(MultiwalletError::UnrecognizedScriptShape {
                    index,
                    detail: format!("named pubkey {} is not in the witness script", pubkey),
                });
            }
        }

        let root_fingerprints: Vec<String> = input
            .bip32_derivation
            .values()
            .map(|(fingerprint, _)| fingerprint.to_string())
            .collect();

        let quorum_digest = QuorumDigest::new(quorum_m, &root_fingerprints);
        let address = p2wsh_address(witness_script, network)?;

        Ok(ParsedInput {
            index,
            quorum: format!("{}-of-{}", quorum_m, root_fingerprints.len()),
            quorum_m,
            root_fingerprints,
            prev_txid: txin.previous_output.txid.to_string(),
            prev_index: txin.previous_output.vout,
            sequence: txin.sequence.to_consensus_u32(),
            sats: spent.value.to_sat(),
            address: address.to_string(),
            witness_script_asm: witness_script.to_asm_string(),
            quorum_digest,
        })
    }
}

/// The output being spent by input `index`, from its witness UTXO or,
/// failing that, the full previous transaction.
fn spent_txout(psbt: &Psbt, index: usize) -> Result<&TxOut, MultiwalletError> {
    let input = &psbt.inputs[index];
    if let Some(utxo) = &input.witness_utxo {
        return Ok(utxo);
    }
    let txin = &psbt.unsigned_tx.input[index];
    input
        .non_witness_utxo
        .as_ref()
        .and_then(|prev_tx| prev_tx.output.get(txin.previous_output.vout as usize))
        .ok_or_else(|| {
            MultiwalletError::PsbtParse(format!("input #{} carries no UTXO information", index))
        })
}

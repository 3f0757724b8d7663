//! Per-output classification: candidate change versus external spend.

use serde::Serialize;

use crate::bitcoin::psbt::Psbt;
use crate::bitcoin::{Address, Network};
use crate::digest::QuorumDigest;
use crate::error::MultiwalletError;
use crate::scripts::{leading_quorum_m, script_pushes_key, ScriptType};

/// Everything the validator learns about one output.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedOutput {
    pub index: usize,
    pub sats: u64,
    pub script_type: ScriptType,
    /// `None` when the scriptPubKey has no address form.
    pub address: Option<String>,
    /// An output carrying named-pubkey metadata is change; one without is
    /// the spend target.
    pub is_change: bool,
    pub quorum_digest: Option<QuorumDigest>,
}

impl ParsedOutput {
    /// Classify output `index`. A candidate change output must be p2wsh and
    /// its quorum digest must equal the inputs' digest; anything else is a
    /// transaction trying to disguise an external payment as change.
    pub fn parse(
        psbt: &Psbt,
        index: usize,
        network: Network,
        inputs_digest: &QuorumDigest,
    ) -> Result<ParsedOutput, MultiwalletError> {
        let output = &psbt.outputs[index];
        let txout = &psbt.unsigned_tx.output[index];

        let script_type = ScriptType::classify(&txout.script_pubkey);
        // Display the address of the scriptPubKey the coins actually go to;
        // output metadata never feeds the display.
        let address = Address::from_script(&txout.script_pubkey, network)
            .ok()
            .map(|a| a.to_string());

        let is_change = !output.bip32_derivation.is_empty();
        let quorum_digest = if is_change {
            Some(Self::validate_change(psbt, index, inputs_digest)?)
        } else {
            None
        };

        Ok(ParsedOutput {
            index,
            sats: txout.value.to_sat(),
            script_type,
            address,
            is_change,
            quorum_digest,
        })
    }

    fn validate_change(
        psbt: &Psbt,
        index: usize,
        inputs_digest: &QuorumDigest,
    ) -> Result<QuorumDigest, MultiwalletError> {
        let output = &psbt.outputs[index];

        let witness_script = output.witness_script.as_ref().ok_or_else(|| {
            MultiwalletError::InvalidChangeDetected {
                index,
                detail: "change output carries no witness script".to_string(),
            }
        })?;
        let quorum_m = leading_quorum_m(witness_script).ok_or_else(|| {
            MultiwalletError::InvalidChangeDetected {
                index,
                detail: "change witness script is not an m-of-n multisig".to_string(),
            }
        })?;

        // Change metadata is only trustworthy once the witness script hashes
        // to the scriptPubKey the coins actually go to, with every named
        // pubkey present in that script. Otherwise the metadata describes
        // the wallet while the sats pay someone else.
        let txout = &psbt.unsigned_tx.output[index];
        if witness_script.to_p2wsh() != txout.script_pubkey {
            return Err(MultiwalletError::InvalidChangeDetected {
                index,
                detail: "witness script does not hash to the output's scriptPubKey".to_string(),
            });
        }
        for pubkey in output.bip32_derivation.keys() {
            if !script_pushes_key(witness_script, pubkey) {
                return Err(MultiwalletError::InvalidChangeDetected {
                    index,
                    detail: format!("named pubkey {} is not in the witness script", pubkey),
                });
            }
        }

        let root_fingerprints: Vec<String> = output
            .bip32_derivation
            .values()
            .map(|(fingerprint, _)| fingerprint.to_string())
            .collect();
        let digest = QuorumDigest::new(quorum_m, &root_fingerprints);

        if &digest != inputs_digest {
            return Err(MultiwalletError::InvalidChangeDetected {
                index,
                detail: format!(
                    "output quorum {} with fingerprints [{}] does not match the inputs",
                    quorum_m,
                    root_fingerprints.join(", ")
                ),
            });
        }
        Ok(digest)
    }
}

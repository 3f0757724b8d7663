//! PSBT quorum validation.
//!
//! The validator enforces the shape this tool is willing to coordinate: every
//! input is a p2wsh multisig belonging to one and the same quorum, and the
//! outputs form either a sweep (1 output) or spend-plus-change (2 outputs).
//! Validating arbitrary batched outputs statelessly is not possible, so it is
//! refused rather than half-checked.

mod input;
mod output;

pub use input::ParsedInput;
pub use output::ParsedOutput;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::bitcoin::psbt::Psbt;
use crate::bitcoin::Network;
use crate::error::MultiwalletError;

/// Upper bound on inputs per transaction. The format itself has no cap, but
/// an adversarial PSBT with an enormous input count would otherwise burn CPU
/// on derivation-heavy per-input checks.
pub const MAX_PSBT_INPUTS: usize = 250;

/// Aggregate view of a validated transaction, for display and audit.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub txid: String,
    pub is_testnet: bool,
    /// Quorum label shared by all inputs, e.g. `2-of-3`.
    pub quorum: String,
    pub total_input_sats: u64,
    pub spend_sats: u64,
    /// `None` for a self-transfer with no external spend output.
    pub spend_address: Option<String>,
    pub fee_sats: u64,
    pub inputs: Vec<ParsedInput>,
    pub outputs: Vec<ParsedOutput>,
}

/// Decode a base64 PSBT string.
pub fn parse_psbt_base64(psbt_b64: &str) -> Result<Psbt, MultiwalletError> {
    let bytes = BASE64.decode(psbt_b64.trim())?;
    Ok(Psbt::deserialize(&bytes)?)
}

/// Serialize a PSBT back to base64 for the caller to pass on.
pub fn serialize_psbt_base64(psbt: &Psbt) -> String {
    BASE64.encode(psbt.serialize())
}

/// Validate a base64 PSBT and summarize it. With no `network_hint` the
/// network is inferred from the inputs' derivation paths.
pub fn validate_transaction(
    psbt_b64: &str,
    network_hint: Option<Network>,
) -> Result<TransactionSummary, MultiwalletError> {
    let psbt = parse_psbt_base64(psbt_b64)?;
    let network = crate::network::resolve(network_hint, &psbt);
    validate_psbt(&psbt, network)
}

/// Validate an already-deserialized PSBT. Phases run in order and the first
/// failure aborts:
///
/// 1. per-input scan (witness script, quorum, fingerprints, digest)
/// 2. all inputs share one quorum digest
/// 3. at most 2 outputs
/// 4. per-output classification (validated change vs spend)
/// 5. with 2 outputs, exactly one change and one spend
/// 6. fee assembly, which must not go negative
pub fn validate_psbt(
    psbt: &Psbt,
    network: Network,
) -> Result<TransactionSummary, MultiwalletError> {
    let input_count = psbt.inputs.len();
    if input_count > MAX_PSBT_INPUTS {
        return Err(MultiwalletError::TooManyInputs { count: input_count });
    }
    if input_count == 0 {
        return Err(MultiwalletError::PsbtParse("transaction has no inputs".to_string()));
    }

    let inputs = (0..input_count)
        .map(|index| ParsedInput::parse(psbt, index, network))
        .collect::<Result<Vec<_>, _>>()?;

    let inputs_digest = inputs[0].quorum_digest.clone();
    if let Some(conflicting) = inputs.iter().find(|i| i.quorum_digest != inputs_digest) {
        return Err(MultiwalletError::ConflictingInputQuorums {
            detail: format!(
                "input #0 is {} but input #{} is {} with fingerprints [{}]",
                inputs[0].quorum,
                conflicting.index,
                conflicting.quorum,
                conflicting.root_fingerprints.join(", ")
            ),
        });
    }

    let output_count = psbt.outputs.len();
    if output_count > 2 {
        return Err(MultiwalletError::TooManyOutputs { count: output_count });
    }

    let outputs = (0..output_count)
        .map(|index| ParsedOutput::parse(psbt, index, network, &inputs_digest))
        .collect::<Result<Vec<_>, _>>()?;

    if outputs.len() == 2 {
        match (outputs[0].is_change, outputs[1].is_change) {
            (true, true) => return Err(MultiwalletError::ChangeOnlyTransaction),
            (false, false) => return Err(MultiwalletError::AmbiguousSpendTarget),
            _ => {}
        }
    }

    let spend = outputs.iter().find(|o| !o.is_change);
    let spend_sats = spend.map(|o| o.sats).unwrap_or(0);
    let spend_address = spend.and_then(|o| o.address.clone());

    let total_input_sats = checked_sum(inputs.iter().map(|i| i.sats))
        .ok_or_else(|| MultiwalletError::PsbtParse("input amount overflow".to_string()))?;
    let total_output_sats = checked_sum(outputs.iter().map(|o| o.sats))
        .ok_or_else(|| MultiwalletError::PsbtParse("output amount overflow".to_string()))?;
    let fee_sats = total_input_sats.checked_sub(total_output_sats).ok_or(
        MultiwalletError::InvalidTransactionBalance {
            input_sats: total_input_sats,
            output_sats: total_output_sats,
        },
    )?;

    Ok(TransactionSummary {
        txid: psbt.unsigned_tx.compute_txid().to_string(),
        is_testnet: network != Network::Bitcoin,
        quorum: inputs[0].quorum.clone(),
        total_input_sats,
        spend_sats,
        spend_address,
        fee_sats,
        inputs,
        outputs,
    })
}

fn checked_sum(amounts: impl Iterator<Item = u64>) -> Option<u64> {
    let mut total: u64 = 0;
    for amount in amounts {
        total = total.checked_add(amount)?;
    }
    Some(total)
}

/// `1234567` -> `1,234,567` for summary display.
pub fn format_sats(sats: u64) -> String {
    let digits = sats.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, ch) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

impl std::fmt::Display for TransactionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fee_pct = if self.total_input_sats > 0 {
            self.fee_sats as f64 / self.total_input_sats as f64 * 100.0
        } else {
            0.0
        };
        write!(
            f,
            "{} PSBT sends {} sats to {} with a fee of {} sats ({:.2}% of tx)",
            self.quorum,
            format_sats(self.spend_sats),
            self.spend_address.as_deref().unwrap_or("(no external output)"),
            format_sats(self.fee_sats),
            fee_pct
        )
    }
}

impl TransactionSummary {
    /// Multi-line per-input/per-output listing for audit display.
    pub fn detailed_report(&self) -> String {
        let mut lines = Vec::new();
        lines.push("DETAILED VIEW".to_string());
        lines.push(format!("TXID: {}", self.txid));
        lines.push(format!(
            "Network: {}",
            if self.is_testnet { "Testnet" } else { "Mainnet" }
        ));
        lines.push("-".repeat(80));
        lines.push(format!("{} Input(s):", self.inputs.len()));
        for input in &self.inputs {
            lines.push(format!("  input #{}", input.index));
            lines.push(format!("    quorum: {}", input.quorum));
            lines.push(format!(
                "    root_fingerprints: [{}]",
                input.root_fingerprints.join(", ")
            ));
            lines.push(format!("    prev_txid: {}", input.prev_txid));
            lines.push(format!("    prev_idx: {}", input.prev_index));
            lines.push(format!("    n_sequence: {}", input.sequence));
            lines.push(format!("    sats: {}", format_sats(input.sats)));
            lines.push(format!("    addr: {}", input.address));
            lines.push(format!("    witness_script: {}", input.witness_script_asm));
            lines.push(format!("    msig_digest: {}", input.quorum_digest));
        }
        lines.push("-".repeat(80));
        lines.push(format!("{} Output(s):", self.outputs.len()));
        for output in &self.outputs {
            lines.push(format!("  output #{}", output.index));
            lines.push(format!("    sats: {}", format_sats(output.sats)));
            lines.push(format!("    addr_type: {}", output.script_type));
            lines.push(format!(
                "    addr: {}",
                output.address.as_deref().unwrap_or("(none)")
            ));
            lines.push(format!("    is_change: {}", output.is_change));
        }
        lines.join("\n")
    }
}

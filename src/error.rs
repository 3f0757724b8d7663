//! Crate-wide error type.
//!
//! Every failure the coordinator can produce is a terminal, user-correctable
//! validation result. There is no retry path and no panic path: malformed
//! input always maps to one of these variants.

/// Discriminated failure kinds surfaced by descriptor parsing, address
/// derivation, PSBT validation and signing coordination.
#[derive(Debug)]
pub enum MultiwalletError {
    /// The wallet descriptor string could not be parsed.
    DescriptorParse(String),
    /// The descriptor mixes mainnet and testnet extended keys.
    NetworkMixing(String),
    /// The PSBT could not be decoded from base64 / its binary map.
    PsbtParse(String),
    /// An input carries no witness script; only p2wsh inputs can be signed.
    NonWitnessScriptInput { index: usize },
    /// The witness script of an input does not start with a small-integer
    /// push, so the quorum cannot be read off it.
    UnrecognizedScriptShape { index: usize, detail: String },
    /// Inputs do not all belong to the same multisig quorum.
    ConflictingInputQuorums { detail: String },
    /// The transaction has more inputs than the coordinator will validate.
    TooManyInputs { count: usize },
    /// The transaction has more than two outputs (batching is unsupported).
    TooManyOutputs { count: usize },
    /// An output claims to be change but belongs to a different quorum.
    InvalidChangeDetected { index: usize, detail: String },
    /// A two-output transaction where both outputs classify as change.
    ChangeOnlyTransaction,
    /// A two-output transaction where both outputs classify as spend.
    AmbiguousSpendTarget,
    /// Output amounts exceed input amounts.
    InvalidTransactionBalance { input_sats: u64, output_sats: u64 },
    /// The requested derivation range is empty, too large, or overflows.
    InvalidDerivationRange(String),
    /// The supplied seed phrase is not a valid BIP39 mnemonic.
    InvalidMnemonic(String),
    /// The supplied seed does not correspond to any transaction input.
    SeedNotInQuorum,
    /// The signer produced no signature even though the seed matched an
    /// input. The pre-check should have made this impossible.
    SigningInvariantViolated(String),
}

impl MultiwalletError {
    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MultiwalletError::DescriptorParse(_) => "descriptor-parse",
            MultiwalletError::NetworkMixing(_) => "network-mixing",
            MultiwalletError::PsbtParse(_) => "psbt-parse",
            MultiwalletError::NonWitnessScriptInput { .. } => "non-witness-script-input",
            MultiwalletError::UnrecognizedScriptShape { .. } => "unrecognized-script-shape",
            MultiwalletError::ConflictingInputQuorums { .. } => "conflicting-input-quorums",
            MultiwalletError::TooManyInputs { .. } => "too-many-inputs",
            MultiwalletError::TooManyOutputs { .. } => "too-many-outputs",
            MultiwalletError::InvalidChangeDetected { .. } => "invalid-change-detected",
            MultiwalletError::ChangeOnlyTransaction => "change-only-transaction",
            MultiwalletError::AmbiguousSpendTarget => "ambiguous-spend-target",
            MultiwalletError::InvalidTransactionBalance { .. } => "invalid-transaction-balance",
            MultiwalletError::InvalidDerivationRange(_) => "invalid-derivation-range",
            MultiwalletError::InvalidMnemonic(_) => "invalid-mnemonic",
            MultiwalletError::SeedNotInQuorum => "seed-not-in-quorum",
            MultiwalletError::SigningInvariantViolated(_) => "signing-invariant-violated",
        }
    }
}

impl std::fmt::Display for MultiwalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultiwalletError::DescriptorParse(detail) => {
                write!(f, "could not parse wallet descriptor: {}", detail)
            }
            MultiwalletError::NetworkMixing(detail) => {
                write!(f, "conflicting networks in descriptor keys: {}", detail)
            }
            MultiwalletError::PsbtParse(detail) => {
                write!(f, "could not parse PSBT: {}", detail)
            }
            MultiwalletError::NonWitnessScriptInput { index } => {
                write!(
                    f,
                    "input #{} does not contain a witness script; only p2wsh inputs can be cosigned",
                    index
                )
            }
            MultiwalletError::UnrecognizedScriptShape { index, detail } => {
                write!(
                    f,
                    "witness script for input #{} is not an m-of-n multisig: {}",
                    index, detail
                )
            }
            MultiwalletError::ConflictingInputQuorums { detail } => {
                write!(
                    f,
                    "inputs contain conflicting wallet quorums; construct one transaction per wallet instead: {}",
                    detail
                )
            }
            MultiwalletError::TooManyInputs { count } => {
                write!(f, "transaction has {} inputs, validation is capped", count)
            }
            MultiwalletError::TooManyOutputs { count } => {
                write!(
                    f,
                    "transaction has {} outputs; batching is unsupported, use at most 2 (spend + change)",
                    count
                )
            }
            MultiwalletError::InvalidChangeDetected { index, detail } => {
                write!(
                    f,
                    "output #{} claims to be change but belongs to a different multisig wallet: {}",
                    index, detail
                )
            }
            MultiwalletError::ChangeOnlyTransaction => {
                write!(f, "both outputs classify as change; use a sweep transaction instead")
            }
            MultiwalletError::AmbiguousSpendTarget => {
                write!(f, "both outputs classify as spend; the spend target is ambiguous")
            }
            MultiwalletError::InvalidTransactionBalance { input_sats, output_sats } => {
                write!(
                    f,
                    "outputs ({} sats) exceed inputs ({} sats)",
                    output_sats, input_sats
                )
            }
            MultiwalletError::InvalidDerivationRange(detail) => {
                write!(f, "invalid derivation range: {}", detail)
            }
            MultiwalletError::InvalidMnemonic(detail) => {
                write!(f, "invalid BIP39 seed phrase: {}", detail)
            }
            MultiwalletError::SeedNotInQuorum => {
                write!(
                    f,
                    "seed does not correspond to any transaction input; does it belong to another wallet?"
                )
            }
            MultiwalletError::SigningInvariantViolated(detail) => {
                write!(
                    f,
                    "no signature produced despite a matching seed (this should not be possible): {}",
                    detail
                )
            }
        }
    }
}

impl std::error::Error for MultiwalletError {}

impl From<crate::bitcoin::psbt::Error> for MultiwalletError {
    fn from(e: crate::bitcoin::psbt::Error) -> Self {
        MultiwalletError::PsbtParse(e.to_string())
    }
}

impl From<base64::DecodeError> for MultiwalletError {
    fn from(e: base64::DecodeError) -> Self {
        MultiwalletError::PsbtParse(format!("invalid base64: {}", e))
    }
}

impl From<crate::bitcoin::bip32::Error> for MultiwalletError {
    fn from(e: crate::bitcoin::bip32::Error) -> Self {
        MultiwalletError::DescriptorParse(format!("bip32: {}", e))
    }
}

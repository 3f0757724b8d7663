//! Stateless multisig wallet coordinator.
//!
//! Given an output descriptor this crate derives the wallet's p2wsh
//! receiving addresses; given a PSBT it validates that every input and any
//! change output belong to one and the same multisig quorum, and coordinates
//! which seed-derived keys cosign which inputs. Nothing is persisted between
//! calls: every operation re-derives its world from the supplied descriptor,
//! mnemonic or PSBT.

pub mod derive;
pub mod descriptor;
pub mod digest;
pub mod error;
pub mod network;
pub mod psbt;
pub mod scripts;
pub mod seedpicker;
pub mod signer;
#[cfg(test)]
mod test_utils;

// re-export bitcoin from the miniscript crate, which also supplies the
// descriptor checksum routine
pub use ::miniscript::bitcoin;

pub use derive::{derive_addresses, AddressIter, MAX_DERIVATION_LIMIT};
pub use descriptor::{CosignerKeySpec, WalletDescriptor};
pub use digest::QuorumDigest;
pub use error::MultiwalletError;
pub use psbt::{
    parse_psbt_base64, serialize_psbt_base64, validate_transaction, ParsedInput, ParsedOutput,
    TransactionSummary, MAX_PSBT_INPUTS,
};
pub use signer::{sign_transaction, SigningPlan};

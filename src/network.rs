//! Network selection helpers.
//!
//! The PSBT serialization format does not encode which network a transaction
//! is on, so callers either pass an explicit hint or we guess from the BIP32
//! paths recorded in the inputs.

use crate::bitcoin::bip32::ChildNumber;
use crate::bitcoin::psbt::Psbt;
use crate::bitcoin::Network;

pub fn from_testnet_flag(is_testnet: bool) -> Network {
    if is_testnet {
        Network::Testnet
    } else {
        Network::Bitcoin
    }
}

/// Guess the network from the hardened coin-type component of the inputs'
/// derivation paths (`m/48'/0'/...` mainnet, `m/48'/1'/...` testnet).
/// Returns `None` when no input carries a usable path.
pub fn infer_from_psbt(psbt: &Psbt) -> Option<Network> {
    for input in &psbt.inputs {
        for (_, path) in input.bip32_derivation.values() {
            let components: &[ChildNumber] = path.as_ref();
            match components.get(1) {
                Some(ChildNumber::Hardened { index: 0 }) => return Some(Network::Bitcoin),
                Some(ChildNumber::Hardened { index: 1 }) => return Some(Network::Testnet),
                _ => {}
            }
        }
    }
    None
}

/// Network to validate against: explicit hint first, then path inference,
/// defaulting to testnet as the safer guess.
pub fn resolve(hint: Option<Network>, psbt: &Psbt) -> Network {
    hint.or_else(|| infer_from_psbt(psbt)).unwrap_or(Network::Testnet)
}

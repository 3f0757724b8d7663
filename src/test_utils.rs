//! Deterministic fixtures for descriptor, derivation and PSBT tests.
//!
//! Cosigner master keys are built from short seed strings so every test can
//! spin up an independent wallet without external vectors.

use std::collections::BTreeMap;
use std::str::FromStr;

use bip39::{Language, Mnemonic};

use crate::bitcoin::absolute::LockTime;
use crate::bitcoin::bip32::{DerivationPath, Fingerprint, Xpriv, Xpub};
use crate::bitcoin::hashes::{sha256, Hash};
use crate::bitcoin::psbt::Psbt;
use crate::bitcoin::secp256k1::{self, Secp256k1};
use crate::bitcoin::transaction::Version;
use crate::bitcoin::{
    Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, WPubkeyHash,
    Witness,
};
use crate::scripts::multisig_witness_script;

/// Multisig account path used by all fixtures (testnet).
pub const ACCOUNT_PATH: &str = "m/48'/1'/0'/2'";

pub fn test_xpriv(seed: &str) -> Xpriv {
    let seed_hash = sha256::Hash::hash(seed.as_bytes()).to_byte_array();
    Xpriv::new_master(Network::Testnet, &seed_hash).expect("could not create xpriv from seed")
}

pub fn test_cosigner_xprivs(seed: &str, count: usize) -> Vec<Xpriv> {
    (0..count)
        .map(|i| test_xpriv(&format!("{}/{}", seed, i)))
        .collect()
}

/// Master key for a BIP39 phrase, for signing-flow tests.
pub fn mnemonic_master(phrase: &str) -> Xpriv {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .expect("fixture mnemonic must be valid");
    Xpriv::new_master(Network::Testnet, &mnemonic.to_seed(""))
        .expect("could not create xpriv from mnemonic")
}

fn account_path() -> DerivationPath {
    DerivationPath::from_str(ACCOUNT_PATH).unwrap()
}

/// Account-level xpub plus master fingerprint for each cosigner.
fn account_keys(cosigners: &[Xpriv]) -> Vec<(Fingerprint, Xpub)> {
    let secp = Secp256k1::new();
    let path = account_path();
    cosigners
        .iter()
        .map(|master| {
            let account = master.derive_priv(&secp, &path).unwrap();
            (master.fingerprint(&secp), Xpub::from_priv(&secp, &account))
        })
        .collect()
}

/// Descriptor string in the canonical `wsh(sortedmulti(...))` form for the
/// given cosigners (receive branch, no checksum).
pub fn descriptor_for(cosigners: &[Xpriv], quorum_m: u32) -> String {
    let fragments: Vec<String> = account_keys(cosigners)
        .iter()
        .map(|(fingerprint, xpub)| format!("[{}/48h/1h/0h/2h]{}/0/*", fingerprint, xpub))
        .collect();
    format!("wsh(sortedmulti({},{}))", quorum_m, fragments.join(","))
}

/// Leaf public keys for all cosigners at `branch/index`.
pub fn leaf_pubkeys_at(cosigners: &[Xpriv], branch: u32, index: u32) -> Vec<secp256k1::PublicKey> {
    let secp = Secp256k1::new();
    let path = account_path()
        .child(crate::bitcoin::bip32::ChildNumber::from_normal_idx(branch).unwrap())
        .child(crate::bitcoin::bip32::ChildNumber::from_normal_idx(index).unwrap());
    cosigners
        .iter()
        .map(|master| {
            let leaf = master.derive_priv(&secp, &path).unwrap();
            Xpub::from_priv(&secp, &leaf).public_key
        })
        .collect()
}

/// Witness script and full-path derivation map at `branch/index`.
fn leaf_script(
    cosigners: &[Xpriv],
    quorum_m: u32,
    branch: u32,
    index: u32,
) -> (
    ScriptBuf,
    BTreeMap<secp256k1::PublicKey, (Fingerprint, DerivationPath)>,
) {
    let secp = Secp256k1::new();
    let full_path = DerivationPath::from_str(&format!("{}/{}/{}", ACCOUNT_PATH, branch, index))
        .unwrap();
    let mut derivation = BTreeMap::new();
    let mut keys = Vec::new();
    for master in cosigners {
        let leaf = master.derive_priv(&secp, &full_path).unwrap();
        let pubkey = Xpub::from_priv(&secp, &leaf).public_key;
        derivation.insert(pubkey, (master.fingerprint(&secp), full_path.clone()));
        keys.push(pubkey);
    }
    (multisig_witness_script(quorum_m, &keys), derivation)
}

/// One requested output of a fixture PSBT.
pub struct TestOutput {
    pub sats: u64,
    /// `Some(leaf index)` marks this as change back to the wallet.
    pub change_index: Option<u32>,
}

impl TestOutput {
    pub fn external(sats: u64) -> TestOutput {
        TestOutput {
            sats,
            change_index: None,
        }
    }

    pub fn change(sats: u64, leaf_index: u32) -> TestOutput {
        TestOutput {
            sats,
            change_index: Some(leaf_index),
        }
    }
}

pub struct PsbtSpec<'a> {
    pub cosigners: &'a [Xpriv],
    pub quorum_m: u32,
    pub input_sats: &'a [u64],
    pub outputs: &'a [TestOutput],
}

/// Build an unsigned PSBT spending the fixture wallet's p2wsh outputs, with
/// full witness-script and BIP32 metadata on every input and on change
/// outputs, the way a wallet coordinator would hand it to a cosigner.
pub fn build_test_psbt(spec: &PsbtSpec) -> Psbt {
    let mut tx_inputs = Vec::new();
    let mut input_meta = Vec::new();
    for (i, sats) in spec.input_sats.iter().enumerate() {
        let (witness_script, derivation) =
            leaf_script(spec.cosigners, spec.quorum_m, 0, i as u32);
        tx_inputs.push(TxIn {
            previous_output: OutPoint::new(dummy_txid(i), i as u32),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        });
        let mut meta = crate::bitcoin::psbt::Input {
            witness_utxo: Some(TxOut {
                value: Amount::from_sat(*sats),
                script_pubkey: witness_script.to_p2wsh(),
            }),
            witness_script: Some(witness_script),
            ..Default::default()
        };
        meta.bip32_derivation = derivation;
        input_meta.push(meta);
    }

    let mut tx_outputs = Vec::new();
    let mut output_meta = Vec::new();
    for output in spec.outputs {
        match output.change_index {
            Some(leaf_index) => {
                let (witness_script, derivation) =
                    leaf_script(spec.cosigners, spec.quorum_m, 1, leaf_index);
                tx_outputs.push(TxOut {
                    value: Amount::from_sat(output.sats),
                    script_pubkey: witness_script.to_p2wsh(),
                });
                let mut meta = crate::bitcoin::psbt::Output {
                    witness_script: Some(witness_script),
                    ..Default::default()
                };
                meta.bip32_derivation = derivation;
                output_meta.push(meta);
            }
            None => {
                tx_outputs.push(TxOut {
                    value: Amount::from_sat(output.sats),
                    script_pubkey: ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(
                        [0x42; 20],
                    )),
                });
                output_meta.push(crate::bitcoin::psbt::Output::default());
            }
        }
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: tx_inputs,
        output: tx_outputs,
    };
    let mut psbt = Psbt::from_unsigned_tx(tx).expect("fixture transaction must be unsigned");
    psbt.inputs = input_meta;
    psbt.outputs = output_meta;
    psbt
}

/// Base64 form, as a cosigner would receive it.
pub fn serialize(psbt: &Psbt) -> String {
    crate::psbt::serialize_psbt_base64(psbt)
}

fn dummy_txid(i: usize) -> Txid {
    Txid::from_raw_hash(crate::bitcoin::hashes::sha256d::Hash::hash(&[i as u8]))
}

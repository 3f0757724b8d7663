//! Signing coordination: which of the signer's keys sign which inputs.

use std::collections::{BTreeMap, BTreeSet};

use bip39::{Language, Mnemonic};

use crate::bitcoin::bip32::{DerivationPath, Fingerprint, Xpriv};
use crate::bitcoin::psbt::{GetKey, GetKeyError, KeyRequest, Psbt};
use crate::bitcoin::secp256k1::{Secp256k1, Signing};
use crate::bitcoin::{Network, PrivateKey};
use crate::error::MultiwalletError;
use crate::psbt::{parse_psbt_base64, serialize_psbt_base64, validate_psbt};

/// Word counts accepted for a full signing seed.
const FULL_SEED_WORDS: [usize; 5] = [12, 15, 18, 21, 24];

/// The distinct derivation paths a signer must use for a transaction,
/// computed by matching the signer's master fingerprint against every
/// input's named-pubkey records. Consumed immediately by signing.
#[derive(Debug)]
pub struct SigningPlan {
    pub master_fingerprint: Fingerprint,
    pub paths: BTreeSet<DerivationPath>,
}

impl SigningPlan {
    /// Collect the paths recorded against `master_fingerprint` across all
    /// inputs. Inputs commonly reuse one path, hence the set.
    ///
    /// Fails with `SeedNotInQuorum` when no input references the signer at
    /// all: the seed belongs to some other wallet.
    pub fn from_psbt(
        psbt: &Psbt,
        master_fingerprint: Fingerprint,
    ) -> Result<SigningPlan, MultiwalletError> {
        let mut paths = BTreeSet::new();
        for input in &psbt.inputs {
            for (fingerprint, path) in input.bip32_derivation.values() {
                if *fingerprint == master_fingerprint {
                    paths.insert(path.clone());
                }
            }
        }
        if paths.is_empty() {
            return Err(MultiwalletError::SeedNotInQuorum);
        }
        Ok(SigningPlan {
            master_fingerprint,
            paths,
        })
    }

    /// Derive one leaf private key per distinct path.
    pub fn derive_keys<C: Signing>(
        &self,
        master: &Xpriv,
        secp: &Secp256k1<C>,
    ) -> Result<SigningKeySet, MultiwalletError> {
        let mut keys = BTreeMap::new();
        for path in &self.paths {
            let leaf = master.derive_priv(secp, path).map_err(|e| {
                MultiwalletError::SigningInvariantViolated(format!(
                    "could not derive signing key at {}: {}",
                    path, e
                ))
            })?;
            keys.insert(path.clone(), leaf.to_priv());
        }
        Ok(SigningKeySet {
            master_fingerprint: self.master_fingerprint,
            keys,
        })
    }
}

/// The derived leaf keys, answering the signer's key requests by full
/// derivation path.
pub struct SigningKeySet {
    master_fingerprint: Fingerprint,
    keys: BTreeMap<DerivationPath, PrivateKey>,
}

impl GetKey for SigningKeySet {
    type Error = GetKeyError;

    fn get_key<C: Signing>(
        &self,
        key_request: KeyRequest,
        _secp: &Secp256k1<C>,
    ) -> Result<Option<PrivateKey>, Self::Error> {
        match key_request {
            KeyRequest::Bip32((fingerprint, path)) => {
                if fingerprint == self.master_fingerprint {
                    Ok(self.keys.get(&path).copied())
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }
}

/// Parse a full seed phrase, enforcing the accepted word counts before the
/// wordlist/checksum validation.
pub fn master_key_from_mnemonic(
    phrase: &str,
    network: Network,
) -> Result<Xpriv, MultiwalletError> {
    let normalized = phrase
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let word_count = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if !FULL_SEED_WORDS.contains(&word_count) {
        return Err(MultiwalletError::InvalidMnemonic(format!(
            "expected 12, 15, 18, 21 or 24 words, got {}",
            word_count
        )));
    }
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| MultiwalletError::InvalidMnemonic(e.to_string()))?;
    Xpriv::new_master(network, &mnemonic.to_seed(""))
        .map_err(|e| MultiwalletError::InvalidMnemonic(e.to_string()))
}

/// Validate a base64 PSBT and cosign it with the supplied seed phrase,
/// returning the re-serialized base64.
///
/// The transaction is fully validated first; keys are only derived once the
/// quorum checks hold.
pub fn sign_transaction(
    psbt_b64: &str,
    mnemonic: &str,
    network_hint: Option<Network>,
) -> Result<String, MultiwalletError> {
    let mut psbt = parse_psbt_base64(psbt_b64)?;
    let network = crate::network::resolve(network_hint, &psbt);
    validate_psbt(&psbt, network)?;

    let secp = Secp256k1::new();
    let master = master_key_from_mnemonic(mnemonic, network)?;
    let master_fingerprint = master.fingerprint(&secp);

    let plan = SigningPlan::from_psbt(&psbt, master_fingerprint)?;
    let keys = plan.derive_keys(&master, &secp)?;

    match psbt.sign(&keys, &secp) {
        Ok(signed) if !signed.is_empty() => Ok(serialize_psbt_base64(&psbt)),
        Ok(_) => Err(MultiwalletError::SigningInvariantViolated(
            "signer produced no signatures".to_string(),
        )),
        Err((_, errors)) => Err(MultiwalletError::SigningInvariantViolated(
            errors
                .iter()
                .map(|(index, e)| format!("input #{}: {}", index, e))
                .collect::<Vec<_>>()
                .join("; "),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psbt::parse_psbt_base64;
    use crate::test_utils::{
        build_test_psbt, mnemonic_master, serialize, PsbtSpec, TestOutput,
    };

    const MNEMONIC_A: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
                              abandon abandon abandon abandon abandon abandon abandon abandon \
                              abandon abandon abandon abandon abandon abandon abandon art";

    fn cosigners_with_mnemonic() -> Vec<crate::bitcoin::bip32::Xpriv> {
        vec![
            mnemonic_master(MNEMONIC_A),
            crate::test_utils::test_xpriv("cosigner-b"),
        ]
    }

    #[test]
    fn signs_every_input_with_one_derived_key_per_path() {
        let cosigners = cosigners_with_mnemonic();
        let psbt = build_test_psbt(&PsbtSpec {
            cosigners: &cosigners,
            quorum_m: 2,
            input_sats: &[60_000, 40_000],
            outputs: &[TestOutput::external(99_000)],
        });
        let signed_b64 = sign_transaction(&serialize(&psbt), MNEMONIC_A, None).unwrap();
        let signed = parse_psbt_base64(&signed_b64).unwrap();
        assert_eq!(signed.inputs[0].partial_sigs.len(), 1);
        assert_eq!(signed.inputs[1].partial_sigs.len(), 1);
    }

    #[test]
    fn plan_deduplicates_shared_paths() {
        let cosigners = cosigners_with_mnemonic();
        let mut psbt = build_test_psbt(&PsbtSpec {
            cosigners: &cosigners,
            quorum_m: 2,
            input_sats: &[60_000, 40_000],
            outputs: &[TestOutput::external(99_000)],
        });
        // Point both inputs at the same leaf so their paths collide.
        psbt.inputs[1] = psbt.inputs[0].clone();
        let secp = Secp256k1::new();
        let master = mnemonic_master(MNEMONIC_A);
        let plan = SigningPlan::from_psbt(&psbt, master.fingerprint(&secp)).unwrap();
        assert_eq!(plan.paths.len(), 1);
    }

    #[test]
    fn foreign_seed_is_rejected() {
        let cosigners = cosigners_with_mnemonic();
        let psbt = build_test_psbt(&PsbtSpec {
            cosigners: &cosigners,
            quorum_m: 2,
            input_sats: &[100_000],
            outputs: &[TestOutput::external(99_000)],
        });
        let foreign = "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong";
        let err = sign_transaction(&serialize(&psbt), foreign, None).unwrap_err();
        assert!(matches!(err, MultiwalletError::SeedNotInQuorum));
    }

    #[test]
    fn wrong_word_count_is_rejected_before_signing() {
        let cosigners = cosigners_with_mnemonic();
        let psbt = build_test_psbt(&PsbtSpec {
            cosigners: &cosigners,
            quorum_m: 2,
            input_sats: &[100_000],
            outputs: &[TestOutput::external(99_000)],
        });
        let err = sign_transaction(&serialize(&psbt), "abandon abandon art", None).unwrap_err();
        assert!(matches!(err, MultiwalletError::InvalidMnemonic(_)));
    }

    #[test]
    fn gibberish_words_are_rejected() {
        let err = master_key_from_mnemonic(
            "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima",
            Network::Testnet,
        )
        .unwrap_err();
        assert!(matches!(err, MultiwalletError::InvalidMnemonic(_)));
    }

    #[test]
    fn full_circle_from_descriptor_to_signed_psbt() {
        let cosigners = cosigners_with_mnemonic();
        let descriptor = crate::test_utils::descriptor_for(&cosigners, 2);
        let wallet = crate::descriptor::WalletDescriptor::parse(&descriptor).unwrap();
        let addresses: Vec<String> = crate::derive::derive_addresses(&wallet, 0, 2)
            .unwrap()
            .map(|entry| entry.unwrap().1.to_string())
            .collect();

        let psbt = build_test_psbt(&PsbtSpec {
            cosigners: &cosigners,
            quorum_m: 2,
            input_sats: &[60_000, 40_000],
            outputs: &[TestOutput::external(70_000), TestOutput::change(29_000, 3)],
        });

        // The inputs the PSBT spends are the wallet's own receive addresses.
        let summary = crate::psbt::validate_transaction(&serialize(&psbt), None).unwrap();
        assert_eq!(summary.quorum, "2-of-2");
        assert_eq!(summary.inputs[0].address, addresses[0]);
        assert_eq!(summary.inputs[1].address, addresses[1]);
        assert_eq!(summary.fee_sats, 1_000);

        let signed_b64 = sign_transaction(&serialize(&psbt), MNEMONIC_A, None).unwrap();
        let signed = parse_psbt_base64(&signed_b64).unwrap();
        assert!(signed.inputs.iter().all(|i| i.partial_sigs.len() == 1));
    }

    #[test]
    fn validation_failures_block_signing() {
        let cosigners = cosigners_with_mnemonic();
        let psbt = build_test_psbt(&PsbtSpec {
            cosigners: &cosigners,
            quorum_m: 2,
            input_sats: &[100_000],
            outputs: &[
                TestOutput::external(30_000),
                TestOutput::external(30_000),
                TestOutput::external(30_000),
            ],
        });
        let err = sign_transaction(&serialize(&psbt), MNEMONIC_A, None).unwrap_err();
        assert!(matches!(err, MultiwalletError::TooManyOutputs { count: 3 }));
    }
}

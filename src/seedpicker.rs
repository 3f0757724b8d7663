//! Seed-phrase completion and cosigner key-record export.
//!
//! Users who draw their seed words from a hat supply all but the last word;
//! the final word carries checksum bits, so we search the wordlist for every
//! candidate that yields a valid mnemonic.

use std::str::FromStr;

use bip39::{Language, Mnemonic};

use crate::bitcoin::base58;
use crate::bitcoin::bip32::{DerivationPath, Xpub};
use crate::bitcoin::secp256k1::Secp256k1;
use crate::error::MultiwalletError;
use crate::signer::master_key_from_mnemonic;

/// Word counts accepted for a partial phrase (one word short of a full seed).
const FIRST_WORDS_COUNTS: [usize; 5] = [11, 14, 17, 20, 23];

/// SLIP-0132 version bytes for multisig segwit account keys.
const SLIP132_ZPUB: [u8; 4] = [0x02, 0xaa, 0x7e, 0xd3];
const SLIP132_VPUB: [u8; 4] = [0x02, 0x57, 0x54, 0x83];

/// Every wordlist word that completes `first_words` into a checksum-valid
/// mnemonic. A pure search over the English wordlist; for a valid partial
/// phrase the result is never empty.
pub fn valid_final_words(first_words: &str) -> Result<Vec<&'static str>, MultiwalletError> {
    let words: Vec<String> = first_words
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();

    if !FIRST_WORDS_COUNTS.contains(&words.len()) {
        return Err(MultiwalletError::InvalidMnemonic(format!(
            "expected 11, 14, 17, 20 or 23 first words, got {}",
            words.len()
        )));
    }

    let wordlist = Language::English.words_by_prefix("");
    let unknown: Vec<String> = words
        .iter()
        .enumerate()
        .filter(|(_, word)| wordlist.binary_search(&word.as_str()).is_err())
        .map(|(position, word)| format!("word #{}: {}", position + 1, word))
        .collect();
    if !unknown.is_empty() {
        return Err(MultiwalletError::InvalidMnemonic(format!(
            "not in the BIP39 wordlist: {}",
            unknown.join(", ")
        )));
    }

    let prefix = words.join(" ");
    Ok(wordlist
        .iter()
        .filter(|candidate| {
            let phrase = format!("{} {}", prefix, candidate);
            Mnemonic::parse_in_normalized(Language::English, &phrase).is_ok()
        })
        .copied()
        .collect())
}

/// Render the cosigner key record `[<fingerprint>/48h/<coin>h/0h/2h]<xpub>`
/// for a full seed phrase, with the account key in SLIP-0132 notation
/// (`Zpub`/`Vpub`) as wallet coordinators expect for p2wsh multisig import.
pub fn key_record(phrase: &str, is_testnet: bool) -> Result<String, MultiwalletError> {
    let network = crate::network::from_testnet_flag(is_testnet);
    let master = master_key_from_mnemonic(phrase, network)?;

    let (path_text, version) = if is_testnet {
        ("m/48'/1'/0'/2'", SLIP132_VPUB)
    } else {
        ("m/48'/0'/0'/2'", SLIP132_ZPUB)
    };
    let path = DerivationPath::from_str(path_text)
        .map_err(|e| MultiwalletError::InvalidMnemonic(e.to_string()))?;

    let secp = Secp256k1::new();
    let account = master.derive_priv(&secp, &path).map_err(|e| {
        MultiwalletError::InvalidMnemonic(format!("account derivation failed: {}", e))
    })?;
    let account_xpub = Xpub::from_priv(&secp, &account);

    let mut encoded = account_xpub.encode();
    encoded[..4].copy_from_slice(&version);

    Ok(format!(
        "[{}{}]{}",
        master.fingerprint(&secp),
        path_text.trim_start_matches('m').replace('\'', "h"),
        base58::encode_check(&encoded)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::WalletDescriptor;

    const FIRST_23: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
                            abandon abandon abandon abandon abandon abandon abandon abandon \
                            abandon abandon abandon abandon abandon abandon abandon";

    #[test]
    fn completes_the_classic_test_phrase() {
        let candidates = valid_final_words(FIRST_23).unwrap();
        assert!(candidates.contains(&"art"));
        // The final word holds 3 entropy bits plus the checksum, so exactly
        // 8 of the 2048 words complete any 23-word prefix.
        assert_eq!(candidates.len(), 8);
    }

    #[test]
    fn eleven_word_phrases_are_accepted() {
        let candidates =
            valid_final_words("zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo").unwrap();
        assert!(candidates.contains(&"wrong"));
    }

    #[test]
    fn rejects_unknown_words_with_positions() {
        let err = valid_final_words(
            "abandon abandon notaword abandon abandon abandon abandon abandon abandon abandon abandon",
        )
        .unwrap_err();
        match err {
            MultiwalletError::InvalidMnemonic(detail) => {
                assert!(detail.contains("word #3: notaword"), "{}", detail)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_word_count() {
        let err = valid_final_words("abandon abandon abandon").unwrap_err();
        assert!(matches!(err, MultiwalletError::InvalidMnemonic(_)));
    }

    #[test]
    fn key_record_uses_slip132_testnet_prefix() {
        let phrase = format!("{} art", FIRST_23);
        let record = key_record(&phrase, true).unwrap();
        assert!(record.starts_with('['), "{}", record);
        assert!(record.contains("/48h/1h/0h/2h]Vpub"), "{}", record);
    }

    #[test]
    fn key_record_uses_slip132_mainnet_prefix() {
        let phrase = format!("{} art", FIRST_23);
        let record = key_record(&phrase, false).unwrap();
        assert!(record.contains("/48h/0h/0h/2h]Zpub"), "{}", record);
    }

    #[test]
    fn completed_seed_round_trips_into_a_descriptor() {
        // The completed phrase must itself be usable as a cosigner.
        let phrase = format!("{} art", FIRST_23);
        let master = crate::test_utils::mnemonic_master(&phrase);
        let other = crate::test_utils::test_xpriv("seedpicker-cosigner");
        let descriptor = crate::test_utils::descriptor_for(&[master, other], 2);
        let wallet = WalletDescriptor::parse(&descriptor).unwrap();
        assert_eq!(wallet.quorum_n, 2);
    }
}

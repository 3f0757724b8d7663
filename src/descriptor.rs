//! Parsing of `wsh(sortedmulti(...))` output descriptors into a structured
//! multisig wallet definition.

use std::str::FromStr;

use miniscript::descriptor::checksum::desc_checksum;

use crate::bitcoin::bip32::{DerivationPath, Fingerprint, Xpub};
use crate::error::MultiwalletError;

/// One cosigner's key record from a descriptor fragment
/// `[xfp/path]XPUB/branch/*`.
#[derive(Debug, Clone)]
pub struct CosignerKeySpec {
    /// 4-byte identifier of the cosigner's master key.
    pub root_fingerprint: Fingerprint,
    /// Path from the cosigner's master key to `extended_public_key`.
    pub derivation_path: DerivationPath,
    /// The extended public key embedded in the descriptor.
    pub extended_public_key: Xpub,
    /// The receive/change branch fixed by the descriptor (the `0` or `1`
    /// before the trailing `*`).
    pub branch_index: u32,
}

/// A parsed multisig wallet definition: quorum plus ordered cosigner records.
///
/// Nothing here is persisted; a descriptor is re-parsed for every derivation
/// or validation call.
#[derive(Debug, Clone)]
pub struct WalletDescriptor {
    pub quorum_m: u32,
    pub quorum_n: u32,
    pub is_testnet: bool,
    pub cosigners: Vec<CosignerKeySpec>,
}

impl WalletDescriptor {
    /// Parse a descriptor of the canonical form
    /// `wsh(sortedmulti(M,[xfp/path]XPUB/branch/*,...))#checksum`.
    ///
    /// The trailing `#checksum`, when present, is recomputed with the
    /// descriptor checksum routine of the primitives layer and must match;
    /// descriptors without one are accepted. Any malformed fragment fails
    /// the whole parse.
    pub fn parse(descriptor: &str) -> Result<WalletDescriptor, MultiwalletError> {
        let descriptor = descriptor.trim();
        let body = match descriptor.split_once('#') {
            Some((body, claimed)) => {
                let expected = desc_checksum(body)
                    .map_err(|e| MultiwalletError::DescriptorParse(e.to_string()))?;
                if claimed != expected {
                    return Err(MultiwalletError::DescriptorParse(format!(
                        "checksum mismatch: expected {}, got {}",
                        expected, claimed
                    )));
                }
                body
            }
            None => descriptor,
        };

        let inner = body
            .strip_prefix("wsh(sortedmulti(")
            .and_then(|s| s.strip_suffix("))"))
            .ok_or_else(|| {
                MultiwalletError::DescriptorParse(
                    "expected wsh(sortedmulti(...)) form".to_string(),
                )
            })?;

        let mut parts = inner.split(',');
        let quorum_m: u32 = parts
            .next()
            .unwrap_or("")
            .trim()
            .parse()
            .map_err(|_| {
                MultiwalletError::DescriptorParse("missing or non-numeric quorum".to_string())
            })?;

        let cosigners = parts
            .map(parse_key_fragment)
            .collect::<Result<Vec<_>, _>>()?;
        let quorum_n = cosigners.len() as u32;

        if quorum_m == 0 || quorum_m > quorum_n {
            return Err(MultiwalletError::DescriptorParse(format!(
                "invalid quorum: {}-of-{}",
                quorum_m, quorum_n
            )));
        }

        let is_testnet = shared_network(&cosigners)?;

        Ok(WalletDescriptor {
            quorum_m,
            quorum_n,
            is_testnet,
            cosigners,
        })
    }

    pub fn network(&self) -> crate::bitcoin::Network {
        crate::network::from_testnet_flag(self.is_testnet)
    }
}

/// Parse one `[xfp/path]XPUB/branch/*` fragment.
fn parse_key_fragment(fragment: &str) -> Result<CosignerKeySpec, MultiwalletError> {
    let fragment = fragment.trim();
    let origin = fragment
        .strip_prefix('[')
        .ok_or_else(|| bad_fragment(fragment, "missing [xfp/path] origin"))?;
    let (origin, key_part) = origin
        .split_once(']')
        .ok_or_else(|| bad_fragment(fragment, "unterminated [xfp/path] origin"))?;

    // Escaped slashes come from descriptors pasted out of JSON exports.
    let origin = origin.replace("\\/", "/");
    let (xfp_hex, raw_path) = match origin.split_once('/') {
        Some((xfp, path)) => (xfp, path),
        None => (origin.as_str(), ""),
    };
    let root_fingerprint = Fingerprint::from_str(xfp_hex)
        .map_err(|_| bad_fragment(fragment, "fingerprint is not 8 hex characters"))?;

    let normalized = raw_path.trim_start_matches('/');
    let derivation_path = if normalized.is_empty() {
        DerivationPath::master()
    } else {
        DerivationPath::from_str(&format!("m/{}", normalized))
            .map_err(|e| bad_fragment(fragment, &format!("bad derivation path: {}", e)))?
    };

    let mut key_parts = key_part.split('/');
    let xpub_str = key_parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_fragment(fragment, "missing extended public key"))?;
    let branch_index: u32 = key_parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| bad_fragment(fragment, "missing or non-numeric branch index"))?;
    if key_parts.next() != Some("*") || key_parts.next().is_some() {
        return Err(bad_fragment(fragment, "expected trailing /branch/*"));
    }

    let extended_public_key = Xpub::from_str(xpub_str)
        .map_err(|e| bad_fragment(fragment, &format!("bad extended key: {}", e)))?;

    Ok(CosignerKeySpec {
        root_fingerprint,
        derivation_path,
        extended_public_key,
        branch_index,
    })
}

/// All cosigner keys must carry the same version prefix; `tpub` maps to
/// testnet, `xpub` to mainnet, anything else is rejected outright.
fn shared_network(cosigners: &[CosignerKeySpec]) -> Result<bool, MultiwalletError> {
    let prefixes: Vec<String> = cosigners
        .iter()
        .map(|c| {
            c.extended_public_key
                .to_string()
                .chars()
                .take(4)
                .collect::<String>()
        })
        .collect();

    let first = prefixes
        .first()
        .ok_or_else(|| MultiwalletError::DescriptorParse("no cosigner keys".to_string()))?;
    if prefixes.iter().any(|p| p != first) {
        return Err(MultiwalletError::NetworkMixing(format!(
            "key prefixes: {}",
            prefixes.join(", ")
        )));
    }

    match first.as_str() {
        "tpub" => Ok(true),
        "xpub" => Ok(false),
        other => Err(MultiwalletError::DescriptorParse(format!(
            "unsupported extended key prefix: {}",
            other
        ))),
    }
}

fn bad_fragment(fragment: &str, detail: &str) -> MultiwalletError {
    MultiwalletError::DescriptorParse(format!("fragment {:?}: {}", fragment, detail))
}

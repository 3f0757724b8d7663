//! Descriptor-driven address derivation.
//!
//! Key derivation is CPU-bound, so addresses are produced through a lazy
//! iterator: callers can interleave derivation with display instead of
//! materializing the whole range up front. Stopping consumption early is the
//! only cancellation needed; derivation has no side effects.

use crate::bitcoin::bip32::ChildNumber;
use crate::bitcoin::secp256k1::{self, Secp256k1};
use crate::bitcoin::{Address, Network};
use crate::descriptor::WalletDescriptor;
use crate::error::MultiwalletError;
use crate::scripts::{multisig_witness_script, p2wsh_address};

/// Upper bound on how many addresses one call may derive.
pub const MAX_DERIVATION_LIMIT: u32 = 10_000;

/// Lazy, finite, restartable sequence of `(index, address)` pairs.
pub struct AddressIter<'a> {
    wallet: &'a WalletDescriptor,
    network: Network,
    next_index: u32,
    end: u32,
    secp: Secp256k1<secp256k1::VerifyOnly>,
}

impl Iterator for AddressIter<'_> {
    type Item = Result<(u32, Address), MultiwalletError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.end {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(derive_at_index(self.wallet, &self.secp, self.network, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next_index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AddressIter<'_> {}

/// Derive the multisig address at one child index: each cosigner's leaf key
/// is `xpub/branch/index`, and the sorted leaf set feeds the witness script.
fn derive_at_index(
    wallet: &WalletDescriptor,
    secp: &Secp256k1<secp256k1::VerifyOnly>,
    network: Network,
    index: u32,
) -> Result<(u32, Address), MultiwalletError> {
    let child = ChildNumber::from_normal_idx(index)
        .map_err(|e| MultiwalletError::InvalidDerivationRange(e.to_string()))?;

    let mut leaf_keys = Vec::with_capacity(wallet.cosigners.len());
    for cosigner in &wallet.cosigners {
        let branch = ChildNumber::from_normal_idx(cosigner.branch_index)
            .map_err(|e| MultiwalletError::InvalidDerivationRange(e.to_string()))?;
        let leaf = cosigner
            .extended_public_key
            .derive_pub(secp, &[branch, child])
            .map_err(|e| {
                MultiwalletError::InvalidDerivationRange(format!(
                    "deriving index {}: {}",
                    index, e
                ))
            })?;
        leaf_keys.push(leaf.public_key);
    }

    let witness_script = multisig_witness_script(wallet.quorum_m, &leaf_keys);
    let address = p2wsh_address(&witness_script, network)?;
    Ok((index, address))
}

/// Addresses for `index` in `[offset, offset + limit)`.
///
/// `limit` must be `1..=MAX_DERIVATION_LIMIT` and the range must not overflow
/// the index space. The iterator is freshly derivable any number of times and
/// yields identical addresses on every pass.
pub fn derive_addresses<'a>(
    wallet: &'a WalletDescriptor,
    offset: u32,
    limit: u32,
) -> Result<AddressIter<'a>, MultiwalletError> {
    if limit == 0 {
        return Err(MultiwalletError::InvalidDerivationRange(
            "limit must be at least 1".to_string(),
        ));
    }
    if limit > MAX_DERIVATION_LIMIT {
        return Err(MultiwalletError::InvalidDerivationRange(format!(
            "limit {} exceeds maximum {}",
            limit, MAX_DERIVATION_LIMIT
        )));
    }
    let end = offset.checked_add(limit).ok_or_else(|| {
        MultiwalletError::InvalidDerivationRange(format!(
            "offset {} + limit {} overflows the index space",
            offset, limit
        ))
    })?;

    Ok(AddressIter {
        wallet,
        network: wallet.network(),
        next_index: offset,
        end,
        secp: Secp256k1::verification_only(),
    })
}

//! Address encoding and program-derived address (PDA) derivation.
//!
//! Solana addresses are Base58-encoded 32-byte values. Wallet and approval
//! accounts are PDAs of the smart-wallet program: their address is a pure
//! function of fixed seeds, so the seed tuple is the uniqueness key.
//!
//! ```text
//! wallet   = PDA("wallet"   || owner)
//! approval = PDA("approval" || wallet || delegate || asset)
//! ```

use sha2::{Digest, Sha256};

use crate::config::ProgramConfig;
use crate::error::DelegationError;

/// Seed prefix of the per-owner wallet account.
pub const WALLET_SEED: &[u8] = b"wallet";

/// Seed prefix of the per-(wallet, delegate, asset) approval account.
pub const APPROVAL_SEED: &[u8] = b"approval";

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

const MAX_SEED_LEN: usize = 32;
const MAX_SEEDS: usize = 16;

// ---------------------------------------------------------------------------
// Base58
// ---------------------------------------------------------------------------

/// Decode a Solana address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], DelegationError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| DelegationError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        DelegationError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

// ---------------------------------------------------------------------------
// Wallet and approval accounts
// ---------------------------------------------------------------------------

/// Derive the smart-wallet account address owned by `owner`.
pub fn derive_wallet_address(
    config: &ProgramConfig,
    owner: &[u8; 32],
) -> Result<[u8; 32], DelegationError> {
    find_program_address(&[WALLET_SEED, owner.as_ref()], &config.program_id)
        .map(|(address, _bump)| address)
}

/// Derive the approval account for a (wallet, delegate, asset) triple.
///
/// `asset` is the mint address, or [`crate::state::NATIVE_ASSET`] for the
/// native asset.
pub fn derive_approval_address(
    config: &ProgramConfig,
    wallet: &[u8; 32],
    delegate: &[u8; 32],
    asset: &[u8; 32],
) -> Result<[u8; 32], DelegationError> {
    find_program_address(
        &[APPROVAL_SEED, wallet.as_ref(), delegate.as_ref(), asset.as_ref()],
        &config.program_id,
    )
    .map(|(address, _bump)| address)
}

// ---------------------------------------------------------------------------
// PDA search
// ---------------------------------------------------------------------------

/// Find a valid Program Derived Address (PDA) for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first result that is NOT a valid Ed25519 point.
///
/// Exhausting all 256 bumps is a hard error; callers must not retry with
/// different seeds because the seeds are identities, not choices.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), DelegationError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(DelegationError::AddressDerivation(format!(
            "too many seeds: {}",
            seeds.len()
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(DelegationError::AddressDerivation(format!(
            "seed of {} bytes exceeds {MAX_SEED_LEN}",
            seed.len()
        )));
    }

    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(DelegationError::AddressDerivation(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve.
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &[u8; 32],
) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}

/// Check if 32 bytes represent a valid Ed25519 curve point.
pub(crate) fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

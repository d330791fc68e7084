//! Owner-side granting and reading of delegated spend authority.

use tracing::debug;

use crate::address::{bytes_to_address, derive_approval_address, derive_wallet_address};
use crate::amount::ui_amount_to_smallest_units;
use crate::config::ProgramConfig;
use crate::error::DelegationError;
use crate::instruction::{TransferKind, WalletInstruction};
use crate::state::{ApprovalRecord, NATIVE_ASSET};
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

/// An asset identity together with its decimal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub mint: [u8; 32],
    pub decimals: u8,
}

impl Asset {
    /// The network's native asset.
    pub fn native(config: &ProgramConfig) -> Self {
        Self {
            mint: NATIVE_ASSET,
            decimals: config.native_decimals,
        }
    }

    /// A fungible SPL token. The all-zero mint is reserved for the native
    /// asset and is rejected.
    pub fn token(mint: [u8; 32], decimals: u8) -> Result<Self, DelegationError> {
        if mint == NATIVE_ASSET {
            return Err(DelegationError::InvalidAsset(
                "the all-zero mint denotes the native asset".into(),
            ));
        }
        Ok(Self { mint, decimals })
    }

    pub fn kind(&self) -> TransferKind {
        if self.mint == NATIVE_ASSET {
            TransferKind::Native
        } else {
            TransferKind::Fungible
        }
    }
}

/// A decoded approval together with the keys it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovedDapp {
    pub wallet: [u8; 32],
    pub delegate: [u8; 32],
    pub approval_address: [u8; 32],
    pub record: ApprovalRecord,
}

impl ApprovedDapp {
    pub fn is_usable(&self, now: i64) -> bool {
        self.record.is_usable(now)
    }
}

/// Build an `ApproveDelegate` instruction from a human-unit amount.
///
/// `amount` is scaled by `asset.decimals` and truncated toward zero. A
/// past-dated `expiry` is accepted and yields an already-lapsed record,
/// which is how an owner revokes by pre-expiring.
pub fn build_approve_instruction(
    config: &ProgramConfig,
    owner: &[u8; 32],
    delegate: &[u8; 32],
    asset: &Asset,
    amount: f64,
    expiry: i64,
) -> Result<SolInstruction, DelegationError> {
    let max_amount = ui_amount_to_smallest_units(amount, asset.decimals)?;
    build_approve_instruction_in_base_units(config, owner, delegate, &asset.mint, max_amount, expiry)
}

/// Build an `ApproveDelegate` instruction from a smallest-unit ceiling.
///
/// Accounts:
///   0. `[signer, writable]` owner (pays for the approval account)
///   1. `[]` wallet PDA
///   2. `[]` delegate
///   3. `[]` asset mint (all-zero for the native asset)
///   4. `[writable]` approval PDA
///   5. `[]` System Program
pub fn build_approve_instruction_in_base_units(
    config: &ProgramConfig,
    owner: &[u8; 32],
    delegate: &[u8; 32],
    mint: &[u8; 32],
    max_amount: u64,
    expiry: i64,
) -> Result<SolInstruction, DelegationError> {
    let wallet = derive_wallet_address(config, owner)?;

    if *delegate == wallet {
        return Err(DelegationError::InvalidAddress(
            "the wallet account cannot be its own delegate".into(),
        ));
    }
    if *mint != NATIVE_ASSET && [owner, &wallet, delegate].contains(&mint) {
        return Err(DelegationError::InvalidAsset(format!(
            "mint {} coincides with a party to the approval",
            bytes_to_address(mint)
        )));
    }

    let approval = derive_approval_address(config, &wallet, delegate, mint)?;
    let data = WalletInstruction::ApproveDelegate { max_amount, expiry }.pack();

    debug!(
        wallet = %bytes_to_address(&wallet),
        delegate = %bytes_to_address(delegate),
        mint = %bytes_to_address(mint),
        max_amount,
        expiry,
        "built approve instruction"
    );

    Ok(SolInstruction {
        program_id: config.program_id,
        accounts: vec![
            SolAccountMeta::writable(*owner, true),
            SolAccountMeta::readonly(wallet, false),
            SolAccountMeta::readonly(*delegate, false),
            SolAccountMeta::readonly(*mint, false),
            SolAccountMeta::writable(approval, false),
            SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    })
}

/// Decode the approval for (wallet, delegate, mint) from fetched account bytes.
///
/// `None` account data means the approval account does not exist, which is
/// reported as `Ok(None)`. Existing bytes that fail to decode, or that
/// describe a different asset, are a hard error.
pub fn read_approval(
    config: &ProgramConfig,
    wallet: &[u8; 32],
    delegate: &[u8; 32],
    mint: &[u8; 32],
    account_data: Option<&[u8]>,
) -> Result<Option<ApprovedDapp>, DelegationError> {
    let approval_address = derive_approval_address(config, wallet, delegate, mint)?;

    let Some(data) = account_data else {
        debug!(approval = %bytes_to_address(&approval_address), "no approval account");
        return Ok(None);
    };

    let record = ApprovalRecord::unpack(data)?;
    if record.asset != *mint {
        return Err(DelegationError::AssetMismatch(format!(
            "approval {} records mint {}, expected {}",
            bytes_to_address(&approval_address),
            bytes_to_address(&record.asset),
            bytes_to_address(mint)
        )));
    }

    Ok(Some(ApprovedDapp {
        wallet: *wallet,
        delegate: *delegate,
        approval_address,
        record,
    }))
}

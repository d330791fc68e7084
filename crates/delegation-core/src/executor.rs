//! Delegate-side construction of spends that draw against an approval.
//!
//! The builder never reads chain state. Whether the approval is active,
//! unexpired and large enough is decided by the program when the
//! transaction is applied; a client-side check here would go stale between
//! build and submission.

use tracing::debug;

use crate::address::{bytes_to_address, derive_approval_address, derive_wallet_address};
use crate::config::ProgramConfig;
use crate::error::DelegationError;
use crate::instruction::{TransferKind, WalletInstruction};
use crate::state::NATIVE_ASSET;
use crate::token::{derive_associated_token_address, TOKEN_PROGRAM_ID};
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

/// Check that `mint` matches the transfer kind.
pub(crate) fn check_kind(mint: &[u8; 32], kind: TransferKind) -> Result<(), DelegationError> {
    match (kind, *mint == NATIVE_ASSET) {
        (TransferKind::Native, true) | (TransferKind::Fungible, false) => Ok(()),
        (TransferKind::Native, false) => Err(DelegationError::InvalidAsset(format!(
            "native transfer with mint {}",
            bytes_to_address(mint)
        ))),
        (TransferKind::Fungible, true) => Err(DelegationError::InvalidAsset(
            "fungible transfer requires a token mint".into(),
        )),
    }
}

/// Resolve the destination slot and the trailing token accounts of a
/// transfer out of `wallet`.
///
/// Native: destination is `recipient` itself, no tail.
/// Fungible: destination is the recipient's associated token account, tail is
/// `[mint, wallet token account (writable), token program]`.
pub(crate) fn transfer_accounts(
    wallet: &[u8; 32],
    recipient: &[u8; 32],
    mint: &[u8; 32],
    kind: TransferKind,
) -> Result<(SolAccountMeta, Vec<SolAccountMeta>), DelegationError> {
    match kind {
        TransferKind::Native => Ok((SolAccountMeta::writable(*recipient, false), Vec::new())),
        TransferKind::Fungible => {
            if recipient == wallet {
                return Err(DelegationError::InvalidRecipient(
                    "token transfer source and destination are the same account".into(),
                ));
            }
            let destination = derive_associated_token_address(recipient, mint)?;
            let source = derive_associated_token_address(wallet, mint)?;
            Ok((
                SolAccountMeta::writable(destination, false),
                vec![
                    SolAccountMeta::readonly(*mint, false),
                    SolAccountMeta::writable(source, false),
                    SolAccountMeta::readonly(TOKEN_PROGRAM_ID, false),
                ],
            ))
        }
    }
}

/// Build an `ExecuteDelegatedTransfer` instruction for `delegate`.
///
/// `amount` is in the asset's smallest unit. For fungible transfers the
/// recipient is an owner identity; its associated token account is derived.
///
/// Accounts:
///   0. `[signer]` delegate
///   1. `[]` wallet owner
///   2. `[writable]` wallet PDA
///   3. `[writable]` approval PDA
///   4. `[writable]` recipient (native) or recipient token account (fungible)
///   5. `[]` System Program
///   fungible only:
///   6. `[]` mint
///   7. `[writable]` wallet token account
///   8. `[]` Token Program
pub fn build_execute_instruction(
    config: &ProgramConfig,
    owner: &[u8; 32],
    delegate: &[u8; 32],
    recipient: &[u8; 32],
    mint: &[u8; 32],
    amount: u64,
    kind: TransferKind,
) -> Result<SolInstruction, DelegationError> {
    if amount == 0 {
        return Err(DelegationError::InvalidAmount(
            "delegated transfer amount must be > 0".into(),
        ));
    }
    check_kind(mint, kind)?;
    if kind == TransferKind::Fungible && recipient == delegate {
        return Err(DelegationError::InvalidRecipient(
            "fungible transfer to the delegate itself".into(),
        ));
    }

    let wallet = derive_wallet_address(config, owner)?;
    let approval = derive_approval_address(config, &wallet, delegate, mint)?;
    let (destination, tail) = transfer_accounts(&wallet, recipient, mint, kind)?;

    let mut accounts = vec![
        SolAccountMeta::readonly(*delegate, true),
        SolAccountMeta::readonly(*owner, false),
        SolAccountMeta::writable(wallet, false),
        SolAccountMeta::writable(approval, false),
        destination,
        SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
    ];
    accounts.extend(tail);

    debug!(
        wallet = %bytes_to_address(&wallet),
        delegate = %bytes_to_address(delegate),
        recipient = %bytes_to_address(recipient),
        amount,
        ?kind,
        "built delegated transfer instruction"
    );

    Ok(SolInstruction {
        program_id: config.program_id,
        accounts,
        data: WalletInstruction::ExecuteDelegatedTransfer { amount, kind }.pack(),
    })
}

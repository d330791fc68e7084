//! Owner-side wallet instructions: creation, deposits and withdrawals.

use tracing::debug;

use crate::address::{bytes_to_address, derive_wallet_address};
use crate::config::ProgramConfig;
use crate::error::DelegationError;
use crate::executor::{check_kind, transfer_accounts};
use crate::instruction::{TransferKind, WalletInstruction};
use crate::state::NATIVE_ASSET;
use crate::token::{build_token_transfer, derive_associated_token_address};
use crate::transaction::{build_system_transfer, SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

/// Build a `CreateWallet` instruction.
///
/// Accounts:
///   0. `[signer, writable]` owner (funds the wallet account)
///   1. `[writable]` wallet PDA
///   2. `[]` System Program
///
/// The program refuses to re-create an existing wallet; clients that can
/// see the wallet account should surface that before building (see
/// [`DelegationError::AlreadyInitialized`]).
pub fn build_create_wallet_instruction(
    config: &ProgramConfig,
    owner: &[u8; 32],
) -> Result<SolInstruction, DelegationError> {
    let wallet = derive_wallet_address(config, owner)?;

    debug!(owner = %bytes_to_address(owner), wallet = %bytes_to_address(&wallet), "built create wallet instruction");

    Ok(SolInstruction {
        program_id: config.program_id,
        accounts: vec![
            SolAccountMeta::writable(*owner, true),
            SolAccountMeta::writable(wallet, false),
            SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: WalletInstruction::CreateWallet.pack(),
    })
}

/// Build a `Withdraw` instruction moving funds from the wallet to `recipient`.
///
/// Accounts:
///   0. `[signer, writable]` owner
///   1. `[writable]` wallet PDA
///   2. `[writable]` recipient (native) or recipient token account (fungible)
///   3. `[]` System Program
///   fungible only:
///   4. `[]` mint
///   5. `[writable]` wallet token account
///   6. `[]` Token Program
pub fn build_withdraw_instruction(
    config: &ProgramConfig,
    owner: &[u8; 32],
    recipient: &[u8; 32],
    mint: &[u8; 32],
    amount: u64,
    kind: TransferKind,
) -> Result<SolInstruction, DelegationError> {
    if amount == 0 {
        return Err(DelegationError::InvalidAmount(
            "withdraw amount must be > 0".into(),
        ));
    }
    check_kind(mint, kind)?;

    let wallet = derive_wallet_address(config, owner)?;
    let (destination, tail) = transfer_accounts(&wallet, recipient, mint, kind)?;

    let mut accounts = vec![
        SolAccountMeta::writable(*owner, true),
        SolAccountMeta::writable(wallet, false),
        destination,
        SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
    ];
    accounts.extend(tail);

    debug!(wallet = %bytes_to_address(&wallet), amount, ?kind, "built withdraw instruction");

    Ok(SolInstruction {
        program_id: config.program_id,
        accounts,
        data: WalletInstruction::Withdraw { amount, kind }.pack(),
    })
}

/// Build a deposit from the owner into their wallet.
///
/// Native deposits are a System Program transfer to the wallet PDA. Token
/// deposits are an SPL `Transfer` from the owner's associated token account
/// to the wallet's.
pub fn build_deposit_instruction(
    config: &ProgramConfig,
    owner: &[u8; 32],
    mint: &[u8; 32],
    amount: u64,
) -> Result<SolInstruction, DelegationError> {
    let wallet = derive_wallet_address(config, owner)?;

    if *mint == NATIVE_ASSET {
        return build_system_transfer(owner, &wallet, amount);
    }

    let from = derive_associated_token_address(owner, mint)?;
    let to = derive_associated_token_address(&wallet, mint)?;
    build_token_transfer(&from, &to, owner, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TOKEN_PROGRAM_ID;

    const OWNER: [u8; 32] = [0x11; 32];
    const RECIPIENT: [u8; 32] = [0x33; 32];
    const MINT: [u8; 32] = [0x44; 32];

    fn config() -> ProgramConfig {
        ProgramConfig::new([0x77; 32])
    }

    #[test]
    fn create_wallet_layout() {
        let cfg = config();
        let ix = build_create_wallet_instruction(&cfg, &OWNER).unwrap();
        let wallet = derive_wallet_address(&cfg, &OWNER).unwrap();

        assert_eq!(ix.data, vec![0]);
        assert_eq!(ix.accounts[0], SolAccountMeta::writable(OWNER, true));
        assert_eq!(ix.accounts[1], SolAccountMeta::writable(wallet, false));
        assert_eq!(ix.accounts[2], SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false));
    }

    #[test]
    fn native_withdraw_layout() {
        let cfg = config();
        let ix =
            build_withdraw_instruction(&cfg, &OWNER, &OWNER, &NATIVE_ASSET, 9, TransferKind::Native)
                .unwrap();
        let wallet = derive_wallet_address(&cfg, &OWNER).unwrap();

        let keys: Vec<[u8; 32]> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(keys, vec![OWNER, wallet, OWNER, SYSTEM_PROGRAM_ID]);
        assert_eq!(
            WalletInstruction::unpack(&ix.data).unwrap(),
            WalletInstruction::Withdraw {
                amount: 9,
                kind: TransferKind::Native,
            }
        );
    }

    #[test]
    fn fungible_withdraw_layout() {
        let cfg = config();
        let ix =
            build_withdraw_instruction(&cfg, &OWNER, &RECIPIENT, &MINT, 9, TransferKind::Fungible)
                .unwrap();
        let wallet = derive_wallet_address(&cfg, &OWNER).unwrap();

        assert_eq!(ix.accounts.len(), 7);
        assert_eq!(
            ix.accounts[2].pubkey,
            derive_associated_token_address(&RECIPIENT, &MINT).unwrap()
        );
        assert_eq!(ix.accounts[4].pubkey, MINT);
        assert_eq!(
            ix.accounts[5].pubkey,
            derive_associated_token_address(&wallet, &MINT).unwrap()
        );
        assert_eq!(ix.accounts[6].pubkey, TOKEN_PROGRAM_ID);
    }

    #[test]
    fn withdraw_rejects_zero() {
        let result =
            build_withdraw_instruction(&config(), &OWNER, &OWNER, &NATIVE_ASSET, 0, TransferKind::Native);
        assert!(matches!(result, Err(DelegationError::InvalidAmount(_))));
    }

    #[test]
    fn native_deposit_targets_wallet() {
        let cfg = config();
        let ix = build_deposit_instruction(&cfg, &OWNER, &NATIVE_ASSET, 1_000).unwrap();
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ix.accounts[0].pubkey, OWNER);
        assert_eq!(ix.accounts[1].pubkey, derive_wallet_address(&cfg, &OWNER).unwrap());
    }

    #[test]
    fn token_deposit_moves_between_atas() {
        let cfg = config();
        let ix = build_deposit_instruction(&cfg, &OWNER, &MINT, 1_000).unwrap();
        let wallet = derive_wallet_address(&cfg, &OWNER).unwrap();

        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(
            ix.accounts[0].pubkey,
            derive_associated_token_address(&OWNER, &MINT).unwrap()
        );
        assert_eq!(
            ix.accounts[1].pubkey,
            derive_associated_token_address(&wallet, &MINT).unwrap()
        );
        assert_eq!(ix.accounts[2], SolAccountMeta::readonly(OWNER, true));
    }
}

//! Application-facing client for the delegated-spending smart wallet.
//!
//! Takes Base58 strings at the edge, resolves token decimals from
//! [`SdkConfig`], reads accounts through an [`AccountSource`] and returns
//! instructions or unsigned transactions for an external signer.

pub mod config;
pub mod error;
pub mod source;
pub mod types;

use delegation_core::{
    address_to_bytes, approval, build_create_wallet_instruction, build_deposit_instruction,
    build_execute_instruction, build_withdraw_instruction, bytes_to_address, compile_transaction,
    derive_approval_address, derive_wallet_address, serialize_message,
    serialize_unsigned_transaction, DelegationError, ProgramConfig, SolInstruction, NATIVE_ASSET,
};
use tracing::debug;

pub use config::SdkConfig;
pub use error::SdkError;
pub use source::{AccountSource, ApprovalIndex, InMemoryAccounts, InMemoryApprovalIndex};
pub use types::{ApprovalView, UnsignedTransaction};

/// Parse an optional Base58 mint; `None` is the native asset.
fn parse_mint(mint: Option<&str>) -> Result<[u8; 32], SdkError> {
    match mint {
        Some(mint) => Ok(address_to_bytes(mint)?),
        None => Ok(NATIVE_ASSET),
    }
}

pub struct WalletClient<S> {
    config: SdkConfig,
    program: ProgramConfig,
    source: S,
}

impl<S: AccountSource> WalletClient<S> {
    pub fn new(config: SdkConfig, source: S) -> Result<Self, SdkError> {
        let program = config.program_config()?;
        Ok(Self {
            config,
            program,
            source,
        })
    }

    pub fn program_config(&self) -> &ProgramConfig {
        &self.program
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Base58 address of `owner`'s wallet account.
    pub fn wallet_address(&self, owner: &str) -> Result<String, SdkError> {
        let owner = address_to_bytes(owner)?;
        Ok(bytes_to_address(&derive_wallet_address(&self.program, &owner)?))
    }

    /// Instruction creating `owner`'s wallet. Fails with
    /// `AlreadyInitialized` if the source already holds the wallet account.
    pub fn prepare_create_wallet(&self, owner: &str) -> Result<SolInstruction, SdkError> {
        let owner = address_to_bytes(owner)?;
        let wallet = derive_wallet_address(&self.program, &owner)?;
        if self.source.get_account_data(&wallet)?.is_some() {
            return Err(DelegationError::AlreadyInitialized(bytes_to_address(&wallet)).into());
        }
        Ok(build_create_wallet_instruction(&self.program, &owner)?)
    }

    /// Instruction granting `dapp` a ceiling of `amount` (human units) of
    /// `mint` until `expiry`.
    pub fn prepare_approve(
        &self,
        owner: &str,
        dapp: &str,
        mint: Option<&str>,
        amount: f64,
        expiry: i64,
    ) -> Result<SolInstruction, SdkError> {
        let owner = address_to_bytes(owner)?;
        let dapp = address_to_bytes(dapp)?;
        let asset = self.config.asset(&parse_mint(mint)?)?;
        Ok(approval::build_approve_instruction(
            &self.program,
            &owner,
            &dapp,
            &asset,
            amount,
            expiry,
        )?)
    }

    /// Instruction for `delegate` to spend `amount` smallest units from
    /// `owner`'s wallet to `recipient`.
    pub fn prepare_execute(
        &self,
        owner: &str,
        delegate: &str,
        recipient: &str,
        mint: Option<&str>,
        amount: u64,
    ) -> Result<SolInstruction, SdkError> {
        let owner = address_to_bytes(owner)?;
        let delegate = address_to_bytes(delegate)?;
        let recipient = address_to_bytes(recipient)?;
        let asset = self.config.asset(&parse_mint(mint)?)?;
        Ok(build_execute_instruction(
            &self.program,
            &owner,
            &delegate,
            &recipient,
            &asset.mint,
            amount,
            asset.kind(),
        )?)
    }

    pub fn prepare_withdraw(
        &self,
        owner: &str,
        recipient: &str,
        mint: Option<&str>,
        amount: u64,
    ) -> Result<SolInstruction, SdkError> {
        let owner = address_to_bytes(owner)?;
        let recipient = address_to_bytes(recipient)?;
        let asset = self.config.asset(&parse_mint(mint)?)?;
        Ok(build_withdraw_instruction(
            &self.program,
            &owner,
            &recipient,
            &asset.mint,
            amount,
            asset.kind(),
        )?)
    }

    pub fn prepare_deposit(
        &self,
        owner: &str,
        mint: Option<&str>,
        amount: u64,
    ) -> Result<SolInstruction, SdkError> {
        let owner = address_to_bytes(owner)?;
        Ok(build_deposit_instruction(
            &self.program,
            &owner,
            &parse_mint(mint)?,
            amount,
        )?)
    }

    /// Current approval of `dapp` on `owner`'s wallet, if one exists.
    pub fn get_approval(
        &self,
        owner: &str,
        dapp: &str,
        mint: Option<&str>,
        now: i64,
    ) -> Result<Option<ApprovalView>, SdkError> {
        let owner = address_to_bytes(owner)?;
        let wallet = derive_wallet_address(&self.program, &owner)?;
        let dapp = address_to_bytes(dapp)?;
        let mint = parse_mint(mint)?;
        self.read_view(&wallet, &dapp, &mint, now)
    }

    /// Every approval `index` knows of on `owner`'s wallet.
    ///
    /// Grants whose account no longer exists are skipped. An account that
    /// exists but does not decode fails the whole listing.
    pub fn list_approvals(
        &self,
        index: &impl ApprovalIndex,
        owner: &str,
        now: i64,
    ) -> Result<Vec<ApprovalView>, SdkError> {
        let owner = address_to_bytes(owner)?;
        let wallet = derive_wallet_address(&self.program, &owner)?;

        let mut views = Vec::new();
        for (delegate, mint) in index.approvals_for(&wallet)? {
            if let Some(view) = self.read_view(&wallet, &delegate, &mint, now)? {
                views.push(view);
            }
        }

        debug!(wallet = %bytes_to_address(&wallet), count = views.len(), "listed approvals");
        Ok(views)
    }

    fn read_view(
        &self,
        wallet: &[u8; 32],
        delegate: &[u8; 32],
        mint: &[u8; 32],
        now: i64,
    ) -> Result<Option<ApprovalView>, SdkError> {
        let address = derive_approval_address(&self.program, wallet, delegate, mint)?;
        let data = self.source.get_account_data(&address)?;
        let approved =
            approval::read_approval(&self.program, wallet, delegate, mint, data.as_deref())?;
        Ok(approved.map(|a| ApprovalView::new(&a, now)))
    }

    /// Compile `instructions` into an unsigned transaction paid for by
    /// `fee_payer`. `recent_blockhash` is Base58.
    pub fn compile(
        &self,
        instructions: &[SolInstruction],
        fee_payer: &str,
        recent_blockhash: &str,
    ) -> Result<UnsignedTransaction, SdkError> {
        let fee_payer = address_to_bytes(fee_payer)?;
        let blockhash = address_to_bytes(recent_blockhash)?;
        let tx = compile_transaction(instructions, &fee_payer, &blockhash)?;
        let message = serialize_message(&tx)?;
        let wire = serialize_unsigned_transaction(&tx)?;
        Ok(UnsignedTransaction::new(&tx, &message, &wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegation_core::{Ledger, WalletInstruction};

    const PROGRAM: &str = "5UwRT1ngPvSWjUWYcCoRmwVTs5WFUgdDfAW29Ab5XMx2";
    const NOW: i64 = 1_700_000_000;

    fn key(byte: u8) -> String {
        bytes_to_address(&[byte; 32])
    }

    fn client(source: InMemoryAccounts) -> WalletClient<InMemoryAccounts> {
        WalletClient::new(SdkConfig::new(PROGRAM).with_mint(key(0x44), 6), source).unwrap()
    }

    #[test]
    fn create_wallet_refuses_existing_account() {
        let owner = key(0x11);
        let empty = client(InMemoryAccounts::new());
        assert!(empty.prepare_create_wallet(&owner).is_ok());

        let wallet = address_to_bytes(&empty.wallet_address(&owner).unwrap()).unwrap();
        let mut accounts = InMemoryAccounts::new();
        accounts.insert(wallet, Vec::new());
        let taken = client(accounts);
        assert!(matches!(
            taken.prepare_create_wallet(&owner),
            Err(SdkError::Program(DelegationError::AlreadyInitialized(_)))
        ));
    }

    #[test]
    fn approve_scales_by_configured_decimals() {
        let c = client(InMemoryAccounts::new());
        let ix = c
            .prepare_approve(&key(0x11), &key(0x22), Some(&key(0x44)), 2.5, NOW)
            .unwrap();
        assert_eq!(
            WalletInstruction::unpack(&ix.data).unwrap(),
            WalletInstruction::ApproveDelegate {
                max_amount: 2_500_000,
                expiry: NOW,
            }
        );
    }

    #[test]
    fn unconfigured_mint_is_rejected() {
        let c = client(InMemoryAccounts::new());
        let result = c.prepare_approve(&key(0x11), &key(0x22), Some(&key(0x55)), 1.0, NOW);
        assert!(matches!(result, Err(SdkError::Config(_))));
    }

    #[test]
    fn get_approval_absent_is_none() {
        let c = client(InMemoryAccounts::new());
        assert_eq!(c.get_approval(&key(0x11), &key(0x22), None, NOW).unwrap(), None);
    }

    #[test]
    fn listing_skips_absent_and_fails_on_corrupt() {
        let owner = key(0x11);
        let program = SdkConfig::new(PROGRAM).program_config().unwrap();
        let wallet = derive_wallet_address(&program, &[0x11; 32]).unwrap();

        let mut index = InMemoryApprovalIndex::new();
        index.record(wallet, [0x22; 32], NATIVE_ASSET);

        let c = client(InMemoryAccounts::new());
        assert!(c.list_approvals(&index, &owner, NOW).unwrap().is_empty());

        let approval = derive_approval_address(&program, &wallet, &[0x22; 32], &NATIVE_ASSET).unwrap();
        let mut accounts = InMemoryAccounts::new();
        accounts.insert(approval, vec![1, 2, 3]);
        let c = client(accounts);
        assert!(matches!(
            c.list_approvals(&index, &owner, NOW),
            Err(SdkError::Program(DelegationError::MalformedPayload(_)))
        ));
    }

    struct Unreachable;

    impl AccountSource for Unreachable {
        fn get_account_data(&self, _: &[u8; 32]) -> Result<Option<Vec<u8>>, SdkError> {
            Err(SdkError::Fetch("connection refused".into()))
        }
    }

    #[test]
    fn fetch_failures_propagate() {
        let c = WalletClient::new(SdkConfig::new(PROGRAM), Unreachable).unwrap();
        let program = c.program_config();
        let wallet = derive_wallet_address(program, &[0x11; 32]).unwrap();
        let mut index = InMemoryApprovalIndex::new();
        index.record(wallet, [0x22; 32], NATIVE_ASSET);

        assert!(matches!(
            c.get_approval(&key(0x11), &key(0x22), None, NOW),
            Err(SdkError::Fetch(_))
        ));
        assert!(matches!(
            c.list_approvals(&index, &key(0x11), NOW),
            Err(SdkError::Fetch(_))
        ));
        assert!(matches!(
            c.prepare_create_wallet(&key(0x11)),
            Err(SdkError::Fetch(_))
        ));
    }

    #[test]
    fn ledger_is_an_account_source() {
        let program = SdkConfig::new(PROGRAM).program_config().unwrap();
        let mut ledger = Ledger::new(program);
        ledger.airdrop(&[0x11; 32], 1_000);
        assert_eq!(ledger.get_account_data(&[0x11; 32]).unwrap(), Some(Vec::new()));
        assert_eq!(ledger.get_account_data(&[0x12; 32]).unwrap(), None);
    }

    #[test]
    fn compile_lists_signers_first() {
        let c = client(InMemoryAccounts::new());
        let ix = c
            .prepare_execute(&key(0x11), &key(0x22), &key(0x33), None, 10)
            .unwrap();
        let tx = c.compile(&[ix], &key(0x22), &key(0x99)).unwrap();

        assert_eq!(tx.signers, vec![key(0x22)]);
        // compact-u16(1) + one zeroed 64-byte slot, then the message.
        assert!(tx.transaction.starts_with(&format!("01{}", "00".repeat(64))));
        assert!(tx.transaction.ends_with(&tx.message));
    }
}

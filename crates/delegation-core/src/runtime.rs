//! In-memory model of the smart-wallet program and the two native programs
//! it talks to.
//!
//! The client-side builders only lay out bytes; authority is enforced here,
//! at apply time, the same way the deployed program enforces it:
//!
//! - the delegate signed,
//! - wallet and approval accounts are the PDAs their seeds say they are,
//! - the approval is active, unexpired, for this asset, and large enough.
//!
//! Each call to [`Ledger::process_transaction`] is all-or-nothing. The model
//! is single-threaded; on a real cluster two delegates spending against the
//! same approval are serialized by account write locks, which this crate
//! cannot observe.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::address::{bytes_to_address, derive_approval_address, derive_wallet_address};
use crate::config::ProgramConfig;
use crate::error::DelegationError;
use crate::instruction::{Reader, TransferKind, WalletInstruction};
use crate::state::{ApprovalRecord, APPROVAL_RECORD_LEN, NATIVE_ASSET};
use crate::token::{derive_associated_token_address, TOKEN_PROGRAM_ID};
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

/// Lamports per byte-year times the two-year exemption threshold.
const RENT_LAMPORTS_PER_BYTE: u64 = 3_480 * 2;
/// Per-account storage overhead charged by rent.
const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;

/// Minimum balance for a rent-exempt account holding `data_len` bytes.
pub fn rent_exempt_minimum(data_len: usize) -> u64 {
    (ACCOUNT_STORAGE_OVERHEAD + data_len as u64) * RENT_LAMPORTS_PER_BYTE
}

/// A system or program-owned account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub lamports: u64,
    /// Program that owns the account.
    pub owner: [u8; 32],
    pub data: Vec<u8>,
}

/// An SPL token account, tracked separately from lamport balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: [u8; 32],
    pub owner: [u8; 32],
    pub amount: u64,
}

/// Account store plus the program logic that mutates it.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: ProgramConfig,
    accounts: HashMap<[u8; 32], Account>,
    token_accounts: HashMap<[u8; 32], TokenAccount>,
}

/// Positional view over an instruction's account list.
struct Accounts<'a>(&'a [SolAccountMeta]);

impl Accounts<'_> {
    fn meta(&self, index: usize, name: &str) -> Result<&SolAccountMeta, DelegationError> {
        self.0.get(index).ok_or_else(|| {
            DelegationError::AccountMismatch(format!("missing account #{index} ({name})"))
        })
    }

    fn key(&self, index: usize, name: &str) -> Result<[u8; 32], DelegationError> {
        Ok(self.meta(index, name)?.pubkey)
    }

    fn signer(&self, index: usize, name: &str) -> Result<[u8; 32], DelegationError> {
        let meta = self.meta(index, name)?;
        if !meta.is_signer {
            return Err(DelegationError::MissingSignature(format!(
                "{name} {}",
                bytes_to_address(&meta.pubkey)
            )));
        }
        Ok(meta.pubkey)
    }

    fn require(&self, index: usize, name: &str, expected: &[u8; 32]) -> Result<(), DelegationError> {
        let actual = self.key(index, name)?;
        if actual != *expected {
            return Err(DelegationError::AccountMismatch(format!(
                "{name}: expected {}, got {}",
                bytes_to_address(expected),
                bytes_to_address(&actual)
            )));
        }
        Ok(())
    }
}

impl Ledger {
    pub fn new(config: ProgramConfig) -> Self {
        Self {
            config,
            accounts: HashMap::new(),
            token_accounts: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    // -- Setup and inspection -----------------------------------------------

    /// Credit lamports to a system account, creating it if needed.
    pub fn airdrop(&mut self, address: &[u8; 32], lamports: u64) {
        let account = self.accounts.entry(*address).or_insert_with(|| Account {
            lamports: 0,
            owner: SYSTEM_PROGRAM_ID,
            data: Vec::new(),
        });
        account.lamports = account.lamports.saturating_add(lamports);
    }

    /// Credit tokens to `owner`'s associated token account for `mint`,
    /// creating the token account if needed. Returns its address.
    pub fn mint_to(
        &mut self,
        owner: &[u8; 32],
        mint: &[u8; 32],
        amount: u64,
    ) -> Result<[u8; 32], DelegationError> {
        let address = derive_associated_token_address(owner, mint)?;
        let account = self.token_accounts.entry(address).or_insert(TokenAccount {
            mint: *mint,
            owner: *owner,
            amount: 0,
        });
        account.amount = account.amount.saturating_add(amount);
        Ok(address)
    }

    pub fn account(&self, address: &[u8; 32]) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Raw account data, or `None` if the account does not exist.
    pub fn account_data(&self, address: &[u8; 32]) -> Option<&[u8]> {
        self.accounts.get(address).map(|a| a.data.as_slice())
    }

    pub fn lamports(&self, address: &[u8; 32]) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.lamports)
    }

    /// Token balance of `owner`'s associated token account for `mint`.
    pub fn token_balance(&self, owner: &[u8; 32], mint: &[u8; 32]) -> Result<u64, DelegationError> {
        let address = derive_associated_token_address(owner, mint)?;
        Ok(self.token_accounts.get(&address).map_or(0, |t| t.amount))
    }

    /// Decoded approval for the triple, if its account exists.
    pub fn approval(
        &self,
        wallet: &[u8; 32],
        delegate: &[u8; 32],
        mint: &[u8; 32],
    ) -> Result<Option<ApprovalRecord>, DelegationError> {
        let address = derive_approval_address(&self.config, wallet, delegate, mint)?;
        self.account_data(&address)
            .map(ApprovalRecord::unpack)
            .transpose()
    }

    // -- Processing ---------------------------------------------------------

    /// Apply a single instruction. See [`Ledger::process_transaction`].
    pub fn process(
        &mut self,
        instruction: &SolInstruction,
        signers: &[[u8; 32]],
        now: i64,
    ) -> Result<(), DelegationError> {
        self.process_transaction(std::slice::from_ref(instruction), signers, now)
    }

    /// Apply instructions in order as one atomic transaction.
    ///
    /// `signers` are the keys whose signatures the transaction carries and
    /// `now` is the cluster clock in unix seconds. On error no account is
    /// modified.
    pub fn process_transaction(
        &mut self,
        instructions: &[SolInstruction],
        signers: &[[u8; 32]],
        now: i64,
    ) -> Result<(), DelegationError> {
        let mut staged = self.clone();

        for ix in instructions {
            if let Some(meta) = ix
                .accounts
                .iter()
                .find(|m| m.is_signer && !signers.contains(&m.pubkey))
            {
                return Err(DelegationError::MissingSignature(bytes_to_address(&meta.pubkey)));
            }

            if let Err(err) = staged.dispatch(ix, now) {
                warn!(program = %bytes_to_address(&ix.program_id), error = %err, "instruction rejected");
                return Err(err);
            }
        }

        *self = staged;
        Ok(())
    }

    fn dispatch(&mut self, ix: &SolInstruction, now: i64) -> Result<(), DelegationError> {
        let accounts = Accounts(&ix.accounts);

        if ix.program_id == self.config.program_id {
            let instruction = WalletInstruction::unpack(&ix.data)?;
            debug!(?instruction, "processing wallet instruction");
            match instruction {
                WalletInstruction::CreateWallet => self.create_wallet(&accounts),
                WalletInstruction::ApproveDelegate { max_amount, expiry } => {
                    self.approve_delegate(&accounts, max_amount, expiry)
                }
                WalletInstruction::ExecuteDelegatedTransfer { amount, kind } => {
                    self.execute_delegated_transfer(&accounts, amount, kind, now)
                }
                WalletInstruction::Withdraw { amount, kind } => {
                    self.withdraw(&accounts, amount, kind)
                }
            }
        } else if ix.program_id == SYSTEM_PROGRAM_ID {
            self.system_transfer(&accounts, &ix.data)
        } else if ix.program_id == TOKEN_PROGRAM_ID {
            self.token_transfer(&accounts, &ix.data)
        } else {
            Err(DelegationError::TransactionBuild(format!(
                "unknown program {}",
                bytes_to_address(&ix.program_id)
            )))
        }
    }

    // -- Smart-wallet program -----------------------------------------------

    fn create_wallet(&mut self, accounts: &Accounts) -> Result<(), DelegationError> {
        let owner = accounts.signer(0, "owner")?;
        let wallet = derive_wallet_address(&self.config, &owner)?;
        accounts.require(1, "wallet", &wallet)?;
        accounts.require(2, "system program", &SYSTEM_PROGRAM_ID)?;

        if self.accounts.contains_key(&wallet) {
            return Err(DelegationError::AlreadyInitialized(format!(
                "wallet {}",
                bytes_to_address(&wallet)
            )));
        }

        let rent = rent_exempt_minimum(0);
        self.debit(&owner, rent)?;
        self.accounts.insert(
            wallet,
            Account {
                lamports: rent,
                owner: self.config.program_id,
                data: Vec::new(),
            },
        );

        debug!(wallet = %bytes_to_address(&wallet), "wallet created");
        Ok(())
    }

    fn approve_delegate(
        &mut self,
        accounts: &Accounts,
        max_amount: u64,
        expiry: i64,
    ) -> Result<(), DelegationError> {
        let owner = accounts.signer(0, "owner")?;
        let wallet = derive_wallet_address(&self.config, &owner)?;
        accounts.require(1, "wallet", &wallet)?;
        let delegate = accounts.key(2, "delegate")?;
        let mint = accounts.key(3, "mint")?;
        let approval = derive_approval_address(&self.config, &wallet, &delegate, &mint)?;
        accounts.require(4, "approval", &approval)?;
        accounts.require(5, "system program", &SYSTEM_PROGRAM_ID)?;

        self.program_account(&wallet, "wallet")?;

        if !self.accounts.contains_key(&approval) {
            let rent = rent_exempt_minimum(APPROVAL_RECORD_LEN);
            self.debit(&owner, rent)?;
            self.accounts.insert(
                approval,
                Account {
                    lamports: rent,
                    owner: self.config.program_id,
                    data: vec![0u8; APPROVAL_RECORD_LEN],
                },
            );
        }

        let record = ApprovalRecord::new(max_amount, expiry, mint);
        self.write_approval(&approval, &record)?;

        debug!(
            approval = %bytes_to_address(&approval),
            max_amount,
            expiry,
            "delegate approved"
        );
        Ok(())
    }

    fn execute_delegated_transfer(
        &mut self,
        accounts: &Accounts,
        amount: u64,
        kind: TransferKind,
        now: i64,
    ) -> Result<(), DelegationError> {
        let delegate = accounts.signer(0, "delegate")?;
        let owner = accounts.key(1, "owner")?;
        let wallet = derive_wallet_address(&self.config, &owner)?;
        accounts.require(2, "wallet", &wallet)?;
        let destination = accounts.key(4, "recipient")?;
        accounts.require(5, "system program", &SYSTEM_PROGRAM_ID)?;

        let mint = match kind {
            TransferKind::Native => NATIVE_ASSET,
            TransferKind::Fungible => accounts.key(6, "mint")?,
        };
        let approval = derive_approval_address(&self.config, &wallet, &delegate, &mint)?;
        accounts.require(3, "approval", &approval)?;

        self.program_account(&wallet, "wallet")?;
        let data = &self.program_account(&approval, "approval")?.data;
        let mut record = ApprovalRecord::unpack(data)?;

        if !record.is_approved {
            return Err(DelegationError::NotApproved);
        }
        if now >= record.expiry {
            return Err(DelegationError::ApprovalExpired {
                expiry: record.expiry,
                now,
            });
        }
        if amount > record.max_amount {
            return Err(DelegationError::ExceedsApproval {
                requested: amount,
                approved: record.max_amount,
            });
        }
        if record.asset != mint {
            return Err(DelegationError::AssetMismatch(format!(
                "approval is for {}, transfer is for {}",
                bytes_to_address(&record.asset),
                bytes_to_address(&mint)
            )));
        }

        match kind {
            TransferKind::Native => self.move_wallet_lamports(&wallet, &destination, amount)?,
            TransferKind::Fungible => {
                let source = derive_associated_token_address(&wallet, &mint)?;
                accounts.require(7, "wallet token account", &source)?;
                accounts.require(8, "token program", &TOKEN_PROGRAM_ID)?;
                self.move_tokens(&source, &destination, &wallet, amount)?;
            }
        }

        record.max_amount -= amount;
        self.write_approval(&approval, &record)?;

        debug!(
            wallet = %bytes_to_address(&wallet),
            delegate = %bytes_to_address(&delegate),
            amount,
            remaining = record.max_amount,
            "delegated transfer applied"
        );
        Ok(())
    }

    fn withdraw(
        &mut self,
        accounts: &Accounts,
        amount: u64,
        kind: TransferKind,
    ) -> Result<(), DelegationError> {
        let owner = accounts.signer(0, "owner")?;
        let wallet = derive_wallet_address(&self.config, &owner)?;
        accounts.require(1, "wallet", &wallet)?;
        let destination = accounts.key(2, "recipient")?;
        accounts.require(3, "system program", &SYSTEM_PROGRAM_ID)?;

        self.program_account(&wallet, "wallet")?;

        match kind {
            TransferKind::Native => self.move_wallet_lamports(&wallet, &destination, amount),
            TransferKind::Fungible => {
                let mint = accounts.key(4, "mint")?;
                let source = derive_associated_token_address(&wallet, &mint)?;
                accounts.require(5, "wallet token account", &source)?;
                accounts.require(6, "token program", &TOKEN_PROGRAM_ID)?;
                self.move_tokens(&source, &destination, &wallet, amount)
            }
        }
    }

    // -- Native programs ----------------------------------------------------

    fn system_transfer(&mut self, accounts: &Accounts, data: &[u8]) -> Result<(), DelegationError> {
        let mut reader = Reader::new(data);
        let index = u32::from_le_bytes([reader.u8()?, reader.u8()?, reader.u8()?, reader.u8()?]);
        if index != 2 {
            return Err(DelegationError::MalformedPayload(format!(
                "unsupported system instruction {index}"
            )));
        }
        let lamports = reader.u64()?;
        reader.finish()?;

        let from = accounts.signer(0, "source")?;
        let to = accounts.key(1, "destination")?;

        match self.accounts.get(&from) {
            Some(account) if account.owner == SYSTEM_PROGRAM_ID => {}
            Some(_) => {
                return Err(DelegationError::AccountMismatch(
                    "system transfer source must be system-owned".into(),
                ))
            }
            None => return Err(DelegationError::AccountAbsent(bytes_to_address(&from))),
        }

        self.debit(&from, lamports)?;
        self.credit(&to, lamports)?;
        Ok(())
    }

    fn token_transfer(&mut self, accounts: &Accounts, data: &[u8]) -> Result<(), DelegationError> {
        let mut reader = Reader::new(data);
        let index = reader.u8()?;
        if index != 3 {
            return Err(DelegationError::UnknownInstructionKind(index));
        }
        let amount = reader.u64()?;
        reader.finish()?;

        let source = accounts.key(0, "source")?;
        let destination = accounts.key(1, "destination")?;
        let authority = accounts.signer(2, "authority")?;
        self.move_tokens(&source, &destination, &authority, amount)
    }

    // -- Helpers ------------------------------------------------------------

    fn program_account(&self, address: &[u8; 32], name: &str) -> Result<&Account, DelegationError> {
        let account = self.accounts.get(address).ok_or_else(|| {
            DelegationError::AccountAbsent(format!("{name} {}", bytes_to_address(address)))
        })?;
        if account.owner != self.config.program_id {
            return Err(DelegationError::AccountMismatch(format!(
                "{name} is not owned by the wallet program"
            )));
        }
        Ok(account)
    }

    fn write_approval(
        &mut self,
        address: &[u8; 32],
        record: &ApprovalRecord,
    ) -> Result<(), DelegationError> {
        let account = self
            .accounts
            .get_mut(address)
            .ok_or_else(|| DelegationError::AccountAbsent(bytes_to_address(address)))?;
        account.data = record.pack().to_vec();
        Ok(())
    }

    fn debit(&mut self, address: &[u8; 32], lamports: u64) -> Result<(), DelegationError> {
        let account = self
            .accounts
            .get_mut(address)
            .ok_or_else(|| DelegationError::AccountAbsent(bytes_to_address(address)))?;
        account.lamports = account.lamports.checked_sub(lamports).ok_or(
            DelegationError::InsufficientFunds {
                available: account.lamports,
                needed: lamports,
            },
        )?;
        Ok(())
    }

    /// Credit lamports, creating a system account if needed.
    fn credit(&mut self, address: &[u8; 32], lamports: u64) -> Result<(), DelegationError> {
        let current = self.lamports(address);
        let updated = current.checked_add(lamports).ok_or_else(|| {
            DelegationError::BalanceOverflow(format!(
                "{} holds {current} lamports, cannot add {lamports}",
                bytes_to_address(address)
            ))
        })?;
        self.accounts
            .entry(*address)
            .or_insert_with(|| Account {
                lamports: 0,
                owner: SYSTEM_PROGRAM_ID,
                data: Vec::new(),
            })
            .lamports = updated;
        Ok(())
    }

    /// Move lamports out of the wallet PDA, keeping its rent reserve.
    fn move_wallet_lamports(
        &mut self,
        wallet: &[u8; 32],
        destination: &[u8; 32],
        lamports: u64,
    ) -> Result<(), DelegationError> {
        let balance = self.lamports(wallet);
        let spendable = balance.saturating_sub(rent_exempt_minimum(0));
        if lamports > spendable {
            return Err(DelegationError::InsufficientFunds {
                available: spendable,
                needed: lamports,
            });
        }
        self.debit(wallet, lamports)?;
        self.credit(destination, lamports)?;
        Ok(())
    }

    fn move_tokens(
        &mut self,
        source: &[u8; 32],
        destination: &[u8; 32],
        authority: &[u8; 32],
        amount: u64,
    ) -> Result<(), DelegationError> {
        let from = self
            .token_accounts
            .get(source)
            .ok_or_else(|| DelegationError::AccountAbsent(format!("token account {}", bytes_to_address(source))))?
            .clone();
        let to = self.token_accounts.get(destination).ok_or_else(|| {
            DelegationError::AccountAbsent(format!("token account {}", bytes_to_address(destination)))
        })?;

        if from.owner != *authority {
            return Err(DelegationError::MissingSignature(format!(
                "token account owner {}",
                bytes_to_address(&from.owner)
            )));
        }
        if from.mint != to.mint {
            return Err(DelegationError::AssetMismatch(
                "token accounts hold different mints".into(),
            ));
        }
        if from.amount < amount {
            return Err(DelegationError::InsufficientFunds {
                available: from.amount,
                needed: amount,
            });
        }

        if source == destination {
            return Ok(());
        }
        let credited = to.amount.checked_add(amount).ok_or_else(|| {
            DelegationError::BalanceOverflow(format!(
                "token account {} holds {}, cannot add {amount}",
                bytes_to_address(destination),
                to.amount
            ))
        })?;

        if let Some(account) = self.token_accounts.get_mut(source) {
            account.amount -= amount;
        }
        if let Some(account) = self.token_accounts.get_mut(destination) {
            account.amount = credited;
        }
        Ok(())
    }
}

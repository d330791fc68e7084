//! Where account bytes come from.
//!
//! The SDK never talks to an RPC node directly. Applications plug in an
//! [`AccountSource`] (an RPC client, a cache, or the in-memory [`Ledger`]) and,
//! for listing, an [`ApprovalIndex`] that knows which delegates an owner has
//! granted.

use std::collections::HashMap;

use delegation_core::Ledger;

use crate::error::SdkError;

/// Fetches raw account data by address.
pub trait AccountSource {
    /// `Ok(None)` means the account does not exist.
    fn get_account_data(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, SdkError>;
}

/// Enumerates the (delegate, mint) pairs granted on a wallet.
pub trait ApprovalIndex {
    fn approvals_for(&self, wallet: &[u8; 32]) -> Result<Vec<([u8; 32], [u8; 32])>, SdkError>;
}

impl AccountSource for Ledger {
    fn get_account_data(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, SdkError> {
        Ok(self.account_data(address).map(<[u8]>::to_vec))
    }
}

impl<T: AccountSource + ?Sized> AccountSource for &T {
    fn get_account_data(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, SdkError> {
        (**self).get_account_data(address)
    }
}

/// Account bytes held in a map, e.g. a snapshot from a batch fetch.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccounts {
    accounts: HashMap<[u8; 32], Vec<u8>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: [u8; 32], data: Vec<u8>) {
        self.accounts.insert(address, data);
    }
}

impl AccountSource for InMemoryAccounts {
    fn get_account_data(&self, address: &[u8; 32]) -> Result<Option<Vec<u8>>, SdkError> {
        Ok(self.accounts.get(address).cloned())
    }
}

/// Grants recorded per wallet, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct InMemoryApprovalIndex {
    grants: HashMap<[u8; 32], Vec<([u8; 32], [u8; 32])>>,
}

impl InMemoryApprovalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a grant. Re-recording the same pair is a no-op.
    pub fn record(&mut self, wallet: [u8; 32], delegate: [u8; 32], mint: [u8; 32]) {
        let grants = self.grants.entry(wallet).or_default();
        if !grants.contains(&(delegate, mint)) {
            grants.push((delegate, mint));
        }
    }
}

impl ApprovalIndex for InMemoryApprovalIndex {
    fn approvals_for(&self, wallet: &[u8; 32]) -> Result<Vec<([u8; 32], [u8; 32])>, SdkError> {
        Ok(self.grants.get(wallet).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_account_is_none() {
        let mut accounts = InMemoryAccounts::new();
        accounts.insert([1; 32], vec![7, 7]);
        assert_eq!(accounts.get_account_data(&[1; 32]).unwrap(), Some(vec![7, 7]));
        assert_eq!(accounts.get_account_data(&[2; 32]).unwrap(), None);
    }

    #[test]
    fn index_deduplicates_grants() {
        let mut index = InMemoryApprovalIndex::new();
        index.record([1; 32], [2; 32], [0; 32]);
        index.record([1; 32], [2; 32], [0; 32]);
        index.record([1; 32], [3; 32], [0; 32]);
        assert_eq!(index.approvals_for(&[1; 32]).unwrap().len(), 2);
        assert!(index.approvals_for(&[9; 32]).unwrap().is_empty());
    }
}

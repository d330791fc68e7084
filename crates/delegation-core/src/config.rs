//! Explicit program configuration.
//!
//! Every derivation and builder takes a `ProgramConfig` by reference. There
//! is no process-wide connection or program holder.

use crate::address;
use crate::error::DelegationError;

/// Decimal places of the native asset (lamports per SOL = 10^9).
pub const NATIVE_DECIMALS: u8 = 9;

/// Settings identifying the deployed smart-wallet program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramConfig {
    /// The program that owns wallet and approval accounts.
    pub program_id: [u8; 32],
    /// Decimal scale used when converting native-asset amounts.
    pub native_decimals: u8,
}

impl ProgramConfig {
    pub fn new(program_id: [u8; 32]) -> Self {
        Self {
            program_id,
            native_decimals: NATIVE_DECIMALS,
        }
    }

    /// Build a config from a Base58 program id.
    pub fn from_base58(program_id: &str) -> Result<Self, DelegationError> {
        Ok(Self::new(address::address_to_bytes(program_id)?))
    }
}

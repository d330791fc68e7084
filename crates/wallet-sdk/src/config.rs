//! Client configuration loaded from JSON.
//!
//! ```json
//! {
//!   "programId": "5UwRT1ngPvSWjUWYcCoRmwVTs5WFUgdDfAW29Ab5XMx2",
//!   "nativeDecimals": 9,
//!   "mints": { "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v": 6 }
//! }
//! ```

use std::collections::HashMap;

use delegation_core::{address_to_bytes, Asset, ProgramConfig, NATIVE_ASSET, NATIVE_DECIMALS};
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
    /// Base58 id of the deployed smart-wallet program.
    pub program_id: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    /// Decimal scale of each known token mint, keyed by Base58 mint.
    #[serde(default)]
    pub mints: HashMap<String, u8>,
}

fn default_native_decimals() -> u8 {
    NATIVE_DECIMALS
}

impl SdkConfig {
    pub fn new(program_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            native_decimals: NATIVE_DECIMALS,
            mints: HashMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let config: Self = serde_json::from_str(json)?;
        config.program_config()?;
        Ok(config)
    }

    pub fn with_mint(mut self, mint: impl Into<String>, decimals: u8) -> Self {
        self.mints.insert(mint.into(), decimals);
        self
    }

    /// Validate into the core program configuration.
    pub fn program_config(&self) -> Result<ProgramConfig, SdkError> {
        let program_id = address_to_bytes(&self.program_id)
            .map_err(|e| SdkError::Config(format!("programId: {e}")))?;
        Ok(ProgramConfig {
            program_id,
            native_decimals: self.native_decimals,
        })
    }

    /// Resolve a mint to an [`Asset`] using the decimals table. The all-zero
    /// mint resolves to the native asset.
    pub fn asset(&self, mint: &[u8; 32]) -> Result<Asset, SdkError> {
        if *mint == NATIVE_ASSET {
            return Ok(Asset::native(&self.program_config()?));
        }
        let key = delegation_core::bytes_to_address(mint);
        let decimals = self
            .mints
            .get(&key)
            .copied()
            .ok_or_else(|| SdkError::Config(format!("no decimals configured for mint {key}")))?;
        Ok(Asset::token(*mint, decimals)?)
    }
}

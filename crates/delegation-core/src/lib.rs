//! Delegated spending for a Solana smart wallet.
//!
//! An owner holds funds in a program-derived wallet account and grants
//! third-party applications (delegates) bounded, expiring authority to spend
//! from it. This crate derives the wallet and approval addresses, encodes the
//! program's instructions and approval records, builds the transactions each
//! party submits, and models how the program applies them.
//!
//! Nothing here signs. Transactions are compiled to their unsigned wire form
//! and handed to whatever holds the keys.

pub mod address;
pub mod amount;
pub mod approval;
pub mod config;
pub mod error;
pub mod executor;
pub mod instruction;
pub mod runtime;
pub mod state;
pub mod token;
pub mod transaction;
pub mod wallet;

pub use address::{
    address_to_bytes, bytes_to_address, derive_approval_address, derive_wallet_address,
    find_program_address,
};
pub use amount::{parse_ui_amount, ui_amount_to_smallest_units};
pub use approval::{
    build_approve_instruction, build_approve_instruction_in_base_units, read_approval,
    ApprovedDapp, Asset,
};
pub use config::{ProgramConfig, NATIVE_DECIMALS};
pub use error::DelegationError;
pub use executor::build_execute_instruction;
pub use instruction::{TransferKind, WalletInstruction};
pub use runtime::Ledger;
pub use state::{ApprovalRecord, APPROVAL_RECORD_LEN, NATIVE_ASSET};
pub use token::{
    build_token_transfer, derive_associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
pub use transaction::{
    build_system_transfer, compile_transaction, decode_compact_u16, encode_compact_u16,
    serialize_message, serialize_unsigned_transaction, CompiledInstruction, SolAccountMeta,
    SolInstruction, SolTransaction, SYSTEM_PROGRAM_ID,
};
pub use wallet::{
    build_create_wallet_instruction, build_deposit_instruction, build_withdraw_instruction,
};

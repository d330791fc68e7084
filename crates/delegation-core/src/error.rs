use thiserror::Error;

/// Errors produced while deriving addresses, encoding payloads, building
/// instructions, or applying them against the runtime model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegationError {
    // -- Codec ---------------------------------------------------------------
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unknown instruction kind: {0}")]
    UnknownInstructionKind(u8),

    // -- Builders ------------------------------------------------------------
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address derivation failed: {0}")]
    AddressDerivation(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Account state -------------------------------------------------------
    #[error("no account at {0}")]
    AccountAbsent(String),

    #[error("account already initialized: {0}")]
    AlreadyInitialized(String),

    // -- Runtime enforcement -------------------------------------------------
    #[error("missing required signature: {0}")]
    MissingSignature(String),

    #[error("account mismatch: {0}")]
    AccountMismatch(String),

    #[error("delegate is not approved")]
    NotApproved,

    #[error("approval expired at {expiry} (now {now})")]
    ApprovalExpired { expiry: i64, now: i64 },

    #[error("amount {requested} exceeds approved ceiling {approved}")]
    ExceedsApproval { requested: u64, approved: u64 },

    #[error("asset mismatch: {0}")]
    AssetMismatch(String),

    #[error("insufficient funds: have {available}, need {needed}")]
    InsufficientFunds { available: u64, needed: u64 },

    #[error("balance overflow: {0}")]
    BalanceOverflow(String),
}

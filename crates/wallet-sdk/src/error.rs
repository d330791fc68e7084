use delegation_core::DelegationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Program(#[from] DelegationError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("account fetch failed: {0}")]
    Fetch(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_errors_display_unchanged() {
        let err = SdkError::from(DelegationError::NotApproved);
        assert_eq!(err.to_string(), DelegationError::NotApproved.to_string());
    }

    #[test]
    fn config_error_display() {
        let err = SdkError::Config("unknown mint".into());
        assert_eq!(err.to_string(), "invalid config: unknown mint");
    }
}

use delegation_core::{bytes_to_address, ApprovedDapp, SolTransaction};
use serde::{Deserialize, Serialize};

/// An approval as shown to the owner.
///
/// `maxAmount` is a decimal string so that values above 2^53 survive a trip
/// through JavaScript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalView {
    /// Base58 delegate key.
    pub dapp: String,
    /// Base58 mint; the native asset is the all-zero key.
    pub token_mint: String,
    pub approval_address: String,
    pub max_amount: String,
    pub expiry: i64,
    pub usable: bool,
}

impl ApprovalView {
    pub fn new(approved: &ApprovedDapp, now: i64) -> Self {
        Self {
            dapp: bytes_to_address(&approved.delegate),
            token_mint: bytes_to_address(&approved.record.asset),
            approval_address: bytes_to_address(&approved.approval_address),
            max_amount: approved.record.max_amount.to_string(),
            expiry: approved.record.expiry,
            usable: approved.is_usable(now),
        }
    }
}

/// A compiled transaction awaiting signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    /// Base58 keys that must sign, in signature-slot order.
    pub signers: Vec<String>,
    /// Hex of the message bytes each signer signs.
    pub message: String,
    /// Hex of the full wire transaction with zeroed signature slots.
    pub transaction: String,
}

impl UnsignedTransaction {
    pub(crate) fn new(tx: &SolTransaction, message: &[u8], wire: &[u8]) -> Self {
        Self {
            signers: tx
                .account_keys
                .iter()
                .take(tx.num_required_signatures as usize)
                .map(bytes_to_address)
                .collect(),
            message: hex::encode(message),
            transaction: hex::encode(wire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegation_core::{ApprovalRecord, NATIVE_ASSET};

    #[test]
    fn approval_view_serializes_camel_case() {
        let approved = ApprovedDapp {
            wallet: [1; 32],
            delegate: [2; 32],
            approval_address: [3; 32],
            record: ApprovalRecord::new(u64::MAX, 100, NATIVE_ASSET),
        };
        let view = ApprovalView::new(&approved, 50);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["maxAmount"], "18446744073709551615");
        assert_eq!(json["tokenMint"], "11111111111111111111111111111111");
        assert_eq!(json["expiry"], 100);
        assert_eq!(json["usable"], true);
        assert!(!ApprovalView::new(&approved, 100).usable);
    }
}

//! On-chain account layouts owned by the smart-wallet program.

use crate::error::DelegationError;
use crate::instruction::Reader;

/// Asset identity of the native asset: the all-zero key.
pub const NATIVE_ASSET: [u8; 32] = [0u8; 32];

/// Size of an approval account: is_approved + max_amount + expiry + asset.
pub const APPROVAL_RECORD_LEN: usize = 1 + 8 + 8 + 32;

/// A wallet owner's grant of spend authority to one delegate for one asset.
///
/// ```text
/// offset  field        type
/// 0       is_approved  u8 (0 | 1)
/// 1       max_amount   u64 LE
/// 9       expiry       i64 LE, unix seconds
/// 17      asset        [u8; 32]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalRecord {
    pub is_approved: bool,
    /// Remaining spend ceiling in the asset's smallest unit.
    pub max_amount: u64,
    pub expiry: i64,
    pub asset: [u8; 32],
}

impl ApprovalRecord {
    /// A fresh, active approval.
    pub fn new(max_amount: u64, expiry: i64, asset: [u8; 32]) -> Self {
        Self {
            is_approved: true,
            max_amount,
            expiry,
            asset,
        }
    }

    /// Whether a delegate may currently spend against this record.
    ///
    /// Revoked, expired and exhausted records are all unusable; callers that
    /// need to tell them apart must inspect the fields.
    pub fn is_usable(&self, now: i64) -> bool {
        self.is_approved && self.expiry > now && self.max_amount > 0
    }

    pub fn is_native(&self) -> bool {
        self.asset == NATIVE_ASSET
    }

    /// Overwrite ceiling and expiry, reactivating the record.
    pub fn update(&mut self, max_amount: u64, expiry: i64) {
        self.max_amount = max_amount;
        self.expiry = expiry;
        self.is_approved = true;
    }

    pub fn revoke(&mut self) {
        self.is_approved = false;
    }

    pub fn pack(&self) -> [u8; APPROVAL_RECORD_LEN] {
        let mut buf = [0u8; APPROVAL_RECORD_LEN];
        buf[0] = self.is_approved as u8;
        buf[1..9].copy_from_slice(&self.max_amount.to_le_bytes());
        buf[9..17].copy_from_slice(&self.expiry.to_le_bytes());
        buf[17..49].copy_from_slice(&self.asset);
        buf
    }

    /// Decode an approval account. The input must be exactly
    /// [`APPROVAL_RECORD_LEN`] bytes.
    pub fn unpack(data: &[u8]) -> Result<Self, DelegationError> {
        if data.len() != APPROVAL_RECORD_LEN {
            return Err(DelegationError::MalformedPayload(format!(
                "approval record must be {APPROVAL_RECORD_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut reader = Reader::new(data);
        let record = Self {
            is_approved: reader.bool()?,
            max_amount: reader.u64()?,
            expiry: reader.i64()?,
            asset: reader.pubkey()?,
        };
        reader.finish()?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn pack_layout() {
        let record = ApprovalRecord::new(1000, NOW, [0xaa; 32]);
        let bytes = record.pack();
        assert_eq!(bytes.len(), 49);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &1000u64.to_le_bytes());
        assert_eq!(&bytes[9..17], &NOW.to_le_bytes());
        assert_eq!(&bytes[17..], &[0xaa; 32]);
    }

    #[test]
    fn unpack_recovers_record() {
        let records = [
            ApprovalRecord::new(0, 0, NATIVE_ASSET),
            ApprovalRecord::new(u64::MAX, i64::MAX, [0xff; 32]),
            ApprovalRecord {
                is_approved: false,
                max_amount: 12,
                expiry: -5,
                asset: [3; 32],
            },
        ];
        for record in records {
            assert_eq!(ApprovalRecord::unpack(&record.pack()).unwrap(), record);
        }
    }

    #[test]
    fn every_short_buffer_is_malformed() {
        let bytes = ApprovalRecord::new(5, NOW, [1; 32]).pack();
        for len in 0..APPROVAL_RECORD_LEN {
            assert!(
                matches!(
                    ApprovalRecord::unpack(&bytes[..len]),
                    Err(DelegationError::MalformedPayload(_))
                ),
                "length {len} should be rejected"
            );
        }
    }

    #[test]
    fn oversized_buffer_is_malformed() {
        let mut bytes = ApprovalRecord::new(5, NOW, [1; 32]).pack().to_vec();
        bytes.push(0);
        assert!(matches!(
            ApprovalRecord::unpack(&bytes),
            Err(DelegationError::MalformedPayload(_))
        ));
    }

    #[test]
    fn bool_byte_outside_zero_one_is_malformed() {
        let mut bytes = ApprovalRecord::new(5, NOW, [1; 32]).pack();
        bytes[0] = 2;
        assert!(matches!(
            ApprovalRecord::unpack(&bytes),
            Err(DelegationError::MalformedPayload(_))
        ));
    }

    #[test]
    fn expired_record_is_never_usable() {
        for max_amount in [1, 1_000, u64::MAX] {
            let record = ApprovalRecord::new(max_amount, NOW - 1, NATIVE_ASSET);
            assert!(!record.is_usable(NOW));
        }
        // Expiry equal to now has already lapsed.
        assert!(!ApprovalRecord::new(10, NOW, NATIVE_ASSET).is_usable(NOW));
    }

    #[test]
    fn exhausted_record_is_never_usable() {
        for expiry in [NOW + 1, NOW + 86_400, i64::MAX] {
            let record = ApprovalRecord::new(0, expiry, NATIVE_ASSET);
            assert!(!record.is_usable(NOW));
        }
    }

    #[test]
    fn revoked_record_is_not_usable_until_updated() {
        let mut record = ApprovalRecord::new(10, NOW + 60, NATIVE_ASSET);
        assert!(record.is_usable(NOW));

        record.revoke();
        assert!(!record.is_usable(NOW));

        record.update(20, NOW + 120);
        assert!(record.is_usable(NOW));
        assert_eq!(record.max_amount, 20);
        assert_eq!(record.expiry, NOW + 120);
    }
}

//! Smart-wallet program instruction codec.
//!
//! ```text
//! offset  field          type
//! 0       discriminant   u8   0=CreateWallet 1=ApproveDelegate
//!                             2=ExecuteDelegatedTransfer 3=Withdraw
//! 1..     payload        variant specific, little-endian, no padding
//!
//! CreateWallet               (empty)
//! ApproveDelegate            max_amount u64 | expiry i64
//! ExecuteDelegatedTransfer   amount u64     | kind u8
//! Withdraw                   amount u64     | kind u8
//! ```

use crate::error::DelegationError;

/// Which account set and unit scale a transfer-shaped instruction uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Lamports moved directly between system accounts.
    Native = 0,
    /// SPL tokens moved between token accounts.
    Fungible = 1,
}

impl TryFrom<u8> for TransferKind {
    type Error = DelegationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Native),
            1 => Ok(Self::Fungible),
            other => Err(DelegationError::MalformedPayload(format!(
                "invalid transfer kind {other}"
            ))),
        }
    }
}

/// One instruction of the smart-wallet program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletInstruction {
    CreateWallet,
    ApproveDelegate { max_amount: u64, expiry: i64 },
    ExecuteDelegatedTransfer { amount: u64, kind: TransferKind },
    Withdraw { amount: u64, kind: TransferKind },
}

impl WalletInstruction {
    pub const CREATE_WALLET: u8 = 0;
    pub const APPROVE_DELEGATE: u8 = 1;
    pub const EXECUTE_DELEGATED_TRANSFER: u8 = 2;
    pub const WITHDRAW: u8 = 3;

    pub fn discriminant(&self) -> u8 {
        match self {
            Self::CreateWallet => Self::CREATE_WALLET,
            Self::ApproveDelegate { .. } => Self::APPROVE_DELEGATE,
            Self::ExecuteDelegatedTransfer { .. } => Self::EXECUTE_DELEGATED_TRANSFER,
            Self::Withdraw { .. } => Self::WITHDRAW,
        }
    }

    /// Encode to the program's instruction data.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(17);
        buf.push(self.discriminant());

        match *self {
            Self::CreateWallet => {}
            Self::ApproveDelegate { max_amount, expiry } => {
                buf.extend_from_slice(&max_amount.to_le_bytes());
                buf.extend_from_slice(&expiry.to_le_bytes());
            }
            Self::ExecuteDelegatedTransfer { amount, kind } | Self::Withdraw { amount, kind } => {
                buf.extend_from_slice(&amount.to_le_bytes());
                buf.push(kind as u8);
            }
        }

        buf
    }

    /// Decode instruction data, rejecting unknown discriminants, short
    /// payloads, and trailing bytes.
    pub fn unpack(data: &[u8]) -> Result<Self, DelegationError> {
        let (&tag, rest) = data
            .split_first()
            .ok_or_else(|| DelegationError::MalformedPayload("empty instruction data".into()))?;

        let mut reader = Reader::new(rest);
        let instruction = match tag {
            Self::CREATE_WALLET => Self::CreateWallet,
            Self::APPROVE_DELEGATE => Self::ApproveDelegate {
                max_amount: reader.u64()?,
                expiry: reader.i64()?,
            },
            Self::EXECUTE_DELEGATED_TRANSFER => Self::ExecuteDelegatedTransfer {
                amount: reader.u64()?,
                kind: TransferKind::try_from(reader.u8()?)?,
            },
            Self::WITHDRAW => Self::Withdraw {
                amount: reader.u64()?,
                kind: TransferKind::try_from(reader.u8()?)?,
            },
            other => return Err(DelegationError::UnknownInstructionKind(other)),
        };
        reader.finish()?;

        Ok(instruction)
    }
}

/// Little-endian cursor over a fixed layout.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DelegationError> {
        let end = self.offset + N;
        let bytes = self.data.get(self.offset..end).ok_or_else(|| {
            DelegationError::MalformedPayload(format!(
                "need {N} bytes at offset {}, have {}",
                self.offset,
                self.data.len()
            ))
        })?;
        self.offset = end;
        // The slice is exactly N bytes long.
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DelegationError> {
        Ok(self.take::<1>()?[0])
    }

    pub(crate) fn bool(&mut self) -> Result<bool, DelegationError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DelegationError::MalformedPayload(format!(
                "invalid bool byte {other:#04x}"
            ))),
        }
    }

    pub(crate) fn u64(&mut self) -> Result<u64, DelegationError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    pub(crate) fn i64(&mut self) -> Result<i64, DelegationError> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    pub(crate) fn pubkey(&mut self) -> Result<[u8; 32], DelegationError> {
        self.take()
    }

    pub(crate) fn finish(self) -> Result<(), DelegationError> {
        if self.offset != self.data.len() {
            return Err(DelegationError::MalformedPayload(format!(
                "{} trailing bytes",
                self.data.len() - self.offset
            )));
        }
        Ok(())
    }
}

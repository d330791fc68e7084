//! Instruction containers and the unsigned Solana transaction wire format.
//!
//! Builders elsewhere in the crate return [`SolInstruction`] values. The
//! embedding application turns them into a message with
//! [`compile_transaction`], has the required keys sign [`serialize_message`]
//! output, and broadcasts. Nothing here touches key material.
//!
//! Wire layout, all lengths compact-u16:
//!
//! ```text
//! [sig count][64-byte signatures...]
//! [required sigs u8][readonly signed u8][readonly unsigned u8]
//! [key count][32-byte keys...][recent blockhash 32]
//! [ix count]{ [program index u8][index count][indices...][data len][data...] }...
//! ```

use crate::error::DelegationError;

/// System Program id, the all-zero key.
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

/// Solana's variable-length u16: seven bits per byte, low group first, high
/// bit set on every byte but the last. At most three bytes.
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut rest = value;
    let mut out = Vec::with_capacity(3);
    while rest >= 0x80 {
        out.push((rest as u8 & 0x7f) | 0x80);
        rest >>= 7;
    }
    out.push(rest as u8);
    out
}

/// Inverse of [`encode_compact_u16`]. Returns the value and how many bytes
/// it occupied.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), DelegationError> {
    let mut value = 0u32;
    for (i, byte) in data.iter().take(3).enumerate() {
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 || i == 2 {
            let value = u16::try_from(value).map_err(|_| {
                DelegationError::Serialization(format!("compact-u16 value {value:#x} overflows"))
            })?;
            return Ok((value, i + 1));
        }
    }
    Err(DelegationError::Serialization("truncated compact-u16".into()))
}

/// One account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolAccountMeta {
    pub fn writable(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: [u8; 32], is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before compilation.
///
/// Account order is positional: the executing program binds meaning by
/// index, so every builder for a given kind must emit the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

impl SolInstruction {
    /// Public keys that must sign for this instruction.
    pub fn signers(&self) -> impl Iterator<Item = &[u8; 32]> {
        self.accounts
            .iter()
            .filter(|m| m.is_signer)
            .map(|m| &m.pubkey)
    }
}

/// A compiled, unsigned transaction.
///
/// `account_keys` is in canonical order: writable signers, read-only
/// signers, writable non-signers, read-only non-signers. The first
/// `num_required_signatures` keys own the signature slots.
#[derive(Debug, Clone)]
pub struct SolTransaction {
    pub account_keys: Vec<[u8; 32]>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// An instruction whose keys are indices into `account_keys`.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// System Program `Transfer`: u32 LE index 2, then u64 LE lamports.
pub fn build_system_transfer(
    from: &[u8; 32],
    to: &[u8; 32],
    lamports: u64,
) -> Result<SolInstruction, DelegationError> {
    if lamports == 0 {
        return Err(DelegationError::InvalidAmount("lamports must be > 0".into()));
    }

    let mut data = SYSTEM_TRANSFER_IX_INDEX.to_le_bytes().to_vec();
    data.extend_from_slice(&lamports.to_le_bytes());

    Ok(SolInstruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*from, true),
            SolAccountMeta::writable(*to, false),
        ],
        data,
    })
}

/// Merge the account lists of `instructions` into one message.
///
/// `fee_payer` is always key 0. A key referenced more than once takes the
/// union of its signer and writable flags.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, DelegationError> {
    if instructions.is_empty() {
        return Err(DelegationError::TransactionBuild(
            "transaction needs at least one instruction".into(),
        ));
    }

    let referenced = instructions.iter().flat_map(|ix| {
        ix.accounts
            .iter()
            .cloned()
            .chain(std::iter::once(SolAccountMeta::readonly(ix.program_id, false)))
    });

    let mut merged: Vec<SolAccountMeta> = vec![SolAccountMeta::writable(*fee_payer, true)];
    for meta in referenced {
        match merged.iter_mut().find(|m| m.pubkey == meta.pubkey) {
            Some(existing) => {
                existing.is_signer |= meta.is_signer;
                existing.is_writable |= meta.is_writable;
            }
            None => merged.push(meta),
        }
    }

    // Stable, so the fee payer stays ahead of other writable signers.
    merged.sort_by_key(|m| (!m.is_signer, !m.is_writable));

    let count = |signer: bool, writable: bool| {
        merged
            .iter()
            .filter(|m| m.is_signer == signer && m.is_writable == writable)
            .count()
    };
    let signed = count(true, true) + count(true, false);
    let (readonly_signed, readonly_unsigned) = (count(true, false), count(false, false));

    let too_many = |n: usize| {
        u8::try_from(n)
            .map_err(|_| DelegationError::TransactionBuild(format!("too many accounts: {n}")))
    };
    too_many(merged.len())?;

    let account_keys: Vec<[u8; 32]> = merged.iter().map(|m| m.pubkey).collect();
    let index_of = |key: &[u8; 32]| -> Result<u8, DelegationError> {
        let position = account_keys.iter().position(|k| k == key).ok_or_else(|| {
            DelegationError::TransactionBuild("key missing from account list".into())
        })?;
        too_many(position)
    };

    let compiled_instructions = instructions
        .iter()
        .map(|ix| -> Result<CompiledInstruction, DelegationError> {
            Ok(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices: ix
                    .accounts
                    .iter()
                    .map(|m| index_of(&m.pubkey))
                    .collect::<Result<_, DelegationError>>()?,
                data: ix.data.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SolTransaction {
        num_required_signatures: too_many(signed)?,
        num_readonly_signed: too_many(readonly_signed)?,
        num_readonly_unsigned: too_many(readonly_unsigned)?,
        account_keys,
        recent_blockhash: *recent_blockhash,
        compiled_instructions,
    })
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, DelegationError> {
    let len = u16::try_from(len)
        .map_err(|_| DelegationError::Serialization(format!("{what} length {len} overflows u16")))?;
    Ok(encode_compact_u16(len))
}

/// The message bytes every required signer signs.
pub fn serialize_message(tx: &SolTransaction) -> Result<Vec<u8>, DelegationError> {
    let mut buf = vec![
        tx.num_required_signatures,
        tx.num_readonly_signed,
        tx.num_readonly_unsigned,
    ];

    buf.extend_from_slice(&compact_len(tx.account_keys.len(), "account keys")?);
    for key in &tx.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&compact_len(tx.compiled_instructions.len(), "instructions")?);
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&compact_len(ix.account_indices.len(), "account indices")?);
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data")?);
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Serialize the transaction with zero-filled signature slots.
///
/// This is the shape a wallet adapter or bot signer expects to receive: it
/// fills in each slot for the signer at the same index in `account_keys`.
pub fn serialize_unsigned_transaction(tx: &SolTransaction) -> Result<Vec<u8>, DelegationError> {
    let message = serialize_message(tx)?;
    let num_sigs = tx.num_required_signatures as usize;

    let mut wire = Vec::with_capacity(3 + num_sigs * 64 + message.len());
    wire.extend_from_slice(&encode_compact_u16(tx.num_required_signatures as u16));
    wire.resize(wire.len() + num_sigs * 64, 0);
    wire.extend_from_slice(&message);

    Ok(wire)
}

//! SPL Token program ids, associated token accounts, and the token
//! `Transfer` instruction used for fungible deposits.

use crate::address::find_program_address;
use crate::error::DelegationError;
use crate::transaction::{SolAccountMeta, SolInstruction};

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
];

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: [u8; 32] = [
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
];

/// SPL Token `Transfer` instruction index.
const TOKEN_TRANSFER_IX_INDEX: u8 = 3;

/// Derive the associated token account address for an owner + mint pair.
///
/// Seeds: `[owner, token_program_id, mint]` under the ATA program. The owner
/// may itself be a PDA (the smart wallet holds its tokens this way).
pub fn derive_associated_token_address(
    owner: &[u8; 32],
    mint: &[u8; 32],
) -> Result<[u8; 32], DelegationError> {
    find_program_address(
        &[owner.as_ref(), &TOKEN_PROGRAM_ID, mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Build an SPL Token `Transfer` instruction.
///
/// Data: `[3]` followed by the u64 LE amount, 9 bytes total.
pub fn build_token_transfer(
    from_token_account: &[u8; 32],
    to_token_account: &[u8; 32],
    authority: &[u8; 32],
    amount: u64,
) -> Result<SolInstruction, DelegationError> {
    if amount == 0 {
        return Err(DelegationError::InvalidAmount(
            "token transfer amount must be > 0".into(),
        ));
    }

    let mut data = Vec::with_capacity(9);
    data.push(TOKEN_TRANSFER_IX_INDEX);
    data.extend_from_slice(&amount.to_le_bytes());

    Ok(SolInstruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*from_token_account, false),
            SolAccountMeta::writable(*to_token_account, false),
            SolAccountMeta::readonly(*authority, true),
        ],
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address;

    #[test]
    fn token_program_id_roundtrip() {
        assert_eq!(
            address::bytes_to_address(&TOKEN_PROGRAM_ID),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
    }

    #[test]
    fn associated_token_program_id_roundtrip() {
        assert_eq!(
            address::bytes_to_address(&ASSOCIATED_TOKEN_PROGRAM_ID),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
    }

    #[test]
    fn token_transfer_encoding() {
        let ix = build_token_transfer(&[1u8; 32], &[2u8; 32], &[3u8; 32], 500_000).unwrap();

        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(ix.data.len(), 9);
        assert_eq!(ix.data[0], 3);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 500_000);

        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert!(ix.accounts[2].is_signer && !ix.accounts[2].is_writable);
    }

    #[test]
    fn token_transfer_zero_amount_fails() {
        let result = build_token_transfer(&[1u8; 32], &[2u8; 32], &[3u8; 32], 0);
        assert!(matches!(result, Err(DelegationError::InvalidAmount(_))));
    }

    #[test]
    fn ata_is_deterministic_and_mint_specific() {
        let owner = [0x11u8; 32];
        let a = derive_associated_token_address(&owner, &[0x22u8; 32]).unwrap();
        let b = derive_associated_token_address(&owner, &[0x22u8; 32]).unwrap();
        let c = derive_associated_token_address(&owner, &[0x23u8; 32]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!address::is_on_curve(&a));
    }

    #[test]
    fn ata_for_usdc_mint_is_valid_address() {
        let usdc_mint =
            address::address_to_bytes("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        let ata = derive_associated_token_address(&[0x42u8; 32], &usdc_mint).unwrap();
        let encoded = address::bytes_to_address(&ata);
        assert_eq!(address::address_to_bytes(&encoded).unwrap(), ata);
    }
}

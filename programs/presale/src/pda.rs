use crate::constants::*;
use anchor_lang::prelude::*;
use anchor_spl::associated_token::get_associated_token_address;

pub fn derive_presale_info(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PRESALE_SEED], program_id)
}

pub fn derive_presale_vault(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PRESALE_VAULT], program_id)
}

pub fn derive_user_info(buyer: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[USER_SEED, buyer.as_ref()], program_id)
}

/// Associated token account of `token_mint` owned by the presale info PDA.
pub fn derive_custody_token_account(token_mint: &Pubkey, program_id: &Pubkey) -> Pubkey {
    let (presale_info, _) = derive_presale_info(program_id);
    get_associated_token_address(&presale_info, token_mint)
}

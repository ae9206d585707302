//! Raw reads and writes for accounts that may legitimately not exist yet. Anchor's
//! typed wrappers reject an empty account before the handler runs, which would hide
//! the presale error the caller should see.

use anchor_lang::error::ErrorCode;
use anchor_lang::prelude::*;
use anchor_spl::token::{self, TokenAccount};

use crate::errors::PresaleError;

/// Deserializes an account owned by `owner`, failing with `missing` when it was
/// never created.
pub fn load_account<T: AccountDeserialize>(
    info: &AccountInfo,
    owner: &Pubkey,
    missing: PresaleError,
) -> Result<T> {
    require!(!info.data_is_empty(), PresaleError::from(missing));
    require_keys_eq!(*info.owner, *owner, ErrorCode::AccountOwnedByWrongProgram);

    let data = info.try_borrow_data()?;
    T::try_deserialize(&mut &data[..])
}

/// Deserializes an account owned by `owner`, or returns the zeroed value when it was
/// never created so the state checks report the failure.
pub fn load_account_or_default<T: AccountDeserialize + Default>(
    info: &AccountInfo,
    owner: &Pubkey,
) -> Result<T> {
    if info.data_is_empty() {
        return Ok(T::default());
    }
    require_keys_eq!(*info.owner, *owner, ErrorCode::AccountOwnedByWrongProgram);

    let data = info.try_borrow_data()?;
    T::try_deserialize(&mut &data[..])
}

pub fn store_account<T: AccountSerialize>(info: &AccountInfo, account: &T) -> Result<()> {
    let mut data = info.try_borrow_mut_data()?;
    let mut writer: &mut [u8] = &mut data[..];
    account.try_serialize(&mut writer)
}

/// Balance of a token account that holds nothing until it is first created.
pub fn token_amount_or_zero(info: &AccountInfo) -> Result<u64> {
    if info.data_is_empty() {
        return Ok(0);
    }
    let account: TokenAccount =
        load_account(info, &token::ID, PresaleError::InsufficientPresaleTokens)?;
    Ok(account.amount)
}

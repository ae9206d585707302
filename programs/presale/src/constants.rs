use anchor_lang::prelude::*;

#[constant]
pub const PRESALE_SEED: &[u8] = b"PRESALE_SEED";
#[constant]
pub const USER_SEED: &[u8] = b"USER_SEED";
#[constant]
pub const PRESALE_VAULT: &[u8] = b"PRESALE_VAULT";

/// Window timestamps are stored in milliseconds.
pub const MILLIS_PER_SECOND: i64 = 1_000;

use anchor_lang::prelude::*;

#[event]
pub struct PresaleCreated {
    pub authority: Pubkey,
    pub token_mint: Pubkey,
    pub soft_cap: u64,
    pub hard_cap: u64,
    pub max_per_address: u64,
    pub price_per_token: u64,
}

#[event]
pub struct PresaleUpdated {
    pub soft_cap: u64,
    pub hard_cap: u64,
    pub max_per_address: u64,
    pub price_per_token: u64,
}

#[event]
pub struct PresaleStarted {
    pub start_time: u64,
    pub end_time: u64,
}

#[event]
pub struct TokenDeposited {
    pub authority: Pubkey,
    pub amount: u64,
    pub total_deposited: u64,
}

#[event]
pub struct TokenBought {
    pub buyer: Pubkey,
    pub quote_amount: u64,
    pub token_amount: u64,
    pub total_raised: u64,
    pub total_sold: u64,
}

#[event]
pub struct TokenClaimed {
    pub buyer: Pubkey,
    pub amount: u64,
    pub total_claimed: u64,
}

#[event]
pub struct TokenWithdrawn {
    pub authority: Pubkey,
    pub amount: u64,
}

#[event]
pub struct SolWithdrawn {
    pub authority: Pubkey,
    pub amount: u64,
}

#[event]
pub struct Refunded {
    pub buyer: Pubkey,
    pub amount: u64,
    pub total_refunded: u64,
}

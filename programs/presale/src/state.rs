use crate::errors::PresaleError;
use crate::math::SafeMath;
use anchor_lang::prelude::*;

/// Economic settings shared by `create_presale` and `update_presale`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresaleParams {
    pub soft_cap: u64,
    pub hard_cap: u64,
    pub max_per_address: u64,
    pub price_per_token: u64,
}

impl PresaleParams {
    pub fn validate(&self) -> Result<()> {
        require!(
            self.soft_cap > 0
                && self.hard_cap > 0
                && self.max_per_address > 0
                && self.price_per_token > 0,
            PresaleError::InvalidParameter
        );
        require!(
            self.soft_cap <= self.hard_cap,
            PresaleError::InvalidCapOrdering
        );
        Ok(())
    }
}

#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PresaleInfo {
    pub authority: Pubkey,
    pub token_mint: Pubkey,
    /// Quote (lamport) amounts
    pub soft_cap: u64,
    pub hard_cap: u64,
    /// Token units one buyer may hold through this sale
    pub max_per_address: u64,
    /// Lamports per token unit
    pub price_per_token: u64,
    /// Window bounds in milliseconds, `[start_time, end_time)`
    pub start_time: u64,
    pub end_time: u64,
    pub total_raised: u64,
    pub total_sold: u64,
    pub total_claimed: u64,
    pub total_refunded: u64,
    pub total_deposited: u64,
    pub is_soft_capped: bool,
    pub is_hard_capped: bool,
    pub initialized: bool,
    pub bump: u8,
    pub vault_bump: u8,
}

impl PresaleInfo {
    // authority + token_mint + 11 u64 fields + 3 flags + 2 bumps
    pub const LEN: usize = 32 + 32 + 11 * 8 + 3 + 2;

    pub fn assert_authority(&self, signer: &Pubkey) -> Result<()> {
        require_keys_eq!(*signer, self.authority, PresaleError::Unauthorized);
        Ok(())
    }

    pub fn initialize(
        &mut self,
        authority: Pubkey,
        token_mint: Pubkey,
        params: PresaleParams,
        bump: u8,
        vault_bump: u8,
    ) -> Result<()> {
        require!(!self.initialized, PresaleError::AlreadyInitialized);
        params.validate()?;

        *self = Self {
            authority,
            token_mint,
            initialized: true,
            bump,
            vault_bump,
            ..Default::default()
        };
        self.apply_params(params);

        Ok(())
    }

    fn apply_params(&mut self, params: PresaleParams) {
        let PresaleParams {
            soft_cap,
            hard_cap,
            max_per_address,
            price_per_token,
        } = params;

        self.soft_cap = soft_cap;
        self.hard_cap = hard_cap;
        self.max_per_address = max_per_address;
        self.price_per_token = price_per_token;
    }

    pub fn is_window_open(&self, now: u64) -> bool {
        self.start_time <= now && now < self.end_time
    }

    pub fn has_ended(&self, now: u64) -> bool {
        now >= self.end_time
    }

    fn has_purchases(&self) -> bool {
        self.total_raised > 0 || self.total_sold > 0
    }

    pub fn update(&mut self, signer: &Pubkey, params: PresaleParams, now: u64) -> Result<()> {
        self.assert_authority(signer)?;
        require!(
            !self.is_window_open(now) && self.total_raised == 0,
            PresaleError::SaleAlreadyActive
        );
        params.validate()?;

        self.apply_params(params);
        Ok(())
    }

    /// Sets the purchase window. An unstarted window, or one with no purchases yet,
    /// may be overwritten freely.
    pub fn schedule(
        &mut self,
        signer: &Pubkey,
        start_time: u64,
        end_time: u64,
        now: u64,
    ) -> Result<()> {
        self.assert_authority(signer)?;
        require!(start_time < end_time, PresaleError::InvalidWindow);
        require!(
            !(self.has_purchases() && now < self.end_time),
            PresaleError::SaleAlreadyActive
        );

        self.start_time = start_time;
        self.end_time = end_time;
        Ok(())
    }

    pub fn record_deposit(&mut self, signer: &Pubkey, amount: u64) -> Result<()> {
        self.assert_authority(signer)?;
        require!(amount > 0, PresaleError::InvalidParameter);

        self.total_deposited = self.total_deposited.safe_add(amount)?;
        Ok(())
    }

    /// Token units sold but not yet claimed.
    pub fn outstanding_tokens(&self) -> Result<u64> {
        Ok(self.total_sold.safe_sub(self.total_claimed)?)
    }

    /// Custody balance not earmarked for unclaimed purchases.
    pub fn unreserved_tokens(&self, custody_balance: u64) -> Result<u64> {
        Ok(custody_balance.saturating_sub(self.outstanding_tokens()?))
    }

    /// Validates and books a purchase of `quote_amount` lamports. Returns the token
    /// units allocated, `quote_amount / price_per_token` rounded down; the remainder
    /// is kept as quote.
    pub fn buy(
        &mut self,
        user: &mut UserInfo,
        quote_amount: u64,
        now: u64,
        custody_balance: u64,
    ) -> Result<u64> {
        require!(self.initialized, PresaleError::NotInitialized);
        require!(now >= self.start_time, PresaleError::WindowNotStarted);
        require!(now < self.end_time, PresaleError::WindowClosed);
        require!(quote_amount > 0, PresaleError::InvalidParameter);

        let total_raised = self.total_raised.safe_add(quote_amount)?;
        require!(
            total_raised <= self.hard_cap,
            PresaleError::HardCapExceeded
        );

        let token_amount = quote_amount.safe_div(self.price_per_token)?;
        let purchased_tokens = user.purchased_tokens.safe_add(token_amount)?;
        require!(
            purchased_tokens <= self.max_per_address,
            PresaleError::PerAddressCapExceeded
        );
        require!(
            token_amount <= self.unreserved_tokens(custody_balance)?,
            PresaleError::InsufficientPresaleTokens
        );
        require!(!user.claimed, PresaleError::AlreadyClaimed);

        let purchased_quote = user.purchased_quote.safe_add(quote_amount)?;
        let total_sold = self.total_sold.safe_add(token_amount)?;

        user.purchased_quote = purchased_quote;
        user.purchased_tokens = purchased_tokens;
        user.last_buy_time = now;

        self.total_raised = total_raised;
        self.total_sold = total_sold;
        self.refresh_cap_status();

        Ok(token_amount)
    }

    fn refresh_cap_status(&mut self) {
        self.is_soft_capped = self.total_raised >= self.soft_cap;
        self.is_hard_capped = self.total_raised >= self.hard_cap;
    }

    /// Marks the buyer's allocation as claimed and returns the token units to release.
    pub fn claim(&mut self, user: &mut UserInfo, now: u64, custody_balance: u64) -> Result<u64> {
        require!(self.has_ended(now), PresaleError::SaleNotEnded);
        require!(!user.claimed, PresaleError::AlreadyClaimed);
        require!(user.purchased_tokens > 0, PresaleError::NothingToClaim);

        let claim_amount = user.purchased_tokens;
        require!(
            claim_amount <= custody_balance,
            PresaleError::InsufficientCustodyBalance
        );

        self.total_claimed = self.total_claimed.safe_add(claim_amount)?;
        user.claimed = true;

        Ok(claim_amount)
    }

    /// Unclaimed allocations stay reserved; only the surplus can leave custody.
    pub fn check_token_withdrawal(
        &self,
        signer: &Pubkey,
        amount: u64,
        custody_balance: u64,
    ) -> Result<()> {
        self.assert_authority(signer)?;
        require!(amount > 0, PresaleError::InvalidParameter);
        require!(
            amount <= custody_balance,
            PresaleError::InsufficientCustodyBalance
        );
        require!(
            amount <= self.unreserved_tokens(custody_balance)?,
            PresaleError::ReservedForBuyers
        );
        Ok(())
    }

    /// Lamports buyers could still reclaim. Nothing is refundable once the soft cap
    /// is reached, since `total_raised` never decreases.
    pub fn refundable_quote(&self) -> Result<u64> {
        if self.total_raised >= self.soft_cap {
            return Ok(0);
        }
        Ok(self.total_raised.safe_sub(self.total_refunded)?)
    }

    pub fn check_sol_withdrawal(
        &self,
        signer: &Pubkey,
        amount: u64,
        vault_balance: u64,
        reserve_floor: u64,
    ) -> Result<()> {
        self.assert_authority(signer)?;
        require!(amount > 0, PresaleError::InvalidParameter);
        check_vault_debit(amount, vault_balance, reserve_floor)?;

        let withdrawable = vault_balance
            .safe_sub(reserve_floor)?
            .saturating_sub(self.refundable_quote()?);
        require!(amount <= withdrawable, PresaleError::RefundsReserved);
        Ok(())
    }

    /// Unwinds the buyer's purchase when the soft cap was missed. Returns the lamports
    /// to send back.
    pub fn refund(
        &mut self,
        user: &mut UserInfo,
        now: u64,
        vault_balance: u64,
        reserve_floor: u64,
    ) -> Result<u64> {
        require!(self.has_ended(now), PresaleError::SaleNotEnded);
        require!(
            self.total_raised < self.soft_cap,
            PresaleError::SoftCapReached
        );
        require!(!user.claimed, PresaleError::AlreadyClaimed);
        require!(user.purchased_quote > 0, PresaleError::NothingToRefund);

        let refund_amount = user.purchased_quote;
        check_vault_debit(refund_amount, vault_balance, reserve_floor)?;

        self.total_sold = self.total_sold.safe_sub(user.purchased_tokens)?;
        self.total_refunded = self.total_refunded.safe_add(refund_amount)?;
        user.purchased_quote = 0;
        user.purchased_tokens = 0;

        Ok(refund_amount)
    }
}

fn check_vault_debit(amount: u64, vault_balance: u64, reserve_floor: u64) -> Result<()> {
    require!(
        amount <= vault_balance,
        PresaleError::InsufficientVaultBalance
    );
    require!(
        vault_balance.safe_sub(amount)? >= reserve_floor,
        PresaleError::ReserveViolation
    );
    Ok(())
}

#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub buyer: Pubkey,
    pub purchased_quote: u64,
    pub purchased_tokens: u64,
    pub last_buy_time: u64,
    pub claimed: bool,
    pub bump: u8,
}

impl UserInfo {
    // buyer + purchased_quote + purchased_tokens + last_buy_time + claimed + bump
    pub const LEN: usize = 32 + 8 + 8 + 8 + 1 + 1;

    /// A zeroed ledger is bound to the first buyer that touches it.
    pub fn bind(&mut self, buyer: Pubkey, bump: u8) -> Result<()> {
        if self.buyer == Pubkey::default() {
            self.buyer = buyer;
            self.bump = bump;
        }
        require_keys_eq!(self.buyer, buyer, PresaleError::Unauthorized);
        Ok(())
    }
}

#![allow(unexpected_cfgs)]

use anchor_lang::prelude::*;
use anchor_lang::system_program;
use anchor_spl::associated_token::{get_associated_token_address, AssociatedToken};
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

pub mod constants;
pub mod errors;
pub mod events;
pub mod loader;
pub mod math;
pub mod pda;
pub mod state;

use constants::*;
use errors::PresaleError;
use events::*;
use loader::{load_account, load_account_or_default, store_account, token_amount_or_zero};
use math::{SafeCast, SafeMath};
use state::*;

declare_id!("3KcNhXnuUNZtxNPaboA2JSWDiX4jBiMkvwuAXF81oa6v");

/// Current cluster time in milliseconds.
fn now_millis() -> Result<u64> {
    let unix_timestamp = Clock::get()?.unix_timestamp;
    Ok(unix_timestamp.safe_mul(MILLIS_PER_SECOND)?.safe_cast()?)
}

/// Lamports the vault must keep to stay rent exempt.
fn vault_reserve_floor() -> Result<u64> {
    Ok(Rent::get()?.minimum_balance(0))
}

#[program]
pub mod presale {
    use super::*;

    // Create the singleton presale config and fund the vault's rent reserve
    pub fn create_presale(
        ctx: Context<CreatePresale>,
        token_mint: Pubkey,
        soft_cap: u64,
        hard_cap: u64,
        max_per_address: u64,
        price_per_token: u64,
    ) -> Result<()> {
        let params = PresaleParams {
            soft_cap,
            hard_cap,
            max_per_address,
            price_per_token,
        };
        let authority = ctx.accounts.authority.key();
        ctx.accounts.presale_info.initialize(
            authority,
            token_mint,
            params,
            ctx.bumps.presale_info,
            ctx.bumps.presale_vault,
        )?;

        let reserve_floor = vault_reserve_floor()?;
        let vault_lamports = ctx.accounts.presale_vault.lamports();
        if vault_lamports < reserve_floor {
            system_program::transfer(
                CpiContext::new(
                    ctx.accounts.system_program.to_account_info(),
                    system_program::Transfer {
                        from: ctx.accounts.authority.to_account_info(),
                        to: ctx.accounts.presale_vault.to_account_info(),
                    },
                ),
                reserve_floor.safe_sub(vault_lamports)?,
            )?;
        }

        emit!(PresaleCreated {
            authority,
            token_mint,
            soft_cap,
            hard_cap,
            max_per_address,
            price_per_token,
        });
        msg!("Presale created by {} for mint {}", authority, token_mint);
        Ok(())
    }

    // Change caps and price before any capital has moved
    pub fn update_presale(
        ctx: Context<UpdatePresale>,
        soft_cap: u64,
        hard_cap: u64,
        max_per_address: u64,
        price_per_token: u64,
    ) -> Result<()> {
        let params = PresaleParams {
            soft_cap,
            hard_cap,
            max_per_address,
            price_per_token,
        };
        let now = now_millis()?;
        ctx.accounts
            .presale_info
            .update(&ctx.accounts.authority.key(), params, now)?;

        emit!(PresaleUpdated {
            soft_cap,
            hard_cap,
            max_per_address,
            price_per_token,
        });
        msg!("Presale updated");
        Ok(())
    }

    // Stock the custody account with sale tokens
    pub fn deposit_token(ctx: Context<DepositToken>, amount: u64) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        ctx.accounts.presale_info.record_deposit(&authority, amount)?;

        let cpi_accounts = Transfer {
            from: ctx.accounts.from_associated_token_account.to_account_info(),
            to: ctx.accounts.to_associated_token_account.to_account_info(),
            authority: ctx.accounts.authority.to_account_info(),
        };
        let cpi_program = ctx.accounts.token_program.to_account_info();
        token::transfer(CpiContext::new(cpi_program, cpi_accounts), amount)?;

        emit!(TokenDeposited {
            authority,
            amount,
            total_deposited: ctx.accounts.presale_info.total_deposited,
        });
        msg!("Deposited {} presale tokens", amount);
        Ok(())
    }

    // Schedule the purchase window, in milliseconds
    pub fn start_presale(ctx: Context<StartPresale>, start_time: u64, end_time: u64) -> Result<()> {
        let now = now_millis()?;
        ctx.accounts.presale_info.schedule(
            &ctx.accounts.authority.key(),
            start_time,
            end_time,
            now,
        )?;

        emit!(PresaleStarted {
            start_time,
            end_time,
        });
        msg!("Presale window set: {} - {}", start_time, end_time);
        Ok(())
    }

    // Pay lamports into the vault for a floor(quote / price) token allocation
    pub fn buy_token(ctx: Context<BuyToken>, quote_amount: u64) -> Result<()> {
        let now = now_millis()?;
        let buyer = ctx.accounts.buyer.key();

        let presale_info_account = ctx.accounts.presale_info.to_account_info();
        let mut presale_info: PresaleInfo =
            load_account(&presale_info_account, &crate::ID, PresaleError::NotInitialized)?;
        require_keys_eq!(
            ctx.accounts.presale_token_account.key(),
            get_associated_token_address(presale_info_account.key, &presale_info.token_mint),
            anchor_lang::error::ErrorCode::ConstraintAssociated
        );
        let custody_balance = token_amount_or_zero(&ctx.accounts.presale_token_account)?;

        ctx.accounts
            .user_info
            .bind(buyer, ctx.bumps.user_info)?;
        let token_amount = presale_info.buy(
            &mut ctx.accounts.user_info,
            quote_amount,
            now,
            custody_balance,
        )?;
        store_account(&presale_info_account, &presale_info)?;

        system_program::transfer(
            CpiContext::new(
                ctx.accounts.system_program.to_account_info(),
                system_program::Transfer {
                    from: ctx.accounts.buyer.to_account_info(),
                    to: ctx.accounts.presale_vault.to_account_info(),
                },
            ),
            quote_amount,
        )?;

        emit!(TokenBought {
            buyer,
            quote_amount,
            token_amount,
            total_raised: presale_info.total_raised,
            total_sold: presale_info.total_sold,
        });
        msg!(
            "Bought {} tokens for {} lamports (raised {})",
            token_amount,
            quote_amount,
            presale_info.total_raised
        );
        Ok(())
    }

    // Release the buyer's whole allocation after the window closes
    pub fn claim_token(ctx: Context<ClaimToken>) -> Result<()> {
        let now = now_millis()?;
        let custody_balance = ctx.accounts.presale_token_account.amount;
        let mut user_info: UserInfo =
            load_account_or_default(&ctx.accounts.user_info, &crate::ID)?;
        let amount = ctx
            .accounts
            .presale_info
            .claim(&mut user_info, now, custody_balance)?;
        store_account(&ctx.accounts.user_info, &user_info)?;

        let bump = ctx.accounts.presale_info.bump;
        let seeds = &[PRESALE_SEED, &[bump]];
        let signer = &[&seeds[..]];

        let cpi_accounts = Transfer {
            from: ctx.accounts.presale_token_account.to_account_info(),
            to: ctx.accounts.buyer_token_account.to_account_info(),
            authority: ctx.accounts.presale_info.to_account_info(),
        };
        let cpi_program = ctx.accounts.token_program.to_account_info();
        token::transfer(
            CpiContext::new_with_signer(cpi_program, cpi_accounts, signer),
            amount,
        )?;

        emit!(TokenClaimed {
            buyer: ctx.accounts.buyer.key(),
            amount,
            total_claimed: ctx.accounts.presale_info.total_claimed,
        });
        msg!("Claimed {} tokens", amount);
        Ok(())
    }

    // Move unreserved tokens from custody back to the authority
    pub fn withdraw_token(ctx: Context<WithdrawToken>, amount: u64) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        ctx.accounts.presale_info.check_token_withdrawal(
            &authority,
            amount,
            ctx.accounts.presale_token_account.amount,
        )?;

        let bump = ctx.accounts.presale_info.bump;
        let seeds = &[PRESALE_SEED, &[bump]];
        let signer = &[&seeds[..]];

        let cpi_accounts = Transfer {
            from: ctx.accounts.presale_token_account.to_account_info(),
            to: ctx.accounts.authority_token_account.to_account_info(),
            authority: ctx.accounts.presale_info.to_account_info(),
        };
        let cpi_program = ctx.accounts.token_program.to_account_info();
        token::transfer(
            CpiContext::new_with_signer(cpi_program, cpi_accounts, signer),
            amount,
        )?;

        emit!(TokenWithdrawn { authority, amount });
        msg!("Withdrew {} tokens from custody", amount);
        Ok(())
    }

    // Move collected lamports from the vault to the authority
    pub fn withdraw_sol(ctx: Context<WithdrawSol>, amount: u64) -> Result<()> {
        let authority = ctx.accounts.authority.key();
        ctx.accounts.presale_info.check_sol_withdrawal(
            &authority,
            amount,
            ctx.accounts.presale_vault.lamports(),
            vault_reserve_floor()?,
        )?;

        let vault_bump = ctx.accounts.presale_info.vault_bump;
        let seeds = &[PRESALE_VAULT, &[vault_bump]];
        let signer = &[&seeds[..]];

        system_program::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.system_program.to_account_info(),
                system_program::Transfer {
                    from: ctx.accounts.presale_vault.to_account_info(),
                    to: ctx.accounts.authority.to_account_info(),
                },
                signer,
            ),
            amount,
        )?;

        emit!(SolWithdrawn { authority, amount });
        msg!("Withdrew {} lamports from vault", amount);
        Ok(())
    }

    // Return a buyer's lamports when the sale ended under its soft cap
    pub fn require_refund(ctx: Context<RequireRefund>) -> Result<()> {
        let now = now_millis()?;
        let vault_balance = ctx.accounts.presale_vault.lamports();
        let mut user_info: UserInfo =
            load_account_or_default(&ctx.accounts.user_info, &crate::ID)?;
        let amount = ctx.accounts.presale_info.refund(
            &mut user_info,
            now,
            vault_balance,
            vault_reserve_floor()?,
        )?;
        store_account(&ctx.accounts.user_info, &user_info)?;

        let vault_bump = ctx.accounts.presale_info.vault_bump;
        let seeds = &[PRESALE_VAULT, &[vault_bump]];
        let signer = &[&seeds[..]];

        system_program::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.system_program.to_account_info(),
                system_program::Transfer {
                    from: ctx.accounts.presale_vault.to_account_info(),
                    to: ctx.accounts.buyer.to_account_info(),
                },
                signer,
            ),
            amount,
        )?;

        emit!(Refunded {
            buyer: ctx.accounts.buyer.key(),
            amount,
            total_refunded: ctx.accounts.presale_info.total_refunded,
        });
        msg!("Refund of {} lamports processed", amount);
        Ok(())
    }
}

// Account Structures

#[derive(Accounts)]
pub struct CreatePresale<'info> {
    // Existing config is loaded so a second create fails with AlreadyInitialized
    #[account(
        init_if_needed,
        payer = authority,
        space = 8 + PresaleInfo::LEN,
        seeds = [PRESALE_SEED],
        bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    #[account(
        mut,
        seeds = [PRESALE_VAULT],
        bump
    )]
    pub presale_vault: SystemAccount<'info>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct UpdatePresale<'info> {
    #[account(
        mut,
        seeds = [PRESALE_SEED],
        bump = presale_info.bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct StartPresale<'info> {
    #[account(
        mut,
        seeds = [PRESALE_SEED],
        bump = presale_info.bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct DepositToken<'info> {
    #[account(
        mut,
        seeds = [PRESALE_SEED],
        bump = presale_info.bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    #[account(address = presale_info.token_mint)]
    pub mint_account: Box<Account<'info, Mint>>,

    #[account(
        mut,
        token::mint = mint_account,
        token::authority = authority
    )]
    pub from_associated_token_account: Box<Account<'info, TokenAccount>>,

    // Custody account: the config PDA's associated token account
    #[account(
        init_if_needed,
        payer = authority,
        associated_token::mint = mint_account,
        associated_token::authority = presale_info
    )]
    pub to_associated_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
}

#[derive(Accounts)]
pub struct BuyToken<'info> {
    /// CHECK: read in the handler so a missing config reports NotInitialized
    #[account(
        mut,
        seeds = [PRESALE_SEED],
        bump
    )]
    pub presale_info: UncheckedAccount<'info>,

    #[account(
        init_if_needed,
        payer = buyer,
        space = 8 + UserInfo::LEN,
        seeds = [USER_SEED, buyer.key().as_ref()],
        bump
    )]
    pub user_info: Box<Account<'info, UserInfo>>,

    #[account(
        mut,
        seeds = [PRESALE_VAULT],
        bump
    )]
    pub presale_vault: SystemAccount<'info>,

    /// CHECK: custody ATA, checked in the handler; absent until the first deposit
    pub presale_token_account: UncheckedAccount<'info>,

    #[account(mut)]
    pub buyer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct ClaimToken<'info> {
    #[account(
        mut,
        seeds = [PRESALE_SEED],
        bump = presale_info.bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    /// CHECK: buyer ledger, read in the handler; absent when the buyer never bought
    #[account(
        mut,
        seeds = [USER_SEED, buyer.key().as_ref()],
        bump
    )]
    pub user_info: UncheckedAccount<'info>,

    #[account(address = presale_info.token_mint)]
    pub token_mint: Box<Account<'info, Mint>>,

    #[account(
        mut,
        associated_token::mint = token_mint,
        associated_token::authority = presale_info
    )]
    pub presale_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        init_if_needed,
        payer = buyer,
        associated_token::mint = token_mint,
        associated_token::authority = buyer
    )]
    pub buyer_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub buyer: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
}

#[derive(Accounts)]
pub struct WithdrawToken<'info> {
    #[account(
        seeds = [PRESALE_SEED],
        bump = presale_info.bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    #[account(address = presale_info.token_mint)]
    pub token_mint: Box<Account<'info, Mint>>,

    #[account(
        mut,
        associated_token::mint = token_mint,
        associated_token::authority = presale_info
    )]
    pub presale_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        init_if_needed,
        payer = authority,
        associated_token::mint = token_mint,
        associated_token::authority = authority
    )]
    pub authority_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
}

#[derive(Accounts)]
pub struct WithdrawSol<'info> {
    #[account(
        seeds = [PRESALE_SEED],
        bump = presale_info.bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    #[account(
        mut,
        seeds = [PRESALE_VAULT],
        bump = presale_info.vault_bump
    )]
    pub presale_vault: SystemAccount<'info>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct RequireRefund<'info> {
    #[account(
        mut,
        seeds = [PRESALE_SEED],
        bump = presale_info.bump
    )]
    pub presale_info: Box<Account<'info, PresaleInfo>>,

    /// CHECK: buyer ledger, read in the handler; absent when the buyer never bought
    #[account(
        mut,
        seeds = [USER_SEED, buyer.key().as_ref()],
        bump
    )]
    pub user_info: UncheckedAccount<'info>,

    #[account(
        mut,
        seeds = [PRESALE_VAULT],
        bump = presale_info.vault_bump
    )]
    pub presale_vault: SystemAccount<'info>,

    #[account(mut)]
    pub buyer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

use anchor_lang::prelude::*;

#[error_code]
#[derive(PartialEq)]
pub enum PresaleError {
    #[msg("Presale is already initialized")]
    AlreadyInitialized,
    #[msg("You are not authorized to perform this action")]
    Unauthorized,
    #[msg("Amounts, caps and price must be greater than zero")]
    InvalidParameter,
    #[msg("Soft cap must not exceed hard cap")]
    InvalidCapOrdering,
    #[msg("Start time must be before end time")]
    InvalidWindow,
    #[msg("Presale is already active")]
    SaleAlreadyActive,
    #[msg("Presale not started yet")]
    WindowNotStarted,
    #[msg("Presale already ended")]
    WindowClosed,
    #[msg("Purchase would exceed the hard cap")]
    HardCapExceeded,
    #[msg("Purchase would exceed maximum tokens per address")]
    PerAddressCapExceeded,
    #[msg("Presale not ended yet")]
    SaleNotEnded,
    #[msg("Tokens already claimed")]
    AlreadyClaimed,
    #[msg("No tokens to claim")]
    NothingToClaim,
    #[msg("Insufficient tokens in custody")]
    InsufficientCustodyBalance,
    #[msg("Insufficient lamports in vault")]
    InsufficientVaultBalance,
    #[msg("Withdrawal would leave the vault below its rent reserve")]
    ReserveViolation,
    #[msg("Math operation overflow")]
    ArithmeticOverflow,
    #[msg("Softcap has been reached, refunds are not possible")]
    SoftCapReached,
    #[msg("No funds to refund")]
    NothingToRefund,
    #[msg("Insufficient presale tokens")]
    InsufficientPresaleTokens,
    #[msg("Tokens are reserved for unclaimed purchases")]
    ReservedForBuyers,
    #[msg("Presale is not initialized")]
    NotInitialized,
    #[msg("Proceeds are reserved for refunds until the soft cap is reached")]
    RefundsReserved,
}

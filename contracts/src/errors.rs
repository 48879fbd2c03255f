//! Protocol error definitions.
//!
//! Discriminants are banded by failure category: validation (1xx) is checked
//! before any state read, authorization (2xx) before business rules,
//! state-preconditions (3xx) after reading current state, and economic
//! invariants (4xx) fail closed on oracle or capacity conditions. A failed
//! entry point leaves no partial effects.

use odra::prelude::*;

/// Ledger protocol errors
#[odra::odra_error]
pub enum LedgerError {
    // Validation errors (1xx)
    InvalidAddress = 100,
    ZeroAmount = 101,
    InvalidLtv = 102,
    LtvTooHigh = 103,
    ThresholdTooLow = 104,
    InvalidCreditScore = 105,
    InvalidTierTable = 106,
    InvalidConfig = 107,
    InvalidPrice = 108,

    // Authorization errors (2xx)
    Unauthorized = 200,

    // State-precondition errors (3xx)
    UnsupportedCollateral = 300,
    NoOutstandingDebt = 301,
    LiquidationInProgress = 302,
    NotInLiquidation = 303,
    GracePeriodActive = 304,
    CooldownActive = 305,
    NoPendingWithdrawal = 306,
    WithdrawalAlreadyRequested = 307,
    BelowMinDeposit = 308,
    AboveMaxDeposit = 309,
    DistributionTooSoon = 310,
    NothingToDistribute = 311,
    AccrualTooSoon = 312,
    NothingToClaim = 313,
    ContractPaused = 314,
    InsufficientBalance = 315,

    // Economic-invariant errors (4xx)
    ExceedsCapacity = 400,
    InsufficientCollateral = 401,
    StaleOracle = 402,
    PriceUnavailable = 403,
    InsufficientLiquidity = 404,
    NotLiquidatable = 405,
}

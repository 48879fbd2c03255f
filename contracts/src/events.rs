//! Notifications emitted on every observable state change.

use odra::casper_types::U256;
use odra::prelude::*;

// ===== Collateral / debt ledger =====

#[odra::event]
pub struct CollateralDeposited {
    pub user: Address,
    pub token: Address,
    pub amount: U256,
    pub new_balance: U256,
}

#[odra::event]
pub struct CollateralWithdrawn {
    pub user: Address,
    pub token: Address,
    pub amount: U256,
    pub new_balance: U256,
}

#[odra::event]
pub struct Borrowed {
    pub user: Address,
    pub amount: U256,
    pub new_principal: U256,
}

#[odra::event]
pub struct Repaid {
    pub user: Address,
    pub amount: U256,
    pub interest_paid: U256,
    pub principal_paid: U256,
    pub remaining_debt: U256,
}

#[odra::event]
pub struct InterestRateUpdated {
    pub utilization_bps: u32,
    pub old_rate_bps: u32,
    pub new_rate_bps: u32,
}

#[odra::event]
pub struct UserHistoryUpdated {
    pub user: Address,
    pub first_interaction_ts: u64,
    pub successful_payments: u64,
    pub liquidations: u64,
}

#[odra::event]
pub struct CreditScoreSet {
    pub user: Address,
    pub score: u8,
}

#[odra::event]
pub struct BorrowTiersChanged {
    pub tier_count: u8,
}

// ===== Liquidation =====

#[odra::event]
pub struct LiquidationStarted {
    pub user: Address,
    pub started_at: u64,
    pub ratio_bps: u64,
}

#[odra::event]
pub struct LiquidationExecuted {
    pub user: Address,
    pub liquidator: Address,
    pub debt_covered: U256,
    pub collateral_value_seized: U256,
    pub fully_liquidated: bool,
}

#[odra::event]
pub struct LiquidationCancelled {
    pub user: Address,
}

// ===== Stablecoin registry =====

#[odra::event]
pub struct StablecoinParamsChanged {
    pub token: Address,
    pub is_stable: bool,
    pub ltv: u32,
    pub liquidation_threshold: u32,
}

#[odra::event]
pub struct CollateralAllowed {
    pub token: Address,
    pub allowed: bool,
}

// ===== Price oracle =====

#[odra::event]
pub struct PriceUpdated {
    pub token: Address,
    pub value: U256,
    pub timestamp: u64,
}

#[odra::event]
pub struct PriceFeedSet {
    pub token: Address,
    pub feed: Address,
}

// ===== Lender pool =====

#[odra::event]
pub struct FundsDeposited {
    pub lender: Address,
    pub amount: U256,
    pub new_balance: U256,
}

#[odra::event]
pub struct WithdrawalRequested {
    pub lender: Address,
    pub amount: U256,
    pub requested_at: u64,
}

#[odra::event]
pub struct WithdrawalCompleted {
    pub lender: Address,
    pub amount: U256,
    pub payout: U256,
    pub early: bool,
}

#[odra::event]
pub struct WithdrawalCancelled {
    pub lender: Address,
    pub amount: U256,
}

#[odra::event]
pub struct InterestDistributed {
    pub amount: U256,
    pub total_deposits: U256,
}

#[odra::event]
pub struct InterestClaimed {
    pub lender: Address,
    pub amount: U256,
}

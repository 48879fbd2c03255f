//! Common types used across the lending ledger.

use odra::casper_types::U256;
use odra::prelude::*;

use crate::math::WAD;

/// Liquidation state of a debt position
#[odra::odra_type]
#[derive(Copy, Default)]
pub enum LiquidationStatus {
    /// No liquidation in progress
    #[default]
    Healthy = 0,
    /// Liquidation started, grace period running
    LiquidationStarted = 1,
    /// Liquidation executed (historical)
    Executed = 2,
    /// Liquidation cancelled (historical)
    Cancelled = 3,
}

/// Per-token risk parameters, basis-point scale.
///
/// External setters and getters speak percent; see [`crate::math`] for the
/// boundary conversions.
#[odra::odra_type]
pub struct TokenRiskConfig {
    /// Whether the token is a vetted stablecoin
    pub is_stable: bool,
    /// Loan-to-value in basis points
    pub ltv_bps: u32,
    /// Liquidation threshold in basis points
    pub liquidation_threshold_bps: u32,
}

/// One credit-score bucket of the borrow tier table.
///
/// Tiers are ordered and must partition the score range [0, 100].
#[odra::odra_type]
#[derive(Copy)]
pub struct BorrowTier {
    /// Lowest score in this tier (inclusive)
    pub min_score: u8,
    /// Highest score in this tier (inclusive)
    pub max_score: u8,
    /// Required collateral ratio in basis points
    pub collateral_ratio_bps: u32,
    /// Signed adjustment to the pool borrow rate, in basis points
    pub interest_rate_modifier_bps: i32,
    /// Maximum loan as a fraction of available pool liquidity, in basis points
    pub max_loan_fraction_bps: u32,
}

/// Borrow terms resolved for a user: tier parameters plus the absolute
/// loan ceiling derived from current pool liquidity.
#[odra::odra_type]
pub struct BorrowTerms {
    /// Required collateral ratio in basis points
    pub collateral_ratio_bps: u32,
    /// Signed rate adjustment in basis points
    pub interest_rate_modifier_bps: i32,
    /// Maximum borrowable amount right now
    pub max_loan_amount: U256,
}

/// A user's debt position
#[odra::odra_type]
#[derive(Default)]
pub struct DebtPosition {
    /// Outstanding principal
    pub principal: U256,
    /// Interest accrued and not yet repaid
    pub accrued_interest: U256,
    /// Last interest accrual timestamp
    pub last_accrual_ts: u64,
}

/// Lifetime interaction record, created lazily on first interaction.
#[odra::odra_type]
#[derive(Default)]
pub struct UserHistory {
    /// Timestamp of the user's first borrow; set once, never updated
    pub first_interaction_ts: u64,
    /// Completed repay/installment calls; exactly one increment per call
    pub successful_payments: u64,
    /// Executed liquidations against this user; exactly one increment each
    pub liquidations: u64,
}

/// Per-user liquidation record
#[odra::odra_type]
#[derive(Default)]
pub struct LiquidationRecord {
    /// When the current/most recent liquidation was started
    pub started_at: u64,
    /// Current status
    pub status: LiquidationStatus,
}

/// A lender's principal withdrawal request. An amount of zero means no
/// request is pending.
#[odra::odra_type]
#[derive(Default)]
pub struct WithdrawalRequest {
    /// Requested amount
    pub amount: U256,
    /// Request timestamp (cooldown start)
    pub requested_at: u64,
}

/// A lender's pool account
#[odra::odra_type]
#[derive(Default)]
pub struct LenderAccount {
    /// Deposited principal
    pub balance: U256,
    /// Interest settled to this account and not yet claimed
    pub pending_interest: U256,
    /// Cumulative interest claimed
    pub earned_interest: U256,
    /// Interest-per-share accumulator snapshot at last settlement
    pub reward_snapshot: U256,
    /// Last time interest was settled to this account
    pub last_distribution_ts: u64,
}

/// Price reading held by the oracle adapter
#[odra::odra_type]
pub struct PriceData {
    /// USD price per whole token, wad-scaled (1e18)
    pub value: U256,
    /// Timestamp of the reading
    pub timestamp: u64,
}

/// Borrow-rate model parameters
#[odra::odra_type]
pub struct InterestRateConfig {
    /// Base borrow rate in basis points
    pub base_rate_bps: u32,
    /// Additional rate at 100% utilization, in basis points
    pub slope_bps: u32,
    /// Hard cap on the borrow rate
    pub max_rate_bps: u32,
    /// Largest allowed rate move per accrual step
    pub max_rate_change_bps: u32,
    /// Minimum seconds between accrual runs
    pub update_interval: u64,
}

impl Default for InterestRateConfig {
    fn default() -> Self {
        Self {
            base_rate_bps: 200,        // 2% APR floor
            slope_bps: 1000,           // +10% APR at full utilization
            max_rate_bps: 4000,        // 40% APR cap
            max_rate_change_bps: 500,  // 5% max move per step
            update_interval: 86_400,   // daily
        }
    }
}

/// Liquidation parameters
#[odra::odra_type]
pub struct LiquidationConfig {
    /// Penalty charged on liquidated debt, in basis points
    pub penalty_bps: u32,
    /// Seconds between start and earliest execution
    pub grace_period: u64,
    /// Smallest debt a partial liquidation may leave behind
    pub min_remaining_debt: U256,
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            penalty_bps: 1000, // 10%
            grace_period: 3600,
            min_remaining_debt: U256::from(WAD),
        }
    }
}

/// Lender pool parameters
#[odra::odra_type]
pub struct PoolConfig {
    /// Minimum single deposit
    pub min_deposit: U256,
    /// Maximum single deposit
    pub max_deposit: U256,
    /// Seconds between withdrawal request and penalty-free completion
    pub withdrawal_cooldown: u64,
    /// Minimum seconds between interest distributions
    pub distribution_interval: u64,
    /// Whether completing before the cooldown is allowed at all
    pub early_exit_allowed: bool,
    /// Penalty on early completion, in basis points
    pub early_exit_penalty_bps: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_deposit: U256::from(WAD),
            max_deposit: U256::from(1_000_000u64) * U256::from(WAD),
            withdrawal_cooldown: 604_800, // 7 days
            distribution_interval: 86_400,
            early_exit_allowed: true,
            early_exit_penalty_bps: 500, // 5%
        }
    }
}

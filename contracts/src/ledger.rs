//! Credit Ledger Contract
//!
//! The single authoritative writer of borrower state: collateral balances,
//! credit-tiered debt positions, interest accrual, user history, and the
//! liquidation state machine.
//!
//! Every entry point is one atomic transaction. Operations that gate a
//! mutation on price data (borrow, collateral withdrawal, liquidation)
//! read the oracle and apply the mutation within the same call, and
//! liquidation re-validates position health at execution time, so no stale
//! read can authorize a state change.
//!
//! Liquidation flow:
//! 1. `start_liquidation`: ratio below the position's liquidation
//!    threshold (fresh prices mandatory), records the start time
//! 2. grace period elapses
//! 3. `execute_liquidation`: health re-checked; collateral worth
//!    `debt * (1 + penalty)` is seized to the liquidator (the penalty
//!    margin is the liquidator's bonus) and the debt is cleared, or
//!    reduced proportionally when collateral cannot cover it
//! 4. `cancel_liquidation`: escape hatch back to a healthy record

use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;

use crate::access_control::{AccessControlContractRef, ACTION_LIQUIDATE, ACTION_SET_PARAMS};
use crate::credit_tiers;
use crate::errors::LedgerError;
use crate::events::{
    Borrowed, BorrowTiersChanged, CollateralDeposited, CollateralWithdrawn, CreditScoreSet,
    InterestRateUpdated, LiquidationCancelled, LiquidationExecuted, LiquidationStarted, Repaid,
    UserHistoryUpdated,
};
use crate::interest;
use crate::lender_pool::LenderPoolContractRef;
use crate::math::{apply_bps, collateral_ratio_bps, token_value, value_to_amount, BPS_SCALE};
use crate::price_oracle::PriceOracleContractRef;
use crate::stablecoin_registry::{self, StablecoinRegistryContractRef};
use crate::types::{
    BorrowTerms, BorrowTier, DebtPosition, InterestRateConfig, LiquidationConfig,
    LiquidationRecord, LiquidationStatus, UserHistory,
};

/// Hard ceiling on the configurable liquidation penalty (50%)
const MAX_LIQUIDATION_PENALTY_BPS: u32 = 5000;

/// Outcome of the liquidation amount calculation
struct LiquidationSplit {
    /// Debt the liquidator covers
    debt_covered: U256,
    /// Collateral value to seize in return
    seize_value: U256,
}

/// Decide how much debt a liquidation covers and how much collateral value
/// is seized for it. Full liquidation seizes `debt * (1 + penalty)`; when
/// collateral falls short, the covered debt shrinks proportionally, except
/// that a remainder below `min_remaining_debt` is cleared with the position
/// (dust debt is not worth a second liquidation round).
fn split_liquidation(
    debt: U256,
    collateral_value: U256,
    penalty_bps: u32,
    min_remaining_debt: U256,
) -> LiquidationSplit {
    let penalty_multiplier = U256::from(BPS_SCALE + penalty_bps);
    let needed_value = debt * penalty_multiplier / U256::from(BPS_SCALE);

    if collateral_value >= needed_value {
        return LiquidationSplit { debt_covered: debt, seize_value: needed_value };
    }

    let covered = collateral_value * U256::from(BPS_SCALE) / penalty_multiplier;
    let remaining = debt - covered;
    if remaining < min_remaining_debt {
        LiquidationSplit { debt_covered: debt, seize_value: collateral_value }
    } else {
        LiquidationSplit { debt_covered: covered, seize_value: collateral_value }
    }
}

/// Credit Ledger Contract
#[odra::module(events = [
    CollateralDeposited,
    CollateralWithdrawn,
    Borrowed,
    Repaid,
    InterestRateUpdated,
    UserHistoryUpdated,
    CreditScoreSet,
    BorrowTiersChanged,
    LiquidationStarted,
    LiquidationExecuted,
    LiquidationCancelled
])]
pub struct CreditLedger {
    /// Access control contract address
    access_control: Var<Address>,
    /// Stablecoin registry contract address
    registry: Var<Address>,
    /// Price oracle contract address
    oracle: Var<Address>,
    /// Lender pool contract address
    lender_pool: Var<Address>,

    // === Collateral ledger ===
    /// (user, token) -> balance
    collateral: Mapping<(Address, Address), U256>,
    /// (user, index) -> token, for enumerating held tokens
    held_tokens: Mapping<(Address, u32), Address>,
    /// (user, token) -> index + 1 into the held list; 0 = not held
    held_token_index: Mapping<(Address, Address), u32>,
    /// Number of tokens a user currently holds
    held_token_count: Mapping<Address, u32>,

    // === Credit tiers ===
    /// Admin-set credit scores; absence resolves to the lowest tier
    credit_scores: Mapping<Address, u8>,
    /// Ordered tier table partitioning [0, 100]
    tiers: Mapping<u8, BorrowTier>,
    /// Number of tiers in the table
    tier_count: Var<u8>,

    // === Debt ledger ===
    /// Per-user debt positions
    debts: Mapping<Address, DebtPosition>,
    /// Sum of outstanding principal
    total_principal: Var<U256>,
    /// Current pool borrow rate in basis points
    current_rate_bps: Var<u32>,
    /// Rate model parameters
    rate_config: Var<InterestRateConfig>,
    /// Last rate accrual run
    last_rate_update: Var<u64>,

    // === User history ===
    histories: Mapping<Address, UserHistory>,

    // === Liquidation ===
    /// Per-user liquidation records
    liquidation_records: Mapping<Address, LiquidationRecord>,
    /// Liquidation parameters
    liquidation_config: Var<LiquidationConfig>,
    /// Total liquidations executed
    total_liquidations: Var<u64>,
    /// Cumulative debt covered by liquidations
    total_debt_liquidated: Var<U256>,
    /// Cumulative collateral value seized
    total_collateral_seized: Var<U256>,

    /// Circuit breaker
    paused: Var<bool>,
}

#[odra::module]
impl CreditLedger {
    /// Initialize the ledger and wire its collaborators
    pub fn init(
        &mut self,
        access_control: Address,
        registry: Address,
        oracle: Address,
        lender_pool: Address,
    ) {
        self.access_control.set(access_control);
        self.registry.set(registry);
        self.oracle.set(oracle);
        self.lender_pool.set(lender_pool);

        self.store_tier_table(&credit_tiers::default_tier_table());

        let rate_config = InterestRateConfig::default();
        self.current_rate_bps.set(rate_config.base_rate_bps);
        self.rate_config.set(rate_config);
        self.last_rate_update.set(0);

        self.liquidation_config.set(LiquidationConfig::default());
        self.total_principal.set(U256::zero());
        self.total_liquidations.set(0);
        self.total_debt_liquidated.set(U256::zero());
        self.total_collateral_seized.set(U256::zero());
        self.paused.set(false);
    }

    // ========== Collateral Functions ==========

    /// Deposit an allow-listed token as collateral
    pub fn deposit_collateral(&mut self, token: Address, amount: U256) {
        self.require_not_paused();
        if amount.is_zero() {
            self.env().revert(LedgerError::ZeroAmount);
        }
        if !self.registry_ref().is_allowed(token) {
            self.env().revert(LedgerError::UnsupportedCollateral);
        }

        let user = self.env().caller();
        let new_balance = self.credit_collateral(user, token, amount);

        self.env().emit_event(CollateralDeposited { user, token, amount, new_balance });
    }

    /// Withdraw collateral. With open debt, the remaining collateral must
    /// still satisfy the user's tier ratio at fresh prices.
    pub fn withdraw_collateral(&mut self, token: Address, amount: U256) {
        self.require_not_paused();
        if amount.is_zero() {
            self.env().revert(LedgerError::ZeroAmount);
        }

        let user = self.env().caller();
        let balance = self.collateral.get(&(user, token)).unwrap_or(U256::zero());
        if amount > balance {
            self.env().revert(LedgerError::InsufficientCollateral);
        }

        self.accrue_user(user);
        let position = self.debts.get(&user).unwrap_or_default();
        let debt = position.principal + position.accrued_interest;

        if !debt.is_zero() {
            let price = self.fresh_price(token);
            let value = self.collateral_value(user);
            let withdrawn_value = token_value(amount, price);
            let remaining_value = value - withdrawn_value;
            let tier = self.tier_of(user);
            if collateral_ratio_bps(remaining_value, debt) < tier.collateral_ratio_bps as u64 {
                self.env().revert(LedgerError::InsufficientCollateral);
            }
        }

        let new_balance = self.debit_collateral(user, token, amount);

        self.env().emit_event(CollateralWithdrawn { user, token, amount, new_balance });
    }

    /// Aggregate USD value of a user's collateral at fresh prices.
    /// Fails closed with `StaleOracle` when any consulted price is stale.
    pub fn get_total_collateral_value(&self, user: Address) -> U256 {
        self.collateral_value(user)
    }

    /// Balance of one collateral token
    pub fn collateral_of(&self, user: Address, token: Address) -> U256 {
        self.collateral.get(&(user, token)).unwrap_or(U256::zero())
    }

    /// Tokens the user currently holds as collateral
    pub fn held_tokens_of(&self, user: Address) -> Vec<Address> {
        let count = self.held_token_count.get(&user).unwrap_or(0);
        let mut tokens = Vec::new();
        for index in 0..count {
            if let Some(token) = self.held_tokens.get(&(user, index)) {
                tokens.push(token);
            }
        }
        tokens
    }

    // ========== Borrow / Repay ==========

    /// Borrow against deposited collateral, within the credit tier's
    /// collateral ratio and pool-capacity ceiling.
    pub fn borrow(&mut self, amount: U256) {
        self.require_not_paused();
        if amount.is_zero() {
            self.env().revert(LedgerError::ZeroAmount);
        }

        let user = self.env().caller();
        let record = self.liquidation_records.get(&user).unwrap_or_default();
        if record.status == LiquidationStatus::LiquidationStarted {
            self.env().revert(LedgerError::LiquidationInProgress);
        }

        self.accrue_user(user);
        let terms = self.borrow_terms_internal(user);
        if amount > terms.max_loan_amount {
            self.env().revert(LedgerError::ExceedsCapacity);
        }

        let mut position = self.debts.get(&user).unwrap_or_default();
        let value = self.collateral_value(user);
        let new_debt = position.principal + position.accrued_interest + amount;
        if collateral_ratio_bps(value, new_debt) < terms.collateral_ratio_bps as u64 {
            self.env().revert(LedgerError::InsufficientCollateral);
        }

        let mut pool = self.pool_ref();
        pool.lend_out(amount);

        position.principal = position.principal + amount;
        self.debts.set(&user, position.clone());
        let total = self.total_principal.get().unwrap_or(U256::zero());
        self.total_principal.set(total + amount);

        // First-ever borrow stamps the history record, exactly once
        let mut history = self.histories.get(&user).unwrap_or_default();
        if history.first_interaction_ts == 0 {
            history.first_interaction_ts = self.env().get_block_time();
            self.histories.set(&user, history.clone());
            self.emit_history(user, &history);
        }

        self.env().emit_event(Borrowed {
            user,
            amount,
            new_principal: position.principal,
        });
    }

    /// Repay debt: accrued interest first, then principal, clamped at zero.
    /// Counts as exactly one successful payment regardless of amount.
    pub fn repay(&mut self, amount: U256) {
        self.apply_repayment(amount);
    }

    /// Installment repayment; same contract as `repay`, including the
    /// single history increment.
    pub fn repay_installment(&mut self, amount: U256) {
        self.apply_repayment(amount);
    }

    /// Update the pool borrow rate from utilization. Permissionless, at
    /// most once per update interval; the move is bounded per step.
    pub fn accrue_interest(&mut self) {
        let now = self.env().get_block_time();
        let config = self.rate_config.get_or_default();
        let last = self.last_rate_update.get().unwrap_or(0);
        if last != 0 && now < last + config.update_interval {
            self.env().revert(LedgerError::AccrualTooSoon);
        }

        let pool = self.pool_ref();
        let utilization =
            interest::utilization_bps(pool.get_total_lent(), pool.get_total_deposited());
        let old_rate = self.current_rate_bps.get().unwrap_or(config.base_rate_bps);
        let target = interest::target_rate_bps(&config, utilization);
        let new_rate = interest::step_rate_bps(old_rate, target, config.max_rate_change_bps);

        self.current_rate_bps.set(new_rate);
        self.last_rate_update.set(now);

        self.env().emit_event(InterestRateUpdated {
            utilization_bps: utilization,
            old_rate_bps: old_rate,
            new_rate_bps: new_rate,
        });
    }

    // ========== Liquidation State Machine ==========

    /// Start liquidating an under-collateralized position (liquidator role).
    /// Requires a fresh oracle read; stale prices fail closed.
    pub fn start_liquidation(&mut self, user: Address) {
        self.require_not_paused();
        self.require_authorized(self.env().caller(), ACTION_LIQUIDATE);

        let record = self.liquidation_records.get(&user).unwrap_or_default();
        if record.status == LiquidationStatus::LiquidationStarted {
            self.env().revert(LedgerError::LiquidationInProgress);
        }

        self.accrue_user(user);
        let position = self.debts.get(&user).unwrap_or_default();
        let debt = position.principal + position.accrued_interest;
        if debt.is_zero() {
            self.env().revert(LedgerError::NoOutstandingDebt);
        }

        let (value, threshold_bps) = self.collateral_profile(user);
        let ratio = collateral_ratio_bps(value, debt);
        if ratio >= threshold_bps {
            self.env().revert(LedgerError::NotLiquidatable);
        }

        let started_at = self.env().get_block_time();
        self.liquidation_records.set(
            &user,
            LiquidationRecord { started_at, status: LiquidationStatus::LiquidationStarted },
        );

        self.env().emit_event(LiquidationStarted { user, started_at, ratio_bps: ratio });
    }

    /// Execute a started liquidation after the grace period. Health is
    /// re-validated against fresh prices at execution time; seized
    /// collateral is credited to the liquidator.
    pub fn execute_liquidation(&mut self, user: Address) {
        self.require_not_paused();
        let liquidator = self.env().caller();
        self.require_authorized(liquidator, ACTION_LIQUIDATE);

        let record = self.liquidation_records.get(&user).unwrap_or_default();
        if record.status != LiquidationStatus::LiquidationStarted {
            self.env().revert(LedgerError::NotInLiquidation);
        }
        let config = self.liquidation_config.get_or_default();
        let now = self.env().get_block_time();
        if now < record.started_at + config.grace_period {
            self.env().revert(LedgerError::GracePeriodActive);
        }

        self.accrue_user(user);
        let mut position = self.debts.get(&user).unwrap_or_default();
        let debt = position.principal + position.accrued_interest;
        if debt.is_zero() {
            self.env().revert(LedgerError::NotLiquidatable);
        }

        let (value, threshold_bps) = self.collateral_profile(user);
        if collateral_ratio_bps(value, debt) >= threshold_bps {
            self.env().revert(LedgerError::NotLiquidatable);
        }

        let split =
            split_liquidation(debt, value, config.penalty_bps, config.min_remaining_debt);
        let seized_value = self.seize_collateral(user, liquidator, split.seize_value);

        // Interest is cleared before principal, like a repayment
        let interest_covered = split.debt_covered.min(position.accrued_interest);
        let principal_covered = split.debt_covered - interest_covered;
        position.accrued_interest = position.accrued_interest - interest_covered;
        position.principal = position.principal - principal_covered;
        self.debts.set(&user, position.clone());

        let total = self.total_principal.get().unwrap_or(U256::zero());
        if principal_covered <= total {
            self.total_principal.set(total - principal_covered);
        } else {
            self.total_principal.set(U256::zero());
        }

        let mut pool = self.pool_ref();
        if !principal_covered.is_zero() {
            pool.repay_principal(principal_covered);
        }
        if !interest_covered.is_zero() {
            pool.record_interest_income(interest_covered);
        }

        let mut history = self.histories.get(&user).unwrap_or_default();
        history.liquidations += 1;
        self.histories.set(&user, history.clone());

        self.liquidation_records.set(
            &user,
            LiquidationRecord {
                started_at: record.started_at,
                status: LiquidationStatus::Executed,
            },
        );

        let liquidation_count = self.total_liquidations.get().unwrap_or(0);
        self.total_liquidations.set(liquidation_count + 1);
        let debt_total = self.total_debt_liquidated.get().unwrap_or(U256::zero());
        self.total_debt_liquidated.set(debt_total + split.debt_covered);
        let seized_total = self.total_collateral_seized.get().unwrap_or(U256::zero());
        self.total_collateral_seized.set(seized_total + seized_value);

        let fully_liquidated =
            position.principal.is_zero() && position.accrued_interest.is_zero();

        self.emit_history(user, &history);
        self.env().emit_event(LiquidationExecuted {
            user,
            liquidator,
            debt_covered: split.debt_covered,
            collateral_value_seized: seized_value,
            fully_liquidated,
        });
    }

    /// Abort a started liquidation (liquidator role). The record becomes
    /// historical and the position is treated as healthy again.
    pub fn cancel_liquidation(&mut self, user: Address) {
        self.require_authorized(self.env().caller(), ACTION_LIQUIDATE);

        let record = self.liquidation_records.get(&user).unwrap_or_default();
        if record.status != LiquidationStatus::LiquidationStarted {
            self.env().revert(LedgerError::NotInLiquidation);
        }

        self.liquidation_records.set(
            &user,
            LiquidationRecord {
                started_at: record.started_at,
                status: LiquidationStatus::Cancelled,
            },
        );

        self.env().emit_event(LiquidationCancelled { user });
    }

    // ========== Query Functions ==========

    /// Borrow terms for a user: tier ratio, rate modifier, and the current
    /// absolute loan ceiling.
    pub fn get_borrow_terms(&self, user: Address) -> BorrowTerms {
        self.borrow_terms_internal(user)
    }

    /// Current collateral ratio in basis points at fresh prices.
    /// `u64::MAX` when the user has no debt.
    pub fn check_collateralization(&self, user: Address) -> u64 {
        let debt = self.debt_of(user);
        if debt.is_zero() {
            return u64::MAX;
        }
        collateral_ratio_bps(self.collateral_value(user), debt)
    }

    /// Debt including interest pending since the last accrual
    pub fn debt_of(&self, user: Address) -> U256 {
        let position = self.debts.get(&user).unwrap_or_default();
        let debt = position.principal + position.accrued_interest;
        if debt.is_zero() {
            return U256::zero();
        }
        let rate = self.effective_rate_of(user);
        debt + interest::accrued_interest(
            debt,
            rate,
            position.last_accrual_ts,
            self.env().get_block_time(),
        )
    }

    /// Stored debt position (principal and settled interest)
    pub fn get_debt_position(&self, user: Address) -> DebtPosition {
        self.debts.get(&user).unwrap_or_default()
    }

    /// Lifetime interaction record
    pub fn get_user_history(&self, user: Address) -> UserHistory {
        self.histories.get(&user).unwrap_or_default()
    }

    /// Admin-set credit score; unset users score 0
    pub fn get_credit_score(&self, user: Address) -> u8 {
        self.credit_scores.get(&user).unwrap_or(0)
    }

    /// The user's tier index and tier parameters
    pub fn get_interest_tier(&self, user: Address) -> (u8, BorrowTier) {
        let tiers = self.load_tier_table();
        let score = self.get_credit_score(user);
        (credit_tiers::tier_index_for(&tiers, score), credit_tiers::tier_for(&tiers, score))
    }

    /// Current pool borrow rate in basis points
    pub fn get_borrow_rate(&self) -> u32 {
        let config = self.rate_config.get_or_default();
        self.current_rate_bps.get().unwrap_or(config.base_rate_bps)
    }

    /// Effective rate for a user: pool rate adjusted by the tier modifier
    pub fn effective_rate_of(&self, user: Address) -> u32 {
        let config = self.rate_config.get_or_default();
        let tier = self.tier_of(user);
        interest::effective_rate_bps(
            self.get_borrow_rate(),
            tier.interest_rate_modifier_bps,
            config.max_rate_bps,
        )
    }

    /// Interest a user would owe on `amount` borrowed for `duration_seconds`
    /// at their current effective rate.
    pub fn calculate_potential_interest(
        &self,
        user: Address,
        amount: U256,
        duration_seconds: u64,
    ) -> U256 {
        interest::accrued_interest(amount, self.effective_rate_of(user), 0, duration_seconds)
    }

    /// Per-user liquidation record
    pub fn get_liquidation_record(&self, user: Address) -> LiquidationRecord {
        self.liquidation_records.get(&user).unwrap_or_default()
    }

    /// Cumulative liquidation statistics:
    /// (executed count, debt covered, collateral value seized)
    pub fn get_liquidation_stats(&self) -> (u64, U256, U256) {
        (
            self.total_liquidations.get().unwrap_or(0),
            self.total_debt_liquidated.get().unwrap_or(U256::zero()),
            self.total_collateral_seized.get().unwrap_or(U256::zero()),
        )
    }

    /// Sum of outstanding principal across all borrowers
    pub fn get_total_principal(&self) -> U256 {
        self.total_principal.get().unwrap_or(U256::zero())
    }

    /// Whether the ledger is paused
    pub fn is_paused(&self) -> bool {
        self.paused.get().unwrap_or(false)
    }

    // ========== Admin Functions ==========

    /// Set a user's credit score, 0..=100 (admin/timelock)
    pub fn set_credit_score(&mut self, user: Address, score: u8) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if score > credit_tiers::MAX_CREDIT_SCORE {
            self.env().revert(LedgerError::InvalidCreditScore);
        }
        self.credit_scores.set(&user, score);
        self.env().emit_event(CreditScoreSet { user, score });
    }

    /// Replace the borrow tier table (admin/timelock). The table must
    /// partition the score range [0, 100].
    pub fn set_borrow_tiers(&mut self, tiers: Vec<BorrowTier>) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if !credit_tiers::validate_tier_table(&tiers) {
            self.env().revert(LedgerError::InvalidTierTable);
        }
        self.store_tier_table(&tiers);
        self.env().emit_event(BorrowTiersChanged { tier_count: tiers.len() as u8 });
    }

    /// Set the base rate and utilization slope (admin/timelock)
    pub fn set_interest_rate(&mut self, base_rate_bps: u32, slope_bps: u32) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        let mut config = self.rate_config.get_or_default();
        if base_rate_bps > config.max_rate_bps {
            self.env().revert(LedgerError::InvalidConfig);
        }
        config.base_rate_bps = base_rate_bps;
        config.slope_bps = slope_bps;
        self.rate_config.set(config);
    }

    /// Set the borrow rate cap (admin/timelock). The current rate is
    /// clamped down immediately if it exceeds the new cap.
    pub fn set_max_borrow_rate(&mut self, max_rate_bps: u32) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        let mut config = self.rate_config.get_or_default();
        if max_rate_bps < config.base_rate_bps {
            self.env().revert(LedgerError::InvalidConfig);
        }
        config.max_rate_bps = max_rate_bps;
        self.rate_config.set(config);
        let current = self.get_borrow_rate();
        if current > max_rate_bps {
            self.current_rate_bps.set(max_rate_bps);
        }
    }

    /// Set the largest rate move per accrual step (admin/timelock)
    pub fn set_max_rate_change(&mut self, max_rate_change_bps: u32) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if max_rate_change_bps == 0 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        let mut config = self.rate_config.get_or_default();
        config.max_rate_change_bps = max_rate_change_bps;
        self.rate_config.set(config);
    }

    /// Set the minimum interval between rate accrual runs (admin/timelock)
    pub fn set_rate_update_interval(&mut self, seconds: u64) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if seconds == 0 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        let mut config = self.rate_config.get_or_default();
        config.update_interval = seconds;
        self.rate_config.set(config);
    }

    /// Set the liquidation penalty, at most 50% (admin/timelock)
    pub fn set_liquidation_penalty(&mut self, penalty_bps: u32) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if penalty_bps > MAX_LIQUIDATION_PENALTY_BPS {
            self.env().revert(LedgerError::InvalidConfig);
        }
        let mut config = self.liquidation_config.get_or_default();
        config.penalty_bps = penalty_bps;
        self.liquidation_config.set(config);
    }

    /// Set the grace period between start and execution (admin/timelock)
    pub fn set_grace_period(&mut self, seconds: u64) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        let mut config = self.liquidation_config.get_or_default();
        config.grace_period = seconds;
        self.liquidation_config.set(config);
    }

    /// Set the smallest debt a partial liquidation may leave (admin/timelock)
    pub fn set_min_remaining_debt(&mut self, amount: U256) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        let mut config = self.liquidation_config.get_or_default();
        config.min_remaining_debt = amount;
        self.liquidation_config.set(config);
    }

    /// Pause or unpause borrower operations (admin/timelock)
    pub fn set_paused(&mut self, paused: bool) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        self.paused.set(paused);
    }

    // ========== Internal: repayment ==========

    fn apply_repayment(&mut self, amount: U256) {
        self.require_not_paused();
        if amount.is_zero() {
            self.env().revert(LedgerError::ZeroAmount);
        }

        let user = self.env().caller();
        self.accrue_user(user);

        let mut position = self.debts.get(&user).unwrap_or_default();
        let debt = position.principal + position.accrued_interest;
        if debt.is_zero() {
            self.env().revert(LedgerError::NoOutstandingDebt);
        }

        // Excess over the outstanding debt is ignored
        let applied = amount.min(debt);
        let interest_paid = applied.min(position.accrued_interest);
        let principal_paid = applied - interest_paid;

        position.accrued_interest = position.accrued_interest - interest_paid;
        position.principal = position.principal - principal_paid;
        self.debts.set(&user, position.clone());

        let total = self.total_principal.get().unwrap_or(U256::zero());
        if principal_paid <= total {
            self.total_principal.set(total - principal_paid);
        } else {
            self.total_principal.set(U256::zero());
        }

        let mut pool = self.pool_ref();
        if !principal_paid.is_zero() {
            pool.repay_principal(principal_paid);
        }
        if !interest_paid.is_zero() {
            pool.record_interest_income(interest_paid);
        }

        // One increment per completed call, independent of amount
        let mut history = self.histories.get(&user).unwrap_or_default();
        history.successful_payments += 1;
        self.histories.set(&user, history.clone());

        self.emit_history(user, &history);
        self.env().emit_event(Repaid {
            user,
            amount: applied,
            interest_paid,
            principal_paid,
            remaining_debt: position.principal + position.accrued_interest,
        });
    }

    // ========== Internal: interest ==========

    /// Settle interest pending on a position at the user's effective rate
    fn accrue_user(&mut self, user: Address) {
        let mut position = self.debts.get(&user).unwrap_or_default();
        let now = self.env().get_block_time();
        let debt = position.principal + position.accrued_interest;
        if debt.is_zero() {
            position.last_accrual_ts = now;
            self.debts.set(&user, position);
            return;
        }
        let rate = self.effective_rate_of(user);
        let accrued = interest::accrued_interest(debt, rate, position.last_accrual_ts, now);
        if !accrued.is_zero() {
            position.accrued_interest = position.accrued_interest + accrued;
        }
        position.last_accrual_ts = now;
        self.debts.set(&user, position);
    }

    // ========== Internal: collateral ==========

    /// Add collateral, maintaining the held-token index. Returns the new
    /// balance.
    fn credit_collateral(&mut self, user: Address, token: Address, amount: U256) -> U256 {
        let current = self.collateral.get(&(user, token)).unwrap_or(U256::zero());
        if current.is_zero() && self.held_token_index.get(&(user, token)).unwrap_or(0) == 0 {
            let count = self.held_token_count.get(&user).unwrap_or(0);
            self.held_tokens.set(&(user, count), token);
            self.held_token_index.set(&(user, token), count + 1);
            self.held_token_count.set(&user, count + 1);
        }
        let new_balance = current + amount;
        self.collateral.set(&(user, token), new_balance);
        new_balance
    }

    /// Remove collateral; drops the token from the held index when the
    /// balance reaches zero. Callers have checked the balance.
    fn debit_collateral(&mut self, user: Address, token: Address, amount: U256) -> U256 {
        let current = self.collateral.get(&(user, token)).unwrap_or(U256::zero());
        let new_balance = current - amount;
        self.collateral.set(&(user, token), new_balance);
        if new_balance.is_zero() {
            self.remove_held_token(user, token);
        }
        new_balance
    }

    /// Swap-remove a token from the user's held list
    fn remove_held_token(&mut self, user: Address, token: Address) {
        let count = self.held_token_count.get(&user).unwrap_or(0);
        if count == 0 {
            return;
        }
        let index_plus_one = self.held_token_index.get(&(user, token)).unwrap_or(0);
        if index_plus_one == 0 {
            return;
        }
        let index = index_plus_one - 1;
        let last_index = count - 1;
        if index != last_index {
            if let Some(last_token) = self.held_tokens.get(&(user, last_index)) {
                self.held_tokens.set(&(user, index), last_token);
                self.held_token_index.set(&(user, last_token), index + 1);
            }
        }
        self.held_token_index.set(&(user, token), 0);
        self.held_token_count.set(&user, last_index);
    }

    /// Aggregate collateral value at fresh prices
    fn collateral_value(&self, user: Address) -> U256 {
        let count = self.held_token_count.get(&user).unwrap_or(0);
        let mut total = U256::zero();
        for index in 0..count {
            if let Some(token) = self.held_tokens.get(&(user, index)) {
                let balance = self.collateral.get(&(user, token)).unwrap_or(U256::zero());
                if balance.is_zero() {
                    continue;
                }
                total = total + token_value(balance, self.fresh_price(token));
            }
        }
        total
    }

    /// Aggregate collateral value plus the value-weighted liquidation
    /// threshold of the held tokens.
    fn collateral_profile(&self, user: Address) -> (U256, u64) {
        let registry = self.registry_ref();
        let count = self.held_token_count.get(&user).unwrap_or(0);
        let mut total = U256::zero();
        let mut weighted = U256::zero();
        for index in 0..count {
            if let Some(token) = self.held_tokens.get(&(user, index)) {
                let balance = self.collateral.get(&(user, token)).unwrap_or(U256::zero());
                if balance.is_zero() {
                    continue;
                }
                let value = token_value(balance, self.fresh_price(token));
                let params = registry.risk_params_bps(token);
                total = total + value;
                weighted = weighted + value * U256::from(params.liquidation_threshold_bps);
            }
        }
        if total.is_zero() {
            let fallback = stablecoin_registry::default_risk_config();
            return (U256::zero(), fallback.liquidation_threshold_bps as u64);
        }
        (total, (weighted / total).as_u64())
    }

    /// Seize up to `target_value` of collateral from `user` and credit it
    /// to `liquidator`. Returns the value actually seized.
    fn seize_collateral(&mut self, user: Address, liquidator: Address, target_value: U256) -> U256 {
        let tokens = self.held_tokens_of(user);
        let mut remaining = target_value;
        for token in tokens {
            if remaining.is_zero() {
                break;
            }
            let balance = self.collateral.get(&(user, token)).unwrap_or(U256::zero());
            if balance.is_zero() {
                continue;
            }
            let price = self.fresh_price(token);
            let balance_value = token_value(balance, price);
            let (seize_amount, seized_value) = if balance_value <= remaining {
                (balance, balance_value)
            } else {
                let amount = value_to_amount(remaining, price);
                (amount, token_value(amount, price))
            };
            if seize_amount.is_zero() {
                continue;
            }
            self.debit_collateral(user, token, seize_amount);
            self.credit_collateral(liquidator, token, seize_amount);
            remaining = remaining - seized_value.min(remaining);
        }
        target_value - remaining
    }

    // ========== Internal: tiers ==========

    fn store_tier_table(&mut self, tiers: &[BorrowTier]) {
        for (index, tier) in tiers.iter().enumerate() {
            self.tiers.set(&(index as u8), *tier);
        }
        self.tier_count.set(tiers.len() as u8);
    }

    fn load_tier_table(&self) -> Vec<BorrowTier> {
        let count = self.tier_count.get().unwrap_or(0);
        let mut tiers = Vec::new();
        for index in 0..count {
            if let Some(tier) = self.tiers.get(&index) {
                tiers.push(tier);
            }
        }
        tiers
    }

    fn tier_of(&self, user: Address) -> BorrowTier {
        let tiers = self.load_tier_table();
        credit_tiers::tier_for(&tiers, self.get_credit_score(user))
    }

    fn borrow_terms_internal(&self, user: Address) -> BorrowTerms {
        let tier = self.tier_of(user);
        let available = self.pool_ref().available_liquidity();
        BorrowTerms {
            collateral_ratio_bps: tier.collateral_ratio_bps,
            interest_rate_modifier_bps: tier.interest_rate_modifier_bps,
            max_loan_amount: apply_bps(available, tier.max_loan_fraction_bps),
        }
    }

    // ========== Internal: wiring ==========

    fn require_not_paused(&self) {
        if self.paused.get().unwrap_or(false) {
            self.env().revert(LedgerError::ContractPaused);
        }
    }

    fn require_authorized(&self, account: Address, action: u8) {
        let gateway_address = self.access_control.get().expect("access control not set");
        let gateway = AccessControlContractRef::new(self.env().clone(), gateway_address);
        if !gateway.authorize(account, action) {
            self.env().revert(LedgerError::Unauthorized);
        }
    }

    fn fresh_price(&self, token: Address) -> U256 {
        let oracle_address = self.oracle.get().expect("oracle not set");
        PriceOracleContractRef::new(self.env().clone(), oracle_address).fresh_price(token)
    }

    fn registry_ref(&self) -> StablecoinRegistryContractRef {
        let registry_address = self.registry.get().expect("registry not set");
        StablecoinRegistryContractRef::new(self.env().clone(), registry_address)
    }

    fn pool_ref(&self) -> LenderPoolContractRef {
        let pool_address = self.lender_pool.get().expect("lender pool not set");
        LenderPoolContractRef::new(self.env().clone(), pool_address)
    }

    fn emit_history(&self, user: Address, history: &UserHistory) {
        self.env().emit_event(UserHistoryUpdated {
            user,
            first_interaction_ts: history.first_interaction_ts,
            successful_payments: history.successful_payments,
            liquidations: history.liquidations,
        });
    }
}

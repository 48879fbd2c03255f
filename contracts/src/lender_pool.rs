//! Lender Pool Contract
//!
//! Tracks lender principal, distributes borrower interest, and runs the
//! principal withdrawal state machine:
//!
//! `None -> Requested -> Completed` once the cooldown elapses, with the
//! escape `Requested -> Cancelled -> None`. Completing before the cooldown
//! is governed by the configured early-exit policy: either rejected outright
//! or completed minus a fixed penalty, which is folded back into the
//! interest pool for the remaining lenders.
//!
//! Interest distribution is independent of principal withdrawal and has no
//! cooldown: repaid borrower interest accumulates as undistributed income,
//! an interval-gated `distribute_interest` folds it into a cumulative
//! interest-per-share accumulator, and lender accounts settle against that
//! accumulator on every touch.
//!
//! Capacity invariant, enforced here and nowhere else:
//! `total_lent <= total_deposited - total_reserved`.

use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;

use crate::access_control::{AccessControlContractRef, ACTION_POOL_LEND, ACTION_SET_PARAMS};
use crate::errors::LedgerError;
use crate::events::{
    FundsDeposited, InterestClaimed, InterestDistributed, WithdrawalCancelled,
    WithdrawalCompleted, WithdrawalRequested,
};
use crate::math::{apply_bps, WAD};
use crate::types::{LenderAccount, PoolConfig, WithdrawalRequest};

/// Lender Pool Contract
#[odra::module(events = [
    FundsDeposited,
    WithdrawalRequested,
    WithdrawalCompleted,
    WithdrawalCancelled,
    InterestDistributed,
    InterestClaimed
])]
pub struct LenderPool {
    /// Access control contract address
    access_control: Var<Address>,
    /// Lender accounts
    accounts: Mapping<Address, LenderAccount>,
    /// Pending withdrawal requests (amount zero = none)
    requests: Mapping<Address, WithdrawalRequest>,
    /// Total principal deposited
    total_deposited: Var<U256>,
    /// Total principal currently lent out
    total_lent: Var<U256>,
    /// Total principal reserved by pending withdrawal requests
    total_reserved: Var<U256>,
    /// Interest income received and not yet distributed
    undistributed_income: Var<U256>,
    /// Cumulative interest per deposited unit, wad-scaled
    acc_interest_per_share: Var<U256>,
    /// Last interest distribution timestamp
    last_distribution_ts: Var<u64>,
    /// Number of lenders with a non-zero balance
    lender_count: Var<u64>,
    /// Pool parameters
    config: Var<PoolConfig>,
    /// Circuit breaker
    paused: Var<bool>,
}

#[odra::module]
impl LenderPool {
    /// Initialize the pool
    pub fn init(&mut self, access_control: Address) {
        self.access_control.set(access_control);
        self.total_deposited.set(U256::zero());
        self.total_lent.set(U256::zero());
        self.total_reserved.set(U256::zero());
        self.undistributed_income.set(U256::zero());
        self.acc_interest_per_share.set(U256::zero());
        self.last_distribution_ts.set(0);
        self.lender_count.set(0);
        self.config.set(PoolConfig::default());
        self.paused.set(false);
    }

    // ========== Lender Functions ==========

    /// Deposit funds into the pool, bounded by the single-deposit limits
    pub fn deposit_funds(&mut self, amount: U256) {
        self.require_not_paused();
        let config = self.config.get_or_default();
        if amount < config.min_deposit {
            self.env().revert(LedgerError::BelowMinDeposit);
        }
        if amount > config.max_deposit {
            self.env().revert(LedgerError::AboveMaxDeposit);
        }

        let lender = self.env().caller();
        let mut account = self.settled_account(lender);
        if account.balance.is_zero() {
            let count = self.lender_count.get().unwrap_or(0);
            self.lender_count.set(count + 1);
        }
        account.balance = account.balance + amount;
        self.accounts.set(&lender, account.clone());

        let total = self.total_deposited.get().unwrap_or(U256::zero());
        self.total_deposited.set(total + amount);

        self.env().emit_event(FundsDeposited {
            lender,
            amount,
            new_balance: account.balance,
        });
    }

    /// Request withdrawal of principal. Funds do not move yet; the amount is
    /// reserved so it can no longer back new loans.
    pub fn request_withdrawal(&mut self, amount: U256) {
        self.require_not_paused();
        if amount.is_zero() {
            self.env().revert(LedgerError::ZeroAmount);
        }

        let lender = self.env().caller();
        let existing = self.requests.get(&lender).unwrap_or_default();
        if !existing.amount.is_zero() {
            self.env().revert(LedgerError::WithdrawalAlreadyRequested);
        }

        let account = self.accounts.get(&lender).unwrap_or_default();
        if amount > account.balance {
            self.env().revert(LedgerError::InsufficientBalance);
        }
        // Reserving must not strand already-lent funds
        if amount > self.available_liquidity() {
            self.env().revert(LedgerError::InsufficientLiquidity);
        }

        let requested_at = self.env().get_block_time();
        self.requests.set(&lender, WithdrawalRequest { amount, requested_at });

        let reserved = self.total_reserved.get().unwrap_or(U256::zero());
        self.total_reserved.set(reserved + amount);

        self.env().emit_event(WithdrawalRequested { lender, amount, requested_at });
    }

    /// Complete a pending withdrawal. After the cooldown the full amount is
    /// released; before it, the early-exit policy decides between rejection
    /// and completion minus the penalty.
    pub fn complete_withdrawal(&mut self) {
        self.require_not_paused();
        let lender = self.env().caller();

        let request = self.requests.get(&lender).unwrap_or_default();
        if request.amount.is_zero() {
            self.env().revert(LedgerError::NoPendingWithdrawal);
        }

        let config = self.config.get_or_default();
        let now = self.env().get_block_time();
        let early = now < request.requested_at + config.withdrawal_cooldown;
        if early && !config.early_exit_allowed {
            self.env().revert(LedgerError::CooldownActive);
        }

        let mut account = self.settled_account(lender);
        if request.amount > account.balance {
            self.env().revert(LedgerError::InsufficientBalance);
        }

        let penalty = if early {
            apply_bps(request.amount, config.early_exit_penalty_bps)
        } else {
            U256::zero()
        };
        let payout = request.amount - penalty;

        account.balance = account.balance - request.amount;
        if account.balance.is_zero() {
            let count = self.lender_count.get().unwrap_or(0);
            if count > 0 {
                self.lender_count.set(count - 1);
            }
        }
        self.accounts.set(&lender, account);
        self.requests.set(&lender, WithdrawalRequest::default());

        let total = self.total_deposited.get().unwrap_or(U256::zero());
        self.total_deposited.set(total - request.amount);
        let reserved = self.total_reserved.get().unwrap_or(U256::zero());
        self.total_reserved.set(reserved - request.amount);

        // Early-exit penalty accrues to the remaining lenders
        if !penalty.is_zero() {
            let income = self.undistributed_income.get().unwrap_or(U256::zero());
            self.undistributed_income.set(income + penalty);
        }

        self.env().emit_event(WithdrawalCompleted {
            lender,
            amount: request.amount,
            payout,
            early,
        });
    }

    /// Cancel a pending withdrawal without penalty
    pub fn cancel_withdrawal(&mut self) {
        let lender = self.env().caller();
        let request = self.requests.get(&lender).unwrap_or_default();
        if request.amount.is_zero() {
            self.env().revert(LedgerError::NoPendingWithdrawal);
        }

        self.requests.set(&lender, WithdrawalRequest::default());
        let reserved = self.total_reserved.get().unwrap_or(U256::zero());
        self.total_reserved.set(reserved - request.amount);

        self.env().emit_event(WithdrawalCancelled { lender, amount: request.amount });
    }

    /// Fold undistributed interest income into the per-share accumulator.
    /// Permissionless, at most once per distribution interval.
    pub fn distribute_interest(&mut self) {
        let now = self.env().get_block_time();
        let last = self.last_distribution_ts.get().unwrap_or(0);
        let config = self.config.get_or_default();
        if last != 0 && now < last + config.distribution_interval {
            self.env().revert(LedgerError::DistributionTooSoon);
        }

        let income = self.undistributed_income.get().unwrap_or(U256::zero());
        let total = self.total_deposited.get().unwrap_or(U256::zero());
        if income.is_zero() || total.is_zero() {
            self.env().revert(LedgerError::NothingToDistribute);
        }

        let per_share = income * U256::from(WAD) / total;
        let distributed = per_share * total / U256::from(WAD);

        let acc = self.acc_interest_per_share.get().unwrap_or(U256::zero());
        self.acc_interest_per_share.set(acc + per_share);
        // Rounding dust stays queued for the next distribution
        self.undistributed_income.set(income - distributed);
        self.last_distribution_ts.set(now);

        self.env().emit_event(InterestDistributed {
            amount: distributed,
            total_deposits: total,
        });
    }

    /// Move settled pending interest to earned. No cooldown.
    pub fn claim_interest(&mut self) {
        self.require_not_paused();
        let lender = self.env().caller();
        let mut account = self.settled_account(lender);
        if account.pending_interest.is_zero() {
            self.env().revert(LedgerError::NothingToClaim);
        }
        let amount = account.pending_interest;
        account.pending_interest = U256::zero();
        account.earned_interest = account.earned_interest + amount;
        self.accounts.set(&lender, account);

        self.env().emit_event(InterestClaimed { lender, amount });
    }

    // ========== Ledger-Only Capacity Functions ==========

    /// Reserve pool liquidity for a new loan (ledger contract only)
    pub fn lend_out(&mut self, amount: U256) {
        self.require_authorized(self.env().caller(), ACTION_POOL_LEND);
        if amount.is_zero() {
            self.env().revert(LedgerError::ZeroAmount);
        }
        if amount > self.available_liquidity() {
            self.env().revert(LedgerError::ExceedsCapacity);
        }
        let lent = self.total_lent.get().unwrap_or(U256::zero());
        self.total_lent.set(lent + amount);
    }

    /// Return repaid principal to the pool (ledger contract only)
    pub fn repay_principal(&mut self, amount: U256) {
        self.require_authorized(self.env().caller(), ACTION_POOL_LEND);
        let lent = self.total_lent.get().unwrap_or(U256::zero());
        if amount > lent {
            self.total_lent.set(U256::zero());
        } else {
            self.total_lent.set(lent - amount);
        }
    }

    /// Record borrower interest received by the pool (ledger contract only)
    pub fn record_interest_income(&mut self, amount: U256) {
        self.require_authorized(self.env().caller(), ACTION_POOL_LEND);
        let income = self.undistributed_income.get().unwrap_or(U256::zero());
        self.undistributed_income.set(income + amount);
    }

    // ========== Query Functions ==========

    /// Liquidity available for new loans:
    /// `total_deposited - total_lent - total_reserved`
    pub fn available_liquidity(&self) -> U256 {
        let deposited = self.total_deposited.get().unwrap_or(U256::zero());
        let lent = self.total_lent.get().unwrap_or(U256::zero());
        let reserved = self.total_reserved.get().unwrap_or(U256::zero());
        let committed = lent + reserved;
        if committed >= deposited {
            U256::zero()
        } else {
            deposited - committed
        }
    }

    /// Lender account with interest settled against the current accumulator
    pub fn get_lender_account(&self, lender: Address) -> LenderAccount {
        self.settled_account(lender)
    }

    /// Pending withdrawal request; amount zero means none
    pub fn get_withdrawal_request(&self, lender: Address) -> WithdrawalRequest {
        self.requests.get(&lender).unwrap_or_default()
    }

    /// Total principal deposited
    pub fn get_total_deposited(&self) -> U256 {
        self.total_deposited.get().unwrap_or(U256::zero())
    }

    /// Total principal lent out
    pub fn get_total_lent(&self) -> U256 {
        self.total_lent.get().unwrap_or(U256::zero())
    }

    /// Total principal reserved by withdrawal requests
    pub fn get_total_reserved(&self) -> U256 {
        self.total_reserved.get().unwrap_or(U256::zero())
    }

    /// Interest income waiting for the next distribution
    pub fn get_undistributed_income(&self) -> U256 {
        self.undistributed_income.get().unwrap_or(U256::zero())
    }

    /// Number of lenders with a non-zero balance
    pub fn get_lender_count(&self) -> u64 {
        self.lender_count.get().unwrap_or(0)
    }

    /// Pool parameters
    pub fn get_config(&self) -> PoolConfig {
        self.config.get_or_default()
    }

    /// Whether the pool is paused
    pub fn is_paused(&self) -> bool {
        self.paused.get().unwrap_or(false)
    }

    // ========== Admin Functions ==========

    /// Set single-deposit bounds (admin/timelock)
    pub fn set_deposit_limits(&mut self, min_deposit: U256, max_deposit: U256) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if min_deposit > max_deposit {
            self.env().revert(LedgerError::InvalidConfig);
        }
        let mut config = self.config.get_or_default();
        config.min_deposit = min_deposit;
        config.max_deposit = max_deposit;
        self.config.set(config);
    }

    /// Set the withdrawal cooldown (admin/timelock)
    pub fn set_withdrawal_cooldown(&mut self, seconds: u64) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        let mut config = self.config.get_or_default();
        config.withdrawal_cooldown = seconds;
        self.config.set(config);
    }

    /// Set the early-exit policy (admin/timelock)
    pub fn set_early_exit_policy(&mut self, allowed: bool, penalty_bps: u32) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if penalty_bps >= 10_000 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        let mut config = self.config.get_or_default();
        config.early_exit_allowed = allowed;
        config.early_exit_penalty_bps = penalty_bps;
        self.config.set(config);
    }

    /// Set the minimum interval between interest distributions (admin/timelock)
    pub fn set_distribution_interval(&mut self, seconds: u64) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if seconds == 0 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        let mut config = self.config.get_or_default();
        config.distribution_interval = seconds;
        self.config.set(config);
    }

    /// Pause or unpause lender operations (admin/timelock)
    pub fn set_paused(&mut self, paused: bool) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        self.paused.set(paused);
    }

    // ========== Internal ==========

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

    /// Account with interest owed since the last snapshot settled into
    /// `pending_interest`. Callers persist the result.
    fn settled_account(&self, lender: Address) -> LenderAccount {
        let mut account = self.accounts.get(&lender).unwrap_or_default();
        let acc = self.acc_interest_per_share.get().unwrap_or(U256::zero());
        if !account.balance.is_zero() && acc > account.reward_snapshot {
            let owed = account.balance * (acc - account.reward_snapshot) / U256::from(WAD);
            if !owed.is_zero() {
                account.pending_interest = account.pending_interest + owed;
                account.last_distribution_ts = self.last_distribution_ts.get().unwrap_or(0);
            }
        }
        account.reward_snapshot = acc;
        account
    }
}

//! Interest rate model and accrual math.
//!
//! The pool borrow rate follows utilization: `base + slope * utilization`,
//! capped by the configured maximum and moved toward its target by at most
//! `max_rate_change_bps` per accrual step. Debt positions accrue simple
//! interest at their effective rate (pool rate adjusted by the credit
//! tier's signed modifier) over elapsed time.

use odra::casper_types::U256;

use crate::math::BPS_SCALE;
use crate::types::InterestRateConfig;

/// Seconds in a year (365 days)
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Pool utilization in basis points: `lent * 10000 / deposited`.
pub fn utilization_bps(total_lent: U256, total_deposited: U256) -> u32 {
    if total_deposited.is_zero() {
        return 0;
    }
    let scaled = total_lent * U256::from(BPS_SCALE) / total_deposited;
    if scaled > U256::from(BPS_SCALE) {
        BPS_SCALE
    } else {
        scaled.as_u32()
    }
}

/// Target borrow rate for a utilization level, capped at `max_rate_bps`.
pub fn target_rate_bps(config: &InterestRateConfig, utilization_bps: u32) -> u32 {
    let slope_component =
        (config.slope_bps as u64 * utilization_bps as u64 / BPS_SCALE as u64) as u32;
    let rate = config.base_rate_bps + slope_component;
    rate.min(config.max_rate_bps)
}

/// Move the current rate toward the target, bounded by the per-step limit.
pub fn step_rate_bps(current: u32, target: u32, max_change_bps: u32) -> u32 {
    if target > current {
        current + (target - current).min(max_change_bps)
    } else {
        current - (current - target).min(max_change_bps)
    }
}

/// Effective rate for a position: pool rate plus the tier's signed modifier,
/// clamped to `[0, max_rate_bps]`.
pub fn effective_rate_bps(rate_bps: u32, modifier_bps: i32, max_rate_bps: u32) -> u32 {
    let adjusted = rate_bps as i64 + modifier_bps as i64;
    if adjusted <= 0 {
        0
    } else if adjusted as u64 > max_rate_bps as u64 {
        max_rate_bps
    } else {
        adjusted as u32
    }
}

/// Simple interest accrued on `debt` at `rate_bps` APR between two
/// timestamps: `debt * rate * elapsed / (10000 * SECONDS_PER_YEAR)`.
pub fn accrued_interest(debt: U256, rate_bps: u32, last_ts: u64, now: u64) -> U256 {
    if now <= last_ts || debt.is_zero() || rate_bps == 0 {
        return U256::zero();
    }
    let elapsed = now - last_ts;
    debt.checked_mul(U256::from(rate_bps))
        .and_then(|v| v.checked_mul(U256::from(elapsed)))
        .and_then(|v| v.checked_div(U256::from(BPS_SCALE)))
        .and_then(|v| v.checked_div(U256::from(SECONDS_PER_YEAR)))
        .unwrap_or(U256::zero())
}

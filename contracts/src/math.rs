//! Fixed-point helpers shared by the ledger contracts.
//!
//! All risk arithmetic is integer basis points; amounts and prices are
//! wad-scaled (18 decimals) `U256`. Two percentage scales appear at the
//! protocol boundary (percent for the registry API, basis points
//! everywhere internal), so both conversions live here as standalone
//! functions.

use odra::casper_types::U256;

/// Basis points scale (100% = 10000 bps)
pub const BPS_SCALE: u32 = 10_000;

/// Percent scale (100% = 100)
pub const PERCENT_SCALE: u32 = 100;

/// Wad scale (1e18), the unit of amounts and prices
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Convert a percent-scale value to basis points.
pub const fn percent_to_bps(percent: u32) -> u32 {
    percent * (BPS_SCALE / PERCENT_SCALE)
}

/// Convert a basis-point value to percent scale, rounding down.
pub const fn bps_to_percent(bps: u32) -> u32 {
    bps / (BPS_SCALE / PERCENT_SCALE)
}

/// USD value of a token amount at a wad-scaled price.
pub fn token_value(amount: U256, price: U256) -> U256 {
    amount * price / U256::from(WAD)
}

/// Token amount worth a given USD value at a wad-scaled price.
/// Rounds down (conservative for seizure).
pub fn value_to_amount(value: U256, price: U256) -> U256 {
    value * U256::from(WAD) / price
}

/// Collateral ratio in basis points: `value * 10000 / debt`.
/// A position with no debt is reported as `u64::MAX`.
pub fn collateral_ratio_bps(collateral_value: U256, debt: U256) -> u64 {
    if debt.is_zero() {
        return u64::MAX;
    }
    let scaled = collateral_value * U256::from(BPS_SCALE) / debt;
    if scaled > U256::from(u64::MAX) {
        u64::MAX
    } else {
        scaled.as_u64()
    }
}

/// Apply a basis-point fraction to an amount, rounding down.
pub fn apply_bps(amount: U256, bps: u32) -> U256 {
    amount * U256::from(bps) / U256::from(BPS_SCALE)
}

//! Credit Ledger Contracts
//!
//! Casper-native credit-tiered collateralized lending ledger.
//!
//! ## Architecture
//!
//! - **AccessControl**: Role store and authorization policy (governance gateway)
//! - **PriceOracle**: Pushed USD price feeds with staleness checks
//! - **StablecoinRegistry**: Per-token risk parameters and collateral allow-list
//! - **CreditLedger**: Collateral balances, credit-tiered debt positions,
//!   interest accrual, user history, and the liquidation state machine
//! - **LenderPool**: Lender deposits, interest distribution, and the
//!   withdrawal-cooldown state machine
//!
//! ## Writer discipline
//!
//! Every public entry point executes as one atomic transaction: an operation
//! that reads a price and then mutates state does both within the same call,
//! and liquidation re-validates position health at execution time. The
//! CreditLedger is the only writer of borrower state; the LenderPool is the
//! only writer of lender state and enforces the pool-balance invariant
//! (total lent never exceeds total deposited minus reserved withdrawals).

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod events;
pub mod math;
pub mod interest;
pub mod credit_tiers;

// Contract modules
pub mod access_control;
pub mod price_oracle;
pub mod stablecoin_registry;
pub mod lender_pool;
pub mod ledger;

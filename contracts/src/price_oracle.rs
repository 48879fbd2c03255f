//! Price Oracle Adapter Contract
//!
//! Holds the latest USD price per collateral token, pushed by accounts with
//! the oracle role, and answers two kinds of reads:
//! - `latest_price`: the raw reading with its timestamp (staleness is the
//!   caller's concern)
//! - `fresh_price`: the value only if the reading is inside the staleness
//!   window; otherwise the call fails closed with `StaleOracle`
//!
//! External feed contracts can be registered per token for off-chain
//! keepers to source from; the adapter itself stores only pushed readings.

use odra::casper_types::U256;
use odra::prelude::*;
use odra::ContractRef;

use crate::access_control::{AccessControlContractRef, ACTION_SET_PARAMS, ACTION_SET_PRICE};
use crate::errors::LedgerError;
use crate::events::{PriceFeedSet, PriceUpdated};
use crate::types::PriceData;

/// Default maximum price age in seconds (1 hour)
const DEFAULT_STALENESS_WINDOW: u64 = 3600;

/// Price Oracle Adapter Contract
#[odra::module(events = [PriceUpdated, PriceFeedSet])]
pub struct PriceOracle {
    /// Access control contract address
    access_control: Var<Address>,
    /// Latest pushed reading per token
    prices: Mapping<Address, PriceData>,
    /// Registered external feed per token
    feeds: Mapping<Address, Address>,
    /// Maximum reading age before risk reads fail closed
    staleness_window: Var<u64>,
}

#[odra::module]
impl PriceOracle {
    /// Initialize the oracle adapter
    pub fn init(&mut self, access_control: Address) {
        self.access_control.set(access_control);
        self.staleness_window.set(DEFAULT_STALENESS_WINDOW);
    }

    // ========== Price Updates ==========

    /// Push a new USD price for a token (oracle role).
    /// The reading is stamped with the current block time.
    pub fn set_price(&mut self, token: Address, value: U256) {
        self.require_authorized(self.env().caller(), ACTION_SET_PRICE);
        if crate::stablecoin_registry::is_zero_address(&token) {
            self.env().revert(LedgerError::InvalidAddress);
        }
        if value.is_zero() {
            self.env().revert(LedgerError::InvalidPrice);
        }
        let timestamp = self.env().get_block_time();
        self.prices.set(&token, PriceData { value, timestamp });
        self.env().emit_event(PriceUpdated { token, value, timestamp });
    }

    /// Register the external feed contract a keeper sources this token's
    /// price from (admin/timelock).
    pub fn set_price_feed(&mut self, token: Address, feed: Address) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if crate::stablecoin_registry::is_zero_address(&token)
            || crate::stablecoin_registry::is_zero_address(&feed)
        {
            self.env().revert(LedgerError::InvalidAddress);
        }
        self.feeds.set(&token, feed);
        self.env().emit_event(PriceFeedSet { token, feed });
    }

    /// Set the staleness window (admin/timelock)
    pub fn set_staleness_window(&mut self, seconds: u64) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if seconds == 0 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        self.staleness_window.set(seconds);
    }

    // ========== Price Queries ==========

    /// Latest reading for a token, with its timestamp
    pub fn latest_price(&self, token: Address) -> PriceData {
        match self.prices.get(&token) {
            Some(data) => data,
            None => self.env().revert(LedgerError::PriceUnavailable),
        }
    }

    /// Price value, failing closed when the reading is stale or missing
    pub fn fresh_price(&self, token: Address) -> U256 {
        let data = self.latest_price(token);
        let age = self.env().get_block_time().saturating_sub(data.timestamp);
        if age > self.staleness_window.get().unwrap_or(DEFAULT_STALENESS_WINDOW) {
            self.env().revert(LedgerError::StaleOracle);
        }
        data.value
    }

    /// Whether a token has a reading inside the staleness window
    pub fn is_fresh(&self, token: Address) -> bool {
        match self.prices.get(&token) {
            Some(data) => {
                let age = self.env().get_block_time().saturating_sub(data.timestamp);
                age <= self.staleness_window.get().unwrap_or(DEFAULT_STALENESS_WINDOW)
            }
            None => false,
        }
    }

    /// Registered feed for a token, if any
    pub fn get_price_feed(&self, token: Address) -> Option<Address> {
        self.feeds.get(&token)
    }

    /// Current staleness window in seconds
    pub fn get_staleness_window(&self) -> u64 {
        self.staleness_window.get().unwrap_or(DEFAULT_STALENESS_WINDOW)
    }

    // ========== Internal ==========

    fn require_authorized(&self, account: Address, action: u8) {
        let gateway_address = self.access_control.get().expect("access control not set");
        let gateway = AccessControlContractRef::new(self.env().clone(), gateway_address);
        if !gateway.authorize(account, action) {
            self.env().revert(LedgerError::Unauthorized);
        }
    }
}

//! Stablecoin Registry Contract
//!
//! Per-token risk parameters and the collateral allow-list.
//!
//! The external API speaks percent (the scale the admin tooling uses);
//! storage and every risk calculation downstream use basis points. The two
//! conversions are `math::percent_to_bps` and `math::bps_to_percent`.

use odra::prelude::*;
use odra::ContractRef;

use crate::access_control::{AccessControlContractRef, ACTION_SET_PARAMS};
use crate::errors::LedgerError;
use crate::events::{CollateralAllowed, StablecoinParamsChanged};
use crate::math::{bps_to_percent, percent_to_bps};
use crate::types::TokenRiskConfig;

/// Highest accepted loan-to-value, percent scale
pub const MAX_LTV_PERCENT: u32 = 90;

/// Lowest accepted liquidation threshold, percent scale
pub const MIN_LIQUIDATION_THRESHOLD_PERCENT: u32 = 105;

/// Default LTV applied to tokens without stored parameters, percent scale
pub const DEFAULT_LTV_PERCENT: u32 = 75;

/// Default liquidation threshold for unset tokens, percent scale
pub const DEFAULT_LIQUIDATION_THRESHOLD_PERCENT: u32 = 120;

/// Risk parameters applied to any token without a stored config:
/// treated as non-stable with the fixed default LTV/threshold pair.
pub fn default_risk_config() -> TokenRiskConfig {
    TokenRiskConfig {
        is_stable: false,
        ltv_bps: percent_to_bps(DEFAULT_LTV_PERCENT),
        liquidation_threshold_bps: percent_to_bps(DEFAULT_LIQUIDATION_THRESHOLD_PERCENT),
    }
}

/// Whether an address is the zero account address
pub fn is_zero_address(address: &Address) -> bool {
    match address.as_account_hash() {
        Some(hash) => hash.value() == [0u8; 32],
        None => false,
    }
}

/// Stablecoin Registry Contract
#[odra::module(events = [StablecoinParamsChanged, CollateralAllowed])]
pub struct StablecoinRegistry {
    /// Access control contract address
    access_control: Var<Address>,
    /// Stored risk parameters per token (basis points)
    configs: Mapping<Address, TokenRiskConfig>,
    /// Collateral allow-list
    allowed: Mapping<Address, bool>,
}

#[odra::module]
impl StablecoinRegistry {
    /// Initialize the registry
    pub fn init(&mut self, access_control: Address) {
        self.access_control.set(access_control);
    }

    // ========== Risk Parameters ==========

    /// Set risk parameters for a token (admin/timelock).
    ///
    /// `ltv` and `liquidation_threshold` are percent-scale. Replaces any
    /// stored config and emits one parameter-changed notification.
    pub fn set_stablecoin_params(
        &mut self,
        token: Address,
        is_stable: bool,
        ltv: u32,
        liquidation_threshold: u32,
    ) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if is_zero_address(&token) {
            self.env().revert(LedgerError::InvalidAddress);
        }
        if ltv == 0 {
            self.env().revert(LedgerError::InvalidLtv);
        }
        if ltv > MAX_LTV_PERCENT {
            self.env().revert(LedgerError::LtvTooHigh);
        }
        if liquidation_threshold < MIN_LIQUIDATION_THRESHOLD_PERCENT {
            self.env().revert(LedgerError::ThresholdTooLow);
        }

        self.configs.set(
            &token,
            TokenRiskConfig {
                is_stable,
                ltv_bps: percent_to_bps(ltv),
                liquidation_threshold_bps: percent_to_bps(liquidation_threshold),
            },
        );
        self.env().emit_event(StablecoinParamsChanged {
            token,
            is_stable,
            ltv,
            liquidation_threshold,
        });
    }

    /// Stored parameters for a token in percent scale, or the non-stable
    /// default when unset. Never fails.
    pub fn get_stablecoin_params(&self, token: Address) -> (bool, u32, u32) {
        let config = self.risk_params_bps(token);
        (
            config.is_stable,
            bps_to_percent(config.ltv_bps),
            bps_to_percent(config.liquidation_threshold_bps),
        )
    }

    /// Canonical basis-point parameters for risk calculations. Never fails.
    pub fn risk_params_bps(&self, token: Address) -> TokenRiskConfig {
        self.configs.get(&token).unwrap_or_else(default_risk_config)
    }

    // ========== Allow-list ==========

    /// Allow or disallow a token as collateral (admin/timelock)
    pub fn set_allowed_collateral(&mut self, token: Address, allowed: bool) {
        self.require_authorized(self.env().caller(), ACTION_SET_PARAMS);
        if is_zero_address(&token) {
            self.env().revert(LedgerError::InvalidAddress);
        }
        self.allowed.set(&token, allowed);
        self.env().emit_event(CollateralAllowed { token, allowed });
    }

    /// Whether a token may be deposited as collateral
    pub fn is_allowed(&self, token: Address) -> bool {
        self.allowed.get(&token).unwrap_or(false)
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

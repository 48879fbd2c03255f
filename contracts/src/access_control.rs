//! Access Control Contract
//!
//! Governance gateway for the lending protocol. Other contracts never rely
//! on ambient caller state for policy decisions; they pass the acting
//! account into `authorize(account, action)` and enforce the boolean
//! locally. Role administration (grant/revoke/queued changes) is performed
//! directly by admin accounts and checks the transaction caller.
//!
//! Roles:
//! - ADMIN can change every parameter and manage all roles
//! - TIMELOCK can change protocol parameters (queued governance executor)
//! - ORACLE can push price updates
//! - LIQUIDATOR can start and execute liquidations
//! - LEDGER marks the ledger contract itself, for pool capacity calls

use odra::prelude::*;

use crate::errors::LedgerError;

/// Role constants (u8 for efficient storage)
pub const ROLE_ADMIN: u8 = 0;
pub const ROLE_TIMELOCK: u8 = 1;
pub const ROLE_ORACLE: u8 = 2;
pub const ROLE_LIQUIDATOR: u8 = 3;
pub const ROLE_LEDGER: u8 = 4;

const ROLE_COUNT: u8 = 5;

/// Actions checked through `authorize`
pub const ACTION_SET_PARAMS: u8 = 0;
pub const ACTION_SET_PRICE: u8 = 1;
pub const ACTION_LIQUIDATE: u8 = 2;
pub const ACTION_POOL_LEND: u8 = 3;

/// Access Control Contract
#[odra::module]
pub struct AccessControl {
    /// Role assignments: (role, account) -> bool
    roles: Mapping<(u8, Address), bool>,
    /// Number of accounts with each role
    role_count: Mapping<u8, u32>,
    /// Timelock delay for queued role changes (in seconds)
    timelock_delay: Var<u64>,
    /// Pending role changes: (role, account) -> (grant, execute_time)
    pending_changes: Mapping<(u8, Address), (bool, u64)>,
}

#[odra::module]
impl AccessControl {
    /// Initialize access control with the initial admin
    pub fn init(&mut self, initial_admin: Address) {
        self.set_role_internal(ROLE_ADMIN, initial_admin, true);
        // Default timelock: 24 hours
        self.timelock_delay.set(86_400);
    }

    // ========== Policy Interface ==========

    /// Whether `account` may perform `action`. Admin may perform anything.
    pub fn authorize(&self, account: Address, action: u8) -> bool {
        if self.has_role(ROLE_ADMIN, account) {
            return true;
        }
        match action {
            ACTION_SET_PARAMS => self.has_role(ROLE_TIMELOCK, account),
            ACTION_SET_PRICE => self.has_role(ROLE_ORACLE, account),
            ACTION_LIQUIDATE => self.has_role(ROLE_LIQUIDATOR, account),
            ACTION_POOL_LEND => self.has_role(ROLE_LEDGER, account),
            _ => false,
        }
    }

    /// Check if an account has a specific role
    pub fn has_role(&self, role_id: u8, account: Address) -> bool {
        self.roles.get(&(role_id, account)).unwrap_or(false)
    }

    /// Get the number of accounts with a role
    pub fn get_role_member_count(&self, role_id: u8) -> u32 {
        self.role_count.get(&role_id).unwrap_or(0)
    }

    // ========== Role Management ==========

    /// Grant a role to an account (admin only)
    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.require_admin_caller();
        if role_id >= ROLE_COUNT {
            self.env().revert(LedgerError::InvalidConfig);
        }
        if self.has_role(role_id, account) {
            return;
        }
        self.set_role_internal(role_id, account, true);
    }

    /// Revoke a role from an account (admin only)
    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.require_admin_caller();
        if !self.has_role(role_id, account) {
            return;
        }
        // The last admin cannot be removed
        if role_id == ROLE_ADMIN && self.get_role_member_count(ROLE_ADMIN) <= 1 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        self.set_role_internal(role_id, account, false);
    }

    /// Renounce a role (caller gives up their own role)
    pub fn renounce_role(&mut self, role_id: u8) {
        let caller = self.env().caller();
        if !self.has_role(role_id, caller) {
            return;
        }
        if role_id == ROLE_ADMIN && self.get_role_member_count(ROLE_ADMIN) <= 1 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        self.set_role_internal(role_id, caller, false);
    }

    // ========== Timelocked Role Changes ==========

    /// Queue a role change for execution after the timelock delay
    pub fn queue_role_change(&mut self, role_id: u8, account: Address, grant: bool) {
        self.require_admin_caller();
        if role_id >= ROLE_COUNT {
            self.env().revert(LedgerError::InvalidConfig);
        }
        let execute_time =
            self.env().get_block_time() + self.timelock_delay.get().unwrap_or(86_400);
        self.pending_changes.set(&(role_id, account), (grant, execute_time));
    }

    /// Execute a queued role change once its delay has elapsed
    pub fn execute_role_change(&mut self, role_id: u8, account: Address) {
        let (grant, execute_time) = self
            .pending_changes
            .get(&(role_id, account))
            .unwrap_or((false, 0));
        if execute_time == 0 {
            self.env().revert(LedgerError::InvalidConfig);
        }
        if self.env().get_block_time() < execute_time {
            self.env().revert(LedgerError::CooldownActive);
        }
        self.pending_changes.set(&(role_id, account), (false, 0));
        self.set_role_internal(role_id, account, grant);
    }

    /// Cancel a queued role change (admin only)
    pub fn cancel_role_change(&mut self, role_id: u8, account: Address) {
        self.require_admin_caller();
        self.pending_changes.set(&(role_id, account), (false, 0));
    }

    /// Set the timelock delay (admin only). Bounded to [1 hour, 7 days].
    pub fn set_timelock_delay(&mut self, delay_seconds: u64) {
        self.require_admin_caller();
        if !(3600..=604_800).contains(&delay_seconds) {
            self.env().revert(LedgerError::InvalidConfig);
        }
        self.timelock_delay.set(delay_seconds);
    }

    /// Get the timelock delay
    pub fn get_timelock_delay(&self) -> u64 {
        self.timelock_delay.get().unwrap_or(86_400)
    }

    // ========== Internal ==========

    fn require_admin_caller(&self) {
        if !self.has_role(ROLE_ADMIN, self.env().caller()) {
            self.env().revert(LedgerError::Unauthorized);
        }
    }

    fn set_role_internal(&mut self, role_id: u8, account: Address, value: bool) {
        let had_role = self.roles.get(&(role_id, account)).unwrap_or(false);
        self.roles.set(&(role_id, account), value);

        let current_count = self.role_count.get(&role_id).unwrap_or(0);
        if value && !had_role {
            self.role_count.set(&role_id, current_count + 1);
        } else if !value && had_role && current_count > 0 {
            self.role_count.set(&role_id, current_count - 1);
        }
    }
}

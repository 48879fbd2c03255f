//! Credit Ledger Integration Tests
//!
//! Host-environment tests driving the deployed protocol end to end:
//! deposits, tiered borrowing, repayment history, interest distribution,
//! the liquidation state machine, and the withdrawal cooldown.

#[cfg(test)]
mod tests {
    use credit_ledger_contracts::access_control::{
        AccessControl, AccessControlHostRef, AccessControlInitArgs, ROLE_LEDGER, ROLE_LIQUIDATOR,
        ROLE_ORACLE,
    };
    use credit_ledger_contracts::errors::LedgerError;
    use credit_ledger_contracts::events;
    use credit_ledger_contracts::ledger::{CreditLedger, CreditLedgerHostRef, CreditLedgerInitArgs};
    use credit_ledger_contracts::lender_pool::{LenderPool, LenderPoolHostRef, LenderPoolInitArgs};
    use credit_ledger_contracts::price_oracle::{
        PriceOracle, PriceOracleHostRef, PriceOracleInitArgs,
    };
    use credit_ledger_contracts::stablecoin_registry::{
        StablecoinRegistry, StablecoinRegistryHostRef, StablecoinRegistryInitArgs,
    };
    use credit_ledger_contracts::types::LiquidationStatus;
    use odra::casper_types::account::AccountHash;
    use odra::casper_types::U256;
    use odra::host::{Deployer, HostEnv, HostRef};
    use odra::prelude::*;
    use pretty_assertions::assert_eq;

    const WAD: u128 = 1_000_000_000_000_000_000;

    /// Grace period configured by the ledger by default
    const GRACE_PERIOD: u64 = 3600;
    /// Oracle staleness window configured by default
    const STALENESS_WINDOW: u64 = 3600;
    /// Pool withdrawal cooldown configured by default
    const WITHDRAWAL_COOLDOWN: u64 = 604_800;

    fn wad(n: u64) -> U256 {
        U256::from(n) * U256::from(WAD)
    }

    struct Protocol {
        env: HostEnv,
        access: AccessControlHostRef,
        registry: StablecoinRegistryHostRef,
        oracle: PriceOracleHostRef,
        pool: LenderPoolHostRef,
        ledger: CreditLedgerHostRef,
        admin: Address,
        feeder: Address,
        liquidator: Address,
        lender: Address,
        borrower: Address,
        token: Address,
    }

    fn setup() -> Protocol {
        let env = odra_test::env();
        // Move off time zero so "never set" timestamps stay distinguishable
        env.advance_block_time(1000);

        let admin = env.get_account(0);
        let feeder = env.get_account(1);
        let liquidator = env.get_account(2);
        let lender = env.get_account(3);
        let borrower = env.get_account(4);
        // Collateral token identity; the ledger tracks balances by address
        let token = env.get_account(8);

        env.set_caller(admin);
        let mut access = AccessControl::deploy(&env, AccessControlInitArgs { initial_admin: admin });
        let access_address = access.address().clone();
        let mut registry = StablecoinRegistry::deploy(
            &env,
            StablecoinRegistryInitArgs { access_control: access_address },
        );
        let mut oracle =
            PriceOracle::deploy(&env, PriceOracleInitArgs { access_control: access_address });
        let pool =
            LenderPool::deploy(&env, LenderPoolInitArgs { access_control: access_address });
        let ledger = CreditLedger::deploy(
            &env,
            CreditLedgerInitArgs {
                access_control: access_address,
                registry: registry.address().clone(),
                oracle: oracle.address().clone(),
                lender_pool: pool.address().clone(),
            },
        );

        access.grant_role(ROLE_ORACLE, feeder);
        access.grant_role(ROLE_LIQUIDATOR, liquidator);
        access.grant_role(ROLE_LEDGER, ledger.address().clone());

        registry.set_allowed_collateral(token, true);

        env.set_caller(feeder);
        oracle.set_price(token, U256::from(WAD)); // $1.00
        env.set_caller(admin);

        Protocol {
            env,
            access,
            registry,
            oracle,
            pool,
            ledger,
            admin,
            feeder,
            liquidator,
            lender,
            borrower,
            token,
        }
    }

    fn zero_address() -> Address {
        Address::Account(AccountHash::default())
    }

    fn fund_pool(p: &mut Protocol, amount: U256) {
        p.env.set_caller(p.lender);
        p.pool.deposit_funds(amount);
        p.env.set_caller(p.admin);
    }

    fn setup_borrower(p: &mut Protocol, score: u8, collateral: U256) {
        p.env.set_caller(p.admin);
        p.ledger.set_credit_score(p.borrower, score);
        p.env.set_caller(p.borrower);
        p.ledger.deposit_collateral(p.token, collateral);
        p.env.set_caller(p.admin);
    }

    fn push_price(p: &mut Protocol, value: U256) {
        p.env.set_caller(p.feeder);
        p.oracle.set_price(p.token, value);
        p.env.set_caller(p.admin);
    }

    // ========== Collateral & borrow terms ==========

    #[test]
    fn deposit_requires_allow_listed_token() {
        let mut p = setup();
        let unknown_token = p.env.get_account(9);
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_deposit_collateral(unknown_token, wad(10)).unwrap_err(),
            LedgerError::UnsupportedCollateral.into()
        );
        assert_eq!(
            p.ledger.try_deposit_collateral(p.token, U256::zero()).unwrap_err(),
            LedgerError::ZeroAmount.into()
        );
    }

    #[test]
    fn deposit_credits_balance_and_emits() {
        let mut p = setup();
        p.env.set_caller(p.borrower);
        p.ledger.deposit_collateral(p.token, wad(500));
        assert_eq!(p.ledger.collateral_of(p.borrower, p.token), wad(500));
        assert_eq!(p.ledger.get_total_collateral_value(p.borrower), wad(500));
        assert!(p.env.emitted_event(
            &p.ledger.address(),
            events::CollateralDeposited {
                user: p.borrower,
                token: p.token,
                amount: wad(500),
                new_balance: wad(500),
            }
        ));
    }

    #[test]
    fn unscored_user_gets_most_conservative_terms() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        let terms = p.ledger.get_borrow_terms(p.borrower);
        assert_eq!(terms.collateral_ratio_bps, 18_000);
        // Tier 0 caps loans at 5% of available liquidity
        assert_eq!(terms.max_loan_amount, wad(500));
    }

    // ========== Scenario A: tier ratio gates borrowing ==========

    #[test]
    fn borrow_beyond_tier_ratio_fails() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        // Score 85 sits in the 130% collateral-ratio tier
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        // 500 / 400 = 125% < 130%
        assert_eq!(
            p.ledger.try_borrow(wad(400)).unwrap_err(),
            LedgerError::InsufficientCollateral.into()
        );
        // 500 / 384 = 130.2% >= 130%
        p.ledger.borrow(wad(384));
        assert_eq!(p.ledger.debt_of(p.borrower), wad(384));
        assert!(p.ledger.check_collateralization(p.borrower) >= 13_000);
    }

    #[test]
    fn borrow_ratio_invariant_holds_after_every_borrow() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(100));
        assert!(p.ledger.check_collateralization(p.borrower) >= 13_000);
        p.ledger.borrow(wad(200));
        assert!(p.ledger.check_collateralization(p.borrower) >= 13_000);
        // One more unit would still pass; push to the edge
        p.ledger.borrow(wad(84));
        assert!(p.ledger.check_collateralization(p.borrower) >= 13_000);
    }

    #[test]
    fn borrow_above_pool_fraction_fails() {
        let mut p = setup();
        fund_pool(&mut p, wad(1000));
        // Plenty of collateral; the binding constraint is the 30% pool cap
        setup_borrower(&mut p, 85, wad(10_000));

        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_borrow(wad(301)).unwrap_err(),
            LedgerError::ExceedsCapacity.into()
        );
        p.ledger.borrow(wad(300));
        assert_eq!(p.pool.get_total_lent(), wad(300));
    }

    // ========== Scenario B: stablecoin params round-trip ==========

    #[test]
    fn stablecoin_params_roundtrip_and_notify() {
        let mut p = setup();
        p.registry.set_stablecoin_params(p.token, true, 85, 110);
        assert_eq!(p.registry.get_stablecoin_params(p.token), (true, 85, 110));
        assert!(p.env.emitted_event(
            &p.registry.address(),
            events::StablecoinParamsChanged {
                token: p.token,
                is_stable: true,
                ltv: 85,
                liquidation_threshold: 110,
            }
        ));
    }

    #[test]
    fn unset_token_params_fall_back_to_default() {
        let p = setup();
        let unknown_token = p.env.get_account(9);
        assert_eq!(p.registry.get_stablecoin_params(unknown_token), (false, 75, 120));
    }

    #[test]
    fn stablecoin_param_bounds_are_enforced() {
        let mut p = setup();
        assert_eq!(
            p.registry.try_set_stablecoin_params(p.token, true, 0, 110).unwrap_err(),
            LedgerError::InvalidLtv.into()
        );
        assert_eq!(
            p.registry.try_set_stablecoin_params(p.token, true, 95, 110).unwrap_err(),
            LedgerError::LtvTooHigh.into()
        );
        assert_eq!(
            p.registry.try_set_stablecoin_params(p.token, true, 85, 100).unwrap_err(),
            LedgerError::ThresholdTooLow.into()
        );
        assert_eq!(
            p.registry
                .try_set_stablecoin_params(zero_address(), true, 85, 110)
                .unwrap_err(),
            LedgerError::InvalidAddress.into()
        );
    }

    #[test]
    fn param_setters_reject_non_admin() {
        let mut p = setup();
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.registry.try_set_stablecoin_params(p.token, true, 85, 110).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
        assert_eq!(
            p.ledger.try_set_credit_score(p.borrower, 90).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
        assert_eq!(
            p.registry.try_set_allowed_collateral(p.token, false).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
    }

    #[test]
    fn credit_score_bounds() {
        let mut p = setup();
        assert_eq!(
            p.ledger.try_set_credit_score(p.borrower, 101).unwrap_err(),
            LedgerError::InvalidCreditScore.into()
        );
        p.ledger.set_credit_score(p.borrower, 100);
        assert_eq!(p.ledger.get_credit_score(p.borrower), 100);
        let (tier_index, tier) = p.ledger.get_interest_tier(p.borrower);
        assert_eq!(tier_index, 4);
        assert_eq!(tier.collateral_ratio_bps, 12_000);
    }

    // ========== Scenario D & history monotonicity ==========

    #[test]
    fn repay_counts_once_per_call_regardless_of_amount() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(10));
        p.ledger.repay(wad(1));
        p.ledger.repay(wad(1));

        let history = p.ledger.get_user_history(p.borrower);
        assert_eq!(history.successful_payments, 2);
        assert_eq!(p.ledger.debt_of(p.borrower), wad(8));
    }

    #[test]
    fn installment_shares_the_history_contract() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(10));
        p.ledger.repay_installment(wad(3));
        p.ledger.repay(wad(2));
        p.ledger.repay_installment(wad(1));

        let history = p.ledger.get_user_history(p.borrower);
        assert_eq!(history.successful_payments, 3);
        assert_eq!(p.ledger.debt_of(p.borrower), wad(4));
    }

    #[test]
    fn repay_excess_clamps_at_zero_debt() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(10));
        p.ledger.repay(wad(50));
        assert_eq!(p.ledger.debt_of(p.borrower), U256::zero());
        assert_eq!(p.pool.get_total_lent(), U256::zero());
        // A further repay has no debt to act on
        assert_eq!(
            p.ledger.try_repay(wad(1)).unwrap_err(),
            LedgerError::NoOutstandingDebt.into()
        );
        let history = p.ledger.get_user_history(p.borrower);
        assert_eq!(history.successful_payments, 1);
    }

    #[test]
    fn first_interaction_timestamp_is_set_once() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(10));
        let stamped = p.ledger.get_user_history(p.borrower).first_interaction_ts;
        assert!(stamped > 0);

        p.env.advance_block_time(600);
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(10));
        assert_eq!(p.ledger.get_user_history(p.borrower).first_interaction_ts, stamped);
    }

    // ========== Interest accrual ==========

    #[test]
    fn debt_accrues_simple_interest_over_time() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));
        // Effective rate: base 200 bps with the tier's -50 modifier = 1.5%
        assert_eq!(p.ledger.effective_rate_of(p.borrower), 150);

        // Half a year: 300 * 1.5% / 2 = 2.25
        p.env.advance_block_time(31_536_000 / 2);
        let expected_interest = U256::from(WAD) * 9 / 4;
        assert_eq!(p.ledger.debt_of(p.borrower), wad(300) + expected_interest);
    }

    #[test]
    fn repay_clears_interest_before_principal() {
        let mut p = setup();
        fund_pool(&mut p, wad(1000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));
        p.env.advance_block_time(31_536_000 / 2);
        push_price(&mut p, U256::from(WAD));

        p.env.set_caller(p.borrower);
        p.ledger.repay(wad(300));

        // 2.25 interest was cleared first, so 2.25 principal remains
        let expected_interest = U256::from(WAD) * 9 / 4;
        assert_eq!(p.ledger.debt_of(p.borrower), expected_interest);
        assert_eq!(p.pool.get_total_lent(), expected_interest);
        assert_eq!(p.pool.get_undistributed_income(), expected_interest);
    }

    #[test]
    fn accrue_interest_follows_utilization_with_bounded_steps() {
        let mut p = setup();
        fund_pool(&mut p, wad(1000));
        setup_borrower(&mut p, 85, wad(10_000));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));

        // Utilization 30%: target = 200 + 1000 * 0.30 = 500 bps
        p.env.set_caller(p.admin);
        p.ledger.accrue_interest();
        assert_eq!(p.ledger.get_borrow_rate(), 500);
        assert!(p.env.emitted_event(
            &p.ledger.address(),
            events::InterestRateUpdated {
                utilization_bps: 3000,
                old_rate_bps: 200,
                new_rate_bps: 500,
            }
        ));

        assert_eq!(
            p.ledger.try_accrue_interest().unwrap_err(),
            LedgerError::AccrualTooSoon.into()
        );
    }

    #[test]
    fn rate_moves_are_clamped_by_max_rate_change() {
        let mut p = setup();
        p.ledger.set_max_rate_change(100);
        fund_pool(&mut p, wad(1000));
        setup_borrower(&mut p, 85, wad(10_000));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));

        p.env.set_caller(p.admin);
        p.ledger.accrue_interest();
        // Target is 500 but each step may move at most 100 bps
        assert_eq!(p.ledger.get_borrow_rate(), 300);
    }

    #[test]
    fn potential_interest_projects_effective_rate() {
        let mut p = setup();
        setup_borrower(&mut p, 85, wad(1));
        // 1000 at 1.5% for a full year
        assert_eq!(
            p.ledger.calculate_potential_interest(p.borrower, wad(1000), 31_536_000),
            wad(15)
        );
    }

    // ========== Collateral withdrawal guard ==========

    #[test]
    fn withdrawal_respects_tier_ratio_with_open_debt() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));
        // 300 debt at 130% needs 390 collateral; 200 out leaves only 300
        assert_eq!(
            p.ledger.try_withdraw_collateral(p.token, wad(200)).unwrap_err(),
            LedgerError::InsufficientCollateral.into()
        );
        p.ledger.withdraw_collateral(p.token, wad(100));
        assert_eq!(p.ledger.collateral_of(p.borrower, p.token), wad(400));
        assert!(p.env.emitted_event(
            &p.ledger.address(),
            events::CollateralWithdrawn {
                user: p.borrower,
                token: p.token,
                amount: wad(100),
                new_balance: wad(400),
            }
        ));
    }

    #[test]
    fn withdrawal_beyond_balance_fails() {
        let mut p = setup();
        setup_borrower(&mut p, 85, wad(50));
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_withdraw_collateral(p.token, wad(51)).unwrap_err(),
            LedgerError::InsufficientCollateral.into()
        );
        // Debt-free positions can withdraw everything
        p.ledger.withdraw_collateral(p.token, wad(50));
        assert_eq!(p.ledger.collateral_of(p.borrower, p.token), U256::zero());
    }

    // ========== Oracle staleness fails closed ==========

    #[test]
    fn stale_price_blocks_borrowing_and_valuation() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.advance_block_time(STALENESS_WINDOW + 1);
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_borrow(wad(10)).unwrap_err(),
            LedgerError::StaleOracle.into()
        );
        assert_eq!(
            p.ledger.try_get_total_collateral_value(p.borrower).unwrap_err(),
            LedgerError::StaleOracle.into()
        );

        // A fresh push unblocks the same call
        push_price(&mut p, U256::from(WAD));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(10));
    }

    #[test]
    fn unknown_token_has_no_price() {
        let p = setup();
        let unknown_token = p.env.get_account(9);
        assert_eq!(
            p.oracle.try_latest_price(unknown_token).unwrap_err(),
            LedgerError::PriceUnavailable.into()
        );
    }

    #[test]
    fn price_updates_are_role_gated() {
        let mut p = setup();
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.oracle.try_set_price(p.token, U256::from(WAD)).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
        p.env.set_caller(p.feeder);
        assert_eq!(
            p.oracle.try_set_price(p.token, U256::zero()).unwrap_err(),
            LedgerError::InvalidPrice.into()
        );
    }

    // ========== Liquidation state machine ==========

    fn open_underwater_position(p: &mut Protocol) {
        fund_pool(p, wad(10_000));
        setup_borrower(p, 85, wad(500));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));
        // Price halves: collateral value 250, ratio 83% < 120% threshold
        push_price(p, U256::from(WAD / 2));
    }

    #[test]
    fn healthy_position_cannot_be_liquidated() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));

        p.env.set_caller(p.liquidator);
        assert_eq!(
            p.ledger.try_start_liquidation(p.borrower).unwrap_err(),
            LedgerError::NotLiquidatable.into()
        );
    }

    #[test]
    fn execute_from_healthy_state_fails() {
        let mut p = setup();
        p.env.set_caller(p.liquidator);
        assert_eq!(
            p.ledger.try_execute_liquidation(p.borrower).unwrap_err(),
            LedgerError::NotInLiquidation.into()
        );
    }

    #[test]
    fn start_requires_liquidator_role() {
        let mut p = setup();
        open_underwater_position(&mut p);
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_start_liquidation(p.borrower).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
    }

    #[test]
    fn grace_period_gates_execution() {
        let mut p = setup();
        open_underwater_position(&mut p);

        p.env.set_caller(p.liquidator);
        p.ledger.start_liquidation(p.borrower);
        assert_eq!(
            p.ledger.get_liquidation_record(p.borrower).status,
            LiquidationStatus::LiquidationStarted
        );
        // Starting twice is rejected
        assert_eq!(
            p.ledger.try_start_liquidation(p.borrower).unwrap_err(),
            LedgerError::LiquidationInProgress.into()
        );
        // Too early to execute
        assert_eq!(
            p.ledger.try_execute_liquidation(p.borrower).unwrap_err(),
            LedgerError::GracePeriodActive.into()
        );
    }

    #[test]
    fn partial_liquidation_when_collateral_cannot_cover() {
        let mut p = setup();
        open_underwater_position(&mut p);

        p.env.set_caller(p.liquidator);
        p.ledger.start_liquidation(p.borrower);

        p.env.advance_block_time(GRACE_PERIOD + 1);
        // Keep the reading fresh across the grace period
        push_price(&mut p, U256::from(WAD / 2));

        p.env.set_caller(p.liquidator);
        p.ledger.execute_liquidation(p.borrower);

        // Collateral (value 250) cannot cover debt * 1.1 (330+): the whole
        // holding is seized and the debt shrinks proportionally
        assert_eq!(p.ledger.collateral_of(p.borrower, p.token), U256::zero());
        assert_eq!(p.ledger.collateral_of(p.liquidator, p.token), wad(500));
        assert!(p.ledger.get_debt_position(p.borrower).principal > U256::zero());

        let history = p.ledger.get_user_history(p.borrower);
        assert_eq!(history.liquidations, 1);
        assert_eq!(
            p.ledger.get_liquidation_record(p.borrower).status,
            LiquidationStatus::Executed
        );
        let (count, debt_covered, value_seized) = p.ledger.get_liquidation_stats();
        assert_eq!(count, 1);
        assert!(debt_covered > U256::zero());
        assert_eq!(value_seized, wad(250));

        // The record is no longer in-progress; executing again fails
        assert_eq!(
            p.ledger.try_execute_liquidation(p.borrower).unwrap_err(),
            LedgerError::NotInLiquidation.into()
        );
    }

    #[test]
    fn full_liquidation_pays_the_penalty_as_bonus() {
        let mut p = setup();
        fund_pool(&mut p, wad(10_000));
        setup_borrower(&mut p, 85, wad(500));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(100));
        // Value 115 against 100 debt: 115% is below the 120% threshold but
        // still covers debt + 10% penalty
        push_price(&mut p, U256::from(WAD * 23 / 100));

        p.env.set_caller(p.liquidator);
        p.ledger.start_liquidation(p.borrower);
        p.env.advance_block_time(GRACE_PERIOD + 1);
        push_price(&mut p, U256::from(WAD * 23 / 100));

        p.env.set_caller(p.liquidator);
        p.ledger.execute_liquidation(p.borrower);

        assert_eq!(p.ledger.debt_of(p.borrower), U256::zero());
        // The borrower keeps the collateral in excess of debt + penalty
        assert!(p.ledger.collateral_of(p.borrower, p.token) > U256::zero());
        assert!(p.ledger.collateral_of(p.liquidator, p.token) > U256::zero());
        assert_eq!(p.ledger.get_user_history(p.borrower).liquidations, 1);
    }

    #[test]
    fn recovered_position_is_not_executable() {
        let mut p = setup();
        open_underwater_position(&mut p);

        p.env.set_caller(p.liquidator);
        p.ledger.start_liquidation(p.borrower);
        p.env.advance_block_time(GRACE_PERIOD + 1);
        // Price recovers during the grace period
        push_price(&mut p, U256::from(WAD));

        p.env.set_caller(p.liquidator);
        assert_eq!(
            p.ledger.try_execute_liquidation(p.borrower).unwrap_err(),
            LedgerError::NotLiquidatable.into()
        );
        p.ledger.cancel_liquidation(p.borrower);
        assert_eq!(
            p.ledger.get_liquidation_record(p.borrower).status,
            LiquidationStatus::Cancelled
        );
        // A cancelled record can be started again later
        push_price(&mut p, U256::from(WAD / 2));
        p.env.set_caller(p.liquidator);
        p.ledger.start_liquidation(p.borrower);
    }

    #[test]
    fn stale_price_blocks_liquidation_start() {
        let mut p = setup();
        open_underwater_position(&mut p);

        p.env.advance_block_time(STALENESS_WINDOW + 1);
        p.env.set_caller(p.liquidator);
        assert_eq!(
            p.ledger.try_start_liquidation(p.borrower).unwrap_err(),
            LedgerError::StaleOracle.into()
        );
    }

    #[test]
    fn borrowing_is_blocked_while_liquidation_runs() {
        let mut p = setup();
        open_underwater_position(&mut p);
        p.env.set_caller(p.liquidator);
        p.ledger.start_liquidation(p.borrower);

        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_borrow(wad(1)).unwrap_err(),
            LedgerError::LiquidationInProgress.into()
        );
    }

    // ========== Lender pool: deposits and withdrawal cooldown ==========

    #[test]
    fn deposit_bounds_are_enforced() {
        let mut p = setup();
        p.env.set_caller(p.lender);
        assert_eq!(
            p.pool.try_deposit_funds(U256::from(WAD / 2)).unwrap_err(),
            LedgerError::BelowMinDeposit.into()
        );
        assert_eq!(
            p.pool.try_deposit_funds(wad(1_000_001)).unwrap_err(),
            LedgerError::AboveMaxDeposit.into()
        );
        p.pool.deposit_funds(wad(10));
        assert_eq!(p.pool.get_total_deposited(), wad(10));
        assert_eq!(p.pool.get_lender_count(), 1);
    }

    #[test]
    fn early_withdrawal_completes_with_penalty() {
        let mut p = setup();
        p.env.set_caller(p.lender);
        p.pool.deposit_funds(wad(10));
        p.pool.request_withdrawal(wad(10));
        p.pool.complete_withdrawal();

        // 5% early-exit penalty on 10 units
        let penalty = U256::from(WAD / 2);
        assert!(p.env.emitted_event(
            &p.pool.address(),
            events::WithdrawalCompleted {
                lender: p.lender,
                amount: wad(10),
                payout: wad(10) - penalty,
                early: true,
            }
        ));
        assert_eq!(p.pool.get_total_deposited(), U256::zero());
        assert_eq!(p.pool.get_lender_account(p.lender).balance, U256::zero());
        // The penalty feeds the next interest distribution
        assert_eq!(p.pool.get_undistributed_income(), penalty);
    }

    #[test]
    fn early_withdrawal_can_be_configured_to_reject() {
        let mut p = setup();
        p.pool.set_early_exit_policy(false, 500);

        p.env.set_caller(p.lender);
        p.pool.deposit_funds(wad(10));
        p.pool.request_withdrawal(wad(10));
        assert_eq!(
            p.pool.try_complete_withdrawal().unwrap_err(),
            LedgerError::CooldownActive.into()
        );

        p.env.advance_block_time(WITHDRAWAL_COOLDOWN);
        p.env.set_caller(p.lender);
        p.pool.complete_withdrawal();
        assert!(p.env.emitted_event(
            &p.pool.address(),
            events::WithdrawalCompleted {
                lender: p.lender,
                amount: wad(10),
                payout: wad(10),
                early: false,
            }
        ));
    }

    #[test]
    fn elapsed_cooldown_pays_out_in_full() {
        let mut p = setup();
        p.env.set_caller(p.lender);
        p.pool.deposit_funds(wad(100));
        p.pool.request_withdrawal(wad(40));

        p.env.advance_block_time(WITHDRAWAL_COOLDOWN);
        p.env.set_caller(p.lender);
        p.pool.complete_withdrawal();
        assert_eq!(p.pool.get_lender_account(p.lender).balance, wad(60));
        assert_eq!(p.pool.get_total_deposited(), wad(60));
        assert_eq!(p.pool.get_undistributed_income(), U256::zero());
    }

    #[test]
    fn withdrawal_request_lifecycle_errors() {
        let mut p = setup();
        p.env.set_caller(p.lender);
        assert_eq!(
            p.pool.try_complete_withdrawal().unwrap_err(),
            LedgerError::NoPendingWithdrawal.into()
        );
        assert_eq!(
            p.pool.try_cancel_withdrawal().unwrap_err(),
            LedgerError::NoPendingWithdrawal.into()
        );

        p.pool.deposit_funds(wad(10));
        assert_eq!(
            p.pool.try_request_withdrawal(wad(11)).unwrap_err(),
            LedgerError::InsufficientBalance.into()
        );
        p.pool.request_withdrawal(wad(5));
        assert_eq!(
            p.pool.try_request_withdrawal(wad(1)).unwrap_err(),
            LedgerError::WithdrawalAlreadyRequested.into()
        );

        p.pool.cancel_withdrawal();
        assert_eq!(p.pool.get_withdrawal_request(p.lender).amount, U256::zero());
        assert_eq!(
            p.pool.try_complete_withdrawal().unwrap_err(),
            LedgerError::NoPendingWithdrawal.into()
        );
        // Cancelling frees the reservation for a new request
        p.pool.request_withdrawal(wad(10));
    }

    #[test]
    fn reservations_cannot_strand_lent_funds() {
        let mut p = setup();
        fund_pool(&mut p, wad(1000));
        setup_borrower(&mut p, 85, wad(10_000));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));

        p.env.set_caller(p.lender);
        assert_eq!(
            p.pool.try_request_withdrawal(wad(800)).unwrap_err(),
            LedgerError::InsufficientLiquidity.into()
        );
        p.pool.request_withdrawal(wad(700));
        // Reserved funds no longer back new loans
        assert_eq!(p.pool.available_liquidity(), U256::zero());
        let terms = p.ledger.get_borrow_terms(p.borrower);
        assert_eq!(terms.max_loan_amount, U256::zero());
    }

    #[test]
    fn capacity_calls_are_ledger_only() {
        let mut p = setup();
        fund_pool(&mut p, wad(100));
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.pool.try_lend_out(wad(1)).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
        assert_eq!(
            p.pool.try_record_interest_income(wad(1)).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
    }

    // ========== Interest distribution ==========

    #[test]
    fn interest_flows_from_borrowers_to_lenders() {
        let mut p = setup();
        fund_pool(&mut p, wad(1000));
        setup_borrower(&mut p, 85, wad(500));

        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));
        p.env.advance_block_time(31_536_000 / 2);
        push_price(&mut p, U256::from(WAD));

        p.env.set_caller(p.borrower);
        p.ledger.repay(wad(300));
        let interest = U256::from(WAD) * 9 / 4;
        assert_eq!(p.pool.get_undistributed_income(), interest);

        p.env.set_caller(p.admin);
        p.pool.distribute_interest();
        assert!(p.env.emitted_event(
            &p.pool.address(),
            events::InterestDistributed { amount: interest, total_deposits: wad(1000) }
        ));

        // The sole lender owns the full distribution
        let account = p.pool.get_lender_account(p.lender);
        assert_eq!(account.pending_interest, interest);

        p.env.set_caller(p.lender);
        p.pool.claim_interest();
        let account = p.pool.get_lender_account(p.lender);
        assert_eq!(account.pending_interest, U256::zero());
        assert_eq!(account.earned_interest, interest);

        // Nothing further to claim
        assert_eq!(
            p.pool.try_claim_interest().unwrap_err(),
            LedgerError::NothingToClaim.into()
        );
    }

    #[test]
    fn distribution_is_interval_gated() {
        let mut p = setup();
        fund_pool(&mut p, wad(1000));
        setup_borrower(&mut p, 85, wad(500));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));
        p.env.advance_block_time(31_536_000 / 2);
        push_price(&mut p, U256::from(WAD));
        p.env.set_caller(p.borrower);
        p.ledger.repay(wad(300));

        p.env.set_caller(p.admin);
        p.pool.distribute_interest();
        assert_eq!(
            p.pool.try_distribute_interest().unwrap_err(),
            LedgerError::DistributionTooSoon.into()
        );
    }

    #[test]
    fn distribution_splits_by_lender_share() {
        let mut p = setup();
        let second_lender = p.env.get_account(5);

        p.env.set_caller(p.lender);
        p.pool.deposit_funds(wad(750));
        p.env.set_caller(second_lender);
        p.pool.deposit_funds(wad(250));

        setup_borrower(&mut p, 85, wad(500));
        p.env.set_caller(p.borrower);
        p.ledger.borrow(wad(300));
        p.env.advance_block_time(31_536_000 / 2);
        push_price(&mut p, U256::from(WAD));
        p.env.set_caller(p.borrower);
        p.ledger.repay(wad(300));

        p.env.set_caller(p.admin);
        p.pool.distribute_interest();

        // 2.25 interest split 3:1 across deposits
        let interest = U256::from(WAD) * 9 / 4;
        let quarter = interest / 4;
        assert_eq!(p.pool.get_lender_account(second_lender).pending_interest, quarter);
        assert_eq!(
            p.pool.get_lender_account(p.lender).pending_interest,
            interest - quarter
        );
    }

    #[test]
    fn distribution_with_no_income_fails() {
        let mut p = setup();
        fund_pool(&mut p, wad(100));
        assert_eq!(
            p.pool.try_distribute_interest().unwrap_err(),
            LedgerError::NothingToDistribute.into()
        );
    }

    // ========== Pause guard ==========

    #[test]
    fn paused_ledger_rejects_mutations() {
        let mut p = setup();
        p.ledger.set_paused(true);
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_deposit_collateral(p.token, wad(1)).unwrap_err(),
            LedgerError::ContractPaused.into()
        );
        p.env.set_caller(p.admin);
        p.ledger.set_paused(false);
        p.env.set_caller(p.borrower);
        p.ledger.deposit_collateral(p.token, wad(1));
    }

    #[test]
    fn pause_controls_are_authorized() {
        let mut p = setup();
        p.env.set_caller(p.borrower);
        assert_eq!(
            p.ledger.try_set_paused(true).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
        assert_eq!(
            p.pool.try_set_paused(true).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
    }

    // ========== Access control ==========

    #[test]
    fn admin_can_rotate_roles() {
        let mut p = setup();
        let new_feeder = p.env.get_account(6);
        p.access.grant_role(ROLE_ORACLE, new_feeder);
        p.access.revoke_role(ROLE_ORACLE, p.feeder);

        p.env.set_caller(p.feeder);
        assert_eq!(
            p.oracle.try_set_price(p.token, U256::from(WAD)).unwrap_err(),
            LedgerError::Unauthorized.into()
        );
        p.env.set_caller(new_feeder);
        p.oracle.set_price(p.token, U256::from(WAD));
    }

    #[test]
    fn queued_role_changes_respect_the_timelock() {
        let mut p = setup();
        let candidate = p.env.get_account(7);
        p.access.queue_role_change(ROLE_LIQUIDATOR, candidate, true);
        assert_eq!(
            p.access.try_execute_role_change(ROLE_LIQUIDATOR, candidate).unwrap_err(),
            LedgerError::CooldownActive.into()
        );
        p.env.advance_block_time(86_400);
        p.env.set_caller(p.admin);
        p.access.execute_role_change(ROLE_LIQUIDATOR, candidate);
        assert!(p.access.has_role(ROLE_LIQUIDATOR, candidate));
    }

    #[test]
    fn tier_table_replacement_is_validated() {
        let mut p = setup();
        let mut tiers = credit_ledger_contracts::credit_tiers::default_tier_table();
        tiers[0].min_score = 5; // gap below 5
        assert_eq!(
            p.ledger.try_set_borrow_tiers(tiers).unwrap_err(),
            LedgerError::InvalidTierTable.into()
        );

        let tiers = credit_ledger_contracts::credit_tiers::default_tier_table();
        p.ledger.set_borrow_tiers(tiers);
        assert!(p.env.emitted_event(
            &p.ledger.address(),
            events::BorrowTiersChanged { tier_count: 5 }
        ));
    }
}

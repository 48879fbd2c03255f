//! Credit tier table logic.
//!
//! A tier table is an ordered list of score buckets that must partition the
//! score range [0, 100] without gaps, so every score has exactly one tier.
//! Tier 0 is the most conservative and doubles as the fallback for users
//! with no recorded score.

use odra::prelude::*;

use crate::math::BPS_SCALE;
use crate::types::BorrowTier;

/// Highest valid credit score
pub const MAX_CREDIT_SCORE: u8 = 100;

/// Largest tier table accepted by the ledger
pub const MAX_TIER_COUNT: usize = 16;

/// Check that a tier table partitions [0, 100] and carries sane parameters.
pub fn validate_tier_table(tiers: &[BorrowTier]) -> bool {
    if tiers.is_empty() || tiers.len() > MAX_TIER_COUNT {
        return false;
    }
    if tiers[0].min_score != 0 {
        return false;
    }
    if tiers[tiers.len() - 1].max_score != MAX_CREDIT_SCORE {
        return false;
    }
    let mut expected_min = 0u16;
    for tier in tiers {
        if tier.min_score as u16 != expected_min || tier.max_score < tier.min_score {
            return false;
        }
        // Over-collateralization is mandatory for every tier
        if tier.collateral_ratio_bps <= BPS_SCALE {
            return false;
        }
        if tier.max_loan_fraction_bps == 0 || tier.max_loan_fraction_bps > BPS_SCALE {
            return false;
        }
        expected_min = tier.max_score as u16 + 1;
    }
    true
}

/// Find the tier containing `score`. Falls back to the most conservative
/// tier if the table somehow misses the score; never fails.
pub fn tier_for(tiers: &[BorrowTier], score: u8) -> BorrowTier {
    for tier in tiers {
        if score >= tier.min_score && score <= tier.max_score {
            return *tier;
        }
    }
    tiers[0]
}

/// Index of the tier containing `score`, for display purposes.
pub fn tier_index_for(tiers: &[BorrowTier], score: u8) -> u8 {
    for (index, tier) in tiers.iter().enumerate() {
        if score >= tier.min_score && score <= tier.max_score {
            return index as u8;
        }
    }
    0
}

/// Default five-bucket tier table.
pub fn default_tier_table() -> Vec<BorrowTier> {
    vec![
        BorrowTier {
            min_score: 0,
            max_score: 39,
            collateral_ratio_bps: 18_000,
            interest_rate_modifier_bps: 200,
            max_loan_fraction_bps: 500,
        },
        BorrowTier {
            min_score: 40,
            max_score: 59,
            collateral_ratio_bps: 16_000,
            interest_rate_modifier_bps: 100,
            max_loan_fraction_bps: 1000,
        },
        BorrowTier {
            min_score: 60,
            max_score: 79,
            collateral_ratio_bps: 14_500,
            interest_rate_modifier_bps: 0,
            max_loan_fraction_bps: 2000,
        },
        BorrowTier {
            min_score: 80,
            max_score: 89,
            collateral_ratio_bps: 13_000,
            interest_rate_modifier_bps: -50,
            max_loan_fraction_bps: 3000,
        },
        BorrowTier {
            min_score: 90,
            max_score: 100,
            collateral_ratio_bps: 12_000,
            interest_rate_modifier_bps: -100,
            max_loan_fraction_bps: 4000,
        },
    ]
}

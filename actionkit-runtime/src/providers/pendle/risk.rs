//! Risk-tolerance filtering of Pendle pools.

use alloy::primitives::U256;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::contracts::{MarketDetails, PoolDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub const ALL: &'static [&'static str] = &["low", "medium", "high"];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        }
    }
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits a pool must satisfy to be recommended at one tolerance level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskThresholds {
    /// Minimum total supply, in whole 18-decimal units.
    pub min_liquidity: U256,
    /// Highest APR (percent) still considered sustainable. `None` = no cap.
    pub max_apr_percent: Option<Decimal>,
    pub min_time_to_expiry: TimeDelta,
}

/// Mapping from tolerance level to thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskPolicy {
    pub low: RiskThresholds,
    pub medium: RiskThresholds,
    pub high: RiskThresholds,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            low: RiskThresholds {
                min_liquidity: U256::from(1_000_000u64),
                max_apr_percent: Some(Decimal::from(15)),
                min_time_to_expiry: TimeDelta::days(30),
            },
            medium: RiskThresholds {
                min_liquidity: U256::from(100_000u64),
                max_apr_percent: Some(Decimal::from(40)),
                min_time_to_expiry: TimeDelta::days(7),
            },
            high: RiskThresholds {
                min_liquidity: U256::ZERO,
                max_apr_percent: None,
                min_time_to_expiry: TimeDelta::days(1),
            },
        }
    }
}

/// A market with its pool figures, as read in one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolCandidate {
    pub market: MarketDetails,
    pub pool: PoolDetails,
}

impl RiskPolicy {
    pub fn thresholds(&self, tolerance: RiskTolerance) -> &RiskThresholds {
        match tolerance {
            RiskTolerance::Low => &self.low,
            RiskTolerance::Medium => &self.medium,
            RiskTolerance::High => &self.high,
        }
    }

    /// Keep the pools acceptable at `tolerance`, best APR first.
    ///
    /// Inactive and expired markets never pass. Equal APRs are ordered by
    /// market address so the output is stable.
    pub fn select(
        &self,
        tolerance: RiskTolerance,
        candidates: Vec<PoolCandidate>,
        now: DateTime<Utc>,
    ) -> Vec<PoolCandidate> {
        let limits = self.thresholds(tolerance);
        let mut selected: Vec<PoolCandidate> = candidates
            .into_iter()
            .filter(|c| c.market.is_active() && !c.market.is_expired(now))
            .filter(|c| c.market.expiry - now >= limits.min_time_to_expiry)
            .filter(|c| c.pool.liquidity_units() >= limits.min_liquidity)
            .filter(|c| {
                limits
                    .max_apr_percent
                    .is_none_or(|max| c.pool.apr_percent <= max)
            })
            .collect();

        selected.sort_by(|a, b| {
            b.pool
                .apr_percent
                .cmp(&a.pool.apr_percent)
                .then_with(|| a.market.market.cmp(&b.market.market))
        });
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::pendle::contracts::MarketState;
    use alloy::primitives::{Address, address};

    const SY: Address = address!("0x00000000000000000000000000000000000000b1");

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    }

    fn candidate(
        market: Address,
        apr: i64,
        liquidity: u64,
        days_left: i64,
        state: MarketState,
    ) -> PoolCandidate {
        let supply = U256::from(liquidity) * U256::from(10u64).pow(U256::from(18u64));
        PoolCandidate {
            market: MarketDetails {
                market,
                yield_token: SY,
                expiry: now() + TimeDelta::days(days_left),
                state,
            },
            pool: PoolDetails {
                total_supply: supply,
                virtual_total_supply: supply,
                apr_percent: Decimal::from(apr),
            },
        }
    }

    fn pool(last_byte: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last_byte;
        Address::from(bytes)
    }

    fn universe() -> Vec<PoolCandidate> {
        vec![
            // Safe: deep, modest APR, long dated.
            candidate(pool(1), 8, 5_000_000, 180, MarketState::Active),
            // Medium: mid liquidity, higher APR.
            candidate(pool(2), 25, 300_000, 20, MarketState::Active),
            // Degen: thin, very high APR, short dated.
            candidate(pool(3), 120, 10, 2, MarketState::Active),
            // Never shown.
            candidate(pool(4), 10, 9_000_000, 365, MarketState::Inactive),
            candidate(pool(5), 10, 9_000_000, -1, MarketState::Active),
        ]
    }

    fn markets(selected: &[PoolCandidate]) -> Vec<Address> {
        selected.iter().map(|c| c.market.market).collect()
    }

    #[test]
    fn test_low_tolerance() {
        let selected = RiskPolicy::default().select(RiskTolerance::Low, universe(), now());
        assert_eq!(markets(&selected), vec![pool(1)]);
    }

    #[test]
    fn test_medium_tolerance() {
        let selected = RiskPolicy::default().select(RiskTolerance::Medium, universe(), now());
        assert_eq!(markets(&selected), vec![pool(2), pool(1)]);
    }

    #[test]
    fn test_high_tolerance_ranks_by_apr() {
        let selected = RiskPolicy::default().select(RiskTolerance::High, universe(), now());
        assert_eq!(markets(&selected), vec![pool(3), pool(2), pool(1)]);
    }

    #[test]
    fn test_ties_broken_by_address() {
        let candidates = vec![
            candidate(pool(9), 12, 2_000_000, 90, MarketState::Active),
            candidate(pool(7), 12, 2_000_000, 90, MarketState::Active),
        ];
        let selected = RiskPolicy::default().select(RiskTolerance::Low, candidates, now());
        assert_eq!(markets(&selected), vec![pool(7), pool(9)]);
    }

    #[test]
    fn test_custom_policy() {
        let mut policy = RiskPolicy::default();
        policy.low.max_apr_percent = None;
        policy.low.min_liquidity = U256::ZERO;
        policy.low.min_time_to_expiry = TimeDelta::zero();
        let selected = policy.select(RiskTolerance::Low, universe(), now());
        assert_eq!(markets(&selected), vec![pool(3), pool(2), pool(1)]);
    }

    #[test]
    fn test_tolerance_serde() {
        let t: RiskTolerance = serde_json::from_value(serde_json::json!("medium")).unwrap();
        assert_eq!(t, RiskTolerance::Medium);
        assert_eq!(t.to_string(), "medium");
    }
}

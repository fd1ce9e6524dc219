use std::fmt;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Five ordinal severity levels. The serialized labels are what the map legend binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [Self::VeryLow, Self::Low, Self::Medium, Self::High, Self::VeryHigh];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very-low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        }
    }

    /// Label used by the Chinese-language dashboard.
    pub fn zh_label(&self) -> &'static str {
        match self {
            Self::VeryLow => "极低风险",
            Self::Low => "低风险",
            Self::Medium => "中风险",
            Self::High => "高风险",
            Self::VeryHigh => "极高风险",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Upper bounds (inclusive) of the four lowest levels; anything above `high` is very-high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub very_low: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl RiskThresholds {
    pub const FLOOD: Self = Self { very_low: 1.0, low: 2.0, medium: 3.0, high: 4.5 };
    pub const FIRE: Self = Self { very_low: 0.0, low: 1.5, medium: 2.5, high: 3.5 };

    /// Bounds must be finite and strictly increasing.
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.very_low, self.low, self.medium, self.high];
        ensure!(bounds.iter().all(|b| b.is_finite()), "risk thresholds must be finite: {bounds:?}");
        ensure!(bounds.windows(2).all(|w| w[0] < w[1]), "risk thresholds must be strictly increasing: {bounds:?}");
        Ok(())
    }

    /// Map a score onto a level. Intervals are right-inclusive; NaN falls through to very-high.
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score <= self.very_low {
            RiskLevel::VeryLow
        } else if score <= self.low {
            RiskLevel::Low
        } else if score <= self.medium {
            RiskLevel::Medium
        } else if score <= self.high {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }
}

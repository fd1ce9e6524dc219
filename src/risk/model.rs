use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    common,
    features::RegionMeta,
    risk::{RiskLevel, RiskThresholds},
    weather::WeatherObservation,
};

/// Linear flood score: `alpha * precipitation + beta * lowland_index + gamma * impervious_frac`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodModel {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for FloodModel {
    fn default() -> Self { Self { alpha: 1.0, beta: 1.2, gamma: 1.5 } }
}

impl FloodModel {
    #[inline]
    pub fn score(&self, precipitation: f64, lowland_index: f64, impervious_frac: f64) -> f64 {
        self.alpha * precipitation + self.beta * lowland_index + self.gamma * impervious_frac
    }
}

/// Fire score: `(temperature / temperature_divisor - humidity / humidity_divisor + wind_speed) * weight`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireModel {
    pub temperature_divisor: f64,
    pub humidity_divisor: f64,
}

impl Default for FireModel {
    fn default() -> Self { Self { temperature_divisor: 20.0, humidity_divisor: 10.0 } }
}

impl FireModel {
    #[inline]
    pub fn score(&self, temperature: f64, humidity: f64, wind_speed: f64, fire_weight: f64) -> f64 {
        (temperature / self.temperature_divisor - humidity / self.humidity_divisor + wind_speed) * fire_weight
    }
}

/// Coefficients and classification bounds for both hazards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskModel {
    pub flood: FloodModel,
    pub fire: FireModel,
    pub flood_thresholds: RiskThresholds,
    pub fire_thresholds: RiskThresholds,
}

impl Default for RiskModel {
    fn default() -> Self {
        Self {
            flood: FloodModel::default(),
            fire: FireModel::default(),
            flood_thresholds: RiskThresholds::FLOOD,
            fire_thresholds: RiskThresholds::FIRE,
        }
    }
}

impl RiskModel {
    /// Load a model from JSON; omitted fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let model: Self = common::read_json_file(path)?;
        model.validate().with_context(|| format!("invalid risk model: {}", path.display()))?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        let f = &self.flood;
        ensure!([f.alpha, f.beta, f.gamma].iter().all(|c| c.is_finite() && *c >= 0.0),
            "flood coefficients must be finite and non-negative");
        let g = &self.fire;
        ensure!([g.temperature_divisor, g.humidity_divisor].iter().all(|d| d.is_finite() && *d > 0.0),
            "fire divisors must be finite and positive");
        self.flood_thresholds.validate().context("flood thresholds")?;
        self.fire_thresholds.validate().context("fire thresholds")?;
        Ok(())
    }

    /// Score one region against one observation.
    /// None when the region's lowland index is unknown.
    pub fn assess(&self, meta: &RegionMeta, obs: &WeatherObservation) -> Option<RiskRecord> {
        let lowland_index = meta.lowland_index?;

        let flood_score = self.flood.score(obs.precipitation, lowland_index, meta.impervious_frac);
        let fire_score = self.fire.score(obs.temperature, obs.humidity, obs.wind_speed, meta.fire_risk_weight);

        Some(RiskRecord {
            flood_score,
            flood_risk_level: self.flood_thresholds.classify(flood_score),
            fire_score,
            fire_risk_level: self.fire_thresholds.classify(fire_score),
            precip: obs.precipitation,
            lowland_index,
            impervious_frac: meta.impervious_frac,
            temperature: obs.temperature,
            humidity: obs.humidity,
            wind_speed: obs.wind_speed,
            fire_weight: meta.fire_risk_weight,
            datetime: obs.datetime.clone(),
        })
    }
}

/// Scores, levels, and the exact inputs that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub flood_score: f64,
    pub flood_risk_level: RiskLevel,
    pub fire_score: f64,
    pub fire_risk_level: RiskLevel,
    pub precip: f64,
    pub lowland_index: f64,
    pub impervious_frac: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub fire_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
}

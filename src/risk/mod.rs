//! Flood and fire scoring of static region features against a weather observation.

mod level;
mod model;
mod score;

pub use level::{RiskLevel, RiskThresholds};
pub use model::{FireModel, FloodModel, RiskModel, RiskRecord};
pub use score::{estimate_region_risk, score_horizon};

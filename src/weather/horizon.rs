use std::{fmt, str::FromStr, sync::LazyLock};

use anyhow::{Error, Result, anyhow};
use regex::Regex;

/// Horizon tokens offered to users.
pub const STANDARD_HORIZONS: [&str; 7] = [
    "now", "forecast-3h", "forecast-6h", "forecast-12h", "forecast-24h", "forecast-48h", "forecast-72h",
];

static FORECAST_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^forecast-([1-9]\d*)h$").expect("valid regex")
});

/// The time offset a weather observation and its risk score apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Horizon {
    Now,
    Forecast { hours: u32 },
}

impl Horizon {
    /// Key of this horizon in a region's forecast mapping ("3h", "24h", ...); None for `Now`.
    pub fn forecast_key(&self) -> Option<String> {
        match self {
            Horizon::Now => None,
            Horizon::Forecast { hours } => Some(format!("{hours}h")),
        }
    }
}

impl FromStr for Horizon {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        if token == "now" {
            return Ok(Horizon::Now);
        }
        let caps = FORECAST_TOKEN.captures(token)
            .ok_or_else(|| anyhow!("unknown horizon {token:?}; expected \"now\" or \"forecast-<N>h\""))?;
        let hours = caps[1].parse()
            .map_err(|_| anyhow!("forecast horizon out of range: {token:?}"))?;
        Ok(Horizon::Forecast { hours })
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::Now => f.write_str("now"),
            Horizon::Forecast { hours } => write!(f, "forecast-{hours}h"),
        }
    }
}

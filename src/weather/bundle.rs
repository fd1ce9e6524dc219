use std::{collections::BTreeMap, path::Path};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{common, geom::AdCode, weather::Horizon};

/// One observation as stored in the weather bundle. Any field may be missing;
/// a failed fetch leaves an empty object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
}

impl ObservationRecord {
    pub fn new(temperature: f64, humidity: f64, wind_speed: f64, precipitation: f64) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
            wind_speed: Some(wind_speed),
            precipitation: Some(precipitation),
            ..Default::default()
        }
    }

    /// Resolve into a usable observation. Individual missing fields read as 0;
    /// a record with none of the four meteorological fields is treated as absent.
    pub fn resolve(&self) -> Option<WeatherObservation> {
        let fields = [self.temperature, self.humidity, self.wind_speed, self.precipitation];
        if fields.iter().all(Option::is_none) { return None }

        Some(WeatherObservation {
            temperature: self.temperature.unwrap_or(0.0),
            humidity: self.humidity.unwrap_or(0.0),
            wind_speed: self.wind_speed.unwrap_or(0.0),
            precipitation: self.precipitation.unwrap_or(0.0),
            wind_direction: self.wind_direction,
            datetime: self.datetime.clone(),
        })
    }
}

/// Weather at one region for one horizon: temperature (°C), relative humidity (%),
/// wind speed (m/s) and precipitation (mm over the accumulation window of the source).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherObservation {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
    pub wind_direction: Option<f64>,
    pub datetime: Option<String>,
}

/// Current conditions plus forecasts keyed by horizon label ("3h", "6h", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSet {
    #[serde(default)]
    pub now: Option<ObservationRecord>,
    #[serde(default)]
    pub forecast: BTreeMap<String, ObservationRecord>,
}

/// A region's entry in the weather bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionWeather {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adcode: Option<AdCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default)]
    pub weather: WeatherSet,
}

impl RegionWeather {
    /// Set the current observation.
    pub fn with_now(mut self, record: ObservationRecord) -> Self {
        self.weather.now = Some(record);
        self
    }

    /// Add a forecast observation under a label such as "24h".
    pub fn with_forecast(mut self, label: impl Into<String>, record: ObservationRecord) -> Self {
        self.weather.forecast.insert(label.into(), record);
        self
    }

    /// The observation for `horizon`, if present and non-empty.
    pub fn observation(&self, horizon: &Horizon) -> Option<WeatherObservation> {
        let record = match horizon.forecast_key() {
            None => self.weather.now.as_ref(),
            Some(key) => self.weather.forecast.get(&key),
        };
        record.and_then(ObservationRecord::resolve)
    }
}

/// Externally supplied weather, keyed by region name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherBundle(BTreeMap<String, RegionWeather>);

impl WeatherBundle {
    pub fn new(regions: BTreeMap<String, RegionWeather>) -> Self { Self(regions) }

    /// Load a bundle from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let bundle: Self = common::read_json_file(path)?;
        log::debug!("loaded weather for {} regions from {}", bundle.len(), path.display());
        Ok(bundle)
    }

    pub fn insert(&mut self, name: impl Into<String>, weather: RegionWeather) {
        self.0.insert(name.into(), weather);
    }

    #[inline] pub fn len(&self) -> usize { self.0.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn region(&self, name: &str) -> Option<&RegionWeather> { self.0.get(name) }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

    /// Select the observation for one region and horizon.
    /// None when the region is missing, or has no (non-empty) observation for that horizon.
    pub fn select(&self, region: &str, horizon: &Horizon) -> Option<WeatherObservation> {
        self.region(region)?.observation(horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "广州市": {
            "adcode": 440100, "lon": 113.3, "lat": 23.1,
            "weather": {
                "now": { "temperature": 30.5, "humidity": 70, "wind_speed": 3.0, "wind_direction": null, "precipitation": 0.5 },
                "forecast": {
                    "3h": { "datetime": "2024-06-01 14:00:00", "temperature": 31, "humidity": 65, "wind_speed": 2.5, "precipitation": 1.2 },
                    "6h": { "temperature": 29 }
                }
            }
        },
        "韶关市": { "weather": { "now": {}, "forecast": {} } }
    }"#;

    fn bundle() -> WeatherBundle { serde_json::from_str(SAMPLE).unwrap() }

    #[test]
    fn selects_now_and_forecast() {
        let bundle = bundle();
        let now = bundle.select("广州市", &Horizon::Now).unwrap();
        assert_eq!(now.temperature, 30.5);
        assert_eq!(now.humidity, 70.0);
        assert_eq!(now.wind_direction, None);

        let f3 = bundle.select("广州市", &"forecast-3h".parse().unwrap()).unwrap();
        assert_eq!(f3.precipitation, 1.2);
        assert_eq!(f3.datetime.as_deref(), Some("2024-06-01 14:00:00"));
    }

    #[test]
    fn partial_record_defaults_missing_fields() {
        let f6 = bundle().select("广州市", &Horizon::Forecast { hours: 6 }).unwrap();
        assert_eq!(f6.temperature, 29.0);
        assert_eq!(f6.precipitation, 0.0);
        assert_eq!(f6.humidity, 0.0);
    }

    #[test]
    fn absence_cases() {
        let bundle = bundle();
        // Horizon missing from the forecast map.
        assert!(bundle.select("广州市", &Horizon::Forecast { hours: 72 }).is_none());
        // Empty object written after a failed fetch.
        assert!(bundle.select("韶关市", &Horizon::Now).is_none());
        // Region missing entirely.
        assert!(bundle.select("深圳市", &Horizon::Now).is_none());
    }

    #[test]
    fn builder_matches_parsed_shape() {
        let mut built = WeatherBundle::default();
        built.insert("a", RegionWeather::default()
            .with_now(ObservationRecord::new(20.0, 50.0, 1.0, 0.0))
            .with_forecast("3h", ObservationRecord::new(21.0, 55.0, 2.0, 0.4)));

        let text = serde_json::to_string(&built).unwrap();
        let parsed: WeatherBundle = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, built);
        assert_eq!(parsed.names().collect::<Vec<_>>(), vec!["a"]);
    }
}

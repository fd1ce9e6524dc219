use std::fs;

use approx::assert_abs_diff_eq;
use hazardscope::{
    Horizon, MetaStore, RegionMeta, RiskLevel, RiskModel, RiskRecord, WeatherBundle,
    estimate_region_risk, score_horizon,
};

fn region(name: &str, lowland: Option<f64>, impervious: f64, fire_weight: f64) -> RegionMeta {
    RegionMeta {
        city_name: name.into(),
        adcode: None,
        lon: 113.0,
        lat: 23.0,
        lowland_index: lowland,
        impervious_frac: impervious,
        fire_risk_weight: fire_weight,
    }
}

const WEATHER: &str = r#"{
  "广州市": { "adcode": 440100, "weather": {
      "now": { "temperature": 30, "humidity": 70, "wind_speed": 3, "precipitation": 0.5 },
      "forecast": {
        "3h": { "datetime": "2024-06-01 14:00", "temperature": 30, "humidity": 70, "wind_speed": 3, "precipitation": 5.0 },
        "24h": { "temperature": 38, "humidity": 10, "wind_speed": 6, "precipitation": 0 }
      } } },
  "韶关市": { "weather": {
      "now": { "temperature": 30, "humidity": 70, "wind_speed": 3, "precipitation": 0.5 },
      "forecast": {} } },
  "清远市": { "weather": { "now": {}, "forecast": {} } },
  "香港": { "weather": { "now": { "temperature": 28, "humidity": 80, "wind_speed": 2, "precipitation": 1 } } }
}"#;

fn store() -> MetaStore {
    MetaStore::new(vec![
        region("广州市", Some(0.4), 0.3, 1.0),
        region("韶关市", Some(0.4), 0.3, 1.0),
        region("清远市", Some(0.2), 0.1, 1.4),
        region("河源市", Some(0.1), 0.05, 1.5),
    ]).unwrap()
}

fn bundle() -> WeatherBundle { serde_json::from_str(WEATHER).unwrap() }

#[test]
fn documented_scenarios() {
    let results = estimate_region_risk(&store(), &bundle(), "now", &RiskModel::default());
    let gz = &results["广州市"];
    assert_abs_diff_eq!(gz.flood_score, 1.43, epsilon = 1e-12);
    assert_eq!(gz.flood_risk_level, RiskLevel::Low);
    assert_abs_diff_eq!(gz.fire_score, -2.5, epsilon = 1e-12);
    assert_eq!(gz.fire_risk_level, RiskLevel::VeryLow);

    let results = estimate_region_risk(&store(), &bundle(), "forecast-3h", &RiskModel::default());
    let gz = &results["广州市"];
    assert_abs_diff_eq!(gz.flood_score, 5.93, epsilon = 1e-12);
    assert_eq!(gz.flood_risk_level, RiskLevel::VeryHigh);
    assert_eq!(gz.datetime.as_deref(), Some("2024-06-01 14:00"));
}

#[test]
fn hot_dry_windy_forecast_is_very_high_fire_risk() {
    let results = score_horizon(&store(), &bundle(), &Horizon::Forecast { hours: 24 }, &RiskModel::default());
    let gz = &results["广州市"];
    // (38/20 - 10/10 + 6) * 1.0
    assert_abs_diff_eq!(gz.fire_score, 6.9, epsilon = 1e-12);
    assert_eq!(gz.fire_risk_level, RiskLevel::VeryHigh);
    assert_eq!(gz.precip, 0.0);
}

#[test]
fn missing_weather_excludes_only_that_region() {
    let results = estimate_region_risk(&store(), &bundle(), "now", &RiskModel::default());
    // 清远市 has an empty observation, 河源市 no entry, 香港 no static record.
    assert_eq!(results.keys().map(String::as_str).collect::<Vec<_>>(), vec!["广州市", "韶关市"]);
    assert_eq!(results["广州市"], results["韶关市"]);

    let forecast = estimate_region_risk(&store(), &bundle(), "forecast-3h", &RiskModel::default());
    assert_eq!(forecast.len(), 1);
    assert!(estimate_region_risk(&store(), &bundle(), "forecast-72h", &RiskModel::default()).is_empty());
    assert!(estimate_region_risk(&store(), &bundle(), "yesterday", &RiskModel::default()).is_empty());
}

#[test]
fn scoring_is_repeatable_byte_for_byte() {
    let model = RiskModel::default();
    let runs = (0..3)
        .map(|_| serde_json::to_string(&estimate_region_risk(&store(), &bundle(), "now", &model)).unwrap())
        .collect::<Vec<_>>();
    assert!(runs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn results_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let meta = dir.path().join("meta.json");
    let weather = dir.path().join("weather.json");
    store().save(&meta, false).unwrap();
    fs::write(&weather, WEATHER).unwrap();

    let store = MetaStore::load(&meta).unwrap();
    let bundle = WeatherBundle::load(&weather).unwrap();
    let results = estimate_region_risk(&store, &bundle, "now", &RiskModel::default());

    let out = dir.path().join("risk.json");
    hazardscope::write_json_file(&out, &results, false).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"flood_risk_level\": \"low\""));
    assert!(text.contains("\"fire_risk_level\": \"very-low\""));

    let back: std::collections::BTreeMap<String, RiskRecord> = hazardscope::read_json_file(&out).unwrap();
    assert_eq!(back, results);
}

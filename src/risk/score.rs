use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::{
    features::MetaStore,
    risk::{RiskModel, RiskRecord},
    weather::{Horizon, WeatherBundle},
};

/// Score every region of `store` for one horizon.
///
/// Regions without weather for the horizon, or with an unknown lowland index, are left out
/// of the result with a warning. Weather entries for regions missing from `store` are ignored.
pub fn score_horizon(
    store: &MetaStore,
    bundle: &WeatherBundle,
    horizon: &Horizon,
    model: &RiskModel,
) -> BTreeMap<String, RiskRecord> {
    for name in bundle.names().filter(|name| !store.contains(name)) {
        log::warn!("weather for {name} has no static feature record; ignored");
    }

    let results = store.records().par_iter()
        .filter_map(|meta| {
            let name = &meta.city_name;
            let Some(obs) = bundle.select(name, horizon) else {
                log::warn!("no {horizon} weather for {name}; skipped");
                return None;
            };
            let Some(record) = model.assess(meta, &obs) else {
                log::warn!("lowland index unknown for {name}; skipped");
                return None;
            };
            Some((name.clone(), record))
        })
        .collect::<Vec<_>>();

    log::info!("scored {}/{} regions for {horizon}", results.len(), store.len());
    results.into_iter().collect()
}

/// Score every region for a horizon token such as `"now"` or `"forecast-24h"`.
/// An unrecognized token yields an empty result.
pub fn estimate_region_risk(
    store: &MetaStore,
    bundle: &WeatherBundle,
    token: &str,
    model: &RiskModel,
) -> BTreeMap<String, RiskRecord> {
    match token.parse::<Horizon>() {
        Ok(horizon) => score_horizon(store, bundle, &horizon, model),
        Err(e) => {
            log::warn!("{e}");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        features::RegionMeta,
        risk::RiskLevel,
        weather::{ObservationRecord, RegionWeather},
    };

    fn meta(name: &str, lowland: Option<f64>) -> RegionMeta {
        RegionMeta {
            city_name: name.into(),
            adcode: None,
            lon: 0.0,
            lat: 0.0,
            lowland_index: lowland,
            impervious_frac: 0.3,
            fire_risk_weight: 1.0,
        }
    }

    fn fixture() -> (MetaStore, WeatherBundle) {
        let store = MetaStore::new(vec![
            meta("a", Some(0.4)),
            meta("b", Some(0.4)),
            meta("c", None),
            meta("d", Some(0.1)),
        ]).unwrap();

        let mut bundle = WeatherBundle::default();
        bundle.insert("a", RegionWeather::default()
            .with_now(ObservationRecord::new(30.0, 70.0, 3.0, 0.5))
            .with_forecast("24h", ObservationRecord::new(30.0, 70.0, 3.0, 5.0)));
        bundle.insert("b", RegionWeather::default().with_now(ObservationRecord::new(30.0, 70.0, 3.0, 0.5)));
        bundle.insert("c", RegionWeather::default().with_now(ObservationRecord::new(30.0, 70.0, 3.0, 0.5)));
        bundle.insert("d", RegionWeather::default().with_now(ObservationRecord::default()));
        bundle.insert("z", RegionWeather::default().with_now(ObservationRecord::new(30.0, 70.0, 3.0, 0.5)));
        (store, bundle)
    }

    #[test]
    fn skips_regions_without_inputs() {
        let (store, bundle) = fixture();
        let now = estimate_region_risk(&store, &bundle, "now", &RiskModel::default());
        // c: unknown lowland, d: empty observation, z: not in the store.
        assert_eq!(now.keys().map(String::as_str).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(now["a"], now["b"]);
        assert_eq!(now["a"].flood_risk_level, RiskLevel::Low);
    }

    #[test]
    fn forecast_horizon_only_scores_regions_with_that_forecast() {
        let (store, bundle) = fixture();
        let f24 = estimate_region_risk(&store, &bundle, "forecast-24h", &RiskModel::default());
        assert_eq!(f24.len(), 1);
        assert_eq!(f24["a"].flood_risk_level, RiskLevel::VeryHigh);
    }

    #[test]
    fn unknown_token_gives_empty_result() {
        let (store, bundle) = fixture();
        assert!(estimate_region_risk(&store, &bundle, "tomorrow", &RiskModel::default()).is_empty());
    }

    #[test]
    fn repeated_scoring_is_identical() {
        let (store, bundle) = fixture();
        let model = RiskModel::default();
        let first = serde_json::to_string(&estimate_region_risk(&store, &bundle, "now", &model)).unwrap();
        let second = serde_json::to_string(&estimate_region_risk(&store, &bundle, "now", &model)).unwrap();
        assert_eq!(first, second);
    }
}

use std::collections::BTreeMap;

use anyhow::Result;
use hazardscope::{MetaStore, RiskModel, WeatherBundle, assert_not_stdout, estimate_region_risk, write_json_file};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ScoreArgs) -> Result<()> {
    assert_not_stdout(&args.out)?;

    let model = match &args.model {
        Some(path) => RiskModel::from_file(path)?,
        None => RiskModel::default(),
    };
    let store = MetaStore::load(&args.meta)?;
    let bundle = WeatherBundle::load(&args.weather)?;

    let horizons = if args.horizons.is_empty() { vec!["now".to_string()] } else { args.horizons.clone() };

    // One horizon: regions at the top level. Several: keyed by horizon token first.
    if let [token] = horizons.as_slice() {
        let results = estimate_region_risk(&store, &bundle, token, &model);
        if cli.verbose > 0 { eprintln!("[score] {token}: {}/{} regions", results.len(), store.len()); }
        write_json_file(&args.out, &results, args.force)?;
    } else {
        let mut results = BTreeMap::new();
        for token in &horizons {
            let scored = estimate_region_risk(&store, &bundle, token, &model);
            if cli.verbose > 0 { eprintln!("[score] {token}: {}/{} regions", scored.len(), store.len()); }
            results.insert(token.clone(), scored);
        }
        write_json_file(&args.out, &results, args.force)?;
    }

    Ok(())
}

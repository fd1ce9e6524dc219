use std::{collections::BTreeMap, fs, io::Write, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{Map, Value, json};

use crate::{common, config::BoundaryConfig, geom::{AdCode, Crs, Regions}};

use super::{BoundarySummary, RawFeature};

fn read_collection(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse GeoJSON file: {}", path.display()))?;
    if value["type"].as_str() != Some("FeatureCollection") {
        bail!("{} is not a GeoJSON FeatureCollection", path.display());
    }
    Ok(value)
}

/// Property value as text; numbers are rendered without a trailing ".0".
fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => n.as_f64().map(|n| AdCode::from(n).to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn property_code(value: &Value) -> Option<AdCode> {
    match value {
        Value::Number(n) => n.as_i64().map(AdCode::Int).or_else(|| n.as_f64().map(AdCode::from)),
        Value::String(s) if !s.trim().is_empty() => Some(AdCode::Text(s.trim().to_string())),
        _ => None,
    }
}

/// Parse a ring: [[x, y], [x, y], ...]
fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let points = value.as_array()
        .ok_or_else(|| anyhow!("Invalid ring: expected an array of positions"))?;
    let mut coords = points.iter()
        .map(|point| {
            let xy = point.as_array()
                .filter(|xy| xy.len() >= 2)
                .ok_or_else(|| anyhow!("Invalid position: {point}"))?;
            match (xy[0].as_f64(), xy[1].as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => bail!("Invalid position: {point}"),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }
    Ok(LineString(coords))
}

/// Parse polygon coordinates: [exterior, hole, hole, ...]
fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value.as_array()
        .ok_or_else(|| anyhow!("Invalid Polygon: expected an array of rings"))?;
    let (exterior, holes) = rings.split_first()
        .ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))?;
    Ok(Polygon::new(
        parse_ring(exterior)?,
        holes.iter().map(parse_ring).collect::<Result<Vec<_>>>()?,
    ))
}

fn parse_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = &geometry["coordinates"];
    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon(coords)?])),
        Some("MultiPolygon") => Ok(MultiPolygon(
            coords.as_array()
                .ok_or_else(|| anyhow!("Invalid MultiPolygon coordinates"))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => bail!("unsupported boundary geometry type: {other:?}"),
    }
}

/// GeoJSON is WGS84 unless a legacy `crs` member says otherwise.
fn collection_crs(collection: &Value) -> Option<Crs> {
    match collection["crs"]["properties"]["name"].as_str() {
        Some(name) => Crs::from_urn(name),
        None => Some(Crs::wgs84()),
    }
}

pub(super) fn read_features(path: &Path, config: &BoundaryConfig) -> Result<(Vec<RawFeature>, Option<Crs>)> {
    let collection = read_collection(path)?;
    let features = collection["features"].as_array()
        .ok_or_else(|| anyhow!("{} has no features array", path.display()))?
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let properties = &feature["properties"];
            Ok(RawFeature {
                shape: parse_geometry(&feature["geometry"])
                    .with_context(|| format!("feature {i} in {}", path.display()))?,
                name: property_text(&properties[config.name_field.as_str()]).filter(|s| !s.is_empty()),
                code: property_code(&properties[config.code_field.as_str()]),
                province: property_text(&properties[config.province_field.as_str()]),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((features, collection_crs(&collection)))
}

pub(super) fn describe(path: &Path) -> Result<BoundarySummary> {
    let collection = read_collection(path)?;
    let features = collection["features"].as_array().cloned().unwrap_or_default();

    let mut geometry_mix = BTreeMap::new();
    for feature in &features {
        let kind = feature["geometry"]["type"].as_str().unwrap_or("Other").to_string();
        *geometry_mix.entry(kind).or_default() += 1;
    }

    let fields = features.first()
        .and_then(|feature| feature["properties"].as_object())
        .map(|properties| properties.iter()
            .map(|(key, value)| (key.clone(), property_text(value).unwrap_or_default()))
            .collect())
        .unwrap_or_default();

    Ok(BoundarySummary { records: features.len(), geometry_mix, fields })
}

/// Convert a MultiPolygon to a GeoJSON geometry object.
fn multipolygon_to_geojson(shape: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| ls.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
    let polygons = shape.0.iter()
        .map(|polygon| std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(ring)
            .collect::<Vec<_>>())
        .collect::<Vec<_>>();

    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// Export regions as a GeoJSON FeatureCollection with `name` and `adcode` properties.
pub fn write_boundaries_geojson(regions: &Regions, path: &Path, force: bool) -> Result<()> {
    let features = regions.iter()
        .map(|region| {
            let mut properties = Map::new();
            properties.insert("name".to_string(), json!(region.name));
            properties.insert("adcode".to_string(), json!(region.code));
            json!({
                "type": "Feature",
                "id": region.name,
                "geometry": multipolygon_to_geojson(&region.shape),
                "properties": properties,
            })
        })
        .collect::<Vec<_>>();

    let mut collection = json!({ "type": "FeatureCollection", "features": features });
    if let Some(code) = regions.crs().epsg().filter(|&code| code != 4326) {
        collection["crs"] = json!({ "type": "name", "properties": { "name": format!("urn:ogc:def:crs:EPSG::{code}") } });
    }

    let mut pending = common::open_for_write(path, force)?;
    serde_json::to_writer(&mut pending, &collection)
        .with_context(|| format!("Failed to serialize GeoJSON to {}", path.display()))?;
    pending.write_all(b"\n")?;
    pending.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::RegionPolygon;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature",
              "properties": { "地级": "广州市", "地级码": 440100, "省级": "广东省" },
              "geometry": { "type": "Polygon", "coordinates": [[[113,23],[114,23],[114,24],[113,24],[113,23]]] } },
            { "type": "Feature",
              "properties": { "地级": "桂林市", "地级码": "450300", "省级": "广西壮族自治区" },
              "geometry": { "type": "MultiPolygon", "coordinates": [[[[110,25],[111,25],[111,26],[110,25]]]] } }
        ]
    }"#;

    fn write_sample(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("cities.geojson");
        fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn reads_polygons_and_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());
        let (features, crs) = read_features(&path, &BoundaryConfig::default()).unwrap();

        assert_eq!(crs.unwrap().epsg(), Some(4326));
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name.as_deref(), Some("广州市"));
        assert_eq!(features[0].code, Some(AdCode::Int(440100)));
        assert_eq!(features[1].code, Some(AdCode::Text("450300".into())));
        assert_eq!(features[1].province.as_deref(), Some("广西壮族自治区"));
        assert_eq!(features[1].shape.0.len(), 1);
    }

    #[test]
    fn load_filters_by_province() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());
        let config = BoundaryConfig { province: Some("广东省".into()), ..Default::default() };

        let regions = crate::geom::load_boundaries(&path, &config, &Crs::wgs84()).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(regions.get("广州市").is_some());
    }

    #[test]
    fn describe_lists_fields() {
        let dir = tempfile::tempdir().unwrap();
        let summary = describe(&write_sample(dir.path())).unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.geometry_mix["Polygon"], 1);
        assert_eq!(summary.geometry_mix["MultiPolygon"], 1);
        assert!(summary.fields.iter().any(|(k, v)| k == "地级" && v == "广州市"));
    }

    #[test]
    fn export_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let shape = parse_geometry(&json!({
            "type": "Polygon",
            "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]], [[0.2,0.2],[0.4,0.2],[0.4,0.4],[0.2,0.2]]]
        })).unwrap();
        let regions = Regions::new(
            vec![RegionPolygon::new("a", Some(AdCode::Int(7)), shape)],
            Crs::wgs84(),
        ).unwrap();

        let path = dir.path().join("border.geojson");
        write_boundaries_geojson(&regions, &path, false).unwrap();

        let config = BoundaryConfig { name_field: "name".into(), code_field: "adcode".into(), ..Default::default() };
        let (features, _) = read_features(&path, &config).unwrap();
        assert_eq!(features[0].name.as_deref(), Some("a"));
        assert_eq!(features[0].code, Some(AdCode::Int(7)));
        assert_eq!(features[0].shape.0[0].interiors().len(), 1);
    }

    #[test]
    fn rejects_unsupported_geometry() {
        assert!(parse_geometry(&json!({ "type": "Point", "coordinates": [0, 0] })).is_err());
    }
}

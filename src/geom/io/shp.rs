use std::{collections::BTreeMap, fs::{self, File}, io::BufReader, path::Path};

use anyhow::{Context, Result, bail};
use dbase::encoding::EncodingRs;
use encoding_rs::Encoding;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{self as shp, Reader, Shape, ShapeReader, dbase::{FieldValue, Record}};

use crate::{config::BoundaryConfig, geom::{AdCode, Crs}};

use super::{BoundarySummary, RawFeature};

/// Map a `.cpg` code page label to a text encoding.
fn cpg_encoding(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    let label = label.strip_prefix("ANSI ").unwrap_or(label).trim();
    match label.to_ascii_uppercase().as_str() {
        "936" | "CP936" => Some(encoding_rs::GBK),
        "950" | "CP950" => Some(encoding_rs::BIG5),
        "932" | "CP932" => Some(encoding_rs::SHIFT_JIS),
        "949" | "CP949" => Some(encoding_rs::EUC_KR),
        "65001" | "UTF8" => Some(encoding_rs::UTF_8),
        code if code.chars().all(|c| c.is_ascii_digit()) => Encoding::for_label(format!("windows-{code}").as_bytes()),
        _ => Encoding::for_label(label.as_bytes()),
    }
}

/// Attribute table reader, decoding text with the `.cpg` sidecar's code page when there is one.
fn open_dbf(path: &Path) -> Result<dbase::Reader<BufReader<File>>> {
    let dbf = path.with_extension("dbf");
    let source = BufReader::new(File::open(&dbf)
        .with_context(|| format!("Failed to open attribute table: {}", dbf.display()))?);

    let cpg = path.with_extension("cpg");
    let encoding = match fs::read_to_string(&cpg) {
        Ok(label) => {
            let encoding = cpg_encoding(&label);
            if encoding.is_none() {
                log::warn!("unknown code page {:?} in {}; reading attributes as UTF-8", label.trim(), cpg.display());
            }
            encoding
        }
        Err(_) => None,
    };

    let reader = match encoding {
        Some(encoding) => dbase::Reader::new_with_encoding(source, EncodingRs::from(encoding)),
        None => dbase::Reader::new(source),
    };
    reader.with_context(|| format!("Failed to read attribute table: {}", dbf.display()))
}

/// Reads all shapes + attribute records from a given `.shp` file path.
fn read_shapefile(path: &Path) -> Result<Vec<(Shape, Record)>> {
    let shapes = ShapeReader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;
    let mut reader = Reader::new(shapes, open_dbf(path)?);

    let mut items = Vec::with_capacity(reader.shape_count()?);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape+record")?;
        items.push((shape, record));
    }
    Ok(items)
}

/// Read the `.prj` sidecar, if present and recognizable.
fn read_prj(path: &Path) -> Option<Crs> {
    let wkt = fs::read_to_string(path.with_extension("prj")).ok()?;
    let crs = Crs::from_prj_wkt(&wkt);
    if crs.is_none() {
        log::warn!("unrecognized projection in {}", path.with_extension("prj").display());
    }
    crs
}

/// Coerce a generic shape into an owned multipolygon, raising error if different shape
fn shape_to_multipolygon(shape: Shape) -> Result<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(polygon) => Ok(shp_to_geo(&polygon)),
        other => bail!("found non-Polygon shape in boundary file: {:?}", other.shapetype()),
    }
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>.
/// Shapefile stores each outer ring followed by its holes.
fn shp_to_geo(polygon: &shp::Polygon) -> MultiPolygon<f64> {
    fn to_line_string(points: &[shp::Point]) -> LineString<f64> {
        let mut coords = points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect::<Vec<_>>();
        if coords.first() != coords.last() {
            coords.push(coords[0]);
        }
        LineString(coords)
    }

    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in polygon.rings() {
        match ring {
            shp::PolygonRing::Outer(points) => {
                if let Some(previous) = exterior.replace(to_line_string(points)) {
                    polygons.push(Polygon::new(previous, std::mem::take(&mut holes)));
                }
            }
            shp::PolygonRing::Inner(points) => holes.push(to_line_string(points)),
        }
    }
    if let Some(last) = exterior {
        polygons.push(Polygon::new(last, holes));
    }

    MultiPolygon(polygons)
}

/// Render a dBase field as text, or None when the value is null.
fn field_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(AdCode::from(*n).to_string()),
        FieldValue::Float(Some(n)) => Some(AdCode::from(*n as f64).to_string()),
        FieldValue::Double(n) | FieldValue::Currency(n) => Some(AdCode::from(*n).to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        FieldValue::Logical(Some(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// Read an administrative code, keeping numeric fields numeric.
fn field_code(value: &FieldValue) -> Option<AdCode> {
    match value {
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => Some(AdCode::from(*n)),
        FieldValue::Integer(n) => Some(AdCode::Int(*n as i64)),
        other => field_text(other).filter(|s| !s.is_empty()).map(AdCode::Text),
    }
}

pub(super) fn read_features(path: &Path, config: &BoundaryConfig) -> Result<(Vec<RawFeature>, Option<Crs>)> {
    let features = read_shapefile(path)?.into_iter()
        .map(|(shape, record)| Ok(RawFeature {
            shape: shape_to_multipolygon(shape)
                .with_context(|| format!("Error converting shapes in shapefile: {}", path.display()))?,
            name: record.get(&config.name_field).and_then(field_text).filter(|s| !s.is_empty()),
            code: record.get(&config.code_field).and_then(field_code),
            province: record.get(&config.province_field).and_then(field_text),
        }))
        .collect::<Result<Vec<_>>>()?;

    Ok((features, read_prj(path)))
}

pub(super) fn describe(path: &Path) -> Result<BoundarySummary> {
    let items = read_shapefile(path)?;

    let mut geometry_mix = BTreeMap::new();
    for (shape, _) in &items {
        let kind = match shape {
            Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_) => "Point",
            Shape::Polygon(_) | Shape::PolygonM(_) | Shape::PolygonZ(_) => "Polygon",
            _ => "Other",
        };
        *geometry_mix.entry(kind.to_string()).or_default() += 1;
    }

    let fields = items.first()
        .map(|(_, record)| record.clone().into_iter()
            .map(|(field, value)| (field, field_text(&value).unwrap_or_default()))
            .collect())
        .unwrap_or_default();

    Ok(BoundarySummary { records: items.len(), geometry_mix, fields })
}

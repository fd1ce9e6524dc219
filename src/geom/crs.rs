use std::{fmt, sync::LazyLock};

use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use regex::Regex;

/// A coordinate reference system, held as a PROJ.4 definition plus its EPSG code when known.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    epsg: Option<u32>,
    proj4: String,
}

static EPSG_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*epsg:{1,2}(\d+)\s*$").expect("valid regex")
});

static WKT_UTM_ZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)UTM[_ ]zone[_ ](\d{1,2})([NS])").expect("valid regex")
});

static URN_EPSG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)EPSG:{1,2}(\d+)\s*$").expect("valid regex")
});

impl Crs {
    /// WGS84 longitude/latitude.
    pub fn wgs84() -> Self {
        Self { epsg: Some(4326), proj4: "+proj=longlat +datum=WGS84 +no_defs".to_string() }
    }

    /// Build from an EPSG code. Only the codes this tool meets in practice are known;
    /// anything else must be given as a PROJ.4 string.
    pub fn from_epsg(code: u32) -> Result<Self> {
        let proj4 = match code {
            4326 => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            4269 => "+proj=longlat +datum=NAD83 +no_defs".to_string(),
            4490 => "+proj=longlat +ellps=GRS80 +no_defs".to_string(), // CGCS2000
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs".to_string(),
            32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", code - 32600),
            32701..=32760 => format!("+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs", code - 32700),
            _ => bail!("unsupported EPSG code {code}; pass a PROJ.4 definition instead"),
        };
        Ok(Self { epsg: Some(code), proj4 })
    }

    /// Parse "EPSG:<code>" or a PROJ.4 definition ("+proj=...").
    pub fn parse(text: &str) -> Result<Self> {
        if let Some(caps) = EPSG_TOKEN.captures(text) {
            let code: u32 = caps[1].parse()
                .with_context(|| format!("invalid EPSG code in {text:?}"))?;
            return Self::from_epsg(code);
        }
        let text = text.trim();
        if !text.starts_with('+') {
            bail!("unrecognized CRS {text:?}; expected EPSG:<code> or a PROJ.4 string");
        }
        Proj4::from_proj_string(text)
            .with_context(|| format!("failed to build PROJ.4: {text}"))?;
        Ok(Self { epsg: None, proj4: normalize(text) })
    }

    /// Best-effort recognition of an ESRI `.prj` WKT string.
    pub fn from_prj_wkt(wkt: &str) -> Option<Self> {
        let upper = wkt.to_ascii_uppercase();
        if upper.starts_with("PROJCS") {
            if upper.contains("MERCATOR_AUXILIARY_SPHERE") || upper.contains("PSEUDO-MERCATOR") {
                return Self::from_epsg(3857).ok();
            }
            let caps = WKT_UTM_ZONE.captures(wkt)?;
            let zone: u32 = caps[1].parse().ok()?;
            let base = if caps[2].eq_ignore_ascii_case("N") { 32600 } else { 32700 };
            return Self::from_epsg(base + zone).ok();
        }
        if upper.starts_with("GEOGCS") {
            let code = if upper.contains("CGCS") || upper.contains("CHINA_2000") || upper.contains("CHINA_GEODETIC") {
                4490
            } else if upper.contains("NAD_1983") || upper.contains("NORTH_AMERICAN_DATUM_1983") {
                4269
            } else if upper.contains("WGS_1984") || upper.contains("WGS 84") {
                4326
            } else {
                return None;
            };
            return Self::from_epsg(code).ok();
        }
        None
    }

    /// Recognize the legacy GeoJSON `crs.properties.name` member, e.g. "urn:ogc:def:crs:EPSG::4490".
    pub(crate) fn from_urn(name: &str) -> Option<Self> {
        if name.to_ascii_uppercase().ends_with("CRS84") {
            return Some(Self::wgs84());
        }
        let caps = URN_EPSG.captures(name)?;
        Self::from_epsg(caps[1].parse().ok()?).ok()
    }

    /// Get the EPSG code, if known.
    #[inline] pub fn epsg(&self) -> Option<u32> { self.epsg }

    /// Get the PROJ.4 definition.
    #[inline] pub fn proj4(&self) -> &str { &self.proj4 }

    /// True for longitude/latitude systems (coordinates in degrees).
    pub fn is_geographic(&self) -> bool {
        self.proj4.split_whitespace()
            .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"))
    }

    /// Whether two definitions describe the same system.
    pub fn same_as(&self, other: &Crs) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => self.proj4 == other.proj4,
        }
    }

    fn to_proj(&self) -> Result<Proj4> {
        Proj4::from_proj_string(&self.proj4)
            .with_context(|| anyhow!("failed to build PROJ.4: {}", self.proj4))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{code}"),
            None => f.write_str(&self.proj4),
        }
    }
}

/// Collapse whitespace so equivalent PROJ.4 strings compare equal.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A prepared point transform between two systems.
/// Degrees in and out for geographic systems, native units otherwise.
pub(crate) struct CrsTransform {
    from: Proj4,
    to: Proj4,
    from_geographic: bool,
    to_geographic: bool,
    identity: bool,
}

impl CrsTransform {
    pub(crate) fn new(from: &Crs, to: &Crs) -> Result<Self> {
        Ok(Self {
            from: from.to_proj()?,
            to: to.to_proj()?,
            from_geographic: from.is_geographic(),
            to_geographic: to.is_geographic(),
            identity: from.same_as(to),
        })
    }

    /// Transform a single coordinate.
    pub(crate) fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        if self.identity { return Ok(coord) }

        let mut point = if self.from_geographic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point)
            .with_context(|| format!("CRS transform failed at ({}, {})", coord.x, coord.y))?;

        Ok(if self.to_geographic {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    /// Transform every vertex of a multipolygon.
    pub(crate) fn apply_multipolygon(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        if self.identity { return Ok(shape.clone()) }
        shape.try_map_coords(|coord| self.apply(coord))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn parses_epsg_tokens_and_proj_strings() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap().epsg(), Some(4326));
        assert_eq!(Crs::parse("epsg:32650").unwrap().proj4(), "+proj=utm +zone=50 +datum=WGS84 +units=m +no_defs");
        let albers = Crs::parse("+proj=aea  +lat_1=25 +lat_2=47 +lat_0=0 +lon_0=105 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs").unwrap();
        assert_eq!(albers.epsg(), None);
        assert!(!albers.proj4().contains("  "));
        assert!(Crs::parse("EPSG:12345").is_err());
        assert!(Crs::parse("mercator").is_err());
    }

    #[test]
    fn geographic_detection() {
        assert!(Crs::wgs84().is_geographic());
        assert!(Crs::from_epsg(4490).unwrap().is_geographic());
        assert!(!Crs::from_epsg(3857).unwrap().is_geographic());
    }

    #[test]
    fn recognizes_common_prj_files() {
        let wgs = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(Crs::from_prj_wkt(wgs).unwrap().epsg(), Some(4326));

        let cgcs = r#"GEOGCS["GCS_China_Geodetic_Coordinate_System_2000",DATUM["D_China_2000",SPHEROID["CGCS2000",6378137.0,298.257222101]]]"#;
        assert_eq!(Crs::from_prj_wkt(cgcs).unwrap().epsg(), Some(4490));

        let utm = r#"PROJCS["WGS_1984_UTM_Zone_49N",GEOGCS["GCS_WGS_1984"]]"#;
        assert_eq!(Crs::from_prj_wkt(utm).unwrap().epsg(), Some(32649));

        assert!(Crs::from_prj_wkt(r#"PROJCS["Krasovsky_1940_Albers"]"#).is_none());
    }

    #[test]
    fn recognizes_geojson_urns() {
        assert_eq!(Crs::from_urn("urn:ogc:def:crs:EPSG::4490").unwrap().epsg(), Some(4490));
        assert_eq!(Crs::from_urn("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap().epsg(), Some(4326));
        assert!(Crs::from_urn("urn:ogc:def:crs:FOO::1").is_none());
    }

    #[test]
    fn identity_transform_is_exact() {
        let t = CrsTransform::new(&Crs::wgs84(), &Crs::parse("EPSG:4326").unwrap()).unwrap();
        let c = Coord { x: 113.26, y: 23.13 };
        assert_eq!(t.apply(c).unwrap(), c);
    }

    #[test]
    fn utm_roundtrip_returns_to_start() {
        let utm = Crs::from_epsg(32649).unwrap();
        let forward = CrsTransform::new(&Crs::wgs84(), &utm).unwrap();
        let back = CrsTransform::new(&utm, &Crs::wgs84()).unwrap();

        let start = Coord { x: 113.26, y: 23.13 };
        let metric = forward.apply(start).unwrap();
        // Central meridian of zone 49 is 111E, so Guangzhou lies east of the false easting.
        assert!(metric.x > 500_000.0);
        assert!(metric.y > 2_000_000.0);

        let lonlat = back.apply(metric).unwrap();
        assert_abs_diff_eq!(lonlat.x, start.x, epsilon = 1e-6);
        assert_abs_diff_eq!(lonlat.y, start.y, epsilon = 1e-6);
    }
}

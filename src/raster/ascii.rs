use std::{fs, io::{BufWriter, Write}, path::Path};

use anyhow::{Context, Result, anyhow, bail, ensure};

use crate::{common, geom::Crs, raster::{GeoTransform, RasterGrid}};

/// Header of an ESRI ASCII grid.
#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>, // (value, is_center)
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    nodata: Option<f64>,
}

impl Header {
    /// Apply one "key value" header line; returns false if the line is not a header line.
    fn apply(&mut self, line: &str) -> Result<bool> {
        let mut tokens = line.split_whitespace();
        let (Some(key), Some(value)) = (tokens.next(), tokens.next()) else { return Ok(false) };
        if key.parse::<f64>().is_ok() { return Ok(false) }

        let number = || value.parse::<f64>().with_context(|| format!("invalid header value in {line:?}"));
        let count = || value.parse::<usize>().with_context(|| format!("invalid header value in {line:?}"));
        match key.to_ascii_lowercase().as_str() {
            "ncols" => self.ncols = Some(count()?),
            "nrows" => self.nrows = Some(count()?),
            "xllcorner" => self.xll = Some((number()?, false)),
            "xllcenter" => self.xll = Some((number()?, true)),
            "yllcorner" => self.yll = Some((number()?, false)),
            "yllcenter" => self.yll = Some((number()?, true)),
            "cellsize" => self.cellsize = Some(number()?),
            "dx" => self.dx = Some(number()?),
            "dy" => self.dy = Some(number()?),
            "nodata_value" => self.nodata = Some(number()?),
            other => bail!("unknown ASCII grid header key: {other}"),
        }
        Ok(true)
    }

    /// Resolve into (rows, cols, transform).
    fn resolve(&self) -> Result<(usize, usize, GeoTransform)> {
        let cols = self.ncols.ok_or_else(|| anyhow!("missing ncols"))?;
        let rows = self.nrows.ok_or_else(|| anyhow!("missing nrows"))?;
        let (dx, dy) = match (self.cellsize, self.dx, self.dy) {
            (Some(size), _, _) => (size, size),
            (None, Some(dx), Some(dy)) => (dx, dy),
            _ => bail!("missing cellsize"),
        };
        ensure!(dx > 0.0 && dy > 0.0, "cell size must be positive");
        let (xll, x_center) = self.xll.ok_or_else(|| anyhow!("missing xllcorner"))?;
        let (yll, y_center) = self.yll.ok_or_else(|| anyhow!("missing yllcorner"))?;

        let left = if x_center { xll - dx / 2.0 } else { xll };
        let bottom = if y_center { yll - dy / 2.0 } else { yll };
        let top = bottom + rows as f64 * dy;

        Ok((rows, cols, GeoTransform::north_up(left, top, dx, dy)))
    }
}

/// Read an ESRI ASCII grid (`.asc`).
/// The CRS comes from `crs` when given, otherwise from the `.prj` sidecar.
/// `fallback_nodata` applies when the header declares no NODATA_value.
pub fn read_ascii_grid(path: &Path, crs: Option<Crs>, fallback_nodata: Option<f64>) -> Result<RasterGrid> {
    common::require_file_exists(path)?;
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read raster: {}", path.display()))?;

    let crs = match crs {
        Some(crs) => crs,
        None => fs::read_to_string(path.with_extension("prj")).ok()
            .and_then(|wkt| Crs::from_prj_wkt(&wkt))
            .with_context(|| format!("cannot determine the CRS of {}; set it in the config", path.display()))?,
    };

    let mut header = Header::default();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.peek() {
        if !line.trim().is_empty() && !header.apply(line).with_context(|| format!("in {}", path.display()))? {
            break;
        }
        lines.next();
    }
    let (rows, cols, transform) = header.resolve()
        .with_context(|| format!("invalid ASCII grid header in {}", path.display()))?;

    let data = lines
        .flat_map(str::split_whitespace)
        .map(|token| token.parse::<f64>()
            .with_context(|| format!("invalid cell value {token:?} in {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("read {}x{} grid from {}", rows, cols, path.display());
    RasterGrid::from_rows(rows, cols, data, header.nodata.or(fallback_nodata), transform, crs)
        .with_context(|| format!("invalid raster: {}", path.display()))
}

/// Write a north-up grid as ESRI ASCII.
pub fn write_ascii_grid(grid: &RasterGrid, path: &Path, force: bool) -> Result<()> {
    let t = grid.transform();
    ensure!(t.is_north_up(), "ASCII grids cannot hold rotated transforms");
    ensure!(t.pixel_width > 0.0 && t.pixel_height < 0.0, "ASCII grids must be north-up with positive cell size");

    let pending = common::open_for_write(path, force)?;
    let mut out = BufWriter::new(pending);

    let (dx, dy) = (t.pixel_width, -t.pixel_height);
    writeln!(out, "ncols {}", grid.cols())?;
    writeln!(out, "nrows {}", grid.rows())?;
    writeln!(out, "xllcorner {}", t.origin_x)?;
    writeln!(out, "yllcorner {}", t.origin_y - grid.rows() as f64 * dy)?;
    if dx == dy {
        writeln!(out, "cellsize {dx}")?;
    } else {
        writeln!(out, "dx {dx}")?;
        writeln!(out, "dy {dy}")?;
    }
    if let Some(nodata) = grid.nodata() {
        writeln!(out, "NODATA_value {nodata}")?;
    }

    for row in grid.values().rows() {
        let line = row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(out, "{line}")?;
    }

    out.into_inner()
        .map_err(|e| anyhow!("Failed to flush {}: {}", path.display(), e.error()))?
        .finalize()
}

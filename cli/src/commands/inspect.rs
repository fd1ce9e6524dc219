use anyhow::{Result, bail};
use hazardscope::{Crs, describe_boundaries, read_ascii_grid, value_range};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::InspectArgs) -> Result<()> {
    if args.rasters.is_empty() && args.boundaries.is_none() {
        bail!("nothing to inspect; pass --raster and/or --boundaries");
    }
    let crs = args.crs.as_deref().map(Crs::parse).transpose()?;

    for path in &args.rasters {
        let grid = read_ascii_grid(path, crs.clone(), None)?;
        println!("{}: {}x{} cells, {}", path.display(), grid.rows(), grid.cols(), grid.crs());
        match value_range(&grid) {
            Some((lo, hi)) => println!("  min {lo}, max {hi}"),
            None => println!("  no valid cells"),
        }
        if let Some(nodata) = grid.nodata() {
            println!("  nodata {nodata}");
        }
    }

    if let Some(path) = &args.boundaries {
        let summary = describe_boundaries(path)?;
        println!("{}: {} records", path.display(), summary.records);
        for (kind, count) in &summary.geometry_mix {
            println!("  {kind}: {count}");
        }
        for (field, sample) in &summary.fields {
            println!("  {field} = {sample}");
        }
    }

    Ok(())
}

use std::path::PathBuf;

/// Flood and fire hazard CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "hazardscope", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Derive static region features from boundaries and rasters (forbids stdout)
    Preprocess(PreprocessArgs),

    /// Score regions against a weather bundle (forbids stdout)
    Score(ScoreArgs),

    /// Print raster value ranges and boundary attributes
    Inspect(InspectArgs),
}

#[derive(clap::Args, Debug)]
pub struct PreprocessArgs {
    /// Administrative boundaries (.shp or .geojson)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub boundaries: PathBuf,

    /// Elevation grid (ESRI ASCII)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub dem: PathBuf,

    /// Land-cover grid (ESRI ASCII)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub landuse: PathBuf,

    /// Output feature table (JSON)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub out: PathBuf,

    /// Also write the selected boundaries as GeoJSON
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub border: Option<PathBuf>,

    /// Directory for reprojected grids, defaults to beside each source grid
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,

    /// Pipeline config (JSON)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Overwrite existing outputs
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct ScoreArgs {
    /// Feature table written by `preprocess`
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub meta: PathBuf,

    /// Weather bundle (JSON keyed by region name)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub weather: PathBuf,

    /// Horizon token, e.g. now or forecast-24h; repeat for several, defaults to now
    #[arg(long = "horizon")]
    pub horizons: Vec<String>,

    /// Output risk table (JSON)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub out: PathBuf,

    /// Risk model coefficients and thresholds (JSON)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub model: Option<PathBuf>,

    /// Overwrite an existing output
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Raster grids to summarize
    #[arg(long = "raster", value_hint = clap::ValueHint::FilePath)]
    pub rasters: Vec<PathBuf>,

    /// Boundary file to summarize
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub boundaries: Option<PathBuf>,

    /// CRS of the rasters when they have no .prj sidecar
    #[arg(long)]
    pub crs: Option<String>,
}

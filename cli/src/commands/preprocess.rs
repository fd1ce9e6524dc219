use anyhow::Result;
use hazardscope::{InputPaths, PipelineConfig, StaticPipeline};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::PreprocessArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = StaticPipeline::new(config)?;

    let paths = InputPaths {
        boundaries: args.boundaries.clone(),
        dem: args.dem.clone(),
        landuse: args.landuse.clone(),
        cache_dir: args.cache_dir.clone(),
    };
    let run = pipeline.execute(&paths, &args.out, args.border.as_deref(), args.force)?;

    let unknown = run.store.iter().filter(|meta| meta.lowland_index.is_none()).count();
    if cli.verbose > 0 || unknown > 0 {
        eprintln!("[preprocess] {} regions, lowland threshold {:.3} m, {} without elevation data -> {}",
            run.store.len(), run.threshold, unknown, args.out.display());
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use log::info;
use nearpoly::{ArtifactPaths, Config, DatasetLoader, IndexBuilder, QueryPoint};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (JSON, or TOML when built with the `toml` feature)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build index artifacts from a GeoJSON FeatureCollection
    Build {
        geojson: PathBuf,
        out_dir: PathBuf,
    },
    /// Print the nearest areas to a point as JSON
    Query {
        dir: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(short, long)]
        n: Option<usize>,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)?;

    #[cfg(feature = "toml")]
    if path.extension().is_some_and(|ext| ext == "toml") {
        return Ok(Config::from_toml(&text)?);
    }

    Ok(Config::from_json(&text)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Build { geojson, out_dir } => {
            info!("Building index from {}", geojson.display());
            let source = fs::read_to_string(&geojson)?;
            let output = IndexBuilder::new().config(config).build_from_geojson(&source)?;
            output.write_artifacts(&ArtifactPaths::in_dir(&out_dir))?;

            let report = &output.report;
            println!(
                "{} areas, {} nodes, {} bytes, {} without coordinates",
                report.items,
                report.total_nodes,
                report.index_bytes,
                report.sentinel_ids.len()
            );
        }
        Command::Query { dir, lat, lon, n } => {
            let loader = DatasetLoader::with_config(ArtifactPaths::in_dir(&dir), config);
            let outcome = loader.search(&QueryPoint::new(lat, lon), n)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

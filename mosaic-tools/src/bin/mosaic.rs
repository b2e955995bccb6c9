use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::{env, process};

use anyhow::{Context as _, anyhow};
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};
use mosaic_tools::logging::{ensure_tools_log_level_matches, init_tracing};
use mosaic_tools::{
    AssemblyPlan, ManifestConfig, ManifestFilter, MosaicError, MosaicJson, SelectMethod,
    fill_holes, kv_items, mosaic_id, split_mosaic,
};
use tilejson::Bounds;
use tracing::{error, info};

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, PartialEq, Debug)]
#[command(
    version,
    name = "mosaic",
    about = "A utility to maintain MosaicJSON catalogs and NAIP imagery manifests",
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=mosaic=debug. Use MOSAIC_FORMAT to pick the log format: full, compact, bare, pretty or json.",
    styles = HELP_STYLES
)]
pub struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, PartialEq, Debug)]
enum Commands {
    /// Make every mosaic contain the union of all quadkeys. Inputs are ordered from the most to the least authoritative.
    #[command(name = "fill-holes", alias = "fill")]
    FillHoles {
        /// Directory to write the filled mosaics to, using the input file names
        #[arg(short, long)]
        output_dir: PathBuf,
        /// `MosaicJSON` files to fill
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Select one year of imagery per state from a manifest and print the selected paths.
    #[command(name = "manifest")]
    Manifest {
        /// First acquisition year to consider
        #[arg(short, long)]
        start_year: u16,
        /// Last acquisition year to consider
        #[arg(short, long)]
        end_year: u16,
        /// Which year to keep when several are available
        #[arg(long, value_enum, default_value_t = SelectMethod::default())]
        select_method: SelectMethod,
        /// Keep tiles that several states published for the same block
        #[arg(long)]
        no_dedup: bool,
        /// YAML file with manifest parsing settings
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Manifest file, or `-` to read from stdin
        manifest: PathBuf,
    },
    /// Split a mosaic into overview mosaics, one per quadkey at the overview zoom.
    #[command(name = "split")]
    Split {
        /// Directory to write the overview mosaics to
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Zoom level of the overview quadkeys
        #[arg(short = 'z', long, default_value_t = 6)]
        overview_zoom: u8,
        /// Prefix for the overview file names
        #[arg(long, default_value = "")]
        prefix: String,
        /// `MosaicJSON` file to split
        mosaic: PathBuf,
    },
    /// Print the identifier of a mosaic, which is also the name of its key-value table.
    #[command(name = "mosaic-id", alias = "id")]
    MosaicId {
        /// Version string hashed together with the mosaic
        #[arg(long)]
        mosaic_version: String,
        /// `MosaicJSON` file
        mosaic: PathBuf,
    },
    /// Write the key-value table rows of a mosaic as newline-delimited JSON.
    #[command(name = "kv-items")]
    KvItems {
        /// Version string hashed together with the mosaic to name the table
        #[arg(long)]
        mosaic_version: String,
        /// File to write to instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// `MosaicJSON` file
        mosaic: PathBuf,
    },
    /// Print the pixel layout of a raster assembled from XYZ tiles as JSON.
    #[command(name = "assembly-plan")]
    AssemblyPlan {
        /// Bounding box in the format `min_lon,min_lat,max_lon,max_lat`
        #[arg(short, long, allow_hyphen_values = true)]
        bbox: Bounds,
        /// Maximum zoom level of the tile endpoint
        #[arg(short = 'z', long)]
        max_zoom: u8,
        /// Use high DPI tiles, twice the size at one zoom level lower
        #[arg(long)]
        retina: bool,
        /// Include the pixel window of every tile
        #[arg(long)]
        windows: bool,
    },
}

fn main() {
    let filter = ensure_tools_log_level_matches(env::var("RUST_LOG").ok());
    if let Err(e) = init_tracing(&filter, env::var("MOSAIC_FORMAT").ok()) {
        eprintln!("Warning: {e}");
    }

    if let Err(err) = main_int() {
        error!("{err:#}");
        process::exit(1);
    }
}

fn main_int() -> anyhow::Result<()> {
    let args = Args::parse();
    match args.command {
        Commands::FillHoles { output_dir, inputs } => {
            fill(&inputs, &output_dir)?;
        }
        Commands::Manifest {
            start_year,
            end_year,
            select_method,
            no_dedup,
            config,
            manifest,
        } => {
            let config = match config {
                Some(path) => ManifestConfig::read(&path)?,
                None => ManifestConfig::default(),
            };
            let filter = ManifestFilter::new(start_year, end_year, select_method)?
                .with_dedup(!no_dedup)
                .with_config(config);
            let text = read_manifest(&manifest)?;
            let report = filter.select(text.lines())?;
            for (state, year) in &report.state_years {
                info!("Using {year} imagery for {state}");
            }
            let mut out = BufWriter::new(io::stdout().lock());
            for path in &report.selected {
                writeln!(out, "{path}")?;
            }
            out.flush()?;
        }
        Commands::Split {
            output_dir,
            overview_zoom,
            prefix,
            mosaic,
        } => {
            let mosaic = MosaicJson::read(&mosaic)?;
            let overviews = split_mosaic(&mosaic, overview_zoom)?;
            create_dir(&output_dir)?;
            for (quadkey, overview) in &overviews {
                let path = output_dir.join(format!("{prefix}{quadkey}.json"));
                overview.write(&path)?;
                info!("Wrote {overview} to {}", path.display());
            }
        }
        Commands::MosaicId {
            mosaic_version,
            mosaic,
        } => {
            let mosaic = MosaicJson::read(&mosaic)?;
            println!("{}", mosaic_id(&mosaic, &mosaic_version)?);
        }
        Commands::KvItems {
            mosaic_version,
            output,
            mosaic,
        } => {
            let mosaic = MosaicJson::read(&mosaic)?;
            let table = mosaic_id(&mosaic, &mosaic_version)?;
            let items = kv_items(&mosaic);
            info!("Writing {} items for table {table}", items.len());
            let out: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path).map_err(|e| MosaicError::IoError(e, path.clone()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            let mut out = BufWriter::new(out);
            for item in &items {
                serde_json::to_writer(&mut out, item)?;
                writeln!(out)?;
            }
            out.flush()?;
        }
        Commands::AssemblyPlan {
            bbox,
            max_zoom,
            retina,
            windows,
        } => {
            let plan = AssemblyPlan::for_endpoint(&bbox, max_zoom, retina)?;
            info!(
                "Assembling {} tiles at zoom {} into a {}x{} raster",
                plan.tile_count(),
                plan.zoom,
                plan.width,
                plan.height
            );
            let mut doc = serde_json::to_value(&plan)?;
            if windows {
                doc["windows"] = serde_json::to_value(plan.windows().collect::<Vec<_>>())?;
            }
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(())
}

fn fill(inputs: &[PathBuf], output_dir: &Path) -> anyhow::Result<()> {
    let mut mosaics = inputs
        .iter()
        .map(|path| MosaicJson::read(path))
        .collect::<Result<Vec<_>, _>>()?;
    let summary = fill_holes(&mut mosaics)?;

    create_dir(output_dir)?;
    for ((input, mosaic), filled) in inputs.iter().zip(&mosaics).zip(&summary.filled) {
        let name = input
            .file_name()
            .ok_or_else(|| anyhow!("Input {} has no file name", input.display()))?;
        let path = output_dir.join(name);
        mosaic.write(&path)?;
        info!(
            "Filled {filled} of {} quadkeys in {}",
            summary.total_quadkeys,
            path.display()
        );
    }
    Ok(())
}

fn read_manifest(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        io::read_to_string(io::stdin()).context("Unable to read manifest from stdin")
    } else {
        Ok(fs::read_to_string(path).map_err(|e| MosaicError::IoError(e, path.to_path_buf()))?)
    }
}

fn create_dir(path: &Path) -> Result<(), MosaicError> {
    fs::create_dir_all(path).map_err(|e| MosaicError::IoError(e, path.to_path_buf()))
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Reclass - Reclassify categorical rasters and vectors
#[derive(Parser, Debug)]
#[command(name = "reclass")]
#[command(about = "Reclassify categorical rasters and vectors", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./reclass.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Treat sources as Earth Engine asset ids instead of local paths
    #[arg(long, global = true)]
    pub remote: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect whether a source is a raster or a vector
    Kind(SourceArgs),

    /// List the bands or properties that can be reclassified
    Attributes(SourceArgs),

    /// List the distinct classes of an attribute
    Classes(ClassesArgs),

    /// Apply a reclassification matrix and write the result
    Run(RunArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Local file path, or asset id with --remote
    pub source: String,
}

#[derive(Args, Debug)]
pub struct ClassesArgs {
    /// Local file path, or asset id with --remote
    pub source: String,

    /// Band index, band name or property name
    #[arg(long, short = 'a')]
    pub attribute: String,

    /// Write the classes as a class table (code,label,color) for editing
    #[arg(long, short = 'o', value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Local file path, or asset id with --remote
    pub source: String,

    /// Band index, band name or property name
    #[arg(long, short = 'a')]
    pub attribute: String,

    /// Matrix table with a `src,dst` header
    #[arg(long, short = 'm', value_name = "CSV")]
    pub matrix: PathBuf,

    /// Destination class table (code,label,color), used for the legend
    #[arg(long, short = 'c', value_name = "CSV")]
    pub classes: PathBuf,

    /// Output directory for local sources
    #[arg(long, value_name = "DIR")]
    pub dst_dir: Option<PathBuf>,

    /// Column added to vector outputs
    #[arg(long, value_name = "NAME")]
    pub output_field: Option<String>,

    /// Export resolution in meters for remote images
    #[arg(long, value_name = "METERS")]
    pub scale: Option<f64>,

    /// Show the planned output without reading or writing data
    #[arg(long)]
    pub dry_run: bool,
}

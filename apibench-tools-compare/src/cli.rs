use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "apibench-tools-compare",
    about = "Combine per-run `<tech>-<load>.csv` summaries into comparative tables and charts"
)]
pub struct Cli {
    /// Directory scanned for `<tech>-<load>.csv` inputs
    #[arg(long, default_value = ".")]
    pub input: PathBuf,

    /// Output directory (defaults to `<input>/outputs`)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Explicit input files; disables directory scanning (repeatable)
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,

    /// Skip chart rendering, only produce the summary table
    #[arg(long, default_value_t = false)]
    pub no_charts: bool,
}

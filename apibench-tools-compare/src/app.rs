use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::charts;
use crate::cli::Cli;
use crate::parse::summarize_csv;
use crate::report::{print_summary, write_summary_csv};
use crate::types::{ComparativeStat, parse_file_name};

fn input_files(cli: &Cli) -> Result<Vec<PathBuf>> {
    if !cli.files.is_empty() {
        return Ok(cli.files.clone());
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(&cli.input)
        .with_context(|| format!("failed to read input dir {}", cli.input.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Collects one comparative row per parseable input file. Missing files,
/// unrecognized names, and malformed tables are warnings, never fatal:
/// the pass always produces whatever the well-formed inputs allow.
fn collect_stats(files: &[PathBuf]) -> Vec<ComparativeStat> {
    let mut stats = Vec::new();

    for path in files {
        if !path.exists() {
            eprintln!("warning: file not found: {}", path.display());
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some((token, load)) = parse_file_name(&name) else {
            eprintln!("warning: unexpected file name (want <tech>-<load>.csv): {name}");
            continue;
        };

        match summarize_csv(path, &token, load) {
            Ok(stat) => stats.push(stat),
            Err(err) => eprintln!("warning: skipping {name}: {err:#}"),
        }
    }

    stats.sort_by(|a, b| a.tech.cmp(&b.tech).then(a.load.cmp(&b.load)));
    stats
}

pub fn run(cli: Cli) -> Result<()> {
    let files = input_files(&cli)?;
    let stats = collect_stats(&files);

    if stats.is_empty() {
        eprintln!("warning: no usable input files");
    }

    let out_dir = cli
        .out
        .clone()
        .unwrap_or_else(|| cli.input.join("outputs"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output dir {}", out_dir.display()))?;

    let summary_path = out_dir.join("summary.csv");
    write_summary_csv(&stats, &summary_path)?;
    print_summary(&stats);
    println!("\nsummary written to {}", summary_path.display());

    if !cli.no_charts && !stats.is_empty() {
        let written = charts::render_all(&stats, &out_dir)?;
        println!("{} chart(s) written to {}", written.len(), out_dir.display());
    }

    Ok(())
}

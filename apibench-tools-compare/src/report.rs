use anyhow::Result;
use std::path::Path;

use crate::types::ComparativeStat;

/// Writes the combined summary table. Formatting is fixed-precision so a
/// second pass over unchanged inputs is byte-identical.
pub(crate) fn write_summary_csv(stats: &[ComparativeStat], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record([
        "tech", "users", "avg_ms", "p50_ms", "p95_ms", "p99_ms", "rps", "failures",
    ])?;

    for s in stats {
        w.write_record([
            s.tech.clone(),
            s.load.to_string(),
            format!("{:.3}", s.avg_ms),
            format!("{:.3}", s.p50_ms),
            format!("{:.3}", s.p95_ms),
            format!("{:.3}", s.p99_ms),
            format!("{:.3}", s.rps),
            s.failures.to_string(),
        ])?;
    }

    w.flush()?;
    Ok(())
}

pub(crate) fn print_summary(stats: &[ComparativeStat]) {
    println!(
        "\n{:<10} | {:>6} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10} | {:>8}",
        "tech", "users", "avg_ms", "p50_ms", "p95_ms", "p99_ms", "rps", "failures"
    );
    println!(
        "-----------+--------+------------+------------+------------+------------+------------+---------"
    );

    for s in stats {
        println!(
            "{:<10} | {:>6} | {:>10.3} | {:>10.3} | {:>10.3} | {:>10.3} | {:>10.3} | {:>8}",
            s.tech, s.load, s.avg_ms, s.p50_ms, s.p95_ms, s.p99_ms, s.rps, s.failures
        );
    }
}

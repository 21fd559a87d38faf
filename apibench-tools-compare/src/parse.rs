use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::types::{ComparativeStat, tech_label};

/// One input table row, as read from a per-run CSV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RawRow {
    pub(crate) count: u64,
    pub(crate) avg_ms: f64,
    pub(crate) p50_ms: f64,
    pub(crate) p95_ms: f64,
    pub(crate) p99_ms: f64,
    pub(crate) rps: f64,
    pub(crate) failures: u64,
}

/// Request-count-weighted combination of per-task rows.
///
/// Averages and percentiles use `sum(m_i * count_i) / sum(count_i)`, a
/// percentile-of-percentiles approximation, valid only insofar as the
/// per-task latency distributions are comparable. It is kept deliberately:
/// previously recorded runs were combined the same way and a switch to
/// true quantile merging would break comparability. Throughput and
/// failures are sums.
pub(crate) fn combine_rows(rows: &[RawRow]) -> Option<RawRow> {
    let total: u64 = rows.iter().map(|r| r.count).sum();
    if total == 0 {
        return None;
    }

    let weighted = |metric: fn(&RawRow) -> f64| -> f64 {
        rows.iter()
            .map(|r| metric(r) * r.count as f64)
            .sum::<f64>()
            / total as f64
    };

    Some(RawRow {
        count: total,
        avg_ms: weighted(|r| r.avg_ms),
        p50_ms: weighted(|r| r.p50_ms),
        p95_ms: weighted(|r| r.p95_ms),
        p99_ms: weighted(|r| r.p99_ms),
        rps: rows.iter().map(|r| r.rps).sum(),
        failures: rows.iter().map(|r| r.failures).sum(),
    })
}

struct Columns {
    name: Option<usize>,
    count: usize,
    avg: usize,
    rps: usize,
    failures: usize,
    p50: usize,
    p95: usize,
    p99: usize,
}

fn find_column(headers: &csv::StringRecord, pred: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(pred)
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<Columns> {
    let required = |idx: Option<usize>, what: &str| {
        idx.with_context(|| format!("missing expected column: {what}"))
    };

    Ok(Columns {
        name: find_column(headers, |h| h == "Name"),
        count: required(
            find_column(headers, |h| {
                h.contains("Request Count") || h.contains("# Requests")
            }),
            "request count",
        )?,
        avg: required(
            find_column(headers, |h| h.contains("Average") && h.contains("Time")),
            "average response time",
        )?,
        rps: required(find_column(headers, |h| h.contains("Requests/s")), "rps")?,
        failures: required(find_column(headers, |h| h.contains("Failure")), "failures")?,
        p50: required(find_column(headers, |h| h == "50%"), "50%")?,
        p95: required(find_column(headers, |h| h == "95%"), "95%")?,
        p99: required(find_column(headers, |h| h == "99%"), "99%")?,
    })
}

fn parse_row(record: &csv::StringRecord, cols: &Columns) -> Result<RawRow> {
    let float = |idx: usize| -> Result<f64> {
        let field = record.get(idx).unwrap_or("");
        field
            .trim()
            .parse()
            .with_context(|| format!("unparseable number: `{field}`"))
    };

    Ok(RawRow {
        count: float(cols.count)? as u64,
        avg_ms: float(cols.avg)?,
        p50_ms: float(cols.p50)?,
        p95_ms: float(cols.p95)?,
        p99_ms: float(cols.p99)?,
        rps: float(cols.rps)?,
        failures: float(cols.failures)? as u64,
    })
}

/// Reads one per-run table and reduces it to a single comparative row.
///
/// A row named `Aggregated` wins outright: the upstream harness already
/// weighted it over the whole run. Otherwise per-task rows are combined
/// here.
pub(crate) fn summarize_csv(path: &Path, tech_token: &str, load: u64) -> Result<ComparativeStat> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    let cols = resolve_columns(&headers)?;

    let mut rows = Vec::new();
    let mut aggregated: Option<RawRow> = None;

    for record in rdr.records() {
        let record = record?;
        let name = cols.name.and_then(|idx| record.get(idx)).unwrap_or("");
        let row = parse_row(&record, &cols)?;

        if name == "Aggregated" {
            aggregated = Some(row);
        } else {
            rows.push(row);
        }
    }

    let combined = match aggregated.or_else(|| combine_rows(&rows)) {
        Some(row) => row,
        None => bail!("{} contains no request rows", path.display()),
    };

    Ok(ComparativeStat {
        tech: tech_label(tech_token),
        tech_token: tech_token.to_string(),
        load,
        avg_ms: combined.avg_ms,
        p50_ms: combined.p50_ms,
        p95_ms: combined.p95_ms,
        p99_ms: combined.p99_ms,
        rps: combined.rps,
        failures: combined.failures,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Write as _;

    fn row(count: u64, p95: f64, rps: f64) -> RawRow {
        RawRow {
            count,
            avg_ms: p95 / 2.0,
            p50_ms: p95 / 3.0,
            p95_ms: p95,
            p99_ms: p95 * 1.5,
            rps,
            failures: 1,
        }
    }

    #[test]
    fn percentiles_combine_by_request_count_weight() {
        // (100, p95=50ms) and (300, p95=70ms) => (100*50 + 300*70) / 400.
        let combined = combine_rows(&[row(100, 50.0, 10.0), row(300, 70.0, 15.0)]).unwrap();
        assert_eq!(combined.p95_ms, 65.0);
        assert_eq!(combined.count, 400);
    }

    #[test]
    fn rps_is_summed_not_averaged() {
        let combined = combine_rows(&[row(100, 50.0, 10.0), row(300, 70.0, 15.0)]).unwrap();
        assert_eq!(combined.rps, 25.0);
        assert_eq!(combined.failures, 2);
    }

    #[test]
    fn zero_requests_combine_to_nothing() {
        assert_eq!(combine_rows(&[]), None);
        assert_eq!(combine_rows(&[row(0, 1.0, 0.0)]), None);
    }

    fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    const HEADER: &str =
        "Type,Name,Request Count,Failure Count,Average Response Time,Requests/s,50%,95%,99%\n";

    #[test]
    fn aggregated_row_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "rest-50.csv",
            &format!(
                "{HEADER}rest,/users,100,0,10.00,10.00,9.00,50.00,60.00\n\
                 rest,Aggregated,400,3,33.00,25.00,30.00,65.00,80.00\n"
            ),
        );

        let stat = summarize_csv(&path, "rest", 50).unwrap();
        assert_eq!(stat.tech, "REST");
        assert_eq!(stat.load, 50);
        assert_eq!(stat.p95_ms, 65.0);
        assert_eq!(stat.rps, 25.0);
        assert_eq!(stat.failures, 3);
    }

    #[test]
    fn per_task_rows_are_weighted_when_no_aggregated_row_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "grpc-200.csv",
            &format!(
                "{HEADER}grpc,GetAllUsers,100,1,10.00,10.00,9.00,50.00,60.00\n\
                 grpc,GetAllSongs,300,2,20.00,15.00,18.00,70.00,90.00\n"
            ),
        );

        let stat = summarize_csv(&path, "grpc", 200).unwrap();
        assert_eq!(stat.tech, "gRPC");
        assert_eq!(stat.p95_ms, 65.0);
        assert_eq!(stat.rps, 25.0);
        assert_eq!(stat.failures, 3);
        assert_eq!(stat.avg_ms, (10.0 * 100.0 + 20.0 * 300.0) / 400.0);
    }

    #[test]
    fn missing_columns_error_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "rest-50.csv",
            "Name,Request Count\nAggregated,10\n",
        );
        assert!(summarize_csv(&path, "rest", 50).is_err());
    }
}

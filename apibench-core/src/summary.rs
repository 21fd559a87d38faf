use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use apibench_metrics::SeriesSnapshot;

use crate::error::Result;
use crate::protocol::Protocol;
use crate::stats::{AGGREGATED_ROW, Recorder};

/// One row of per-task statistics in a run summary.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub name: String,
    pub requests: u64,
    pub failures: u64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub rps: f64,
}

/// Statistics for one protocol population: per-task rows plus the
/// whole-population row computed from the merged histogram.
#[derive(Debug, Clone)]
pub struct ProtocolSummary {
    pub protocol: Protocol,
    pub rows: Vec<TaskRow>,
    pub aggregated: TaskRow,
}

/// Everything measured by one run, produced once at run end.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub elapsed: Duration,
    /// Load level: simulated users per population.
    pub users: u64,
    pub protocols: Vec<ProtocolSummary>,
}

fn row_from_snapshot(name: &str, snap: &SeriesSnapshot, elapsed: Duration) -> TaskRow {
    let us_to_ms = |v: Option<f64>| v.unwrap_or(0.0) / 1_000.0;
    let secs = elapsed.as_secs_f64();
    let rps = if secs > 0.0 {
        snap.requests as f64 / secs
    } else {
        0.0
    };

    TaskRow {
        name: name.to_string(),
        requests: snap.requests,
        failures: snap.failures,
        avg_ms: us_to_ms(snap.latency.mean),
        p50_ms: us_to_ms(snap.latency.p50),
        p95_ms: us_to_ms(snap.latency.p95),
        p99_ms: us_to_ms(snap.latency.p99),
        rps,
    }
}

impl RunSummary {
    pub fn from_recorder(recorder: &Recorder, elapsed: Duration, users: u64) -> Self {
        let tasks = recorder.task_snapshot();
        let mut protocols = Vec::new();

        for (key, snap) in recorder.protocol_snapshot() {
            let Ok(protocol) = Protocol::from_str(&key.scope) else {
                continue;
            };

            let rows: Vec<TaskRow> = tasks
                .iter()
                .filter(|(k, _)| k.scope == key.scope)
                .map(|(k, s)| row_from_snapshot(&k.name, s, elapsed))
                .collect();

            protocols.push(ProtocolSummary {
                protocol,
                rows,
                aggregated: row_from_snapshot(AGGREGATED_ROW, &snap, elapsed),
            });
        }

        Self {
            elapsed,
            users,
            protocols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Persists one `<tech>-<load>.csv` per measured protocol and returns
    /// the written paths.
    pub fn write_csv_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.protocols.len());
        for summary in &self.protocols {
            let path = dir.join(format!("{}-{}.csv", summary.protocol.token(), self.users));
            let mut w = csv::Writer::from_path(&path)?;

            w.write_record([
                "Type",
                "Name",
                "Request Count",
                "Failure Count",
                "Average Response Time",
                "Requests/s",
                "50%",
                "95%",
                "99%",
            ])?;

            for row in summary.rows.iter().chain([&summary.aggregated]) {
                w.write_record([
                    summary.protocol.token().to_string(),
                    row.name.clone(),
                    row.requests.to_string(),
                    row.failures.to_string(),
                    format!("{:.2}", row.avg_ms),
                    format!("{:.2}", row.rps),
                    format!("{:.2}", row.p50_ms),
                    format!("{:.2}", row.p95_ms),
                    format!("{:.2}", row.p99_ms),
                ])?;
            }

            w.flush()?;
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::stats::{Outcome, RequestEvent};
    use std::sync::Arc;

    fn recorder_with_events() -> Recorder {
        let recorder = Recorder::default();
        for i in 0..10u64 {
            recorder.record(RequestEvent::new(
                Protocol::Rest,
                Arc::from("/users"),
                Duration::from_millis(10 + i),
                100,
                Outcome::Success,
            ));
        }
        recorder.record(RequestEvent::new(
            Protocol::Rest,
            Arc::from("/songs"),
            Duration::from_millis(50),
            0,
            Outcome::failure("http_status:500"),
        ));
        recorder
    }

    #[test]
    fn summary_has_task_rows_and_aggregated_row() {
        let recorder = recorder_with_events();
        let summary = RunSummary::from_recorder(&recorder, Duration::from_secs(2), 50);

        assert_eq!(summary.protocols.len(), 1);
        let rest = &summary.protocols[0];
        assert_eq!(rest.protocol, Protocol::Rest);
        assert_eq!(rest.rows.len(), 2);

        assert_eq!(rest.aggregated.name, AGGREGATED_ROW);
        assert_eq!(rest.aggregated.requests, 11);
        assert_eq!(rest.aggregated.failures, 1);
        // 11 requests over 2 seconds.
        assert!((rest.aggregated.rps - 5.5).abs() < 1e-9);
        assert!(rest.aggregated.avg_ms > 0.0);
        assert!(rest.aggregated.p95_ms >= rest.aggregated.p50_ms);
    }

    #[test]
    fn csv_files_are_named_by_tech_and_load() {
        let recorder = recorder_with_events();
        let summary = RunSummary::from_recorder(&recorder, Duration::from_secs(2), 200);

        let dir = tempfile::tempdir().unwrap();
        let written = summary.write_csv_files(dir.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(
            written[0].file_name().unwrap().to_str().unwrap(),
            "rest-200.csv"
        );

        let text = std::fs::read_to_string(&written[0]).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Type,Name,Request Count,Failure Count,Average Response Time,Requests/s,50%,95%,99%"
        );
        // Two task rows plus the aggregated row.
        assert_eq!(lines.count(), 3);
        assert!(text.contains("Aggregated"));
    }

    #[test]
    fn empty_recorder_yields_empty_summary() {
        let recorder = Recorder::default();
        let summary = RunSummary::from_recorder(&recorder, Duration::from_secs(1), 50);
        assert!(summary.is_empty());

        let dir = tempfile::tempdir().unwrap();
        assert!(summary.write_csv_files(dir.path()).unwrap().is_empty());
    }
}

use std::fmt::Write as _;

use apibench_core::RunOutcome;

/// Human-readable run summary: one aligned table per measured protocol.
pub fn render(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    let summary = &outcome.summary;
    if summary.is_empty() {
        out.push_str("summary: no measurements\n");
        return out;
    }

    writeln!(
        &mut out,
        "summary ({} users per protocol, {:.1}s elapsed)",
        summary.users,
        summary.elapsed.as_secs_f64()
    )
    .ok();

    for protocol in &summary.protocols {
        writeln!(&mut out, "\nprotocol: {}", protocol.protocol.label()).ok();
        writeln!(
            &mut out,
            "  {:<34} {:>8} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "name", "reqs", "fail", "avg ms", "p50 ms", "p95 ms", "p99 ms", "req/s"
        )
        .ok();

        for row in protocol.rows.iter().chain([&protocol.aggregated]) {
            writeln!(
                &mut out,
                "  {:<34} {:>8} {:>6} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                row.name,
                row.requests,
                row.failures,
                row.avg_ms,
                row.p50_ms,
                row.p95_ms,
                row.p99_ms,
                row.rps
            )
            .ok();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use apibench_core::{
        DiscoveryState, Protocol, ProtocolSummary, ReadinessSet, RunSummary, TaskRow,
    };
    use std::time::Duration;

    fn row(name: &str, requests: u64) -> TaskRow {
        TaskRow {
            name: name.to_string(),
            requests,
            failures: 1,
            avg_ms: 12.5,
            p50_ms: 10.0,
            p95_ms: 20.0,
            p99_ms: 30.0,
            rps: 42.0,
        }
    }

    fn outcome() -> RunOutcome {
        RunOutcome {
            readiness: ReadinessSet::default(),
            discovery_state: DiscoveryState::Found,
            discovery_rounds: 1,
            summary: RunSummary {
                elapsed: Duration::from_secs(2),
                users: 50,
                protocols: vec![ProtocolSummary {
                    protocol: Protocol::Rest,
                    rows: vec![row("/users", 10)],
                    aggregated: row("Aggregated", 10),
                }],
            },
            skipped: vec![],
        }
    }

    #[test]
    fn render_lists_tasks_and_aggregated_row() {
        let text = render(&outcome());
        assert!(text.contains("protocol: REST"));
        assert!(text.contains("/users"));
        assert!(text.contains("Aggregated"));
        assert!(text.contains("50 users per protocol"));
    }

    #[test]
    fn render_reports_empty_runs_explicitly() {
        let mut o = outcome();
        o.summary.protocols.clear();
        assert_eq!(render(&o), "summary: no measurements\n");
    }
}

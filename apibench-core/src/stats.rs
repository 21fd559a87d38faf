use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use apibench_metrics::{SeriesKey, SeriesRegistry, SeriesSnapshot};

use crate::protocol::Protocol;

/// Name of the synthetic whole-run row kept per protocol.
pub const AGGREGATED_ROW: &str = "Aggregated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(Arc<str>),
}

impl Outcome {
    pub fn failure(reason: impl Into<Arc<str>>) -> Self {
        Outcome::Failure(reason.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

/// One immutable record of a single completed request attempt. Created
/// exactly once per attempt; ownership moves into the recorder.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub protocol: Protocol,
    pub task: Arc<str>,
    pub elapsed: Duration,
    /// Response body size; forced to 0 for failures.
    pub bytes: u64,
    pub outcome: Outcome,
    pub timestamp: SystemTime,
}

impl RequestEvent {
    pub fn new(
        protocol: Protocol,
        task: Arc<str>,
        elapsed: Duration,
        bytes: u64,
        outcome: Outcome,
    ) -> Self {
        let bytes = if outcome.is_failure() { 0 } else { bytes };
        Self {
            protocol,
            task,
            elapsed,
            bytes,
            outcome,
            timestamp: SystemTime::now(),
        }
    }
}

/// Append-only sink for request events.
///
/// Safe to call from every simulated user of every population at once;
/// events land in per-(protocol, task) series plus a merged per-protocol
/// series. No ordering is assumed; summarization works on sums and
/// counts only.
#[derive(Debug, Default)]
pub struct Recorder {
    per_task: SeriesRegistry,
    per_protocol: SeriesRegistry,
    failure_reasons: DashMap<SeriesKey, u64>,
}

impl Recorder {
    pub fn record(&self, event: RequestEvent) {
        let elapsed_us = event.elapsed.as_micros().min(u64::MAX as u128) as u64;
        let failed = event.outcome.is_failure();
        let scope = event.protocol.token();

        self.per_task
            .series(scope, &event.task)
            .observe(elapsed_us, event.bytes, failed);
        self.per_protocol
            .series(scope, AGGREGATED_ROW)
            .observe(elapsed_us, event.bytes, failed);

        if let Outcome::Failure(reason) = &event.outcome {
            *self
                .failure_reasons
                .entry(SeriesKey::new(scope, reason))
                .or_insert(0) += 1;
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.per_protocol
            .snapshot()
            .into_iter()
            .map(|(_, snap)| snap.requests)
            .sum()
    }

    pub fn task_snapshot(&self) -> Vec<(SeriesKey, SeriesSnapshot)> {
        self.per_task.snapshot()
    }

    pub fn protocol_snapshot(&self) -> Vec<(SeriesKey, SeriesSnapshot)> {
        self.per_protocol.snapshot()
    }

    /// Failure reason counts, sorted for stable reporting.
    pub fn failure_reasons(&self) -> Vec<(SeriesKey, u64)> {
        let mut out: Vec<(SeriesKey, u64)> = self
            .failure_reasons
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.per_task.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn event(protocol: Protocol, task: &str, outcome: Outcome) -> RequestEvent {
        RequestEvent::new(
            protocol,
            Arc::from(task),
            Duration::from_millis(5),
            64,
            outcome,
        )
    }

    #[test]
    fn failure_events_carry_zero_bytes() {
        let ev = event(Protocol::Rest, "/users", Outcome::failure("http_status:500"));
        assert_eq!(ev.bytes, 0);

        let ok = event(Protocol::Rest, "/users", Outcome::Success);
        assert_eq!(ok.bytes, 64);
    }

    #[test]
    fn concurrent_writers_lose_no_events() {
        const WRITERS: usize = 8;
        const EVENTS_PER_WRITER: usize = 2_000;

        let recorder = Arc::new(Recorder::default());

        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let recorder = recorder.clone();
                std::thread::spawn(move || {
                    for i in 0..EVENTS_PER_WRITER {
                        let protocol = if w % 2 == 0 {
                            Protocol::Rest
                        } else {
                            Protocol::Grpc
                        };
                        let outcome = if i % 10 == 0 {
                            Outcome::failure("http_status:500")
                        } else {
                            Outcome::Success
                        };
                        recorder.record(event(protocol, "/users", outcome));
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(recorder.requests_total(), (WRITERS * EVENTS_PER_WRITER) as u64);

        let failures: u64 = recorder
            .protocol_snapshot()
            .into_iter()
            .map(|(_, s)| s.failures)
            .sum();
        assert_eq!(failures, (WRITERS * EVENTS_PER_WRITER / 10) as u64);

        let reasons = recorder.failure_reasons();
        let total_reasons: u64 = reasons.iter().map(|(_, n)| *n).sum();
        assert_eq!(total_reasons, failures);
    }

    #[test]
    fn per_task_and_per_protocol_series_stay_consistent() {
        let recorder = Recorder::default();
        recorder.record(event(Protocol::Rest, "/users", Outcome::Success));
        recorder.record(event(Protocol::Rest, "/songs", Outcome::Success));
        recorder.record(event(Protocol::Grpc, "GetAllUsers", Outcome::Success));

        let tasks = recorder.task_snapshot();
        assert_eq!(tasks.len(), 3);

        let protocols = recorder.protocol_snapshot();
        assert_eq!(protocols.len(), 2);
        let rest = protocols
            .iter()
            .find(|(k, _)| &*k.scope == "rest")
            .unwrap();
        assert_eq!(rest.1.requests, 2);
        assert_eq!(&*rest.0.name, AGGREGATED_ROW);
    }
}

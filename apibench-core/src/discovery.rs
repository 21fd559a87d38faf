use std::collections::BTreeMap;
use std::time::Duration;

use apibench_http::{HttpClient, HttpRequest};
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;

use crate::config::{DiscoverySettings, Target, TargetHealth};
use crate::protocol::Protocol;
use crate::signal::StopSignal;

/// Per-protocol readiness observed by one discovery pass. Produced once,
/// never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessSet {
    map: BTreeMap<Protocol, bool>,
}

impl ReadinessSet {
    pub fn with_targets(targets: &[Target]) -> Self {
        Self {
            map: targets.iter().map(|t| (t.protocol, false)).collect(),
        }
    }

    fn set(&mut self, protocol: Protocol, ready: bool) {
        self.map.insert(protocol, ready);
    }

    pub fn is_ready(&self, protocol: Protocol) -> bool {
        self.map.get(&protocol).copied().unwrap_or(false)
    }

    pub fn any_ready(&self) -> bool {
        self.map.values().any(|v| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Protocol, bool)> + '_ {
        self.map.iter().map(|(p, r)| (*p, *r))
    }

    pub fn ready_protocols(&self) -> Vec<Protocol> {
        self.map
            .iter()
            .filter(|(_, r)| **r)
            .map(|(p, _)| *p)
            .collect()
    }
}

/// Discovery is a bounded state machine: every round probes all targets
/// together, then either finishes or waits out the inter-round delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Probing { attempt: u32 },
    Found,
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub readiness: ReadinessSet,
    pub state: DiscoveryState,
    /// Rounds actually performed (1-based).
    pub rounds: u32,
}

/// Probes all targets with bounded retries until at least one is ready.
///
/// Partial readiness is accepted: the first round with any ready target
/// returns immediately, leaving the rest `false`. A run whose every round
/// comes back empty terminates after `max_attempts` rounds with an
/// all-false map, a normal, non-fatal outcome. The stop signal is checked
/// while waiting between rounds.
pub async fn discover<F, Fut>(
    targets: &[Target],
    settings: &DiscoverySettings,
    stop: &StopSignal,
    probe: F,
) -> DiscoveryReport
where
    F: Fn(Target) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut readiness = ReadinessSet::with_targets(targets);
    let mut state = DiscoveryState::Probing { attempt: 1 };
    let mut rounds = 0;

    // Nothing to probe: retrying would never change the outcome.
    if targets.is_empty() {
        return DiscoveryReport {
            readiness,
            state: DiscoveryState::Exhausted,
            rounds,
        };
    }

    loop {
        let DiscoveryState::Probing { attempt } = state else {
            break;
        };
        rounds = attempt;

        for target in targets {
            let ready = probe(target.clone()).await;
            readiness.set(target.protocol, ready);
        }

        if readiness.any_ready() {
            state = DiscoveryState::Found;
            break;
        }

        if attempt >= settings.max_attempts || stop.is_stopped() {
            state = DiscoveryState::Exhausted;
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(settings.delay) => {
                state = DiscoveryState::Probing { attempt: attempt + 1 };
            }
            _ = stop.cancelled() => {
                state = DiscoveryState::Exhausted;
            }
        }
    }

    DiscoveryReport {
        readiness,
        state,
        rounds,
    }
}

/// Single bounded-latency readiness probe. Never errors: an unreachable
/// or unhealthy target is simply not ready.
pub async fn probe_target(http: &HttpClient, target: &Target, timeout: Duration) -> bool {
    match &target.health {
        TargetHealth::HttpGet { path } => {
            let url = format!("{}{}", target.address, path);
            match http.request(HttpRequest::get(url).timeout(timeout)).await {
                Ok(res) => res.status < 500,
                Err(_) => false,
            }
        }
        TargetHealth::GrpcHealth { service } => {
            probe_grpc_health(&target.address, service, timeout).await
        }
    }
}

async fn probe_grpc_health(address: &str, service: &str, timeout: Duration) -> bool {
    let uri = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };

    let endpoint = match tonic::transport::Endpoint::from_shared(uri) {
        Ok(e) => e.connect_timeout(timeout).timeout(timeout),
        Err(_) => return false,
    };

    let channel = match endpoint.connect().await {
        Ok(c) => c,
        Err(_) => return false,
    };

    let mut client = HealthClient::new(channel);
    let request = HealthCheckRequest {
        service: service.to_string(),
    };

    match tokio::time::timeout(timeout, client.check(request)).await {
        Ok(Ok(res)) => res.into_inner().status() == ServingStatus::Serving,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn settings(max_attempts: u32, delay_ms: u64) -> DiscoverySettings {
        DiscoverySettings {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
            probe_timeout: Duration::from_millis(100),
        }
    }

    fn two_targets() -> Vec<Target> {
        vec![
            Target::new(Protocol::Rest, "http://127.0.0.1:1".to_string()),
            Target::new(Protocol::Grpc, "127.0.0.1:1".to_string()),
        ]
    }

    #[tokio::test]
    async fn target_ready_on_kth_round_is_found_by_round_k() {
        let targets = two_targets();
        let stop = StopSignal::new();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_probe = calls.clone();
        let report = discover(&targets, &settings(10, 1), &stop, move |target| {
            let calls = calls_probe.clone();
            async move {
                if target.protocol == Protocol::Rest {
                    // One probe call per round for this target.
                    calls.fetch_add(1, Ordering::SeqCst) + 1 >= 3
                } else {
                    false
                }
            }
        })
        .await;

        assert_eq!(report.state, DiscoveryState::Found);
        assert_eq!(report.rounds, 3);
        assert!(report.readiness.is_ready(Protocol::Rest));
        assert!(!report.readiness.is_ready(Protocol::Grpc));
        assert_eq!(report.readiness.ready_protocols(), vec![Protocol::Rest]);
    }

    #[tokio::test]
    async fn never_ready_terminates_after_exactly_max_attempts() {
        let targets = two_targets();
        let stop = StopSignal::new();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_probe = calls.clone();
        let started = Instant::now();
        let report = discover(&targets, &settings(4, 1), &stop, move |_| {
            let calls = calls_probe.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            }
        })
        .await;

        assert_eq!(report.state, DiscoveryState::Exhausted);
        assert_eq!(report.rounds, 4);
        // Two targets, four rounds, every round probes both.
        assert_eq!(calls.load(Ordering::SeqCst), 8);
        assert!(!report.readiness.any_ready());
        assert!(started.elapsed() < Duration::from_secs(5), "must not hang");
    }

    #[tokio::test]
    async fn first_round_success_returns_immediately() {
        let targets = two_targets();
        let stop = StopSignal::new();

        let report = discover(&targets, &settings(10, 1_000), &stop, |_| async { true }).await;

        assert_eq!(report.state, DiscoveryState::Found);
        assert_eq!(report.rounds, 1);
        assert_eq!(report.readiness.ready_protocols().len(), 2);
    }

    #[tokio::test]
    async fn stop_signal_cancels_between_rounds() {
        let targets = two_targets();
        let stop = StopSignal::new();
        stop.stop();

        let report = discover(&targets, &settings(10, 60_000), &stop, |_| async { false }).await;

        assert_eq!(report.state, DiscoveryState::Exhausted);
        assert_eq!(report.rounds, 1);
    }

    #[tokio::test]
    async fn no_targets_is_immediately_exhausted() {
        let stop = StopSignal::new();
        let report = discover(&[], &settings(10, 60_000), &stop, |_| async { true }).await;
        assert_eq!(report.state, DiscoveryState::Exhausted);
        assert_eq!(report.rounds, 0);
    }

    #[tokio::test]
    async fn http_probe_of_unreachable_target_is_not_ready() {
        let http = HttpClient::new(Some(Duration::from_millis(100)));
        let target = Target::new(Protocol::Rest, "http://192.0.2.1:81".to_string());
        assert!(!probe_target(&http, &target, Duration::from_millis(200)).await);
    }
}

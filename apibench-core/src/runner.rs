use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

use apibench_http::HttpClient;

use crate::adapter::ApiAdapter;
use crate::config::{RunConfig, Target};
use crate::discovery::{DiscoveryState, ReadinessSet, discover, probe_target};
use crate::error::Result;
use crate::protocol::Protocol;
use crate::scheduler::{TaskSet, tasks_for, think_time};
use crate::signal::StopSignal;
use crate::stats::{Recorder, RequestEvent};
use crate::summary::RunSummary;

/// Result of one orchestrated run. Always produced: an exhausted
/// discovery or skipped populations still yield a (possibly empty)
/// summary.
#[derive(Debug)]
pub struct RunOutcome {
    pub readiness: ReadinessSet,
    pub discovery_state: DiscoveryState,
    pub discovery_rounds: u32,
    pub summary: RunSummary,
    /// Populations that could not start, with the reason.
    pub skipped: Vec<(Protocol, String)>,
}

struct UserContext {
    protocol: Protocol,
    adapter: Arc<ApiAdapter>,
    tasks: Arc<TaskSet>,
    recorder: Arc<Recorder>,
    stop: Arc<StopSignal>,
    min_wait: Duration,
    max_wait: Duration,
    seed: u64,
}

/// One simulated user: pick, execute, record, think, repeat. Failures are
/// recorded and the loop continues; only the stop signal ends it.
async fn user_loop(ctx: UserContext) {
    let mut rng = SmallRng::seed_from_u64(ctx.seed);

    while !ctx.stop.is_stopped() {
        let task = ctx.tasks.pick(&mut rng);
        let sample = ctx.adapter.execute(&task.op).await;
        ctx.recorder.record(RequestEvent::new(
            ctx.protocol,
            task.name.clone(),
            sample.elapsed,
            sample.bytes,
            sample.outcome,
        ));

        let wait = think_time(&mut rng, ctx.min_wait, ctx.max_wait);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = ctx.stop.cancelled() => break,
        }
    }
}

/// One population of simulated users bound to one ready protocol.
struct Population {
    adapter: Arc<ApiAdapter>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Population {
    async fn start(
        target: &Target,
        config: &RunConfig,
        http: Arc<HttpClient>,
        recorder: Arc<Recorder>,
        stop: Arc<StopSignal>,
        seed: u64,
    ) -> Result<Self> {
        let adapter = Arc::new(
            ApiAdapter::for_target(target, http, config.request_timeout).await?,
        );
        let tasks = Arc::new(TaskSet::new(tasks_for(target.protocol))?);

        let mut handles = Vec::with_capacity(config.users as usize);
        for user in 0..config.users {
            let ctx = UserContext {
                protocol: target.protocol,
                adapter: adapter.clone(),
                tasks: tasks.clone(),
                recorder: recorder.clone(),
                stop: stop.clone(),
                min_wait: config.min_wait,
                max_wait: config.max_wait,
                seed: user_seed(seed, target.protocol, user),
            };
            handles.push(tokio::spawn(user_loop(ctx)));
        }

        Ok(Self { adapter, handles })
    }

    /// Waits for every user to exit, then releases the population's
    /// transport exactly once.
    async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
        drop(self.adapter);
    }
}

fn user_seed(run_seed: u64, protocol: Protocol, user: u64) -> u64 {
    // Distinct streams per (protocol, user) from one run seed.
    run_seed
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((protocol as u64) << 32)
        .wrapping_add(user)
}

/// Orchestrates one run: discovery, one population per ready protocol,
/// timed load, prompt teardown, summary.
pub async fn run(config: RunConfig, stop: Arc<StopSignal>) -> Result<RunOutcome> {
    config.validate()?;

    let http = Arc::new(HttpClient::default());
    let targets = config.targets.targets();

    let report = {
        let http = http.clone();
        let probe_timeout = config.discovery.probe_timeout;
        discover(&targets, &config.discovery, &stop, move |target| {
            let http = http.clone();
            async move { probe_target(&http, &target, probe_timeout).await }
        })
        .await
    };

    let recorder = Arc::new(Recorder::default());
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());

    let mut populations = Vec::new();
    let mut skipped = Vec::new();

    let started = Instant::now();
    for target in &targets {
        if !report.readiness.is_ready(target.protocol) {
            continue;
        }

        match Population::start(
            target,
            &config,
            http.clone(),
            recorder.clone(),
            stop.clone(),
            seed,
        )
        .await
        {
            Ok(population) => populations.push(population),
            Err(err) => skipped.push((target.protocol, err.to_string())),
        }
    }

    if !populations.is_empty() {
        tokio::select! {
            _ = tokio::time::sleep(config.duration) => {}
            _ = stop.cancelled() => {}
        }
    }
    stop.stop();

    for population in populations {
        population.join().await;
    }

    let elapsed = started.elapsed();
    Ok(RunOutcome {
        readiness: report.readiness,
        discovery_state: report.state,
        discovery_rounds: report.rounds,
        summary: RunSummary::from_recorder(&recorder, elapsed, config.users),
        skipped,
    })
}

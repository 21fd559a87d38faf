use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use apibench_core::{DiscoveryState, RunConfig, StopSignal};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;

fn build_config(args: &RunArgs) -> apibench_core::Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml_file(path)?,
        None => RunConfig::default(),
    };

    if let Some(users) = args.users {
        config.users = users;
    }
    if let Some(duration) = args.duration {
        config.duration = duration;
    }
    if let Some(min_wait) = args.min_wait {
        config.min_wait = min_wait;
    }
    if let Some(max_wait) = args.max_wait {
        config.max_wait = max_wait;
    }
    if let Some(rest) = &args.rest {
        config.targets.rest = Some(rest.clone());
    }
    if let Some(soap) = &args.soap {
        config.targets.soap = Some(soap.clone());
    }
    if let Some(graphql) = &args.graphql {
        config.targets.graphql = Some(graphql.clone());
    }
    if let Some(grpc) = &args.grpc {
        config.targets.grpc = Some(grpc.clone());
    }
    if let Some(max_attempts) = args.max_attempts {
        config.discovery.max_attempts = max_attempts;
    }
    if let Some(delay) = args.discovery_delay {
        config.discovery.delay = delay;
    }
    if let Some(probe_timeout) = args.probe_timeout {
        config.discovery.probe_timeout = probe_timeout;
    }
    if let Some(out) = &args.out {
        config.output_dir = out.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    config.validate()?;
    Ok(config)
}

pub async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::InvalidInput);
        }
    };

    let stop = Arc::new(StopSignal::new());

    // First interrupt stops the run cleanly; populations wind down within
    // one pending request's timeout.
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupt received, stopping run...");
                stop.stop();
            }
        });
    }

    eprintln!(
        "discovering targets (up to {} rounds, {} between rounds)...",
        config.discovery.max_attempts,
        humantime::format_duration(config.discovery.delay),
    );

    let spinner = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message("running:");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output_dir = config.output_dir.clone();
    let outcome = apibench_core::run(config, stop).await?;

    spinner.finish_and_clear();

    for (protocol, ready) in outcome.readiness.iter() {
        eprintln!(
            " >> {}: {}",
            protocol.label(),
            if ready { "ready" } else { "not ready" }
        );
    }

    if outcome.discovery_state == DiscoveryState::Exhausted {
        eprintln!(
            "no targets became ready after {} rounds; no load was generated",
            outcome.discovery_rounds
        );
    }

    for (protocol, reason) in &outcome.skipped {
        eprintln!("warning: {} population skipped: {reason}", protocol.label());
    }

    if !outcome.summary.is_empty() {
        let written = outcome.summary.write_csv_files(&output_dir)?;
        for path in &written {
            eprintln!("wrote {}", path.display());
        }
    }

    print!("{}", output::render(&outcome));

    Ok(ExitCode::Success)
}

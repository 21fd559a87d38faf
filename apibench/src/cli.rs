use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input.trim())
        .map_err(|err| format!("invalid duration '{input}': {err}"))
}

#[derive(Debug, Parser)]
#[command(
    name = "apibench",
    author,
    version,
    about = "Comparative load-testing orchestrator for equivalent REST, SOAP, GraphQL, and gRPC backends",
    long_about = "apibench probes the configured backends until at least one is ready, then drives an identical weighted workload against every ready protocol with a population of simulated users, and persists one CSV summary per (protocol, load level) for offline comparison.",
    after_help = "Examples:\n  apibench run --users 50 --duration 60s\n  apibench run --config targets.yaml --users 200 --out results/\n  apibench run --rest http://localhost:8080 --grpc localhost:50051 --duration 30s"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one load test against every ready target
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Optional YAML run configuration; CLI flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Simulated concurrent users per ready protocol
    #[arg(long)]
    pub users: Option<u64>,

    /// Load duration (e.g. 60s, 5m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Minimum think-time between task iterations
    #[arg(long, value_parser = parse_duration)]
    pub min_wait: Option<Duration>,

    /// Maximum think-time between task iterations
    #[arg(long, value_parser = parse_duration)]
    pub max_wait: Option<Duration>,

    /// REST base URL (e.g. http://rest-api:8080)
    #[arg(long)]
    pub rest: Option<String>,

    /// SOAP base URL
    #[arg(long)]
    pub soap: Option<String>,

    /// GraphQL base URL
    #[arg(long)]
    pub graphql: Option<String>,

    /// gRPC target address (host:port)
    #[arg(long)]
    pub grpc: Option<String>,

    /// Discovery rounds before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Delay between discovery rounds
    #[arg(long, value_parser = parse_duration)]
    pub discovery_delay: Option<Duration>,

    /// Per-probe hard timeout
    #[arg(long, value_parser = parse_duration)]
    pub probe_timeout: Option<Duration>,

    /// Output directory for per-run CSV summaries
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Seed for reproducible task selection and think-times
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10parsecs").is_err());
    }

    #[test]
    fn cli_parses_run_with_overrides() {
        let parsed = Cli::try_parse_from([
            "apibench",
            "run",
            "--users",
            "200",
            "--duration",
            "30s",
            "--rest",
            "http://localhost:9000",
            "--grpc",
            "localhost:50051",
            "--out",
            "results",
            "--seed",
            "7",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        let Command::Run(args) = cli.command;
        assert_eq!(args.users, Some(200));
        assert_eq!(args.duration, Some(Duration::from_secs(30)));
        assert_eq!(args.rest.as_deref(), Some("http://localhost:9000"));
        assert_eq!(args.grpc.as_deref(), Some("localhost:50051"));
        assert_eq!(args.out, Some(PathBuf::from("results")));
        assert_eq!(args.seed, Some(7));
        assert!(args.config.is_none());
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::Protocol;

/// Bounded-retry settings for the discovery loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Base addresses of the benchmarked backends. Any subset may be set;
/// unset protocols are never probed or driven.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub rest: Option<String>,
    pub soap: Option<String>,
    pub graphql: Option<String>,
    pub grpc: Option<String>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            rest: Some("http://rest-api:8080".to_string()),
            soap: Some("http://soap-api:8080".to_string()),
            graphql: Some("http://graphql-api:8000".to_string()),
            grpc: Some("grpc-api:50051".to_string()),
        }
    }
}

impl TargetsConfig {
    /// The configured targets, in fixed protocol order.
    pub fn targets(&self) -> Vec<Target> {
        let mut out = Vec::new();
        for protocol in Protocol::ALL {
            let address = match protocol {
                Protocol::Rest => &self.rest,
                Protocol::Soap => &self.soap,
                Protocol::Graphql => &self.graphql,
                Protocol::Grpc => &self.grpc,
            };
            if let Some(address) = address {
                out.push(Target::new(protocol, address.clone()));
            }
        }
        out
    }
}

/// How a target's readiness is probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetHealth {
    /// GET `path` on the base address; ready iff status < 500.
    HttpGet { path: String },
    /// Standard gRPC health check; ready iff SERVING.
    GrpcHealth { service: String },
}

/// One network-addressable backend under one protocol. Immutable after
/// configuration load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub protocol: Protocol,
    pub address: String,
    pub health: TargetHealth,
}

impl Target {
    pub fn new(protocol: Protocol, address: String) -> Self {
        let health = match protocol {
            Protocol::Rest => TargetHealth::HttpGet {
                path: "/actuator/health".to_string(),
            },
            Protocol::Soap => TargetHealth::HttpGet {
                path: "/actuator/healthws".to_string(),
            },
            Protocol::Graphql => TargetHealth::HttpGet {
                path: "/graphql".to_string(),
            },
            Protocol::Grpc => TargetHealth::GrpcHealth {
                service: String::new(),
            },
        };

        Self {
            protocol,
            address,
            health,
        }
    }
}

/// Full configuration of one load run. Loaded from YAML; CLI flags
/// override individual fields before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub targets: TargetsConfig,

    /// Simulated concurrent users per ready protocol.
    pub users: u64,

    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Think-time range between task iterations.
    #[serde(with = "humantime_serde")]
    pub min_wait: Duration,
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    pub discovery: DiscoverySettings,

    /// Directory for per-run CSV summaries.
    pub output_dir: PathBuf,

    /// Seed for the per-user randomness; fresh entropy when unset.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            targets: TargetsConfig::default(),
            users: 50,
            duration: Duration::from_secs(60),
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            discovery: DiscoverySettings::default(),
            output_dir: PathBuf::from("results"),
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: RunConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.users == 0 {
            return Err(Error::InvalidUsers);
        }
        if self.min_wait > self.max_wait {
            return Err(Error::InvalidWaitRange);
        }
        if self.discovery.max_attempts == 0 {
            return Err(Error::InvalidMaxAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn default_config_is_valid_and_targets_all_protocols() {
        let cfg = RunConfig::default();
        cfg.validate().unwrap();

        let targets = cfg.targets.targets();
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[0].protocol, Protocol::Rest);
        assert_eq!(
            targets[0].health,
            TargetHealth::HttpGet {
                path: "/actuator/health".to_string()
            }
        );
        assert_eq!(targets[3].protocol, Protocol::Grpc);
    }

    #[test]
    fn yaml_overrides_and_omissions() {
        let cfg = RunConfig::from_yaml(
            "targets:\n  rest: http://localhost:9000\n  grpc: null\nusers: 200\nduration: 30s\nmin_wait: 250ms\nmax_wait: 500ms\n",
        )
        .unwrap();

        assert_eq!(cfg.users, 200);
        assert_eq!(cfg.duration, Duration::from_secs(30));
        assert_eq!(cfg.min_wait, Duration::from_millis(250));
        assert_eq!(cfg.targets.rest.as_deref(), Some("http://localhost:9000"));
        assert!(cfg.targets.grpc.is_none());

        let protocols: Vec<Protocol> = cfg
            .targets
            .targets()
            .into_iter()
            .map(|t| t.protocol)
            .collect();
        assert_eq!(
            protocols,
            vec![Protocol::Rest, Protocol::Soap, Protocol::Graphql]
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = RunConfig::default();
        cfg.users = 0;
        assert!(matches!(cfg.validate(), Err(Error::InvalidUsers)));

        let mut cfg = RunConfig::default();
        cfg.min_wait = Duration::from_secs(3);
        cfg.max_wait = Duration::from_secs(1);
        assert!(matches!(cfg.validate(), Err(Error::InvalidWaitRange)));

        let mut cfg = RunConfig::default();
        cfg.discovery.max_attempts = 0;
        assert!(matches!(cfg.validate(), Err(Error::InvalidMaxAttempts)));
    }

    #[test]
    fn unknown_yaml_fields_are_rejected() {
        assert!(RunConfig::from_yaml("userz: 10\n").is_err());
    }
}

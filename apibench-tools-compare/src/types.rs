/// One combined row per (technology, load level), derived from one input
/// table, never hand-edited.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparativeStat {
    /// Display label (REST, SOAP, GraphQL, gRPC).
    pub tech: String,
    /// Lowercase filename token the label was derived from.
    pub tech_token: String,
    /// Load level: simulated users.
    pub load: u64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub rps: f64,
    pub failures: u64,
}

pub(crate) fn tech_label(token: &str) -> String {
    match token.to_ascii_lowercase().as_str() {
        "rest" => "REST".to_string(),
        "soap" => "SOAP".to_string(),
        "graphql" => "GraphQL".to_string(),
        "grpc" => "gRPC".to_string(),
        other => other.to_string(),
    }
}

/// Parses `<tech>-<load>.<ext>` file names; anything else is skipped by
/// the caller with a warning.
pub(crate) fn parse_file_name(name: &str) -> Option<(String, u64)> {
    let stem = name.split('.').next()?;
    let (tech, load) = stem.split_once('-')?;

    if tech.is_empty() || !tech.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if load.is_empty() || !load.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((tech.to_ascii_lowercase(), load.parse().ok()?))
}

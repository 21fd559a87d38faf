use serde::{Deserialize, Serialize};

/// The four transports driven against the shared catalog model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Rest,
    Soap,
    Graphql,
    Grpc,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [
        Protocol::Rest,
        Protocol::Soap,
        Protocol::Graphql,
        Protocol::Grpc,
    ];

    /// Lowercase token used in file names and series scopes.
    pub fn token(&self) -> &'static str {
        match self {
            Protocol::Rest => "rest",
            Protocol::Soap => "soap",
            Protocol::Graphql => "graphql",
            Protocol::Grpc => "grpc",
        }
    }

    /// Human display label.
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Rest => "REST",
            Protocol::Soap => "SOAP",
            Protocol::Graphql => "GraphQL",
            Protocol::Grpc => "gRPC",
        }
    }
}

mod graphql;
mod grpc;
mod rest;
mod soap;

use std::sync::Arc;
use std::time::Duration;

use apibench_http::HttpClient;

use crate::config::Target;
use crate::error::Result;
use crate::protocol::Protocol;
use crate::scheduler::TaskOp;
use crate::stats::Outcome;

pub use graphql::GraphqlAdapter;
pub use grpc::GrpcAdapter;
pub use rest::RestAdapter;
pub use soap::SoapAdapter;

/// Measured result of one request attempt, before it becomes an event.
#[derive(Debug, Clone)]
pub struct Sample {
    pub elapsed: Duration,
    pub bytes: u64,
    pub outcome: Outcome,
}

impl Sample {
    pub(crate) fn success(elapsed: Duration, bytes: u64) -> Self {
        Self {
            elapsed,
            bytes,
            outcome: Outcome::Success,
        }
    }

    pub(crate) fn failure(elapsed: Duration, reason: impl Into<Arc<str>>) -> Self {
        Self {
            elapsed,
            bytes: 0,
            outcome: Outcome::failure(reason),
        }
    }
}

/// One transport bound to one target. Transport differences stay behind
/// this boundary: callers only see tasks in, samples out.
#[derive(Debug)]
pub enum ApiAdapter {
    Rest(RestAdapter),
    Soap(SoapAdapter),
    Graphql(GraphqlAdapter),
    Grpc(GrpcAdapter),
}

impl ApiAdapter {
    /// Builds the adapter for a target. HTTP-based transports share the
    /// run's client; gRPC opens its channel here, once per population.
    pub async fn for_target(
        target: &Target,
        http: Arc<HttpClient>,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(match target.protocol {
            Protocol::Rest => {
                ApiAdapter::Rest(RestAdapter::new(http, &target.address, request_timeout))
            }
            Protocol::Soap => {
                ApiAdapter::Soap(SoapAdapter::new(http, &target.address, request_timeout))
            }
            Protocol::Graphql => {
                ApiAdapter::Graphql(GraphqlAdapter::new(http, &target.address, request_timeout))
            }
            Protocol::Grpc => {
                ApiAdapter::Grpc(GrpcAdapter::connect(&target.address, request_timeout).await?)
            }
        })
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            ApiAdapter::Rest(_) => Protocol::Rest,
            ApiAdapter::Soap(_) => Protocol::Soap,
            ApiAdapter::Graphql(_) => Protocol::Graphql,
            ApiAdapter::Grpc(_) => Protocol::Grpc,
        }
    }

    /// Executes one operation. Transport and application problems are both
    /// folded into the sample's outcome; this never errors.
    pub async fn execute(&self, op: &TaskOp) -> Sample {
        match (self, op) {
            (ApiAdapter::Rest(a), TaskOp::HttpGet { path }) => a.execute(path).await,
            (ApiAdapter::Soap(a), TaskOp::Soap {
                operation,
                inner_xml,
            }) => a.execute(operation, inner_xml).await,
            (ApiAdapter::Graphql(a), TaskOp::Graphql { query }) => a.execute(query).await,
            (ApiAdapter::Grpc(a), TaskOp::Grpc { call }) => a.execute(*call).await,
            _ => Sample::failure(Duration::ZERO, "unsupported-operation"),
        }
    }
}

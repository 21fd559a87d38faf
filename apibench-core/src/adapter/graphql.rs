use std::sync::Arc;
use std::time::{Duration, Instant};

use apibench_http::{HttpClient, HttpRequest};
use serde_json::json;

use super::Sample;

const GRAPHQL_PATH: &str = "/graphql";

#[derive(Debug)]
pub struct GraphqlAdapter {
    client: Arc<HttpClient>,
    base: String,
    timeout: Duration,
}

impl GraphqlAdapter {
    pub fn new(client: Arc<HttpClient>, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub async fn execute(&self, query: &str) -> Sample {
        let url = format!("{}{}", self.base, GRAPHQL_PATH);
        let payload = json!({ "query": query }).to_string();

        let started = Instant::now();
        let res = self
            .client
            .request(
                HttpRequest::post(url, payload.into())
                    .header("content-type", "application/json")
                    .timeout(self.timeout),
            )
            .await;
        let elapsed = started.elapsed();

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                return Sample::failure(
                    elapsed,
                    format!("http_error:{}", err.transport_error_kind()),
                );
            }
        };

        if res.status >= 400 {
            return Sample::failure(elapsed, format!("http_status:{}", res.status));
        }

        // The transport call succeeded, but GraphQL reports resolver
        // problems inside a 2xx body; those count as failed requests.
        let body: serde_json::Value = match serde_json::from_slice(&res.body) {
            Ok(v) => v,
            Err(_) => return Sample::failure(elapsed, "malformed-response"),
        };

        let has_errors = body
            .get("errors")
            .and_then(|e| e.as_array())
            .is_some_and(|a| !a.is_empty());
        if has_errors {
            return Sample::failure(elapsed, "graphql-error");
        }

        Sample::success(elapsed, res.body.len() as u64)
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use apibench_http::{HttpClient, HttpRequest};

use super::Sample;

#[derive(Debug)]
pub struct RestAdapter {
    client: Arc<HttpClient>,
    base: String,
    timeout: Duration,
}

impl RestAdapter {
    pub fn new(client: Arc<HttpClient>, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub async fn execute(&self, path: &str) -> Sample {
        let url = format!("{}{}", self.base, path);
        let started = Instant::now();
        let res = self
            .client
            .request(HttpRequest::get(url).timeout(self.timeout))
            .await;
        let elapsed = started.elapsed();

        match res {
            Ok(res) if res.status < 400 => Sample::success(elapsed, res.body.len() as u64),
            Ok(res) => Sample::failure(elapsed, format!("http_status:{}", res.status)),
            Err(err) => Sample::failure(
                elapsed,
                format!("http_error:{}", err.transport_error_kind()),
            ),
        }
    }
}

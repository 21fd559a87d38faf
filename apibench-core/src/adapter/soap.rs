use std::sync::Arc;
use std::time::{Duration, Instant};

use apibench_http::{HttpClient, HttpRequest};

use super::Sample;

const SOAP_PATH: &str = "/ws";

#[derive(Debug)]
pub struct SoapAdapter {
    client: Arc<HttpClient>,
    base: String,
    timeout: Duration,
}

/// Envelope for one document-style operation with interpolated parameters.
pub(crate) fn build_envelope(operation: &str, inner_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
                  xmlns:demo="http://example.com/demo">
    <soapenv:Header/>
    <soapenv:Body>
        <demo:{operation}>
            {inner_xml}
        </demo:{operation}>
    </soapenv:Body>
</soapenv:Envelope>"#
    )
}

impl SoapAdapter {
    pub fn new(client: Arc<HttpClient>, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub async fn execute(&self, operation: &str, inner_xml: &str) -> Sample {
        let url = format!("{}{}", self.base, SOAP_PATH);
        let payload = build_envelope(operation, inner_xml);

        let started = Instant::now();
        let res = self
            .client
            .request(
                HttpRequest::post(url, payload.into())
                    .header("content-type", "text/xml")
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

        // Some stacks answer 2xx with a Fault element in the body.
        if res.body_utf8().is_some_and(|body| body.contains("Fault>")) {
            return Sample::failure(elapsed, "soap-fault");
        }

        Sample::success(elapsed, res.body.len() as u64)
    }
}

//! In-process mock backends for the four benchmarked protocols.
//!
//! One HTTP server hosts the REST, SOAP, and GraphQL surfaces of the shared
//! catalog model; a separate tonic server hosts the gRPC surface plus the
//! standard health service. Fault-injection toggles let tests exercise the
//! failure-classification paths without a misbehaving real backend.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub mod grpc;
pub use grpc::GrpcTestServer;

pub const PATH_REST_HEALTH: &str = "/actuator/health";
pub const PATH_SOAP_HEALTH: &str = "/actuator/healthws";
pub const PATH_SOAP: &str = "/ws";
pub const PATH_GRAPHQL: &str = "/graphql";

/// Runtime switches shared with tests.
#[derive(Debug, Default)]
pub struct TestToggles {
    /// When set, POST /graphql answers 200 with an `errors` body.
    graphql_errors: AtomicBool,
    /// When set, POST /ws answers 200 with a Fault envelope.
    soap_fault: AtomicBool,
    /// Status code returned by both health endpoints.
    health_status: AtomicU16,
}

impl TestToggles {
    pub fn set_graphql_errors(&self, on: bool) {
        self.graphql_errors.store(on, Ordering::Relaxed);
    }

    pub fn set_soap_fault(&self, on: bool) {
        self.soap_fault.store(on, Ordering::Relaxed);
    }

    pub fn set_health_status(&self, status: u16) {
        self.health_status.store(status, Ordering::Relaxed);
    }

    fn health_status(&self) -> StatusCode {
        StatusCode::from_u16(self.health_status.load(Ordering::Relaxed))
            .unwrap_or(StatusCode::OK)
    }
}

fn canned_users() -> serde_json::Value {
    json!([
        {"id": 1, "name": "Alice", "email": "alice@example.com"},
        {"id": 2, "name": "Bob", "email": "bob@example.com"},
    ])
}

fn canned_songs() -> serde_json::Value {
    json!([
        {"id": 1, "title": "Blue Train", "artist": "John Coltrane"},
        {"id": 2, "title": "So What", "artist": "Miles Davis"},
        {"id": 3, "title": "Take Five", "artist": "Dave Brubeck"},
    ])
}

fn canned_playlists() -> serde_json::Value {
    json!([
        {"id": 1, "name": "Jazz Classics"},
        {"id": 2, "name": "Late Night"},
    ])
}

async fn handle_rest_health(State(toggles): State<Arc<TestToggles>>) -> (StatusCode, &'static str) {
    (toggles.health_status(), r#"{"status":"UP"}"#)
}

async fn handle_users() -> axum::Json<serde_json::Value> {
    axum::Json(canned_users())
}

async fn handle_songs() -> axum::Json<serde_json::Value> {
    axum::Json(canned_songs())
}

async fn handle_user_playlists(Path(_id): Path<i64>) -> axum::Json<serde_json::Value> {
    axum::Json(canned_playlists())
}

async fn handle_playlist_songs(Path(_id): Path<i64>) -> axum::Json<serde_json::Value> {
    axum::Json(canned_songs())
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(rename = "songId")]
    song_id: Option<i64>,
}

async fn handle_playlist_search(
    Query(params): Query<SearchParams>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    if params.song_id.is_none() {
        return (StatusCode::BAD_REQUEST, axum::Json(json!([])));
    }
    (StatusCode::OK, axum::Json(canned_playlists()))
}

async fn handle_soap(
    State(toggles): State<Arc<TestToggles>>,
    body: Bytes,
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    let xml_headers = [("content-type", "text/xml")];

    if toggles.soap_fault.load(Ordering::Relaxed) {
        let fault = soap_envelope(
            "<soapenv:Fault><faultcode>soapenv:Server</faultcode>\
             <faultstring>injected fault</faultstring></soapenv:Fault>",
        );
        return (StatusCode::OK, xml_headers, fault);
    }

    // Echo the request operation back as `<op>Response`.
    let op = extract_operation(&body).unwrap_or_else(|| "unknownRequest".to_string());
    let response_op = op.replace("Request", "Response");
    let inner = format!("<demo:{response_op}><demo:ok>true</demo:ok></demo:{response_op}>");
    (StatusCode::OK, xml_headers, soap_envelope(&inner))
}

fn soap_envelope(inner: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:demo=\"http://example.com/demo\">\
         <soapenv:Body>{inner}</soapenv:Body></soapenv:Envelope>"
    )
}

/// Pulls the first `demo:`-prefixed element name out of a request envelope.
fn extract_operation(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?;
    let start = text.find("<demo:")? + "<demo:".len();
    let rest = &text[start..];
    let end = rest.find(|c: char| c == '>' || c.is_whitespace())?;
    Some(rest[..end].to_string())
}

async fn handle_graphql_get(State(toggles): State<Arc<TestToggles>>) -> (StatusCode, &'static str) {
    (toggles.health_status(), "GraphiQL")
}

#[derive(Debug, Deserialize)]
struct GraphqlRequest {
    query: String,
}

async fn handle_graphql_post(
    State(toggles): State<Arc<TestToggles>>,
    body: Bytes,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let req: GraphqlRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({"errors": [{"message": "invalid request body"}]})),
            );
        }
    };

    // Transport-level success with an application-level error body.
    if toggles.graphql_errors.load(Ordering::Relaxed) {
        return (
            StatusCode::OK,
            axum::Json(json!({"data": null, "errors": [{"message": "injected resolver error"}]})),
        );
    }

    let data = if req.query.contains("userPlaylists") || req.query.contains("playlistsBySong") {
        json!({"data": {"playlists": canned_playlists()}})
    } else if req.query.contains("playlistSongs") || req.query.contains("songs") {
        json!({"data": {"songs": canned_songs()}})
    } else {
        json!({"data": {"users": canned_users()}})
    };

    (StatusCode::OK, axum::Json(data))
}

pub fn router(toggles: Arc<TestToggles>) -> Router {
    Router::new()
        .route(PATH_REST_HEALTH, get(handle_rest_health))
        .route(PATH_SOAP_HEALTH, get(handle_rest_health))
        .route("/users", get(handle_users))
        .route("/songs", get(handle_songs))
        .route("/users/{id}/playlists", get(handle_user_playlists))
        .route("/playlists/{id}/songs", get(handle_playlist_songs))
        .route("/playlists/search", get(handle_playlist_search))
        .route(PATH_SOAP, post(handle_soap))
        .route(
            PATH_GRAPHQL,
            get(handle_graphql_get).post(handle_graphql_post),
        )
        .with_state(toggles)
}

/// One HTTP server carrying the REST, SOAP, and GraphQL surfaces.
pub struct HttpTestServer {
    addr: SocketAddr,
    base_url: String,
    toggles: Arc<TestToggles>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl HttpTestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let toggles = Arc::new(TestToggles::default());
        toggles.set_health_status(200);

        let app = router(toggles.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            toggles,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn toggles(&self) -> &TestToggles {
        &self.toggles
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HttpTestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

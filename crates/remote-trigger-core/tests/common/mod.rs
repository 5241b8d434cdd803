// crates/remote-trigger-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted transport and fixtures for engine tests.
// Purpose: Drive the engine deterministically without a network.
// Dependencies: remote-trigger-core, serde_json
// ============================================================================

//! ## Overview
//! [`ScriptedTransport`] answers requests by method and exact path from
//! per-route response queues. The last scripted response of a route repeats;
//! unscripted routes answer 404 (which also means "no crumbs required").

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use remote_trigger_core::AuthorizationProvider;
use remote_trigger_core::ExecutionContext;
use remote_trigger_core::HttpMethod;
use remote_trigger_core::HttpRequest;
use remote_trigger_core::HttpResponse;
use remote_trigger_core::IdentityPath;
use remote_trigger_core::InMemoryCredentialStore;
use remote_trigger_core::RemoteBuildConfig;
use remote_trigger_core::RemoteServerDescriptor;
use remote_trigger_core::RemoteTransport;
use remote_trigger_core::RemoteTrigger;
use remote_trigger_core::StaticServerLookup;
use remote_trigger_core::TransportError;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Address of the scripted remote server.
pub const SERVER: &str = "http://ci.example.test:8080";
/// Job path used by most fixtures.
pub const JOB_PATH: &str = "/job/Folder/job/app";
/// Queue id returned by [`created`].
pub const QUEUE_ID: &str = "42";
/// Build number returned by [`queue_started`].
pub const BUILD_NUMBER: u64 = 7;

// ============================================================================
// SECTION: Scripted Transport
// ============================================================================

/// One scripted route.
struct Route {
    method: HttpMethod,
    path: String,
    responses: VecDeque<Result<HttpResponse, TransportError>>,
}

/// Transport answering from scripted per-route queues.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends a response for `method` and exact `path`.
    pub fn on(&self, method: HttpMethod, path: &str, response: Result<HttpResponse, TransportError>) {
        let mut routes = self.routes.lock().unwrap();
        if let Some(route) =
            routes.iter_mut().find(|route| route.method == method && route.path == path)
        {
            route.responses.push_back(response);
            return;
        }
        routes.push(Route {
            method,
            path: path.to_string(),
            responses: VecDeque::from([response]),
        });
    }

    /// Returns every request seen so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns requests matching `method` and `path`.
    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method && request.url.path() == path)
            .collect()
    }

    /// Returns the number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl RemoteTransport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes
            .iter_mut()
            .find(|route| route.method == request.method && route.path == request.url.path())
        else {
            return Ok(HttpResponse::new(404, "not found"));
        };
        if route.responses.len() > 1 {
            return route.responses.pop_front().unwrap();
        }
        route.responses.front().cloned().unwrap()
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

pub fn json(value: &Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(200, serde_json::to_vec(value).unwrap()))
}

pub fn status(code: u16) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(code, ""))
}

/// Submission accepted with a `Location` pointing at queue item [`QUEUE_ID`].
pub fn created() -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(201, "")
        .with_header("Location", format!("{SERVER}/queue/item/{QUEUE_ID}/")))
}

pub fn queue_waiting() -> Result<HttpResponse, TransportError> {
    json(&serde_json::json!({ "why": "Waiting for next available executor", "cancelled": false }))
}

pub fn queue_started() -> Result<HttpResponse, TransportError> {
    json(&serde_json::json!({
        "executable": { "number": BUILD_NUMBER, "url": format!("{SERVER}{JOB_PATH}/{BUILD_NUMBER}/") }
    }))
}

pub fn build_running() -> Result<HttpResponse, TransportError> {
    json(&serde_json::json!({ "building": true, "result": null }))
}

pub fn build_finished(result: &str) -> Result<HttpResponse, TransportError> {
    json(&serde_json::json!({ "building": false, "result": result }))
}

pub fn job_document() -> Result<HttpResponse, TransportError> {
    json(&serde_json::json!({
        "name": "app",
        "fullName": "Folder/app",
        "displayName": "App",
        "fullDisplayName": "Folder » App",
        "url": format!("{SERVER}{JOB_PATH}/"),
        "inQueue": false,
        "color": "blue"
    }))
}

// ============================================================================
// SECTION: Paths
// ============================================================================

pub fn submit_path() -> String {
    format!("{JOB_PATH}/buildWithParameters")
}

pub fn job_api_path() -> String {
    format!("{JOB_PATH}/api/json")
}

pub fn queue_path() -> String {
    format!("/queue/item/{QUEUE_ID}/api/json")
}

pub fn build_api_path() -> String {
    format!("{JOB_PATH}/{BUILD_NUMBER}/api/json")
}

pub fn build_path(suffix: &str) -> String {
    format!("{JOB_PATH}/{BUILD_NUMBER}/{suffix}")
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Scripts a transport for a build that queues, starts, and finishes.
pub fn happy_path(result: &str) -> Arc<ScriptedTransport> {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Get, &job_api_path(), job_document());
    transport.on(HttpMethod::Post, &submit_path(), created());
    transport.on(HttpMethod::Get, &queue_path(), queue_started());
    transport.on(HttpMethod::Get, &build_api_path(), build_finished(result));
    transport
}

pub fn main_server() -> RemoteServerDescriptor {
    RemoteServerDescriptor::new(SERVER).with_name("main")
}

pub fn engine_with(
    transport: Arc<ScriptedTransport>,
    servers: Vec<RemoteServerDescriptor>,
    credentials: InMemoryCredentialStore,
) -> RemoteTrigger {
    RemoteTrigger::builder(transport)
        .servers(Arc::new(StaticServerLookup::new(servers)))
        .credentials(Arc::new(credentials))
        .build()
}

pub fn engine(transport: Arc<ScriptedTransport>) -> RemoteTrigger {
    engine_with(transport, vec![main_server()], InMemoryCredentialStore::default())
}

/// Configuration for `Folder/app` on the `main` server with fast retries.
pub fn config() -> RemoteBuildConfig {
    let mut config = RemoteBuildConfig::new("Folder/app");
    config.remote_server_name = Some("main".to_string());
    config.parameters.insert("BRANCH".to_string(), "main".to_string());
    config.poll_interval_secs = 1;
    config.retry_backoff_ms = 1;
    config
}

pub fn user_token(username: &str, token: &str) -> AuthorizationProvider {
    AuthorizationProvider::UserTokenAuth {
        username: username.to_string(),
        token: token.to_string(),
    }
}

pub fn context(sink: &mut dyn Write) -> ExecutionContext<'_> {
    ExecutionContext::new(IdentityPath::parse("teamA/pipeline").unwrap(), sink)
}

// ============================================================================
// SECTION: Shared Buffer
// ============================================================================

/// Cloneable in-memory writer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

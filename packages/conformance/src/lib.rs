//! Shared helpers for the PI Web API datasource conformance suite.
//!
//! Provides two in-process servers, both bound to ephemeral ports on
//! `127.0.0.1`:
//!
//! - [`spawn_mock_piwebapi`]: a scripted PI Web API answering the lookup
//!   endpoints (`/points`, `/attributes`, `/elements`) and `/batch`, and
//!   recording every call it receives.
//! - [`spawn_service`]: the datasource service itself, pointed at a given
//!   PI Web API base URL.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use piweb_datasource::{build_router, Datasource, DatasourceConfig};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// A stream the mock serves: units plus one value per timestamp.
#[derive(Debug, Clone)]
pub struct MockStream {
    pub name: String,
    pub units: String,
    pub values: Vec<f64>,
}

#[derive(Default)]
struct MockInner {
    /// full path → WebID
    paths: HashMap<String, String>,
    /// WebID → stream data
    streams: HashMap<String, MockStream>,
    /// WebIDs whose sub-requests answer with a remote error.
    failing: HashSet<String>,
    lookups: Vec<String>,
    batches: Vec<Map<String, Value>>,
    authorization: Vec<Option<String>>,
}

/// Handle onto a running mock PI Web API: script it and inspect its calls.
#[derive(Clone, Default)]
pub struct MockPiWebApi {
    inner: Arc<Mutex<MockInner>>,
}

impl MockPiWebApi {
    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Make `full_path` resolve to `web_id`, serving `values` in `units`.
    pub fn register(&self, full_path: &str, web_id: &str, units: &str, values: &[f64]) {
        let name = full_path
            .rsplit(['|', '\\'])
            .next()
            .unwrap_or(full_path)
            .to_string();
        let mut inner = self.lock();
        inner.paths.insert(full_path.into(), web_id.into());
        inner.streams.insert(
            web_id.into(),
            MockStream {
                name,
                units: units.into(),
                values: values.to_vec(),
            },
        );
    }

    /// Answer every sub-request for `web_id` with a 400 and an error list.
    pub fn fail_stream(&self, web_id: &str) {
        self.lock().failing.insert(web_id.into());
    }

    /// Paths passed to the lookup endpoints, in arrival order.
    pub fn lookups(&self) -> Vec<String> {
        self.lock().lookups.clone()
    }

    /// Bodies received on `/batch`, in arrival order.
    pub fn batches(&self) -> Vec<Map<String, Value>> {
        self.lock().batches.clone()
    }

    /// `Authorization` header of every call, in arrival order.
    pub fn authorization(&self) -> Vec<Option<String>> {
        self.lock().authorization.clone()
    }

    fn record_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.lock().authorization.push(auth);
    }

    fn answer(&self, resource: &str) -> Value {
        let web_id = resource.rsplit("webid=").next().unwrap_or_default();
        let inner = self.lock();

        if inner.failing.contains(web_id) {
            return json!({
                "Status": 400,
                "Headers": {},
                "Content": { "Errors": [format!("stream {web_id} is unavailable")] }
            });
        }
        let Some(stream) = inner.streams.get(web_id) else {
            return json!({ "Status": 404, "Headers": {}, "Content": {} });
        };

        let items: Vec<Value> = stream
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                json!({
                    "Timestamp": format!("2024-01-01T00:{i:02}:00Z"),
                    "Value": v,
                    "UnitsAbbreviation": stream.units,
                    "Good": true,
                    "Questionable": false,
                    "Substituted": false,
                    "Annotated": false
                })
            })
            .collect();

        // Calculations answer with a flat item list; streamsets wrap each
        // stream with its WebID.
        let content = if resource.contains("/calculation/") {
            json!({ "Items": items, "UnitsAbbreviation": stream.units })
        } else {
            json!({ "Items": [{
                "WebId": web_id,
                "Name": stream.name,
                "Path": "",
                "UnitsAbbreviation": stream.units,
                "Items": items
            }]})
        };
        json!({ "Status": 200, "Headers": { "Content-Type": "application/json" }, "Content": content })
    }
}

#[derive(Deserialize)]
struct PathParam {
    path: String,
}

async fn lookup(
    State(mock): State<MockPiWebApi>,
    headers: HeaderMap,
    Query(p): Query<PathParam>,
) -> Result<Json<Value>, StatusCode> {
    mock.record_auth(&headers);
    let web_id = {
        let mut inner = mock.lock();
        inner.lookups.push(p.path.clone());
        inner.paths.get(&p.path).cloned()
    };
    match web_id {
        Some(web_id) => Ok(Json(json!({ "WebId": web_id, "Name": p.path, "Path": p.path }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn batch(
    State(mock): State<MockPiWebApi>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Json<Value> {
    mock.record_auth(&headers);
    mock.lock().batches.push(body.clone());
    let out: Map<String, Value> = body
        .iter()
        .map(|(k, sub)| {
            let resource = sub["Resource"].as_str().unwrap_or_default();
            (k.clone(), mock.answer(resource))
        })
        .collect();
    Json(Value::Object(out))
}

/// Start a mock PI Web API and return `(base_url, handle)`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_mock_piwebapi() -> (String, MockPiWebApi) {
    let mock = MockPiWebApi::default();
    let router = Router::new()
        .route("/points", get(lookup))
        .route("/attributes", get(lookup))
        .route("/elements", get(lookup))
        .route("/batch", post(batch))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("mock PI Web API error");
    });

    (format!("http://{addr}"), mock)
}

/// Start the datasource service against `config` and return
/// `(service_url, datasource)`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound or the HTTP client cannot be
/// built.
pub async fn spawn_service(config: DatasourceConfig) -> (String, Arc<Datasource>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let datasource = Arc::new(Datasource::new(config).expect("build datasource"));
    let router = build_router(Arc::clone(&datasource));
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("datasource service error");
    });

    (format!("http://{addr}"), datasource)
}

//! End-to-end conformance tests for the PI Web API datasource service.
//!
//! Each test spawns a scripted PI Web API and an in-process datasource
//! service (real TCP, real HTTP) via [`piweb_conformance`] and drives the
//! service with a `reqwest` client.
//!
//! # Coverage
//!
//! | Test | Behaviour |
//! |------|-----------|
//! | `attribute_target_yields_one_frame_per_leaf` | path expansion, frame order, units |
//! | `sub_requests_are_batched_by_position` | one `/batch` per RefID, `"0".."n"` keys |
//! | `pi_point_targets_use_points_lookup` | `\` joining, `/points` endpoint |
//! | `unresolvable_leaf_does_not_block_siblings` | resolution failure isolation |
//! | `remote_error_becomes_notice_and_error` | non-200 sub-response |
//! | `ref_ids_are_isolated` | one batch per RefID, invalid target scoped |
//! | `webids_are_cached_across_requests` | WebID cache |
//! | `streamable_query_gets_a_channel` | channel minting + lookup |
//! | `expression_is_never_streamed` | calculation URI, flat content |
//! | `summary_query_uri` | summary parameters |
//! | `credentials_are_sent_as_basic_auth` | static basic auth |
//! | `malformed_query_fails_only_its_ref_id` | per-query decoding, `null` fields |
//! | `malformed_request_returns_400` | request validation |
//! | `unknown_channel_returns_404` | channel lookup |

use piweb_api::{ChannelInfo, ErrorResponse, QueryDataResponse};
use piweb_conformance::{spawn_mock_piwebapi, spawn_service, MockPiWebApi};
use piweb_datasource::{config::Credentials, DatasourceConfig};
use piweb_query::{QueryError, Severity};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ELEMENT: &str = r"\\AF\DB\Pump";

fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Mock PI Web API with two attributes and one point, plus a service in
/// front of it.
async fn setup_with(configure: impl FnOnce(&mut DatasourceConfig)) -> (String, MockPiWebApi) {
    let (pi_url, mock) = spawn_mock_piwebapi().await;
    mock.register(&format!("{ELEMENT}|Pressure"), "F1AbPressure", "psi", &[10.0, 11.0, 12.0]);
    mock.register(&format!("{ELEMENT}|Temperature"), "F1AbTemp", "degC", &[50.0]);
    mock.register(r"\\PISRV\sinusoid", "F1DPsinusoid", "", &[0.5, 0.7]);

    let mut config = DatasourceConfig::new(&pi_url);
    config.datasource_uid = "pi-uid".into();
    configure(&mut config);
    let (service_url, _ds) = spawn_service(config).await;
    (service_url, mock)
}

async fn setup() -> (String, MockPiWebApi) {
    setup_with(|_| {}).await
}

fn query(ref_id: &str, pi: Value) -> Value {
    json!({
        "RefID": ref_id,
        "QueryType": "plot",
        "MaxDataPoints": 100,
        "Interval": 30_000_000_000u64,
        "TimeRange": { "From": "2024-01-01T00:00:00Z", "To": "2024-01-01T01:00:00Z" },
        "JSON": pi
    })
}

async fn run(service: &str, queries: Vec<Value>) -> QueryDataResponse {
    let resp = make_client()
        .post(format!("{service}/v1/query"))
        .json(&json!({ "queries": queries }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

fn resource(batch: &serde_json::Map<String, Value>, key: &str) -> String {
    batch[key]["Resource"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Query execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attribute_target_yields_one_frame_per_leaf() {
    let (service, _mock) = setup().await;
    let resp = run(
        &service,
        vec![query("A", json!({ "target": format!("{ELEMENT};Pressure;Temperature") }))],
    )
    .await;

    let a = resp.get("A").unwrap();
    assert!(a.errors.is_empty(), "{:?}", a.errors);
    assert_eq!(a.frames.len(), 2);

    assert_eq!(a.frames[0].name, "Pressure");
    assert_eq!(a.frames[0].ref_id, "A");
    assert_eq!(a.frames[0].units, "psi");
    let values: Vec<Value> = a.frames[0].values.iter().map(|v| v.value.clone()).collect();
    assert_eq!(values, vec![json!(10.0), json!(11.0), json!(12.0)]);
    assert_eq!(a.frames[0].values[0].timestamp, "2024-01-01T00:00:00Z");

    assert_eq!(a.frames[1].name, "Temperature");
    assert_eq!(a.frames[1].units, "degC");
    assert!(a.frames.iter().all(|f| f.meta.channel.is_none()));
}

#[tokio::test]
async fn sub_requests_are_batched_by_position() {
    let (service, mock) = setup().await;
    run(
        &service,
        vec![query("A", json!({ "target": format!("{ELEMENT};Pressure;Temperature") }))],
    )
    .await;

    let batches = mock.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    let mut keys: Vec<&String> = batch.keys().collect();
    keys.sort();
    assert_eq!(keys, ["0", "1"]);
    assert_eq!(batch["0"]["Method"], "GET");

    let first = resource(batch, "0");
    assert!(first.contains(
        "/streamsets/plot?startTime=2024-01-01T00:00:00Z&endTime=2024-01-01T01:00:00Z&intervals=100"
    ));
    assert!(first.ends_with("&webid=F1AbPressure"));
    assert!(resource(batch, "1").ends_with("&webid=F1AbTemp"));
}

#[tokio::test]
async fn pi_point_targets_use_points_lookup() {
    let (service, mock) = setup().await;
    let resp = run(
        &service,
        vec![query("A", json!({ "target": r"\\PISRV;sinusoid", "isPiPoint": true }))],
    )
    .await;

    assert_eq!(mock.lookups(), vec![r"\\PISRV\sinusoid".to_string()]);
    let a = resp.get("A").unwrap();
    assert_eq!(a.frames.len(), 1);
    assert_eq!(a.frames[0].name, "sinusoid");
    assert_eq!(a.frames[0].values.len(), 2);
}

#[tokio::test]
async fn unresolvable_leaf_does_not_block_siblings() {
    let (service, mock) = setup().await;
    let resp = run(
        &service,
        vec![query("A", json!({ "target": format!("{ELEMENT};Pressure;Flow;Temperature") }))],
    )
    .await;

    let a = resp.get("A").unwrap();
    let names: Vec<&str> = a.frames.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Pressure", "Flow", "Temperature"]);

    assert_eq!(a.frames[0].values.len(), 3);
    assert!(a.frames[1].values.is_empty());
    assert!(a.frames[1].has_errors());
    assert!(a.frames[1].meta.executed_query_string.is_empty());
    assert_eq!(a.frames[2].values.len(), 1);

    assert_eq!(a.errors.len(), 1);
    assert!(matches!(&a.errors[0], QueryError::Resolution(m) if m.contains("Flow")));

    // Only the two resolved leaves were submitted.
    assert_eq!(mock.batches()[0].len(), 2);
}

#[tokio::test]
async fn remote_error_becomes_notice_and_error() {
    let (service, mock) = setup().await;
    mock.fail_stream("F1AbTemp");

    let resp = run(
        &service,
        vec![query("A", json!({ "target": format!("{ELEMENT};Pressure;Temperature") }))],
    )
    .await;

    let a = resp.get("A").unwrap();
    assert_eq!(a.frames[0].values.len(), 3);
    assert!(a.frames[1].values.is_empty());
    let notice = &a.frames[1].meta.notices[0];
    assert_eq!(notice.severity, Severity::Error);
    assert!(notice.text.contains("stream F1AbTemp is unavailable"));
    assert_eq!(
        a.errors,
        vec![QueryError::RemoteApi("stream F1AbTemp is unavailable".into())]
    );
}

#[tokio::test]
async fn ref_ids_are_isolated() {
    let (service, mock) = setup().await;
    let resp = run(
        &service,
        vec![
            query("A", json!({ "target": format!("{ELEMENT};Pressure") })),
            query("B", json!({ "target": format!("{ELEMENT};Temperature") })),
            query("C", json!({ "target": "no separator here" })),
        ],
    )
    .await;

    assert_eq!(resp.responses.len(), 3);
    assert_eq!(resp.get("A").unwrap().frames[0].units, "psi");
    assert_eq!(resp.get("B").unwrap().frames[0].units, "degC");

    let c = resp.get("C").unwrap();
    assert!(c.frames.is_empty());
    assert!(matches!(c.errors.as_slice(), [QueryError::InvalidTarget(_)]));

    assert_eq!(mock.batches().len(), 2);
}

#[tokio::test]
async fn malformed_query_fails_only_its_ref_id() {
    let (service, _mock) = setup().await;
    let mut broken = query("B", json!({ "target": format!("{ELEMENT};Temperature") }));
    broken["TimeRange"] = json!("last hour");
    let resp = run(
        &service,
        vec![
            query(
                "A",
                json!({
                    "target": format!("{ELEMENT};Pressure"),
                    "segments": null,
                    "datasourceId": null,
                    "summary": { "types": null }
                }),
            ),
            broken,
        ],
    )
    .await;

    let a = resp.get("A").unwrap();
    assert!(a.errors.is_empty(), "{:?}", a.errors);
    assert_eq!(a.frames[0].values.len(), 3);

    let b = resp.get("B").unwrap();
    assert!(b.frames.is_empty());
    assert!(matches!(b.errors.as_slice(), [QueryError::InvalidQuery(_)]));
}

#[tokio::test]
async fn webids_are_cached_across_requests() {
    let (service, mock) = setup().await;
    let q = query("A", json!({ "target": format!("{ELEMENT};Pressure;Temperature") }));

    run(&service, vec![q.clone()]).await;
    run(&service, vec![q]).await;

    assert_eq!(mock.lookups().len(), 2);
    assert_eq!(mock.batches().len(), 2);
}

// ---------------------------------------------------------------------------
// Query modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expression_is_never_streamed() {
    let (service, mock) = setup().await;
    let resp = run(
        &service,
        vec![query(
            "A",
            json!({
                "target": format!("{ELEMENT};Pressure"),
                "expression": "'Pressure' * 2",
                "EnableStreaming": { "enable": true }
            }),
        )],
    )
    .await;

    let a = resp.get("A").unwrap();
    assert_eq!(a.frames[0].values.len(), 3);
    assert_eq!(a.frames[0].units, "psi");
    assert!(a.frames[0].meta.channel.is_none());

    let sub = resource(&mock.batches()[0], "0");
    assert!(sub.contains("/calculation/intervals?startTime="));
    assert!(sub.contains("&sampleInterval=30000ms"));
    assert!(sub.contains("&expression=%27Pressure%27%20%2A%202"));
}

#[tokio::test]
async fn summary_query_uri() {
    let (service, mock) = setup().await;
    run(
        &service,
        vec![query(
            "A",
            json!({
                "target": format!("{ELEMENT};Pressure"),
                "summary": {
                    "basis": "TimeWeighted",
                    "types": [
                        { "label": "Average", "value": { "value": "Average" } },
                        { "label": "Maximum", "value": { "value": "Maximum" } }
                    ]
                }
            }),
        )],
    )
    .await;

    let sub = resource(&mock.batches()[0], "0");
    assert!(sub.contains("/streamsets/summary?startTime="));
    assert!(sub.contains(
        "&intervals=100&summaryType=Average&summaryType=Maximum&summaryBasis=TimeWeighted&summaryDuration=30s&webid="
    ));
}

// ---------------------------------------------------------------------------
// Streaming channels
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streamable_query_gets_a_channel() {
    let (service, _mock) = setup().await;
    let resp = run(
        &service,
        vec![query(
            "A",
            json!({
                "target": format!("{ELEMENT};Pressure"),
                "EnableStreaming": { "enable": true }
            }),
        )],
    )
    .await;

    let channel = resp.get("A").unwrap().frames[0].meta.channel.clone().unwrap();
    let channel_id = channel.strip_prefix("ds/pi-uid/").unwrap();

    let resp = make_client()
        .get(format!("{service}/v1/channels/{channel_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let info: ChannelInfo = resp.json().await.unwrap();
    assert_eq!(info.channel_id, channel_id);
    assert_eq!(info.web_id, "F1AbPressure");
    assert_eq!(info.interval_nanos, 30_000_000_000);
}

#[tokio::test]
async fn unknown_channel_returns_404() {
    let (service, _mock) = setup().await;
    let resp = make_client()
        .get(format!("{service}/v1/channels/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.code, "not_found");
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn credentials_are_sent_as_basic_auth() {
    let (service, mock) = setup_with(|c| {
        c.credentials = Some(Credentials {
            username: "reader".into(),
            password: "hunter2".into(),
        });
    })
    .await;

    run(&service, vec![query("A", json!({ "target": format!("{ELEMENT};Pressure") }))]).await;

    let auth = mock.authorization();
    // One lookup, one batch.
    assert_eq!(auth.len(), 2);
    // base64("reader:hunter2")
    assert!(auth
        .iter()
        .all(|a| a.as_deref() == Some("Basic cmVhZGVyOmh1bnRlcjI=")));
}

#[tokio::test]
async fn malformed_request_returns_400() {
    let (service, _mock) = setup().await;
    let resp = make_client()
        .post(format!("{service}/v1/query"))
        .header("content-type", "application/json")
        .body(r#"{"queries": {"RefID": "A"}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.code, "invalid_json");
}

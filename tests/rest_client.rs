//! REST binding against an in-process HTTP server.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use busnet_admin::{Backend, Filter, RecordId, RestClient};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}/api", addr)
}

fn routes() -> Router {
    Router::new()
        .route(
            "/api/cities",
            get(|| async { Json(json!({"data": [{"id_city": 1, "name": "Acme"}], "error": null})) })
                .post(|Json(body): Json<Value>| async move {
                    let mut row = body;
                    row["id"] = json!(42);
                    (StatusCode::CREATED, Json(json!({"data": row})))
                }),
        )
        .route(
            "/api/cities/:id",
            delete(|Path(id): Path<String>| async move { Json(json!({"data": {"id": id}})) }),
        )
        .route(
            "/api/stations",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({"data": null, "error": "Not found"}))) }),
        )
        .route(
            "/api/trips",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let rows: Vec<Value> = q
                    .get("bus_id")
                    .map(|b| vec![json!({"id": 1, "bus_id": b})])
                    .unwrap_or_default();
                Json(json!({"data": rows}))
            }),
        )
        .route("/api/buses", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/api/tickets", get(|| async { "plain text" }))
        .route("/api/drivers", get(|| async { Json(json!({"data": {"id": 1}})) }))
        .route("/api/incidents", get(|| async { Json(json!([{"id": 1}])) }))
        .route("/api/health", get(|| async { Json(json!({"status": "healthy"})) }))
}

async fn client() -> RestClient {
    RestClient::new(serve(routes()).await, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn select_returns_rows_untouched() {
    let client = client().await;
    let env = client.select("cities", None).await;
    assert_eq!(env.error, None);
    assert_eq!(env.data, Some(vec![json!({"id_city": 1, "name": "Acme"})]));
}

#[tokio::test]
async fn table_name_is_lower_cased_in_path() {
    let client = client().await;
    let env = client.select("CITIES", None).await;
    assert_eq!(env.data.map(|d| d.len()), Some(1));
}

#[tokio::test]
async fn error_envelope_passes_through() {
    let client = client().await;
    let env = client.select("stations", None).await;
    assert_eq!(env.data, None);
    assert_eq!(env.error.as_deref(), Some("Not found"));
}

#[tokio::test]
async fn filter_becomes_query_parameter() {
    let client = client().await;
    let env = client.select("trips", Some(&Filter::eq("bus_id", 7))).await;
    assert_eq!(env.data, Some(vec![json!({"id": 1, "bus_id": "7"})]));
    let unfiltered = client.select("trips", None).await;
    assert_eq!(unfiltered.data, Some(vec![]));
}

#[tokio::test]
async fn status_without_json_body_reports_status() {
    let client = client().await;
    let env = client.select("buses", None).await;
    assert!(env.data.is_none());
    let message = env.error.expect("error");
    assert!(message.starts_with("Request failed (500"), "{}", message);
}

#[tokio::test]
async fn malformed_bodies_become_errors() {
    let client = client().await;
    assert!(client.select("tickets", None).await.is_err());
    assert!(client.select("drivers", None).await.is_err());
    assert!(client.select("incidents", None).await.is_err());
}

#[tokio::test]
async fn mutations_hit_record_paths() {
    let client = client().await;
    let created = client.insert("cities", &json!({"name": "Zenith"})).await;
    assert_eq!(created.data, Some(json!({"name": "Zenith", "id": 42})));

    let deleted = client.delete("cities", &RecordId::from(9)).await;
    assert_eq!(deleted.data, Some(json!({"id": "9"})));

    let missing = client.update("cities", &RecordId::from(9), &json!({"name": "X"})).await;
    // PUT is not routed: 405 without a JSON body.
    assert!(missing.is_err());
}

#[tokio::test]
async fn health_reads_status_field() {
    let client = client().await;
    let health = client.health().await;
    assert!(health.healthy);
    assert_eq!(health.error, None);
}

#[tokio::test]
async fn unreachable_server_is_an_error_envelope() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let client = RestClient::new(format!("http://{}/api", addr), Duration::from_secs(2)).expect("client");

    let env = client.select("cities", None).await;
    assert!(env.data.is_none());
    assert!(env.error.is_some());
    assert!(!client.health().await.healthy);
}

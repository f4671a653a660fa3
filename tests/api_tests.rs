//! Router-level integration tests: validation, CRUD round trips, and error
//! mapping, driven through the axum router with tower's oneshot.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use limsd::api::{create_router, AppState};
use limsd::store::MemoryStore;

fn test_router() -> axum::Router {
    let store = Arc::new(MemoryStore::new());
    create_router(Arc::new(AppState::new(store)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Create Paths
// =============================================================================

#[tokio::test]
async fn create_job_returns_allocated_identifier() {
    let router = test_router();

    let response = router
        .oneshot(json_request(
            "POST",
            "/jobs",
            json!({"client": "Acme", "material": "S355"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let doc = body_json(response).await;

    let identifier = doc["identifier"].as_str().unwrap();
    assert!(identifier.starts_with("MTL-"), "got {identifier}");
    assert!(identifier.ends_with("-0001"), "got {identifier}");
    assert_eq!(doc["body"]["client"], "Acme");

    // Timestamps serialize as ISO-8601.
    let created_at = doc["created_at"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
}

#[tokio::test]
async fn create_prep_request_uses_three_digit_padding() {
    let router = test_router();

    let response = router
        .oneshot(json_request(
            "POST",
            "/prep-requests",
            json!({"job_id": "MTL-2025-0001", "requested_by": "jsmith"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let doc = body_json(response).await;
    let identifier = doc["identifier"].as_str().unwrap();
    assert!(identifier.starts_with("REQ-"), "got {identifier}");
    assert!(identifier.ends_with("-001"), "got {identifier}");
}

#[tokio::test]
async fn sequential_creates_increment_the_sequence() {
    let router = test_router();

    for expected in ["-0001", "-0002", "-0003"] {
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/jobs",
                json!({"client": "Acme", "material": "S355"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let doc = body_json(response).await;
        assert!(doc["identifier"].as_str().unwrap().ends_with(expected));
    }
}

#[tokio::test]
async fn invalid_payload_is_rejected_before_allocation() {
    let router = test_router();

    // Missing required field.
    let response = router
        .clone()
        .oneshot(json_request("POST", "/jobs", json!({"client": "Acme"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "BAD_REQUEST");

    // Caller-supplied identifier field.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/jobs",
            json!({"client": "Acme", "material": "S355", "job_id": "MTL-2025-9999"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A failed validation must not burn a sequence number.
    let response = router
        .oneshot(json_request(
            "POST",
            "/jobs",
            json!({"client": "Acme", "material": "S355"}),
        ))
        .await
        .unwrap();
    let doc = body_json(response).await;
    assert!(doc["identifier"].as_str().unwrap().ends_with("-0001"));
}

#[tokio::test]
async fn duplicate_natural_key_maps_to_conflict() {
    let router = test_router();
    let client = json!({"code": "ACME", "name": "Acme Labs"});

    let response = router
        .clone()
        .oneshot(json_request("POST", "/clients", client.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(json_request("POST", "/clients", client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error = body_json(response).await;
    assert_eq!(error["code"], "DUPLICATE_IDENTIFIER");
}

/// A natural key with surrounding whitespace is refused outright: accepting
/// it would store an identifier that disagrees with the body field and make
/// the document unfetchable by its own key.
#[tokio::test]
async fn untrimmed_natural_key_is_rejected() {
    let router = test_router();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            json!({"code": " ACME ", "name": "Acme"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "BAD_REQUEST");

    // Nothing was stored under either spelling.
    for uri in ["/clients/ACME", "/clients/%20ACME%20"] {
        let response = router.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let router = test_router();

    let response = router
        .oneshot(json_request("POST", "/samples", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = body_json(response).await;
    assert_eq!(error["code"], "UNKNOWN_COLLECTION");
}

// =============================================================================
// Read, Update, Delete
// =============================================================================

#[tokio::test]
async fn get_round_trips_a_created_document() {
    let router = test_router();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/equipment",
            json!({"serial_no": "TM-500-01", "name": "Tensile machine"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(get_request("/equipment/TM-500-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["identifier"], "TM-500-01");
    assert_eq!(doc["body"]["name"], "Tensile machine");

    let response = router
        .oneshot(get_request("/equipment/TM-999-99"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_replaces_body_and_keeps_identifier() {
    let router = test_router();

    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            json!({"code": "ACME", "name": "Acme"}),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/clients/ACME",
            json!({"code": "ACME", "name": "Acme Laboratories"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["identifier"], "ACME");
    assert_eq!(doc["body"]["name"], "Acme Laboratories");

    // Renaming the natural key through an update is refused.
    let response = router
        .oneshot(json_request(
            "PUT",
            "/clients/ACME",
            json!({"code": "OTHER", "name": "Acme"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_document_once() {
    let router = test_router();

    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/welder-certificates",
            json!({"certificate_no": "WC-77", "welder_name": "R. Diaz", "process": "GTAW"}),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/welder-certificates/WC-77")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/welder-certificates/WC-77")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_paginates_in_identifier_order() {
    let router = test_router();

    for i in 0..5 {
        router
            .clone()
            .oneshot(json_request(
                "POST",
                "/jobs",
                json!({"client": format!("client-{i}"), "material": "S355"}),
            ))
            .await
            .unwrap();
    }

    let response = router
        .clone()
        .oneshot(get_request("/jobs?limit=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["has_more"], true);
    let ids: Vec<&str> = page["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["identifier"].as_str().unwrap())
        .collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "listing must be identifier-ordered");

    let response = router
        .oneshot(get_request("/jobs?limit=3&offset=3"))
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page["count"], 2);
    assert_eq!(page["has_more"], false);
}

/// A maximal limit must not overflow the look-ahead fetch; the full
/// collection comes back with nothing left over.
#[tokio::test]
async fn list_handles_maximal_limit() {
    let router = test_router();

    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/jobs",
            json!({"client": "Acme", "material": "S355"}),
        ))
        .await
        .unwrap();

    let uri = format!("/jobs?limit={}", usize::MAX);
    let response = router.oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["has_more"], false);
}

// =============================================================================
// Observability Endpoints
// =============================================================================

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let router = test_router();

    let response = router.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn stats_reflect_handled_requests() {
    let router = test_router();

    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/jobs",
            json!({"client": "Acme", "material": "S355"}),
        ))
        .await
        .unwrap();

    let response = router.oneshot(get_request("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["creates"]["total"], 1);
    assert!(stats["uptime_secs"].as_f64().unwrap() >= 0.0);
}

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use availability_cell::router::{availability_routes, specialty_routes};
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn bearer(user: &TestUser, config: &AppConfig) -> String {
    format!("Bearer {}", JwtTestUtils::create_test_token(user, &config.supabase_jwt_secret, Some(1)))
}

fn app(config: &AppConfig) -> Router {
    availability_routes(Arc::new(config.clone()))
}

async fn mount_specialty(server: &MockServer, id: i64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/specialties"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::specialty_row(id, "Cardiología")
        ])))
        .mount(server)
        .await;
}

fn create_body(specialist_id: Uuid, start: &str, end: &str) -> Body {
    Body::from(
        json!({
            "specialist_id": specialist_id,
            "specialty_id": 3,
            "weekday": 1,
            "start_time": start,
            "end_time": end,
            "slot_duration_minutes": 30
        })
        .to_string(),
    )
}

#[tokio::test]
async fn specialist_creates_rule() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");

    mount_specialty(&server, 3).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("weekday", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_rule_row(9, specialist.id, 3, 1, "14:00:00", "18:00:00", 30)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_rules"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::availability_rule_row(10, specialist.id, 3, 1, "09:00:00", "12:00:00", 30)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/rules")
        .header("authorization", bearer(&specialist, &config))
        .header("content-type", "application/json")
        .body(create_body(specialist.id, "09:00:00", "12:00:00"))
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn overlapping_rule_is_a_conflict() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");

    mount_specialty(&server, 3).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_rule_row(9, specialist.id, 3, 1, "08:00:00", "10:00:00", 30)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_rules"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/rules")
        .header("authorization", bearer(&specialist, &config))
        .header("content-type", "application/json")
        .body(create_body(specialist.id, "09:00:00", "12:00:00"))
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn inverted_interval_is_rejected_before_any_store_call() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");

    let request = Request::builder()
        .method("POST")
        .uri("/rules")
        .header("authorization", bearer(&specialist, &config))
        .header("content-type", "application/json")
        .body(create_body(specialist.id, "12:00:00", "09:00:00"))
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn patient_cannot_create_rules() {
    let config = TestConfig::default().to_app_config();
    let patient = TestUser::patient("patient@example.com");

    let request = Request::builder()
        .method("POST")
        .uri("/rules")
        .header("authorization", bearer(&patient, &config))
        .header("content-type", "application/json")
        .body(create_body(patient.id, "09:00:00", "12:00:00"))
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_unknown_rule_is_not_found() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/rules/42")
        .header("authorization", bearer(&specialist, &config))
        .body(Body::empty())
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_deletes_rule() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");
    let row = MockSupabaseResponses::availability_rule_row(42, specialist.id, 3, 2, "09:00:00", "12:00:00", 20);

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row.clone()])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/rules/42")
        .header("authorization", bearer(&specialist, &config))
        .body(Body::empty())
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn duplicate_specialty_name_is_a_conflict() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let admin = TestUser::admin("admin@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialties"))
        .and(query_param("name", "eq.Pediatría"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::specialty_row(5, "Pediatría")
        ])))
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", bearer(&admin, &config))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "  Pediatría " }).to_string()))
        .unwrap();

    let response = specialty_routes(Arc::new(config.clone())).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

async fn mount_rule(server: &MockServer, row: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

fn update_request(user: &TestUser, config: &AppConfig, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/rules/42")
        .header("authorization", bearer(user, config))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn moving_a_rule_ignores_its_own_interval() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");
    let row = MockSupabaseResponses::availability_rule_row(42, specialist.id, 3, 1, "09:00:00", "12:00:00", 30);

    mount_rule(&server, row.clone()).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("specialist_id", format!("eq.{}", specialist.id)))
        .and(query_param("weekday", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_rule_row(42, specialist.id, 3, 1, "10:00:00", "12:00:00", 30)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = update_request(&specialist, &config, json!({ "start_time": "10:00:00" }));
    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["start_time"], "10:00:00");

    let requests = server.received_requests().await.unwrap();
    let patch = requests.iter().find(|r| r.method.as_str() == "PATCH").unwrap();
    let sent: Value = serde_json::from_slice(&patch.body).unwrap();
    assert_eq!(sent, json!({ "start_time": "10:00:00" }));
}

#[tokio::test]
async fn moving_a_rule_onto_another_is_a_conflict() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");
    let row = MockSupabaseResponses::availability_rule_row(42, specialist.id, 3, 1, "09:00:00", "12:00:00", 30);

    mount_rule(&server, row.clone()).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("weekday", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row,
            MockSupabaseResponses::availability_rule_row(43, specialist.id, 3, 1, "14:00:00", "18:00:00", 30)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = update_request(&specialist, &config, json!({ "end_time": "15:00:00" }));
    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn rule_removed_during_update_is_not_found() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");

    mount_rule(
        &server,
        MockSupabaseResponses::availability_rule_row(42, specialist.id, 3, 1, "09:00:00", "12:00:00", 30),
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let request = update_request(&specialist, &config, json!({ "active": false }));
    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rules_are_listed_by_weekday_then_start() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("specialist_id", format!("eq.{}", specialist.id)))
        .and(query_param("order", "weekday.asc,start_time.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_rule_row(7, specialist.id, 3, 1, "09:00:00", "12:00:00", 30),
            MockSupabaseResponses::availability_rule_row(4, specialist.id, 3, 1, "14:00:00", "18:00:00", 30),
            MockSupabaseResponses::availability_rule_row(2, specialist.id, 3, 3, "08:00:00", "10:00:00", 20),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/specialists/{}/rules", specialist.id))
        .header("authorization", bearer(&specialist, &config))
        .body(Body::empty())
        .unwrap();

    let response = app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["total"], 3);
    let ids: Vec<i64> = body["rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|rule| rule["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![7, 4, 2]);
}

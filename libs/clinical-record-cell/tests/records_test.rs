use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinical_record_cell::router::clinical_record_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn send(config: &AppConfig, user: &TestUser, method_name: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let token = JwtTestUtils::create_test_token(user, &config.supabase_jwt_secret, Some(1));
    let request = Request::builder()
        .method(method_name)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = clinical_record_routes(Arc::new(config.clone())).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn specialist_records_vitals_for_completed_visit() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");
    let patient = TestUser::patient("ana@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(5, patient.id, specialist.id, "2030-01-07", "09:00:00", "completed")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/clinical_records"))
        .and(body_partial_json(json!({
            "patient_id": patient.id,
            "specialist_id": specialist.id,
            "appointment_id": 5,
            "blood_pressure": "120/80",
            "additional_data": [{ "key": "glucose", "value": "95" }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::clinical_record_row(1, patient.id, specialist.id, Some(5))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let body = json!({
        "patient_id": patient.id,
        "appointment_id": 5,
        "height_cm": 170.0,
        "weight_kg": 70.5,
        "temperature_c": 36.6,
        "systolic": 120,
        "diastolic": 80,
        "additional_data": [
            { "key": "glucose", "value": "95" },
            { "key": "", "value": "ignored" }
        ]
    });

    let (status, json) = send(&config, &specialist, "POST", "/", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["blood_pressure"], "120/80");
}

#[tokio::test]
async fn out_of_range_temperature_is_rejected() {
    let config = TestConfig::default().to_app_config();
    let specialist = TestUser::specialist("doc@example.com");

    let body = json!({ "patient_id": Uuid::new_v4(), "temperature_c": 47.0 });
    let (status, json) = send(&config, &specialist, "POST", "/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Temperature"));
}

#[tokio::test]
async fn record_for_pending_visit_is_rejected() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");
    let patient = TestUser::patient("ana@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(5, patient.id, specialist.id, "2030-01-07", "09:00:00", "accepted")
        ])))
        .mount(&server)
        .await;

    let body = json!({ "patient_id": patient.id, "appointment_id": 5, "weight_kg": 70.0 });
    let (status, _) = send(&config, &specialist, "POST", "/", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patients_cannot_write_records() {
    let config = TestConfig::default().to_app_config();
    let patient = TestUser::patient("ana@example.com");

    let body = json!({ "patient_id": patient.id, "weight_kg": 70.0 });
    let (status, _) = send(&config, &patient, "POST", "/", Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn patient_reads_own_history_newest_first() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let patient = TestUser::patient("ana@example.com");
    let specialist_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinical_records"))
        .and(query_param("patient_id", format!("eq.{}", patient.id)))
        .and(query_param("order", "recorded_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinical_record_row(2, patient.id, specialist_id, None),
            MockSupabaseResponses::clinical_record_row(1, patient.id, specialist_id, Some(5)),
        ])))
        .mount(&server)
        .await;

    let (status, json) = send(&config, &patient, "GET", &format!("/patients/{}", patient.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["records"][0]["id"], 2);
}

#[tokio::test]
async fn patient_cannot_read_someone_elses_history() {
    let config = TestConfig::default().to_app_config();
    let patient = TestUser::patient("ana@example.com");

    let (status, _) = send(&config, &patient, "GET", &format!("/patients/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn specialty_filter_uses_completed_appointments() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("doc@example.com");
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("status", "eq.completed"))
        .and(query_param("specialty_id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(5, patient_id, specialist.id, "2030-01-07", "09:00:00", "completed"),
            MockSupabaseResponses::appointment_row(9, patient_id, specialist.id, "2030-01-14", "09:00:00", "completed"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinical_records"))
        .and(query_param("appointment_id", "in.(5,9)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinical_record_row(3, patient_id, specialist.id, Some(9))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, json) = send(
        &config,
        &specialist,
        "GET",
        &format!("/patients/{}?specialty_id=4", patient_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
}

#[tokio::test]
async fn specialty_without_visits_returns_nothing() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let admin = TestUser::admin("admin@example.com");
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (status, json) = send(
        &config,
        &admin,
        "GET",
        &format!("/patients/{}?specialty_id=4", patient_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 0);
}

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn get(config: &AppConfig, user: &TestUser, uri: &str) -> (StatusCode, Value) {
    let token = JwtTestUtils::create_test_token(user, &config.supabase_jwt_secret, Some(1));
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = appointment_routes(Arc::new(config.clone())).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn mount_directory(server: &MockServer, profiles: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profiles))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/specialties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::specialty_row(1, "Cardiología")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn patient_listing_is_assembled_with_names() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let patient = TestUser::patient("ana@example.com");
    let specialist = TestUser::specialist("laura@example.com");
    let unknown_specialist = TestUser::specialist("ghost@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient.id)))
        .and(query_param("order", "date.desc,time.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(2, patient.id, specialist.id, "2030-01-14", "10:00:00", "accepted"),
            MockSupabaseResponses::appointment_row(1, patient.id, unknown_specialist.id, "2030-01-07", "09:00:00", "completed"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    mount_directory(
        &server,
        json!([
            MockSupabaseResponses::profile_row(patient.id, "Ana", "Pérez", "paciente"),
            MockSupabaseResponses::profile_row(specialist.id, "Laura", "Gómez", "especialista"),
        ]),
    )
    .await;

    let (status, body) = get(&config, &patient, "/mine").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let first = &body["appointments"][0];
    assert_eq!(first["id"], 2);
    assert_eq!(first["patient_name"], "Ana Pérez");
    assert_eq!(first["specialist_name"], "Laura Gómez");
    assert_eq!(first["specialty_name"], "Cardiología");

    let second = &body["appointments"][1];
    assert_eq!(second["specialist_name"], "N/A");
    assert!(second["specialist"].is_null());
}

#[tokio::test]
async fn text_filter_narrows_listing() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("laura@example.com");
    let ana = TestUser::patient("ana@example.com");
    let bruno = TestUser::patient("bruno@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("specialist_id", format!("eq.{}", specialist.id)))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(3, ana.id, specialist.id, "2030-01-07", "09:30:00", "pending"),
            MockSupabaseResponses::appointment_row(4, bruno.id, specialist.id, "2030-01-07", "09:00:00", "pending"),
        ])))
        .mount(&server)
        .await;

    mount_directory(
        &server,
        json!([
            MockSupabaseResponses::profile_row(ana.id, "Ana", "Pérez", "paciente"),
            MockSupabaseResponses::profile_row(bruno.id, "Bruno", "Díaz", "paciente"),
            MockSupabaseResponses::profile_row(specialist.id, "Laura", "Gómez", "especialista"),
        ]),
    )
    .await;

    let (status, body) = get(&config, &specialist, "/mine?status=pending&q=bruno").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["appointments"][0]["id"], 4);
}

#[tokio::test]
async fn full_listing_is_admin_only() {
    let config = TestConfig::default().to_app_config();
    let specialist = TestUser::specialist("laura@example.com");

    let (status, _) = get(&config, &specialist, "/").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn specialist_statistics() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("laura@example.com");
    let patient = TestUser::patient("ana@example.com");

    let mut rated_high = MockSupabaseResponses::appointment_row(1, patient.id, specialist.id, "2030-01-07", "09:00:00", "completed");
    rated_high["rating"] = json!(5);
    let mut rated_low = MockSupabaseResponses::appointment_row(2, patient.id, specialist.id, "2030-01-08", "09:00:00", "completed");
    rated_low["rating"] = json!(2);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("specialist_id", format!("eq.{}", specialist.id)))
        .and(query_param("date", "gte.2030-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            rated_high,
            rated_low,
            MockSupabaseResponses::appointment_row(3, patient.id, specialist.id, "2030-01-09", "09:00:00", "cancelled"),
            MockSupabaseResponses::appointment_row(4, patient.id, specialist.id, "2030-01-10", "09:00:00", "pending"),
        ])))
        .mount(&server)
        .await;

    let (status, body) = get(&config, &specialist, "/stats?from=2030-01-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["completed"], 2);
    assert_eq!(body["cancelled"], 1);
    assert_eq!(body["pending"], 1);
    assert_eq!(body["average_rating"], 3.5);
}

#[tokio::test]
async fn patients_cannot_read_statistics() {
    let config = TestConfig::default().to_app_config();
    let patient = TestUser::patient("ana@example.com");

    let (status, _) = get(&config, &patient, "/stats").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn patients_attended_by_specialist() {
    let server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&server.uri());
    let specialist = TestUser::specialist("laura@example.com");
    let ana = TestUser::patient("ana@example.com");

    let rows: Vec<Value> = (1..=4)
        .rev()
        .map(|day| {
            MockSupabaseResponses::appointment_row(
                day,
                ana.id,
                specialist.id,
                &format!("2030-01-0{}", day),
                "09:00:00",
                "completed",
            )
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("specialist_id", format!("eq.{}", specialist.id)))
        .and(query_param("status", "eq.completed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(rows)))
        .mount(&server)
        .await;

    mount_directory(
        &server,
        json!([MockSupabaseResponses::profile_row(ana.id, "Ana", "Pérez", "paciente")]),
    )
    .await;

    let (status, body) = get(&config, &specialist, "/patients-attended").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let visits = body["patients"][0]["visits"].as_array().unwrap();
    assert_eq!(visits.len(), 3);
    assert_eq!(visits[0]["date"], "2030-01-04");
    assert_eq!(visits[0]["specialty_name"], "Cardiología");
}

use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, SessionContext};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            port: 0,
        }
    }

    /// Config pointing the Supabase client at a mock server.
    pub fn with_supabase_url(url: &str) -> AppConfig {
        let mut config = Self::default().to_app_config();
        config.supabase_url = url.to_string();
        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", Role::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn specialist(email: &str) -> Self {
        Self::new(email, Role::Specialist)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn session(&self) -> SessionContext {
        SessionContext::new(self.id, self.role, "test-token")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role.to_string(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Row shapes as PostgREST returns them for the clinic tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn availability_rule_row(
        id: i64,
        specialist_id: Uuid,
        specialty_id: i64,
        weekday: u8,
        start: &str,
        end: &str,
        slot_minutes: u32,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "specialist_id": specialist_id,
            "specialty_id": specialty_id,
            "weekday": weekday,
            "start_time": start,
            "end_time": end,
            "slot_duration_minutes": slot_minutes,
            "active": true
        })
    }

    pub fn appointment_row(
        id: i64,
        patient_id: Uuid,
        specialist_id: Uuid,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "specialist_id": specialist_id,
            "specialty_id": 1,
            "date": date,
            "time": time,
            "duration_minutes": 30,
            "status": status,
            "cancellation_reason": null,
            "cancelled_by": null,
            "cancelled_by_role": null,
            "cancelled_at": null,
            "rejection_reason": null,
            "rejected_at": null,
            "specialist_note": null,
            "completed_at": null,
            "rating": null,
            "rating_comment": null,
            "survey_completed": false,
            "survey_answers": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn profile_row(id: Uuid, first_name: &str, last_name: &str, role: &str) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": last_name,
            "role": role,
            "national_id": "30111222",
            "health_insurance": null,
            "profile_image_url": null
        })
    }

    pub fn specialty_row(id: i64, name: &str) -> serde_json::Value {
        json!({ "id": id, "name": name })
    }

    pub fn clinical_record_row(
        id: i64,
        patient_id: Uuid,
        specialist_id: Uuid,
        appointment_id: Option<i64>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "specialist_id": specialist_id,
            "appointment_id": appointment_id,
            "recorded_at": "2024-01-01T10:00:00Z",
            "height_cm": 170.0,
            "weight_kg": 70.5,
            "temperature_c": 36.6,
            "blood_pressure": "120/80",
            "additional_data": [{ "key": "glucose", "value": "95" }]
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

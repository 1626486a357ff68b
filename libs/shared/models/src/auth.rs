use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Clinic roles. Spanish aliases match the role names stored in `profiles`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "paciente")]
    Patient,
    #[serde(alias = "especialista")]
    Specialist,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "patient" | "paciente" => Some(Role::Patient),
            "specialist" | "especialista" => Some(Role::Specialist),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Specialist => write!(f, "specialist"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Identity of the caller for a single request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub role: Role,
    pub auth_token: String,
}

impl SessionContext {
    pub fn new(user_id: Uuid, role: Role, auth_token: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            auth_token: auth_token.into(),
        }
    }

    /// Builds the context from a validated token. The clinic role is read from
    /// the `role` claim first and then from `user_metadata.role`, since
    /// GoTrue puts `authenticated` in the top-level claim.
    pub fn from_user(user: &User, auth_token: &str) -> Result<Self, AppError> {
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

        let role = user
            .role
            .as_deref()
            .and_then(Role::parse)
            .or_else(|| {
                user.metadata
                    .as_ref()
                    .and_then(|meta| meta.get("role"))
                    .and_then(|role| role.as_str())
                    .and_then(Role::parse)
            })
            .ok_or_else(|| AppError::Forbidden("User has no clinic role".to_string()))?;

        Ok(Self::new(user_id, role, auth_token))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

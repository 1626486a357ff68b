use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};

use headers::{authorization::Bearer, Authorization, HeaderMapExt};

use shared_config::AppConfig;
use shared_models::auth::SessionContext;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Validates the bearer token and stores the caller's [`SessionContext`] in
/// the request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Missing or invalid bearer token".to_string()))?
        .token()
        .to_string();

    let user = validate_token(&token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    let session = SessionContext::from_user(&user, &token)?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Handler argument carrying the session placed by [`auth_middleware`].
pub struct Session(pub SessionContext);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .map(Session)
            .ok_or_else(|| AppError::Auth("Session not found in request extensions".to_string()))
    }
}

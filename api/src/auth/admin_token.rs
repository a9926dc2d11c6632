//! Admin bearer-token authentication middleware

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use sha2::{Digest, Sha256};

use crate::domain::entities::UserId;
use crate::error::AppError;
use crate::AppState;

/// The authenticated admin acting on a request.
///
/// Every lifecycle transition is attributed to this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reviewer(pub UserId);

/// Hash an admin token for comparison against configured hashes
pub fn hash_admin_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the bearer token from the Authorization header
fn extract_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Authentication middleware
///
/// Validates the bearer token and injects the `Reviewer` into request extensions.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request).ok_or(AppError::Unauthorized)?;

    let admin_id = state
        .config
        .admin_for_token_hash(&hash_admin_token(token))
        .ok_or_else(|| {
            tracing::warn!("Rejected request with unknown admin token");
            AppError::Unauthorized
        })?;

    request.extensions_mut().insert(Reviewer(admin_id));

    Ok(next.run(request).await)
}

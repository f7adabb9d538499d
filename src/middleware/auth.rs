use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Identity attached to a request once the gate has let it through
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Auth gate for protected routes.
///
/// Every failure (missing header, bad signature, expired token, unknown user,
/// repository error) collapses into the same `AppError::Unauthorized`, and the
/// wrapped handler never runs.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).map(str::to_owned);
    let current_user = authenticate(&state, token).await?;

    debug!(user_id = %current_user.id, "🔐 Request authenticated");

    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, token: Option<String>) -> Result<CurrentUser, AppError> {
    let token = token.ok_or_else(|| {
        warn!("Missing or malformed Authorization header");
        AppError::Unauthorized
    })?;

    let claims = state.tokens.verify(&token).map_err(|e| {
        warn!(error = %e, "JWT validation failed");
        AppError::Unauthorized
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        warn!(sub = %claims.sub, "Invalid user id in JWT sub field");
        AppError::Unauthorized
    })?;

    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => Ok(CurrentUser {
            id: user.id,
            email: user.email,
            name: user.name,
        }),
        Ok(None) => {
            warn!(user_id = %user_id, "Token refers to a user that no longer exists");
            Err(AppError::Unauthorized)
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "User lookup failed during authentication");
            Err(AppError::Unauthorized)
        }
    }
}

/// Handlers behind the gate take `CurrentUser` as an argument.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::middleware::CurrentUser;
use crate::models::{
    normalize_email, AuthResponse, LoginRequest, NewUser, RegisterRequest, UpdateProfileRequest,
    User, UserProfile,
};
use crate::routes::{Access, RouteTable};
use crate::state::AppState;

pub fn route_table() -> RouteTable {
    RouteTable::new("/api/auth")
        .post("/register", Access::Public, register)
        .post("/login", Access::Public, login)
        .get("/me", Access::Protected, get_me)
        .put("/me", Access::Protected, update_me)
}

fn auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = state
        .tokens
        .issue(user.id, &user.email)
        .map_err(|e| AppError::internal(e.to_string()))?;

    Ok(AuthResponse {
        token,
        user: UserProfile::from(user),
    })
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let request_id = Uuid::new_v4();
    let email = normalize_email(&req.email);

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("name: Name is required"));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(request_id = %request_id, "Registration attempted with an existing email");
        return Err(AppError::conflict("User already exists"));
    }

    let password_hash = state.passwords.hash(&req.password).await?;

    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            business_name: trimmed(req.business_name),
            address: trimmed(req.address),
            phone: trimmed(req.phone),
        })
        .await?;

    info!(request_id = %request_id, user_id = %user.id, "✅ User registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, &user)?)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let request_id = Uuid::new_v4();
    let email = normalize_email(&req.email);

    let user = match state.users.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            warn!(request_id = %request_id, "Login failed: unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !state.passwords.verify(&req.password, &user.password_hash).await? {
        warn!(request_id = %request_id, user_id = %user.id, "Login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    info!(request_id = %request_id, user_id = %user.id, "🔑 User logged in");

    Ok(Json(auth_response(&state, &user)?))
}

/// GET /api/auth/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .users
        .find_by_id(current_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(UserProfile::from(&user)))
}

/// PUT /api/auth/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    if req.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::validation("name: Name cannot be empty"));
    }

    let user = state
        .users
        .update_profile(current_user.id, req.into())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    info!(user_id = %user.id, "👤 Profile updated");

    Ok(Json(UserProfile::from(&user)))
}

use axum::{extract::State, http::StatusCode, Json};
use bookit_core::{
    errors::BookError,
    models::{
        response::ApiResponse,
        user::{AuthResponse, LoginRequest, RegisterRequest, User, UserRole, UserSummary},
    },
};
use bookit_db::repositories::user as user_repo;
use std::sync::Arc;

use crate::{
    extract::ValidatedJson,
    middleware::{
        auth::{self, AuthUser},
        error_handling::AppError,
    },
    ApiState,
};

/// Emails are matched case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_taken() -> BookError {
    BookError::Conflict("Email is already registered".to_string())
}

/// A concurrent registration of the same email loses on the unique index.
pub fn registration_error(err: eyre::Report) -> AppError {
    if bookit_db::is_unique_violation(&err) {
        email_taken().into()
    } else {
        err.into()
    }
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn register(
    State(state): State<Arc<ApiState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    let email = normalize_email(&payload.email);

    if user_repo::get_user_by_email(&state.db_pool, &email).await?.is_some() {
        return Err(email_taken().into());
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let row = user_repo::create_user(
        &state.db_pool,
        &email,
        &password_hash,
        payload.name.trim(),
        payload.phone.as_deref(),
        UserRole::Client.as_str(),
    )
    .await
    .map_err(registration_error)?;
    let user = User::try_from(row)?;

    tracing::info!("Registered user {}", user.id);
    let token = state.tokens.issue(&user)?;
    let body = AuthResponse {
        user: UserSummary::from(&user),
        token,
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(body).with_message("User registered successfully")),
    ))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let invalid = || BookError::Authentication("Invalid credentials".to_string());

    let row = user_repo::get_user_by_email(&state.db_pool, &normalize_email(&payload.email))
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&payload.password, &row.password_hash)? {
        return Err(invalid().into());
    }

    let user = User::try_from(row)?;
    let token = state.tokens.issue(&user)?;
    let body = AuthResponse {
        user: UserSummary::from(&user),
        token,
    };

    Ok(Json(ApiResponse::ok(body).with_message("Login successful")))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn me(caller: AuthUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::ok(caller.0))
}

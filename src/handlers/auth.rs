//! Registration, login and profile handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::types::JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthUser, ROLE_CUSTOMER};
use crate::error::ApiError;
use crate::http::Envelope;
use crate::models::user::{User, UserSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<JsonValue>,
}

#[derive(Serialize)]
pub struct TokenBody {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Serialize)]
pub struct UserBody {
    pub user: User,
}

pub async fn register(
    State(s): State<AppState>,
    Json(r): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<TokenBody>>), ApiError> {
    r.validate()?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&r.email)
        .fetch_one(&s.db)
        .await?;
    if exists > 0 {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&r.password)?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&r.email)
    .bind(&password_hash)
    .bind(ROLE_CUSTOMER)
    .fetch_one(&s.db)
    .await?;

    let token = s.auth.issue(user.id, &user.role)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "User registered successfully",
            TokenBody { token, user: UserSummary::from(&user) },
        )),
    ))
}

pub async fn login(
    State(s): State<AppState>,
    Json(r): Json<LoginRequest>,
) -> Result<Json<Envelope<TokenBody>>, ApiError> {
    r.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&r.email)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&r.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let token = s.auth.issue(user.id, &user.role)?;
    Ok(Json(Envelope::with_message(
        "Logged in successfully",
        TokenBody { token, user: UserSummary::from(&user) },
    )))
}

pub async fn get_profile(
    State(s): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<UserBody>>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(Envelope::ok(UserBody { user })))
}

pub async fn update_profile(
    State(s): State<AppState>,
    auth: AuthUser,
    Json(r): Json<UpdateProfileRequest>,
) -> Result<Json<Envelope<UserBody>>, ApiError> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
         address = COALESCE($4, address), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(auth.id)
    .bind(&r.name)
    .bind(&r.phone)
    .bind(&r.address)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(Envelope::with_message("Profile updated successfully", UserBody { user })))
}

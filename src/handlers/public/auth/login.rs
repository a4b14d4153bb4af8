// handlers/public/auth/login.rs - POST /api/auth/login handler

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::database::models::User;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::json::Json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::UserService;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: u64,
    pub user: User,
}

/// POST /api/auth/login - Authenticate and receive a JWT
///
/// Expected Input:
/// ```json
/// { "username": "pkm_cibadak", "password": "..." }
/// ```
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_in": 86400,
///     "user": { "id": "...", "username": "pkm_cibadak", "role": "puskesmas", ... }
///   }
/// }
/// ```
///
/// Wrong credentials and inactive accounts both answer 401.
pub async fn login_post(Json(body): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let username = body.username.as_deref().map(str::trim).unwrap_or_default();
    let password = body.password.as_deref().unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        let mut missing = Vec::new();
        if username.is_empty() {
            missing.push("username");
        }
        if password.is_empty() {
            missing.push("password");
        }
        return Err(ApiError::missing_fields(&missing));
    }

    let pool = DatabaseManager::pool().await?;
    let user = UserService::new(pool).authenticate(username, password).await?;

    let token = generate_jwt(&Claims::new(user.id, user.username.clone(), user.role))?;
    info!("User '{}' ({}) logged in", user.username, user.role);

    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_in: config::config().security.jwt_expiry_hours * 3600,
        user,
    }))
}

// handlers/protected/auth/session.rs - GET /api/auth/me, PUT /api/auth/password

use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::User;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::json::Json;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserService;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// GET /api/auth/me - Current user, fresh from the database
///
/// Doubles as the session check for the SPA: a deactivated account gets 401
/// even while its token is still valid.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": "...",
///     "username": "pkm_cibadak",
///     "role": "puskesmas",
///     "nama_puskesmas": "Puskesmas Cibadak",
///     "is_active": true
///   }
/// }
/// ```
pub async fn me_get(Extension(auth): Extension<AuthUser>) -> ApiResult<User> {
    let pool = DatabaseManager::pool().await?;
    let user = UserService::new(pool).get(auth.id).await?;
    if !user.is_active {
        return Err(ApiError::unauthorized("Account is inactive"));
    }
    Ok(ApiResponse::success(user))
}

/// PUT /api/auth/password - Change own password
///
/// Expected Input:
/// ```json
/// { "old_password": "...", "new_password": "..." }
/// ```
pub async fn password_put(
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Value> {
    let (old_password, new_password) = match (body.old_password, body.new_password) {
        (Some(old), Some(new)) if !old.is_empty() && !new.is_empty() => (old, new),
        (old, _) => {
            let missing: &[&str] = if old.as_deref().map_or(true, str::is_empty) {
                &["old_password"]
            } else {
                &["new_password"]
            };
            return Err(ApiError::missing_fields(missing));
        }
    };

    let pool = DatabaseManager::pool().await?;
    UserService::new(pool)
        .change_password(auth.id, &old_password, &new_password)
        .await?;

    Ok(ApiResponse::success(json!({ "changed": true })).with_message("Password updated"))
}

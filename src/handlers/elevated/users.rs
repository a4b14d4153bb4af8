// handlers/elevated/users.rs - /api/users account management handlers

use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::User;
use crate::database::{DatabaseManager, Page, Paginated};
use crate::error::ApiError;
use crate::handlers::json::Json;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user::{NewUser, UserListQuery, UserUpdate};
use crate::services::UserService;

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

/// GET /api/users - List accounts
///
/// Query: `role` (`admin` | `puskesmas`), `search` (username and names,
/// case-insensitive), `page`, `limit`.
pub async fn users_list(Query(query): Query<UserListQuery>) -> ApiResult<Paginated<User>> {
    let page = Page::new(query.page, query.limit);
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(UserService::new(pool).list(&query, page).await?))
}

/// GET /api/users/:id
pub async fn user_get(Path(id): Path<Uuid>) -> ApiResult<User> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(UserService::new(pool).get(id).await?))
}

/// POST /api/users - Create an account
///
/// Expected Input:
/// ```json
/// {
///   "username": "pkm_cibadak",
///   "password": "rahasia123",
///   "role": "puskesmas",
///   "nama_puskesmas": "Puskesmas Cibadak",
///   "kecamatan": "Cibadak"
/// }
/// ```
///
/// `role` defaults to `puskesmas`. A taken username answers 409.
pub async fn user_post(Json(body): Json<NewUser>) -> ApiResult<User> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::created(UserService::new(pool).create(body).await?))
}

/// PUT /api/users/:id - Update profile, role or active flag
pub async fn user_put(
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<User> {
    if id == admin.id && body.is_active == Some(false) {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(UserService::new(pool).update(id, body).await?))
}

/// DELETE /api/users/:id
///
/// Accounts that still own reports cannot be deleted (409); deactivate them.
pub async fn user_delete(Extension(admin): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    if id == admin.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    let pool = DatabaseManager::pool().await?;
    UserService::new(pool).delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// PUT /api/users/:id/reset-password
pub async fn user_reset_password_put(
    Path(id): Path<Uuid>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<Value> {
    let password = body
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::missing_fields(&["password"]))?;
    let pool = DatabaseManager::pool().await?;
    UserService::new(pool).reset_password(id, &password).await?;
    Ok(ApiResponse::success(json!({ "id": id })).with_message("Password reset"))
}

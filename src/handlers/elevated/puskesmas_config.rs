// handlers/elevated/puskesmas_config.rs - /api/puskesmas-config handlers
//
// Which sub kegiatan each clinic reports on.

use axum::extract::Path;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::PuskesmasSubKegiatan;
use crate::database::DatabaseManager;
use crate::handlers::json::Json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::puskesmas_config::{AssignInput, ReplaceInput};
use crate::services::PuskesmasConfigService;

/// GET /api/puskesmas-config/:user_id
pub async fn assignments_get(Path(user_id): Path<Uuid>) -> ApiResult<Vec<PuskesmasSubKegiatan>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(PuskesmasConfigService::new(pool).list(user_id).await?))
}

/// POST /api/puskesmas-config - Add assignments
///
/// Expected Input:
/// ```json
/// { "user_id": "...", "sub_kegiatan_ids": ["...", "..."] }
/// ```
///
/// Pairs that already exist are skipped; `added` counts the new ones.
pub async fn assignments_post(Json(body): Json<AssignInput>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let added = PuskesmasConfigService::new(pool).add(body).await?;
    Ok(ApiResponse::created(json!({ "added": added })))
}

/// PUT /api/puskesmas-config/:user_id - Replace the clinic's assignment set
pub async fn assignments_put(
    Path(user_id): Path<Uuid>,
    Json(body): Json<ReplaceInput>,
) -> ApiResult<Vec<PuskesmasSubKegiatan>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(
        PuskesmasConfigService::new(pool).replace(user_id, body).await?,
    ))
}

/// DELETE /api/puskesmas-config/:user_id/:sub_kegiatan_id
pub async fn assignment_delete(Path((user_id, sub_kegiatan_id)): Path<(Uuid, Uuid)>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    PuskesmasConfigService::new(pool).remove(user_id, sub_kegiatan_id).await?;
    Ok(ApiResponse::success(json!({
        "user_id": user_id,
        "sub_kegiatan_id": sub_kegiatan_id,
        "deleted": true
    })))
}

// handlers/elevated/sumber_dana.rs - /api/sub-kegiatan-sumber-dana handlers

use axum::extract::{Path, Query};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::SubKegiatanSumberAnggaran;
use crate::database::DatabaseManager;
use crate::handlers::json::Json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::sumber_dana::MappingInput;
use crate::services::SumberDanaService;

#[derive(Debug, Deserialize)]
pub struct MappingQuery {
    pub sub_kegiatan_id: Option<Uuid>,
}

/// GET /api/sub-kegiatan-sumber-dana[?sub_kegiatan_id]
pub async fn mappings_get(Query(query): Query<MappingQuery>) -> ApiResult<Vec<SubKegiatanSumberAnggaran>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(
        SumberDanaService::new(pool).list(query.sub_kegiatan_id).await?,
    ))
}

/// POST /api/sub-kegiatan-sumber-dana - Create, or reactivate an existing pair
///
/// Expected Input:
/// ```json
/// { "sub_kegiatan_id": "...", "sumber_anggaran_id": "..." }
/// ```
pub async fn mapping_post(Json(body): Json<MappingInput>) -> ApiResult<SubKegiatanSumberAnggaran> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::created(SumberDanaService::new(pool).create(body).await?))
}

/// PATCH /api/sub-kegiatan-sumber-dana/:id/toggle - Flip `is_active`
pub async fn mapping_toggle_patch(Path(id): Path<Uuid>) -> ApiResult<SubKegiatanSumberAnggaran> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(SumberDanaService::new(pool).toggle(id).await?))
}

/// DELETE /api/sub-kegiatan-sumber-dana/:id
pub async fn mapping_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    SumberDanaService::new(pool).delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

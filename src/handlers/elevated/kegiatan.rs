// handlers/elevated/kegiatan.rs - Kegiatan and sub kegiatan writes
//
// POST   /api/kegiatan
// PUT    /api/kegiatan/:id
// DELETE /api/kegiatan/:id
// POST   /api/kegiatan/:id/sub-kegiatan
// PUT    /api/kegiatan/sub-kegiatan/:id
// DELETE /api/kegiatan/sub-kegiatan/:id

use axum::extract::Path;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Kegiatan, SubKegiatan};
use crate::database::DatabaseManager;
use crate::handlers::json::Json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::kegiatan::{KegiatanInput, SubKegiatanInput};
use crate::services::KegiatanService;

/// POST /api/kegiatan
///
/// Expected Input:
/// ```json
/// { "kode": "1.02.02", "nama": "Pelayanan Kesehatan" }
/// ```
pub async fn kegiatan_post(Json(body): Json<KegiatanInput>) -> ApiResult<Kegiatan> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::created(KegiatanService::new(pool).create(body).await?))
}

pub async fn kegiatan_put(Path(id): Path<Uuid>, Json(body): Json<KegiatanInput>) -> ApiResult<Kegiatan> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(KegiatanService::new(pool).update(id, body).await?))
}

/// DELETE /api/kegiatan/:id - Removes its sub kegiatan too; 409 while reports use them
pub async fn kegiatan_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    KegiatanService::new(pool).delete(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/kegiatan/:id/sub-kegiatan
pub async fn sub_kegiatan_post(Path(id): Path<Uuid>, Json(body): Json<SubKegiatanInput>) -> ApiResult<SubKegiatan> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::created(KegiatanService::new(pool).create_sub(id, body).await?))
}

pub async fn sub_kegiatan_put(Path(id): Path<Uuid>, Json(body): Json<SubKegiatanInput>) -> ApiResult<SubKegiatan> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(KegiatanService::new(pool).update_sub(id, body).await?))
}

pub async fn sub_kegiatan_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    KegiatanService::new(pool).delete_sub(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

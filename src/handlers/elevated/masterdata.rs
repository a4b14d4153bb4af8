// handlers/elevated/masterdata.rs - /api/masterdata/{sumber-anggaran,satuan} CRUD

use axum::extract::Path;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Satuan, SumberAnggaran};
use crate::database::DatabaseManager;
use crate::handlers::json::Json;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::masterdata::{SatuanInput, SumberAnggaranInput};
use crate::services::MasterDataService;

async fn service() -> Result<MasterDataService, crate::error::ApiError> {
    Ok(MasterDataService::new(DatabaseManager::pool().await?))
}

/// GET /api/masterdata/sumber-anggaran
pub async fn sumber_anggaran_list() -> ApiResult<Vec<SumberAnggaran>> {
    Ok(ApiResponse::success(service().await?.list_sumber_anggaran().await?))
}

/// GET /api/masterdata/sumber-anggaran/:id
pub async fn sumber_anggaran_get(Path(id): Path<Uuid>) -> ApiResult<SumberAnggaran> {
    Ok(ApiResponse::success(service().await?.get_sumber_anggaran(id).await?))
}

/// POST /api/masterdata/sumber-anggaran
///
/// Expected Input:
/// ```json
/// { "nama": "BOK", "keterangan": "Bantuan Operasional Kesehatan" }
/// ```
pub async fn sumber_anggaran_post(Json(body): Json<SumberAnggaranInput>) -> ApiResult<SumberAnggaran> {
    Ok(ApiResponse::created(service().await?.create_sumber_anggaran(body).await?))
}

/// PUT /api/masterdata/sumber-anggaran/:id
pub async fn sumber_anggaran_put(
    Path(id): Path<Uuid>,
    Json(body): Json<SumberAnggaranInput>,
) -> ApiResult<SumberAnggaran> {
    Ok(ApiResponse::success(service().await?.update_sumber_anggaran(id, body).await?))
}

/// DELETE /api/masterdata/sumber-anggaran/:id - 409 while reports use it
pub async fn sumber_anggaran_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    service().await?.delete_sumber_anggaran(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// GET /api/masterdata/satuan
pub async fn satuan_list() -> ApiResult<Vec<Satuan>> {
    Ok(ApiResponse::success(service().await?.list_satuan().await?))
}

/// GET /api/masterdata/satuan/:id
pub async fn satuan_get(Path(id): Path<Uuid>) -> ApiResult<Satuan> {
    Ok(ApiResponse::success(service().await?.get_satuan(id).await?))
}

/// POST /api/masterdata/satuan
pub async fn satuan_post(Json(body): Json<SatuanInput>) -> ApiResult<Satuan> {
    Ok(ApiResponse::created(service().await?.create_satuan(body).await?))
}

/// PUT /api/masterdata/satuan/:id
pub async fn satuan_put(Path(id): Path<Uuid>, Json(body): Json<SatuanInput>) -> ApiResult<Satuan> {
    Ok(ApiResponse::success(service().await?.update_satuan(id, body).await?))
}

/// DELETE /api/masterdata/satuan/:id
pub async fn satuan_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    service().await?.delete_satuan(id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

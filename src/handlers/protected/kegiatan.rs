// handlers/protected/kegiatan.rs - Read-only kegiatan handlers
//
// Writes live in handlers/elevated/kegiatan.rs.

use axum::extract::Path;
use uuid::Uuid;

use crate::database::models::{Kegiatan, SubKegiatan};
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::kegiatan::KegiatanDetail;
use crate::services::KegiatanService;

/// GET /api/kegiatan
pub async fn kegiatan_list() -> ApiResult<Vec<Kegiatan>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(KegiatanService::new(pool).list().await?))
}

/// GET /api/kegiatan/:id - Kegiatan with its sub kegiatan nested
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": "...", "kode": "1.02.02", "nama": "Pelayanan Kesehatan",
///     "sub_kegiatan": [{ "id": "...", "kode": "1.02.02.2.01", "nama": "...", "indikator": "..." }]
///   }
/// }
/// ```
pub async fn kegiatan_get(Path(id): Path<Uuid>) -> ApiResult<KegiatanDetail> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(KegiatanService::new(pool).get(id).await?))
}

/// GET /api/kegiatan/:id/sub-kegiatan
pub async fn sub_kegiatan_list(Path(id): Path<Uuid>) -> ApiResult<Vec<SubKegiatan>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(KegiatanService::new(pool).list_sub(id).await?))
}

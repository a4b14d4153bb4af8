// handlers/protected/reference.rs - GET /api/reference/* handlers
//
// Lookups that populate the report form dropdowns.

use axum::{extract::Query, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Kegiatan, Satuan, SumberAnggaran, UserSummary};
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::reference::{bulan_options, BulanOption, SubKegiatanOption};
use crate::services::ReferenceService;

#[derive(Debug, Deserialize)]
pub struct SumberAnggaranQuery {
    pub sub_kegiatan_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SubKegiatanQuery {
    pub kegiatan_id: Option<Uuid>,
}

/// GET /api/reference/bulan - The twelve reporting months in calendar order
pub async fn bulan_get() -> ApiResult<Vec<BulanOption>> {
    Ok(ApiResponse::success(bulan_options()))
}

/// GET /api/reference/satuan
pub async fn satuan_get() -> ApiResult<Vec<Satuan>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(ReferenceService::new(pool).satuan().await?))
}

/// GET /api/reference/sumber-anggaran[?sub_kegiatan_id]
///
/// With `sub_kegiatan_id`, only the funding sources actively mapped to it.
pub async fn sumber_anggaran_get(Query(query): Query<SumberAnggaranQuery>) -> ApiResult<Vec<SumberAnggaran>> {
    let pool = DatabaseManager::pool().await?;
    let rows = ReferenceService::new(pool)
        .sumber_anggaran(query.sub_kegiatan_id)
        .await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/reference/sub-kegiatan[?kegiatan_id]
///
/// A puskesmas only gets the sub kegiatan assigned to it.
pub async fn sub_kegiatan_get(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SubKegiatanQuery>,
) -> ApiResult<Vec<SubKegiatanOption>> {
    let pool = DatabaseManager::pool().await?;
    let rows = ReferenceService::new(pool)
        .sub_kegiatan(&user, query.kegiatan_id)
        .await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/reference/kegiatan
pub async fn kegiatan_get() -> ApiResult<Vec<Kegiatan>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(ReferenceService::new(pool).kegiatan().await?))
}

/// GET /api/reference/puskesmas - Active clinic accounts
pub async fn puskesmas_get() -> ApiResult<Vec<UserSummary>> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(ReferenceService::new(pool).puskesmas().await?))
}

// handlers/protected/laporan.rs - /api/laporan handlers
//
// GET    /api/laporan            - paginated, filtered listing
// GET    /api/laporan/summary    - per-month totals for the caller scope
// GET    /api/laporan/:id        - single row with capaian
// POST   /api/laporan            - create one row
// POST   /api/laporan/bulk       - create several rows, all or nothing
// PUT    /api/laporan/:id        - update a row
// DELETE /api/laporan/:id        - delete a row
// POST   /api/laporan/submit     - send a month's saved rows for verification

use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::LaporanView;
use crate::database::{DatabaseManager, LaporanFilter, Page, Paginated};
use crate::error::ApiError;
use crate::handlers::json::Json;
use crate::handlers::params;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::policy;
use crate::services::laporan::LaporanPayload;
use crate::services::report::{MonthlyAggregate, WithCapaian};
use crate::services::{LaporanService, ReportService};

#[derive(Debug, Default, Deserialize)]
pub struct LaporanQuery {
    pub bulan: Option<String>,
    pub tahun: Option<i32>,
    pub status: Option<String>,
    pub sub_kegiatan_id: Option<Uuid>,
    pub sumber_anggaran_id: Option<Uuid>,
    pub kegiatan_id: Option<Uuid>,
    /// Ignored for puskesmas callers
    pub user_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl LaporanQuery {
    fn filter_for(&self, user: &AuthUser) -> Result<LaporanFilter, ApiError> {
        Ok(LaporanFilter {
            user_id: policy::scoped_user_id(user, self.user_id),
            bulan: params::bulan(self.bulan.as_deref())?,
            tahun: self.tahun,
            status: params::status(self.status.as_deref())?,
            sub_kegiatan_id: self.sub_kegiatan_id,
            sumber_anggaran_id: self.sumber_anggaran_id,
            kegiatan_id: self.kegiatan_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub items: Vec<LaporanPayload>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub bulan: Option<String>,
    pub tahun: Option<i32>,
}

/// GET /api/laporan - List report rows
///
/// Query: `bulan`, `tahun`, `status`, `sub_kegiatan_id`, `sumber_anggaran_id`,
/// `kegiatan_id`, `user_id` (admin only), `page`, `limit`.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "items": [{ "id": "...", "bulan": "Januari", "tahun": 2025, "capaian_k": "80.00", ... }],
///     "pagination": { "page": 1, "limit": 10, "total": 42, "total_pages": 5 }
///   }
/// }
/// ```
pub async fn laporan_list(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LaporanQuery>,
) -> ApiResult<Paginated<LaporanView>> {
    let filter = query.filter_for(&user)?;
    let page = Page::new(query.page, query.limit);

    let pool = DatabaseManager::pool().await?;
    let result = LaporanService::new(pool).list(&filter, page).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/laporan/summary - Month-by-month totals for the caller scope
pub async fn laporan_summary(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LaporanQuery>,
) -> ApiResult<Vec<WithCapaian<MonthlyAggregate>>> {
    let filter = LaporanFilter {
        user_id: policy::scoped_user_id(&user, query.user_id),
        tahun: Some(query.tahun.unwrap_or_else(params::current_tahun)),
        ..Default::default()
    };

    let pool = DatabaseManager::pool().await?;
    let months = ReportService::new(pool).monthly(&filter).await?;
    Ok(ApiResponse::success(months))
}

/// GET /api/laporan/:id
pub async fn laporan_get(Extension(user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<LaporanView> {
    let pool = DatabaseManager::pool().await?;
    let view = LaporanService::new(pool).get_for(&user, id).await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/laporan - Create a report row
///
/// A puskesmas creates rows for itself; an admin must name the clinic with
/// `user_id`. New rows start as `tersimpan`.
///
/// Expected Input:
/// ```json
/// {
///   "sub_kegiatan_id": "...", "sumber_anggaran_id": "...", "satuan_id": "...",
///   "bulan": "Januari", "tahun": 2025,
///   "target_k": 100, "realisasi_k": 80, "angkas": 5000000,
///   "target_rp": 10000000, "realisasi_rp": 4000000,
///   "permasalahan": "...", "upaya": "..."
/// }
/// ```
pub async fn laporan_post(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<LaporanPayload>,
) -> ApiResult<LaporanView> {
    let pool = DatabaseManager::pool().await?;
    let view = LaporanService::new(pool).create(&user, payload).await?;
    Ok(ApiResponse::created(view))
}

/// POST /api/laporan/bulk - Create several rows in one transaction
///
/// Any invalid item rolls back the whole batch; the error names the item.
pub async fn laporan_bulk_post(
    Extension(user): Extension<AuthUser>,
    Json(body): Json<BulkRequest>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let created = LaporanService::new(pool).create_bulk(&user, body.items).await?;
    Ok(ApiResponse::created(json!({ "created": created })))
}

/// PUT /api/laporan/:id - Partial update
pub async fn laporan_put(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LaporanPayload>,
) -> ApiResult<LaporanView> {
    let pool = DatabaseManager::pool().await?;
    let view = LaporanService::new(pool).update(&user, id, payload).await?;
    Ok(ApiResponse::success(view))
}

/// DELETE /api/laporan/:id
pub async fn laporan_delete(Extension(user): Extension<AuthUser>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    LaporanService::new(pool).delete(&user, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/laporan/submit - Submit the caller's saved rows for a month
///
/// Expected Input:
/// ```json
/// { "bulan": "Januari", "tahun": 2025 }
/// ```
///
/// Expected Output:
/// ```json
/// { "success": true, "message": "...", "data": { "updated": 12 } }
/// ```
pub async fn laporan_submit_post(
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SubmitRequest>,
) -> ApiResult<Value> {
    let bulan = params::required_bulan(body.bulan.as_deref())?;
    let tahun = body.tahun.ok_or_else(|| ApiError::missing_fields(&["tahun"]))?;

    let pool = DatabaseManager::pool().await?;
    let updated = LaporanService::new(pool).submit(&user, bulan, tahun).await?;
    Ok(ApiResponse::success(json!({ "updated": updated }))
        .with_message(format!("{} laporan {} {} submitted for verification", updated, bulan, tahun)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bulan, LaporanStatus, Role};

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "tester".into(),
            role,
        }
    }

    #[test]
    fn clinic_filter_is_pinned_to_itself() {
        let clinic = user(Role::Puskesmas);
        let query = LaporanQuery {
            user_id: Some(Uuid::new_v4()),
            bulan: Some("januari".into()),
            status: Some("tersimpan".into()),
            ..Default::default()
        };
        let filter = query.filter_for(&clinic).unwrap();
        assert_eq!(filter.user_id, Some(clinic.id));
        assert_eq!(filter.bulan, Some(Bulan::Januari));
        assert_eq!(filter.status, Some(LaporanStatus::Tersimpan));
    }

    #[test]
    fn admin_filter_keeps_requested_clinic() {
        let other = Uuid::new_v4();
        let query = LaporanQuery {
            user_id: Some(other),
            ..Default::default()
        };
        assert_eq!(query.filter_for(&user(Role::Admin)).unwrap().user_id, Some(other));
    }

    #[test]
    fn bad_status_is_rejected() {
        let query = LaporanQuery {
            status: Some("approved".into()),
            ..Default::default()
        };
        assert_eq!(query.filter_for(&user(Role::Admin)).unwrap_err().status_code(), 400);
    }
}

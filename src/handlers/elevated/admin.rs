// handlers/elevated/admin.rs - /api/admin verification and dashboard handlers
//
// GET  /api/admin/verifikasi            - queue grouped by (clinic, bulan, tahun)
// GET  /api/admin/verifikasi/detail     - rows of one group
// PUT  /api/admin/laporan/:id/status    - verify or reject one row
// POST /api/admin/verifikasi/bulk       - verify or reject a whole group
// POST /api/admin/return                - send a group back to the clinic
// GET  /api/admin/dashboard             - totals, status counts and series

use axum::{
    extract::{Path, Query},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::LaporanView;
use crate::database::{DatabaseManager, Page, Paginated};
use crate::error::ApiError;
use crate::handlers::json::Json;
use crate::handlers::params;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::admin::{Dashboard, Scope, VerificationGroup};
use crate::services::report::WithCapaian;
use crate::services::AdminService;
use crate::types::LaporanStatus;

#[derive(Debug, Default, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
    pub bulan: Option<String>,
    pub tahun: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    pub user_id: Option<Uuid>,
    pub bulan: Option<String>,
    pub tahun: Option<i32>,
}

impl GroupQuery {
    fn scope(&self) -> Result<Scope, ApiError> {
        let mut missing = Vec::new();
        if self.user_id.is_none() {
            missing.push("user_id");
        }
        if self.bulan.as_deref().map_or(true, |b| b.trim().is_empty()) {
            missing.push("bulan");
        }
        if self.tahun.is_none() {
            missing.push("tahun");
        }
        match (self.user_id, params::bulan(self.bulan.as_deref())?, self.tahun) {
            (Some(user_id), Some(bulan), Some(tahun)) => Ok(Scope { user_id, bulan, tahun }),
            _ => Err(ApiError::missing_fields(&missing)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: Option<LaporanStatus>,
    pub catatan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkReviewRequest {
    #[serde(flatten)]
    pub group: GroupQuery,
    pub status: Option<LaporanStatus>,
    pub catatan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    #[serde(flatten)]
    pub group: GroupQuery,
    pub catatan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub tahun: Option<i32>,
    pub bulan: Option<String>,
}

/// GET /api/admin/verifikasi - Verification queue
///
/// `status` defaults to `terkirim`. Each group carries its totals, capaian
/// and counts for every status.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "items": [{
///       "user_id": "...", "nama_puskesmas": "Puskesmas Cibadak",
///       "bulan": "Januari", "tahun": 2025, "jumlah_laporan": 12,
///       "capaian_k": "85.50", "capaian_pagu": "40.00",
///       "status": { "terkirim": 12, "diverifikasi": 0, ... }
///     }],
///     "pagination": { "page": 1, "limit": 10, "total": 3, "total_pages": 1 }
///   }
/// }
/// ```
pub async fn verifikasi_get(Query(query): Query<QueueQuery>) -> ApiResult<Paginated<WithCapaian<VerificationGroup>>> {
    let status = params::status(query.status.as_deref())?.unwrap_or(LaporanStatus::Terkirim);
    let bulan = params::bulan(query.bulan.as_deref())?;
    let page = Page::new(query.page, query.limit);

    let pool = DatabaseManager::pool().await?;
    let queue = AdminService::new(pool)
        .verification_queue(status, bulan, query.tahun, page)
        .await?;
    Ok(ApiResponse::success(queue))
}

/// GET /api/admin/verifikasi/detail?user_id&bulan&tahun
pub async fn verifikasi_detail_get(Query(query): Query<GroupQuery>) -> ApiResult<Vec<LaporanView>> {
    let scope = query.scope()?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(AdminService::new(pool).group_detail(scope).await?))
}

/// PUT /api/admin/laporan/:id/status - Review one submitted row
///
/// Expected Input:
/// ```json
/// { "status": "ditolak", "catatan": "Realisasi tidak sesuai bukti" }
/// ```
pub async fn laporan_status_put(
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<LaporanView> {
    let outcome = body.status.ok_or_else(|| ApiError::missing_fields(&["status"]))?;
    let pool = DatabaseManager::pool().await?;
    let view = AdminService::new(pool).review(&admin, id, outcome, body.catatan).await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/admin/verifikasi/bulk - Review every submitted row of a group
pub async fn verifikasi_bulk_post(
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<BulkReviewRequest>,
) -> ApiResult<Value> {
    let scope = body.group.scope()?;
    let outcome = body.status.ok_or_else(|| ApiError::missing_fields(&["status"]))?;

    let pool = DatabaseManager::pool().await?;
    let updated = AdminService::new(pool)
        .bulk_review(&admin, scope, outcome, body.catatan)
        .await?;
    Ok(ApiResponse::success(json!({ "updated": updated, "status": outcome })))
}

/// POST /api/admin/return - Return a submitted group to the clinic as drafts
pub async fn return_post(Extension(admin): Extension<AuthUser>, Json(body): Json<ReturnRequest>) -> ApiResult<Value> {
    let scope = body.group.scope()?;
    let pool = DatabaseManager::pool().await?;
    let updated = AdminService::new(pool).bulk_return(&admin, scope, body.catatan).await?;
    Ok(ApiResponse::success(json!({ "updated": updated }))
        .with_message(format!("{} laporan returned for revision", updated)))
}

/// GET /api/admin/dashboard?tahun[&bulan]
///
/// `tahun` defaults to the current year. The monthly series always spans
/// the whole year.
pub async fn dashboard_get(Query(query): Query<DashboardQuery>) -> ApiResult<Dashboard> {
    let tahun = query.tahun.unwrap_or_else(params::current_tahun);
    let bulan = params::bulan(query.bulan.as_deref())?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(AdminService::new(pool).dashboard(Some(tahun), bulan).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bulan;

    #[test]
    fn group_scope_requires_every_key() {
        let err = GroupQuery {
            user_id: None,
            bulan: Some("Januari".into()),
            tahun: None,
        }
        .scope()
        .unwrap_err();
        let body = err.to_json();
        assert!(body["field_errors"].get("user_id").is_some());
        assert!(body["field_errors"].get("tahun").is_some());
        assert!(body["field_errors"].get("bulan").is_none());
    }

    #[test]
    fn group_scope_parses_month() {
        let user_id = Uuid::new_v4();
        let scope = GroupQuery {
            user_id: Some(user_id),
            bulan: Some("2".into()),
            tahun: Some(2025),
        }
        .scope()
        .unwrap();
        assert_eq!(scope.user_id, user_id);
        assert_eq!(scope.bulan, Bulan::Februari);
        assert_eq!(scope.tahun, 2025);
    }

    #[test]
    fn bulk_body_flattens_scope() {
        let body: BulkReviewRequest = serde_json::from_value(json!({
            "user_id": "6f1c1f8e-4b36-4c9c-9d43-2f6c1b1f0a11",
            "bulan": "Maret",
            "tahun": 2025,
            "status": "diverifikasi"
        }))
        .unwrap();
        assert_eq!(body.status, Some(LaporanStatus::Diverifikasi));
        assert_eq!(body.group.scope().unwrap().bulan, Bulan::Maret);
    }
}

// handlers/protected/report.rs - GET /api/report/{sub-kegiatan,sumber-anggaran}
//
// Aggregates scoped by role: a puskesmas sees its own totals, an admin all
// clinics or the one named by `user_id`.

use axum::{extract::Query, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::{DatabaseManager, LaporanFilter};
use crate::error::ApiError;
use crate::handlers::params;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::policy;
use crate::services::report::{SubKegiatanAggregate, SumberAnggaranAggregate, WithCapaian};
use crate::services::ReportService;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub tahun: Option<i32>,
    pub bulan: Option<String>,
    pub user_id: Option<Uuid>,
    pub kegiatan_id: Option<Uuid>,
}

impl ReportQuery {
    /// Filter for `user`; `user_id` only narrows the scope for admins.
    pub fn filter_for(&self, user: &AuthUser) -> Result<LaporanFilter, ApiError> {
        Ok(LaporanFilter {
            user_id: policy::scoped_user_id(user, self.user_id),
            bulan: params::bulan(self.bulan.as_deref())?,
            tahun: self.tahun,
            kegiatan_id: self.kegiatan_id,
            ..Default::default()
        })
    }
}

/// GET /api/report/sub-kegiatan - Totals per (sub kegiatan, bulan, tahun)
pub async fn sub_kegiatan_report(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<WithCapaian<SubKegiatanAggregate>>> {
    let filter = query.filter_for(&user)?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(ReportService::new(pool).by_sub_kegiatan(&filter).await?))
}

/// GET /api/report/sumber-anggaran - Totals per (sumber anggaran, bulan, tahun)
pub async fn sumber_anggaran_report(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<WithCapaian<SumberAnggaranAggregate>>> {
    let filter = query.filter_for(&user)?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(ReportService::new(pool).by_sumber_anggaran(&filter).await?))
}

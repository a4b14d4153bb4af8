// handlers/elevated/report.rs - GET /api/report/puskesmas handler

use axum::{extract::Query, Extension};

use crate::database::DatabaseManager;
use crate::handlers::protected::report::ReportQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::report::{PuskesmasAggregate, WithCapaian};
use crate::services::ReportService;

/// GET /api/report/puskesmas - Totals and status counts per (clinic, bulan, tahun)
pub async fn puskesmas_report(
    Extension(admin): Extension<AuthUser>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<WithCapaian<PuskesmasAggregate>>> {
    let filter = query.filter_for(&admin)?;
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(ReportService::new(pool).by_puskesmas(&filter).await?))
}

// handlers/protected/export.rs - GET /api/export/excel handler

use axum::{
    extract::Query,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::export::XLSX_CONTENT_TYPE;
use crate::handlers::params;
use crate::middleware::AuthUser;
use crate::policy;
use crate::services::ExportService;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub bulan: Option<String>,
    pub tahun: Option<i32>,
    pub user_id: Option<Uuid>,
}

/// GET /api/export/excel?bulan&tahun[&user_id] - Download the report workbook
///
/// A puskesmas always exports its own rows. An admin exports every clinic
/// unless `user_id` is given. Without `bulan` the whole year is exported;
/// without `tahun` the current year.
pub async fn excel_get(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let bulan = params::bulan(query.bulan.as_deref())?;
    let tahun = query.tahun.unwrap_or_else(params::current_tahun);
    let user_id = policy::scoped_user_id(&user, query.user_id);

    let pool = DatabaseManager::pool().await?;
    let file = ExportService::new(pool)
        .laporan_workbook(user_id, bulan, tahun)
        .await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.filename))
        .map_err(|e| ApiError::internal_with_detail("Failed to build download headers", e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

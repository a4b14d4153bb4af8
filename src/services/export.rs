use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::User;
use crate::database::LaporanFilter;
use crate::error::ApiError;
use crate::export::{render_laporan, ExportMeta};
use crate::services::LaporanService;
use crate::types::Bulan;

/// A rendered workbook and the name it should be downloaded as
#[derive(Debug)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Builds the monthly report workbook
pub struct ExportService {
    pool: PgPool,
}

impl ExportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Rows of one clinic (or all clinics when `user_id` is `None`) for a
    /// month, or for the whole year when `bulan` is `None`.
    pub async fn laporan_workbook(
        &self,
        user_id: Option<Uuid>,
        bulan: Option<Bulan>,
        tahun: i32,
    ) -> Result<ExportFile, ApiError> {
        let puskesmas = match user_id {
            Some(id) => {
                let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| ApiError::not_found("User not found"))?;
                Some(user.display_name().to_string())
            }
            None => None,
        };

        let filter = LaporanFilter {
            user_id,
            bulan,
            tahun: Some(tahun),
            ..Default::default()
        };
        let rows = LaporanService::new(self.pool.clone()).list_all(&filter).await?;

        let meta = ExportMeta {
            bulan,
            tahun,
            puskesmas,
        };
        let bytes = render_laporan(&rows, &meta)?;
        let filename = meta.filename();

        info!("Exported {} laporan rows to {} ({} bytes)", rows.len(), filename, bytes.len());
        Ok(ExportFile { filename, bytes })
    }
}

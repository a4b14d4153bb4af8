use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::SubKegiatanSumberAnggaran;
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct MappingInput {
    pub sub_kegiatan_id: Option<Uuid>,
    pub sumber_anggaran_id: Option<Uuid>,
}

const MAPPING_SELECT: &str = r#"
    SELECT m.id, m.sub_kegiatan_id, sk.nama AS sub_kegiatan_nama,
           m.sumber_anggaran_id, sa.nama AS sumber_anggaran_nama,
           m.is_active, m.created_at, m.updated_at
    FROM sub_kegiatan_sumber_anggaran m
    JOIN sub_kegiatan sk ON sk.id = m.sub_kegiatan_id
    JOIN sumber_anggaran sa ON sa.id = m.sumber_anggaran_id
"#;

/// Funding sources valid for each sub kegiatan
pub struct SumberDanaService {
    pool: PgPool,
}

impl SumberDanaService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, sub_kegiatan_id: Option<Uuid>) -> Result<Vec<SubKegiatanSumberAnggaran>, ApiError> {
        let sql = format!(
            "{} WHERE ($1::uuid IS NULL OR m.sub_kegiatan_id = $1) ORDER BY sk.kode, sa.nama",
            MAPPING_SELECT
        );
        Ok(sqlx::query_as(&sql).bind(sub_kegiatan_id).fetch_all(&self.pool).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<SubKegiatanSumberAnggaran, ApiError> {
        let sql = format!("{} WHERE m.id = $1", MAPPING_SELECT);
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Sumber dana mapping not found"))
    }

    /// Create the mapping, or reactivate it when it already exists.
    pub async fn create(&self, input: MappingInput) -> Result<SubKegiatanSumberAnggaran, ApiError> {
        let (sub_kegiatan_id, sumber_anggaran_id) = match (input.sub_kegiatan_id, input.sumber_anggaran_id) {
            (Some(sk), Some(sa)) => (sk, sa),
            (sk, _) => {
                let missing: &[&str] = if sk.is_none() {
                    &["sub_kegiatan_id"]
                } else {
                    &["sumber_anggaran_id"]
                };
                return Err(ApiError::missing_fields(missing));
            }
        };

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO sub_kegiatan_sumber_anggaran (id, sub_kegiatan_id, sumber_anggaran_id) \
             SELECT $1, sk.id, sa.id FROM sub_kegiatan sk, sumber_anggaran sa WHERE sk.id = $2 AND sa.id = $3 \
             ON CONFLICT ON CONSTRAINT uq_sub_kegiatan_sumber_anggaran \
             DO UPDATE SET is_active = TRUE, updated_at = NOW() \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(sub_kegiatan_id)
        .bind(sumber_anggaran_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Sub kegiatan or sumber anggaran not found"))?;

        info!("Activated sumber anggaran {} for sub kegiatan {}", sumber_anggaran_id, sub_kegiatan_id);
        self.get(id).await
    }

    pub async fn toggle(&self, id: Uuid) -> Result<SubKegiatanSumberAnggaran, ApiError> {
        let active: bool = sqlx::query_scalar(
            "UPDATE sub_kegiatan_sumber_anggaran SET is_active = NOT is_active, updated_at = NOW() \
             WHERE id = $1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Sumber dana mapping not found"))?;

        info!("Sumber dana mapping {} is now {}", id, if active { "active" } else { "inactive" });
        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("DELETE FROM sub_kegiatan_sumber_anggaran WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(ApiError::not_found("Sumber dana mapping not found"));
        }
        info!("Deleted sumber dana mapping {}", id);
        Ok(())
    }
}

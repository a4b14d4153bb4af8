use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Satuan, SumberAnggaran};
use crate::database::DatabaseError;
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct SumberAnggaranInput {
    pub nama: Option<String>,
    pub keterangan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SatuanInput {
    pub nama: Option<String>,
}

fn required_nama(nama: Option<&str>) -> Result<String, ApiError> {
    match nama.map(str::trim) {
        Some(nama) if !nama.is_empty() => Ok(nama.to_string()),
        _ => Err(ApiError::missing_fields(&["nama"])),
    }
}

/// Map FK violations on delete to a message naming what still uses the row.
fn in_use(err: sqlx::Error, what: &str) -> ApiError {
    match DatabaseError::from(err) {
        DatabaseError::Conflict(_) => ApiError::conflict(format!("{} is still used by existing reports", what)),
        other => other.into(),
    }
}

/// Lookup tables: funding sources and units of measure
pub struct MasterDataService {
    pool: PgPool,
}

impl MasterDataService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_sumber_anggaran(&self) -> Result<Vec<SumberAnggaran>, ApiError> {
        Ok(sqlx::query_as("SELECT * FROM sumber_anggaran ORDER BY nama")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_sumber_anggaran(&self, id: Uuid) -> Result<SumberAnggaran, ApiError> {
        sqlx::query_as("SELECT * FROM sumber_anggaran WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Sumber anggaran not found"))
    }

    pub async fn create_sumber_anggaran(&self, input: SumberAnggaranInput) -> Result<SumberAnggaran, ApiError> {
        let nama = required_nama(input.nama.as_deref())?;
        let row: SumberAnggaran = sqlx::query_as(
            "INSERT INTO sumber_anggaran (id, nama, keterangan) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&nama)
        .bind(&input.keterangan)
        .fetch_one(&self.pool)
        .await?;

        info!("Created sumber anggaran '{}'", row.nama);
        Ok(row)
    }

    pub async fn update_sumber_anggaran(&self, id: Uuid, input: SumberAnggaranInput) -> Result<SumberAnggaran, ApiError> {
        let nama = match input.nama.as_deref() {
            Some(_) => Some(required_nama(input.nama.as_deref())?),
            None => None,
        };
        let row: SumberAnggaran = sqlx::query_as(
            "UPDATE sumber_anggaran SET nama = COALESCE($2, nama), keterangan = COALESCE($3, keterangan), \
             updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&nama)
        .bind(&input.keterangan)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Sumber anggaran not found"))?;

        info!("Updated sumber anggaran '{}'", row.nama);
        Ok(row)
    }

    pub async fn delete_sumber_anggaran(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("DELETE FROM sumber_anggaran WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| in_use(e, "Sumber anggaran"))?
            .rows_affected();
        if deleted == 0 {
            return Err(ApiError::not_found("Sumber anggaran not found"));
        }
        info!("Deleted sumber anggaran {}", id);
        Ok(())
    }

    pub async fn list_satuan(&self) -> Result<Vec<Satuan>, ApiError> {
        Ok(sqlx::query_as("SELECT * FROM satuan ORDER BY nama")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_satuan(&self, id: Uuid) -> Result<Satuan, ApiError> {
        sqlx::query_as("SELECT * FROM satuan WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Satuan not found"))
    }

    pub async fn create_satuan(&self, input: SatuanInput) -> Result<Satuan, ApiError> {
        let nama = required_nama(input.nama.as_deref())?;
        let row: Satuan = sqlx::query_as("INSERT INTO satuan (id, nama) VALUES ($1, $2) RETURNING *")
            .bind(Uuid::new_v4())
            .bind(&nama)
            .fetch_one(&self.pool)
            .await?;

        info!("Created satuan '{}'", row.nama);
        Ok(row)
    }

    pub async fn update_satuan(&self, id: Uuid, input: SatuanInput) -> Result<Satuan, ApiError> {
        let nama = required_nama(input.nama.as_deref())?;
        let row: Satuan = sqlx::query_as("UPDATE satuan SET nama = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(&nama)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Satuan not found"))?;

        info!("Updated satuan '{}'", row.nama);
        Ok(row)
    }

    pub async fn delete_satuan(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("DELETE FROM satuan WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| in_use(e, "Satuan"))?
            .rows_affected();
        if deleted == 0 {
            return Err(ApiError::not_found("Satuan not found"));
        }
        info!("Deleted satuan {}", id);
        Ok(())
    }

    /// Insert the default lookup rows, leaving existing names alone.
    pub async fn seed_defaults(&self) -> Result<(u64, u64), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut satuan = 0;
        for nama in DEFAULT_SATUAN {
            satuan += sqlx::query("INSERT INTO satuan (id, nama) VALUES ($1, $2) ON CONFLICT (nama) DO NOTHING")
                .bind(Uuid::new_v4())
                .bind(*nama)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        let mut sumber = 0;
        for (nama, keterangan) in DEFAULT_SUMBER_ANGGARAN {
            sumber += sqlx::query(
                "INSERT INTO sumber_anggaran (id, nama, keterangan) VALUES ($1, $2, $3) ON CONFLICT (nama) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(*nama)
            .bind(*keterangan)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok((satuan, sumber))
    }
}

pub const DEFAULT_SATUAN: &[&str] = &["Orang", "Kegiatan", "Dokumen", "Paket", "Bulan", "Unit", "Laporan"];

pub const DEFAULT_SUMBER_ANGGARAN: &[(&str, &str)] = &[
    ("APBD", "Anggaran Pendapatan dan Belanja Daerah"),
    ("BOK", "Bantuan Operasional Kesehatan"),
    ("JKN", "Dana Kapitasi Jaminan Kesehatan Nasional"),
    ("DAK", "Dana Alokasi Khusus"),
    ("BLUD", "Badan Layanan Umum Daerah"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nama_is_required_and_trimmed() {
        assert_eq!(required_nama(Some("  Orang ")).unwrap(), "Orang");
        assert_eq!(required_nama(Some("   ")).unwrap_err().status_code(), 400);
        assert_eq!(required_nama(None).unwrap_err().status_code(), 400);
    }

    #[test]
    fn non_constraint_errors_stay_internal() {
        let err = in_use(sqlx::Error::RowNotFound, "Satuan");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn default_names_are_unique() {
        let mut names: Vec<_> = DEFAULT_SUMBER_ANGGARAN.iter().map(|(n, _)| *n).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_SUMBER_ANGGARAN.len());
    }
}

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Kegiatan, SubKegiatan};
use crate::database::DatabaseError;
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KegiatanInput {
    pub kode: Option<String>,
    pub nama: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubKegiatanInput {
    pub kode: Option<String>,
    pub nama: Option<String>,
    pub indikator: Option<String>,
}

/// Kegiatan with its sub kegiatan, for the detail endpoint
#[derive(Debug, Clone, Serialize)]
pub struct KegiatanDetail {
    #[serde(flatten)]
    pub kegiatan: Kegiatan,
    pub sub_kegiatan: Vec<SubKegiatan>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn require_kode_nama(kode: Option<&str>, nama: Option<&str>) -> Result<(String, String), ApiError> {
    match (trimmed(kode), trimmed(nama)) {
        (Some(kode), Some(nama)) => Ok((kode, nama)),
        (kode, nama) => {
            let mut missing = Vec::new();
            if kode.is_none() {
                missing.push("kode");
            }
            if nama.is_none() {
                missing.push("nama");
            }
            Err(ApiError::missing_fields(&missing))
        }
    }
}

fn duplicate_kode(err: sqlx::Error, kode: Option<&str>) -> ApiError {
    match DatabaseError::from(err) {
        DatabaseError::Conflict(msg) => match kode {
            Some(kode) => ApiError::conflict(format!("Kode '{}' is already in use", kode)),
            None => ApiError::conflict(msg),
        },
        other => other.into(),
    }
}

/// Two-level activity catalog
pub struct KegiatanService {
    pool: PgPool,
}

impl KegiatanService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Kegiatan>, ApiError> {
        Ok(sqlx::query_as("SELECT * FROM kegiatan ORDER BY kode")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<KegiatanDetail, ApiError> {
        let kegiatan: Kegiatan = sqlx::query_as("SELECT * FROM kegiatan WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Kegiatan not found"))?;
        let sub_kegiatan = self.list_sub(id).await?;
        Ok(KegiatanDetail { kegiatan, sub_kegiatan })
    }

    pub async fn list_sub(&self, kegiatan_id: Uuid) -> Result<Vec<SubKegiatan>, ApiError> {
        Ok(sqlx::query_as("SELECT * FROM sub_kegiatan WHERE kegiatan_id = $1 ORDER BY kode")
            .bind(kegiatan_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn create(&self, input: KegiatanInput) -> Result<Kegiatan, ApiError> {
        let (kode, nama) = require_kode_nama(input.kode.as_deref(), input.nama.as_deref())?;
        let row: Kegiatan = sqlx::query_as("INSERT INTO kegiatan (id, kode, nama) VALUES ($1, $2, $3) RETURNING *")
            .bind(Uuid::new_v4())
            .bind(&kode)
            .bind(&nama)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| duplicate_kode(e, Some(&kode)))?;

        info!("Created kegiatan {} '{}'", row.kode, row.nama);
        Ok(row)
    }

    pub async fn update(&self, id: Uuid, input: KegiatanInput) -> Result<Kegiatan, ApiError> {
        let kode = trimmed(input.kode.as_deref());
        let row: Kegiatan = sqlx::query_as(
            "UPDATE kegiatan SET kode = COALESCE($2, kode), nama = COALESCE($3, nama), updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&kode)
        .bind(trimmed(input.nama.as_deref()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| duplicate_kode(e, kode.as_deref()))?
        .ok_or_else(|| ApiError::not_found("Kegiatan not found"))?;

        info!("Updated kegiatan {}", row.kode);
        Ok(row)
    }

    /// Deletes the kegiatan and its sub kegiatan; refused while reports reference them.
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("DELETE FROM kegiatan WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DatabaseError::from(e) {
                DatabaseError::Conflict(_) => ApiError::conflict("Kegiatan still has reports on its sub kegiatan"),
                other => other.into(),
            })?
            .rows_affected();
        if deleted == 0 {
            return Err(ApiError::not_found("Kegiatan not found"));
        }
        info!("Deleted kegiatan {}", id);
        Ok(())
    }

    pub async fn create_sub(&self, kegiatan_id: Uuid, input: SubKegiatanInput) -> Result<SubKegiatan, ApiError> {
        let (kode, nama) = require_kode_nama(input.kode.as_deref(), input.nama.as_deref())?;

        let parent: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM kegiatan WHERE id = $1)")
            .bind(kegiatan_id)
            .fetch_one(&self.pool)
            .await?;
        if !parent {
            return Err(ApiError::not_found("Kegiatan not found"));
        }

        let row: SubKegiatan = sqlx::query_as(
            "INSERT INTO sub_kegiatan (id, kegiatan_id, kode, nama, indikator) VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(kegiatan_id)
        .bind(&kode)
        .bind(&nama)
        .bind(trimmed(input.indikator.as_deref()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_kode(e, Some(&kode)))?;

        info!("Created sub kegiatan {} under {}", row.kode, kegiatan_id);
        Ok(row)
    }

    pub async fn update_sub(&self, id: Uuid, input: SubKegiatanInput) -> Result<SubKegiatan, ApiError> {
        let kode = trimmed(input.kode.as_deref());
        let row: SubKegiatan = sqlx::query_as(
            "UPDATE sub_kegiatan SET kode = COALESCE($2, kode), nama = COALESCE($3, nama), \
             indikator = COALESCE($4, indikator), updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&kode)
        .bind(trimmed(input.nama.as_deref()))
        .bind(trimmed(input.indikator.as_deref()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| duplicate_kode(e, kode.as_deref()))?
        .ok_or_else(|| ApiError::not_found("Sub kegiatan not found"))?;

        info!("Updated sub kegiatan {}", row.kode);
        Ok(row)
    }

    pub async fn delete_sub(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("DELETE FROM sub_kegiatan WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DatabaseError::from(e) {
                DatabaseError::Conflict(_) => ApiError::conflict("Sub kegiatan is still used by existing reports"),
                other => other.into(),
            })?
            .rows_affected();
        if deleted == 0 {
            return Err(ApiError::not_found("Sub kegiatan not found"));
        }
        info!("Deleted sub kegiatan {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kode_and_nama_are_required() {
        let err = require_kode_nama(Some(" "), None).unwrap_err();
        let body = err.to_json();
        assert_eq!(body["field_errors"]["kode"], "This field is required");
        assert_eq!(body["field_errors"]["nama"], "This field is required");

        let (kode, nama) = require_kode_nama(Some(" 1.02.02 "), Some("Pelayanan")).unwrap();
        assert_eq!(kode, "1.02.02");
        assert_eq!(nama, "Pelayanan");
    }

    #[test]
    fn blank_updates_are_ignored() {
        assert_eq!(trimmed(Some("   ")), None);
        assert_eq!(trimmed(None), None);
        assert_eq!(trimmed(Some(" x ")), Some("x".to_string()));
    }
}

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::models::{Kegiatan, Satuan, SumberAnggaran, UserSummary};
use crate::database::DatabaseError;
use crate::middleware::AuthUser;
use crate::types::Bulan;

#[derive(Debug, Clone, Serialize)]
pub struct BulanOption {
    pub value: Bulan,
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubKegiatanOption {
    pub id: Uuid,
    pub kegiatan_id: Uuid,
    pub kegiatan_kode: String,
    pub kegiatan_nama: String,
    pub kode: String,
    pub nama: String,
    pub indikator: Option<String>,
}

pub fn bulan_options() -> Vec<BulanOption> {
    Bulan::ALL
        .into_iter()
        .map(|value| BulanOption {
            value,
            number: value.number(),
        })
        .collect()
}

/// Read-only lookups backing the report forms
pub struct ReferenceService {
    pool: PgPool,
}

impl ReferenceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn satuan(&self) -> Result<Vec<Satuan>, DatabaseError> {
        Ok(sqlx::query_as("SELECT * FROM satuan ORDER BY nama")
            .fetch_all(&self.pool)
            .await?)
    }

    /// All funding sources, or only those active for `sub_kegiatan_id`.
    pub async fn sumber_anggaran(&self, sub_kegiatan_id: Option<Uuid>) -> Result<Vec<SumberAnggaran>, DatabaseError> {
        let rows = match sub_kegiatan_id {
            Some(sub_kegiatan_id) => {
                sqlx::query_as(
                    "SELECT sa.* FROM sumber_anggaran sa \
                     JOIN sub_kegiatan_sumber_anggaran m ON m.sumber_anggaran_id = sa.id \
                     WHERE m.sub_kegiatan_id = $1 AND m.is_active ORDER BY sa.nama",
                )
                .bind(sub_kegiatan_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM sumber_anggaran ORDER BY nama")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    /// Sub kegiatan a caller can report on: a clinic sees its assignments only.
    pub async fn sub_kegiatan(
        &self,
        user: &AuthUser,
        kegiatan_id: Option<Uuid>,
    ) -> Result<Vec<SubKegiatanOption>, DatabaseError> {
        let assigned_to = if user.is_admin() { None } else { Some(user.id) };
        Ok(sqlx::query_as(
            r#"
            SELECT sk.id, sk.kegiatan_id, k.kode AS kegiatan_kode, k.nama AS kegiatan_nama,
                   sk.kode, sk.nama, sk.indikator
            FROM sub_kegiatan sk
            JOIN kegiatan k ON k.id = sk.kegiatan_id
            WHERE ($1::uuid IS NULL OR sk.kegiatan_id = $1)
              AND ($2::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM puskesmas_sub_kegiatan psk
                    WHERE psk.sub_kegiatan_id = sk.id AND psk.user_id = $2))
            ORDER BY k.kode, sk.kode
            "#,
        )
        .bind(kegiatan_id)
        .bind(assigned_to)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn kegiatan(&self) -> Result<Vec<Kegiatan>, DatabaseError> {
        Ok(sqlx::query_as("SELECT * FROM kegiatan ORDER BY kode")
            .fetch_all(&self.pool)
            .await?)
    }

    /// Active clinic accounts
    pub async fn puskesmas(&self) -> Result<Vec<UserSummary>, DatabaseError> {
        Ok(sqlx::query_as(
            "SELECT id, username, nama_puskesmas, kecamatan, wilayah FROM users \
             WHERE role = 'puskesmas' AND is_active ORDER BY nama_puskesmas, username",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulan_options_follow_calendar() {
        let options = bulan_options();
        assert_eq!(options.len(), 12);
        assert_eq!(options[0].value, Bulan::Januari);
        assert_eq!(options[11].number, 12);
        let value = serde_json::to_value(&options[4]).unwrap();
        assert_eq!(value["value"], "Mei");
        assert_eq!(value["number"], 5);
    }
}

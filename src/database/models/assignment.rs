use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Sub kegiatan a clinic is allowed to report against
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PuskesmasSubKegiatan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sub_kegiatan_id: Uuid,
    pub kode: String,
    pub nama: String,
    pub kegiatan_id: Uuid,
    pub kegiatan_nama: String,
    pub created_at: DateTime<Utc>,
}

/// Funding source valid for a sub kegiatan; toggled rather than deleted
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubKegiatanSumberAnggaran {
    pub id: Uuid,
    pub sub_kegiatan_id: Uuid,
    pub sub_kegiatan_nama: String,
    pub sumber_anggaran_id: Uuid,
    pub sumber_anggaran_nama: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Funding source (e.g. APBD, BOK, JKN capitation)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SumberAnggaran {
    pub id: Uuid,
    pub nama: String,
    pub keterangan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unit of measure for performance targets
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Satuan {
    pub id: Uuid,
    pub nama: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

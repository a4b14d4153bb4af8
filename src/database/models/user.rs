use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// bcrypt hash; never leaves the process
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: Role,
    pub nama: Option<String>,
    pub nama_puskesmas: Option<String>,
    pub kecamatan: Option<String>,
    pub wilayah: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown on reports: the clinic name, falling back to the person, then the login.
    pub fn display_name(&self) -> &str {
        self.nama_puskesmas
            .as_deref()
            .or(self.nama.as_deref())
            .unwrap_or(&self.username)
    }
}

/// Lightweight clinic entry for dropdowns and report headers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub nama_puskesmas: Option<String>,
    pub kecamatan: Option<String>,
    pub wilayah: Option<String>,
}

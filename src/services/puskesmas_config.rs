use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::database::models::PuskesmasSubKegiatan;
use crate::error::ApiError;
use crate::types::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct AssignInput {
    pub user_id: Uuid,
    #[serde(default)]
    pub sub_kegiatan_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceInput {
    #[serde(default)]
    pub sub_kegiatan_ids: Vec<Uuid>,
}

const ASSIGNMENT_SELECT: &str = r#"
    SELECT psk.id, psk.user_id, psk.sub_kegiatan_id, sk.kode, sk.nama,
           k.id AS kegiatan_id, k.nama AS kegiatan_nama, psk.created_at
    FROM puskesmas_sub_kegiatan psk
    JOIN sub_kegiatan sk ON sk.id = psk.sub_kegiatan_id
    JOIN kegiatan k ON k.id = sk.kegiatan_id
"#;

fn dedup(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids.dedup();
    ids
}

/// Which sub kegiatan each clinic may report against
pub struct PuskesmasConfigService {
    pool: PgPool,
}

impl PuskesmasConfigService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<PuskesmasSubKegiatan>, ApiError> {
        let mut conn = self.pool.acquire().await?;
        ensure_clinic(&mut conn, user_id).await?;

        let sql = format!("{} WHERE psk.user_id = $1 ORDER BY k.kode, sk.kode", ASSIGNMENT_SELECT);
        Ok(sqlx::query_as(&sql).bind(user_id).fetch_all(&mut *conn).await?)
    }

    /// Add assignments; pairs that already exist are left as they are.
    pub async fn add(&self, input: AssignInput) -> Result<u64, ApiError> {
        let ids = dedup(input.sub_kegiatan_ids);
        if ids.is_empty() {
            return Err(ApiError::missing_fields(&["sub_kegiatan_ids"]));
        }

        let mut tx = self.pool.begin().await?;
        ensure_clinic(&mut tx, input.user_id).await?;
        ensure_sub_kegiatan(&mut tx, &ids).await?;
        let added = insert_assignments(&mut tx, input.user_id, &ids).await?;
        tx.commit().await?;

        info!("Assigned {} sub kegiatan to {}", added, input.user_id);
        Ok(added)
    }

    /// Replace the clinic's whole assignment set in one transaction.
    pub async fn replace(&self, user_id: Uuid, input: ReplaceInput) -> Result<Vec<PuskesmasSubKegiatan>, ApiError> {
        let ids = dedup(input.sub_kegiatan_ids);

        let mut tx = self.pool.begin().await?;
        ensure_clinic(&mut tx, user_id).await?;
        ensure_sub_kegiatan(&mut tx, &ids).await?;

        sqlx::query("DELETE FROM puskesmas_sub_kegiatan WHERE user_id = $1 AND NOT (sub_kegiatan_id = ANY($2))")
            .bind(user_id)
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        insert_assignments(&mut tx, user_id, &ids).await?;
        tx.commit().await?;

        info!("Replaced assignments of {} with {} sub kegiatan", user_id, ids.len());
        self.list(user_id).await
    }

    pub async fn remove(&self, user_id: Uuid, sub_kegiatan_id: Uuid) -> Result<(), ApiError> {
        let removed = sqlx::query("DELETE FROM puskesmas_sub_kegiatan WHERE user_id = $1 AND sub_kegiatan_id = $2")
            .bind(user_id)
            .bind(sub_kegiatan_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(ApiError::not_found("Assignment not found"));
        }
        info!("Removed sub kegiatan {} from {}", sub_kegiatan_id, user_id);
        Ok(())
    }
}

async fn ensure_clinic(conn: &mut PgConnection, user_id: Uuid) -> Result<(), ApiError> {
    let role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    match role {
        None => Err(ApiError::not_found("User not found")),
        Some(Role::Admin) => Err(ApiError::bad_request("Sub kegiatan can only be assigned to puskesmas accounts")),
        Some(Role::Puskesmas) => Ok(()),
    }
}

async fn ensure_sub_kegiatan(conn: &mut PgConnection, ids: &[Uuid]) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sub_kegiatan WHERE id = ANY($1)")
        .bind(ids)
        .fetch_one(conn)
        .await?;
    if found as usize != ids.len() {
        return Err(ApiError::not_found("One or more sub kegiatan were not found"));
    }
    Ok(())
}

async fn insert_assignments(conn: &mut PgConnection, user_id: Uuid, ids: &[Uuid]) -> Result<u64, ApiError> {
    let mut added = 0;
    for sub_kegiatan_id in ids {
        added += sqlx::query(
            "INSERT INTO puskesmas_sub_kegiatan (id, user_id, sub_kegiatan_id) VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_puskesmas_sub_kegiatan DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(sub_kegiatan_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_collapse() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = dedup(vec![a, b, a, a]);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a) && ids.contains(&b));
    }

    #[test]
    fn assign_body_defaults_to_empty_list() {
        let input: AssignInput = serde_json::from_value(serde_json::json!({
            "user_id": "6f1c1f8e-4b36-4c9c-9d43-2f6c1b1f0a11"
        }))
        .unwrap();
        assert!(input.sub_kegiatan_ids.is_empty());
    }
}

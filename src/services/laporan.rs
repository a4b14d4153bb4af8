use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::models::laporan::LAPORAN_DETAIL_SELECT;
use crate::database::models::{Laporan, LaporanDetail, LaporanView};
use crate::database::{LaporanFilter, Page, Paginated};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::policy;
use crate::services::workflow;
use crate::types::{Bulan, LaporanStatus};

/// Body of `POST /api/laporan`, `PUT /api/laporan/:id` and each bulk item.
///
/// Everything is optional so one type serves create (required fields are
/// checked in [`LaporanPayload::into_new`]) and partial update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LaporanPayload {
    /// Only honoured for admin callers
    pub user_id: Option<Uuid>,
    pub sub_kegiatan_id: Option<Uuid>,
    pub sumber_anggaran_id: Option<Uuid>,
    pub satuan_id: Option<Uuid>,
    pub bulan: Option<Bulan>,
    pub tahun: Option<i32>,
    pub target_k: Option<Decimal>,
    pub realisasi_k: Option<Decimal>,
    pub angkas: Option<Decimal>,
    pub target_rp: Option<Decimal>,
    pub realisasi_rp: Option<Decimal>,
    pub permasalahan: Option<String>,
    pub upaya: Option<String>,
    /// Only honoured for admin callers
    pub status: Option<LaporanStatus>,
    /// Only honoured for admin callers
    pub catatan: Option<String>,
}

/// A validated row ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewLaporan {
    pub user_id: Uuid,
    pub sub_kegiatan_id: Uuid,
    pub sumber_anggaran_id: Uuid,
    pub satuan_id: Uuid,
    pub bulan: Bulan,
    pub tahun: i32,
    pub target_k: Decimal,
    pub realisasi_k: Decimal,
    pub angkas: Decimal,
    pub target_rp: Decimal,
    pub realisasi_rp: Decimal,
    pub permasalahan: Option<String>,
    pub upaya: Option<String>,
}

const MIN_TAHUN: i32 = 2000;
const MAX_TAHUN: i32 = 2100;
/// Amounts are stored as NUMERIC(18, 2): sixteen integer digits.
const AMOUNT_LIMIT: Decimal = Decimal::from_parts(0x6FC1_0000, 0x0023_86F2, 0, false, 0);

impl LaporanPayload {
    pub fn into_new(self, user_id: Uuid) -> Result<NewLaporan, ApiError> {
        let (sub_kegiatan_id, sumber_anggaran_id, satuan_id, bulan, tahun) = match (
            self.sub_kegiatan_id,
            self.sumber_anggaran_id,
            self.satuan_id,
            self.bulan,
            self.tahun,
        ) {
            (Some(sk), Some(sa), Some(s), Some(b), Some(t)) => (sk, sa, s, b, t),
            (sk, sa, s, b, t) => {
                let mut missing = Vec::new();
                if sk.is_none() {
                    missing.push("sub_kegiatan_id");
                }
                if sa.is_none() {
                    missing.push("sumber_anggaran_id");
                }
                if s.is_none() {
                    missing.push("satuan_id");
                }
                if b.is_none() {
                    missing.push("bulan");
                }
                if t.is_none() {
                    missing.push("tahun");
                }
                return Err(ApiError::missing_fields(&missing));
            }
        };

        let row = NewLaporan {
            user_id,
            sub_kegiatan_id,
            sumber_anggaran_id,
            satuan_id,
            bulan,
            tahun,
            target_k: self.target_k.unwrap_or_default(),
            realisasi_k: self.realisasi_k.unwrap_or_default(),
            angkas: self.angkas.unwrap_or_default(),
            target_rp: self.target_rp.unwrap_or_default(),
            realisasi_rp: self.realisasi_rp.unwrap_or_default(),
            permasalahan: self.permasalahan,
            upaya: self.upaya,
        };
        validate_figures(&row)?;
        Ok(row)
    }
}

fn validate_figures(row: &NewLaporan) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    if !(MIN_TAHUN..=MAX_TAHUN).contains(&row.tahun) {
        field_errors.insert(
            "tahun".to_string(),
            format!("Must be between {} and {}", MIN_TAHUN, MAX_TAHUN),
        );
    }
    for (field, value) in [
        ("target_k", row.target_k),
        ("realisasi_k", row.realisasi_k),
        ("angkas", row.angkas),
        ("target_rp", row.target_rp),
        ("realisasi_rp", row.realisasi_rp),
    ] {
        if value.is_sign_negative() && !value.is_zero() {
            field_errors.insert(field.to_string(), "Must not be negative".to_string());
        } else if value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) >= AMOUNT_LIMIT {
            field_errors.insert(field.to_string(), format!("Must be less than {}", AMOUNT_LIMIT));
        }
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Invalid report values", Some(field_errors)))
    }
}

/// Report rows: listing, CRUD and the clinic submit action
pub struct LaporanService {
    pool: PgPool,
}

impl LaporanService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &LaporanFilter, page: Page) -> Result<Paginated<LaporanView>, ApiError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM laporan l");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(LAPORAN_DETAIL_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY l.tahun DESC, l.bulan DESC, k.kode, sk.kode, sa.nama LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<LaporanDetail>().fetch_all(&self.pool).await?;

        debug!("Listed {} of {} reports", rows.len(), total);
        Ok(Paginated {
            items: rows.into_iter().map(LaporanView::from).collect(),
            pagination: page.meta(total),
        })
    }

    /// Every matching row in report order (clinic, kegiatan, sub kegiatan, funding source).
    pub async fn list_all(&self, filter: &LaporanFilter) -> Result<Vec<LaporanView>, ApiError> {
        let mut qb = QueryBuilder::<Postgres>::new(LAPORAN_DETAIL_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY u.nama_puskesmas, u.username, l.tahun, l.bulan, k.kode, sk.kode, sa.nama");
        let rows = qb.build_query_as::<LaporanDetail>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LaporanView::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<LaporanView, ApiError> {
        let sql = format!("{} WHERE l.id = $1", LAPORAN_DETAIL_SELECT);
        sqlx::query_as::<_, LaporanDetail>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LaporanView::from)
            .ok_or_else(|| ApiError::not_found("Laporan not found"))
    }

    /// Fetch a row the caller is allowed to see.
    pub async fn get_for(&self, user: &AuthUser, id: Uuid) -> Result<LaporanView, ApiError> {
        let view = self.get(id).await?;
        policy::ensure_owner_or_admin(user, view.detail.laporan.user_id)?;
        Ok(view)
    }

    pub async fn create(&self, user: &AuthUser, payload: LaporanPayload) -> Result<LaporanView, ApiError> {
        let mut tx = self.pool.begin().await?;
        let id = insert_checked(&mut tx, user, payload).await?;
        tx.commit().await?;

        info!("User '{}' created laporan {}", user.username, id);
        self.get(id).await
    }

    /// All-or-nothing insert of several rows; returns how many were created.
    pub async fn create_bulk(&self, user: &AuthUser, items: Vec<LaporanPayload>) -> Result<usize, ApiError> {
        if items.is_empty() {
            return Err(ApiError::bad_request("No reports to create"));
        }

        let mut tx = self.pool.begin().await?;
        let total = items.len();
        for (index, item) in items.into_iter().enumerate() {
            insert_checked(&mut tx, user, item).await.map_err(|e| match e {
                ApiError::InternalServerError { .. } => e,
                other => prefix_item_error(index, other),
            })?;
        }
        tx.commit().await?;

        info!("User '{}' bulk created {} laporan", user.username, total);
        Ok(total)
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, payload: LaporanPayload) -> Result<LaporanView, ApiError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Laporan>("SELECT * FROM laporan WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Laporan not found"))?;

        policy::ensure_owner_or_admin(user, current.user_id)?;
        policy::ensure_editable(user, current.status)?;

        let (status, catatan) = if user.is_admin() {
            (payload.status.unwrap_or(current.status), payload.catatan.clone().or(current.catatan.clone()))
        } else {
            // an owner edit always goes back to a saved draft
            (LaporanStatus::Tersimpan, current.catatan.clone())
        };

        let merged = NewLaporan {
            user_id: current.user_id,
            sub_kegiatan_id: payload.sub_kegiatan_id.unwrap_or(current.sub_kegiatan_id),
            sumber_anggaran_id: payload.sumber_anggaran_id.unwrap_or(current.sumber_anggaran_id),
            satuan_id: payload.satuan_id.unwrap_or(current.satuan_id),
            bulan: payload.bulan.unwrap_or(current.bulan),
            tahun: payload.tahun.unwrap_or(current.tahun),
            target_k: payload.target_k.unwrap_or(current.target_k),
            realisasi_k: payload.realisasi_k.unwrap_or(current.realisasi_k),
            angkas: payload.angkas.unwrap_or(current.angkas),
            target_rp: payload.target_rp.unwrap_or(current.target_rp),
            realisasi_rp: payload.realisasi_rp.unwrap_or(current.realisasi_rp),
            permasalahan: payload.permasalahan.or(current.permasalahan),
            upaya: payload.upaya.or(current.upaya),
        };
        validate_figures(&merged)?;

        if merged.sub_kegiatan_id != current.sub_kegiatan_id
            || merged.sumber_anggaran_id != current.sumber_anggaran_id
            || merged.satuan_id != current.satuan_id
        {
            check_references(&mut tx, user, &merged).await?;
        }

        sqlx::query(
            r#"
            UPDATE laporan SET
                sub_kegiatan_id = $2, sumber_anggaran_id = $3, satuan_id = $4,
                bulan = $5, tahun = $6,
                target_k = $7, realisasi_k = $8, angkas = $9, target_rp = $10, realisasi_rp = $11,
                permasalahan = $12, upaya = $13, status = $14, catatan = $15,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(merged.sub_kegiatan_id)
        .bind(merged.sumber_anggaran_id)
        .bind(merged.satuan_id)
        .bind(merged.bulan)
        .bind(merged.tahun)
        .bind(merged.target_k)
        .bind(merged.realisasi_k)
        .bind(merged.angkas)
        .bind(merged.target_rp)
        .bind(merged.realisasi_rp)
        .bind(&merged.permasalahan)
        .bind(&merged.upaya)
        .bind(status)
        .bind(&catatan)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("User '{}' updated laporan {} (status {})", user.username, id, status);
        self.get(id).await
    }

    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Laporan>("SELECT * FROM laporan WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Laporan not found"))?;

        policy::ensure_owner_or_admin(user, current.user_id)?;
        policy::ensure_editable(user, current.status)?;

        sqlx::query("DELETE FROM laporan WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("User '{}' deleted laporan {}", user.username, id);
        Ok(())
    }

    /// Move the caller's saved rows for one month to `terkirim`.
    ///
    /// The scope rows are locked first so two concurrent submits serialize
    /// and the second one sees the first one's `terkirim` rows.
    pub async fn submit(&self, user: &AuthUser, bulan: Bulan, tahun: i32) -> Result<u64, ApiError> {
        let mut tx = self.pool.begin().await?;

        let statuses: Vec<LaporanStatus> = sqlx::query_scalar(
            "SELECT status FROM laporan WHERE user_id = $1 AND bulan = $2 AND tahun = $3 FOR UPDATE",
        )
        .bind(user.id)
        .bind(bulan)
        .bind(tahun)
        .fetch_all(&mut *tx)
        .await?;

        workflow::plan_submit(&statuses, bulan, tahun)?;

        let updated = sqlx::query(
            "UPDATE laporan SET status = $4, updated_at = NOW() \
             WHERE user_id = $1 AND bulan = $2 AND tahun = $3 AND status = $5",
        )
        .bind(user.id)
        .bind(bulan)
        .bind(tahun)
        .bind(LaporanStatus::Terkirim)
        .bind(LaporanStatus::Tersimpan)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        tx.commit().await?;

        info!("User '{}' submitted {} laporan for {} {}", user.username, updated, bulan, tahun);
        Ok(updated)
    }
}

fn prefix_item_error(index: usize, err: ApiError) -> ApiError {
    let message = format!("Item {}: {}", index + 1, err.message());
    match err {
        ApiError::ValidationError { field_errors, .. } => ApiError::validation_error(message, field_errors),
        ApiError::Forbidden(_) => ApiError::forbidden(message),
        ApiError::NotFound(_) => ApiError::not_found(message),
        ApiError::Conflict(_) => ApiError::conflict(message),
        _ => ApiError::bad_request(message),
    }
}

/// Validate one payload for `user` and insert it inside the caller's transaction.
async fn insert_checked(conn: &mut PgConnection, user: &AuthUser, payload: LaporanPayload) -> Result<Uuid, ApiError> {
    let owner = if user.is_admin() {
        payload.user_id.ok_or_else(|| ApiError::missing_fields(&["user_id"]))?
    } else {
        user.id
    };
    let row = payload.into_new(owner)?;

    if user.is_admin() {
        let is_clinic: Option<bool> =
            sqlx::query_scalar("SELECT role = 'puskesmas' FROM users WHERE id = $1")
                .bind(owner)
                .fetch_optional(&mut *conn)
                .await?;
        match is_clinic {
            None => return Err(ApiError::not_found("User not found")),
            Some(false) => return Err(ApiError::bad_request("Reports can only belong to puskesmas accounts")),
            Some(true) => {}
        }
    }

    check_references(conn, user, &row).await?;

    let duplicate: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM laporan \
         WHERE user_id = $1 AND sub_kegiatan_id = $2 AND sumber_anggaran_id = $3 AND bulan = $4 AND tahun = $5)",
    )
    .bind(row.user_id)
    .bind(row.sub_kegiatan_id)
    .bind(row.sumber_anggaran_id)
    .bind(row.bulan)
    .bind(row.tahun)
    .fetch_one(&mut *conn)
    .await?;
    if duplicate {
        return Err(ApiError::conflict(format!(
            "A report for this sub kegiatan and sumber anggaran already exists for {} {}",
            row.bulan, row.tahun
        )));
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO laporan (
            id, user_id, sub_kegiatan_id, sumber_anggaran_id, satuan_id, bulan, tahun,
            target_k, realisasi_k, angkas, target_rp, realisasi_rp, permasalahan, upaya, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(id)
    .bind(row.user_id)
    .bind(row.sub_kegiatan_id)
    .bind(row.sumber_anggaran_id)
    .bind(row.satuan_id)
    .bind(row.bulan)
    .bind(row.tahun)
    .bind(row.target_k)
    .bind(row.realisasi_k)
    .bind(row.angkas)
    .bind(row.target_rp)
    .bind(row.realisasi_rp)
    .bind(&row.permasalahan)
    .bind(&row.upaya)
    .bind(LaporanStatus::Tersimpan)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

async fn exists(conn: &mut PgConnection, table: &str, id: Uuid) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table);
    sqlx::query_scalar(&sql).bind(id).fetch_one(conn).await
}

/// Referenced rows exist (404), the clinic is assigned the sub kegiatan (403)
/// and the funding source is active for it (400).
async fn check_references(conn: &mut PgConnection, user: &AuthUser, row: &NewLaporan) -> Result<(), ApiError> {
    for (table, id, label) in [
        ("sub_kegiatan", row.sub_kegiatan_id, "Sub kegiatan"),
        ("sumber_anggaran", row.sumber_anggaran_id, "Sumber anggaran"),
        ("satuan", row.satuan_id, "Satuan"),
    ] {
        if !exists(&mut *conn, table, id).await? {
            return Err(ApiError::not_found(format!("{} not found", label)));
        }
    }

    if !user.is_admin() {
        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM puskesmas_sub_kegiatan WHERE user_id = $1 AND sub_kegiatan_id = $2)",
        )
        .bind(row.user_id)
        .bind(row.sub_kegiatan_id)
        .fetch_one(&mut *conn)
        .await?;
        if !assigned {
            tracing::warn!("User '{}' reported on unassigned sub kegiatan {}", user.username, row.sub_kegiatan_id);
            return Err(ApiError::forbidden("This sub kegiatan is not assigned to your puskesmas"));
        }
    }

    let funded: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sub_kegiatan_sumber_anggaran \
         WHERE sub_kegiatan_id = $1 AND sumber_anggaran_id = $2 AND is_active)",
    )
    .bind(row.sub_kegiatan_id)
    .bind(row.sumber_anggaran_id)
    .fetch_one(&mut *conn)
    .await?;
    if !funded {
        return Err(ApiError::bad_request(
            "This sumber anggaran is not active for the selected sub kegiatan",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> LaporanPayload {
        LaporanPayload {
            sub_kegiatan_id: Some(Uuid::new_v4()),
            sumber_anggaran_id: Some(Uuid::new_v4()),
            satuan_id: Some(Uuid::new_v4()),
            bulan: Some(Bulan::Januari),
            tahun: Some(2025),
            target_k: Some(Decimal::from(100)),
            realisasi_k: Some(Decimal::from(50)),
            ..Default::default()
        }
    }

    #[test]
    fn missing_fields_are_listed() {
        let err = LaporanPayload {
            satuan_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
        .into_new(Uuid::new_v4())
        .unwrap_err();

        let body = err.to_json();
        assert_eq!(err.status_code(), 400);
        for field in ["sub_kegiatan_id", "sumber_anggaran_id", "bulan", "tahun"] {
            assert_eq!(body["field_errors"][field], "This field is required");
        }
        assert!(body["field_errors"].get("satuan_id").is_none());
    }

    #[test]
    fn unspecified_figures_default_to_zero() {
        let owner = Uuid::new_v4();
        let row = complete().into_new(owner).unwrap();
        assert_eq!(row.user_id, owner);
        assert_eq!(row.target_rp, Decimal::ZERO);
        assert_eq!(row.realisasi_k, Decimal::from(50));
    }

    #[test]
    fn negative_figures_and_bad_year_are_rejected() {
        let err = LaporanPayload {
            tahun: Some(1999),
            realisasi_rp: Some(Decimal::from(-1)),
            ..complete()
        }
        .into_new(Uuid::new_v4())
        .unwrap_err();

        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"].get("tahun").is_some());
        assert!(body["field_errors"].get("realisasi_rp").is_some());
    }

    #[test]
    fn amounts_beyond_column_precision_are_rejected() {
        assert_eq!(AMOUNT_LIMIT, Decimal::from(10_000_000_000_000_000_i64));

        let err = LaporanPayload {
            target_rp: Some("10000000000000000".parse().unwrap()),
            angkas: Some("9999999999999999.995".parse().unwrap()),
            ..complete()
        }
        .into_new(Uuid::new_v4())
        .unwrap_err();
        let body = err.to_json();
        assert_eq!(err.status_code(), 400);
        assert!(body["field_errors"].get("target_rp").is_some());
        assert!(body["field_errors"].get("angkas").is_some());

        let ok = LaporanPayload {
            target_rp: Some("9999999999999999.99".parse().unwrap()),
            ..complete()
        }
        .into_new(Uuid::new_v4());
        assert!(ok.is_ok());
    }

    #[test]
    fn payload_accepts_numbers_and_strings() {
        let payload: LaporanPayload = serde_json::from_value(serde_json::json!({
            "bulan": "Maret",
            "tahun": 2025,
            "target_k": 12,
            "target_rp": "1500000.50"
        }))
        .unwrap();
        assert_eq!(payload.bulan, Some(Bulan::Maret));
        assert_eq!(payload.target_k, Some(Decimal::from(12)));
        assert_eq!(payload.target_rp, Some("1500000.50".parse().unwrap()));
    }

    #[test]
    fn bulk_item_errors_name_the_item() {
        let err = prefix_item_error(2, ApiError::forbidden("not assigned"));
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "Item 3: not assigned");
    }
}

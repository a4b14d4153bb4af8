use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::database::models::LaporanView;
use crate::database::{LaporanFilter, Page, Paginated};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::report::{
    HasTotals, MonthlyAggregate, ReportService, StatusCounts, SumberAnggaranAggregate, Totals, WithCapaian,
    STATUS_COUNTS_SELECT, TOTALS_SELECT,
};
use crate::services::{workflow, LaporanService};
use crate::types::{Bulan, LaporanStatus};

/// One clinic-month in the verification queue
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VerificationGroup {
    pub user_id: Uuid,
    pub username: String,
    pub nama_puskesmas: Option<String>,
    pub kecamatan: Option<String>,
    pub bulan: Bulan,
    pub tahun: i32,
    pub last_update: DateTime<Utc>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: Totals,
    #[sqlx(flatten)]
    pub status: StatusCounts,
}

impl HasTotals for VerificationGroup {
    fn totals(&self) -> &Totals {
        &self.totals
    }
}

/// The (clinic, month, year) a bulk action applies to
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Scope {
    pub user_id: Uuid,
    pub bulan: Bulan,
    pub tahun: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub tahun: Option<i32>,
    pub bulan: Option<Bulan>,
    pub jumlah_puskesmas: i64,
    pub puskesmas_melapor: i64,
    pub totals: WithCapaian<Totals>,
    pub status: StatusCounts,
    pub bulanan: Vec<WithCapaian<MonthlyAggregate>>,
    pub sumber_anggaran: Vec<WithCapaian<SumberAnggaranAggregate>>,
}

/// Admin review of submitted reports
pub struct AdminService {
    pool: PgPool,
}

impl AdminService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Clinic-months that hold at least one row in `status`, newest activity first.
    pub async fn verification_queue(
        &self,
        status: LaporanStatus,
        bulan: Option<Bulan>,
        tahun: Option<i32>,
        page: Page,
    ) -> Result<Paginated<WithCapaian<VerificationGroup>>, ApiError> {
        let filter = LaporanFilter {
            bulan,
            tahun,
            ..Default::default()
        };
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM (SELECT l.user_id FROM laporan l");
        filter.push_where(&mut count);
        push_queue_grouping(&mut count, status);
        count.push(") g");
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT l.user_id, MAX(u.username) AS username, MAX(u.nama_puskesmas) AS nama_puskesmas, \
             MAX(u.kecamatan) AS kecamatan, l.bulan, l.tahun, MAX(l.updated_at) AS last_update, ",
        );
        qb.push(TOTALS_SELECT).push(", ").push(STATUS_COUNTS_SELECT);
        qb.push(" FROM laporan l JOIN users u ON u.id = l.user_id");
        filter.push_where(&mut qb);
        push_queue_grouping(&mut qb, status);
        qb.push(" ORDER BY MAX(l.updated_at) DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<VerificationGroup>().fetch_all(&self.pool).await?;
        Ok(Paginated {
            items: rows.into_iter().map(WithCapaian::from).collect(),
            pagination: page.meta(total),
        })
    }

    /// Every row of one clinic-month
    pub async fn group_detail(&self, scope: Scope) -> Result<Vec<LaporanView>, ApiError> {
        let filter = LaporanFilter {
            user_id: Some(scope.user_id),
            bulan: Some(scope.bulan),
            tahun: Some(scope.tahun),
            ..Default::default()
        };
        LaporanService::new(self.pool.clone()).list_all(&filter).await
    }

    /// Verify or reject a single submitted row.
    pub async fn review(
        &self,
        admin: &AuthUser,
        id: Uuid,
        outcome: LaporanStatus,
        catatan: Option<String>,
    ) -> Result<LaporanView, ApiError> {
        let mut tx = self.pool.begin().await?;

        let current: LaporanStatus = sqlx::query_scalar("SELECT status FROM laporan WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Laporan not found"))?;

        workflow::check_review(current, outcome)?;

        sqlx::query("UPDATE laporan SET status = $2, catatan = $3, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(outcome)
            .bind(&catatan)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Admin '{}' set laporan {} to {}", admin.username, id, outcome);
        LaporanService::new(self.pool.clone()).get(id).await
    }

    /// Verify or reject every submitted row of a clinic-month.
    pub async fn bulk_review(
        &self,
        admin: &AuthUser,
        scope: Scope,
        outcome: LaporanStatus,
        catatan: Option<String>,
    ) -> Result<u64, ApiError> {
        if !outcome.is_review_outcome() {
            return Err(workflow::WorkflowError::InvalidOutcome(outcome).into());
        }
        let updated = self.transition_submitted(scope, outcome, catatan).await?;
        info!(
            "Admin '{}' set {} laporan of {} for {} {} to {}",
            admin.username, updated, scope.user_id, scope.bulan, scope.tahun, outcome
        );
        Ok(updated)
    }

    /// Send every submitted row of a clinic-month back to draft with a note.
    pub async fn bulk_return(&self, admin: &AuthUser, scope: Scope, catatan: Option<String>) -> Result<u64, ApiError> {
        let updated = self
            .transition_submitted(scope, LaporanStatus::Tersimpan, catatan)
            .await?;
        info!(
            "Admin '{}' returned {} laporan of {} for {} {}",
            admin.username, updated, scope.user_id, scope.bulan, scope.tahun
        );
        Ok(updated)
    }

    async fn transition_submitted(
        &self,
        scope: Scope,
        to: LaporanStatus,
        catatan: Option<String>,
    ) -> Result<u64, ApiError> {
        let mut tx = self.pool.begin().await?;

        let statuses: Vec<LaporanStatus> = sqlx::query_scalar(
            "SELECT status FROM laporan WHERE user_id = $1 AND bulan = $2 AND tahun = $3 FOR UPDATE",
        )
        .bind(scope.user_id)
        .bind(scope.bulan)
        .bind(scope.tahun)
        .fetch_all(&mut *tx)
        .await?;

        workflow::plan_bulk_from_submitted(&statuses, scope.bulan, scope.tahun)?;

        let updated = sqlx::query(
            "UPDATE laporan SET status = $4, catatan = $5, updated_at = NOW() \
             WHERE user_id = $1 AND bulan = $2 AND tahun = $3 AND status = $6",
        )
        .bind(scope.user_id)
        .bind(scope.bulan)
        .bind(scope.tahun)
        .bind(to)
        .bind(&catatan)
        .bind(LaporanStatus::Terkirim)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        tx.commit().await?;

        Ok(updated)
    }

    pub async fn dashboard(&self, tahun: Option<i32>, bulan: Option<Bulan>) -> Result<Dashboard, ApiError> {
        let filter = LaporanFilter {
            tahun,
            bulan,
            ..Default::default()
        };
        let reports = ReportService::new(self.pool.clone());

        let jumlah_puskesmas: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'puskesmas' AND is_active")
                .fetch_one(&self.pool)
                .await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(DISTINCT l.user_id) FROM laporan l");
        filter.push_where(&mut qb);
        let puskesmas_melapor: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;

        let (totals, status) = reports.overall(&filter).await?;
        // the monthly series always covers the whole year
        let yearly = LaporanFilter { bulan: None, ..filter.clone() };
        let bulanan = reports.monthly(&yearly).await?;
        let sumber_anggaran = reports.by_sumber_anggaran(&filter).await?;

        Ok(Dashboard {
            tahun,
            bulan,
            jumlah_puskesmas,
            puskesmas_melapor,
            totals,
            status,
            bulanan,
            sumber_anggaran,
        })
    }
}

fn push_queue_grouping(qb: &mut QueryBuilder<'_, Postgres>, status: LaporanStatus) {
    qb.push(" GROUP BY l.user_id, l.bulan, l.tahun HAVING COUNT(l.id) FILTER (WHERE l.status = ")
        .push_bind(status)
        .push(") > 0");
}

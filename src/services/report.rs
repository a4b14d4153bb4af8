use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::capaian::capaian;
use crate::database::{DatabaseError, LaporanFilter};
use crate::types::Bulan;

/// Summed figures of a group of report rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct Totals {
    pub jumlah_laporan: i64,
    pub target_k: Decimal,
    pub realisasi_k: Decimal,
    pub angkas: Decimal,
    pub target_rp: Decimal,
    pub realisasi_rp: Decimal,
}

pub const TOTALS_SELECT: &str = "COUNT(l.id) AS jumlah_laporan, \
     COALESCE(SUM(l.target_k), 0) AS target_k, \
     COALESCE(SUM(l.realisasi_k), 0) AS realisasi_k, \
     COALESCE(SUM(l.angkas), 0) AS angkas, \
     COALESCE(SUM(l.target_rp), 0) AS target_rp, \
     COALESCE(SUM(l.realisasi_rp), 0) AS realisasi_rp";

/// Per-status row counts of a group
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct StatusCounts {
    pub menunggu: i64,
    pub tersimpan: i64,
    pub terkirim: i64,
    pub diverifikasi: i64,
    pub ditolak: i64,
}

pub const STATUS_COUNTS_SELECT: &str = "COUNT(l.id) FILTER (WHERE l.status = 'menunggu') AS menunggu, \
     COUNT(l.id) FILTER (WHERE l.status = 'tersimpan') AS tersimpan, \
     COUNT(l.id) FILTER (WHERE l.status = 'terkirim') AS terkirim, \
     COUNT(l.id) FILTER (WHERE l.status = 'diverifikasi') AS diverifikasi, \
     COUNT(l.id) FILTER (WHERE l.status = 'ditolak') AS ditolak";

/// Group rows expose their totals so percentages can be derived uniformly
pub trait HasTotals {
    fn totals(&self) -> &Totals;
}

impl HasTotals for Totals {
    fn totals(&self) -> &Totals {
        self
    }
}

/// A group row plus `capaian_k` / `capaian_pagu` derived from its totals
#[derive(Debug, Clone, Serialize)]
pub struct WithCapaian<G: Serialize> {
    #[serde(flatten)]
    pub group: G,
    pub capaian_k: Decimal,
    pub capaian_pagu: Decimal,
}

impl<G: Serialize + HasTotals> From<G> for WithCapaian<G> {
    fn from(group: G) -> Self {
        let totals = group.totals();
        let capaian_k = capaian(totals.realisasi_k, totals.target_k);
        let capaian_pagu = capaian(totals.realisasi_rp, totals.target_rp);
        Self {
            group,
            capaian_k,
            capaian_pagu,
        }
    }
}

fn with_capaian<G: Serialize + HasTotals>(rows: Vec<G>) -> Vec<WithCapaian<G>> {
    rows.into_iter().map(WithCapaian::from).collect()
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubKegiatanAggregate {
    pub sub_kegiatan_id: Uuid,
    pub sub_kegiatan_kode: String,
    pub sub_kegiatan_nama: String,
    pub kegiatan_nama: String,
    pub bulan: Bulan,
    pub tahun: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SumberAnggaranAggregate {
    pub sumber_anggaran_id: Uuid,
    pub sumber_anggaran_nama: String,
    pub bulan: Bulan,
    pub tahun: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PuskesmasAggregate {
    pub user_id: Uuid,
    pub username: String,
    pub nama_puskesmas: Option<String>,
    pub kecamatan: Option<String>,
    pub bulan: Bulan,
    pub tahun: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: Totals,
    #[sqlx(flatten)]
    pub status: StatusCounts,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyAggregate {
    pub bulan: Bulan,
    pub tahun: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: Totals,
    #[sqlx(flatten)]
    pub status: StatusCounts,
}

macro_rules! impl_has_totals {
    ($($ty:ty),*) => {
        $(impl HasTotals for $ty {
            fn totals(&self) -> &Totals {
                &self.totals
            }
        })*
    };
}

impl_has_totals!(SubKegiatanAggregate, SumberAnggaranAggregate, PuskesmasAggregate, MonthlyAggregate);

/// SUM/COUNT aggregates over report rows
pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grouped by (sub kegiatan, bulan, tahun)
    pub async fn by_sub_kegiatan(
        &self,
        filter: &LaporanFilter,
    ) -> Result<Vec<WithCapaian<SubKegiatanAggregate>>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT sk.id AS sub_kegiatan_id, sk.kode AS sub_kegiatan_kode, sk.nama AS sub_kegiatan_nama, \
             k.nama AS kegiatan_nama, l.bulan, l.tahun, ",
        );
        qb.push(TOTALS_SELECT);
        qb.push(
            " FROM laporan l \
             JOIN sub_kegiatan sk ON sk.id = l.sub_kegiatan_id \
             JOIN kegiatan k ON k.id = sk.kegiatan_id",
        );
        filter.push_where(&mut qb);
        qb.push(
            " GROUP BY sk.id, sk.kode, sk.nama, k.kode, k.nama, l.bulan, l.tahun \
             ORDER BY l.tahun, l.bulan, k.kode, sk.kode",
        );

        let rows = qb.build_query_as::<SubKegiatanAggregate>().fetch_all(&self.pool).await?;
        Ok(with_capaian(rows))
    }

    /// Grouped by (sumber anggaran, bulan, tahun)
    pub async fn by_sumber_anggaran(
        &self,
        filter: &LaporanFilter,
    ) -> Result<Vec<WithCapaian<SumberAnggaranAggregate>>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT sa.id AS sumber_anggaran_id, sa.nama AS sumber_anggaran_nama, l.bulan, l.tahun, ",
        );
        qb.push(TOTALS_SELECT);
        qb.push(" FROM laporan l JOIN sumber_anggaran sa ON sa.id = l.sumber_anggaran_id");
        filter.push_where(&mut qb);
        qb.push(" GROUP BY sa.id, sa.nama, l.bulan, l.tahun ORDER BY l.tahun, l.bulan, sa.nama");

        let rows = qb.build_query_as::<SumberAnggaranAggregate>().fetch_all(&self.pool).await?;
        Ok(with_capaian(rows))
    }

    /// Grouped by (puskesmas, bulan, tahun), with status counts
    pub async fn by_puskesmas(
        &self,
        filter: &LaporanFilter,
    ) -> Result<Vec<WithCapaian<PuskesmasAggregate>>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT u.id AS user_id, u.username, u.nama_puskesmas, u.kecamatan, l.bulan, l.tahun, ",
        );
        qb.push(TOTALS_SELECT).push(", ").push(STATUS_COUNTS_SELECT);
        qb.push(" FROM laporan l JOIN users u ON u.id = l.user_id");
        filter.push_where(&mut qb);
        qb.push(
            " GROUP BY u.id, u.username, u.nama_puskesmas, u.kecamatan, l.bulan, l.tahun \
             ORDER BY l.tahun, l.bulan, u.nama_puskesmas",
        );

        let rows = qb.build_query_as::<PuskesmasAggregate>().fetch_all(&self.pool).await?;
        Ok(with_capaian(rows))
    }

    /// Grouped by (bulan, tahun), calendar order
    pub async fn monthly(&self, filter: &LaporanFilter) -> Result<Vec<WithCapaian<MonthlyAggregate>>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT l.bulan, l.tahun, ");
        qb.push(TOTALS_SELECT).push(", ").push(STATUS_COUNTS_SELECT);
        qb.push(" FROM laporan l");
        filter.push_where(&mut qb);
        qb.push(" GROUP BY l.bulan, l.tahun ORDER BY l.tahun, l.bulan");

        let rows = qb.build_query_as::<MonthlyAggregate>().fetch_all(&self.pool).await?;
        Ok(with_capaian(rows))
    }

    /// Whole-scope totals and status counts
    pub async fn overall(&self, filter: &LaporanFilter) -> Result<(WithCapaian<Totals>, StatusCounts), DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(TOTALS_SELECT).push(" FROM laporan l");
        filter.push_where(&mut qb);
        let totals = qb.build_query_as::<Totals>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(STATUS_COUNTS_SELECT).push(" FROM laporan l");
        filter.push_where(&mut qb);
        let status = qb.build_query_as::<StatusCounts>().fetch_one(&self.pool).await?;

        Ok((totals.into(), status))
    }
}

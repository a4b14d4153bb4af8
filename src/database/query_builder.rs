use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config;
use crate::types::{Bulan, LaporanStatus};

/// Page/limit request parameters, clamped to configured bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let api = &config::config().api;
        Self::clamped(page, limit, api.default_page_size, api.max_page_size)
    }

    fn clamped(page: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> Self {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .min(max_limit)
            .max(1);
        // keep (page - 1) * limit inside i64 for OFFSET
        let page = page.filter(|p| *p > 0).unwrap_or(1).min(i64::MAX / limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn meta(&self, total: i64) -> Pagination {
        let total_pages = if total == 0 { 0 } else { (total + self.limit - 1) / self.limit };
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// A page of items plus its pagination block
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Filters that apply to `laporan` (aliased `l`) in listings, aggregates and exports
#[derive(Debug, Clone, Default)]
pub struct LaporanFilter {
    pub user_id: Option<Uuid>,
    pub bulan: Option<Bulan>,
    pub tahun: Option<i32>,
    pub status: Option<LaporanStatus>,
    pub sub_kegiatan_id: Option<Uuid>,
    pub sumber_anggaran_id: Option<Uuid>,
    pub kegiatan_id: Option<Uuid>,
}

impl LaporanFilter {
    /// Append ` WHERE ...` (or nothing) with bound parameters.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut first = true;
        let mut next = |qb: &mut QueryBuilder<'_, Postgres>| {
            qb.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        if let Some(user_id) = self.user_id {
            next(qb);
            qb.push("l.user_id = ").push_bind(user_id);
        }
        if let Some(bulan) = self.bulan {
            next(qb);
            qb.push("l.bulan = ").push_bind(bulan);
        }
        if let Some(tahun) = self.tahun {
            next(qb);
            qb.push("l.tahun = ").push_bind(tahun);
        }
        if let Some(status) = self.status {
            next(qb);
            qb.push("l.status = ").push_bind(status);
        }
        if let Some(sub_kegiatan_id) = self.sub_kegiatan_id {
            next(qb);
            qb.push("l.sub_kegiatan_id = ").push_bind(sub_kegiatan_id);
        }
        if let Some(sumber_anggaran_id) = self.sumber_anggaran_id {
            next(qb);
            qb.push("l.sumber_anggaran_id = ").push_bind(sumber_anggaran_id);
        }
        if let Some(kegiatan_id) = self.kegiatan_id {
            next(qb);
            qb.push("l.sub_kegiatan_id IN (SELECT id FROM sub_kegiatan WHERE kegiatan_id = ")
                .push_bind(kegiatan_id)
                .push(")");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::clamped(None, None, 10, 100), Page { page: 1, limit: 10 });
        assert_eq!(Page::clamped(Some(0), Some(-5), 10, 100), Page { page: 1, limit: 10 });
        assert_eq!(Page::clamped(Some(3), Some(500), 10, 100), Page { page: 3, limit: 100 });
        assert_eq!(Page::clamped(Some(3), Some(20), 10, 100).offset(), 40);
    }

    #[test]
    fn huge_page_number_does_not_overflow_offset() {
        let page = Page::clamped(Some(i64::MAX), Some(100), 10, 100);
        assert!(page.offset() >= 0);
        assert!(page.offset() <= i64::MAX - page.limit);
        assert_eq!(Page::clamped(Some(i64::MAX), None, 10, 100).limit, 10);
    }

    #[test]
    fn zero_max_limit_still_yields_positive_limit() {
        let page = Page::clamped(Some(2), Some(5), 0, 0);
        assert_eq!(page.limit, 1);
        assert_eq!(page.meta(3).total_pages, 3);
    }

    #[test]
    fn pagination_meta_rounds_pages_up() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(page.meta(0).total_pages, 0);
        assert_eq!(page.meta(10).total_pages, 1);
        assert_eq!(page.meta(11).total_pages, 2);
    }

    #[test]
    fn empty_filter_adds_no_where() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM laporan l");
        LaporanFilter::default().push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT * FROM laporan l");
    }

    #[test]
    fn filter_binds_each_condition_in_order() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM laporan l");
        LaporanFilter {
            user_id: Some(Uuid::nil()),
            bulan: Some(Bulan::Januari),
            tahun: Some(2025),
            ..Default::default()
        }
        .push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM laporan l WHERE l.user_id = $1 AND l.bulan = $2 AND l.tahun = $3"
        );
    }

    #[test]
    fn kegiatan_filter_uses_subquery() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM laporan l");
        LaporanFilter {
            status: Some(LaporanStatus::Terkirim),
            kegiatan_id: Some(Uuid::nil()),
            ..Default::default()
        }
        .push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM laporan l WHERE l.status = $1 AND l.sub_kegiatan_id IN (SELECT id FROM sub_kegiatan WHERE kegiatan_id = $2)"
        );
    }
}

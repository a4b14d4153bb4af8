// handlers/params.rs - Query-string parsing shared by protected and elevated handlers
//
// Months and statuses arrive as free text (`bulan=januari`, `bulan=1`,
// `status=terkirim`) and are parsed here so a bad value answers with the
// standard error envelope instead of a bare extractor rejection.

use crate::error::ApiError;
use crate::types::{Bulan, LaporanStatus};

pub fn bulan(raw: Option<&str>) -> Result<Option<Bulan>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map(Some).map_err(ApiError::bad_request),
        None => Ok(None),
    }
}

pub fn required_bulan(raw: Option<&str>) -> Result<Bulan, ApiError> {
    bulan(raw)?.ok_or_else(|| ApiError::missing_fields(&["bulan"]))
}

pub fn status(raw: Option<&str>) -> Result<Option<LaporanStatus>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map(Some).map_err(ApiError::bad_request),
        None => Ok(None),
    }
}

/// The current calendar year, used when `tahun` is omitted.
pub fn current_tahun() -> i32 {
    use chrono::Datelike;
    chrono::Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_absent() {
        assert_eq!(bulan(None).unwrap(), None);
        assert_eq!(bulan(Some("  ")).unwrap(), None);
        assert_eq!(status(Some("")).unwrap(), None);
    }

    #[test]
    fn months_accept_names_and_numbers() {
        assert_eq!(bulan(Some("maret")).unwrap(), Some(Bulan::Maret));
        assert_eq!(bulan(Some("12")).unwrap(), Some(Bulan::Desember));
        assert_eq!(bulan(Some("Smarch")).unwrap_err().status_code(), 400);
    }

    #[test]
    fn missing_month_is_reported_by_name() {
        let err = required_bulan(None).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_json()["field_errors"]["bulan"], "This field is required");
    }

    #[test]
    fn statuses_parse() {
        assert_eq!(status(Some("terkirim")).unwrap(), Some(LaporanStatus::Terkirim));
        assert!(status(Some("approved")).is_err());
    }
}

//! Status-transition rules for report periods, kept free of I/O so the
//! services can evaluate them against rows locked inside a transaction.

use crate::error::ApiError;
use crate::types::{Bulan, LaporanStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Reports for {0} {1} have already been submitted")]
    AlreadySubmitted(Bulan, i32),

    #[error("There are no submitted reports for {0} {1}")]
    NothingSubmitted(Bulan, i32),

    #[error("Only submitted reports can be reviewed (current status: {0})")]
    NotSubmitted(LaporanStatus),

    #[error("'{0}' is not a review outcome, use 'diverifikasi' or 'ditolak'")]
    InvalidOutcome(LaporanStatus),
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NothingSubmitted(..) => ApiError::not_found(err.to_string()),
            _ => ApiError::bad_request(err.to_string()),
        }
    }
}

fn count(statuses: &[LaporanStatus], wanted: LaporanStatus) -> usize {
    statuses.iter().filter(|s| **s == wanted).count()
}

/// Rows a submit of this period will move from `tersimpan` to `terkirim`.
///
/// Any row already `terkirim` blocks the whole period. A period with no
/// saved rows submits nothing and reports zero.
pub fn plan_submit(statuses: &[LaporanStatus], bulan: Bulan, tahun: i32) -> Result<usize, WorkflowError> {
    if statuses.contains(&LaporanStatus::Terkirim) {
        return Err(WorkflowError::AlreadySubmitted(bulan, tahun));
    }
    Ok(count(statuses, LaporanStatus::Tersimpan))
}

/// Rows an admin bulk action (return or review) will move out of `terkirim`.
pub fn plan_bulk_from_submitted(statuses: &[LaporanStatus], bulan: Bulan, tahun: i32) -> Result<usize, WorkflowError> {
    match count(statuses, LaporanStatus::Terkirim) {
        0 => Err(WorkflowError::NothingSubmitted(bulan, tahun)),
        n => Ok(n),
    }
}

/// A single review must target a submitted row and record an outcome.
pub fn check_review(current: LaporanStatus, outcome: LaporanStatus) -> Result<(), WorkflowError> {
    if !outcome.is_review_outcome() {
        return Err(WorkflowError::InvalidOutcome(outcome));
    }
    if current != LaporanStatus::Terkirim {
        return Err(WorkflowError::NotSubmitted(current));
    }
    Ok(())
}

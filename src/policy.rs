//! Role-scoped access rules for report data.
//!
//! A puskesmas account only ever sees and mutates its own rows, and only
//! while they are drafts. An admin is unrestricted.

use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::types::LaporanStatus;

pub fn ensure_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

/// 403 unless the caller is an admin or owns the row.
pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), ApiError> {
    if user.is_admin() || user.id == owner_id {
        return Ok(());
    }
    tracing::warn!("User '{}' denied access to a report owned by {}", user.username, owner_id);
    Err(ApiError::forbidden("You do not have access to this report"))
}

/// Which user's rows a query may touch: a clinic is pinned to itself, an
/// admin keeps whatever it asked for (`None` = all clinics).
pub fn scoped_user_id(user: &AuthUser, requested: Option<Uuid>) -> Option<Uuid> {
    if user.is_admin() {
        requested
    } else {
        Some(user.id)
    }
}

/// Clinics may only change drafts; admins may change anything.
pub fn ensure_editable(user: &AuthUser, status: LaporanStatus) -> Result<(), ApiError> {
    if user.is_admin() || status.is_draft() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Report with status '{}' can no longer be changed",
            status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "tester".into(),
            role,
        }
    }

    #[test]
    fn puskesmas_cannot_touch_other_clinic_rows() {
        let clinic = user(Role::Puskesmas);
        let err = ensure_owner_or_admin(&clinic, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert!(ensure_owner_or_admin(&clinic, clinic.id).is_ok());
    }

    #[test]
    fn admin_can_touch_any_row() {
        let admin = user(Role::Admin);
        assert!(ensure_owner_or_admin(&admin, Uuid::new_v4()).is_ok());
        assert!(ensure_admin(&admin).is_ok());
    }

    #[test]
    fn puskesmas_is_not_admin() {
        assert_eq!(ensure_admin(&user(Role::Puskesmas)).unwrap_err().status_code(), 403);
    }

    #[test]
    fn puskesmas_scope_ignores_requested_user() {
        let clinic = user(Role::Puskesmas);
        let other = Uuid::new_v4();
        assert_eq!(scoped_user_id(&clinic, Some(other)), Some(clinic.id));
        assert_eq!(scoped_user_id(&clinic, None), Some(clinic.id));
    }

    #[test]
    fn admin_scope_keeps_requested_user() {
        let admin = user(Role::Admin);
        let other = Uuid::new_v4();
        assert_eq!(scoped_user_id(&admin, Some(other)), Some(other));
        assert_eq!(scoped_user_id(&admin, None), None);
    }

    #[test]
    fn submitted_rows_are_locked_for_clinics() {
        let clinic = user(Role::Puskesmas);
        assert!(ensure_editable(&clinic, LaporanStatus::Tersimpan).is_ok());
        assert!(ensure_editable(&clinic, LaporanStatus::Ditolak).is_ok());
        assert_eq!(ensure_editable(&clinic, LaporanStatus::Terkirim).unwrap_err().status_code(), 400);
        assert_eq!(ensure_editable(&clinic, LaporanStatus::Diverifikasi).unwrap_err().status_code(), 400);
        assert!(ensure_editable(&user(Role::Admin), LaporanStatus::Diverifikasi).is_ok());
    }
}

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{validate_jwt, Claims};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::services::user::AccountState;
use crate::services::UserService;
use crate::types::Role;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// JWT authentication middleware that validates tokens and injects [`AuthUser`]
///
/// The token's account is looked up on every request, so a deactivated or
/// deleted account loses access immediately and a role change applies to
/// tokens issued before it.
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    let claims = validate_jwt(&token).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let pool = DatabaseManager::pool().await?;
    let account = UserService::new(pool).account_state(claims.id).await?;
    let user = current_user(claims, account)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Resolve token claims against the account as it is now.
fn current_user(claims: Claims, account: Option<AccountState>) -> Result<AuthUser, ApiError> {
    match account {
        None => {
            tracing::warn!("Token for unknown account {} ('{}')", claims.id, claims.username);
            Err(ApiError::unauthorized("Account no longer exists"))
        }
        Some(account) if !account.is_active => {
            tracing::warn!("Token for inactive account '{}'", account.username);
            Err(ApiError::unauthorized("Account is inactive"))
        }
        Some(account) => {
            if account.role != claims.role {
                tracing::debug!("Role of '{}' changed from {} to {}", account.username, claims.role, account.role);
            }
            Ok(AuthUser {
                id: claims.id,
                username: account.username,
                role: account.role,
            })
        }
    }
}

/// Rejects non-admin callers; must run after [`jwt_auth_middleware`]
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if let Err(e) = crate::policy::ensure_admin(user) {
        tracing::warn!("User '{}' ({}) denied access to {}", user.username, user.role, request.uri().path());
        return Err(e);
    }

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn claims(role: Role) -> Claims {
        Claims::new(Uuid::new_v4(), "pkm_a".into(), role)
    }

    fn account(role: Role, is_active: bool) -> Option<AccountState> {
        Some(AccountState {
            username: "pkm_a".into(),
            role,
            is_active,
        })
    }

    #[test]
    fn active_account_keeps_access() {
        let claims = claims(Role::Puskesmas);
        let id = claims.id;
        let user = current_user(claims, account(Role::Puskesmas, true)).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Puskesmas);
    }

    #[test]
    fn deactivated_or_deleted_account_is_unauthorized() {
        let err = current_user(claims(Role::Admin), account(Role::Admin, false)).unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(current_user(claims(Role::Admin), None).unwrap_err().status_code(), 401);
    }

    #[test]
    fn role_comes_from_the_account_not_the_token() {
        let demoted = current_user(claims(Role::Admin), account(Role::Puskesmas, true)).unwrap();
        assert!(!demoted.is_admin());
        assert_eq!(crate::policy::ensure_admin(&demoted).unwrap_err().status_code(), 403);

        let promoted = current_user(claims(Role::Puskesmas), account(Role::Admin, true)).unwrap();
        assert!(promoted.is_admin());
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
        assert!(extract_jwt_from_headers(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer   ")).is_err());
    }
}

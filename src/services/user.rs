use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::database::models::User;
use crate::database::{Page, Paginated};
use crate::error::ApiError;
use crate::types::Role;

/// The parts of an account a bearer token is checked against on each request
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountState {
    pub username: String,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub nama: Option<String>,
    pub nama_puskesmas: Option<String>,
    pub kecamatan: Option<String>,
    pub wilayah: Option<String>,
}

fn default_role() -> Role {
    Role::Puskesmas
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub nama: Option<String>,
    pub nama_puskesmas: Option<String>,
    pub kecamatan: Option<String>,
    pub wilayah: Option<String>,
    pub is_active: Option<bool>,
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn check_username(username: &str) -> Result<(), ApiError> {
    let valid = username.len() >= 3
        && username.len() <= 50
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    if !valid {
        return Err(ApiError::bad_request(
            "Username must be 3-50 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    Ok(())
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &UserListQuery) {
    qb.push(" WHERE TRUE");
    if let Some(role) = query.role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR nama ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR nama_puskesmas ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Account management and credential checks
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve credentials to an active account; any mismatch is a plain 401.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(user) if user.is_active && verify_password(password, &user.password) => Ok(user),
            Some(user) if !user.is_active => {
                warn!("Login attempt for inactive user '{}'", username);
                Err(ApiError::unauthorized("Account is inactive"))
            }
            _ => {
                warn!("Failed login for '{}'", username);
                Err(ApiError::unauthorized("Invalid username or password"))
            }
        }
    }

    pub async fn account_state(&self, id: Uuid) -> Result<Option<AccountState>, ApiError> {
        let state = sqlx::query_as::<_, AccountState>("SELECT username, role, is_active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(state)
    }

    pub async fn list(&self, query: &UserListQuery, page: Page) -> Result<Paginated<User>, ApiError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        push_user_filters(&mut qb, query);
        qb.push(" ORDER BY role, nama_puskesmas, username LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(Paginated {
            items,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User '{}' not found", username)))
    }

    pub async fn create(&self, new: NewUser) -> Result<User, ApiError> {
        let username = new.username.trim().to_string();
        check_username(&username)?;
        check_password(&new.password)?;

        let hash = hash_password(&new.password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, password, role, nama, nama_puskesmas, kecamatan, wilayah)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&username)
        .bind(&hash)
        .bind(new.role)
        .bind(&new.nama)
        .bind(&new.nama_puskesmas)
        .bind(&new.kecamatan)
        .bind(&new.wilayah)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match crate::database::DatabaseError::from(e) {
            crate::database::DatabaseError::Conflict(_) => {
                ApiError::conflict(format!("Username '{}' is already taken", username))
            }
            other => other.into(),
        })?;

        info!("Created {} user '{}'", user.role, user.username);
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, ApiError> {
        if let Some(username) = &update.username {
            check_username(username.trim())?;
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                role = COALESCE($3, role),
                nama = COALESCE($4, nama),
                nama_puskesmas = COALESCE($5, nama_puskesmas),
                kecamatan = COALESCE($6, kecamatan),
                wilayah = COALESCE($7, wilayah),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.username.as_deref().map(str::trim))
        .bind(update.role)
        .bind(&update.nama)
        .bind(&update.nama_puskesmas)
        .bind(&update.kecamatan)
        .bind(&update.wilayah)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

        info!("Updated user '{}'", user.username);
        Ok(user)
    }

    /// Delete an account. Accounts that still own reports are refused with 409.
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match crate::database::DatabaseError::from(e) {
                crate::database::DatabaseError::Conflict(_) => {
                    ApiError::conflict("User still owns reports; deactivate the account instead")
                }
                other => other.into(),
            })?
            .rows_affected();

        if deleted == 0 {
            return Err(ApiError::not_found("User not found"));
        }
        info!("Deleted user {}", id);
        Ok(())
    }

    /// Admin override; no old password required.
    pub async fn reset_password(&self, id: Uuid, new_password: &str) -> Result<(), ApiError> {
        check_password(new_password)?;
        let hash = hash_password(new_password)?;

        let updated = sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(&hash)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(ApiError::not_found("User not found"));
        }

        info!("Password reset for user {}", id);
        Ok(())
    }

    /// Self-service change; the current password must match.
    pub async fn change_password(&self, id: Uuid, old_password: &str, new_password: &str) -> Result<(), ApiError> {
        let user = self.get(id).await?;
        if !verify_password(old_password, &user.password) {
            warn!("User '{}' gave a wrong current password", user.username);
            return Err(ApiError::bad_request("Current password is incorrect"));
        }
        self.reset_password(id, new_password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_restricted() {
        assert!(check_username("pkm_cibadak").is_ok());
        assert!(check_username("admin.dinkes").is_ok());
        assert!(check_username("ab").is_err());
        assert!(check_username("has space").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert_eq!(check_password("12345").unwrap_err().status_code(), 400);
        assert!(check_password("123456").is_ok());
    }

    #[test]
    fn search_matches_login_and_names() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        let query = UserListQuery {
            role: Some(Role::Puskesmas),
            search: Some(" cibadak ".into()),
            ..Default::default()
        };
        push_user_filters(&mut qb, &query);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM users WHERE TRUE AND role = $1 AND (username ILIKE $2 OR nama ILIKE $3 OR nama_puskesmas ILIKE $4)"
        );
    }

    #[test]
    fn new_user_defaults_to_puskesmas() {
        let new: NewUser = serde_json::from_value(serde_json::json!({
            "username": "pkm_baru",
            "password": "rahasia"
        }))
        .unwrap();
        assert_eq!(new.role, Role::Puskesmas);
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{User, UserPatch, UserRow};
use crate::error::AppError;

/// Persistence seam for user records and their session entries.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, row: UserRow) -> Result<User, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn list(&self) -> Result<Vec<User>, AppError>;
    async fn count(&self) -> Result<i64, AppError>;
    /// Applies a partial update; `Ok(None)` if the id does not resolve.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn delete_all(&self) -> Result<Vec<User>, AppError>;

    /// Records an active session; `Ok(false)` if the user does not exist.
    async fn add_session(&self, user_id: Uuid, jti: Uuid) -> Result<bool, AppError>;
    async fn has_session(&self, user_id: Uuid, jti: Uuid) -> Result<bool, AppError>;
    async fn remove_session(&self, user_id: Uuid, jti: Uuid) -> Result<(), AppError>;
    /// Active session ids, oldest first.
    async fn sessions(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;
}

const USER_COLUMNS: &str = "id, user_id, first_name, last_name, age, email, password_hash, \
                            image, is_admin, created_at, updated_at";

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Field guarded by a unique constraint declared in the migrations.
fn unique_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "email",
        Some("users_user_id_key") => "user_id",
        _ => "user",
    }
}

fn taken(constraint: Option<&str>) -> AppError {
    let field = unique_field(constraint);
    AppError::validation(field, format!("{field} is already taken"))
}

/// Turns unique-index violations into field-level validation errors.
fn map_write_err(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return taken(db.constraint());
        }
    }
    e.into()
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, row: UserRow) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (user_id, first_name, last_name, age, email, password_hash, image, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(row.user_id)
            .bind(row.first_name)
            .bind(row.last_name)
            .bind(row.age)
            .bind(row.email)
            .bind(row.password_hash)
            .bind(row.image)
            .bind(row.is_admin)
            .fetch_one(&self.db)
            .await
            .map_err(map_write_err)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.db).await?;
        Ok(users)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(n)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"
            UPDATE users SET
                user_id       = COALESCE($2, user_id),
                first_name    = COALESCE($3, first_name),
                last_name     = COALESCE($4, last_name),
                age           = COALESCE($5, age),
                email         = COALESCE($6, email),
                password_hash = COALESCE($7, password_hash),
                image         = COALESCE($8, image),
                is_admin      = COALESCE($9, is_admin),
                updated_at    = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.user_id)
            .bind(patch.first_name)
            .bind(patch.last_name)
            .bind(patch.age)
            .bind(patch.email)
            .bind(patch.password_hash)
            .bind(patch.image)
            .bind(patch.is_admin)
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_err)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn delete_all(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("DELETE FROM users RETURNING {USER_COLUMNS}");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.db).await?;
        Ok(users)
    }

    async fn add_session(&self, user_id: Uuid, jti: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            INSERT INTO user_sessions (jti, user_id)
            SELECT $1, id FROM users WHERE id = $2
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn has_session(&self, user_id: Uuid, jti: Uuid) -> Result<bool, AppError> {
        let (found,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM user_sessions WHERE jti = $1 AND user_id = $2)",
        )
        .bind(jti)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(found)
    }

    async fn remove_session(&self, user_id: Uuid, jti: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_sessions WHERE jti = $1 AND user_id = $2")
            .bind(jti)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn sessions(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT jti FROM user_sessions WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(jti,)| jti).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATION: &str = include_str!("../../migrations/20240101000000_create_users.sql");

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(unique_field(Some("users_email_key")), "email");
        assert_eq!(unique_field(Some("users_user_id_key")), "user_id");
        assert_eq!(unique_field(Some("something_else")), "user");
        assert_eq!(unique_field(None), "user");
    }

    #[test]
    fn mapped_constraints_exist_in_migration() {
        for name in ["users_email_key", "users_user_id_key"] {
            assert!(MIGRATION.contains(name), "{name} missing from migration");
        }
    }

    #[test]
    fn taken_is_a_field_validation_error() {
        let err = taken(Some("users_email_key"));
        assert!(matches!(err, AppError::Validation { field: "email", .. }));
        assert_eq!(err.to_string(), "email is already taken");
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                   // store-generated id
    pub user_id: String,            // human-chosen, unique
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub email: String,              // lower-cased, unique
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    pub image: String,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Outward representation of a user: no hash, no sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub email: String,
    pub image: String,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            user_id: u.user_id,
            first_name: u.first_name,
            last_name: u.last_name,
            age: u.age,
            email: u.email,
            image: u.image,
            is_admin: u.is_admin,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Fields accepted when registering. `password` is plaintext here and is
/// hashed by the credential store before anything is persisted.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
    pub is_admin: Option<bool>,
}

/// Row-level insert, already validated and hashed.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub email: String,
    pub password_hash: String,
    pub image: String,
    pub is_admin: bool,
}

/// Row-level patch, already validated; `password_hash` only set when the
/// plaintext changed.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub image: Option<String>,
    pub is_admin: Option<bool>,
}

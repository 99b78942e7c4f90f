//! In-memory `UserRepo` used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::UserRepo;
use super::repo_types::{User, UserPatch, UserRow};
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
    sessions: Mutex<HashMap<Uuid, Vec<Uuid>>>,
}

impl MemoryUserRepo {
    fn check_unique(
        users: &[User],
        skip: Option<Uuid>,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), AppError> {
        for u in users.iter().filter(|u| Some(u.id) != skip) {
            if Some(u.email.as_str()) == email {
                return Err(AppError::validation("email", "email is already taken"));
            }
            if Some(u.user_id.as_str()) == user_id {
                return Err(AppError::validation("user_id", "user_id is already taken"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn insert(&self, row: UserRow) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        Self::check_unique(&users, None, Some(&row.user_id), Some(&row.email))?;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            age: row.age,
            email: row.email,
            password_hash: row.password_hash,
            image: row.image,
            is_admin: row.is_admin,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        Self::check_unique(
            &users,
            Some(id),
            patch.user_id.as_deref(),
            patch.email.as_deref(),
        )?;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = patch.user_id {
            user.user_id = v;
        }
        if let Some(v) = patch.first_name {
            user.first_name = v;
        }
        if let Some(v) = patch.last_name {
            user.last_name = v;
        }
        if let Some(v) = patch.age {
            user.age = v;
        }
        if let Some(v) = patch.email {
            user.email = v;
        }
        if let Some(v) = patch.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = patch.image {
            user.image = v;
        }
        if let Some(v) = patch.is_admin {
            user.is_admin = v;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        let Some(pos) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        self.sessions.lock().unwrap().remove(&id);
        Ok(Some(users.remove(pos)))
    }

    async fn delete_all(&self) -> Result<Vec<User>, AppError> {
        self.sessions.lock().unwrap().clear();
        Ok(std::mem::take(&mut *self.users.lock().unwrap()))
    }

    async fn add_session(&self, user_id: Uuid, jti: Uuid) -> Result<bool, AppError> {
        if !self.users.lock().unwrap().iter().any(|u| u.id == user_id) {
            return Ok(false);
        }
        self.sessions
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(jti);
        Ok(true)
    }

    async fn has_session(&self, user_id: Uuid, jti: Uuid) -> Result<bool, AppError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&user_id)
            .is_some_and(|s| s.contains(&jti)))
    }

    async fn remove_session(&self, user_id: Uuid, jti: Uuid) -> Result<(), AppError> {
        if let Some(s) = self.sessions.lock().unwrap().get_mut(&user_id) {
            s.retain(|j| *j != jti);
        }
        Ok(())
    }

    async fn sessions(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

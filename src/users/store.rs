use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    repo::UserRepo,
    repo_types::{NewUser, User, UserChanges, UserPatch, UserRow},
    validate,
};
use crate::{
    auth::password::{hash_password, verify_against_dummy, verify_password},
    error::AppError,
};

/// Validating, hashing front of the user repository. Plaintext secrets stop
/// here; only digests are handed to the repo.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepo>,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn UserRepo>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, fields: NewUser, image: &str) -> Result<User, AppError> {
        let row = UserRow {
            user_id: validate::user_id(&fields.user_id)?,
            first_name: validate::name("first_name", &fields.first_name)?,
            last_name: validate::name("last_name", &fields.last_name)?,
            age: validate::age(fields.age)?,
            email: validate::email(&fields.email)?,
            password_hash: {
                validate::password(&fields.password)?;
                hash_password(&fields.password)?
            },
            image: image.to_string(),
            is_admin: fields.is_admin,
        };
        let user = self.repo.insert(row).await?;
        debug!(id = %user.id, user_id = %user.user_id, "user stored");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.repo.find_by_id(id).await
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        self.repo.list().await
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        self.repo.count().await
    }

    /// Partial update. Only supplied fields are validated; the secret is
    /// re-hashed only when a new plaintext is supplied.
    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let patch = UserPatch {
            user_id: changes.user_id.as_deref().map(validate::user_id).transpose()?,
            first_name: changes
                .first_name
                .as_deref()
                .map(|v| validate::name("first_name", v))
                .transpose()?,
            last_name: changes
                .last_name
                .as_deref()
                .map(|v| validate::name("last_name", v))
                .transpose()?,
            age: changes.age.map(validate::age).transpose()?,
            email: changes.email.as_deref().map(validate::email).transpose()?,
            password_hash: match changes.password.as_deref() {
                Some(plain) => {
                    validate::password(plain)?;
                    Some(hash_password(plain)?)
                }
                None => None,
            },
            image: changes.image,
            is_admin: changes.is_admin,
        };
        self.repo.update(id, patch).await
    }

    pub async fn set_image(&self, id: Uuid, url: &str) -> Result<Option<User>, AppError> {
        self.repo
            .update(
                id,
                UserPatch {
                    image: Some(url.to_string()),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.repo.delete(id).await
    }

    pub async fn delete_all(&self) -> Result<Vec<User>, AppError> {
        self.repo.delete_all().await
    }

    /// Looks a user up by email and checks the plaintext against the stored
    /// digest. Unknown email and wrong secret fail identically.
    pub async fn find_by_credentials(&self, email: &str, plain: &str) -> Result<User, AppError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.repo.find_by_email(&email).await? else {
            verify_against_dummy(plain);
            warn!("login with unknown email");
            return Err(AppError::Authentication);
        };
        if !verify_password(plain, &user.password_hash)? {
            warn!(id = %user.id, "login with wrong password");
            return Err(AppError::Authentication);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::MemoryUserRepo, repo_types::PublicUser};

    fn ada() -> NewUser {
        NewUser {
            user_id: "ada1815".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            age: 36,
            email: " Ada@Example.com ".into(),
            password: "Engine5!Analytic".into(),
            is_admin: false,
        }
    }

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryUserRepo::default()))
    }

    #[tokio::test]
    async fn create_then_login() {
        let store = store();
        let created = store.create(ada(), "placeholder").await.unwrap();
        assert_eq!(created.email, "ada@example.com");
        assert_ne!(created.password_hash, "Engine5!Analytic");

        let user = store
            .find_by_credentials("ADA@example.com", "Engine5!Analytic")
            .await
            .unwrap();
        assert_eq!(user.id, created.id);
        assert!(verify_password("Engine5!Analytic", &user.password_hash).unwrap());

        let json = serde_json::to_string(&PublicUser::from(user.clone())).unwrap();
        assert!(!json.contains("Engine5!Analytic"));
        assert!(!json.contains(&user.password_hash));
        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("password"));
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let store = store();
        store.create(ada(), "placeholder").await.unwrap();

        let unknown = store
            .find_by_credentials("nobody@example.com", "Engine5!Analytic")
            .await
            .unwrap_err();
        let wrong = store
            .find_by_credentials("ada@example.com", "Engine5!Wrong")
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::Authentication));
        assert!(matches!(wrong, AppError::Authentication));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn duplicate_email_leaves_store_unchanged() {
        let store = store();
        store.create(ada(), "placeholder").await.unwrap();

        let mut again = ada();
        again.user_id = "other1".into();
        let err = store.create(again, "placeholder").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "email", .. }));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_user_id_rejected() {
        let store = store();
        store.create(ada(), "placeholder").await.unwrap();

        let mut again = ada();
        again.email = "second@example.com".into();
        let err = store.create(again, "placeholder").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "user_id", .. }));
    }

    #[tokio::test]
    async fn invalid_fields_rejected_before_storing() {
        let store = store();
        let mut weak = ada();
        weak.password = "password".into();
        let err = store.create(weak, "placeholder").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "password", .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_without_secret_keeps_digest() {
        let store = store();
        let created = store.create(ada(), "placeholder").await.unwrap();

        let updated = store
            .update(
                created.id,
                UserChanges {
                    first_name: Some("Augusta".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.first_name, "Augusta");
        assert_eq!(updated.password_hash, created.password_hash);
    }

    #[tokio::test]
    async fn update_with_secret_rehashes() {
        let store = store();
        let created = store.create(ada(), "placeholder").await.unwrap();

        store
            .update(
                created.id,
                UserChanges {
                    password: Some("N3w!Secret".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(store
            .find_by_credentials("ada@example.com", "N3w!Secret")
            .await
            .is_ok());
        assert!(store
            .find_by_credentials("ada@example.com", "Engine5!Analytic")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn update_validates_only_supplied_fields() {
        let store = store();
        let created = store.create(ada(), "placeholder").await.unwrap();

        let err = store
            .update(
                created.id,
                UserChanges {
                    age: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "age", .. }));

        let missing = store
            .update(Uuid::new_v4(), UserChanges::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}

//! Account store.
//!
//! [`UserRepository`] is the seam handlers depend on; [`InMemoryUserRepository`]
//! is the process-local adapter used by the server. Users are keyed by ID and
//! indexed by email, so registration and login never scan the whole store.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserRepoError {
    #[error("email already registered")]
    EmailTaken,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with [`UserRepoError::EmailTaken`] when the
    /// email (exact, case-sensitive) is already present.
    async fn create(&self, new_user: NewUser) -> Result<User, UserRepoError>;

    async fn find_by_email(&self, email: &str) -> Option<User>;
}

#[derive(Default)]
struct Accounts {
    by_id: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<Accounts>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, UserRepoError> {
        let mut accounts = self.inner.write().await;
        if accounts.by_email.contains_key(&new_user.email) {
            return Err(UserRepoError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            user_type: new_user.user_type,
            password_hash: new_user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        accounts.by_email.insert(user.email.clone(), user.id);
        accounts.by_id.insert(user.id, user.clone());
        debug!(user_id = %user.id, "user stored");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        let accounts = self.inner.read().await;
        accounts
            .by_email
            .get(email)
            .and_then(|id| accounts.by_id.get(id))
            .cloned()
    }
}

//! Durable-store boundary for groups and users.
//!
//! Stores load the full collections once and save the full collection after
//! every successful mutation. Adapters must provide read-your-writes
//! consistency once `save_*` returns `Ok`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use gatehouse_core::AccessError;

use crate::group::Group;
use crate::user::User;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<PersistenceError> for AccessError {
    fn from(value: PersistenceError) -> Self {
        AccessError::storage(value.to_string())
    }
}

pub trait AccessPersistence: Send + Sync {
    fn load_groups(&self) -> Result<Vec<Group>, PersistenceError>;
    fn save_groups(&self, groups: &[Group]) -> Result<(), PersistenceError>;
    fn load_users(&self) -> Result<Vec<User>, PersistenceError>;
    fn save_users(&self, users: &[User]) -> Result<(), PersistenceError>;
}

impl<S> AccessPersistence for Arc<S>
where
    S: AccessPersistence + ?Sized,
{
    fn load_groups(&self) -> Result<Vec<Group>, PersistenceError> {
        (**self).load_groups()
    }

    fn save_groups(&self, groups: &[Group]) -> Result<(), PersistenceError> {
        (**self).save_groups(groups)
    }

    fn load_users(&self) -> Result<Vec<User>, PersistenceError> {
        (**self).load_users()
    }

    fn save_users(&self, users: &[User]) -> Result<(), PersistenceError> {
        (**self).save_users(users)
    }
}

/// In-memory persistence for tests/dev.
///
/// `set_failing(true)` makes every save fail, to exercise rollback paths.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    groups: RwLock<Vec<Group>>,
    users: RwLock<Vec<User>>,
    failing: AtomicBool,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

impl AccessPersistence for InMemoryPersistence {
    fn load_groups(&self) -> Result<Vec<Group>, PersistenceError> {
        Ok(self.groups.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save_groups(&self, groups: &[Group]) -> Result<(), PersistenceError> {
        self.check_available()?;
        *self.groups.write().unwrap_or_else(PoisonError::into_inner) = groups.to_vec();
        Ok(())
    }

    fn load_users(&self) -> Result<Vec<User>, PersistenceError> {
        Ok(self.users.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save_users(&self, users: &[User]) -> Result<(), PersistenceError> {
        self.check_available()?;
        *self.users.write().unwrap_or_else(PoisonError::into_inner) = users.to_vec();
        Ok(())
    }
}

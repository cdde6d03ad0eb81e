//! Shared fixtures for unit tests.

use std::sync::Arc;

use crate::credentials::Argon2Hasher;
use crate::group::GroupStore;
use crate::permissions::{Permission, PermissionRegistry};
use crate::persistence::InMemoryPersistence;
use crate::user::{UserStore, UserStoreOptions};

pub(crate) struct Fixture {
    pub groups: Arc<GroupStore>,
    pub users: Arc<UserStore>,
    pub persistence: Arc<InMemoryPersistence>,
}

pub(crate) fn fixture() -> Fixture {
    fixture_on(Arc::new(InMemoryPersistence::new()))
}

pub(crate) fn fixture_on(persistence: Arc<InMemoryPersistence>) -> Fixture {
    let registry = Arc::new(PermissionRegistry::with_builtin());
    for name in ["DEPLOY", "READ_LOGS", "RESTART"] {
        registry.register(Permission::new(name, name)).unwrap();
    }

    let groups = Arc::new(GroupStore::new(registry, persistence.clone()).unwrap());
    groups.ensure_builtin_groups().unwrap();

    let users = UserStore::new(
        Arc::clone(&groups),
        persistence.clone(),
        UserStoreOptions {
            hasher: Arc::new(Argon2Hasher::low_cost()),
            ..Default::default()
        },
    )
    .unwrap();

    Fixture {
        groups,
        users,
        persistence,
    }
}

//! User accounts and their credential lifecycle.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use gatehouse_core::{AccessError, AccessResult, Entity, GroupKey, Username, index_by_id};

use crate::credentials::{
    ApiKey, Argon2Hasher, OsRngTokenGenerator, PasswordHash, PasswordHasher, TokenGenerator,
};
use crate::group::{GroupMembers, GroupStore};
use crate::permissions::PermissionName;
use crate::persistence::AccessPersistence;

/// Per-user settings: an arbitrary JSON object.
pub type UserSettings = Map<String, Value>;

/// Users ordered by name.
pub type UserTable = BTreeMap<Username, User>;

/// User account.
///
/// The password is only ever held as a salted hash; the API key is only
/// reachable through [`User::api_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: Username,
    password: PasswordHash,
    /// Inactive users are denied everything, whatever they hold.
    pub active: bool,
    #[serde(default)]
    pub groups: BTreeSet<GroupKey>,
    /// Direct grants, independent of any group.
    #[serde(default)]
    pub permissions: BTreeSet<PermissionName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<ApiKey>,
    #[serde(default)]
    pub settings: UserSettings,
}

impl User {
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Entity for User {
    type Id = Username;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

/// Input for [`UserStore::add_user`].
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub active: bool,
    /// `None` means no direct grants.
    pub permissions: Option<Vec<PermissionName>>,
    /// `None` means "every group currently marked default".
    pub groups: Option<Vec<GroupKey>>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            active: true,
            permissions: None,
            groups: None,
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn permissions<P: Into<PermissionName>>(mut self, permissions: impl IntoIterator<Item = P>) -> Self {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn groups<K: Into<GroupKey>>(mut self, groups: impl IntoIterator<Item = K>) -> Self {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("permissions", &self.permissions)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

/// Partial administrative update: only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub groups: Option<Vec<GroupKey>>,
    pub permissions: Option<Vec<PermissionName>>,
    pub active: Option<bool>,
}

pub struct UserStoreOptions {
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenGenerator>,
    /// `false` for deployments that run without access control.
    pub enabled: bool,
}

impl Default for UserStoreOptions {
    fn default() -> Self {
        Self {
            hasher: Arc::new(Argon2Hasher::default()),
            tokens: Arc::new(OsRngTokenGenerator),
            enabled: true,
        }
    }
}

/// Shared store of users. Same locking scheme as [`GroupStore`].
pub struct UserStore {
    groups: Arc<GroupStore>,
    persistence: Arc<dyn AccessPersistence>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenGenerator>,
    enabled: bool,
    /// Checked against when a login names an unknown user.
    decoy: OnceLock<PasswordHash>,
    state: RwLock<Arc<UserTable>>,
    writer: Mutex<()>,
}

impl UserStore {
    /// Load users and subscribe to group removals.
    ///
    /// Memberships of groups that no longer exist are dropped on load.
    pub fn new(
        groups: Arc<GroupStore>,
        persistence: Arc<dyn AccessPersistence>,
        options: UserStoreOptions,
    ) -> AccessResult<Arc<Self>> {
        let mut loaded = index_by_id(persistence.load_users()?);

        let known = groups.snapshot();
        let mut dangling = 0usize;
        for user in loaded.values_mut() {
            let before = user.groups.len();
            user.groups.retain(|key| known.contains_key(key));
            dangling += before - user.groups.len();
        }
        if dangling > 0 {
            tracing::warn!(dangling, "dropping memberships of unknown groups");
            let users: Vec<User> = loaded.values().cloned().collect();
            persistence.save_users(&users)?;
        }
        tracing::debug!(users = loaded.len(), enabled = options.enabled, "user store loaded");

        let store = Arc::new(Self {
            groups: Arc::clone(&groups),
            persistence,
            hasher: options.hasher,
            tokens: options.tokens,
            enabled: options.enabled,
            decoy: OnceLock::new(),
            state: RwLock::new(Arc::new(loaded)),
            writer: Mutex::new(()),
        });

        let members: Weak<dyn GroupMembers> = Arc::downgrade(&store) as Weak<dyn GroupMembers>;
        groups.attach_members(members);
        Ok(store)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn groups(&self) -> &Arc<GroupStore> {
        &self.groups
    }

    /// Consistent point-in-time view of every user.
    pub fn snapshot(&self) -> Arc<UserTable> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn add_user(&self, new: NewUser) -> AccessResult<User> {
        self.insert(new, false)?
            .ok_or_else(|| AccessError::storage("user insert skipped unexpectedly"))
    }

    /// Add `new` only if no user exists yet (first-run bootstrap).
    ///
    /// Returns `None` when the store already has users.
    pub fn add_first_user(&self, new: NewUser) -> AccessResult<Option<User>> {
        self.insert(new, true)
    }

    pub fn find_user(&self, name: &str) -> Option<User> {
        self.snapshot().get(name).cloned()
    }

    pub fn get_all_users(&self) -> Vec<User> {
        self.snapshot().values().cloned().collect()
    }

    pub fn has_users(&self) -> bool {
        !self.snapshot().is_empty()
    }

    /// Apply an administrative update atomically (all fields or none).
    pub fn update_user(&self, name: &str, update: UserUpdate) -> AccessResult<User> {
        let updated = self.mutate(name, |user| {
            if let Some(groups) = update.groups {
                self.groups.validate_keys(&groups)?;
                user.groups = groups.into_iter().collect();
            }
            if let Some(permissions) = update.permissions {
                self.groups.registry().validate(&permissions)?;
                user.permissions = permissions.into_iter().collect();
            }
            if let Some(active) = update.active {
                user.active = active;
            }
            Ok(user.clone())
        })?;

        tracing::info!(user = %name, "user updated");
        Ok(updated)
    }

    pub fn change_user_groups(&self, name: &str, groups: Vec<GroupKey>) -> AccessResult<()> {
        self.update_user(
            name,
            UserUpdate {
                groups: Some(groups),
                ..Default::default()
            },
        )
        .map(|_| ())
    }

    pub fn change_user_permissions(
        &self,
        name: &str,
        permissions: Vec<PermissionName>,
    ) -> AccessResult<()> {
        self.update_user(
            name,
            UserUpdate {
                permissions: Some(permissions),
                ..Default::default()
            },
        )
        .map(|_| ())
    }

    pub fn change_user_activation(&self, name: &str, active: bool) -> AccessResult<()> {
        self.update_user(
            name,
            UserUpdate {
                active: Some(active),
                ..Default::default()
            },
        )
        .map(|_| ())
    }

    /// Storage-level removal. Self-removal is refused by the facade, not here.
    pub fn remove_user(&self, name: &str) -> AccessResult<()> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        if !current.contains_key(name) {
            return Err(AccessError::UnknownUser(name.to_string()));
        }

        let mut next = (*current).clone();
        next.remove(name);
        self.commit(next)?;

        tracing::info!(user = %name, "user removed");
        Ok(())
    }

    pub fn check_password(&self, name: &str, candidate: &str) -> AccessResult<bool> {
        let user = self
            .find_user(name)
            .ok_or_else(|| AccessError::UnknownUser(name.to_string()))?;
        Ok(self.hasher.verify(candidate, &user.password))
    }

    /// Verify a login attempt and return the account on success.
    ///
    /// Unknown names are verified against a decoy hash, so both failures cost
    /// one hash check.
    pub fn verify_login(&self, name: &str, candidate: &str) -> AccessResult<Option<User>> {
        match self.find_user(name) {
            Some(user) => Ok(self.hasher.verify(candidate, &user.password).then_some(user)),
            None => {
                self.hasher.verify(candidate, self.decoy_hash()?);
                Ok(None)
            }
        }
    }

    /// Replace the stored credential. Existing sessions are left alone.
    pub fn change_user_password(&self, name: &str, password: &str) -> AccessResult<()> {
        if self.find_user(name).is_none() {
            return Err(AccessError::UnknownUser(name.to_string()));
        }
        let hash = self.hash_password(password)?;

        self.mutate(name, |user| {
            user.password = hash;
            Ok(())
        })?;

        tracing::info!(user = %name, "password changed");
        Ok(())
    }

    /// Issue a new API key, replacing any previous one.
    ///
    /// The clear token is only returned here.
    pub fn generate_api_key(&self, name: &str) -> AccessResult<ApiKey> {
        let key = self.tokens.generate();

        self.mutate(name, |user| {
            user.api_key = Some(key.clone());
            Ok(())
        })?;

        tracing::info!(user = %name, "api key generated");
        Ok(key)
    }

    /// Idempotent: succeeds when the user has no key.
    pub fn delete_api_key(&self, name: &str) -> AccessResult<()> {
        self.mutate(name, |user| {
            user.api_key = None;
            Ok(())
        })?;

        tracing::info!(user = %name, "api key deleted");
        Ok(())
    }

    /// Owner of `token`, if any.
    pub fn find_user_by_api_key(&self, token: &str) -> Option<User> {
        if token.is_empty() {
            return None;
        }
        self.snapshot()
            .values()
            .find(|user| user.api_key.as_ref().is_some_and(|key| key.matches(token)))
            .cloned()
    }

    pub fn get_all_user_settings(&self, name: &str) -> AccessResult<UserSettings> {
        self.find_user(name)
            .map(|user| user.settings)
            .ok_or_else(|| AccessError::UnknownUser(name.to_string()))
    }

    /// Shallow merge: top-level keys of `patch` replace existing ones.
    pub fn change_user_settings(&self, name: &str, patch: UserSettings) -> AccessResult<()> {
        self.mutate(name, |user| {
            user.settings.extend(patch);
            Ok(())
        })?;

        tracing::debug!(user = %name, "settings changed");
        Ok(())
    }

    fn insert(&self, new: NewUser, only_if_empty: bool) -> AccessResult<Option<User>> {
        let name = Username::parse(new.name)?;
        let password = self.hash_password(&new.password)?;

        let _writer = self.lock_writer();
        let current = self.snapshot();

        if only_if_empty && !current.is_empty() {
            return Ok(None);
        }
        if current.contains_key(&name) {
            return Err(AccessError::UserAlreadyExists(name.to_string()));
        }

        let permissions = new.permissions.unwrap_or_default();
        self.groups.registry().validate(&permissions)?;

        let groups = match new.groups {
            Some(groups) => {
                self.groups.validate_keys(&groups)?;
                groups.into_iter().collect()
            }
            None => self.groups.default_groups(),
        };

        let user = User {
            name: name.clone(),
            password,
            active: new.active,
            groups,
            permissions: permissions.into_iter().collect(),
            api_key: None,
            settings: UserSettings::new(),
        };

        let mut next = (*current).clone();
        next.insert(name, user.clone());
        self.commit(next)?;

        tracing::info!(user = %user.name, active = user.active, "user created");
        Ok(Some(user))
    }

    fn hash_password(&self, password: &str) -> AccessResult<PasswordHash> {
        if password.is_empty() {
            return Err(AccessError::validation("password cannot be empty"));
        }
        self.hasher.hash(password)
    }

    fn decoy_hash(&self) -> AccessResult<&PasswordHash> {
        if let Some(hash) = self.decoy.get() {
            return Ok(hash);
        }
        let hash = self.hasher.hash("gatehouse-decoy")?;
        Ok(self.decoy.get_or_init(|| hash))
    }

    /// Run `f` against a private copy of `name` and commit the result.
    fn mutate<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut User) -> AccessResult<T>,
    ) -> AccessResult<T> {
        let _writer = self.lock_writer();
        let current = self.snapshot();

        let mut next = (*current).clone();
        let user = next
            .get_mut(name)
            .ok_or_else(|| AccessError::UnknownUser(name.to_string()))?;
        let out = f(user)?;

        self.commit(next)?;
        Ok(out)
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, next: UserTable) -> AccessResult<()> {
        let users: Vec<User> = next.values().cloned().collect();
        self.persistence.save_users(&users)?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        Ok(())
    }
}

impl GroupMembers for UserStore {
    fn unassign_group(&self, key: &GroupKey) -> AccessResult<()> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        if !current.values().any(|user| user.groups.contains(key)) {
            return Ok(());
        }

        let mut next = (*current).clone();
        for user in next.values_mut() {
            user.groups.remove(key);
        }
        self.commit(next)?;

        tracing::info!(group = %key, "group unassigned from users");
        Ok(())
    }
}

//! Facade operations, one per administrative action.
//!
//! Each operation runs its guards in the same order: first-run guard,
//! identity, permission or self/admin relationship, then the freshness gate.
//! When the user store is disabled, user-mutating operations succeed without
//! effect.

use gatehouse_core::{AccessError, AccessResult, SessionId};

use crate::authorize::{AccessControl, TargetAccess};
use crate::credentials::ApiKey;
use crate::group::{ADMIN_GROUP, Group, GroupUpdate, NewGroup, closure_permissions};
use crate::permissions::{Permission, PermissionName};
use crate::principal::Caller;
use crate::user::{NewUser, User, UserSettings, UserUpdate};
use crate::views::{GroupView, UserView};

impl AccessControl {
    /// Every registered permission. Needs no authentication.
    pub fn permissions(&self) -> Vec<Permission> {
        self.registry().all()
    }

    /// Fails with `SetupRequired` until the first user exists.
    pub fn ensure_setup(&self) -> AccessResult<()> {
        if self.users().is_enabled() && !self.users().has_users() {
            return Err(AccessError::SetupRequired);
        }
        Ok(())
    }

    /// True while the first-run bootstrap is still pending.
    pub fn needs_setup(&self) -> bool {
        self.ensure_setup().is_err()
    }

    /// Create the first administrator. Refused once any user exists.
    pub fn bootstrap_admin(&self, name: &str, password: &str) -> AccessResult<UserView> {
        let mut groups = self.groups().default_groups();
        groups.insert(ADMIN_GROUP.into());

        let new = NewUser::new(name, password).groups(groups);
        let Some(user) = self.users().add_first_user(new)? else {
            tracing::warn!(user = %name, "bootstrap refused, setup already completed");
            return Err(AccessError::forbidden("initial setup has already been completed"));
        };

        tracing::info!(user = %user.name, "initial administrator created");
        Ok(self.user_view(&user, false))
    }

    // ── groups ──────────────────────────────────────────────────────────────

    pub fn list_groups(&self, caller: &Caller) -> AccessResult<Vec<GroupView>> {
        self.ensure_setup()?;
        self.require_permission(caller, &PermissionName::ADMIN)?;
        Ok(self
            .groups()
            .list_groups()
            .into_iter()
            .map(|group| self.group_view(group))
            .collect())
    }

    pub fn get_group(&self, caller: &Caller, key: &str) -> AccessResult<GroupView> {
        self.ensure_setup()?;
        self.require_permission(caller, &PermissionName::ADMIN)?;
        let group = self
            .groups()
            .find_group(key)
            .ok_or_else(|| AccessError::UnknownGroup(key.to_string()))?;
        Ok(self.group_view(group))
    }

    pub fn add_group(&self, caller: &Caller, new: NewGroup) -> AccessResult<GroupView> {
        self.require_admin_fresh(caller)?;
        let group = self.groups().add_group(new)?;
        Ok(self.group_view(group))
    }

    pub fn update_group(&self, caller: &Caller, key: &str, update: GroupUpdate) -> AccessResult<GroupView> {
        self.require_admin_fresh(caller)?;
        let group = self.groups().update_group(key, update)?;
        Ok(self.group_view(group))
    }

    pub fn remove_group(&self, caller: &Caller, key: &str) -> AccessResult<()> {
        self.require_admin_fresh(caller)?;
        self.groups().remove_group(key)
    }

    // ── users ───────────────────────────────────────────────────────────────

    /// API keys are redacted unless the caller's session is fresh.
    pub fn list_users(&self, caller: &Caller) -> AccessResult<Vec<UserView>> {
        self.ensure_setup()?;
        self.require_permission(caller, &PermissionName::ADMIN)?;
        let redact = !self.is_fresh(caller);
        Ok(self
            .users()
            .get_all_users()
            .iter()
            .map(|user| self.user_view(user, redact))
            .collect())
    }

    pub fn get_user(&self, caller: &Caller, name: &str) -> AccessResult<UserView> {
        self.ensure_setup()?;
        self.authorize_target(caller, name, false)?;
        let user = self.find_target(name)?;
        Ok(self.user_view(&user, !self.is_fresh(caller)))
    }

    pub fn add_user(&self, caller: &Caller, new: NewUser) -> AccessResult<Option<UserView>> {
        if !self.users().is_enabled() {
            return Ok(None);
        }
        self.require_admin_fresh(caller)?;
        let user = self.users().add_user(new)?;
        Ok(Some(self.user_view(&user, false)))
    }

    pub fn update_user(
        &self,
        caller: &Caller,
        name: &str,
        update: UserUpdate,
    ) -> AccessResult<Option<UserView>> {
        if !self.users().is_enabled() {
            return Ok(None);
        }
        self.require_admin_fresh(caller)?;
        let user = self.users().update_user(name, update)?;
        Ok(Some(self.user_view(&user, false)))
    }

    /// A user can never remove itself, whatever it holds.
    pub fn remove_user(&self, caller: &Caller, name: &str) -> AccessResult<()> {
        if !self.users().is_enabled() {
            return Ok(());
        }
        self.ensure_setup()?;
        let account = self.caller_account(caller)?;
        if account.name.as_str() == name {
            tracing::warn!(user = %account.name, "self removal denied");
            return Err(AccessError::SelfRemovalDenied);
        }
        self.require_permission(caller, &PermissionName::ADMIN)?;
        self.require_fresh(caller)?;
        self.users().remove_user(name)
    }

    /// Self-service requires `current`; a correct one also refreshes the
    /// caller's session. Administrators changing someone else's password need a
    /// fresh session instead.
    pub fn change_password(
        &self,
        caller: &Caller,
        name: &str,
        current: Option<&str>,
        new: &str,
    ) -> AccessResult<()> {
        if !self.users().is_enabled() {
            return Ok(());
        }
        self.ensure_setup()?;
        let access = self.authorize_target(caller, name, true)?;
        if new.is_empty() {
            return Err(AccessError::validation("new password cannot be empty"));
        }

        if access == TargetAccess::SelfService {
            let current = current.ok_or_else(|| AccessError::validation("current password is required"))?;
            if !self.users().check_password(name, current)? {
                tracing::warn!(user = %name, "wrong current password");
                return Err(AccessError::InvalidCredentials);
            }
            if let Some(session) = caller.session_id() {
                self.gate().mark_verified(session);
            }
        }

        self.users().change_user_password(name, new)
    }

    pub fn get_settings(&self, caller: &Caller, name: &str) -> AccessResult<UserSettings> {
        self.ensure_setup()?;
        self.authorize_target(caller, name, false)?;
        self.users().get_all_user_settings(name)
    }

    pub fn change_settings(&self, caller: &Caller, name: &str, patch: UserSettings) -> AccessResult<()> {
        if !self.users().is_enabled() {
            return Ok(());
        }
        self.ensure_setup()?;
        self.authorize_target(caller, name, true)?;
        self.users().change_user_settings(name, patch)
    }

    /// The clear token is returned here and nowhere else.
    pub fn generate_api_key(&self, caller: &Caller, name: &str) -> AccessResult<Option<ApiKey>> {
        if !self.users().is_enabled() {
            return Ok(None);
        }
        self.ensure_setup()?;
        self.authorize_target(caller, name, false)?;
        self.require_fresh(caller)?;
        self.users().generate_api_key(name).map(Some)
    }

    pub fn delete_api_key(&self, caller: &Caller, name: &str) -> AccessResult<()> {
        if !self.users().is_enabled() {
            return Ok(());
        }
        self.ensure_setup()?;
        self.authorize_target(caller, name, false)?;
        self.require_fresh(caller)?;
        self.users().delete_api_key(name)
    }

    // ── authentication ──────────────────────────────────────────────────────

    /// Verify credentials and open a fresh session.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    pub fn login(&self, name: &str, password: &str, session: SessionId) -> AccessResult<Caller> {
        self.ensure_setup()?;
        let user = match self.users().verify_login(name, password)? {
            Some(user) => user,
            None => {
                tracing::warn!(user = %name, "login failed");
                return Err(AccessError::InvalidCredentials);
            }
        };
        if !user.active {
            tracing::warn!(user = %name, "login refused for deactivated account");
            return Err(AccessError::forbidden("account is deactivated"));
        }

        self.gate().mark_verified(session);
        tracing::info!(user = %user.name, %session, "logged in");
        Ok(Caller::session(user.name, session))
    }

    /// Re-enter the current password to make the caller's session fresh.
    pub fn confirm_credentials(&self, caller: &Caller, password: &str) -> AccessResult<()> {
        self.ensure_setup()?;
        let Some(session) = caller.session_id() else {
            return Err(AccessError::forbidden("credential confirmation needs a session"));
        };
        let user = self.caller_account(caller)?;
        if !self.users().check_password(user.name.as_str(), password)? {
            tracing::warn!(user = %user.name, "credential confirmation failed");
            return Err(AccessError::InvalidCredentials);
        }
        self.gate().mark_verified(session);
        Ok(())
    }

    pub fn logout(&self, session: SessionId) {
        self.gate().discard(session);
        tracing::debug!(%session, "logged out");
    }

    /// Resolve a bearer API key to its active owner.
    pub fn authenticate_api_key(&self, token: &str) -> AccessResult<Caller> {
        self.ensure_setup()?;
        match self.users().find_user_by_api_key(token) {
            Some(user) if user.active => Ok(Caller::api_key(user.name)),
            _ => {
                tracing::warn!("api key rejected");
                Err(AccessError::InvalidCredentials)
            }
        }
    }

    // ── helpers ─────────────────────────────────────────────────────────────

    fn require_admin_fresh(&self, caller: &Caller) -> AccessResult<User> {
        self.ensure_setup()?;
        let user = self.require_permission(caller, &PermissionName::ADMIN)?;
        self.require_fresh(caller)?;
        Ok(user)
    }

    fn find_target(&self, name: &str) -> AccessResult<User> {
        self.users()
            .find_user(name)
            .ok_or_else(|| AccessError::UnknownUser(name.to_string()))
    }

    fn user_view(&self, user: &User, redact: bool) -> UserView {
        UserView::new(user, self.resolver().effective_permissions(user), redact)
    }

    fn group_view(&self, group: Group) -> GroupView {
        let table = self.groups().snapshot();
        let effective = closure_permissions(&table, [&group.key]);
        GroupView::new(group, effective)
    }
}

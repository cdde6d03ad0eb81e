//! Access Control Facade: composition root of the engine and its two
//! pervasive checks, "may this principal do P" and "may this principal act on
//! user U".

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use gatehouse_core::{AccessError, AccessResult, Clock, SystemClock};

use crate::credentials::{Argon2Hasher, OsRngTokenGenerator, PasswordHasher, TokenGenerator};
use crate::freshness::{DEFAULT_WINDOW_SECS, FreshnessGate};
use crate::group::GroupStore;
use crate::permissions::{PermissionName, PermissionRegistry};
use crate::persistence::AccessPersistence;
use crate::principal::{Authentication, Caller, Principal};
use crate::resolver::PermissionResolver;
use crate::user::{User, UserStore, UserStoreOptions};

pub struct AccessOptions {
    pub freshness_window: Duration,
    /// `false` runs without access control (see [`UserStore::is_enabled`]).
    pub enabled: bool,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            freshness_window: Duration::seconds(DEFAULT_WINDOW_SECS),
            enabled: true,
            hasher: Arc::new(Argon2Hasher::default()),
            tokens: Arc::new(OsRngTokenGenerator),
            clock: Arc::new(SystemClock),
        }
    }
}

/// How a caller was allowed to act on a target user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAccess {
    SelfService,
    Administrator,
}

/// Entry point other subsystems call.
///
/// Every operation takes the caller explicitly; there is no ambient
/// "current user".
pub struct AccessControl {
    registry: Arc<PermissionRegistry>,
    groups: Arc<GroupStore>,
    users: Arc<UserStore>,
    resolver: PermissionResolver,
    gate: FreshnessGate,
}

impl AccessControl {
    /// Load both stores from `persistence` and seed the built-in groups.
    pub fn new(
        registry: Arc<PermissionRegistry>,
        persistence: Arc<dyn AccessPersistence>,
        options: AccessOptions,
    ) -> AccessResult<Self> {
        let groups = Arc::new(GroupStore::new(Arc::clone(&registry), Arc::clone(&persistence))?);
        groups.ensure_builtin_groups()?;

        let users = UserStore::new(
            Arc::clone(&groups),
            persistence,
            UserStoreOptions {
                hasher: options.hasher,
                tokens: options.tokens,
                enabled: options.enabled,
            },
        )?;
        let gate = FreshnessGate::new(options.freshness_window, options.clock);

        Ok(Self::from_parts(groups, users, gate))
    }

    /// Assemble from already constructed stores.
    pub fn from_parts(groups: Arc<GroupStore>, users: Arc<UserStore>, gate: FreshnessGate) -> Self {
        Self {
            registry: Arc::clone(groups.registry()),
            resolver: PermissionResolver::new(Arc::clone(&groups), Arc::clone(&users)),
            groups,
            users,
            gate,
        }
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    pub fn groups(&self) -> &Arc<GroupStore> {
        &self.groups
    }

    pub fn users(&self) -> &Arc<UserStore> {
        &self.users
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn gate(&self) -> &FreshnessGate {
        &self.gate
    }

    /// Pure policy check. Anonymous, unknown and inactive principals hold
    /// nothing.
    pub fn authorize(&self, principal: &Principal, required: &PermissionName) -> bool {
        principal
            .username()
            .is_some_and(|name| self.resolver.user_has_permission(name.as_str(), required))
    }

    /// Resolve the caller to an active account.
    pub(crate) fn caller_account(&self, caller: &Caller) -> AccessResult<User> {
        let Some(name) = caller.username() else {
            tracing::warn!("anonymous caller denied");
            return Err(AccessError::forbidden("authentication required"));
        };
        match self.users.find_user(name.as_str()) {
            Some(user) if user.active => Ok(user),
            Some(_) => {
                tracing::warn!(user = %name, "inactive caller denied");
                Err(AccessError::forbidden("account is deactivated"))
            }
            None => {
                tracing::warn!(user = %name, "unknown caller denied");
                Err(AccessError::forbidden("unknown principal"))
            }
        }
    }

    /// Fails with `Forbidden` unless the caller holds `required`.
    pub fn require_permission(&self, caller: &Caller, required: &PermissionName) -> AccessResult<User> {
        let user = self.caller_account(caller)?;
        if self.resolver.has_permission(&user, required) {
            return Ok(user);
        }
        tracing::warn!(user = %user.name, permission = %required, "permission denied");
        Err(AccessError::forbidden(format!("missing permission '{required}'")))
    }

    /// API-key callers present their credential on every request and count as
    /// fresh; callers without a session never are.
    pub fn is_fresh(&self, caller: &Caller) -> bool {
        match caller.authentication {
            Authentication::ApiKey => true,
            Authentication::Session(session) => self.gate.is_fresh(session),
            Authentication::None => false,
        }
    }

    /// Mandatory gate.
    pub fn require_fresh(&self, caller: &Caller) -> AccessResult<()> {
        match caller.authentication {
            Authentication::ApiKey => Ok(()),
            Authentication::Session(session) => self.gate.require_fresh(session),
            Authentication::None => {
                tracing::warn!(principal = %caller.principal, "step-up authentication required");
                Err(AccessError::StepUpRequired)
            }
        }
    }

    /// May `caller` act on the user named `target`?
    ///
    /// Self-service is always allowed. Otherwise the caller needs `ADMIN`,
    /// and for `sensitive` actions a fresh session on top.
    pub fn authorize_target(
        &self,
        caller: &Caller,
        target: &str,
        sensitive: bool,
    ) -> AccessResult<TargetAccess> {
        let user = self.caller_account(caller)?;
        if user.name.as_str() == target {
            return Ok(TargetAccess::SelfService);
        }
        if !self.resolver.is_admin(&user) {
            tracing::warn!(user = %user.name, target_user = %target, "acting on another user denied");
            return Err(AccessError::forbidden(format!("not allowed to act on '{target}'")));
        }
        if sensitive {
            self.require_fresh(caller)?;
        }
        Ok(TargetAccess::Administrator)
    }

    /// Explain why a check against `required` would be granted or denied.
    pub fn explain_authorization(
        &self,
        principal: &Principal,
        required: &PermissionName,
    ) -> AuthorizationExplanation {
        let user = principal
            .username()
            .and_then(|name| self.users.find_user(name.as_str()));
        explain_authorization(principal, user.as_ref(), required, |user| {
            self.resolver.effective_permissions(user).into_iter().collect()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub principal: PrincipalState,
    pub denial_reason: Option<DenialReason>,
}

/// State of the principal at the time of the check.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub username: Option<String>,
    pub active: bool,
    pub groups: Vec<String>,
    pub effective_permissions: Vec<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Anonymous,
    UnknownUser,
    Inactive,
    MissingPermission,
}

/// Explain an authorization decision without performing any I/O.
///
/// `effective` maps a user to its resolved permissions.
pub fn explain_authorization<F>(
    principal: &Principal,
    user: Option<&User>,
    required: &PermissionName,
    effective: F,
) -> AuthorizationExplanation
where
    F: Fn(&User) -> Vec<PermissionName>,
{
    let required_str = required.as_str().to_string();

    let Some(user) = user else {
        let (kind, reason) = match principal {
            Principal::Anonymous => (DenialKind::Anonymous, "Principal is anonymous".to_string()),
            Principal::User(name) => (DenialKind::UnknownUser, format!("User '{name}' does not exist")),
        };
        return AuthorizationExplanation {
            required_permission: required_str,
            granted: false,
            reason: reason.clone(),
            principal: PrincipalState {
                username: principal.username().map(ToString::to_string),
                active: false,
                groups: Vec::new(),
                effective_permissions: Vec::new(),
                is_admin: false,
            },
            denial_reason: Some(DenialReason {
                kind,
                message: reason,
                suggestions: vec!["Authenticate as an existing user".to_string()],
            }),
        };
    };

    let mut effective_list: Vec<String> = effective(user).iter().map(ToString::to_string).collect();
    effective_list.sort();
    let is_admin = effective_list.iter().any(|p| p == PermissionName::ADMIN.as_str());
    let has_required = effective_list.contains(&required_str);

    let state = PrincipalState {
        username: Some(user.name.to_string()),
        active: user.active,
        groups: user.groups.iter().map(ToString::to_string).collect(),
        effective_permissions: effective_list,
        is_admin,
    };

    if !user.active {
        return AuthorizationExplanation {
            required_permission: required_str,
            granted: false,
            reason: format!("User '{}' is deactivated", user.name),
            principal: state,
            denial_reason: Some(DenialReason {
                kind: DenialKind::Inactive,
                message: "Inactive users are denied everything".to_string(),
                suggestions: vec!["Reactivate the account".to_string()],
            }),
        };
    }

    if is_admin || has_required {
        let reason = if has_required {
            format!("Principal has permission '{required_str}'")
        } else {
            "Principal holds ADMIN, which satisfies every permission".to_string()
        };
        return AuthorizationExplanation {
            required_permission: required_str,
            granted: true,
            reason,
            principal: state,
            denial_reason: None,
        };
    }

    AuthorizationExplanation {
        reason: format!(
            "Principal does not have permission '{}'. Current permissions: {:?}",
            required_str, state.effective_permissions
        ),
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!("Missing required permission: '{required_str}'"),
            suggestions: vec![
                format!("Add the user to a group that grants '{required_str}'"),
                format!("Grant '{required_str}' to the user directly"),
            ],
        }),
        required_permission: required_str,
        granted: false,
        principal: state,
    }
}

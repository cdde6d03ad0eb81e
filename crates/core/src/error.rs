//! Access-control error model.

use thiserror::Error;

/// Result type used across the access-control engine.
pub type AccessResult<T> = Result<T, AccessError>;

/// Access-control error.
///
/// Every variant is deterministic: a failing store operation leaves no partial
/// mutation behind. Mapping kinds to transport statuses is the caller's job;
/// use [`AccessError::code`] rather than matching on messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    #[error("unknown permission '{0}'")]
    UnknownPermission(String),

    #[error("user '{0}' already exists")]
    UserAlreadyExists(String),

    #[error("group '{0}' already exists")]
    GroupAlreadyExists(String),

    #[error("permission '{0}' is already registered")]
    DuplicatePermission(String),

    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// A protected group was targeted by an update.
    #[error("group '{0}' can't be changed")]
    GroupCantBeChanged(String),

    /// A protected group was targeted by a removal.
    #[error("group '{0}' can't be removed")]
    GroupUnremovable(String),

    #[error("adding subgroup '{subgroup}' to '{group}' would create a cycle")]
    CyclicGroupGraph { group: String, subgroup: String },

    /// The session's credentials were not verified recently enough.
    #[error("credentials must be re-entered before this operation")]
    StepUpRequired,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("a user cannot remove itself")]
    SelfRemovalDenied,

    /// A supplied password did not match the stored credential.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("validation failed: {0}")]
    Validation(String),

    /// No user exists yet; only the first-run bootstrap is allowed.
    #[error("initial setup has not been completed")]
    SetupRequired,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl AccessError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn cycle(group: impl Into<String>, subgroup: impl Into<String>) -> Self {
        Self::CyclicGroupGraph {
            group: group.into(),
            subgroup: subgroup.into(),
        }
    }

    /// Stable machine-readable identifier of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownUser(_) => "unknown_user",
            Self::UnknownGroup(_) => "unknown_group",
            Self::UnknownPermission(_) => "unknown_permission",
            Self::UserAlreadyExists(_) => "user_already_exists",
            Self::GroupAlreadyExists(_) => "group_already_exists",
            Self::DuplicatePermission(_) => "duplicate_permission",
            Self::InvalidUsername(_) => "invalid_username",
            Self::GroupCantBeChanged(_) => "group_cant_be_changed",
            Self::GroupUnremovable(_) => "group_unremovable",
            Self::CyclicGroupGraph { .. } => "cyclic_group_graph",
            Self::StepUpRequired => "step_up_required",
            Self::Forbidden(_) => "forbidden",
            Self::SelfRemovalDenied => "self_removal_denied",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Validation(_) => "validation_error",
            Self::SetupRequired => "setup_required",
            Self::Storage(_) => "storage_error",
        }
    }

    /// True for the "target does not exist" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownUser(_) | Self::UnknownGroup(_) | Self::UnknownPermission(_)
        )
    }
}

//! Serializable shapes returned by the facade. Password hashes never appear
//! here.

use std::collections::BTreeSet;

use serde::Serialize;

use gatehouse_core::{GroupKey, Username};

use crate::group::Group;
use crate::permissions::PermissionName;
use crate::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub name: Username,
    pub active: bool,
    pub groups: BTreeSet<GroupKey>,
    pub permissions: BTreeSet<PermissionName>,
    pub effective_permissions: BTreeSet<PermissionName>,
    /// `None` when the user has no key or the viewing session is not fresh.
    pub api_key: Option<String>,
}

impl UserView {
    /// `redact` hides the API key (advisory freshness gate).
    pub fn new(user: &User, effective_permissions: BTreeSet<PermissionName>, redact: bool) -> Self {
        let api_key = if redact {
            None
        } else {
            user.api_key().map(|key| key.as_str().to_string())
        };
        Self {
            name: user.name.clone(),
            active: user.active,
            groups: user.groups.clone(),
            permissions: user.permissions.clone(),
            effective_permissions,
            api_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupView {
    pub key: GroupKey,
    pub name: String,
    pub description: String,
    pub permissions: BTreeSet<PermissionName>,
    pub subgroups: BTreeSet<GroupKey>,
    pub effective_permissions: BTreeSet<PermissionName>,
    pub default: bool,
    pub changeable: bool,
    pub removable: bool,
}

impl GroupView {
    pub fn new(group: Group, effective_permissions: BTreeSet<PermissionName>) -> Self {
        Self {
            key: group.key,
            name: group.name,
            description: group.description,
            permissions: group.permissions,
            subgroups: group.subgroups,
            effective_permissions,
            default: group.default,
            changeable: group.changeable,
            removable: group.removable,
        }
    }
}

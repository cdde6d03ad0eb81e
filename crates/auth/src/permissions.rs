//! Permission identities and the permission registry.

use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use gatehouse_core::{AccessError, AccessResult};

/// Permission identifier.
///
/// Permissions are compared by name only. `ADMIN` is the wildcard: holding it
/// satisfies every permission check without enumerating individual grants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionName(Cow<'static, str>);

impl PermissionName {
    pub const ADMIN: PermissionName = PermissionName::from_static("ADMIN");
    pub const STATUS: PermissionName = PermissionName::from_static("STATUS");
    pub const SETTINGS_READ: PermissionName = PermissionName::from_static("SETTINGS_READ");
    pub const SETTINGS: PermissionName = PermissionName::from_static("SETTINGS");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        *self == Self::ADMIN
    }
}

impl From<&'static str> for PermissionName {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<String> for PermissionName {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl Borrow<str> for PermissionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: PermissionName,
    pub description: String,
    /// Display/audit hint only; enforcement never reads it.
    pub dangerous: bool,
}

impl Permission {
    pub fn new(name: impl Into<PermissionName>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            dangerous: false,
        }
    }

    pub fn dangerous(mut self) -> Self {
        self.dangerous = true;
        self
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    ordered: Vec<Permission>,
    index: HashMap<PermissionName, usize>,
}

/// Append-only catalogue of known permissions.
///
/// Listing order is registration order.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    inner: RwLock<RegistryInner>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in vocabulary.
    pub fn with_builtin() -> Self {
        let ordered = builtin_permissions();
        let index = ordered
            .iter()
            .enumerate()
            .map(|(position, permission)| (permission.name.clone(), position))
            .collect();
        Self {
            inner: RwLock::new(RegistryInner { ordered, index }),
        }
    }

    pub fn register(&self, permission: Permission) -> AccessResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.index.contains_key(&permission.name) {
            return Err(AccessError::DuplicatePermission(permission.name.to_string()));
        }

        tracing::debug!(permission = %permission.name, dangerous = permission.dangerous, "permission registered");
        let position = inner.ordered.len();
        inner.index.insert(permission.name.clone(), position);
        inner.ordered.push(permission);
        Ok(())
    }

    pub fn all(&self) -> Vec<Permission> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ordered.clone()
    }

    pub fn lookup(&self, name: &str) -> AccessResult<Permission> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .index
            .get(name)
            .map(|&i| inner.ordered[i].clone())
            .ok_or_else(|| AccessError::UnknownPermission(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.index.contains_key(name)
    }

    /// Fail with `UnknownPermission` on the first unregistered name.
    pub fn validate<'a>(
        &self,
        names: impl IntoIterator<Item = &'a PermissionName>,
    ) -> AccessResult<()> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        for name in names {
            if !inner.index.contains_key(name) {
                return Err(AccessError::UnknownPermission(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn builtin_permissions() -> Vec<Permission> {
    vec![
        Permission::new(
            PermissionName::ADMIN,
            "Grants every capability, including user and group administration",
        )
        .dangerous(),
        Permission::new(PermissionName::STATUS, "View system status"),
        Permission::new(PermissionName::SETTINGS_READ, "Read settings"),
        Permission::new(PermissionName::SETTINGS, "Change settings").dangerous(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_lists_in_registration_order() {
        let registry = PermissionRegistry::with_builtin();
        let names: Vec<String> = registry.all().into_iter().map(|p| p.name.to_string()).collect();
        assert_eq!(names, vec!["ADMIN", "STATUS", "SETTINGS_READ", "SETTINGS"]);
        assert!(registry.lookup("ADMIN").unwrap().dangerous);
    }

    #[test]
    fn builtin_registry_is_indexed_and_extensible() {
        let registry = PermissionRegistry::with_builtin();
        for name in ["ADMIN", "STATUS", "SETTINGS_READ", "SETTINGS"] {
            assert_eq!(registry.lookup(name).unwrap().name.as_str(), name);
        }
        assert_eq!(
            registry.register(Permission::new("STATUS", "again")).unwrap_err(),
            AccessError::DuplicatePermission("STATUS".into())
        );

        registry.register(Permission::new("DEPLOY", "Deploy")).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.all().last().unwrap().name.as_str(), "DEPLOY");
        assert_eq!(registry.lookup("DEPLOY").unwrap().description, "Deploy");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = PermissionRegistry::new();
        registry.register(Permission::new("DEPLOY", "Deploy builds")).unwrap();

        let err = registry
            .register(Permission::new("DEPLOY", "Another description"))
            .unwrap_err();
        assert_eq!(err, AccessError::DuplicatePermission("DEPLOY".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("DEPLOY").unwrap().description, "Deploy builds");
    }

    #[test]
    fn lookup_unknown_permission() {
        let registry = PermissionRegistry::with_builtin();
        assert_eq!(
            registry.lookup("NOPE").unwrap_err(),
            AccessError::UnknownPermission("NOPE".into())
        );
    }

    #[test]
    fn validate_reports_first_unknown_name() {
        let registry = PermissionRegistry::with_builtin();
        let names = [PermissionName::STATUS, PermissionName::new("MISSING")];
        assert_eq!(
            registry.validate(&names).unwrap_err(),
            AccessError::UnknownPermission("MISSING".into())
        );
        assert!(registry.validate(&names[..1]).is_ok());
    }

    #[test]
    fn owned_and_static_names_compare_equal() {
        let owned = PermissionName::from(String::from("ADMIN"));
        assert_eq!(owned, PermissionName::ADMIN);
        assert!(owned.is_admin());
    }
}

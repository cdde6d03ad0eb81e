//! Effective-permission resolution.
//!
//! Resolution always reads the current group snapshot; nothing is cached, so
//! group or user mutations are visible to the very next check.

use std::collections::BTreeSet;
use std::sync::Arc;

use gatehouse_core::{AccessError, AccessResult};

use crate::group::{GroupStore, GroupTable, closure_permissions};
use crate::permissions::PermissionName;
use crate::user::{User, UserStore};

/// Direct grants ∪ permissions of every group in the membership closure.
pub fn resolve(user: &User, groups: &GroupTable) -> BTreeSet<PermissionName> {
    let mut effective = user.permissions.clone();
    effective.extend(closure_permissions(groups, &user.groups));
    effective
}

#[derive(Clone)]
pub struct PermissionResolver {
    groups: Arc<GroupStore>,
    users: Arc<UserStore>,
}

impl PermissionResolver {
    pub fn new(groups: Arc<GroupStore>, users: Arc<UserStore>) -> Self {
        Self { groups, users }
    }

    pub fn effective_permissions(&self, user: &User) -> BTreeSet<PermissionName> {
        resolve(user, &self.groups.snapshot())
    }

    pub fn effective_permissions_of(&self, name: &str) -> AccessResult<BTreeSet<PermissionName>> {
        let user = self
            .users
            .find_user(name)
            .ok_or_else(|| AccessError::UnknownUser(name.to_string()))?;
        Ok(self.effective_permissions(&user))
    }

    /// Inactive users hold nothing; `ADMIN` satisfies every check.
    pub fn has_permission(&self, user: &User, permission: &PermissionName) -> bool {
        if !user.active {
            return false;
        }
        let effective = self.effective_permissions(user);
        effective.contains(&PermissionName::ADMIN) || effective.contains(permission)
    }

    /// Unknown users hold nothing.
    pub fn user_has_permission(&self, name: &str, permission: &PermissionName) -> bool {
        self.users
            .find_user(name)
            .is_some_and(|user| self.has_permission(&user, permission))
    }

    pub fn is_admin(&self, user: &User) -> bool {
        self.has_permission(user, &PermissionName::ADMIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{ADMIN_GROUP, NewGroup};
    use crate::permissions::Permission;
    use crate::test_support::{Fixture, fixture};
    use crate::user::NewUser;

    fn resolver(f: &Fixture) -> PermissionResolver {
        PermissionResolver::new(Arc::clone(&f.groups), Arc::clone(&f.users))
    }

    #[test]
    fn group_member_gets_group_permissions_only() {
        let f = fixture();
        f.groups
            .add_group(NewGroup::new("ops", "Ops").permissions(["DEPLOY"]))
            .unwrap();
        let alice = f.users.add_user(NewUser::new("alice", "pw").groups(["ops"])).unwrap();

        let resolver = resolver(&f);
        assert!(resolver.has_permission(&alice, &PermissionName::new("DEPLOY")));
        assert!(!resolver.has_permission(&alice, &PermissionName::ADMIN));
    }

    #[test]
    fn direct_grants_and_nested_groups_combine() {
        let f = fixture();
        f.groups.add_group(NewGroup::new("logs", "Logs").permissions(["READ_LOGS"])).unwrap();
        f.groups.add_group(NewGroup::new("ops", "Ops").subgroups(["logs"])).unwrap();
        f.users
            .add_user(NewUser::new("alice", "pw").groups(["ops"]).permissions(["RESTART"]))
            .unwrap();

        let effective = resolver(&f).effective_permissions_of("alice").unwrap();
        let names: Vec<&str> = effective.iter().map(PermissionName::as_str).collect();
        assert_eq!(names, vec!["READ_LOGS", "RESTART"]);
    }

    #[test]
    fn inactive_users_hold_nothing() {
        let f = fixture();
        let admin = f
            .users
            .add_user(NewUser::new("root", "pw").groups([ADMIN_GROUP]).active(false))
            .unwrap();

        let resolver = resolver(&f);
        assert!(!resolver.has_permission(&admin, &PermissionName::ADMIN));
        assert!(!resolver.user_has_permission("root", &PermissionName::STATUS));
    }

    #[test]
    fn admin_satisfies_permissions_registered_later() {
        let f = fixture();
        let root = f.users.add_user(NewUser::new("root", "pw").groups([ADMIN_GROUP])).unwrap();

        f.groups
            .registry()
            .register(Permission::new("NEW_FEATURE", "Added after the grant"))
            .unwrap();

        let resolver = resolver(&f);
        for permission in f.groups.registry().all() {
            assert!(resolver.has_permission(&root, &permission.name), "{}", permission.name);
        }
    }

    #[test]
    fn resolution_reflects_group_changes_immediately() {
        let f = fixture();
        f.groups.add_group(NewGroup::new("ops", "Ops")).unwrap();
        f.users.add_user(NewUser::new("alice", "pw").groups(["ops"])).unwrap();

        let resolver = resolver(&f);
        let deploy = PermissionName::new("DEPLOY");
        assert!(!resolver.user_has_permission("alice", &deploy));

        f.groups
            .update_group(
                "ops",
                crate::group::GroupUpdate {
                    permissions: Some(vec![deploy.clone()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(resolver.user_has_permission("alice", &deploy));

        f.groups.remove_group("ops").unwrap();
        assert!(!resolver.user_has_permission("alice", &deploy));
    }

    #[test]
    fn unknown_user() {
        let f = fixture();
        assert_eq!(
            resolver(&f).effective_permissions_of("ghost").unwrap_err(),
            AccessError::UnknownUser("ghost".into())
        );
        assert!(!resolver(&f).user_has_permission("ghost", &PermissionName::STATUS));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: effective permissions do not depend on assignment order.
            #[test]
            fn assignment_order_is_irrelevant(
                order in Just(vec!["ops", "logs", "restart", "users"]).prop_shuffle(),
            ) {
                let f = fixture();
                f.groups.add_group(NewGroup::new("logs", "Logs").permissions(["READ_LOGS"])).unwrap();
                f.groups.add_group(NewGroup::new("ops", "Ops").permissions(["DEPLOY"]).subgroups(["logs"])).unwrap();
                f.groups.add_group(NewGroup::new("restart", "Restart").permissions(["RESTART"])).unwrap();

                let canonical = vec!["ops", "logs", "restart", "users"];
                let a = f.users.add_user(NewUser::new("a", "pw").groups(canonical)).unwrap();
                let b = f.users.add_user(NewUser::new("b", "pw").groups(order.clone())).unwrap();

                let c = f.users.add_user(NewUser::new("c", "pw").groups(Vec::<&str>::new())).unwrap();
                for prefix in 1..=order.len() {
                    let groups = order[..prefix].iter().map(|k| (*k).into()).collect();
                    f.users.change_user_groups("c", groups).unwrap();
                }
                let c = f.users.find_user(c.name.as_str()).unwrap();

                let resolver = resolver(&f);
                prop_assert_eq!(resolver.effective_permissions(&a), resolver.effective_permissions(&b));
                prop_assert_eq!(resolver.effective_permissions(&a), resolver.effective_permissions(&c));
            }
        }
    }
}

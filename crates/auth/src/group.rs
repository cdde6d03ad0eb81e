//! Group hierarchy: groups grant permissions and nest other groups.
//!
//! Groups live in an arena keyed by [`GroupKey`]; subgroup edges are sets of
//! keys. The subgroup graph is a DAG (a group may have several parents) and
//! every mutation re-checks acyclicity before it is committed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};

use gatehouse_core::{AccessError, AccessResult, Entity, GroupKey, index_by_id};

use crate::permissions::{PermissionName, PermissionRegistry};
use crate::persistence::AccessPersistence;

/// Built-in administrators group. Neither changeable nor removable.
pub const ADMIN_GROUP: &str = "admins";

/// Built-in default group for regular accounts. Not removable.
pub const USER_GROUP: &str = "users";

/// Arena of groups, ordered by key.
pub type GroupTable = BTreeMap<GroupKey, Group>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub key: GroupKey,
    pub name: String,
    pub description: String,
    pub permissions: BTreeSet<PermissionName>,
    pub subgroups: BTreeSet<GroupKey>,
    /// Assigned to new users that don't specify their groups.
    pub default: bool,
    pub changeable: bool,
    pub removable: bool,
}

impl Entity for Group {
    type Id = GroupKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

/// Input for [`GroupStore::add_group`].
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub key: GroupKey,
    pub name: String,
    pub description: String,
    pub permissions: Vec<PermissionName>,
    pub subgroups: Vec<GroupKey>,
    pub default: bool,
}

impl NewGroup {
    pub fn new(key: impl Into<GroupKey>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            permissions: Vec::new(),
            subgroups: Vec::new(),
            default: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn permissions<P: Into<PermissionName>>(mut self, permissions: impl IntoIterator<Item = P>) -> Self {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn subgroups<K: Into<GroupKey>>(mut self, subgroups: impl IntoIterator<Item = K>) -> Self {
        self.subgroups = subgroups.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_group(mut self, default: bool) -> Self {
        self.default = default;
        self
    }
}

/// Partial update: only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    pub description: Option<String>,
    pub permissions: Option<Vec<PermissionName>>,
    pub subgroups: Option<Vec<GroupKey>>,
    pub default: Option<bool>,
}

/// Holder of group references that must follow group removal.
pub trait GroupMembers: Send + Sync {
    /// Drop `key` from every member. All-or-nothing.
    fn unassign_group(&self, key: &GroupKey) -> AccessResult<()>;
}

/// Shared store of groups.
///
/// Mutations are serialized by `writer` and committed by swapping a new
/// snapshot into `state`; readers only hold `state` long enough to clone the
/// `Arc`, so durable saves never block them.
pub struct GroupStore {
    registry: Arc<PermissionRegistry>,
    persistence: Arc<dyn AccessPersistence>,
    state: RwLock<Arc<GroupTable>>,
    writer: Mutex<()>,
    members: RwLock<Vec<Weak<dyn GroupMembers>>>,
}

impl GroupStore {
    pub fn new(
        registry: Arc<PermissionRegistry>,
        persistence: Arc<dyn AccessPersistence>,
    ) -> AccessResult<Self> {
        let loaded = index_by_id(persistence.load_groups()?);
        tracing::debug!(groups = loaded.len(), "group store loaded");

        Ok(Self {
            registry,
            persistence,
            state: RwLock::new(Arc::new(loaded)),
            writer: Mutex::new(()),
            members: RwLock::new(Vec::new()),
        })
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    /// Create missing built-in groups and re-assert their protection flags.
    pub fn ensure_builtin_groups(&self) -> AccessResult<()> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let mut next = (*current).clone();

        for builtin in builtin_groups() {
            self.registry.validate(&builtin.permissions)?;
            match next.get_mut(&builtin.key) {
                Some(existing) => {
                    existing.changeable = builtin.changeable;
                    existing.removable = builtin.removable;
                    if !existing.changeable {
                        existing.permissions = builtin.permissions;
                        existing.subgroups = builtin.subgroups;
                    }
                }
                None => {
                    next.insert(builtin.key.clone(), builtin);
                }
            }
        }

        if next != *current {
            self.commit(next)?;
            tracing::info!("built-in groups written");
        }
        Ok(())
    }

    /// Consistent point-in-time view of every group.
    pub fn snapshot(&self) -> Arc<GroupTable> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn add_group(&self, new: NewGroup) -> AccessResult<Group> {
        if new.key.as_str().trim().is_empty() {
            return Err(AccessError::validation("group key cannot be empty"));
        }

        let _writer = self.lock_writer();
        let current = self.snapshot();

        if current.contains_key(&new.key) {
            return Err(AccessError::GroupAlreadyExists(new.key.to_string()));
        }
        if new.subgroups.contains(&new.key) {
            return Err(AccessError::cycle(new.key.as_str(), new.key.as_str()));
        }
        self.registry.validate(&new.permissions)?;
        ensure_known(&current, &new.subgroups)?;

        let group = Group {
            key: new.key,
            name: new.name,
            description: new.description,
            permissions: new.permissions.into_iter().collect(),
            subgroups: new.subgroups.into_iter().collect(),
            default: new.default,
            changeable: true,
            removable: true,
        };

        let mut next = (*current).clone();
        next.insert(group.key.clone(), group.clone());
        ensure_acyclic(&next, &group.key)?;
        self.commit(next)?;

        tracing::info!(group = %group.key, "group created");
        Ok(group)
    }

    pub fn update_group(&self, key: &str, update: GroupUpdate) -> AccessResult<Group> {
        let _writer = self.lock_writer();
        let current = self.snapshot();

        let existing = current
            .get(key)
            .ok_or_else(|| AccessError::UnknownGroup(key.to_string()))?;
        if !existing.changeable {
            return Err(AccessError::GroupCantBeChanged(key.to_string()));
        }

        let mut group = existing.clone();
        if let Some(description) = update.description {
            group.description = description;
        }
        if let Some(permissions) = update.permissions {
            self.registry.validate(&permissions)?;
            group.permissions = permissions.into_iter().collect();
        }
        if let Some(subgroups) = update.subgroups {
            if subgroups.contains(&group.key) {
                return Err(AccessError::cycle(key, key));
            }
            ensure_known(&current, &subgroups)?;
            group.subgroups = subgroups.into_iter().collect();
        }
        if let Some(default) = update.default {
            group.default = default;
        }

        let mut next = (*current).clone();
        next.insert(group.key.clone(), group.clone());
        ensure_acyclic(&next, &group.key)?;
        self.commit(next)?;

        tracing::info!(group = %group.key, "group updated");
        Ok(group)
    }

    /// Remove a group and every reference to it (subgroup edges and user
    /// memberships).
    ///
    /// If unassigning members fails the previous table is restored. When the
    /// restore cannot be saved either, the returned `Storage` error says so;
    /// memberships left pointing at the removed group are dropped by
    /// [`UserStore::new`](crate::user::UserStore::new) on the next load.
    pub fn remove_group(&self, key: &str) -> AccessResult<()> {
        let _writer = self.lock_writer();
        let current = self.snapshot();

        let group = current
            .get(key)
            .ok_or_else(|| AccessError::UnknownGroup(key.to_string()))?;
        if !group.removable {
            return Err(AccessError::GroupUnremovable(key.to_string()));
        }
        let removed = group.key.clone();

        let mut next = (*current).clone();
        next.remove(key);
        for other in next.values_mut() {
            other.subgroups.remove(key);
        }
        self.commit(next)?;

        if let Err(err) = self.notify_removed(&removed) {
            if let Err(restore) = self.commit((*current).clone()) {
                tracing::error!(group = %removed, error = %restore, "failed to restore group after aborted removal");
                return Err(AccessError::storage(format!(
                    "removal of group '{removed}' aborted ({err}) and restore failed ({restore}); \
                     memberships are repaired on next load"
                )));
            }
            return Err(err);
        }

        tracing::info!(group = %removed, "group removed");
        Ok(())
    }

    pub fn find_group(&self, key: &str) -> Option<Group> {
        self.snapshot().get(key).cloned()
    }

    pub fn list_groups(&self) -> Vec<Group> {
        self.snapshot().values().cloned().collect()
    }

    pub fn default_groups(&self) -> BTreeSet<GroupKey> {
        self.snapshot()
            .values()
            .filter(|g| g.default)
            .map(|g| g.key.clone())
            .collect()
    }

    /// Direct permissions plus those of every transitive subgroup.
    pub fn effective_permissions(&self, key: &str) -> AccessResult<BTreeSet<PermissionName>> {
        let table = self.snapshot();
        let group = table
            .get(key)
            .ok_or_else(|| AccessError::UnknownGroup(key.to_string()))?;
        Ok(closure_permissions(&table, [&group.key]))
    }

    /// Fail with `UnknownGroup` on the first key that does not exist.
    pub fn validate_keys<'a>(&self, keys: impl IntoIterator<Item = &'a GroupKey>) -> AccessResult<()> {
        let table = self.snapshot();
        ensure_known(&table, keys)
    }

    /// Register a holder of group references to be cleaned up on removal.
    pub fn attach_members(&self, members: Weak<dyn GroupMembers>) {
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(members);
    }

    fn notify_removed(&self, key: &GroupKey) -> AccessResult<()> {
        let members: Vec<Arc<dyn GroupMembers>> = self
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        for holder in members {
            holder.unassign_group(key)?;
        }
        Ok(())
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, next: GroupTable) -> AccessResult<()> {
        let groups: Vec<Group> = next.values().cloned().collect();
        self.persistence.save_groups(&groups)?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        Ok(())
    }
}

fn builtin_groups() -> Vec<Group> {
    vec![
        Group {
            key: GroupKey::new(ADMIN_GROUP),
            name: "Admins".into(),
            description: "Administrators with full access".into(),
            permissions: BTreeSet::from([PermissionName::ADMIN]),
            subgroups: BTreeSet::new(),
            default: false,
            changeable: false,
            removable: false,
        },
        Group {
            key: GroupKey::new(USER_GROUP),
            name: "Users".into(),
            description: "Regular accounts".into(),
            permissions: BTreeSet::from([PermissionName::STATUS, PermissionName::SETTINGS_READ]),
            subgroups: BTreeSet::new(),
            default: true,
            changeable: true,
            removable: false,
        },
    ]
}

fn ensure_known<'a>(
    table: &GroupTable,
    keys: impl IntoIterator<Item = &'a GroupKey>,
) -> AccessResult<()> {
    for key in keys {
        if !table.contains_key(key) {
            return Err(AccessError::UnknownGroup(key.to_string()));
        }
    }
    Ok(())
}

fn ensure_acyclic(table: &GroupTable, start: &GroupKey) -> AccessResult<()> {
    let Some(group) = table.get(start) else {
        return Ok(());
    };
    for sub in &group.subgroups {
        if reaches(table, sub, start) {
            return Err(AccessError::cycle(start.as_str(), sub.as_str()));
        }
    }
    Ok(())
}

/// True if `target` is `from` or one of its transitive subgroups.
pub fn reaches(table: &GroupTable, from: &GroupKey, target: &GroupKey) -> bool {
    closure_groups(table, [from]).contains(target)
}

/// Every group reachable from `roots` (roots included). Unknown keys are
/// skipped; the visited set guards against malformed graphs.
pub fn closure_groups<'a>(
    table: &'a GroupTable,
    roots: impl IntoIterator<Item = &'a GroupKey>,
) -> BTreeSet<&'a GroupKey> {
    let mut visited: BTreeSet<&GroupKey> = BTreeSet::new();
    let mut stack: Vec<&GroupKey> = roots.into_iter().collect();

    while let Some(key) = stack.pop() {
        let Some((key, group)) = table.get_key_value(key) else {
            continue;
        };
        if visited.insert(key) {
            stack.extend(group.subgroups.iter());
        }
    }
    visited
}

/// Union of direct permissions over the subgroup closure of `roots`.
pub fn closure_permissions<'a>(
    table: &'a GroupTable,
    roots: impl IntoIterator<Item = &'a GroupKey>,
) -> BTreeSet<PermissionName> {
    closure_groups(table, roots)
        .into_iter()
        .filter_map(|key| table.get(key))
        .flat_map(|group| group.permissions.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;
    use crate::persistence::InMemoryPersistence;

    fn store_with(persistence: Arc<InMemoryPersistence>) -> GroupStore {
        let registry = Arc::new(PermissionRegistry::with_builtin());
        for name in ["DEPLOY", "READ_LOGS", "RESTART"] {
            registry.register(Permission::new(name, name)).unwrap();
        }
        let store = GroupStore::new(registry, persistence).unwrap();
        store.ensure_builtin_groups().unwrap();
        store
    }

    fn store() -> GroupStore {
        store_with(Arc::new(InMemoryPersistence::new()))
    }

    fn names(set: &BTreeSet<PermissionName>) -> Vec<&str> {
        set.iter().map(PermissionName::as_str).collect()
    }

    #[test]
    fn builtin_groups_are_protected() {
        let store = store();
        let admins = store.find_group(ADMIN_GROUP).unwrap();
        assert!(!admins.changeable && !admins.removable);
        assert!(admins.permissions.contains(&PermissionName::ADMIN));

        let users = store.find_group(USER_GROUP).unwrap();
        assert!(users.default && users.changeable && !users.removable);
        assert_eq!(store.default_groups(), BTreeSet::from([GroupKey::new(USER_GROUP)]));
    }

    #[test]
    fn ensure_builtin_groups_is_idempotent_and_reasserts_flags() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = store_with(Arc::clone(&persistence));
        store.ensure_builtin_groups().unwrap();
        assert_eq!(store.list_groups().len(), 2);

        let mut tampered = persistence.load_groups().unwrap();
        for g in &mut tampered {
            g.removable = true;
            g.changeable = true;
        }
        persistence.save_groups(&tampered).unwrap();

        let reloaded = store_with(persistence);
        let admins = reloaded.find_group(ADMIN_GROUP).unwrap();
        assert!(!admins.removable && !admins.changeable);
        assert!(!reloaded.find_group(USER_GROUP).unwrap().removable);
    }

    #[test]
    fn add_group_validates_references() {
        let store = store();

        let err = store
            .add_group(NewGroup::new("ops", "Ops").permissions(["NOPE"]))
            .unwrap_err();
        assert_eq!(err, AccessError::UnknownPermission("NOPE".into()));

        let err = store
            .add_group(NewGroup::new("ops", "Ops").subgroups(["ghost"]))
            .unwrap_err();
        assert_eq!(err, AccessError::UnknownGroup("ghost".into()));

        assert!(store.find_group("ops").is_none());
    }

    #[test]
    fn add_group_rejects_duplicates_and_empty_keys() {
        let store = store();
        store.add_group(NewGroup::new("ops", "Ops")).unwrap();

        assert_eq!(
            store.add_group(NewGroup::new("ops", "Other")).unwrap_err(),
            AccessError::GroupAlreadyExists("ops".into())
        );
        assert_eq!(
            store.add_group(NewGroup::new(" ", "Blank")).unwrap_err().code(),
            "validation_error"
        );
    }

    #[test]
    fn self_subgroup_is_a_cycle() {
        let store = store();
        let err = store
            .add_group(NewGroup::new("ops", "Ops").subgroups(["ops"]))
            .unwrap_err();
        assert_eq!(err.code(), "cyclic_group_graph");

        store.add_group(NewGroup::new("ops", "Ops")).unwrap();
        let err = store
            .update_group(
                "ops",
                GroupUpdate {
                    subgroups: Some(vec!["ops".into()]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, AccessError::cycle("ops", "ops"));
    }

    #[test]
    fn transitive_cycle_is_rejected_and_graph_unchanged() {
        let store = store();
        store.add_group(NewGroup::new("c", "C")).unwrap();
        store.add_group(NewGroup::new("b", "B").subgroups(["c"])).unwrap();
        store.add_group(NewGroup::new("a", "A").subgroups(["b"])).unwrap();

        let before = store.snapshot();
        let err = store
            .update_group(
                "c",
                GroupUpdate {
                    subgroups: Some(vec!["a".into()]),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert_eq!(err, AccessError::cycle("c", "a"));
        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn diamond_shaped_hierarchy_is_allowed() {
        let store = store();
        store.add_group(NewGroup::new("base", "Base").permissions(["READ_LOGS"])).unwrap();
        store.add_group(NewGroup::new("left", "Left").subgroups(["base"])).unwrap();
        store.add_group(NewGroup::new("right", "Right").subgroups(["base"])).unwrap();
        store
            .add_group(NewGroup::new("top", "Top").permissions(["DEPLOY"]).subgroups(["left", "right"]))
            .unwrap();

        let effective = store.effective_permissions("top").unwrap();
        assert_eq!(names(&effective), vec!["DEPLOY", "READ_LOGS"]);
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let store = store();
        store
            .add_group(NewGroup::new("ops", "Ops").description("operators").permissions(["DEPLOY"]))
            .unwrap();

        let updated = store
            .update_group(
                "ops",
                GroupUpdate {
                    default: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(updated.default);
        assert_eq!(updated.description, "operators");
        assert_eq!(names(&updated.permissions), vec!["DEPLOY"]);
        assert!(store.default_groups().contains("ops"));
    }

    #[test]
    fn update_rejects_unknown_and_protected_groups() {
        let store = store();
        assert_eq!(
            store.update_group("ghost", GroupUpdate::default()).unwrap_err(),
            AccessError::UnknownGroup("ghost".into())
        );
        assert_eq!(
            store
                .update_group(
                    ADMIN_GROUP,
                    GroupUpdate {
                        permissions: Some(vec![]),
                        ..Default::default()
                    },
                )
                .unwrap_err(),
            AccessError::GroupCantBeChanged(ADMIN_GROUP.into())
        );
    }

    #[test]
    fn remove_group_strips_subgroup_edges() {
        let store = store();
        store.add_group(NewGroup::new("base", "Base").permissions(["READ_LOGS"])).unwrap();
        store.add_group(NewGroup::new("ops", "Ops").subgroups(["base"])).unwrap();

        store.remove_group("base").unwrap();

        assert!(store.find_group("base").is_none());
        assert!(store.find_group("ops").unwrap().subgroups.is_empty());
        assert!(store.effective_permissions("ops").unwrap().is_empty());
    }

    #[test]
    fn remove_group_respects_protection() {
        let store = store();
        assert_eq!(
            store.remove_group(USER_GROUP).unwrap_err(),
            AccessError::GroupUnremovable(USER_GROUP.into())
        );
        assert_eq!(
            store.remove_group("ghost").unwrap_err(),
            AccessError::UnknownGroup("ghost".into())
        );
        assert!(store.find_group(USER_GROUP).is_some());
    }

    struct RefusingMembers;

    impl GroupMembers for RefusingMembers {
        fn unassign_group(&self, _key: &GroupKey) -> AccessResult<()> {
            Err(AccessError::storage("members unavailable"))
        }
    }

    #[test]
    fn failed_unassignment_restores_the_group() {
        let store = store();
        store.add_group(NewGroup::new("base", "Base")).unwrap();
        store.add_group(NewGroup::new("ops", "Ops").subgroups(["base"])).unwrap();
        let before = store.snapshot();

        let members: Arc<dyn GroupMembers> = Arc::new(RefusingMembers);
        store.attach_members(Arc::downgrade(&members));

        assert_eq!(
            store.remove_group("base").unwrap_err(),
            AccessError::storage("members unavailable")
        );
        assert_eq!(*store.snapshot(), *before);
        assert!(store.find_group("ops").unwrap().subgroups.contains("base"));
    }

    #[test]
    fn failed_save_leaves_store_unchanged() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = store_with(Arc::clone(&persistence));
        let before = store.snapshot();

        persistence.set_failing(true);
        let err = store.add_group(NewGroup::new("ops", "Ops")).unwrap_err();

        assert_eq!(err.code(), "storage_error");
        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn store_reloads_from_persistence() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let store = store_with(Arc::clone(&persistence));
        store.add_group(NewGroup::new("ops", "Ops").permissions(["DEPLOY"])).unwrap();

        let reloaded = store_with(persistence);
        assert_eq!(reloaded.find_group("ops"), store.find_group("ops"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        const PERMS: [&str; 3] = ["DEPLOY", "READ_LOGS", "RESTART"];

        /// Random DAG: edges only point from lower to higher index.
        fn dag() -> impl Strategy<Value = Vec<(Vec<usize>, Vec<usize>)>> {
            (1usize..7).prop_flat_map(|n| {
                let nodes: Vec<_> = (0..n)
                    .map(|i| {
                        let later: Vec<usize> = (i + 1..n).collect();
                        (
                            proptest::sample::subsequence(later.clone(), 0..=later.len()),
                            proptest::sample::subsequence(vec![0usize, 1, 2], 0..=3),
                        )
                    })
                    .collect();
                nodes
            })
        }

        fn build(shape: &[(Vec<usize>, Vec<usize>)]) -> GroupStore {
            let store = store();
            for i in (0..shape.len()).rev() {
                let (subs, perms) = &shape[i];
                store
                    .add_group(
                        NewGroup::new(format!("g{i}"), format!("G{i}"))
                            .subgroups(subs.iter().map(|j| format!("g{j}")))
                            .permissions(perms.iter().map(|p| PERMS[*p])),
                    )
                    .unwrap();
            }
            store
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: effective(G) ⊇ direct(G) ∪ effective(S) for every subgroup S.
            #[test]
            fn closure_is_superset_of_subgroups(shape in dag()) {
                let store = build(&shape);
                for i in 0..shape.len() {
                    let key = format!("g{i}");
                    let group = store.find_group(&key).unwrap();
                    let effective = store.effective_permissions(&key).unwrap();

                    prop_assert!(effective.is_superset(&group.permissions));
                    for sub in &group.subgroups {
                        let sub_effective = store.effective_permissions(sub.as_str()).unwrap();
                        prop_assert!(effective.is_superset(&sub_effective));
                    }
                }
            }

            /// Property: closing a loop is rejected and leaves the graph untouched.
            #[test]
            fn closing_a_loop_is_rejected(shape in dag()) {
                let store = build(&shape);
                let before = store.snapshot();

                for i in 0..shape.len() {
                    let top = GroupKey::new(format!("g{i}"));
                    let below: Vec<GroupKey> = closure_groups(&before, [&top]).into_iter().cloned().collect();

                    for lower in below {
                        let mut subgroups: Vec<GroupKey> = before[&lower].subgroups.iter().cloned().collect();
                        subgroups.push(top.clone());

                        let result = store.update_group(
                            lower.as_str(),
                            GroupUpdate { subgroups: Some(subgroups), ..Default::default() },
                        );
                        prop_assert_eq!(result.unwrap_err().code(), "cyclic_group_graph");
                        let after = store.snapshot();
                        prop_assert_eq!(&*after, &*before);
                    }
                }
            }
        }
    }
}

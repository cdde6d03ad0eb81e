//! Entity trait: identity + continuity across state changes.

use std::collections::BTreeMap;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Ord + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Index a flat collection (as loaded from a durable store) by identity.
///
/// Later duplicates replace earlier ones.
pub fn index_by_id<E: Entity>(items: impl IntoIterator<Item = E>) -> BTreeMap<E::Id, E> {
    items
        .into_iter()
        .map(|item| (item.id().clone(), item))
        .collect()
}

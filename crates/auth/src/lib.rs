//! `gatehouse-auth`: identity and access-control engine.
//!
//! This crate is intentionally decoupled from HTTP and from any concrete
//! storage backend; durable state goes through [`AccessPersistence`].

pub mod access;
pub mod authorize;
pub mod credentials;
pub mod freshness;
pub mod group;
pub mod permissions;
pub mod persistence;
pub mod principal;
pub mod resolver;
pub mod user;
pub mod views;

#[cfg(test)]
mod test_support;

pub use authorize::{
    AccessControl, AccessOptions, AuthorizationExplanation, DenialKind, DenialReason,
    PrincipalState, TargetAccess, explain_authorization,
};
pub use credentials::{
    ApiKey, Argon2Hasher, OsRngTokenGenerator, PasswordHash, PasswordHasher, TokenGenerator,
};
pub use freshness::{DEFAULT_WINDOW_SECS, Freshness, FreshnessGate};
pub use group::{
    ADMIN_GROUP, Group, GroupMembers, GroupStore, GroupTable, GroupUpdate, NewGroup, USER_GROUP,
};
pub use permissions::{Permission, PermissionName, PermissionRegistry};
pub use persistence::{AccessPersistence, InMemoryPersistence, PersistenceError};
pub use principal::{Authentication, Caller, Principal};
pub use resolver::{PermissionResolver, resolve};
pub use user::{NewUser, User, UserSettings, UserStore, UserStoreOptions, UserTable, UserUpdate};
pub use views::{GroupView, UserView};

//! `gatehouse-core`: identity and access-control primitives.
//!
//! This crate contains **pure** building blocks (no storage, no transport).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::{Entity, index_by_id};
pub use error::{AccessError, AccessResult};
pub use id::{GroupKey, SessionId, Username};

//! Infrastructure layer: durable-store adapters and configuration.

pub mod config;
pub mod json_file;

pub use config::{AdminBootstrap, Config, is_truthy};
pub use json_file::JsonFilePersistence;

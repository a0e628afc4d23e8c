//! Infrastructure layer - external adapters (remote API, configuration).
//!
//! This layer handles all I/O with the provider and the local environment.

pub mod config;
pub mod http;

pub use config::{load_config, resolve_token, BackupConfig};
pub use http::ApiClient;

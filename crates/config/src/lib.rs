//! Configuration for the qtrade client: schema, file discovery and
//! environment overrides.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, credentials_path, discover_and_load, load_config},
    schema::{AuthConfig, HttpConfig, QtradeConfig, StoreConfig},
};

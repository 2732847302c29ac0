//! Configuration schema and YAML loader for the adapter configuration file
//! consumed by the `portcullis` proxy engine. Loading from disk is an
//! external collaborator of the proxy engine, not part of its core, but
//! both crates agree on the schema defined here.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::ConfigError;
pub use loader::load_from_path;
pub use schema::{Configuration, EndpointConfig};

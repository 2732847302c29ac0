use miette::Diagnostic;
use thiserror::Error;

/// Everything that can go wrong while locating or parsing the adapter
/// configuration file. Both variants abort startup; neither is a runtime
/// error once the server is serving requests.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration file was not found at the resolved path.
    #[error("the adapter configuration file '{path}' was not found")]
    #[diagnostic(code(portcullis::config::no_configuration))]
    NoConfiguration { path: String },

    /// The file was found but its content violates the schema: missing
    /// `endpoints`/`adapters`, an unknown per-endpoint key, a dangling
    /// adapter reference, or an endpoint left with no hooks.
    #[error("invalid adapter configuration: {message}")]
    #[diagnostic(code(portcullis::config::invalid))]
    ConfigInvalid { message: String },

    #[error("failed to parse configuration YAML")]
    #[diagnostic(code(portcullis::config::yaml))]
    Yaml(#[source] serde_yaml::Error),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::ConfigInvalid {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

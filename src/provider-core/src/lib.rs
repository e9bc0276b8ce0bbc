//! Provider capability surface shared by the plugin framework and provider crates.

pub mod config;
pub mod diagnostics;
pub mod logging;
pub mod provider;
pub mod provider_contract;
pub mod redact;
pub mod schema;

pub use config::{ConfigError, HandshakeConfig, LogLevel, LoggingConfig, ServeConfig};
pub use diagnostics::{has_errors, Diagnostic, Severity};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use provider::{Provider, ProviderError, ProviderFunc, ProviderResult};
pub use provider_contract::{
    run_provider_contract, ProviderContractError, ProviderContractExpectations,
};
pub use schema::{Attribute, AttributeType, Block, ProviderSchema, Schema};

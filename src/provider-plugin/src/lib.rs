//! Plugin serving for Terraform providers.
//!
//! This crate provides:
//! - [`serve`], which hands a provider factory to the plugin transport for the
//!   lifetime of the process
//! - [`ProviderHost`], the session state around the served provider
//! - [`HostedProvider`], the bridge from [`provider_core::Provider`] to the
//!   `tfplugin6` traits of `tf_provider`
//!
//! # Session
//!
//! 1. The host launches the plugin with `TF_PLUGIN_MAGIC_COOKIE` set and,
//!    optionally, `PLUGIN_PROTOCOL_VERSIONS`.
//! 2. Without the cookie, or without protocol 6 on offer, serve fails before
//!    anything is written to stdout.
//! 3. The transport prints its handshake line (`1|6|tcp|<addr>|grpc|<cert>`)
//!    and serves gRPC until the host stops it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use provider_plugin::{serve, ServeOpts};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), provider_plugin::ServeError> {
//!     serve(ServeOpts {
//!         provider_func: my_provider::provider,
//!     })
//!     .await
//! }
//! ```

mod bridge;
pub mod handshake;
mod host;

use provider_core::config::MAGIC_COOKIE_ENV;
use provider_core::{init_logging, ConfigError, LoggingError, ProviderFunc, ServeConfig};
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;

pub use bridge::{HostedDataSource, HostedProvider, HostedResource};
pub use handshake::{HandshakeError, MAGIC_COOKIE_VALUE, TRANSPORT_PROTOCOL_VERSION};
pub use host::{EnvLookup, ProviderHost};

/// Options accepted by [`serve`].
#[derive(Debug, Clone, Copy)]
pub struct ServeOpts {
    /// Factory invoked once to build the provider being served.
    pub provider_func: ProviderFunc,
}

/// Errors that end a serve session.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error("invalid plugin environment: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),
    #[error("plugin transport failed: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

/// Serve a provider to the launching host until the host shuts it down.
///
/// Nothing is written to stdout unless the host presented the magic cookie
/// and offered a protocol version the transport speaks.
pub async fn serve(opts: ServeOpts) -> Result<(), ServeError> {
    let config = launch_config(|key| std::env::var(key).ok())?;
    let _logging = init_logging(&config.logging)?;

    let name = provider_name(std::env::args_os().next().as_deref());
    let provider = HostedProvider::new(name, ProviderHost::new((opts.provider_func)()));
    tracing::debug!(
        provider = provider.name(),
        protocol_version = TRANSPORT_PROTOCOL_VERSION,
        "starting plugin transport"
    );

    let name = provider.name().to_string();
    tf_provider::serve(name, provider)
        .await
        .map_err(|err| ServeError::Transport(err.into()))?;
    tracing::info!("plugin transport stopped");
    Ok(())
}

/// Read the launch environment, checking the magic cookie before anything else.
pub fn launch_config<F>(lookup: F) -> Result<ServeConfig, ServeError>
where
    F: Fn(&str) -> Option<String>,
{
    handshake::verify_cookie(lookup(MAGIC_COOKIE_ENV).as_deref())?;
    let config = ServeConfig::from_lookup(&lookup)?;
    handshake::negotiate_version(&config.handshake.protocol_versions)?;
    Ok(config)
}

/// Provider name used to prefix served type names, taken from the executable.
///
/// `terraform-provider-pingdom_v1.2.0` serves as `pingdom`.
fn provider_name(executable: Option<&OsStr>) -> String {
    executable
        .map(Path::new)
        .and_then(Path::file_stem)
        .and_then(OsStr::to_str)
        .map(|stem| stem.strip_prefix("terraform-provider-").unwrap_or(stem))
        .and_then(|stem| stem.split('_').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("provider")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_core::config::{LOG_LEVEL_ENV, PROTOCOL_VERSIONS_ENV};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_cookie_wins_over_bad_environment() {
        let err = launch_config(env(&[(LOG_LEVEL_ENV, "verbose")])).unwrap_err();
        assert!(matches!(
            err,
            ServeError::Handshake(HandshakeError::NotLaunchedByHost)
        ));

        let err = launch_config(env(&[(PROTOCOL_VERSIONS_ENV, "five")])).unwrap_err();
        assert!(matches!(
            err,
            ServeError::Handshake(HandshakeError::NotLaunchedByHost)
        ));
    }

    #[test]
    fn bad_log_level_reported_once_launched_by_host() {
        let err = launch_config(env(&[
            (MAGIC_COOKIE_ENV, MAGIC_COOKIE_VALUE),
            (LOG_LEVEL_ENV, "verbose"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ServeError::Config(ConfigError::InvalidLogLevel { .. })
        ));
    }

    #[test]
    fn host_without_protocol_six_rejected() {
        let err = launch_config(env(&[
            (MAGIC_COOKIE_ENV, MAGIC_COOKIE_VALUE),
            (PROTOCOL_VERSIONS_ENV, "5"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ServeError::Handshake(HandshakeError::NoCommonProtocolVersion { .. })
        ));
    }

    #[test]
    fn host_offering_protocol_six_accepted() {
        let config = launch_config(env(&[
            (MAGIC_COOKIE_ENV, MAGIC_COOKIE_VALUE),
            (PROTOCOL_VERSIONS_ENV, "5,6"),
            (LOG_LEVEL_ENV, "debug"),
        ]))
        .unwrap();
        assert_eq!(config.handshake.protocol_versions, vec![5, 6]);
        assert_eq!(config.logging.level, provider_core::LogLevel::Debug);
    }

    #[test]
    fn provider_name_from_executable() {
        let name = |path: &str| provider_name(Some(OsStr::new(path)));
        assert_eq!(name("/plugins/terraform-provider-pingdom"), "pingdom");
        assert_eq!(name("terraform-provider-pingdom_v1.2.0"), "pingdom");
        assert_eq!(name("C:/bin/terraform-provider-pingdom.exe"), "pingdom");
        assert_eq!(name("pingdom"), "pingdom");
        assert_eq!(provider_name(None), "provider");
    }
}

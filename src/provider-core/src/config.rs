use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Variable the host sets to prove it launched the plugin.
pub const MAGIC_COOKIE_ENV: &str = "TF_PLUGIN_MAGIC_COOKIE";
/// Comma-separated protocol versions the host is able to speak.
pub const PROTOCOL_VERSIONS_ENV: &str = "PLUGIN_PROTOCOL_VERSIONS";
pub const LOG_LEVEL_ENV: &str = "TF_LOG";
pub const LOG_PATH_ENV: &str = "TF_LOG_PATH";
/// Trace log file written by the plugin transport itself.
pub const TRANSPORT_LOG_FILE_ENV: &str = "PLUGIN_LOG_FILE";

/// Everything the serve loop reads from its environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default)]
    pub handshake: HandshakeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Handshake values presented by the launching host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandshakeConfig {
    #[serde(default)]
    pub magic_cookie: Option<String>,
    /// Versions offered by the host. Empty when the host did not say.
    #[serde(default)]
    pub protocol_versions: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub json: bool,
    /// Log file; stderr when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// When set the transport installs its own subscriber writing here.
    #[serde(default)]
    pub transport_log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    #[default]
    Off,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "" => Ok(LogLevel::Off),
            other => Err(ConfigError::InvalidLogLevel {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TF_LOG value {value:?}; expected TRACE, DEBUG, INFO, WARN, ERROR, OFF or JSON")]
    InvalidLogLevel { value: String },
    #[error("invalid PLUGIN_PROTOCOL_VERSIONS entry {value:?}")]
    InvalidProtocolVersion { value: String },
}

impl ServeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let handshake = HandshakeConfig {
            magic_cookie: lookup(MAGIC_COOKIE_ENV),
            protocol_versions: parse_protocol_versions(
                lookup(PROTOCOL_VERSIONS_ENV).as_deref().unwrap_or(""),
            )?,
        };

        let (level, json) = match lookup(LOG_LEVEL_ENV) {
            Some(raw) if raw.trim().eq_ignore_ascii_case("json") => (LogLevel::Trace, true),
            Some(raw) => (raw.parse()?, false),
            None => (LogLevel::Off, false),
        };
        let logging = LoggingConfig {
            level,
            json,
            path: non_empty_path(lookup(LOG_PATH_ENV)),
            transport_log_file: non_empty_path(lookup(TRANSPORT_LOG_FILE_ENV)),
        };

        Ok(Self { handshake, logging })
    }
}

fn non_empty_path(raw: Option<String>) -> Option<PathBuf> {
    raw.filter(|p| !p.trim().is_empty()).map(PathBuf::from)
}

fn parse_protocol_versions(raw: &str) -> Result<Vec<u32>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse().map_err(|_| ConfigError::InvalidProtocolVersion {
                value: v.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_are_silent() {
        let config = ServeConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.logging.level, LogLevel::Off);
        assert!(config.logging.path.is_none());
        assert!(config.handshake.magic_cookie.is_none());
        assert!(config.handshake.protocol_versions.is_empty());
    }

    #[test]
    fn reads_log_level_case_insensitively() {
        let config = ServeConfig::from_lookup(lookup_from(&[
            (LOG_LEVEL_ENV, "Debug"),
            (LOG_PATH_ENV, "/tmp/provider.log"),
        ]))
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(!config.logging.json);
        assert_eq!(config.logging.path, Some(PathBuf::from("/tmp/provider.log")));
        assert!(config.logging.transport_log_file.is_none());
    }

    #[test]
    fn reads_transport_log_file() {
        let config = ServeConfig::from_lookup(lookup_from(&[
            (TRANSPORT_LOG_FILE_ENV, "/tmp/transport.log"),
            (LOG_PATH_ENV, " "),
        ]))
        .unwrap();
        assert_eq!(
            config.logging.transport_log_file,
            Some(PathBuf::from("/tmp/transport.log"))
        );
        assert!(config.logging.path.is_none());
    }

    #[test]
    fn json_level_enables_trace_json() {
        let config = ServeConfig::from_lookup(lookup_from(&[(LOG_LEVEL_ENV, "JSON")])).unwrap();
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert!(config.logging.json);
    }

    #[test]
    fn unknown_log_level_rejected() {
        let result = ServeConfig::from_lookup(lookup_from(&[(LOG_LEVEL_ENV, "chatty")]));
        assert!(matches!(result, Err(ConfigError::InvalidLogLevel { .. })));
    }

    #[test]
    fn parses_protocol_versions() {
        let config = ServeConfig::from_lookup(lookup_from(&[
            (PROTOCOL_VERSIONS_ENV, "4, 5,"),
            (MAGIC_COOKIE_ENV, "cookie"),
        ]))
        .unwrap();
        assert_eq!(config.handshake.protocol_versions, vec![4, 5]);
        assert_eq!(config.handshake.magic_cookie.as_deref(), Some("cookie"));
    }

    #[test]
    fn malformed_protocol_version_rejected() {
        let result = ServeConfig::from_lookup(lookup_from(&[(PROTOCOL_VERSIONS_ENV, "5,six")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidProtocolVersion { ref value }) if value == "six"
        ));
    }
}

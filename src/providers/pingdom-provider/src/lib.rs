use provider_core::{
    Attribute, Block, Provider, ProviderError, ProviderResult, ProviderSchema, Schema,
};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

pub const USER_ENV: &str = "PINGDOM_USER";
pub const PASSWORD_ENV: &str = "PINGDOM_PASSWORD";
pub const API_KEY_ENV: &str = "PINGDOM_API_KEY";
pub const ACCOUNT_EMAIL_ENV: &str = "PINGDOM_ACCOUNT_EMAIL";

/// Provider factory handed to the plugin serve loop.
pub fn provider() -> Box<dyn Provider> {
    Box::new(PingdomProvider::default())
}

/// Credentials accepted by `configure`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct PingdomCredentials {
    pub user: String,
    pub password: String,
    pub api_key: String,
    #[serde(default)]
    pub account_email: Option<String>,
}

impl fmt::Debug for PingdomCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PingdomCredentials")
            .field("user", &self.user)
            .field("password", &provider_core::redact::REDACTED)
            .field("api_key", &provider_core::redact::REDACTED)
            .field("account_email", &self.account_email)
            .finish()
    }
}

impl PingdomCredentials {
    fn validate(&self) -> ProviderResult<()> {
        for (name, value) in [
            ("user", &self.user),
            ("password", &self.password),
            ("api_key", &self.api_key),
        ] {
            if value.trim().is_empty() {
                return Err(ProviderError::Configuration {
                    message: format!("{name} must not be empty"),
                });
            }
        }
        Ok(())
    }
}

/// Pingdom provider. Declares its configuration schema and holds credentials
/// once configured; it manages no resources.
#[derive(Clone, Debug, Default)]
pub struct PingdomProvider {
    credentials: Arc<RwLock<Option<PingdomCredentials>>>,
}

impl PingdomProvider {
    pub fn credentials(&self) -> Option<PingdomCredentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn provider_block() -> Block {
        Block::new()
            .with_description("Credentials for the Pingdom API.")
            .with_attribute(
                "user",
                Attribute::required_string()
                    .with_description("Pingdom account user name.")
                    .with_env_default(USER_ENV),
            )
            .with_attribute(
                "password",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Pingdom account password.")
                    .with_env_default(PASSWORD_ENV),
            )
            .with_attribute(
                "api_key",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Pingdom application key.")
                    .with_env_default(API_KEY_ENV),
            )
            .with_attribute(
                "account_email",
                Attribute::optional_string()
                    .with_description("Owner email for multi-user accounts.")
                    .with_env_default(ACCOUNT_EMAIL_ENV),
            )
    }
}

impl Provider for PingdomProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new(Schema::v0(Self::provider_block()))
    }

    fn configure(&self, _terraform_version: &str, config: &Value) -> ProviderResult<()> {
        let credentials: PingdomCredentials =
            serde_json::from_value(config.clone()).map_err(|e| ProviderError::Configuration {
                message: e.to_string(),
            })?;
        credentials.validate()?;

        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configure_stores_credentials() {
        let provider = PingdomProvider::default();
        provider
            .configure(
                "0.12.31",
                &json!({"user": "ops@example.com", "password": "pw", "api_key": "key"}),
            )
            .unwrap();
        let creds = provider.credentials().unwrap();
        assert_eq!(creds.user, "ops@example.com");
        assert!(creds.account_email.is_none());
    }

    #[test]
    fn blank_credentials_rejected() {
        let provider = PingdomProvider::default();
        let err = provider
            .configure(
                "0.12.31",
                &json!({"user": "ops", "password": " ", "api_key": "key"}),
            )
            .unwrap_err();
        assert!(err.to_string().contains("password must not be empty"));
        assert!(provider.credentials().is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = PingdomCredentials {
            user: "ops".into(),
            password: "hunter2".into(),
            api_key: "abc123".into(),
            account_email: None,
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("abc123"));
    }

    #[test]
    fn secrets_marked_sensitive() {
        let schema = PingdomProvider::default().schema();
        let sensitive: Vec<_> = schema.provider.block.sensitive_attributes().collect();
        assert_eq!(sensitive, vec!["api_key", "password"]);
    }

    #[test]
    fn declares_no_resources() {
        let schema = PingdomProvider::default().schema();
        assert!(schema.resources.is_empty());
        assert!(schema.data_sources.is_empty());
    }
}

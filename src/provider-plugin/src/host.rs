//! Session state wrapped around a single provider instance.

use provider_core::provider::{data_source_schema, resource_schema};
use provider_core::redact::{redact_config, redact_secrets};
use provider_core::{
    has_errors, Diagnostic, Provider, ProviderError, ProviderResult, ProviderSchema, Schema,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// Source of environment variables used for attribute defaults.
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Holds the provider for the lifetime of a serve session.
///
/// Provider config gets its environment defaults here, and resource and data
/// source operations are refused until a configure call has succeeded.
pub struct ProviderHost {
    provider: Box<dyn Provider>,
    configured: AtomicBool,
    env_lookup: EnvLookup,
}

impl ProviderHost {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            configured: AtomicBool::new(false),
            env_lookup: process_env,
        }
    }

    /// Replace the process environment as the source of attribute defaults.
    pub fn with_env_lookup(mut self, env_lookup: EnvLookup) -> Self {
        self.env_lookup = env_lookup;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    pub fn resource_schema(&self, type_name: &str) -> ProviderResult<Schema> {
        resource_schema(self.provider.as_ref(), type_name)
    }

    pub fn data_source_schema(&self, type_name: &str) -> ProviderResult<Schema> {
        data_source_schema(self.provider.as_ref(), type_name)
    }

    pub fn validate_provider_config(&self, config: &Value) -> Vec<Diagnostic> {
        let config = self.with_defaults(config);
        self.provider.validate_provider_config(&config)
    }

    /// Validate and apply a provider config.
    ///
    /// Any failed attempt leaves the provider unconfigured, including one that
    /// follows an earlier success.
    pub fn configure(&self, terraform_version: &str, config: &Value) -> Vec<Diagnostic> {
        self.configured.store(false, Ordering::SeqCst);

        let block = self.provider.schema().provider.block;
        let config = block.apply_env_defaults(config, self.env_lookup);
        let mut diagnostics = self.provider.validate_provider_config(&config);

        tracing::debug!(
            terraform_version,
            config = %redact_config(&block, &config),
            "configuring provider"
        );

        if has_errors(&diagnostics) {
            return diagnostics;
        }

        match self.provider.configure(terraform_version, &config) {
            Ok(()) => {
                self.configured.store(true, Ordering::SeqCst);
                tracing::info!(terraform_version, "provider configured");
            }
            Err(err) => {
                let detail = redact_secrets(&err.to_string()).into_owned();
                tracing::warn!(error = %detail, "provider rejected configuration");
                diagnostics
                    .push(Diagnostic::error("Failed to configure provider").with_detail(detail));
            }
        }

        diagnostics
    }

    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        self.provider.validate_resource_config(type_name, config)
    }

    pub fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        self.provider.validate_data_source_config(type_name, config)
    }

    pub fn plan(
        &self,
        type_name: &str,
        prior_state: Option<&Value>,
        proposed_new_state: Value,
    ) -> ProviderResult<Value> {
        self.require_configured()?;
        self.provider
            .plan_resource_change(type_name, prior_state, proposed_new_state)
    }

    pub fn create(&self, type_name: &str, planned_state: Value) -> ProviderResult<Value> {
        self.require_configured()?;
        self.provider.create(type_name, planned_state)
    }

    /// `Ok(None)` means the resource is gone and should leave the state.
    pub fn read(&self, type_name: &str, current_state: Value) -> ProviderResult<Option<Value>> {
        self.require_configured()?;
        self.provider.read(type_name, current_state)
    }

    pub fn update(
        &self,
        type_name: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> ProviderResult<Value> {
        self.require_configured()?;
        self.provider.update(type_name, prior_state, planned_state)
    }

    pub fn delete(&self, type_name: &str, current_state: Value) -> ProviderResult<()> {
        self.require_configured()?;
        self.provider.delete(type_name, current_state)
    }

    pub fn import(&self, type_name: &str, id: &str) -> ProviderResult<Value> {
        self.require_configured()?;
        self.provider.import(type_name, id)
    }

    pub fn read_data_source(&self, type_name: &str, config: Value) -> ProviderResult<Value> {
        self.require_configured()?;
        self.provider.read_data_source(type_name, config)
    }

    fn with_defaults(&self, config: &Value) -> Value {
        self.provider
            .schema()
            .provider
            .block
            .apply_env_defaults(config, self.env_lookup)
    }

    fn require_configured(&self) -> ProviderResult<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured)
        }
    }
}

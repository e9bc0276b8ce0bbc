//! Adapts a hosted [`provider_core::Provider`] to the traits `tf_provider`
//! serves over `tfplugin6`.
//!
//! State and config values travel as `serde_json::Value`. Resource and data
//! source type names are registered without the provider prefix because the
//! transport adds it back when announcing them.

use crate::host::ProviderHost;
use async_trait::async_trait;
use provider_core::redact::redact_secrets;
use provider_core::{
    has_errors, Attribute, AttributeType, Block, Diagnostic, ProviderError, ProviderResult,
    Schema, Severity,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tf_provider::schema as tf;
use tf_provider::value::ValueEmpty;
use tf_provider::{
    AttributePath, DataSource, Diagnostic as TfDiagnostic, Diagnostics, Provider as TfProvider,
    Resource,
};

/// The provider as seen by the transport.
pub struct HostedProvider {
    name: String,
    host: Arc<ProviderHost>,
}

impl HostedProvider {
    pub fn new(name: impl Into<String>, host: ProviderHost) -> Self {
        Self {
            name: name.into(),
            host: Arc::new(host),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &ProviderHost {
        &self.host
    }

    /// `pingdom_check` is registered as `check` for a provider named `pingdom`.
    fn short_name(&self, diags: &mut Diagnostics, type_name: &str) -> Option<String> {
        let short = type_name
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty());
        if short.is_none() {
            tracing::warn!(type_name, provider = %self.name, "type name lacks provider prefix");
            diags.root_error(
                "Invalid type name",
                format!(
                    "`{type_name}` must start with `{}_` to be served by this provider.",
                    self.name
                ),
            );
        }
        short.map(str::to_string)
    }
}

#[async_trait]
impl TfProvider for HostedProvider {
    type Config<'a> = Value;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<tf::Schema> {
        Some(convert_schema(&self.host.schema().provider))
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        report(diags, self.host.validate_provider_config(&config))
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        report(diags, self.host.configure(&terraform_version, &config))
    }

    fn get_resources(
        &self,
        diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicResource>>> {
        let mut resources = HashMap::new();
        for type_name in self.host.schema().resources.into_keys() {
            let Some(short) = self.short_name(diags, &type_name) else {
                continue;
            };
            let resource = HostedResource {
                type_name,
                host: Arc::clone(&self.host),
            };
            resources.insert(short, Box::new(resource) as Box<dyn tf_provider::DynamicResource>);
        }
        Some(resources)
    }

    fn get_data_sources(
        &self,
        diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicDataSource>>> {
        let mut data_sources = HashMap::new();
        for type_name in self.host.schema().data_sources.into_keys() {
            let Some(short) = self.short_name(diags, &type_name) else {
                continue;
            };
            let data_source = HostedDataSource {
                type_name,
                host: Arc::clone(&self.host),
            };
            data_sources.insert(
                short,
                Box::new(data_source) as Box<dyn tf_provider::DynamicDataSource>,
            );
        }
        Some(data_sources)
    }
}

/// One declared resource type, dispatched to the host by its full type name.
pub struct HostedResource {
    type_name: String,
    host: Arc<ProviderHost>,
}

#[async_trait]
impl Resource for HostedResource {
    type State<'a> = Value;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, diags: &mut Diagnostics) -> Option<tf::Schema> {
        let schema = settle(diags, self.host.resource_schema(&self.type_name))?;
        Some(convert_schema(&schema))
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        let diagnostics = settle(
            diags,
            self.host.validate_resource_config(&self.type_name, &config),
        )?;
        report(diags, diagnostics)
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = settle(diags, self.host.read(&self.type_name, state))?;
        Some((state.unwrap_or(Value::Null), private_state))
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let planned = settle(diags, self.host.plan(&self.type_name, None, proposed_state))?;
        Some((planned, ValueEmpty::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let planned = settle(
            diags,
            self.host
                .plan(&self.type_name, Some(&prior_state), proposed_state),
        )?;
        Some((planned, prior_private_state, Vec::new()))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = settle(diags, self.host.create(&self.type_name, planned_state))?;
        Some((state, planned_private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = settle(
            diags,
            self.host
                .update(&self.type_name, prior_state, planned_state),
        )?;
        Some((state, planned_private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        settle(diags, self.host.delete(&self.type_name, prior_state))
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = settle(diags, self.host.import(&self.type_name, &id))?;
        Some((state, ValueEmpty::default()))
    }
}

pub struct HostedDataSource {
    type_name: String,
    host: Arc<ProviderHost>,
}

#[async_trait]
impl DataSource for HostedDataSource {
    type State<'a> = Value;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, diags: &mut Diagnostics) -> Option<tf::Schema> {
        let schema = settle(diags, self.host.data_source_schema(&self.type_name))?;
        Some(convert_schema(&schema))
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        let diagnostics = settle(
            diags,
            self.host
                .validate_data_source_config(&self.type_name, &config),
        )?;
        report(diags, diagnostics)
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        settle(diags, self.host.read_data_source(&self.type_name, config))
    }
}

/// Forward diagnostics to the transport. `None` when any of them is an error.
fn report(diags: &mut Diagnostics, diagnostics: Vec<Diagnostic>) -> Option<()> {
    let failed = has_errors(&diagnostics);
    for diagnostic in diagnostics {
        let detail = diagnostic.detail.unwrap_or_default();
        let converted = match diagnostic.attribute {
            Some(attribute) => {
                TfDiagnostic::new(diagnostic.summary, detail, AttributePath::new(attribute))
            }
            None => TfDiagnostic::root(diagnostic.summary, detail),
        };
        match diagnostic.severity {
            Severity::Error => diags.add_error(converted),
            Severity::Warning => diags.add_warning(converted),
        }
    }
    (!failed).then_some(())
}

fn settle<T>(diags: &mut Diagnostics, result: ProviderResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            let detail = redact_secrets(&err.to_string()).into_owned();
            tracing::warn!(error = %detail, "provider request failed");
            diags.root_error(error_summary(&err), detail);
            None
        }
    }
}

fn error_summary(err: &ProviderError) -> &'static str {
    match err {
        ProviderError::NotConfigured => "Provider not configured",
        ProviderError::UnknownResourceType { .. } | ProviderError::UnknownDataSource { .. } => {
            "Unknown type"
        }
        ProviderError::NotSupported { .. } => "Operation not supported",
        ProviderError::Configuration { .. } => "Invalid provider configuration",
        ProviderError::Other { .. } => "Provider error",
    }
}

fn convert_schema(schema: &Schema) -> tf::Schema {
    tf::Schema {
        version: schema.version,
        block: convert_block(&schema.block, schema.version),
    }
}

fn convert_block(block: &Block, version: i64) -> tf::Block {
    tf::Block {
        version,
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), convert_attribute(attr)))
            .collect(),
        description: tf::Description::plain(block.description.clone().unwrap_or_default()),
        ..Default::default()
    }
}

fn convert_attribute(attr: &Attribute) -> tf::Attribute {
    tf::Attribute {
        attr_type: convert_type(&attr.attr_type),
        description: tf::Description::plain(attr.description.clone().unwrap_or_default()),
        constraint: constraint(attr),
        sensitive: attr.sensitive,
        ..Default::default()
    }
}

/// Terraform enforces `Required` before the provider sees the config, so an
/// attribute that can still be filled from the environment is served as optional.
fn constraint(attr: &Attribute) -> tf::AttributeConstraint {
    let configurable = attr.required || attr.optional;
    match (configurable, attr.computed) {
        (true, _) if attr.required && attr.env_default.is_none() => {
            tf::AttributeConstraint::Required
        }
        (true, true) => tf::AttributeConstraint::OptionalComputed,
        (true, false) => tf::AttributeConstraint::Optional,
        (false, _) => tf::AttributeConstraint::Computed,
    }
}

fn convert_type(attr_type: &AttributeType) -> tf::AttributeType {
    match attr_type {
        AttributeType::String => tf::AttributeType::String,
        AttributeType::Number => tf::AttributeType::Number,
        AttributeType::Bool => tf::AttributeType::Bool,
        AttributeType::List(inner) => tf::AttributeType::List(Box::new(convert_type(inner))),
        AttributeType::Set(inner) => tf::AttributeType::Set(Box::new(convert_type(inner))),
        AttributeType::Map(inner) => tf::AttributeType::Map(Box::new(convert_type(inner))),
    }
}

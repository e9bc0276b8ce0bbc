use crate::diagnostics::Diagnostic;
use crate::schema::{ProviderSchema, Schema};
use serde_json::Value;
use thiserror::Error;

/// Common categories of provider failures surfaced to the plugin host.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid provider configuration: {message}")]
    Configuration { message: String },
    #[error("provider has not been configured")]
    NotConfigured,
    #[error("unknown resource type: {type_name}")]
    UnknownResourceType { type_name: String },
    #[error("unknown data source: {type_name}")]
    UnknownDataSource { type_name: String },
    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },
    #[error("{message}")]
    Other { message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Zero-argument factory the plugin host invokes to obtain a provider.
pub type ProviderFunc = fn() -> Box<dyn Provider>;

/// Provider capability surface: schema description plus a CRUD set
/// dispatched by resource or data source type name.
///
/// Only [`Provider::schema`] and [`Provider::configure`] are mandatory. The
/// remaining operations default to rejecting undeclared types with
/// [`ProviderError::UnknownResourceType`] / [`ProviderError::UnknownDataSource`]
/// and declared ones with [`ProviderError::NotSupported`].
pub trait Provider: Send + Sync {
    /// Full schema for the provider block, resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Validate a provider config after environment defaults were applied.
    fn validate_provider_config(&self, config: &Value) -> Vec<Diagnostic> {
        self.schema().provider.block.validate(config)
    }

    /// Accept a validated provider config. Called at most once per session by the host.
    fn configure(&self, terraform_version: &str, config: &Value) -> ProviderResult<()>;

    fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let schema = resource_schema(self, type_name)?;
        Ok(schema.block.validate(config))
    }

    fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> ProviderResult<Vec<Diagnostic>> {
        let schema = data_source_schema(self, type_name)?;
        Ok(schema.block.validate(config))
    }

    /// Returns the planned state. The default plans exactly what was proposed.
    fn plan_resource_change(
        &self,
        type_name: &str,
        _prior_state: Option<&Value>,
        proposed_new_state: Value,
    ) -> ProviderResult<Value> {
        resource_schema(self, type_name)?;
        Ok(proposed_new_state)
    }

    fn create(&self, type_name: &str, _planned_state: Value) -> ProviderResult<Value> {
        Err(unsupported(self, type_name, "create"))
    }

    /// Refresh a resource. `Ok(None)` means it no longer exists remotely.
    fn read(&self, type_name: &str, _current_state: Value) -> ProviderResult<Option<Value>> {
        Err(unsupported(self, type_name, "read"))
    }

    fn update(
        &self,
        type_name: &str,
        _prior_state: Value,
        _planned_state: Value,
    ) -> ProviderResult<Value> {
        Err(unsupported(self, type_name, "update"))
    }

    fn delete(&self, type_name: &str, _current_state: Value) -> ProviderResult<()> {
        Err(unsupported(self, type_name, "delete"))
    }

    fn import(&self, type_name: &str, _id: &str) -> ProviderResult<Value> {
        Err(unsupported(self, type_name, "import"))
    }

    fn read_data_source(&self, type_name: &str, _config: Value) -> ProviderResult<Value> {
        data_source_schema(self, type_name)?;
        Err(ProviderError::NotSupported {
            operation: format!("read data source {type_name}"),
        })
    }
}

/// Look up a declared resource schema.
pub fn resource_schema<P: Provider + ?Sized>(
    provider: &P,
    type_name: &str,
) -> ProviderResult<Schema> {
    let mut schema = provider.schema();
    schema
        .resources
        .remove(type_name)
        .ok_or_else(|| ProviderError::UnknownResourceType {
            type_name: type_name.to_string(),
        })
}

/// Look up a declared data source schema.
pub fn data_source_schema<P: Provider + ?Sized>(
    provider: &P,
    type_name: &str,
) -> ProviderResult<Schema> {
    let mut schema = provider.schema();
    schema
        .data_sources
        .remove(type_name)
        .ok_or_else(|| ProviderError::UnknownDataSource {
            type_name: type_name.to_string(),
        })
}

fn unsupported<P: Provider + ?Sized>(
    provider: &P,
    type_name: &str,
    operation: &str,
) -> ProviderError {
    match resource_schema(provider, type_name) {
        Ok(_) => ProviderError::NotSupported {
            operation: format!("{operation} {type_name}"),
        },
        Err(err) => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block};
    use serde_json::json;

    struct Widgets;

    impl Provider for Widgets {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new(Schema::v0(
                Block::new().with_attribute("endpoint", Attribute::required_string()),
            ))
            .with_resource(
                "widget",
                Schema::v0(Block::new().with_attribute("name", Attribute::required_string())),
            )
        }

        fn configure(&self, _terraform_version: &str, _config: &Value) -> ProviderResult<()> {
            Ok(())
        }
    }

    #[test]
    fn default_crud_rejects_unknown_types() {
        let err = Widgets.create("gadget", json!({})).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::UnknownResourceType { ref type_name } if type_name == "gadget"
        ));
    }

    #[test]
    fn default_crud_reports_declared_types_as_unsupported() {
        let err = Widgets.delete("widget", json!({})).unwrap_err();
        match err {
            ProviderError::NotSupported { operation } => assert_eq!(operation, "delete widget"),
            other => panic!("expected NotSupported, got {other:?}"),
        }
    }

    #[test]
    fn default_plan_echoes_proposed_state() {
        let proposed = json!({"name": "w1"});
        let planned = Widgets
            .plan_resource_change("widget", None, proposed.clone())
            .unwrap();
        assert_eq!(planned, proposed);
    }

    #[test]
    fn resource_config_validated_against_schema() {
        let diags = Widgets
            .validate_resource_config("widget", &json!({}))
            .unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("name"));
    }

    #[test]
    fn data_source_lookup_fails_for_undeclared() {
        let err = Widgets.read_data_source("widget", json!({})).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownDataSource { .. }));
    }

    #[test]
    fn factory_alias_accepts_fn_items() {
        fn factory() -> Box<dyn Provider> {
            Box::new(Widgets)
        }
        let func: ProviderFunc = factory;
        assert!(!func().schema().provider.block.is_empty());
    }
}

use crate::diagnostics::has_errors;
use crate::provider::{Provider, ProviderError, ProviderFunc};
use serde_json::Value;
use thiserror::Error;

/// Expectations supplied by a provider crate to run the shared contract suite.
#[derive(Debug, Clone)]
pub struct ProviderContractExpectations {
    /// Resource type names the provider must declare.
    pub resources: Vec<String>,
    /// Data source type names the provider must declare.
    pub data_sources: Vec<String>,
    /// A provider config that must validate cleanly and configure successfully.
    pub valid_config: Value,
    /// Terraform version passed to `configure`.
    pub terraform_version: String,
}

/// Errors surfaced by the provider contract test harness.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderContractError {
    #[error("provider schema declares no configuration attributes")]
    EmptyProviderSchema,
    #[error("expected resource type {type_name} is not declared")]
    MissingResource { type_name: String },
    #[error("expected data source {type_name} is not declared")]
    MissingDataSource { type_name: String },
    #[error("undeclared resource type {type_name} was not rejected")]
    UndeclaredTypeAccepted { type_name: String },
    #[error("valid config produced error diagnostics: {summaries:?}")]
    ValidConfigRejected { summaries: Vec<String> },
    #[error("provider error while running contract: {0}")]
    ProviderFailure(String),
}

const UNDECLARED_TYPE: &str = "contract_undeclared_type";

/// Run the shared contract suite against the provider a factory produces.
pub fn run_provider_contract(
    factory: ProviderFunc,
    expectations: &ProviderContractExpectations,
) -> Result<(), ProviderContractError> {
    let provider = factory();
    verify_schema(provider.as_ref(), expectations)?;
    verify_undeclared_type(provider.as_ref())?;
    verify_configure(provider.as_ref(), expectations)?;
    Ok(())
}

fn verify_schema(
    provider: &dyn Provider,
    expectations: &ProviderContractExpectations,
) -> Result<(), ProviderContractError> {
    let schema = provider.schema();
    if schema.provider.block.is_empty() {
        return Err(ProviderContractError::EmptyProviderSchema);
    }

    if let Some(missing) = expectations
        .resources
        .iter()
        .find(|name| !schema.resources.contains_key(name.as_str()))
    {
        return Err(ProviderContractError::MissingResource {
            type_name: missing.clone(),
        });
    }

    if let Some(missing) = expectations
        .data_sources
        .iter()
        .find(|name| !schema.data_sources.contains_key(name.as_str()))
    {
        return Err(ProviderContractError::MissingDataSource {
            type_name: missing.clone(),
        });
    }

    Ok(())
}

fn verify_undeclared_type(provider: &dyn Provider) -> Result<(), ProviderContractError> {
    match provider.validate_resource_config(UNDECLARED_TYPE, &Value::Null) {
        Err(ProviderError::UnknownResourceType { .. }) => Ok(()),
        Err(other) => Err(ProviderContractError::ProviderFailure(other.to_string())),
        Ok(_) => Err(ProviderContractError::UndeclaredTypeAccepted {
            type_name: UNDECLARED_TYPE.to_string(),
        }),
    }
}

fn verify_configure(
    provider: &dyn Provider,
    expectations: &ProviderContractExpectations,
) -> Result<(), ProviderContractError> {
    let diagnostics = provider.validate_provider_config(&expectations.valid_config);
    if has_errors(&diagnostics) {
        return Err(ProviderContractError::ValidConfigRejected {
            summaries: diagnostics
                .iter()
                .filter(|d| d.is_error())
                .map(|d| d.summary.clone())
                .collect(),
        });
    }

    provider
        .configure(&expectations.terraform_version, &expectations.valid_config)
        .map_err(|e| ProviderContractError::ProviderFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderResult;
    use crate::schema::{Attribute, Block, ProviderSchema, Schema};
    use serde_json::json;

    struct Minimal;

    impl Provider for Minimal {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new(Schema::v0(
                Block::new().with_attribute("region", Attribute::required_string()),
            ))
        }

        fn configure(&self, _terraform_version: &str, _config: &Value) -> ProviderResult<()> {
            Ok(())
        }
    }

    struct Empty;

    impl Provider for Empty {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::default()
        }

        fn configure(&self, _terraform_version: &str, _config: &Value) -> ProviderResult<()> {
            Ok(())
        }
    }

    fn minimal() -> Box<dyn Provider> {
        Box::new(Minimal)
    }

    fn empty() -> Box<dyn Provider> {
        Box::new(Empty)
    }

    fn expectations(config: Value) -> ProviderContractExpectations {
        ProviderContractExpectations {
            resources: vec![],
            data_sources: vec![],
            valid_config: config,
            terraform_version: "0.12.31".into(),
        }
    }

    #[test]
    fn minimal_provider_passes() {
        run_provider_contract(minimal, &expectations(json!({"region": "eu"}))).unwrap();
    }

    #[test]
    fn empty_schema_fails() {
        let result = run_provider_contract(empty, &expectations(json!({})));
        assert_eq!(result, Err(ProviderContractError::EmptyProviderSchema));
    }

    #[test]
    fn missing_resource_fails() {
        let mut exp = expectations(json!({"region": "eu"}));
        exp.resources.push("minimal_thing".into());
        let result = run_provider_contract(minimal, &exp);
        assert_eq!(
            result,
            Err(ProviderContractError::MissingResource {
                type_name: "minimal_thing".into()
            })
        );
    }

    #[test]
    fn invalid_config_fails() {
        let result = run_provider_contract(minimal, &expectations(json!({})));
        assert!(matches!(
            result,
            Err(ProviderContractError::ValidConfigRejected { .. })
        ));
    }
}

//! Schema model describing provider configuration, resources and data sources.
//!
//! Schemas are declared by providers and served verbatim to the plugin host.
//! The same model drives config validation and environment defaults, so a
//! provider never hand-checks its own arguments.

use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Value type of a schema attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Whether a JSON value conforms to this type. Nested nulls are rejected.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Number, Value::Number(_)) => true,
            (AttributeType::Bool, Value::Bool(_)) => true,
            (AttributeType::List(inner) | AttributeType::Set(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.matches(item))
            }
            (AttributeType::Map(inner), Value::Object(entries)) => {
                entries.values().all(|item| inner.matches(item))
            }
            _ => false,
        }
    }

    fn from_env(&self, raw: String) -> Value {
        match self {
            AttributeType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => Value::String(raw),
            },
            AttributeType::Number => parse_number(raw.trim())
                .map(Value::Number)
                .unwrap_or(Value::String(raw)),
            _ => Value::String(raw),
        }
    }
}

/// Integers keep their integer representation; anything else goes through `f64`.
fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n.into());
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n.into());
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Number => write!(f, "number"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::List(inner) => write!(f, "list of {inner}"),
            AttributeType::Set(inner) => write!(f, "set of {inner}"),
            AttributeType::Map(inner) => write!(f, "map of {inner}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    /// Environment variable consulted when the attribute is not configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_default: Option<String>,
}

impl Attribute {
    fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            description: None,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            env_default: None,
        }
    }

    pub fn required(attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(attr_type)
        }
    }

    pub fn optional(attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(attr_type)
        }
    }

    pub fn computed(attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(attr_type)
        }
    }

    pub fn required_string() -> Self {
        Self::required(AttributeType::String)
    }

    pub fn optional_string() -> Self {
        Self::optional(AttributeType::String)
    }

    pub fn computed_string() -> Self {
        Self::computed(AttributeType::String)
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_env_default(mut self, var: impl Into<String>) -> Self {
        self.env_default = Some(var.into());
        self
    }

    fn is_configurable(&self) -> bool {
        self.required || self.optional
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn sensitive_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.sensitive)
            .map(|(name, _)| name.as_str())
    }

    /// Fill unset attributes from their `env_default` variables.
    ///
    /// A null config is treated as an empty object. Non-object configs are
    /// returned untouched and left for [`Block::validate`] to reject.
    pub fn apply_env_defaults<F>(&self, config: &Value, lookup: F) -> Value
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut object = match config {
            Value::Null => Map::new(),
            Value::Object(object) => object.clone(),
            other => return other.clone(),
        };

        for (name, attr) in &self.attributes {
            let Some(var) = attr.env_default.as_deref() else {
                continue;
            };
            if object.get(name).is_some_and(|v| !v.is_null()) {
                continue;
            }
            if let Some(raw) = lookup(var) {
                object.insert(name.clone(), attr.attr_type.from_env(raw));
            }
        }

        Value::Object(object)
    }

    /// Check a config object against the block, returning one diagnostic per problem.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let empty = Map::new();
        let object = match config {
            Value::Null => &empty,
            Value::Object(object) => object,
            _ => {
                return vec![Diagnostic::error("Invalid configuration")
                    .with_detail("The configuration must be an object.")]
            }
        };

        let mut diagnostics = Vec::new();

        for name in object.keys() {
            if !self.attributes.contains_key(name) {
                diagnostics.push(
                    Diagnostic::error("Unsupported argument")
                        .with_detail(format!("An argument named \"{name}\" is not expected here."))
                        .with_attribute(name.clone()),
                );
            }
        }

        for (name, attr) in &self.attributes {
            match object.get(name).filter(|v| !v.is_null()) {
                None if attr.required => diagnostics.push(
                    Diagnostic::error("Missing required argument")
                        .with_detail(format!(
                            "The argument \"{name}\" is required, but no definition was found."
                        ))
                        .with_attribute(name.clone()),
                ),
                None => {}
                Some(_) if !attr.is_configurable() => diagnostics.push(
                    Diagnostic::error("Value for unconfigurable attribute")
                        .with_detail(format!(
                            "Can't configure a value for \"{name}\": its value will be decided automatically."
                        ))
                        .with_attribute(name.clone()),
                ),
                Some(value) if !attr.attr_type.matches(value) => diagnostics.push(
                    Diagnostic::error("Incorrect attribute value type")
                        .with_detail(format!(
                            "Inappropriate value for attribute \"{name}\": {} required.",
                            attr.attr_type
                        ))
                        .with_attribute(name.clone()),
                ),
                Some(_) => {}
            }
        }

        diagnostics
    }
}

/// A versioned block, as declared for the provider itself and for each resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    pub fn new(version: i64, block: Block) -> Self {
        Self { version, block }
    }

    pub fn v0(block: Block) -> Self {
        Self::new(0, block)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    pub fn new(provider: Schema) -> Self {
        Self {
            provider,
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    pub fn with_resource(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(type_name.into(), schema);
        self
    }

    pub fn with_data_source(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(type_name.into(), schema);
        self
    }
}

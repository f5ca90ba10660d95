//! Tool catalog: names, descriptions, input schemas and return modes.
//!
//! The catalog is immutable once built and shared by every conversation.

use crate::error::{ConciergeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// What happens to a tool's output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMode {
    /// The output is appended to the conversation for the model to use.
    #[default]
    ChainBack,
    /// The output becomes the final answer verbatim.
    #[serde(alias = "direct")]
    ReturnDirect,
}

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    StringList,
}

impl ParamType {
    /// Whether a JSON value is acceptable for this type.
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    fn schema_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::StringList => "array",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamType::StringList => write!(f, "list of strings"),
            other => write!(f, "{}", other.schema_type()),
        }
    }
}

/// A single named parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    pub nullable: bool,
}

impl ParamSpec {
    /// A required, non-nullable parameter.
    pub fn required(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
            nullable: false,
        }
    }

    /// An optional parameter that may also be passed as `null`.
    pub fn optional(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: false,
            nullable: true,
        }
    }
}

/// Declaration of a tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub return_mode: ReturnMode,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
            return_mode: ReturnMode::ChainBack,
        }
    }

    pub fn with_return_mode(mut self, mode: ReturnMode) -> Self {
        self.return_mode = mode;
        self
    }

    /// JSON Schema object describing the parameters.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut property = json!({ "description": param.description });
            property["type"] = if param.nullable {
                json!([param.kind.schema_type(), "null"])
            } else {
                json!(param.kind.schema_type())
            };
            if param.kind == ParamType::StringList {
                property["items"] = json!({ "type": "string" });
            }
            properties.insert(param.name.clone(), property);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check raw model arguments against the schema.
    ///
    /// Null values for nullable parameters are dropped so the typed argument
    /// bundle sees them as absent.
    pub fn validate(&self, arguments: &Value) -> Result<Map<String, Value>> {
        let invalid = |reason: String| ConciergeError::InvalidArguments {
            tool: self.name.clone(),
            reason,
        };

        let object = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => return Err(invalid(format!("expected an object, got {}", other))),
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.params.iter().any(|p| &p.name == *key))
        {
            return Err(invalid(format!("unexpected parameter '{}'", unknown)));
        }

        let mut validated = Map::new();
        for param in &self.params {
            match object.get(&param.name) {
                None | Some(Value::Null) if param.required && !param.nullable => {
                    return Err(invalid(format!("missing required parameter '{}'", param.name)));
                }
                None | Some(Value::Null) => {}
                Some(value) if param.kind.accepts(value) => {
                    validated.insert(param.name.clone(), value.clone());
                }
                Some(value) => {
                    return Err(invalid(format!(
                        "parameter '{}' must be of type {}, got {}",
                        param.name, param.kind, value
                    )));
                }
            }
        }

        Ok(validated)
    }
}

/// Ordered set of tools with unique names.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolSpec>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, spec: ToolSpec) -> Result<()> {
        if self.get(&spec.name).is_some() {
            return Err(ConciergeError::Config(format!(
                "Tool '{}' is registered twice",
                spec.name
            )));
        }
        self.tools.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

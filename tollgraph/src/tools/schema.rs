//! Argument schemas: the declared shape of a tool's JSON arguments.
//!
//! An [`ArgSchema`] is a flat list of named, typed fields. The executor
//! validates model-supplied arguments against it before a tool runs, and the
//! gateway advertises it to the model as a JSON Schema object.

use serde_json::{json, Map, Value};

/// JSON type of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    /// Whole number. `10` and `10.0` are both accepted.
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ArgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
            ArgType::Object => "object",
            ArgType::Array => "array",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ArgType::String => value.is_string(),
            ArgType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            ArgType::Number => value.is_number(),
            ArgType::Boolean => value.is_boolean(),
            ArgType::Object => value.is_object(),
            ArgType::Array => value.is_array(),
        }
    }
}

/// One declared argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgField {
    pub name: String,
    pub ty: ArgType,
    pub description: String,
    pub required: bool,
}

/// Declared arguments of a tool, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgSchema {
    fields: Vec<ArgField>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required field.
    pub fn required(self, name: impl Into<String>, ty: ArgType, description: impl Into<String>) -> Self {
        self.field(name, ty, description, true)
    }

    /// Adds an optional field.
    pub fn optional(self, name: impl Into<String>, ty: ArgType, description: impl Into<String>) -> Self {
        self.field(name, ty, description, false)
    }

    fn field(
        mut self,
        name: impl Into<String>,
        ty: ArgType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.fields.retain(|f| f.name != name);
        self.fields.push(ArgField {
            name,
            ty,
            description: description.into(),
            required,
        });
        self
    }

    pub fn fields(&self) -> &[ArgField] {
        &self.fields
    }

    /// Checks `args` is an object whose fields satisfy the schema.
    ///
    /// Required fields must be present and non-null; present fields must have
    /// the declared type. Undeclared fields are ignored.
    pub fn validate(&self, args: &Value) -> Result<(), String> {
        let obj = args
            .as_object()
            .ok_or_else(|| format!("arguments must be a JSON object, got {}", args))?;
        for field in &self.fields {
            match obj.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(format!("missing required argument '{}'", field.name));
                }
                None | Some(Value::Null) => {}
                Some(v) if !field.ty.matches(v) => {
                    return Err(format!(
                        "argument '{}' must be {}, got {}",
                        field.name,
                        field.ty.as_str(),
                        v
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// JSON Schema (`type: object`) advertised to the model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(
                field.name.clone(),
                json!({
                    "type": field.ty.as_str(),
                    "description": field.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy_schema() -> ArgSchema {
        ArgSchema::new()
            .required("symbol", ArgType::String, "Ticker")
            .required("quantity", ArgType::Integer, "Shares")
            .required("total_price", ArgType::Number, "Total cost")
            .optional("note", ArgType::String, "Free text")
    }

    /// **Scenario**: Well-formed arguments pass; whole floats count as integers.
    #[test]
    fn validate_accepts_matching_arguments() {
        let s = buy_schema();
        assert!(s
            .validate(&json!({"symbol": "AMZN", "quantity": 10, "total_price": 1350.0}))
            .is_ok());
        assert!(s
            .validate(&json!({"symbol": "AMZN", "quantity": 10.0, "total_price": 1350}))
            .is_ok());
    }

    /// **Scenario**: Missing required fields, wrong types and non-objects are rejected.
    #[test]
    fn validate_rejects_bad_arguments() {
        let s = buy_schema();
        let err = s.validate(&json!({"symbol": "AMZN", "quantity": 10})).unwrap_err();
        assert!(err.contains("total_price"), "{}", err);
        let err = s
            .validate(&json!({"symbol": "AMZN", "quantity": 2.5, "total_price": 1.0}))
            .unwrap_err();
        assert!(err.contains("integer"), "{}", err);
        let err = s
            .validate(&json!({"symbol": "AMZN", "quantity": 1, "total_price": 1.0, "note": 3}))
            .unwrap_err();
        assert!(err.contains("note"), "{}", err);
        assert!(s.validate(&json!("AMZN")).is_err());
    }

    /// **Scenario**: JSON schema lists every property and only the required names.
    #[test]
    fn to_json_schema_lists_properties_and_required() {
        let v = buy_schema().to_json_schema();
        assert_eq!(v["type"], "object");
        assert_eq!(v["properties"]["quantity"]["type"], "integer");
        assert_eq!(v["required"], json!(["symbol", "quantity", "total_price"]));
    }

    /// **Scenario**: Redeclaring a field replaces it instead of duplicating.
    #[test]
    fn redeclared_field_replaces_previous() {
        let s = ArgSchema::new()
            .optional("symbol", ArgType::String, "a")
            .required("symbol", ArgType::String, "b");
        assert_eq!(s.fields().len(), 1);
        assert!(s.fields()[0].required);
    }
}

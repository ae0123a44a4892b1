//! Response format descriptions
//!
//! A detection spec's response format is an ordered list of named fields,
//! each tagged with one type from a closed vocabulary. The description is
//! rendered into a JSON schema for the model call and used to validate the
//! parsed answer before it is stored.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    Dict,
    List,
    Tuple,
    Set,
    None,
}

impl FieldType {
    pub const ALL: [FieldType; 9] = [
        FieldType::Str,
        FieldType::Int,
        FieldType::Float,
        FieldType::Bool,
        FieldType::Dict,
        FieldType::List,
        FieldType::Tuple,
        FieldType::Set,
        FieldType::None,
    ];

    /// Tag stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Str => "str",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Dict => "dict",
            FieldType::List => "list",
            FieldType::Tuple => "tuple",
            FieldType::Set => "set",
            FieldType::None => "none",
        }
    }

    /// JSON schema fragment for a value of this type
    pub fn json_schema(&self) -> Value {
        match self {
            FieldType::Str => json!({"type": "string"}),
            FieldType::Int => json!({"type": "integer"}),
            FieldType::Float => json!({"type": "number"}),
            FieldType::Bool => json!({"type": "boolean"}),
            FieldType::Dict => json!({"type": "object"}),
            FieldType::List | FieldType::Tuple => json!({"type": "array"}),
            FieldType::Set => json!({"type": "array", "uniqueItems": true}),
            FieldType::None => json!({"type": "null"}),
        }
    }

    /// Strict structured output needs fully specified containers
    pub fn is_strict_compatible(&self) -> bool {
        !matches!(
            self,
            FieldType::Dict | FieldType::List | FieldType::Tuple | FieldType::Set
        )
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::Str => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Dict => value.is_object(),
            FieldType::List | FieldType::Tuple => value.is_array(),
            // Pairwise `Value` equality: object members compare regardless of
            // key order, which serialized forms would not
            FieldType::Set => value.as_array().map_or(false, |items| {
                items
                    .iter()
                    .enumerate()
                    .all(|(i, item)| !items[..i].contains(item))
            }),
            FieldType::None => value.is_null(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        if tag == "string" {
            return Ok(FieldType::Str);
        }
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| Error::InvalidFieldType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

impl FromStr for FieldSpec {
    type Err = Error;

    /// Parse `name:type`, e.g. `contains_use_case:bool`
    fn from_str(s: &str) -> Result<Self> {
        let (name, tag) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidFieldType(format!("expected name:type, got '{}'", s)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidFieldType(format!("missing field name in '{}'", s)));
        }
        Ok(FieldSpec::new(name, tag.parse()?))
    }
}

/// Ordered field list plus the format's name
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Schema name restricted to `[A-Za-z0-9_-]`
    pub fn schema_name(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        if name.is_empty() {
            "response".to_string()
        } else {
            name
        }
    }

    pub fn is_strict_compatible(&self) -> bool {
        self.fields.iter().all(|f| f.field_type.is_strict_compatible())
    }

    /// Object schema with every field required and no extra keys
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.field_type.json_schema()))
            .collect();
        let required: Vec<Value> = self
            .fields
            .iter()
            .map(|f| Value::String(f.name.clone()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check a parsed answer against the field list. The returned object
    /// lists its keys in field order.
    pub fn validate(&self, value: Value) -> Result<Map<String, Value>> {
        let Value::Object(mut object) = value else {
            return Err(Error::SchemaMismatch(format!(
                "expected a JSON object, got {}",
                value
            )));
        };

        for field in &self.fields {
            match object.get(&field.name) {
                None => {
                    return Err(Error::SchemaMismatch(format!(
                        "missing field '{}'",
                        field.name
                    )))
                }
                Some(v) if !field.field_type.matches(v) => {
                    return Err(Error::SchemaMismatch(format!(
                        "field '{}' should be {}, got {}",
                        field.name, field.field_type, v
                    )))
                }
                Some(_) => {}
            }
        }

        if let Some(extra) = object
            .keys()
            .find(|k| !self.fields.iter().any(|f| &f.name == *k))
        {
            return Err(Error::SchemaMismatch(format!("unexpected field '{}'", extra)));
        }

        Ok(self
            .fields
            .iter()
            .filter_map(|f| object.remove(&f.name).map(|v| (f.name.clone(), v)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn use_case_schema() -> ResponseSchema {
        ResponseSchema::new(
            "UseCaseAnalysis",
            vec![
                FieldSpec::new("contains_llm_use_case_info", FieldType::Bool),
                FieldSpec::new("explanation", FieldType::Str),
            ],
        )
    }

    #[test]
    fn test_field_type_tags() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
        assert_eq!("string".parse::<FieldType>().unwrap(), FieldType::Str);
        assert_eq!(" Bool ".parse::<FieldType>().unwrap(), FieldType::Bool);
        assert!(matches!(
            "datetime".parse::<FieldType>(),
            Err(Error::InvalidFieldType(_))
        ));
    }

    #[test]
    fn test_field_spec_parsing() {
        let spec: FieldSpec = "score:int".parse().unwrap();
        assert_eq!(spec, FieldSpec::new("score", FieldType::Int));
        assert!("score".parse::<FieldSpec>().is_err());
        assert!(":int".parse::<FieldSpec>().is_err());
    }

    fn verdict_schema() -> ResponseSchema {
        ResponseSchema::new(
            "Verdict",
            vec![
                FieldSpec::new("verdict", FieldType::Bool),
                FieldSpec::new("explanation", FieldType::Str),
                FieldSpec::new("alpha_score", FieldType::Int),
            ],
        )
    }

    #[test]
    fn test_properties_follow_field_order() {
        let schema = verdict_schema().json_schema();
        let properties: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
        assert_eq!(properties, vec!["verdict", "explanation", "alpha_score"]);
        assert_eq!(
            serde_json::to_string(&schema["properties"]).unwrap(),
            r#"{"verdict":{"type":"boolean"},"explanation":{"type":"string"},"alpha_score":{"type":"integer"}}"#
        );
    }

    #[test]
    fn test_validated_answer_is_in_field_order() {
        let answer = json!({"alpha_score": 1, "explanation": "x", "verdict": true});
        let verdict = verdict_schema().validate(answer).unwrap();
        let keys: Vec<&String> = verdict.keys().collect();
        assert_eq!(keys, vec!["verdict", "explanation", "alpha_score"]);
    }

    #[test]
    fn test_json_schema_keeps_field_order() {
        let schema = use_case_schema().json_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["contains_llm_use_case_info", "explanation"]);
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        assert_eq!(
            schema["properties"]["contains_llm_use_case_info"]["type"],
            "boolean"
        );
    }

    #[test]
    fn test_strict_compatibility() {
        assert!(use_case_schema().is_strict_compatible());
        let loose = ResponseSchema::new("Tags", vec![FieldSpec::new("tags", FieldType::List)]);
        assert!(!loose.is_strict_compatible());
    }

    #[test]
    fn test_schema_name_is_sanitized() {
        let schema = ResponseSchema::new("LLM use case: v2", vec![]);
        assert_eq!(schema.schema_name(), "LLM_use_case__v2");
    }

    #[test]
    fn test_validate_accepts_matching_object() {
        let verdict = use_case_schema()
            .validate(json!({
                "contains_llm_use_case_info": true,
                "explanation": "mentions summarising tickets"
            }))
            .unwrap();
        assert_eq!(verdict["contains_llm_use_case_info"], Value::Bool(true));
    }

    #[test]
    fn test_validate_rejects_mismatches() {
        let schema = use_case_schema();
        assert!(schema.validate(json!([1, 2])).is_err());
        assert!(schema
            .validate(json!({"contains_llm_use_case_info": "yes", "explanation": ""}))
            .is_err());
        assert!(schema
            .validate(json!({"contains_llm_use_case_info": true}))
            .is_err());
        assert!(schema
            .validate(json!({
                "contains_llm_use_case_info": true,
                "explanation": "",
                "confidence": 0.5
            }))
            .is_err());
    }

    #[test]
    fn test_set_requires_unique_items() {
        assert!(FieldType::Set.matches(&json!(["a", "b"])));
        assert!(!FieldType::Set.matches(&json!(["a", "a"])));
        assert!(!FieldType::Set.matches(&json!([{"x": 1, "y": 2}, {"y": 2, "x": 1}])));
        assert!(FieldType::Set.matches(&json!([{"x": 1}, {"x": 2}])));
        assert!(FieldType::Float.matches(&json!(3)));
        assert!(!FieldType::Int.matches(&json!(3.5)));
    }
}

//! Type-safe schema generation for structured outputs.
//!
//! Uses the `schemars` crate to generate JSON schemas from Rust types, then
//! rewrites them into the shape the strict structured-output mode expects.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Trait for types that can be requested as structured output.
///
/// Automatically implemented for any type that implements
/// `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a strict-mode JSON schema for this type.
    ///
    /// Strict mode requires:
    /// 1. `additionalProperties: false` on every object schema
    /// 2. every property listed in `required`, nullable or not
    /// 3. fully inlined schemas (no `$ref` indirection)
    fn strict_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        strictify(&mut value);
        value
    }

    /// Schema name for this type, used as the response format label.
    fn schema_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Rewrite an arbitrary schemars-generated schema into strict-mode shape.
///
/// Useful when the schema value was built elsewhere and only needs the
/// strict-mode fixups applied.
pub fn strictify(value: &mut Value) {
    close_object_schemas(value);
    inline_definitions(value);

    if let Value::Object(map) = value {
        map.remove("definitions");
        map.remove("$defs");
        map.remove("$schema");
    }
}

/// Recursively close object schemas: `additionalProperties: false` and all
/// properties marked required.
fn close_object_schemas(value: &mut Value) {
    let Value::Object(map) = value else { return };

    if map.get("type") == Some(&Value::String("object".into())) {
        map.insert("additionalProperties".to_string(), Value::Bool(false));

        if let Some(Value::Object(props)) = map.get("properties") {
            let all_keys: Vec<Value> = props.keys().cloned().map(Value::String).collect();
            map.insert("required".to_string(), Value::Array(all_keys));
        }
    }

    for child in map.values_mut() {
        match child {
            Value::Object(_) => close_object_schemas(child),
            Value::Array(items) => {
                for item in items {
                    close_object_schemas(item);
                }
            }
            _ => {}
        }
    }
}

/// Replace every `$ref` node with its definition, inlined.
fn inline_definitions(value: &mut Value) {
    let definitions = collect_definitions(value);
    if definitions.is_empty() {
        return;
    }

    // Definitions may reference each other; a bounded number of passes
    // resolves nested refs for the schema depths seen in practice.
    for _ in 0..8 {
        if !replace_refs(value, &definitions) {
            break;
        }
    }
}

fn collect_definitions(value: &Value) -> serde_json::Map<String, Value> {
    let mut out = serde_json::Map::new();
    if let Value::Object(map) = value {
        for key in ["definitions", "$defs"] {
            if let Some(Value::Object(defs)) = map.get(key) {
                for (name, def) in defs {
                    out.insert(name.clone(), def.clone());
                }
            }
        }
    }
    out
}

/// Returns true if any `$ref` was replaced during this pass.
fn replace_refs(value: &mut Value, definitions: &serde_json::Map<String, Value>) -> bool {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                let name = reference.rsplit('/').next().unwrap_or_default().to_string();
                if let Some(definition) = definitions.get(&name) {
                    *value = definition.clone();
                    return true;
                }
            }
            let mut replaced = false;
            for child in map.values_mut() {
                replaced |= replace_refs(child, definitions);
            }
            replaced
        }
        Value::Array(items) => {
            let mut replaced = false;
            for item in items {
                replaced |= replace_refs(item, definitions);
            }
            replaced
        }
        _ => false,
    }
}

//! JSON Schema handling for OpenAPI schema objects.
//!
//! OpenAPI 3.0 schemas are a dialect of JSON Schema draft 4. Before
//! compiling, `$ref`s are inlined from the document and `nullable` is
//! rewritten into a `null` type alternative.

use jsonschema::Draft;
use serde_json::{Map, Value};

use super::document::OpenApiDocument;

/// Longest chain of `$ref`s followed while inlining one schema
const MAX_INLINE_DEPTH: usize = 20;

/// Maximum number of schema errors reported for one value
const MAX_REPORTED_ERRORS: usize = 5;

/// Validate `instance` against an OpenAPI schema object.
///
/// On failure the error lists up to five violations joined with `; `.
pub fn validate_value(
    document: &OpenApiDocument,
    schema: &Value,
    instance: &Value,
) -> Result<(), String> {
    let prepared = prepare(document, schema, &mut Vec::new());
    let validator = jsonschema::options()
        .with_draft(Draft::Draft4)
        .build(&prepared)
        .map_err(|e| format!("schema does not compile: {e}"))?;

    let errors: Vec<String> = validator
        .iter_errors(instance)
        .take(MAX_REPORTED_ERRORS)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// Inline `$ref`s and translate OpenAPI-only keywords.
///
/// `refs` holds the references being expanded on the current branch. A
/// reference back into that chain, or one past the depth limit, is
/// replaced by the empty schema.
fn prepare(document: &OpenApiDocument, schema: &Value, refs: &mut Vec<String>) -> Value {
    match schema {
        Value::Object(object) => {
            if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
                if refs.iter().any(|r| r == reference) || refs.len() >= MAX_INLINE_DEPTH {
                    return Value::Object(Map::new());
                }
                let Some(target) = document.resolve_ref(reference) else {
                    return schema.clone();
                };
                refs.push(reference.to_string());
                let prepared = prepare(document, target, refs);
                refs.pop();
                return prepared;
            }

            let mut prepared: Map<String, Value> = object
                .iter()
                .filter(|(key, _)| key.as_str() != "nullable")
                .map(|(key, value)| (key.clone(), prepare(document, value, refs)))
                .collect();

            if object.get("nullable").and_then(Value::as_bool) == Some(true) {
                if let Some(Value::String(kind)) = prepared.get("type").cloned() {
                    prepared.insert(
                        "type".to_string(),
                        Value::Array(vec![Value::String(kind), Value::from("null")]),
                    );
                }
            }
            Value::Object(prepared)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| prepare(document, item, refs))
                .collect(),
        ),
        _ => schema.clone(),
    }
}

/// Turn a raw path/query/header value into the JSON value its schema
/// describes, so it can be validated like a body.
pub fn coerce_parameter(
    document: &OpenApiDocument,
    raw: &[&str],
    schema: &Value,
) -> Result<Value, String> {
    let schema = document.resolve(schema);
    match schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            let items = schema
                .get("items")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({"type": "string"}));
            let values: Vec<&str> = match raw {
                [single] => single.split(',').collect(),
                many => many.to_vec(),
            };
            values
                .into_iter()
                .map(|value| coerce_scalar(document, value, &items))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        _ => match raw.first() {
            Some(value) => coerce_scalar(document, value, schema),
            None => Ok(Value::Null),
        },
    }
}

fn coerce_scalar(document: &OpenApiDocument, raw: &str, schema: &Value) -> Result<Value, String> {
    let schema = document.resolve(schema);
    match schema.get("type").and_then(Value::as_str) {
        Some("integer") => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("value {raw:?} is not an integer")),
        Some("number") => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("value {raw:?} is not a number")),
        Some("boolean") => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("value {raw:?} is not a boolean")),
        },
        Some("object") => serde_json::from_str(raw)
            .map_err(|_| format!("value {raw:?} is not a JSON object")),
        _ => Ok(Value::String(raw.to_string())),
    }
}

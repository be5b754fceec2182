//! Tool registry and argument validation.
//!
//! Names every tool the server exposes together with the prefix used when a
//! call fails, and checks invocation arguments against a tool's input schema
//! before the call is routed, so malformed input never reaches a handler.

use rmcp::model::{JsonObject, Tool};
use serde_json::Value;

use crate::error::ToolError;

pub const ANALYZE_GIT_REPOSITORY: &str = "analyze_git_repository";
pub const ANALYZE_LOCAL_PROJECT: &str = "analyze_local_project";
pub const GENERATE_ANALYSIS_SCRIPT: &str = "generate_analysis_script";
pub const GET_PROJECT_FINDINGS: &str = "get_project_findings";
pub const EXPLAIN_REMEDIATION: &str = "explain_remediation";

/// Static facts about one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    /// Prefix for `isError` responses, e.g. `Error analyzing Git repository`.
    pub failure_context: &'static str,
}

/// Every tool, in listing order.
pub const TOOLS: [ToolSpec; 5] = [
    ToolSpec {
        name: ANALYZE_GIT_REPOSITORY,
        failure_context: "Error analyzing Git repository",
    },
    ToolSpec {
        name: ANALYZE_LOCAL_PROJECT,
        failure_context: "Error analyzing local project",
    },
    ToolSpec {
        name: GENERATE_ANALYSIS_SCRIPT,
        failure_context: "Error generating script",
    },
    ToolSpec {
        name: GET_PROJECT_FINDINGS,
        failure_context: "Error retrieving findings",
    },
    ToolSpec {
        name: EXPLAIN_REMEDIATION,
        failure_context: "Error explaining remediation",
    },
];

pub fn find_spec(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.name == name)
}

/// Failure prefix for `name`, with a generic fallback.
pub fn failure_context(name: &str) -> &'static str {
    find_spec(name).map_or("Error", |t| t.failure_context)
}

/// Check `arguments` against the tool's input schema.
///
/// Enforces `required`, the primitive `type` of each supplied property
/// (including nullability), and `enum` membership. Unknown extra
/// properties are ignored.
pub fn validate_arguments(tool: &Tool, arguments: Option<&JsonObject>) -> Result<(), ToolError> {
    let root = Value::Object(tool.input_schema.as_ref().clone());
    let empty = JsonObject::new();
    let args = arguments.unwrap_or(&empty);

    if let Some(required) = root.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            match args.get(name) {
                None | Some(Value::Null) => {
                    return Err(ToolError::Validation(format!(
                        "Missing required argument: {name}"
                    )));
                }
                Some(_) => {}
            }
        }
    }

    let Some(properties) = root.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (name, value) in args {
        let Some(schema) = properties.get(name) else {
            continue;
        };
        let schema = resolve(&root, schema, 0);
        check_value(name, schema, value)?;
    }
    Ok(())
}

/// Follow local `$ref`s and single-element `allOf` wrappers.
fn resolve<'a>(root: &'a Value, schema: &'a Value, depth: usize) -> &'a Value {
    if depth > 8 {
        return schema;
    }
    if let Some(target) = schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix('#'))
        .and_then(|pointer| root.pointer(pointer))
    {
        return resolve(root, target, depth + 1);
    }
    if let Some([only]) = schema.get("allOf").and_then(Value::as_array).map(Vec::as_slice) {
        return resolve(root, only, depth + 1);
    }
    schema
}

fn check_value(name: &str, schema: &Value, value: &Value) -> Result<(), ToolError> {
    let nullable = schema.get("nullable").and_then(Value::as_bool).unwrap_or(false);
    let allowed: Vec<&str> = match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    if value.is_null() {
        if nullable || allowed.is_empty() || allowed.contains(&"null") {
            return Ok(());
        }
        return Err(ToolError::Validation(format!("Argument {name} must not be null")));
    }

    if !allowed.is_empty() && !allowed.iter().any(|t| type_matches(t, value)) {
        return Err(ToolError::Validation(format!(
            "Argument {name} must be of type {}",
            allowed.join(" or ")
        )));
    }

    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.contains(value) {
            let listed: Vec<String> = options.iter().map(Value::to_string).collect();
            return Err(ToolError::Validation(format!(
                "Argument {name} must be one of: {}",
                listed.join(", ")
            )));
        }
    }
    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

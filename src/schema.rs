//! Input-shape introspection for host frameworks.
//!
//! [`THOUGHT_FIELDS`] is the closed field table the parser in
//! `validation.rs` checks submissions against, so the advertised schema and
//! the enforced one cannot drift apart.

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::ThoughtParams;

pub const TOOL_NAME: &str = "sequentialthinking_tools";

pub const TOOL_DESCRIPTION: &str = "Structured, reflective problem solving one thought at a time.

Submit each reasoning step as a thought. The history keeps every accepted step in order and \
lets later steps revise earlier ones or fork alternative branches without erasing anything.

Use it for:
- breaking a complex problem into steps whose number is not known up front
- planning that may need course correction
- exploring alternatives side by side under named branches

Parameters:
- thought: the current thinking step (analysis, revision, question, hypothesis, verification)
- thought_number: position of this step; may exceed total_thoughts
- total_thoughts: current estimate of steps needed; raised automatically when exceeded
- next_thought_needed: true while the chain should continue
- is_revision / revises_thought: mark this step as reconsidering an earlier accepted step
- branch_from_thought / branch_id: fork a named branch from an earlier accepted step
- needs_more_thoughts: the estimate was too low and the chain is being extended
- current_step: optional recommendation (tools with confidence, priority and rationale)
- remaining_steps: optional outline of upcoming steps

Only set next_thought_needed to false when a satisfactory answer has been reached.";

/// JSON type accepted for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Boolean,
    Object,
    TextList,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::Text => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::TextList => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
        }
    }

    pub fn expected(&self) -> &'static str {
        match self {
            FieldType::Text => "a string",
            FieldType::Integer => "an integer",
            FieldType::Boolean => "a boolean",
            FieldType::Object => "an object",
            FieldType::TextList => "a list of strings",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub constraint: &'static str,
}

pub const THOUGHT_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "thought", field_type: FieldType::Text, required: true, constraint: "non-empty after trimming" },
    FieldSpec { name: "thought_number", field_type: FieldType::Integer, required: true, constraint: ">= 1" },
    FieldSpec { name: "total_thoughts", field_type: FieldType::Integer, required: true, constraint: ">= 1; raised to thought_number when lower" },
    FieldSpec { name: "next_thought_needed", field_type: FieldType::Boolean, required: true, constraint: "" },
    FieldSpec { name: "is_revision", field_type: FieldType::Boolean, required: false, constraint: "defaults to false" },
    FieldSpec { name: "revises_thought", field_type: FieldType::Integer, required: false, constraint: ">= 1; required iff is_revision; must name an accepted thought" },
    FieldSpec { name: "branch_from_thought", field_type: FieldType::Integer, required: false, constraint: ">= 1; must name an accepted thought" },
    FieldSpec { name: "branch_id", field_type: FieldType::Text, required: false, constraint: "non-empty; required iff branch_from_thought" },
    FieldSpec { name: "needs_more_thoughts", field_type: FieldType::Boolean, required: false, constraint: "" },
    FieldSpec { name: "current_step", field_type: FieldType::Object, required: false, constraint: "step recommendation; tool confidence within 0..=1" },
    FieldSpec { name: "remaining_steps", field_type: FieldType::TextList, required: false, constraint: "" },
];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    THOUGHT_FIELDS.iter().find(|spec| spec.name == name)
}

/// JSON Schema of the tool input, generated from [`ThoughtParams`]
pub fn input_schema() -> Value {
    schemars::schema_for!(ThoughtParams).to_value()
}

/// Tool definition in the `{name, description, inputSchema}` shape hosts expect
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": TOOL_DESCRIPTION,
        "inputSchema": input_schema(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_table_matches_generated_schema() {
        let schema = input_schema();
        let properties = schema["properties"].as_object().expect("schema has properties");
        assert_eq!(properties.len(), THOUGHT_FIELDS.len());
        for spec in THOUGHT_FIELDS {
            assert!(properties.contains_key(spec.name), "schema missing {}", spec.name);
        }
    }

    #[test]
    fn test_required_fields_agree() {
        let schema = input_schema();
        let mut required: Vec<&str> = schema["required"]
            .as_array()
            .expect("schema lists required fields")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        required.sort_unstable();

        let mut expected: Vec<&str> = THOUGHT_FIELDS
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name)
            .collect();
        expected.sort_unstable();

        assert_eq!(required, expected);
    }

    #[test]
    fn test_tool_definition_shape() {
        let definition = tool_definition();
        assert_eq!(definition["name"], TOOL_NAME);
        assert!(definition["description"].as_str().unwrap().contains("revise"));
        assert!(definition["inputSchema"].is_object());
    }

    #[test]
    fn test_field_type_matching() {
        assert!(FieldType::Integer.matches(&json!(3)));
        assert!(!FieldType::Integer.matches(&json!(3.5)));
        assert!(!FieldType::Integer.matches(&json!("3")));
        assert!(FieldType::TextList.matches(&json!(["a", "b"])));
        assert!(!FieldType::TextList.matches(&json!(["a", 1])));
        assert!(field_spec("thougth").is_none());
    }
}

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{StepRecommendation, ThoughtKind, ThoughtParams, ThoughtRecord};
use crate::schema::{field_spec, THOUGHT_FIELDS};

pub const DEFAULT_MAX_THOUGHT_LENGTH: usize = 10_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Thought submission must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    #[error("Field {field} must be {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("Invalid {field}: {detail}")]
    Malformed { field: String, detail: String },

    #[error("Thought content cannot be empty")]
    EmptyThought,

    #[error("Thought content too long: {actual} chars (max: {max})")]
    ThoughtTooLong { actual: usize, max: usize },

    #[error("Invalid {field}: {value} (must be a positive 32-bit integer)")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("Invalid confidence for tool {tool_name}: {value} (must be 0-1)")]
    ConfidenceOutOfRange { tool_name: String, value: f64 },

    #[error("revises_thought must be provided if is_revision is true")]
    MissingRevisionTarget,

    #[error("revises_thought should only be provided if is_revision is true")]
    UnexpectedRevisionTarget,

    #[error("branch_id must be provided if branch_from_thought is set")]
    MissingBranchId,

    #[error("branch_id cannot be empty")]
    EmptyBranchId,

    #[error("branch_id should only be provided if branch_from_thought is set")]
    UnexpectedBranchId,

    #[error("revises_thought references thought {thought}, which has not been accepted")]
    UnknownRevisionTarget { thought: u32 },

    #[error("branch_from_thought references thought {thought}, which has not been accepted")]
    UnknownBranchPoint { thought: u32 },
}

impl ValidationError {
    /// Name of the offending input field
    pub fn field(&self) -> &str {
        match self {
            ValidationError::NotAnObject => "input",
            ValidationError::MissingField { field } => field,
            ValidationError::UnknownField { field }
            | ValidationError::WrongType { field, .. }
            | ValidationError::Malformed { field, .. } => field,
            ValidationError::EmptyThought | ValidationError::ThoughtTooLong { .. } => "thought",
            ValidationError::OutOfRange { field, .. } => field,
            ValidationError::ConfidenceOutOfRange { .. } => "current_step",
            ValidationError::MissingRevisionTarget
            | ValidationError::UnexpectedRevisionTarget
            | ValidationError::UnknownRevisionTarget { .. } => "revises_thought",
            ValidationError::MissingBranchId
            | ValidationError::EmptyBranchId
            | ValidationError::UnexpectedBranchId => "branch_id",
            ValidationError::UnknownBranchPoint { .. } => "branch_from_thought",
        }
    }

    /// Cross-field and cross-history violations, as opposed to shape errors
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            ValidationError::MissingRevisionTarget
                | ValidationError::UnexpectedRevisionTarget
                | ValidationError::MissingBranchId
                | ValidationError::EmptyBranchId
                | ValidationError::UnexpectedBranchId
                | ValidationError::UnknownRevisionTarget { .. }
                | ValidationError::UnknownBranchPoint { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct InputValidator {
    max_thought_length: usize,
}

impl InputValidator {
    pub fn new(max_thought_length: usize) -> Self {
        Self { max_thought_length }
    }

    /// Closed-schema parse of a raw submission. Checks the shape only:
    /// unknown fields, required presence, and JSON types.
    pub fn parse(&self, raw: &Value) -> std::result::Result<ThoughtParams, ValidationError> {
        let map = raw.as_object().ok_or(ValidationError::NotAnObject)?;

        for (name, value) in map {
            let spec = field_spec(name).ok_or_else(|| ValidationError::UnknownField {
                field: name.clone(),
            })?;
            // null on an optional field reads as absent
            if value.is_null() && !spec.required {
                continue;
            }
            if !spec.field_type.matches(value) {
                return Err(ValidationError::WrongType {
                    field: name.clone(),
                    expected: spec.field_type.expected(),
                });
            }
        }

        for spec in THOUGHT_FIELDS.iter().filter(|spec| spec.required) {
            if !map.contains_key(spec.name) {
                return Err(ValidationError::MissingField { field: spec.name });
            }
        }

        Ok(ThoughtParams {
            thought: text(map, "thought").unwrap_or_default(),
            thought_number: integer(map, "thought_number")?.unwrap_or_default(),
            total_thoughts: integer(map, "total_thoughts")?.unwrap_or_default(),
            next_thought_needed: boolean(map, "next_thought_needed").unwrap_or_default(),
            is_revision: boolean(map, "is_revision"),
            revises_thought: integer(map, "revises_thought")?,
            branch_from_thought: integer(map, "branch_from_thought")?,
            branch_id: text(map, "branch_id"),
            needs_more_thoughts: boolean(map, "needs_more_thoughts"),
            current_step: step(map, "current_step")?,
            remaining_steps: text_list(map, "remaining_steps"),
        })
    }

    /// Turn well-shaped params into a record. Rules run in a fixed order:
    /// field values, total_thoughts auto-raise, revision pairing, branch pairing.
    pub fn validate(&self, params: ThoughtParams) -> std::result::Result<ThoughtRecord, ValidationError> {
        self.validate_thought_content(&params.thought)?;
        let thought_number = positive("thought_number", params.thought_number)?;
        let mut total_thoughts = positive("total_thoughts", params.total_thoughts)?;

        if thought_number > total_thoughts {
            tracing::debug!(
                "Raising total_thoughts from {} to {} to fit thought_number",
                total_thoughts,
                thought_number
            );
            total_thoughts = thought_number;
        }

        let is_revision = params.is_revision.unwrap_or(false);
        let revises_thought = self.validate_revision_pairing(is_revision, params.revises_thought)?;
        let (branch_from_thought, branch_id) =
            self.validate_branch_pairing(params.branch_from_thought, params.branch_id)?;

        if let Some(step) = &params.current_step {
            self.validate_step(step)?;
        }

        let mut record = ThoughtRecord::new(params.thought, thought_number, total_thoughts, params.next_thought_needed);
        record.kind = ThoughtKind::classify(branch_from_thought, is_revision);
        record.is_revision = is_revision;
        record.revises_thought = revises_thought;
        record.branch_from_thought = branch_from_thought;
        record.branch_id = branch_id;
        record.needs_more_thoughts = params.needs_more_thoughts;
        record.current_step = params.current_step;
        record.remaining_steps = params.remaining_steps;
        Ok(record)
    }

    pub fn validate_thought_content(&self, content: &str) -> std::result::Result<(), ValidationError> {
        let trimmed = content.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::EmptyThought);
        }

        let length = trimmed.chars().count();
        if length > self.max_thought_length {
            return Err(ValidationError::ThoughtTooLong {
                actual: length,
                max: self.max_thought_length,
            });
        }

        Ok(())
    }

    pub fn validate_revision_pairing(
        &self,
        is_revision: bool,
        revises_thought: Option<i64>,
    ) -> std::result::Result<Option<u32>, ValidationError> {
        match (is_revision, revises_thought) {
            (true, None) => Err(ValidationError::MissingRevisionTarget),
            (false, Some(_)) => Err(ValidationError::UnexpectedRevisionTarget),
            (true, Some(target)) => positive("revises_thought", target).map(Some),
            (false, None) => Ok(None),
        }
    }

    pub fn validate_branch_pairing(
        &self,
        branch_from_thought: Option<i64>,
        branch_id: Option<String>,
    ) -> std::result::Result<(Option<u32>, Option<String>), ValidationError> {
        match (branch_from_thought, branch_id) {
            (Some(_), None) => Err(ValidationError::MissingBranchId),
            (None, Some(_)) => Err(ValidationError::UnexpectedBranchId),
            (Some(_), Some(id)) if id.trim().is_empty() => Err(ValidationError::EmptyBranchId),
            (Some(from), Some(id)) => Ok((Some(positive("branch_from_thought", from)?), Some(id))),
            (None, None) => Ok((None, None)),
        }
    }

    pub fn validate_step(&self, step: &StepRecommendation) -> std::result::Result<(), ValidationError> {
        for tool in &step.recommended_tools {
            if !(0.0..=1.0).contains(&tool.confidence) {
                return Err(ValidationError::ConfidenceOutOfRange {
                    tool_name: tool.tool_name.clone(),
                    value: tool.confidence,
                });
            }
        }
        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_THOUGHT_LENGTH)
    }
}

fn positive(field: &'static str, value: i64) -> std::result::Result<u32, ValidationError> {
    u32::try_from(value)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or(ValidationError::OutOfRange { field, value })
}

// The accessors below run after the type pass, so a mismatch here means absent.

fn present<'a>(map: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    map.get(field).filter(|value| !value.is_null())
}

fn text(map: &Map<String, Value>, field: &str) -> Option<String> {
    present(map, field).and_then(Value::as_str).map(str::to_string)
}

fn boolean(map: &Map<String, Value>, field: &str) -> Option<bool> {
    present(map, field).and_then(Value::as_bool)
}

fn integer(map: &Map<String, Value>, field: &'static str) -> std::result::Result<Option<i64>, ValidationError> {
    match present(map, field) {
        None => Ok(None),
        // u64 values beyond i64::MAX pass the type check but cannot be a thought number
        Some(value) => value.as_i64().map(Some).ok_or_else(|| ValidationError::Malformed {
            field: field.to_string(),
            detail: format!("{} (must be a positive 32-bit integer)", value),
        }),
    }
}

fn text_list(map: &Map<String, Value>, field: &str) -> Option<Vec<String>> {
    present(map, field).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn step(map: &Map<String, Value>, field: &str) -> std::result::Result<Option<StepRecommendation>, ValidationError> {
    present(map, field)
        .map(|value| {
            serde_json::from_value(value.clone()).map_err(|e| ValidationError::Malformed {
                field: field.to_string(),
                detail: e.to_string(),
            })
        })
        .transpose()
}

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::error::{ErrorKind, ThinkingError};

/// A single tool the agent is advised to use for a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ToolRecommendation {
    #[schemars(description = "Name of the tool being recommended")]
    pub tool_name: String,

    #[schemars(description = "0-1 indicating confidence in the recommendation")]
    pub confidence: f64,

    #[schemars(description = "Why this tool is recommended")]
    pub rationale: String,

    #[schemars(description = "Order in the recommendation sequence")]
    pub priority: i64,

    #[schemars(description = "Optional suggested parameters")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_inputs: Option<serde_json::Map<String, serde_json::Value>>,

    #[schemars(description = "Alternative tools that could be used")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
}

/// Recommendation for one step of the problem-solving process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StepRecommendation {
    #[schemars(description = "What needs to be done")]
    pub step_description: String,

    #[schemars(description = "Tools recommended for this step")]
    pub recommended_tools: Vec<ToolRecommendation>,

    #[schemars(description = "What to expect from this step")]
    pub expected_outcome: String,

    #[schemars(description = "Conditions to consider for the next step")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_conditions: Option<Vec<String>>,
}

/// Parameters for the sequentialthinking_tools tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ThoughtParams {
    #[schemars(description = "Your current thinking step")]
    pub thought: String,

    #[schemars(description = "Current thought number in sequence (can exceed total_thoughts)", range(min = 1))]
    pub thought_number: i64,

    #[schemars(description = "Current estimate of thoughts needed (can be adjusted)", range(min = 1))]
    pub total_thoughts: i64,

    #[schemars(description = "Whether another thought step is needed")]
    pub next_thought_needed: bool,

    #[schemars(description = "Whether this thought revises previous thinking")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_revision: Option<bool>,

    #[schemars(description = "Which thought number is being reconsidered (required if is_revision)", range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revises_thought: Option<i64>,

    #[schemars(description = "Thought number this branch forks from", range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_from_thought: Option<i64>,

    #[schemars(description = "Branch identifier (required if branch_from_thought is set)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,

    #[schemars(description = "Set when reaching the end but realizing more thoughts are needed")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_more_thoughts: Option<bool>,

    #[schemars(description = "Current step recommendation being considered")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepRecommendation>,

    #[schemars(description = "High-level descriptions of upcoming steps")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_steps: Option<Vec<String>>,
}

impl ThoughtParams {
    /// Minimal well-formed submission; optional fields are left unset
    pub fn new(thought: impl Into<String>, thought_number: i64, total_thoughts: i64, next_thought_needed: bool) -> Self {
        Self {
            thought: thought.into(),
            thought_number,
            total_thoughts,
            next_thought_needed,
            is_revision: None,
            revises_thought: None,
            branch_from_thought: None,
            branch_id: None,
            needs_more_thoughts: None,
            current_step: None,
            remaining_steps: None,
        }
    }
}

/// Tool arguments exactly as the client sent them.
///
/// Advertised with the [`ThoughtParams`] schema, but left as a raw map so the
/// closed-schema parse in `InputValidator` reports shape problems as
/// rejections instead of protocol errors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawThoughtArgs(pub serde_json::Map<String, serde_json::Value>);

impl RawThoughtArgs {
    pub fn into_value(self) -> serde_json::Value {
        serde_json::Value::Object(self.0)
    }
}

impl schemars::JsonSchema for RawThoughtArgs {
    fn schema_name() -> Cow<'static, str> {
        <ThoughtParams as schemars::JsonSchema>::schema_name()
    }

    fn schema_id() -> Cow<'static, str> {
        <ThoughtParams as schemars::JsonSchema>::schema_id()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        <ThoughtParams as schemars::JsonSchema>::json_schema(generator)
    }
}

/// How an accepted thought relates to the rest of the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtKind {
    Standard,
    Revision,
    Branch,
}

impl ThoughtKind {
    /// Branch wins over revision, revision over standard
    pub fn classify(branch_from_thought: Option<u32>, is_revision: bool) -> Self {
        if branch_from_thought.is_some() {
            ThoughtKind::Branch
        } else if is_revision {
            ThoughtKind::Revision
        } else {
            ThoughtKind::Standard
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThoughtKind::Standard => "Thought",
            ThoughtKind::Revision => "Revision",
            ThoughtKind::Branch => "Branch",
        }
    }
}

impl fmt::Display for ThoughtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThoughtKind::Standard => "standard",
            ThoughtKind::Revision => "revision",
            ThoughtKind::Branch => "branch",
        };
        f.write_str(name)
    }
}

/// Validated thought. Once pushed into a tracker's history it is only ever
/// handed out by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtRecord {
    pub id: String,
    /// 1-based acceptance index; 0 until accepted
    pub sequence: usize,
    pub timestamp: String,
    pub kind: ThoughtKind,
    pub thought: String,
    pub thought_number: u32,
    pub total_thoughts: u32,
    pub next_thought_needed: bool,
    pub is_revision: bool,
    pub revises_thought: Option<u32>,
    pub branch_from_thought: Option<u32>,
    pub branch_id: Option<String>,
    pub needs_more_thoughts: Option<bool>,
    pub current_step: Option<StepRecommendation>,
    pub previous_steps: Vec<StepRecommendation>,
    pub remaining_steps: Option<Vec<String>>,
}

impl ThoughtRecord {
    /// Create a new standard thought record with generated ID and timestamp
    pub fn new(thought: String, thought_number: u32, total_thoughts: u32, next_thought_needed: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sequence: 0,
            timestamp: Utc::now().to_rfc3339(),
            kind: ThoughtKind::Standard,
            thought,
            thought_number,
            total_thoughts,
            next_thought_needed,
            is_revision: false,
            revises_thought: None,
            branch_from_thought: None,
            branch_id: None,
            needs_more_thoughts: None,
            current_step: None,
            previous_steps: Vec::new(),
            remaining_steps: None,
        }
    }

    pub fn is_branch(&self) -> bool {
        self.kind == ThoughtKind::Branch
    }

    pub fn needs_more(&self) -> bool {
        self.needs_more_thoughts.unwrap_or(false)
    }
}

/// Response from sequentialthinking_tools on acceptance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThinkSummary {
    pub status: String,
    pub thought_id: String,
    pub thought_number: u32,
    pub total_thoughts: u32,
    pub next_thought_needed: bool,
    pub thought_history_length: usize,
    pub branches: Vec<String>,
    pub kind: ThoughtKind,
    pub is_revision: bool,
    pub is_branch: bool,
    pub current_step: Option<StepRecommendation>,
    pub previous_steps: Option<Vec<StepRecommendation>>,
    pub remaining_steps: Option<Vec<String>>,
}

/// Structured, caller-readable rejection so the agent can retry with corrected input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub status: String,
    pub error_type: ErrorKind,
    pub field: String,
    pub message: String,
}

impl Rejection {
    /// Returns None for errors that are defects rather than bad input
    pub fn from_error(err: &ThinkingError) -> Option<Self> {
        let error_type = err.rejection_kind()?;
        Some(Self {
            status: "rejected".to_string(),
            error_type,
            field: err.field().unwrap_or_default().to_string(),
            message: err.reason(),
        })
    }
}

/// Either outcome of a submission that reached the tool boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ThinkOutcome {
    Accepted(ThinkSummary),
    Rejected(Rejection),
}

impl ThinkOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ThinkOutcome::Accepted(_))
    }
}

/// Parameters for the sequentialthinking_history tool
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HistoryParams {
    #[schemars(description = "Only return thoughts from this branch (omit for the full history)")]
    pub branch_id: Option<String>,
}

/// Response from sequentialthinking_history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub thoughts: Vec<ThoughtRecord>,
    pub total_found: usize,
    pub branch_id: Option<String>,
    pub branches: Vec<String>,
}

/// Response from sequentialthinking_reset
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub discarded_thoughts: usize,
    pub discarded_branches: usize,
}

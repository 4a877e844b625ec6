use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Result, ThinkingError};
use crate::models::{StepRecommendation, ThinkSummary, ThoughtKind, ThoughtParams, ThoughtRecord};
use crate::validation::{InputValidator, ValidationError};
use crate::visual::{RenderContext, VisualOutput};

/// Thought history for one reasoning session.
///
/// Every accepted record lands in `main_sequence` in acceptance order.
/// Branch records are additionally indexed under their `branch_id`. Nothing
/// is ever removed or rewritten: a revision is a new record pointing back at
/// the step it reconsiders, and the current view of a step is the latest
/// record carrying that `thought_number`.
#[derive(Debug, Default)]
pub struct ThoughtTracker {
    validator: InputValidator,
    main_sequence: Vec<ThoughtRecord>,
    branch_order: Vec<String>,
    // positions in main_sequence
    branches: HashMap<String, Vec<usize>>,
}

/// Read-only view over a tracker's stores
#[derive(Debug, Clone, Copy)]
pub struct HistoryView<'a> {
    main_sequence: &'a [ThoughtRecord],
    branch_order: &'a [String],
    branches: &'a HashMap<String, Vec<usize>>,
}

impl<'a> HistoryView<'a> {
    pub fn main_sequence(&self) -> &'a [ThoughtRecord] {
        self.main_sequence
    }

    /// Branch ids in the order they were first seen
    pub fn branch_ids(&self) -> &'a [String] {
        self.branch_order
    }

    /// Records of one branch in insertion order
    pub fn branch(&self, branch_id: &str) -> Option<Vec<&'a ThoughtRecord>> {
        let main_sequence = self.main_sequence;
        self.branches
            .get(branch_id)
            .map(|positions| positions.iter().map(|&i| &main_sequence[i]).collect())
    }

    pub fn branches(&self) -> Vec<(&'a str, Vec<&'a ThoughtRecord>)> {
        self.branch_order
            .iter()
            .filter_map(|id| self.branch(id).map(|records| (id.as_str(), records)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.main_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main_sequence.is_empty()
    }
}

impl ThoughtTracker {
    pub fn new(validator: InputValidator) -> Self {
        Self {
            validator,
            main_sequence: Vec::new(),
            branch_order: Vec::new(),
            branches: HashMap::new(),
        }
    }

    /// Validate, classify and append one raw submission
    pub fn submit(&mut self, raw: &Value) -> Result<ThinkSummary> {
        let params = self.validator.parse(raw)?;
        self.submit_params(params)
    }

    /// Same as [`submit`](Self::submit) for input that was already deserialized
    pub fn submit_params(&mut self, params: ThoughtParams) -> Result<ThinkSummary> {
        let position = self.accept(params)?;
        let record = self
            .main_sequence
            .get(position)
            .ok_or_else(|| ThinkingError::Internal(format!("accepted record {} missing from history", position)))?;
        Ok(self.summary(record))
    }

    fn accept(&mut self, params: ThoughtParams) -> Result<usize> {
        let mut record = self.validator.validate(params)?;
        self.check_references(&record)?;

        // The latest estimate never drops below a step that was already taken
        if let Some(highest) = self.highest_thought_number() {
            if record.total_thoughts < highest {
                tracing::debug!(
                    "Raising total_thoughts from {} to {} (highest accepted thought)",
                    record.total_thoughts,
                    highest
                );
                record.total_thoughts = highest;
            }
        }

        let position = self.main_sequence.len();
        record.sequence = position + 1;
        record.previous_steps = self.carried_steps();

        if record.is_branch() {
            if let Some(branch_id) = record.branch_id.clone() {
                if !self.branches.contains_key(&branch_id) {
                    tracing::debug!("New branch '{}' forked from thought {:?}", branch_id, record.branch_from_thought);
                    self.branch_order.push(branch_id.clone());
                }
                self.branches.entry(branch_id).or_default().push(position);
            }
        }

        tracing::info!(
            "Accepted {} thought {} of {} (history length {})",
            record.kind,
            record.thought_number,
            record.total_thoughts,
            position + 1
        );
        self.main_sequence.push(record);
        Ok(position)
    }

    fn check_references(&self, record: &ThoughtRecord) -> std::result::Result<(), ValidationError> {
        if let Some(target) = record.revises_thought {
            if self.current_view(target).is_none() {
                return Err(ValidationError::UnknownRevisionTarget { thought: target });
            }
        }
        if let Some(fork) = record.branch_from_thought {
            if self.current_view(fork).is_none() {
                return Err(ValidationError::UnknownBranchPoint { thought: fork });
            }
        }
        Ok(())
    }

    /// Steps recommended so far: whatever the last record carried, plus its own current step
    fn carried_steps(&self) -> Vec<StepRecommendation> {
        match self.main_sequence.last() {
            Some(last) => {
                let mut steps = last.previous_steps.clone();
                steps.extend(last.current_step.clone());
                steps
            }
            None => Vec::new(),
        }
    }

    pub fn summary(&self, record: &ThoughtRecord) -> ThinkSummary {
        ThinkSummary {
            status: "accepted".to_string(),
            thought_id: record.id.clone(),
            thought_number: record.thought_number,
            total_thoughts: record.total_thoughts,
            next_thought_needed: record.next_thought_needed,
            thought_history_length: self.main_sequence.len(),
            branches: self.branch_order.clone(),
            kind: record.kind,
            is_revision: record.kind == ThoughtKind::Revision,
            is_branch: record.is_branch(),
            current_step: record.current_step.clone(),
            previous_steps: if record.previous_steps.is_empty() {
                None
            } else {
                Some(record.previous_steps.clone())
            },
            remaining_steps: record.remaining_steps.clone(),
        }
    }

    /// Render a record with its revision/branch context resolved against the
    /// history that existed when it was accepted.
    pub fn render(&self, record: &ThoughtRecord, visual: &VisualOutput) -> String {
        let earlier = self.earlier_than(record);
        let context = RenderContext {
            revised: record.revises_thought.and_then(|n| latest_with_number(earlier, n)),
            fork_point: record.branch_from_thought.and_then(|n| latest_with_number(earlier, n)),
        };
        visual.render(record, &context)
    }

    fn earlier_than(&self, record: &ThoughtRecord) -> &[ThoughtRecord] {
        match record.sequence {
            0 => &self.main_sequence,
            n if n <= self.main_sequence.len() => &self.main_sequence[..n - 1],
            _ => &self.main_sequence,
        }
    }

    pub fn history(&self) -> HistoryView<'_> {
        HistoryView {
            main_sequence: &self.main_sequence,
            branch_order: &self.branch_order,
            branches: &self.branches,
        }
    }

    /// Most recently accepted record for step `thought_number`
    pub fn current_view(&self, thought_number: u32) -> Option<&ThoughtRecord> {
        latest_with_number(&self.main_sequence, thought_number)
    }

    pub fn latest(&self) -> Option<&ThoughtRecord> {
        self.main_sequence.last()
    }

    pub fn highest_thought_number(&self) -> Option<u32> {
        self.main_sequence.iter().map(|r| r.thought_number).max()
    }

    pub fn len(&self) -> usize {
        self.main_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main_sequence.is_empty()
    }

    pub fn branch_count(&self) -> usize {
        self.branch_order.len()
    }
}

fn latest_with_number(records: &[ThoughtRecord], thought_number: u32) -> Option<&ThoughtRecord> {
    records.iter().rev().find(|r| r.thought_number == thought_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::visual::DisplayStyle;
    use serde_json::json;

    fn start(tracker: &mut ThoughtTracker) -> ThinkSummary {
        tracker
            .submit(&json!({"thought": "Start", "thought_number": 1, "total_thoughts": 3, "next_thought_needed": true}))
            .unwrap()
    }

    #[test]
    fn test_scenario_a_standard_thought() {
        let mut tracker = ThoughtTracker::default();
        let summary = start(&mut tracker);
        assert_eq!(summary.kind, ThoughtKind::Standard);
        assert_eq!(summary.total_thoughts, 3);
        assert_eq!(summary.thought_history_length, 1);
        assert!(summary.branches.is_empty());
        assert!(!summary.is_revision && !summary.is_branch);
    }

    #[test]
    fn test_scenario_b_revision() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        let summary = tracker
            .submit(&json!({
                "thought": "Fix step 1", "thought_number": 2, "total_thoughts": 3,
                "next_thought_needed": true, "is_revision": true, "revises_thought": 1
            }))
            .unwrap();
        assert_eq!(summary.kind, ThoughtKind::Revision);
        assert!(summary.is_revision);
        assert_eq!(tracker.len(), 2);
        // step 1 still resolves to its only record
        assert_eq!(tracker.current_view(1).unwrap().thought, "Start");
    }

    #[test]
    fn test_scenario_c_branch() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        let summary = tracker
            .submit(&json!({
                "thought": "Alt path", "thought_number": 2, "total_thoughts": 3,
                "next_thought_needed": true, "branch_from_thought": 1, "branch_id": "alt"
            }))
            .unwrap();
        assert_eq!(summary.kind, ThoughtKind::Branch);
        assert_eq!(summary.branches, vec!["alt".to_string()]);

        let history = tracker.history();
        let branch = history.branch("alt").unwrap();
        assert_eq!(branch.len(), 1);
        assert_eq!(branch[0].thought, "Alt path");
        assert_eq!(history.main_sequence().len(), 2);
    }

    #[test]
    fn test_scenario_d_unknown_revision_target() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        let err = tracker
            .submit(&json!({
                "thought": "Fix step 5", "thought_number": 2, "total_thoughts": 3,
                "next_thought_needed": true, "is_revision": true, "revises_thought": 5
            }))
            .unwrap_err();
        assert_eq!(err.rejection_kind(), Some(ErrorKind::Consistency));
        assert_eq!(err.field(), Some("revises_thought"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_scenario_e_total_auto_raised() {
        let mut tracker = ThoughtTracker::default();
        let summary = tracker
            .submit(&json!({"thought": "Far ahead", "thought_number": 10, "total_thoughts": 3, "next_thought_needed": true}))
            .unwrap();
        assert_eq!(summary.total_thoughts, 10);
        assert_eq!(tracker.latest().unwrap().total_thoughts, 10);
    }

    #[test]
    fn test_total_never_below_accepted_step() {
        let mut tracker = ThoughtTracker::default();
        tracker.submit_params(ThoughtParams::new("a", 1, 2, true)).unwrap();
        tracker.submit_params(ThoughtParams::new("b", 7, 7, true)).unwrap();
        let summary = tracker.submit_params(ThoughtParams::new("c", 2, 3, true)).unwrap();
        assert_eq!(summary.total_thoughts, 7);
        for record in tracker.history().main_sequence() {
            assert!(tracker.latest().unwrap().total_thoughts >= record.thought_number);
        }
    }

    #[test]
    fn test_unknown_branch_point_leaves_history_unchanged() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        let mut params = ThoughtParams::new("Fork from nowhere", 2, 3, true);
        params.branch_from_thought = Some(4);
        params.branch_id = Some("ghost".to_string());
        let err = tracker.submit_params(params).unwrap_err();
        assert_eq!(err.field(), Some("branch_from_thought"));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.branch_count(), 0);
        assert!(tracker.history().branch("ghost").is_none());
    }

    #[test]
    fn test_revision_cannot_reference_itself_before_acceptance() {
        let mut tracker = ThoughtTracker::default();
        let mut params = ThoughtParams::new("Self reference", 1, 1, false);
        params.is_revision = Some(true);
        params.revises_thought = Some(1);
        assert!(tracker.submit_params(params).is_err());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_length_matches_successful_submissions() {
        let mut tracker = ThoughtTracker::default();
        let inputs = [
            json!({"thought": "one", "thought_number": 1, "total_thoughts": 2, "next_thought_needed": true}),
            json!({"thought": "", "thought_number": 2, "total_thoughts": 2, "next_thought_needed": true}),
            json!({"thought": "two", "thought_number": 2, "total_thoughts": 2, "next_thought_needed": true}),
            json!({"thought": "typo", "thought_number": 3, "total_thoughts": 3, "next_thought_needed": true, "brnach_id": "x"}),
            json!({"thought": "three", "thought_number": 3, "total_thoughts": 3, "next_thought_needed": false}),
        ];
        let accepted = inputs.iter().filter(|raw| tracker.submit(raw).is_ok()).count();
        assert_eq!(accepted, 3);
        assert_eq!(tracker.len(), accepted);
        let sequences: Vec<usize> = tracker.history().main_sequence().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn test_same_input_twice_is_not_deduplicated() {
        let mut tracker = ThoughtTracker::default();
        let raw = json!({"thought": "Again", "thought_number": 1, "total_thoughts": 1, "next_thought_needed": true});
        let first = tracker.submit(&raw).unwrap();
        let second = tracker.submit(&raw).unwrap();
        assert_ne!(first.thought_id, second.thought_id);
        assert_eq!(second.thought_history_length, 2);

        let records = tracker.history().main_sequence();
        assert_eq!(records[0].thought, records[1].thought);
        assert_eq!(records[0].thought_number, records[1].thought_number);
    }

    #[test]
    fn test_branch_records_kept_in_insertion_order() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        tracker.submit_params(ThoughtParams::new("main two", 2, 3, true)).unwrap();
        for (n, text, id) in [(2, "alt one", "alt"), (2, "other one", "other"), (3, "alt two", "alt")] {
            let mut params = ThoughtParams::new(text, n, 3, true);
            params.branch_from_thought = Some(1);
            params.branch_id = Some(id.to_string());
            tracker.submit_params(params).unwrap();
        }

        let history = tracker.history();
        assert_eq!(history.branch_ids().to_vec(), vec!["alt".to_string(), "other".to_string()]);
        let alt: Vec<&str> = history.branch("alt").unwrap().iter().map(|r| r.thought.as_str()).collect();
        assert_eq!(alt, vec!["alt one", "alt two"]);
        assert_eq!(history.branches().len(), 2);
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn test_branch_can_fork_from_branch_step() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        let mut params = ThoughtParams::new("alt two", 2, 3, true);
        params.branch_from_thought = Some(1);
        params.branch_id = Some("alt".to_string());
        tracker.submit_params(params).unwrap();

        let mut nested = ThoughtParams::new("deeper", 3, 3, false);
        nested.branch_from_thought = Some(2);
        nested.branch_id = Some("deeper".to_string());
        assert!(tracker.submit_params(nested).is_ok());
    }

    #[test]
    fn test_current_view_resolves_latest_revision() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        let mut revision = ThoughtParams::new("Start, corrected", 1, 3, true);
        revision.is_revision = Some(true);
        revision.revises_thought = Some(1);
        tracker.submit_params(revision).unwrap();

        assert_eq!(tracker.current_view(1).unwrap().thought, "Start, corrected");
        assert_eq!(tracker.history().main_sequence()[0].thought, "Start");
    }

    #[test]
    fn test_previous_steps_accumulate() {
        let mut tracker = ThoughtTracker::default();
        let step = |description: &str| {
            json!({"step_description": description, "recommended_tools": [], "expected_outcome": "ok"})
        };
        tracker
            .submit(&json!({"thought": "a", "thought_number": 1, "total_thoughts": 3, "next_thought_needed": true, "current_step": step("read")}))
            .unwrap();
        tracker
            .submit(&json!({"thought": "b", "thought_number": 2, "total_thoughts": 3, "next_thought_needed": true, "current_step": step("edit")}))
            .unwrap();
        let summary = tracker
            .submit(&json!({"thought": "c", "thought_number": 3, "total_thoughts": 3, "next_thought_needed": false, "remaining_steps": ["ship"]}))
            .unwrap();

        let previous: Vec<String> = summary
            .previous_steps
            .unwrap()
            .into_iter()
            .map(|s| s.step_description)
            .collect();
        assert_eq!(previous, vec!["read", "edit"]);
        assert_eq!(summary.remaining_steps, Some(vec!["ship".to_string()]));
        assert!(summary.current_step.is_none());
    }

    #[test]
    fn test_render_resolves_revised_step_from_earlier_history() {
        let mut tracker = ThoughtTracker::default();
        start(&mut tracker);
        let mut revision = ThoughtParams::new("Start again", 1, 3, true);
        revision.is_revision = Some(true);
        revision.revises_thought = Some(1);
        tracker.submit_params(revision).unwrap();

        let visual = VisualOutput::new(DisplayStyle::Plain, 80);
        let rendered = tracker.render(tracker.latest().unwrap(), &visual);
        assert!(rendered.contains("Revision 1/3 (revising thought 1)"));
        // context is the record it superseded, not itself
        assert!(rendered.contains("Supersedes: Start"));
    }
}

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::config::ThinkingConfig;
use crate::error::{Result, ThinkingError};
use crate::history::ThoughtTracker;
use crate::models::{
    HistoryResponse, Rejection, ResetResponse, ThinkOutcome, ThinkSummary, ThoughtParams,
};
use crate::validation::InputValidator;
use crate::visual::{DisplaySink, NullSink, StderrSink, VisualOutput};

/// Invocation boundary for the thinking tool.
///
/// Owns exactly one tracker, i.e. one reasoning session. Schema and
/// consistency failures come back as [`ThinkOutcome::Rejected`] so the agent
/// can retry; only internal failures are returned as `Err`.
pub struct ToolHandlers {
    tracker: Mutex<ThoughtTracker>,
    validator: InputValidator,
    visual: VisualOutput,
    sink: Box<dyn DisplaySink>,
}

impl ToolHandlers {
    pub fn new(config: &ThinkingConfig) -> Self {
        let sink: Box<dyn DisplaySink> = if config.display.enabled {
            Box::new(StderrSink)
        } else {
            Box::new(NullSink)
        };
        Self::with_sink(
            InputValidator::new(config.validation.max_thought_length),
            VisualOutput::new(config.display.style, config.display.width),
            sink,
        )
    }

    pub fn with_sink(validator: InputValidator, visual: VisualOutput, sink: Box<dyn DisplaySink>) -> Self {
        Self {
            tracker: Mutex::new(ThoughtTracker::new(validator.clone())),
            validator,
            visual,
            sink,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ThoughtTracker>> {
        self.tracker
            .lock()
            .map_err(|_| ThinkingError::Internal("thought tracker lock poisoned".to_string()))
    }

    /// Submit a raw field mapping
    pub fn invoke(&self, raw: &Value) -> Result<ThinkOutcome> {
        let mut tracker = self.lock()?;
        let result = tracker.submit(raw);
        self.finish(&tracker, result)
    }

    /// Async callers get the same synchronous logic; there is no suspension point inside
    pub async fn invoke_async(&self, raw: Value) -> Result<ThinkOutcome> {
        self.invoke(&raw)
    }

    /// Submit already-typed input; only the value rules run, not the raw-shape pass
    pub fn think(&self, params: ThoughtParams) -> Result<ThinkOutcome> {
        let mut tracker = self.lock()?;
        let result = tracker.submit_params(params);
        self.finish(&tracker, result)
    }

    fn finish(&self, tracker: &ThoughtTracker, result: Result<ThinkSummary>) -> Result<ThinkOutcome> {
        match result {
            Ok(summary) => {
                let record = tracker
                    .latest()
                    .ok_or_else(|| ThinkingError::Internal("no record after acceptance".to_string()))?;
                let rendered = tracker.render(record, &self.visual);
                // the record is already accepted; a broken display must not undo that
                if let Err(e) = self.sink.emit(&rendered) {
                    tracing::warn!("Failed to write thought display: {}", e);
                }
                Ok(ThinkOutcome::Accepted(summary))
            }
            Err(e) => match Rejection::from_error(&e) {
                Some(rejection) => {
                    tracing::warn!("Rejected thought: {}", e);
                    Ok(ThinkOutcome::Rejected(rejection))
                }
                None => {
                    tracing::error!("Thought processing failed: {}", e);
                    Err(e)
                }
            },
        }
    }

    /// Full history, or one branch when `branch_id` is given
    pub fn history(&self, branch_id: Option<&str>) -> Result<HistoryResponse> {
        let tracker = self.lock()?;
        let view = tracker.history();

        let thoughts: Vec<_> = match branch_id {
            Some(id) => view
                .branch(id)
                .map(|records| records.into_iter().cloned().collect())
                .unwrap_or_default(),
            None => view.main_sequence().to_vec(),
        };

        tracing::debug!("History query for {:?}: {} thoughts", branch_id, thoughts.len());

        Ok(HistoryResponse {
            total_found: thoughts.len(),
            thoughts,
            branch_id: branch_id.map(str::to_string),
            branches: view.branch_ids().to_vec(),
        })
    }

    /// Discard the session's tracker and start a fresh one
    pub fn reset(&self) -> Result<ResetResponse> {
        let mut tracker = self.lock()?;
        let discarded_thoughts = tracker.len();
        let discarded_branches = tracker.branch_count();
        *tracker = ThoughtTracker::new(self.validator.clone());

        tracing::info!(
            "Session reset: discarded {} thoughts across {} branches",
            discarded_thoughts,
            discarded_branches
        );

        Ok(ResetResponse {
            status: "reset".to_string(),
            discarded_thoughts,
            discarded_branches,
        })
    }
}

use std::future::Future;
use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
    ServerHandler,
};
use rmcp_macros::{tool, tool_handler, tool_router};
use serde::Serialize;

use crate::config::{ServerConfig, ThinkingConfig};
use crate::handlers::ToolHandlers;
use crate::models::{HistoryParams, RawThoughtArgs, ThinkOutcome};
use crate::schema::TOOL_DESCRIPTION;

/// MCP server exposing one sequential thinking session over stdio
#[derive(Clone)]
pub struct SequentialThinkingService {
    tool_router: ToolRouter<Self>,
    handlers: Arc<ToolHandlers>,
    server: ServerConfig,
}

impl SequentialThinkingService {
    pub fn new(config: &ThinkingConfig) -> Self {
        tracing::info!(
            "Initializing {} v{} (display: {}, style: {:?})",
            config.server.name,
            config.server.version,
            config.display.enabled,
            config.display.style
        );

        Self {
            tool_router: Self::tool_router(),
            handlers: Arc::new(ToolHandlers::new(config)),
            server: config.server.clone(),
        }
    }
}

fn json_content<T: Serialize>(value: T) -> std::result::Result<Content, ErrorData> {
    Content::json(value)
        .map_err(|e| ErrorData::internal_error(format!("Failed to create JSON content: {}", e), None))
}

#[tool_router]
impl SequentialThinkingService {
    #[tool(description = "Record one step of structured, reflective problem solving. Supports revising earlier thoughts, branching into alternative paths, extending the estimated total, and attaching tool recommendations for the current step.")]
    pub async fn sequentialthinking_tools(
        &self,
        params: Parameters<RawThoughtArgs>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        // raw arguments go through the closed-schema parse, so shape errors are rejections too
        match self.handlers.invoke(&params.0.into_value()) {
            Ok(outcome @ ThinkOutcome::Accepted(_)) => Ok(CallToolResult::success(vec![json_content(outcome)?])),
            // rejections are part of the tool's vocabulary so the agent can retry
            Ok(outcome @ ThinkOutcome::Rejected(_)) => Ok(CallToolResult::error(vec![json_content(outcome)?])),
            Err(e) => {
                tracing::error!("sequentialthinking_tools error: {}", e);
                Err(ErrorData::internal_error(e.to_string(), None))
            }
        }
    }

    #[tool(description = "Return the accepted thoughts of this session in acceptance order, optionally only those of one branch")]
    pub async fn sequentialthinking_history(
        &self,
        params: Parameters<HistoryParams>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        match self.handlers.history(params.0.branch_id.as_deref()) {
            Ok(response) => Ok(CallToolResult::success(vec![json_content(response)?])),
            Err(e) => {
                tracing::error!("sequentialthinking_history error: {}", e);
                Err(ErrorData::internal_error(e.to_string(), None))
            }
        }
    }

    #[tool(description = "Discard every thought and branch and start a new reasoning session")]
    pub async fn sequentialthinking_reset(&self) -> std::result::Result<CallToolResult, ErrorData> {
        match self.handlers.reset() {
            Ok(response) => Ok(CallToolResult::success(vec![json_content(response)?])),
            Err(e) => {
                tracing::error!("sequentialthinking_reset error: {}", e);
                Err(ErrorData::internal_error(e.to_string(), None))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for SequentialThinkingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.server.name.clone(),
                version: self.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(TOOL_DESCRIPTION.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn service() -> SequentialThinkingService {
        let mut config = ThinkingConfig::default();
        config.display.enabled = false;
        SequentialThinkingService::new(&config)
    }

    fn thought_args(value: Value) -> Parameters<RawThoughtArgs> {
        Parameters(serde_json::from_value(value).unwrap())
    }

    fn payload(result: &CallToolResult) -> Value {
        let text = result.content[0].as_text().expect("text content");
        serde_json::from_str(&text.text).unwrap()
    }

    async fn submit(service: &SequentialThinkingService, value: Value) -> CallToolResult {
        service.sequentialthinking_tools(thought_args(value)).await.unwrap()
    }

    #[tokio::test]
    async fn test_accepted_thought_is_tool_success() {
        let service = service();
        let result = submit(
            &service,
            json!({"thought": "Start", "thought_number": 1, "total_thoughts": 3, "next_thought_needed": true}),
        )
        .await;

        assert_eq!(result.is_error, Some(false));
        let body = payload(&result);
        assert_eq!(body["status"], "accepted");
        assert_eq!(body["thought_history_length"], 1);
    }

    #[tokio::test]
    async fn test_bad_input_is_tool_error_with_rejection() {
        let service = service();
        submit(
            &service,
            json!({"thought": "Start", "thought_number": 1, "total_thoughts": 3, "next_thought_needed": true}),
        )
        .await;

        let cases = vec![
            (
                json!({"thought": "x", "thought_number": 2, "total_thoughts": 3}),
                "schema",
                "next_thought_needed",
            ),
            (
                json!({"thought": "x", "thought_number": 2, "total_thoughts": 3, "next_thought_needed": true, "mood": "good"}),
                "schema",
                "mood",
            ),
            (
                json!({"thought": "x", "thought_number": "2", "total_thoughts": 3, "next_thought_needed": true}),
                "schema",
                "thought_number",
            ),
            (
                json!({"thought": "x", "thought_number": 2, "total_thoughts": 3, "next_thought_needed": true, "is_revision": true, "revises_thought": 7}),
                "consistency",
                "revises_thought",
            ),
        ];

        for (input, error_type, field) in cases {
            let result = submit(&service, input.clone()).await;
            assert_eq!(result.is_error, Some(true), "input: {}", input);
            let body = payload(&result);
            assert_eq!(body["status"], "rejected");
            assert_eq!(body["error_type"], error_type, "input: {}", input);
            assert_eq!(body["field"], field, "input: {}", input);
        }

        let history = service
            .sequentialthinking_history(Parameters(HistoryParams::default()))
            .await
            .unwrap();
        assert_eq!(payload(&history)["total_found"], 1);
    }

    #[tokio::test]
    async fn test_history_by_branch_and_reset_tools() {
        let service = service();
        submit(
            &service,
            json!({"thought": "Start", "thought_number": 1, "total_thoughts": 3, "next_thought_needed": true}),
        )
        .await;
        submit(
            &service,
            json!({
                "thought": "Alt path", "thought_number": 2, "total_thoughts": 3,
                "next_thought_needed": true, "branch_from_thought": 1, "branch_id": "alt"
            }),
        )
        .await;

        let branch = service
            .sequentialthinking_history(Parameters(HistoryParams { branch_id: Some("alt".to_string()) }))
            .await
            .unwrap();
        assert_eq!(branch.is_error, Some(false));
        let body = payload(&branch);
        assert_eq!(body["total_found"], 1);
        assert_eq!(body["branch_id"], "alt");
        assert_eq!(body["thoughts"][0]["thought"], "Alt path");

        let reset = service.sequentialthinking_reset().await.unwrap();
        let body = payload(&reset);
        assert_eq!(body["status"], "reset");
        assert_eq!(body["discarded_thoughts"], 2);
        assert_eq!(body["discarded_branches"], 1);

        let after = service
            .sequentialthinking_history(Parameters(HistoryParams::default()))
            .await
            .unwrap();
        assert_eq!(payload(&after)["total_found"], 0);
    }

    #[test]
    fn test_server_info_uses_configured_identity() {
        let info = service().get_info();
        assert_eq!(info.server_info.name, "sequential-thinking");
        assert!(info.capabilities.tools.is_some());
    }
}

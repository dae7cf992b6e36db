mod client;
pub(crate) mod types;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::OracleError;
use crate::oracle::{InferRequest, Oracle};
use crate::util::extract_json_object;

use client::ClaudeClient;
use types::{ChatRequest, ChatResponse, ToolDefinitionWire, WireMessage};

const STRUCTURED_TOOL: &str = "structured_response";

/// Oracle backed by Claude's Messages API. Structured output is obtained by
/// forcing a single tool call whose input schema is the requested shape.
#[derive(Clone)]
pub struct ClaudeOracle {
    api_key: String,
    model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl ClaudeOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, OracleError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OracleError::Config("Anthropic API key is empty".into()));
        }
        Ok(Self {
            api_key,
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key, self.http.clone());
        match &self.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }

    fn build_request(&self, request: &InferRequest) -> ChatRequest {
        ChatRequest::new(&self.model)
            .system(request.system.clone())
            .message(WireMessage::user(request.prompt.clone()))
            .temperature(0.0)
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.to_string(),
                description: format!("Return the {} for the input.", request.shape),
                input_schema: request.schema.clone(),
            })
    }
}

/// Prefer the forced tool call; fall back to a JSON object embedded in text.
fn structured_value(response: &ChatResponse, shape: &str) -> Result<Value, OracleError> {
    if let Some(input) = response.tool_input() {
        return Ok(input.clone());
    }

    let text = response.text().ok_or(OracleError::Empty)?;
    warn!(shape, "Claude answered in text instead of the structured tool");
    let json = extract_json_object(text)
        .ok_or_else(|| OracleError::Malformed(format!("no JSON object in reply for {shape}")))?;
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl Oracle for ClaudeOracle {
    async fn infer(&self, request: &InferRequest) -> Result<Value, OracleError> {
        let response = self.client().chat(&self.build_request(request)).await?;
        structured_value(&response, &request.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: Value) -> ChatResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            ClaudeOracle::new("  ", "claude-haiku-4-5-20251001"),
            Err(OracleError::Config(_))
        ));
    }

    #[test]
    fn request_forces_the_structured_tool() {
        let oracle = ClaudeOracle::new("sk-ant-test", "claude-haiku-4-5-20251001").unwrap();
        let request = InferRequest {
            shape: "ClaimVerdict".into(),
            system: "sys".into(),
            prompt: "claim".into(),
            schema: serde_json::json!({ "type": "object" }),
        };
        let wire = serde_json::to_value(oracle.build_request(&request)).unwrap();
        assert_eq!(wire["tool_choice"]["name"], STRUCTURED_TOOL);
        assert_eq!(wire["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(wire["messages"][0]["role"], "user");
    }

    #[test]
    fn tool_input_wins_over_text() {
        let resp = response(serde_json::json!({
            "content": [
                { "type": "text", "text": "{\"ignored\": true}" },
                { "type": "tool_use", "id": "t1", "name": STRUCTURED_TOOL, "input": { "status": "VERIFIED" } }
            ],
            "stop_reason": "tool_use"
        }));
        let value = structured_value(&resp, "ClaimVerdict").unwrap();
        assert_eq!(value["status"], "VERIFIED");
    }

    #[test]
    fn fenced_text_reply_is_recovered() {
        let resp = response(serde_json::json!({
            "content": [{ "type": "text", "text": "```json\n{\"query\": \"flood chennai\"}\n```" }]
        }));
        let value = structured_value(&resp, "BroadenedQuery").unwrap();
        assert_eq!(value["query"], "flood chennai");
    }

    #[test]
    fn reply_without_content_is_empty() {
        let resp = response(serde_json::json!({ "content": [] }));
        assert!(matches!(
            structured_value(&resp, "BroadenedQuery"),
            Err(OracleError::Empty)
        ));
    }
}

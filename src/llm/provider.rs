use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::{LlmConfig, LlmProviderType};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("failed to parse {provider} response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    #[error("no response from {0}")]
    Empty(&'static str),

    #[error("{0} requires an api_key")]
    MissingApiKey(&'static str),

    #[error("gave up after {0} tool rounds")]
    ToolRounds(usize),
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User(String),
    Assistant(String),
    ToolCall(ToolCall),
    ToolResult {
        call_id: String,
        name: String,
        content: Value,
    },
}

/// A function the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolSpec>,
    /// Ask for a bare JSON object as the reply.
    pub json: bool,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            ..Default::default()
        }
    }

    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.turns.push(Turn::User(text.into()));
        self
    }

    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCall(ToolCall),
}

/// A generative model that can hold a short tool-using exchange.
pub trait LlmProvider: Send + Sync {
    fn chat(&self, request: &ChatRequest) -> LlmResult<ModelReply>;

    /// Provider name for display and logs.
    fn provider_name(&self) -> &'static str;
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn request_error(provider: &'static str, e: ureq::Error) -> LlmError {
    let message = match e {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            format!("HTTP {}: {}", code, body.trim())
        }
        other => other.to_string(),
    };
    LlmError::Request { provider, message }
}

fn parse_error(provider: &'static str, e: impl std::fmt::Display) -> LlmError {
    LlmError::Parse {
        provider,
        message: e.to_string(),
    }
}

const JSON_ONLY: &str = "Respond with a single JSON object and nothing else.";

// ============================================================================
// OpenAI-compatible provider (works with LM Studio, OpenAI, and compatible APIs)
// ============================================================================

pub struct OpenAICompatibleProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    /// JSON-encoded arguments.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAICompatibleProvider {
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, request: &ChatRequest) -> OpenAIChatRequest {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage::text("system", system));
        }
        for turn in &request.turns {
            messages.push(match turn {
                Turn::User(text) => OpenAIMessage::text("user", text),
                Turn::Assistant(text) => OpenAIMessage::text("assistant", text),
                Turn::ToolCall(call) => OpenAIMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: Some(vec![OpenAIToolCall {
                        id: call.id.clone(),
                        call_type: function_type(),
                        function: OpenAIFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    }]),
                    tool_call_id: None,
                },
                Turn::ToolResult { call_id, content, .. } => OpenAIMessage {
                    role: "tool".to_string(),
                    content: Some(content.to_string()),
                    tool_calls: None,
                    tool_call_id: Some(call_id.clone()),
                },
            });
        }

        OpenAIChatRequest {
            model: self.model.clone(),
            messages,
            tools: request
                .tools
                .iter()
                .map(|t| OpenAITool {
                    tool_type: "function",
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
            response_format: request
                .json
                .then(|| serde_json::json!({ "type": "json_object" })),
            temperature: 0.7,
        }
    }
}

impl LlmProvider for OpenAICompatibleProvider {
    fn chat(&self, request: &ChatRequest) -> LlmResult<ModelReply> {
        let name = self.provider_name();
        let url = format!("{}/chat/completions", self.endpoint);

        let mut req = agent(self.timeout)
            .post(&url)
            .set("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.set("Authorization", &format!("Bearer {}", api_key));
        }

        let response = req
            .send_json(&self.build_request(request))
            .map_err(|e| request_error(name, e))?;

        let chat_response: OpenAIChatResponse =
            response.into_json().map_err(|e| parse_error(name, e))?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(LlmError::Empty(name))?;

        if let Some(call) = message.tool_calls.and_then(|calls| calls.into_iter().next()) {
            let arguments = serde_json::from_str(&call.function.arguments)
                .map_err(|e| parse_error(name, e))?;
            return Ok(ModelReply::ToolCall(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            }));
        }

        message
            .content
            .map(ModelReply::Text)
            .ok_or(LlmError::Empty(name))
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI-compatible"
    }
}

/// Strip a surrounding code fence and any chatter around a JSON object.
pub fn extract_json(content: &str) -> String {
    let trimmed = content.trim();

    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let after_first_line = &trimmed[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim().to_string();
            }
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

pub struct AnthropicProvider {
    api_key: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.unwrap_or("claude-sonnet-4-20250514").to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, request: &ChatRequest) -> AnthropicRequest {
        let system = match (&request.system, request.json) {
            (Some(system), true) => Some(format!("{}\n\n{}", system, JSON_ONLY)),
            (None, true) => Some(JSON_ONLY.to_string()),
            (system, false) => system.clone(),
        };

        let messages = request
            .turns
            .iter()
            .map(|turn| match turn {
                Turn::User(text) => AnthropicMessage {
                    role: "user",
                    content: vec![AnthropicContent::Text { text: text.clone() }],
                },
                Turn::Assistant(text) => AnthropicMessage {
                    role: "assistant",
                    content: vec![AnthropicContent::Text { text: text.clone() }],
                },
                Turn::ToolCall(call) => AnthropicMessage {
                    role: "assistant",
                    content: vec![AnthropicContent::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                    }],
                },
                Turn::ToolResult { call_id, content, .. } => AnthropicMessage {
                    role: "user",
                    content: vec![AnthropicContent::ToolResult {
                        tool_use_id: call_id.clone(),
                        content: content.to_string(),
                    }],
                },
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system,
            messages,
            tools: request
                .tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters.clone(),
                })
                .collect(),
        }
    }
}

impl LlmProvider for AnthropicProvider {
    fn chat(&self, request: &ChatRequest) -> LlmResult<ModelReply> {
        let name = self.provider_name();
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey(name));
        }

        let response = agent(self.timeout)
            .post("https://api.anthropic.com/v1/messages")
            .set("Content-Type", "application/json")
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", "2023-06-01")
            .send_json(&self.build_request(request))
            .map_err(|e| request_error(name, e))?;

        let anthropic_response: AnthropicResponse =
            response.into_json().map_err(|e| parse_error(name, e))?;

        let mut text = String::new();
        for block in anthropic_response.content {
            match block {
                AnthropicContent::ToolUse { id, name, input } => {
                    return Ok(ModelReply::ToolCall(ToolCall {
                        id,
                        name,
                        arguments: input,
                    }));
                }
                AnthropicContent::Text { text: t } => text.push_str(&t),
                _ => {}
            }
        }

        if text.is_empty() {
            return Err(LlmError::Empty(name));
        }
        Ok(ModelReply::Text(text))
    }

    fn provider_name(&self) -> &'static str {
        "Anthropic Claude"
    }
}

pub struct OllamaProvider {
    endpoint: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAITool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

impl OllamaProvider {
    pub fn new(endpoint: Option<&str>, model: &str) -> Self {
        Self {
            endpoint: endpoint
                .unwrap_or("http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(180),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, request: &ChatRequest) -> OllamaRequest {
        let message = |role: &str, content: String| OllamaMessage {
            role: role.to_string(),
            content,
            tool_calls: Vec::new(),
        };

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(message("system", system.clone()));
        }
        for turn in &request.turns {
            messages.push(match turn {
                Turn::User(text) => message("user", text.clone()),
                Turn::Assistant(text) => message("assistant", text.clone()),
                Turn::ToolCall(call) => OllamaMessage {
                    role: "assistant".to_string(),
                    content: String::new(),
                    tool_calls: vec![OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    }],
                },
                Turn::ToolResult { content, .. } => message("tool", content.to_string()),
            });
        }

        OllamaRequest {
            model: self.model.clone(),
            messages,
            tools: request
                .tools
                .iter()
                .map(|t| OpenAITool {
                    tool_type: "function",
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
            format: request.json.then_some("json"),
            stream: false,
        }
    }
}

impl LlmProvider for OllamaProvider {
    fn chat(&self, request: &ChatRequest) -> LlmResult<ModelReply> {
        let name = self.provider_name();
        let url = format!("{}/api/chat", self.endpoint);

        let response = agent(self.timeout)
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(&self.build_request(request))
            .map_err(|e| request_error(name, e))?;

        let ollama_response: OllamaResponse =
            response.into_json().map_err(|e| parse_error(name, e))?;
        let message = ollama_response.message;

        // Ollama does not assign call ids; the tool name stands in for one.
        if let Some(call) = message.tool_calls.into_iter().next() {
            return Ok(ModelReply::ToolCall(ToolCall {
                id: call.function.name.clone(),
                name: call.function.name,
                arguments: call.function.arguments,
            }));
        }

        if message.content.is_empty() {
            return Err(LlmError::Empty(name));
        }
        Ok(ModelReply::Text(message.content))
    }

    fn provider_name(&self) -> &'static str {
        "Ollama"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM provider based on configuration
pub fn create_provider(config: &LlmConfig) -> Box<dyn LlmProvider> {
    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    match config.provider {
        LlmProviderType::LmStudio => Box::new(
            OpenAICompatibleProvider::new(&config.endpoint, &config.model, config.api_key.as_deref())
                .with_timeout(timeout),
        ),
        LlmProviderType::OpenAI => Box::new(
            OpenAICompatibleProvider::new(
                "https://api.openai.com/v1",
                &config.model,
                config.api_key.as_deref(),
            )
            .with_timeout(timeout),
        ),
        LlmProviderType::Anthropic => {
            let api_key = config.api_key.as_deref().unwrap_or("");
            Box::new(AnthropicProvider::new(api_key, Some(&config.model)).with_timeout(timeout))
        }
        LlmProviderType::Ollama => Box::new(
            OllamaProvider::new(Some(&config.endpoint), &config.model).with_timeout(timeout),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup_request() -> ChatRequest {
        let mut request = ChatRequest::new("Be helpful.")
            .user("Lyrics of Amazing Grace?")
            .tool(ToolSpec {
                name: "findHymnLyrics".to_string(),
                description: "Look up a hymn".to_string(),
                parameters: json!({ "type": "object" }),
            });
        request.turns.push(Turn::ToolCall(ToolCall {
            id: "call_1".to_string(),
            name: "findHymnLyrics".to_string(),
            arguments: json!({ "title": "Amazing Grace" }),
        }));
        request.turns.push(Turn::ToolResult {
            call_id: "call_1".to_string(),
            name: "findHymnLyrics".to_string(),
            content: json!({ "found": false }),
        });
        request
    }

    #[test]
    fn test_extract_json_strips_fences_and_chatter() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("Sure! {\"a\": 1} Enjoy."), "{\"a\": 1}");
        assert_eq!(extract_json("  plain  "), "plain");
    }

    #[test]
    fn test_openai_request_shape() {
        let provider = OpenAICompatibleProvider::new("http://localhost:1234/v1/", "m", None);
        let body = serde_json::to_value(provider.build_request(&lookup_request().json())).unwrap();

        assert_eq!(provider.endpoint, "http://localhost:1234/v1");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["name"], "findHymnLyrics");
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["arguments"],
            "{\"title\":\"Amazing Grace\"}"
        );
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_anthropic_request_shape() {
        let provider = AnthropicProvider::new("key", Some("m"));
        let body = serde_json::to_value(provider.build_request(&lookup_request().json())).unwrap();

        assert!(body["system"].as_str().unwrap().ends_with(JSON_ONLY));
        assert_eq!(body["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(body["messages"][2]["role"], "user");
        assert_eq!(body["messages"][2]["content"][0]["type"], "tool_result");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_anthropic_response_blocks() {
        let parsed: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "tool_use", "id": "t1", "name": "findHymnLyrics", "input": { "title": "x" } }
            ]
        }))
        .unwrap();
        assert!(matches!(parsed.content[0], AnthropicContent::Other));
        assert!(matches!(parsed.content[1], AnthropicContent::ToolUse { .. }));
    }

    #[test]
    fn test_ollama_request_shape() {
        let provider = OllamaProvider::new(None, "llama3");
        let body = serde_json::to_value(provider.build_request(&lookup_request().json())).unwrap();

        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["arguments"]["title"], "Amazing Grace");
        assert_eq!(body["messages"][3]["role"], "tool");
    }

    #[test]
    fn test_missing_anthropic_key_fails_without_request() {
        let provider = AnthropicProvider::new("", None);
        let err = provider.chat(&ChatRequest::new("s").user("hi")).unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
    }
}

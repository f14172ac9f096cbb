//! The language-model seam of the agent loop.

use super::conversation::{ToolRequest, Turn};
use crate::config::LlmSettings;
use crate::error::{KartError, Result};
use crate::openai::create_client_for_budget;
use crate::tools::ToolSpec;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

/// API error code OpenAI uses when the prompt does not fit the model.
const CONTEXT_LENGTH_EXCEEDED: &str = "context_length_exceeded";

/// What the model answered.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The model is done. `text` is `None` when it produced nothing.
    Final { text: Option<String> },
    /// The model wants these tools run before it continues.
    ToolCalls {
        text: Option<String>,
        requests: Vec<ToolRequest>,
    },
}

/// A chat model that can call tools.
///
/// Implementations return [`KartError::CapacityExceeded`] when the
/// transcript is too large to be accepted, and [`KartError::ModelTimeout`]
/// when their transport gives up waiting.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, transcript: &[Turn], catalog: &[ToolSpec]) -> Result<Completion>;
}

/// Chat completions against the OpenAI API.
pub struct OpenAiCompletion {
    client: Client<OpenAIConfig>,
    model: String,
    max_output_tokens: u32,
}

impl OpenAiCompletion {
    pub fn new(client: Client<OpenAIConfig>, model: &str, max_output_tokens: u32) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_output_tokens,
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Ok(Self::new(
            create_client_for_budget(settings.request_timeout())?,
            &settings.model,
            settings.max_output_tokens,
        ))
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, transcript: &[Turn], catalog: &[ToolSpec]) -> Result<Completion> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_messages(transcript)?)
            .tools(to_tools(catalog))
            .tool_choice(ChatCompletionToolChoiceOption::Auto)
            .max_completion_tokens(self.max_output_tokens)
            .build()
            .map_err(|e| KartError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| KartError::Agent("No response from model".to_string()))?;

        debug!(
            "Model finished with {:?}, {} tool call(s)",
            choice.finish_reason,
            choice.message.tool_calls.as_ref().map_or(0, Vec::len)
        );

        let text = choice.message.content;
        let requests: Vec<ToolRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolRequest::new(call.id, call.function.name, call.function.arguments))
            .collect();

        if choice.finish_reason == Some(FinishReason::Stop) || requests.is_empty() {
            Ok(Completion::Final { text })
        } else {
            Ok(Completion::ToolCalls { text, requests })
        }
    }
}

fn classify_error(error: OpenAIError) -> KartError {
    match error {
        OpenAIError::ApiError(api) if api.code.as_deref() == Some(CONTEXT_LENGTH_EXCEEDED) => {
            KartError::CapacityExceeded(api.message)
        }
        OpenAIError::Reqwest(e) if e.is_timeout() => KartError::ModelTimeout(e.to_string()),
        other => KartError::OpenAI(other.to_string()),
    }
}

fn to_tools(catalog: &[ToolSpec]) -> Vec<ChatCompletionTool> {
    catalog
        .iter()
        .map(|spec| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: spec.name.clone(),
                description: Some(spec.description.clone()),
                parameters: Some(spec.parameters.clone()),
                strict: None,
            },
        })
        .collect()
}

fn to_messages(transcript: &[Turn]) -> Result<Vec<ChatCompletionRequestMessage>> {
    transcript.iter().map(to_message).collect()
}

fn to_message(turn: &Turn) -> Result<ChatCompletionRequestMessage> {
    let message = match turn {
        Turn::System { text } => ChatCompletionRequestSystemMessageArgs::default()
            .content(text.clone())
            .build()
            .map_err(|e| KartError::Agent(e.to_string()))?
            .into(),
        Turn::User { text } => ChatCompletionRequestUserMessageArgs::default()
            .content(text.clone())
            .build()
            .map_err(|e| KartError::Agent(e.to_string()))?
            .into(),
        Turn::Assistant {
            text,
            tool_requests,
        } => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(text) = text {
                args.content(text.clone());
            }
            if !tool_requests.is_empty() {
                args.tool_calls(
                    tool_requests
                        .iter()
                        .map(|request| ChatCompletionMessageToolCall {
                            id: request.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: request.name.clone(),
                                arguments: request.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            args.build()
                .map_err(|e| KartError::Agent(e.to_string()))?
                .into()
        }
        Turn::Tool {
            request_id,
            payload,
        } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(request_id.clone())
            .content(payload.clone())
            .build()
            .map_err(|e| KartError::Agent(e.to_string()))?
            .into(),
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::create_client_with_config;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(server: &MockServer) -> OpenAiCompletion {
        let config = OpenAIConfig::new()
            .with_api_base(server.uri())
            .with_api_key("test-key");
        OpenAiCompletion::new(Client::with_config(config), "gpt-4o-mini", 256)
    }

    fn chat_response(message: serde_json::Value, finish_reason: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": message,
                "finish_reason": finish_reason,
                "logprobs": null
            }]
        })
    }

    fn transcript() -> Vec<Turn> {
        vec![Turn::system("You are a map assistant."), Turn::user("Where is Oslo?")]
    }

    #[test]
    fn test_assistant_turn_replays_requests() {
        let turn = Turn::Assistant {
            text: None,
            tool_requests: vec![ToolRequest::new("call_1", "forward_geocode", r#"{"query":"Oslo"}"#)],
        };
        let message = serde_json::to_value(to_message(&turn).unwrap()).unwrap();
        assert_eq!(message["role"], "assistant");
        assert_eq!(message["tool_calls"][0]["id"], "call_1");
        assert_eq!(message["tool_calls"][0]["function"]["arguments"], r#"{"query":"Oslo"}"#);
    }

    #[test]
    fn test_tool_turn_carries_request_id() {
        let message = serde_json::to_value(to_message(&Turn::tool("call_1", "{}")).unwrap()).unwrap();
        assert_eq!(message["role"], "tool");
        assert_eq!(message["tool_call_id"], "call_1");
    }

    #[tokio::test]
    async fn test_final_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"tool_choice": "auto", "model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
                json!({"role": "assistant", "content": "Oslo is in Norway."}),
                "stop",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = [ToolSpec::new(
            "forward_geocode",
            "Convert an address to coordinates",
            json!({"type": "object", "properties": {}}),
        )];
        let result = completion(&server)
            .complete(&transcript(), &catalog)
            .await
            .unwrap();

        assert_eq!(
            result,
            Completion::Final {
                text: Some("Oslo is in Norway.".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "forward_geocode", "arguments": "{\"query\":\"Oslo\"}"}
                    }]
                }),
                "tool_calls",
            )))
            .mount(&server)
            .await;

        let result = completion(&server).complete(&transcript(), &[]).await.unwrap();

        match result {
            Completion::ToolCalls { text, requests } => {
                assert!(text.is_none());
                assert_eq!(
                    requests,
                    vec![ToolRequest::new("call_abc", "forward_geocode", "{\"query\":\"Oslo\"}")]
                );
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_context_length_is_capacity_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "This model's maximum context length is 128000 tokens.",
                    "type": "invalid_request_error",
                    "param": "messages",
                    "code": "context_length_exceeded"
                }
            })))
            .mount(&server)
            .await;

        let err = completion(&server)
            .complete(&transcript(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, KartError::CapacityExceeded(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_other_api_errors_are_openai_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "invalid_api_key"
                }
            })))
            .mount(&server)
            .await;

        let err = completion(&server)
            .complete(&transcript(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, KartError::OpenAI(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_http_timeout_is_model_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_response(json!({"role": "assistant", "content": "late"}), "stop"))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let config = OpenAIConfig::new()
            .with_api_base(server.uri())
            .with_api_key("test-key");
        let client = create_client_with_config(config, Duration::from_millis(200)).unwrap();
        let err = OpenAiCompletion::new(client, "gpt-4o-mini", 256)
            .complete(&transcript(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, KartError::ModelTimeout(_)), "{:?}", err);
    }
}

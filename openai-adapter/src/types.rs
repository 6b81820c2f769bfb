//! Chat completions request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of a chat completions call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: u32,
}

/// One chat message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Message body.
    pub content: MessageContent,
}

/// Message author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions.
    System,
    /// End user.
    User,
    /// Model reply.
    Assistant,
}

/// Plain text for system messages, typed parts for user messages.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text body.
    Text(String),
    /// Typed parts.
    Parts(Vec<ContentPart>),
}

/// One part of a user message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part.
    Text {
        /// Prompt text.
        text: String,
    },
    /// File part.
    File {
        /// Attached file.
        file: FileData,
    },
}

/// Inline file attached to a user message.
#[derive(Debug, Clone, Serialize)]
pub struct FileData {
    /// Name shown to the model.
    pub filename: String,
    /// `data:` URL carrying the base64 payload.
    pub file_data: String,
}

impl Message {
    /// System message with plain text.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying a prompt and a PDF as a `data:` URL.
    #[must_use]
    pub fn user_with_pdf(prompt: impl Into<String>, filename: impl Into<String>, pdf_base64: &str) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: prompt.into() },
                ContentPart::File {
                    file: FileData {
                        filename: filename.into(),
                        file_data: format!("data:application/pdf;base64,{pdf_base64}"),
                    },
                },
            ]),
        }
    }
}

/// Body returned by chat completions.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completion id.
    #[serde(default)]
    pub id: String,
    /// Model that served the request.
    #[serde(default)]
    pub model: String,
    /// Generated choices.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token accounting.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// First choice, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Choice> {
        self.choices.first()
    }
}

/// One generated choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Position in `choices`.
    #[serde(default)]
    pub index: u32,
    /// Generated message.
    pub message: ResponseMessage,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Generated message.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Author role.
    pub role: Role,
    /// Reply text.
    #[serde(default)]
    pub content: Option<String>,
}

/// Token accounting.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Tokens in total.
    #[serde(default)]
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            messages: vec![
                Message::system("be careful"),
                Message::user_with_pdf("extract", "report.pdf", "JVBERi0="),
            ],
            temperature: 0.0,
            max_tokens: 4096,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0], serde_json::json!({"role": "system", "content": "be careful"}));
        assert_eq!(value["messages"][1]["content"][0], serde_json::json!({"type": "text", "text": "extract"}));
        assert_eq!(
            value["messages"][1]["content"][1],
            serde_json::json!({
                "type": "file",
                "file": {"filename": "report.pdf", "file_data": "data:application/pdf;base64,JVBERi0="}
            })
        );
        assert_eq!(value["max_tokens"], 4096);
    }

    #[test]
    fn test_response_parse() {
        let response: ChatResponse = serde_json::from_str(
            r##"{
                "id": "chatcmpl-1",
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "# Report\n\nRevenue: 100"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            }"##,
        )
        .unwrap();
        let choice = response.first().unwrap();
        assert_eq!(choice.message.role, Role::Assistant);
        assert_eq!(choice.message.content.as_deref(), Some("# Report\n\nRevenue: 100"));
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_null_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "content_filter"}]}"#,
        )
        .unwrap();
        assert_eq!(response.first().unwrap().message.content, None);
    }
}

//! Request bodies for the streamed chat-completion call.

use serde::Serialize;

use crate::llm_client::prompts::build_instruction;
use crate::llm_client::LlmConfig;
use crate::upload::EncodedDocument;

/// One evaluation call: the encoded résumé, the fixed instruction, and the
/// model parameters. Built once per relay call and never mutated.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub document: EncodedDocument,
    pub instruction: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl EvaluationRequest {
    pub fn new(document: EncodedDocument, language: &str, config: &LlmConfig) -> Self {
        Self {
            document,
            instruction: build_instruction(language),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Borrowing view serialized as the upstream JSON body.
    pub fn to_chat_request(&self) -> ChatCompletionRequest<'_> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::File {
                        file: FilePart {
                            filename: &self.document.filename,
                            file_data: self.document.data_url(),
                        },
                    },
                    ContentPart::Text {
                        text: &self.instruction,
                    },
                ],
            }],
            stream: true,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f64,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    File { file: FilePart<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
pub struct FilePart<'a> {
    pub filename: &'a str,
    pub file_data: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use common::error::AppError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ScoredChunk;

pub const GROUNDED_SYSTEM_PROMPT: &str = "You answer questions about a book using only the \
    provided context passages. Every passage carries an id. Cite the ids of the passages you \
    actually used in the references array, and cite nothing else. If the context does not \
    contain the answer, say that the book does not appear to cover the question and return an \
    empty references array. Do not use outside knowledge.";

pub const SELECTION_SYSTEM_PROMPT: &str = "You answer questions about a passage the reader \
    has selected from a book. Use only the selected text. If it does not contain the answer, \
    say so. Return an empty references array.";

/// Returned verbatim when retrieval produced nothing above the similarity
/// threshold; the provider is not called in that case.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find anything in the book that addresses this question.";

/// Seam between the orchestrator and the chat-completion backend. The
/// provider returns the raw JSON document matching [`answer_response_schema`];
/// parsing and citation filtering happen on this side of the seam.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str)
        -> Result<String, AppError>;
}

pub struct OpenAiGenerationProvider {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiGenerationProvider {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAiGenerationProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, AppError> {
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some("Grounded book question answering".into()),
                name: "grounded_answer".into(),
                schema: Some(answer_response_schema()),
                strict: Some(true),
            },
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(system_prompt.to_owned()).into(),
                ChatCompletionRequestUserMessage::from(user_message.to_owned()).into(),
            ])
            .response_format(response_format)
            .build()
            .map_err(|e| AppError::GenerationProvider(format!("request build failed: {e}")))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::GenerationProvider(format!("chat completion failed: {e}")))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::GenerationProvider("no content in chat completion response".into())
            })
    }
}

pub fn answer_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "answer": { "type": "string" },
            "references": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "reference": { "type": "string" },
                    },
                    "required": ["reference"],
                    "additionalProperties": false,
                }
            }
        },
        "required": ["answer", "references"],
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
struct LlmReference {
    reference: String,
}

#[derive(Debug, Deserialize)]
struct LlmAnswer {
    answer: String,
    references: Vec<LlmReference>,
}

/// A parsed, citation-filtered answer. `cited_chunk_ids` is a subset of the
/// chunk ids handed to the model, in the model's citation order.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub cited_chunk_ids: Vec<String>,
}

pub fn build_grounded_user_message(chunks: &[ScoredChunk], question: &str) -> String {
    let context = json!(chunks
        .iter()
        .map(|scored| {
            json!({
                "id": scored.chunk.id,
                "chapter": scored.chunk.chapter,
                "section": scored.chunk.section,
                "score": round_score(scored.similarity),
                "content": scored.chunk.text,
            })
        })
        .collect::<Vec<_>>());

    format!(
        "Context passages:\n==================\n{context}\n\n\
         Question:\n==================\n{question}\n"
    )
}

pub fn build_selection_user_message(selected_text: &str, question: &str) -> String {
    format!(
        "Selected passage:\n==================\n{selected_text}\n\n\
         Question:\n==================\n{question}\n"
    )
}

fn round_score(value: f32) -> f64 {
    (f64::from(value) * 1000.0).round() / 1000.0
}

/// Parses the provider's JSON document and drops every reference that does
/// not name one of `allowed_ids`. The model cannot introduce citations to
/// passages it was never shown.
pub fn parse_answer(content: &str, allowed_ids: &[String]) -> Result<GeneratedAnswer, AppError> {
    let parsed: LlmAnswer = serde_json::from_str(content).map_err(|e| {
        AppError::GenerationProvider(format!("malformed answer document: {e}"))
    })?;

    let mut cited_chunk_ids = Vec::new();
    for LlmReference { reference } in parsed.references {
        if allowed_ids.contains(&reference) && !cited_chunk_ids.contains(&reference) {
            cited_chunk_ids.push(reference);
        }
    }

    Ok(GeneratedAnswer {
        answer: parsed.answer,
        cited_chunk_ids,
    })
}

/// Full-book answer: builds the grounded prompt from the retrieved chunks,
/// calls the provider, and filters citations down to the shown passages.
/// With no chunks at all the provider is skipped entirely.
pub async fn generate_grounded(
    provider: &dyn GenerationProvider,
    chunks: &[ScoredChunk],
    question: &str,
) -> Result<GeneratedAnswer, AppError> {
    if chunks.is_empty() {
        return Ok(GeneratedAnswer {
            answer: NO_CONTEXT_ANSWER.to_string(),
            cited_chunk_ids: Vec::new(),
        });
    }

    let user_message = build_grounded_user_message(chunks, question);
    let content = provider
        .complete(GROUNDED_SYSTEM_PROMPT, &user_message)
        .await?;

    let allowed_ids: Vec<String> = chunks
        .iter()
        .map(|scored| scored.chunk.id.clone())
        .collect();
    parse_answer(&content, &allowed_ids)
}

/// Selected-text answer: the reader's selection is the only context, so the
/// result never carries citations.
pub async fn generate_from_selection(
    provider: &dyn GenerationProvider,
    selected_text: &str,
    question: &str,
) -> Result<GeneratedAnswer, AppError> {
    let user_message = build_selection_user_message(selected_text, question);
    let content = provider
        .complete(SELECTION_SYSTEM_PROMPT, &user_message)
        .await?;

    let answer = parse_answer(&content, &[])?;
    Ok(GeneratedAnswer {
        answer: answer.answer,
        cited_chunk_ids: Vec::new(),
    })
}

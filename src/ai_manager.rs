use std::env;

use color_eyre::eyre::{Context, ContextCompat, Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

use crate::{
    config, log_util,
    progress_store,
    question::RawQuestion,
    storage::StorageGateway,
};

const JSON_SCHEMA: &str = r#"{
  "type": "object",
  "additionalProperties": false,
  "properties": {
    "questions": {
      "type": "array",
      "description": "a list of multiple-choice practice questions",
      "items": {
        "type": "object",
        "additionalProperties": false,
        "properties": {
          "question": {
            "type": "string",
            "description": "the question stem shown to the student"
          },
          "choices": {
            "type": "array",
            "description": "between two and five answer choices",
            "items": {
              "type": "string"
            }
          },
          "answerIndex": {
            "type": "integer",
            "description": "zero-based index of the correct choice"
          },
          "explanation": {
            "type": "string",
            "description": "a short explanation shown after answering"
          },
          "subject": {
            "type": "string",
            "description": "the course this question belongs to"
          },
          "difficulty": {
            "type": "string",
            "enum": ["easy", "medium", "hard"]
          }
        },
        "required": [
          "question",
          "choices",
          "answerIndex",
          "explanation",
          "subject",
          "difficulty"
        ]
      }
    }
  },
  "required": [
    "questions"
  ]
}"#;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Structured question batch returned from the LLM. The items reuse the raw
/// record shape, so generated questions funnel through the same normalizer
/// as every other source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GeneratedQuestionSet {
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

/// Coordinates LLM requests that produce fresh practice questions.
#[derive(Debug, Clone)]
pub struct AiManager {
    client: Client,
    api_key: String,
    api_base: String,
    model_name: String,
}

impl AiManager {
    /// Create a new [`AiManager`] with the supplied OpenAI API key and model name.
    pub fn new(api_key: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model_name: model_name.into(),
        }
    }

    /// Construct an [`AiManager`] by reading the `OPENAI_API_KEY` environment variable.
    pub fn from_env(model_name: impl Into<String>) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .wrap_err("OPENAI_API_KEY environment variable is not set")?;
        Ok(Self::new(api_key, model_name))
    }

    /// Override the base URL used for OpenAI API requests (defaults to `https://api.openai.com/v1`).
    #[allow(dead_code)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Request a batch of `count` questions for `subject` and return the raw
    /// records for normalization.
    pub async fn generate_question_batch(
        &self,
        subject: &str,
        count: usize,
    ) -> Result<Vec<RawQuestion>> {
        let prompt = self.build_prompt(subject, count);
        let schema = schema_value();
        let payload = json!({
            "model": self.model_name.as_str(),
            "messages": [
                {
                    "role": "system",
                    "content": config::system_prompt(),
                },
                {
                    "role": "user",
                    "content": prompt,
                }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "generated_question_set",
                    "schema": schema,
                    "strict": true,
                }
            }
        });

        let endpoint = format!("{}/chat/completions", self.api_base);
        log_util::log_debug(&format!(
            "ai_manager: invoking {} with model {}",
            endpoint, self.model_name
        ));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .wrap_err("failed to invoke OpenAI chat completions API")?;

        log_util::log_debug(&format!("ai_manager: OpenAI status {}", response.status()));

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|err| format!("<failed to read body: {}>", err));
            log_util::log_debug(&format!("ai_manager: OpenAI error body: {}", body));
            return Err(eyre!(format!(
                "OpenAI returned {} with body: {}",
                status, body
            )));
        }

        let response_value: Value = response
            .json()
            .await
            .wrap_err("failed to parse OpenAI response body as JSON")?;

        let primary_text = extract_completion_text(&response_value)
            .context("OpenAI response did not include assistant content")?;

        let generated: GeneratedQuestionSet = serde_json::from_str(&primary_text)
            .wrap_err("failed to deserialize OpenAI response into a question set")?;
        log_util::log_debug(&format!(
            "ai_manager: received {} generated question(s)",
            generated.questions.len()
        ));

        Ok(generated.questions)
    }

    /// Serve the cached generation when one is still fresh; otherwise request
    /// a new batch and cache it under the well-known storage key.
    pub async fn cached_or_generate(
        &self,
        gateway: &mut dyn StorageGateway,
        subject: &str,
    ) -> Result<Vec<RawQuestion>> {
        if let Some(items) = progress_store::load_generated_batch(gateway) {
            log_util::log_debug("ai_manager: serving cached generation");
            return Ok(items);
        }
        let config = config::current();
        let items = self
            .generate_question_batch(subject, config.generation_batch_size)
            .await?;
        if let Err(err) =
            progress_store::store_generated_batch(gateway, items.clone(), config.generation_ttl_minutes)
        {
            log_util::log_debug(&format!("ai_manager: failed to cache generated batch: {err}"));
        }
        Ok(items)
    }

    /// Blocking convenience for embedders without an async runtime of their
    /// own.
    pub fn generate_question_batch_blocking(
        &self,
        subject: &str,
        count: usize,
    ) -> Result<Vec<RawQuestion>> {
        let runtime = Runtime::new().wrap_err("failed to start async runtime for AI generation")?;
        runtime.block_on(self.generate_question_batch(subject, count))
    }

    fn build_prompt(&self, subject: &str, count: usize) -> String {
        format!(
            "Produce {count} multiple-choice practice questions for the subject \"{subject}\". Return only valid JSON with double-quoted keys and strings.\n\nSchema:\n```json\n{JSON_SCHEMA}\n```"
        )
    }
}

fn schema_value() -> Value {
    serde_json::from_str(JSON_SCHEMA).expect("JSON_SCHEMA is valid")
}

fn extract_completion_text(value: &Value) -> Option<String> {
    let choices = value.get("choices")?.as_array()?;
    let first_choice = choices.first()?;
    let message = first_choice.get("message")?;
    let content = message.get("content")?;
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let mut buffer = String::new();
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    buffer.push_str(text);
                }
            }
            if buffer.is_empty() { None } else { Some(buffer) }
        }
        _ => None,
    }
}

use async_trait::async_trait;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::Ollama;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::ModelError;

pub const SYSTEM_PROMPT: &str = "You are a database query assistant. When given questions about database operations:
1. Explain the query in simple terms
2. Provide the actual SQL query if applicable
3. Give best practices related to the query
Be concise and technical in your responses.";

/// Anything that can answer a question given a system preamble.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn ask(&self, system_prompt: &str, question: &str) -> Result<String, ModelError>;
}

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(host: Url, port: u16, model: impl Into<String>) -> Self {
        OllamaClient {
            client: Ollama::new(host, port),
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ollama_host.clone(), config.ollama_port, &config.model)
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn ask(&self, system_prompt: &str, question: &str) -> Result<String, ModelError> {
        let request = ChatMessageRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(system_prompt.to_string()),
                ChatMessage::user(question.to_string()),
            ],
        );

        debug!(model = %self.model, "sending chat request");

        let response = self.client.send_chat_messages(request).await?;

        Ok(response.message.content)
    }
}

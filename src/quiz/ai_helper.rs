use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chatgpt::{
    client::ChatGPT,
    config::{ChatGPTEngine, ModelConfiguration},
    types::CompletionResponse,
};
use thiserror::Error;
use url::Url;

use crate::quiz::Subject;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key was provided for the generation service")]
    MissingCredential,
    #[error("generation service failed: {0}")]
    Service(String),
}

impl From<chatgpt::err::Error> for GenerationError {
    fn from(err: chatgpt::err::Error) -> Self {
        GenerationError::Service(err.to_string())
    }
}

/// API key for the generation service. Never printed.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Credential(String);

/// Shortest text accepted as a key typed into the chat.
pub const MIN_KEY_LENGTH: usize = 20;

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Accepts a single token of printable ASCII that is long enough to be a
    /// real key. Anything else is treated as chatter, not a secret.
    pub fn from_input(text: &str) -> Option<Self> {
        let text = text.trim();
        let plausible = text.len() >= MIN_KEY_LENGTH
            && text.chars().all(|c| c.is_ascii_graphic());
        plausible.then(|| Self::new(text))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    #[default]
    Gpt35Turbo,
    Gpt4,
}

impl Engine {
    fn chatgpt_engine(&self) -> ChatGPTEngine {
        match self {
            Engine::Gpt35Turbo => ChatGPTEngine::Gpt35Turbo,
            Engine::Gpt4 => ChatGPTEngine::Gpt4,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown engine \"{0}\", expected gpt-3.5-turbo or gpt-4")]
pub struct UnknownEngine(pub String);

impl FromStr for Engine {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpt-3.5-turbo" | "gpt35turbo" => Ok(Engine::Gpt35Turbo),
            "gpt-4" | "gpt4" => Ok(Engine::Gpt4),
            _ => Err(UnknownEngine(s.trim().to_string())),
        }
    }
}

pub fn build_quiz_prompt(subject: Subject, count: u8) -> String {
    format!(
        "Create a knowledge quiz about {subject} with {count} questions.

Format your response as a JSON object with the following structure:
{{
    \"title\": \"Quiz title here\",
    \"questions\": [
        {{
            \"question\": \"Question text here?\",
            \"options\": [\"Option 1\", \"Option 2\", \"Option 3\", \"Option 4\"],
            \"answer\": 0
        }}
    ]
}}
\"answer\" is the index (0-3) of the correct option.

Make sure:
1. Questions are challenging but fair
2. Each question has exactly 4 options
3. The answer index is correct (0-3)
4. The JSON is valid and properly formatted
5. Questions are interesting and educational"
    )
}

/// Anything that turns a prompt into raw completion text.
#[async_trait]
pub trait QuizGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub struct QuizHelper {
    credential: Credential,
    model: ModelConfiguration,
}

impl QuizHelper {
    /// Fails only when there is no key. Nothing is sent over the network.
    pub fn connect(
        credential: Option<&Credential>,
        engine: Engine,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let credential = credential.ok_or(GenerationError::MissingCredential)?;
        let model = ModelConfiguration {
            engine: engine.chatgpt_engine(),
            timeout,
            ..ModelConfiguration::default()
        };
        Ok(Self {
            credential: credential.clone(),
            model,
        })
    }

    /// Points the client at another chat-completions endpoint.
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.model.api_url = api_url;
        self
    }

    fn timeout(&self) -> Duration {
        self.model.timeout
    }

    // The HTTP client takes its timeout at construction, so the whole
    // configuration has to be handed over up front.
    fn client(&self) -> Result<ChatGPT, GenerationError> {
        Ok(ChatGPT::new_with_config(
            self.credential.secret(),
            self.model.clone(),
        )?)
    }
}

#[async_trait]
impl QuizGenerator for QuizHelper {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        log::debug!("Sending quiz prompt: {:?}", prompt);
        let chat_gpt = self.client()?;

        let response: CompletionResponse =
            tokio::time::timeout(self.timeout(), chat_gpt.send_message(prompt))
                .await
                .map_err(|_| {
                    GenerationError::Service(format!(
                        "no answer within {} seconds",
                        self.timeout().as_secs()
                    ))
                })??;
        let content = response.message().content.clone();

        log::debug!("Completion: {:?}", content);

        Ok(content)
    }
}

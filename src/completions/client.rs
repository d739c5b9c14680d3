//! Conversation-holding chat client.

use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::debug;

use super::answers::AnswerStream;
use super::request::{EmbeddingRequest, TurnSettings, build_chat_request, to_json};
use super::validate::validate_completion;
use crate::core::{
    Answer, ChatError, ChatRole, CompletionResult, Conversation, HttpClient, Message,
    MessageContent, ResponseMode, Tool, Transport, TransportResponse,
};
use crate::provider::OpenAiConfig;
use crate::provider::constants::{CHAT_COMPLETIONS_ENDPOINT, EMBEDDINGS_ENDPOINT};

/// Per-turn options for [`ChatSession::ask`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskOptions {
    /// `user` tag for this turn; the configured default is used when unset.
    pub user: Option<String>,
    pub stream: bool,
}

impl AskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streaming() -> Self {
        Self {
            user: None,
            stream: true,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// A single conversation with a chat-completions endpoint.
///
/// The session owns its history and transport. Each [`ask`](Self::ask) adds
/// the prompt to the history, sends the whole history, and adds the
/// assistant's text reply once the turn completes.
pub struct ChatSession<T = HttpClient> {
    config: OpenAiConfig,
    transport: T,
    conversation: Conversation,
    tools: Vec<Tool>,
}

impl ChatSession<HttpClient> {
    pub fn new(config: OpenAiConfig) -> Result<Self, ChatError> {
        let http = HttpClient::new(
            &config.base_url,
            config.http_config.clone(),
            config.user_agent.as_deref(),
        )?;
        Ok(Self::with_transport(config, http))
    }
}

impl<T: Transport> ChatSession<T> {
    pub fn with_transport(config: OpenAiConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            conversation: Conversation::new(),
            tools: Vec::new(),
        }
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub fn add_message(&mut self, content: impl Into<MessageContent>, role: ChatRole) {
        self.conversation.append(content, role);
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.conversation
            .append(MessageContent::Text(content.into()), ChatRole::User);
    }

    pub fn push_message(&mut self, message: Message) {
        self.conversation.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Forget the history; configuration and tools are kept.
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    pub fn set_embedding_model(&mut self, model: impl Into<String>) {
        self.config.embedding_model = model.into();
    }

    pub fn temperature(&self) -> f64 {
        self.config.temperature
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.config.temperature = temperature;
    }

    pub fn top_p(&self) -> f64 {
        self.config.top_p
    }

    pub fn set_top_p(&mut self, top_p: f64) {
        self.config.top_p = top_p;
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Replace the declared tools. An empty set sends no `tools` field.
    pub fn set_tools(&mut self, tools: Vec<Tool>) {
        self.tools = tools;
    }

    /// Run one turn.
    ///
    /// The prompt is recorded as a user message before the request is sent
    /// and stays in the history even if the turn fails. Text answers are
    /// appended as an assistant message; tool-call answers are returned but
    /// not recorded.
    #[tracing::instrument(
        name = "ask",
        skip(self, prompt, options),
        fields(
            model = %self.config.model,
            stream = options.stream,
            history = self.conversation.len()
        ),
        err
    )]
    pub async fn ask(
        &mut self,
        prompt: impl Into<String>,
        options: AskOptions,
    ) -> Result<AnswerStream<'_>, ChatError> {
        let prompt: String = prompt.into();
        self.conversation.append(prompt, ChatRole::User);

        let body = {
            let user = options
                .user
                .as_deref()
                .unwrap_or(&self.config.default_user);
            let settings = TurnSettings {
                model: &self.config.model,
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                user,
                stream: options.stream,
            };
            to_json(&build_chat_request(
                self.conversation.messages(),
                &self.tools,
                settings,
            ))?
        };

        let mode = if options.stream {
            ResponseMode::Streamed
        } else {
            ResponseMode::Buffered
        };
        let headers = [self.config.auth_header()];
        let response = self
            .transport
            .post(CHAT_COMPLETIONS_ENDPOINT, &body, &headers, mode)
            .await?;

        let model = self.config.model.clone();
        match (mode, response) {
            (ResponseMode::Streamed, TransportResponse::Lines(lines)) => Ok(
                AnswerStream::streaming(lines, &mut self.conversation, model),
            ),
            (ResponseMode::Streamed, TransportResponse::Buffered(text)) => {
                let lines: Vec<Result<String, ChatError>> =
                    text.lines().map(|line| Ok(line.to_string())).collect();
                Ok(AnswerStream::streaming(
                    futures::stream::iter(lines).boxed(),
                    &mut self.conversation,
                    model,
                ))
            }
            (ResponseMode::Buffered, response) => {
                let text = read_body(response).await?;
                let result = self.record_buffered_answer(&text, model)?;
                Ok(AnswerStream::ready(result))
            }
        }
    }

    /// Buffered turn returning its single answer.
    pub async fn complete(
        &mut self,
        prompt: impl Into<String>,
        user: Option<&str>,
    ) -> Result<CompletionResult, ChatError> {
        let options = AskOptions {
            user: user.map(str::to_owned),
            stream: false,
        };
        let mut answers = self.ask(prompt, options).await?;
        answers
            .next()
            .await
            .unwrap_or_else(|| Err(ChatError::IncompleteResponse("no answer".to_string())))
    }

    /// Embed `input` with the configured embedding model.
    ///
    /// The decoded body is returned as-is; the history is not touched.
    #[tracing::instrument(
        name = "create_embedding",
        skip(self, input),
        fields(model = %self.config.embedding_model),
        err
    )]
    pub async fn create_embedding(&self, input: &str) -> Result<Value, ChatError> {
        let body = to_json(&EmbeddingRequest {
            input,
            model: &self.config.embedding_model,
        })?;
        let headers = [self.config.auth_header()];

        let response = self
            .transport
            .post(EMBEDDINGS_ENDPOINT, &body, &headers, ResponseMode::Buffered)
            .await?;
        let text = read_body(response).await?;

        parse_json(&text)
    }

    fn record_buffered_answer(
        &mut self,
        body: &str,
        model: String,
    ) -> Result<CompletionResult, ChatError> {
        let valid = validate_completion(parse_json(body)?)?;

        match &valid.answer {
            Answer::Text(text) => self.conversation.append(text.as_str(), ChatRole::Assistant),
            Answer::FunctionCall(calls) => {
                debug!(count = calls.len(), "Model requested tool calls")
            }
        }

        Ok(CompletionResult {
            answer: valid.answer,
            id: valid.id,
            model,
            usage: Some(valid.usage),
        })
    }
}

impl<T> std::fmt::Debug for ChatSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("config", &self.config)
            .field("messages", &self.conversation.len())
            .field("tools", &self.tools.len())
            .finish()
    }
}

async fn read_body(response: TransportResponse) -> Result<String, ChatError> {
    match response {
        TransportResponse::Buffered(text) => Ok(text),
        TransportResponse::Lines(lines) => {
            let lines: Vec<String> = lines.try_collect().await?;
            Ok(lines.join("\n"))
        }
    }
}

fn parse_json(body: &str) -> Result<Value, ChatError> {
    serde_json::from_str(body).map_err(|e| ChatError::MalformedResponse {
        message: e.to_string(),
        source: e,
    })
}

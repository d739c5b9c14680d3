use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use gpt_chat::{
    Answer, AnswerKind, AskOptions, ChatError, ChatRole, ChatSession, LineStream, Message,
    OpenAiConfig, ResponseMode, Tool, Transport, TransportResponse,
};
use serde_json::{Value, json};

// --- Scripted transport ---

enum Reply {
    Body(String),
    Lines(Vec<Result<String, ChatError>>),
    Fail(ChatError),
}

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    body: Value,
    headers: Vec<(String, String)>,
    mode: ResponseMode,
}

#[derive(Clone, Default)]
struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl ScriptedTransport {
    fn reply(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn reply_json(&self, body: Value) -> &Self {
        self.reply(Reply::Body(body.to_string()))
    }

    fn reply_lines(&self, lines: &[&str]) -> &Self {
        self.reply(Reply::Lines(
            lines.iter().map(|line| Ok(line.to_string())).collect(),
        ))
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn last_request(&self) -> Recorded {
        self.requests().pop().expect("a request was sent")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(
        &self,
        path: &str,
        body: &Value,
        headers: &[(String, String)],
        mode: ResponseMode,
    ) -> Result<TransportResponse, ChatError> {
        self.requests.lock().unwrap().push(Recorded {
            path: path.to_string(),
            body: body.clone(),
            headers: headers.to_vec(),
            mode,
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left");
        match reply {
            Reply::Body(body) => Ok(TransportResponse::Buffered(body)),
            Reply::Lines(lines) => {
                let lines: LineStream = tokio_stream::iter(lines).boxed();
                Ok(TransportResponse::Lines(lines))
            }
            Reply::Fail(err) => Err(err),
        }
    }
}

// --- Helpers ---

fn session() -> (ChatSession<ScriptedTransport>, ScriptedTransport) {
    let transport = ScriptedTransport::default();
    let session = ChatSession::with_transport(OpenAiConfig::new("sk-test"), transport.clone());
    (session, transport)
}

fn text_completion(id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13 }
    })
}

fn tool_call_completion() -> Value {
    json!({
        "id": "chatcmpl-tool",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": { "name": "get_weather", "arguments": "{\"city\":\"Lisbon\"}" }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": { "prompt_tokens": 20, "completion_tokens": 8, "total_tokens": 28 }
    })
}

fn chunk(id: &str, content: &str) -> String {
    format!(
        "data: {}",
        json!({ "id": id, "object": "chat.completion.chunk", "choices": [{ "index": 0, "delta": { "content": content } }] })
    )
}

fn history(session: &ChatSession<ScriptedTransport>) -> Vec<(ChatRole, String)> {
    session
        .messages()
        .iter()
        .map(|m| (m.role, m.content.as_text().unwrap_or("<tool calls>").to_string()))
        .collect()
}

fn sent_messages(request: &Recorded) -> Vec<(String, String)> {
    request.body["messages"]
        .as_array()
        .expect("messages array")
        .iter()
        .map(|m| {
            (
                m["role"].as_str().unwrap().to_string(),
                m["content"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

// --- Conversation state ---

#[test]
fn add_message_keeps_insertion_order() {
    let (mut chat, _) = session();
    chat.add_message("You are a virtual assistant expert in Rust", ChatRole::System);
    chat.add_user_message("first");
    chat.add_message("reply", ChatRole::Assistant);
    chat.push_message(Message::tool_result("call_1", "{}"));

    assert_eq!(
        history(&chat),
        vec![
            (
                ChatRole::System,
                "You are a virtual assistant expert in Rust".to_string()
            ),
            (ChatRole::User, "first".to_string()),
            (ChatRole::Assistant, "reply".to_string()),
            (ChatRole::Tool, "{}".to_string()),
        ]
    );
}

#[test]
fn settings_round_trip_through_accessors() {
    let (mut chat, _) = session();
    assert_eq!(chat.model(), "gpt-3.5-turbo");
    assert_eq!(chat.temperature(), 1.0);
    assert!(chat.tools().is_empty());

    chat.set_model("gpt-4o-mini");
    chat.set_temperature(0.3);
    chat.set_top_p(0.5);
    chat.set_embedding_model("text-embedding-3-small");
    chat.set_tools(vec![Tool::new("noop", json!({ "type": "object" }))]);

    assert_eq!(chat.model(), "gpt-4o-mini");
    assert_eq!(chat.temperature(), 0.3);
    assert_eq!(chat.top_p(), 0.5);
    assert_eq!(chat.embedding_model(), "text-embedding-3-small");
    assert_eq!(chat.tools().len(), 1);
}

// --- Buffered turns ---

#[tokio::test]
async fn buffered_text_answer_is_recorded() {
    let (mut chat, transport) = session();
    transport.reply_json(text_completion("x", "hi"));

    let answers: Vec<_> = chat
        .ask("hello", AskOptions::new())
        .await
        .expect("turn")
        .collect()
        .await;

    assert_eq!(answers.len(), 1);
    let result = answers.into_iter().next().unwrap().expect("answer");
    assert_eq!(result.answer, Answer::Text("hi".into()));
    assert_eq!(result.kind(), AnswerKind::Text);
    assert_eq!(result.id, "x");
    assert_eq!(result.model, "gpt-3.5-turbo");
    let usage = result.usage.expect("buffered answers carry usage");
    assert_eq!(usage.total_tokens, 13);

    assert_eq!(
        history(&chat),
        vec![
            (ChatRole::User, "hello".to_string()),
            (ChatRole::Assistant, "hi".to_string()),
        ]
    );

    let request = transport.last_request();
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.mode, ResponseMode::Buffered);
    assert_eq!(request.body["stream"], false);
    assert_eq!(request.body["n"], 1);
    assert_eq!(request.body["user"], "gpt-chat");
    assert_eq!(request.body["model"], "gpt-3.5-turbo");
    assert_eq!(request.body["temperature"], 1.0);
    assert_eq!(request.body["top_p"], 1.0);
    assert!(request.body.get("tools").is_none());
    assert!(
        request
            .headers
            .contains(&("Authorization".to_string(), "Bearer sk-test".to_string()))
    );
}

#[tokio::test]
async fn loosely_shaped_answer_is_still_recorded() {
    let (mut chat, transport) = session();
    transport.reply_json(json!({
        "id": "x",
        "choices": [{ "message": { "content": "hi" } }],
        "usage": { "prompt_tokens": 3, "completion_tokens": null, "total_tokens": 3 }
    }));

    let result = chat.complete("hello", None).await.expect("answer");

    assert_eq!(result.answer, Answer::Text("hi".into()));
    assert_eq!(result.usage.expect("usage").completion_tokens, 0);
    assert_eq!(
        history(&chat),
        vec![
            (ChatRole::User, "hello".to_string()),
            (ChatRole::Assistant, "hi".to_string()),
        ]
    );
}

#[tokio::test]
async fn tool_call_answer_is_returned_but_not_recorded() {
    let (mut chat, transport) = session();
    chat.set_tools(vec![
        Tool::new(
            "get_weather",
            json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            }),
        )
        .with_description("Look up the weather for a city"),
    ]);
    transport.reply_json(tool_call_completion());

    let result = chat
        .complete("Weather in Lisbon?", None)
        .await
        .expect("answer");

    assert_eq!(result.kind(), AnswerKind::Function);
    match &result.answer {
        Answer::FunctionCall(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_abc");
            assert_eq!(calls[0].function.name, "get_weather");

            #[derive(serde::Deserialize)]
            struct Args {
                city: String,
            }
            assert_eq!(calls[0].arguments::<Args>().unwrap().city, "Lisbon");
        }
        other => panic!("Expected tool calls, got {other:?}"),
    }

    assert_eq!(
        history(&chat),
        vec![(ChatRole::User, "Weather in Lisbon?".to_string())]
    );

    let request = transport.last_request();
    assert_eq!(request.body["tools"][0]["type"], "function");
    assert_eq!(request.body["tools"][0]["function"]["name"], "get_weather");
}

#[tokio::test]
async fn malformed_body_fails_without_assistant_entry() {
    let (mut chat, transport) = session();
    chat.add_message("be brief", ChatRole::System);
    transport.reply(Reply::Body("<html>Bad Gateway</html>".to_string()));

    let err = chat
        .ask("hello", AskOptions::new())
        .await
        .expect_err("not JSON");

    assert!(matches!(err, ChatError::MalformedResponse { .. }));
    assert_eq!(
        history(&chat),
        vec![
            (ChatRole::System, "be brief".to_string()),
            (ChatRole::User, "hello".to_string()),
        ]
    );
}

#[tokio::test]
async fn missing_usage_is_incomplete() {
    let (mut chat, transport) = session();
    transport.reply_json(json!({
        "id": "x",
        "choices": [{ "message": { "content": "hi" } }]
    }));

    let err = chat
        .complete("hello", None)
        .await
        .expect_err("usage missing");

    match err {
        ChatError::IncompleteResponse(missing) => assert!(missing.contains("usage")),
        other => panic!("Expected IncompleteResponse, got {other:?}"),
    }
    assert_eq!(history(&chat), vec![(ChatRole::User, "hello".to_string())]);
}

#[tokio::test]
async fn transport_failure_keeps_user_message() {
    let (mut chat, transport) = session();
    transport.reply(Reply::Fail(ChatError::Transport {
        message: "{\"error\":{\"message\":\"Rate limit reached\"}}".to_string(),
        status_code: Some(429),
        body: Some("{\"error\":{\"message\":\"Rate limit reached\"}}".to_string()),
    }));

    let err = chat
        .ask("hello", AskOptions::new())
        .await
        .expect_err("transport failure");

    assert_eq!(
        err.upstream_body(),
        Some("{\"error\":{\"message\":\"Rate limit reached\"}}")
    );
    assert_eq!(history(&chat), vec![(ChatRole::User, "hello".to_string())]);
    assert_eq!(transport.requests().len(), 1, "no retry");
}

// --- Streamed turns ---

#[tokio::test]
async fn streamed_fragments_are_assembled_into_one_message() {
    let (mut chat, transport) = session();
    transport.reply_lines(&[
        &chunk("x", "Hel"),
        "",
        &chunk("x", "lo"),
        "",
        "data: [DONE]",
    ]);

    let mut answers = chat
        .ask("Say hello", AskOptions::streaming())
        .await
        .expect("turn");

    let mut fragments = Vec::new();
    while let Some(result) = answers.next().await {
        let result = result.expect("fragment");
        assert_eq!(result.kind(), AnswerKind::Text);
        assert_eq!(result.id, "x");
        assert!(result.usage.is_none());
        fragments.push(result.answer.as_text().unwrap().to_string());
    }
    drop(answers);

    assert_eq!(fragments, vec!["Hel", "lo"]);
    assert_eq!(
        history(&chat),
        vec![
            (ChatRole::User, "Say hello".to_string()),
            (ChatRole::Assistant, "Hello".to_string()),
        ]
    );

    let request = transport.last_request();
    assert_eq!(request.mode, ResponseMode::Streamed);
    assert_eq!(request.body["stream"], true);
}

#[tokio::test]
async fn noise_lines_are_skipped_silently() {
    let (mut chat, transport) = session();
    transport.reply_lines(&[
        ": keep-alive",
        "event: ping",
        r#"data: {"id":"x","choices":[{"delta":{"role":"assistant"}}]}"#,
        "data: {\"id\": \"x\", \"choi",
        "garbage without prefix",
        &chunk("x", "ok"),
        r#"data: {"id":"x","choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        "data: [DONE]",
    ]);

    let results: Vec<_> = chat
        .ask("ping", AskOptions::streaming())
        .await
        .expect("turn")
        .collect()
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].as_ref().unwrap().answer,
        Answer::Text("ok".into())
    );
    assert_eq!(chat.messages().last().unwrap().content.as_text(), Some("ok"));
}

#[tokio::test]
async fn stream_error_ends_turn_without_assistant_entry() {
    let (mut chat, transport) = session();
    transport.reply(Reply::Lines(vec![
        Ok(chunk("x", "partial")),
        Err(ChatError::Transport {
            message: "Failed to read response body: connection reset".to_string(),
            status_code: None,
            body: None,
        }),
    ]));

    let results: Vec<_> = chat
        .ask("hello", AskOptions::streaming())
        .await
        .expect("turn")
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ChatError::Transport { .. })));
    assert_eq!(history(&chat), vec![(ChatRole::User, "hello".to_string())]);
}

#[tokio::test]
async fn dropping_stream_early_records_no_answer() {
    let (mut chat, transport) = session();
    transport.reply_lines(&[&chunk("x", "one"), &chunk("x", "two"), "data: [DONE]"]);

    {
        let mut answers = chat
            .ask("count", AskOptions::streaming())
            .await
            .expect("turn");
        let first = answers.next().await.unwrap().unwrap();
        assert_eq!(first.answer, Answer::Text("one".into()));
    }

    assert_eq!(history(&chat), vec![(ChatRole::User, "count".to_string())]);
}

#[tokio::test]
async fn empty_stream_records_empty_answer() {
    let (mut chat, transport) = session();
    transport.reply_lines(&["data: [DONE]"]);

    let text = chat
        .ask("anything?", AskOptions::streaming())
        .await
        .expect("turn")
        .text()
        .await
        .expect("text");

    assert_eq!(text, "");
    assert_eq!(
        history(&chat),
        vec![
            (ChatRole::User, "anything?".to_string()),
            (ChatRole::Assistant, String::new()),
        ]
    );
}

#[tokio::test]
async fn streamed_turn_over_buffered_body_is_split_into_lines() {
    let (mut chat, transport) = session();
    let body = format!("{}\n\n{}\n\ndata: [DONE]\n", chunk("x", "a"), chunk("x", "b"));
    transport.reply(Reply::Body(body));

    let text = chat
        .ask("ab", AskOptions::streaming())
        .await
        .expect("turn")
        .text()
        .await
        .expect("text");

    assert_eq!(text, "ab");
    assert_eq!(chat.messages().last().unwrap().content.as_text(), Some("ab"));
}

// --- Conversation replay ---

#[tokio::test]
async fn history_is_replayed_and_clear_resets_it() {
    let (mut chat, transport) = session();
    transport
        .reply_json(text_completion("1", "first answer"))
        .reply_json(text_completion("2", "second answer"))
        .reply_json(text_completion("3", "fresh answer"));

    chat.complete("first", None).await.expect("turn 1");
    chat.complete("second", Some("alice")).await.expect("turn 2");

    let second = transport.last_request();
    assert_eq!(second.body["user"], "alice");
    assert_eq!(
        sent_messages(&second),
        vec![
            ("user".to_string(), "first".to_string()),
            ("assistant".to_string(), "first answer".to_string()),
            ("user".to_string(), "second".to_string()),
        ]
    );

    chat.clear();
    assert!(chat.messages().is_empty());

    chat.complete("fresh start", None).await.expect("turn 3");
    assert_eq!(
        sent_messages(&transport.last_request()),
        vec![("user".to_string(), "fresh start".to_string())]
    );
}

#[tokio::test]
async fn updated_settings_apply_to_next_turn() {
    let (mut chat, transport) = session();
    transport.reply_json(text_completion("x", "ok"));

    chat.set_model("gpt-4o-mini");
    chat.set_temperature(0.7);
    chat.set_top_p(0.9);
    let result = chat
        .ask("hi", AskOptions::new().with_user("bob"))
        .await
        .expect("turn")
        .next()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.model, "gpt-4o-mini");
    let request = transport.last_request();
    assert_eq!(request.body["model"], "gpt-4o-mini");
    assert_eq!(request.body["temperature"], 0.7);
    assert_eq!(request.body["top_p"], 0.9);
    assert_eq!(request.body["user"], "bob");
}

// --- Embeddings ---

#[tokio::test]
async fn embedding_returns_body_verbatim() {
    let (mut chat, transport) = session();
    chat.add_user_message("untouched");
    let embedding = json!({
        "object": "list",
        "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, -0.2, 0.3] }],
        "model": "text-embedding-ada-002",
        "usage": { "prompt_tokens": 2, "total_tokens": 2 }
    });
    transport.reply_json(embedding.clone());

    let result = chat.create_embedding("hello world").await.expect("embedding");

    assert_eq!(result, embedding);
    let request = transport.last_request();
    assert_eq!(request.path, "/v1/embeddings");
    assert_eq!(
        request.body,
        json!({ "input": "hello world", "model": "text-embedding-ada-002" })
    );
    assert_eq!(history(&chat), vec![(ChatRole::User, "untouched".to_string())]);
}

#[tokio::test]
async fn embedding_rejects_non_json() {
    let (chat, transport) = session();
    transport.reply(Reply::Body("not json".to_string()));

    let err = chat.create_embedding("x").await.expect_err("not json");
    assert!(matches!(err, ChatError::MalformedResponse { .. }));
}

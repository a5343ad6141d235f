//! End-to-end bridge tests against scripted fake codex executables.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use codex_cli_client::{
    ChatMessage, ClientConfig, ClientError, CodexCliClient, CompletionRequest,
};
use codex_process_runner::RunnerError;
use codex_session_cache::SessionContinuityCache;
use codex_thread_store::SqliteThreadStore;

fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-codex");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Script that reports a thread and echoes its own argument vector back as
/// the assistant message (newlines flattened to `|` to stay valid JSON).
const ECHO_ARGS: &str = r#"ARGS=$(printf '%s' "$*" | tr '\n' '|')
printf '{"type":"thread.started","thread_id":"t1"}\n'
printf '{"type":"item.completed","item":{"type":"agent_message","text":"%s"}}\n' "$ARGS"
printf '{"type":"turn.completed","usage":{"input_tokens":7,"output_tokens":2}}\n'"#;

/// Script emitting three cumulative agent messages.
const CUMULATIVE: &str = r#"printf '{"type":"thread.started","thread_id":"t1"}\n'
printf '{"type":"item.completed","item":{"type":"agent_message","text":"Hi"}}\n'
printf '{"type":"item.completed","item":{"type":"agent_message","text":"Hi there"}}\n'
printf '{"type":"item.completed","item":{"type":"agent_message","text":"Hi there!"}}\n'"#;

fn wired_client(dir: &Path, script: &str) -> (CodexCliClient, Arc<SessionContinuityCache>) {
    let bin = write_script(dir, script);
    let store = Arc::new(SqliteThreadStore::in_memory().unwrap());
    let cache = Arc::new(SessionContinuityCache::new(store));

    let config = ClientConfig::new("user-1", dir.to_string_lossy().to_string())
        .with_conversation("conv-1")
        .with_bin(bin.to_string_lossy().to_string());
    (CodexCliClient::new(config, cache.clone()), cache)
}

fn user_request(content: &str) -> CompletionRequest {
    CompletionRequest {
        model: None,
        messages: vec![ChatMessage::user(content)],
        stream: false,
    }
}

#[tokio::test]
async fn single_shot_completion_has_expected_shape() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _cache) = wired_client(dir.path(), ECHO_ARGS);

    let completion = client
        .create(user_request("hello"))
        .await
        .unwrap()
        .into_completion();

    assert_eq!(completion.object, "chat.completion");
    assert_eq!(completion.model, "gpt-5-codex");
    assert_eq!(completion.choices.len(), 1);
    assert_eq!(completion.choices[0].message.role, "assistant");
    assert_eq!(completion.choices[0].finish_reason, "stop");
    assert!(completion.id.starts_with("codex-cli-"));
    let usage = completion.usage.as_ref().unwrap();
    assert_eq!(usage.input_tokens, Some(7));
}

#[tokio::test]
async fn fresh_conversation_sends_full_transcript_with_preamble() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _cache) = wired_client(dir.path(), ECHO_ARGS);

    let completion = client
        .create(user_request("first question"))
        .await
        .unwrap()
        .into_completion();

    let echoed = completion.content();
    assert!(echoed.contains("You are Codex running via the Codex CLI."));
    assert!(echoed.contains("Conversation:"));
    assert!(echoed.contains("USER:|first question"));
    assert!(!echoed.contains("resume"), "fresh thread must not resume");
}

#[tokio::test]
async fn second_request_resumes_the_reported_thread() {
    let dir = tempfile::tempdir().unwrap();
    let (client, cache) = wired_client(dir.path(), ECHO_ARGS);

    client.create(user_request("first")).await.unwrap();
    assert_eq!(
        cache.get(client.session_key()).await.as_deref(),
        Some("t1"),
        "thread handle written back after the first invocation"
    );

    let completion = client
        .create(user_request("second"))
        .await
        .unwrap()
        .into_completion();
    assert!(
        completion.content().contains("resume t1"),
        "expected resume args, got: {}",
        completion.content()
    );
}

#[tokio::test]
async fn resumed_request_sends_only_trailing_history_window() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _cache) = wired_client(dir.path(), ECHO_ARGS);

    let history: Vec<ChatMessage> = (1..=10)
        .map(|i| ChatMessage::user(format!("msg-{i}")))
        .collect();
    let request = CompletionRequest {
        model: None,
        messages: history,
        stream: false,
    };

    // First call establishes the thread and sends everything.
    let first = client.create(request.clone()).await.unwrap().into_completion();
    assert!(first.content().contains("|msg-1|"));

    // Resumed call re-sends only the default trailing window of 6.
    let second = client.create(request).await.unwrap().into_completion();
    assert!(second.content().contains("|msg-5|"));
    assert!(second.content().contains("msg-10"));
    assert!(!second.content().contains("|msg-4|"));
    assert!(!second.content().contains("Conversation:"));
}

#[tokio::test]
async fn streaming_deltas_concatenate_to_single_shot_text() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _cache) = wired_client(dir.path(), CUMULATIVE);

    let single = client
        .create(user_request("hi"))
        .await
        .unwrap()
        .into_completion();

    let mut request = user_request("hi");
    request.stream = true;
    let mut stream = client.create(request).await.unwrap().into_stream();
    let streamed = stream.collect_text().await.unwrap();

    assert_eq!(streamed, "Hi there!");
    assert_eq!(streamed, single.content());
}

#[tokio::test]
async fn stream_yields_ordered_chunks_then_ends() {
    let dir = tempfile::tempdir().unwrap();
    let (client, cache) = wired_client(dir.path(), CUMULATIVE);

    let mut request = user_request("hi");
    request.stream = true;
    let mut stream = client.create(request).await.unwrap().into_stream();

    let mut deltas = Vec::new();
    while let Some(chunk) = stream.next().await {
        deltas.push(chunk.unwrap().delta().to_string());
    }
    assert_eq!(deltas, vec!["Hi", " there", "!"]);

    // Finite and non-restartable.
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());

    // The streaming path also wrote continuity back.
    assert_eq!(cache.get(client.session_key()).await.as_deref(), Some("t1"));
}

#[tokio::test]
async fn stream_reraises_protocol_errors() {
    let dir = tempfile::tempdir().unwrap();
    let script = r#"printf '{"type":"item.completed","item":{"type":"agent_message","text":"partial"}}\n'
printf '{"type":"error","message":"rate limited"}\n'
exit 0"#;
    let (client, _cache) = wired_client(dir.path(), script);

    let mut request = user_request("hi");
    request.stream = true;
    let mut stream = client.create(request).await.unwrap().into_stream();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.delta(), "partial");

    let err = stream.next().await.unwrap().unwrap_err();
    match err {
        ClientError::Runner(RunnerError::Protocol(message)) => {
            assert_eq!(message, "rate limited");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn failed_invocation_rejects_single_shot_call() {
    let dir = tempfile::tempdir().unwrap();
    let (client, cache) = wired_client(
        dir.path(),
        r#"echo 'no credits' >&2
exit 1"#,
    );

    let err = client.create(user_request("hi")).await.unwrap_err();
    match err {
        ClientError::Runner(RunnerError::AbnormalExit { detail, .. }) => {
            assert_eq!(detail, "no credits");
        }
        other => panic!("expected abnormal exit, got {other:?}"),
    }

    // Nothing was written back; the next request starts fresh.
    assert!(cache.get(client.session_key()).await.is_none());
}

#[tokio::test]
async fn explicit_model_overrides_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _cache) = wired_client(dir.path(), ECHO_ARGS);

    let mut request = user_request("hi");
    request.model = Some("o4-mini".to_string());
    let completion = client.create(request).await.unwrap().into_completion();

    assert_eq!(completion.model, "o4-mini");
    assert!(completion.content().contains("-m o4-mini"));
}

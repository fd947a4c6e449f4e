/// Integration test: drive the full dispatcher loop against an in-memory
/// backend and a hand-fed gateway event stream.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use nexcord_api::{ApiError, ChatBackend, StatusCode};
use nexcord_client::{Dispatcher, Input, Notice, ViewUpdate};
use nexcord_sync::SyncConfig;
use nexcord_types::api::UploadResponse;
use nexcord_types::{Channel, GatewayCommand, GatewayEvent, Message};

const GENERAL: Uuid = Uuid::from_u128(0x1);
const RANDOM: Uuid = Uuid::from_u128(0x2);
const ALICE: Uuid = Uuid::from_u128(0xA11CE);

fn channel(id: Uuid, name: &str) -> Channel {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "type": "public",
        "created_at": "2024-05-01T09:00:00",
    }))
    .unwrap()
}

fn message(channel_id: Uuid, n: u128, minute: u32, content: &str) -> Message {
    serde_json::from_value(json!({
        "id": Uuid::from_u128(n),
        "channel_id": channel_id,
        "user_id": ALICE,
        "content": content,
        "created_at": format!("2024-05-01T10:{:02}:00", minute),
    }))
    .unwrap()
}

/// Stores history oldest-first and serves it newest-first.
struct MemoryBackend {
    history: Mutex<HashMap<Uuid, Vec<Message>>>,
    next_id: Mutex<u128>,
}

impl MemoryBackend {
    fn new() -> Self {
        let mut history = HashMap::new();
        history.insert(
            GENERAL,
            vec![message(GENERAL, 1, 0, "one"), message(GENERAL, 2, 1, "two")],
        );
        history.insert(RANDOM, vec![message(RANDOM, 3, 2, "elsewhere")]);
        Self {
            history: Mutex::new(history),
            next_id: Mutex::new(100),
        }
    }
}

#[async_trait]
impl ChatBackend for MemoryBackend {
    async fn list_channels(&self) -> Result<Vec<Channel>, ApiError> {
        Ok(vec![channel(GENERAL, "general"), channel(RANDOM, "random")])
    }

    async fn fetch_history(&self, channel_id: Uuid) -> Result<Vec<Message>, ApiError> {
        let mut msgs = self
            .history
            .lock()
            .unwrap()
            .get(&channel_id)
            .cloned()
            .unwrap_or_default();
        msgs.reverse();
        Ok(msgs)
    }

    async fn send_message(&self, channel_id: Uuid, content: &str) -> Result<Message, ApiError> {
        if content.contains("forbidden") {
            return Err(ApiError::Status {
                status: StatusCode::BAD_REQUEST,
                detail: "Message flagged by AI moderation".into(),
            });
        }
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let created = message(channel_id, id, 30, content);
        self.history
            .lock()
            .unwrap()
            .entry(channel_id)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn add_reaction(&self, message_id: Uuid, emoji: &str) -> Result<(), ApiError> {
        let mut history = self.history.lock().unwrap();
        let target = history
            .values_mut()
            .flatten()
            .find(|m| m.id == message_id)
            .ok_or_else(|| ApiError::Status {
                status: StatusCode::NOT_FOUND,
                detail: "Message not found".into(),
            })?;
        target.reactions.entry(emoji.to_string()).or_default().insert(ALICE);
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        Err(ApiError::Io {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

struct Harness {
    inputs: mpsc::UnboundedSender<Input>,
    events: Option<mpsc::UnboundedSender<GatewayEvent>>,
    commands: mpsc::UnboundedReceiver<GatewayCommand>,
    view: mpsc::UnboundedReceiver<ViewUpdate>,
    task: tokio::task::JoinHandle<()>,
}

fn start(config: SyncConfig) -> Harness {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = mpsc::unbounded_channel();

    let dispatcher = Dispatcher::new(Arc::new(MemoryBackend::new()), config, Some(cmd_tx), view_tx);
    let task = tokio::spawn(dispatcher.run(input_rx, Some(event_rx)));

    Harness {
        inputs: input_tx,
        events: Some(event_tx),
        commands: cmd_rx,
        view: view_rx,
        task,
    }
}

impl Harness {
    /// Wait for the first update matching `pred`.
    async fn until<F>(&mut self, mut pred: F) -> ViewUpdate
    where
        F: FnMut(&ViewUpdate) -> bool,
    {
        let wait = async {
            loop {
                let update = self.view.recv().await.expect("view closed");
                if pred(&update) {
                    return update;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for view update")
    }

    async fn transcript_matching(&mut self, want: &[&str]) -> Vec<Message> {
        let update = self
            .until(|u| matches!(u, ViewUpdate::Transcript(m) if contents(m) == want))
            .await;
        match update {
            ViewUpdate::Transcript(messages) => messages,
            _ => unreachable!(),
        }
    }

    fn push(&self, event: GatewayEvent) {
        self.events.as_ref().unwrap().send(event).unwrap();
    }
}

fn contents(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.content.as_str()).collect()
}

#[tokio::test]
async fn startup_selects_first_channel_and_merges_pushes() {
    let mut h = start(SyncConfig::default());

    let update = h.until(|u| matches!(u, ViewUpdate::Channels(_))).await;
    let ViewUpdate::Channels(channels) = update else { unreachable!() };
    assert_eq!(channels.len(), 2);

    h.until(|u| *u == ViewUpdate::Selected(GENERAL)).await;
    h.transcript_matching(&["one", "two"]).await;

    // Foreign channel first, then an in-channel message twice.
    h.push(GatewayEvent::Message(message(RANDOM, 50, 5, "not here")));
    h.push(GatewayEvent::Message(message(GENERAL, 51, 5, "pushed")));
    h.push(GatewayEvent::Message(message(GENERAL, 51, 5, "pushed")));
    h.transcript_matching(&["one", "two", "pushed"]).await;

    // An older push lands in timestamp order.
    h.push(GatewayEvent::Message(message(GENERAL, 52, 0, "late")));
    let messages = h.transcript_matching(&["one", "late", "two", "pushed"]).await;
    assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    h.inputs.send(Input::Quit).unwrap();
    h.task.await.unwrap();
}

#[tokio::test]
async fn own_message_appears_once_and_is_announced() {
    let mut h = start(SyncConfig::default());
    h.transcript_matching(&["one", "two"]).await;

    h.inputs.send(Input::Submit("hello".into())).unwrap();
    let shown = h.transcript_matching(&["one", "two", "hello"]).await;
    let own_id = shown[2].id;

    // The server echoes the new message on the live session as well.
    h.push(GatewayEvent::Message(shown[2].clone()));

    let cmd = tokio::time::timeout(Duration::from_secs(5), h.commands.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        cmd,
        GatewayCommand::Message {
            channel_id: GENERAL,
            content: "hello".into()
        }
    );

    // React, which triggers a refetch carrying the new reaction.
    h.inputs
        .send(Input::React {
            message_id: own_id,
            emoji: "👍".into(),
        })
        .unwrap();
    let update = h
        .until(|u| matches!(u, ViewUpdate::Transcript(m) if m.iter().any(|m| !m.reactions.is_empty())))
        .await;
    let ViewUpdate::Transcript(messages) = update else { unreachable!() };
    assert_eq!(contents(&messages), vec!["one", "two", "hello"]);
    assert_eq!(messages.iter().filter(|m| m.id == own_id).count(), 1);

    h.inputs.send(Input::Quit).unwrap();
    h.task.await.unwrap();
}

#[tokio::test]
async fn switching_channels_scopes_transcript() {
    let mut h = start(SyncConfig {
        reconcile_after_send: false,
    });
    h.transcript_matching(&["one", "two"]).await;

    h.inputs.send(Input::Select(RANDOM)).unwrap();
    h.until(|u| *u == ViewUpdate::Selected(RANDOM)).await;
    h.transcript_matching(&["elsewhere"]).await;

    h.push(GatewayEvent::Message(message(GENERAL, 60, 9, "old channel")));
    h.inputs.send(Input::Submit("in random".into())).unwrap();
    h.transcript_matching(&["elsewhere", "in random"]).await;

    h.inputs.send(Input::Quit).unwrap();
    h.task.await.unwrap();
}

#[tokio::test]
async fn failures_surface_as_notices() {
    let mut h = start(SyncConfig::default());
    h.transcript_matching(&["one", "two"]).await;

    h.inputs.send(Input::Submit("something forbidden".into())).unwrap();
    let update = h.until(|u| matches!(u, ViewUpdate::Notice(_))).await;
    let ViewUpdate::Notice(Notice::Error(text)) = update else {
        panic!("expected an error notice, got {:?}", update);
    };
    assert!(text.starts_with("Failed to send message"));

    h.inputs.send(Input::Upload("/nope/missing.bin".into())).unwrap();
    let update = h.until(|u| matches!(u, ViewUpdate::Notice(_))).await;
    assert!(matches!(update, ViewUpdate::Notice(Notice::Error(ref t)) if t.starts_with("Failed to upload file")));

    h.push(GatewayEvent::Error {
        message: "Rate limited".into(),
    });
    let update = h.until(|u| matches!(u, ViewUpdate::Notice(_))).await;
    assert_eq!(update, ViewUpdate::Notice(Notice::Error("Rate limited".into())));

    // Losing the live session is reported once; the loop keeps running.
    h.events.take();
    let update = h.until(|u| matches!(u, ViewUpdate::Notice(_))).await;
    assert_eq!(
        update,
        ViewUpdate::Notice(Notice::Error("Live updates disconnected".into()))
    );

    h.inputs.send(Input::Submit("still here".into())).unwrap();
    h.transcript_matching(&["one", "two", "still here"]).await;

    drop(h.inputs);
    h.task.await.unwrap();
}

#[tokio::test]
async fn runs_without_live_session() {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (view_tx, mut view_rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(
        Arc::new(MemoryBackend::new()),
        SyncConfig::default(),
        None,
        view_tx,
    );
    let task = tokio::spawn(dispatcher.run(input_rx, None));

    let mut sent = false;
    let mut seen = Vec::new();
    loop {
        let update = tokio::time::timeout(Duration::from_secs(5), view_rx.recv())
            .await
            .expect("timed out waiting for view update")
            .expect("view closed");
        if let ViewUpdate::Transcript(m) = &update {
            if !sent && contents(m) == ["one", "two"] {
                input_tx.send(Input::Submit("offline".into())).unwrap();
                sent = true;
            } else if contents(m) == ["one", "two", "offline"] {
                break;
            }
        }
        seen.push(update);
    }

    // No live session was ever open, so there is nothing to report as lost.
    assert!(
        !seen.iter().any(|u| matches!(u, ViewUpdate::Notice(_))),
        "unexpected notice in {:?}",
        seen
    );

    drop(input_tx);
    task.await.unwrap();
}

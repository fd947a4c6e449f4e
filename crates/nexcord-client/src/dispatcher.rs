use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nexcord_api::{ApiError, ChatBackend};
use nexcord_sync::{FetchTicket, SendOutcome, SubmitTicket, SyncConfig, SyncError, Synchronizer};
use nexcord_types::api::UploadResponse;
use nexcord_types::{Channel, GatewayCommand, GatewayEvent, Message};

/// User intents delivered to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    ListChannels,
    Select(Uuid),
    Submit(String),
    Upload(PathBuf),
    React { message_id: Uuid, emoji: String },
    Typing,
    Refresh,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// What the view has to re-render.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    Channels(Vec<Channel>),
    Selected(Uuid),
    Transcript(Vec<Message>),
    Notice(Notice),
}

/// Request completions, funneled back onto the loop.
#[derive(Debug)]
enum Completion {
    Channels(Result<Vec<Channel>, ApiError>),
    History(FetchTicket, Result<Vec<Message>, ApiError>),
    Sent(SubmitTicket, Result<Message, ApiError>),
    Uploaded(Uuid, Result<UploadResponse, ApiError>),
    Reacted(Result<(), ApiError>),
}

/// Single event loop owning the synchronizer. Console input, request
/// completions and gateway events are serialized here, so transcript
/// mutations never interleave.
pub struct Dispatcher {
    backend: Arc<dyn ChatBackend>,
    sync: Synchronizer,
    channels: Vec<Channel>,
    gateway: Option<mpsc::UnboundedSender<GatewayCommand>>,
    view: mpsc::UnboundedSender<ViewUpdate>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        config: SyncConfig,
        gateway: Option<mpsc::UnboundedSender<GatewayCommand>>,
        view: mpsc::UnboundedSender<ViewUpdate>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            sync: Synchronizer::new(config),
            channels: Vec::new(),
            gateway,
            view,
            completion_tx,
            completion_rx,
        }
    }

    /// Run until `Input::Quit` or until the input channel closes. The
    /// channel list is loaded first and its first entry selected. `events`
    /// is `None` when no live session could be opened.
    pub async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<Input>,
        mut events: Option<mpsc::UnboundedReceiver<GatewayEvent>>,
    ) {
        self.handle_input(Input::ListChannels);
        let mut live = events.is_some();

        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    None | Some(Input::Quit) => break,
                    Some(input) => self.handle_input(input),
                },
                Some(done) = self.completion_rx.recv() => self.handle_completion(done),
                event = next_event(&mut events), if live => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        live = false;
                        warn!("Live event session ended");
                        self.notify(Notice::Error("Live updates disconnected".into()));
                    }
                },
            }
        }

        info!("Dispatcher stopped");
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::ListChannels => {
                let backend = self.backend.clone();
                self.spawn(async move { Completion::Channels(backend.list_channels().await) });
            }
            Input::Select(channel_id) => {
                let ticket = self.sync.select_channel(channel_id);
                self.emit(ViewUpdate::Selected(channel_id));
                self.render();
                self.fetch(ticket);
            }
            Input::Submit(content) => match self.sync.begin_submit(&content) {
                Ok(ticket) => self.send(ticket),
                Err(e) => self.notify(Notice::Error(e.to_string())),
            },
            Input::Upload(path) => {
                // The link is posted to the channel the upload started in.
                let Some(channel_id) = self.sync.active_channel() else {
                    self.notify(Notice::Error(SyncError::NoActiveChannel.to_string()));
                    return;
                };
                let backend = self.backend.clone();
                self.spawn(async move {
                    Completion::Uploaded(channel_id, backend.upload_file(&path).await)
                });
            }
            Input::React { message_id, emoji } => {
                let backend = self.backend.clone();
                self.spawn(async move {
                    Completion::Reacted(backend.add_reaction(message_id, &emoji).await)
                });
            }
            Input::Typing => {
                if let Some(channel_id) = self.sync.active_channel() {
                    self.announce(GatewayCommand::Typing { channel_id });
                }
            }
            Input::Refresh => {
                if let Some(ticket) = self.sync.reconcile() {
                    self.fetch(ticket);
                }
            }
            Input::Quit => {}
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Channels(Ok(channels)) => {
                info!("Loaded {} channels", channels.len());
                let first = channels.first().map(|c| c.id);
                self.channels = channels;
                self.emit(ViewUpdate::Channels(self.channels.clone()));
                if self.sync.active_channel().is_none() {
                    if let Some(channel_id) = first {
                        self.handle_input(Input::Select(channel_id));
                    }
                }
            }
            Completion::Channels(Err(e)) => {
                warn!("Failed to load channels: {}", e);
                self.channels.clear();
                self.emit(ViewUpdate::Channels(Vec::new()));
            }
            Completion::History(ticket, result) => {
                if self.sync.apply_history(ticket, result) {
                    self.render();
                }
            }
            Completion::Sent(ticket, result) => match self.sync.apply_sent(&ticket, result) {
                SendOutcome::Delivered { changed, reconcile } => {
                    if changed {
                        self.render();
                    }
                    if let Some(refetch) = reconcile {
                        self.fetch(refetch);
                    }
                    self.announce(GatewayCommand::Message {
                        channel_id: ticket.channel_id,
                        content: ticket.content,
                    });
                }
                SendOutcome::Failed { notice } => self.notify(Notice::Error(notice)),
            },
            Completion::Uploaded(channel_id, Ok(uploaded)) => {
                self.notify(Notice::Info(format!("File uploaded: {}", uploaded.filename)));
                self.send(SubmitTicket {
                    channel_id,
                    content: uploaded.as_message_content(),
                });
            }
            Completion::Uploaded(_, Err(e)) => {
                warn!("Upload failed: {}", e);
                self.notify(Notice::Error(format!("Failed to upload file: {}", e)));
            }
            Completion::Reacted(Ok(())) => {
                if let Some(ticket) = self.sync.reconcile() {
                    self.fetch(ticket);
                }
            }
            Completion::Reacted(Err(e)) => {
                self.notify(Notice::Error(format!("Failed to add reaction: {}", e)));
            }
        }
    }

    fn handle_event(&mut self, event: GatewayEvent) {
        match &event {
            GatewayEvent::Error { message } => {
                self.notify(Notice::Error(message.clone()));
            }
            GatewayEvent::ModerationWarning { message, .. } => {
                self.notify(Notice::Error(message.clone()));
            }
            _ => {
                if self.sync.on_push_event(&event) {
                    self.render();
                } else {
                    debug!("Ignored gateway event {:?}", event);
                }
            }
        }
    }

    fn send(&self, ticket: SubmitTicket) {
        let backend = self.backend.clone();
        self.spawn(async move {
            let result = backend.send_message(ticket.channel_id, &ticket.content).await;
            Completion::Sent(ticket, result)
        });
    }

    fn fetch(&self, ticket: FetchTicket) {
        let backend = self.backend.clone();
        self.spawn(async move {
            let result = backend.fetch_history(ticket.channel_id).await;
            Completion::History(ticket, result)
        });
    }

    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    fn announce(&self, cmd: GatewayCommand) {
        if let Some(gateway) = &self.gateway {
            if gateway.send(cmd).is_err() {
                debug!("Gateway closed, dropping outbound command");
            }
        }
    }

    fn render(&self) {
        self.emit(ViewUpdate::Transcript(self.sync.messages().to_vec()));
    }

    fn notify(&self, notice: Notice) {
        self.emit(ViewUpdate::Notice(notice));
    }

    fn emit(&self, update: ViewUpdate) {
        let _ = self.view.send(update);
    }
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<GatewayEvent>>,
) -> Option<GatewayEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

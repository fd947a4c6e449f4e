use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use nexcord_api::Session;
use nexcord_types::{GatewayCommand, GatewayEvent};

/// Heartbeat interval: the client sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("gateway session closed")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base WebSocket URL, e.g. `ws://localhost:8000`.
    pub ws_url: String,
    pub heartbeat_interval: Duration,
}

impl GatewayConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }

    fn endpoint(&self, session: &Session) -> String {
        format!(
            "{}/ws/{}?token={}",
            self.ws_url.trim_end_matches('/'),
            session.user_id,
            session.token()
        )
    }
}

/// Handle to the single live session of a viewer. Channel filtering happens
/// in the consumer; the connection carries every event the server pushes.
pub struct Gateway {
    commands: mpsc::UnboundedSender<GatewayCommand>,
    task: Option<JoinHandle<()>>,
}

impl Gateway {
    /// Queue an outbound command.
    pub fn send(&self, cmd: GatewayCommand) -> Result<(), GatewayError> {
        self.commands.send(cmd).map_err(|_| GatewayError::Closed)
    }

    /// Sender for outbound commands, for components that only announce.
    pub fn commands(&self) -> mpsc::UnboundedSender<GatewayCommand> {
        self.commands.clone()
    }

    /// Close the connection and wait for the socket task to finish.
    pub async fn shutdown(mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        // Replacing the sender closes the command channel, which makes the
        // socket task send a Close frame and exit.
        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.commands, closed));

        let abort = task.abort_handle();
        if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
            warn!("Gateway did not close in time, aborting");
            abort.abort();
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Open the live session for `session`. Inbound events are delivered on the
/// returned receiver, which yields `None` once the connection ends.
pub async fn connect(
    config: &GatewayConfig,
    session: &Session,
) -> Result<(Gateway, mpsc::UnboundedReceiver<GatewayEvent>), GatewayError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(config.endpoint(session)).await?;
    info!(
        "{} ({}) connected to gateway",
        session.display_name(),
        session.user_id
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let heartbeat_interval = config.heartbeat_interval;
    let task = tokio::spawn(async move {
        run_connection_loop(ws_stream, cmd_rx, event_tx, heartbeat_interval).await;
    });

    Ok((
        Gateway {
            commands: cmd_tx,
            task: Some(task),
        },
        event_rx,
    ))
}

async fn run_connection_loop<S>(
    ws_stream: S,
    mut cmd_rx: mpsc::UnboundedReceiver<GatewayCommand>,
    event_tx: mpsc::UnboundedSender<GatewayEvent>,
    heartbeat_interval: Duration,
) where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sender, mut receiver) = ws_stream.split();

    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("Gateway read error: {}", e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => match serde_json::from_str::<GatewayEvent>(&text) {
                        Ok(event) => {
                            trace!("Gateway event: {:?}", event);
                            if event_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let raw: String = text.chars().take(200).collect();
                            warn!("Bad gateway event: {} -- raw: {}", e, raw);
                        }
                    },
                    Message::Pong(_) => pong_received = true,
                    Message::Close(frame) => {
                        debug!("Gateway closed by server: {:?}", frame);
                        break;
                    }
                    _ => {}
                }
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(&cmd) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode gateway command {:?}: {}", cmd, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        break;
                    }
                }
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("Disconnected from gateway");
}

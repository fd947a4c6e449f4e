use std::fmt::Display;

use tracing::{debug, info, warn};
use uuid::Uuid;

use nexcord_types::{GatewayEvent, Message};

use crate::transcript::{Merge, Transcript};
use crate::SyncError;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Re-fetch the full history after a successful send in addition to
    /// merging the returned record.
    pub reconcile_after_send: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconcile_after_send: true,
        }
    }
}

/// Captured at issuance of a history fetch; checked when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub channel_id: Uuid,
    epoch: u64,
}

/// Captured at issuance of a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    pub channel_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered {
        changed: bool,
        reconcile: Option<FetchTicket>,
    },
    Failed {
        notice: String,
    },
}

/// Keeps the transcript of the selected channel consistent across history
/// fetches, send confirmations and gateway pushes.
///
/// All methods are synchronous; the caller owns the I/O and must feed every
/// completion back through the matching `apply_*` method from a single task.
#[derive(Debug)]
pub struct Synchronizer {
    config: SyncConfig,
    active: Option<Uuid>,
    epoch: u64,
    transcript: Transcript,
}

impl Synchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            active: None,
            epoch: 0,
            transcript: Transcript::new(),
        }
    }

    pub fn active_channel(&self) -> Option<Uuid> {
        self.active
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    /// Switch context to `channel_id`. The transcript is emptied and the
    /// returned ticket must be used for the history fetch.
    pub fn select_channel(&mut self, channel_id: Uuid) -> FetchTicket {
        self.active = Some(channel_id);
        self.epoch += 1;
        self.transcript.clear();
        info!("Selected channel {} (epoch {})", channel_id, self.epoch);
        FetchTicket {
            channel_id,
            epoch: self.epoch,
        }
    }

    /// Ticket for a fresh history fetch of the active channel.
    pub fn reconcile(&self) -> Option<FetchTicket> {
        self.active.map(|channel_id| FetchTicket {
            channel_id,
            epoch: self.epoch,
        })
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.active == Some(ticket.channel_id) && self.epoch == ticket.epoch
    }

    /// Feed a history fetch completion. Returns whether the transcript changed.
    pub fn apply_history<E: Display>(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Message>, E>,
    ) -> bool {
        if !self.is_current(&ticket) {
            debug!(
                "Dropping stale history for channel {} (epoch {}, current {})",
                ticket.channel_id, ticket.epoch, self.epoch
            );
            return false;
        }

        let messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Failed to load messages for channel {}: {}", ticket.channel_id, e);
                return false;
            }
        };

        let mut changed = false;
        for msg in messages {
            if msg.channel_id != ticket.channel_id {
                warn!(
                    "History for channel {} contained message {} from channel {}",
                    ticket.channel_id, msg.id, msg.channel_id
                );
                continue;
            }
            changed |= self.transcript.upsert(msg).changed();
        }
        changed
    }

    /// Validate composer content before any request is made.
    pub fn begin_submit(&self, content: &str) -> Result<SubmitTicket, SyncError> {
        if content.trim().is_empty() {
            return Err(SyncError::EmptyContent);
        }
        let channel_id = self.active.ok_or(SyncError::NoActiveChannel)?;
        Ok(SubmitTicket {
            channel_id,
            content: content.to_string(),
        })
    }

    /// Feed a send completion.
    pub fn apply_sent<E: Display>(
        &mut self,
        ticket: &SubmitTicket,
        result: Result<Message, E>,
    ) -> SendOutcome {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Send to channel {} failed: {}", ticket.channel_id, e);
                return SendOutcome::Failed {
                    notice: format!("Failed to send message: {}", e),
                };
            }
        };

        if self.active != Some(ticket.channel_id) || msg.channel_id != ticket.channel_id {
            debug!("Send confirmation for inactive channel {}", ticket.channel_id);
            return SendOutcome::Delivered {
                changed: false,
                reconcile: None,
            };
        }

        let changed = self.transcript.insert(msg).changed();
        let reconcile = if self.config.reconcile_after_send {
            self.reconcile()
        } else {
            None
        };
        SendOutcome::Delivered { changed, reconcile }
    }

    /// Feed a gateway event. Returns whether the transcript changed.
    pub fn on_push_event(&mut self, event: &GatewayEvent) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        if event.channel_id() != Some(active) {
            return false;
        }

        match event {
            GatewayEvent::Message(msg) => self.transcript.insert(msg.clone()) == Merge::Inserted,
            GatewayEvent::ReactionAdd {
                message_id,
                user_id,
                emoji,
                ..
            } => self.transcript.update_reactions(message_id, |reactions| {
                reactions.entry(emoji.clone()).or_default().insert(*user_id)
            }),
            GatewayEvent::ReactionRemove {
                message_id,
                user_id,
                emoji,
                ..
            } => self.transcript.update_reactions(message_id, |reactions| {
                let Some(users) = reactions.get_mut(emoji) else {
                    return false;
                };
                let removed = users.remove(user_id);
                if users.is_empty() {
                    reactions.remove(emoji);
                }
                removed
            }),
            _ => false,
        }
    }
}

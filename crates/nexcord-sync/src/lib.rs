/// Live message synchronization.
///
/// Reconciles REST-fetched channel history with gateway push events so the
/// visible transcript is ordered by creation time, free of duplicate ids, and
/// scoped to the selected channel.

pub mod synchronizer;
pub mod transcript;

pub use synchronizer::{FetchTicket, SendOutcome, SubmitTicket, SyncConfig, Synchronizer};
pub use transcript::{Merge, Transcript};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("message is empty")]
    EmptyContent,
    #[error("no channel selected")]
    NoActiveChannel,
}

pub mod api;
pub mod events;
pub mod models;
pub mod timestamp;

pub use events::{GatewayCommand, GatewayEvent};
pub use models::{Attachment, Channel, ChannelKind, Message};

pub mod config;
pub mod console;
pub mod dispatcher;

pub use config::ClientConfig;
pub use console::Console;
pub use dispatcher::{Dispatcher, Input, Notice, ViewUpdate};

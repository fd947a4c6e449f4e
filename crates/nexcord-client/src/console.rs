use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;
use uuid::Uuid;

use nexcord_types::{Channel, Message};

use crate::dispatcher::{Input, Notice, ViewUpdate};

pub const HELP: &str = "\
Commands:
  /channels            list channels
  /join <name|number>  switch channel
  /upload <path>       upload a file and post a link
  /react <n> <emoji>   react to message n of the transcript
  /typing              send a typing indicator
  /refresh             reload the current channel
  /quit                exit
Anything else is sent as a message.";

/// Line-oriented view: turns input lines into intents and renders updates.
#[derive(Debug, Default)]
pub struct Console {
    channels: Vec<Channel>,
    active: Option<Uuid>,
    transcript: Vec<Message>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one input line. `Ok(None)` means nothing to dispatch.
    pub fn parse(&self, line: &str) -> Result<Option<Input>, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(rest) = line.strip_prefix('/') else {
            if line.trim().is_empty() {
                return Ok(None);
            }
            return Ok(Some(Input::Submit(line.to_string())));
        };

        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (rest, ""),
        };

        let input = match cmd {
            "channels" => Input::ListChannels,
            "join" => Input::Select(self.find_channel(arg)?),
            "upload" if !arg.is_empty() => Input::Upload(PathBuf::from(arg)),
            "upload" => return Err("usage: /upload <path>".into()),
            "react" => {
                let (n, emoji) = arg
                    .split_once(char::is_whitespace)
                    .ok_or("usage: /react <n> <emoji>")?;
                let message_id = self.message_at(n)?;
                Input::React {
                    message_id,
                    emoji: emoji.trim().to_string(),
                }
            }
            "typing" => Input::Typing,
            "refresh" => Input::Refresh,
            "quit" | "exit" => Input::Quit,
            "help" => return Err(HELP.into()),
            other => return Err(format!("unknown command /{} (try /help)", other)),
        };
        Ok(Some(input))
    }

    fn find_channel(&self, arg: &str) -> Result<Uuid, String> {
        if arg.is_empty() {
            return Err("usage: /join <name|number>".into());
        }
        if let Ok(n) = arg.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| self.channels.get(i))
                .map(|c| c.id)
                .ok_or_else(|| format!("no channel #{}", n));
        }
        let name = arg.trim_start_matches('#');
        self.channels
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id)
            .ok_or_else(|| format!("no channel named '{}'", name))
    }

    fn message_at(&self, n: &str) -> Result<Uuid, String> {
        let n: usize = n.parse().map_err(|_| format!("'{}' is not a message number", n))?;
        n.checked_sub(1)
            .and_then(|i| self.transcript.get(i))
            .map(|m| m.id)
            .ok_or_else(|| format!("no message #{}", n))
    }

    pub fn render(&mut self, update: ViewUpdate, out: &mut impl Write) -> io::Result<()> {
        match update {
            ViewUpdate::Channels(channels) => {
                self.channels = channels;
                if self.channels.is_empty() {
                    writeln!(out, "No channels available")?;
                }
                for (i, c) in self.channels.iter().enumerate() {
                    let marker = if Some(c.id) == self.active { '*' } else { ' ' };
                    write!(out, "{}{:>3}. #{}", marker, i + 1, c.name)?;
                    if let Some(desc) = c.description.as_deref().filter(|d| !d.is_empty()) {
                        write!(out, " - {}", desc)?;
                    }
                    writeln!(out)?;
                }
            }
            ViewUpdate::Selected(channel_id) => {
                self.active = Some(channel_id);
                self.transcript.clear();
                let name = self
                    .channels
                    .iter()
                    .find(|c| c.id == channel_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or("unknown");
                writeln!(out, "== #{} ==", name)?;
            }
            ViewUpdate::Transcript(messages) => {
                self.transcript = messages;
                self.write_transcript(out)?;
            }
            ViewUpdate::Notice(Notice::Info(text)) => writeln!(out, "-- {}", text)?,
            ViewUpdate::Notice(Notice::Error(text)) => writeln!(out, "!! {}", text)?,
        }
        out.flush()
    }

    fn write_transcript(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "----")?;
        if self.transcript.is_empty() {
            return writeln!(out, "No messages yet. Start the conversation!");
        }
        for (i, msg) in self.transcript.iter().enumerate() {
            writeln!(out, "{:>3} {}", i + 1, format_message(msg))?;
        }
        Ok(())
    }
}

pub fn format_message(msg: &Message) -> String {
    let author: String = msg.user_id.to_string().chars().take(8).collect();
    let mut line = format!(
        "[{}] User {}: {}",
        msg.created_at.with_timezone(&Local).format("%H:%M"),
        author,
        msg.content
    );
    if msg.is_edited {
        line.push_str(" (edited)");
    }
    for file in &msg.attachments {
        let label = if file.filename.is_empty() { &file.url } else { &file.filename };
        line.push_str(&format!("\n      📎 {}", label));
    }
    let joined: Vec<String> = msg
        .reaction_counts()
        .map(|(emoji, n)| format!("{} {}", emoji, n))
        .collect();
    if !joined.is_empty() {
        line.push_str(&format!("\n      {}", joined.join("  ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use nexcord_types::ChannelKind;
    use nexcord_types::models::Reactions;

    use super::*;

    fn channel(n: u128, name: &str) -> Channel {
        Channel {
            id: Uuid::from_u128(n),
            name: name.into(),
            description: None,
            kind: ChannelKind::Public,
            owner_id: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    fn message(n: u128, content: &str) -> Message {
        Message {
            id: Uuid::from_u128(n),
            channel_id: Uuid::from_u128(1),
            user_id: Uuid::parse_str("12345678-9abc-def0-1234-56789abcdef0").unwrap(),
            content: content.into(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            parent_id: None,
            is_edited: false,
            is_pinned: false,
            mentions: vec![],
            attachments: vec![],
            reactions: Reactions::new(),
        }
    }

    fn console() -> Console {
        let mut console = Console::new();
        let mut sink = Vec::new();
        console
            .render(
                ViewUpdate::Channels(vec![channel(1, "general"), channel(2, "random")]),
                &mut sink,
            )
            .unwrap();
        console
            .render(ViewUpdate::Transcript(vec![message(10, "hi")]), &mut sink)
            .unwrap();
        console
    }

    #[test]
    fn plain_text_is_submitted() {
        let c = console();
        assert_eq!(
            c.parse("hello there\n").unwrap(),
            Some(Input::Submit("hello there".into()))
        );
        assert_eq!(c.parse("   ").unwrap(), None);
    }

    #[test]
    fn join_by_name_or_number() {
        let c = console();
        assert_eq!(c.parse("/join random").unwrap(), Some(Input::Select(Uuid::from_u128(2))));
        assert_eq!(c.parse("/join #General").unwrap(), Some(Input::Select(Uuid::from_u128(1))));
        assert_eq!(c.parse("/join 1").unwrap(), Some(Input::Select(Uuid::from_u128(1))));
        assert!(c.parse("/join 3").is_err());
        assert!(c.parse("/join 0").is_err());
        assert!(c.parse("/join nowhere").is_err());
    }

    #[test]
    fn react_targets_transcript_position() {
        let c = console();
        assert_eq!(
            c.parse("/react 1 👍").unwrap(),
            Some(Input::React {
                message_id: Uuid::from_u128(10),
                emoji: "👍".into()
            })
        );
        assert!(c.parse("/react 2 👍").is_err());
        assert!(c.parse("/react 1").is_err());
    }

    #[test]
    fn other_commands() {
        let c = console();
        assert_eq!(c.parse("/quit").unwrap(), Some(Input::Quit));
        assert_eq!(c.parse("/refresh").unwrap(), Some(Input::Refresh));
        assert_eq!(c.parse("/typing").unwrap(), Some(Input::Typing));
        assert_eq!(
            c.parse("/upload ./notes.txt").unwrap(),
            Some(Input::Upload(PathBuf::from("./notes.txt")))
        );
        assert!(c.parse("/upload").is_err());
        assert!(c.parse("/bogus").is_err());
    }

    #[test]
    fn renders_empty_and_reactions() {
        let mut c = Console::new();
        let mut out = Vec::new();
        c.render(ViewUpdate::Transcript(vec![]), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No messages yet. Start the conversation!"));

        let mut msg = message(10, "ship it");
        msg.reactions.entry("🎉".into()).or_default().insert(Uuid::from_u128(3));
        msg.reactions.entry("🎉".into()).or_default().insert(Uuid::from_u128(4));
        let line = format_message(&msg);
        assert!(line.contains("User 12345678: ship it"));
        assert!(line.contains("🎉 2"));
    }
}

//! Line-oriented terminal front end for the chat client.

use std::io::Write;

use chat_common::ChannelType;
use parking_lot::Mutex;

use crate::surface::{ConnectionStatus, DisplayLine, LineStyle, Notifier, Permission, Surface};

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Join(String),
    Create { name: String, channel_type: ChannelType },
    Nick(String),
    Channels,
    Quit,
    Empty,
    Invalid(String),
}

/// Parse one line typed by the user.
///
/// `/join <name>`, `/create <name> [ephemeral|persistent]`, `/nick <name>`,
/// `/channels` and `/quit` are commands; anything else is a message.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (verb, args.as_slice()) {
        ("join" | "j", [name]) => Input::Join(name.trim_start_matches('#').to_string()),
        ("create", [name]) => Input::Create {
            name: name.trim_start_matches('#').to_string(),
            channel_type: ChannelType::Ephemeral,
        },
        ("create", [name, kind]) => match kind.parse() {
            Ok(channel_type) => Input::Create {
                name: name.trim_start_matches('#').to_string(),
                channel_type,
            },
            Err(err) => Input::Invalid(err.to_string()),
        },
        ("nick", [name]) => Input::Nick(name.to_string()),
        ("channels", []) => Input::Channels,
        ("quit" | "q", []) => Input::Quit,
        _ => Input::Invalid(format!("unknown command `/{command}`")),
    }
}

/// Prints the chat to stdout.
#[derive(Default)]
pub struct TerminalSurface {
    current: Mutex<String>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
    }
}

/// Render a display line as one terminal row.
pub fn format_line(line: &DisplayLine) -> String {
    let stamp = line
        .timestamp
        .as_deref()
        .map(|ts| format!("[{ts}] "))
        .unwrap_or_default();
    match line.style {
        LineStyle::Notice => format!("-- {} --", line.content),
        LineStyle::System => format!("{stamp}* {}", line.content),
        LineStyle::Normal if line.own => format!("{stamp}<{}> {}", line.author, line.content),
        LineStyle::Normal => format!("{stamp}{}: {}", line.author, line.content),
    }
}

impl Surface for TerminalSurface {
    fn display(&self, line: &DisplayLine) {
        self.print(&format_line(line));
    }

    fn clear_messages(&self) {
        self.print("");
    }

    fn channel_added(&self, name: &str, channel_type: ChannelType) {
        self.print(&format!("+ #{name} ({channel_type})"));
    }

    fn channel_updated(&self, _name: &str, _channel_type: ChannelType) {}

    fn channel_removed(&self, name: &str) {
        self.print(&format!("- #{name}"));
    }

    fn channels_replaced(&self, channels: &[(String, ChannelType)]) {
        let names: Vec<String> = channels.iter().map(|(n, _)| format!("#{n}")).collect();
        self.print(&format!("channels: {}", names.join(" ")));
    }

    fn highlight_channel(&self, _name: &str) {}

    fn current_channel(&self, name: &str) {
        let mut current = self.current.lock();
        if *current != name {
            *current = name.to_string();
            self.print(&format!("Current Channel: #{name}"));
        }
    }

    fn connection_status(&self, status: ConnectionStatus) {
        if status.can_send() {
            self.print("* connected");
        } else {
            self.print("* disconnected, input disabled");
        }
    }

    fn set_title(&self, title: &str) {
        // OSC 0: set the terminal window title.
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\x1b]0;{title}\x07");
        let _ = out.flush();
    }
}

/// Terminals have no desktop notifications; only the bell is available.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        Permission::Unsupported
    }

    fn request_permission(&self) {}

    fn notify(&self, _title: &str, _body: &str) {}

    fn play_cue(&self) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\x07");
        let _ = out.flush();
    }
}

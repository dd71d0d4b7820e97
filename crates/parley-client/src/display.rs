//! Turning relay frames into terminal lines.

use crossterm::style::{Color, Stylize};
use tracing::debug;

use parley_crypto::{CipherContext, UserKey};
use parley_types::envelope::SERVER_SENDER;
use parley_types::{DisplayColor, OutboundEnvelope};

/// Sender label for lines the client produces itself.
pub const CLIENT_SENDER: &str = "CLIENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `time <from> text`
    OneLine,
    /// `time <from>` followed by `> text`
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub layout: Layout,
    pub from: String,
    /// `None` when the relay sent a colour name this client doesn't know.
    pub color: Option<DisplayColor>,
    pub text: String,
}

impl Line {
    pub fn local(text: impl Into<String>, color: DisplayColor) -> Self {
        Self {
            layout: Layout::OneLine,
            from: CLIENT_SENDER.to_string(),
            color: Some(color),
            text: text.into(),
        }
    }

    pub fn from_envelope(envelope: OutboundEnvelope) -> Self {
        let layout = if envelope.from == SERVER_SENDER {
            Layout::OneLine
        } else {
            Layout::Chat
        };
        Self {
            layout,
            color: envelope.color.parse().ok(),
            from: envelope.from,
            text: envelope.text,
        }
    }

    pub fn render(&self, time: &str) -> String {
        let color = term_color(self.color);
        let label = format!("<{}>", printable(&self.from)).with(color);
        let text = printable(&self.text);
        match self.layout {
            Layout::OneLine => format!("{time} {label} {text}"),
            Layout::Chat => format!("{time} {label}\n{} {text}", ">".with(color)),
        }
    }

    pub fn print(&self) {
        let now = chrono::Local::now().format("%H:%M:%S").to_string();
        println!("{}", self.render(&now));
    }
}

/// Decrypt and parse one frame from the relay. Frames that decrypt but
/// don't parse are dropped.
pub fn interpret(cipher: &CipherContext, key: &UserKey, frame: &[u8]) -> Option<Line> {
    let plaintext = match cipher.open(key, frame) {
        Ok(plaintext) => plaintext,
        Err(e) => return Some(Line::local(format!("Error decrypting message: {e}"), DisplayColor::Red)),
    };
    match OutboundEnvelope::decode(&plaintext) {
        Ok(envelope) => Some(Line::from_envelope(envelope)),
        Err(_) => {
            debug!(len = plaintext.len(), "Ignoring unparseable frame");
            None
        }
    }
}

fn term_color(color: Option<DisplayColor>) -> Color {
    match color {
        Some(DisplayColor::Black) => Color::Black,
        Some(DisplayColor::White) => Color::White,
        Some(DisplayColor::Red) => Color::Red,
        Some(DisplayColor::Green) => Color::Green,
        Some(DisplayColor::Blue) => Color::Blue,
        Some(DisplayColor::Cyan) => Color::Cyan,
        Some(DisplayColor::Magenta) => Color::Magenta,
        Some(DisplayColor::Yellow) => Color::Yellow,
        None => Color::Reset,
    }
}

// Relayed text is untrusted; keep escape sequences off the terminal.
fn printable(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

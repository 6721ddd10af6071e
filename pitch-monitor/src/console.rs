//! Terminal output and stdin commands.

use pitch_core::display::DisplayUpdate;
use pitch_core::monitor::DisplaySink;
use serde_json::json;

/// Writes status lines, either as text or JSON.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    json: bool,
}

impl Console {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn status(&self, text: &str) {
        if self.json {
            println!("{}", json!({ "kind": "status", "status": text }));
        } else {
            println!("-- {text}");
        }
    }
}

/// Prints every display update on its own line.
pub struct TerminalSink {
    json: bool,
}

impl TerminalSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl DisplaySink for TerminalSink {
    fn publish(&mut self, update: DisplayUpdate) {
        if self.json {
            match serde_json::to_string(&update) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!("Failed to encode display update: {e}"),
            }
        } else {
            println!("{}", render_line(&update));
        }
    }
}

/// One-line text rendering of an update.
pub fn render_line(update: &DisplayUpdate) -> String {
    match update {
        DisplayUpdate::Reading { frequency, note, status, bar_deviation_cents }
        | DisplayUpdate::NoSignal { frequency, note, status, bar_deviation_cents } => {
            format!("{note:<12} {frequency:>10}  ref {bar_deviation_cents:+7.1}¢  {status}")
        }
        DisplayUpdate::Holding { status } => format!("{:<12} {:>10}  {status}", "", ""),
    }
}

/// Commands accepted on stdin while monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Notes,
    Devices,
    Device(String),
    Reference(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match line {
            "q" | "quit" | "exit" => return Some(Self::Quit),
            "notes" => return Some(Self::Notes),
            "devices" => return Some(Self::Devices),
            _ => {}
        }
        if let Some(name) = line.strip_prefix("device ") {
            let name = name.trim();
            return (!name.is_empty()).then(|| Self::Device(name.to_string()));
        }
        Some(Self::Reference(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("  quit \n"), Some(Command::Quit));
        assert_eq!(Command::parse("notes"), Some(Command::Notes));
        assert_eq!(Command::parse("devices"), Some(Command::Devices));
        assert_eq!(
            Command::parse("device USB Audio CODEC"),
            Some(Command::Device("USB Audio CODEC".into()))
        );
        assert_eq!(Command::parse("device   "), Some(Command::Reference("device".into())));
        assert_eq!(Command::parse("C#3"), Some(Command::Reference("C#3".into())));
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn renders_neutral_line() {
        let line = render_line(&DisplayUpdate::no_signal());
        assert!(line.starts_with("--"));
        assert!(line.contains("-- Hz"));
        assert!(line.ends_with("Listening..."));
    }

    #[test]
    fn renders_holding_status() {
        let line = render_line(&DisplayUpdate::holding(0.2));
        assert!(line.ends_with("Holding (Level 0.20)"));
    }
}

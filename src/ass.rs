use std::time::Duration;

use clap::ValueEnum;

/// How a matched dialogue event is quoted in the markdown output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RefFormat {
    /// The whole event line, as it appears after `Dialogue:`
    Full,
    /// Only the event's text field
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueEvent {
    pub(crate) start: Duration,
    pub(crate) end: Duration,
    pub(crate) text: String,
    pub(crate) raw: String,
}

impl DialogueEvent {
    /// Whether the event is on screen at any point of `[start, end)`.
    pub fn overlaps(&self, start: Duration, end: Duration) -> bool {
        self.start < end && self.end > start
    }

    pub fn render(&self, format: RefFormat) -> &str {
        match format {
            RefFormat::Full => &self.raw,
            RefFormat::Text => &self.text,
        }
    }
}

use std::time::Duration;

/// Categories that keep their own group when notes are grouped chronologically.
pub const STANDALONE_CATEGORIES: [&str; 3] = ["Typeset", "Timing", "Encode"];

/// Categories whose notes never get a dialogue reference line.
pub const NON_DIALOGUE_CATEGORIES: [&str; 2] = ["Typeset", "Encode"];

/// Group name used for every non-standalone category in chronological mode.
pub const SCRIPT_GROUP: &str = "Script";

#[derive(Debug, Clone, PartialEq)]
pub struct QcEntry {
    /// Timestamp exactly as written in the report.
    pub(crate) stamp: String,
    /// `None` when `stamp` is not a valid `HH:MM:SS` time.
    pub(crate) time: Option<Duration>,
    pub(crate) category: String,
    pub(crate) text: String,
}

#[derive(Debug, Default)]
pub struct Report {
    pub(crate) artifact: Option<String>,
    pub(crate) entries: Vec<QcEntry>,
}

pub fn is_standalone(category: &str) -> bool {
    STANDALONE_CATEGORIES.contains(&category)
}

pub fn is_dialogue_group(group: &str) -> bool {
    !NON_DIALOGUE_CATEGORIES.contains(&group)
}

/// Entry at `secs` with an mpvQC-formatted stamp.
#[cfg(test)]
pub(crate) fn entry_at(secs: u64, category: &str, text: &str) -> QcEntry {
    QcEntry {
        stamp: format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60),
        time: Some(Duration::from_secs(secs)),
        category: category.to_string(),
        text: text.to_string(),
    }
}

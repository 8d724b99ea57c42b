use crate::ass::{DialogueEvent, RefFormat};
use crate::qc::QcEntry;

use anyhow::{Context, Result};
use dialoguer::MultiSelect;
use tracing::debug;

/// Decides which of the dialogue events overlapping a note get quoted.
pub trait ReferencePicker {
    /// Returns indices into `candidates`, in ascending order.
    fn pick(&mut self, entry: &QcEntry, candidates: &[&DialogueEvent]) -> Result<Vec<usize>>;
}

/// Quotes every overlapping event.
pub struct KeepAll;

impl ReferencePicker for KeepAll {
    fn pick(&mut self, _entry: &QcEntry, candidates: &[&DialogueEvent]) -> Result<Vec<usize>> {
        Ok((0..candidates.len()).collect())
    }
}

/// Asks on the terminal whenever more than one event overlaps a note.
pub struct Prompt {
    format: RefFormat,
}

impl Prompt {
    pub fn new(format: RefFormat) -> Self {
        Self { format }
    }
}

impl ReferencePicker for Prompt {
    fn pick(&mut self, entry: &QcEntry, candidates: &[&DialogueEvent]) -> Result<Vec<usize>> {
        if candidates.len() < 2 {
            return KeepAll.pick(entry, candidates);
        }

        let items: Vec<&str> = candidates.iter().map(|e| e.render(self.format)).collect();
        let defaults = vec![true; items.len()];
        let selection = MultiSelect::new()
            .with_prompt(format!(
                "[{}] [{}] {} (space toggles, enter confirms)",
                entry.stamp,
                entry.category,
                entry.text
            ))
            .items(&items)
            .defaults(&defaults)
            .interact_opt()
            .context("Failed to show reference picker")?;

        if selection.is_none() {
            debug!("Picker dismissed at {}, keeping all references", entry.stamp);
        }
        Ok(picked_indices(selection, candidates.len()))
    }
}

/// Maps a multi-select answer to candidate indices. A dismissed prompt keeps
/// every candidate, out-of-range answers are dropped.
fn picked_indices(selection: Option<Vec<usize>>, count: usize) -> Vec<usize> {
    match selection {
        Some(mut picked) => {
            picked.retain(|&idx| idx < count);
            picked.sort_unstable();
            picked.dedup();
            picked
        }
        None => (0..count).collect(),
    }
}

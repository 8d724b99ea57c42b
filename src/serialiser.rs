use crate::ass::{DialogueEvent, RefFormat};
use crate::dialogue::events_at;
use crate::picker::ReferencePicker;
use crate::qc::{is_dialogue_group, QcEntry};

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

#[derive(Debug, Default)]
pub struct Header {
    pub artifact: Option<String>,
    pub commit: Option<String>,
}

pub struct RefOptions<'a> {
    pub events: &'a [DialogueEvent],
    pub format: RefFormat,
    pub picker: &'a mut dyn ReferencePicker,
}

pub fn serialise<P: AsRef<Path>>(
    groups: &BTreeMap<String, Vec<QcEntry>>,
    header: &Header,
    refs: Option<RefOptions>,
    output: P,
) -> Result<()> {
    let file = std::fs::File::create(output).context("Failed to create file!")?;
    let mut writer = BufWriter::new(file);
    write_markdown(&mut writer, groups, header, refs).context("Failed to write to output file.")?;
    writer.flush().context("Failed to write to output file.")?;
    Ok(())
}

pub fn write_markdown<W: Write>(
    buf: &mut W,
    groups: &BTreeMap<String, Vec<QcEntry>>,
    header: &Header,
    mut refs: Option<RefOptions>,
) -> Result<()> {
    write_header(buf, header)?;
    for (group, notes) in groups {
        writeln!(buf, "## {}", group)?;
        for entry in notes {
            if let Some(refs) = refs.as_mut() {
                if is_dialogue_group(group) {
                    write_refs(buf, entry, refs)?;
                }
            }
            write_entry(buf, group, entry)?;
        }
        writeln!(buf)?;
    }
    Ok(())
}

fn write_header<W: Write>(buf: &mut W, header: &Header) -> Result<()> {
    if let Some(artifact) = &header.artifact {
        writeln!(buf, "Using artifact `{}`", artifact)?;
    }
    if let Some(commit) = &header.commit {
        writeln!(buf, "Repo at commit `{}`", commit)?;
    }
    if header.artifact.is_some() || header.commit.is_some() {
        writeln!(buf)?;
    }
    Ok(())
}

fn write_refs<W: Write>(buf: &mut W, entry: &QcEntry, refs: &mut RefOptions) -> Result<()> {
    // Without dialogue the quote is left for the reviewer to fill in.
    if refs.events.is_empty() {
        writeln!(buf, "> ")?;
        return Ok(());
    }

    let time = match entry.time {
        Some(time) => time,
        None => {
            warn!(
                "Cannot look up dialogue for '{}' at invalid timestamp '{}'",
                entry.text, entry.stamp
            );
            writeln!(buf, "> ")?;
            return Ok(());
        }
    };
    let candidates = events_at(refs.events, time);
    for idx in refs.picker.pick(entry, &candidates)? {
        if let Some(event) = candidates.get(idx) {
            writeln!(buf, "> {}", event.render(refs.format))?;
        }
    }
    Ok(())
}

fn write_entry<W: Write>(buf: &mut W, group: &str, entry: &QcEntry) -> Result<()> {
    if group != entry.category {
        writeln!(
            buf,
            "- [ ] [`{}` - **{}**]: {}",
            entry.stamp,
            entry.category,
            entry.text
        )?;
    } else {
        writeln!(buf, "- [ ] [`{}`]: {}", entry.stamp, entry.text)?;
    }
    Ok(())
}

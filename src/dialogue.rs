use crate::ass::DialogueEvent;
use crate::error::Qc2mdError;
use crate::parser::{hms, total_millis};

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use nom::bytes::complete::{tag, take_while_m_n};
use nom::combinator::{all_consuming, map_opt, map_res, opt};
use nom::error::{convert_error, VerboseError};
use nom::sequence::{pair, preceded};
use nom::{Err, IResult};
use tracing::debug;

const DEFAULT_FORMAT: [&str; 10] = [
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

// Positioned events are signs, not dialogue.
const POSITION_TAG: &str = "\\pos";

/// Column layout of the `[Events]` section.
struct EventFormat {
    len: usize,
    start: usize,
    end: usize,
}

impl EventFormat {
    fn new<S: AsRef<str>>(fields: &[S]) -> Result<Self, Qc2mdError> {
        let find = |name: &str| {
            fields
                .iter()
                .position(|f| f.as_ref().trim().eq_ignore_ascii_case(name))
        };
        let describe = || {
            fields
                .iter()
                .map(|f| f.as_ref().trim())
                .collect::<Vec<_>>()
                .join(", ")
        };

        match (find("Start"), find("End"), find("Text")) {
            (Some(start), Some(end), Some(text)) if text == fields.len() - 1 => Ok(Self {
                len: fields.len(),
                start,
                end,
            }),
            _ => Err(Qc2mdError::InvalidEventFormat(describe())),
        }
    }
}

pub fn load_dialogue<P: AsRef<Path>>(path: P) -> Result<Vec<DialogueEvent>> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .context(format!("Failed to open dialogue file: '{}'", path.display()))?;
    let events = parse_dialogue(&data)
        .context(format!("Failed to parse dialogue file: '{}'", path.display()))?;
    debug!("Loaded {} dialogue events from '{}'", events.len(), path.display());
    Ok(events)
}

pub fn parse_dialogue(input: &str) -> Result<Vec<DialogueEvent>> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);

    let mut in_events = false;
    let mut format = EventFormat::new(&DEFAULT_FORMAT[..])?;
    let mut events = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_events = trimmed.eq_ignore_ascii_case("[Events]");
            continue;
        }
        if !in_events {
            continue;
        }

        let (kind, body) = match line.split_once(':') {
            Some(pair) => pair,
            None => continue,
        };
        match kind.trim() {
            "Format" => {
                let fields: Vec<&str> = body.split(',').collect();
                format = EventFormat::new(&fields)?;
            }
            "Dialogue" => {
                let event = dialogue_event(&format, body)
                    .context(format!("Invalid dialogue event on line {}", idx + 1))?;
                if event.text.contains(POSITION_TAG) {
                    debug!("Skipping positioned event on line {}", idx + 1);
                    continue;
                }
                events.push(event);
            }
            _ => (),
        }
    }

    Ok(events)
}

fn dialogue_event(format: &EventFormat, body: &str) -> Result<DialogueEvent> {
    let raw = body.trim_start();
    let fields: Vec<&str> = raw.splitn(format.len, ',').collect();
    if fields.len() < format.len {
        return Err(Qc2mdError::ParseError(format!(
            "expected {} fields, found {}",
            format.len,
            fields.len()
        ))
        .into());
    }

    Ok(DialogueEvent {
        start: parse_ass_time(fields[format.start])?,
        end: parse_ass_time(fields[format.end])?,
        text: fields[format.len - 1].to_string(),
        raw: raw.to_string(),
    })
}

/// Parses an ASS timestamp such as `0:01:02.35`.
pub fn parse_ass_time(input: &str) -> Result<Duration> {
    let input = input.trim();
    match all_consuming(ass_time)(input) {
        Ok((_, duration)) => Ok(duration),
        Err(Err::Error(err)) | Err(Err::Failure(err)) => {
            let conv = convert_error(input, err);
            Err(Qc2mdError::ParseError(conv)).context(format!("Invalid timestamp '{}'", input))
        }
        Err(Err::Incomplete(_)) => {
            unreachable!("Incomplete data received by non-streaming parser.")
        }
    }
}

fn ass_time(input: &str) -> IResult<&str, Duration, VerboseError<&str>> {
    const FRACTION_MIN: usize = 1;
    const FRACTION_MAX: usize = 3;
    let take_millis = map_res(
        take_while_m_n(FRACTION_MIN, FRACTION_MAX, |c: char| c.is_ascii_digit()),
        // `.5` is half a second and `.05` five centiseconds, so right-pad to millis.
        |s: &str| format!("{:0<3}", s).parse::<u64>(),
    );

    map_opt(
        pair(hms, opt(preceded(tag("."), take_millis))),
        |((hours, minutes, seconds), millis)| {
            total_millis(hours, minutes, seconds, millis.unwrap_or(0)).map(Duration::from_millis)
        },
    )(input)
}

/// All events on screen during the second starting at `time`.
pub fn events_at(events: &[DialogueEvent], time: Duration) -> Vec<&DialogueEvent> {
    let end = time.saturating_add(Duration::from_secs(1));
    events.iter().filter(|e| e.overlaps(time, end)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_read_ass_time {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected) = $value;

                let duration = parse_ass_time(input).unwrap();

                assert_eq!(duration.as_millis(), expected);
            }
        )*
        }
    }

    test_read_ass_time! {
        test_read_ass_time_0: ("0:00:00.00", 0),
        test_read_ass_time_1: ("0:00:01.20", 1200),
        test_read_ass_time_2: ("0:00:01.2", 1200),
        test_read_ass_time_3: ("0:00:01.02", 1020),
        test_read_ass_time_4: ("0:00:01.002", 1002),
        test_read_ass_time_5: ("1:01:01.00", 3661000),
        test_read_ass_time_6: ("0:00:07", 7000),
    }

    const SCRIPT: &str = "\u{FEFF}[Script Info]\n\
        Title: Episode 01\n\
        ScriptType: v4.00+\n\
        \n\
        [V4+ Styles]\n\
        Format: Name, Fontname, Fontsize\n\
        Style: Default,Arial,20\n\
        \n\
        [Events]\n\
        Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n\
        Dialogue: 0,0:00:01.00,0:00:03.50,Default,Alice,0,0,0,,Well, hello there.\n\
        Comment: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,TL note: greeting\n\
        Dialogue: 0,0:00:02.00,0:00:04.00,Sign,,0,0,0,,{\\pos(640,40)}Bakery\n\
        Dialogue: 0,0:00:03.00,0:00:05.00,Default,Bob,0,0,0,,Hi!\n";

    #[test]
    fn parse_events_section() {
        let events = parse_dialogue(SCRIPT).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, Duration::from_millis(1000));
        assert_eq!(events[0].end, Duration::from_millis(3500));
        assert_eq!(events[0].text, "Well, hello there.");
        assert_eq!(
            events[0].raw,
            "0,0:00:01.00,0:00:03.50,Default,Alice,0,0,0,,Well, hello there."
        );
        assert_eq!(events[1].text, "Hi!");
    }

    #[test]
    fn custom_format_order() {
        let input = "[Events]\n\
            Format: Start, End, Style, Text\n\
            Dialogue: 0:00:10.00,0:00:12.00,Default,Reordered\n";
        let events = parse_dialogue(input).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, Duration::from_secs(10));
        assert_eq!(events[0].text, "Reordered");
    }

    #[test]
    fn no_events_section_yields_nothing() {
        let events = parse_dialogue("[Script Info]\nTitle: nothing\n").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn format_without_trailing_text_is_rejected() {
        let err = parse_dialogue("[Events]\nFormat: Text, Start, End\n").unwrap_err();
        assert!(err.to_string().contains("Text, Start, End"));
    }

    #[test]
    fn truncated_event_is_an_error() {
        let input = "[Events]\nDialogue: 0,0:00:01.00\n";
        let err = parse_dialogue(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn overflowing_event_timestamp_is_an_error() {
        assert!(parse_ass_time("5124095576030432:00:00.00").is_err());
        assert!(events_at(&[], Duration::MAX).is_empty());
    }

    #[test]
    fn bad_event_timestamp_is_an_error() {
        let input = "[Events]\nDialogue: 0,0:00:xx.00,0:00:02.00,Default,,0,0,0,,Hi\n";
        assert!(parse_dialogue(input).is_err());
    }

    #[test]
    fn lookup_uses_one_second_window() {
        let events = parse_dialogue(SCRIPT).unwrap();

        let at = |secs| {
            events_at(&events, Duration::from_secs(secs))
                .iter()
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
        };

        assert!(at(0).is_empty());
        assert_eq!(at(1), vec!["Well, hello there."]);
        assert_eq!(at(3), vec!["Well, hello there.", "Hi!"]);
        assert_eq!(at(4), vec!["Hi!"]);
        assert!(at(5).is_empty());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ep01.ass");
        std::fs::write(&path, SCRIPT).unwrap();

        assert_eq!(load_dialogue(&path).unwrap().len(), 2);
        assert!(load_dialogue(dir.path().join("missing.ass")).is_err());
    }
}

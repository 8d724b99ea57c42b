use crate::error::Qc2mdError;
use crate::qc::{QcEntry, Report};

use std::time::Duration;

use anyhow::{Context, Result};
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_opt, map_res, verify};
use nom::error::{convert_error, VerboseError};
use nom::{Err, IResult};
use regex::Regex;
use tracing::{debug, warn};

// mpvQC entry line, e.g. `[00:02:18] [Phrasing] unsure of "comprises"`
const LINE_PATTERN: &str = r"^\[(.+?)\] \[(.+?)\] (.+)";

const DATA_HEADER: &str = "[DATA]";

pub struct Parser {
    line_pattern: Regex,
}

impl Parser {
    pub fn new() -> Result<Self> {
        let line_pattern = Regex::new(LINE_PATTERN).context("Invalid regex.")?;
        Ok(Self { line_pattern })
    }

    pub fn parse(&self, input: &str) -> Result<Report> {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);

        let artifact = input
            .lines()
            .find(|line| line.starts_with("path"))
            .and_then(artifact_name);

        let mut lines = input.lines().enumerate();
        if !lines.any(|(_, line)| line.trim_end() == DATA_HEADER) {
            return Err(Qc2mdError::MissingDataSection).context("Failed to parse report");
        }

        let mut entries = Vec::new();
        for (idx, line) in lines {
            if line.starts_with('#') {
                continue;
            }
            let caps = match self.line_pattern.captures(line) {
                Some(caps) => caps,
                None => {
                    if !line.trim().is_empty() {
                        debug!("Skipping unrecognised report line {}: '{}'", idx + 1, line);
                    }
                    continue;
                }
            };

            let stamp = &caps[1];
            let time = match parse_clock(stamp) {
                Ok(time) => Some(time),
                Err(err) => {
                    warn!(
                        "Report line {} has an invalid timestamp '{}', no reference will be looked up: {}",
                        idx + 1,
                        stamp,
                        err
                    );
                    None
                }
            };
            entries.push(QcEntry {
                stamp: stamp.to_string(),
                time,
                category: caps[2].to_string(),
                text: caps[3].to_string(),
            });
        }

        Ok(Report { artifact, entries })
    }
}

/// Extracts the video file name from the `path` header line.
fn artifact_name(line: &str) -> Option<String> {
    let value = line.splitn(2, ':').nth(1).unwrap_or(line);
    let name = value.rsplit(|c: char| c == '/' || c == '\\').next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parses an mpvQC `HH:MM:SS` timestamp.
pub fn parse_clock(input: &str) -> Result<Duration> {
    match all_consuming(clock)(input.trim()) {
        Ok((_, duration)) => Ok(duration),
        Err(Err::Error(err)) | Err(Err::Failure(err)) => {
            let conv = convert_error(input.trim(), err);
            Err(Qc2mdError::ParseError(conv)).context("Invalid timestamp")
        }
        Err(Err::Incomplete(_)) => {
            unreachable!("Incomplete data received by non-streaming parser.")
        }
    }
}

fn clock(input: &str) -> IResult<&str, Duration, VerboseError<&str>> {
    map_opt(hms, |(hours, minutes, seconds)| {
        total_millis(hours, minutes, seconds, 0).map(Duration::from_millis)
    })(input)
}

/// Combines clock components into milliseconds, `None` on overflow.
pub(crate) fn total_millis(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<u64> {
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

/// Hours, minutes and seconds separated by colons. Hours are unbounded,
/// the other two components take one or two digits below 60.
pub(crate) fn hms(input: &str) -> IResult<&str, (u64, u64, u64), VerboseError<&str>> {
    let (input, hours) = map_res(digit1, |s: &str| s.parse::<u64>())(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, minutes) = sexagesimal(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, seconds) = sexagesimal(input)?;

    Ok((input, (hours, minutes, seconds)))
}

fn sexagesimal(input: &str) -> IResult<&str, u64, VerboseError<&str>> {
    const DIGITS_MIN: usize = 1;
    const DIGITS_MAX: usize = 2;
    verify(
        map_res(
            take_while_m_n(DIGITS_MIN, DIGITS_MAX, |c: char| c.is_ascii_digit()),
            |s: &str| s.parse::<u64>(),
        ),
        |value: &u64| *value < 60,
    )(input)
}

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum Qc2mdError {
    ParseError(String),
    MissingDataSection,
    InvalidEventFormat(String),
}

impl Error for Qc2mdError {}

impl fmt::Display for Qc2mdError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Qc2mdError::ParseError(msg) => write!(fmt, "{}", msg),
            Qc2mdError::MissingDataSection => {
                write!(fmt, "The report does not contain a [DATA] section")
            }
            Qc2mdError::InvalidEventFormat(msg) => {
                write!(fmt, "Unsupported [Events] format line: {}", msg)
            }
        }
    }
}

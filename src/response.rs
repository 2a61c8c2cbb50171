//! Reply classification
//!
//! IGV answers every command with one line: `OK`, an echo of a test
//! command, or `ERROR` followed by free text. Two error texts can never be
//! fixed mid-run (unknown genome, missing snapshot directory) and are
//! classified as fatal.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::IgvError;

pub const SUCCESS_MARKER: &str = "OK";

static GENOME_NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ERROR\W*?Could not locate genome").unwrap());

static DIRECTORY_MISSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ERROR\W*?directory.+?does not exist").unwrap());

static ERROR_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^ERROR\W*?\w").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Acknowledged,
    /// The expected literal came back (handshake)
    ExpectedEcho,
    RecoverableError(String),
    FatalError(FatalReply),
    /// Anything else; treated as success with a warning
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReply {
    HandshakeMismatch { expected: String, received: String },
    GenomeNotFound(String),
    DirectoryMissing(String),
}

impl From<FatalReply> for IgvError {
    fn from(fatal: FatalReply) -> Self {
        match fatal {
            FatalReply::HandshakeMismatch { expected, received } => {
                IgvError::HandshakeMismatch { expected, received }
            }
            FatalReply::GenomeNotFound(reply) => IgvError::GenomeNotFound { reply },
            FatalReply::DirectoryMissing(reply) => IgvError::SnapshotDirectoryMissing { reply },
        }
    }
}

/// Strip line endings, tabs and surrounding spaces from a raw reply
pub fn clean_reply(raw: &str) -> &str {
    raw.trim_matches(|c| matches!(c, '\r' | '\n' | '\t' | ' '))
}

/// Classify one reply line. Total: every input maps to exactly one variant.
pub fn classify(raw: &str, expected: Option<&str>) -> Reply {
    let line = clean_reply(raw);

    if let Some(expected) = expected {
        return if line == expected {
            Reply::ExpectedEcho
        } else {
            Reply::FatalError(FatalReply::HandshakeMismatch {
                expected: expected.to_string(),
                received: line.to_string(),
            })
        };
    }

    if line == SUCCESS_MARKER {
        Reply::Acknowledged
    } else if GENOME_NOT_FOUND.is_match(line) {
        Reply::FatalError(FatalReply::GenomeNotFound(line.to_string()))
    } else if DIRECTORY_MISSING.is_match(line) {
        Reply::FatalError(FatalReply::DirectoryMissing(line.to_string()))
    } else if ERROR_MARKER.is_match(line) {
        Reply::RecoverableError(line.to_string())
    } else {
        Reply::Unrecognized(line.to_string())
    }
}

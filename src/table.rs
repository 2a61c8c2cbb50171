//! Target table
//!
//! Tab-delimited input: column 1 is a locus, columns 2..N are alignment
//! file paths. Lines are kept raw and cleaned one at a time so that the
//! runner can skip a bad line without losing its position in the file.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::{IgvError, Result};
use crate::locus::{strip_chr_prefix, Locus, LocusError};

/// Extension a file reference must carry to be loaded
pub const ALIGNMENT_EXTENSION: &str = "bam";

/// Chromosome-looking token, a colon, a tab, then something non-blank
static LINE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([0-9]{1,2}|X|Y|MT):[^\t]*\t.*\S").unwrap());

/// Why a line was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineRejection {
    #[error("the line does not start with a locus followed by a tab")]
    Structure,

    #[error("the locus appears to be malformed ({0})")]
    Locus(#[from] LocusError),
}

/// Why a file reference was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("file is missing")]
    Missing,

    #[error("not a .bam file")]
    WrongExtension,
}

/// One cleaned row of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLine {
    pub number: usize,
    pub locus: Locus,
    /// Candidate paths in column order; blank columns are kept as empty strings
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineParse {
    Blank,
    Rejected {
        line: usize,
        token: String,
        reason: LineRejection,
    },
    Target(TargetLine),
}

impl TargetLine {
    /// Non-empty references that point at an existing alignment file
    pub fn valid_files(&self) -> Vec<&str> {
        self.files
            .iter()
            .map(String::as_str)
            .filter(|f| !f.is_empty() && check_alignment_file(Path::new(f)).is_ok())
            .collect()
    }

    pub fn has_multiple_valid_files(&self) -> bool {
        self.valid_files().len() > 1
    }
}

/// Clean one raw line: trim, drop `chr`, check shape, then the locus grammar.
pub fn parse_line(raw: &str, number: usize) -> LineParse {
    let line = raw.trim_matches(|c| matches!(c, '\r' | '\n' | '\t' | ' '));
    if line.is_empty() {
        return LineParse::Blank;
    }

    let token = line.split('\t').next().unwrap_or_default().to_string();
    let line = strip_chr_prefix(line);
    if !LINE_SHAPE.is_match(line) {
        return LineParse::Rejected {
            line: number,
            token,
            reason: LineRejection::Structure,
        };
    }

    let mut columns = line.split('\t');
    let locus = match Locus::parse(columns.next().unwrap_or_default()) {
        Ok(locus) => locus,
        Err(e) => {
            return LineParse::Rejected {
                line: number,
                token,
                reason: e.into(),
            }
        }
    };

    LineParse::Target(TargetLine {
        number,
        locus,
        files: columns.map(|c| c.trim().to_string()).collect(),
    })
}

/// Existence first, then extension
pub fn check_alignment_file(path: &Path) -> std::result::Result<(), FileRejection> {
    if !path.is_file() {
        return Err(FileRejection::Missing);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(ALIGNMENT_EXTENSION) => Ok(()),
        _ => Err(FileRejection::WrongExtension),
    }
}

/// The raw lines of an input table
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    pub path: PathBuf,
    lines: Vec<String>,
}

impl TargetTable {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| IgvError::TableUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Every line with its 1-based number, cleaned
    pub fn parsed(&self) -> impl Iterator<Item = LineParse> + '_ {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_line(raw, i + 1))
    }

    /// Whether any line would need the grouped-vs-single decision
    pub fn has_multi_file_line(&self) -> bool {
        self.parsed().any(|parsed| match parsed {
            LineParse::Target(target) => target.has_multiple_valid_files(),
            _ => false,
        })
    }
}

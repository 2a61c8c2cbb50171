//! Locus grammar
//!
//! Accepts `[chr]<chromosome>:<start>[-<end>]` where the chromosome is one of
//! 1..22, X, Y or MT (any case). The `chr` prefix is dropped on parse and only
//! put back by [`Locus::igv_target`] when talking to the viewer.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Why a locus token was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocusError {
    #[error("locus is empty")]
    Empty,

    #[error("'{0}' has no ':' between chromosome and position")]
    MissingPosition(String),

    #[error("unknown chromosome '{0}' (expected 1-22, X, Y or MT)")]
    UnknownChromosome(String),

    #[error("position '{0}' is not a positive integer")]
    InvalidPosition(String),

    #[error("range end {end} is before start {start}")]
    InvertedRange { start: u64, end: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chromosome {
    Autosome(u8),
    X,
    Y,
    Mt,
}

impl FromStr for Chromosome {
    type Err = LocusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "X" => return Ok(Chromosome::X),
            "Y" => return Ok(Chromosome::Y),
            "MT" => return Ok(Chromosome::Mt),
            _ => {}
        }

        let unknown = || LocusError::UnknownChromosome(s.to_string());
        if s.is_empty() || s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        match s.parse::<u8>() {
            Ok(n @ 1..=22) => Ok(Chromosome::Autosome(n)),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chromosome::Autosome(n) => write!(f, "{}", n),
            Chromosome::X => write!(f, "X"),
            Chromosome::Y => write!(f, "Y"),
            Chromosome::Mt => write!(f, "MT"),
        }
    }
}

/// A validated genomic coordinate, stored without the `chr` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub chromosome: Chromosome,
    pub start: u64,
    pub end: Option<u64>,
}

impl Locus {
    pub fn parse(token: &str) -> Result<Self, LocusError> {
        let token = strip_chr_prefix(token.trim());
        if token.is_empty() {
            return Err(LocusError::Empty);
        }

        let (chrom, position) = token
            .split_once(':')
            .ok_or_else(|| LocusError::MissingPosition(token.to_string()))?;
        let chromosome = chrom.parse::<Chromosome>()?;

        let (start, end) = match position.split_once('-') {
            Some((start, end)) => (parse_position(start)?, Some(parse_position(end)?)),
            None => (parse_position(position)?, None),
        };
        if let Some(end) = end {
            if end < start {
                return Err(LocusError::InvertedRange { start, end });
            }
        }

        Ok(Self {
            chromosome,
            start,
            end,
        })
    }

    /// Locus as sent to `goto`, e.g. `chr1:12345`
    pub fn igv_target(&self) -> String {
        format!("chr{}", self)
    }

    /// Locus as used in snapshot file names, e.g. `1c12345`
    pub fn file_prefix(&self) -> String {
        self.to_string().replace(':', "c")
    }
}

impl FromStr for Locus {
    type Err = LocusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locus::parse(s)
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chromosome, self.start)?;
        if let Some(end) = self.end {
            write!(f, "-{}", end)?;
        }
        Ok(())
    }
}

/// Drop a leading `chr` (any case)
pub fn strip_chr_prefix(s: &str) -> &str {
    match s.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &s[3..],
        _ => s,
    }
}

fn parse_position(s: &str) -> Result<u64, LocusError> {
    let invalid = || LocusError::InvalidPosition(s.to_string());
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match s.parse::<u64>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(n) => Ok(n),
    }
}

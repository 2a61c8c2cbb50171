//! Preferences file
//!
//! Plain text, one value per line, guarded by a fixed header:
//!
//! ```text
//! Order: host, port number, genome, default directory
//! localhost
//! 60151
//! hg19
//! autoIGVimages
//! ```
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Command-line flags (`--host`, `--port`, `--genome`)
//! 2. Preferences file
//! 3. Defaults

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::channel::{DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{IgvError, Result};
use crate::prompt::Prompter;

/// First line of every preferences file
pub const PREFS_HEADER: &str = "Order: host, port number, genome, default directory";

pub const DEFAULT_PREFS_FILE: &str = "autoIGVprefs.ini";

pub const DEFAULT_GENOME: &str = "hg19";

/// Relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "autoIGVimages";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefsError {
    #[error("first line is not the preferences header")]
    BadHeader,

    #[error("no {0} line")]
    Missing(&'static str),

    #[error("port '{0}' is not a port number")]
    BadPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub host: String,
    pub port: u16,
    pub genome: String,
    pub default_directory: PathBuf,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            genome: DEFAULT_GENOME.to_string(),
            default_directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Preferences {
    /// The header is checked before anything else; a bad header rejects the file
    pub fn parse(text: &str) -> std::result::Result<Self, PrefsError> {
        let mut lines = text.lines();
        let header = lines.next().unwrap_or_default();
        if header.trim_matches(|c| matches!(c, '\r' | '\n' | '\t' | ' ')) != PREFS_HEADER {
            return Err(PrefsError::BadHeader);
        }

        let mut values = lines
            .map(|l| l.trim_end_matches(|c| matches!(c, '\r' | '\n' | '\t' | ' ')))
            .filter(|l| !l.is_empty());
        let mut next = |name: &'static str| values.next().ok_or(PrefsError::Missing(name));

        let host = next("host")?.to_string();
        let port_text = next("port")?;
        let port = port_text
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| PrefsError::BadPort(port_text.to_string()))?;
        let genome = next("genome")?.to_string();
        let default_directory = PathBuf::from(next("default directory")?);

        Ok(Self {
            host,
            port,
            genome,
            default_directory,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}",
            PREFS_HEADER,
            self.host,
            self.port,
            self.genome,
            self.default_directory.display()
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |reason: String| IgvError::InvalidPreferences {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::parse(&text).map_err(|e| invalid(e.to_string()))
    }

    /// Write a new file; never replaces an existing one
    pub fn save_new(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => IgvError::PreferencesExist {
                    path: path.to_path_buf(),
                },
                _ => IgvError::Io(e),
            })?;
        file.write_all(self.render().as_bytes())?;
        Ok(())
    }

    /// Command-line values win over the file
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        genome: Option<String>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(genome) = genome {
            self.genome = genome;
        }
        self
    }
}

/// Find usable preferences, creating the default file interactively if needed.
///
/// 1. A user-specified file that loads is used as-is.
/// 2. If it does not load, the operator may fall back to the default file.
/// 3. An existing but broken default file is fatal; it is never overwritten.
/// 4. A missing default file is created from the operator's answers.
pub fn resolve_preferences<R: BufRead, W: Write>(
    user_path: Option<&Path>,
    default_path: &Path,
    prompter: &mut Prompter<R, W>,
) -> Result<Preferences> {
    if let Some(path) = user_path {
        match Preferences::load(path) {
            Ok(prefs) => return Ok(prefs),
            Err(e) => {
                warn!("{}", e);
                prompter.say("Unable to load user-specified preferences.")?;
                if !prompter.yes_no("Proceed using default preferences?")? {
                    return Err(IgvError::Aborted {
                        reason: "OK. Bye.".to_string(),
                    });
                }
            }
        }
    }

    if default_path.exists() {
        return Preferences::load(default_path);
    }

    prompter.say("No preferences file found.")?;
    let prefs = prompter.create_preferences()?;
    prefs.save_new(default_path)?;
    Ok(prefs)
}

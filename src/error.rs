//! Error types with fix suggestions
//!
//! Every variant is fatal for the run: recoverable conditions (bad lines,
//! missing files, rejected loads) never become an `IgvError`, they are
//! logged and skipped by the runner.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IgvError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum IgvError {
    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────
    #[error("Unable to connect to IGV at {host}:{port}: {reason}")]
    ConnectionRefused {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Connection with IGV lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Timeout waiting for IGV to respond (waited {waited:?})")]
    Timeout { waited: Duration },

    // ─────────────────────────────────────────────────────────────
    // Protocol
    // ─────────────────────────────────────────────────────────────
    #[error("IGV returned an unexpected response to a test command: expected '{expected}', got '{received}'")]
    HandshakeMismatch { expected: String, received: String },

    #[error("The genome requested is not valid. IGV response: {reply}")]
    GenomeNotFound { reply: String },

    #[error("IGV is unable to save to the desired directory. IGV response: {reply}")]
    SnapshotDirectoryMissing { reply: String },

    #[error("IGV rejected the '{command}' command: {reply}")]
    SetupRejected { command: String, reply: String },

    #[error("Problem saving snapshot of {locus} for {file}: {reply}")]
    SnapshotFailed {
        locus: String,
        file: String,
        reply: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Local setup
    // ─────────────────────────────────────────────────────────────
    #[error("Unable to load preferences from {path}: {reason}")]
    InvalidPreferences { path: PathBuf, reason: String },

    #[error("Preferences file {path} already exists")]
    PreferencesExist { path: PathBuf },

    #[error("Output directory {path} already exists")]
    SessionDirectoryExists { path: PathBuf },

    #[error("Unable to make the directory {path}: {reason}")]
    SessionDirectoryCreate { path: PathBuf, reason: String },

    #[error("Could not read target list {path}: {reason}")]
    TableUnreadable { path: PathBuf, reason: String },

    #[error("Run aborted: {reason}")]
    Aborted { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IgvError {
    /// True for errors raised by the viewer session rather than local setup
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            IgvError::ConnectionRefused { .. }
                | IgvError::ConnectionLost { .. }
                | IgvError::Timeout { .. }
                | IgvError::HandshakeMismatch { .. }
                | IgvError::GenomeNotFound { .. }
                | IgvError::SnapshotDirectoryMissing { .. }
                | IgvError::SetupRejected { .. }
                | IgvError::SnapshotFailed { .. }
        )
    }
}

impl FixSuggestion for IgvError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            IgvError::ConnectionRefused { .. } => Some(
                "Be sure that IGV is running and configured to accept connections on its port (default 60151)",
            ),
            IgvError::ConnectionLost { .. } => {
                Some("Please confirm that IGV is still running properly")
            }
            IgvError::Timeout { .. } => Some(
                "Has IGV locked up or been terminated, or is another application already communicating with it on that port?",
            ),
            IgvError::HandshakeMismatch { .. } => {
                Some("Check that the host and port point at IGV and not another service")
            }
            IgvError::GenomeNotFound { .. } => Some(
                "If the genome came from your default preferences, delete the preferences file and restart",
            ),
            IgvError::SnapshotDirectoryMissing { .. } => {
                Some("Check permissions or whether the directory name is invalid")
            }
            IgvError::SetupRejected { .. } => Some("See the IGV response above for details"),
            IgvError::SnapshotFailed { .. } => Some(
                "Confirm the output directory is writable by IGV; also try removing non-word characters or whitespace from the file name",
            ),
            IgvError::InvalidPreferences { .. } => {
                Some("Delete or repair the preferences file and restart this program")
            }
            IgvError::PreferencesExist { .. } => {
                Some("Delete the existing preferences file and start again")
            }
            IgvError::SessionDirectoryExists { .. } => {
                Some("Wait a minute before rerunning or choose another output directory with -d")
            }
            IgvError::SessionDirectoryCreate { .. } => {
                Some("Run with appropriate permissions or create the directory using your file manager")
            }
            IgvError::TableUnreadable { .. } => Some("Check the -f file path and permissions"),
            IgvError::Aborted { .. } => None,
            IgvError::Io(_) => Some("Check file path and permissions"),
        }
    }
}

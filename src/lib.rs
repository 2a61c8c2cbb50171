//! autoigv - batch snapshot capture for IGV over its remote-control port

pub mod channel;
pub mod command;
pub mod error;
pub mod events;
pub mod locus;
pub mod output_dir;
pub mod prefs;
pub mod prompt;
pub mod response;
pub mod runner;
pub mod table;

pub use channel::{Channel, ChannelConfig, ScriptedChannel, TcpChannel};
pub use command::{Command, IgvSession, Outcome};
pub use error::{FixSuggestion, IgvError, Result};
pub use events::{Event, EventKind, EventLog};
pub use locus::Locus;
pub use prefs::Preferences;
pub use prompt::Prompter;
pub use runner::{CaptureMode, RunConfig, RunSummary, Runner, SessionState};
pub use table::TargetTable;

//! IGV command set
//!
//! Each command is one wire line answered by one reply. [`IgvSession`]
//! runs the exchange, classifies the reply and turns it into an
//! [`Outcome`]. Replies that can never succeed later in the run come back
//! as `Err(IgvError)` no matter which command produced them.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::channel::Channel;
use crate::error::Result;
use crate::events::{EventKind, EventLog};
use crate::locus::Locus;
use crate::response::{classify, clean_reply, Reply};

/// Source token used in grouped snapshot names
pub const GROUP_MARKER: &str = "all";

const HANDSHAKE_LITERAL: &str = "echo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Echo,
    New,
    Genome(String),
    SnapshotDirectory(PathBuf),
    Goto(Locus),
    Load(String),
    Collapse,
    /// Full file name, extension included
    Snapshot(String),
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Echo => "echo",
            Command::New => "new",
            Command::Genome(_) => "genome",
            Command::SnapshotDirectory(_) => "snapshotDirectory",
            Command::Goto(_) => "goto",
            Command::Load(_) => "load",
            Command::Collapse => "collapse",
            Command::Snapshot(_) => "snapshot",
        }
    }

    /// The line sent to IGV, without the trailing newline
    pub fn wire_line(&self) -> String {
        match self {
            Command::Echo | Command::New | Command::Collapse => self.verb().to_string(),
            Command::Genome(id) => format!("genome {}", id),
            Command::SnapshotDirectory(dir) => format!("snapshotDirectory {}", dir.display()),
            Command::Goto(locus) => format!("goto {}", locus.igv_target()),
            Command::Load(path) => format!("load {}", file_url(path)),
            Command::Snapshot(name) => format!("snapshot {}", name),
        }
    }
}

/// Result of a command that did not hit a fatal condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// IGV answered with a recoverable error
    Rejected(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// What a snapshot is named after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource<'a> {
    File(&'a str),
    Group,
}

/// `file://` URL with spaces escaped and Windows separators flipped
pub fn file_url(path: &str) -> String {
    format!("file://{}", path.replace(' ', "%20").replace('\\', "/"))
}

/// `<locus with ':' → 'c'><base name>.png`, whitespace replaced by `_`
pub fn snapshot_filename(locus: &Locus, source: SnapshotSource<'_>) -> String {
    let base = match source {
        SnapshotSource::File(path) => path.rsplit(['/', '\\']).next().unwrap_or(path),
        SnapshotSource::Group => GROUP_MARKER,
    };
    let name: String = format!("{}{}", locus.file_prefix(), base)
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}.png", name)
}

/// Absolute paths pass through; relative ones are joined to the working directory
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// An open channel plus the record of what happened over it
pub struct IgvSession<C: Channel> {
    channel: C,
    events: EventLog,
    /// Keep every command and reply in the event log
    traffic: bool,
}

impl<C: Channel> IgvSession<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            events: EventLog::new(),
            traffic: true,
        }
    }

    /// Without traffic recording the log only holds state changes, skips
    /// and snapshots, so it stays proportional to the table.
    pub fn record_traffic(mut self, enabled: bool) -> Self {
        self.traffic = enabled;
        self
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn record(&mut self, kind: EventKind) {
        self.events.push(kind);
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    pub async fn close(&mut self) {
        self.channel.close().await;
    }

    async fn exchange(&mut self, command: &Command, expected: Option<&str>) -> Result<Reply> {
        let line = command.wire_line();
        if self.traffic {
            self.events.push(EventKind::CommandSent {
                command: line.clone(),
            });
        }
        self.channel.send(&line).await?;

        let raw = self.channel.receive().await?;
        if self.traffic {
            self.events.push(EventKind::ReplyReceived {
                reply: clean_reply(&raw).to_string(),
            });
        }
        Ok(classify(&raw, expected))
    }

    /// Send one command and map the reply
    pub async fn execute(&mut self, command: Command) -> Result<Outcome> {
        match self.exchange(&command, None).await? {
            Reply::Acknowledged | Reply::ExpectedEcho => Ok(Outcome::Success),
            Reply::Unrecognized(text) => {
                warn!(command = command.verb(), "Possible error: IGV says \"{}\"", text);
                Ok(Outcome::Success)
            }
            Reply::RecoverableError(message) => {
                warn!(command = command.verb(), "IGV returned the message: {}", message);
                Ok(Outcome::Rejected(message))
            }
            Reply::FatalError(fatal) => Err(fatal.into()),
        }
    }

    /// `echo` must come back verbatim before anything else is trusted
    pub async fn handshake(&mut self) -> Result<()> {
        match self.exchange(&Command::Echo, Some(HANDSHAKE_LITERAL)).await? {
            Reply::FatalError(fatal) => Err(fatal.into()),
            _ => Ok(()),
        }
    }

    pub async fn new_session(&mut self) -> Result<Outcome> {
        self.execute(Command::New).await
    }

    pub async fn set_genome(&mut self, genome: &str) -> Result<Outcome> {
        self.execute(Command::Genome(genome.to_string())).await
    }

    /// IGV does not know our working directory, so relative paths are resolved first
    pub async fn set_snapshot_directory(&mut self, dir: &Path) -> Result<Outcome> {
        let dir = resolve_path(dir)?;
        debug!(dir = %dir.display(), "snapshot directory");
        self.execute(Command::SnapshotDirectory(dir)).await
    }

    pub async fn goto(&mut self, locus: &Locus) -> Result<Outcome> {
        self.execute(Command::Goto(locus.clone())).await
    }

    pub async fn load_file(&mut self, path: &str) -> Result<Outcome> {
        self.execute(Command::Load(path.to_string())).await
    }

    pub async fn collapse(&mut self) -> Result<Outcome> {
        self.execute(Command::Collapse).await
    }

    pub async fn snapshot(&mut self, filename: &str) -> Result<Outcome> {
        self.execute(Command::Snapshot(filename.to_string())).await
    }

    /// `collapse` then `snapshot`; stops at the first rejection
    pub async fn capture(&mut self, filename: &str) -> Result<Outcome> {
        match self.collapse().await? {
            Outcome::Success => self.snapshot(filename).await,
            rejected => Ok(rejected),
        }
    }
}

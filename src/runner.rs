//! Session runner
//!
//! Drives one IGV session through the whole target table:
//! `Init → Connected → GenomeSet → DirectorySet → Iterating → Closed`,
//! or `Aborted` from anywhere on a fatal error.
//!
//! Failure policy per target line:
//! - bad line, bad locus, rejected `goto` → skip the line
//! - missing file, rejected `load` → skip the file
//! - rejected `new`, collapse or snapshot → abort the run

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::channel::Channel;
use crate::command::{resolve_path, snapshot_filename, IgvSession, Outcome, SnapshotSource};
use crate::error::{IgvError, Result};
use crate::events::{EventKind, EventLog};
use crate::table::{check_alignment_file, LineParse, LineRejection, TargetLine, TargetTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    Connected,
    GenomeSet,
    DirectorySet,
    Iterating,
    Closed,
    Aborted,
}

/// How files sharing a locus are imaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CaptureMode {
    /// All files of a line in one image
    Grouped,
    /// One image per file
    Single,
    /// Both of the above
    Both,
}

impl CaptureMode {
    pub fn grouped(self) -> bool {
        matches!(self, CaptureMode::Grouped | CaptureMode::Both)
    }

    pub fn single(self) -> bool {
        matches!(self, CaptureMode::Single | CaptureMode::Both)
    }

    /// Menu answer: 1 grouped, 2 single, 3 both
    pub fn from_choice(answer: &str) -> Option<Self> {
        match answer.trim() {
            "1" => Some(CaptureMode::Grouped),
            "2" => Some(CaptureMode::Single),
            "3" => Some(CaptureMode::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub genome: String,
    pub snapshot_dir: PathBuf,
    pub mode: CaptureMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub lines: usize,
    pub targets_imaged: usize,
    pub lines_skipped: usize,
    pub files_skipped: usize,
    pub snapshots: usize,
    pub elapsed: Duration,
    pub output_dir: PathBuf,
}

pub struct Runner<C: Channel> {
    session: IgvSession<C>,
    config: RunConfig,
    state: SessionState,
}

impl<C: Channel> Runner<C> {
    pub fn new(session: IgvSession<C>, config: RunConfig) -> Self {
        Self {
            session,
            config,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn events(&self) -> &EventLog {
        self.session.events()
    }

    /// Run the whole table. On any error the session is closed before returning.
    pub async fn run(&mut self, table: &TargetTable) -> Result<RunSummary> {
        match self.drive(table).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.abort(&e).await;
                Err(e)
            }
        }
    }

    async fn drive(&mut self, table: &TargetTable) -> Result<RunSummary> {
        self.setup().await?;
        self.transition(SessionState::Iterating);

        let mut imaged = 0;
        for parsed in table.parsed() {
            match parsed {
                LineParse::Blank => {}
                LineParse::Rejected {
                    line,
                    token,
                    reason,
                } => self.skip_line(table, line, &token, &reason),
                LineParse::Target(target) => {
                    if self.image_target(&target, table.len()).await? {
                        imaged += 1;
                    }
                }
            }
        }

        self.session.close().await;
        self.transition(SessionState::Closed);

        let events = self.session.events();
        let summary = RunSummary {
            lines: table.len(),
            targets_imaged: imaged,
            lines_skipped: events.skipped_lines(),
            files_skipped: events.skipped_files(),
            snapshots: events.snapshot_count(),
            elapsed: Duration::from_millis(events.elapsed_ms()),
            output_dir: self.config.snapshot_dir.clone(),
        };
        self.session.record(EventKind::RunCompleted {
            lines: summary.lines,
            snapshots: summary.snapshots,
            duration_ms: summary.elapsed.as_millis() as u64,
        });
        info!(
            snapshots = summary.snapshots,
            skipped = summary.lines_skipped,
            "run completed"
        );
        Ok(summary)
    }

    async fn setup(&mut self) -> Result<()> {
        self.session.handshake().await?;
        self.transition(SessionState::Connected);

        let genome = self.config.genome.clone();
        required("genome", self.session.set_genome(&genome).await?)?;
        self.transition(SessionState::GenomeSet);

        let dir = self.config.snapshot_dir.clone();
        required("snapshotDirectory", self.session.set_snapshot_directory(&dir).await?)?;
        self.transition(SessionState::DirectorySet);
        Ok(())
    }

    async fn abort(&mut self, error: &IgvError) {
        self.session.record(EventKind::RunAborted {
            error: error.to_string(),
        });
        if self.session.is_open() {
            self.session.close().await;
        }
        self.transition(SessionState::Aborted);
    }

    fn transition(&mut self, to: SessionState) {
        self.session.record(EventKind::StateChanged {
            from: self.state,
            to,
        });
        info!(from = ?self.state, to = ?to, "session state");
        self.state = to;
    }

    fn skip_line(&mut self, table: &TargetTable, line: usize, token: &str, reason: &LineRejection) {
        match reason {
            LineRejection::Structure => warn!(
                line,
                "Skipped line {}: {} as the line in {} appears to have formatting errors",
                line,
                token,
                table.path.display()
            ),
            LineRejection::Locus(e) => warn!(
                line,
                "Skipped line {}: {} as the locus appears to be malformed ({})", line, token, e
            ),
        }
        self.session.record(EventKind::LineSkipped {
            line,
            token: token.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Returns false when the line was skipped at `goto`
    async fn image_target(&mut self, target: &TargetLine, total: usize) -> Result<bool> {
        let locus = &target.locus;
        if let Outcome::Rejected(reply) = self.session.goto(locus).await? {
            warn!(
                line = target.number,
                "Error going to locus {}. Skipping to next locus.", locus
            );
            self.session.record(EventKind::LineSkipped {
                line: target.number,
                token: locus.to_string(),
                reason: format!("goto rejected: {}", reply),
            });
            return Ok(false);
        }

        let files = self.usable_files(target);
        let mode = self.config.mode;
        if mode.grouped() && (files.len() > 1 || !mode.single()) {
            info!(
                "Processing locus {} of {} to take group photo",
                target.number, total
            );
            self.capture_group(target, &files).await?;
        }
        if mode.single() {
            self.capture_singles(target, &files, total).await?;
        }
        Ok(true)
    }

    async fn capture_group(&mut self, target: &TargetLine, files: &[&str]) -> Result<()> {
        required("new", self.session.new_session().await?)?;

        for file in files {
            self.load(target, file).await?;
        }

        let filename = snapshot_filename(&target.locus, SnapshotSource::Group);
        self.snapshot(target, "all files", filename, true).await
    }

    async fn capture_singles(
        &mut self,
        target: &TargetLine,
        files: &[&str],
        total: usize,
    ) -> Result<()> {
        for (i, file) in files.iter().copied().enumerate() {
            info!(
                "Processing locus {} of {} file number {} of {}",
                target.number,
                total,
                i + 1,
                files.len()
            );

            required("new", self.session.new_session().await?)?;
            if !self.load(target, file).await? {
                continue;
            }

            let filename = snapshot_filename(&target.locus, SnapshotSource::File(file));
            self.snapshot(target, file, filename, false).await?;
        }
        Ok(())
    }

    /// Non-blank references that pass the file check, in column order.
    /// Each bad reference is recorded once per line.
    fn usable_files<'t>(&mut self, target: &'t TargetLine) -> Vec<&'t str> {
        let mut usable = Vec::new();
        for file in target.files.iter().filter(|f| !f.is_empty()) {
            match check_alignment_file(Path::new(file)) {
                Ok(()) => usable.push(file.as_str()),
                Err(reason) => {
                    warn!(
                        line = target.number,
                        "Skipped {} on line {} (locus: {}): {}",
                        file,
                        target.number,
                        target.locus,
                        reason
                    );
                    self.session.record(EventKind::FileSkipped {
                        line: target.number,
                        file: file.clone(),
                        reason: reason.to_string(),
                    });
                }
            }
        }
        usable
    }

    /// Returns false when IGV refused the file
    async fn load(&mut self, target: &TargetLine, file: &str) -> Result<bool> {
        let path = resolve_path(Path::new(file))?;
        match self.session.load_file(&path.to_string_lossy()).await? {
            Outcome::Success => Ok(true),
            Outcome::Rejected(reply) => {
                warn!(
                    line = target.number,
                    "Error loading file {}. Skipping to next file.", file
                );
                self.session.record(EventKind::FileSkipped {
                    line: target.number,
                    file: file.to_string(),
                    reason: format!("load rejected: {}", reply),
                });
                Ok(false)
            }
        }
    }

    async fn snapshot(
        &mut self,
        target: &TargetLine,
        source: &str,
        filename: String,
        grouped: bool,
    ) -> Result<()> {
        match self.session.capture(&filename).await? {
            Outcome::Success => {
                self.session.record(EventKind::SnapshotSaved {
                    line: target.number,
                    filename,
                    grouped,
                });
                Ok(())
            }
            Outcome::Rejected(reply) => Err(IgvError::SnapshotFailed {
                locus: target.locus.to_string(),
                file: source.to_string(),
                reply,
            }),
        }
    }
}

fn required(command: &str, outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Success => Ok(()),
        Outcome::Rejected(reply) => Err(IgvError::SetupRejected {
            command: command.to_string(),
            reply,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flags() {
        assert!(CaptureMode::Grouped.grouped());
        assert!(!CaptureMode::Grouped.single());
        assert!(!CaptureMode::Single.grouped());
        assert!(CaptureMode::Single.single());
        assert!(CaptureMode::Both.grouped() && CaptureMode::Both.single());
    }

    #[test]
    fn mode_from_menu_choice() {
        assert_eq!(CaptureMode::from_choice("1"), Some(CaptureMode::Grouped));
        assert_eq!(CaptureMode::from_choice(" 2\n"), Some(CaptureMode::Single));
        assert_eq!(CaptureMode::from_choice("3"), Some(CaptureMode::Both));
        assert_eq!(CaptureMode::from_choice("4"), None);
        assert_eq!(CaptureMode::from_choice(""), None);
    }

    #[test]
    fn required_maps_rejection() {
        assert!(required("genome", Outcome::Success).is_ok());
        let err = required("new", Outcome::Rejected("ERROR: busy".into())).unwrap_err();
        assert!(matches!(err, IgvError::SetupRejected { command, .. } if command == "new"));
    }
}

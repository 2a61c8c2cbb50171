//! Runner tests against a scripted IGV
//!
//! Every test builds a small target table pointing at real (empty) .bam
//! files in a temp dir, runs it through a `ScriptedChannel` and checks the
//! exact command traffic plus the resulting event log.

use std::fs;
use std::path::PathBuf;

use autoigv::channel::{ChannelLog, ScriptedChannel, ScriptedReply};
use autoigv::{
    CaptureMode, EventKind, IgvError, IgvSession, RunConfig, Runner, SessionState, TargetTable,
};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    out: PathBuf,
    a: String,
    b: String,
    c: String,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let bam = |name: &str| {
            let path = dir.path().join(name);
            fs::write(&path, b"").unwrap();
            path.display().to_string()
        };
        let (a, b, c) = (bam("a.bam"), bam("b.bam"), bam("c.bam"));
        let out = dir.path().join("IGVimages.202401010000");
        Self {
            _dir: dir,
            out,
            a,
            b,
            c,
        }
    }

    /// Line 1 has one file, line 2 has two
    fn two_line_table(&self) -> TargetTable {
        self.table(&format!(
            "1:100\t{}\nchr2:200\t{}\t{}\n",
            self.a, self.b, self.c
        ))
    }

    fn table(&self, text: &str) -> TargetTable {
        TargetTable::from_text("targets.txt", text)
    }

    fn runner(
        &self,
        channel: ScriptedChannel,
        mode: CaptureMode,
    ) -> (Runner<ScriptedChannel>, ChannelLog) {
        let log = channel.log();
        let runner = Runner::new(
            IgvSession::new(channel),
            RunConfig {
                genome: "hg19".to_string(),
                snapshot_dir: self.out.clone(),
                mode,
            },
        );
        (runner, log)
    }

    fn setup_lines(&self) -> Vec<String> {
        vec![
            "echo".to_string(),
            "genome hg19".to_string(),
            format!("snapshotDirectory {}", self.out.display()),
        ]
    }

    fn load(&self, path: &str) -> String {
        format!("load file://{}", path)
    }
}

fn snapshots(runner: &Runner<ScriptedChannel>) -> Vec<String> {
    runner
        .events()
        .snapshots()
        .map(|(name, _)| name.to_string())
        .collect()
}

// ============================================================================
// Capture modes
// ============================================================================

#[tokio::test]
async fn test_single_mode_sequence() {
    let fx = Fixture::new();
    let (mut runner, log) = fx.runner(ScriptedChannel::new(), CaptureMode::Single);

    let summary = runner.run(&fx.two_line_table()).await.unwrap();

    let mut expected = fx.setup_lines();
    expected.extend([
        "goto chr1:100".to_string(),
        "new".to_string(),
        fx.load(&fx.a),
        "collapse".to_string(),
        "snapshot 1c100a.bam.png".to_string(),
        "goto chr2:200".to_string(),
        "new".to_string(),
        fx.load(&fx.b),
        "collapse".to_string(),
        "snapshot 2c200b.bam.png".to_string(),
        "new".to_string(),
        fx.load(&fx.c),
        "collapse".to_string(),
        "snapshot 2c200c.bam.png".to_string(),
    ]);
    assert_eq!(log.sent(), expected);
    assert_eq!(summary.snapshots, 3);
    assert_eq!(summary.targets_imaged, 2);
    assert_eq!(summary.output_dir, fx.out);
    assert_eq!(runner.state(), SessionState::Closed);
    assert!(log.is_closed());
}

#[tokio::test]
async fn test_grouped_mode_groups_every_line() {
    let fx = Fixture::new();
    let (mut runner, log) = fx.runner(ScriptedChannel::new(), CaptureMode::Grouped);

    let summary = runner.run(&fx.two_line_table()).await.unwrap();

    assert_eq!(summary.snapshots, 2);
    assert_eq!(snapshots(&runner), vec!["1c100all.png", "2c200all.png"]);
    assert_eq!(log.count("new"), 2);
    assert_eq!(log.count("load"), 3);
}

#[tokio::test]
async fn test_both_mode_groups_only_multi_file_lines() {
    let fx = Fixture::new();
    let (mut runner, log) = fx.runner(ScriptedChannel::new(), CaptureMode::Both);

    let summary = runner.run(&fx.two_line_table()).await.unwrap();

    assert_eq!(summary.snapshots, 4);
    assert_eq!(
        snapshots(&runner),
        vec![
            "1c100a.bam.png",
            "2c200all.png",
            "2c200b.bam.png",
            "2c200c.bam.png"
        ]
    );

    let grouped: Vec<bool> = runner.events().snapshots().map(|(_, g)| g).collect();
    assert_eq!(grouped, vec![false, true, false, false]);

    // line 2 group photo loads both files into one view
    let sent = log.sent();
    let group_start = sent.iter().position(|l| l == "goto chr2:200").unwrap();
    assert_eq!(
        &sent[group_start + 1..group_start + 6],
        &[
            "new".to_string(),
            fx.load(&fx.b),
            fx.load(&fx.c),
            "collapse".to_string(),
            "snapshot 2c200all.png".to_string(),
        ]
    );
}

// ============================================================================
// Skips
// ============================================================================

#[tokio::test]
async fn test_malformed_lines_send_nothing() {
    let fx = Fixture::new();
    let (mut runner, log) = fx.runner(ScriptedChannel::new(), CaptureMode::Single);
    let table = fx.table("hello world\n\nchrZ:5\tx.bam\n1:abc\tx.bam\n23:10\tx.bam\n");

    let summary = runner.run(&table).await.unwrap();

    assert_eq!(log.sent(), fx.setup_lines());
    assert_eq!(summary.lines, 5);
    assert_eq!(summary.lines_skipped, 4);
    assert_eq!(summary.snapshots, 0);
    assert_eq!(runner.state(), SessionState::Closed);

    let skipped: Vec<usize> = runner
        .events()
        .events()
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::LineSkipped { line, .. } => Some(*line),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![1, 3, 4, 5]);
}

#[tokio::test]
async fn test_rejected_goto_skips_line() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new()
        .with_reply("goto chr1", ScriptedReply::line("ERROR: invalid locus"));
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let summary = runner.run(&fx.two_line_table()).await.unwrap();

    assert_eq!(summary.lines_skipped, 1);
    assert_eq!(summary.targets_imaged, 1);
    assert_eq!(summary.snapshots, 2);
    assert!(!log.sent().contains(&fx.load(&fx.a)));
}

#[tokio::test]
async fn test_missing_and_foreign_files_are_skipped() {
    let fx = Fixture::new();
    let text = format!("1:100\t/nowhere/x.bam\t{}\tnotes.txt\n", fx.a);
    let (mut runner, log) = fx.runner(ScriptedChannel::new(), CaptureMode::Single);

    let summary = runner.run(&fx.table(&text)).await.unwrap();

    assert_eq!(summary.files_skipped, 2);
    assert_eq!(summary.snapshots, 1);
    assert_eq!(log.count("load"), 1);
    assert_eq!(log.count("new"), 1);
}

#[tokio::test]
async fn test_grouped_snapshot_taken_even_if_no_file_loads() {
    let fx = Fixture::new();
    let (mut runner, log) = fx.runner(ScriptedChannel::new(), CaptureMode::Grouped);

    let summary = runner.run(&fx.table("3:50\t/nowhere/x.bam\n")).await.unwrap();

    assert_eq!(log.count("load"), 0);
    assert_eq!(snapshots(&runner), vec!["3c50all.png"]);
    assert_eq!(summary.files_skipped, 1);
}

#[tokio::test]
async fn test_both_mode_counts_missing_file_once() {
    let fx = Fixture::new();
    let text = format!("1:1\t{}\t{}\t/missing/x.bam\n", fx.a, fx.b);
    let (mut runner, log) = fx.runner(ScriptedChannel::new(), CaptureMode::Both);

    let summary = runner.run(&fx.table(&text)).await.unwrap();

    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.snapshots, 3);
    assert_eq!(log.count("load"), 4);
    assert!(!log.sent().iter().any(|l| l.contains("/missing/x.bam")));
}

#[tokio::test]
async fn test_both_mode_counts_refused_file_once() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply(
        fx.load(&fx.c),
        ScriptedReply::line("ERROR: could not load"),
    );
    let (mut runner, _log) = fx.runner(channel, CaptureMode::Both);

    let summary = runner.run(&fx.two_line_table()).await.unwrap();

    assert_eq!(summary.files_skipped, 1);
    assert_eq!(
        snapshots(&runner),
        vec!["1c100a.bam.png", "2c200all.png", "2c200b.bam.png"]
    );
}

#[tokio::test]
async fn test_rejected_load_skips_file() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply(
        fx.load(&fx.b),
        ScriptedReply::line("ERROR: could not load"),
    );
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let summary = runner.run(&fx.two_line_table()).await.unwrap();

    assert_eq!(summary.files_skipped, 1);
    assert_eq!(
        snapshots(&runner),
        vec!["1c100a.bam.png", "2c200c.bam.png"]
    );
    // no snapshot attempt for the refused file
    assert_eq!(log.count("collapse"), 2);
}

// ============================================================================
// Fatal conditions
// ============================================================================

#[tokio::test]
async fn test_rejected_snapshot_aborts_run() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply(
        "snapshot 1c100",
        ScriptedReply::line("ERROR: unable to write"),
    );
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();

    assert!(matches!(err, IgvError::SnapshotFailed { ref locus, .. } if locus == "1:100"));
    assert_eq!(runner.state(), SessionState::Aborted);
    assert!(log.is_closed());
    assert_eq!(log.count("goto"), 1);
    assert!(runner
        .events()
        .events()
        .iter()
        .any(|e| matches!(e.kind, EventKind::RunAborted { .. })));
}

#[tokio::test]
async fn test_missing_directory_is_fatal() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply(
        "snapshotDirectory",
        ScriptedReply::line("ERROR: directory /x does not exist"),
    );
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();

    assert!(matches!(err, IgvError::SnapshotDirectoryMissing { .. }));
    assert_eq!(log.count("goto"), 0);
    assert!(log.is_closed());
}

#[tokio::test]
async fn test_unknown_genome_is_fatal() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply(
        "genome",
        ScriptedReply::line("ERROR: Could not locate genome hg19"),
    );
    let (mut runner, _log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();
    assert!(matches!(err, IgvError::GenomeNotFound { .. }));
}

#[tokio::test]
async fn test_rejected_genome_is_fatal() {
    let fx = Fixture::new();
    let channel =
        ScriptedChannel::new().with_reply("genome", ScriptedReply::line("ERROR: busy"));
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();

    assert!(matches!(err, IgvError::SetupRejected { ref command, .. } if command == "genome"));
    assert_eq!(log.count("snapshotDirectory"), 0);
}

#[tokio::test]
async fn test_rejected_new_is_fatal() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply("new", ScriptedReply::line("ERROR: busy"));
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();

    assert!(matches!(err, IgvError::SetupRejected { ref command, .. } if command == "new"));
    assert_eq!(log.count("load"), 0);
}

#[tokio::test]
async fn test_timeout_closes_session() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply("load", ScriptedReply::Timeout);
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();

    assert!(matches!(err, IgvError::Timeout { .. }));
    assert_eq!(runner.state(), SessionState::Aborted);
    assert!(log.is_closed());
    assert_eq!(log.count("snapshot"), 0);
}

#[tokio::test]
async fn test_disconnect_mid_session_aborts() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply("load", ScriptedReply::Disconnect);
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();

    assert!(matches!(err, IgvError::ConnectionLost { .. }));
    assert_eq!(runner.state(), SessionState::Aborted);
    assert!(log.is_closed());
    assert_eq!(log.count("goto"), 1);
    assert_eq!(log.count("snapshot"), 0);
}

#[tokio::test]
async fn test_handshake_mismatch_stops_before_setup() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new().with_reply("echo", ScriptedReply::line("OK"));
    let (mut runner, log) = fx.runner(channel, CaptureMode::Single);

    let err = runner.run(&fx.two_line_table()).await.unwrap_err();

    assert!(matches!(err, IgvError::HandshakeMismatch { .. }));
    assert_eq!(log.sent(), vec!["echo"]);
}

#[tokio::test]
async fn test_state_transitions_recorded_in_order() {
    let fx = Fixture::new();
    let (mut runner, _log) = fx.runner(ScriptedChannel::new(), CaptureMode::Single);

    runner.run(&fx.two_line_table()).await.unwrap();

    let states: Vec<SessionState> = runner
        .events()
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::StateChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            SessionState::Connected,
            SessionState::GenomeSet,
            SessionState::DirectorySet,
            SessionState::Iterating,
            SessionState::Closed,
        ]
    );
}

#[tokio::test]
async fn test_summary_without_traffic_recording() {
    let fx = Fixture::new();
    let channel = ScriptedChannel::new();
    let log = channel.log();
    let mut runner = Runner::new(
        IgvSession::new(channel).record_traffic(false),
        RunConfig {
            genome: "hg19".to_string(),
            snapshot_dir: fx.out.clone(),
            mode: CaptureMode::Both,
        },
    );

    let summary = runner.run(&fx.two_line_table()).await.unwrap();

    assert_eq!(summary.snapshots, 4);
    assert_eq!(log.count("snapshot"), 4);
    assert!(!runner.events().events().iter().any(|e| matches!(
        e.kind,
        EventKind::CommandSent { .. } | EventKind::ReplyReceived { .. }
    )));
}

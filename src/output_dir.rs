//! Per-run output directory
//!
//! Each run writes into `<base>/IGVimages.YYYYMMDDhhmm`. An existing
//! directory is never reused so earlier images cannot be overwritten.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::error::{IgvError, Result};
use crate::prompt::Prompter;

pub const SESSION_DIR_PREFIX: &str = "IGVimages.";

pub fn session_dir_name(base: &Path, now: NaiveDateTime) -> PathBuf {
    base.join(format!("{}{}", SESSION_DIR_PREFIX, now.format("%Y%m%d%H%M")))
}

/// Create the timestamped directory under `base`, parents included
pub fn create_session_dir(base: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    let dir = session_dir_name(base, now);
    if dir.exists() {
        return Err(IgvError::SessionDirectoryExists { path: dir });
    }

    fs::create_dir_all(&dir).map_err(|e| IgvError::SessionDirectoryCreate {
        path: dir.clone(),
        reason: match e.kind() {
            io::ErrorKind::PermissionDenied => "permission denied".to_string(),
            _ => e.to_string(),
        },
    })?;
    info!(dir = %dir.display(), "created session directory");
    Ok(dir)
}

/// Try the operator's directory, then (with consent) the default one
pub fn resolve_session_dir<R: BufRead, W: Write>(
    requested: Option<&Path>,
    default_base: &Path,
    now: NaiveDateTime,
    prompter: &mut Prompter<R, W>,
) -> Result<PathBuf> {
    if let Some(base) = requested {
        match create_session_dir(base, now) {
            Ok(dir) => return Ok(dir),
            Err(e) => {
                warn!("{}", e);
                prompter.say("Failed to create user-specified directory.")?;
                let question = format!(
                    "Do you want to switch to the default ({})?",
                    default_base.display()
                );
                if !prompter.yes_no(&question)? {
                    return Err(IgvError::Aborted {
                        reason: "OK. Bye.".to_string(),
                    });
                }
            }
        }
    }
    create_session_dir(default_base, now)
}

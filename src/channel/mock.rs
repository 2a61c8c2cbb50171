//! Scripted channel for testing
//!
//! Answers commands from a rule table without a running IGV. `echo` is
//! echoed back and everything else gets `OK` unless a rule says otherwise.
//! Every command sent is recorded in a shared [`ChannelLog`] so tests can
//! inspect the traffic after the channel has been moved into a runner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Channel, DEFAULT_REPLY_TIMEOUT};
use crate::error::{IgvError, Result};

/// What the fake viewer does for a matching command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Line(String),
    /// Never answer
    Timeout,
    /// Drop the connection
    Disconnect,
}

impl ScriptedReply {
    pub fn line(text: impl Into<String>) -> Self {
        ScriptedReply::Line(text.into())
    }
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    reply: ScriptedReply,
    /// `None` applies forever
    remaining: Option<usize>,
}

/// Shared view of what a [`ScriptedChannel`] saw
#[derive(Debug, Clone, Default)]
pub struct ChannelLog {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl ChannelLog {
    /// All command lines in the order they were sent
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Commands whose first word is `verb`
    pub fn count(&self, verb: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.split(' ').next() == Some(verb))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct ScriptedChannel {
    rules: Vec<Rule>,
    in_flight: Option<String>,
    reply_timeout: Duration,
    log: ChannelLog,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            in_flight: None,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            log: ChannelLog::default(),
        }
    }

    /// Reply to every command starting with `prefix`
    pub fn with_reply(mut self, prefix: impl Into<String>, reply: ScriptedReply) -> Self {
        self.rules.push(Rule {
            prefix: prefix.into(),
            reply,
            remaining: None,
        });
        self
    }

    /// Reply to the next `times` commands starting with `prefix`, then fall through
    pub fn with_reply_times(
        mut self,
        prefix: impl Into<String>,
        reply: ScriptedReply,
        times: usize,
    ) -> Self {
        self.rules.push(Rule {
            prefix: prefix.into(),
            reply,
            remaining: Some(times),
        });
        self
    }

    /// Handle for assertions
    pub fn log(&self) -> ChannelLog {
        self.log.clone()
    }

    fn reply_for(&mut self, command: &str) -> ScriptedReply {
        let rule = self.rules.iter_mut().find(|rule| {
            command.starts_with(rule.prefix.as_str()) && rule.remaining != Some(0)
        });
        if let Some(rule) = rule {
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            return rule.reply.clone();
        }

        if command == "echo" {
            ScriptedReply::line("echo")
        } else {
            ScriptedReply::line("OK")
        }
    }
}

impl Default for ScriptedChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send(&mut self, line: &str) -> Result<()> {
        if !self.is_open() {
            return Err(IgvError::ConnectionLost {
                reason: "session already closed".to_string(),
            });
        }
        if let Some(pending) = &self.in_flight {
            return Err(IgvError::ConnectionLost {
                reason: format!("'{}' sent while '{}' awaits a reply", line, pending),
            });
        }
        self.log.sent.lock().unwrap().push(line.to_string());
        self.in_flight = Some(line.to_string());
        Ok(())
    }

    async fn receive(&mut self) -> Result<String> {
        let command = self.in_flight.take().ok_or_else(|| IgvError::ConnectionLost {
            reason: "receive without a command in flight".to_string(),
        })?;

        match self.reply_for(&command) {
            ScriptedReply::Line(text) => Ok(format!("{}\n", text)),
            ScriptedReply::Timeout => Err(IgvError::Timeout {
                waited: self.reply_timeout,
            }),
            ScriptedReply::Disconnect => Err(IgvError::ConnectionLost {
                reason: "IGV closed the connection".to_string(),
            }),
        }
    }

    async fn close(&mut self) {
        self.log.closed.store(true, Ordering::SeqCst);
        self.in_flight = None;
    }

    fn is_open(&self) -> bool {
        !self.log.is_closed()
    }
}

//! # Command Channel
//!
//! The byte stream between autoigv and a running IGV instance.
//!
//! ## Overview
//!
//! - [`Channel`] - trait for one-line-out, one-line-back exchanges
//! - [`TcpChannel`] - production channel over IGV's batch port
//! - [`ScriptedChannel`] - test channel with canned replies
//!
//! The protocol has no request identifiers, so callers must finish one
//! `send`/`receive` pair before starting the next.
//!
//! ```rust
//! use autoigv::channel::{ChannelConfig, DEFAULT_PORT};
//!
//! let config = ChannelConfig::new("localhost", DEFAULT_PORT);
//! assert_eq!(config.reply_timeout.as_secs(), 20);
//! ```

mod mock;
mod tcp;

pub use mock::{ChannelLog, ScriptedChannel, ScriptedReply};
pub use tcp::TcpChannel;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Port IGV listens on for batch commands unless reconfigured
pub const DEFAULT_PORT: u16 = 60151;

pub const DEFAULT_HOST: &str = "localhost";

/// How long to wait for a single reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(20);

/// Where to connect and how long to wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub host: String,
    pub port: u16,
    pub reply_timeout: Duration,
}

impl ChannelConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

#[async_trait]
pub trait Channel: Send {
    /// Write one command; the newline is added here
    async fn send(&mut self, line: &str) -> Result<()>;

    /// Wait for the next reply line, bounded by the configured timeout
    async fn receive(&mut self) -> Result<String>;

    /// Best-effort, idempotent
    async fn close(&mut self);

    fn is_open(&self) -> bool;
}

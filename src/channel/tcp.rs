//! TCP channel to IGV's batch port

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::{Channel, ChannelConfig};
use crate::error::{IgvError, Result};

pub struct TcpChannel {
    config: ChannelConfig,
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
}

impl TcpChannel {
    /// Connect to IGV.
    ///
    /// The connect itself is bounded by the reply timeout so an unreachable
    /// host fails the same way a refused port does.
    ///
    /// # Errors
    ///
    /// Returns `IgvError::ConnectionRefused` if the endpoint cannot be reached.
    pub async fn open(config: ChannelConfig) -> Result<Self> {
        let refused = |reason: String| IgvError::ConnectionRefused {
            host: config.host.clone(),
            port: config.port,
            reason,
        };

        let connect = TcpStream::connect((config.host.as_str(), config.port));
        let stream = match timeout(config.reply_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(refused(e.to_string())),
            Err(_) => return Err(refused("connection attempt timed out".to_string())),
        };
        let _ = stream.set_nodelay(true);

        debug!(host = %config.host, port = config.port, "connected");
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            config,
            reader: Some(BufReader::new(read_half)),
            writer: Some(write_half),
        })
    }
}

fn lost(reason: impl Into<String>) -> IgvError {
    IgvError::ConnectionLost {
        reason: reason.into(),
    }
}

#[async_trait]
impl Channel for TcpChannel {
    async fn send(&mut self, line: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| lost("session already closed"))?;

        debug!(command = line, "→ igv");
        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push('\n');
        writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| lost(e.to_string()))?;
        writer.flush().await.map_err(|e| lost(e.to_string()))
    }

    async fn receive(&mut self) -> Result<String> {
        let waited = self.config.reply_timeout;
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| lost("session already closed"))?;

        let mut line = String::new();
        match timeout(waited, reader.read_line(&mut line)).await {
            Err(_) => Err(IgvError::Timeout { waited }),
            Ok(Err(e)) => Err(lost(e.to_string())),
            Ok(Ok(0)) => Err(lost("IGV closed the connection")),
            Ok(Ok(_)) => {
                debug!(reply = line.trim_end(), "← igv");
                Ok(line)
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
            debug!("connection closed");
        }
        self.reader = None;
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

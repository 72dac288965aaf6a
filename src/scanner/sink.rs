//! Result log writer.
//!
//! The sink is the only task that touches the output log, so appends need
//! no locking. It stops when every publisher has dropped its sender, or
//! earlier if an idle timeout is configured and nothing arrives in time.

use super::ResultLine;
use crate::error::{ScanError, ScanResult};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// What the sink did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    pub lines_written: usize,
    /// True when the sink stopped because of the idle timeout rather than
    /// because the channel closed.
    pub idle_timed_out: bool,
}

/// Drains result lines into a writer, one line per result.
pub struct ResultSink<W> {
    writer: W,
    idle_timeout: Option<Duration>,
}

impl<W: AsyncWrite + Unpin> ResultSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            idle_timeout: None,
        }
    }

    /// Stop draining after `idle` passes without a new result.
    pub fn with_idle_timeout(mut self, idle: Option<Duration>) -> Self {
        self.idle_timeout = idle;
        self
    }

    /// Write every received line until the channel closes or goes idle.
    pub async fn drain(
        &mut self,
        results: &mut mpsc::Receiver<ResultLine>,
    ) -> ScanResult<SinkStats> {
        let mut stats = SinkStats::default();

        loop {
            let received = match self.idle_timeout {
                Some(idle) => match timeout(idle, results.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        warn!(
                            idle_secs = idle.as_secs_f64(),
                            "no results received, closing result channel"
                        );
                        stats.idle_timed_out = true;
                        break;
                    }
                },
                None => results.recv().await,
            };

            match received {
                Some(line) => {
                    self.write_line(&line).await?;
                    stats.lines_written += 1;
                }
                None => {
                    debug!("result channel closed");
                    break;
                }
            }
        }

        if stats.idle_timed_out {
            // Publishers see the closed channel on their next send; whatever
            // is already buffered still gets written.
            results.close();
            while let Some(line) = results.recv().await {
                self.write_line(&line).await?;
                stats.lines_written += 1;
            }
        }

        Ok(stats)
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_line(&mut self, line: &ResultLine) -> ScanResult<()> {
        let mut text = line.to_string();
        text.push('\n');
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(ScanError::SinkWrite)?;
        self.writer.flush().await.map_err(ScanError::SinkWrite)
    }
}

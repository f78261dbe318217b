//! # Teleinfo Reader
//!
//! The reader is the single consumer loop of the crate. It pulls lines from a
//! [`LineSource`], feeds them to a [`FrameAssembler`] and hands completed
//! frames to a [`SinkHandle`]. The loop stops when the source is exhausted or
//! when the shutdown signal fires; the frame being assembled at that moment is
//! discarded.

use crate::error::TeleinfoError;
use crate::sink::SinkHandle;
use crate::teleinfo::assembler::{AssemblerStats, FrameAssembler};
use crate::teleinfo::frame::Frame;
use crate::teleinfo::source::{LineRead, LineSource};
use log::{debug, info};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Reader settings.
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// Minimum time between two frames forwarded to the sink. Frames
    /// completed in between are counted and dropped. `None` forwards all.
    pub capture_interval: Option<Duration>,
}

/// Counters reported when the reader stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub lines_read: u64,
    pub read_timeouts: u64,
    pub frames_forwarded: u64,
    /// Frames completed inside the capture interval.
    pub frames_skipped: u64,
    /// Frames the sink queue could not take.
    pub frames_dropped: u64,
    pub assembler: AssemblerStats,
}

pub struct TeleinfoReader<S> {
    source: S,
    assembler: FrameAssembler,
    config: ReaderConfig,
    last_capture: Option<Instant>,
    stats: ReaderStats,
}

impl<S: LineSource> TeleinfoReader<S> {
    pub fn new(source: S, config: ReaderConfig) -> Self {
        Self::with_assembler(source, FrameAssembler::new(), config)
    }

    pub fn with_assembler(source: S, assembler: FrameAssembler, config: ReaderConfig) -> Self {
        TeleinfoReader {
            source,
            assembler,
            config,
            last_capture: None,
            stats: ReaderStats::default(),
        }
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    /// Runs until the source closes or `shutdown` fires. Dropping the
    /// sender of `shutdown` does not stop the loop.
    pub async fn run(
        &mut self,
        sink: &SinkHandle,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<ReaderStats, TeleinfoError> {
        let mut shutdown_armed = true;

        loop {
            let read = tokio::select! {
                signal = &mut shutdown, if shutdown_armed => {
                    if signal.is_ok() {
                        info!("Shutdown requested, stopping reader");
                        break;
                    }
                    shutdown_armed = false;
                    continue;
                }
                read = self.source.read_line() => read?,
            };

            match read {
                LineRead::Line(bytes) => {
                    self.stats.lines_read += 1;
                    if let Some(frame) = self.assembler.push_line(&bytes) {
                        self.dispatch(frame, sink);
                    }
                }
                LineRead::TimedOut => self.stats.read_timeouts += 1,
                LineRead::Closed => {
                    info!("Teleinfo source closed");
                    break;
                }
            }
        }

        if self.assembler.pending_fields() > 0 {
            debug!(
                "Discarding partial frame with {} field(s)",
                self.assembler.pending_fields()
            );
        }
        Ok(self.stats())
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> ReaderStats {
        ReaderStats {
            assembler: self.assembler.stats().clone(),
            ..self.stats.clone()
        }
    }

    fn dispatch(&mut self, frame: Frame, sink: &SinkHandle) {
        let now = Instant::now();
        if let (Some(interval), Some(last)) = (self.config.capture_interval, self.last_capture) {
            if now.duration_since(last) < interval {
                self.stats.frames_skipped += 1;
                debug!("Frame skipped, next capture in {:?}", interval - now.duration_since(last));
                return;
            }
        }

        debug!("Forwarding frame: {frame:?}");
        if sink.accept(frame) {
            self.stats.frames_forwarded += 1;
            self.last_capture = Some(now);
        } else {
            self.stats.frames_dropped += 1;
        }
    }
}

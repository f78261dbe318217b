//! # Frame Sinks
//!
//! A [`FrameSink`] persists completed frames. The reader never talks to a
//! sink directly: it hands frames to a [`SinkHandle`], which stamps the
//! receipt time and queues them for a task that owns the sink. A slow or
//! failing backend therefore never holds up frame capture; when the queue is
//! full the frame is dropped and a warning is logged.

pub mod influx;
pub mod json;

use crate::error::TeleinfoError;
use crate::teleinfo::frame::Frame;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

pub use influx::{InfluxConfig, InfluxSink};
pub use json::JsonLinesSink;

/// A frame together with the time it was handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampedFrame {
    #[serde(rename = "time")]
    pub received_at: DateTime<Utc>,
    #[serde(rename = "fields")]
    pub frame: Frame,
}

impl TimestampedFrame {
    pub fn now(frame: Frame) -> Self {
        TimestampedFrame {
            received_at: Utc::now(),
            frame,
        }
    }
}

/// Durable destination of frames.
#[async_trait]
pub trait FrameSink: Send {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    async fn write_frame(&mut self, frame: &TimestampedFrame) -> Result<(), TeleinfoError>;

    /// Called once when the sink is shut down.
    async fn flush(&mut self) -> Result<(), TeleinfoError> {
        Ok(())
    }
}

/// Outcome counters of a sink task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub written: u64,
    pub failed: u64,
}

/// Sending side of a spawned sink task.
pub struct SinkHandle {
    tx: mpsc::Sender<TimestampedFrame>,
    task: JoinHandle<SinkStats>,
}

impl SinkHandle {
    /// Moves `sink` into a new task fed by a queue of `capacity` frames.
    pub fn spawn<S: FrameSink + 'static>(mut sink: S, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<TimestampedFrame>(capacity.max(1));

        let task = tokio::spawn(async move {
            let name = sink.name();
            let mut stats = SinkStats::default();

            while let Some(frame) = rx.recv().await {
                match sink.write_frame(&frame).await {
                    Ok(()) => stats.written += 1,
                    Err(e) => {
                        stats.failed += 1;
                        error!("{name}: failed to write frame: {e}");
                    }
                }
            }

            if let Err(e) = sink.flush().await {
                error!("{name}: flush failed: {e}");
            }
            debug!("{name}: sink task stopped ({} written, {} failed)", stats.written, stats.failed);
            stats
        });

        SinkHandle { tx, task }
    }

    /// Stamps `frame` with the current time and queues it without waiting.
    /// Returns `false` if the frame had to be dropped.
    pub fn accept(&self, frame: Frame) -> bool {
        match self.tx.try_send(TimestampedFrame::now(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Sink queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Sink task stopped, dropping frame");
                false
            }
        }
    }

    /// Waits for queued frames to be written and stops the sink task.
    pub async fn close(self) -> Result<SinkStats, TeleinfoError> {
        drop(self.tx);
        self.task
            .await
            .map_err(|e| TeleinfoError::Other(format!("sink task failed: {e}")))
    }
}

/// Sink keeping frames in memory, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    frames: Arc<Mutex<Vec<TimestampedFrame>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames written so far, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        self.records().into_iter().map(|r| r.frame).collect()
    }

    pub fn records(&self) -> Vec<TimestampedFrame> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Makes subsequent writes fail until reset.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn write_frame(&mut self, frame: &TimestampedFrame) -> Result<(), TeleinfoError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(TeleinfoError::SinkError("memory sink set to fail".into()));
        }
        self.frames
            .lock()
            .map_err(|_| TeleinfoError::SinkError("memory sink poisoned".into()))?
            .push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teleinfo::frame::Field;

    fn frame(papp: i64) -> Frame {
        [Field::new("PAPP", papp)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_frames_reach_sink_in_order() {
        let sink = MemorySink::new();
        let handle = SinkHandle::spawn(sink.clone(), 8);
        assert!(handle.accept(frame(1)));
        assert!(handle.accept(frame(2)));

        let stats = handle.close().await.unwrap();
        assert_eq!(stats, SinkStats { written: 2, failed: 0 });
        assert_eq!(sink.frames(), vec![frame(1), frame(2)]);
    }

    #[tokio::test]
    async fn test_write_failures_do_not_stop_the_task() {
        let sink = MemorySink::new();
        sink.set_failing(true);
        let handle = SinkHandle::spawn(sink.clone(), 8);
        handle.accept(frame(1));

        // Let the task consume the first frame before healing the sink
        while handle.tx.capacity() < 8 {
            tokio::task::yield_now().await;
        }
        sink.set_failing(false);
        handle.accept(frame(2));

        let stats = handle.close().await.unwrap();
        assert_eq!(stats, SinkStats { written: 1, failed: 1 });
        assert_eq!(sink.frames(), vec![frame(2)]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_without_waiting() {
        let sink = MemorySink::new();
        let handle = SinkHandle::spawn(sink.clone(), 1);
        // On a current-thread runtime the task cannot run before we yield
        assert!(handle.accept(frame(1)));
        assert!(!handle.accept(frame(2)));

        let stats = handle.close().await.unwrap();
        assert_eq!(stats.written, 1);
        assert_eq!(sink.frames(), vec![frame(1)]);
    }

    #[test]
    fn test_timestamped_frame_json_layout() {
        let record = TimestampedFrame {
            received_at: DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            frame: frame(1289),
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"time":"2024-01-02T03:04:05Z","fields":{"PAPP":1289}}"#
        );
    }
}

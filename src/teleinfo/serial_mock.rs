//! Mock serial port implementation for testing
//!
//! This module provides a mock meter output that can be used to test the
//! Teleinfo reader without requiring actual hardware. Reads return queued
//! bytes, stay pending while the queue is empty, and report end of stream
//! once [`MockSerialPort::close`] has been called and the queue is drained.

use crate::constants::{TELEINFO_ETX, TELEINFO_LF, TELEINFO_STX};
use crate::teleinfo::line::encode_line;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, ReadBuf};

#[derive(Default)]
struct MockState {
    rx: VecDeque<u8>,
    closed: bool,
    next_error: Option<io::Error>,
    waker: Option<Waker>,
}

/// Mock serial port that simulates a meter emitting Teleinfo frames
#[derive(Clone, Default)]
pub struct MockSerialPort {
    state: Arc<Mutex<MockState>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned mock only happens after a failed assertion elsewhere
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wake(state: &mut MockState) {
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        let mut state = self.lock();
        state.rx.extend(data);
        Self::wake(&mut state);
    }

    /// Queue one information group with a correct checksum
    pub fn queue_field(&self, key: &str, value: &str) {
        self.queue_rx_data(&encode_line(key, value));
    }

    /// Queue a complete frame as a meter sends it: STX, one group per
    /// line, ETX. Consecutive frames put ETX and STX on the same line.
    pub fn queue_frame(&self, fields: &[(&str, &str)]) {
        let mut bytes = vec![TELEINFO_STX, TELEINFO_LF];
        for (key, value) in fields {
            bytes.extend(encode_line(key, value));
        }
        bytes.push(TELEINFO_ETX);
        self.queue_rx_data(&bytes);
    }

    /// Number of bytes not read yet
    pub fn pending_rx(&self) -> usize {
        self.lock().rx.len()
    }

    /// Signal end of stream once the queued data has been read
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        Self::wake(&mut state);
    }

    /// Set an error to be returned on the next read
    pub fn set_next_error(&self, error: io::Error) {
        let mut state = self.lock();
        state.next_error = Some(error);
        Self::wake(&mut state);
    }
}

impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut state = self.lock();

        if let Some(error) = state.next_error.take() {
            return Poll::Ready(Err(error));
        }

        let available = state.rx.len().min(buf.remaining());
        if available > 0 {
            let data: Vec<u8> = state.rx.drain(..available).collect();
            buf.put_slice(&data);
            return Poll::Ready(Ok(()));
        }

        if state.closed {
            // Zero bytes read: end of stream
            return Poll::Ready(Ok(()));
        }

        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

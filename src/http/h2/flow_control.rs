//! HTTP/2 flow control
//!
//! This module implements the receive side of flow control as defined in
//! RFC 7540 Section 5.2.
//!
//! The connection only needs to keep the peer able to send: inbound DATA
//! shrinks the connection and stream windows, and once a window drops below
//! half of its initial size a WINDOW_UPDATE restoring it is due.

use super::error::{Error, Result};
use super::settings::DEFAULT_INITIAL_WINDOW_SIZE;
use super::CONNECTION_STREAM_ID;
use std::collections::HashMap;

/// Largest window size allowed (2^31 - 1)
pub const MAX_WINDOW_SIZE: i64 = 0x7FFFFFFF;

/// Flow control window
#[derive(Debug, Clone)]
pub struct FlowControlWindow {
    /// Initial window size
    initial_size: u32,
    /// Current window size (negative if the peer over-sent)
    current_size: i64,
}

impl FlowControlWindow {
    /// Create a new flow control window with default size
    pub fn new() -> Self {
        Self::with_initial_size(DEFAULT_INITIAL_WINDOW_SIZE)
    }

    /// Create a new flow control window with specified initial size
    pub fn with_initial_size(initial_size: u32) -> Self {
        FlowControlWindow {
            initial_size,
            current_size: initial_size as i64,
        }
    }

    /// Get current window size
    pub fn size(&self) -> i64 {
        self.current_size
    }

    /// Get initial window size
    pub fn initial_size(&self) -> u32 {
        self.initial_size
    }

    /// Account for received flow-controlled bytes
    pub fn consume(&mut self, amount: usize) {
        self.current_size -= amount as i64;
    }

    /// Grow the window by a WINDOW_UPDATE increment
    ///
    /// Returns the new window size
    pub fn increase(&mut self, increment: u32) -> Result<i64> {
        if increment == 0 {
            return Err(Error::FlowControl(
                "Window update increment must be non-zero".to_string(),
            ));
        }

        let new_size = self.current_size + increment as i64;

        // RFC 7540 Section 6.9.1
        if new_size > MAX_WINDOW_SIZE {
            return Err(Error::FlowControl(format!(
                "Window size {} exceeds maximum (2^31-1)",
                new_size
            )));
        }

        self.current_size = new_size;
        Ok(self.current_size)
    }

    /// Increment that restores the initial size, once below half of it
    pub fn pending_update(&self) -> Option<u32> {
        let initial_size = self.initial_size as i64;

        if self.current_size < initial_size / 2 {
            Some((initial_size - self.current_size).min(MAX_WINDOW_SIZE) as u32)
        } else {
            None
        }
    }
}

impl Default for FlowControlWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive windows of one connection and its streams
#[derive(Debug)]
pub struct ReceiveWindows {
    connection: FlowControlWindow,
    streams: HashMap<u32, FlowControlWindow>,
    stream_initial_size: u32,
}

impl ReceiveWindows {
    /// `stream_initial_size` is the SETTINGS_INITIAL_WINDOW_SIZE we announced
    ///
    /// The connection window always starts at 65535; SETTINGS never
    /// changes it (RFC 7540 Section 6.9.2).
    pub fn new(stream_initial_size: u32) -> Self {
        ReceiveWindows {
            connection: FlowControlWindow::new(),
            streams: HashMap::new(),
            stream_initial_size,
        }
    }

    pub fn connection(&self) -> &FlowControlWindow {
        &self.connection
    }

    pub fn stream(&self, stream_id: u32) -> Option<&FlowControlWindow> {
        self.streams.get(&stream_id)
    }

    /// Account for a DATA payload and collect the updates now due
    ///
    /// Returns `(stream_id, increment)` pairs, the connection (stream 0)
    /// first. The windows are assumed replenished by the caller sending them.
    pub fn on_data(&mut self, stream_id: u32, len: usize) -> Vec<(u32, u32)> {
        let mut updates = Vec::new();
        if len == 0 {
            return updates;
        }

        self.connection.consume(len);
        if let Some(increment) = self.connection.pending_update() {
            if self.connection.increase(increment).is_ok() {
                updates.push((CONNECTION_STREAM_ID, increment));
            }
        }

        if stream_id != CONNECTION_STREAM_ID {
            let initial = self.stream_initial_size;
            let window = self
                .streams
                .entry(stream_id)
                .or_insert_with(|| FlowControlWindow::with_initial_size(initial));
            window.consume(len);
            if let Some(increment) = window.pending_update() {
                if window.increase(increment).is_ok() {
                    updates.push((stream_id, increment));
                }
            }
        }

        updates
    }

    /// Forget a stream's window once it can no longer receive DATA
    pub fn remove_stream(&mut self, stream_id: u32) {
        self.streams.remove(&stream_id);
    }
}

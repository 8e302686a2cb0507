use super::manager::{ConnectionManager, ConnectionState};
use super::messages::{AudioStreamMessage, EVENT_AUDIO_STREAM};
use base64::Engine;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serializes encoded PCM frames into `audio_stream` events and submits
/// them through the connection.
///
/// Audio frames are time-critical, so nothing here blocks. While the
/// connection is down the most recent frames are kept in a small
/// drop-oldest ring and flushed, in order, on the next send after the
/// link comes back. Unbounded buffering would grow without limit during
/// a long outage; dropping everything would lose the frames spanning a
/// brief reconnect.
pub struct FrameTransport {
    connection: Arc<ConnectionManager>,
    pending: VecDeque<AudioStreamMessage>,
    max_pending: usize,
    sequence: u32,
    frames_dropped: u64,
}

impl FrameTransport {
    pub fn new(connection: Arc<ConnectionManager>, max_pending: usize) -> Self {
        Self {
            connection,
            pending: VecDeque::with_capacity(max_pending),
            max_pending,
            sequence: 0,
            frames_dropped: 0,
        }
    }

    /// Submit one encoded PCM frame.
    pub fn send_frame(&mut self, pcm: &[u8]) {
        let message = self.make_message(pcm);

        if self.connection.state() == ConnectionState::Connected {
            self.flush_pending();
            self.submit(message);
        } else {
            // A configured depth of zero still keeps the most recent frame
            let capacity = self.max_pending.max(1);
            while self.pending.len() >= capacity {
                self.pending.pop_front();
                self.frames_dropped += 1;
            }
            self.pending.push_back(message);
        }
    }

    /// Discard any frames buffered while the connection was down.
    ///
    /// Called on session stop so a stale frame is never retried into a
    /// later session.
    pub fn clear_pending(&mut self) {
        if !self.pending.is_empty() {
            debug!("discarding {} buffered frames", self.pending.len());
            self.pending.clear();
        }
    }

    /// Frames currently buffered waiting for the link
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Frames evicted from the ring since the transport was created
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    fn make_message(&mut self, pcm: &[u8]) -> AudioStreamMessage {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        AudioStreamMessage {
            chunk: base64::engine::general_purpose::STANDARD.encode(pcm),
            sequence,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        debug!("flushing {} buffered frames", self.pending.len());
        while let Some(message) = self.pending.pop_front() {
            self.submit(message);
        }
    }

    fn submit(&self, message: AudioStreamMessage) {
        match serde_json::to_value(&message) {
            Ok(data) => self.connection.send(EVENT_AUDIO_STREAM, data),
            Err(e) => warn!("failed to serialize audio frame: {}", e),
        }
    }
}

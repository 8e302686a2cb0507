use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::capture::{AudioCapture, CaptureConfig, FrameSource};
use crate::audio::pcm;
use crate::connection::manager::ConnectionManager;
use crate::connection::messages::{
    ToneAnalysisPayload, TranscriptPayload, EVENT_ERROR, EVENT_PARTIAL, EVENT_TONE_ANALYSIS,
    EVENT_TRANSCRIPTION,
};
use crate::connection::transport::FrameTransport;
use crate::display::reconciler::{ResultEvent, ResultReconciler};
use crate::display::state::{DisplayState, SharedDisplayState};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Orchestrates the capture -> encode -> transport pipeline and the
/// display state lifecycle. The only component the outside UI layer calls.
///
/// The connection manager is injected and outlives the controller's
/// start/stop cycles; capture resources are acquired on `start` and fully
/// released on `stop`.
pub struct SessionController {
    config: SessionConfig,
    source: Box<dyn FrameSource>,
    transport: Arc<Mutex<FrameTransport>>,
    reconciler: Arc<ResultReconciler>,
    display: SharedDisplayState,
    pump: Option<JoinHandle<()>>,
    started_at: Option<DateTime<Utc>>,
    frames_sent: Arc<AtomicUsize>,
}

impl SessionController {
    /// Create a controller capturing from the default microphone.
    pub fn new(config: SessionConfig, connection: Arc<ConnectionManager>) -> Self {
        let capture = AudioCapture::new(CaptureConfig {
            sample_rate: config.sample_rate,
            channels: config.channels,
            frame_samples: config.frame_samples,
            ..CaptureConfig::default()
        });
        Self::with_source(config, connection, Box::new(capture))
    }

    /// Create a controller with an explicit frame source (used by tests).
    pub fn with_source(
        config: SessionConfig,
        connection: Arc<ConnectionManager>,
        source: Box<dyn FrameSource>,
    ) -> Self {
        let display: SharedDisplayState = Arc::new(Mutex::new(DisplayState::default()));
        let reconciler = Arc::new(ResultReconciler::new(Arc::clone(&display)));
        let transport = Arc::new(Mutex::new(FrameTransport::new(
            Arc::clone(&connection),
            config.max_pending_frames,
        )));

        register_handlers(&connection, Arc::clone(&reconciler));

        Self {
            config,
            source,
            transport,
            reconciler,
            display,
            pump: None,
            started_at: None,
            frames_sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start capturing and streaming.
    ///
    /// If microphone acquisition fails the error propagates and no state
    /// changes: the session never partially activates (no video flag
    /// without audio).
    pub fn start(&mut self) -> Result<()> {
        if self.pump.is_some() {
            warn!("session already started");
            return Ok(());
        }

        info!("starting session: {}", self.config.session_id);

        let mut frame_rx = self
            .source
            .start()
            .context("failed to start audio capture")?;

        let transport = Arc::clone(&self.transport);
        let frames_sent = Arc::clone(&self.frames_sent);

        // Frame pump: encode each captured frame and hand it to the
        // transport. Ends when the capture channel closes on stop.
        let pump = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let pcm_bytes = pcm::encode_frame(&frame.samples);
                if let Ok(mut transport) = transport.lock() {
                    transport.send_frame(&pcm_bytes);
                }
                frames_sent.fetch_add(1, Ordering::Relaxed);
            }
        });

        self.pump = Some(pump);
        self.started_at = Some(Utc::now());

        if let Ok(mut state) = self.display.lock() {
            state.session_active = true;
            state.video_active = true;
        }

        info!(
            "session started (video feed: {})",
            self.config.video_url
        );

        Ok(())
    }

    /// Stop capturing, discard buffered frames, and reset the display.
    ///
    /// Safe to call from any state, including before any `start` and
    /// twice in a row.
    pub fn stop(&mut self) {
        let was_active = self.pump.is_some();

        // Capture teardown first: no frame is produced after this returns
        self.source.stop();

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        // No buffered frame is retried into a later session
        if let Ok(mut transport) = self.transport.lock() {
            transport.clear_pending();
        }

        self.reconciler.reset();

        if let Ok(mut state) = self.display.lock() {
            state.session_active = false;
            state.video_active = false;
        }

        self.started_at = None;

        if was_active {
            info!("session stopped: {}", self.config.session_id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.pump.is_some()
    }

    /// Shared display state handle for the presentation layer (read-only
    /// there)
    pub fn display(&self) -> SharedDisplayState {
        Arc::clone(&self.display)
    }

    /// Current copy of the display state
    pub fn snapshot(&self) -> DisplayState {
        self.reconciler.snapshot()
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration_secs = self
            .started_at
            .map(|t| Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            active: self.is_active(),
            started_at: self.started_at,
            duration_secs,
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.source.stop();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Wire the named inbound events to the reconciler.
///
/// Malformed payloads are logged and ignored; they never crash the
/// reconciler.
fn register_handlers(connection: &ConnectionManager, reconciler: Arc<ResultReconciler>) {
    let r = Arc::clone(&reconciler);
    connection.on(EVENT_TRANSCRIPTION, move |data| {
        match serde_json::from_value::<TranscriptPayload>(data) {
            Ok(payload) => r.apply(ResultEvent::Final { text: payload.text }),
            Err(e) => warn!("malformed transcription payload: {}", e),
        }
    });

    let r = Arc::clone(&reconciler);
    connection.on(EVENT_PARTIAL, move |data| {
        match serde_json::from_value::<TranscriptPayload>(data) {
            Ok(payload) => r.apply(ResultEvent::Partial { text: payload.text }),
            Err(e) => warn!("malformed partial payload: {}", e),
        }
    });

    let r = Arc::clone(&reconciler);
    connection.on(EVENT_TONE_ANALYSIS, move |data| {
        match serde_json::from_value::<ToneAnalysisPayload>(data) {
            Ok(payload) => r.apply(ResultEvent::ToneBundle {
                emotion: payload.emotion,
                sentiment: payload.sentiment,
                tone: payload.tone,
            }),
            Err(e) => warn!("malformed tone_analysis payload: {}", e),
        }
    });

    connection.on(EVENT_ERROR, |data| {
        // Non-fatal: streaming continues
        error!("server error: {}", data);
    });
}

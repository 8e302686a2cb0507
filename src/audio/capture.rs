use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// One fixed-size block of float audio samples from the capture callback
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for microphone capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate (the analysis service expects 16kHz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Samples per emitted frame
    pub frame_samples: usize,
    /// Frame channel depth between the capture thread and the consumer
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,    // 16kHz
            channels: 1,           // Mono
            frame_samples: 4096,   // ~256ms per frame at 16kHz
            channel_capacity: 32,
        }
    }
}

/// Errors surfaced synchronously by `AudioCapture::start`
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device available")]
    DeviceUnavailable,

    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("capture already running")]
    AlreadyCapturing,

    #[error("audio stream error: {0}")]
    Stream(String),
}

/// A source of capture frames
///
/// `AudioCapture` is the production implementation; tests substitute a
/// scripted source so session behavior can be exercised without hardware.
pub trait FrameSource: Send {
    /// Begin producing frames. Errors must surface here, synchronously,
    /// so a failed acquisition never looks like an active session.
    fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop producing frames. Must be idempotent, and no frame may be
    /// delivered after it returns.
    fn stop(&mut self);
}

/// Microphone capture built on cpal
///
/// The cpal stream is owned by a dedicated thread (streams are not Send);
/// `start` hands back a bounded channel of fixed-size frames and `stop`
/// joins the thread after the stream has been torn down.
pub struct AudioCapture {
    config: CaptureConfig,
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_tx: std_mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl AudioCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }

    /// Acquire the default input device and start capturing.
    ///
    /// Blocks briefly until the capture thread reports whether the stream
    /// opened, so permission and device failures propagate to the caller.
    pub fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_capacity);
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        let config = self.config.clone();
        let handle = std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || capture_thread(config, frame_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        // Wait for the thread to open the stream (or fail trying)
        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop_tx, handle });
                info!(
                    "audio capture started ({}Hz, {} channels, {} samples/frame)",
                    self.config.sample_rate, self.config.channels, self.config.frame_samples
                );
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Stream(
                    "capture thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    /// Stop capturing and release the device.
    ///
    /// Joins the capture thread, which drops the stream (ending the
    /// callback) before the device is released, so no frame arrives after
    /// this returns. Calling it when not capturing is a no-op.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            if worker.handle.join().is_err() {
                error!("capture thread panicked during shutdown");
            }
            info!("audio capture stopped");
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }
}

impl FrameSource for AudioCapture {
    fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        AudioCapture::start(self)
    }

    fn stop(&mut self) {
        AudioCapture::stop(self)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_thread(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: std_mpsc::Sender<Result<(), CaptureError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let stream = match build_stream(&config, frame_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until stop is signalled (or the owning AudioCapture is dropped)
    let _ = stop_rx.recv();

    // Dropping the stream ends the callback before the device is released
    drop(stream);
}

fn build_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::DeviceUnavailable)?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    info!("using input device: {}", device_name);

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let frame_samples = config.frame_samples;
    let sample_rate = config.sample_rate;
    let channels = config.channels;
    let started = Instant::now();
    let mut pending: Vec<f32> = Vec::with_capacity(frame_samples * 2);

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.extend_from_slice(data);
                while pending.len() >= frame_samples {
                    let samples: Vec<f32> = pending.drain(..frame_samples).collect();
                    let frame = AudioFrame {
                        samples,
                        sample_rate,
                        channels,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                    };
                    // Realtime callback: never block on a slow consumer
                    if frame_tx.try_send(frame).is_err() {
                        debug!("frame channel full, dropping capture frame");
                    }
                }
            },
            |err| error!("audio stream error: {}", err),
            None,
        )
        .map_err(map_build_error)?;

    Ok(stream)
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        // The OS reports a denied microphone permission as a backend error
        cpal::BuildStreamError::BackendSpecific { err } => {
            CaptureError::PermissionDenied(err.to_string())
        }
        other => CaptureError::Stream(other.to_string()),
    }
}

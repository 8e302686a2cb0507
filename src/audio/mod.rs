pub mod capture;
pub mod pcm;

pub use capture::{AudioCapture, AudioFrame, CaptureConfig, CaptureError, FrameSource};

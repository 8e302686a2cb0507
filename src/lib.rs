pub mod audio;
pub mod config;
pub mod connection;
pub mod display;
pub mod session;

pub use audio::{AudioCapture, AudioFrame, CaptureConfig, CaptureError, FrameSource};
pub use config::Config;
pub use connection::{
    ConnectionManager, ConnectionState, Envelope, FrameTransport, ReconnectPolicy, ScoredLabel,
};
pub use display::{DisplayState, ResultEvent, ResultReconciler, SharedDisplayState};
pub use session::{SessionConfig, SessionController, SessionStats};

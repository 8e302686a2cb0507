//! Display state and result reconciliation
//!
//! The reconciler is a pure state-transition layer, deliberately separate
//! from the connection machinery that delivers events, so it can be tested
//! without any network or audio dependency.

pub mod reconciler;
pub mod state;

pub use reconciler::{ResultEvent, ResultReconciler, PARTIAL_MARKER};
pub use state::{DisplayState, SharedDisplayState, UNAVAILABLE};

use super::state::{DisplayState, SharedDisplayState, UNAVAILABLE};
use crate::connection::messages::ScoredLabel;

/// Prefix marking a transcript as not yet final
pub const PARTIAL_MARKER: &str = "...";

/// One inbound analysis result, already parsed off the wire
#[derive(Debug, Clone)]
pub enum ResultEvent {
    /// Provisional transcript, superseded by later events
    Partial { text: String },
    /// Final transcript
    Final { text: String },
    /// Ranked emotion/sentiment/tone classifications arriving together
    ToneBundle {
        emotion: Vec<ScoredLabel>,
        sentiment: Option<ScoredLabel>,
        tone: Vec<ScoredLabel>,
    },
}

/// Folds inbound result events into the shared display state.
///
/// Pure state transitions over `DisplayState`: events are applied in
/// arrival order, and a tone bundle's three labels land in one lock scope
/// so readers never observe a half-applied bundle.
pub struct ResultReconciler {
    display: SharedDisplayState,
}

impl ResultReconciler {
    pub fn new(display: SharedDisplayState) -> Self {
        Self { display }
    }

    /// Apply one result event to the display state.
    pub fn apply(&self, event: ResultEvent) {
        let Ok(mut state) = self.display.lock() else {
            return;
        };

        match event {
            ResultEvent::Partial { text } => {
                state.transcript = format!("{}{}", PARTIAL_MARKER, text);
            }
            ResultEvent::Final { text } => {
                state.transcript = text;
            }
            ResultEvent::ToneBundle {
                emotion,
                sentiment,
                tone,
            } => {
                state.emotion = top_label(&emotion);
                state.sentiment = sentiment
                    .map(|s| s.label)
                    .unwrap_or_else(|| UNAVAILABLE.to_string());
                state.tone = top_label(&tone);
            }
        }
    }

    /// Restore transcript and classifications to their defaults.
    ///
    /// The session flags belong to the session controller and are left
    /// untouched.
    pub fn reset(&self) {
        let Ok(mut state) = self.display.lock() else {
            return;
        };
        state.transcript = String::new();
        state.emotion = UNAVAILABLE.to_string();
        state.sentiment = UNAVAILABLE.to_string();
        state.tone = UNAVAILABLE.to_string();
    }

    /// Current copy of the display state
    pub fn snapshot(&self) -> DisplayState {
        self.display
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }
}

fn top_label(ranked: &[ScoredLabel]) -> String {
    ranked
        .first()
        .map(|scored| scored.label.clone())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

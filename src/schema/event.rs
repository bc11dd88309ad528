use serde::{Deserialize, Serialize};

use super::decision::{Decision, DecisionId, Verdict};
use super::line::Line;

/// Something a host should react to: show a bubble, toggle the typing
/// indicator, render buttons. Drained from the conversation after each
/// call that moves it forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogueEvent {
    /// The typing indicator became visible.
    TypingStarted,
    /// The typing indicator went away; the narrator's line follows.
    TypingStopped,
    /// A line joined the history.
    LineRevealed(Line),
    /// The queue emptied and the post-reveal pause ended.
    QueueDrained,
    SceneEntered(String),
    DecisionPresented(Decision),
    DecisionResolved { id: DecisionId, value: String },
    VerdictReported(Verdict),
    /// Nothing left to say and nothing left to ask.
    Finished,
}

impl DialogueEvent {
    /// Short tag for logs and trace output, e.g. "line_revealed".
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TypingStarted => "typing_started",
            Self::TypingStopped => "typing_stopped",
            Self::LineRevealed(_) => "line_revealed",
            Self::QueueDrained => "queue_drained",
            Self::SceneEntered(_) => "scene_entered",
            Self::DecisionPresented(_) => "decision_presented",
            Self::DecisionResolved { .. } => "decision_resolved",
            Self::VerdictReported(_) => "verdict_reported",
            Self::Finished => "finished",
        }
    }
}

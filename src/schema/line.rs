use serde::{Deserialize, Serialize};

use crate::core::timeline::Millis;

/// Newtype wrapper for line IDs. Sequential within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub u64);

/// Which side of the conversation a line belongs to.
///
/// The narrator owns everything that goes through the queue; the
/// responder only ever speaks by picking a decision option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Narrator,
    Responder,
}

impl Speaker {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Narrator => "narrator",
            Self::Responder => "responder",
        }
    }
}

/// A single emitted line of dialogue. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub speaker: Speaker,
    pub text: String,
    /// Virtual time at which the line appeared.
    pub created_at: Millis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_creation() {
        let line = Line {
            id: LineId(3),
            speaker: Speaker::Responder,
            text: "Got it!".to_string(),
            created_at: 4_500,
        };
        assert_eq!(line.id, LineId(3));
        assert_eq!(line.speaker.tag(), "responder");
        assert_eq!(line.created_at, 4_500);
    }

    #[test]
    fn line_ids_order() {
        assert!(LineId(1) < LineId(2));
    }
}

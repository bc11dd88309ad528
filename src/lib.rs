//! Casefile Dialogue: scripted narrator conversations and annotation
//! grading for detective games.
//!
//! A narrator "types" lines one at a time on a virtual timeline, gates the
//! conversation on player decisions, and picks its closing feedback from
//! the player's verdict and how accurately they classified the claims of
//! an AI-written case summary.

pub mod core;
pub mod schema;

pub use crate::core::conversation::{ClaimClick, Conversation, ConversationBuilder, DialogueError};

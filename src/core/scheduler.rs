/// Dialogue scheduler: paces queued narrator lines as "typing" then "reveal".

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

use crate::core::timeline::{Millis, Task, Timeline};
use crate::schema::event::DialogueEvent;
use crate::schema::line::{Line, LineId, Speaker};

#[derive(Debug, Error)]
pub enum PacingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid pacing: {0}")]
    Invalid(String),
}

/// Timing constants for the simulated typist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacing {
    pub per_char_ms: Millis,
    pub min_typing_ms: Millis,
    pub max_typing_ms: Millis,
    /// Gap between one reveal and the next line starting to type.
    pub inter_line_pause_ms: Millis,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            per_char_ms: 50,
            min_typing_ms: 1_000,
            max_typing_ms: 3_000,
            inter_line_pause_ms: 500,
        }
    }
}

impl Pacing {
    /// No typing delay and no pauses. Useful for replaying a script.
    pub fn instant() -> Self {
        Self {
            per_char_ms: 0,
            min_typing_ms: 0,
            max_typing_ms: 0,
            inter_line_pause_ms: 0,
        }
    }

    /// How long the typing indicator shows before `text` appears.
    pub fn typing_delay(&self, text: &str) -> Millis {
        let chars = text.chars().count() as Millis;
        chars
            .saturating_mul(self.per_char_ms)
            .max(self.min_typing_ms)
            .min(self.max_typing_ms)
    }

    /// Load pacing from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Pacing, PacingError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Pacing, PacingError> {
        let pacing: Pacing = ron::from_str(input)?;
        if pacing.min_typing_ms > pacing.max_typing_ms {
            return Err(PacingError::Invalid(format!(
                "min_typing_ms ({}) exceeds max_typing_ms ({})",
                pacing.min_typing_ms, pacing.max_typing_ms
            )));
        }
        Ok(pacing)
    }
}

/// Owns the pending queue and the emitted history.
///
/// `busy` covers the whole per-line cycle (typing plus the pause after
/// it) and is the guard that keeps a second drain from starting while
/// one is running. `typing` is only the indicator.
#[derive(Debug)]
pub struct Scheduler {
    pacing: Pacing,
    queue: VecDeque<String>,
    history: Vec<Line>,
    busy: bool,
    typing: bool,
    next_line_id: u64,
}

impl Scheduler {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            queue: VecDeque::new(),
            history: Vec::new(),
            busy: false,
            typing: false,
            next_line_id: 1,
        }
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Append narrator lines and start draining if nothing is running.
    ///
    /// Blank lines are dropped. Returns how many lines were queued.
    pub fn enqueue<I, S>(
        &mut self,
        lines: I,
        timeline: &mut Timeline,
        events: &mut Vec<DialogueEvent>,
    ) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.queue.len();
        self.queue.extend(
            lines
                .into_iter()
                .map(Into::<String>::into)
                .filter(|text| !text.trim().is_empty()),
        );
        let added = self.queue.len() - before;
        if added > 0 {
            self.drain(timeline, events);
        }
        added
    }

    /// Start typing the front of the queue unless a line is already in
    /// its typing/pause cycle.
    pub fn drain(&mut self, timeline: &mut Timeline, events: &mut Vec<DialogueEvent>) {
        if self.busy {
            return;
        }
        let Some(next) = self.queue.front() else {
            return;
        };
        let delay = self.pacing.typing_delay(next);
        self.busy = true;
        self.typing = true;
        events.push(DialogueEvent::TypingStarted);
        timeline.schedule(delay, Task::Reveal);
    }

    /// The typing delay for the front line has elapsed.
    pub fn reveal(&mut self, timeline: &mut Timeline, events: &mut Vec<DialogueEvent>) {
        if std::mem::take(&mut self.typing) {
            events.push(DialogueEvent::TypingStopped);
        }
        let Some(text) = self.queue.pop_front() else {
            self.busy = false;
            return;
        };
        let line = self.push_line(Speaker::Narrator, text, timeline.now());
        events.push(DialogueEvent::LineRevealed(line));
        timeline.schedule(self.pacing.inter_line_pause_ms, Task::Resume);
    }

    /// The post-reveal pause has elapsed. Continues the loop, or reports
    /// that the queue is drained. Returns true when drained.
    pub fn resume(&mut self, timeline: &mut Timeline, events: &mut Vec<DialogueEvent>) -> bool {
        self.busy = false;
        if self.queue.is_empty() {
            events.push(DialogueEvent::QueueDrained);
            return true;
        }
        self.drain(timeline, events);
        false
    }

    /// Record a responder line directly into the history. Responder lines
    /// never wait in the queue.
    pub fn record_response(&mut self, text: &str, now: Millis) -> Line {
        self.push_line(Speaker::Responder, text.to_string(), now)
    }

    fn push_line(&mut self, speaker: Speaker, text: String, now: Millis) -> Line {
        let line = Line {
            id: LineId(self.next_line_id),
            speaker,
            text,
            created_at: now,
        };
        self.next_line_id += 1;
        tracing::trace!(speaker = speaker.tag(), id = line.id.0, at = now, "line recorded");
        self.history.push(line.clone());
        line
    }

    /// Nothing queued and no line mid-cycle.
    pub fn is_idle(&self) -> bool {
        !self.busy && self.queue.is_empty()
    }

    /// Whether the typing indicator is showing.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn history(&self) -> &[Line] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_all(
        scheduler: &mut Scheduler,
        timeline: &mut Timeline,
        events: &mut Vec<DialogueEvent>,
    ) {
        while let Some(task) = timeline.pop_due(Millis::MAX) {
            match task {
                Task::Reveal => scheduler.reveal(timeline, events),
                Task::Resume => {
                    scheduler.resume(timeline, events);
                }
                Task::Narrate(_) => {}
            }
        }
    }

    #[test]
    fn typing_delay_clamps() {
        let pacing = Pacing::default();
        assert_eq!(pacing.typing_delay("short"), 1_000);
        assert_eq!(pacing.typing_delay(&"x".repeat(30)), 1_500);
        assert_eq!(pacing.typing_delay(&"x".repeat(500)), 3_000);
        assert_eq!(pacing.typing_delay(""), 1_000);
    }

    #[test]
    fn typing_delay_counts_chars_not_bytes() {
        let pacing = Pacing::default();
        // 25 characters, 75 bytes
        let text = "…".repeat(25);
        assert_eq!(pacing.typing_delay(&text), 1_250);
    }

    #[test]
    fn reveals_one_line_at_a_time() {
        let mut scheduler = Scheduler::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();

        scheduler.enqueue(["first", "second"], &mut timeline, &mut events);
        assert!(scheduler.is_typing());
        assert_eq!(scheduler.pending_len(), 2);

        assert_eq!(timeline.pop_due(999), None);
        let task = timeline.pop_due(1_000);
        assert_eq!(task, Some(Task::Reveal));
        scheduler.reveal(&mut timeline, &mut events);
        assert!(!scheduler.is_typing());
        assert_eq!(scheduler.history().len(), 1);
        assert_eq!(scheduler.history()[0].created_at, 1_000);

        // Second line waits for the pause before it starts typing.
        assert_eq!(timeline.next_due(), Some(1_500));
        run_all(&mut scheduler, &mut timeline, &mut events);
        assert_eq!(scheduler.history()[1].text, "second");
        assert_eq!(scheduler.history()[1].created_at, 2_500);
        assert!(scheduler.is_idle());
        assert_eq!(events.last(), Some(&DialogueEvent::QueueDrained));
    }

    #[test]
    fn typing_indicator_brackets_each_reveal() {
        let mut scheduler = Scheduler::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();

        scheduler.enqueue(["first", "second"], &mut timeline, &mut events);
        run_all(&mut scheduler, &mut timeline, &mut events);

        let tags: Vec<&str> = events.iter().map(DialogueEvent::tag).collect();
        assert_eq!(
            tags,
            vec![
                "typing_started",
                "typing_stopped",
                "line_revealed",
                "typing_started",
                "typing_stopped",
                "line_revealed",
                "queue_drained",
            ]
        );
    }

    #[test]
    fn second_drain_is_noop() {
        let mut scheduler = Scheduler::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();

        scheduler.enqueue(["only"], &mut timeline, &mut events);
        scheduler.drain(&mut timeline, &mut events);
        scheduler.drain(&mut timeline, &mut events);
        assert_eq!(timeline.len(), 1);
        let started = events
            .iter()
            .filter(|e| matches!(e, DialogueEvent::TypingStarted))
            .count();
        assert_eq!(started, 1);
    }

    #[test]
    fn enqueue_during_drain_extends_work() {
        let mut scheduler = Scheduler::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();

        scheduler.enqueue(["one"], &mut timeline, &mut events);
        scheduler.enqueue(["two"], &mut timeline, &mut events);
        assert_eq!(timeline.len(), 1);

        run_all(&mut scheduler, &mut timeline, &mut events);
        let texts: Vec<&str> = scheduler.history().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn blank_lines_filtered() {
        let mut scheduler = Scheduler::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();

        let added = scheduler.enqueue(["", "   ", "real"], &mut timeline, &mut events);
        assert_eq!(added, 1);

        let added = scheduler.enqueue(Vec::<String>::new(), &mut timeline, &mut events);
        assert_eq!(added, 0);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn empty_enqueue_on_idle_does_nothing() {
        let mut scheduler = Scheduler::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();
        scheduler.enqueue([""], &mut timeline, &mut events);
        assert!(scheduler.is_idle());
        assert!(timeline.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn responder_lines_skip_queue() {
        let mut scheduler = Scheduler::new(Pacing::default());
        let line = scheduler.record_response("Got it!", 42);
        assert_eq!(line.speaker, Speaker::Responder);
        assert_eq!(line.id, LineId(1));
        assert_eq!(scheduler.history().len(), 1);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn pacing_from_ron() {
        let pacing = Pacing::parse_ron(
            "(per_char_ms: 10, min_typing_ms: 200, max_typing_ms: 800, inter_line_pause_ms: 100)",
        )
        .unwrap();
        assert_eq!(pacing.typing_delay("abc"), 200);
        assert_eq!(pacing.inter_line_pause_ms, 100);
    }

    #[test]
    fn pacing_rejects_inverted_bounds() {
        let result = Pacing::parse_ron(
            "(per_char_ms: 10, min_typing_ms: 900, max_typing_ms: 800, inter_line_pause_ms: 100)",
        );
        assert!(matches!(result, Err(PacingError::Invalid(_))));
    }
}

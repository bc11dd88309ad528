/// Virtual time: delayed tasks on a single cooperative event loop.
///
/// Every pause in the conversation is a task scheduled here rather than a
/// real sleep. Hosts move time forward with `advance`; tests can skip
/// straight to the next due task.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Milliseconds since the conversation started.
pub type Millis = u64;

/// Work the conversation loop knows how to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// The typing delay for the front of the queue has elapsed.
    Reveal,
    /// The pause after a reveal has elapsed; the drain loop may continue.
    Resume,
    /// A scene's lead-in has elapsed; its lines may be queued.
    Narrate(String),
}

#[derive(Debug)]
struct Timer {
    due: Millis,
    seq: u64,
    task: Task,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Reversed so the max-heap pops the earliest (due, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending tasks ordered by due time, then by scheduling order.
#[derive(Debug, Default)]
pub struct Timeline {
    now: Millis,
    seq: u64,
    pending: BinaryHeap<Timer>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    /// Run `task` once `delay` milliseconds have passed.
    pub fn schedule(&mut self, delay: Millis, task: Task) {
        let timer = Timer {
            due: self.now.saturating_add(delay),
            seq: self.seq,
            task,
        };
        self.seq += 1;
        self.pending.push(timer);
    }

    /// Due time of the earliest pending task.
    pub fn next_due(&self) -> Option<Millis> {
        self.pending.peek().map(|timer| timer.due)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Pop the earliest task due at or before `until`, moving the clock to
    /// its due time.
    pub fn pop_due(&mut self, until: Millis) -> Option<Task> {
        if self.next_due()? > until {
            return None;
        }
        let timer = self.pending.pop()?;
        self.now = self.now.max(timer.due);
        Some(timer.task)
    }

    /// Move the clock forward without running anything. Never goes back.
    pub fn settle(&mut self, at: Millis) {
        self.now = self.now.max(at);
    }
}

/// Source of the current time for hosts that drive a timeline in real time.
pub trait Clock {
    fn now(&self) -> Millis;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(Cell<Millis>);

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self(Cell::new(start))
    }

    pub fn advance(&self, by: Millis) {
        self.0.set(self.0.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(300, Task::Resume);
        timeline.schedule(100, Task::Reveal);
        timeline.schedule(200, Task::Narrate("briefing".to_string()));

        assert_eq!(timeline.pop_due(1_000), Some(Task::Reveal));
        assert_eq!(timeline.now(), 100);
        assert_eq!(timeline.pop_due(1_000), Some(Task::Narrate("briefing".to_string())));
        assert_eq!(timeline.pop_due(1_000), Some(Task::Resume));
        assert_eq!(timeline.now(), 300);
        assert!(timeline.is_empty());
    }

    #[test]
    fn system_clock_never_goes_back() {
        let clock = SystemClock::new();
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.now() >= first + 5);
    }

    #[test]
    fn ties_keep_scheduling_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(50, Task::Resume);
        timeline.schedule(50, Task::Reveal);
        assert_eq!(timeline.pop_due(50), Some(Task::Resume));
        assert_eq!(timeline.pop_due(50), Some(Task::Reveal));
    }

    #[test]
    fn pop_due_respects_limit() {
        let mut timeline = Timeline::new();
        timeline.schedule(500, Task::Reveal);
        assert_eq!(timeline.pop_due(499), None);
        assert_eq!(timeline.now(), 0);
        assert_eq!(timeline.next_due(), Some(500));
    }

    #[test]
    fn delays_are_relative_to_now() {
        let mut timeline = Timeline::new();
        timeline.settle(1_000);
        timeline.schedule(250, Task::Reveal);
        assert_eq!(timeline.next_due(), Some(1_250));
        timeline.settle(10);
        assert_eq!(timeline.now(), 1_000);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(5);
        clock.advance(20);
        assert_eq!(clock.now(), 25);
    }
}

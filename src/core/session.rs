/// Session: the single mutable root shared by the scheduler and director.

use crate::core::grading::{AccuracySummary, GradeReport};
use crate::core::scheduler::{Pacing, Scheduler};
use crate::schema::claim::{AnnotationSet, Category, ClaimId};
use crate::schema::decision::{Decision, DecisionId, DecisionOption, Verdict};
use crate::schema::event::DialogueEvent;

/// What the verdict locked in: the choice and the grading at that instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictRecord {
    pub verdict: Verdict,
    pub report: GradeReport,
}

#[derive(Debug)]
pub struct Session {
    scheduler: Scheduler,
    decision: Option<Decision>,
    /// A decision that arrived while a line was still in its typing cycle.
    deferred: Option<Decision>,
    annotations: AnnotationSet,
    scene: Option<String>,
    verdict: Option<VerdictRecord>,
    next_decision_id: u64,
}

impl Session {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            scheduler: Scheduler::new(pacing),
            decision: None,
            deferred: None,
            annotations: AnnotationSet::new(),
            scene: None,
            verdict: None,
            next_decision_id: 1,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Put a decision in front of the player, or hold it until the
    /// scheduler goes idle.
    pub fn offer_decision(
        &mut self,
        scene: &str,
        options: Vec<DecisionOption>,
        events: &mut Vec<DialogueEvent>,
    ) -> DecisionId {
        if let Some(held) = &self.deferred {
            tracing::warn!(
                held = held.id.0,
                scene,
                "a decision is already waiting to be shown; ignoring the new one"
            );
            return held.id;
        }
        let decision = Decision {
            id: DecisionId(self.next_decision_id),
            scene: scene.to_string(),
            options,
        };
        self.next_decision_id += 1;
        let id = decision.id;

        if self.scheduler.is_idle() && self.decision.is_none() {
            events.push(DialogueEvent::DecisionPresented(decision.clone()));
            self.decision = Some(decision);
        } else {
            self.deferred = Some(decision);
        }
        id
    }

    /// Show a held decision once nothing is typing.
    pub fn promote_deferred(&mut self, events: &mut Vec<DialogueEvent>) {
        if self.decision.is_some() || !self.scheduler.is_idle() {
            return;
        }
        if let Some(decision) = self.deferred.take() {
            events.push(DialogueEvent::DecisionPresented(decision.clone()));
            self.decision = Some(decision);
        }
    }

    /// The decision currently shown, if any.
    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn has_pending_decision(&self) -> bool {
        self.decision.is_some() || self.deferred.is_some()
    }

    /// Remove and return the shown decision.
    pub fn take_decision(&mut self) -> Option<Decision> {
        self.decision.take()
    }

    /// Apply one highlighter click. See [`AnnotationSet::toggle`].
    pub fn annotate(&mut self, claim: ClaimId, category: Category) -> Option<Category> {
        self.annotations.toggle(claim, category)
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn set_scene(&mut self, scene: &str) {
        self.scene = Some(scene.to_string());
    }

    pub fn record_verdict(&mut self, verdict: Verdict, report: GradeReport) {
        self.verdict = Some(VerdictRecord { verdict, report });
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict.as_ref().map(|record| record.verdict)
    }

    pub fn verdict_record(&self) -> Option<&VerdictRecord> {
        self.verdict.as_ref()
    }

    /// Accuracy as it stood when the verdict was given.
    pub fn accuracy(&self) -> Option<AccuracySummary> {
        self.verdict.as_ref().map(|record| record.report.summary)
    }

    /// The conversation has gone quiet: nothing queued or typing, no
    /// decision waiting, and at least one line on screen.
    pub fn is_finished(&self) -> bool {
        self.scheduler.pending_len() == 0
            && !self.scheduler.is_typing()
            && !self.has_pending_decision()
            && !self.scheduler.history().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timeline::Timeline;

    fn options() -> Vec<DecisionOption> {
        vec![DecisionOption::new("Got it!", "understood")]
    }

    #[test]
    fn fresh_session_is_not_finished() {
        let session = Session::new(Pacing::default());
        assert!(!session.is_finished());
        assert!(session.scene().is_none());
        assert!(session.accuracy().is_none());
    }

    #[test]
    fn decision_shown_when_idle() {
        let mut session = Session::new(Pacing::default());
        let mut events = Vec::new();
        let id = session.offer_decision("briefing", options(), &mut events);
        assert_eq!(session.decision().map(|d| d.id), Some(id));
        assert!(matches!(events[0], DialogueEvent::DecisionPresented(_)));
    }

    #[test]
    fn decision_deferred_while_typing() {
        let mut session = Session::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();

        session
            .scheduler_mut()
            .enqueue(["Amazing!"], &mut timeline, &mut events);
        session.offer_decision("briefing", options(), &mut events);
        assert!(session.decision().is_none());
        assert!(session.has_pending_decision());

        // Still held while mid-reveal.
        session.promote_deferred(&mut events);
        assert!(session.decision().is_none());

        while let Some(task) = timeline.pop_due(u64::MAX) {
            match task {
                crate::core::timeline::Task::Reveal => {
                    session.scheduler_mut().reveal(&mut timeline, &mut events)
                }
                crate::core::timeline::Task::Resume => {
                    session.scheduler_mut().resume(&mut timeline, &mut events);
                }
                crate::core::timeline::Task::Narrate(_) => {}
            }
        }
        session.promote_deferred(&mut events);
        assert!(session.decision().is_some());
        assert!(matches!(events.last(), Some(DialogueEvent::DecisionPresented(_))));
    }

    #[test]
    fn second_deferred_decision_keeps_the_first() {
        let mut session = Session::new(Pacing::default());
        let mut timeline = Timeline::new();
        let mut events = Vec::new();

        session
            .scheduler_mut()
            .enqueue(["Amazing!"], &mut timeline, &mut events);
        let first = session.offer_decision("briefing", options(), &mut events);
        let second = session.offer_decision(
            "explanation",
            vec![DecisionOption::new("Guilty", "guilty")],
            &mut events,
        );
        assert_eq!(second, first);
        assert!(session.has_pending_decision());
        assert!(session.decision().is_none());
    }

    #[test]
    fn finished_once_quiet() {
        let mut session = Session::new(Pacing::default());
        session.scheduler_mut().record_response("Got it!", 0);
        assert!(session.is_finished());

        let mut events = Vec::new();
        session.offer_decision("x", options(), &mut events);
        assert!(!session.is_finished());
    }
}

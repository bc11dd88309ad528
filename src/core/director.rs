/// Scene director: walks the script graph one scene at a time.
///
/// A scene's lines are queued when its lead-in elapses. Its exit runs only
/// after the scheduler reports the queue drained, so a decision never
/// appears while the narrator is still talking.

use crate::core::answer_key::AnswerKeyStore;
use crate::core::conversation::DialogueError;
use crate::core::grading::{grade_report, GradeReport};
use crate::core::script::{ChoiceSpec, SceneExit, Script};
use crate::core::session::Session;
use crate::core::template::RenderContext;
use crate::core::timeline::{Task, Timeline};
use crate::schema::decision::Verdict;
use crate::schema::event::DialogueEvent;

/// Receives the player's verdict. Called at most once per conversation.
pub trait VerdictSink {
    fn report_verdict(&mut self, verdict: Verdict);
}

impl<F> VerdictSink for F
where
    F: FnMut(Verdict),
{
    fn report_verdict(&mut self, verdict: Verdict) {
        self(verdict)
    }
}

pub struct Director {
    script: Script,
    store: AnswerKeyStore,
    suspect: String,
    sink: Box<dyn VerdictSink>,
    /// Scene whose exit runs when the queue next drains.
    awaiting: Option<String>,
    closed: bool,
}

impl std::fmt::Debug for Director {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Director")
            .field("title", &self.script.title)
            .field("suspect", &self.suspect)
            .field("store", &self.store.status())
            .field("awaiting", &self.awaiting)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Director {
    pub fn new(script: Script, store: AnswerKeyStore, sink: Box<dyn VerdictSink>) -> Self {
        let suspect = script.suspect.clone();
        Self {
            script,
            store,
            suspect,
            sink,
            awaiting: None,
            closed: false,
        }
    }

    /// Grade a different suspect than the one the script names.
    pub fn with_suspect(mut self, suspect: impl Into<String>) -> Self {
        self.suspect = suspect.into();
        self
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn store(&self) -> &AnswerKeyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnswerKeyStore {
        &mut self.store
    }

    pub fn suspect(&self) -> &str {
        &self.suspect
    }

    /// The script has reached an `End` exit.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn start(
        &mut self,
        session: &mut Session,
        timeline: &mut Timeline,
        events: &mut Vec<DialogueEvent>,
    ) -> Result<(), DialogueError> {
        let start = self.script.start.clone();
        tracing::info!(title = %self.script.title, start = %start, "conversation started");
        self.goto(&start, session, timeline, events)
    }

    fn goto(
        &mut self,
        name: &str,
        session: &mut Session,
        timeline: &mut Timeline,
        events: &mut Vec<DialogueEvent>,
    ) -> Result<(), DialogueError> {
        let scene = self
            .script
            .scene(name)
            .ok_or_else(|| DialogueError::UnknownScene(name.to_string()))?;
        tracing::debug!(scene = name, lead_in = scene.lead_in, "entering scene");
        timeline.schedule(scene.lead_in, Task::Narrate(name.to_string()));
        session.set_scene(name);
        events.push(DialogueEvent::SceneEntered(name.to_string()));
        Ok(())
    }

    /// A scene's lead-in has elapsed: render and queue its lines.
    pub fn narrate(
        &mut self,
        name: &str,
        session: &mut Session,
        timeline: &mut Timeline,
        events: &mut Vec<DialogueEvent>,
    ) {
        let Some(scene) = self.script.scene(name) else {
            tracing::warn!(scene = name, "narrate for unknown scene");
            return;
        };

        let summary = session.accuracy().unwrap_or_default();
        let verdict = session.verdict();
        let ctx = RenderContext {
            summary,
            suspect: &self.suspect,
            verdict,
        };
        let lines: Vec<String> = scene
            .lines_for(verdict, &summary)
            .iter()
            .map(|template| template.render(&ctx))
            .collect();

        self.awaiting = Some(name.to_string());
        let queued = session.scheduler_mut().enqueue(lines, timeline, events);
        tracing::debug!(scene = name, queued, "scene lines queued");

        // Nothing to say: the exit runs straight away.
        if session.scheduler().is_idle() {
            self.on_drained(session, timeline, events);
        }
    }

    /// The scheduler finished speaking. Run the exit of the scene that was
    /// waiting on it.
    pub fn on_drained(
        &mut self,
        session: &mut Session,
        timeline: &mut Timeline,
        events: &mut Vec<DialogueEvent>,
    ) {
        let Some(name) = self.awaiting.take() else {
            return;
        };
        let Some(exit) = self.script.scene(&name).map(|scene| scene.exit.clone()) else {
            return;
        };

        match exit {
            SceneExit::Continue(next) => {
                if let Err(e) = self.goto(&next, session, timeline, events) {
                    tracing::error!(scene = %name, error = %e, "cannot continue");
                }
            }
            SceneExit::Choice(options) | SceneExit::Verdict(options) => {
                let options = options.iter().map(ChoiceSpec::to_option).collect();
                let id = session.offer_decision(&name, options, events);
                tracing::debug!(scene = %name, decision = id.0, "decision offered");
            }
            SceneExit::End => {
                self.closed = true;
                tracing::info!(scene = %name, "conversation finished");
                events.push(DialogueEvent::Finished);
            }
        }
    }

    /// Apply the player's pick for the decision on screen.
    ///
    /// Fails without changing anything when no decision is shown or the
    /// value is not one of its options.
    pub fn resolve(
        &mut self,
        value: &str,
        session: &mut Session,
        timeline: &mut Timeline,
        events: &mut Vec<DialogueEvent>,
    ) -> Result<(), DialogueError> {
        let decision = session.decision().ok_or(DialogueError::NoPendingDecision)?;
        let label = decision
            .option(value)
            .map(|option| option.label.clone())
            .ok_or_else(|| DialogueError::UnknownOption(value.to_string()))?;
        let scene = self
            .script
            .scene(&decision.scene)
            .ok_or_else(|| DialogueError::UnknownScene(decision.scene.clone()))?;
        let next = scene
            .exit
            .options()
            .iter()
            .find(|choice| choice.value == value)
            .map(|choice| choice.next.clone())
            .ok_or_else(|| DialogueError::UnknownOption(value.to_string()))?;
        let verdict = match scene.exit {
            SceneExit::Verdict(_) => Some(
                Verdict::from_value(value)
                    .ok_or_else(|| DialogueError::UnknownOption(value.to_string()))?,
            ),
            _ => None,
        };

        let Some(decision) = session.take_decision() else {
            return Err(DialogueError::NoPendingDecision);
        };
        let line = session
            .scheduler_mut()
            .record_response(&label, timeline.now());
        events.push(DialogueEvent::LineRevealed(line));
        events.push(DialogueEvent::DecisionResolved {
            id: decision.id,
            value: value.to_string(),
        });
        tracing::info!(scene = %decision.scene, value, "decision resolved");

        if let Some(verdict) = verdict {
            self.deliver_verdict(verdict, session, events);
        }
        self.goto(&next, session, timeline, events)
    }

    /// Lock in the grading and tell the host. Later verdicts are ignored.
    fn deliver_verdict(
        &mut self,
        verdict: Verdict,
        session: &mut Session,
        events: &mut Vec<DialogueEvent>,
    ) {
        if session.verdict().is_some() {
            tracing::debug!(verdict = verdict.value(), "verdict already recorded");
            return;
        }

        let report = match self.grade_report(session) {
            Some(report) => report,
            None => {
                tracing::warn!(
                    suspect = %self.suspect,
                    status = ?self.store.status(),
                    "no answer key at verdict time; accuracy recorded as zero"
                );
                GradeReport::default()
            }
        };
        let summary = report.summary;
        session.record_verdict(verdict, report);
        self.sink.report_verdict(verdict);
        events.push(DialogueEvent::VerdictReported(verdict));
        tracing::info!(
            verdict = verdict.value(),
            correct = summary.correct,
            incorrect = summary.incorrect,
            total = summary.total,
            "verdict reported"
        );
    }

    /// Grade the current annotations. `None` until the answer key is
    /// available for this suspect.
    pub fn grade_report(&self, session: &Session) -> Option<GradeReport> {
        let key = self.store.answer_key(&self.suspect)?;
        Some(grade_report(&key, session.annotations()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::Pacing;
    use std::cell::RefCell;
    use std::rc::Rc;

    const GATED: &str = r#"(
        title: "Gate",
        suspect: "Flora Jasmine",
        start: "ask",
        scenes: {
            "ask": (
                lines: ["Well?"],
                exit: Verdict([
                    (label: "Guilty", value: "guilty", next: "after"),
                    (label: "Not guilty", value: "not-guilty", next: "after"),
                ]),
            ),
            "after": (lead_in: 100, lines: ["{verdict}: {correct}/{total}"], exit: End),
        },
    )"#;

    struct Rig {
        director: Director,
        session: Session,
        timeline: Timeline,
        events: Vec<DialogueEvent>,
        reported: Rc<RefCell<Vec<Verdict>>>,
    }

    impl Rig {
        fn new(source: &str) -> Self {
            let reported = Rc::new(RefCell::new(Vec::new()));
            let sink = {
                let reported = Rc::clone(&reported);
                move |verdict: Verdict| reported.borrow_mut().push(verdict)
            };
            Self {
                director: Director::new(
                    Script::parse_ron(source).unwrap(),
                    AnswerKeyStore::embedded(),
                    Box::new(sink),
                ),
                session: Session::new(Pacing::instant()),
                timeline: Timeline::new(),
                events: Vec::new(),
                reported,
            }
        }

        fn run(&mut self) {
            while let Some(task) = self.timeline.pop_due(u64::MAX) {
                match task {
                    Task::Reveal => self
                        .session
                        .scheduler_mut()
                        .reveal(&mut self.timeline, &mut self.events),
                    Task::Resume => {
                        if self
                            .session
                            .scheduler_mut()
                            .resume(&mut self.timeline, &mut self.events)
                        {
                            self.session.promote_deferred(&mut self.events);
                            self.director.on_drained(
                                &mut self.session,
                                &mut self.timeline,
                                &mut self.events,
                            );
                        }
                    }
                    Task::Narrate(name) => self.director.narrate(
                        &name,
                        &mut self.session,
                        &mut self.timeline,
                        &mut self.events,
                    ),
                }
            }
        }

        fn resolve(&mut self, value: &str) -> Result<(), DialogueError> {
            self.director.resolve(
                value,
                &mut self.session,
                &mut self.timeline,
                &mut self.events,
            )
        }
    }

    #[test]
    fn decision_waits_for_drain() {
        let mut rig = Rig::new(GATED);
        rig.director
            .start(&mut rig.session, &mut rig.timeline, &mut rig.events)
            .unwrap();
        assert!(rig.session.decision().is_none());
        rig.run();
        let decision = rig.session.decision().unwrap();
        assert_eq!(decision.options.len(), 2);
        assert_eq!(rig.session.scheduler().history().len(), 1);
    }

    #[test]
    fn verdict_reported_once_and_graded() {
        let mut rig = Rig::new(GATED);
        rig.director
            .start(&mut rig.session, &mut rig.timeline, &mut rig.events)
            .unwrap();
        rig.run();
        rig.resolve("not-guilty").unwrap();
        rig.run();

        assert_eq!(*rig.reported.borrow(), vec![Verdict::NotGuilty]);
        let summary = rig.session.accuracy().unwrap();
        assert_eq!(summary.total, 19);
        // Nothing marked: only the supported claims pass.
        assert_eq!(summary.correct, 11);

        let last = rig.session.scheduler().history().last().unwrap();
        assert_eq!(last.text, "not-guilty: 11/19");
        assert!(rig.director.is_closed());
        assert_eq!(rig.events.last(), Some(&DialogueEvent::Finished));
    }

    #[test]
    fn unknown_option_leaves_decision() {
        let mut rig = Rig::new(GATED);
        rig.director
            .start(&mut rig.session, &mut rig.timeline, &mut rig.events)
            .unwrap();
        rig.run();
        let err = rig.resolve("maybe").unwrap_err();
        assert!(matches!(err, DialogueError::UnknownOption(_)));
        assert!(rig.session.decision().is_some());
        assert!(rig.reported.borrow().is_empty());
    }

    #[test]
    fn resolve_without_decision() {
        let mut rig = Rig::new(GATED);
        assert!(matches!(
            rig.resolve("guilty"),
            Err(DialogueError::NoPendingDecision)
        ));
    }

    #[test]
    fn empty_scene_exits_immediately() {
        let mut rig = Rig::new(
            r#"(
                title: "Silent",
                suspect: "Ada",
                start: "quiet",
                scenes: { "quiet": (exit: End) },
            )"#,
        );
        rig.director
            .start(&mut rig.session, &mut rig.timeline, &mut rig.events)
            .unwrap();
        rig.run();
        assert!(rig.director.is_closed());
    }
}

/// The conversation: scheduler, director and virtual time behind one handle.
///
/// Built via `Conversation::builder()`. Hosts call `start`, move time with
/// `advance` (or `sync` against a clock), forward player input with
/// `choose` / `click_claim`, and drain `DialogueEvent`s after each call.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::answer_key::{AnswerBook, AnswerKeyStore, StoreError};
use crate::core::director::{Director, VerdictSink};
use crate::core::grading::{AccuracySummary, GradeReport};
use crate::core::scheduler::{Pacing, PacingError};
use crate::core::script::{Script, ScriptError};
use crate::core::session::Session;
use crate::core::timeline::{Clock, Millis, Task, Timeline};
use crate::schema::claim::{AnnotationSet, AnswerKeyEntry, Category, ClaimId};
use crate::schema::decision::{Decision, Verdict};
use crate::schema::event::DialogueEvent;
use crate::schema::line::Line;

/// Upper bound on tasks run by one `run_until_idle` call. Only a script
/// that loops through silent scenes gets near it.
const MAX_STEPS: usize = 100_000;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("pacing error: {0}")]
    Pacing(#[from] PacingError),
    #[error("no decision is waiting for an answer")]
    NoPendingDecision,
    #[error("'{0}' is not one of the offered options")]
    UnknownOption(String),
    #[error("scene not found: {0}")]
    UnknownScene(String),
}

/// What a click on a summary sentence did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimClick {
    /// After the verdict, a sourced claim opens its source document.
    OpenSource(String),
    /// The highlighter was applied; holds the claim's mark afterwards.
    Marked(Option<Category>),
    Ignored,
}

pub struct Conversation {
    session: Session,
    director: Director,
    timeline: Timeline,
    events: Vec<DialogueEvent>,
    started: bool,
}

/// Builder for constructing a `Conversation`.
pub struct ConversationBuilder {
    script: Option<Script>,
    script_path: Option<PathBuf>,
    pacing: Option<Pacing>,
    pacing_path: Option<PathBuf>,
    store: Option<AnswerKeyStore>,
    answer_key_path: Option<PathBuf>,
    suspect: Option<String>,
    sink: Option<Box<dyn VerdictSink>>,
}

impl Conversation {
    pub fn builder() -> ConversationBuilder {
        ConversationBuilder {
            script: None,
            script_path: None,
            pacing: None,
            pacing_path: None,
            store: None,
            answer_key_path: None,
            suspect: None,
            sink: None,
        }
    }

    /// Enter the start scene. Calling it again does nothing.
    pub fn start(&mut self) -> Result<(), DialogueError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.director
            .start(&mut self.session, &mut self.timeline, &mut self.events)
    }

    pub fn now(&self) -> Millis {
        self.timeline.now()
    }

    /// When the next timed step happens, if any is scheduled.
    pub fn next_due(&self) -> Option<Millis> {
        self.timeline.next_due()
    }

    pub fn advance(&mut self, by: Millis) {
        let target = self.timeline.now().saturating_add(by);
        self.advance_to(target);
    }

    /// Run every task due at or before `at`, then move the clock to `at`.
    pub fn advance_to(&mut self, at: Millis) {
        while let Some(task) = self.timeline.pop_due(at) {
            self.dispatch(task);
        }
        self.timeline.settle(at);
    }

    /// Catch up with a real clock.
    pub fn sync(&mut self, clock: &dyn Clock) {
        self.advance_to(clock.now());
    }

    /// Run until nothing is scheduled: the conversation is waiting on the
    /// player or has ended. Returns the virtual time afterwards.
    pub fn run_until_idle(&mut self) -> Millis {
        let mut steps = 0;
        while let Some(task) = self.timeline.pop_due(Millis::MAX) {
            self.dispatch(task);
            steps += 1;
            if steps >= MAX_STEPS {
                tracing::warn!(steps, "run_until_idle gave up; script may loop");
                break;
            }
        }
        self.timeline.now()
    }

    fn dispatch(&mut self, task: Task) {
        match task {
            Task::Reveal => self
                .session
                .scheduler_mut()
                .reveal(&mut self.timeline, &mut self.events),
            Task::Resume => {
                let drained = self
                    .session
                    .scheduler_mut()
                    .resume(&mut self.timeline, &mut self.events);
                if drained {
                    self.session.promote_deferred(&mut self.events);
                    self.director
                        .on_drained(&mut self.session, &mut self.timeline, &mut self.events);
                }
            }
            Task::Narrate(scene) => self.director.narrate(
                &scene,
                &mut self.session,
                &mut self.timeline,
                &mut self.events,
            ),
        }
    }

    /// Answer the decision on screen with one of its option values.
    pub fn choose(&mut self, value: &str) -> Result<(), DialogueError> {
        self.director
            .resolve(value, &mut self.session, &mut self.timeline, &mut self.events)
    }

    /// Toggle a highlighter mark on a claim.
    pub fn annotate(&mut self, claim: ClaimId, category: Category) -> Option<Category> {
        let mark = self.session.annotate(claim, category);
        tracing::trace!(claim = claim.0, mark = ?mark, "annotation changed");
        mark
    }

    /// Handle a click on a summary sentence while `highlighter` is selected.
    pub fn click_claim(&mut self, claim: ClaimId, highlighter: Option<Category>) -> ClaimClick {
        if self.session.verdict().is_some() {
            if let Some(source) = self
                .revealed_answer(claim)
                .and_then(|entry| entry.source.clone())
            {
                return ClaimClick::OpenSource(source);
            }
        }
        match highlighter {
            Some(category) => ClaimClick::Marked(self.annotate(claim, category)),
            None => ClaimClick::Ignored,
        }
    }

    /// The answer for a claim. Hidden until the verdict has been given.
    pub fn revealed_answer(&self, claim: ClaimId) -> Option<&AnswerKeyEntry> {
        self.session.verdict()?;
        self.director
            .store()
            .entry(self.director.suspect(), claim)
            .entry()
    }

    /// Grade the annotations as they stand now.
    pub fn grade_report(&self) -> Option<GradeReport> {
        self.director.grade_report(&self.session)
    }

    /// The grading locked in by the verdict; its mistakes are the
    /// corrected sheet.
    pub fn corrected_sheet(&self) -> Option<&GradeReport> {
        self.session.verdict_record().map(|record| &record.report)
    }

    /// Accuracy as of the verdict.
    pub fn accuracy(&self) -> Option<AccuracySummary> {
        self.session.accuracy()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.session.verdict()
    }

    pub fn history(&self) -> &[Line] {
        self.session.scheduler().history()
    }

    pub fn current_decision(&self) -> Option<&Decision> {
        self.session.decision()
    }

    pub fn is_typing(&self) -> bool {
        self.session.scheduler().is_typing()
    }

    /// Nothing queued, nothing typing, no decision waiting, and something
    /// has been said.
    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// The script has reached its end.
    pub fn is_closed(&self) -> bool {
        self.director.is_closed()
    }

    pub fn scene(&self) -> Option<&str> {
        self.session.scene()
    }

    pub fn annotations(&self) -> &AnnotationSet {
        self.session.annotations()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn script(&self) -> &Script {
        self.director.script()
    }

    pub fn store(&self) -> &AnswerKeyStore {
        self.director.store()
    }

    /// Complete an answer key load that was pending at build time.
    pub fn finish_answer_key_load(&mut self, result: Result<AnswerBook, StoreError>) {
        self.director.store_mut().finish(result);
    }

    /// Take every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<DialogueEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("now", &self.timeline.now())
            .field("scene", &self.session.scene())
            .field("director", &self.director)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl ConversationBuilder {
    /// Provide a script directly (for testing without files).
    pub fn script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }

    pub fn script_path(mut self, path: impl AsRef<Path>) -> Self {
        self.script_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = Some(pacing);
        self
    }

    pub fn pacing_path(mut self, path: impl AsRef<Path>) -> Self {
        self.pacing_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide an answer key store directly, possibly still loading.
    pub fn answer_keys(mut self, store: AnswerKeyStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Load answer keys from a file. Falls back to the embedded book when
    /// the file is missing or malformed.
    pub fn answer_key_path(mut self, path: impl AsRef<Path>) -> Self {
        self.answer_key_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Grade this suspect instead of the one the script names.
    pub fn suspect(mut self, name: &str) -> Self {
        self.suspect = Some(name.to_string());
        self
    }

    pub fn verdict_sink(mut self, sink: impl VerdictSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Conversation, DialogueError> {
        let script = match (self.script, self.script_path) {
            (Some(script), _) => script,
            (None, Some(path)) => Script::load_from_ron(&path)?,
            (None, None) => Script::reference()?,
        };
        script.check()?;

        let pacing = match (self.pacing, self.pacing_path) {
            (Some(pacing), _) => pacing,
            (None, Some(path)) => Pacing::load_from_ron(&path)?,
            (None, None) => Pacing::default(),
        };

        let store = match (self.store, self.answer_key_path) {
            (Some(store), _) => store,
            (None, Some(path)) => AnswerKeyStore::load_from_ron(&path),
            (None, None) => AnswerKeyStore::embedded(),
        };

        let sink: Box<dyn VerdictSink> = match self.sink {
            Some(sink) => sink,
            None => Box::new(|_: Verdict| {}),
        };
        let mut director = Director::new(script, store, sink);
        if let Some(suspect) = self.suspect {
            director = director.with_suspect(suspect);
        }

        Ok(Conversation {
            session: Session::new(pacing),
            director,
            timeline: Timeline::new(),
            events: Vec::new(),
            started: false,
        })
    }
}

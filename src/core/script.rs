/// Conversation scripts: the narrative graph as data.
///
/// A script is a table of named scenes. Each scene has an optional lead-in
/// delay, the narrator lines to queue, and an exit that says what happens
/// once those lines have been read.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

use crate::core::grading::AccuracySummary;
use crate::core::template::{LineTemplate, TemplateError};
use crate::core::timeline::Millis;
use crate::schema::decision::{DecisionOption, Verdict};

/// Script for the reference case, compiled into the binary.
const REFERENCE_SCRIPT: &str = include_str!("../../case_data/flora_jasmine/script.ron");

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("template error in scene '{scene}': {source}")]
    Template {
        scene: String,
        #[source]
        source: TemplateError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid script: {0}")]
    Invalid(String),
}

/// One option of a gate, and where it leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSpec {
    pub label: String,
    pub value: String,
    pub next: String,
}

impl ChoiceSpec {
    pub fn to_option(&self) -> DecisionOption {
        DecisionOption::new(self.label.clone(), self.value.clone())
    }
}

/// What a scene does after its lines have been read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneExit {
    /// Go straight on to another scene.
    Continue(String),
    /// Wait for the player to pick an option.
    Choice(Vec<ChoiceSpec>),
    /// Like `Choice`, but the value is a verdict: it is reported to the
    /// host and locks in the accuracy snapshot.
    Verdict(Vec<ChoiceSpec>),
    End,
}

impl SceneExit {
    pub fn options(&self) -> &[ChoiceSpec] {
        match self {
            Self::Choice(options) | Self::Verdict(options) => options,
            Self::Continue(_) | Self::End => &[],
        }
    }

    /// Every scene this exit can lead to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Continue(next) => vec![next.as_str()],
            Self::Choice(options) | Self::Verdict(options) => {
                options.iter().map(|opt| opt.next.as_str()).collect()
            }
            Self::End => Vec::new(),
        }
    }
}

/// Lines picked by verdict and by whether every claim was classified right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackBranch {
    pub verdict: Verdict,
    pub all_correct: bool,
    pub lines: Vec<LineTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Narration {
    Lines(Vec<LineTemplate>),
    Feedback(Vec<FeedbackBranch>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub name: String,
    /// Wait before the scene's lines are queued.
    pub lead_in: Millis,
    pub narration: Narration,
    pub exit: SceneExit,
}

impl Scene {
    /// The lines to queue, given the verdict and accuracy at hand.
    ///
    /// Feedback scenes with no verdict yet are treated as not-guilty. A
    /// feedback scene with no matching branch says nothing.
    pub fn lines_for(
        &self,
        verdict: Option<Verdict>,
        summary: &AccuracySummary,
    ) -> &[LineTemplate] {
        match &self.narration {
            Narration::Lines(lines) => lines,
            Narration::Feedback(branches) => {
                let verdict = verdict.unwrap_or(Verdict::NotGuilty);
                let all_correct = summary.all_correct();
                branches
                    .iter()
                    .find(|b| b.verdict == verdict && b.all_correct == all_correct)
                    .map(|b| b.lines.as_slice())
                    .unwrap_or(&[])
            }
        }
    }
}

/// How bad a script problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptIssue {
    pub severity: Severity,
    pub message: String,
}

impl ScriptIssue {
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
        }
    }
}

/// A complete conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub title: String,
    /// The suspect whose summary the player is grading.
    pub suspect: String,
    pub start: String,
    pub scenes: FxHashMap<String, Scene>,
}

// RON deserialization helpers: authors write plain strings, the runtime
// wants parsed templates.

#[derive(Debug, Deserialize)]
struct RonFeedback {
    verdict: Verdict,
    all_correct: bool,
    lines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RonScene {
    #[serde(default)]
    lead_in: Millis,
    #[serde(default)]
    lines: Vec<String>,
    #[serde(default)]
    feedback: Vec<RonFeedback>,
    exit: SceneExit,
}

#[derive(Debug, Deserialize)]
struct RonScript {
    title: String,
    suspect: String,
    start: String,
    scenes: FxHashMap<String, RonScene>,
}

fn parse_lines(scene: &str, lines: Vec<String>) -> Result<Vec<LineTemplate>, ScriptError> {
    lines
        .iter()
        .map(|line| {
            LineTemplate::parse(line).map_err(|source| ScriptError::Template {
                scene: scene.to_string(),
                source,
            })
        })
        .collect()
}

impl Script {
    pub fn load_from_ron(path: &Path) -> Result<Script, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Script, ScriptError> {
        let raw: RonScript = ron::from_str(input)?;
        let mut scenes = FxHashMap::default();

        for (name, ron_scene) in raw.scenes {
            let narration = if ron_scene.feedback.is_empty() {
                Narration::Lines(parse_lines(&name, ron_scene.lines)?)
            } else {
                if !ron_scene.lines.is_empty() {
                    return Err(ScriptError::Invalid(format!(
                        "scene '{}' has both lines and feedback branches",
                        name
                    )));
                }
                let mut branches = Vec::new();
                for branch in ron_scene.feedback {
                    branches.push(FeedbackBranch {
                        verdict: branch.verdict,
                        all_correct: branch.all_correct,
                        lines: parse_lines(&name, branch.lines)?,
                    });
                }
                Narration::Feedback(branches)
            };

            scenes.insert(
                name.clone(),
                Scene {
                    name,
                    lead_in: ron_scene.lead_in,
                    narration,
                    exit: ron_scene.exit,
                },
            );
        }

        Ok(Script {
            title: raw.title,
            suspect: raw.suspect,
            start: raw.start,
            scenes,
        })
    }

    /// The Flora Jasmine case that ships with the crate.
    pub fn reference() -> Result<Script, ScriptError> {
        Self::parse_ron(REFERENCE_SCRIPT)
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// Look for authoring mistakes.
    pub fn validate(&self) -> Vec<ScriptIssue> {
        let mut issues = Vec::new();

        if !self.scenes.contains_key(&self.start) {
            issues.push(ScriptIssue::error(format!(
                "start scene '{}' does not exist",
                self.start
            )));
        }

        let mut names: Vec<&String> = self.scenes.keys().collect();
        names.sort();

        for name in &names {
            let scene = &self.scenes[*name];

            for target in scene.exit.targets() {
                if !self.scenes.contains_key(target) {
                    issues.push(ScriptIssue::error(format!(
                        "scene '{}' leads to non-existent scene '{}'",
                        name, target
                    )));
                }
            }

            if let SceneExit::Choice(options) | SceneExit::Verdict(options) = &scene.exit {
                if options.is_empty() {
                    issues.push(ScriptIssue::error(format!(
                        "scene '{}' has a gate with no options",
                        name
                    )));
                }
                let mut seen = FxHashSet::default();
                for option in options {
                    if !seen.insert(option.value.as_str()) {
                        issues.push(ScriptIssue::error(format!(
                            "scene '{}' offers value '{}' more than once",
                            name, option.value
                        )));
                    }
                }
            }

            if let SceneExit::Verdict(options) = &scene.exit {
                for option in options {
                    if Verdict::from_value(&option.value).is_none() {
                        issues.push(ScriptIssue::error(format!(
                            "scene '{}' has verdict option '{}' \
                             (expected 'guilty' or 'not-guilty')",
                            name, option.value
                        )));
                    }
                }
            }

            if let Narration::Feedback(branches) = &scene.narration {
                for verdict in [Verdict::Guilty, Verdict::NotGuilty] {
                    for all_correct in [true, false] {
                        let covered = branches
                            .iter()
                            .any(|b| b.verdict == verdict && b.all_correct == all_correct);
                        if !covered {
                            issues.push(ScriptIssue::warning(format!(
                                "feedback scene '{}' has no branch for verdict '{}' \
                                 with all_correct = {}",
                                name,
                                verdict.value(),
                                all_correct
                            )));
                        }
                    }
                }
            }
        }

        let reachable = self.reachable();
        for name in &names {
            if !reachable.contains(name.as_str()) {
                issues.push(ScriptIssue::warning(format!(
                    "scene '{}' is unreachable from '{}'",
                    name, self.start
                )));
            }
        }

        let has_end = reachable
            .iter()
            .filter_map(|name| self.scenes.get(*name))
            .any(|scene| scene.exit == SceneExit::End);
        if !has_end {
            issues.push(ScriptIssue::warning(
                "no reachable scene ends the conversation".to_string(),
            ));
        }

        issues
    }

    /// Validate and fail on any error-level issue.
    pub fn check(&self) -> Result<(), ScriptError> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|issue| issue.severity == Severity::Error)
            .map(|issue| issue.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScriptError::Invalid(errors.join("; ")))
        }
    }

    /// Scene names reachable from the start scene.
    fn reachable(&self) -> FxHashSet<&str> {
        let mut seen = FxHashSet::default();
        let mut frontier = VecDeque::from([self.start.as_str()]);
        while let Some(name) = frontier.pop_front() {
            let Some(scene) = self.scenes.get(name) else {
                continue;
            };
            if !seen.insert(scene.name.as_str()) {
                continue;
            }
            frontier.extend(scene.exit.targets());
        }
        seen
    }
}

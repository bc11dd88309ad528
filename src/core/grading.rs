/// Annotation grading: scores the player's marks against the answer key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::claim::{AnnotationSet, AnswerKeyEntry, Category, ClaimId};

/// Tally of one grading pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub correct: u32,
    pub incorrect: u32,
    pub total: u32,
}

impl AccuracySummary {
    /// Nothing wrong, and something was actually graded.
    pub fn all_correct(&self) -> bool {
        self.incorrect == 0 && self.total > 0
    }
}

/// The ground truth for every gradable claim of one summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    entries: BTreeMap<ClaimId, AnswerKeyEntry>,
}

impl AnswerKey {
    pub fn new(entries: impl IntoIterator<Item = AnswerKeyEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.claim, entry))
                .collect(),
        }
    }

    pub fn get(&self, claim: ClaimId) -> Option<&AnswerKeyEntry> {
        self.entries.get(&claim)
    }

    pub fn entries(&self) -> impl Iterator<Item = &AnswerKeyEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How one claim was judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimGrade {
    pub claim: ClaimId,
    pub expected: Category,
    pub marked: Option<Category>,
    pub correct: bool,
}

/// A full grading pass: the tally plus every claim's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GradeReport {
    pub summary: AccuracySummary,
    pub claims: Vec<ClaimGrade>,
}

impl GradeReport {
    /// The corrected sheet: every claim the player got wrong.
    pub fn mistakes(&self) -> impl Iterator<Item = &ClaimGrade> {
        self.claims.iter().filter(|grade| !grade.correct)
    }
}

/// Judge a single claim. An unmarked claim only passes when it is true.
pub fn judge(expected: Category, marked: Option<Category>) -> bool {
    match marked {
        Some(category) => category == expected,
        None => expected == Category::Supported,
    }
}

/// Grade every claim in the key. Marks on claims the key does not know
/// are ignored.
pub fn grade_report(key: &AnswerKey, annotations: &AnnotationSet) -> GradeReport {
    let mut summary = AccuracySummary::default();
    let mut claims = Vec::with_capacity(key.len());

    for entry in key.entries() {
        let marked = annotations.get(entry.claim);
        let correct = judge(entry.category, marked);
        if correct {
            summary.correct += 1;
        } else {
            summary.incorrect += 1;
        }
        claims.push(ClaimGrade {
            claim: entry.claim,
            expected: entry.category,
            marked,
            correct,
        });
    }

    summary.total = summary.correct + summary.incorrect;
    GradeReport { summary, claims }
}

/// Grade and keep only the tally.
pub fn grade(key: &AnswerKey, annotations: &AnnotationSet) -> AccuracySummary {
    grade_report(key, annotations).summary
}

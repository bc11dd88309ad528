use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Newtype wrapper for claim ordinals (the phrase number in the summary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub u32);

/// The three classifications a claim can carry.
///
/// The colour aliases match the highlighter pens in the case UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(alias = "Green")]
    Supported,
    #[serde(alias = "Red")]
    Misleading,
    #[serde(alias = "Purple")]
    Fabricated,
}

impl Category {
    /// Highlighter colour for this category.
    pub fn colour(&self) -> &'static str {
        match self {
            Self::Supported => "green",
            Self::Misleading => "red",
            Self::Fabricated => "purple",
        }
    }

    /// Tooltip shown once the answer key is revealed.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Supported => "FACT - Supported by evidence",
            Self::Misleading => "MISREPRESENTATION - Misleading interpretation",
            Self::Fabricated => "HALLUCINATION - No evidence found",
        }
    }

    /// Accepts either the colour or the category name, case-insensitively.
    pub fn parse(s: &str) -> Option<Category> {
        match s.to_lowercase().as_str() {
            "green" | "supported" | "fact" => Some(Self::Supported),
            "red" | "misleading" | "misrepresentation" => Some(Self::Misleading),
            "purple" | "fabricated" | "hallucination" => Some(Self::Fabricated),
            _ => None,
        }
    }
}

/// Ground truth for one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    pub claim: ClaimId,
    pub category: Category,
    /// Path of the evidence file that corroborates or refutes the claim.
    #[serde(default)]
    pub source: Option<String>,
}

/// The player's marks, at most one per claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSet {
    marks: BTreeMap<ClaimId, Category>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one highlighter click and return the claim's new state.
    ///
    /// Marking with the category already present clears it; any other
    /// category replaces the existing one.
    pub fn toggle(&mut self, claim: ClaimId, category: Category) -> Option<Category> {
        match self.marks.get(&claim) {
            Some(existing) if *existing == category => {
                self.marks.remove(&claim);
                None
            }
            _ => {
                self.marks.insert(claim, category);
                Some(category)
            }
        }
    }

    pub fn get(&self, claim: ClaimId) -> Option<Category> {
        self.marks.get(&claim).copied()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Marks in claim order.
    pub fn iter(&self) -> impl Iterator<Item = (ClaimId, Category)> + '_ {
        self.marks.iter().map(|(claim, category)| (*claim, *category))
    }
}

impl FromIterator<(ClaimId, Category)> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = (ClaimId, Category)>>(iter: I) -> Self {
        Self {
            marks: iter.into_iter().collect(),
        }
    }
}

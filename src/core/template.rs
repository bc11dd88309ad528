/// Line templates: narration text with `{slot}` interpolation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::grading::AccuracySummary;
use crate::schema::decision::Verdict;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),
    #[error("unknown slot '{{{0}}}'")]
    UnknownSlot(String),
}

/// A value the director can splice into a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Correct,
    Incorrect,
    Total,
    Suspect,
    Verdict,
}

impl Slot {
    fn from_name(name: &str) -> Option<Slot> {
        match name {
            "correct" => Some(Self::Correct),
            "incorrect" => Some(Self::Incorrect),
            "total" => Some(Self::Total),
            "suspect" => Some(Self::Suspect),
            "verdict" => Some(Self::Verdict),
            _ => None,
        }
    }
}

/// A segment of a parsed line template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Literal(String),
    Slot(Slot),
}

/// What a template can be rendered against.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    pub summary: AccuracySummary,
    pub suspect: &'a str,
    pub verdict: Option<Verdict>,
}

/// A parsed line: a sequence of segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTemplate {
    pub segments: Vec<Segment>,
}

impl LineTemplate {
    /// Parse a line into literal text and slots.
    ///
    /// Syntax:
    /// - `{correct}` / `{incorrect}` / `{total}` → accuracy counts
    /// - `{suspect}` → the suspect under review
    /// - `{verdict}` → the chosen verdict value
    /// - `{{` and `}}` → literal braces
    pub fn parse(input: &str) -> Result<LineTemplate, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            match chars[i] {
                '{' if i + 1 < len && chars[i + 1] == '{' => {
                    literal_buf.push('{');
                    i += 2;
                }
                '{' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < len && chars[end] != '}' {
                        if chars[end] == '{' {
                            return Err(TemplateError::Parse(
                                "nested braces are not allowed".to_string(),
                            ));
                        }
                        end += 1;
                    }
                    if end == len {
                        return Err(TemplateError::Parse("unclosed brace".to_string()));
                    }

                    let name: String = chars[start..end].iter().collect();
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::Parse("empty braces".to_string()));
                    }
                    let slot = Slot::from_name(name)
                        .ok_or_else(|| TemplateError::UnknownSlot(name.to_string()))?;

                    if !literal_buf.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal_buf)));
                    }
                    segments.push(Segment::Slot(slot));
                    i = end + 1;
                }
                '}' if i + 1 < len && chars[i + 1] == '}' => {
                    literal_buf.push('}');
                    i += 2;
                }
                '}' => {
                    return Err(TemplateError::Parse(
                        "unmatched closing brace".to_string(),
                    ));
                }
                c => {
                    literal_buf.push(c);
                    i += 1;
                }
            }
        }

        if !literal_buf.is_empty() {
            segments.push(Segment::Literal(literal_buf));
        }

        Ok(LineTemplate { segments })
    }

    pub fn render(&self, ctx: &RenderContext<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(Slot::Correct) => out.push_str(&ctx.summary.correct.to_string()),
                Segment::Slot(Slot::Incorrect) => {
                    out.push_str(&ctx.summary.incorrect.to_string())
                }
                Segment::Slot(Slot::Total) => out.push_str(&ctx.summary.total.to_string()),
                Segment::Slot(Slot::Suspect) => out.push_str(ctx.suspect),
                Segment::Slot(Slot::Verdict) => {
                    if let Some(verdict) = ctx.verdict {
                        out.push_str(verdict.value());
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_literal_only() {
        let t = LineTemplate::parse("But, I don't think she did it.").unwrap();
        assert_eq!(
            t.segments,
            vec![Segment::Literal("But, I don't think she did it.".to_string())]
        );
    }

    #[test]
    fn parse_slots() {
        let t = LineTemplate::parse("You got {correct} out of {total}.").unwrap();
        assert_eq!(t.segments.len(), 5);
        assert_eq!(t.segments[1], Segment::Slot(Slot::Correct));
        assert_eq!(t.segments[3], Segment::Slot(Slot::Total));
    }

    #[test]
    fn parse_escaped_braces() {
        let t = LineTemplate::parse("Use {{braces}} here.").unwrap();
        assert_eq!(
            t.segments,
            vec![Segment::Literal("Use {braces} here.".to_string())]
        );
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(LineTemplate::parse("Bad {} here"), Err(TemplateError::Parse(_))));
        assert!(matches!(
            LineTemplate::parse("Bad {outer{inner}} here"),
            Err(TemplateError::Parse(_))
        ));
        assert!(matches!(
            LineTemplate::parse("Bad {unclosed here"),
            Err(TemplateError::Parse(_))
        ));
        assert!(matches!(LineTemplate::parse("Bad } here"), Err(TemplateError::Parse(_))));
    }

    #[test]
    fn unknown_slot_rejected() {
        assert_eq!(
            LineTemplate::parse("Hello {watson}"),
            Err(TemplateError::UnknownSlot("watson".to_string()))
        );
    }

    #[test]
    fn render_counts_and_suspect() {
        let t = LineTemplate::parse(
            "{suspect}: {correct} correct and {incorrect} incorrect out of {total}.",
        )
        .unwrap();
        let ctx = RenderContext {
            summary: AccuracySummary {
                correct: 17,
                incorrect: 2,
                total: 19,
            },
            suspect: "Flora Jasmine",
            verdict: Some(Verdict::Guilty),
        };
        assert_eq!(
            t.render(&ctx),
            "Flora Jasmine: 17 correct and 2 incorrect out of 19."
        );
    }

    #[test]
    fn render_missing_verdict_is_blank() {
        let t = LineTemplate::parse("[{verdict}]").unwrap();
        assert_eq!(t.render(&RenderContext::default()), "[]");
    }
}

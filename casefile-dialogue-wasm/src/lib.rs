//! WASM bindings for casefile-dialogue: drives the case chat in the browser.
//!
//! The page owns the real clock: it calls `advance` from a timer and
//! renders the JSON events that come back.

use wasm_bindgen::prelude::*;

use casefile_dialogue::core::answer_key::{AnswerBook, AnswerKeyStore, StoreStatus};
use casefile_dialogue::core::scheduler::Pacing;
use casefile_dialogue::core::script::Script;
use casefile_dialogue::schema::claim::{Category, ClaimId};
use casefile_dialogue::{ClaimClick, Conversation};

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClickOutcome {
    OpenSource { source: String },
    Marked { colour: Option<&'static str> },
    Ignored,
}

#[derive(serde::Serialize)]
struct RevealedAnswer {
    claim: u32,
    colour: &'static str,
    label: &'static str,
    source: Option<String>,
}

#[derive(serde::Serialize)]
struct SheetRow {
    claim: u32,
    expected: &'static str,
    marked: Option<&'static str>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn parse_category(s: &str) -> Result<Category, JsError> {
    Category::parse(s).ok_or_else(|| JsError::new(&format!("Unknown category: {s}")))
}

fn status_label(status: StoreStatus) -> &'static str {
    match status {
        StoreStatus::Loading => "loading",
        StoreStatus::Ready => "ready",
        StoreStatus::Fallback => "fallback",
    }
}

// ---------------------------------------------------------------------------
// CaseChat: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct CaseChat {
    conversation: Conversation,
}

#[wasm_bindgen]
impl CaseChat {
    /// The reference case with the built-in answer key. `fast` skips all
    /// typing delays.
    #[wasm_bindgen(constructor)]
    pub fn new(fast: bool) -> Result<CaseChat, JsError> {
        Self::build(Script::reference(), AnswerKeyStore::embedded(), fast)
    }

    /// A case from RON sources. The answer key is left loading; hand it
    /// over later with `load_answer_key`.
    pub fn from_script(script_ron: &str, fast: bool) -> Result<CaseChat, JsError> {
        Self::build(Script::parse_ron(script_ron), AnswerKeyStore::loading(), fast)
    }

    /// Finish loading the answer key. Malformed input falls back to the
    /// built-in key; returns the resulting status.
    pub fn load_answer_key(&mut self, answers_ron: &str) -> String {
        self.conversation
            .finish_answer_key_load(AnswerBook::parse_ron(answers_ron));
        status_label(self.conversation.store().status()).to_string()
    }

    pub fn answer_key_status(&self) -> String {
        status_label(self.conversation.store().status()).to_string()
    }

    /// Enter the first scene. Returns the JSON array of events.
    pub fn start(&mut self) -> Result<String, JsError> {
        self.conversation
            .start()
            .map_err(|e| JsError::new(&format!("Start error: {e}")))?;
        self.events()
    }

    /// Move virtual time forward by `ms`. Returns the JSON array of events.
    pub fn advance(&mut self, ms: u32) -> Result<String, JsError> {
        self.conversation.advance(u64::from(ms));
        self.events()
    }

    /// Skip ahead until the conversation waits on the player.
    pub fn run_until_idle(&mut self) -> Result<String, JsError> {
        self.conversation.run_until_idle();
        self.events()
    }

    /// Milliseconds until the next scheduled step, or -1 when idle.
    pub fn next_due_in(&self) -> f64 {
        match self.conversation.next_due() {
            Some(due) => due.saturating_sub(self.conversation.now()) as f64,
            None => -1.0,
        }
    }

    pub fn choose(&mut self, value: &str) -> Result<String, JsError> {
        self.conversation
            .choose(value)
            .map_err(|e| JsError::new(&format!("Choice error: {e}")))?;
        self.events()
    }

    /// Toggle a mark. Returns the claim's colour afterwards, or "" if cleared.
    pub fn annotate(&mut self, claim: u32, category: &str) -> Result<String, JsError> {
        let category = parse_category(category)?;
        Ok(self
            .conversation
            .annotate(ClaimId(claim), category)
            .map_or("", |mark| mark.colour())
            .to_string())
    }

    /// A click on a summary sentence, with the selected highlighter if any.
    pub fn click(&mut self, claim: u32, highlighter: Option<String>) -> Result<String, JsError> {
        let highlighter = highlighter.as_deref().map(parse_category).transpose()?;
        let outcome = match self.conversation.click_claim(ClaimId(claim), highlighter) {
            ClaimClick::OpenSource(source) => ClickOutcome::OpenSource { source },
            ClaimClick::Marked(mark) => ClickOutcome::Marked {
                colour: mark.map(|c| c.colour()),
            },
            ClaimClick::Ignored => ClickOutcome::Ignored,
        };
        to_json(&outcome)
    }

    /// The answer for one claim, or "null" before the verdict.
    pub fn revealed_answer(&self, claim: u32) -> Result<String, JsError> {
        let answer = self
            .conversation
            .revealed_answer(ClaimId(claim))
            .map(|entry| RevealedAnswer {
                claim: entry.claim.0,
                colour: entry.category.colour(),
                label: entry.category.label(),
                source: entry.source.clone(),
            });
        to_json(&answer)
    }

    /// Mistakes locked in at the verdict, or "null" before it.
    pub fn corrected_sheet(&self) -> Result<String, JsError> {
        let rows: Option<Vec<SheetRow>> = self.conversation.corrected_sheet().map(|report| {
            report
                .mistakes()
                .map(|grade| SheetRow {
                    claim: grade.claim.0,
                    expected: grade.expected.colour(),
                    marked: grade.marked.map(|c| c.colour()),
                })
                .collect()
        });
        to_json(&rows)
    }

    pub fn history(&self) -> Result<String, JsError> {
        to_json(&self.conversation.history())
    }

    pub fn decision(&self) -> Result<String, JsError> {
        to_json(&self.conversation.current_decision())
    }

    pub fn accuracy(&self) -> Result<String, JsError> {
        to_json(&self.conversation.accuracy())
    }

    pub fn is_typing(&self) -> bool {
        self.conversation.is_typing()
    }

    pub fn is_finished(&self) -> bool {
        self.conversation.is_finished()
    }
}

// Private helpers
impl CaseChat {
    fn build<E: std::fmt::Display>(
        script: Result<Script, E>,
        store: AnswerKeyStore,
        fast: bool,
    ) -> Result<CaseChat, JsError> {
        let script = script.map_err(|e| JsError::new(&format!("Script parse error: {e}")))?;
        let pacing = if fast {
            Pacing::instant()
        } else {
            Pacing::default()
        };
        let conversation = Conversation::builder()
            .script(script)
            .answer_keys(store)
            .pacing(pacing)
            .build()
            .map_err(|e| JsError::new(&format!("Conversation build error: {e}")))?;
        Ok(CaseChat { conversation })
    }

    fn events(&mut self) -> Result<String, JsError> {
        to_json(&self.conversation.drain_events())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_outcome_json() {
        let json = serde_json::to_string(&ClickOutcome::OpenSource {
            source: "/a.html".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"open_source","source":"/a.html"}"#);
        let json = serde_json::to_string(&ClickOutcome::Ignored).unwrap();
        assert_eq!(json, r#"{"kind":"ignored"}"#);
    }
}

/// Script and answer key loading tests.

use casefile_dialogue::core::answer_key::{AnswerBook, StoreError};
use casefile_dialogue::core::grading::{grade, AccuracySummary};
use casefile_dialogue::core::script::{Narration, SceneExit, Script, ScriptError, Severity};
use casefile_dialogue::schema::claim::{AnnotationSet, Category, ClaimId};
use casefile_dialogue::schema::decision::Verdict;
use std::path::Path;

#[test]
fn fixture_script_loads_clean() {
    let script = Script::load_from_ron(Path::new("tests/fixtures/test_script.ron")).unwrap();
    assert_eq!(script.suspect, "Ada Thorne");
    assert_eq!(script.scenes.len(), 4);
    assert!(script.validate().is_empty(), "{:?}", script.validate());

    let feedback = script.scene("feedback").unwrap();
    assert_eq!(feedback.lead_in, 2_000);
    assert_eq!(feedback.exit, SceneExit::Continue("outro".to_string()));
    match &feedback.narration {
        Narration::Feedback(branches) => assert_eq!(branches.len(), 4),
        Narration::Lines(_) => panic!("expected feedback branches"),
    }
}

#[test]
fn reference_script_has_one_verdict_gate() {
    let script = Script::reference().unwrap();
    let gates: Vec<&str> = script
        .scenes
        .values()
        .filter(|scene| matches!(scene.exit, SceneExit::Verdict(_)))
        .map(|scene| scene.name.as_str())
        .collect();
    assert_eq!(gates, vec!["explanation"]);

    let explanation = script.scene("explanation").unwrap();
    let values: Vec<&str> = explanation
        .exit
        .options()
        .iter()
        .map(|opt| opt.value.as_str())
        .collect();
    assert_eq!(values, vec!["guilty", "not-guilty"]);
}

#[test]
fn missing_script_file() {
    let result = Script::load_from_ron(Path::new("tests/fixtures/nope.ron"));
    assert!(matches!(result, Err(ScriptError::Io(_))));
}

#[test]
fn truncated_answer_key_is_ron_error() {
    let result = AnswerBook::load_from_ron(Path::new("tests/fixtures/broken_answer_key.ron"));
    assert!(matches!(result, Err(StoreError::Ron(_))));
}

#[test]
fn colour_and_name_categories_agree() {
    let book = AnswerBook::load_from_ron(Path::new("tests/fixtures/test_answer_key.ron")).unwrap();
    let ada = book.suspect("Ada Thorne").unwrap();
    let categories: Vec<Category> = ada.entries.iter().map(|e| e.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::Supported,
            Category::Misleading,
            Category::Fabricated,
            Category::Supported,
            Category::Misleading,
        ]
    );
}

#[test]
fn missing_feedback_branch_warns() {
    let source = std::fs::read_to_string("tests/fixtures/test_script.ron").unwrap();
    let trimmed = source.replace(
        r#"(verdict: Guilty, all_correct: true, lines: ["Sharp eyes, wrong verdict."]),"#,
        "",
    );
    let script = Script::parse_ron(&trimmed).unwrap();
    let issues = script.validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert!(issues[0].message.contains("'guilty'"));

    // The uncovered cell says nothing.
    let perfect = AccuracySummary {
        correct: 5,
        incorrect: 0,
        total: 5,
    };
    let feedback = script.scene("feedback").unwrap();
    assert!(feedback.lines_for(Some(Verdict::Guilty), &perfect).is_empty());
}

#[test]
fn embedded_key_grades_unmarked_summary() {
    let book = AnswerBook::embedded();
    let key = casefile_dialogue::core::grading::AnswerKey::new(
        book.suspect("Flora Jasmine").unwrap().entries.iter().cloned(),
    );
    let marks: AnnotationSet = [(ClaimId(8), Category::Fabricated)].into_iter().collect();
    let summary = grade(&key, &marks);
    assert_eq!(summary.total, 19);
    assert_eq!(summary.correct, 12);
}

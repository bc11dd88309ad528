/// Walkthrough example: plays the Harpe case from opening to closing.
///
/// A player who gets most of the summary right but misses one hallucinated
/// claim, then clears Flora. Prints the chat transcript with timestamps,
/// then the corrected sheet.
///
/// Run with: cargo run --example walkthrough

use casefile_dialogue::core::answer_key::AnswerBook;
use casefile_dialogue::schema::claim::{Category, ClaimId};
use casefile_dialogue::schema::decision::Verdict;
use casefile_dialogue::schema::event::DialogueEvent;
use casefile_dialogue::schema::line::Speaker;
use casefile_dialogue::Conversation;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut conversation = Conversation::builder()
        .verdict_sink(|verdict: Verdict| {
            println!("          >> case board notified: {}", verdict.value());
        })
        .build()
        .expect("Failed to build conversation");

    conversation.start().expect("Failed to start conversation");
    print_until_idle(&mut conversation);

    // --- Mark the summary: everything right except claim 13 ---
    let book = AnswerBook::embedded();
    let flora = book
        .suspect("Flora Jasmine")
        .expect("Embedded answer book lacks Flora Jasmine");
    for entry in &flora.entries {
        if entry.category != Category::Supported && entry.claim != ClaimId(13) {
            conversation.annotate(entry.claim, entry.category);
        }
    }
    println!("\n          [player marks {} claims]\n", conversation.annotations().len());

    // --- Walk the gates ---
    for value in ["challenge-accepted", "understood", "not-guilty", "dig-deeper"] {
        conversation
            .choose(value)
            .expect("Choice should be on screen");
        print_until_idle(&mut conversation);
    }

    // --- Corrected sheet ---
    println!("\n=== Corrected sheet ===\n");
    if let Some(sheet) = conversation.corrected_sheet() {
        let s = sheet.summary;
        println!("{} correct, {} incorrect of {}\n", s.correct, s.incorrect, s.total);
        for grade in sheet.mistakes() {
            println!(
                "  claim {:>2}: marked {:<10} should be {}",
                grade.claim.0,
                grade.marked.map_or("nothing", |c| c.colour()),
                grade.expected.label()
            );
        }
    }

    println!(
        "\nConversation finished: {} ({} lines at {} ms)",
        conversation.is_finished(),
        conversation.history().len(),
        conversation.now()
    );
}

fn print_until_idle(conversation: &mut Conversation) {
    conversation.run_until_idle();
    for event in conversation.drain_events() {
        match event {
            DialogueEvent::LineRevealed(line) => {
                let who = match line.speaker {
                    Speaker::Narrator => "Holmes",
                    Speaker::Responder => "Watson",
                };
                println!("[{:>6}] {}: {}", line.created_at, who, line.text);
            }
            DialogueEvent::DecisionPresented(decision) => {
                for option in &decision.options {
                    println!("          ( ) {}", option.label);
                }
            }
            _ => {}
        }
    }
}

/// Play: interactive terminal shell for walking through a case.
///
/// Usage: play [--script <path>] [--answers <path>] [--pacing <path>]
///             [--suspect <name>] [--fast]
///
/// Commands:
///   choose <n|value>         answer the decision on screen
///   mark <claim> <category>  toggle a highlighter mark (green/red/purple)
///   click <claim> [category] click a sentence, optionally with a highlighter
///   marks                    list current marks
///   grade                    grade the current marks
///   sheet                    show the corrected sheet (after the verdict)
///   history                  reprint the conversation
///   help                     list commands
///   quit                     exit

use casefile_dialogue::core::scheduler::Pacing;
use casefile_dialogue::core::timeline::{Clock, SystemClock};
use casefile_dialogue::schema::claim::{Category, ClaimId};
use casefile_dialogue::schema::decision::Verdict;
use casefile_dialogue::schema::event::DialogueEvent;
use casefile_dialogue::schema::line::{Line, Speaker};
use casefile_dialogue::{ClaimClick, Conversation};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut script_path = None;
    let mut answers_path = None;
    let mut pacing_path = None;
    let mut suspect = None;
    let mut fast = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--script" if i + 1 < args.len() => {
                i += 1;
                script_path = Some(args[i].clone());
            }
            "--answers" if i + 1 < args.len() => {
                i += 1;
                answers_path = Some(args[i].clone());
            }
            "--pacing" if i + 1 < args.len() => {
                i += 1;
                pacing_path = Some(args[i].clone());
            }
            "--suspect" if i + 1 < args.len() => {
                i += 1;
                suspect = Some(args[i].clone());
            }
            "--fast" => fast = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = Conversation::builder().verdict_sink(|verdict: Verdict| {
        println!("  (verdict sent to the case board: {})", verdict.value());
    });
    if let Some(ref path) = script_path {
        builder = builder.script_path(path);
    }
    if let Some(ref path) = answers_path {
        builder = builder.answer_key_path(path);
    }
    if fast {
        builder = builder.pacing(Pacing::instant());
    } else if let Some(ref path) = pacing_path {
        builder = builder.pacing_path(path);
    }
    if let Some(ref name) = suspect {
        builder = builder.suspect(name);
    }

    let mut conversation = match builder.build() {
        Ok(conversation) => conversation,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!("=== {} ===", conversation.script().title);
    if let Some(reason) = conversation.store().fallback_reason() {
        println!("Answer key unavailable ({}); using the built-in one.", reason);
    }
    println!("Type 'help' for commands.\n");

    if let Err(e) = conversation.start() {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }

    let clock = SystemClock::new();
    let input = spawn_stdin_reader();
    let mut stdout = io::stdout();
    let mut needs_prompt = true;

    loop {
        if fast {
            conversation.run_until_idle();
        } else {
            conversation.sync(&clock);
        }
        needs_prompt |= print_events(&mut conversation);

        // Keep reading commands while the narrator types; only sleep as
        // long as the next scheduled step allows.
        let received = match conversation.next_due() {
            Some(due) if !fast => {
                let wait = due.saturating_sub(clock.now());
                match input.recv_timeout(Duration::from_millis(wait)) {
                    Ok(line) => line,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            _ => {
                if needs_prompt {
                    print!("play> ");
                    stdout.flush().ok();
                    needs_prompt = false;
                }
                match input.recv() {
                    Ok(line) => line,
                    Err(_) => break,
                }
            }
        };

        if !fast {
            conversation.sync(&clock);
            print_events(&mut conversation);
        }
        match run_command(&mut conversation, received.trim()) {
            Flow::Quit => break,
            Flow::Continue => needs_prompt = true,
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Lines typed at the terminal, read on their own thread so the
/// conversation can keep moving while the player types.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn run_command(conversation: &mut Conversation, line: &str) -> Flow {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = parts.first() else {
        return Flow::Continue;
    };
    let cmd = first.to_lowercase();

    match cmd.as_str() {
        "quit" | "exit" | "q" => {
            println!("Goodbye.");
            return Flow::Quit;
        }
        "help" | "h" | "?" => print_help(),
        "choose" | "c" => {
            let Some(input) = parts.get(1) else {
                println!("Usage: choose <n|value>");
                return Flow::Continue;
            };
            let Some(value) = option_value(conversation, input) else {
                println!("No decision is waiting, or '{}' is not an option.", input);
                return Flow::Continue;
            };
            if let Err(e) = conversation.choose(&value) {
                println!("ERROR: {}", e);
            }
        }
        "mark" | "m" => {
            let claim = parts.get(1).and_then(|s| parse_claim(s));
            let category = parts.get(2).and_then(|s| Category::parse(s));
            let (Some(claim), Some(category)) = (claim, category) else {
                println!("Usage: mark <claim> <category> (green, red or purple)");
                return Flow::Continue;
            };
            match conversation.annotate(claim, category) {
                Some(mark) => {
                    println!("Claim {} marked {} ({}).", claim.0, mark.colour(), mark.label())
                }
                None => println!("Claim {} cleared.", claim.0),
            }
        }
        "click" => {
            let Some(claim) = parts.get(1).and_then(|s| parse_claim(s)) else {
                println!("Usage: click <claim> [category]");
                return Flow::Continue;
            };
            let highlighter = parts.get(2).and_then(|s| Category::parse(s));
            match conversation.click_claim(claim, highlighter) {
                ClaimClick::OpenSource(source) => println!("Opening {}", source),
                ClaimClick::Marked(Some(mark)) => {
                    println!("Claim {} marked {}.", claim.0, mark.colour())
                }
                ClaimClick::Marked(None) => println!("Claim {} cleared.", claim.0),
                ClaimClick::Ignored => println!("Pick a highlighter first."),
            }
        }
        "marks" => {
            if conversation.annotations().is_empty() {
                println!("No marks yet.");
            }
            for (claim, category) in conversation.annotations().iter() {
                println!("  {:>3}  {}", claim.0, category.colour());
            }
        }
        "grade" => match conversation.grade_report() {
            Some(report) => {
                let s = report.summary;
                println!("{} correct, {} incorrect, {} total", s.correct, s.incorrect, s.total);
            }
            None => println!("Answer key not available yet."),
        },
        "sheet" => match conversation.corrected_sheet() {
            Some(report) => {
                let mut any = false;
                for grade in report.mistakes() {
                    any = true;
                    let marked = grade.marked.map_or("unmarked", |c| c.label());
                    println!(
                        "  claim {:>3}: you said {}, it is {}",
                        grade.claim.0,
                        marked,
                        grade.expected.label()
                    );
                }
                if !any {
                    println!("No mistakes.");
                }
            }
            None => println!("The corrected sheet is available after the verdict."),
        },
        "history" => {
            for line in conversation.history() {
                print_line(line);
            }
        }
        _ => println!("Unknown command '{}'. Type 'help' for commands.", cmd),
    }
    Flow::Continue
}

/// Print what the player should see. Returns true if anything was printed.
fn print_events(conversation: &mut Conversation) -> bool {
    let mut printed = false;
    for event in conversation.drain_events() {
        tracing::debug!(event = event.tag(), at = conversation.now(), "dialogue event");
        match event {
            DialogueEvent::TypingStarted => println!("  ..."),
            DialogueEvent::LineRevealed(line) if line.speaker == Speaker::Narrator => {
                print_line(&line)
            }
            DialogueEvent::DecisionPresented(decision) => {
                for (n, option) in decision.options.iter().enumerate() {
                    println!("  [{}] {}", n + 1, option.label);
                }
            }
            DialogueEvent::Finished => println!("\n--- End ---\n"),
            _ => continue,
        }
        printed = true;
    }
    printed
}

fn print_line(line: &Line) {
    match line.speaker {
        Speaker::Narrator => println!("Holmes: {}", line.text),
        Speaker::Responder => println!("You:    {}", line.text),
    }
}

/// Accept a 1-based option number or the option value itself.
fn option_value(conversation: &Conversation, input: &str) -> Option<String> {
    let decision = conversation.current_decision()?;
    if let Ok(n) = input.parse::<usize>() {
        return decision
            .options
            .get(n.checked_sub(1)?)
            .map(|option| option.value.clone());
    }
    decision.option(input).map(|option| option.value.clone())
}

fn parse_claim(input: &str) -> Option<ClaimId> {
    input.parse().ok().map(ClaimId)
}

fn print_usage() {
    println!("Usage: play [--script <path>] [--answers <path>] [--pacing <path>]");
    println!("            [--suspect <name>] [--fast]");
}

fn print_help() {
    println!("Commands:");
    println!("  choose <n|value>          Answer the decision on screen");
    println!("  mark <claim> <category>   Toggle a mark: green/red/purple");
    println!("                            (or supported/misleading/fabricated)");
    println!("  click <claim> [category]  Click a sentence, optionally with a highlighter");
    println!("  marks                     List current marks");
    println!("  grade                     Grade the current marks");
    println!("  sheet                     Show the corrected sheet (after the verdict)");
    println!("  history                   Reprint the conversation");
    println!("  help                      Show this help");
    println!("  quit                      Exit");
}

/// Script Linter: checks conversation scripts for authoring mistakes.
///
/// Usage: script_linter <script.ron | dir> [--answers <answer_key.ron>]
///
/// With --answers, also checks that the answer book covers each script's
/// suspect.

use casefile_dialogue::core::answer_key::AnswerBook;
use casefile_dialogue::core::script::{Script, Severity};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <script.ron | dir> [--answers <answer_key.ron>]");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let mut answers_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--answers" && i + 1 < args.len() {
            i += 1;
            answers_path = Some(args[i].clone());
        }
        i += 1;
    }

    let mut files = Vec::new();
    if target.is_file() {
        files.push(target.to_path_buf());
    } else if target.is_dir() {
        collect_scripts(target, &mut files);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target.display());
        process::exit(1);
    }
    files.sort();

    let book = match answers_path {
        Some(ref path) => match AnswerBook::load_from_ron(Path::new(path)) {
            Ok(book) => Some(book),
            Err(e) => {
                eprintln!("ERROR: Failed to load answer book: {}", e);
                process::exit(1);
            }
        },
        None => None,
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for path in &files {
        let script = match Script::load_from_ron(path) {
            Ok(script) => script,
            Err(e) => {
                errors.push(format!("{}: {}", path.display(), e));
                continue;
            }
        };
        println!(
            "  Loaded: {} ('{}', {} scenes)",
            path.display(),
            script.title,
            script.scenes.len()
        );

        for issue in script.validate() {
            let message = format!("{}: {}", path.display(), issue.message);
            match issue.severity {
                Severity::Error => errors.push(message),
                Severity::Warning => warnings.push(message),
            }
        }

        if let Some(ref book) = book {
            match book.suspect(&script.suspect) {
                Some(file) if file.entries.is_empty() => warnings.push(format!(
                    "{}: answer book has no entries for '{}'",
                    path.display(),
                    script.suspect
                )),
                Some(_) => {}
                None => errors.push(format!(
                    "{}: suspect '{}' is not in the answer book",
                    path.display(),
                    script.suspect
                )),
            }
        }
    }

    println!("\n=== Script Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} files, {} errors, {} warnings",
        files.len(),
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

/// Script files are any .ron file that is not an answer book or pacing file.
fn collect_scripts(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_scripts(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
                if !stem.contains("answer") && !stem.contains("pacing") {
                    files.push(path);
                }
            }
        }
    }
}

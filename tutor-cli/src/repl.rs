//! Helpers for the interactive chat loop.

use rustyline::DefaultEditor;
use tracing::warn;
use tutor_rag::Answer;

/// Inputs that end a chat session, compared case-insensitively.
pub const EXIT_WORDS: [&str; 4] = ["退出", "quit", "exit", "bye"];

/// Whether `input` asks to end the session.
pub fn is_exit_command(input: &str) -> bool {
    let lowered = input.trim().to_lowercase();
    EXIT_WORDS.contains(&lowered.as_str())
}

/// Render an answer followed by its deduplicated sources.
pub fn format_answer(answer: &Answer) -> String {
    let mut out = format!("\nTutor: {}\n", answer.answer.trim_end());
    let sources = answer.sources();
    if !sources.is_empty() {
        out.push_str("\nSources:\n");
        for source in sources {
            out.push_str(&format!("  - {source}\n"));
        }
    }
    out
}

/// Add `line` to the editor's recall history; a failure only loses recall.
pub fn record_history(editor: &mut DefaultEditor, line: &str) {
    if let Err(e) = editor.add_history_entry(line) {
        warn!(error = %e, "failed to record line history");
    }
}

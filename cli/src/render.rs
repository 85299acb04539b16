//! Plain-text rendering of the list screen.

use std::fmt::Write;

use todo_core::{Failure, Row};

pub const TITLE: &str = "Todoアプリ";
pub const LIST_HEADING: &str = "Todoリスト";
pub const PROMPT: &str = "新しいTodoを追加";

/// The whole screen: header, rows, optional failures, and the input prompt
/// showing whatever title is still pending.
pub fn screen(rows: &[Row], pending_title: &str, failures: &[Failure]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out, "{LIST_HEADING}");
    for row in rows {
        let _ = writeln!(out, "- {}", row.to_string().replace('\n', "\n  "));
    }
    for failure in failures {
        let _ = writeln!(out, "! {} failed: {}", failure.operation, failure.error);
    }
    if pending_title.is_empty() {
        let _ = write!(out, "{PROMPT} > ");
    } else {
        let _ = write!(out, "{PROMPT} [{pending_title}] > ");
    }
    out
}

//! Tab completion for the padloop REPL.

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;
use std::path::Path;

/// REPL helper providing command and song file completion.
pub struct PadloopHelper;

impl PadloopHelper {
    pub fn new() -> Self {
        Self
    }
}

/// Commands available in the REPL.
pub const COMMANDS: &[&str] = &[
    "track", "remove", "list", "bpm", "pad", "padsteps", "seq", "show",
    "insert", "del", "mv", "replace", "select", "deselect", "group",
    "supergroup", "ungroup", "cut", "drag", "drop", "cancel", "move",
    "events", "check", "save", "open",
];

/// Meta commands (prefixed with :).
const META_COMMANDS: &[&str] = &[":help", ":q", ":quit", ":exit"];

/// Song files in the current directory.
fn scan_song_files() -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(".") else { return Vec::new() };
    let mut out: Vec<String> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| is_song_file(p))
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();
    out.sort();
    out
}

fn is_song_file(path: &Path) -> bool {
    let Some(ext) = path.extension() else { return false };
    let ext = ext.to_string_lossy().to_lowercase();
    matches!(ext.as_str(), "yaml" | "yml" | "json")
}

/// Start of the file argument when completing `save`/`open`.
fn find_file_completion_start(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let cmd = trimmed.split_whitespace().next()?;
    if cmd != "save" && cmd != "open" {
        return None;
    }
    if !trimmed[cmd.len()..].starts_with(char::is_whitespace) {
        return None;
    }
    if let Some(quote_pos) = line.rfind('"') {
        return Some(quote_pos + 1);
    }
    Some(line.rfind(char::is_whitespace).map_or(0, |p| p + 1))
}

impl Completer for PadloopHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_pos = &line[..pos];

        if line_to_pos.starts_with(':') {
            let matches: Vec<Pair> = META_COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(line_to_pos))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            return Ok((0, matches));
        }

        if let Some(start) = find_file_completion_start(line_to_pos) {
            let prefix = &line_to_pos[start..];
            let matches: Vec<Pair> = scan_song_files()
                .into_iter()
                .filter(|f| f.starts_with(prefix))
                .map(|f| Pair {
                    display: f.clone(),
                    replacement: f,
                })
                .collect();
            return Ok((start, matches));
        }

        // Command completion after the last `;`
        let segment_start = line_to_pos.rfind(';').map_or(0, |p| p + 1);
        let segment = &line_to_pos[segment_start..];
        let words: Vec<&str> = segment.split_whitespace().collect();
        if words.is_empty() || (words.len() == 1 && !segment.ends_with(' ')) {
            let prefix = words.first().copied().unwrap_or("");
            let start = pos - prefix.len();
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(prefix))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            return Ok((start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for PadloopHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Highlighter for PadloopHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }
}

impl Validator for PadloopHelper {}

impl Helper for PadloopHelper {}

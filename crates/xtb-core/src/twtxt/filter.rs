//! Output shaping for twtxt listings.
//!
//! Listings are bounded by newline-terminated lines (three per timeline entry)
//! and searches behave like `grep -i -m N` with before/after context.

use regex::{Regex, RegexBuilder};

use crate::{errors::Error, Result};

/// Lines a single timeline entry occupies in twtxt output (header, text, blank).
pub const LINES_PER_ENTRY: usize = 3;

/// Return the prefix of `text` up to and including its `max_lines`-th newline.
///
/// If `text` has fewer lines it is returned whole (including an unterminated
/// last line).
pub fn take_lines(text: &str, max_lines: usize) -> &str {
    if max_lines == 0 {
        return "";
    }
    match text.match_indices('\n').nth(max_lines - 1) {
        Some((idx, _)) => &text[..=idx],
        None => text,
    }
}

/// `take_lines` for `entries` timeline entries.
pub fn take_entries(text: &str, entries: usize) -> &str {
    take_lines(text, entries.saturating_mul(LINES_PER_ENTRY))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrepOptions {
    /// Context lines printed before each match.
    pub before: usize,
    /// Context lines printed after each match.
    pub after: usize,
    /// Stop after this many matching lines.
    pub max_count: usize,
}

/// Case-insensitive regex for a literal needle (`@nick`, `#tag`).
pub fn literal_pattern(needle: &str) -> Result<Regex> {
    case_insensitive(&regex::escape(needle))
}

/// Case-insensitive regex matching a txtnish timeline header for `user`.
pub fn txtnish_author_pattern(user: &str) -> Result<Regex> {
    case_insensitive(&format!(r"^\* {} ", regex::escape(user)))
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::External(format!("invalid search pattern {pattern:?}: {e}")))
}

/// Filter `text` line by line the way grep does.
///
/// Overlapping context is merged, non-adjacent groups are separated by a `--`
/// line, and trailing context after the last permitted match is kept. Returns
/// `None` when nothing matched.
pub fn grep(text: &str, pattern: &Regex, opts: GrepOptions) -> Option<String> {
    let lines: Vec<&str> = text.split_terminator('\n').collect();

    let mut out = String::new();
    let mut last_emitted: Option<usize> = None;
    let mut pending_after = 0usize;
    let mut matches = 0usize;

    for (i, line) in lines.iter().enumerate() {
        if matches < opts.max_count && pattern.is_match(line) {
            matches += 1;

            let wanted = i.saturating_sub(opts.before);
            let start = last_emitted.map_or(wanted, |last| wanted.max(last + 1));
            if matches!(last_emitted, Some(last) if wanted > last + 1) {
                out.push_str("--\n");
            }
            for l in &lines[start..=i] {
                out.push_str(l);
                out.push('\n');
            }

            last_emitted = Some(i);
            pending_after = opts.after;
        } else if pending_after > 0 {
            out.push_str(line);
            out.push('\n');
            last_emitted = Some(i);
            pending_after -= 1;
        } else if matches >= opts.max_count {
            break;
        }
    }

    if matches == 0 {
        None
    } else {
        Some(out)
    }
}

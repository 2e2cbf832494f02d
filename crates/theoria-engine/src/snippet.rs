//! C6: best-window snippet selection with highlighted term markers.

use regex::RegexBuilder;
use std::sync::mpsc;
use std::time::Duration;

const WINDOW_SIZE: usize = 280;
const STEP_SIZE: usize = 40;
const BOUNDARY_SNAP: usize = 30;
const HIGHLIGHT_TIMEOUT: Duration = Duration::from_millis(100);

/// `generate(text, query_terms)`: see module docs for the full algorithm.
pub fn generate(text: &str, query_terms: &[String]) -> String {
    // Byte offsets from `str::find` don't line up with the char-indexed
    // window logic below once the text holds any multi-byte character
    // (em dashes, curly quotes, diacritics, Greek or Latin citations are
    // all routine in this corpus). Search and index in char space
    // throughout instead; ASCII-only case folding keeps a 1:1 char
    // mapping, which full `str::to_lowercase` does not guarantee.
    let chars: Vec<char> = text.chars().collect();
    let lower_chars: Vec<char> = chars.iter().map(|c| c.to_ascii_lowercase()).collect();
    let len = chars.len();

    let query_terms_lower: Vec<Vec<char>> = query_terms
        .iter()
        .map(|t| t.chars().map(|c| c.to_ascii_lowercase()).collect())
        .collect();

    let mut hits: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, term_index)
    for (term_idx, term) in query_terms_lower.iter().enumerate() {
        if term.is_empty() {
            continue;
        }
        let mut search_from = 0;
        while search_from + term.len() <= lower_chars.len() {
            if lower_chars[search_from..search_from + term.len()] == term[..] {
                hits.push((search_from, search_from + term.len(), term_idx));
            }
            search_from += 1;
        }
    }

    if hits.is_empty() {
        return truncate_with_ellipsis(text, WINDOW_SIZE);
    }

    hits.sort_by_key(|&(start, _, _)| start);

    let (mut best_start, mut best_end) = (0usize, WINDOW_SIZE.min(len));
    let mut best_score = -1i64;

    let mut window_start = 0usize;
    while window_start < len {
        let window_end = (window_start + WINDOW_SIZE).min(len);
        let first = lower_bound(&hits, window_start);
        let mut distinct = std::collections::HashSet::new();
        let mut total = 0usize;
        for &(start, _, term_idx) in &hits[first..] {
            if start >= window_end {
                break;
            }
            distinct.insert(term_idx);
            total += 1;
        }
        let score = 1000 * distinct.len() as i64 + total as i64;
        if score > best_score {
            best_score = score;
            best_start = window_start;
            best_end = window_end;
        }
        if window_end >= len {
            break;
        }
        window_start += STEP_SIZE;
    }

    let (start, end) = snap_to_word_boundaries(text, best_start, best_end);
    let body = substr_by_char(text, start, end);
    let highlighted = highlight(&body, query_terms);

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&highlighted);
    if end < len {
        out.push_str("...");
    }
    out
}

fn lower_bound(hits: &[(usize, usize, usize)], start: usize) -> usize {
    hits.partition_point(|&(hit_start, _, _)| hit_start < start)
}

fn truncate_with_ellipsis(text: &str, window: usize) -> String {
    let total = text.chars().count();
    if total <= window {
        return text.to_string();
    }
    let truncated = substr_by_char(text, 0, window);
    format!("{truncated}...")
}

fn substr_by_char(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn snap_to_word_boundaries(text: &str, start: usize, end: usize) -> (usize, usize) {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let end = end.min(len);

    let mut new_start = start;
    if start > 0 {
        let lookahead = (start + BOUNDARY_SNAP).min(end);
        if let Some(offset) = chars[start..lookahead].iter().position(|&c| c == ' ') {
            new_start = start + offset + 1;
        }
    }

    let mut new_end = end;
    if end < len {
        let lookback_from = end.saturating_sub(BOUNDARY_SNAP).max(new_start);
        if let Some(offset) = chars[lookback_from..end].iter().rposition(|&c| c == ' ') {
            new_end = lookback_from + offset;
        }
    }
    if new_end < new_start {
        new_end = new_start;
    }
    (new_start, new_end)
}

/// Wrap every occurrence of any query term (plus trailing word characters)
/// with `<mark>…</mark>`, case-insensitive, in one combined pattern pass.
/// Bounded to 100ms wall-clock by running the match on a dedicated thread;
/// on timeout the unhighlighted snippet is returned.
fn highlight(body: &str, query_terms: &[String]) -> String {
    let terms: Vec<String> = query_terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| regex::escape(t))
        .collect();
    if terms.is_empty() {
        return body.to_string();
    }
    let pattern = format!(r"(?:{})\w*", terms.join("|"));
    let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return body.to_string();
    };

    let body_owned = body.to_string();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let replaced = re.replace_all(&body_owned, |caps: &regex::Captures| {
            format!("<mark>{}</mark>", &caps[0])
        });
        let _ = tx.send(replaced.into_owned());
    });

    rx.recv_timeout(HIGHLIGHT_TIMEOUT).unwrap_or_else(|_| body.to_string())
}

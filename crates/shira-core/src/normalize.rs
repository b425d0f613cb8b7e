//! Text normalisation for downloaded poem markup.
//!
//! Converts the HTML served by the library's download endpoint into two
//! parallel representations:
//!
//! - `plain_text`: the full poem, one line per text run, with headings and
//!   boilerplate lines removed
//! - `rendered_markup`: the same lines as `<br>`-joined HTML, cut down to a
//!   word budget when the poem is long
//!
//! # Algorithm
//!
//! 1. Parse into an HTML tree and walk it, skipping `h1`..`h6` (and the
//!    non-text `script`/`style`) subtrees.
//! 2. Every text node starts a new line; lines are trimmed and blank ones
//!    dropped.
//! 3. A line containing any boilerplate marker (case-sensitive substring) is
//!    dropped.
//! 4. If the whole text is within the word budget it is rendered in full.
//!    Otherwise lines are taken in order while the running word count stays
//!    within the budget, and `...` is appended.
//!
//! Truncation only ever shortens the rendering. Callers filtering on length or
//! building prompts must use `plain_text`.
//!
//! `plain_text` is entity-decoded. Normalising it again is a no-op only while
//! it contains nothing that parses as a tag: a decoded `&lt;b&gt;` becomes a
//! real `<b>` element on the second pass.

use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::markup::escape_html;

/// Attribution and footer phrases the library appends to every download.
pub const DEFAULT_MARKERS: &[&str] = &[
    "פרויקט בן-יהודה",
    "הפיקו מתנדבי",
    "לקריאה באתר",
    "כל הזכויות שמורות",
    "benyehuda.org",
];

const SKIPPED_ELEMENTS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "script", "style"];

const LINE_BREAK: &str = "<br>";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    /// Full cleaned text, lines joined with `\n`. Never truncated.
    pub plain_text: String,
    /// HTML rendering of `plain_text`, or of its longest line prefix that fits
    /// the word budget.
    pub rendered_markup: String,
    pub truncated: bool,
}

/// Normalise `raw` with the [`DEFAULT_MARKERS`] boilerplate list.
pub fn normalize(raw: &str, word_budget: usize) -> NormalizedContent {
    normalize_with(raw, word_budget, DEFAULT_MARKERS)
}

/// Normalise `raw`, dropping lines that contain any of `markers`.
pub fn normalize_with<S: AsRef<str>>(
    raw: &str,
    word_budget: usize,
    markers: &[S],
) -> NormalizedContent {
    let lines = extract_lines(raw);
    let total = lines.len();

    let lines: Vec<String> = lines
        .into_iter()
        .filter(|line| !markers.iter().any(|m| line.contains(m.as_ref())))
        .collect();
    if lines.len() < total {
        debug!(dropped = total - lines.len(), "removed boilerplate lines");
    }

    let plain_text = lines.join("\n");
    let word_count = count_words(&plain_text);

    if word_count <= word_budget {
        let rendered_markup = lines
            .iter()
            .map(|l| escape_html(l))
            .collect::<Vec<_>>()
            .join(LINE_BREAK);
        return NormalizedContent {
            plain_text,
            rendered_markup,
            truncated: false,
        };
    }

    let mut kept = Vec::new();
    let mut words = 0usize;
    for line in &lines {
        let n = count_words(line);
        if words + n > word_budget {
            break;
        }
        words += n;
        kept.push(escape_html(line));
    }

    debug!(
        word_count,
        word_budget,
        kept_lines = kept.len(),
        total_lines = lines.len(),
        "truncated rendering"
    );

    let mut rendered_markup = kept.join(LINE_BREAK);
    rendered_markup.push_str(ELLIPSIS);

    NormalizedContent {
        plain_text,
        rendered_markup,
        truncated: true,
    }
}

/// Whitespace-delimited token count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn extract_lines(raw: &str) -> Vec<String> {
    let document = Html::parse_document(raw);
    let mut runs = Vec::new();
    collect_text(document.root_element(), &mut runs);

    runs.iter()
        .flat_map(|run| run.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn collect_text(element: ElementRef<'_>, runs: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, runs);
            }
        } else if let Node::Text(text) = child.value() {
            runs.push(String::from(&**text));
        }
    }
}

//! Noise filter: turns a post's raw body markup into clean paragraph text.
//!
//! Three ordered passes: structural removal of a fixed denylist of
//! substructures, flattening to paragraph-delimited text, then line-level
//! scrubbing of known boilerplate. Pure function of its input; identical
//! input always yields byte-identical output.

use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

// Translator-credit lines.
static TL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"TL:.*\n").expect("noise pattern"));
// Support/donation appeals. Case-insensitive, unlike the rest.
static SUPPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Support my translations.*").expect("noise pattern"));
static NEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Next Chapter\s*\n)+").expect("noise pattern"));
static PREV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Previous Chapter\s*\n)+").expect("noise pattern"));
static NOT_CHAPTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Not a Chapter:.*\n").expect("noise pattern"));
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Author:.*\n").expect("noise pattern"));
static BLANKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("noise pattern"));

/// Substructures removed wholesale before any text extraction: share widgets,
/// prev/next navigation, footer blocks, scripts, and styles.
fn is_denied(el: &Element) -> bool {
    let name = el.name();
    if name == "script" || name == "style" {
        return true;
    }
    el.classes()
        .any(|c| matches!(c, "sharedaddy" | "post-navigation" | "entry-footer"))
}

/// Flatten one element's subtree to trimmed, non-empty text lines, skipping
/// denied subtrees entirely.
fn collect_lines(el: ElementRef<'_>, out: &mut Vec<String>) {
    if is_denied(el.value()) {
        return;
    }
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            for line in text.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    out.push(line.to_string());
                }
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_lines(child_el, out);
        }
    }
}

/// Clean body markup to normalized paragraph text.
pub fn clean(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut lines = Vec::new();
    collect_lines(fragment.root_element(), &mut lines);
    scrub(&lines.join("\n\n"))
}

/// Line/pattern-level boilerplate scrubbing, applied after flattening. The
/// pass order and the case-insensitivity of the support pattern are part of
/// the contract.
fn scrub(text: &str) -> String {
    let t = TL_RE.replace_all(text, "");
    let t = SUPPORT_RE.replace_all(&t, "");
    let t = NEXT_RE.replace_all(&t, "");
    let t = PREV_RE.replace_all(&t, "");
    let t = NOT_CHAPTER_RE.replace_all(&t, "");
    let t = AUTHOR_RE.replace_all(&t, "");
    let t = BLANKS_RE.replace_all(&t, "\n\n");
    t.trim().to_string()
}

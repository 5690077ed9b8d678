//! Markup extractor: locates the title heading, body container, and dated
//! timestamp in a detail page. Fixed selector per field, first match wins.
//! The body comes back as raw inner HTML; cleaning is the noise filter's job
//! so the two stay independently testable.

use scraper::{Html, Selector};

/// Raw pieces of one detail page. `None` means the page lacked that piece;
/// the detail fetcher substitutes placeholders.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub title: Option<String>,
    pub body_html: Option<String>,
    pub date: Option<String>,
}

/// Parse a CSS selector known to be valid at compile time.
fn selector(sel: &str) -> Option<Selector> {
    Selector::parse(sel).ok()
}

/// Extract title, body markup, and machine-readable date from a detail page.
///
/// - title: text of the first `h1.entry-title`, trimmed.
/// - body: inner HTML of the first `div.entry-content`, unmodified.
/// - date: the `datetime` attribute of the first `time.entry-date`; the
///   displayed text is never used.
pub fn extract(raw_html: &str) -> Extracted {
    let doc = Html::parse_document(raw_html);

    let title = selector("h1.entry-title").and_then(|sel| {
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    });

    let body_html = selector("div.entry-content")
        .and_then(|sel| doc.select(&sel).next().map(|el| el.inner_html()));

    let date = selector("time.entry-date").and_then(|sel| {
        doc.select(&sel)
            .next()
            .and_then(|el| el.value().attr("datetime").map(String::from))
    });

    Extracted {
        title,
        body_html,
        date,
    }
}

//! Catalog walker: pages through the WP REST listing API until a page comes
//! back empty, accumulating one [PostRef] per listed post.

use crate::harvest::{HarvestError, PageSource};
use crate::model::PostRef;
use serde::Deserialize;

/// One element of a listing page. The API renders the title as HTML under
/// `title.rendered`; `link` is the canonical post URL.
#[derive(Debug, Deserialize)]
struct ApiPost {
    title: RenderedTitle,
    link: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct RenderedTitle {
    rendered: String,
}

fn listing_url(base_url: &str, category_id: u32, per_page: u32, page: u32) -> String {
    format!(
        "{}/wp-json/wp/v2/posts?categories={}&per_page={}&page={}",
        base_url.trim_end_matches('/'),
        category_id,
        per_page,
        page
    )
}

/// Walk the listing, starting at page 1, until a page yields zero entries.
///
/// A transport error, non-success status, or unparseable page terminates the
/// walk early; whatever was accumulated so far is returned as final. No page
/// is ever retried. Returned order is API order (newest-first); the caller
/// reverses to oldest-first before detail fetching.
pub fn walk_catalog(
    source: &mut dyn PageSource,
    base_url: &str,
    category_id: u32,
    per_page: u32,
    progress: Option<&dyn Fn(u32)>,
) -> Vec<PostRef> {
    let mut refs = Vec::new();
    let mut page = 1u32;
    loop {
        let url = listing_url(base_url, category_id, per_page, page);
        let body = match source.fetch(&url) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Listing page {}: {}. Stopping walk.", page, e);
                break;
            }
        };
        let posts: Vec<ApiPost> = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => {
                let err = HarvestError::ListingParse { page, source: e };
                eprintln!("{}. Stopping walk.", err);
                break;
            }
        };
        if posts.is_empty() {
            break;
        }
        refs.extend(posts.into_iter().map(|p| PostRef {
            title: p.title.rendered,
            url: p.link,
            published_at: p.date,
        }));
        if let Some(ref cb) = progress {
            cb(page);
        }
        page += 1;
    }
    refs
}

/// Resolve the display name of a category from its id.
///
/// Spaces become underscores so the name doubles as a file-name stem. Any
/// failure falls back to `category_{id}`.
pub fn resolve_category_name(
    source: &mut dyn PageSource,
    base_url: &str,
    category_id: u32,
) -> String {
    let url = format!(
        "{}/wp-json/wp/v2/categories/{}",
        base_url.trim_end_matches('/'),
        category_id
    );
    let fallback = format!("category_{}", category_id);
    let body = match source.fetch(&url) {
        Ok(b) => b,
        Err(_) => return fallback,
    };
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("name").and_then(|n| n.as_str()).map(String::from))
        .map(|name| name.replace(' ', "_"))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Page source backed by a url -> body map; unmapped urls return a 404.
    struct MapSource {
        pages: HashMap<String, String>,
    }

    impl PageSource for MapSource {
        fn fetch(&mut self, url: &str) -> Result<String, HarvestError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| HarvestError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                    context: None,
                })
        }
    }

    const BASE: &str = "https://example.com";

    fn post_json(n: u32) -> String {
        format!(
            r#"{{"title":{{"rendered":"Chapter {n}"}},"link":"https://example.com/chapter-{n}/","date":"2023-01-{n:02}T00:00:00"}}"#
        )
    }

    fn listing_body(range: std::ops::RangeInclusive<u32>) -> String {
        let posts: Vec<String> = range.map(post_json).collect();
        format!("[{}]", posts.join(","))
    }

    #[test]
    fn walk_stops_on_empty_page_and_keeps_api_order() {
        let mut pages = HashMap::new();
        pages.insert(listing_url(BASE, 33, 3, 1), listing_body(1..=3));
        pages.insert(listing_url(BASE, 33, 3, 2), listing_body(4..=5));
        pages.insert(listing_url(BASE, 33, 3, 3), "[]".to_string());
        let mut source = MapSource { pages };

        let refs = walk_catalog(&mut source, BASE, 33, 3, None);
        assert_eq!(refs.len(), 5);
        assert_eq!(refs[0].title, "Chapter 1");
        assert_eq!(refs[4].url, "https://example.com/chapter-5/");
        assert_eq!(refs[2].published_at, "2023-01-03T00:00:00");
    }

    #[test]
    fn walk_returns_partial_refs_on_http_error() {
        // Page 2 is unmapped and 404s; page 1's refs survive.
        let mut pages = HashMap::new();
        pages.insert(listing_url(BASE, 33, 2, 1), listing_body(1..=2));
        let mut source = MapSource { pages };

        let refs = walk_catalog(&mut source, BASE, 33, 2, None);
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn walk_stops_on_malformed_page() {
        let mut pages = HashMap::new();
        pages.insert(listing_url(BASE, 33, 2, 1), listing_body(1..=2));
        pages.insert(listing_url(BASE, 33, 2, 2), "<html>blocked</html>".to_string());
        let mut source = MapSource { pages };

        let refs = walk_catalog(&mut source, BASE, 33, 2, None);
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn walk_counts_pages_through_progress_callback() {
        let mut pages = HashMap::new();
        pages.insert(listing_url(BASE, 33, 2, 1), listing_body(1..=2));
        pages.insert(listing_url(BASE, 33, 2, 2), listing_body(3..=4));
        pages.insert(listing_url(BASE, 33, 2, 3), "[]".to_string());
        let mut source = MapSource { pages };

        let seen = std::cell::Cell::new(0u32);
        let cb = |page: u32| seen.set(seen.get().max(page));
        walk_catalog(&mut source, BASE, 33, 2, Some(&cb));
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn category_name_resolved_with_underscores() {
        let mut pages = HashMap::new();
        pages.insert(
            format!("{}/wp-json/wp/v2/categories/33", BASE),
            r#"{"id":33,"name":"Living Safely"}"#.to_string(),
        );
        let mut source = MapSource { pages };
        assert_eq!(resolve_category_name(&mut source, BASE, 33), "Living_Safely");
    }

    #[test]
    fn category_name_falls_back_on_error() {
        let mut source = MapSource {
            pages: HashMap::new(),
        };
        assert_eq!(resolve_category_name(&mut source, BASE, 7), "category_7");
    }

    #[test]
    fn listing_url_trims_trailing_slash() {
        assert_eq!(
            listing_url("https://example.com/", 33, 100, 2),
            "https://example.com/wp-json/wp/v2/posts?categories=33&per_page=100&page=2"
        );
    }
}

//! Resumable detail fetcher: retrieves each referenced post, normalizes it,
//! and persists one [PostRecord] per new url through the checkpoint.

use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::clean::clean;
use crate::extract::extract;
use crate::harvest::PageSource;
use crate::model::{PostRecord, PostRef};

/// Placeholder values for fields the detail page did not provide. These are
/// valid record values, not error conditions.
pub const NO_TITLE: &str = "No Title";
pub const NO_CONTENT: &str = "No Content";
pub const NO_DATE: &str = "No Date";

/// Fetch every reference not already in the checkpoint, in the given order.
///
/// Re-running against the same checkpoint is idempotent: urls already in the
/// index are skipped without a request. A failed fetch is logged and skipped;
/// it never aborts the remaining references. Each new record is appended and
/// durably persisted before the next fetch begins, so a crash loses at most
/// the in-flight item. Only a checkpoint write failure is fatal.
///
/// Returns the number of newly fetched records; the full corpus is the
/// checkpoint's record sequence.
pub fn fetch_all(
    refs: &[PostRef],
    source: &mut dyn PageSource,
    store: &mut dyn Checkpoint<PostRecord>,
    progress: Option<&dyn Fn(u32, u32)>,
) -> Result<usize, CheckpointError> {
    let total = refs.len() as u32;
    let mut added = 0usize;
    for (i, post_ref) in refs.iter().enumerate() {
        if let Some(ref cb) = progress {
            cb(i as u32 + 1, total);
        }
        if store.contains(&post_ref.url) {
            continue;
        }
        let html = match source.fetch(&post_ref.url) {
            Ok(h) => h,
            Err(e) => {
                eprintln!("Error fetching {}: {}. Skipped.", post_ref.url, e);
                continue;
            }
        };
        store.append(build_record(&post_ref.url, &html))?;
        added += 1;
    }
    Ok(added)
}

/// Extract and normalize one detail page into a record. Missing pieces
/// degrade to the documented placeholders.
fn build_record(url: &str, html: &str) -> PostRecord {
    let extracted = extract(html);
    PostRecord {
        title: extracted.title.unwrap_or_else(|| NO_TITLE.to_string()),
        content: extracted
            .body_html
            .map(|body| clean(&body))
            .unwrap_or_else(|| NO_CONTENT.to_string()),
        published_at: extracted.date.unwrap_or_else(|| NO_DATE.to_string()),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpoint;
    use crate::harvest::HarvestError;
    use std::collections::{HashMap, HashSet};

    struct FakeSource {
        pages: HashMap<String, String>,
        failing: HashSet<String>,
        requests: Vec<String>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                failing: HashSet::new(),
                requests: Vec::new(),
            }
        }
    }

    impl PageSource for FakeSource {
        fn fetch(&mut self, url: &str) -> Result<String, HarvestError> {
            self.requests.push(url.to_string());
            if self.failing.contains(url) {
                return Err(HarvestError::HttpStatus {
                    status: 500,
                    url: url.to_string(),
                    context: None,
                });
            }
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

    fn post_html(n: u32) -> String {
        format!(
            r#"<html><body>
<h1 class="entry-title">Chapter {n}</h1>
<time class="entry-date" datetime="2023-01-{n:02}T00:00:00">Jan {n}</time>
<div class="entry-content"><p>Body of chapter {n}.</p><p>Second paragraph.</p></div>
</body></html>"#
        )
    }

    fn refs(range: std::ops::RangeInclusive<u32>) -> Vec<PostRef> {
        range
            .map(|n| PostRef {
                title: format!("Chapter {}", n),
                url: format!("https://example.com/chapter-{}/", n),
                published_at: format!("2023-01-{:02}T00:00:00", n),
            })
            .collect()
    }

    fn source_for(range: std::ops::RangeInclusive<u32>) -> FakeSource {
        let mut source = FakeSource::new();
        for n in range {
            source
                .pages
                .insert(format!("https://example.com/chapter-{}/", n), post_html(n));
        }
        source
    }

    #[test]
    fn fetches_all_new_references_in_order() -> Result<(), CheckpointError> {
        let refs = refs(1..=3);
        let mut source = source_for(1..=3);
        let mut store: MemoryCheckpoint<PostRecord> = MemoryCheckpoint::new();

        let added = fetch_all(&refs, &mut source, &mut store, None)?;
        assert_eq!(added, 3);
        let titles: Vec<&str> = store.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1", "Chapter 2", "Chapter 3"]);
        assert_eq!(store.records()[0].published_at, "2023-01-01T00:00:00");
        assert_eq!(
            store.records()[0].content,
            "Body of chapter 1.\n\nSecond paragraph."
        );
        Ok(())
    }

    #[test]
    fn second_run_is_idempotent_and_makes_no_requests() -> Result<(), CheckpointError> {
        let refs = refs(1..=3);
        let mut source = source_for(1..=3);
        let mut store: MemoryCheckpoint<PostRecord> = MemoryCheckpoint::new();

        fetch_all(&refs, &mut source, &mut store, None)?;
        let first_run_requests = source.requests.len();
        let added = fetch_all(&refs, &mut source, &mut store, None)?;

        assert_eq!(added, 0);
        assert_eq!(store.len(), 3);
        assert_eq!(source.requests.len(), first_run_requests);
        Ok(())
    }

    #[test]
    fn failed_item_is_skipped_and_order_preserved() -> Result<(), CheckpointError> {
        let refs = refs(1..=5);
        let mut source = source_for(1..=5);
        source
            .failing
            .insert("https://example.com/chapter-3/".to_string());
        let mut store: MemoryCheckpoint<PostRecord> = MemoryCheckpoint::new();

        let added = fetch_all(&refs, &mut source, &mut store, None)?;
        assert_eq!(added, 4);
        let titles: Vec<&str> = store.records().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Chapter 1", "Chapter 2", "Chapter 4", "Chapter 5"]
        );
        Ok(())
    }

    #[test]
    fn url_index_size_equals_corpus_length() -> Result<(), CheckpointError> {
        let refs = refs(1..=4);
        let mut source = source_for(1..=4);
        let mut store: MemoryCheckpoint<PostRecord> = MemoryCheckpoint::new();
        fetch_all(&refs, &mut source, &mut store, None)?;
        let urls: HashSet<&str> = store.records().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls.len(), store.len());
        Ok(())
    }

    #[test]
    fn missing_fields_become_placeholders() {
        let record = build_record("https://example.com/odd/", "<html><body></body></html>");
        assert_eq!(record.title, NO_TITLE);
        assert_eq!(record.content, NO_CONTENT);
        assert_eq!(record.published_at, NO_DATE);
        assert_eq!(record.url, "https://example.com/odd/");
    }

    #[test]
    fn progress_reports_position_over_total() -> Result<(), CheckpointError> {
        let refs = refs(1..=2);
        let mut source = source_for(1..=2);
        let mut store: MemoryCheckpoint<PostRecord> = MemoryCheckpoint::new();
        let calls = std::cell::RefCell::new(Vec::new());
        let cb = |n: u32, total: u32| calls.borrow_mut().push((n, total));
        fetch_all(&refs, &mut source, &mut store, Some(&cb))?;
        assert_eq!(*calls.borrow(), vec![(1, 2), (2, 2)]);
        Ok(())
    }
}

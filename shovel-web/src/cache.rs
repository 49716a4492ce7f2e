use dashmap::DashMap;
use shovel_dom::Document;
use std::sync::Arc;

/// Documents keyed by the exact URL string they were fetched with.
///
/// Clones share the same entries. Entries never expire; only [`clear`](Self::clear)
/// removes them, all at once.
#[derive(Debug, Default, Clone)]
pub struct DocumentCache {
    entries: Arc<DashMap<String, Document>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Document> {
        self.entries.get(url).map(|entry| entry.value().clone())
    }

    /// Store under `document.url()`, replacing any previous entry.
    pub fn insert(&self, document: Document) {
        self.entries.insert(document.url().to_string(), document);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_byte_exact() {
        let cache = DocumentCache::new();
        cache.insert(Document::new("https://example.com/", "<p>a</p>"));

        assert!(cache.contains("https://example.com/"));
        assert!(!cache.contains("https://example.com"));
        assert!(!cache.contains("HTTPS://example.com/"));
    }

    #[test]
    fn clones_share_entries_and_clear_empties_all() {
        let cache = DocumentCache::new();
        let other = cache.clone();
        cache.insert(Document::new("a", "1"));
        other.insert(Document::new("b", "2"));
        assert_eq!(cache.len(), 2);

        other.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn later_insert_replaces() {
        let cache = DocumentCache::new();
        cache.insert(Document::new("a", "old"));
        cache.insert(Document::new("a", "new"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap().html(), "new");
    }

    #[test]
    fn concurrent_writers_do_not_corrupt() {
        let cache = DocumentCache::new();
        std::thread::scope(|s| {
            for i in 0..8 {
                let cache = cache.clone();
                s.spawn(move || {
                    for j in 0..50 {
                        cache.insert(Document::new(format!("u{}", j % 10), format!("{i}")));
                        let _ = cache.get("u0");
                    }
                });
            }
        });
        assert_eq!(cache.len(), 10);
    }
}

use std::collections::HashSet;

/// Listing identifiers already forwarded to the sink.
///
/// Owned by a single poller; a second niche gets its own instance rather
/// than sharing state. Entries are never removed and never persisted, so a
/// restart re-discovers everything currently on the page.
#[derive(Debug, Default)]
pub struct SeenSet {
    links: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-sensitive exact match on the identifier.
    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Returns false if the link was already present.
    pub fn insert(&mut self, link: impl Into<String>) -> bool {
        self.links.insert(link.into())
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut seen = SeenSet::new();
        assert!(seen.insert("https://example.com/jobs/1"));
        assert!(!seen.insert("https://example.com/jobs/1"));
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("https://example.com/jobs/1"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let mut seen = SeenSet::new();
        seen.insert("https://example.com/Jobs/1");
        assert!(!seen.contains("https://example.com/jobs/1"));
    }
}

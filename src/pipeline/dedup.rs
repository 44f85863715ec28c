use std::collections::HashSet;

/// Remembers which URLs have already been handed to the exporter
///
/// Independent of the frontier's visited set: a page can be visited without
/// ever being emitted.
#[derive(Debug, Default)]
pub struct Deduplicator {
    emitted: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `url` is seen, false afterwards
    pub fn should_emit(&mut self, url: &str) -> bool {
        if self.emitted.contains(url) {
            return false;
        }
        self.emitted.insert(url.to_string());
        true
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }
}

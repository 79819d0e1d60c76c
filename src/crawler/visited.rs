use dashmap::DashSet;

/// Set of canonical URLs already accepted for fetching
///
/// Shared by every worker. Check-and-insert is a single atomic step, so a
/// URL discovered by two workers at once is accepted exactly once.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as visited
    ///
    /// Returns true if this call inserted it, false if it was already there.
    pub fn mark(&self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }
}

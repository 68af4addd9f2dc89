use std::collections::HashMap;

/// Connect-failure counts keyed by domain
///
/// Counts only ever grow. Each task accumulates its own counters; the
/// scheduler folds them into the shared counters with [`merge`](Self::merge)
/// once the task has finished, so the shared map is never written concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFailureCounters {
    counts: HashMap<String, u32>,
}

impl DomainFailureCounters {
    /// Creates an empty set of counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one connect failure for a domain
    pub fn record(&mut self, domain: &str) {
        self.add(domain, 1);
    }

    /// Adds `count` connect failures for a domain
    pub fn add(&mut self, domain: &str, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.counts.entry(domain.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Returns the failure count for a domain (0 if never seen)
    pub fn get(&self, domain: &str) -> u32 {
        self.counts.get(domain).copied().unwrap_or(0)
    }

    /// Folds another set of counters into this one
    pub fn merge(&mut self, other: &DomainFailureCounters) {
        for (domain, count) in &other.counts {
            self.add(domain, *count);
        }
    }

    /// Returns true if no failures have been recorded
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total failures across all domains
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Iterates over (domain, count) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(d, c)| (d.as_str(), *c))
    }
}

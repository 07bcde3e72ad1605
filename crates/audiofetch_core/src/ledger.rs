use std::collections::BTreeSet;

use crate::job::JobId;

/// Job ids that already triggered an automatic artifact retrieval.
///
/// Append-only. The durable copy lives outside the core; other tabs' writes
/// arrive through [`AutoDownloadLedger::absorb`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AutoDownloadLedger {
    ids: BTreeSet<JobId>,
}

impl AutoDownloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, job_id: &str) -> bool {
        self.ids.contains(job_id)
    }

    /// Idempotent. Returns `true` when the id was not yet recorded.
    pub fn add(&mut self, job_id: &str) -> bool {
        if self.ids.contains(job_id) {
            return false;
        }
        self.ids.insert(job_id.to_owned())
    }

    /// Unions a snapshot written elsewhere. Returns `true` if anything new arrived.
    pub fn absorb<I>(&mut self, snapshot: I) -> bool
    where
        I: IntoIterator<Item = JobId>,
    {
        let before = self.ids.len();
        self.ids.extend(snapshot);
        self.ids.len() != before
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_vec(&self) -> Vec<JobId> {
        self.ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut ledger = AutoDownloadLedger::new();
        assert!(ledger.add("a"));
        assert!(!ledger.add("a"));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.has("a"));
    }

    #[test]
    fn absorb_never_drops_local_entries() {
        let mut ledger = AutoDownloadLedger::new();
        ledger.add("local");
        assert!(ledger.absorb(vec!["remote".to_string()]));
        assert!(ledger.has("local"));
        assert!(ledger.has("remote"));
        assert!(!ledger.absorb(vec!["remote".to_string()]));
    }
}

//! Per-blob last-use tracking.

/// Records, per blob id, the index of the last layer allowed to read it.
///
/// Built during assembly: consuming a blob extends its lifetime to the
/// consumer, producing one (fresh or in place) extends it to one past the
/// producer. Pinned blobs are never released.
#[derive(Debug, Clone, Default)]
pub struct LifetimeTracker {
    last_use: Vec<usize>,
}

impl LifetimeTracker {
    const PINNED: usize = usize::MAX;

    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a blob produced by `layer_id`; returns its id.
    pub fn track(&mut self, layer_id: usize) -> usize {
        self.last_use.push(layer_id + 1);
        self.last_use.len() - 1
    }

    /// Ensures the blob stays readable at least until `layer_id`.
    pub fn extend(&mut self, blob_id: usize, layer_id: usize) {
        let last_use = &mut self.last_use[blob_id];
        *last_use = (*last_use).max(layer_id);
    }

    /// Keeps the blob alive until the end of the net.
    pub fn pin(&mut self, blob_id: usize) {
        self.last_use[blob_id] = Self::PINNED;
    }

    pub fn is_pinned(&self, blob_id: usize) -> bool {
        self.last_use[blob_id] == Self::PINNED
    }

    /// Last layer index allowed to read the blob; `None` when pinned.
    pub fn last_use(&self, blob_id: usize) -> Option<usize> {
        match self.last_use[blob_id] {
            Self::PINNED => None,
            index => Some(index),
        }
    }

    /// Whether the blob's storage may be released once `layer_id` has run.
    pub fn is_expired(&self, blob_id: usize, layer_id: usize) -> bool {
        self.last_use[blob_id] <= layer_id
    }

    pub fn len(&self) -> usize {
        self.last_use.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_use.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_blob_lives_one_past_producer() {
        let mut tracker = LifetimeTracker::new();
        let id = tracker.track(2);
        assert_eq!(tracker.last_use(id), Some(3));
        assert!(!tracker.is_expired(id, 2));
        assert!(tracker.is_expired(id, 3));
    }

    #[test]
    fn test_extend_only_grows() {
        let mut tracker = LifetimeTracker::new();
        let id = tracker.track(0);
        tracker.extend(id, 5);
        tracker.extend(id, 2);
        assert_eq!(tracker.last_use(id), Some(5));
    }

    #[test]
    fn test_pinned_never_expires() {
        let mut tracker = LifetimeTracker::new();
        let id = tracker.track(0);
        tracker.pin(id);
        tracker.extend(id, 7);
        assert!(tracker.is_pinned(id));
        assert_eq!(tracker.last_use(id), None);
        assert!(!tracker.is_expired(id, usize::MAX - 1));
    }
}

//! Render request bookkeeping

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Issues render request ids and remembers the most recent one.
///
/// A render response is applied only while its id is still the latest;
/// anything older was superseded by a later navigation or zoom.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_request_id: u64,
    latest: Option<RequestId>,
}

impl RequestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new request id, superseding every earlier one
    pub fn issue(&mut self) -> RequestId {
        self.next_request_id += 1;
        let id = RequestId::new(self.next_request_id);
        self.latest = Some(id);
        id
    }

    #[must_use]
    pub fn is_latest(&self, id: RequestId) -> bool {
        self.latest == Some(id)
    }

    /// Forget the latest request so no outstanding response is applied
    pub fn reset(&mut self) {
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_requests_supersede_earlier_ones() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue();
        let second = tracker.issue();

        assert!(first < second);
        assert!(!tracker.is_latest(first));
        assert!(tracker.is_latest(second));
    }

    #[test]
    fn reset_invalidates_outstanding() {
        let mut tracker = RequestTracker::new();
        let id = tracker.issue();
        tracker.reset();
        assert!(!tracker.is_latest(id));
    }
}

// Last-issued-wins slots for fetched data.
//
// Every fetch pipeline (packet page, detail, flows, unanswered, stats) owns
// one slot. A fetch takes a ticket when it is issued and hands it back with
// its result; only the ticket of the most recently issued fetch may write.
// Arrival order never matters.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    session: Option<Uuid>,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn session(&self) -> Option<Uuid> {
        self.session
    }
}

#[derive(Debug)]
pub struct LatestWins<T> {
    issued: u64,
    settled: u64,
    value: Option<T>,
}

impl<T> Default for LatestWins<T> {
    fn default() -> Self {
        Self {
            issued: 0,
            settled: 0,
            value: None,
        }
    }
}

impl<T> LatestWins<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, session: Option<Uuid>) -> Ticket {
        self.issued += 1;
        Ticket {
            seq: self.issued,
            session,
        }
    }

    fn is_latest(&self, ticket: &Ticket) -> bool {
        ticket.seq == self.issued
    }

    /// Store `value` if `ticket` is still the latest issued. Returns whether
    /// the value was applied.
    pub fn accept(&mut self, ticket: Ticket, value: T) -> bool {
        if !self.is_latest(&ticket) {
            return false;
        }
        self.value = Some(value);
        self.settled = ticket.seq;
        true
    }

    /// The latest fetch failed: stop reporting it as pending but keep the
    /// value that is on screen. Returns whether the ticket was current.
    pub fn settle_failed(&mut self, ticket: Ticket) -> bool {
        if !self.is_latest(&ticket) {
            return false;
        }
        self.settled = ticket.seq;
        true
    }

    pub fn pending(&self) -> bool {
        self.settled < self.issued
    }

    pub fn current(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Drop the value and invalidate every outstanding ticket.
    pub fn clear(&mut self) {
        self.issued += 1;
        self.settled = self.issued;
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_issued_wins_regardless_of_arrival() {
        let mut slot: LatestWins<&str> = LatestWins::new();
        let a = slot.issue(None);
        let b = slot.issue(None);

        // B resolves first, then A
        assert!(slot.accept(b, "B"));
        assert!(!slot.accept(a, "A"));
        assert_eq!(slot.current(), Some(&"B"));
        assert!(!slot.pending());
    }

    #[test]
    fn test_pending_until_latest_settles() {
        let mut slot: LatestWins<u32> = LatestWins::new();
        let a = slot.issue(None);
        assert!(slot.pending());
        let b = slot.issue(None);
        assert!(!slot.accept(a, 1));
        assert!(slot.pending());
        assert!(slot.settle_failed(b));
        assert!(!slot.pending());
        assert_eq!(slot.current(), None);
    }

    #[test]
    fn test_failure_keeps_previous_value() {
        let mut slot: LatestWins<u32> = LatestWins::new();
        let a = slot.issue(None);
        slot.accept(a, 7);
        let b = slot.issue(None);
        slot.settle_failed(b);
        assert_eq!(slot.current(), Some(&7));
    }

    #[test]
    fn test_clear_invalidates_outstanding() {
        let mut slot: LatestWins<u32> = LatestWins::new();
        let a = slot.issue(None);
        slot.clear();
        assert!(!slot.accept(a, 3));
        assert_eq!(slot.current(), None);
        assert!(!slot.pending());
    }
}

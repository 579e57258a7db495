use std::collections::BTreeSet;

use crate::SupplementaryStatus;

/// Outgoing sequence numbers.
#[derive(Debug, Clone)]
pub(crate) struct SequenceCounter {
    next: u32,
}

impl SequenceCounter {
    pub(crate) fn new(initial: u32) -> Self {
        Self { next: initial }
    }

    pub(crate) fn peek(&self) -> u32 {
        self.next
    }

    /// Advances past `used`, which must be the value last returned by [`SequenceCounter::peek`].
    pub(crate) fn commit(&mut self, used: u32) {
        debug_assert_eq!(used, self.next);
        self.next = used.wrapping_add(1);
    }
}

/// Where an incoming sequence number falls relative to the ones already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// Exactly the next expected number.
    InOrder,
    /// Later than expected: some tokens were skipped.
    Gap,
    /// Earlier than expected but inside the window and not seen yet.
    Unsequenced,
    /// Already seen.
    Duplicate,
    /// Too far behind to tell.
    Old,
}

impl SequenceCheck {
    pub fn status(self) -> SupplementaryStatus {
        match self {
            SequenceCheck::InOrder => SupplementaryStatus::empty(),
            SequenceCheck::Gap => SupplementaryStatus::GAP_TOKEN,
            SequenceCheck::Unsequenced => SupplementaryStatus::UNSEQ_TOKEN,
            SequenceCheck::Duplicate => SupplementaryStatus::DUPLICATE_TOKEN,
            SequenceCheck::Old => SupplementaryStatus::OLD_TOKEN,
        }
    }

    pub fn is_replay(self) -> bool {
        matches!(self, SequenceCheck::Duplicate | SequenceCheck::Old)
    }
}

/// Peer sequence numbers seen so far.
///
/// Numbers are tracked relative to the peer's initial sequence number, so a peer starting
/// close to `u32::MAX` wraps without special casing.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    base: u32,
    /// Relative number of the next in-order token.
    next: u32,
    /// Relative numbers seen within `size` of `next`.
    seen: BTreeSet<u32>,
    size: u32,
}

impl ReplayWindow {
    pub fn new(initial: u32, size: usize) -> Self {
        Self {
            base: initial,
            next: 0,
            seen: BTreeSet::new(),
            size: u32::try_from(size).unwrap_or(u32::MAX).max(1),
        }
    }

    /// Classifies `sequence_number` without recording it.
    pub fn check(&self, sequence_number: u32) -> SequenceCheck {
        let relative = sequence_number.wrapping_sub(self.base);

        if relative == self.next {
            return SequenceCheck::InOrder;
        }

        let ahead = relative.wrapping_sub(self.next);
        if ahead < 1 << 31 {
            return SequenceCheck::Gap;
        }

        let behind = self.next.wrapping_sub(relative);
        if behind > self.size {
            SequenceCheck::Old
        } else if self.seen.contains(&relative) {
            SequenceCheck::Duplicate
        } else {
            SequenceCheck::Unsequenced
        }
    }

    /// Classifies `sequence_number` and marks it as seen.
    ///
    /// Must only be called once the token carrying the number has been verified.
    pub fn observe(&mut self, sequence_number: u32) -> SequenceCheck {
        let check = self.check(sequence_number);
        let relative = sequence_number.wrapping_sub(self.base);

        match check {
            SequenceCheck::InOrder | SequenceCheck::Gap => {
                self.seen.insert(relative);
                self.next = relative.wrapping_add(1);

                let (next, size) = (self.next, self.size);
                self.seen.retain(|&seen| next.wrapping_sub(seen) <= size);
            }
            SequenceCheck::Unsequenced => {
                self.seen.insert(relative);
            }
            SequenceCheck::Duplicate | SequenceCheck::Old => {}
        }

        check
    }

    /// Next sequence number expected from the peer.
    pub fn expected(&self) -> u32 {
        self.base.wrapping_add(self.next)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn counter_increments_on_commit_only() {
        let mut counter = SequenceCounter::new(u32::MAX);
        assert_eq!(counter.peek(), u32::MAX);
        assert_eq!(counter.peek(), u32::MAX);

        counter.commit(u32::MAX);
        assert_eq!(counter.peek(), 0);
    }

    #[test]
    fn in_order_stream() {
        let mut window = ReplayWindow::new(1000, 64);

        for seq in 1000..1100 {
            assert_eq!(window.observe(seq), SequenceCheck::InOrder);
        }
        assert_eq!(window.expected(), 1100);
    }

    #[test]
    fn gap_then_late_arrival() {
        let mut window = ReplayWindow::new(0, 64);

        assert_eq!(window.observe(0), SequenceCheck::InOrder);
        assert_eq!(window.observe(3), SequenceCheck::Gap);
        assert_eq!(window.observe(1), SequenceCheck::Unsequenced);
        assert_eq!(window.observe(1), SequenceCheck::Duplicate);
        assert_eq!(window.observe(3), SequenceCheck::Duplicate);
        assert_eq!(window.observe(4), SequenceCheck::InOrder);
    }

    #[rstest]
    #[case(8, 100, 93, SequenceCheck::Unsequenced)]
    #[case(8, 100, 92, SequenceCheck::Unsequenced)]
    #[case(8, 100, 91, SequenceCheck::Old)]
    #[case(8, 100, 99, SequenceCheck::Duplicate)]
    #[case(8, 100, 0, SequenceCheck::Old)]
    fn window_boundary(#[case] size: usize, #[case] next: u32, #[case] probe: u32, #[case] expected: SequenceCheck) {
        let mut window = ReplayWindow::new(0, size);
        window.observe(next - 1);

        assert_eq!(window.check(probe), expected);
    }

    #[test]
    fn wraps_around_u32() {
        let mut window = ReplayWindow::new(u32::MAX - 1, 16);

        assert_eq!(window.observe(u32::MAX - 1), SequenceCheck::InOrder);
        assert_eq!(window.observe(u32::MAX), SequenceCheck::InOrder);
        assert_eq!(window.observe(0), SequenceCheck::InOrder);
        assert_eq!(window.observe(u32::MAX), SequenceCheck::Duplicate);
    }

    #[test]
    fn check_does_not_record() {
        let window = ReplayWindow::new(5, 64);

        assert_eq!(window.check(5), SequenceCheck::InOrder);
        assert_eq!(window.check(5), SequenceCheck::InOrder);
    }

    #[test]
    fn only_replays_are_rejected() {
        assert!(SequenceCheck::Duplicate.is_replay());
        assert!(SequenceCheck::Old.is_replay());
        assert!(!SequenceCheck::Gap.is_replay());
        assert_eq!(SequenceCheck::Unsequenced.status(), SupplementaryStatus::UNSEQ_TOKEN);
    }
}

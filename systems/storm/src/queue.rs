use std::{cmp::Ordering, collections::BinaryHeap};

use dust_storm_core::PanelId;
use serde::{Deserialize, Serialize};

/// Panel handle paired with its normalised priority score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredPanel {
    /// Handle captured when the panel was scored. It may be stale by the time
    /// the entry is popped.
    pub panel: PanelId,
    /// Priority score; lower scores degrade first.
    pub score: f64,
}

impl ScoredPanel {
    /// Pairs a panel handle with its score.
    #[must_use]
    pub const fn new(panel: PanelId, score: f64) -> Self {
        Self { panel, score }
    }

    fn priority(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.panel.cmp(&other.panel))
    }
}

/// Pre-sorted removable list acting as an O(1) pop source.
///
/// Entries are sorted by descending score once at construction and consumed
/// strictly from the tail, so pops yield ascending scores. Ties pop in
/// ascending handle order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelQueue {
    entries: Vec<ScoredPanel>,
}

impl PanelQueue {
    /// Sorts the provided entries into pop order.
    #[must_use]
    pub fn from_scored(mut entries: Vec<ScoredPanel>) -> Self {
        entries.sort_by(|a, b| b.priority(a));
        Self { entries }
    }

    /// Removes and returns the lowest-scored entry.
    pub fn pop(&mut self) -> Option<ScoredPanel> {
        self.entries.pop()
    }

    /// Returns the entry the next [`PanelQueue::pop`] would yield.
    #[must_use]
    pub fn peek(&self) -> Option<&ScoredPanel> {
        self.entries.last()
    }

    /// Number of entries remaining.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether every entry has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in storage order (descending score).
    pub fn iter(&self) -> impl Iterator<Item = &ScoredPanel> {
        self.entries.iter()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct ReserveEntry(ScoredPanel);

impl PartialEq for ReserveEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReserveEntry {}

impl PartialOrd for ReserveEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReserveEntry {
    // Reversed so the max-heap surfaces the lowest score.
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.priority(&self.0)
    }
}

/// Heap-backed O(log n) pop source for panels that become eligible after a
/// storm has started.
///
/// Storms carry one, but nothing feeds it yet: eligibility is still computed
/// once at creation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReservePanels {
    heap: BinaryHeap<ReserveEntry>,
}

impl ReservePanels {
    /// Adds a panel to the reserve.
    pub fn push(&mut self, entry: ScoredPanel) {
        self.heap.push(ReserveEntry(entry));
    }

    /// Removes and returns the lowest-scored panel.
    pub fn pop(&mut self) -> Option<ScoredPanel> {
        self.heap.pop().map(|entry| entry.0)
    }

    /// Number of panels held in reserve.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Reports whether the reserve is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: u64, score: f64) -> ScoredPanel {
        ScoredPanel::new(PanelId::new(id), score)
    }

    #[test]
    fn queue_pops_ascending_scores() {
        let mut queue = PanelQueue::from_scored(vec![scored(1, 0.1), scored(2, 0.9), scored(3, 0.5)]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek(), Some(&scored(1, 0.1)));

        let popped: Vec<f64> = std::iter::from_fn(|| queue.pop())
            .map(|entry| entry.score)
            .collect();
        assert_eq!(popped, vec![0.1, 0.5, 0.9]);
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn queue_is_stored_descending() {
        let queue = PanelQueue::from_scored(vec![scored(1, 0.3), scored(2, 0.7), scored(3, 0.0)]);
        let stored: Vec<f64> = queue.iter().map(|entry| entry.score).collect();
        assert_eq!(stored, vec![0.7, 0.3, 0.0]);
    }

    #[test]
    fn queue_breaks_ties_by_handle() {
        let mut queue = PanelQueue::from_scored(vec![scored(9, 0.5), scored(2, 0.5), scored(5, 0.5)]);
        let order: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|entry| entry.panel.get())
            .collect();
        assert_eq!(order, vec![2, 5, 9]);
    }

    #[test]
    fn reserve_pops_lowest_score_first() {
        let mut reserve = ReservePanels::default();
        assert!(reserve.is_empty());
        for (id, score) in [(1, 0.8), (2, 0.2), (3, 0.6), (4, 0.4)] {
            reserve.push(scored(id, score));
        }
        assert_eq!(reserve.len(), 4);

        let order: Vec<f64> = std::iter::from_fn(|| reserve.pop())
            .map(|entry| entry.score)
            .collect();
        assert_eq!(order, vec![0.2, 0.4, 0.6, 0.8]);
    }
}

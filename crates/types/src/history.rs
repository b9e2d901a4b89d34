//! Height-indexed value history.
//!
//! Votes are weighed against balances and stakes as they stood at a past
//! height, so components that feed voting power record every change of the
//! tracked value together with the height it happened at.

use crate::units::Height;
use serde::{Deserialize, Serialize};

/// Values recorded at non-decreasing heights.
///
/// A value recorded twice at the same height replaces the earlier one, so
/// `at(h)` is the value at the end of height `h`. Heights lower than the
/// latest entry are recorded at the latest entry's height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints<T> {
    entries: Vec<(Height, T)>,
}

impl<T> Default for Checkpoints<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> Checkpoints<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, height: Height, value: T) {
        match self.entries.last_mut() {
            Some((last, current)) if *last >= height => *current = value,
            _ => self.entries.push((height, value)),
        }
    }

    /// Value at the end of `height`, `None` before the first entry.
    pub fn at(&self, height: Height) -> Option<&T> {
        let index = self.entries.partition_point(|(at, _)| *at <= height);
        index.checked_sub(1).map(|i| &self.entries[i].1)
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.last().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_height() {
        let mut history = Checkpoints::new();
        history.record(10, 100u128);
        history.record(20, 50);
        history.record(20, 70);

        assert_eq!(history.at(9), None);
        assert_eq!(history.at(10), Some(&100));
        assert_eq!(history.at(19), Some(&100));
        assert_eq!(history.at(20), Some(&70));
        assert_eq!(history.at(u64::MAX), Some(&70));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_late_record_never_rewrites_the_past() {
        let mut history = Checkpoints::new();
        history.record(30, 1u128);
        history.record(5, 2);
        assert_eq!(history.at(29), None);
        assert_eq!(history.at(30), Some(&2));
        assert_eq!(history.latest(), Some(&2));
    }
}

use std::cmp::Ordering;

use crate::types::{PriorityIssue, ProcessedInventoryItem};
use crate::util;

/// Selectors sort and optionally truncate a list by a numeric score.
pub trait Selector<C> {
    /// Default selection: sort, then truncate to `size()` if set.
    fn select(&self, candidates: Vec<C>) -> Vec<C> {
        let mut sorted = self.sort(candidates);
        if let Some(limit) = self.size() {
            sorted.truncate(limit);
        }
        sorted
    }

    /// Extract the score from a candidate to use for sorting.
    fn score(&self, candidate: &C) -> f64;

    /// Sort candidates by their scores in descending order.
    ///
    /// The sort is stable, so equal scores keep their input order. NaN scores
    /// are pushed to the end of the list so they never appear as top entries.
    fn sort(&self, candidates: Vec<C>) -> Vec<C> {
        let mut sorted = candidates;
        sorted.sort_by(|a, b| {
            let sa = self.score(a);
            let sb = self.score(b);
            match (sa.is_nan(), sb.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => sb.partial_cmp(&sa).unwrap_or(Ordering::Equal),
            }
        });
        sorted
    }

    /// Optionally provide a maximum number of candidates to select.
    fn size(&self) -> Option<usize> {
        None
    }

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// Orders items by stock value, largest first.
#[derive(Clone, Copy, Debug, Default)]
pub struct StockValueSelector {
    pub limit: Option<usize>,
}

impl Selector<ProcessedInventoryItem> for StockValueSelector {
    fn score(&self, candidate: &ProcessedInventoryItem) -> f64 {
        candidate.stock_value
    }

    fn size(&self) -> Option<usize> {
        self.limit
    }
}

/// Orders issues by impact value, largest first.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImpactSelector {
    pub limit: Option<usize>,
}

impl Selector<PriorityIssue> for ImpactSelector {
    fn score(&self, candidate: &PriorityIssue) -> f64 {
        candidate.impact_value
    }

    fn size(&self) -> Option<usize> {
        self.limit
    }
}

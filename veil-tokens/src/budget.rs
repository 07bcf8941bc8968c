//! Split an overall token budget into per-partition sub-budgets and admit
//! items greedily under each.

use crate::counter::TokenCounter;

/// Citable and learn-only shares of one context budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSplit {
    pub total: usize,
    pub citable: usize,
    pub learn_only: usize,
}

impl BudgetSplit {
    /// Reserve `citable_share` of `total` for citable content and the rest for
    /// learn-only. The two halves always sum to `total`.
    pub fn new(total: usize, citable_share: f64) -> Self {
        let share = citable_share.clamp(0.0, 1.0);
        let citable = ((total as f64) * share).floor() as usize;
        let citable = citable.min(total);
        Self {
            total,
            citable,
            learn_only: total - citable,
        }
    }
}

/// A running sub-budget.
#[derive(Debug)]
pub struct SubBudget<'a> {
    counter: &'a TokenCounter,
    limit: usize,
    used: usize,
}

impl<'a> SubBudget<'a> {
    pub fn new(counter: &'a TokenCounter, limit: usize) -> Self {
        Self {
            counter,
            limit,
            used: 0,
        }
    }

    /// Charge `text` against the budget if it fits. Returns the tokens charged.
    pub fn try_admit(&mut self, text: &str) -> Option<usize> {
        let tokens = self.counter.count_cached(text);
        if tokens <= self.remaining() {
            self.used += tokens;
            Some(tokens)
        } else {
            None
        }
    }

    /// Charge a whole rendered block, replacing the previous charge, if it
    /// fits. Separators and wrappers are counted as the model will see them.
    pub fn try_fit_block(&mut self, block: &str) -> bool {
        let tokens = self.counter.count(block);
        if tokens <= self.limit {
            self.used = tokens;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sums_to_total() {
        let split = BudgetSplit::new(1000, 0.6);
        assert_eq!(split.citable, 600);
        assert_eq!(split.learn_only, 400);
        assert_eq!(split.citable + split.learn_only, split.total);
    }

    #[test]
    fn split_rounds_down_citable() {
        let split = BudgetSplit::new(7, 0.5);
        assert_eq!(split.citable, 3);
        assert_eq!(split.learn_only, 4);
    }

    #[test]
    fn sub_budget_rejects_oversized_text() {
        let counter = TokenCounter::new(16).unwrap();
        let mut budget = SubBudget::new(&counter, 3);
        assert!(budget
            .try_admit("this sentence is certainly longer than three tokens")
            .is_none());
        assert_eq!(budget.used(), 0);
        assert!(budget.try_admit("hi").is_some());
        assert!(budget.used() <= budget.limit());
    }

    #[test]
    fn block_charge_replaces_previous_charge() {
        let counter = TokenCounter::new(16).unwrap();
        let mut budget = SubBudget::new(&counter, 10);
        assert!(budget.try_fit_block("one fact"));
        let first = budget.used();
        assert!(budget.try_fit_block("one fact\n\ntwo facts"));
        assert_eq!(budget.used(), counter.count("one fact\n\ntwo facts"));
        assert!(budget.used() > first);
        assert!(!budget.try_fit_block(&"word ".repeat(50)));
        assert_eq!(budget.used(), counter.count("one fact\n\ntwo facts"));
    }
}

use proptest::prelude::*;
use veil_tokens::{BudgetSplit, SubBudget, TokenCounter};

proptest! {
    #[test]
    fn split_never_exceeds_total(total in 0usize..100_000, share in 0.01f64..0.99) {
        let split = BudgetSplit::new(total, share);
        prop_assert_eq!(split.citable + split.learn_only, total);
    }

    #[test]
    fn sub_budget_never_overspends(
        limit in 0usize..64,
        texts in proptest::collection::vec("[a-z ]{0,40}", 0..12)
    ) {
        let counter = TokenCounter::new(128).unwrap();
        let mut budget = SubBudget::new(&counter, limit);
        for text in &texts {
            let _ = budget.try_admit(text);
            prop_assert!(budget.used() <= limit);
        }
    }
}

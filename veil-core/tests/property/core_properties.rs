use proptest::prelude::*;
use veil_core::models::Namespace;

proptest! {
    #[test]
    fn valid_namespaces_round_trip(raw in "[A-Za-z0-9_.:-]{1,64}") {
        let ns = Namespace::parse(&raw).unwrap();
        prop_assert_eq!(ns.as_str(), raw.as_str());
    }

    #[test]
    fn namespaces_with_whitespace_are_rejected(
        left in "[a-z]{0,8}",
        right in "[a-z]{0,8}",
        ws in "[ \t\n]"
    ) {
        let raw = format!("{left}{ws}{right}");
        prop_assert!(Namespace::parse(&raw).is_err());
    }
}

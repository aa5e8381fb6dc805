use amend_model::{similarity, MatchOutcome, MunicipalityMatchPolicy};
use proptest::prelude::*;

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,12}"
}

proptest! {
    #[test]
    fn similarity_is_bounded_and_symmetric(a in name_strategy(), b in name_strategy()) {
        let s_ab = similarity(&a, &b);
        let s_ba = similarity(&b, &a);
        prop_assert!((0.0..=1.0).contains(&s_ab));
        prop_assert_eq!(s_ab, s_ba);
    }

    #[test]
    fn identical_names_have_similarity_one(a in name_strategy()) {
        prop_assert_eq!(similarity(&a, &a), 1.0);
    }

    #[test]
    fn canonical_names_always_resolve_to_themselves(names in proptest::collection::btree_set(name_strategy(), 1..12)) {
        let mut canonical: Vec<String> = names.into_iter().collect();
        canonical.sort();
        let policy = MunicipalityMatchPolicy::default();
        for name in &canonical {
            let outcome = policy.resolve(name, &canonical);
            prop_assert_eq!(outcome.canonical(), Some(name.as_str()));
            let is_exact = matches!(outcome, MatchOutcome::Exact { .. });
            prop_assert!(is_exact);
        }
    }
}

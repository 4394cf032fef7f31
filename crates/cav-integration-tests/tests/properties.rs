//! # Engine Properties
//!
//! Property tests over randomly generated ages, ranges and grant sequences.

mod common;

use cav_core::Actor;
use cav_engine::ErrorKind;
use common::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn range_check_is_exact(age in 1u8..=120, lo in 1u8..=120, hi in 1u8..=120) {
        let mut engine = engine();
        let alice = principal("alice");
        submit(&mut engine, &alice, age);
        let result = engine.is_in_range(&alice, lo, hi);
        if lo <= hi {
            let handle = result.unwrap();
            prop_assert_eq!(reveal(&mut engine, &alice, &handle), lo <= age && age <= hi);
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn peer_comparison_matches_plaintext(a in 1u8..=120, b in 1u8..=120) {
        let mut engine = engine();
        let alice = principal("alice");
        let bob = principal("bob");
        submit(&mut engine, &alice, a);
        submit(&mut engine, &bob, b);
        let older = engine.compare_to(&alice, &bob).unwrap();
        prop_assert_eq!(reveal(&mut engine, &alice, &older), a > b);
        let same = engine.compare_to(&alice, &alice).unwrap();
        prop_assert!(!reveal(&mut engine, &alice, &same));
    }

    #[test]
    fn derived_handles_inherit_nothing(age in 1u8..=120, threshold in 0u8..=255) {
        let mut engine = engine();
        let alice = principal("alice");
        let source = submit(&mut engine, &alice, age);
        let derived = engine.is_at_least(&alice, threshold).unwrap();

        // Grants on the derived handle come only from the explicit result
        // grant, never from the operand.
        let grant = engine.permissions().grants(&derived.untyped()).unwrap();
        prop_assert_eq!(grant.compute.len(), 1);
        prop_assert!(grant.compute.contains(&Actor::from(engine.context())));
        prop_assert_eq!(grant.disclose.len(), 1);
        prop_assert_ne!(derived.id(), source.id());
    }

    #[test]
    fn repeated_shares_change_nothing(age in 1u8..=120, repeats in 1usize..5) {
        let mut engine = engine();
        let alice = principal("alice");
        let bank = principal("bank");
        submit(&mut engine, &alice, age);
        let result = engine.is_at_least(&alice, 18).unwrap();

        engine.share(&alice, &result, &bank).unwrap();
        let once = engine.permissions().grants(&result.untyped()).cloned();
        for _ in 0..repeats {
            engine.share(&alice, &result, &bank).unwrap();
        }
        prop_assert_eq!(engine.permissions().grants(&result.untyped()).cloned(), once);
        prop_assert_eq!(reveal(&mut engine, &bank, &result), age >= 18);
    }

    #[test]
    fn resubmission_allowed_exactly_once_after_reset(first in 1u8..=120, second in 1u8..=120) {
        let mut engine = engine();
        let alice = principal("alice");
        submit(&mut engine, &alice, first);
        engine.reset(&owner(), &alice).unwrap();
        submit(&mut engine, &alice, second);

        let input = cav_fhe::MockCoprocessor::encrypt_input(&engine.context(), second);
        prop_assert_eq!(
            engine.submit(&alice, &input).unwrap_err().kind(),
            ErrorKind::AlreadySubmitted
        );
        prop_assert!(engine.verify_audit_chain().is_ok());
    }
}

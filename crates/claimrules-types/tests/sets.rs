//! Set literal parsing and membership across representative rule literals.

use claimrules_types::{LazySet, RuleValue};
use proptest::prelude::*;
use rstest::rstest;

fn set(text: &str) -> LazySet {
    match LazySet::parse(text).unwrap() {
        RuleValue::Set(s) => s,
        other => panic!("expected set for {text:?}, got {other:?}"),
    }
}

#[rstest]
#[case("2330,2331,2332,2335", "2331", true)]
#[case("2330,2331,2332,2335", "2334", false)]
#[case("4210-4249", "4220", true)]
#[case("4210-4249", "4250", false)]
#[case("as-ts,1-32", "cs", true)]
#[case("as-ts,1-32", "33", false)]
fn membership(#[case] literal: &str, #[case] candidate: &str, #[case] expected: bool) {
    assert_eq!(set(literal).includes(candidate), expected);
}

#[test]
fn display_round_trips_the_literal_shape() {
    let s = set("0120,0150,4210-4249");
    assert_eq!(s.to_text(), "0120,0150,4210-4249");
}

proptest! {
    #[test]
    fn intersection_is_symmetric(
        a in proptest::collection::vec(0u16..200, 1..6),
        b in proptest::collection::vec(0u16..200, 1..6),
    ) {
        let render = |v: &[u16]| {
            v.iter().map(u16::to_string).collect::<Vec<_>>().join(",")
        };
        let (ta, tb) = (render(&a), render(&b));
        // Disjoint pads keep single-element literals from collapsing to
        // scalars without forcing an intersection.
        let sa = set(&format!("{ta},9996,9997"));
        let sb = set(&format!("{tb},9998,9999"));
        prop_assert_eq!(sa.intersects(&sb), sb.intersects(&sa));
    }

    #[test]
    fn range_membership_matches_numeric_bounds(
        lo in 0u16..500, span in 0u16..200, candidate in 0u16..800,
    ) {
        let hi = lo + span;
        let s = set(&format!("{lo}-{hi},x"));
        let expected = candidate >= lo && candidate <= hi;
        prop_assert_eq!(s.includes(&candidate.to_string()), expected);
    }
}

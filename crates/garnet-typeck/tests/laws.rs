//! Property tests for the subtyping relation.
//!
//! Types are drawn from a small core vocabulary, combined with unions,
//! tuples, optionals and arrays, and checked against the core environment.

use std::sync::Arc;

use garnet_typeck::sig::{DefinitionBuilder, EnvironmentBuilder};
use garnet_typeck::subtyping::Check;
use garnet_typeck::Type;
use proptest::prelude::*;

fn core() -> DefinitionBuilder {
    DefinitionBuilder::new(Arc::new(EnvironmentBuilder::with_core().build().expect("core builds")))
}

/// The superclass chain of `Integer`, most specific first.
const CHAIN: &[&str] = &["Integer", "Numeric", "Object", "BasicObject"];

fn leaf_type() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::integer()),
        Just(Type::float()),
        Just(Type::string()),
        Just(Type::symbol()),
        Just(Type::instance("Numeric")),
        Just(Type::object()),
        Just(Type::Nil),
        Just(Type::Bool),
        (-3i64..3).prop_map(Type::int_lit),
        "[a-c]".prop_map(|s| Type::str_lit(&s)),
        "[a-c]".prop_map(|s| Type::sym_lit(&s)),
    ]
}

fn arb_type() -> impl Strategy<Value = Type> {
    leaf_type().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(Type::union),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Type::Tuple),
            inner.clone().prop_map(Type::optional),
            inner.prop_map(Type::array),
        ]
    })
}

proptest! {
    #[test]
    fn reflexive(t in arb_type()) {
        let b = core();
        prop_assert!(Check::new(&b).is_subtype(&t, &t), "{} <: {}", t, t);
    }

    #[test]
    fn bottom_top_and_untyped(t in arb_type()) {
        let b = core();
        let mut check = Check::new(&b);
        prop_assert!(check.is_subtype(&Type::Bot, &t));
        prop_assert!(check.is_subtype(&t, &Type::Top));
        prop_assert!(check.is_subtype(&t, &Type::Any));
        prop_assert!(check.is_subtype(&Type::Any, &t));
    }

    #[test]
    fn member_of_union(t in arb_type(), u in arb_type()) {
        let b = core();
        let joined = Type::union(vec![t.clone(), u]);
        prop_assert!(Check::new(&b).is_subtype(&t, &joined), "{} <: {}", t, joined);
    }

    #[test]
    fn optional_widens(t in arb_type()) {
        let b = core();
        let mut check = Check::new(&b);
        let opt = Type::optional(t.clone());
        prop_assert!(check.is_subtype(&t, &opt));
        prop_assert!(check.is_subtype(&Type::Nil, &opt));
    }

    #[test]
    fn union_on_the_left_needs_every_member(a in arb_type(), b in arb_type(), c in arb_type()) {
        let builder = core();
        let mut check = Check::new(&builder);
        let joined = Type::union(vec![a.clone(), b.clone()]);
        if check.is_subtype(&joined, &c) {
            prop_assert!(check.is_subtype(&a, &c), "{} <: {} but not {} <: {}", joined, c, a, c);
            prop_assert!(check.is_subtype(&b, &c), "{} <: {} but not {} <: {}", joined, c, b, c);
        }
    }

    #[test]
    fn superclass_chain_is_transitive(i in 0..CHAIN.len(), j in 0..CHAIN.len()) {
        let b = core();
        let mut check = Check::new(&b);
        let (sub, sup) = (Type::instance(CHAIN[i]), Type::instance(CHAIN[j]));
        prop_assert_eq!(check.is_subtype(&sub, &sup), i <= j);
        prop_assert_eq!(check.is_subtype(&Type::array(sub.clone()), &Type::array(sup.clone())), i <= j);
        prop_assert_eq!(check.is_subtype(&Type::Tuple(vec![sub]), &Type::Tuple(vec![sup])), i <= j);
    }

    #[test]
    fn union_is_idempotent(t in arb_type()) {
        prop_assert_eq!(Type::union(vec![t.clone(), t.clone()]), Type::union(vec![t]));
    }

    #[test]
    fn union_commutes(a in arb_type(), b in arb_type()) {
        let builder = core();
        let mut check = Check::new(&builder);
        let ab = Type::union(vec![a.clone(), b.clone()]);
        let ba = Type::union(vec![b, a]);
        prop_assert!(check.is_subtype(&ab, &ba), "{} <: {}", ab, ba);
        prop_assert!(check.is_subtype(&ba, &ab), "{} <: {}", ba, ab);
    }

    #[test]
    fn intersection_is_below_its_members(a in leaf_type(), b in leaf_type()) {
        let builder = core();
        let mut check = Check::new(&builder);
        let both = Type::intersection(vec![a.clone(), b.clone()]);
        prop_assert!(check.is_subtype(&both, &a), "{} <: {}", both, a);
        prop_assert!(check.is_subtype(&both, &b), "{} <: {}", both, b);
    }

    #[test]
    fn disjointness_is_symmetric(a in arb_type(), b in arb_type()) {
        let builder = core();
        let mut check = Check::new(&builder);
        prop_assert_eq!(check.disjoint(&a, &b), check.disjoint(&b, &a));
    }
}

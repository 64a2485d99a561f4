//! Narrowing, branches, loops, jumps, multiple assignment and exception
//! handling.

use std::sync::Arc;

use garnet_syntax::{sexp, Node, NodeKind, SyntaxTree};
use garnet_typeck::error::{TypeError, TypeErrorKind};
use garnet_typeck::sig::{DefinitionBuilder, EnvironmentBuilder};
use garnet_typeck::{check, Typing};

// ── Helpers ────────────────────────────────────────────────────────────

fn check_with(src: &str, env: EnvironmentBuilder) -> (SyntaxTree, Typing) {
    let env = env.build().expect("signatures build");
    let tree = sexp::read(src).expect("dump reads");
    let typing = check(&tree, &DefinitionBuilder::new(Arc::new(env)));
    (tree, typing)
}

fn check_source(src: &str) -> (SyntaxTree, Typing) {
    check_with(src, EnvironmentBuilder::with_core())
}

fn root_type(tree: &SyntaxTree, typing: &Typing) -> String {
    let root = tree.root_id().expect("tree has a root");
    typing.type_of(root).expect("root is typed").to_string()
}

fn type_at(typing: &Typing, node: Node<'_>) -> String {
    typing.type_of(node.id()).expect("node is typed").to_string()
}

/// Nodes of `kind`, in source order.
fn nodes_of(tree: &SyntaxTree, kind: NodeKind) -> Vec<Node<'_>> {
    let mut nodes: Vec<Node<'_>> = tree.ids().map(|id| tree.node(id)).filter(|n| n.is(kind)).collect();
    nodes.sort_by_key(|n| n.range().start());
    nodes
}

fn assert_no_errors(typing: &Typing) {
    assert!(!typing.has_errors(), "expected no errors, got: {:?}", typing.errors());
}

fn assert_has_error<F: Fn(&TypeError) -> bool>(typing: &Typing, pred: F, desc: &str) {
    assert!(
        typing.errors().iter().any(pred),
        "expected error matching `{}`, got errors: {:?}",
        desc,
        typing.errors()
    );
}

fn count_errors<F: Fn(&TypeError) -> bool>(typing: &Typing, pred: F) -> usize {
    typing.errors().iter().filter(|e| pred(e)).count()
}

// ── Narrowing ──────────────────────────────────────────────────────────

#[test]
fn is_a_narrows_both_branches() {
    let src = "(begin {@type var x: Integer | String} \
               (if (send (lvar :x) :is_a? (const nil :String)) (lvar :x) (lvar :x)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let lvars = nodes_of(&tree, NodeKind::Lvar);
    assert_eq!(type_at(&typing, lvars[0]), "::Integer | ::String");
    assert_eq!(type_at(&typing, lvars[1]), "::String");
    assert_eq!(type_at(&typing, lvars[2]), "::Integer");
    assert_eq!(root_type(&tree, &typing), "::String | ::Integer");
}

#[test]
fn truthiness_removes_nil() {
    let src = "(begin {@type var x: Integer?} \
               (if (lvar :x) (send (lvar :x) :+ (int 1)) (int 0)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");
}

#[test]
fn nil_check_narrows_else_branch() {
    let src = "(begin {@type var x: Integer?} \
               (if (send (lvar :x) :nil?) (int 0) (lvar :x)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let lvars = nodes_of(&tree, NodeKind::Lvar);
    assert_eq!(type_at(&typing, lvars[1]), "::Integer");
}

#[test]
fn and_narrows_right_operand() {
    let src = "(begin {@type var x: String?} \
               (and (lvar :x) (send (lvar :x) :upcase)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "nil | ::String");
}

#[test]
fn unreachable_branch_is_reported() {
    let src = "(begin {@type var x: Integer} \
               (if (send (lvar :x) :nil?) (int 1) (int 2)))";
    let (tree, typing) = check_source(src);
    assert_has_error(&typing, |e| matches!(e.kind, TypeErrorKind::UnreachableBranch), "UnreachableBranch");
    assert_eq!(root_type(&tree, &typing), "::Integer");
}

#[test]
fn assignment_in_one_branch_widens() {
    let src = "(begin (lvasgn :x (int 1)) \
               (if (send (lvar :x) :zero?) (lvasgn :x (str \"zero\")) nil) \
               (lvar :x))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::String | ::Integer");
}

#[test]
fn pure_call_narrows_until_receiver_changes() {
    let env = || EnvironmentBuilder::with_core().class("Box", |c| c.pure_method("value", "() -> Integer?"));
    let src = "(begin {@type var b: Box} \
               (if (send (lvar :b) :value) (send (send (lvar :b) :value) :+ (int 1)) (int 0)))";
    let (tree, typing) = check_with(src, env());
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");

    let src = "(begin {@type var b: Box} \
               (if (send (lvar :b) :value) \
                 (begin (lvasgn :b (send (const nil :Box) :new)) (send (send (lvar :b) :value) :+ (int 1))) \
                 (int 0)))";
    let (_, typing) = check_with(src, env());
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::NoMethod { method, .. } if method == "+"),
        "NoMethod + after reassignment",
    );
}

#[test]
fn skipped_or_assign_value_is_still_checked() {
    let src = "(begin {@type var x: Integer} (or_asgn (lvasgn :x) (send (int 1) :frobnicate)))";
    let (tree, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::NoMethod { method, .. } if method == "frobnicate"),
        "NoMethod frobnicate",
    );
    assert_eq!(root_type(&tree, &typing), "::Integer");
}

// ── case ───────────────────────────────────────────────────────────────

#[test]
fn exhaustive_case_has_no_nil() {
    let src = "(begin {@type var x: Integer | String} \
               (case (lvar :x) \
                 (when (const nil :Integer) (sym :int)) \
                 (when (const nil :String) (sym :str)) \
                 nil))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Symbol");
}

#[test]
fn non_exhaustive_case_adds_nil() {
    let src = "(begin {@type var x: Integer | String} \
               (case (lvar :x) \
                 (when (const nil :Integer) (lvar :x)) \
                 nil))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer | nil");
}

#[test]
fn else_on_exhaustive_case() {
    let src = "(begin {@type var x: Integer | String} \
               (case (lvar :x) \
                 (when (const nil :Integer) (sym :int)) \
                 (when (const nil :String) (sym :str)) \
                 (str \"never\")))";
    let (tree, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::ElseOnExhaustiveCase { .. }),
        "ElseOnExhaustiveCase",
    );
    assert_eq!(root_type(&tree, &typing), "::Symbol");
}

#[test]
fn case_on_literals() {
    let src = "(begin {@type var x: :a | :b} \
               (case (lvar :x) \
                 (when (sym :a) (int 1)) \
                 (when (sym :b) (int 2)) \
                 nil))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");
}

#[test]
fn when_without_body_is_nil() {
    let src = "(begin {@type var x: Integer?} (case (lvar :x) (when (const nil :Integer)) (int 0)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let test = nodes_of(&tree, NodeKind::Const)[0];
    assert_eq!(type_at(&typing, test), "singleton(::Integer)");
    assert_eq!(root_type(&tree, &typing), "nil | ::Integer");
}

// ── Loops and jumps ────────────────────────────────────────────────────

#[test]
fn while_loop_keeps_local_type() {
    let src = "(begin (lvasgn :x (int 0)) \
               (while (send (lvar :x) :< (int 10)) (lvasgn :x (send (lvar :x) :+ (int 1)))) \
               (lvar :x))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");
    let loop_node = nodes_of(&tree, NodeKind::While)[0];
    assert_eq!(type_at(&typing, loop_node), "nil");
}

#[test]
fn annotated_break_type() {
    let src = "(while (true) {@type break: Integer} (break (int 1)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "nil | ::Integer");
}

#[test]
fn break_value_must_match_loop() {
    let (_, typing) = check_source("(while (true) (break (int 1)))");
    assert_eq!(
        count_errors(&typing, |e| matches!(e.kind, TypeErrorKind::BreakTypeMismatch { .. })),
        1,
        "{:?}",
        typing.errors()
    );
}

#[test]
fn next_value_in_loop() {
    let (_, typing) = check_source("(while (true) (next (int 1)))");
    assert_has_error(&typing, |e| matches!(e.kind, TypeErrorKind::UnexpectedJumpValue), "UnexpectedJumpValue");
}

#[test]
fn jumps_outside_their_construct() {
    for src in ["(break)", "(next)", "(retry)", "(redo)"] {
        let (_, typing) = check_source(src);
        assert_has_error(&typing, |e| matches!(e.kind, TypeErrorKind::UnexpectedJump), src);
    }
}

#[test]
fn for_loop_binds_elements() {
    let src = "(for (lvasgn :i) (array (int 1) (int 2)) (send (lvar :i) :to_s))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let i = nodes_of(&tree, NodeKind::Lvar)[0];
    assert_eq!(type_at(&typing, i), "::Integer");
    assert_eq!(root_type(&tree, &typing), "::Array[::Integer]");
}

// ── Multiple assignment ────────────────────────────────────────────────

#[test]
fn masgn_from_literal_array() {
    let src = "(begin (masgn (mlhs (lvasgn :a) (lvasgn :b)) (array (int 1) (str \"s\"))) (lvar :b))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::String");
}

#[test]
fn masgn_with_splat() {
    let src = "(begin \
               (masgn (mlhs (lvasgn :a) (splat (lvasgn :rest))) (array (int 1) (str \"s\") (sym :t))) \
               (lvar :rest))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Array[::String | ::Symbol]");
}

#[test]
fn masgn_missing_targets_are_nil() {
    let src = "(begin (masgn (mlhs (lvasgn :a) (lvasgn :b) (lvasgn :c)) (array (int 1) (int 2))) (lvar :c))";
    let (tree, typing) = check_source(src);
    assert_eq!(root_type(&tree, &typing), "nil");
}

#[test]
fn masgn_from_array_value() {
    let src = "(begin {@type var xs: Array[Integer]} \
               (masgn (mlhs (lvasgn :a) (lvasgn :b)) (lvar :xs)) \
               (lvar :a))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer | nil");
}

// ── rescue / ensure ────────────────────────────────────────────────────

#[test]
fn rescue_binds_the_exception() {
    let src = "(rescue (send nil :raise (str \"boom\")) \
               (resbody (array (const nil :ArgumentError)) (lvasgn :e) (lvar :e)) \
               nil)";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let e = nodes_of(&tree, NodeKind::Lvar)[0];
    assert_eq!(type_at(&typing, e), "::ArgumentError");
    assert_eq!(root_type(&tree, &typing), "::ArgumentError");
}

#[test]
fn bare_rescue_catches_standard_error() {
    let src = "(rescue (int 1) (resbody nil (lvasgn :e) (lvar :e)) nil)";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let e = nodes_of(&tree, NodeKind::Lvar)[0];
    assert_eq!(type_at(&typing, e), "::StandardError");
    assert_eq!(root_type(&tree, &typing), "::Integer | ::StandardError");
}

#[test]
fn retry_inside_rescue() {
    let src = "(rescue (int 1) (resbody nil nil (retry)) nil)";
    let (_, typing) = check_source(src);
    assert_no_errors(&typing);
}

#[test]
fn ensure_keeps_body_value() {
    let (tree, typing) = check_source("(ensure (int 1) (str \"cleanup\"))");
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");
}

// ── Assertions ─────────────────────────────────────────────────────────

#[test]
fn assertion_narrows_and_detects_contradictions() {
    let (tree, typing) = check_source("(begin {@type var x: Integer?} (assertion (lvar :x) \"Integer\"))");
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");

    let (_, typing) = check_source("(assertion (str \"x\") \"Integer\")");
    assert_has_error(&typing, |e| matches!(e.kind, TypeErrorKind::FalseAssertion { .. }), "FalseAssertion");
}

//! End-to-end checks of whole programs against small signature sets.
//!
//! Programs are written as the parser's s-expression dump; each test
//! builds its own environment on top of the core classes.

use std::sync::Arc;

use garnet_syntax::{sexp, Node, NodeKind, SyntaxTree};
use garnet_typeck::error::{TypeError, TypeErrorKind};
use garnet_typeck::sig::{DefinitionBuilder, EnvironmentBuilder};
use garnet_typeck::{check, check_with_options, CheckOptions, MethodCall, Typing};
use rowan::TextSize;

// ── Helpers ────────────────────────────────────────────────────────────

fn builder(env: EnvironmentBuilder) -> DefinitionBuilder {
    DefinitionBuilder::new(Arc::new(env.build().expect("signatures build")))
}

/// Read a dump and check it against `env`.
fn check_with(src: &str, env: EnvironmentBuilder) -> (SyntaxTree, Typing) {
    let tree = sexp::read(src).expect("dump reads");
    let typing = check(&tree, &builder(env));
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

/// Nodes of `kind`, in allocation order.
fn nodes_of(tree: &SyntaxTree, kind: NodeKind) -> Vec<Node<'_>> {
    tree.ids().map(|id| tree.node(id)).filter(|n| n.is(kind)).collect()
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

// ── Calls ──────────────────────────────────────────────────────────────

#[test]
fn declared_method_call() {
    let env = EnvironmentBuilder::with_core().class("C", |c| c.method("foo", "(String) -> Integer"));
    let (tree, typing) = check_with("(send (send (const nil :C) :new) :foo (str \"2\"))", env);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");

    let root = tree.root().unwrap();
    match typing.call_of(root.id()) {
        Some(MethodCall::Typed { method, return_type, .. }) => {
            assert_eq!(method, "foo");
            assert_eq!(return_type.to_string(), "::Integer");
        }
        other => panic!("expected a typed call, got {:?}", other),
    }
}

#[test]
fn new_returns_an_instance() {
    let env = EnvironmentBuilder::with_core().class("C", |c| c);
    let (tree, typing) = check_with("(send (const nil :C) :new)", env);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::C");
}

#[test]
fn argument_type_mismatch() {
    let env = EnvironmentBuilder::with_core().class("C", |c| c.method("foo", "(String) -> Integer"));
    let (_, typing) = check_with("(send (send (const nil :C) :new) :foo (int 1))", env);
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::ArgumentTypeMismatch { expected, .. } if expected.to_string() == "::String"),
        "ArgumentTypeMismatch expecting ::String",
    );
}

#[test]
fn ambiguous_overloads_are_unresolved() {
    let (tree, typing) = check_source("(send (int 1) :+ (str \"2\"))");
    assert_eq!(typing.errors().len(), 1, "{:?}", typing.errors());
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::UnresolvedOverloading { method, .. } if method == "+"),
        "UnresolvedOverloading on +",
    );
    assert_eq!(root_type(&tree, &typing), "::Integer | ::Float");
}

#[test]
fn overload_picked_by_argument() {
    let (tree, typing) = check_source("(send (int 1) :+ (float 2.5))");
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Float");
}

#[test]
fn missing_method() {
    let (tree, typing) = check_source("(send (int 1) :frobnicate)");
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::NoMethod { method, .. } if method == "frobnicate"),
        "NoMethod frobnicate",
    );
    assert_eq!(root_type(&tree, &typing), "untyped");
}

#[test]
fn arity_errors() {
    let env = EnvironmentBuilder::with_core().class("C", |c| c.method("foo", "(String) -> Integer"));
    let (_, typing) = check_with("(send (send (const nil :C) :new) :foo)", env.clone());
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::InsufficientPositionalArguments { .. }),
        "InsufficientPositionalArguments",
    );

    let (_, typing) = check_with("(send (send (const nil :C) :new) :foo (str \"a\") (str \"b\"))", env);
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::UnexpectedPositionalArgument { .. }),
        "UnexpectedPositionalArgument",
    );
}

#[test]
fn generic_method_unions_lower_bounds() {
    let env = EnvironmentBuilder::with_core().class("Object", |c| c.method("foo", "[A] (A, A) -> A"));
    let (tree, typing) = check_with("(send nil :foo (int 1) (str \"\"))", env);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer | ::String");
}

#[test]
fn untyped_receiver_is_not_checked() {
    let src = "(begin {@type var x: untyped} (send (lvar :x) :anything (int 1)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "untyped");
    let send = nodes_of(&tree, NodeKind::Send)[0];
    assert!(matches!(typing.call_of(send.id()), Some(MethodCall::Untyped { .. })));
}

#[test]
fn union_receiver_needs_the_method_on_every_member() {
    let src = "(begin {@type var x: Integer | String} (send (lvar :x) :upcase))";
    let (_, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::NoMethod { method, .. } if method == "upcase"),
        "NoMethod upcase on the union",
    );

    let src = "(begin {@type var x: Integer | String} (send (lvar :x) :to_s))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::String");
}

#[test]
fn safe_navigation_keeps_nil() {
    let src = "(begin {@type var x: String?} (csend (lvar :x) :upcase))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::String | nil");
}

#[test]
fn diverging_receiver_has_no_methods() {
    let (tree, typing) = check_source("(send (send nil :raise (str \"x\")) :foo (int 1))");
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::NoMethod { method, .. } if method == "foo"),
        "NoMethod foo",
    );
    let root = tree.root().unwrap();
    assert!(matches!(typing.call_of(root.id()), Some(MethodCall::NoMethodError { .. })));
    assert_eq!(root_type(&tree, &typing), "bot");
    let arg = nodes_of(&tree, NodeKind::Int)[0];
    assert_eq!(type_at(&typing, arg), "::Integer");
}

// ── Splats ─────────────────────────────────────────────────────────────

fn splat_env() -> EnvironmentBuilder {
    EnvironmentBuilder::with_core().class("Object", |c| {
        c.method("none", "() -> Integer")
            .method("two", "(Integer, String) -> Integer")
            .method("rest", "(Integer, *String) -> Integer")
    })
}

#[test]
fn splat_into_method_without_positionals() {
    let src = "(begin {@type var a: Array[Integer]} (send nil :none (splat (lvar :a))))";
    let (_, typing) = check_with(src, splat_env());
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::UnexpectedPositionalArgument { .. }),
        "UnexpectedPositionalArgument",
    );
}

#[test]
fn tuple_splat_fills_positionals_in_order() {
    let src = "(begin {@type var t: [Integer, String]} (send nil :two (splat (lvar :t))))";
    let (tree, typing) = check_with(src, splat_env());
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");

    let src = "(begin {@type var t: [String, Integer]} (send nil :two (splat (lvar :t))))";
    let (_, typing) = check_with(src, splat_env());
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::ArgumentTypeMismatch { .. }),
        "ArgumentTypeMismatch",
    );
}

#[test]
fn array_splat_covers_the_rest_parameter() {
    let src = "(begin {@type var a: Array[String]} (send nil :rest (int 1) (splat (lvar :a))))";
    let (tree, typing) = check_with(src, splat_env());
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");

    let src = "(begin {@type var a: Array[Integer]} (send nil :rest (int 1) (splat (lvar :a))))";
    let (_, typing) = check_with(src, splat_env());
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::ArgumentTypeMismatch { expected, .. } if expected.to_string() == "::String"),
        "ArgumentTypeMismatch expecting ::String",
    );
}

// ── Type arguments ─────────────────────────────────────────────────────

fn generic_env() -> EnvironmentBuilder {
    EnvironmentBuilder::with_core().class("Box", |c| {
        c.method("wrap", "[A] (A) -> Array[A]")
            .method("pair", "[A, B] (A, B) -> [A, B]")
            .method("num", "[N < Numeric] (N) -> N")
    })
}

const BOX: &str = "(send (const nil :Box) :new)";

#[test]
fn explicit_type_arguments() {
    let src = format!("(type_app (send {} :wrap (int 1)) \"Integer\")", BOX);
    let (tree, typing) = check_with(&src, generic_env());
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Array[::Integer]");

    let src = format!("(type_app (send {} :wrap (int 1)) \"String\")", BOX);
    let (tree, typing) = check_with(&src, generic_env());
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::ArgumentTypeMismatch { expected, .. } if expected.to_string() == "::String"),
        "ArgumentTypeMismatch expecting ::String",
    );
    assert_eq!(root_type(&tree, &typing), "::Array[::String]");
}

#[test]
fn type_argument_count_is_checked() {
    let src = format!("(type_app (send {} :pair (int 1) (str \"s\")) \"Integer\")", BOX);
    let (_, typing) = check_with(&src, generic_env());
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::InsufficientTypeArgument { given: 1, .. }),
        "InsufficientTypeArgument",
    );

    let src = format!("(type_app (send {} :wrap (int 1)) \"Integer, String\")", BOX);
    let (_, typing) = check_with(&src, generic_env());
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::UnexpectedTypeArgument { type_arg, .. } if type_arg.to_string() == "::String"),
        "UnexpectedTypeArgument ::String",
    );
}

#[test]
fn bounded_type_parameter() {
    let src = format!("(send {} :num (int 1))", BOX);
    let (tree, typing) = check_with(&src, generic_env());
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");

    let src = format!("(send {} :num (str \"s\"))", BOX);
    let (_, typing) = check_with(&src, generic_env());
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::UnsatisfiableConstraint { .. }),
        "UnsatisfiableConstraint",
    );

    let src = format!("(type_app (send {} :num (str \"s\")) \"String\")", BOX);
    let (_, typing) = check_with(&src, generic_env());
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::TypeArgumentMismatchError { .. }),
        "TypeArgumentMismatchError",
    );
}

// ── Blocks ─────────────────────────────────────────────────────────────

#[test]
fn block_return_type_flows_into_generic() {
    let src = "(block (send (array (int 1) (int 2)) :map) (args (arg :x)) (send (lvar :x) :to_s))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Array[::String]");
    let x = nodes_of(&tree, NodeKind::Lvar)[0];
    assert_eq!(type_at(&typing, x), "::Integer");
}

#[test]
fn block_given_to_blockless_method() {
    let src = "(block (send (int 1) :to_s) (args) (nil))";
    let (_, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::UnexpectedBlockGiven { .. }),
        "UnexpectedBlockGiven",
    );
}

// ── Assignments and annotations ────────────────────────────────────────

#[test]
fn declared_local_rejects_incompatible_value() {
    let (tree, typing) = check_source("(begin {@type var x: Integer?} (lvasgn :x (str \"x\")))");
    assert_eq!(typing.errors().len(), 1, "{:?}", typing.errors());
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::IncompatibleAssignment { .. }),
        "IncompatibleAssignment",
    );
    let asgn = nodes_of(&tree, NodeKind::Lvasgn)[0];
    assert_eq!(type_at(&typing, asgn), "::Integer | nil");
}

#[test]
fn local_takes_the_assigned_type() {
    let (tree, typing) = check_source("(begin (lvasgn :x (int 1)) (lvar :x))");
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");
}

#[test]
fn empty_collections_need_an_annotation() {
    let (_, typing) = check_source("(lvasgn :a (array))");
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::UnannotatedEmptyCollection),
        "UnannotatedEmptyCollection",
    );

    let (tree, typing) = check_source("(begin {@type var a: Array[Integer]} (lvasgn :a (array)))");
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Array[::Integer]");
}

#[test]
fn record_access_by_literal_key() {
    let src = "(begin {@type var r: { name: String }} (send (lvar :r) :[] (sym :name)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::String");

    let src = "(begin {@type var r: { name: String }} (send (lvar :r) :[] (sym :age)))";
    let (_, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::UnknownRecordKey { key } if key == ":age"),
        "UnknownRecordKey :age",
    );
}

#[test]
fn tuple_index_out_of_range_is_nil() {
    let src = "(begin {@type var t: [Integer, String]} (send (lvar :t) :[] (int -1)))";
    let (tree, typing) = check_source(src);
    assert_eq!(root_type(&tree, &typing), "::String");

    let src = "(begin {@type var t: [Integer, String]} (send (lvar :t) :[] (int 5)))";
    let (tree, typing) = check_source(src);
    assert_eq!(root_type(&tree, &typing), "nil");
}

#[test]
fn unknown_constant() {
    let (tree, typing) = check_source("(const nil :Nope)");
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::UnknownConstant { name } if name == "Nope"),
        "UnknownConstant Nope",
    );
    assert_eq!(root_type(&tree, &typing), "untyped");
}

#[test]
fn unknown_global() {
    let (_, typing) = check_source("(gvar :$nope)");
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::UnknownGlobalVariable { .. }),
        "UnknownGlobalVariable",
    );

    let env = EnvironmentBuilder::with_core().global("$count", "Integer");
    let (tree, typing) = check_with("(gvar :$count)", env);
    assert_no_errors(&typing);
    assert_eq!(root_type(&tree, &typing), "::Integer");
}

#[test]
fn every_reachable_node_is_typed() {
    let src = "(begin (lvasgn :x (int 1)) (if (send (lvar :x) :zero?) (str \"a\") (sym :b)))";
    let (tree, typing) = check_source(src);
    for id in tree.reachable() {
        assert!(typing.type_of(id).is_some(), "untyped node {:?}", tree.node(id).kind());
    }
}

#[test]
fn checking_twice_gives_the_same_typing() {
    let src = "(begin {@type var x: Integer | String} \
               (lvasgn :y (block (send (array (int 1)) :map) (args (arg :n)) (send (lvar :n) :to_s))) \
               (if (send (lvar :x) :is_a? (const nil :String)) (send (lvar :x) :upcase) (send (lvar :x) :frobnicate)) \
               (send (int 1) :+ (str \"2\")))";
    let tree = sexp::read(src).expect("dump reads");
    let defs = builder(EnvironmentBuilder::with_core());
    let first = check(&tree, &defs);
    let second = check(&tree, &defs);
    assert!(first.has_errors());
    assert_eq!(first.errors(), second.errors());
    for id in tree.reachable() {
        let a = first.type_of(id).map(|t| t.to_string());
        let b = second.type_of(id).map(|t| t.to_string());
        assert_eq!(a, b, "node {:?}", tree.node(id).kind());
    }
}

#[test]
fn cursor_sees_the_locals_in_scope() {
    let src = "(begin (lvasgn :x (int 1)) (lvasgn :y (str \"s\")) (send (lvar :y) :upcase))";
    let tree = sexp::read(src).expect("dump reads");
    let defs = builder(EnvironmentBuilder::with_core());

    let at_y = src.rfind("(lvar :y)").unwrap() + 1;
    let options = CheckOptions {
        cursor: Some(TextSize::from(at_y as u32)),
    };
    let typing = check_with_options(&tree, &defs, &options);
    let ctx = typing.cursor_context().expect("context at the cursor");
    assert_eq!(ctx.type_env.lookup("x").map(|t| t.to_string()).as_deref(), Some("::Integer"));
    assert_eq!(ctx.type_env.lookup("y").map(|t| t.to_string()).as_deref(), Some("::String"));

    let in_rhs = src.find("(int 1)").unwrap() + 1;
    let options = CheckOptions {
        cursor: Some(TextSize::from(in_rhs as u32)),
    };
    let typing = check_with_options(&tree, &defs, &options);
    let ctx = typing.cursor_context().expect("context at the cursor");
    assert!(ctx.type_env.lookup("x").is_none());

    assert!(check(&tree, &defs).cursor_context().is_none());
}

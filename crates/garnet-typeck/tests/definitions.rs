//! Method bodies checked against their declarations, and class and module
//! statements checked against the signature environment.

use std::sync::Arc;

use garnet_syntax::{sexp, Node, NodeKind, SyntaxTree};
use garnet_typeck::error::{TypeError, TypeErrorKind};
use garnet_typeck::sig::{DefinitionBuilder, EnvironmentBuilder};
use garnet_typeck::{check, Typing};

// ── Helpers ────────────────────────────────────────────────────────────

fn signatures() -> EnvironmentBuilder {
    EnvironmentBuilder::with_core()
        .class("Person", |c| {
            c.method("name", "() -> String")
                .method("age=", "(Integer) -> Integer")
                .ivar("@name", "String")
                .singleton_method("build", "() -> Person")
        })
        .class("Child", |c| c.superclass("Person").method("name", "() -> String"))
        .class("Calc", |c| {
            c.method("double", "(Integer) -> Integer")
                .method("each_item", "() { (Integer) -> void } -> void")
                .method("scale", "(Integer) -> Integer | (Float) -> Float")
        })
        .class("Base", |c| {
            c.method("label", "(String) -> String")
                .method("tag", "(String) -> String")
        })
        .class("Derived", |c| {
            c.superclass("Base")
                .method("label", "() -> String | (Integer, Integer) -> String")
                .method("tag", "(Integer) -> String")
        })
        .module("Greeter", |m| m.method("greet", "() -> String"))
}

fn check_source(src: &str) -> (SyntaxTree, Typing) {
    let env = signatures().build().expect("signatures build");
    let tree = sexp::read(src).expect("dump reads");
    let typing = check(&tree, &DefinitionBuilder::new(Arc::new(env)));
    (tree, typing)
}

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

/// Wrap method definitions in `class Person`.
fn in_person(body: &str) -> String {
    format!("(class (const nil :Person) nil {})", body)
}

// ── Method bodies ──────────────────────────────────────────────────────

#[test]
fn body_matching_declaration() {
    let (tree, typing) = check_source(&in_person("(def :name (args) (ivar :@name))"));
    assert_no_errors(&typing);
    let def = nodes_of(&tree, NodeKind::Def)[0];
    assert_eq!(typing.type_of(def.id()).unwrap().to_string(), "::Symbol");
}

#[test]
fn body_type_mismatch() {
    let (_, typing) = check_source(&in_person("(def :name (args) (int 1))"));
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::MethodBodyTypeMismatch { method, .. } if method == "name"),
        "MethodBodyTypeMismatch for name",
    );
}

#[test]
fn setter_body_mismatch() {
    let (_, typing) = check_source(&in_person("(def :age= (args (arg :value)) (str \"old\"))"));
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::SetterBodyTypeMismatch { method, .. } if method == "age="),
        "SetterBodyTypeMismatch for age=",
    );
}

#[test]
fn parameters_take_declared_types() {
    let src = "(class (const nil :Calc) nil (def :double (args (arg :x)) (send (lvar :x) :* (int 2))))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let x = nodes_of(&tree, NodeKind::Lvar)[0];
    assert_eq!(typing.type_of(x.id()).unwrap().to_string(), "::Integer");
}

#[test]
fn overloaded_declaration_is_merged() {
    let src = "(class (const nil :Calc) nil (def :scale (args (arg :x)) (lvar :x)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let x = nodes_of(&tree, NodeKind::Lvar)[0];
    assert_eq!(typing.type_of(x.id()).unwrap().to_string(), "::Integer | ::Float");
}

#[test]
fn parameter_arity_mismatch() {
    let (_, typing) = check_source(&in_person("(def :name (args (arg :extra)) (ivar :@name))"));
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::MethodArityMismatch { .. }),
        "MethodArityMismatch",
    );
}

#[test]
fn return_checked_against_declaration() {
    let (_, typing) = check_source(&in_person("(def :name (args) (return (int 1)))"));
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::ReturnTypeMismatch { .. }),
        "ReturnTypeMismatch",
    );
    assert!(!typing
        .errors()
        .iter()
        .any(|e| matches!(e.kind, TypeErrorKind::MethodBodyTypeMismatch { .. })));
}

#[test]
fn return_annotation_must_fit_declaration() {
    let (_, typing) = check_source(&in_person("(def :name (args) {@type return: Integer} (int 1))"));
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::MethodReturnTypeAnnotationMismatch { .. }),
        "MethodReturnTypeAnnotationMismatch",
    );
}

#[test]
fn unknown_instance_variable_in_declared_class() {
    let (_, typing) = check_source(&in_person("(def :name (args) (send (ivar :@nope) :to_s))"));
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::UnknownInstanceVariable { name } if name == "@nope"),
        "UnknownInstanceVariable @nope",
    );
}

#[test]
fn undeclared_method_definition() {
    let (_, typing) = check_source(&in_person("(def :nope (args) nil)"));
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::UndeclaredMethodDefinition { method, .. } if method == "nope"),
        "UndeclaredMethodDefinition nope",
    );
}

#[test]
fn definition_in_undeclared_class() {
    let (_, typing) = check_source("(class (const nil :Ghost) nil (def :boo (args) nil))");
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::MethodDefinitionInUndeclaredModule { module, .. } if module == "Ghost"),
        "MethodDefinitionInUndeclaredModule Ghost",
    );
}

#[test]
fn toplevel_definition_is_untyped() {
    let (tree, typing) = check_source("(def :helper (args (arg :x)) (send (lvar :x) :whatever))");
    assert_no_errors(&typing);
    let x = nodes_of(&tree, NodeKind::Lvar)[0];
    assert_eq!(typing.type_of(x.id()).unwrap().to_string(), "untyped");
}

// ── Singleton methods ──────────────────────────────────────────────────

#[test]
fn def_self_checks_singleton_declaration() {
    let src = in_person("(defs (self) :build (args) (send (const nil :Person) :new))");
    let (_, typing) = check_source(&src);
    assert_no_errors(&typing);
}

#[test]
fn singleton_class_body() {
    let src = in_person("(sclass (self) (def :build (args) (send (self) :new)))");
    let (_, typing) = check_source(&src);
    assert_no_errors(&typing);

    let src = in_person("(sclass (self) (def :build (args) (int 1)))");
    let (_, typing) = check_source(&src);
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::MethodBodyTypeMismatch { .. }),
        "MethodBodyTypeMismatch in class << self",
    );
}

// ── Classes and modules ────────────────────────────────────────────────

#[test]
fn class_module_mismatch() {
    let (_, typing) = check_source("(module (const nil :Person) nil)");
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::ClassModuleMismatch { name } if name == "Person"),
        "ClassModuleMismatch Person",
    );
    let (_, typing) = check_source("(module (const nil :Greeter) (def :greet (args) (str \"hi\")))");
    assert_no_errors(&typing);
}

#[test]
fn implements_lists_missing_methods() {
    let src = "(class (const nil :Person) nil {@implements Person} (def :name (args) (ivar :@name)))";
    let (_, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| {
            matches!(&e.kind, TypeErrorKind::MethodDefinitionMissing { missing, .. }
                if missing == &vec!["age=".to_string(), "self.build".to_string()])
        },
        "MethodDefinitionMissing [age=, self.build]",
    );
}

#[test]
fn dynamic_methods() {
    let src = "(class (const nil :Person) nil {@dynamic name} (send nil :name))";
    let (_, typing) = check_source(src);
    assert_no_errors(&typing);

    let src = "(class (const nil :Person) nil {@dynamic bogus} nil)";
    let (_, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::UnexpectedDynamicMethod { method, .. } if method == "bogus"),
        "UnexpectedDynamicMethod bogus",
    );
}

// ── super and yield ────────────────────────────────────────────────────

#[test]
fn zsuper_calls_the_superclass_method() {
    let src = "(class (const nil :Child) (const nil :Person) (def :name (args) (zsuper)))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let call = nodes_of(&tree, NodeKind::Zsuper)[0];
    assert_eq!(typing.type_of(call.id()).unwrap().to_string(), "::String");
}

#[test]
fn super_from_unmerged_overloads_is_unchecked() {
    let src = "(class (const nil :Derived) (const nil :Base) (def :label (args) (super (int 1))))";
    let (tree, typing) = check_source(src);
    assert_no_errors(&typing);
    let call = nodes_of(&tree, NodeKind::Super)[0];
    assert_eq!(typing.type_of(call.id()).unwrap().to_string(), "untyped");

    let src = "(class (const nil :Derived) (const nil :Base) (def :tag (args (arg :n)) (super (int 1))))";
    let (_, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(&e.kind, TypeErrorKind::ArgumentTypeMismatch { expected, .. } if expected.to_string() == "::String"),
        "ArgumentTypeMismatch expecting ::String",
    );
}

#[test]
fn super_outside_a_method() {
    let (_, typing) = check_source("(zsuper)");
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::UnexpectedSuper { method: None }),
        "UnexpectedSuper outside a method",
    );
}

#[test]
fn yield_checks_against_block_type() {
    let src = "(class (const nil :Calc) nil (def :each_item (args) (yield (int 1))))";
    let (_, typing) = check_source(src);
    assert_no_errors(&typing);

    let src = "(class (const nil :Calc) nil (def :each_item (args) (yield (str \"one\"))))";
    let (_, typing) = check_source(src);
    assert_has_error(
        &typing,
        |e| matches!(e.kind, TypeErrorKind::ArgumentTypeMismatch { .. }),
        "ArgumentTypeMismatch on yield",
    );
}

#[test]
fn yield_without_block() {
    let (_, typing) = check_source("(yield)");
    assert_has_error(&typing, |e| matches!(e.kind, TypeErrorKind::UnexpectedYield), "UnexpectedYield");

    let (_, typing) = check_source(&in_person("(def :name (args) (begin (yield) (ivar :@name)))"));
    assert_has_error(&typing, |e| matches!(e.kind, TypeErrorKind::UnexpectedYield), "UnexpectedYield in blockless method");
}

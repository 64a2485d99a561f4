//! Reading parser dumps into syntax trees.
//!
//! Trees are pinned as indented outlines: one node kind per line, atoms
//! and annotations nested beneath their node.

use std::fmt::Write;

use garnet_common::error::ReadErrorKind;
use garnet_syntax::{sexp, Child, Node, NodeKind, SyntaxTree};
use rowan::TextSize;

// ── Helpers ────────────────────────────────────────────────────────────

fn outline(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    if let Some(root) = tree.root() {
        write_node(root, 0, &mut out);
    }
    out.trim_end().to_string()
}

fn write_node(node: Node<'_>, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth + 1);
    writeln!(out, "{}{}", "  ".repeat(depth), node.kind().name()).unwrap();
    for a in node.annotations() {
        writeln!(out, "{}# {:?}", pad, a.kind).unwrap();
    }
    for child in node.children() {
        match child {
            Child::Node(id) => write_node(node.tree().node(*id), depth + 1, out),
            Child::Symbol(s) => writeln!(out, "{}:{}", pad, s).unwrap(),
            Child::Int(i) => writeln!(out, "{}{}", pad, i).unwrap(),
            Child::Float(f) => writeln!(out, "{}{}", pad, f).unwrap(),
            Child::Str(s) => writeln!(out, "{}{:?}", pad, s).unwrap(),
            Child::Nil => writeln!(out, "{}nil", pad).unwrap(),
        }
    }
}

fn read_outline(src: &str) -> String {
    outline(&sexp::read(src).expect("dump reads"))
}

fn read_error(src: &str) -> ReadErrorKind {
    sexp::read(src).expect_err("dump should not read").kind
}

// ── Trees ──────────────────────────────────────────────────────────────

#[test]
fn annotated_program() {
    let src = r#"(begin {@type var x: Integer?}
                   (lvasgn :x (str "x"))
                   (send nil :puts (lvar :x)))"#;
    insta::assert_snapshot!(read_outline(src), @r#"
    begin
      # VarType { name: "x", ty: "Integer?" }
      lvasgn
        :x
        str
          "x"
      send
        nil
        :puts
        lvar
          :x
    "#);
}

#[test]
fn class_with_method() {
    let src = "(class (const nil :Person) (const nil :Base) \
               {@implements Person} {@dynamic name, age} \
               (def :greet (args (arg :other) (optarg :loud (false))) (nil)))";
    insta::assert_snapshot!(read_outline(src), @r#"
    class
      # Implements("Person")
      # Dynamic(["name", "age"])
      const
        nil
        :Person
      const
        nil
        :Base
      def
        :greet
        args
          arg
            :other
          optarg
            :loud
            false
        nil
    "#);
}

#[test]
fn literals_and_escapes() {
    let src = r#"(array (int -3) (int 1_000) (float 2.5) (str "a\"b\n") (sym :"odd sym") (sym :[]=))"#;
    insta::assert_snapshot!(read_outline(src), @r#"
    array
      int
        -3
      int
        1000
      float
        2.5
      str
        "a\"b\n"
      sym
        :odd sym
      sym
        :[]=
    "#);
}

#[test]
fn comments_and_whitespace_are_skipped() {
    let src = "; leading comment\n(send ; the receiver\n  (self) :freeze)\n";
    insta::assert_snapshot!(read_outline(src), @r"
    send
      self
      :freeze
    ");
}

// ── Ranges and navigation ──────────────────────────────────────────────

#[test]
fn ranges_cover_the_dump_text() {
    let src = "(send (int 1) :+ (int 2))";
    let tree = sexp::read(src).unwrap();
    let root = tree.root().unwrap();
    assert_eq!(&src[root.range()], src);
    let rhs = root.child(2).unwrap();
    assert_eq!(&src[rhs.range()], "(int 2)");
    assert_eq!(rhs.parent().map(|p| p.id()), Some(root.id()));
}

#[test]
fn node_at_finds_the_innermost_node() {
    let src = "(send (int 1) :+ (int 2))";
    let tree = sexp::read(src).unwrap();
    let offset = src.find("2").unwrap();
    let id = tree.node_at(TextSize::from(offset as u32)).unwrap();
    assert!(tree.node(id).is(NodeKind::Int));
    assert_eq!(tree.node(id).int(0), Some(2));
}

#[test]
fn every_node_is_reachable_from_the_root() {
    let tree = sexp::read("(if (true) (begin (int 1) (int 2)) nil)").unwrap();
    assert_eq!(tree.reachable().len(), tree.len());
}

#[test]
fn empty_input_has_no_root() {
    let tree = sexp::read("  ; nothing here\n").unwrap();
    assert!(tree.root().is_none());
    assert!(tree.is_empty());
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn malformed_dumps_are_rejected() {
    assert_eq!(read_error("(frob 1)"), ReadErrorKind::UnknownNodeKind("frob".into()));
    assert_eq!(read_error("(send nil :foo"), ReadErrorKind::UnexpectedEof);
    assert_eq!(read_error("(nil) (nil)"), ReadErrorKind::TrailingInput);
    assert_eq!(read_error(r#"(str "\q")"#), ReadErrorKind::InvalidEscapeSequence('q'));
    assert_eq!(read_error("(int 1x)"), ReadErrorKind::InvalidNumberLiteral("1x".into()));
    assert!(matches!(
        read_error("(begin {@type weird: T} (nil))"),
        ReadErrorKind::InvalidAnnotation(_)
    ));
}

#[test]
fn error_range_points_at_the_bad_text() {
    let src = "(send (frob) :x)";
    let err = sexp::read(src).unwrap_err();
    assert_eq!(&src[err.range], "frob");
}

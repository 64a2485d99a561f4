//! The syntax tree consumed by the Garnet type checker.
//!
//! Parsing the host language is not this crate's job: trees arrive either
//! built directly through [`SyntaxTree::alloc`] or read from the parser's
//! s-expression dump with [`sexp::read`]. Comment annotations
//! (`# @type var x: T`, ...) arrive pre-attached to nodes.

pub mod annotation;
pub mod kind;
pub mod sexp;
pub mod tree;

pub use annotation::{Annotation, AnnotationKind};
pub use kind::NodeKind;
pub use tree::{Child, Node, NodeId, SyntaxTree};

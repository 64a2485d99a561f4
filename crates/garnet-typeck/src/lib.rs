//! Garnet type checker: gradual typing for a dynamic object language.
//!
//! Types come from separately declared signatures; the program text itself
//! is unannotated apart from comment annotations. The checker walks a
//! syntax tree, assigns a type to every node, and collects type errors.
//! `untyped` is compatible in both directions, so unannotated code checks
//! without noise while declared code is held to its signatures.
//!
//! # Architecture
//!
//! - [`ty`]: the type language (`Type`, literals, records, procs)
//! - [`parse`]: the type and method-type syntax
//! - [`method_type`]: parameter lists, blocks and overloads
//! - [`sig`]: the signature environment and method-table builder
//! - [`subst`]: substitutions over type variables and `self`
//! - [`subtyping`]: the relation checker, with traces for errors
//! - [`constraints`]: bounds on generic variables and their solution
//! - [`shape`]: method lookup on arbitrary receiver types
//! - [`type_env`] / [`context`]: what is known at a program point
//! - [`logic`]: narrowing for conditions
//! - [`construction`]: the tree walk that synthesizes and checks types
//! - [`typing`] / [`method_call`]: the per-file result
//! - [`error`] / [`diagnostics`] / [`config`]: errors, rendering and severities

pub mod config;
pub mod constraints;
pub mod construction;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod logic;
pub mod method_call;
pub mod method_type;
pub mod parse;
pub mod shape;
pub mod sig;
pub mod subst;
pub mod subtyping;
pub mod ty;
pub mod type_env;
pub mod typing;

use garnet_syntax::SyntaxTree;
use rowan::TextSize;
use tracing::info_span;

use crate::construction::TypeConstruction;
use crate::sig::DefinitionBuilder;

pub use crate::config::{DiagnosticConfig, Preset, Severity};
pub use crate::error::{TypeError, TypeErrorKind};
pub use crate::method_call::MethodCall;
pub use crate::sig::{Environment, EnvironmentBuilder};
pub use crate::ty::Type;
pub use crate::typing::{Diagnostic, Typing};

/// Knobs for one run of the checker.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// Capture the context at this offset for editor queries; see
    /// [`Typing::cursor_context`].
    pub cursor: Option<TextSize>,
}

/// Type-check a syntax tree against the signatures behind `builder`.
pub fn check(tree: &SyntaxTree, builder: &DefinitionBuilder) -> Typing {
    check_with_options(tree, builder, &CheckOptions::default())
}

pub fn check_with_options(tree: &SyntaxTree, builder: &DefinitionBuilder, options: &CheckOptions) -> Typing {
    let _span = info_span!("check", nodes = tree.len()).entered();
    TypeConstruction::new(builder, tree, options.cursor).run()
}

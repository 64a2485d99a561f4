//! The signature environment: declared classes, modules, interfaces,
//! aliases, globals and constants, and the method tables built from them.
//!
//! - [`env`]: the immutable [`Environment`] snapshot
//! - [`builder`]: [`EnvironmentBuilder`], the only way to make one
//! - [`core`]: the builtin core classes
//! - [`ancestors`]: ancestor linearization
//! - [`definition`]: [`DefinitionBuilder`] and the method tables it produces
//! - [`cache`]: the generation-keyed [`DefinitionCache`]

pub mod ancestors;
pub mod builder;
pub mod cache;
pub mod core;
pub mod definition;
pub mod env;

use thiserror::Error;

use crate::parse::ParseError;
use crate::ty::TypeName;

pub use ancestors::Ancestor;
pub use builder::EnvironmentBuilder;
pub use cache::DefinitionCache;
pub use definition::{Definition, DefinitionBuilder, DefinitionKind, MethodDef};
pub use env::{ClassDecl, ClassKind, Environment, InterfaceDecl, MethodDecl, Visibility};

/// A failure of the signature environment.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SigError {
    #[error("unknown type name `::{0}`")]
    UnknownType(TypeName),
    #[error("`::{name}` expects {expected} type arguments, given {actual}")]
    TypeArityMismatch {
        name: TypeName,
        expected: usize,
        actual: usize,
    },
    #[error("cyclic ancestors for `::{0}`")]
    CyclicAncestors(TypeName),
    #[error("alias `::{0}` does not expand to a concrete type")]
    CyclicAlias(TypeName),
    #[error("`::{0}` is declared twice")]
    DuplicateDeclaration(TypeName),
    #[error("`::{0}` is a module and cannot be a superclass")]
    ModuleAsSuperclass(TypeName),
    #[error("`::{0}` is a class and cannot be included")]
    ClassAsMixin(TypeName),
    #[error("cannot parse `{text}` in `{context}`: {source}")]
    Parse {
        context: String,
        text: String,
        #[source]
        source: ParseError,
    },
}

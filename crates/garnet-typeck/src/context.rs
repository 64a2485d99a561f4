//! The typing context threaded through the tree walk.
//!
//! A `Context` is never mutated in place by the walker; each construct
//! derives the context its children see and returns the one that holds
//! after it.

use rustc_hash::FxHashMap;

use crate::method_type::{BlockType, MethodType};
use crate::subst::Substitution;
use crate::ty::{Type, TypeName, TypeVar};
use crate::type_env::TypeEnv;

/// The method whose body is being checked.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodContext {
    pub name: String,
    /// The declared method type; `None` for undeclared methods.
    pub method_type: Option<MethodType>,
    pub return_type: Type,
    /// Whether this is a singleton method (`def self.m`).
    pub singleton: bool,
}

impl MethodContext {
    pub fn block_type(&self) -> Option<&BlockType> {
        self.method_type.as_ref().and_then(|mt| mt.block.as_ref())
    }
}

/// The block whose body is being checked.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockContext {
    /// Expected body type; `None` when the block is untyped.
    pub body_type: Option<Type>,
    /// Lambdas return from themselves rather than the enclosing method.
    pub lambda: bool,
}

/// Where `break` and `next` go.
#[derive(Clone, Debug, PartialEq)]
pub struct BreakContext {
    pub break_type: Type,
    /// `None` inside loops, where `next` carries no value.
    pub next_type: Option<Type>,
}

/// The class or module body being checked.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleContext {
    /// Absolute name, when it could be determined.
    pub name: Option<TypeName>,
    /// Whether the signature environment declares it.
    pub declared: bool,
    pub instance_type: Type,
    pub module_type: Type,
    /// `@implements` target.
    pub implements: Option<TypeName>,
    /// `@dynamic` method names.
    pub dynamic_methods: Vec<String>,
    /// Inside `class << self`.
    pub singleton_scope: bool,
}

/// Everything known at one program point.
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    pub type_env: TypeEnv,
    pub self_type: Type,
    pub instance_type: Type,
    pub module_type: Type,
    pub method_context: Option<MethodContext>,
    pub block_context: Option<BlockContext>,
    pub break_context: Option<BreakContext>,
    pub module_context: Option<ModuleContext>,
    /// Declared instance variable types.
    pub ivars: FxHashMap<String, Type>,
    /// Declared class variable types.
    pub cvars: FxHashMap<String, Type>,
    /// `@type const` annotations.
    pub consts: FxHashMap<TypeName, Type>,
    /// Lexical module nesting, innermost first.
    pub nesting: Vec<TypeName>,
    /// Type variables in scope, with their upper bounds.
    pub type_vars: Vec<(TypeVar, Option<Type>)>,
}

impl Context {
    /// The context at the top of a file: `self` is an `Object`.
    pub fn toplevel() -> Self {
        Context {
            type_env: TypeEnv::new(),
            self_type: Type::object(),
            instance_type: Type::object(),
            module_type: Type::singleton("Object"),
            method_context: None,
            block_context: None,
            break_context: None,
            module_context: None,
            ivars: FxHashMap::default(),
            cvars: FxHashMap::default(),
            consts: FxHashMap::default(),
            nesting: Vec::new(),
            type_vars: Vec::new(),
        }
    }

    pub fn with_env(&self, type_env: TypeEnv) -> Context {
        Context {
            type_env,
            ..self.clone()
        }
    }

    /// Resolution of `self`, `instance` and `class` here.
    pub fn self_subst(&self) -> Substitution {
        Substitution::for_self(self.self_type.clone(), self.instance_type.clone(), self.module_type.clone())
    }

    /// Upper bounds of the rigid type variables in scope.
    pub fn var_bounds(&self) -> FxHashMap<TypeVar, Type> {
        self.type_vars
            .iter()
            .filter_map(|(v, b)| b.clone().map(|b| (v.clone(), b)))
            .collect()
    }

    /// Names usable as type variables in annotations.
    pub fn type_var_names(&self) -> Vec<String> {
        self.type_vars.iter().map(|(v, _)| v.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toplevel_self_is_object() {
        let ctx = Context::toplevel();
        assert_eq!(ctx.self_type, Type::object());
        assert!(ctx.method_context.is_none());
        assert_eq!(Type::SelfType.subst(&ctx.self_subst()), Type::object());
    }

    #[test]
    fn derived_contexts_share_nothing_mutable() {
        let ctx = Context::toplevel();
        let inner = ctx.with_env(ctx.type_env.assign("x", Type::integer()));
        assert_eq!(ctx.type_env.lookup("x"), None);
        assert_eq!(inner.type_env.lookup("x"), Some(&Type::integer()));
    }
}

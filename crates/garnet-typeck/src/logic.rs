//! Narrowing rules for conditions.
//!
//! The walker evaluates a condition into a [`LogicResult`]: the
//! environments that hold when it is truthy and when it is falsy. The
//! functions here compute the narrowed types themselves.

use garnet_syntax::{Node, NodeKind};

use crate::subtyping::Check;
use crate::ty::{Literal, Type};
use crate::type_env::{CallPath, PathRoot, TypeEnv};

/// One side of a condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub env: TypeEnv,
    /// No value can take this side.
    pub unreachable: bool,
}

impl Branch {
    pub fn reachable(env: TypeEnv) -> Self {
        Branch { env, unreachable: false }
    }
}

/// A typed condition and the environments of its two outcomes.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicResult {
    pub ty: Type,
    /// The environment after evaluation, whatever the outcome.
    pub env: TypeEnv,
    pub truthy: Branch,
    pub falsy: Branch,
}

impl LogicResult {
    /// A condition that narrows nothing.
    pub fn plain(ty: Type, env: TypeEnv) -> Self {
        LogicResult {
            truthy: Branch {
                env: env.clone(),
                unreachable: ty.truthy_part().is_bot(),
            },
            falsy: Branch {
                env: env.clone(),
                unreachable: !ty.may_be_falsy() || ty.is_bot(),
            },
            ty,
            env,
        }
    }

    /// `!cond`.
    pub fn negate(self, ty: Type) -> Self {
        LogicResult {
            ty,
            env: self.env,
            truthy: self.falsy,
            falsy: self.truthy,
        }
    }
}

/// Join the reachable branches; when none is reachable, join them all.
pub fn join_branches(branches: &[&Branch]) -> TypeEnv {
    let reachable: Vec<TypeEnv> = branches
        .iter()
        .filter(|b| !b.unreachable)
        .map(|b| b.env.clone())
        .collect();
    if reachable.is_empty() {
        TypeEnv::join(&branches.iter().map(|b| b.env.clone()).collect::<Vec<_>>())
    } else {
        TypeEnv::join(&reachable)
    }
}

/// What a condition can narrow: a local or a pure call path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pivot {
    Local(String),
    Call(CallPath),
}

impl Pivot {
    pub fn current(&self, env: &TypeEnv) -> Option<Type> {
        match self {
            Pivot::Local(name) => env.lookup(name).cloned(),
            Pivot::Call(path) => env.pure_call(path).cloned(),
        }
    }

    pub fn narrow(&self, env: &TypeEnv, ty: Type) -> TypeEnv {
        match self {
            Pivot::Local(name) => env.narrow(name, ty),
            Pivot::Call(path) => env.set_pure_call(path.clone(), ty),
        }
    }
}

/// The call path `node` denotes, if it is a chain of argument-less calls
/// on a local or on `self`. Purity is the caller's business.
pub fn call_path(node: Node<'_>) -> Option<CallPath> {
    match node.kind() {
        NodeKind::Lvar => node.symbol(0).map(|n| CallPath::new(PathRoot::Local(n.to_string()))),
        NodeKind::SelfNode => Some(CallPath::new(PathRoot::SelfValue)),
        NodeKind::Send if node.child_count() == 2 => {
            let method = node.symbol(1)?;
            let root = match node.child(0) {
                Some(recv) => call_path(recv)?,
                None => CallPath::new(PathRoot::SelfValue),
            };
            Some(root.call(method))
        }
        _ => None,
    }
}

/// `ty` narrowed by `is_a?(target)`: the part that may be a `target`, and
/// the part that may not.
pub fn narrow_is_a(check: &mut Check<'_>, ty: &Type, target: &Type) -> (Type, Type) {
    let mut truthy = Vec::new();
    let mut falsy = Vec::new();
    for member in expand_members(check, ty) {
        match &member {
            Type::Any => {
                truthy.push(target.clone());
                falsy.push(Type::Any);
            }
            _ if check.is_subtype(&member, target) => truthy.push(member.clone()),
            _ if check.is_subtype(target, &member) => {
                truthy.push(target.clone());
                falsy.push(member.clone());
            }
            _ => falsy.push(member.clone()),
        }
    }
    (Type::union(truthy), Type::union(falsy))
}

/// `ty` narrowed by `nil?`: `(nil part, non-nil part)`.
pub fn narrow_nil(check: &mut Check<'_>, ty: &Type) -> (Type, Type) {
    narrow_is_a(check, ty, &Type::Nil)
}

/// `ty` narrowed by `== literal` and by `literal === ty`.
pub fn narrow_literal(check: &mut Check<'_>, ty: &Type, lit: &Literal) -> (Type, Type) {
    let lit_ty = Type::Literal(lit.clone());
    let mut truthy = Vec::new();
    let mut falsy = Vec::new();
    for member in expand_members(check, ty) {
        if member == lit_ty {
            truthy.push(member);
        } else if check.is_subtype(&lit_ty, &member) {
            truthy.push(lit_ty.clone());
            falsy.push(member);
        } else {
            falsy.push(member);
        }
    }
    (Type::union(truthy), Type::union(falsy))
}

/// Union members, with aliases expanded and `bool` split into literals.
fn expand_members(check: &mut Check<'_>, ty: &Type) -> Vec<Type> {
    let builder = check.builder();
    let mut out = Vec::new();
    for member in ty.union_members() {
        match &member {
            Type::Bool => {
                out.push(Type::Literal(Literal::True));
                out.push(Type::Literal(Literal::False));
            }
            Type::Alias(..) => match builder.env().expand_alias_head(&member) {
                Ok(expanded) if expanded != member => out.extend(expand_members(check, &expanded)),
                _ => out.push(member.clone()),
            },
            _ => out.push(member.clone()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sig::{DefinitionBuilder, EnvironmentBuilder};

    fn builder() -> DefinitionBuilder {
        DefinitionBuilder::new(Arc::new(EnvironmentBuilder::with_core().build().unwrap()))
    }

    #[test]
    fn is_a_splits_unions() {
        let b = builder();
        let mut check = Check::new(&b);
        let ty = Type::union(vec![Type::integer(), Type::string()]);
        let (t, f) = narrow_is_a(&mut check, &ty, &Type::string());
        assert_eq!(t, Type::string());
        assert_eq!(f, Type::integer());
    }

    #[test]
    fn is_a_refines_supertypes() {
        let b = builder();
        let mut check = Check::new(&b);
        let (t, f) = narrow_is_a(&mut check, &Type::instance("Numeric"), &Type::integer());
        assert_eq!(t, Type::integer());
        assert_eq!(f, Type::instance("Numeric"));
        let (t, f) = narrow_is_a(&mut check, &Type::Any, &Type::integer());
        assert_eq!(t, Type::integer());
        assert_eq!(f, Type::Any);
    }

    #[test]
    fn disjoint_is_a_is_bot() {
        let b = builder();
        let mut check = Check::new(&b);
        let (t, f) = narrow_is_a(&mut check, &Type::integer(), &Type::string());
        assert_eq!(t, Type::Bot);
        assert_eq!(f, Type::integer());
    }

    #[test]
    fn nil_check() {
        let b = builder();
        let mut check = Check::new(&b);
        let (t, f) = narrow_nil(&mut check, &Type::optional(Type::string()));
        assert_eq!(t, Type::Nil);
        assert_eq!(f, Type::string());
    }

    #[test]
    fn bool_splits_into_literals() {
        let b = builder();
        let mut check = Check::new(&b);
        let (t, f) = narrow_is_a(&mut check, &Type::Bool, &Type::instance("TrueClass"));
        assert_eq!(t, Type::Literal(Literal::True));
        assert_eq!(f, Type::Literal(Literal::False));
    }

    #[test]
    fn literal_equality() {
        let b = builder();
        let mut check = Check::new(&b);
        let ty = Type::union(vec![Type::sym_lit("a"), Type::sym_lit("b")]);
        let (t, f) = narrow_literal(&mut check, &ty, &Literal::Sym("a".into()));
        assert_eq!(t, Type::sym_lit("a"));
        assert_eq!(f, Type::sym_lit("b"));
    }

    #[test]
    fn plain_results_know_reachability() {
        let r = LogicResult::plain(Type::integer(), TypeEnv::new());
        assert!(!r.truthy.unreachable);
        assert!(r.falsy.unreachable);
        let r = LogicResult::plain(Type::Nil, TypeEnv::new());
        assert!(r.truthy.unreachable);
        assert!(!r.falsy.unreachable);
    }
}

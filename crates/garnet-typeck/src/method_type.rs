//! Function, block, proc and method types.

use std::fmt;

use crate::subst::Substitution;
use crate::ty::{FreshVars, Nested, Type, TypeVar};

/// Parameters of a function type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Params {
    pub required: Vec<Type>,
    pub optional: Vec<Type>,
    pub rest: Option<Type>,
    /// Required positionals after the rest parameter.
    pub trailing: Vec<Type>,
    pub required_keywords: Vec<(String, Type)>,
    pub optional_keywords: Vec<(String, Type)>,
    pub rest_keywords: Option<Type>,
}

/// Where a positional argument at some index lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionalKind {
    Required,
    Optional,
    Rest,
}

impl Params {
    pub fn empty() -> Self {
        Params::default()
    }

    pub fn positional(required: Vec<Type>) -> Self {
        Params {
            required,
            ..Params::default()
        }
    }

    /// Minimum number of positional arguments.
    pub fn min_positionals(&self) -> usize {
        self.required.len() + self.trailing.len()
    }

    /// Maximum number of positional arguments, `None` with a rest param.
    pub fn max_positionals(&self) -> Option<usize> {
        if self.rest.is_some() {
            None
        } else {
            Some(self.required.len() + self.optional.len() + self.trailing.len())
        }
    }

    pub fn has_keywords(&self) -> bool {
        !self.required_keywords.is_empty()
            || !self.optional_keywords.is_empty()
            || self.rest_keywords.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
            && self.optional.is_empty()
            && self.rest.is_none()
            && self.trailing.is_empty()
            && !self.has_keywords()
    }

    /// The declared type of keyword `name` and whether it is required.
    pub fn keyword(&self, name: &str) -> Option<(&Type, bool)> {
        if let Some((_, t)) = self.required_keywords.iter().find(|(n, _)| n == name) {
            return Some((t, true));
        }
        if let Some((_, t)) = self.optional_keywords.iter().find(|(n, _)| n == name) {
            return Some((t, false));
        }
        self.rest_keywords.as_ref().map(|t| (t, false))
    }

    /// Assign `count` positional arguments to parameter slots, the way the
    /// runtime fills required, then optional, then rest, keeping enough
    /// arguments for the trailing required parameters. `None` when the
    /// count is outside the accepted arity.
    pub fn assign_positionals(&self, count: usize) -> Option<Vec<(PositionalKind, Type)>> {
        if count < self.min_positionals() {
            return None;
        }
        if let Some(max) = self.max_positionals() {
            if count > max {
                return None;
            }
        }
        let mut out = Vec::with_capacity(count);
        let spare = count - self.min_positionals();
        let optional_used = spare.min(self.optional.len());
        let rest_used = spare - optional_used;
        for t in &self.required {
            out.push((PositionalKind::Required, t.clone()));
        }
        for t in self.optional.iter().take(optional_used) {
            out.push((PositionalKind::Optional, t.clone()));
        }
        if let Some(rest) = &self.rest {
            for _ in 0..rest_used {
                out.push((PositionalKind::Rest, rest.clone()));
            }
        }
        for t in &self.trailing {
            out.push((PositionalKind::Required, t.clone()));
        }
        Some(out)
    }

    /// Every positional parameter type in declaration order, rest included.
    pub fn positional_types(&self) -> Vec<Type> {
        let mut out = self.required.clone();
        out.extend(self.optional.iter().cloned());
        out.extend(self.rest.iter().cloned());
        out.extend(self.trailing.iter().cloned());
        out
    }

    pub fn map_types(&self, f: &mut dyn FnMut(&Type) -> Type) -> Params {
        Params {
            required: self.required.iter().map(|t| f(t)).collect(),
            optional: self.optional.iter().map(|t| f(t)).collect(),
            rest: self.rest.as_ref().map(|t| f(t)),
            trailing: self.trailing.iter().map(|t| f(t)).collect(),
            required_keywords: self
                .required_keywords
                .iter()
                .map(|(n, t)| (n.clone(), f(t)))
                .collect(),
            optional_keywords: self
                .optional_keywords
                .iter()
                .map(|(n, t)| (n.clone(), f(t)))
                .collect(),
            rest_keywords: self.rest_keywords.as_ref().map(|t| f(t)),
        }
    }

    fn for_each_type(&self, f: &mut dyn FnMut(&Type)) {
        self.required.iter().for_each(&mut *f);
        self.optional.iter().for_each(&mut *f);
        self.rest.iter().for_each(&mut *f);
        self.trailing.iter().for_each(&mut *f);
        self.required_keywords.iter().for_each(|(_, t)| f(t));
        self.optional_keywords.iter().for_each(|(_, t)| f(t));
        self.rest_keywords.iter().for_each(&mut *f);
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.required.iter().map(|t| Nested(t).to_string()));
        parts.extend(self.optional.iter().map(|t| format!("?{}", Nested(t))));
        if let Some(rest) = &self.rest {
            parts.push(format!("*{}", Nested(rest)));
        }
        parts.extend(self.trailing.iter().map(|t| Nested(t).to_string()));
        parts.extend(
            self.required_keywords
                .iter()
                .map(|(n, t)| format!("{}: {}", n, Nested(t))),
        );
        parts.extend(
            self.optional_keywords
                .iter()
                .map(|(n, t)| format!("?{}: {}", n, Nested(t))),
        );
        if let Some(rest) = &self.rest_keywords {
            parts.push(format!("**{}", Nested(rest)));
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// `(params) -> return`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Params,
    pub ret: Type,
}

impl FunctionType {
    pub fn new(params: Params, ret: Type) -> Self {
        FunctionType { params, ret }
    }

    pub fn map_types(&self, f: &mut dyn FnMut(&Type) -> Type) -> FunctionType {
        FunctionType {
            params: self.params.map_types(f),
            ret: f(&self.ret),
        }
    }

    fn for_each_type(&self, f: &mut dyn FnMut(&Type)) {
        self.params.for_each_type(f);
        f(&self.ret);
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.params, Nested(&self.ret))
    }
}

/// The block a method or proc accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockType {
    pub required: bool,
    pub func: FunctionType,
    /// `[self: T]`: the receiver the block body is evaluated against.
    pub self_type: Option<Type>,
}

impl BlockType {
    pub fn map_types(&self, f: &mut dyn FnMut(&Type) -> Type) -> BlockType {
        BlockType {
            required: self.required,
            func: self.func.map_types(f),
            self_type: self.self_type.as_ref().map(|t| f(t)),
        }
    }

    fn for_each_type(&self, f: &mut dyn FnMut(&Type)) {
        self.func.for_each_type(f);
        if let Some(t) = &self.self_type {
            f(t);
        }
    }

    /// The proc type a `&block` parameter holds.
    pub fn to_proc(&self) -> Type {
        Type::Proc(Box::new(ProcType {
            func: self.func.clone(),
            block: None,
            self_type: self.self_type.clone(),
        }))
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.required {
            write!(f, "?")?;
        }
        write!(f, "{{ {}", self.func.params)?;
        if let Some(s) = &self.self_type {
            write!(f, " [self: {}]", s)?;
        }
        write!(f, " -> {} }}", Nested(&self.func.ret))
    }
}

/// The type of a proc/lambda value: `^(params) { block } -> ret`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProcType {
    pub func: FunctionType,
    pub block: Option<BlockType>,
    pub self_type: Option<Type>,
}

impl ProcType {
    pub fn new(func: FunctionType) -> Self {
        ProcType {
            func,
            block: None,
            self_type: None,
        }
    }

    pub fn map_types(&self, f: &mut dyn FnMut(&Type) -> Type) -> ProcType {
        ProcType {
            func: self.func.map_types(f),
            block: self.block.as_ref().map(|b| b.map_types(f)),
            self_type: self.self_type.as_ref().map(|t| f(t)),
        }
    }

    pub(crate) fn collect_free_variables(&self, out: &mut Vec<TypeVar>) {
        self.for_each_type(&mut |t| t.collect_free_variables(out));
    }

    pub fn has_self_types(&self) -> bool {
        let mut found = false;
        self.for_each_type(&mut |t| found |= t.has_self_types());
        found
    }

    fn for_each_type(&self, f: &mut dyn FnMut(&Type)) {
        self.func.for_each_type(f);
        if let Some(b) = &self.block {
            b.for_each_type(f);
        }
        if let Some(t) = &self.self_type {
            f(t);
        }
    }
}

impl fmt::Display for ProcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.func.params)?;
        if let Some(s) = &self.self_type {
            write!(f, " [self: {}]", s)?;
        }
        if let Some(b) = &self.block {
            write!(f, " {}", b)?;
        }
        write!(f, " -> {}", Nested(&self.func.ret))
    }
}

/// Declared variance of a generic type parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variance {
    Invariant,
    Covariant,
    Contravariant,
}

/// A generic type parameter with its optional upper bound.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParam {
    pub name: String,
    pub variance: Variance,
    pub upper_bound: Option<Type>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        TypeParam {
            name: name.into(),
            variance: Variance::Invariant,
            upper_bound: None,
        }
    }

    pub fn var(&self) -> TypeVar {
        TypeVar::named(self.name.clone())
    }
}

impl fmt::Display for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variance {
            Variance::Covariant => write!(f, "out ")?,
            Variance::Contravariant => write!(f, "in ")?,
            Variance::Invariant => {}
        }
        write!(f, "{}", self.name)?;
        if let Some(bound) = &self.upper_bound {
            write!(f, " < {}", bound)?;
        }
        Ok(())
    }
}

/// One overload of a method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodType {
    pub type_params: Vec<TypeParam>,
    pub func: FunctionType,
    pub block: Option<BlockType>,
}

impl MethodType {
    pub fn simple(params: Params, ret: Type) -> Self {
        MethodType {
            type_params: Vec::new(),
            func: FunctionType::new(params, ret),
            block: None,
        }
    }

    pub fn ret(&self) -> &Type {
        &self.func.ret
    }

    pub fn map_types(&self, f: &mut dyn FnMut(&Type) -> Type) -> MethodType {
        MethodType {
            type_params: self
                .type_params
                .iter()
                .map(|p| TypeParam {
                    name: p.name.clone(),
                    variance: p.variance,
                    upper_bound: p.upper_bound.as_ref().map(|b| f(b)),
                })
                .collect(),
            func: self.func.map_types(f),
            block: self.block.as_ref().map(|b| b.map_types(f)),
        }
    }

    pub fn subst(&self, s: &Substitution) -> MethodType {
        self.map_types(&mut |t| t.subst(s))
    }

    pub fn free_variables(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        let mut collect = |t: &Type| t.collect_free_variables(&mut out);
        self.func.for_each_type(&mut collect);
        if let Some(b) = &self.block {
            b.for_each_type(&mut collect);
        }
        out
    }

    /// Replace the declared type parameters with fresh variables. Returns the
    /// instantiated type (without type parameters) and each fresh variable
    /// with its substituted upper bound.
    pub fn instantiate(&self, fresh: &mut FreshVars) -> (MethodType, Vec<(TypeVar, Option<Type>)>) {
        if self.type_params.is_empty() {
            return (self.clone(), Vec::new());
        }
        let vars: Vec<TypeVar> = self.type_params.iter().map(|p| fresh.fresh(&p.name)).collect();
        let s = Substitution::build(
            self.type_params.iter().map(TypeParam::var).collect(),
            vars.iter().cloned().map(Type::Var).collect(),
        );
        let bounds = self
            .type_params
            .iter()
            .zip(vars.iter())
            .map(|(p, v)| (v.clone(), p.upper_bound.as_ref().map(|b| b.subst(&s))))
            .collect();
        let mut instantiated = self.subst(&s);
        instantiated.type_params.clear();
        (instantiated, bounds)
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            let params: Vec<String> = self.type_params.iter().map(|p| p.to_string()).collect();
            write!(f, "[{}] ", params.join(", "))?;
        }
        write!(f, "{}", self.func.params)?;
        if let Some(b) = &self.block {
            write!(f, " {}", b)?;
        }
        write!(f, " -> {}", Nested(&self.func.ret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(required: Vec<Type>, optional: Vec<Type>, rest: Option<Type>) -> Params {
        Params {
            required,
            optional,
            rest,
            ..Params::default()
        }
    }

    #[test]
    fn assign_positionals_fills_in_order() {
        let p = Params {
            trailing: vec![Type::symbol()],
            ..params(vec![Type::integer()], vec![Type::string()], Some(Type::float()))
        };
        assert!(p.assign_positionals(1).is_none());
        let two: Vec<PositionalKind> = p.assign_positionals(2).unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(two, vec![PositionalKind::Required, PositionalKind::Required]);
        let four = p.assign_positionals(4).unwrap();
        assert_eq!(four[1], (PositionalKind::Optional, Type::string()));
        assert_eq!(four[2], (PositionalKind::Rest, Type::float()));
        assert_eq!(four[3], (PositionalKind::Required, Type::symbol()));
    }

    #[test]
    fn arity_bounds() {
        let p = params(vec![Type::integer()], vec![Type::string()], None);
        assert_eq!(p.min_positionals(), 1);
        assert_eq!(p.max_positionals(), Some(2));
        assert!(p.assign_positionals(3).is_none());
    }

    #[test]
    fn keyword_lookup() {
        let p = Params {
            required_keywords: vec![("a".into(), Type::integer())],
            optional_keywords: vec![("b".into(), Type::string())],
            ..Params::default()
        };
        assert_eq!(p.keyword("a"), Some((&Type::integer(), true)));
        assert_eq!(p.keyword("b"), Some((&Type::string(), false)));
        assert_eq!(p.keyword("c"), None);
    }

    #[test]
    fn display_method_type() {
        let mt = MethodType {
            type_params: vec![TypeParam::new("A")],
            func: FunctionType::new(
                Params {
                    optional: vec![Type::optional(Type::string())],
                    required_keywords: vec![("key".into(), Type::symbol())],
                    ..params(vec![Type::var("A")], vec![], None)
                },
                Type::var("A"),
            ),
            block: Some(BlockType {
                required: false,
                func: FunctionType::new(Params::positional(vec![Type::integer()]), Type::Void),
                self_type: None,
            }),
        };
        insta::assert_snapshot!(
            mt,
            @"[A] (A, ?(::String | nil), key: ::Symbol) ?{ (::Integer) -> void } -> A"
        );
    }

    #[test]
    fn instantiate_uses_fresh_vars() {
        let mt = MethodType {
            type_params: vec![TypeParam::new("A")],
            func: FunctionType::new(Params::positional(vec![Type::var("A")]), Type::var("A")),
            block: None,
        };
        let mut fresh = FreshVars::new();
        let (inst, vars) = mt.instantiate(&mut fresh);
        assert!(inst.type_params.is_empty());
        assert_eq!(vars.len(), 1);
        assert_eq!(inst.func.ret, Type::Var(vars[0].0.clone()));
        assert!(vars[0].0.is_fresh());
    }
}

//! Substitutions: type-variable and self-type replacement.

use rustc_hash::FxHashMap;

use crate::ty::{Type, TypeVar};

/// A mapping from type variables to types, plus optional replacements for
/// `self`, `instance` and `class`.
///
/// Variables absent from the mapping are left in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Substitution {
    vars: FxHashMap<TypeVar, Type>,
    pub self_type: Option<Type>,
    pub instance_type: Option<Type>,
    pub class_type: Option<Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up `vars` with `types`. Extra entries on either side are ignored.
    pub fn build(vars: Vec<TypeVar>, types: Vec<Type>) -> Self {
        let mut s = Substitution::new();
        for (v, t) in vars.into_iter().zip(types) {
            s.vars.insert(v, t);
        }
        s
    }

    /// Substitution for the self types only.
    pub fn for_self(self_type: Type, instance_type: Type, class_type: Type) -> Self {
        Substitution {
            self_type: Some(self_type),
            instance_type: Some(instance_type),
            class_type: Some(class_type),
            ..Substitution::default()
        }
    }

    pub fn add(&mut self, var: TypeVar, ty: Type) {
        self.vars.insert(var, ty);
    }

    pub fn get(&self, var: &TypeVar) -> Option<&Type> {
        self.vars.get(var)
    }

    pub fn contains(&self, var: &TypeVar) -> bool {
        self.vars.contains_key(var)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
            && self.self_type.is_none()
            && self.instance_type.is_none()
            && self.class_type.is_none()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Drop the mappings for `vars`, used when descending under binders that
    /// shadow them (a generic method inside a generic class).
    pub fn without(&self, vars: &[TypeVar]) -> Substitution {
        let mut s = self.clone();
        for v in vars {
            s.vars.remove(v);
        }
        s
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut out = Substitution {
            vars: FxHashMap::default(),
            self_type: other.self_type.as_ref().map(|t| t.subst(self)).or_else(|| self.self_type.clone()),
            instance_type: other
                .instance_type
                .as_ref()
                .map(|t| t.subst(self))
                .or_else(|| self.instance_type.clone()),
            class_type: other.class_type.as_ref().map(|t| t.subst(self)).or_else(|| self.class_type.clone()),
        };
        for (v, t) in &other.vars {
            out.vars.insert(v.clone(), t.subst(self));
        }
        for (v, t) in &self.vars {
            out.vars.entry(v.clone()).or_insert_with(|| t.clone());
        }
        out
    }
}

impl Type {
    /// Apply a substitution to every type variable and self type.
    pub fn subst(&self, s: &Substitution) -> Type {
        if s.is_empty() {
            return self.clone();
        }
        match self {
            Type::Var(v) => s.get(v).cloned().unwrap_or_else(|| self.clone()),
            Type::SelfType => s.self_type.clone().unwrap_or(Type::SelfType),
            Type::InstanceType => s.instance_type.clone().unwrap_or(Type::InstanceType),
            Type::ClassType => s.class_type.clone().unwrap_or(Type::ClassType),
            other => other.map_children(&mut |t| t.subst(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_vars_only() {
        let s = Substitution::build(vec![TypeVar::named("T")], vec![Type::integer()]);
        let t = Type::hash(Type::var("T"), Type::var("U"));
        assert_eq!(t.subst(&s), Type::hash(Type::integer(), Type::var("U")));
    }

    #[test]
    fn substitution_renormalizes_unions() {
        let s = Substitution::build(vec![TypeVar::named("T")], vec![Type::integer()]);
        let t = Type::union(vec![Type::var("T"), Type::integer()]);
        assert_eq!(t.subst(&s), Type::integer());
    }

    #[test]
    fn self_types() {
        let s = Substitution::for_self(Type::instance("Foo"), Type::instance("Foo"), Type::singleton("Foo"));
        let t = Type::Tuple(vec![Type::SelfType, Type::ClassType]);
        assert_eq!(t.subst(&s), Type::Tuple(vec![Type::instance("Foo"), Type::singleton("Foo")]));
    }

    #[test]
    fn compose_applies_right_first() {
        let a = Substitution::build(vec![TypeVar::named("U")], vec![Type::string()]);
        let b = Substitution::build(vec![TypeVar::named("T")], vec![Type::array(Type::var("U"))]);
        let c = a.compose(&b);
        assert_eq!(Type::var("T").subst(&c), Type::array(Type::string()));
        assert_eq!(Type::var("U").subst(&c), Type::string());
    }
}

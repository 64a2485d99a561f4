//! The subtyping relation.
//!
//! [`Check::check`] decides `sub <: sup` and, on failure, returns the chain
//! of relations that led to the failing judgment, outermost first:
//!
//! ```text
//! ::Integer <: ::String
//!   ::Numeric <: ::String
//!     ::Object <: ::String
//!       ::BasicObject <: ::String
//! ```
//!
//! When a [`Constraints`] set is attached, relating a type to one of its
//! unknown variables records a bound instead of failing.

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::constraints::Constraints;
use crate::method_type::{BlockType, FunctionType, MethodType, Params, ProcType, Variance};
use crate::shape::{fill_args, lookup_method};
use crate::sig::{DefinitionBuilder, SigError};
use crate::subst::Substitution;
use crate::ty::{Literal, Type, TypeVar};

/// One `sub <: sup` judgment.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub sub: Type,
    pub sup: Type,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <: {}", self.sub, self.sup)
    }
}

/// Outcome of a subtyping check.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtypeResult {
    pub holds: bool,
    /// The failing chain, outermost first; empty when `holds`.
    pub trace: Vec<Relation>,
}

/// A subtyping checker bound to one environment.
pub struct Check<'a> {
    builder: &'a DefinitionBuilder,
    self_subst: Substitution,
    /// Upper bounds of rigid type variables in scope.
    var_bounds: FxHashMap<TypeVar, Type>,
    constraints: Option<&'a mut Constraints>,
    assumptions: Vec<(Type, Type)>,
    path: Vec<Relation>,
    failure: Option<Vec<Relation>>,
    failure_seq: u64,
    sig_errors: Vec<SigError>,
}

const DEPTH_LIMIT: usize = 64;

impl<'a> Check<'a> {
    pub fn new(builder: &'a DefinitionBuilder) -> Self {
        Check {
            builder,
            self_subst: Substitution::new(),
            var_bounds: FxHashMap::default(),
            constraints: None,
            assumptions: Vec::new(),
            path: Vec::new(),
            failure: None,
            failure_seq: 0,
            sig_errors: Vec::new(),
        }
    }

    /// Resolve `self`, `instance` and `class` through `subst`.
    pub fn with_self(mut self, subst: Substitution) -> Self {
        self.self_subst = subst;
        self
    }

    pub fn with_var_bounds(mut self, bounds: FxHashMap<TypeVar, Type>) -> Self {
        self.var_bounds = bounds;
        self
    }

    pub fn with_constraints(mut self, constraints: &'a mut Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn builder(&self) -> &'a DefinitionBuilder {
        self.builder
    }

    pub fn constraints_mut(&mut self) -> Option<&mut Constraints> {
        self.constraints.as_deref_mut()
    }

    /// Environment failures met while checking, drained.
    pub fn take_sig_errors(&mut self) -> Vec<SigError> {
        std::mem::take(&mut self.sig_errors)
    }

    /// Decide `sub <: sup`.
    pub fn check(&mut self, sub: &Type, sup: &Type) -> SubtypeResult {
        self.failure = None;
        self.path.clear();
        let holds = self.relate(sub, sup);
        SubtypeResult {
            holds,
            trace: if holds {
                Vec::new()
            } else {
                self.failure.take().unwrap_or_else(|| {
                    vec![Relation {
                        sub: sub.clone(),
                        sup: sup.clone(),
                    }]
                })
            },
        }
    }

    pub fn is_subtype(&mut self, sub: &Type, sup: &Type) -> bool {
        self.check(sub, sup).holds
    }

    /// Whether `a` and `b` are provably disjoint: neither is a subtype of
    /// the other, member by member.
    pub fn disjoint(&mut self, a: &Type, b: &Type) -> bool {
        let a_members = a.union_members();
        let b_members = b.union_members();
        if a_members.is_empty() || b_members.is_empty() {
            return false;
        }
        a_members.iter().all(|x| {
            b_members
                .iter()
                .all(|y| !self.is_subtype(x, y) && !self.is_subtype(y, x))
        })
    }

    fn record_failure(&mut self) {
        self.failure = Some(self.path.clone());
        self.failure_seq += 1;
    }

    fn relate(&mut self, sub: &Type, sup: &Type) -> bool {
        trace!(%sub, %sup, "relate");
        self.path.push(Relation {
            sub: sub.clone(),
            sup: sup.clone(),
        });
        let seq = self.failure_seq;
        let ok = if self.path.len() > DEPTH_LIMIT {
            false
        } else {
            self.relate_inner(sub, sup)
        };
        if !ok && self.failure_seq == seq {
            self.record_failure();
        }
        self.path.pop();
        ok
    }

    /// Relate, undoing constraint changes on failure.
    fn attempt(&mut self, sub: &Type, sup: &Type) -> bool {
        let snapshot = self.constraints.as_deref_mut().map(Constraints::snapshot);
        let ok = self.relate(sub, sup);
        if let (Some(snapshot), Some(c)) = (snapshot, self.constraints.as_deref_mut()) {
            if ok {
                c.commit(snapshot);
            } else {
                c.rollback_to(snapshot);
            }
        }
        ok
    }

    fn is_unknown(&self, v: &TypeVar) -> bool {
        self.constraints.as_deref().is_some_and(|c| c.is_unknown(v))
    }

    fn has_unknowns(&self, ty: &Type) -> bool {
        ty.free_variables().iter().any(|v| self.is_unknown(v))
    }

    fn resolve_self(&self, ty: &Type) -> Option<Type> {
        let resolved = match ty {
            Type::SelfType => self.self_subst.self_type.clone(),
            Type::InstanceType => self.self_subst.instance_type.clone(),
            Type::ClassType => self.self_subst.class_type.clone(),
            _ => None,
        };
        resolved.filter(|r| r != ty)
    }

    fn assumed(&self, sub: &Type, sup: &Type) -> bool {
        self.assumptions.iter().any(|(a, b)| a == sub && b == sup)
    }

    fn relate_inner(&mut self, sub: &Type, sup: &Type) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (Type::Any, _) | (_, Type::Any) => true,
            (_, Type::Top) | (_, Type::Void) => true,
            (Type::Bot, _) => true,

            (Type::Var(a), Type::Var(b)) if self.is_unknown(a) && self.is_unknown(b) => {
                if let Some(c) = self.constraints.as_deref_mut() {
                    c.equate(a, b);
                }
                true
            }
            (Type::Var(v), _) if self.is_unknown(v) => {
                if let Some(c) = self.constraints.as_deref_mut() {
                    c.add_upper(v, sup.clone());
                }
                true
            }
            (_, Type::Var(v)) if self.is_unknown(v) => {
                if let Some(c) = self.constraints.as_deref_mut() {
                    c.add_lower(v, sub.clone());
                }
                true
            }

            (Type::SelfType | Type::InstanceType | Type::ClassType, _) if self.resolve_self(sub).is_some() => {
                let resolved = self.resolve_self(sub).unwrap_or(Type::Any);
                self.relate(&resolved, sup)
            }
            (_, Type::SelfType | Type::InstanceType | Type::ClassType) if self.resolve_self(sup).is_some() => {
                let resolved = self.resolve_self(sup).unwrap_or(Type::Any);
                self.relate(sub, &resolved)
            }

            (Type::Alias(..), _) | (_, Type::Alias(..)) => {
                if self.assumed(sub, sup) {
                    return true;
                }
                let builder = self.builder;
                let env = builder.env();
                let (a, b) = match (env.expand_alias_head(sub), env.expand_alias_head(sup)) {
                    (Ok(a), Ok(b)) => (a, b),
                    (Err(e), _) | (_, Err(e)) => {
                        self.sig_errors.push(e);
                        return false;
                    }
                };
                self.assumptions.push((sub.clone(), sup.clone()));
                let ok = self.relate(&a, &b);
                self.assumptions.pop();
                ok
            }

            (Type::Union(members), _) => members.iter().all(|m| self.relate(m, sup)),
            (_, Type::Union(members)) => {
                // Members without unknowns first, so `nil <: T?` does not
                // pin `T` to nil.
                let mut ordered: Vec<&Type> = members.iter().filter(|m| !self.has_unknowns(m)).collect();
                ordered.extend(members.iter().filter(|m| self.has_unknowns(m)));
                for m in ordered {
                    if self.attempt(sub, m) {
                        return true;
                    }
                }
                self.record_failure();
                false
            }
            (_, Type::Intersection(members)) => members.iter().all(|m| self.relate(sub, m)),
            (Type::Intersection(members), _) => {
                for m in members {
                    if self.attempt(m, sup) {
                        return true;
                    }
                }
                self.record_failure();
                false
            }

            (Type::Void | Type::Top, _) => false,

            (Type::Var(v), _) => match self.var_bounds.get(v).cloned() {
                Some(bound) => self.relate(&bound, sup),
                None => false,
            },
            (_, Type::Var(_)) => false,

            (Type::Bool, _) => {
                self.relate(&Type::Literal(Literal::True), sup) && self.relate(&Type::Literal(Literal::False), sup)
            }
            (_, Type::Bool) => match sub {
                Type::Literal(Literal::True | Literal::False) => true,
                Type::Instance(name, _) => name == "TrueClass" || name == "FalseClass",
                _ => false,
            },

            (_, Type::Literal(lit)) => match (sub, lit) {
                (Type::Instance(name, _), Literal::True) => name == "TrueClass",
                (Type::Instance(name, _), Literal::False) => name == "FalseClass",
                _ => false,
            },
            (Type::Literal(lit), _) => {
                let nominal = match lit {
                    Literal::True => Type::instance("TrueClass"),
                    Literal::False => Type::instance("FalseClass"),
                    other => other.base_type(),
                };
                self.relate(&nominal, sup)
            }

            (Type::Instance(name, _), Type::Nil) => name == "NilClass",
            (_, Type::Nil) => false,
            (Type::Nil, _) => self.relate(&Type::instance("NilClass"), sup),

            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.relate(x, y))
            }
            (Type::Tuple(elems), _) => {
                let array = Type::array(Type::union(elems.clone()));
                self.relate(&array, sup)
            }

            (Type::Record(a), Type::Record(b)) => b.iter().all(|(key, ty_b)| match a.iter().find(|(k, _)| k == key) {
                Some((_, ty_a)) => self.relate(ty_a, ty_b),
                None => false,
            }),
            (Type::Record(fields), _) => {
                let hash = Type::hash(
                    Type::union(fields.iter().map(|(k, _)| k.key_type()).collect()),
                    Type::union(fields.iter().map(|(_, t)| t.clone()).collect()),
                );
                self.relate(&hash, sup)
            }

            (Type::Proc(a), Type::Proc(b)) => self.proc_compatible(a, b),
            (Type::Proc(_), _) => self.relate(&Type::instance("Proc"), sup),

            (Type::Singleton(a), Type::Singleton(b)) => self.builder.env().is_singleton_subclass(a, b),
            (Type::Singleton(a), Type::Instance(b, _)) => match self.builder.env().singleton_ancestors(a) {
                Ok(ancestors) => ancestors.iter().any(|anc| {
                    matches!(anc, crate::sig::Ancestor::Instance { name, .. } if name == b)
                }),
                Err(e) => {
                    self.sig_errors.push(e);
                    false
                }
            },

            (Type::Instance(a, a_args), Type::Instance(b, b_args)) => self.nominal(a, a_args, b, b_args),

            (Type::Interface(a, a_args), Type::Interface(b, b_args)) if a == b => self.type_args(b, a_args, b_args),
            (_, Type::Interface(name, args)) => self.structural(sub, name, args),

            _ => false,
        }
    }

    fn type_args(&mut self, name: &str, sub_args: &[Type], sup_args: &[Type]) -> bool {
        if sub_args.len() != sup_args.len() {
            return sub_args.is_empty() || sup_args.is_empty();
        }
        let variances = self.builder.env().variances(name);
        sub_args.iter().zip(sup_args).enumerate().all(|(i, (x, y))| {
            match variances.get(i).copied().unwrap_or(Variance::Invariant) {
                Variance::Covariant => self.relate(x, y),
                Variance::Contravariant => self.relate(y, x),
                Variance::Invariant => self.relate(x, y) && self.relate(y, x),
            }
        })
    }

    fn nominal(&mut self, a: &str, a_args: &[Type], b: &str, b_args: &[Type]) -> bool {
        if a == b {
            return self.type_args(b, a_args, b_args);
        }
        let builder = self.builder;
        let env = builder.env();
        let Some(decl) = env.class(a) else {
            self.sig_errors.push(SigError::UnknownType(a.to_string()));
            return false;
        };
        let filled = fill_args(&decl.type_params, a_args);
        match env.ancestor_args(a, &filled, b) {
            Ok(Some(args)) => self.type_args(b, &args, b_args),
            Ok(None) => {
                // Walk up the superclass chain so the trace shows each step.
                if let Some(sup) = env.superclass(a) {
                    if let Some(sup_decl) = env.class(&sup.name) {
                        let s = Substitution::build(
                            decl.type_params.iter().map(|p| p.var()).collect(),
                            filled,
                        );
                        let sup_args: Vec<Type> = sup.args.iter().map(|t| t.subst(&s)).collect();
                        let sup_args = fill_args(&sup_decl.type_params, &sup_args);
                        let sup_ty = Type::Instance(sup.name.clone(), sup_args);
                        return self.relate(&sup_ty, &Type::Instance(b.to_string(), b_args.to_vec()));
                    }
                }
                false
            }
            Err(e) => {
                self.sig_errors.push(e);
                false
            }
        }
    }

    /// `sub` implements interface `name[args]`.
    fn structural(&mut self, sub: &Type, name: &str, args: &[Type]) -> bool {
        let sup = Type::Interface(name.to_string(), args.to_vec());
        if self.assumed(sub, &sup) {
            return true;
        }
        let iface = match self.builder.build_interface(name) {
            Ok(def) => def,
            Err(e) => {
                self.sig_errors.push(e);
                return false;
            }
        };
        let s = iface
            .args_subst(&fill_args(&iface.type_params, args))
            .compose(&Substitution::for_self(sub.clone(), sub.clone(), Type::Any));
        self.assumptions.push((sub.clone(), sup.clone()));
        let mut ok = true;
        for method in iface.method_names() {
            let Some(required) = iface.method(method) else { continue };
            let found = match lookup_method(self.builder, sub, method) {
                Ok(found) => found,
                Err(e) => {
                    self.sig_errors.push(e);
                    None
                }
            };
            let Some(found) = found else {
                ok = false;
                break;
            };
            let all_matched = required.overloads.iter().all(|want| {
                let want = want.subst(&s);
                found.overloads.iter().any(|have| self.method_compatible(have, &want))
            });
            if !all_matched {
                ok = false;
                break;
            }
        }
        self.assumptions.pop();
        ok
    }

    /// A method of type `have` can stand in for one of type `want`.
    pub(crate) fn method_compatible(&mut self, have: &MethodType, want: &MethodType) -> bool {
        // Generic implementations accept anything their parameters could be.
        let have = if have.type_params.is_empty() {
            have.clone()
        } else {
            let vars: Vec<TypeVar> = have.type_params.iter().map(|p| p.var()).collect();
            let n = vars.len();
            let mut h = have.subst(&Substitution::build(vars, vec![Type::Any; n]));
            h.type_params.clear();
            h
        };
        self.function_compatible(&have.func, &want.func) && self.block_param_compatible(have.block.as_ref(), want.block.as_ref())
    }

    /// Blocks in parameter position: the block a caller passes under `want`
    /// must be usable as the block `have` expects.
    fn block_param_compatible(&mut self, have: Option<&BlockType>, want: Option<&BlockType>) -> bool {
        match (have, want) {
            (None, None) => true,
            (Some(h), None) => !h.required,
            (None, Some(_)) => true,
            (Some(h), Some(w)) => (!h.required || w.required) && self.function_compatible(&w.func, &h.func),
        }
    }

    /// A function of type `have` can be called wherever `want` is expected:
    /// parameters contravariant, return covariant.
    pub(crate) fn function_compatible(&mut self, have: &FunctionType, want: &FunctionType) -> bool {
        self.params_compatible(&have.params, &want.params) && self.relate(&have.ret, &want.ret)
    }

    fn params_compatible(&mut self, have: &Params, want: &Params) -> bool {
        let min = want.min_positionals();
        let max = want.max_positionals().unwrap_or(min + want.optional.len() + 1);
        for count in min..=max {
            let (Some(h), Some(w)) = (have.assign_positionals(count), want.assign_positionals(count)) else {
                return false;
            };
            for ((_, ht), (_, wt)) in h.iter().zip(&w) {
                if !self.relate(wt, ht) {
                    return false;
                }
            }
        }
        for (name, wt) in want.required_keywords.iter().chain(&want.optional_keywords) {
            match have.keyword(name) {
                Some((ht, _)) => {
                    let ht = ht.clone();
                    if !self.relate(wt, &ht) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        have.required_keywords
            .iter()
            .all(|(name, _)| want.required_keywords.iter().any(|(n, _)| n == name))
    }

    fn proc_compatible(&mut self, a: &ProcType, b: &ProcType) -> bool {
        if !self.function_compatible(&a.func, &b.func) {
            return false;
        }
        let blocks = match (&a.block, &b.block) {
            (None, None) => true,
            (None, Some(bb)) => !bb.required,
            (Some(ab), None) => !ab.required,
            (Some(ab), Some(bb)) => self.function_compatible(&bb.func, &ab.func),
        };
        if !blocks {
            return false;
        }
        match (&a.self_type, &b.self_type) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(sa), Some(sb)) => self.relate(sb, sa),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parse::parse_type;
    use crate::sig::EnvironmentBuilder;

    fn builder() -> DefinitionBuilder {
        let env = EnvironmentBuilder::with_core()
            .interface("_Named", |i| i.method("name", "() -> String"))
            .class("Person", |c| c.attr_reader("name", "String"))
            .class("Robot", |c| c.method("name", "() -> Symbol"))
            .alias("list[T]", "nil | [T, list[T]]")
            .build()
            .unwrap();
        DefinitionBuilder::new(Arc::new(env))
    }

    fn holds(b: &DefinitionBuilder, sub: &str, sup: &str) -> bool {
        let sub = parse_type(sub).unwrap();
        let sup = parse_type(sup).unwrap();
        Check::new(b).is_subtype(&sub, &sup)
    }

    #[test]
    fn nominal_hierarchy() {
        let b = builder();
        assert!(holds(&b, "Integer", "Numeric"));
        assert!(holds(&b, "Integer", "Comparable"));
        assert!(holds(&b, "Integer", "Object"));
        assert!(!holds(&b, "Numeric", "Integer"));
        assert!(holds(&b, "Array[Integer]", "Enumerable[Numeric]"));
        assert!(!holds(&b, "Array[String]", "Array[Integer]"));
    }

    #[test]
    fn trace_walks_superclasses() {
        let b = builder();
        let result = Check::new(&b).check(&Type::integer(), &Type::string());
        assert!(!result.holds);
        let lines: Vec<String> = result.trace.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "::Integer <: ::String",
                "::Numeric <: ::String",
                "::Object <: ::String",
                "::BasicObject <: ::String",
            ]
        );
    }

    #[test]
    fn union_target_failure_reports_whole_union() {
        let b = builder();
        let result = Check::new(&b).check(&Type::symbol(), &Type::optional(Type::integer()));
        assert_eq!(result.trace.len(), 1);
        assert_eq!(result.trace[0].to_string(), "::Symbol <: ::Integer | nil");
    }

    #[test]
    fn literals_bools_and_nil() {
        let b = builder();
        assert!(holds(&b, "1", "Integer"));
        assert!(holds(&b, "1", "1 | 2"));
        assert!(!holds(&b, "Integer", "1"));
        assert!(holds(&b, "true", "bool"));
        assert!(holds(&b, "bool", "Object"));
        assert!(holds(&b, "nil", "Integer?"));
        assert!(!holds(&b, "nil", "Integer"));
    }

    #[test]
    fn tuples_and_records() {
        let b = builder();
        assert!(holds(&b, "[Integer, String]", "[Numeric, Object]"));
        assert!(!holds(&b, "[Integer]", "[Integer, Integer]"));
        assert!(holds(&b, "[Integer, Float]", "Array[Numeric]"));
        assert!(holds(&b, "{ a: Integer, b: String }", "{ a: Numeric }"));
        assert!(!holds(&b, "{ a: Integer }", "{ a: Integer, b: String }"));
        assert!(holds(&b, "{ a: Integer }", "Hash[Symbol, Integer]"));
    }

    #[test]
    fn procs() {
        let b = builder();
        assert!(holds(&b, "^(Numeric) -> Integer", "^(Integer) -> Numeric"));
        assert!(!holds(&b, "^(Integer) -> Integer", "^(Numeric) -> Integer"));
        assert!(!holds(&b, "^() -> void", "^() { () -> void } -> void"));
        assert!(holds(&b, "^() -> void", "^() ?{ () -> void } -> void"));
        assert!(holds(&b, "^() -> Integer", "Proc"));
    }

    #[test]
    fn interfaces_are_structural() {
        let b = builder();
        assert!(holds(&b, "Person", "_Named"));
        assert!(!holds(&b, "Robot", "_Named"));
        assert!(holds(&b, "String", "_ToS"));
        assert!(holds(&b, "Array[Integer]", "_Each[Integer]"));
    }

    #[test]
    fn singletons() {
        let b = builder();
        assert!(holds(&b, "singleton(ArgumentError)", "singleton(Exception)"));
        assert!(holds(&b, "singleton(String)", "Module"));
        assert!(holds(&b, "singleton(String)", "Class"));
        assert!(!holds(&b, "singleton(String)", "String"));
    }

    #[test]
    fn recursive_aliases_terminate() {
        let b = builder();
        assert!(holds(&b, "[Integer, [Integer, nil]]", "list[Integer]"));
        assert!(holds(&b, "list[Integer]", "list[Numeric]"));
        assert!(!holds(&b, "[String, nil]", "list[Integer]"));
    }

    #[test]
    fn self_types_resolve_through_context() {
        let b = builder();
        let subst = Substitution::for_self(Type::string(), Type::string(), Type::singleton("String"));
        let mut check = Check::new(&b).with_self(subst);
        assert!(check.is_subtype(&Type::SelfType, &Type::instance("Comparable")));
        assert!(!check.is_subtype(&Type::ClassType, &Type::string()));
    }

    #[test]
    fn constraints_collect_bounds() {
        let b = builder();
        let mut fresh = crate::ty::FreshVars::new();
        let t = fresh.fresh("T");
        let mut constraints = Constraints::new();
        constraints.add_var(t.clone(), None);
        {
            let mut check = Check::new(&b).with_constraints(&mut constraints);
            assert!(check.is_subtype(&Type::optional(Type::integer()), &Type::optional(Type::Var(t.clone()))));
        }
        let bounds = constraints.bounds(&t);
        assert_eq!(bounds.lower, vec![Type::integer()]);
    }

    #[test]
    fn disjointness() {
        let b = builder();
        let mut check = Check::new(&b);
        assert!(check.disjoint(&Type::integer(), &Type::string()));
        assert!(!check.disjoint(&Type::integer(), &Type::instance("Numeric")));
        assert!(!check.disjoint(&Type::union(vec![Type::integer(), Type::string()]), &Type::string()));
    }
}

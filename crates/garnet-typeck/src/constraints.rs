//! Constraint collection and solving for generic method calls.
//!
//! Each instantiated type variable gets an `ena` key whose value is the set
//! of lower and upper bounds observed while relating arguments to
//! parameters. Relating two unknown variables unions their keys, so they
//! share a solution.

use ena::unify::{InPlace, InPlaceUnificationTable, NoError, Snapshot, UnifyKey, UnifyValue};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::subst::Substitution;
use crate::subtyping::Check;
use crate::ty::{Type, TypeVar};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarKey(u32);

/// Bounds collected for one (class of) variable(s).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bounds {
    pub lower: Vec<Type>,
    pub upper: Vec<Type>,
}

impl UnifyKey for VarKey {
    type Value = Bounds;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        VarKey(u)
    }

    fn tag() -> &'static str {
        "VarKey"
    }
}

impl UnifyValue for Bounds {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, NoError> {
        let mut out = a.clone();
        for t in &b.lower {
            if !out.lower.contains(t) {
                out.lower.push(t.clone());
            }
        }
        for t in &b.upper {
            if !out.upper.contains(t) {
                out.upper.push(t.clone());
            }
        }
        Ok(out)
    }
}

/// A failed solution for one variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Unsatisfiable {
    pub var: TypeVar,
    pub lower: Type,
    pub upper: Type,
}

/// The constraint set of one call.
pub struct Constraints {
    table: InPlaceUnificationTable<VarKey>,
    keys: FxHashMap<TypeVar, VarKey>,
    /// Unknowns in instantiation order.
    vars: Vec<TypeVar>,
    /// Declared upper bounds (`[T < Bound]`).
    declared: FxHashMap<TypeVar, Type>,
}

pub type ConstraintSnapshot = Snapshot<InPlace<VarKey>>;

impl Default for Constraints {
    fn default() -> Self {
        Self::new()
    }
}

impl Constraints {
    pub fn new() -> Self {
        Constraints {
            table: InPlaceUnificationTable::new(),
            keys: FxHashMap::default(),
            vars: Vec::new(),
            declared: FxHashMap::default(),
        }
    }

    /// Register `var` as an unknown to solve for.
    pub fn add_var(&mut self, var: TypeVar, declared_bound: Option<Type>) {
        if self.keys.contains_key(&var) {
            return;
        }
        let key = self.table.new_key(Bounds::default());
        self.keys.insert(var.clone(), key);
        if let Some(bound) = declared_bound {
            self.declared.insert(var.clone(), bound);
        }
        self.vars.push(var);
    }

    pub fn is_unknown(&self, var: &TypeVar) -> bool {
        self.keys.contains_key(var)
    }

    pub fn vars(&self) -> &[TypeVar] {
        &self.vars
    }

    pub fn add_lower(&mut self, var: &TypeVar, ty: Type) {
        if let Some(&key) = self.keys.get(var) {
            trace!(%var, %ty, "lower bound");
            self.table.union_value(
                key,
                Bounds {
                    lower: vec![ty],
                    upper: Vec::new(),
                },
            );
        }
    }

    pub fn add_upper(&mut self, var: &TypeVar, ty: Type) {
        if let Some(&key) = self.keys.get(var) {
            trace!(%var, %ty, "upper bound");
            self.table.union_value(
                key,
                Bounds {
                    lower: Vec::new(),
                    upper: vec![ty],
                },
            );
        }
    }

    /// Make two unknowns share a solution.
    pub fn equate(&mut self, a: &TypeVar, b: &TypeVar) {
        if let (Some(&ka), Some(&kb)) = (self.keys.get(a), self.keys.get(b)) {
            self.table.union(ka, kb);
        }
    }

    pub fn bounds(&mut self, var: &TypeVar) -> Bounds {
        match self.keys.get(var) {
            Some(&key) => self.table.probe_value(key),
            None => Bounds::default(),
        }
    }

    pub fn snapshot(&mut self) -> ConstraintSnapshot {
        self.table.snapshot()
    }

    pub fn rollback_to(&mut self, snapshot: ConstraintSnapshot) {
        self.table.rollback_to(snapshot);
    }

    pub fn commit(&mut self, snapshot: ConstraintSnapshot) {
        self.table.commit(snapshot);
    }

    /// Solve every unknown.
    ///
    /// Only lower bounds: their union. Only upper bounds: their
    /// intersection. Both: the lower bound when it fits under the upper.
    /// Neither: the declared bound, or `untyped`. Variables whose bounds
    /// mention other unknowns are solved after those. Unsatisfiable
    /// variables are reported and solved to `untyped`.
    pub fn solve(&mut self, check: &mut Check<'_>) -> (Substitution, Vec<Unsatisfiable>) {
        let mut solution = Substitution::new();
        let mut failures = Vec::new();
        let mut pending: Vec<TypeVar> = self.vars.clone();

        while !pending.is_empty() {
            let ready: Vec<TypeVar> = pending
                .iter()
                .filter(|v| {
                    let b = self.bounds(v);
                    !b.lower.iter().chain(&b.upper).any(|t| self.mentions_unknown_owned(t, &solution, v))
                })
                .cloned()
                .collect();
            // A cycle among pending variables: take the first one anyway.
            let batch = if ready.is_empty() { vec![pending[0].clone()] } else { ready };
            for var in &batch {
                let (ty, failure) = self.solve_one(var, &solution, check);
                trace!(%var, %ty, "solved");
                if let Some(f) = failure {
                    failures.push(f);
                }
                solution.add(var.clone(), ty);
            }
            pending.retain(|v| !batch.contains(v));
        }
        (solution, failures)
    }

    fn mentions_unknown_owned(&self, ty: &Type, solved: &Substitution, own: &TypeVar) -> bool {
        ty.free_variables()
            .iter()
            .any(|v| v != own && self.is_unknown(v) && !solved.contains(v))
    }

    fn solve_one(&mut self, var: &TypeVar, solved: &Substitution, check: &mut Check<'_>) -> (Type, Option<Unsatisfiable>) {
        let bounds = self.bounds(var);
        // Unresolved unknowns left in a bound become `untyped`.
        let close = |t: &Type, this: &Self| -> Type {
            let t = t.subst(solved);
            let open: Vec<TypeVar> = t
                .free_variables()
                .into_iter()
                .filter(|v| this.is_unknown(v))
                .collect();
            let n = open.len();
            t.subst(&Substitution::build(open, vec![Type::Any; n]))
        };
        let lowers: Vec<Type> = bounds.lower.iter().map(|t| close(t, self)).collect();
        let uppers: Vec<Type> = bounds.upper.iter().map(|t| close(t, self)).collect();
        let declared = self.declared.get(var).map(|t| close(t, self));

        let lower = if lowers.is_empty() { None } else { Some(Type::union(lowers)) };
        let upper = if uppers.is_empty() { None } else { Some(Type::intersection(uppers)) };

        let candidate = match (lower, upper) {
            (Some(lower), Some(upper)) => {
                let widened = lower.widen_literals();
                if check.is_subtype(&widened, &upper) {
                    widened
                } else if check.is_subtype(&lower, &upper) {
                    lower
                } else {
                    return (
                        Type::Any,
                        Some(Unsatisfiable {
                            var: var.clone(),
                            lower,
                            upper,
                        }),
                    );
                }
            }
            (Some(lower), None) => lower.widen_literals(),
            (None, Some(upper)) => upper,
            (None, None) => declared.clone().unwrap_or(Type::Any),
        };

        if let Some(bound) = declared {
            if !check.is_subtype(&candidate, &bound) {
                return (
                    Type::Any,
                    Some(Unsatisfiable {
                        var: var.clone(),
                        lower: candidate,
                        upper: bound,
                    }),
                );
            }
        }
        (candidate, None)
    }
}

impl std::fmt::Debug for Constraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraints").field("vars", &self.vars).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sig::{DefinitionBuilder, EnvironmentBuilder};
    use crate::ty::FreshVars;

    fn builder() -> DefinitionBuilder {
        DefinitionBuilder::new(Arc::new(EnvironmentBuilder::with_core().build().unwrap()))
    }

    #[test]
    fn lower_bounds_are_unioned() {
        let b = builder();
        let mut fresh = FreshVars::new();
        let a = fresh.fresh("A");
        let mut c = Constraints::new();
        c.add_var(a.clone(), None);
        c.add_lower(&a, Type::integer());
        c.add_lower(&a, Type::string());
        let (s, failures) = c.solve(&mut Check::new(&b));
        assert!(failures.is_empty());
        assert_eq!(Type::Var(a).subst(&s), Type::union(vec![Type::integer(), Type::string()]));
    }

    #[test]
    fn unconstrained_defaults() {
        let b = builder();
        let mut fresh = FreshVars::new();
        let (a, bounded) = (fresh.fresh("A"), fresh.fresh("B"));
        let mut c = Constraints::new();
        c.add_var(a.clone(), None);
        c.add_var(bounded.clone(), Some(Type::instance("Numeric")));
        let (s, _) = c.solve(&mut Check::new(&b));
        assert_eq!(s.get(&a), Some(&Type::Any));
        assert_eq!(s.get(&bounded), Some(&Type::instance("Numeric")));
    }

    #[test]
    fn conflicting_bounds_are_unsatisfiable() {
        let b = builder();
        let mut fresh = FreshVars::new();
        let a = fresh.fresh("A");
        let mut c = Constraints::new();
        c.add_var(a.clone(), None);
        c.add_lower(&a, Type::string());
        c.add_upper(&a, Type::integer());
        let (s, failures) = c.solve(&mut Check::new(&b));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].lower, Type::string());
        assert_eq!(s.get(&a), Some(&Type::Any));
    }

    #[test]
    fn declared_bound_is_enforced() {
        let b = builder();
        let mut fresh = FreshVars::new();
        let a = fresh.fresh("A");
        let mut c = Constraints::new();
        c.add_var(a.clone(), Some(Type::instance("Numeric")));
        c.add_lower(&a, Type::string());
        let (_, failures) = c.solve(&mut Check::new(&b));
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn snapshots_roll_back() {
        let mut fresh = FreshVars::new();
        let a = fresh.fresh("A");
        let mut c = Constraints::new();
        c.add_var(a.clone(), None);
        let snap = c.snapshot();
        c.add_lower(&a, Type::string());
        c.rollback_to(snap);
        assert!(c.bounds(&a).lower.is_empty());
    }

    #[test]
    fn equated_vars_share_bounds() {
        let b = builder();
        let mut fresh = FreshVars::new();
        let (x, y) = (fresh.fresh("X"), fresh.fresh("Y"));
        let mut c = Constraints::new();
        c.add_var(x.clone(), None);
        c.add_var(y.clone(), None);
        c.equate(&x, &y);
        c.add_lower(&x, Type::integer());
        let (s, _) = c.solve(&mut Check::new(&b));
        assert_eq!(s.get(&y), Some(&Type::integer()));
    }
}

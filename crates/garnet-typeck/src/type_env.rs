//! Local variable bindings and narrowed pure-call results.
//!
//! A `TypeEnv` is a value: every update returns a new environment and the
//! previous one stays valid, so branches can start from the same snapshot
//! and be merged afterwards.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::ty::Type;

/// One local variable.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVar {
    /// The current, flow-sensitive type.
    pub ty: Type,
    /// The type pinned by a `@type var` annotation.
    pub declared: Option<Type>,
}

/// What a pure call path starts from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathRoot {
    Local(String),
    SelfValue,
}

/// A chain of argument-less pure calls on a root: `user.profile.name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallPath {
    pub root: PathRoot,
    pub calls: Vec<String>,
}

impl CallPath {
    pub fn new(root: PathRoot) -> Self {
        CallPath { root, calls: Vec::new() }
    }

    pub fn call(mut self, method: &str) -> Self {
        self.calls.push(method.to_string());
        self
    }

    pub fn is_rooted_at(&self, name: &str) -> bool {
        matches!(&self.root, PathRoot::Local(n) if n == name)
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            PathRoot::Local(name) => write!(f, "{}", name)?,
            PathRoot::SelfValue => write!(f, "self")?,
        }
        for call in &self.calls {
            write!(f, ".{}", call)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeEnv {
    locals: FxHashMap<String, LocalVar>,
    pure_calls: FxHashMap<CallPath, Type>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.locals.get(name).map(|v| &v.ty)
    }

    pub fn local(&self, name: &str) -> Option<&LocalVar> {
        self.locals.get(name)
    }

    pub fn declared(&self, name: &str) -> Option<&Type> {
        self.locals.get(name).and_then(|v| v.declared.as_ref())
    }

    /// Local names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.locals.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Bind `name` to `ty`. A declared variable keeps its declaration.
    /// Narrowed calls rooted at `name` are forgotten.
    pub fn assign(&self, name: &str, ty: Type) -> TypeEnv {
        let mut env = self.clone();
        let declared = env.declared(name).cloned();
        env.locals.insert(name.to_string(), LocalVar { ty, declared });
        env.pure_calls.retain(|path, _| !path.is_rooted_at(name));
        env
    }

    /// Pin `name` to `ty`.
    pub fn declare(&self, name: &str, ty: Type) -> TypeEnv {
        let mut env = self.clone();
        env.locals.insert(
            name.to_string(),
            LocalVar {
                ty: ty.clone(),
                declared: Some(ty),
            },
        );
        env.pure_calls.retain(|path, _| !path.is_rooted_at(name));
        env
    }

    /// Refine the current type of `name` without touching its declaration.
    pub fn narrow(&self, name: &str, ty: Type) -> TypeEnv {
        let mut env = self.clone();
        match env.locals.get_mut(name) {
            Some(var) => var.ty = ty,
            None => {
                env.locals.insert(name.to_string(), LocalVar { ty, declared: None });
            }
        }
        env
    }

    pub fn pure_call(&self, path: &CallPath) -> Option<&Type> {
        self.pure_calls.get(path)
    }

    pub fn set_pure_call(&self, path: CallPath, ty: Type) -> TypeEnv {
        let mut env = self.clone();
        env.pure_calls.insert(path, ty);
        env
    }

    /// Forget every narrowed call rooted at `self`.
    pub fn forget_self_calls(&self) -> TypeEnv {
        let mut env = self.clone();
        env.pure_calls.retain(|path, _| path.root != PathRoot::SelfValue);
        env
    }

    /// Join environments that reach the same program point.
    ///
    /// A local present in every environment gets the union of its types;
    /// one missing from any of them is dropped. Narrowed calls survive only
    /// when every environment has them.
    pub fn join(envs: &[TypeEnv]) -> TypeEnv {
        let Some((first, rest)) = envs.split_first() else {
            return TypeEnv::new();
        };
        let mut out = TypeEnv::new();
        for (name, var) in &first.locals {
            let mut types = vec![var.ty.clone()];
            let mut declared = var.declared.clone();
            let mut everywhere = true;
            for env in rest {
                match env.locals.get(name) {
                    Some(other) => {
                        types.push(other.ty.clone());
                        if declared != other.declared {
                            declared = declared.or_else(|| other.declared.clone());
                        }
                    }
                    None => {
                        everywhere = false;
                        break;
                    }
                }
            }
            if everywhere {
                let ty = match &declared {
                    Some(d) if types.iter().all(|t| t == d) => d.clone(),
                    _ => Type::union(types),
                };
                out.locals.insert(name.clone(), LocalVar { ty, declared });
            }
        }
        for (path, ty) in &first.pure_calls {
            let mut types = vec![ty.clone()];
            if rest.iter().all(|env| match env.pure_calls.get(path) {
                Some(t) => {
                    types.push(t.clone());
                    true
                }
                None => false,
            }) {
                out.pure_calls.insert(path.clone(), Type::union(types));
            }
        }
        out
    }

    /// The environment after a block or loop body that may have run:
    /// locals of `self` reassigned in `inner` widen to `before | inside`.
    /// Locals first bound in `inner` stay invisible.
    pub fn widen_from(&self, inner: &TypeEnv) -> TypeEnv {
        let mut env = self.clone();
        for (name, var) in env.locals.iter_mut() {
            if let Some(after) = inner.locals.get(name) {
                if after.ty != var.ty {
                    var.ty = Type::union(vec![var.ty.clone(), after.ty.clone()]);
                }
            }
        }
        env.pure_calls.retain(|path, ty| inner.pure_calls.get(path) == Some(ty));
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_copy_on_write() {
        let env = TypeEnv::new().assign("x", Type::integer());
        let next = env.assign("x", Type::string());
        assert_eq!(env.lookup("x"), Some(&Type::integer()));
        assert_eq!(next.lookup("x"), Some(&Type::string()));
    }

    #[test]
    fn join_unions_and_drops() {
        let base = TypeEnv::new().assign("x", Type::integer());
        let a = base.assign("y", Type::string());
        let b = base.assign("x", Type::string());
        let joined = TypeEnv::join(&[a, b]);
        assert_eq!(joined.lookup("x"), Some(&Type::union(vec![Type::integer(), Type::string()])));
        assert_eq!(joined.lookup("y"), None);
    }

    #[test]
    fn declarations_survive_narrowing_and_join() {
        let declared = Type::optional(Type::integer());
        let env = TypeEnv::new().declare("x", declared.clone());
        let narrowed = env.narrow("x", Type::integer());
        assert_eq!(narrowed.declared("x"), Some(&declared));
        let joined = TypeEnv::join(&[env.clone(), narrowed]);
        assert_eq!(joined.lookup("x"), Some(&declared));
        assert_eq!(joined.declared("x"), Some(&declared));
    }

    #[test]
    fn reassigning_root_forgets_pure_calls() {
        let path = CallPath::new(PathRoot::Local("user".into())).call("name");
        let env = TypeEnv::new()
            .assign("user", Type::instance("User"))
            .set_pure_call(path.clone(), Type::string());
        assert_eq!(env.pure_call(&path), Some(&Type::string()));
        let env = env.assign("user", Type::instance("User"));
        assert_eq!(env.pure_call(&path), None);
        assert_eq!(path.to_string(), "user.name");
    }

    #[test]
    fn widening_after_block() {
        let outer = TypeEnv::new().assign("x", Type::integer());
        let inner = outer.assign("x", Type::string()).assign("tmp", Type::Nil);
        let after = outer.widen_from(&inner);
        assert_eq!(after.lookup("x"), Some(&Type::union(vec![Type::integer(), Type::string()])));
        assert_eq!(after.lookup("tmp"), None);
    }
}

//! Ancestor linearization.

use std::fmt;

use crate::method_type::TypeParam;
use crate::sig::env::{ClassKind, Environment, TypeRef};
use crate::sig::SigError;
use crate::subst::Substitution;
use crate::ty::{Type, TypeName};

/// One entry of an ancestor chain. Type arguments are expressed in terms of
/// the type parameters of the type whose chain this is.
#[derive(Clone, Debug, PartialEq)]
pub enum Ancestor {
    Instance { name: TypeName, args: Vec<Type> },
    Singleton { name: TypeName },
}

impl Ancestor {
    pub fn name(&self) -> &str {
        match self {
            Ancestor::Instance { name, .. } | Ancestor::Singleton { name } => name,
        }
    }
}

impl fmt::Display for Ancestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ancestor::Instance { name, args } => write!(f, "{}", Type::Instance(name.clone(), args.clone())),
            Ancestor::Singleton { name } => write!(f, "singleton(::{})", name),
        }
    }
}

fn params_subst(params: &[TypeParam], args: &[Type]) -> Substitution {
    Substitution::build(params.iter().map(TypeParam::var).collect(), args.to_vec())
}

impl Environment {
    /// Ancestors of instances of `name`, most specific first: prepended
    /// modules, the class itself, included modules (last included first),
    /// then the superclass chain. Modules end with `Object`'s chain, since
    /// every module is mixed into some object.
    pub fn instance_ancestors(&self, name: &str) -> Result<Vec<Ancestor>, SigError> {
        let decl = self.class(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        let args: Vec<Type> = decl.type_params.iter().map(|p| Type::Var(p.var())).collect();
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        self.collect_instance(name, &args, &mut out, &mut visiting)?;
        if decl.kind == ClassKind::Module && self.class("Object").is_some() {
            self.collect_instance("Object", &[], &mut out, &mut visiting)?;
        }
        Ok(out)
    }

    fn collect_instance(
        &self,
        name: &str,
        args: &[Type],
        out: &mut Vec<Ancestor>,
        visiting: &mut Vec<TypeName>,
    ) -> Result<(), SigError> {
        if visiting.iter().any(|v| v == name) {
            return Err(SigError::CyclicAncestors(name.to_string()));
        }
        let decl = self.class(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        visiting.push(name.to_string());
        let s = params_subst(&decl.type_params, args);
        let apply = |r: &TypeRef| -> (TypeName, Vec<Type>) { (r.name.clone(), r.args.iter().map(|a| a.subst(&s)).collect()) };

        for r in decl.prepends.iter().rev() {
            let (n, a) = apply(r);
            self.collect_module(&n, &a, out, visiting)?;
        }
        out.push(Ancestor::Instance {
            name: name.to_string(),
            args: args.to_vec(),
        });
        for r in decl.includes.iter().rev() {
            let (n, a) = apply(r);
            self.collect_module(&n, &a, out, visiting)?;
        }
        if let Some(sup) = self.superclass(name) {
            if self.class(&sup.name).is_some() {
                let (n, a) = apply(&sup);
                self.collect_instance(&n, &a, out, visiting)?;
            }
        }
        visiting.pop();
        Ok(())
    }

    /// A mixed-in module with its own prepends and includes, skipped when it
    /// already occurs in the chain.
    fn collect_module(
        &self,
        name: &str,
        args: &[Type],
        out: &mut Vec<Ancestor>,
        visiting: &mut Vec<TypeName>,
    ) -> Result<(), SigError> {
        if out.iter().any(|a| matches!(a, Ancestor::Instance { name: n, .. } if n == name)) {
            return Ok(());
        }
        if visiting.iter().any(|v| v == name) {
            return Err(SigError::CyclicAncestors(name.to_string()));
        }
        let decl = self.class(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        visiting.push(name.to_string());
        let s = params_subst(&decl.type_params, args);
        for r in decl.prepends.iter().rev() {
            self.collect_module(&r.name, &r.args.iter().map(|a| a.subst(&s)).collect::<Vec<_>>(), out, visiting)?;
        }
        out.push(Ancestor::Instance {
            name: name.to_string(),
            args: args.to_vec(),
        });
        for r in decl.includes.iter().rev() {
            self.collect_module(&r.name, &r.args.iter().map(|a| a.subst(&s)).collect::<Vec<_>>(), out, visiting)?;
        }
        visiting.pop();
        Ok(())
    }

    /// Ancestors of the class object `name`: its singleton chain with
    /// extended modules, then `Class`/`Module` and their instance chain.
    pub fn singleton_ancestors(&self, name: &str) -> Result<Vec<Ancestor>, SigError> {
        let decl = self.class(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        let mut current = Some(name.to_string());
        while let Some(n) = current {
            if out.iter().any(|a| matches!(a, Ancestor::Singleton { name } if *name == n)) {
                return Err(SigError::CyclicAncestors(n));
            }
            let Some(d) = self.class(&n) else { break };
            out.push(Ancestor::Singleton { name: n.clone() });
            for r in d.extends.iter().rev() {
                self.collect_module(&r.name, &r.args, &mut out, &mut visiting)?;
            }
            current = self.superclass(&n).map(|r| r.name);
        }
        let meta = if decl.kind == ClassKind::Module { "Module" } else { "Class" };
        if self.class(meta).is_some() {
            self.collect_instance(meta, &[], &mut out, &mut visiting)?;
        }
        Ok(out)
    }

    /// The type arguments `name[args]` has when viewed as its ancestor
    /// `target`, or `None` when `target` is not an ancestor.
    pub fn ancestor_args(&self, name: &str, args: &[Type], target: &str) -> Result<Option<Vec<Type>>, SigError> {
        let decl = self.class(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        let s = params_subst(&decl.type_params, args);
        for a in self.instance_ancestors(name)? {
            if let Ancestor::Instance { name: n, args: a_args } = a {
                if n == target {
                    return Ok(Some(a_args.iter().map(|t| t.subst(&s)).collect()));
                }
            }
        }
        Ok(None)
    }

    /// Whether class object `name` has singleton ancestor `target`.
    pub fn is_singleton_subclass(&self, name: &str, target: &str) -> bool {
        let mut current = Some(name.to_string());
        while let Some(n) = current {
            if n == target {
                return true;
            }
            current = self.superclass(&n).map(|r| r.name);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::EnvironmentBuilder;

    fn names(ancestors: &[Ancestor]) -> Vec<String> {
        ancestors.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn instance_chain() {
        let env = EnvironmentBuilder::with_core().build().unwrap();
        let chain = env.instance_ancestors("Integer").unwrap();
        assert_eq!(
            names(&chain),
            vec!["::Integer", "::Numeric", "::Comparable", "::Object", "::Kernel", "::BasicObject"]
        );
    }

    #[test]
    fn generic_mixins_are_substituted() {
        let env = EnvironmentBuilder::with_core().build().unwrap();
        let args = env.ancestor_args("Array", &[Type::integer()], "Enumerable").unwrap();
        assert_eq!(args, Some(vec![Type::integer()]));
        let args = env.ancestor_args("Hash", &[Type::symbol(), Type::string()], "Enumerable").unwrap();
        assert_eq!(args, Some(vec![Type::Tuple(vec![Type::symbol(), Type::string()])]));
        assert_eq!(env.ancestor_args("Integer", &[], "String").unwrap(), None);
    }

    #[test]
    fn prepend_and_include_order() {
        let env = EnvironmentBuilder::with_core()
            .module("A", |m| m)
            .module("B", |m| m)
            .module("P", |m| m)
            .class("C", |c| c.include("A").include("B").prepend("P"))
            .build()
            .unwrap();
        let chain = env.instance_ancestors("C").unwrap();
        assert_eq!(&names(&chain)[..4], &["::P", "::C", "::B", "::A"]);
    }

    #[test]
    fn singleton_chain() {
        let env = EnvironmentBuilder::with_core()
            .module("Ext", |m| m)
            .class("Foo", |c| c.extend("Ext"))
            .build()
            .unwrap();
        let chain = env.singleton_ancestors("Foo").unwrap();
        let chain = names(&chain);
        assert_eq!(&chain[..5], &["singleton(::Foo)", "::Ext", "singleton(::Object)", "singleton(::BasicObject)", "::Class"]);
        assert!(chain.contains(&"::Module".to_string()));
        assert!(env.is_singleton_subclass("ArgumentError", "Exception"));
    }
}

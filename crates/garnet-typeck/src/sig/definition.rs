//! Method tables for instance, singleton and interface types.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::method_type::{FunctionType, MethodType, Params, TypeParam};
use crate::sig::ancestors::Ancestor;
use crate::sig::cache::{CacheKey, DefinitionCache};
use crate::sig::env::{ClassKind, Environment, MethodDecl, Visibility};
use crate::sig::SigError;
use crate::subst::Substitution;
use crate::ty::{Type, TypeName};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Instance,
    Singleton,
    Interface,
}

/// A method as seen on a particular type.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub overloads: Vec<MethodType>,
    pub visibility: Visibility,
    pub pure: bool,
    /// The class, module or interface that declares it.
    pub owner: TypeName,
}

/// The full method table of a type.
///
/// Types are expressed in terms of the type's own type parameters, with
/// `self`, `instance` and `class` left unresolved; callers substitute both
/// at the use site.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub type_name: TypeName,
    pub kind: DefinitionKind,
    pub type_params: Vec<TypeParam>,
    pub methods: FxHashMap<String, MethodDef>,
    pub ivars: FxHashMap<String, Type>,
    pub cvars: FxHashMap<String, Type>,
}

impl Definition {
    pub fn empty(name: &str, kind: DefinitionKind) -> Self {
        Definition {
            type_name: name.to_string(),
            kind,
            type_params: Vec::new(),
            methods: FxHashMap::default(),
            ivars: FxHashMap::default(),
            cvars: FxHashMap::default(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.get(name)
    }

    /// Method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Substitution from the type parameters to `args`.
    pub fn args_subst(&self, args: &[Type]) -> Substitution {
        Substitution::build(self.type_params.iter().map(TypeParam::var).collect(), args.to_vec())
    }

    fn insert_methods(&mut self, owner: &str, decls: &[MethodDecl], s: &Substitution) {
        for decl in decls {
            self.methods.insert(
                decl.name.clone(),
                MethodDef {
                    name: decl.name.clone(),
                    overloads: decl.overloads.iter().map(|mt| subst_method(mt, s)).collect(),
                    visibility: decl.visibility,
                    pure: decl.pure,
                    owner: owner.to_string(),
                },
            );
        }
    }
}

/// Substitute into a method type without touching the variables its own
/// type parameters bind.
fn subst_method(mt: &MethodType, s: &Substitution) -> MethodType {
    if mt.type_params.is_empty() {
        return mt.subst(s);
    }
    let bound: Vec<_> = mt.type_params.iter().map(TypeParam::var).collect();
    mt.subst(&s.without(&bound))
}

/// Builds [`Definition`]s from an environment, memoized in a
/// [`DefinitionCache`].
#[derive(Clone, Debug)]
pub struct DefinitionBuilder {
    env: Arc<Environment>,
    cache: Arc<DefinitionCache>,
}

impl DefinitionBuilder {
    pub fn new(env: Arc<Environment>) -> Self {
        Self::with_cache(env, Arc::new(DefinitionCache::new()))
    }

    pub fn with_cache(env: Arc<Environment>, cache: Arc<DefinitionCache>) -> Self {
        DefinitionBuilder { env, cache }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn cache(&self) -> &Arc<DefinitionCache> {
        &self.cache
    }

    fn key(&self, name: &str, kind: DefinitionKind) -> CacheKey {
        CacheKey {
            name: name.to_string(),
            kind,
            generation: self.env.generation(),
        }
    }

    pub fn build_instance(&self, name: &str) -> Result<Arc<Definition>, SigError> {
        self.cache
            .get_or_try_insert_with(self.key(name, DefinitionKind::Instance), || self.instance_uncached(name))
    }

    pub fn build_singleton(&self, name: &str) -> Result<Arc<Definition>, SigError> {
        self.cache
            .get_or_try_insert_with(self.key(name, DefinitionKind::Singleton), || self.singleton_uncached(name))
    }

    pub fn build_interface(&self, name: &str) -> Result<Arc<Definition>, SigError> {
        self.cache
            .get_or_try_insert_with(self.key(name, DefinitionKind::Interface), || self.interface_uncached(name))
    }

    fn instance_uncached(&self, name: &str) -> Result<Definition, SigError> {
        trace!(name, "building instance definition");
        let env = &self.env;
        let decl = env.class(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        let mut def = Definition::empty(name, DefinitionKind::Instance);
        def.type_params = decl.type_params.clone();

        if decl.kind == ClassKind::Module {
            for self_type in &decl.self_types {
                if let Type::Interface(iface, args) = self_type {
                    let idef = self.build_interface(iface)?;
                    let s = idef.args_subst(args);
                    for m in idef.methods.values() {
                        let mut m = m.clone();
                        m.overloads = m.overloads.iter().map(|mt| subst_method(mt, &s)).collect();
                        def.methods.insert(m.name.clone(), m);
                    }
                }
            }
        }

        for ancestor in env.instance_ancestors(name)?.iter().rev() {
            let Ancestor::Instance { name: a_name, args } = ancestor else { continue };
            let Some(a_decl) = env.class(a_name) else { continue };
            let s = Substitution::build(a_decl.type_params.iter().map(TypeParam::var).collect(), args.clone());
            def.insert_methods(a_name, &a_decl.instance_methods, &s);
            for (ivar, ty) in &a_decl.ivars {
                def.ivars.insert(ivar.clone(), ty.subst(&s));
            }
            for (cvar, ty) in &a_decl.cvars {
                def.cvars.insert(cvar.clone(), ty.clone());
            }
        }
        Ok(def)
    }

    fn singleton_uncached(&self, name: &str) -> Result<Definition, SigError> {
        trace!(name, "building singleton definition");
        let env = &self.env;
        let decl = env.class(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        let mut def = Definition::empty(name, DefinitionKind::Singleton);
        let mut new_declared = false;

        for ancestor in env.singleton_ancestors(name)?.iter().rev() {
            match ancestor {
                Ancestor::Instance { name: a_name, args } => {
                    let Some(a_decl) = env.class(a_name) else { continue };
                    let s = Substitution::build(a_decl.type_params.iter().map(TypeParam::var).collect(), args.clone());
                    def.insert_methods(a_name, &a_decl.instance_methods, &s);
                }
                Ancestor::Singleton { name: a_name } => {
                    let Some(a_decl) = env.class(a_name) else { continue };
                    new_declared |= a_decl.singleton_method("new").is_some();
                    def.insert_methods(a_name, &a_decl.singleton_methods, &Substitution::new());
                    for (ivar, ty) in &a_decl.singleton_ivars {
                        def.ivars.insert(ivar.clone(), ty.clone());
                    }
                    for (cvar, ty) in &a_decl.cvars {
                        def.cvars.insert(cvar.clone(), ty.clone());
                    }
                }
            }
        }

        if decl.kind == ClassKind::Class && !new_declared {
            let instance = self.build_instance(name)?;
            let instance_type = decl.self_instance_type();
            let overloads = match instance.method("initialize") {
                Some(init) => init
                    .overloads
                    .iter()
                    .map(|mt| {
                        let mut type_params = decl.type_params.clone();
                        type_params.extend(mt.type_params.iter().cloned());
                        MethodType {
                            type_params,
                            func: FunctionType::new(mt.func.params.clone(), instance_type.clone()),
                            block: mt.block.clone(),
                        }
                    })
                    .collect(),
                None => vec![MethodType {
                    type_params: decl.type_params.clone(),
                    ..MethodType::simple(Params::empty(), instance_type.clone())
                }],
            };
            def.methods.insert(
                "new".to_string(),
                MethodDef {
                    name: "new".to_string(),
                    overloads,
                    visibility: Visibility::Public,
                    pure: false,
                    owner: name.to_string(),
                },
            );
        }
        Ok(def)
    }

    fn interface_uncached(&self, name: &str) -> Result<Definition, SigError> {
        trace!(name, "building interface definition");
        let decl = self
            .env
            .interface(name)
            .ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        let mut def = Definition::empty(name, DefinitionKind::Interface);
        def.type_params = decl.type_params.clone();
        for r in &decl.includes {
            if r.name == name {
                return Err(SigError::CyclicAncestors(name.to_string()));
            }
            let included = self.build_interface(&r.name)?;
            let s = included.args_subst(&r.args);
            for m in included.methods.values() {
                let mut m = m.clone();
                m.overloads = m.overloads.iter().map(|mt| subst_method(mt, &s)).collect();
                def.methods.insert(m.name.clone(), m);
            }
        }
        def.insert_methods(name, &decl.methods, &Substitution::new());
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::EnvironmentBuilder;

    fn builder(env: EnvironmentBuilder) -> DefinitionBuilder {
        DefinitionBuilder::new(Arc::new(env.build().unwrap()))
    }

    #[test]
    fn inherited_methods_are_substituted() {
        let b = builder(EnvironmentBuilder::with_core());
        let array = b.build_instance("Array").unwrap();
        let each_with_index = array.method("each_with_index").unwrap();
        assert_eq!(each_with_index.owner, "Enumerable");
        let block = each_with_index.overloads[0].block.as_ref().unwrap();
        assert_eq!(block.func.params.required[0], Type::var("Elem"));
        assert_eq!(array.method("map").unwrap().owner, "Array");
        assert_eq!(array.method("is_a?").unwrap().owner, "Kernel");
    }

    #[test]
    fn new_is_synthesized_from_initialize() {
        let b = builder(EnvironmentBuilder::with_core().class("Box[T]", |c| c.method("initialize", "(T) -> void")));
        let singleton = b.build_singleton("Box").unwrap();
        let new = singleton.method("new").unwrap();
        insta::assert_snapshot!(new.overloads[0], @"[T] (T) -> ::Box[T]");
        assert!(singleton.method("superclass").is_some());
    }

    #[test]
    fn definitions_are_cached() {
        let b = builder(EnvironmentBuilder::with_core());
        let first = b.build_instance("String").unwrap();
        let second = b.build_instance("String").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn interface_methods() {
        let b = builder(
            EnvironmentBuilder::with_core()
                .interface("_Named", |i| i.method("name", "() -> String"))
                .interface("_Labelled", |i| i.include("_Named").method("label", "() -> String")),
        );
        let def = b.build_interface("_Labelled").unwrap();
        assert_eq!(def.method_names(), vec!["label", "name"]);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let b = builder(EnvironmentBuilder::with_core());
        assert_eq!(b.build_instance("Nope").unwrap_err(), SigError::UnknownType("Nope".to_string()));
    }
}

//! Fluent construction of an [`Environment`].
//!
//! Declarations are collected as type-expression text and parsed by
//! [`EnvironmentBuilder::build`], which also validates every referenced
//! type name:
//!
//! ```ignore
//! let env = EnvironmentBuilder::with_core()
//!     .class("Box[out T]", |c| {
//!         c.method("initialize", "(T) -> void")
//!             .attr_reader("value", "T")
//!     })
//!     .build()?;
//! ```

use rustc_hash::FxHashMap;

use crate::method_type::TypeParam;
use crate::parse::{parse_decl_header, parse_overloads, parse_type_with_vars};
use crate::sig::env::{AliasDecl, ClassDecl, ClassKind, Environment, InterfaceDecl, MethodDecl, TypeRef, Visibility};
use crate::sig::SigError;
use crate::ty::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeclKind {
    Class,
    Module,
    Interface,
}

#[derive(Clone, Debug)]
struct MethodSpec {
    name: String,
    text: String,
    visibility: Visibility,
    pure: bool,
    singleton: bool,
}

/// Collects the members of one class, module or interface.
#[derive(Clone, Debug)]
pub struct DeclBuilder {
    header: String,
    kind: DeclKind,
    superclass: Option<String>,
    includes: Vec<String>,
    prepends: Vec<String>,
    extends: Vec<String>,
    self_types: Vec<String>,
    methods: Vec<MethodSpec>,
    ivars: Vec<(String, String)>,
    singleton_ivars: Vec<(String, String)>,
    cvars: Vec<(String, String)>,
}

impl DeclBuilder {
    fn new(header: &str, kind: DeclKind) -> Self {
        DeclBuilder {
            header: header.to_string(),
            kind,
            superclass: None,
            includes: Vec::new(),
            prepends: Vec::new(),
            extends: Vec::new(),
            self_types: Vec::new(),
            methods: Vec::new(),
            ivars: Vec::new(),
            singleton_ivars: Vec::new(),
            cvars: Vec::new(),
        }
    }

    pub fn superclass(mut self, ty: &str) -> Self {
        self.superclass = Some(ty.to_string());
        self
    }

    pub fn include(mut self, ty: &str) -> Self {
        self.includes.push(ty.to_string());
        self
    }

    pub fn prepend(mut self, ty: &str) -> Self {
        self.prepends.push(ty.to_string());
        self
    }

    pub fn extend(mut self, ty: &str) -> Self {
        self.extends.push(ty.to_string());
        self
    }

    /// Module self-type constraint.
    pub fn self_type(mut self, ty: &str) -> Self {
        self.self_types.push(ty.to_string());
        self
    }

    fn push_method(mut self, name: &str, text: &str, visibility: Visibility, pure: bool, singleton: bool) -> Self {
        self.methods.push(MethodSpec {
            name: name.to_string(),
            text: text.to_string(),
            visibility,
            pure,
            singleton,
        });
        self
    }

    /// Public instance method with `|`-separated overloads.
    pub fn method(self, name: &str, overloads: &str) -> Self {
        self.push_method(name, overloads, Visibility::Public, false, false)
    }

    pub fn private_method(self, name: &str, overloads: &str) -> Self {
        self.push_method(name, overloads, Visibility::Private, false, false)
    }

    /// A side-effect free method whose result may be narrowed.
    pub fn pure_method(self, name: &str, overloads: &str) -> Self {
        self.push_method(name, overloads, Visibility::Public, true, false)
    }

    pub fn singleton_method(self, name: &str, overloads: &str) -> Self {
        self.push_method(name, overloads, Visibility::Public, false, true)
    }

    /// `attr_reader name: T`, also declaring `@name`.
    pub fn attr_reader(self, name: &str, ty: &str) -> Self {
        let text = format!("() -> {}", paren(ty));
        self.ivar(&format!("@{}", name), ty)
            .push_method(name, &text, Visibility::Public, true, false)
    }

    /// `attr_writer name: T`, also declaring `@name`.
    pub fn attr_writer(self, name: &str, ty: &str) -> Self {
        let text = format!("({}) -> {}", ty, paren(ty));
        self.ivar(&format!("@{}", name), ty)
            .push_method(&format!("{}=", name), &text, Visibility::Public, false, false)
    }

    pub fn attr_accessor(self, name: &str, ty: &str) -> Self {
        self.attr_reader(name, ty).attr_writer(name, ty)
    }

    pub fn ivar(mut self, name: &str, ty: &str) -> Self {
        if !self.ivars.iter().any(|(n, _)| n == name) {
            self.ivars.push((name.to_string(), ty.to_string()));
        }
        self
    }

    pub fn singleton_ivar(mut self, name: &str, ty: &str) -> Self {
        self.singleton_ivars.push((name.to_string(), ty.to_string()));
        self
    }

    pub fn cvar(mut self, name: &str, ty: &str) -> Self {
        self.cvars.push((name.to_string(), ty.to_string()));
        self
    }
}

fn paren(ty: &str) -> String {
    format!("({})", ty)
}

/// Builds an [`Environment`].
#[derive(Clone, Debug, Default)]
pub struct EnvironmentBuilder {
    generation: u64,
    decls: Vec<DeclBuilder>,
    aliases: Vec<(String, String)>,
    globals: Vec<(String, String)>,
    constants: Vec<(String, String)>,
}

impl EnvironmentBuilder {
    /// An empty builder without the core classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with the builtin core classes.
    pub fn with_core() -> Self {
        crate::sig::core::add_core(Self::new())
    }

    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Declare (or reopen) a class. `header` is `Name` or `Name[T, ...]`.
    pub fn class(mut self, header: &str, f: impl FnOnce(DeclBuilder) -> DeclBuilder) -> Self {
        self.decls.push(f(DeclBuilder::new(header, DeclKind::Class)));
        self
    }

    pub fn module(mut self, header: &str, f: impl FnOnce(DeclBuilder) -> DeclBuilder) -> Self {
        self.decls.push(f(DeclBuilder::new(header, DeclKind::Module)));
        self
    }

    /// Declare an interface; `header` must name a `_Interface`.
    pub fn interface(mut self, header: &str, f: impl FnOnce(DeclBuilder) -> DeclBuilder) -> Self {
        self.decls.push(f(DeclBuilder::new(header, DeclKind::Interface)));
        self
    }

    /// `type header = body`
    pub fn alias(mut self, header: &str, body: &str) -> Self {
        self.aliases.push((header.to_string(), body.to_string()));
        self
    }

    pub fn global(mut self, name: &str, ty: &str) -> Self {
        self.globals.push((name.to_string(), ty.to_string()));
        self
    }

    pub fn constant(mut self, name: &str, ty: &str) -> Self {
        self.constants.push((name.to_string(), ty.to_string()));
        self
    }

    /// Parse and validate every declaration.
    pub fn build(self) -> Result<Environment, SigError> {
        let mut env = Environment {
            generation: self.generation,
            ..Environment::default()
        };

        // Headers first so bodies can refer to any declared name.
        for decl in &self.decls {
            let (name, type_params) = header(&decl.header)?;
            match decl.kind {
                DeclKind::Interface => {
                    if env.interfaces.contains_key(&name) {
                        return Err(SigError::DuplicateDeclaration(name));
                    }
                    env.interfaces.insert(
                        name.clone(),
                        InterfaceDecl {
                            name,
                            type_params,
                            includes: Vec::new(),
                            methods: Vec::new(),
                        },
                    );
                }
                DeclKind::Class | DeclKind::Module => {
                    let kind = if decl.kind == DeclKind::Class {
                        ClassKind::Class
                    } else {
                        ClassKind::Module
                    };
                    if let Some(existing) = env.classes.get(&name) {
                        if existing.kind != kind {
                            return Err(SigError::DuplicateDeclaration(name));
                        }
                        continue;
                    }
                    env.classes.insert(
                        name.clone(),
                        ClassDecl {
                            name,
                            kind,
                            type_params,
                            superclass: None,
                            includes: Vec::new(),
                            prepends: Vec::new(),
                            extends: Vec::new(),
                            self_types: Vec::new(),
                            instance_methods: Vec::new(),
                            singleton_methods: Vec::new(),
                            ivars: Vec::new(),
                            singleton_ivars: Vec::new(),
                            cvars: Vec::new(),
                        },
                    );
                }
            }
        }
        for (head, _) in &self.aliases {
            let (name, type_params) = header(head)?;
            if env.aliases.contains_key(&name) {
                return Err(SigError::DuplicateDeclaration(name));
            }
            env.aliases.insert(
                name.clone(),
                AliasDecl {
                    name,
                    type_params,
                    ty: Type::Any,
                },
            );
        }

        for (head, body) in &self.aliases {
            let (name, type_params) = header(head)?;
            let vars = param_names(&type_params);
            let ty = parse_in(body, &vars, head)?;
            if let Some(alias) = env.aliases.get_mut(&name) {
                alias.ty = ty;
            }
        }
        for (name, ty) in &self.globals {
            let ty = parse_in(ty, &[], name)?;
            env.globals.insert(name.clone(), ty);
        }
        for (name, ty) in &self.constants {
            let ty = parse_in(ty, &[], name)?;
            env.constants.insert(name.trim_start_matches("::").to_string(), ty);
        }

        for decl in &self.decls {
            let (name, _) = header(&decl.header)?;
            let type_params = env.type_params(&name).map(|p| p.to_vec()).unwrap_or_default();
            let vars = param_names(&type_params);
            let members = DeclMembers::parse(decl, &vars, &name)?;
            match decl.kind {
                DeclKind::Interface => {
                    if let Some(iface) = env.interfaces.get_mut(&name) {
                        iface.includes.extend(members.includes);
                        merge_methods(&mut iface.methods, members.instance_methods);
                    }
                }
                DeclKind::Class | DeclKind::Module => {
                    if let Some(class) = env.classes.get_mut(&name) {
                        if members.superclass.is_some() {
                            class.superclass = members.superclass;
                        }
                        class.includes.extend(members.includes);
                        class.prepends.extend(members.prepends);
                        class.extends.extend(members.extends);
                        class.self_types.extend(members.self_types);
                        merge_methods(&mut class.instance_methods, members.instance_methods);
                        merge_methods(&mut class.singleton_methods, members.singleton_methods);
                        class.ivars.extend(members.ivars);
                        class.singleton_ivars.extend(members.singleton_ivars);
                        class.cvars.extend(members.cvars);
                    }
                }
            }
        }

        validate(&env)?;
        Ok(env)
    }
}

fn header(text: &str) -> Result<(String, Vec<TypeParam>), SigError> {
    let (name, params) = parse_decl_header(text).map_err(|source| SigError::Parse {
        context: "declaration".to_string(),
        text: text.to_string(),
        source,
    })?;
    Ok((name.trim_start_matches("::").to_string(), params))
}

fn param_names(params: &[TypeParam]) -> Vec<String> {
    params.iter().map(|p| p.name.clone()).collect()
}

fn parse_in(text: &str, vars: &[String], context: &str) -> Result<Type, SigError> {
    parse_type_with_vars(text, vars).map_err(|source| SigError::Parse {
        context: context.to_string(),
        text: text.to_string(),
        source,
    })
}

fn parse_ref(text: &str, vars: &[String], context: &str) -> Result<TypeRef, SigError> {
    match parse_in(text, vars, context)? {
        Type::Instance(name, args) | Type::Interface(name, args) => Ok(TypeRef { name, args }),
        _ => Err(SigError::Parse {
            context: context.to_string(),
            text: text.to_string(),
            source: crate::parse::ParseError {
                message: "expected a class or module name".to_string(),
                offset: 0,
            },
        }),
    }
}

/// Later declarations of a method replace earlier ones.
fn merge_methods(into: &mut Vec<MethodDecl>, methods: Vec<MethodDecl>) {
    for m in methods {
        if let Some(existing) = into.iter_mut().find(|e| e.name == m.name) {
            *existing = m;
        } else {
            into.push(m);
        }
    }
}

struct DeclMembers {
    superclass: Option<TypeRef>,
    includes: Vec<TypeRef>,
    prepends: Vec<TypeRef>,
    extends: Vec<TypeRef>,
    self_types: Vec<Type>,
    instance_methods: Vec<MethodDecl>,
    singleton_methods: Vec<MethodDecl>,
    ivars: Vec<(String, Type)>,
    singleton_ivars: Vec<(String, Type)>,
    cvars: Vec<(String, Type)>,
}

impl DeclMembers {
    fn parse(decl: &DeclBuilder, vars: &[String], owner: &str) -> Result<Self, SigError> {
        let refs = |texts: &[String]| -> Result<Vec<TypeRef>, SigError> {
            texts.iter().map(|t| parse_ref(t, vars, owner)).collect()
        };
        let typed = |pairs: &[(String, String)], vars: &[String]| -> Result<Vec<(String, Type)>, SigError> {
            pairs
                .iter()
                .map(|(n, t)| Ok((n.clone(), parse_in(t, vars, owner)?)))
                .collect()
        };
        let mut instance_methods = Vec::new();
        let mut singleton_methods = Vec::new();
        for spec in &decl.methods {
            // Singleton methods cannot see the class's type parameters.
            let scope: &[String] = if spec.singleton { &[] } else { vars };
            let context = format!("{}#{}", owner, spec.name);
            let overloads = parse_overloads(&spec.text, scope).map_err(|source| SigError::Parse {
                context,
                text: spec.text.clone(),
                source,
            })?;
            let method = MethodDecl {
                name: spec.name.clone(),
                overloads,
                visibility: spec.visibility,
                pure: spec.pure,
            };
            if spec.singleton {
                merge_methods(&mut singleton_methods, vec![method]);
            } else {
                merge_methods(&mut instance_methods, vec![method]);
            }
        }
        Ok(DeclMembers {
            superclass: decl.superclass.as_deref().map(|s| parse_ref(s, vars, owner)).transpose()?,
            includes: refs(&decl.includes)?,
            prepends: refs(&decl.prepends)?,
            extends: refs(&decl.extends)?,
            self_types: decl
                .self_types
                .iter()
                .map(|t| parse_in(t, vars, owner))
                .collect::<Result<_, _>>()?,
            instance_methods,
            singleton_methods,
            ivars: typed(&decl.ivars, vars)?,
            singleton_ivars: typed(&decl.singleton_ivars, &[])?,
            cvars: typed(&decl.cvars, &[])?,
        })
    }
}

fn validate_method(env: &Environment, m: &MethodDecl) -> Result<(), SigError> {
    for mt in &m.overloads {
        let mut result = Ok(());
        mt.map_types(&mut |t| {
            if result.is_ok() {
                result = env.validate_type(t);
            }
            t.clone()
        });
        result?;
    }
    Ok(())
}

fn validate(env: &Environment) -> Result<(), SigError> {
    let mut names: Vec<&String> = env.classes.keys().collect();
    names.sort();
    for name in names {
        let class = &env.classes[name];
        if let Some(sup) = &class.superclass {
            if env.is_module(&sup.name) {
                return Err(SigError::ModuleAsSuperclass(sup.name.clone()));
            }
            env.validate_type(&Type::Instance(sup.name.clone(), sup.args.clone()))?;
        }
        for r in class.includes.iter().chain(&class.prepends).chain(&class.extends) {
            if env.is_class(&r.name) {
                return Err(SigError::ClassAsMixin(r.name.clone()));
            }
            env.validate_type(&Type::Instance(r.name.clone(), r.args.clone()))?;
        }
        for m in class.instance_methods.iter().chain(&class.singleton_methods) {
            validate_method(env, m)?;
        }
        for (_, t) in class.ivars.iter().chain(&class.singleton_ivars).chain(&class.cvars) {
            env.validate_type(t)?;
        }
        for t in &class.self_types {
            env.validate_type(t)?;
        }
    }
    for iface in env.interfaces.values() {
        for m in &iface.methods {
            validate_method(env, m)?;
        }
    }
    for alias in env.aliases.values() {
        env.validate_type(&alias.ty)?;
    }
    for t in env.globals.values().chain(env.constants.values()) {
        env.validate_type(t)?;
    }
    check_superclass_cycles(env)
}

fn check_superclass_cycles(env: &Environment) -> Result<(), SigError> {
    let mut done: FxHashMap<&str, ()> = FxHashMap::default();
    for name in env.classes.keys() {
        let mut seen: Vec<String> = Vec::new();
        let mut current = Some(name.clone());
        while let Some(n) = current {
            if done.contains_key(n.as_str()) {
                break;
            }
            if seen.contains(&n) {
                return Err(SigError::CyclicAncestors(n));
            }
            seen.push(n.clone());
            current = env.superclass(&n).map(|r| r.name);
        }
        done.insert(name.as_str(), ());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_generic_class() {
        let env = EnvironmentBuilder::new()
            .class("BasicObject", |c| c)
            .class("Object", |c| c.superclass("BasicObject"))
            .class("Integer", |c| c)
            .class("Box[out T]", |c| c.attr_reader("value", "T").method("map", "[U] () { (T) -> U } -> Box[U]"))
            .build()
            .unwrap();
        let decl = env.class("Box").unwrap();
        assert_eq!(decl.type_params.len(), 1);
        assert_eq!(decl.ivars, vec![("@value".to_string(), Type::var("T"))]);
        let map = decl.instance_method("map").unwrap();
        assert_eq!(map.overloads[0].func.ret, Type::generic("Box", vec![Type::var("U")]));
        assert!(decl.instance_method("value").unwrap().pure);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = EnvironmentBuilder::new()
            .class("Foo", |c| c.method("bar", "() -> Missing"))
            .build()
            .unwrap_err();
        assert_eq!(err, SigError::UnknownType("Missing".to_string()));
    }

    #[test]
    fn type_argument_counts_are_checked() {
        let err = EnvironmentBuilder::new()
            .class("Box[T]", |c| c)
            .class("Foo", |c| c.method("bar", "() -> Box"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SigError::TypeArityMismatch { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn cyclic_superclasses() {
        let err = EnvironmentBuilder::new()
            .class("A", |c| c.superclass("B"))
            .class("B", |c| c.superclass("A"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SigError::CyclicAncestors(_)));
    }

    #[test]
    fn reopened_class_merges() {
        let env = EnvironmentBuilder::new()
            .class("Foo", |c| c.method("a", "() -> nil"))
            .class("Foo", |c| c.method("b", "() -> nil").method("a", "() -> bool"))
            .build()
            .unwrap();
        let foo = env.class("Foo").unwrap();
        assert_eq!(foo.instance_methods.len(), 2);
        assert_eq!(foo.instance_method("a").unwrap().overloads[0].func.ret, Type::Bool);
    }

    #[test]
    fn parse_errors_name_their_context() {
        let err = EnvironmentBuilder::new()
            .class("Foo", |c| c.method("bar", "(Integer -> nil"))
            .build()
            .unwrap_err();
        match err {
            SigError::Parse { context, .. } => assert_eq!(context, "Foo#bar"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recursive_alias() {
        let env = EnvironmentBuilder::new()
            .class("Integer", |c| c)
            .alias("list[T]", "nil | [T, list[T]]")
            .build()
            .unwrap();
        let expanded = env.expand_alias("list", &[Type::integer()]).unwrap();
        assert_eq!(
            expanded,
            Type::union(vec![
                Type::Nil,
                Type::Tuple(vec![Type::integer(), Type::Alias("list".into(), vec![Type::integer()])])
            ])
        );
    }
}

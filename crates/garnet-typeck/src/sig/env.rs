//! The immutable environment snapshot.

use rustc_hash::FxHashMap;

use crate::method_type::{MethodType, TypeParam, Variance};
use crate::sig::SigError;
use crate::subst::Substitution;
use crate::ty::{Type, TypeName};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

/// One declared method: an ordered overload list.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub overloads: Vec<MethodType>,
    pub visibility: Visibility,
    /// Side-effect free; repeated calls may share a narrowed type.
    pub pure: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Module,
}

/// A reference to a module or class with type arguments, as written in
/// `include`, `extend` and superclass positions.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub name: TypeName,
    pub args: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub name: TypeName,
    pub kind: ClassKind,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<TypeRef>,
    pub includes: Vec<TypeRef>,
    pub prepends: Vec<TypeRef>,
    pub extends: Vec<TypeRef>,
    /// Module self-type constraints (`module M : _Each[T]`).
    pub self_types: Vec<Type>,
    pub instance_methods: Vec<MethodDecl>,
    pub singleton_methods: Vec<MethodDecl>,
    pub ivars: Vec<(String, Type)>,
    /// Instance variables of the class object itself.
    pub singleton_ivars: Vec<(String, Type)>,
    pub cvars: Vec<(String, Type)>,
}

impl ClassDecl {
    pub fn is_module(&self) -> bool {
        self.kind == ClassKind::Module
    }

    pub fn instance_method(&self, name: &str) -> Option<&MethodDecl> {
        self.instance_methods.iter().find(|m| m.name == name)
    }

    pub fn singleton_method(&self, name: &str) -> Option<&MethodDecl> {
        self.singleton_methods.iter().find(|m| m.name == name)
    }

    /// The instance type with the declared type parameters as arguments.
    pub fn self_instance_type(&self) -> Type {
        Type::Instance(self.name.clone(), self.type_params.iter().map(|p| Type::Var(p.var())).collect())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub includes: Vec<TypeRef>,
    pub methods: Vec<MethodDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AliasDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub ty: Type,
}

/// A loaded signature environment.
///
/// Built once by [`EnvironmentBuilder`](crate::sig::EnvironmentBuilder) and
/// never mutated afterwards; share it behind an `Arc`. `generation`
/// distinguishes reloads so caches keyed on it stay valid.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub(crate) generation: u64,
    pub(crate) classes: FxHashMap<TypeName, ClassDecl>,
    pub(crate) interfaces: FxHashMap<TypeName, InterfaceDecl>,
    pub(crate) aliases: FxHashMap<TypeName, AliasDecl>,
    pub(crate) globals: FxHashMap<String, Type>,
    pub(crate) constants: FxHashMap<TypeName, Type>,
}

/// Upper bound on nested alias expansion; recursive aliases unfold lazily
/// one level at a time, so hitting this means an alias expands only to
/// itself.
const ALIAS_EXPANSION_LIMIT: usize = 32;

impl Environment {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces.get(name)
    }

    pub fn alias(&self, name: &str) -> Option<&AliasDecl> {
        self.aliases.get(name)
    }

    pub fn global(&self, name: &str) -> Option<&Type> {
        self.globals.get(name)
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.get(name).is_some_and(|c| c.kind == ClassKind::Class)
    }

    pub fn is_module(&self, name: &str) -> bool {
        self.classes.get(name).is_some_and(|c| c.kind == ClassKind::Module)
    }

    /// Class and module names, sorted.
    pub fn class_names(&self) -> Vec<&TypeName> {
        let mut names: Vec<&TypeName> = self.classes.keys().collect();
        names.sort();
        names
    }

    /// Declared type parameters of a class, interface or alias.
    pub fn type_params(&self, name: &str) -> Option<&[TypeParam]> {
        if let Some(c) = self.classes.get(name) {
            return Some(&c.type_params);
        }
        if let Some(i) = self.interfaces.get(name) {
            return Some(&i.type_params);
        }
        self.aliases.get(name).map(|a| a.type_params.as_slice())
    }

    /// Declared variance of each type parameter of `name`; empty for
    /// unknown names.
    pub fn variances(&self, name: &str) -> Vec<Variance> {
        self.type_params(name)
            .map(|ps| ps.iter().map(|p| p.variance).collect())
            .unwrap_or_default()
    }

    /// The superclass reference of a class (`Object` when undeclared), or
    /// `None` for `BasicObject` and modules.
    pub fn superclass(&self, name: &str) -> Option<TypeRef> {
        let decl = self.classes.get(name)?;
        if decl.kind == ClassKind::Module || name == "BasicObject" {
            return None;
        }
        Some(decl.superclass.clone().unwrap_or(TypeRef {
            name: "Object".to_string(),
            args: Vec::new(),
        }))
    }

    /// Expand one level of alias `name[args]`.
    pub fn expand_alias(&self, name: &str, args: &[Type]) -> Result<Type, SigError> {
        let decl = self.aliases.get(name).ok_or_else(|| SigError::UnknownType(name.to_string()))?;
        if decl.type_params.len() != args.len() {
            return Err(SigError::TypeArityMismatch {
                name: name.to_string(),
                expected: decl.type_params.len(),
                actual: args.len(),
            });
        }
        let s = Substitution::build(decl.type_params.iter().map(TypeParam::var).collect(), args.to_vec());
        Ok(decl.ty.subst(&s))
    }

    /// Expand aliases at the head of `ty` until it is not an alias.
    pub fn expand_alias_head(&self, ty: &Type) -> Result<Type, SigError> {
        let mut current = ty.clone();
        for _ in 0..ALIAS_EXPANSION_LIMIT {
            match current {
                Type::Alias(ref name, ref args) => current = self.expand_alias(name, args)?,
                other => return Ok(other),
            }
        }
        match ty {
            Type::Alias(name, _) => Err(SigError::CyclicAlias(name.clone())),
            other => Ok(other.clone()),
        }
    }

    /// Resolve constant `name` (possibly `A::B`) from within `nesting`
    /// (innermost first), returning the absolute name and its type.
    pub fn resolve_constant(&self, name: &str, nesting: &[TypeName]) -> Option<(TypeName, Type)> {
        let candidates = nesting
            .iter()
            .map(|outer| format!("{}::{}", outer, name))
            .chain(std::iter::once(name.to_string()));
        for candidate in candidates {
            if let Some(ty) = self.constant_type(&candidate) {
                return Some((candidate, ty));
            }
        }
        // Constants inherited through the superclass chain of the innermost
        // enclosing class.
        let mut current = nesting.first().cloned();
        while let Some(owner) = current {
            let candidate = format!("{}::{}", owner, name);
            if let Some(ty) = self.constant_type(&candidate) {
                return Some((candidate, ty));
            }
            current = self.superclass(&owner).map(|r| r.name);
        }
        None
    }

    /// The type of an absolute constant: a declared constant, or the
    /// singleton of a class/module.
    pub fn constant_type(&self, name: &str) -> Option<Type> {
        if let Some(ty) = self.constants.get(name) {
            return Some(ty.clone());
        }
        self.classes.get(name).map(|_| Type::Singleton(name.to_string()))
    }

    /// Check that every name in `ty` is declared and applied to the right
    /// number of type arguments.
    pub fn validate_type(&self, ty: &Type) -> Result<(), SigError> {
        let check = |name: &str, args: &[Type], params: Option<&[TypeParam]>| match params {
            None => Err(SigError::UnknownType(name.to_string())),
            Some(ps) if ps.len() != args.len() => Err(SigError::TypeArityMismatch {
                name: name.to_string(),
                expected: ps.len(),
                actual: args.len(),
            }),
            Some(_) => Ok(()),
        };
        match ty {
            Type::Instance(name, args) => check(name, args, self.classes.get(name).map(|c| c.type_params.as_slice()))?,
            Type::Interface(name, args) => {
                check(name, args, self.interfaces.get(name).map(|c| c.type_params.as_slice()))?
            }
            Type::Alias(name, args) => check(name, args, self.aliases.get(name).map(|c| c.type_params.as_slice()))?,
            Type::Singleton(name) => {
                if !self.classes.contains_key(name) {
                    return Err(SigError::UnknownType(name.clone()));
                }
            }
            _ => {}
        }
        let mut result = Ok(());
        ty.map_children(&mut |child| {
            if result.is_ok() {
                result = self.validate_type(child);
            }
            child.clone()
        });
        result
    }
}

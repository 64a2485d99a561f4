//! Type representation for the Garnet checker.
//!
//! `Type` is an immutable value with structural equality. Unions and
//! intersections are only ever built through [`Type::union`] and
//! [`Type::intersection`], which keep them normalized: flattened,
//! deduplicated, and collapsed when degenerate.

use std::fmt;

use crate::method_type::ProcType;

/// An absolute type name without the leading `::` (`"Integer"`, `"Foo::Bar"`).
pub type TypeName = String;

/// A value usable as a literal type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Literal {
    Int(i64),
    Str(String),
    Sym(String),
    True,
    False,
}

impl Literal {
    /// The class whose instances this literal belongs to.
    pub fn class_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "Integer",
            Literal::Str(_) => "String",
            Literal::Sym(_) => "Symbol",
            Literal::True => "TrueClass",
            Literal::False => "FalseClass",
        }
    }

    /// The nominal type this literal widens to.
    pub fn base_type(&self) -> Type {
        match self {
            Literal::True | Literal::False => Type::Bool,
            other => Type::instance(other.class_name()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Sym(s) => {
                if s.chars().all(|c| c.is_alphanumeric() || c == '_') && !s.is_empty() {
                    write!(f, ":{}", s)
                } else {
                    write!(f, ":{:?}", s)
                }
            }
            Literal::True => write!(f, "true"),
            Literal::False => write!(f, "false"),
        }
    }
}

/// A type variable.
///
/// Variables with `id == 0` are the ones written in declarations (`T` of
/// `Array[T]`, `A` of `[A] (A) -> A`). Instantiating a generic method type
/// replaces them with fresh variables carrying a non-zero id, so two
/// instantiations of the same signature never share variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVar {
    pub name: String,
    pub id: u32,
}

impl TypeVar {
    pub fn named(name: impl Into<String>) -> Self {
        TypeVar { name: name.into(), id: 0 }
    }

    pub fn is_fresh(&self) -> bool {
        self.id != 0
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Generator for fresh type variables, owned by one file check.
#[derive(Debug, Default)]
pub struct FreshVars {
    next: u32,
}

impl FreshVars {
    pub fn new() -> Self {
        FreshVars { next: 0 }
    }

    pub fn fresh(&mut self, name: &str) -> TypeVar {
        self.next += 1;
        TypeVar {
            name: name.to_string(),
            id: self.next,
        }
    }
}

/// A record field key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Sym(String),
    Str(String),
    Int(i64),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Sym(s) => write!(f, "{}:", s),
            RecordKey::Str(s) => write!(f, "{:?} =>", s),
            RecordKey::Int(i) => write!(f, "{} =>", i),
        }
    }
}

impl RecordKey {
    pub fn key_type(&self) -> Type {
        match self {
            RecordKey::Sym(s) => Type::Literal(Literal::Sym(s.clone())),
            RecordKey::Str(s) => Type::Literal(Literal::Str(s.clone())),
            RecordKey::Int(i) => Type::Literal(Literal::Int(*i)),
        }
    }
}

/// A Garnet type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// `untyped`: the gradual escape hatch, compatible both ways.
    Any,
    /// `void`: a value that must not be used.
    Void,
    /// `top`: supertype of everything.
    Top,
    /// `bot`: the type of expressions that never produce a value.
    Bot,
    /// `nil`.
    Nil,
    /// `bool`: `true | false`.
    Bool,
    /// An instance of a class or module: `::Array[::Integer]`.
    Instance(TypeName, Vec<Type>),
    /// The class or module object itself: `singleton(::String)`.
    Singleton(TypeName),
    /// A structural interface: `::_Each[::Integer]`.
    Interface(TypeName, Vec<Type>),
    /// A reference to a (possibly recursive) type alias, expanded on demand.
    Alias(TypeName, Vec<Type>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Tuple(Vec<Type>),
    Record(Vec<(RecordKey, Type)>),
    Literal(Literal),
    Proc(Box<ProcType>),
    Var(TypeVar),
    SelfType,
    InstanceType,
    ClassType,
}

impl Type {
    pub fn instance(name: &str) -> Type {
        Type::Instance(name.to_string(), Vec::new())
    }

    pub fn generic(name: &str, args: Vec<Type>) -> Type {
        Type::Instance(name.to_string(), args)
    }

    pub fn singleton(name: &str) -> Type {
        Type::Singleton(name.to_string())
    }

    pub fn var(name: &str) -> Type {
        Type::Var(TypeVar::named(name))
    }

    pub fn integer() -> Type {
        Type::instance("Integer")
    }

    pub fn float() -> Type {
        Type::instance("Float")
    }

    pub fn string() -> Type {
        Type::instance("String")
    }

    pub fn symbol() -> Type {
        Type::instance("Symbol")
    }

    pub fn object() -> Type {
        Type::instance("Object")
    }

    pub fn regexp() -> Type {
        Type::instance("Regexp")
    }

    pub fn array(elem: Type) -> Type {
        Type::generic("Array", vec![elem])
    }

    pub fn hash(key: Type, value: Type) -> Type {
        Type::generic("Hash", vec![key, value])
    }

    pub fn range(elem: Type) -> Type {
        Type::generic("Range", vec![elem])
    }

    pub fn int_lit(i: i64) -> Type {
        Type::Literal(Literal::Int(i))
    }

    pub fn str_lit(s: &str) -> Type {
        Type::Literal(Literal::Str(s.to_string()))
    }

    pub fn sym_lit(s: &str) -> Type {
        Type::Literal(Literal::Sym(s.to_string()))
    }

    /// `T?`: `T | nil`.
    pub fn optional(ty: Type) -> Type {
        Type::union(vec![ty, Type::Nil])
    }

    /// Build a normalized union.
    ///
    /// Nested unions are flattened, duplicates and `bot` members dropped,
    /// literals absorbed by their base class when both are present,
    /// `true | false` folded to `bool`. `untyped` or `top` anywhere absorbs
    /// the whole union. Zero members is `bot`, one member is that member.
    pub fn union(types: Vec<Type>) -> Type {
        let mut members: Vec<Type> = Vec::with_capacity(types.len());
        let mut stack: Vec<Type> = types.into_iter().rev().collect();
        while let Some(ty) = stack.pop() {
            match ty {
                Type::Union(inner) => stack.extend(inner.into_iter().rev()),
                Type::Bot => {}
                Type::Any => return Type::Any,
                Type::Top => return Type::Top,
                other => {
                    if !members.contains(&other) {
                        members.push(other);
                    }
                }
            }
        }

        let has_true = members.contains(&Type::Literal(Literal::True));
        let has_false = members.contains(&Type::Literal(Literal::False));
        if has_true && has_false && !members.contains(&Type::Bool) {
            let pos = members
                .iter()
                .position(|t| matches!(t, Type::Literal(Literal::True | Literal::False)))
                .unwrap_or(0);
            members.insert(pos, Type::Bool);
        }
        let widened: Vec<Type> = members
            .iter()
            .filter(|t| !matches!(t, Type::Literal(_)))
            .cloned()
            .collect();
        members.retain(|t| match t {
            Type::Literal(lit) => !widened.contains(&lit.base_type()),
            _ => true,
        });

        match members.len() {
            0 => Type::Bot,
            1 => members.pop().unwrap_or(Type::Bot),
            _ => Type::Union(members),
        }
    }

    /// Build a normalized intersection. Zero members is `top`.
    pub fn intersection(types: Vec<Type>) -> Type {
        let mut members: Vec<Type> = Vec::with_capacity(types.len());
        let mut stack: Vec<Type> = types.into_iter().rev().collect();
        while let Some(ty) = stack.pop() {
            match ty {
                Type::Intersection(inner) => stack.extend(inner.into_iter().rev()),
                Type::Top => {}
                Type::Bot => return Type::Bot,
                Type::Any => return Type::Any,
                other => {
                    if !members.contains(&other) {
                        members.push(other);
                    }
                }
            }
        }
        match members.len() {
            0 => Type::Top,
            1 => members.pop().unwrap_or(Type::Top),
            _ => Type::Intersection(members),
        }
    }

    /// Members of a union, or the type itself.
    pub fn union_members(&self) -> Vec<Type> {
        match self {
            Type::Union(ms) => ms.clone(),
            Type::Bot => Vec::new(),
            other => vec![other.clone()],
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Type::Bot)
    }

    pub fn is_nil(&self) -> bool {
        match self {
            Type::Nil => true,
            Type::Instance(name, _) => name == "NilClass",
            _ => false,
        }
    }

    /// Whether `nil` is one of the union members.
    pub fn is_optional(&self) -> bool {
        match self {
            Type::Union(ms) => ms.iter().any(Type::is_nil),
            _ => false,
        }
    }

    /// The type with `nil` removed from its union members.
    pub fn without_nil(&self) -> Type {
        match self {
            Type::Union(ms) => Type::union(ms.iter().filter(|t| !t.is_nil()).cloned().collect()),
            t if t.is_nil() => Type::Bot,
            other => other.clone(),
        }
    }

    /// Whether a value of this type can be falsy (`nil` or `false`).
    pub fn may_be_falsy(&self) -> bool {
        match self {
            Type::Nil | Type::Bool | Type::Any | Type::Top | Type::Void => true,
            Type::Literal(Literal::False) => true,
            Type::Instance(name, _) => name == "NilClass" || name == "FalseClass" || name == "Object" || name == "BasicObject",
            Type::Union(ms) => ms.iter().any(Type::may_be_falsy),
            Type::Var(_) | Type::SelfType | Type::InstanceType | Type::Alias(..) | Type::Interface(..) => true,
            _ => false,
        }
    }

    /// The truthy part of this type: `nil` and `false` removed.
    pub fn truthy_part(&self) -> Type {
        match self {
            Type::Nil | Type::Literal(Literal::False) => Type::Bot,
            Type::Bool => Type::Literal(Literal::True),
            Type::Instance(name, _) if name == "NilClass" || name == "FalseClass" => Type::Bot,
            Type::Union(ms) => Type::union(ms.iter().map(Type::truthy_part).collect()),
            other => other.clone(),
        }
    }

    /// The falsy part of this type: what remains when only `nil`/`false`
    /// values are kept.
    pub fn falsy_part(&self) -> Type {
        match self {
            Type::Nil | Type::Literal(Literal::False) => self.clone(),
            Type::Bool => Type::Literal(Literal::False),
            Type::Instance(name, _) if name == "NilClass" => Type::Nil,
            Type::Instance(name, _) if name == "FalseClass" => Type::Literal(Literal::False),
            Type::Union(ms) => Type::union(ms.iter().map(Type::falsy_part).collect()),
            Type::Any => Type::Any,
            t if t.may_be_falsy() => Type::union(vec![Type::Nil, Type::Literal(Literal::False)]),
            _ => Type::Bot,
        }
    }

    /// Replace literal types with their nominal classes.
    pub fn widen_literals(&self) -> Type {
        match self {
            Type::Literal(lit) => lit.base_type(),
            Type::Union(ms) => Type::union(ms.iter().map(Type::widen_literals).collect()),
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(Type::widen_literals).collect()),
            other => other.clone(),
        }
    }

    /// All type variables occurring in this type, in first-occurrence order.
    pub fn free_variables(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        self.collect_free_variables(&mut out);
        out
    }

    pub(crate) fn collect_free_variables(&self, out: &mut Vec<TypeVar>) {
        match self {
            Type::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Type::Instance(_, args) | Type::Interface(_, args) | Type::Alias(_, args) => {
                for a in args {
                    a.collect_free_variables(out);
                }
            }
            Type::Union(ms) | Type::Intersection(ms) | Type::Tuple(ms) => {
                for m in ms {
                    m.collect_free_variables(out);
                }
            }
            Type::Record(fields) => {
                for (_, t) in fields {
                    t.collect_free_variables(out);
                }
            }
            Type::Proc(proc_ty) => proc_ty.collect_free_variables(out),
            _ => {}
        }
    }

    /// Whether any of `self`, `instance` or `class` occur in this type.
    pub fn has_self_types(&self) -> bool {
        match self {
            Type::SelfType | Type::InstanceType | Type::ClassType => true,
            Type::Instance(_, args) | Type::Interface(_, args) | Type::Alias(_, args) => {
                args.iter().any(Type::has_self_types)
            }
            Type::Union(ms) | Type::Intersection(ms) | Type::Tuple(ms) => {
                ms.iter().any(Type::has_self_types)
            }
            Type::Record(fields) => fields.iter().any(|(_, t)| t.has_self_types()),
            Type::Proc(p) => p.has_self_types(),
            _ => false,
        }
    }

    /// Apply `f` to every immediate component type.
    pub fn map_children(&self, f: &mut dyn FnMut(&Type) -> Type) -> Type {
        match self {
            Type::Instance(name, args) => Type::Instance(name.clone(), args.iter().map(|a| f(a)).collect()),
            Type::Interface(name, args) => Type::Interface(name.clone(), args.iter().map(|a| f(a)).collect()),
            Type::Alias(name, args) => Type::Alias(name.clone(), args.iter().map(|a| f(a)).collect()),
            Type::Union(ms) => Type::union(ms.iter().map(|m| f(m)).collect()),
            Type::Intersection(ms) => Type::intersection(ms.iter().map(|m| f(m)).collect()),
            Type::Tuple(ms) => Type::Tuple(ms.iter().map(|m| f(m)).collect()),
            Type::Record(fields) => Type::Record(fields.iter().map(|(k, t)| (k.clone(), f(t))).collect()),
            Type::Proc(p) => Type::Proc(Box::new(p.map_types(f))),
            other => other.clone(),
        }
    }

    /// The class name used to look up methods on a value of this type, for
    /// the types that have a single nominal class.
    pub fn nominal_name(&self) -> Option<&str> {
        match self {
            Type::Instance(name, _) => Some(name),
            Type::Literal(lit) => Some(lit.class_name()),
            Type::Nil => Some("NilClass"),
            Type::Tuple(_) => Some("Array"),
            Type::Record(_) => Some("Hash"),
            Type::Proc(_) => Some("Proc"),
            _ => None,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, prec: u8) -> fmt::Result {
        match self {
            Type::Any => write!(f, "untyped"),
            Type::Void => write!(f, "void"),
            Type::Top => write!(f, "top"),
            Type::Bot => write!(f, "bot"),
            Type::Nil => write!(f, "nil"),
            Type::Bool => write!(f, "bool"),
            Type::SelfType => write!(f, "self"),
            Type::InstanceType => write!(f, "instance"),
            Type::ClassType => write!(f, "class"),
            Type::Instance(name, args) | Type::Interface(name, args) => {
                write!(f, "::{}", name)?;
                fmt_args(f, args)
            }
            Type::Alias(name, args) => {
                write!(f, "::{}", name)?;
                fmt_args(f, args)
            }
            Type::Singleton(name) => write!(f, "singleton(::{})", name),
            Type::Literal(lit) => write!(f, "{}", lit),
            Type::Var(v) => write!(f, "{}", v),
            Type::Tuple(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    e.fmt_prec(f, 0)?;
                }
                write!(f, "]")
            }
            Type::Record(fields) => {
                write!(f, "{{ ")?;
                for (i, (k, t)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} ", k)?;
                    t.fmt_prec(f, 0)?;
                }
                write!(f, " }}")
            }
            Type::Union(ms) => {
                if prec > 0 {
                    write!(f, "(")?;
                }
                for (i, m) in ms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    m.fmt_prec(f, 1)?;
                }
                if prec > 0 {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Type::Intersection(ms) => {
                if prec > 1 {
                    write!(f, "(")?;
                }
                for (i, m) in ms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    m.fmt_prec(f, 2)?;
                }
                if prec > 1 {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Type::Proc(p) => {
                if prec > 0 {
                    write!(f, "(^{})", p)
                } else {
                    write!(f, "^{}", p)
                }
            }
        }
    }
}

fn fmt_args(f: &mut fmt::Formatter<'_>, args: &[Type]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    write!(f, "[")?;
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        a.fmt_prec(f, 0)?;
    }
    write!(f, "]")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

/// Display helper used inside larger type expressions (method params).
pub(crate) struct Nested<'a>(pub &'a Type);

impl fmt::Display for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_prec(f, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_dedupes() {
        let t = Type::union(vec![
            Type::integer(),
            Type::union(vec![Type::string(), Type::integer()]),
            Type::Bot,
        ]);
        assert_eq!(t, Type::Union(vec![Type::integer(), Type::string()]));
    }

    #[test]
    fn degenerate_unions() {
        assert_eq!(Type::union(vec![]), Type::Bot);
        assert_eq!(Type::union(vec![Type::integer()]), Type::integer());
        assert_eq!(Type::union(vec![Type::integer(), Type::Any]), Type::Any);
        assert_eq!(Type::intersection(vec![]), Type::Top);
        assert_eq!(Type::intersection(vec![Type::string(), Type::Top]), Type::string());
    }

    #[test]
    fn literal_widening_in_union() {
        let t = Type::union(vec![Type::int_lit(1), Type::integer(), Type::str_lit("a")]);
        assert_eq!(t, Type::Union(vec![Type::integer(), Type::str_lit("a")]));
        let b = Type::union(vec![Type::Literal(Literal::True), Type::Literal(Literal::False)]);
        assert_eq!(b, Type::Bool);
    }

    #[test]
    fn nil_helpers() {
        let t = Type::optional(Type::integer());
        assert!(t.is_optional());
        assert_eq!(t.without_nil(), Type::integer());
        assert_eq!(Type::Nil.without_nil(), Type::Bot);
        assert_eq!(t.truthy_part(), Type::integer());
        assert_eq!(t.falsy_part(), Type::Nil);
    }

    #[test]
    fn display() {
        insta::assert_snapshot!(Type::optional(Type::integer()), @"::Integer | nil");
        insta::assert_snapshot!(
            Type::hash(Type::symbol(), Type::array(Type::var("T"))),
            @"::Hash[::Symbol, ::Array[T]]"
        );
        insta::assert_snapshot!(
            Type::intersection(vec![Type::union(vec![Type::integer(), Type::string()]), Type::Interface("_ToS".into(), vec![])]),
            @"(::Integer | ::String) & ::_ToS"
        );
        insta::assert_snapshot!(
            Type::Record(vec![(RecordKey::Sym("a".into()), Type::integer()), (RecordKey::Str("b".into()), Type::sym_lit("x"))]),
            @r#"{ a: ::Integer, "b" => :x }"#
        );
        insta::assert_snapshot!(Type::Tuple(vec![Type::int_lit(1), Type::singleton("String")]), @"[1, singleton(::String)]");
    }

    #[test]
    fn free_variables_in_order() {
        let t = Type::hash(Type::var("K"), Type::union(vec![Type::var("V"), Type::var("K")]));
        let names: Vec<String> = t.free_variables().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["K", "V"]);
    }

    #[test]
    fn fresh_vars_are_distinct() {
        let mut gen = FreshVars::new();
        let a = gen.fresh("A");
        let b = gen.fresh("A");
        assert_ne!(a, b);
        assert!(a.is_fresh());
        assert!(!TypeVar::named("A").is_fresh());
    }
}

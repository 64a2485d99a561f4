//! Type errors reported by the checker.
//!
//! Every error is attached to exactly one syntax node. The `Display`
//! implementation gives the header line; subtyping traces, when present,
//! are rendered separately by the diagnostics module.

use std::fmt;

use garnet_syntax::NodeId;
use rowan::TextRange;

use crate::method_type::MethodType;
use crate::subtyping::Relation;
use crate::ty::{Nested, Type, TypeName};

/// A type error at a node.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeError {
    pub node: NodeId,
    pub range: TextRange,
    pub kind: TypeErrorKind,
}

impl TypeError {
    pub fn new(node: NodeId, range: TextRange, kind: TypeErrorKind) -> Self {
        TypeError { node, range, kind }
    }

    /// The diagnostic code, e.g. `"Ruby::NoMethod"`.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// The failing subtyping chain, outermost first, when the error has one.
    pub fn trace(&self) -> &[Relation] {
        self.kind.trace()
    }

    /// The one-line description.
    pub fn header_line(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// One case per diagnostic kind.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeErrorKind {
    // ── Assignment and declaration ─────────────────────────────────────
    IncompatibleAssignment {
        lhs_type: Type,
        rhs_type: Type,
        trace: Vec<Relation>,
    },
    FalseAssertion {
        assertion_type: Type,
        node_type: Type,
    },
    MultipleAssignmentConversionError {
        original: Type,
        returned: Type,
    },

    // ── Calls ──────────────────────────────────────────────────────────
    ArgumentTypeMismatch {
        expected: Type,
        actual: Type,
        trace: Vec<Relation>,
    },
    BlockTypeMismatch {
        expected: Type,
        actual: Type,
        trace: Vec<Relation>,
    },
    BlockBodyTypeMismatch {
        expected: Type,
        actual: Type,
        trace: Vec<Relation>,
    },
    InsufficientPositionalArguments {
        method_type: MethodType,
    },
    UnexpectedPositionalArgument {
        method_type: MethodType,
    },
    InsufficientKeywordArguments {
        method_type: MethodType,
        missing: Vec<String>,
    },
    UnexpectedKeywordArgument {
        method_type: MethodType,
        name: String,
    },
    UnexpectedSplat {
        ty: Type,
    },
    RequiredBlockMissing {
        method_type: MethodType,
    },
    UnexpectedBlockGiven {
        method_type: MethodType,
    },
    UnresolvedOverloading {
        receiver: Type,
        method: String,
        candidates: Vec<MethodType>,
    },
    UnexpectedYield,
    UnexpectedSuper {
        method: Option<String>,
    },

    // ── Lookup ─────────────────────────────────────────────────────────
    NoMethod {
        receiver: Type,
        method: String,
    },
    UnknownConstant {
        name: String,
    },
    UnknownInstanceVariable {
        name: String,
    },
    UnknownGlobalVariable {
        name: String,
    },
    UnknownClassVariable {
        name: String,
    },
    UnknownRecordKey {
        key: String,
    },
    UnknownTypeName {
        name: TypeName,
    },

    // ── Control flow ───────────────────────────────────────────────────
    ReturnTypeMismatch {
        expected: Type,
        actual: Type,
        trace: Vec<Relation>,
    },
    BreakTypeMismatch {
        expected: Type,
        actual: Type,
        trace: Vec<Relation>,
    },
    ImplicitBreakValueMismatch {
        expected: Type,
    },
    UnexpectedJump,
    UnexpectedJumpValue,
    UnreachableBranch,
    UnreachableValueBranch {
        ty: Type,
    },
    ElseOnExhaustiveCase {
        ty: Type,
    },

    // ── Method and module definitions ──────────────────────────────────
    MethodBodyTypeMismatch {
        method: String,
        expected: Type,
        actual: Type,
        trace: Vec<Relation>,
    },
    SetterBodyTypeMismatch {
        method: String,
        expected: Type,
        actual: Type,
        trace: Vec<Relation>,
    },
    MethodArityMismatch {
        method_type: MethodType,
    },
    MethodParameterMismatch {
        method_type: MethodType,
    },
    DifferentMethodParameterKind {
        method_type: MethodType,
    },
    MethodReturnTypeAnnotationMismatch {
        method_type: MethodType,
        annotation: Type,
    },
    MethodDefinitionMissing {
        module: TypeName,
        missing: Vec<String>,
    },
    UndeclaredMethodDefinition {
        type_name: TypeName,
        method: String,
    },
    MethodDefinitionInUndeclaredModule {
        module: String,
        method: String,
    },
    UnexpectedDynamicMethod {
        module: TypeName,
        method: String,
    },
    ClassModuleMismatch {
        name: TypeName,
    },

    // ── Generics ───────────────────────────────────────────────────────
    UnsatisfiableConstraint {
        var: String,
        lower: Type,
        upper: Type,
        method_type: MethodType,
    },
    InsufficientTypeArgument {
        method_type: MethodType,
        given: usize,
    },
    UnexpectedTypeArgument {
        method_type: MethodType,
        type_arg: Type,
    },
    TypeArgumentMismatchError {
        type_arg: Type,
        param: String,
        upper_bound: Type,
    },

    // ── Escape hatches and internals ───────────────────────────────────
    FallbackAny,
    UnannotatedEmptyCollection,
    UnsupportedSyntax {
        kind: String,
    },
    AnnotationSyntaxError {
        message: String,
    },
    UnexpectedError {
        message: String,
    },
}

impl TypeErrorKind {
    pub fn code(&self) -> &'static str {
        use TypeErrorKind::*;
        match self {
            IncompatibleAssignment { .. } => "Ruby::IncompatibleAssignment",
            FalseAssertion { .. } => "Ruby::FalseAssertion",
            MultipleAssignmentConversionError { .. } => "Ruby::MultipleAssignmentConversionError",
            ArgumentTypeMismatch { .. } => "Ruby::ArgumentTypeMismatch",
            BlockTypeMismatch { .. } => "Ruby::BlockTypeMismatch",
            BlockBodyTypeMismatch { .. } => "Ruby::BlockBodyTypeMismatch",
            InsufficientPositionalArguments { .. } => "Ruby::InsufficientPositionalArguments",
            UnexpectedPositionalArgument { .. } => "Ruby::UnexpectedPositionalArgument",
            InsufficientKeywordArguments { .. } => "Ruby::InsufficientKeywordArguments",
            UnexpectedKeywordArgument { .. } => "Ruby::UnexpectedKeywordArgument",
            UnexpectedSplat { .. } => "Ruby::UnexpectedSplat",
            RequiredBlockMissing { .. } => "Ruby::RequiredBlockMissing",
            UnexpectedBlockGiven { .. } => "Ruby::UnexpectedBlockGiven",
            UnresolvedOverloading { .. } => "Ruby::UnresolvedOverloading",
            UnexpectedYield => "Ruby::UnexpectedYield",
            UnexpectedSuper { .. } => "Ruby::UnexpectedSuper",
            NoMethod { .. } => "Ruby::NoMethod",
            UnknownConstant { .. } => "Ruby::UnknownConstant",
            UnknownInstanceVariable { .. } => "Ruby::UnknownInstanceVariable",
            UnknownGlobalVariable { .. } => "Ruby::UnknownGlobalVariable",
            UnknownClassVariable { .. } => "Ruby::UnknownClassVariable",
            UnknownRecordKey { .. } => "Ruby::UnknownRecordKey",
            UnknownTypeName { .. } => "RBS::UnknownTypeName",
            ReturnTypeMismatch { .. } => "Ruby::ReturnTypeMismatch",
            BreakTypeMismatch { .. } => "Ruby::BreakTypeMismatch",
            ImplicitBreakValueMismatch { .. } => "Ruby::ImplicitBreakValueMismatch",
            UnexpectedJump => "Ruby::UnexpectedJump",
            UnexpectedJumpValue => "Ruby::UnexpectedJumpValue",
            UnreachableBranch => "Ruby::UnreachableBranch",
            UnreachableValueBranch { .. } => "Ruby::UnreachableValueBranch",
            ElseOnExhaustiveCase { .. } => "Ruby::ElseOnExhaustiveCase",
            MethodBodyTypeMismatch { .. } => "Ruby::MethodBodyTypeMismatch",
            SetterBodyTypeMismatch { .. } => "Ruby::SetterBodyTypeMismatch",
            MethodArityMismatch { .. } => "Ruby::MethodArityMismatch",
            MethodParameterMismatch { .. } => "Ruby::MethodParameterMismatch",
            DifferentMethodParameterKind { .. } => "Ruby::DifferentMethodParameterKind",
            MethodReturnTypeAnnotationMismatch { .. } => "Ruby::MethodReturnTypeAnnotationMismatch",
            MethodDefinitionMissing { .. } => "Ruby::MethodDefinitionMissing",
            UndeclaredMethodDefinition { .. } => "Ruby::UndeclaredMethodDefinition",
            MethodDefinitionInUndeclaredModule { .. } => "Ruby::MethodDefinitionInUndeclaredModule",
            UnexpectedDynamicMethod { .. } => "Ruby::UnexpectedDynamicMethod",
            ClassModuleMismatch { .. } => "Ruby::ClassModuleMismatch",
            UnsatisfiableConstraint { .. } => "Ruby::UnsatisfiableConstraint",
            InsufficientTypeArgument { .. } => "Ruby::InsufficientTypeArgument",
            UnexpectedTypeArgument { .. } => "Ruby::UnexpectedTypeArgument",
            TypeArgumentMismatchError { .. } => "Ruby::TypeArgumentMismatchError",
            FallbackAny => "Ruby::FallbackAny",
            UnannotatedEmptyCollection => "Ruby::UnannotatedEmptyCollection",
            UnsupportedSyntax { .. } => "Ruby::UnsupportedSyntax",
            AnnotationSyntaxError { .. } => "Ruby::AnnotationSyntaxError",
            UnexpectedError { .. } => "Ruby::UnexpectedError",
        }
    }

    /// Every code, in declaration order.
    pub const ALL_CODES: &'static [&'static str] = &[
        "Ruby::IncompatibleAssignment",
        "Ruby::FalseAssertion",
        "Ruby::MultipleAssignmentConversionError",
        "Ruby::ArgumentTypeMismatch",
        "Ruby::BlockTypeMismatch",
        "Ruby::BlockBodyTypeMismatch",
        "Ruby::InsufficientPositionalArguments",
        "Ruby::UnexpectedPositionalArgument",
        "Ruby::InsufficientKeywordArguments",
        "Ruby::UnexpectedKeywordArgument",
        "Ruby::UnexpectedSplat",
        "Ruby::RequiredBlockMissing",
        "Ruby::UnexpectedBlockGiven",
        "Ruby::UnresolvedOverloading",
        "Ruby::UnexpectedYield",
        "Ruby::UnexpectedSuper",
        "Ruby::NoMethod",
        "Ruby::UnknownConstant",
        "Ruby::UnknownInstanceVariable",
        "Ruby::UnknownGlobalVariable",
        "Ruby::UnknownClassVariable",
        "Ruby::UnknownRecordKey",
        "RBS::UnknownTypeName",
        "Ruby::ReturnTypeMismatch",
        "Ruby::BreakTypeMismatch",
        "Ruby::ImplicitBreakValueMismatch",
        "Ruby::UnexpectedJump",
        "Ruby::UnexpectedJumpValue",
        "Ruby::UnreachableBranch",
        "Ruby::UnreachableValueBranch",
        "Ruby::ElseOnExhaustiveCase",
        "Ruby::MethodBodyTypeMismatch",
        "Ruby::SetterBodyTypeMismatch",
        "Ruby::MethodArityMismatch",
        "Ruby::MethodParameterMismatch",
        "Ruby::DifferentMethodParameterKind",
        "Ruby::MethodReturnTypeAnnotationMismatch",
        "Ruby::MethodDefinitionMissing",
        "Ruby::UndeclaredMethodDefinition",
        "Ruby::MethodDefinitionInUndeclaredModule",
        "Ruby::UnexpectedDynamicMethod",
        "Ruby::ClassModuleMismatch",
        "Ruby::UnsatisfiableConstraint",
        "Ruby::InsufficientTypeArgument",
        "Ruby::UnexpectedTypeArgument",
        "Ruby::TypeArgumentMismatchError",
        "Ruby::FallbackAny",
        "Ruby::UnannotatedEmptyCollection",
        "Ruby::UnsupportedSyntax",
        "Ruby::AnnotationSyntaxError",
        "Ruby::UnexpectedError",
    ];

    pub fn trace(&self) -> &[Relation] {
        use TypeErrorKind::*;
        match self {
            IncompatibleAssignment { trace, .. }
            | ArgumentTypeMismatch { trace, .. }
            | BlockTypeMismatch { trace, .. }
            | BlockBodyTypeMismatch { trace, .. }
            | ReturnTypeMismatch { trace, .. }
            | BreakTypeMismatch { trace, .. }
            | MethodBodyTypeMismatch { trace, .. }
            | SetterBodyTypeMismatch { trace, .. } => trace,
            _ => &[],
        }
    }
}

fn join_names(names: &[String]) -> String {
    names.iter().map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TypeErrorKind::*;
        match self {
            IncompatibleAssignment { lhs_type, rhs_type, .. } => write!(
                f,
                "Cannot assign a value of type `{}` to a variable of type `{}`",
                Nested(rhs_type),
                Nested(lhs_type)
            ),
            FalseAssertion { assertion_type, node_type } => write!(
                f,
                "Assertion cannot hold: no relationship between inferred type (`{}`) and asserted type (`{}`)",
                Nested(node_type),
                Nested(assertion_type)
            ),
            MultipleAssignmentConversionError { original, returned } => write!(
                f,
                "Cannot convert `{}` to Array or tuple (`#to_ary` returns `{}`)",
                Nested(original),
                Nested(returned)
            ),
            ArgumentTypeMismatch { expected, actual, .. } => write!(
                f,
                "Cannot pass a value of type `{}` as an argument of type `{}`",
                Nested(actual),
                Nested(expected)
            ),
            BlockTypeMismatch { expected, actual, .. } => write!(
                f,
                "Cannot pass a value of type `{}` as a block-pass-argument of type `{}`",
                Nested(actual),
                Nested(expected)
            ),
            BlockBodyTypeMismatch { expected, actual, .. } => write!(
                f,
                "Cannot allow block body have type `{}` because declared as type `{}`",
                Nested(actual),
                Nested(expected)
            ),
            InsufficientPositionalArguments { method_type } => {
                write!(f, "More positional arguments are required: `{}`", method_type)
            }
            UnexpectedPositionalArgument { method_type } => {
                write!(f, "Unexpected positional argument: `{}`", method_type)
            }
            InsufficientKeywordArguments { missing, .. } => {
                write!(f, "More keyword arguments are required: {}", join_names(missing))
            }
            UnexpectedKeywordArgument { name, .. } => write!(f, "Unexpected keyword argument: `{}`", name),
            UnexpectedSplat { ty } => write!(f, "Cannot splat a value of type `{}`", Nested(ty)),
            RequiredBlockMissing { method_type } => {
                write!(f, "The method cannot be called without a block: `{}`", method_type)
            }
            UnexpectedBlockGiven { method_type } => {
                write!(f, "The method cannot be called with a block: `{}`", method_type)
            }
            UnresolvedOverloading { receiver, method, .. } => write!(
                f,
                "Cannot find compatible overloading of method `{}` of type `{}`",
                method,
                Nested(receiver)
            ),
            UnexpectedYield => write!(f, "No block given for `yield`"),
            UnexpectedSuper { method: Some(m) } => write!(f, "No superclass method `{}` defined", m),
            UnexpectedSuper { method: None } => write!(f, "`super` is used outside of a method"),
            NoMethod { receiver, method } => {
                write!(f, "Type `{}` does not have method `{}`", Nested(receiver), method)
            }
            UnknownConstant { name } => write!(f, "Cannot find the declaration of constant: `{}`", name),
            UnknownInstanceVariable { name } => {
                write!(f, "Cannot find the declaration of instance variable: `{}`", name)
            }
            UnknownGlobalVariable { name } => {
                write!(f, "Cannot find the declaration of global variable: `{}`", name)
            }
            UnknownClassVariable { name } => write!(f, "Cannot find the declaration of class variable: `{}`", name),
            UnknownRecordKey { key } => write!(f, "`{}` is unknown key for record type", key),
            UnknownTypeName { name } => write!(f, "Cannot find type `::{}`", name),
            ReturnTypeMismatch { expected, actual, .. } => write!(
                f,
                "The method cannot return a value of type `{}` because declared as type `{}`",
                Nested(actual),
                Nested(expected)
            ),
            BreakTypeMismatch { expected, actual, .. } => write!(
                f,
                "Cannot break with a value of type `{}` because type `{}` is assumed",
                Nested(actual),
                Nested(expected)
            ),
            ImplicitBreakValueMismatch { expected } => write!(
                f,
                "Breaking without a value may result an error because a value of type `{}` is expected",
                Nested(expected)
            ),
            UnexpectedJump => write!(f, "Cannot jump from here"),
            UnexpectedJumpValue => write!(f, "The value given to the jump will be ignored"),
            UnreachableBranch => write!(f, "The branch is unreachable"),
            UnreachableValueBranch { ty } => {
                write!(f, "The branch may evaluate to a value of `{}` but unreachable", Nested(ty))
            }
            ElseOnExhaustiveCase { ty } => write!(
                f,
                "The branch is unreachable because the condition is exhaustive (`{}` remains)",
                Nested(ty)
            ),
            MethodBodyTypeMismatch {
                method,
                expected,
                actual,
                ..
            } => write!(
                f,
                "Cannot allow method `{}` body have type `{}` because declared as type `{}`",
                method,
                Nested(actual),
                Nested(expected)
            ),
            SetterBodyTypeMismatch {
                method,
                expected,
                actual,
                ..
            } => write!(
                f,
                "Setter method `{}` cannot have type `{}` because declared as type `{}`",
                method,
                Nested(actual),
                Nested(expected)
            ),
            MethodArityMismatch { method_type } => {
                write!(f, "Method parameters are incompatible with declaration `{}`", method_type)
            }
            MethodParameterMismatch { method_type } => {
                write!(f, "The method parameter is incompatible with the declaration `{}`", method_type)
            }
            DifferentMethodParameterKind { method_type } => write!(
                f,
                "The method parameter has different kind from the declaration `{}`",
                method_type
            ),
            MethodReturnTypeAnnotationMismatch { method_type, annotation } => write!(
                f,
                "Annotation `@type return` specifies type `{}` where declared as type `{}`",
                Nested(annotation),
                Nested(method_type.ret())
            ),
            MethodDefinitionMissing { module, missing } => write!(
                f,
                "Cannot find implementation of method: {} in `::{}`",
                join_names(missing),
                module
            ),
            UndeclaredMethodDefinition { type_name, method } => {
                write!(f, "Method `::{}#{}` is not declared in signatures", type_name, method)
            }
            MethodDefinitionInUndeclaredModule { module, method } => {
                write!(f, "Method `{}` is defined in undeclared module `{}`", method, module)
            }
            UnexpectedDynamicMethod { module, method } => write!(
                f,
                "@dynamic annotation contains unknown method name `{}` of `::{}`",
                method, module
            ),
            ClassModuleMismatch { name } => write!(f, "`::{}` is declared as a different kind of module", name),
            UnsatisfiableConstraint {
                var,
                lower,
                upper,
                method_type,
            } => write!(
                f,
                "Unsatisfiable constraint `{} <: {} <: {}` is generated through `{}`",
                Nested(lower),
                var,
                Nested(upper),
                method_type
            ),
            InsufficientTypeArgument { method_type, given } => write!(
                f,
                "Requires {} types, but {} given: `{}`",
                method_type.type_params.len(),
                given,
                method_type
            ),
            UnexpectedTypeArgument { method_type, type_arg } => write!(
                f,
                "Unexpected type arg `{}` is given to method type `{}`",
                type_arg, method_type
            ),
            TypeArgumentMismatchError {
                type_arg,
                param,
                upper_bound,
            } => write!(
                f,
                "Cannot pass a type `{}` as a type parameter `{} < {}`",
                Nested(type_arg),
                param,
                Nested(upper_bound)
            ),
            FallbackAny => write!(f, "Cannot detect the type of the expression"),
            UnannotatedEmptyCollection => write!(f, "Empty collection doesn't have type annotation"),
            UnsupportedSyntax { kind } => write!(f, "Syntax `{}` is not supported", kind),
            AnnotationSyntaxError { message } => write!(f, "Type annotation has a syntax error: {}", message),
            UnexpectedError { message } => write!(f, "UnexpectedError: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(kind: TypeErrorKind) -> TypeError {
        TypeError::new(NodeId(0), TextRange::new(0.into(), 1.into()), kind)
    }

    #[test]
    fn header_lines() {
        let err = at(TypeErrorKind::IncompatibleAssignment {
            lhs_type: Type::optional(Type::integer()),
            rhs_type: Type::string(),
            trace: Vec::new(),
        });
        assert_eq!(
            err.header_line(),
            "Cannot assign a value of type `::String` to a variable of type `(::Integer | nil)`"
        );
        assert_eq!(err.code(), "Ruby::IncompatibleAssignment");

        let err = at(TypeErrorKind::NoMethod {
            receiver: Type::optional(Type::string()),
            method: "upcase".into(),
        });
        insta::assert_snapshot!(err.header_line(), @"Type `(::String | nil)` does not have method `upcase`");
    }

    #[test]
    fn every_code_is_listed() {
        let sample = [
            TypeErrorKind::UnexpectedYield,
            TypeErrorKind::FallbackAny,
            TypeErrorKind::UnreachableBranch,
            TypeErrorKind::UnknownTypeName { name: "Foo".into() },
        ];
        for kind in sample {
            assert!(TypeErrorKind::ALL_CODES.contains(&kind.code()));
        }
        let mut codes = TypeErrorKind::ALL_CODES.to_vec();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), TypeErrorKind::ALL_CODES.len());
    }
}

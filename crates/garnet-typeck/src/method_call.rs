//! The outcome of resolving one method call.

use crate::method_type::MethodType;
use crate::ty::Type;

/// How a call site was resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodCall {
    /// One overload accepted the arguments.
    Typed {
        receiver: Type,
        method: String,
        /// The selected overload, with its type variables solved.
        method_type: MethodType,
        return_type: Type,
    },
    /// Resolution failed; `return_type` is a best-effort approximation.
    Error {
        receiver: Type,
        method: String,
        method_types: Vec<MethodType>,
        return_type: Type,
    },
    /// The receiver is `untyped`.
    Untyped { method: String },
    /// The receiver has no such method.
    NoMethodError { receiver: Type, method: String },
}

impl MethodCall {
    pub fn method_name(&self) -> &str {
        match self {
            MethodCall::Typed { method, .. }
            | MethodCall::Error { method, .. }
            | MethodCall::Untyped { method }
            | MethodCall::NoMethodError { method, .. } => method,
        }
    }

    /// The type the call expression evaluates to.
    pub fn return_type(&self) -> Type {
        match self {
            MethodCall::Typed { return_type, .. } | MethodCall::Error { return_type, .. } => return_type.clone(),
            MethodCall::Untyped { .. } | MethodCall::NoMethodError { .. } => Type::Any,
        }
    }

    pub fn is_typed(&self) -> bool {
        matches!(self, MethodCall::Typed { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MethodCall::Error { .. } | MethodCall::NoMethodError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_calls_are_untyped() {
        let call = MethodCall::NoMethodError {
            receiver: Type::Void,
            method: "foo".into(),
        };
        assert_eq!(call.return_type(), Type::Any);
        assert!(call.is_error());
        assert_eq!(call.method_name(), "foo");
        assert!(!MethodCall::Untyped { method: "bar".into() }.is_error());
    }
}

//! Method lookup on arbitrary types.
//!
//! Turns a receiver type into the method table its values respond to, with
//! type arguments and `self`/`instance`/`class` substituted.

use crate::method_type::{MethodType, TypeParam};
use crate::sig::{DefinitionBuilder, SigError, Visibility};
use crate::subst::Substitution;
use crate::ty::{Literal, Type, TypeName};

/// A method found on a receiver.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodEntry {
    pub name: String,
    pub overloads: Vec<MethodType>,
    pub visibility: Visibility,
    pub pure: bool,
    pub owner: TypeName,
}

/// The nominal instance type standing in for a structural value type.
pub fn nominal_instance(ty: &Type) -> Option<Type> {
    match ty {
        Type::Instance(..) => Some(ty.clone()),
        Type::Literal(Literal::True) => Some(Type::instance("TrueClass")),
        Type::Literal(Literal::False) => Some(Type::instance("FalseClass")),
        Type::Literal(lit) => Some(Type::instance(lit.class_name())),
        Type::Nil => Some(Type::instance("NilClass")),
        Type::Tuple(elems) => Some(Type::array(if elems.is_empty() {
            Type::Any
        } else {
            Type::union(elems.clone())
        })),
        Type::Record(fields) => Some(if fields.is_empty() {
            Type::hash(Type::Any, Type::Any)
        } else {
            Type::hash(
                Type::union(fields.iter().map(|(k, _)| k.key_type()).collect()),
                Type::union(fields.iter().map(|(_, t)| t.clone()).collect()),
            )
        }),
        Type::Proc(_) => Some(Type::instance("Proc")),
        _ => None,
    }
}

/// Type arguments for `params`, padding missing ones with `untyped`.
pub(crate) fn fill_args(params: &[TypeParam], args: &[Type]) -> Vec<Type> {
    if args.len() == params.len() {
        args.to_vec()
    } else {
        vec![Type::Any; params.len()]
    }
}

fn apply(
    def_overloads: &[MethodType],
    args_subst: &Substitution,
    self_subst: &Substitution,
) -> Vec<MethodType> {
    def_overloads
        .iter()
        .map(|mt| {
            let bound: Vec<_> = mt.type_params.iter().map(TypeParam::var).collect();
            mt.subst(&args_subst.without(&bound)).subst(self_subst)
        })
        .collect()
}

/// Look up `name` on values of `receiver`.
///
/// `Ok(None)` means the type has no such method. Unions, `untyped`, `void`,
/// `top`, `bot` and unresolved self types are the caller's business and
/// return `Ok(None)`.
pub fn lookup_method(builder: &DefinitionBuilder, receiver: &Type, name: &str) -> Result<Option<MethodEntry>, SigError> {
    lookup_as(builder, receiver, name, receiver)
}

/// Look up on `receiver`, with `self` standing for `self_type`.
fn lookup_as(
    builder: &DefinitionBuilder,
    receiver: &Type,
    name: &str,
    self_type: &Type,
) -> Result<Option<MethodEntry>, SigError> {
    let env = builder.env();
    match receiver {
        Type::Instance(class, args) => {
            if env.class(class).is_none() {
                return Err(SigError::UnknownType(class.clone()));
            }
            let def = builder.build_instance(class)?;
            let args = fill_args(&def.type_params, args);
            let instance = Type::Instance(class.clone(), args.clone());
            Ok(def.method(name).map(|m| MethodEntry {
                name: m.name.clone(),
                overloads: apply(
                    &m.overloads,
                    &def.args_subst(&args),
                    &Substitution::for_self(self_type.clone(), instance.clone(), Type::Singleton(class.clone())),
                ),
                visibility: m.visibility,
                pure: m.pure,
                owner: m.owner.clone(),
            }))
        }
        Type::Singleton(class) => {
            let def = builder.build_singleton(class)?;
            let params = env.type_params(class).map(|p| p.to_vec()).unwrap_or_default();
            let instance = Type::Instance(class.clone(), vec![Type::Any; params.len()]);
            Ok(def.method(name).map(|m| MethodEntry {
                name: m.name.clone(),
                overloads: apply(
                    &m.overloads,
                    &Substitution::new(),
                    &Substitution::for_self(self_type.clone(), instance.clone(), receiver.clone()),
                ),
                visibility: m.visibility,
                pure: m.pure,
                owner: m.owner.clone(),
            }))
        }
        Type::Interface(iface, args) => {
            let def = builder.build_interface(iface)?;
            let args = fill_args(&def.type_params, args);
            Ok(def.method(name).map(|m| MethodEntry {
                name: m.name.clone(),
                overloads: apply(
                    &m.overloads,
                    &def.args_subst(&args),
                    &Substitution::for_self(self_type.clone(), receiver.clone(), Type::Any),
                ),
                visibility: m.visibility,
                pure: m.pure,
                owner: m.owner.clone(),
            }))
        }
        Type::Alias(..) => {
            let expanded = env.expand_alias_head(receiver)?;
            lookup_as(builder, &expanded, name, self_type)
        }
        Type::Bool => {
            let on_true = lookup_as(builder, &Type::Literal(Literal::True), name, self_type)?;
            let on_false = lookup_as(builder, &Type::Literal(Literal::False), name, self_type)?;
            Ok(match (on_true, on_false) {
                (Some(t), Some(_)) => Some(t),
                _ => None,
            })
        }
        Type::Var(_) => lookup_as(builder, &Type::object(), name, self_type),
        Type::Intersection(members) => {
            for m in members {
                if let Some(found) = lookup_as(builder, m, name, self_type)? {
                    return Ok(Some(found));
                }
            }
            Ok(None)
        }
        other => match nominal_instance(other) {
            // `self` keeps the structural type: `[1, 2].itself` is `[1, 2]`.
            Some(nominal) => lookup_as(builder, &nominal, name, self_type),
            None => Ok(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sig::EnvironmentBuilder;

    fn builder() -> DefinitionBuilder {
        DefinitionBuilder::new(Arc::new(EnvironmentBuilder::with_core().build().unwrap()))
    }

    #[test]
    fn generic_receiver() {
        let b = builder();
        let entry = lookup_method(&b, &Type::array(Type::integer()), "first").unwrap().unwrap();
        assert_eq!(entry.overloads[0].func.ret, Type::optional(Type::integer()));
    }

    #[test]
    fn self_is_the_receiver() {
        let b = builder();
        let entry = lookup_method(&b, &Type::string(), "freeze").unwrap().unwrap();
        assert_eq!(entry.overloads[0].func.ret, Type::string());
        let entry = lookup_method(&b, &Type::Tuple(vec![Type::integer()]), "itself").unwrap().unwrap();
        assert_eq!(entry.overloads[0].func.ret, Type::Tuple(vec![Type::integer()]));
    }

    #[test]
    fn literal_and_nil_receivers() {
        let b = builder();
        assert!(lookup_method(&b, &Type::int_lit(1), "+").unwrap().is_some());
        let to_a = lookup_method(&b, &Type::Nil, "to_a").unwrap().unwrap();
        assert_eq!(to_a.overloads[0].func.ret, Type::Tuple(vec![]));
        assert!(lookup_method(&b, &Type::Nil, "upcase").unwrap().is_none());
    }

    #[test]
    fn singleton_new() {
        let b = builder();
        let entry = lookup_method(&b, &Type::singleton("String"), "new").unwrap().unwrap();
        assert_eq!(entry.overloads[0].func.ret, Type::string());
    }

    #[test]
    fn record_uses_hash_methods() {
        let b = builder();
        let record = Type::Record(vec![(crate::ty::RecordKey::Sym("a".into()), Type::integer())]);
        let keys = lookup_method(&b, &record, "keys").unwrap().unwrap();
        assert_eq!(keys.overloads[0].func.ret, Type::array(Type::sym_lit("a")));
    }
}

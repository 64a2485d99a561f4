//! Multiple assignment: `a, b = value` and `a, *rest = value`.

use garnet_syntax::{Node, NodeKind};

use super::{Pair, TypeConstruction};
use crate::context::Context;
use crate::error::TypeErrorKind;
use crate::ty::Type;

/// How a right-hand side splits across targets.
enum Parts {
    /// Known element types, one per position.
    Tuple(Vec<Type>),
    /// Any number of elements of one type.
    Array(Type),
}

impl<'a> TypeConstruction<'a> {
    pub(super) fn synth_masgn(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let (Some(lhs), Some(rhs)) = (node.child(0), node.child(1)) else {
            return self.unsupported(node, ctx);
        };
        let value = self.synth_masgn_value(rhs, ctx);
        let after = self.destructure(lhs, &value.ctx, &value.ty);
        Pair::new(value.ty, after)
    }

    /// The right-hand side; a literal array without splats is a tuple.
    fn synth_masgn_value(&mut self, rhs: Node<'a>, ctx: &Context) -> Pair {
        if !rhs.is(NodeKind::Array) || rhs.child_nodes().any(|n| n.is(NodeKind::Splat)) {
            return self.synth(rhs, ctx, None);
        }
        let mut ctx = ctx.clone();
        let mut types = Vec::new();
        for elem in rhs.child_nodes() {
            let pair = self.synth(elem, &ctx, None);
            types.push(pair.ty.widen_literals());
            ctx = pair.ctx;
        }
        let ty = Type::Tuple(types);
        self.typing.add_type(rhs.id(), ty.clone());
        Pair::new(ty, ctx)
    }

    /// Bind the targets of an `mlhs` to the parts of `ty`.
    fn destructure(&mut self, mlhs: Node<'a>, ctx: &Context, ty: &Type) -> Context {
        self.typing.add_type(mlhs.id(), ty.clone());
        let targets: Vec<Node<'a>> = mlhs.child_nodes().collect();
        let parts = self.masgn_parts(mlhs, ctx, ty);
        let splat_at = targets.iter().position(|t| t.is(NodeKind::Splat));
        let count = targets.len();

        let mut ctx = ctx.clone();
        for (i, target) in targets.iter().enumerate() {
            let part = match (&parts, splat_at) {
                (Parts::Array(elem), Some(s)) if s == i => Type::array(elem.clone()),
                (Parts::Array(elem), _) => Type::optional(elem.clone()),
                (Parts::Tuple(elems), Some(s)) if s == i => {
                    let after = count - s - 1;
                    let end = elems.len().saturating_sub(after).max(s);
                    let middle: Vec<Type> = elems.get(s..end).map(<[Type]>::to_vec).unwrap_or_default();
                    let elem = if middle.is_empty() { Type::Any } else { Type::union(middle) };
                    Type::array(elem)
                }
                (Parts::Tuple(elems), Some(s)) if i > s => {
                    let from_end = count - i;
                    elems
                        .len()
                        .checked_sub(from_end)
                        .filter(|idx| *idx >= s)
                        .and_then(|idx| elems.get(idx).cloned())
                        .unwrap_or(Type::Nil)
                }
                (Parts::Tuple(elems), _) => elems.get(i).cloned().unwrap_or(Type::Nil),
            };
            ctx = match target.kind() {
                NodeKind::Mlhs => self.destructure(*target, &ctx, &part),
                NodeKind::Splat => match target.child(0) {
                    Some(inner) => {
                        self.typing.add_type(target.id(), part.clone());
                        self.bind_target(inner, &ctx, &part)
                    }
                    None => ctx,
                },
                _ => self.bind_target(*target, &ctx, &part),
            };
        }
        ctx
    }

    fn masgn_parts(&mut self, node: Node<'a>, ctx: &Context, ty: &Type) -> Parts {
        match self.expand(ty) {
            Type::Tuple(elems) => Parts::Tuple(elems),
            Type::Instance(name, args) if name == "Array" && args.len() == 1 => Parts::Array(args[0].clone()),
            Type::Any => Parts::Array(Type::Any),
            Type::Nil => Parts::Tuple(vec![Type::Nil]),
            other => {
                if self.lookup(node, &other, "to_ary").is_none() {
                    return Parts::Tuple(vec![other]);
                }
                let returned = self.call_with_types(node, ctx, &other, None, "to_ary", Vec::new());
                match self.expand(&returned) {
                    Type::Tuple(elems) => Parts::Tuple(elems),
                    Type::Instance(name, args) if name == "Array" && args.len() == 1 => Parts::Array(args[0].clone()),
                    Type::Any => Parts::Array(Type::Any),
                    _ => {
                        self.error(
                            node,
                            TypeErrorKind::MultipleAssignmentConversionError {
                                original: other,
                                returned,
                            },
                        );
                        Parts::Array(Type::Any)
                    }
                }
            }
        }
    }
}

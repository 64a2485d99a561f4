//! `rescue`, `resbody` and `ensure`.

use garnet_syntax::{Node, NodeKind};

use super::{Pair, TypeConstruction};
use crate::context::Context;
use crate::ty::Type;

impl<'a> TypeConstruction<'a> {
    /// `(rescue body resbody... else)`.
    pub(super) fn synth_rescue(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let last = node.child_count().saturating_sub(1);
        let handlers: Vec<Node<'a>> = node
            .child_nodes_from(1)
            .into_iter()
            .filter(|n| n.is(NodeKind::Resbody))
            .collect();
        let else_body = node.child(last).filter(|n| last > 0 && !n.is(NodeKind::Resbody));

        let body_hint = if else_body.is_some() { None } else { hint };
        let body = self.synth_body(node.child(0), ctx, body_hint);
        // A handler may start anywhere in the body.
        let handler_ctx = ctx.with_env(ctx.type_env.widen_from(&body.ctx.type_env));

        let mut arms = Vec::with_capacity(handlers.len() + 1);
        match else_body {
            Some(else_body) => {
                let base = body.ctx.clone();
                arms.push(self.synth(else_body, &base, hint));
            }
            None => arms.push(body),
        }
        self.rescue_depth += 1;
        for handler in handlers {
            arms.push(self.synth_resbody(handler, &handler_ctx, hint));
        }
        self.rescue_depth -= 1;
        self.merge(ctx, arms)
    }

    /// `(resbody (array classes...) var body)`; with no classes the
    /// handler catches `StandardError`.
    fn synth_resbody(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let mut ctx = ctx.clone();
        let mut caught = Vec::new();
        match node.child(0) {
            Some(list) => {
                for class in list.child_nodes() {
                    let pair = self.synth(class, &ctx, None);
                    ctx = pair.ctx;
                    caught.push(exception_instance(&pair.ty));
                }
                self.typing.add_type(list.id(), Type::Tuple(caught.clone()));
            }
            None => caught.push(Type::instance("StandardError")),
        }
        let exception = Type::union(caught);
        if let Some(var) = node.child(1) {
            ctx = self.bind_target(var, &ctx, &exception);
        }
        let pair = self.synth_body(node.child(2), &ctx, hint);
        self.typing.add_type(node.id(), pair.ty.clone());
        pair
    }

    /// `(ensure body ensure_body)`: the value is the body's; the ensure
    /// clause runs whether or not the body finished.
    pub(super) fn synth_ensure(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let body = self.synth_body(node.child(0), ctx, hint);
        let ensure_ctx = ctx.with_env(ctx.type_env.widen_from(&body.ctx.type_env));
        let ensure = self.synth_body(node.child(1), &ensure_ctx, None);
        let ty = if ensure.ty.is_bot() { Type::Bot } else { body.ty };
        Pair::new(ty, body.ctx.with_env(ensure.ctx.type_env))
    }
}

/// The exception a class in a `rescue` list catches.
fn exception_instance(class: &Type) -> Type {
    match class {
        Type::Singleton(name) => Type::instance(name),
        Type::Instance(name, args) if name == "Array" && args.len() == 1 => exception_instance(&args[0]),
        Type::Tuple(elems) => Type::union(elems.iter().map(exception_instance).collect()),
        _ => Type::Any,
    }
}

//! Variables, constants and assignments.

use garnet_syntax::{Node, NodeKind};

use super::{Pair, TypeConstruction};
use crate::context::Context;
use crate::error::TypeErrorKind;
use crate::ty::{Type, TypeName};

/// What an assignment writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VarKind {
    Local,
    Ivar,
    Gvar,
    Cvar,
}

fn var_kind(kind: NodeKind) -> Option<VarKind> {
    match kind {
        NodeKind::Lvar | NodeKind::Lvasgn => Some(VarKind::Local),
        NodeKind::Ivar | NodeKind::Ivasgn => Some(VarKind::Ivar),
        NodeKind::Gvar | NodeKind::Gvasgn => Some(VarKind::Gvar),
        NodeKind::Cvar | NodeKind::Cvasgn => Some(VarKind::Cvar),
        _ => None,
    }
}

impl<'a> TypeConstruction<'a> {
    // ── Reads ──────────────────────────────────────────────────────────

    pub(super) fn synth_variable(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let (Some(kind), Some(name)) = (var_kind(node.kind()), node.symbol(0)) else {
            return self.unsupported(node, ctx);
        };
        let ty = self.read_variable(node, ctx, kind, name).unwrap_or(Type::Any);
        Pair::new(ty, ctx.clone())
    }

    /// The current type of a variable; unknown ones are reported.
    fn read_variable(&mut self, node: Node<'a>, ctx: &Context, kind: VarKind, name: &str) -> Option<Type> {
        match kind {
            VarKind::Local => match ctx.type_env.lookup(name) {
                Some(ty) => Some(ty.clone()),
                None => {
                    self.error(node, TypeErrorKind::FallbackAny);
                    None
                }
            },
            VarKind::Ivar => {
                let declared = self.declared_ivar(ctx, name);
                if declared.is_none() && self.in_declared_module(ctx) {
                    self.error(node, TypeErrorKind::UnknownInstanceVariable { name: name.to_string() });
                }
                declared
            }
            VarKind::Gvar => {
                let declared = self.builder.env().global(name).cloned();
                if declared.is_none() {
                    self.error(node, TypeErrorKind::UnknownGlobalVariable { name: name.to_string() });
                }
                declared
            }
            VarKind::Cvar => {
                let declared = ctx.cvars.get(name).cloned();
                if declared.is_none() && self.in_declared_module(ctx) {
                    self.error(node, TypeErrorKind::UnknownClassVariable { name: name.to_string() });
                }
                declared
            }
        }
    }

    fn declared_ivar(&self, ctx: &Context, name: &str) -> Option<Type> {
        ctx.ivars.get(name).map(|t| self.resolve_self(ctx, t))
    }

    /// Whether unknown instance and class variables are errors here.
    fn in_declared_module(&self, ctx: &Context) -> bool {
        ctx.module_context.as_ref().is_some_and(|m| m.declared)
    }

    /// The declared type of a variable, when it has one.
    fn declared_type(&self, ctx: &Context, kind: VarKind, name: &str) -> Option<Type> {
        match kind {
            VarKind::Local => ctx.type_env.declared(name).cloned(),
            VarKind::Ivar => self.declared_ivar(ctx, name),
            VarKind::Gvar => self.builder.env().global(name).cloned(),
            VarKind::Cvar => ctx.cvars.get(name).cloned(),
        }
    }

    // ── Writes ─────────────────────────────────────────────────────────

    pub(super) fn synth_assignment(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let (Some(kind), Some(name)) = (var_kind(node.kind()), node.symbol(0)) else {
            return self.unsupported(node, ctx);
        };
        let Some(rhs) = node.child(1) else {
            return self.unsupported(node, ctx);
        };
        let declared = self.declared_type(ctx, kind, name);
        let pair = self.synth(rhs, ctx, declared.as_ref());
        if pair.ty.is_bot() {
            return pair;
        }
        let ctx = self.write_variable(node, &pair.ctx, kind, name, &pair.ty);
        let ty = declared.unwrap_or(pair.ty);
        Pair::new(ty, ctx)
    }

    /// Check `value` against the target's declaration and bind it.
    fn write_variable(&mut self, node: Node<'a>, ctx: &Context, kind: VarKind, name: &str, value: &Type) -> Context {
        let declared = self.declared_type(ctx, kind, name);
        if let Some(declared) = &declared {
            let result = self.relate(node, ctx, value, declared);
            if !result.holds {
                self.error(
                    node,
                    TypeErrorKind::IncompatibleAssignment {
                        lhs_type: declared.clone(),
                        rhs_type: value.clone(),
                        trace: result.trace,
                    },
                );
            }
        }
        match kind {
            VarKind::Local => {
                let ty = declared.unwrap_or_else(|| value.clone());
                ctx.with_env(ctx.type_env.assign(name, ty))
            }
            VarKind::Ivar => {
                if declared.is_none() && self.in_declared_module(ctx) {
                    self.error(node, TypeErrorKind::UnknownInstanceVariable { name: name.to_string() });
                }
                ctx.with_env(ctx.type_env.forget_self_calls())
            }
            VarKind::Gvar => {
                if declared.is_none() {
                    self.error(node, TypeErrorKind::UnknownGlobalVariable { name: name.to_string() });
                }
                ctx.clone()
            }
            VarKind::Cvar => {
                if declared.is_none() && self.in_declared_module(ctx) {
                    self.error(node, TypeErrorKind::UnknownClassVariable { name: name.to_string() });
                }
                ctx.clone()
            }
        }
    }

    /// Bind a value-less assignment target (in `masgn`, `for`, `rescue =>`)
    /// to `ty`.
    pub(crate) fn bind_target(&mut self, target: Node<'a>, ctx: &Context, ty: &Type) -> Context {
        self.typing.add_type(target.id(), ty.clone());
        match target.kind() {
            NodeKind::Casgn => {
                let mut ctx = ctx.clone();
                if let Some(scope) = target.child(0) {
                    ctx = self.synth(scope, &ctx, None).ctx;
                }
                ctx
            }
            NodeKind::Send | NodeKind::Csend => {
                // `a.b, c = ...` calls the writer with the value.
                let Some(name) = target.symbol(1) else {
                    return ctx.clone();
                };
                let receiver = target.child(0);
                let recv = match receiver {
                    Some(r) => self.synth(r, ctx, None),
                    None => Pair::new(ctx.self_type.clone(), ctx.clone()),
                };
                let mut arg_ctx = recv.ctx;
                let mut args = Vec::new();
                for arg in target.child_nodes_from(2) {
                    let pair = self.synth(arg, &arg_ctx, None);
                    args.push(pair.ty);
                    arg_ctx = pair.ctx;
                }
                args.push(ty.clone());
                let method = if name.ends_with('=') { name.to_string() } else { format!("{}=", name) };
                self.call_with_types(target, &arg_ctx, &recv.ty, receiver, &method, args);
                arg_ctx
            }
            kind => match (var_kind(kind), target.symbol(0)) {
                (Some(vk), Some(name)) => self.write_variable(target, ctx, vk, name, ty),
                _ => {
                    self.error(
                        target,
                        TypeErrorKind::UnsupportedSyntax {
                            kind: kind.name().to_string(),
                        },
                    );
                    ctx.clone()
                }
            },
        }
    }

    // ── Constants ──────────────────────────────────────────────────────

    /// The absolute name and type of a `const` node, or `None` when it
    /// cannot be resolved. The scope is typed as a side effect.
    pub(crate) fn resolve_const(&mut self, node: Node<'a>, ctx: &Context) -> (Option<(TypeName, Type)>, Context) {
        let Some(name) = node.symbol(1) else {
            return (None, ctx.clone());
        };
        let env = self.builder.env();
        match node.child(0) {
            None => {
                if let Some(ty) = ctx.consts.get(name) {
                    return (Some((name.to_string(), ty.clone())), ctx.clone());
                }
                (env.resolve_constant(name, &ctx.nesting), ctx.clone())
            }
            Some(scope) if scope.is(NodeKind::Cbase) => {
                self.typing.add_type(scope.id(), Type::singleton("Object"));
                (env.constant_type(name).map(|t| (name.to_string(), t)), ctx.clone())
            }
            Some(scope) if scope.is(NodeKind::Const) => {
                let (outer, ctx) = self.resolve_const(scope, ctx);
                let ty = match &outer {
                    Some((_, ty)) => ty.clone(),
                    None => Type::Any,
                };
                self.typing.add_type(scope.id(), ty);
                let Some((outer, _)) = outer else {
                    return (None, ctx);
                };
                let full = format!("{}::{}", outer, name);
                let resolved = env
                    .constant_type(&full)
                    .map(|t| (full.clone(), t))
                    .or_else(|| env.resolve_constant(name, std::slice::from_ref(&outer)));
                (resolved, ctx)
            }
            Some(scope) => {
                let pair = self.synth(scope, ctx, None);
                (None, pair.ctx)
            }
        }
    }

    pub(super) fn synth_const(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let dynamic_scope = node
            .child(0)
            .is_some_and(|s| !matches!(s.kind(), NodeKind::Const | NodeKind::Cbase));
        let (resolved, ctx) = self.resolve_const(node, ctx);
        match resolved {
            Some((_, ty)) => Pair::new(ty, ctx),
            None => {
                if !dynamic_scope {
                    self.error(
                        node,
                        TypeErrorKind::UnknownConstant {
                            name: const_name(node).unwrap_or_default(),
                        },
                    );
                }
                Pair::new(Type::Any, ctx)
            }
        }
    }

    pub(super) fn synth_casgn(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let Some(name) = node.symbol(1) else {
            return self.unsupported(node, ctx);
        };
        let mut ctx = ctx.clone();
        let prefix = match node.child(0) {
            None => ctx.nesting.first().cloned(),
            Some(scope) if scope.is(NodeKind::Cbase) => {
                self.typing.add_type(scope.id(), Type::singleton("Object"));
                None
            }
            Some(scope) if scope.is(NodeKind::Const) => {
                let (outer, next) = self.resolve_const(scope, &ctx);
                ctx = next;
                self.typing
                    .add_type(scope.id(), outer.as_ref().map(|(_, t)| t.clone()).unwrap_or(Type::Any));
                outer.map(|(n, _)| n)
            }
            Some(scope) => {
                ctx = self.synth(scope, &ctx, None).ctx;
                self.error(
                    node,
                    TypeErrorKind::UnsupportedSyntax {
                        kind: "casgn with a dynamic scope".to_string(),
                    },
                );
                None
            }
        };
        let full = match prefix {
            Some(p) => format!("{}::{}", p, name),
            None => name.to_string(),
        };
        let declared = ctx
            .consts
            .get(name)
            .cloned()
            .or_else(|| self.builder.env().constant_type(&full));
        let Some(rhs) = node.child(2) else {
            return Pair::new(declared.unwrap_or(Type::Any), ctx);
        };
        let pair = self.synth(rhs, &ctx, declared.as_ref());
        match declared {
            Some(declared) => {
                let result = self.relate(node, &pair.ctx, &pair.ty, &declared);
                if !result.holds {
                    self.error(
                        node,
                        TypeErrorKind::IncompatibleAssignment {
                            lhs_type: declared.clone(),
                            rhs_type: pair.ty.clone(),
                            trace: result.trace,
                        },
                    );
                }
                Pair::new(declared, pair.ctx)
            }
            None => pair,
        }
    }

    // ── Compound assignments ───────────────────────────────────────────

    /// The current type of an `op_asgn`/`or_asgn` target.
    fn read_target(&mut self, target: Node<'a>, ctx: &Context) -> (Type, Context) {
        match target.kind() {
            NodeKind::Send | NodeKind::Csend => {
                let Some(name) = target.symbol(1) else {
                    return (Type::Any, ctx.clone());
                };
                let receiver = target.child(0);
                let recv = match receiver {
                    Some(r) => self.synth(r, ctx, None),
                    None => Pair::new(ctx.self_type.clone(), ctx.clone()),
                };
                let mut arg_ctx = recv.ctx.clone();
                let mut args = Vec::new();
                for arg in target.child_nodes_from(2) {
                    let pair = self.synth(arg, &arg_ctx, None);
                    args.push(pair.ty);
                    arg_ctx = pair.ctx;
                }
                let ty = self.call_with_types(target, &arg_ctx, &recv.ty, receiver, name, args);
                (ty, arg_ctx)
            }
            NodeKind::Casgn => {
                let name = target.symbol(1).unwrap_or_default();
                let ty = ctx
                    .consts
                    .get(name)
                    .cloned()
                    .or_else(|| self.builder.env().resolve_constant(name, &ctx.nesting).map(|(_, t)| t))
                    .unwrap_or(Type::Any);
                (ty, ctx.clone())
            }
            kind => match (var_kind(kind), target.symbol(0)) {
                (Some(vk), Some(name)) => {
                    let ty = match vk {
                        VarKind::Local => ctx.type_env.lookup(name).cloned().unwrap_or(Type::Nil),
                        _ => self.read_variable(target, ctx, vk, name).unwrap_or(Type::Any),
                    };
                    (ty, ctx.clone())
                }
                _ => (Type::Any, ctx.clone()),
            },
        }
    }

    /// Write `value` back to a compound-assignment target.
    fn write_target(&mut self, target: Node<'a>, ctx: &Context, value: &Type) -> Context {
        match target.kind() {
            NodeKind::Send | NodeKind::Csend => {
                let Some(name) = target.symbol(1) else {
                    return ctx.clone();
                };
                let receiver = target.child(0);
                let recv_ty = match receiver {
                    Some(r) => self.typing.type_of(r.id()).cloned().unwrap_or(Type::Any),
                    None => ctx.self_type.clone(),
                };
                let mut args: Vec<Type> = target
                    .child_nodes_from(2)
                    .iter()
                    .map(|a| self.typing.type_of(a.id()).cloned().unwrap_or(Type::Any))
                    .collect();
                args.push(value.clone());
                let writer = if name == "[]" { "[]=".to_string() } else { format!("{}=", name) };
                self.call_with_types(target, ctx, &recv_ty, receiver, &writer, args);
                ctx.clone()
            }
            _ => self.bind_target(target, ctx, value),
        }
    }

    /// `target op= value`.
    pub(super) fn synth_op_asgn(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let (Some(target), Some(op), Some(rhs)) = (node.child(0), node.symbol(1), node.child(2)) else {
            return self.unsupported(node, ctx);
        };
        let (current, ctx) = self.read_target(target, ctx);
        let value = self.synth(rhs, &ctx, None);
        let result = self.call_with_types(node, &value.ctx, &current, None, op, vec![value.ty.clone()]);
        let ctx = self.write_target(target, &value.ctx, &result);
        self.typing.add_type(target.id(), current);
        Pair::new(result, ctx)
    }

    /// `target ||= value` and `target &&= value`.
    pub(super) fn synth_logic_asgn(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let (Some(target), Some(rhs)) = (node.child(0), node.child(1)) else {
            return self.unsupported(node, ctx);
        };
        let (current, ctx) = self.read_target(target, ctx);
        self.typing.add_type(target.id(), current.clone());
        let or = node.is(NodeKind::OrAsgn);
        let kept = if or { current.truthy_part() } else { current.falsy_part() };
        let skips_rhs = if or { !current.may_be_falsy() } else { current.truthy_part().is_bot() };
        let hint = match target.kind() {
            NodeKind::Lvasgn => target
                .symbol(0)
                .and_then(|n| ctx.type_env.declared(n).cloned())
                .or_else(|| Some(current.without_nil())),
            _ => Some(current.without_nil()),
        };
        if skips_rhs && !current.is_any() {
            // The value never runs; only its own errors are kept.
            self.synth(rhs, &ctx, hint.as_ref());
            return Pair::new(current, ctx);
        }
        let value = self.synth(rhs, &ctx, hint.as_ref());
        if value.ty.is_bot() {
            return Pair::new(kept, ctx);
        }
        let assigned = self.write_target(target, &value.ctx, &value.ty);
        let ty = Type::union(vec![kept, value.ty.clone()]);
        let ctx = match target.kind() {
            NodeKind::Lvasgn => match target.symbol(0) {
                Some(name) if ctx.type_env.declared(name).is_none() => {
                    assigned.with_env(assigned.type_env.assign(name, ty.clone()))
                }
                _ => assigned,
            },
            _ => assigned,
        };
        Pair::new(ty, ctx)
    }
}

/// The written name of a constant reference, `A::B` for scoped ones.
pub(crate) fn const_name(node: Node<'_>) -> Option<String> {
    let name = node.symbol(1)?;
    match node.child(0) {
        Some(scope) if scope.is(NodeKind::Const) => Some(format!("{}::{}", const_name(scope)?, name)),
        _ => Some(name.to_string()),
    }
}

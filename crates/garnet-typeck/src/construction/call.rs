//! Method call resolution.
//!
//! A call is typed against each overload of the method in turn, inside a
//! typing checkpoint. The first overload that accepts the arguments wins;
//! when none does, the errors of the one overload whose arity fits are
//! reported, or `UnresolvedOverloading` when that is ambiguous.

use garnet_syntax::{Node, NodeKind};
use tracing::debug;

use super::{JumpFrame, Pair, TypeConstruction};
use crate::constraints::Constraints;
use crate::context::{BlockContext, BreakContext, Context};
use crate::error::{TypeError, TypeErrorKind};
use crate::method_call::MethodCall;
use crate::method_type::{BlockType, MethodType, Params};
use crate::shape::MethodEntry;
use crate::sig::Visibility;
use crate::subst::Substitution;
use crate::subtyping::Check;
use crate::ty::{Type, TypeVar};
use crate::type_env::TypeEnv;

// ── Arguments ──────────────────────────────────────────────────────────

/// One positional argument.
#[derive(Clone, Debug)]
pub(crate) enum Arg<'a> {
    Node(Node<'a>),
    Splat(Node<'a>),
    /// A value whose type is already known.
    Typed(Type),
}

/// The block of a call.
#[derive(Clone, Copy, Debug)]
pub(crate) enum CallBlock<'a> {
    /// `{ |x| ... }`: the `block`/`numblock` node.
    Body(Node<'a>),
    /// `&expr`
    Pass(Node<'a>),
    /// The enclosing method's block, passed on by `super`.
    Forwarded,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct CallArgs<'a> {
    pub positional: Vec<Arg<'a>>,
    /// The trailing `kwargs` node.
    pub keywords: Option<Node<'a>>,
    /// Keywords whose types are already known.
    pub typed_keywords: Vec<(String, Type)>,
    pub block_pass: Option<Node<'a>>,
}

impl<'a> CallArgs<'a> {
    /// The arguments of `node` from child slot `start` on.
    pub fn collect(node: Node<'a>, start: usize) -> Self {
        let mut args = CallArgs::default();
        for child in node.child_nodes_from(start) {
            match child.kind() {
                NodeKind::BlockPass => args.block_pass = Some(child),
                NodeKind::Kwargs => args.keywords = Some(child),
                NodeKind::Splat => args.positional.push(Arg::Splat(child)),
                _ => args.positional.push(Arg::Node(child)),
            }
        }
        args
    }

    pub fn typed(types: Vec<Type>) -> Self {
        CallArgs {
            positional: types.into_iter().map(Arg::Typed).collect(),
            ..CallArgs::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
            && self.keywords.is_none()
            && self.typed_keywords.is_empty()
            && self.block_pass.is_none()
    }
}

/// A positional value after splats are expanded.
enum ArgValue<'a> {
    Node(Node<'a>),
    Typed(Type),
    /// Any number of values of this type, from `*array`.
    Rest(Type, Node<'a>),
}

/// The outcome of typing a call against one overload.
struct Attempt {
    ret: Type,
    ctx: Context,
    /// Errors that reject this overload.
    errors: Vec<TypeError>,
    /// Diagnostics kept whether or not the overload is chosen.
    notes: Vec<TypeError>,
    /// Whether argument counts, keywords and block presence fit.
    arity_ok: bool,
    method_type: MethodType,
}

fn at(node: Node<'_>, kind: TypeErrorKind) -> TypeError {
    TypeError::new(node.id(), node.range(), kind)
}

/// Each unknown replaced by its lower bounds so far, or `untyped`.
fn partial_solution(constraints: &mut Constraints) -> Substitution {
    let vars: Vec<TypeVar> = constraints.vars().to_vec();
    let anything = Substitution::build(vars.clone(), vec![Type::Any; vars.len()]);
    let mut out = Substitution::new();
    for var in vars {
        let bounds = constraints.bounds(&var);
        let ty = if bounds.lower.is_empty() {
            Type::Any
        } else {
            Type::union(bounds.lower).widen_literals().subst(&anything)
        };
        out.add(var, ty);
    }
    out
}

impl<'a> TypeConstruction<'a> {
    // ── Dispatch on the receiver ───────────────────────────────────────

    /// Type a call of `name` on a value of `recv_ty` and record it on
    /// `node`. Returns the call's type, its context, and whether the
    /// method is pure.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn dispatch_call(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        recv_ty: &Type,
        receiver: Option<Node<'a>>,
        name: &str,
        args: &CallArgs<'a>,
        block: Option<CallBlock<'a>>,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
    ) -> (Pair, bool) {
        let resolved = self.resolve_self(ctx, recv_ty);
        let expanded = self.expand(&resolved);
        match &expanded {
            Type::Any => {
                let ctx = self.synth_args_untyped(args, block, ctx);
                self.typing.add_call(node.id(), MethodCall::Untyped { method: name.to_string() });
                (Pair::new(Type::Any, ctx), false)
            }
            Type::Union(members) => {
                self.dispatch_union(node, ctx, recv_ty, members, receiver, name, args, block, hint, type_args)
            }
            _ => {
                let (call, pair, pure) =
                    self.dispatch_single(node, ctx, &expanded, recv_ty, receiver, name, args, block, hint, type_args);
                self.typing.add_call(node.id(), call);
                (pair, pure)
            }
        }
    }

    /// Find the method for a non-union receiver, or report it missing.
    fn find_method(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        receiver_ty: &Type,
        receiver: Option<Node<'a>>,
        name: &str,
    ) -> Option<MethodEntry> {
        let lookup_ty = match receiver_ty {
            Type::Var(v) => ctx.var_bounds().get(v).cloned().unwrap_or_else(Type::object),
            Type::Void | Type::Top | Type::Bot => return None,
            other => other.clone(),
        };
        let entry = self.lookup(node, &lookup_ty, name)?;
        let implicit_self = receiver.map_or(true, |r| r.is(NodeKind::SelfNode));
        if entry.visibility == Visibility::Private && !implicit_self {
            return None;
        }
        Some(entry)
    }

    fn is_dynamic(&self, ctx: &Context, receiver: Option<Node<'a>>, name: &str) -> bool {
        receiver.map_or(true, |r| r.is(NodeKind::SelfNode))
            && ctx
                .module_context
                .as_ref()
                .is_some_and(|m| m.dynamic_methods.iter().any(|d| d == name))
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_single(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        receiver_ty: &Type,
        shown_ty: &Type,
        receiver: Option<Node<'a>>,
        name: &str,
        args: &CallArgs<'a>,
        block: Option<CallBlock<'a>>,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
    ) -> (MethodCall, Pair, bool) {
        let Some(entry) = self.find_method(node, ctx, receiver_ty, receiver, name) else {
            let ctx = self.synth_args_untyped(args, block, ctx);
            if self.is_dynamic(&ctx, receiver, name) {
                return (MethodCall::Untyped { method: name.to_string() }, Pair::new(Type::Any, ctx), false);
            }
            self.error(
                node,
                TypeErrorKind::NoMethod {
                    receiver: shown_ty.clone(),
                    method: name.to_string(),
                },
            );
            let call = MethodCall::NoMethodError {
                receiver: shown_ty.clone(),
                method: name.to_string(),
            };
            // A receiver that never produces a value keeps the call diverging.
            let ty = if receiver_ty.is_bot() { Type::Bot } else { Type::Any };
            return (call, Pair::new(ty, ctx), false);
        };
        let (call, pair) =
            self.resolve_overloads(node, ctx, shown_ty, name, &entry.overloads, args, block, hint, type_args);
        (call, pair, entry.pure)
    }

    /// A union receiver: the method must exist on every member, and the
    /// call's type is the union over members.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_union(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        recv_ty: &Type,
        members: &[Type],
        receiver: Option<Node<'a>>,
        name: &str,
        args: &CallArgs<'a>,
        block: Option<CallBlock<'a>>,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
    ) -> (Pair, bool) {
        let members: Vec<Type> = members.iter().map(|m| self.expand(m)).collect();
        if members.iter().any(Type::is_any) {
            let ctx = self.synth_args_untyped(args, block, ctx);
            self.typing.add_call(node.id(), MethodCall::Untyped { method: name.to_string() });
            return (Pair::new(Type::Any, ctx), false);
        }
        let missing = {
            let probe = self.typing.checkpoint();
            let missing = members
                .iter()
                .any(|m| self.find_method(node, ctx, m, receiver, name).is_none());
            self.typing.rollback(probe);
            missing
        };
        if missing {
            let ctx = self.synth_args_untyped(args, block, ctx);
            self.error(
                node,
                TypeErrorKind::NoMethod {
                    receiver: recv_ty.clone(),
                    method: name.to_string(),
                },
            );
            self.typing.add_call(
                node.id(),
                MethodCall::NoMethodError {
                    receiver: recv_ty.clone(),
                    method: name.to_string(),
                },
            );
            return (Pair::new(Type::Any, ctx), false);
        }

        let mut returns = Vec::new();
        let mut saved = Vec::new();
        let mut method_types = Vec::new();
        let mut failed = false;
        let mut pure = true;
        let mut last = Pair::new(Type::Any, ctx.clone());
        let count = members.len();
        for (i, member) in members.iter().enumerate() {
            let final_member = i + 1 == count;
            let cp = self.typing.checkpoint();
            let mark = self.jump_mark();
            let (call, pair, member_pure) =
                self.dispatch_single(node, ctx, member, member, receiver, name, args, block, hint, type_args);
            pure &= member_pure;
            failed |= call.is_error();
            match &call {
                MethodCall::Typed { method_type, .. } => method_types.push(method_type.clone()),
                MethodCall::Error { method_types: mts, .. } => method_types.extend(mts.iter().cloned()),
                _ => {}
            }
            returns.push(pair.ty.clone());
            if final_member {
                self.typing.commit(cp);
                last = pair;
            } else {
                saved.extend(self.typing.errors_since(&cp).iter().cloned());
                self.typing.rollback(cp);
                self.jump_reset(mark);
            }
        }
        for error in saved {
            if !self.typing.errors().contains(&error) {
                self.typing.add_error(error);
            }
        }
        let ty = Type::union(returns);
        let call = if failed {
            MethodCall::Error {
                receiver: recv_ty.clone(),
                method: name.to_string(),
                method_types,
                return_type: ty.clone(),
            }
        } else {
            MethodCall::Typed {
                receiver: recv_ty.clone(),
                method: name.to_string(),
                method_type: method_types.pop().unwrap_or_else(|| MethodType::simple(Params::empty(), ty.clone())),
                return_type: ty.clone(),
            }
        };
        self.typing.add_call(node.id(), call);
        (Pair::new(ty, last.ctx), pure)
    }

    /// Call `name` with arguments of known types; returns the result type.
    pub(crate) fn call_with_types(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        recv_ty: &Type,
        receiver: Option<Node<'a>>,
        name: &str,
        arg_types: Vec<Type>,
    ) -> Type {
        let args = CallArgs::typed(arg_types);
        self.dispatch_call(node, ctx, recv_ty, receiver, name, &args, None, None, None).0.ty
    }

    // ── Overloads ──────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn resolve_overloads(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        recv_ty: &Type,
        name: &str,
        overloads: &[MethodType],
        args: &CallArgs<'a>,
        block: Option<CallBlock<'a>>,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
    ) -> (MethodCall, Pair) {
        if overloads.is_empty() {
            let ctx = self.synth_args_untyped(args, block, ctx);
            return (MethodCall::Untyped { method: name.to_string() }, Pair::new(Type::Any, ctx));
        }
        let mut fitting = Vec::new();
        for (i, mt) in overloads.iter().enumerate() {
            let cp = self.typing.checkpoint();
            let mark = self.jump_mark();
            let attempt = self.try_overload(node, ctx, mt, args, block, hint, type_args);
            if attempt.errors.is_empty() {
                self.typing.commit(cp);
                for note in attempt.notes {
                    self.typing.add_error(note);
                }
                debug!(method = name, overload = %mt, ret = %attempt.ret, "resolved call");
                let call = MethodCall::Typed {
                    receiver: recv_ty.clone(),
                    method: name.to_string(),
                    method_type: attempt.method_type,
                    return_type: attempt.ret.clone(),
                };
                return (call, Pair::new(attempt.ret, attempt.ctx));
            }
            if attempt.arity_ok {
                fitting.push(i);
            }
            self.typing.rollback(cp);
            self.jump_reset(mark);
        }

        let chosen = match (overloads.len(), fitting.as_slice()) {
            (1, _) => Some(0),
            (_, [only]) => Some(*only),
            _ => None,
        };
        match chosen {
            Some(i) => {
                let attempt = self.try_overload(node, ctx, &overloads[i], args, block, hint, type_args);
                debug!(method = name, errors = attempt.errors.len(), "call rejected");
                for error in attempt.errors.into_iter().chain(attempt.notes) {
                    self.typing.add_error(error);
                }
                let call = MethodCall::Error {
                    receiver: recv_ty.clone(),
                    method: name.to_string(),
                    method_types: overloads.to_vec(),
                    return_type: attempt.ret.clone(),
                };
                (call, Pair::new(attempt.ret, attempt.ctx))
            }
            None => {
                debug!(method = name, candidates = overloads.len(), "ambiguous overloads");
                let ctx = self.synth_args_untyped(args, block, ctx);
                self.error(
                    node,
                    TypeErrorKind::UnresolvedOverloading {
                        receiver: recv_ty.clone(),
                        method: name.to_string(),
                        candidates: overloads.to_vec(),
                    },
                );
                let ret = Type::union(
                    overloads
                        .iter()
                        .map(|mt| if mt.ret().free_variables().is_empty() { mt.ret().clone() } else { Type::Any })
                        .collect(),
                );
                let call = MethodCall::Error {
                    receiver: recv_ty.clone(),
                    method: name.to_string(),
                    method_types: overloads.to_vec(),
                    return_type: ret.clone(),
                };
                (call, Pair::new(ret, ctx))
            }
        }
    }

    /// Explicit type arguments substituted for the method's parameters.
    fn apply_type_args(&mut self, node: Node<'a>, ctx: &Context, mt: &MethodType, given: &[Type], attempt: &mut Attempt) -> MethodType {
        let params = &mt.type_params;
        if given.len() < params.len() {
            attempt.arity_ok = false;
            attempt.errors.push(at(
                node,
                TypeErrorKind::InsufficientTypeArgument {
                    method_type: mt.clone(),
                    given: given.len(),
                },
            ));
            return mt.clone();
        }
        if given.len() > params.len() {
            attempt.arity_ok = false;
            attempt.errors.push(at(
                node,
                TypeErrorKind::UnexpectedTypeArgument {
                    method_type: mt.clone(),
                    type_arg: given[params.len()].clone(),
                },
            ));
        }
        let given = &given[..params.len()];
        let s = Substitution::build(params.iter().map(|p| p.var()).collect(), given.to_vec());
        for (param, arg) in params.iter().zip(given) {
            if let Some(bound) = &param.upper_bound {
                let bound = bound.subst(&s);
                if !self.is_subtype(node, ctx, arg, &bound) {
                    attempt.errors.push(at(
                        node,
                        TypeErrorKind::TypeArgumentMismatchError {
                            type_arg: arg.clone(),
                            param: param.name.clone(),
                            upper_bound: bound,
                        },
                    ));
                }
            }
        }
        let mut applied = mt.subst(&s);
        applied.type_params.clear();
        applied
    }

    #[allow(clippy::too_many_arguments)]
    fn try_overload(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        declared: &MethodType,
        args: &CallArgs<'a>,
        block: Option<CallBlock<'a>>,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
    ) -> Attempt {
        let mut attempt = Attempt {
            ret: Type::Any,
            ctx: ctx.clone(),
            errors: Vec::new(),
            notes: Vec::new(),
            arity_ok: true,
            method_type: declared.clone(),
        };
        let applied = match type_args {
            Some(given) => self.apply_type_args(node, ctx, declared, given, &mut attempt),
            None => declared.clone(),
        };
        let (mt, bounds) = applied.instantiate(&mut self.fresh);
        let mut cs = Constraints::new();
        for (var, bound) in &bounds {
            cs.add_var(var.clone(), bound.clone());
        }
        let params = &mt.func.params;

        // Positionals, with splats expanded.
        let mut values = Vec::new();
        for arg in &args.positional {
            match arg {
                Arg::Node(n) => values.push(ArgValue::Node(*n)),
                Arg::Typed(t) => values.push(ArgValue::Typed(t.clone())),
                Arg::Splat(n) => {
                    let pair = self.synth(*n, &attempt.ctx, None);
                    attempt.ctx = pair.ctx;
                    match self.expand(&pair.ty) {
                        Type::Tuple(elems) => values.extend(elems.into_iter().map(ArgValue::Typed)),
                        other => {
                            let elem = self.splat_element(&other);
                            if elem == other && !other.is_any() {
                                attempt.errors.push(at(*n, TypeErrorKind::UnexpectedSplat { ty: other }));
                            } else {
                                values.push(ArgValue::Rest(elem, *n));
                            }
                        }
                    }
                }
            }
        }
        let keywords_as_hash = args.keywords.is_some() && !params.has_keywords();
        if let (true, Some(kw)) = (keywords_as_hash, args.keywords) {
            values.push(ArgValue::Node(kw));
        }
        self.check_positionals(node, &mt, &values, &mut cs, &mut attempt);

        if !keywords_as_hash {
            self.check_keywords(node, &mt, args, &mut cs, &mut attempt);
        }

        let mut break_types = Vec::new();
        let block = block.or(args.block_pass.map(CallBlock::Pass));
        match (block, &mt.block) {
            (None, Some(bt)) if bt.required => {
                attempt.arity_ok = false;
                attempt.errors.push(at(node, TypeErrorKind::RequiredBlockMissing { method_type: declared.clone() }));
            }
            (None, _) | (Some(CallBlock::Forwarded), _) => {}
            (Some(CallBlock::Body(body)), None) => {
                attempt.arity_ok = false;
                attempt.errors.push(at(body, TypeErrorKind::UnexpectedBlockGiven { method_type: declared.clone() }));
                attempt.ctx = self.synth_untyped_block(body, &attempt.ctx);
            }
            (Some(CallBlock::Body(body)), Some(bt)) => {
                let outer = attempt.ctx.clone();
                let (ctx, breaks) = self.check_block(body, &outer, bt, mt.ret(), &mut cs, &mut attempt);
                attempt.ctx = ctx;
                break_types = breaks;
            }
            (Some(CallBlock::Pass(pass)), bt) => self.check_block_pass(pass, bt.as_ref(), declared, &mut cs, &mut attempt),
        }

        // The expected type of the call bounds what is still unknown.
        if let Some(expected) = hint {
            if !mt.ret().free_variables().is_empty() {
                let snapshot = cs.snapshot();
                let ctx = attempt.ctx.clone();
                if self.relate_with(node, &ctx, &mut cs, mt.ret(), expected).holds {
                    cs.commit(snapshot);
                } else {
                    cs.rollback_to(snapshot);
                }
            }
        }

        // Solve.
        let unconstrained: Vec<TypeVar> = bounds
            .iter()
            .filter(|(v, b)| {
                let bs = cs.bounds(v);
                b.is_none() && bs.lower.is_empty() && bs.upper.is_empty()
            })
            .map(|(v, _)| v.clone())
            .collect();
        let builder = self.builder;
        let (solution, failures) = {
            let mut check = Check::new(builder)
                .with_self(attempt.ctx.self_subst())
                .with_var_bounds(attempt.ctx.var_bounds());
            cs.solve(&mut check)
        };
        for failure in failures {
            attempt.errors.push(at(
                node,
                TypeErrorKind::UnsatisfiableConstraint {
                    var: failure.var.name.clone(),
                    lower: failure.lower,
                    upper: failure.upper,
                    method_type: declared.clone(),
                },
            ));
        }
        if mt.ret().free_variables().iter().any(|v| unconstrained.contains(v)) {
            attempt.notes.push(at(node, TypeErrorKind::FallbackAny));
        }
        let ret = mt.ret().subst(&solution);
        attempt.ret = if break_types.is_empty() {
            ret
        } else {
            break_types.push(ret);
            Type::union(break_types)
        };
        attempt.method_type = mt.subst(&solution);
        attempt
    }

    fn check_positionals(
        &mut self,
        node: Node<'a>,
        mt: &MethodType,
        values: &[ArgValue<'a>],
        cs: &mut Constraints,
        attempt: &mut Attempt,
    ) {
        let params = &mt.func.params;
        let has_rest_value = values.iter().any(|v| matches!(v, ArgValue::Rest(..)));
        let fixed = values.iter().filter(|v| !matches!(v, ArgValue::Rest(..))).count();

        let slots: Vec<Type> = if has_rest_value {
            // Without a rest parameter the splat needs a free slot.
            if params.max_positionals().is_some_and(|max| fixed >= max) {
                attempt.arity_ok = false;
                attempt
                    .errors
                    .push(at(node, TypeErrorKind::UnexpectedPositionalArgument { method_type: mt.clone() }));
            }
            params.positional_types()
        } else {
            match params.assign_positionals(fixed) {
                Some(assigned) => assigned.into_iter().map(|(_, t)| t).collect(),
                None => {
                    attempt.arity_ok = false;
                    if fixed < params.min_positionals() {
                        attempt
                            .errors
                            .push(at(node, TypeErrorKind::InsufficientPositionalArguments { method_type: mt.clone() }));
                    } else {
                        let extra = match values.get(params.max_positionals().unwrap_or(0)) {
                            Some(ArgValue::Node(n)) => *n,
                            _ => node,
                        };
                        attempt
                            .errors
                            .push(at(extra, TypeErrorKind::UnexpectedPositionalArgument { method_type: mt.clone() }));
                    }
                    params.positional_types()
                }
            }
        };

        let mut slot = 0;
        for value in values {
            match value {
                ArgValue::Rest(elem, n) => {
                    // Covers every remaining slot.
                    for expected in slots.iter().skip(slot) {
                        self.check_value(*n, elem, expected, cs, attempt);
                    }
                    slot = slots.len();
                }
                ArgValue::Node(n) => match slots.get(slot) {
                    Some(expected) => {
                        let hint = expected.subst(&partial_solution(cs));
                        let pair = self.synth(*n, &attempt.ctx, Some(&hint));
                        attempt.ctx = pair.ctx.clone();
                        self.check_value(*n, &pair.ty, expected, cs, attempt);
                        slot += 1;
                    }
                    None => {
                        attempt.ctx = self.synth(*n, &attempt.ctx, None).ctx;
                    }
                },
                ArgValue::Typed(t) => {
                    if let Some(expected) = slots.get(slot) {
                        self.check_value(node, t, expected, cs, attempt);
                        slot += 1;
                    }
                }
            }
        }
    }

    fn check_value(&mut self, node: Node<'a>, actual: &Type, expected: &Type, cs: &mut Constraints, attempt: &mut Attempt) {
        let ctx = attempt.ctx.clone();
        let result = self.relate_with(node, &ctx, cs, actual, expected);
        if !result.holds {
            attempt.errors.push(at(
                node,
                TypeErrorKind::ArgumentTypeMismatch {
                    expected: expected.clone(),
                    actual: actual.clone(),
                    trace: result.trace,
                },
            ));
        }
    }

    fn check_keywords(
        &mut self,
        node: Node<'a>,
        mt: &MethodType,
        args: &CallArgs<'a>,
        cs: &mut Constraints,
        attempt: &mut Attempt,
    ) {
        let params = &mt.func.params;
        let mut given: Vec<String> = Vec::new();
        let mut splatted = false;

        if let Some(kw) = args.keywords {
            let mut fields = Vec::new();
            for entry in kw.child_nodes() {
                let key_name = entry.child(0).filter(|k| k.is(NodeKind::Sym)).and_then(|k| k.symbol(0));
                match (entry.kind(), key_name, entry.child(1)) {
                    (NodeKind::Pair, Some(name), Some(value)) => {
                        if let Some(key) = entry.child(0) {
                            self.typing.add_type(key.id(), Type::sym_lit(name));
                        }
                        given.push(name.to_string());
                        match params.keyword(name) {
                            Some((expected, _)) => {
                                let expected = expected.clone();
                                let hint = expected.subst(&partial_solution(cs));
                                let pair = self.synth(value, &attempt.ctx, Some(&hint));
                                attempt.ctx = pair.ctx.clone();
                                self.check_value(value, &pair.ty, &expected, cs, attempt);
                                self.typing.add_type(entry.id(), pair.ty.clone());
                                fields.push((crate::ty::RecordKey::Sym(name.to_string()), pair.ty));
                            }
                            None => {
                                attempt.arity_ok = false;
                                attempt.errors.push(at(
                                    entry,
                                    TypeErrorKind::UnexpectedKeywordArgument {
                                        method_type: mt.clone(),
                                        name: name.to_string(),
                                    },
                                ));
                                let pair = self.synth(value, &attempt.ctx, None);
                                attempt.ctx = pair.ctx;
                            }
                        }
                    }
                    _ => {
                        splatted = true;
                        attempt.ctx = self.synth(entry, &attempt.ctx, None).ctx;
                    }
                }
            }
            self.typing.add_type(kw.id(), Type::Record(fields));
        }

        for (name, ty) in &args.typed_keywords {
            if let Some((expected, _)) = params.keyword(name) {
                let expected = expected.clone();
                self.check_value(node, ty, &expected, cs, attempt);
                given.push(name.clone());
            }
        }

        let missing: Vec<String> = params
            .required_keywords
            .iter()
            .filter(|(n, _)| !given.contains(n))
            .map(|(n, _)| n.clone())
            .collect();
        if !missing.is_empty() && !splatted {
            attempt.arity_ok = false;
            attempt.errors.push(at(
                node,
                TypeErrorKind::InsufficientKeywordArguments {
                    method_type: mt.clone(),
                    missing,
                },
            ));
        }
    }

    // ── Blocks ─────────────────────────────────────────────────────────

    /// Type a block body against the block type of the selected overload.
    /// Returns the context after the call and the types of `break` values.
    fn check_block(
        &mut self,
        body_node: Node<'a>,
        ctx: &Context,
        bt: &BlockType,
        call_ret: &Type,
        cs: &mut Constraints,
        attempt: &mut Attempt,
    ) -> (Context, Vec<Type>) {
        let partial = partial_solution(cs);
        let params = bt.func.params.map_types(&mut |t| t.subst(&partial));
        let expected = bt.func.ret.clone();
        let expected_now = expected.subst(&partial);

        let mut inner = ctx.clone();
        if let Some(self_type) = &bt.self_type {
            inner.self_type = self_type.subst(&partial);
        }
        inner.block_context = Some(BlockContext {
            body_type: Some(expected_now.clone()),
            lambda: false,
        });
        inner.break_context = Some(BreakContext {
            break_type: call_ret.subst(&partial),
            next_type: Some(expected_now.clone()),
        });
        let mut inner = self.apply_annotations(body_node, &inner);
        let annotated = inner
            .block_context
            .as_ref()
            .and_then(|b| b.body_type.clone())
            .filter(|t| *t != expected_now);
        inner = self.bind_block_params(body_node, &params, &inner);

        self.push_jumps();
        let body_hint = if expected_now == Type::Void { None } else { Some(&expected_now) };
        let body = self.synth_body(body_node.child(2), &inner, annotated.as_ref().or(body_hint));
        let frame = self.pop_jumps();

        let report_on = body_node.child(2).unwrap_or(body_node);
        if let Some(annotation) = &annotated {
            let result = self.relate(report_on, &body.ctx, &body.ty, annotation);
            if !result.holds {
                attempt.errors.push(at(
                    report_on,
                    TypeErrorKind::BlockBodyTypeMismatch {
                        expected: annotation.clone(),
                        actual: body.ty.clone(),
                        trace: result.trace,
                    },
                ));
            }
        }
        let body_ty = annotated.unwrap_or(body.ty.clone());
        if expected != Type::Void && !body_ty.is_bot() {
            let result = self.relate_with(report_on, &body.ctx, cs, &body_ty, &expected);
            if !result.holds {
                attempt.errors.push(at(
                    report_on,
                    TypeErrorKind::BlockBodyTypeMismatch {
                        expected: expected_now,
                        actual: body_ty,
                        trace: result.trace,
                    },
                ));
            }
        }
        let ctx = self.after_block(ctx, &body, &frame);
        (ctx, frame.breaks.into_iter().map(|(t, _)| t).collect())
    }

    /// The outer context once a block may have run any number of times.
    pub(super) fn after_block(&self, outer: &Context, body: &Pair, frame: &JumpFrame) -> Context {
        let mut ends = vec![body.ctx.type_env.clone()];
        ends.extend(frame.nexts.iter().cloned());
        let inner = TypeEnv::join(&ends);
        outer.with_env(outer.type_env.widen_from(&inner))
    }

    fn check_block_pass(
        &mut self,
        pass: Node<'a>,
        bt: Option<&BlockType>,
        declared: &MethodType,
        cs: &mut Constraints,
        attempt: &mut Attempt,
    ) {
        let inner = pass.child(0);
        let symbol = inner.filter(|n| n.is(NodeKind::Sym)).and_then(|n| n.symbol(0));
        let Some(bt) = bt else {
            let pair = self.synth(pass, &attempt.ctx, None);
            attempt.ctx = pair.ctx;
            if !pair.ty.is_nil() {
                attempt.arity_ok = false;
                attempt
                    .errors
                    .push(at(pass, TypeErrorKind::UnexpectedBlockGiven { method_type: declared.clone() }));
            }
            return;
        };

        if let (Some(sym_node), Some(method)) = (inner, symbol) {
            // `&:name` calls `name` on the first block parameter.
            self.typing.add_type(sym_node.id(), Type::sym_lit(method));
            self.typing.add_type(pass.id(), Type::symbol());
            let partial = partial_solution(cs);
            let Some(first) = bt.func.params.positional_types().first().map(|t| t.subst(&partial)) else {
                return;
            };
            let ctx = attempt.ctx.clone();
            let ret = self.call_with_types(pass, &ctx, &first, Some(pass), method, Vec::new());
            if bt.func.ret != Type::Void {
                let result = self.relate_with(pass, &ctx, cs, &ret, &bt.func.ret);
                if !result.holds {
                    attempt.errors.push(at(
                        pass,
                        TypeErrorKind::BlockTypeMismatch {
                            expected: bt.to_proc(),
                            actual: ret,
                            trace: result.trace,
                        },
                    ));
                }
            }
            return;
        }

        let expected = bt.to_proc();
        let hint = expected.subst(&partial_solution(cs));
        let pair = self.synth(pass, &attempt.ctx, Some(&hint));
        attempt.ctx = pair.ctx.clone();
        if pair.ty.is_nil() {
            if bt.required {
                attempt.arity_ok = false;
                attempt
                    .errors
                    .push(at(pass, TypeErrorKind::RequiredBlockMissing { method_type: declared.clone() }));
            }
            return;
        }
        let actual = if bt.required { pair.ty.clone() } else { pair.ty.without_nil() };
        let ctx = attempt.ctx.clone();
        let result = self.relate_with(pass, &ctx, cs, &actual, &expected);
        if !result.holds {
            attempt.errors.push(at(
                pass,
                TypeErrorKind::BlockTypeMismatch {
                    expected,
                    actual,
                    trace: result.trace,
                },
            ));
        }
    }

    /// Type a block whose parameters and body have no expected types.
    pub(crate) fn synth_untyped_block(&mut self, block: Node<'a>, ctx: &Context) -> Context {
        let mut inner = ctx.clone();
        inner.block_context = Some(BlockContext {
            body_type: None,
            lambda: false,
        });
        inner.break_context = Some(BreakContext {
            break_type: Type::Any,
            next_type: Some(Type::Any),
        });
        let inner = self.apply_annotations(block, &inner);
        let inner = self.bind_block_params(block, &Params::empty(), &inner);
        self.push_jumps();
        let body = self.synth_body(block.child(2), &inner, None);
        let frame = self.pop_jumps();
        self.after_block(ctx, &body, &frame)
    }

    /// Bind the parameters of a `block`/`numblock` node. Missing values
    /// are `nil`, as the runtime passes them; with no parameter types at
    /// all every parameter is `untyped`.
    pub(crate) fn bind_block_params(&mut self, block: Node<'a>, params: &Params, ctx: &Context) -> Context {
        let untyped = params.is_empty();
        let mut slots = params.required.clone();
        slots.extend(params.optional.iter().cloned());
        let rest = params.rest.clone();
        let slot = |slots: &[Type], i: usize| -> Type {
            if untyped {
                return Type::Any;
            }
            slots.get(i).cloned().or_else(|| rest.clone()).unwrap_or(Type::Nil)
        };

        if block.is(NodeKind::Numblock) {
            let max = block.int(1).unwrap_or(1).max(1);
            let slots = if max > 1 && slots.len() == 1 { self.auto_splat(&slots[0]) } else { slots };
            let mut env = ctx.type_env.clone();
            for i in 0..max as usize {
                env = env.assign(&format!("_{}", i + 1), slot(&slots, i));
            }
            return ctx.with_env(env);
        }

        let Some(args) = block.child(1) else {
            return ctx.clone();
        };
        let arg_nodes: Vec<Node<'a>> = args.child_nodes().collect();
        let positional_count = arg_nodes
            .iter()
            .filter(|n| matches!(n.kind(), NodeKind::Arg | NodeKind::Optarg | NodeKind::Mlhs | NodeKind::Procarg0))
            .count();
        let slots = if positional_count > 1 && slots.len() == 1 && rest.is_none() {
            self.auto_splat(&slots[0])
        } else {
            slots
        };
        self.typing.add_type(args.id(), Type::Any);

        let mut ctx = ctx.clone();
        let mut index = 0;
        for arg in arg_nodes {
            match arg.kind() {
                NodeKind::Arg | NodeKind::Procarg0 | NodeKind::Mlhs => {
                    let ty = slot(&slots, index);
                    index += 1;
                    ctx = self.bind_param_pattern(arg, &ty, &ctx);
                }
                NodeKind::Optarg => {
                    let ty = slot(&slots, index);
                    index += 1;
                    if let Some(default) = arg.child(1) {
                        ctx = self.synth(default, &ctx, Some(&ty)).ctx;
                    }
                    ctx = self.bind_param(arg, ty, &ctx);
                }
                NodeKind::Restarg => {
                    let remaining: Vec<Type> = slots.iter().skip(index).cloned().chain(rest.clone()).collect();
                    let elem = if untyped || remaining.is_empty() { Type::Any } else { Type::union(remaining) };
                    ctx = self.bind_param(arg, Type::array(elem), &ctx);
                }
                NodeKind::Kwarg | NodeKind::Kwoptarg => {
                    let name = arg.symbol(0).unwrap_or_default();
                    let ty = params.keyword(name).map(|(t, _)| t.clone()).unwrap_or(Type::Any);
                    if let Some(default) = arg.child(1) {
                        ctx = self.synth(default, &ctx, Some(&ty)).ctx;
                    }
                    ctx = self.bind_param(arg, ty, &ctx);
                }
                NodeKind::Kwrestarg => {
                    let ty = Type::hash(Type::symbol(), params.rest_keywords.clone().unwrap_or(Type::Any));
                    ctx = self.bind_param(arg, ty, &ctx);
                }
                NodeKind::Blockarg => {
                    ctx = self.bind_param(arg, Type::optional(Type::instance("Proc")), &ctx);
                }
                _ => {
                    ctx = self.unsupported(arg, &ctx).ctx;
                }
            }
        }
        ctx
    }

    /// Bind one named parameter node.
    pub(super) fn bind_param(&mut self, arg: Node<'a>, ty: Type, ctx: &Context) -> Context {
        self.typing.add_type(arg.id(), ty.clone());
        match arg.symbol(0) {
            Some(name) => ctx.with_env(ctx.type_env.assign(name, ty)),
            None => ctx.clone(),
        }
    }

    /// Bind `arg`, `procarg0` and destructuring `mlhs` parameters.
    pub(super) fn bind_param_pattern(&mut self, arg: Node<'a>, ty: &Type, ctx: &Context) -> Context {
        match arg.kind() {
            NodeKind::Arg => self.bind_param(arg, ty.clone(), ctx),
            NodeKind::Procarg0 if arg.symbol(0).is_some() => self.bind_param(arg, ty.clone(), ctx),
            NodeKind::Procarg0 | NodeKind::Mlhs => {
                let parts: Vec<Node<'a>> = arg.child_nodes().collect();
                self.typing.add_type(arg.id(), ty.clone());
                if arg.is(NodeKind::Procarg0) && parts.len() == 1 {
                    return self.bind_param_pattern(parts[0], ty, ctx);
                }
                let elems = self.auto_splat(ty);
                let mut ctx = ctx.clone();
                for (i, part) in parts.into_iter().enumerate() {
                    let elem = elems.get(i).cloned().unwrap_or(Type::Nil);
                    ctx = match part.kind() {
                        NodeKind::Restarg => {
                            let rest: Vec<Type> = elems.iter().skip(i).cloned().collect();
                            let elem = if rest.is_empty() { Type::Any } else { Type::union(rest) };
                            self.bind_param(part, Type::array(elem), &ctx)
                        }
                        _ => self.bind_param_pattern(part, &elem, &ctx),
                    };
                }
                ctx
            }
            _ => self.bind_param(arg, ty.clone(), ctx),
        }
    }

    /// The element types a value destructures into.
    fn auto_splat(&self, ty: &Type) -> Vec<Type> {
        match self.expand(ty) {
            Type::Tuple(elems) => elems,
            Type::Instance(name, args) if name == "Array" && args.len() == 1 => vec![args[0].clone(); 8],
            Type::Any => vec![Type::Any; 8],
            other => vec![other],
        }
    }

    // ── Untyped arguments ──────────────────────────────────────────────

    /// Type the arguments of a call that could not be resolved.
    pub(crate) fn synth_args_untyped(&mut self, args: &CallArgs<'a>, block: Option<CallBlock<'a>>, ctx: &Context) -> Context {
        let mut ctx = ctx.clone();
        for arg in &args.positional {
            match arg {
                Arg::Node(n) | Arg::Splat(n) => ctx = self.synth(*n, &ctx, None).ctx,
                Arg::Typed(_) => {}
            }
        }
        if let Some(kw) = args.keywords {
            ctx = self.synth(kw, &ctx, None).ctx;
        }
        if let Some(pass) = args.block_pass {
            ctx = self.synth(pass, &ctx, None).ctx;
        }
        match block {
            Some(CallBlock::Body(body)) => self.synth_untyped_block(body, &ctx),
            Some(CallBlock::Pass(pass)) if args.block_pass.map(|p| p.id()) != Some(pass.id()) => {
                self.synth(pass, &ctx, None).ctx
            }
            _ => ctx,
        }
    }

    // ── Jump bookkeeping across attempts ───────────────────────────────

    fn jump_mark(&self) -> Option<(usize, usize)> {
        self.jumps.last().map(|f| (f.breaks.len(), f.nexts.len()))
    }

    fn jump_reset(&mut self, mark: Option<(usize, usize)>) {
        if let (Some((breaks, nexts)), Some(frame)) = (mark, self.jumps.last_mut()) {
            frame.breaks.truncate(breaks);
            frame.nexts.truncate(nexts);
        }
    }
}

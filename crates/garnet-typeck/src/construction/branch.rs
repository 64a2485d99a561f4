//! Conditions, branches, loops and jumps.

use garnet_syntax::{Node, NodeKind};

use super::{value_used, Pair, TypeConstruction};
use crate::context::{BreakContext, Context};
use crate::error::TypeErrorKind;
use crate::logic::{call_path, join_branches, narrow_is_a, narrow_literal, narrow_nil, Branch, LogicResult, Pivot};
use crate::ty::{Literal, Type};
use crate::type_env::TypeEnv;

/// What drives a loop.
#[derive(Clone, Copy)]
enum LoopHead<'a> {
    /// `while`/`until`, with the condition checked after the body for the
    /// `_post` forms.
    Cond { cond: Node<'a>, until: bool, post: bool },
    /// `for target in ...`, binding an element each iteration.
    Each { target: Node<'a> },
}

/// One pass over a loop body.
struct LoopPass {
    /// Where the loop ends normally, if it can.
    exit: Option<TypeEnv>,
    /// The environment flowing back to the loop head.
    back: TypeEnv,
    breaks: Vec<(Type, TypeEnv)>,
}

impl<'a> TypeConstruction<'a> {
    // ── Conditions ─────────────────────────────────────────────────────

    /// Type `node` as a condition, narrowing what it tests.
    pub(crate) fn synth_cond(&mut self, node: Node<'a>, ctx: &Context) -> LogicResult {
        let result = match node.kind() {
            NodeKind::And | NodeKind::Or => self.cond_and_or(node, ctx),
            NodeKind::Begin if node.child_count() == 1 => match node.child(0) {
                Some(inner) => self.synth_cond(inner, ctx),
                None => LogicResult::plain(Type::Nil, ctx.type_env.clone()),
            },
            NodeKind::Send => match self.cond_send(node, ctx) {
                Some(result) => result,
                None => self.cond_plain(node, ctx),
            },
            _ => self.cond_plain(node, ctx),
        };
        self.typing.add_type(node.id(), result.ty.clone());
        result
    }

    fn cond_plain(&mut self, node: Node<'a>, ctx: &Context) -> LogicResult {
        let pair = self.synth(node, ctx, None);
        let env = pair.ctx.type_env.clone();
        let mut result = LogicResult::plain(pair.ty, env.clone());
        if node.is(NodeKind::Csend) {
            // `x&.m` is truthy only when `x` is not nil.
            if let Some(recv) = node.child(0) {
                if let Some(pivot) = self.pivot_of(recv, &env) {
                    if let Some(current) = pivot.current(&result.truthy.env) {
                        result.truthy.env = pivot.narrow(&result.truthy.env, current.without_nil());
                    }
                }
            }
        }
        if let Some(pivot) = self.pivot_of(node, &env) {
            if let Some(current) = pivot.current(&env) {
                result.truthy.env = pivot.narrow(&result.truthy.env, current.truthy_part());
                result.falsy.env = pivot.narrow(&result.falsy.env, current.falsy_part());
            }
        }
        result
    }

    fn cond_and_or(&mut self, node: Node<'a>, ctx: &Context) -> LogicResult {
        let (Some(lhs), Some(rhs)) = (node.child(0), node.child(1)) else {
            return self.cond_plain(node, ctx);
        };
        let is_and = node.is(NodeKind::And);
        let left = self.synth_cond(lhs, ctx);
        let (go, stop) = if is_and { (left.truthy, left.falsy) } else { (left.falsy, left.truthy) };
        let right = self.synth_cond(rhs, &ctx.with_env(go.env.clone()));

        let stop_ty = if is_and { left.ty.falsy_part() } else { left.ty.truthy_part() };
        let ty = if go.unreachable {
            stop_ty
        } else if stop.unreachable {
            right.ty.clone()
        } else {
            Type::union(vec![stop_ty, right.ty.clone()])
        };
        let right_truthy = Branch {
            env: right.truthy.env,
            unreachable: go.unreachable || right.truthy.unreachable,
        };
        let right_falsy = Branch {
            env: right.falsy.env,
            unreachable: go.unreachable || right.falsy.unreachable,
        };
        let (truthy, falsy) = if is_and {
            let falsy = Branch {
                env: join_branches(&[&stop, &right_falsy]),
                unreachable: stop.unreachable && right_falsy.unreachable,
            };
            (right_truthy, falsy)
        } else {
            let truthy = Branch {
                env: join_branches(&[&stop, &right_truthy]),
                unreachable: stop.unreachable && right_truthy.unreachable,
            };
            (truthy, right_falsy)
        };
        let env = join_branches(&[&truthy, &falsy]);
        LogicResult { ty, env, truthy, falsy }
    }

    /// Calls with a narrowing meaning: `!`, `nil?`, `is_a?` and friends,
    /// `===` and `== literal`.
    fn cond_send(&mut self, node: Node<'a>, ctx: &Context) -> Option<LogicResult> {
        let name = node.symbol(1)?;
        let recv = node.child(0)?;
        let args = node.child_nodes_from(2);
        match (name, args.as_slice()) {
            ("!", []) => {
                let inner = self.synth_cond(recv, ctx);
                let after = ctx.with_env(inner.env.clone());
                let ty = self.call_with_types(node, &after, &inner.ty, Some(recv), "!", Vec::new());
                Some(inner.negate(ty))
            }
            ("nil?", []) => {
                let pair = self.synth(recv, ctx, None);
                let ty = self.call_with_types(node, &pair.ctx, &pair.ty, Some(recv), "nil?", Vec::new());
                let env = pair.ctx.type_env.clone();
                let pivot = self.pivot_of(recv, &env);
                let current = pivot.as_ref().and_then(|p| p.current(&env)).unwrap_or(pair.ty);
                let (t, f) = self.with_check(&pair.ctx, |c| narrow_nil(c, &current));
                Some(narrowed(ty, env, pivot, t, f))
            }
            ("is_a?" | "kind_of?" | "instance_of?", [arg]) => {
                let pair = self.synth(recv, ctx, None);
                let arg_pair = self.synth(*arg, &pair.ctx, None);
                let ty = self.call_with_types(node, &arg_pair.ctx, &pair.ty, Some(recv), name, vec![arg_pair.ty.clone()]);
                let env = arg_pair.ctx.type_env.clone();
                let Some(target) = self.instance_of_singleton(&arg_pair.ty) else {
                    return Some(LogicResult::plain(ty, env));
                };
                let pivot = self.pivot_of(recv, &env);
                let current = pivot.as_ref().and_then(|p| p.current(&env)).unwrap_or(pair.ty);
                let (t, f) = self.with_check(&arg_pair.ctx, |c| narrow_is_a(c, &current, &target));
                // A subclass instance is not an `instance_of?` the class.
                let f = if name == "instance_of?" { current } else { f };
                Some(narrowed(ty, env, pivot, t, f))
            }
            ("===", [arg]) => {
                let pair = self.synth(recv, ctx, None);
                let arg_pair = self.synth(*arg, &pair.ctx, None);
                let ty = self.call_with_types(node, &arg_pair.ctx, &pair.ty, Some(recv), "===", vec![arg_pair.ty.clone()]);
                let env = arg_pair.ctx.type_env.clone();
                let pivot = self.pivot_of(*arg, &env);
                let current = pivot.as_ref().and_then(|p| p.current(&env)).unwrap_or(arg_pair.ty);
                let (t, f) = match self.case_test(recv, &pair.ty, &current, &arg_pair.ctx) {
                    Some(split) => split,
                    None => return Some(LogicResult::plain(ty, env)),
                };
                Some(narrowed(ty, env, pivot, t, f))
            }
            ("==", [arg]) => {
                let lit = literal_of(*arg)?;
                let pair = self.synth(recv, ctx, None);
                let arg_pair = self.synth(*arg, &pair.ctx, None);
                let ty = self.call_with_types(node, &arg_pair.ctx, &pair.ty, Some(recv), "==", vec![arg_pair.ty.clone()]);
                let env = arg_pair.ctx.type_env.clone();
                let pivot = self.pivot_of(recv, &env);
                let current = pivot.as_ref().and_then(|p| p.current(&env)).unwrap_or(pair.ty);
                let (t, f) = self.with_check(&arg_pair.ctx, |c| narrow_literal(c, &current, &lit));
                Some(narrowed(ty, env, pivot, t, f))
            }
            _ => None,
        }
    }

    /// How `test === value` splits `value`, for class, literal and `nil`
    /// tests.
    fn case_test(&mut self, test: Node<'a>, test_ty: &Type, value: &Type, ctx: &Context) -> Option<(Type, Type)> {
        if let Some(target) = self.instance_of_singleton(test_ty) {
            return Some(self.with_check(ctx, |c| narrow_is_a(c, value, &target)));
        }
        if test.is(NodeKind::Nil) {
            return Some(self.with_check(ctx, |c| narrow_nil(c, value)));
        }
        let lit = literal_of(test)?;
        Some(self.with_check(ctx, |c| narrow_literal(c, value, &lit)))
    }

    /// The instance type of a class object type, with `untyped` for its
    /// type arguments.
    fn instance_of_singleton(&self, ty: &Type) -> Option<Type> {
        let Type::Singleton(name) = ty else {
            return None;
        };
        let arity = self.builder.env().type_params(name).map_or(0, <[_]>::len);
        Some(Type::Instance(name.clone(), vec![Type::Any; arity]))
    }

    /// What narrowing `node` can affect.
    fn pivot_of(&self, node: Node<'_>, env: &TypeEnv) -> Option<Pivot> {
        match node.kind() {
            NodeKind::Lvar | NodeKind::Lvasgn => node.symbol(0).map(|n| Pivot::Local(n.to_string())),
            NodeKind::Begin if node.child_count() == 1 => node.child(0).and_then(|c| self.pivot_of(c, env)),
            NodeKind::Send => call_path(node).filter(|p| env.pure_call(p).is_some()).map(Pivot::Call),
            _ => None,
        }
    }

    // ── Branches ───────────────────────────────────────────────────────

    pub(super) fn synth_if(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let Some(cond) = node.child(0) else {
            return self.unsupported(node, ctx);
        };
        let result = self.synth_cond(cond, ctx);
        let base = ctx.with_env(result.env.clone());
        let then_pair = self.synth_branch(node.child(1), &base, &result.truthy, hint);
        let else_pair = self.synth_branch(node.child(2), &base, &result.falsy, hint);
        self.merge(&base, vec![then_pair, else_pair])
    }

    /// Type one arm of a branch. An arm no value can reach is typed for
    /// its own errors and reported, unless it diverges anyway.
    fn synth_branch(&mut self, body: Option<Node<'a>>, base: &Context, branch: &Branch, hint: Option<&Type>) -> Pair {
        let ctx = base.with_env(branch.env.clone());
        let Some(body) = body else {
            let ty = if branch.unreachable { Type::Bot } else { Type::Nil };
            return Pair::new(ty, ctx);
        };
        let pair = self.synth(body, &ctx, hint);
        if !branch.unreachable {
            return pair;
        }
        if !pair.ty.is_bot() {
            let kind = if value_used(body) {
                TypeErrorKind::UnreachableValueBranch { ty: pair.ty.clone() }
            } else {
                TypeErrorKind::UnreachableBranch
            };
            self.error(body, kind);
        }
        Pair::new(Type::Bot, pair.ctx)
    }

    pub(super) fn synth_and_or(&mut self, node: Node<'a>, ctx: &Context, _hint: Option<&Type>) -> Pair {
        let result = self.synth_cond(node, ctx);
        Pair::new(result.ty, ctx.with_env(result.env))
    }

    pub(super) fn synth_case(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let last = node.child_count().saturating_sub(1);
        let whens: Vec<Node<'a>> = node.child_nodes_from(1).into_iter().filter(|n| n.is(NodeKind::When)).collect();
        let else_body = node.child(last).filter(|n| !n.is(NodeKind::When) && last > 0);

        match node.child(0) {
            Some(subject) => self.synth_case_subject(subject, &whens, else_body, ctx, hint),
            None => self.synth_case_conditions(&whens, else_body, ctx, hint),
        }
    }

    fn synth_case_subject(
        &mut self,
        subject: Node<'a>,
        whens: &[Node<'a>],
        else_body: Option<Node<'a>>,
        ctx: &Context,
        hint: Option<&Type>,
    ) -> Pair {
        let subj = self.synth(subject, ctx, None);
        let subject_ty = subj.ty.clone();
        let mut env = subj.ctx.type_env.clone();
        let pivot = self.pivot_of(subject, &env);
        let mut remaining = pivot.as_ref().and_then(|p| p.current(&env)).unwrap_or(subj.ty);
        let base = subj.ctx;
        let mut arms = Vec::new();

        for when in whens {
            let (tests, body) = when_parts(*when);
            let mut matched = Vec::new();
            for test in tests {
                let pair = self.synth(test, &base.with_env(env.clone()), None);
                env = pair.ctx.type_env.clone();
                let split = if test.is(NodeKind::Splat) {
                    None
                } else {
                    self.case_test(test, &pair.ty, &remaining, &pair.ctx)
                };
                match split {
                    Some((t, f)) => {
                        matched.push(t);
                        remaining = f;
                    }
                    None => matched.push(remaining.clone()),
                }
            }
            let arm_ty = Type::union(matched);
            let arm_env = match &pivot {
                Some(p) => p.narrow(&env, arm_ty.clone()),
                None => env.clone(),
            };
            let branch = Branch {
                env: arm_env,
                unreachable: arm_ty.is_bot(),
            };
            arms.push(self.synth_branch(body, &base, &branch, hint));
            if let Some(p) = &pivot {
                env = p.narrow(&env, remaining.clone());
            }
        }

        let exhaustive = remaining.is_bot();
        let rest = base.with_env(env);
        match else_body {
            Some(body) if exhaustive => {
                self.error(body, TypeErrorKind::ElseOnExhaustiveCase { ty: subject_ty });
                let pair = self.synth(body, &rest, hint);
                arms.push(Pair::new(Type::Bot, pair.ctx));
            }
            Some(body) => arms.push(self.synth(body, &rest, hint)),
            None if exhaustive => {}
            None => arms.push(Pair::new(Type::Nil, rest)),
        }
        if arms.is_empty() {
            return Pair::new(Type::Nil, ctx.with_env(base.type_env.clone()));
        }
        self.merge(&base, arms)
    }

    fn synth_case_conditions(
        &mut self,
        whens: &[Node<'a>],
        else_body: Option<Node<'a>>,
        ctx: &Context,
        hint: Option<&Type>,
    ) -> Pair {
        let mut env = ctx.type_env.clone();
        let mut arms = Vec::new();
        for when in whens {
            let (tests, body) = when_parts(*when);
            let mut taken = Vec::new();
            for test in tests {
                let result = self.synth_cond(test, &ctx.with_env(env.clone()));
                taken.push(result.truthy);
                env = result.falsy.env;
            }
            let refs: Vec<&Branch> = taken.iter().collect();
            let branch = Branch {
                env: join_branches(&refs),
                unreachable: !taken.is_empty() && taken.iter().all(|b| b.unreachable),
            };
            arms.push(self.synth_branch(body, ctx, &branch, hint));
        }
        let rest = ctx.with_env(env);
        match else_body {
            Some(body) => arms.push(self.synth(body, &rest, hint)),
            None => arms.push(Pair::new(Type::Nil, rest)),
        }
        self.merge(ctx, arms)
    }

    // ── Loops ──────────────────────────────────────────────────────────

    pub(super) fn synth_while(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let Some(cond) = node.child(0) else {
            return self.unsupported(node, ctx);
        };
        let head = LoopHead::Cond {
            cond,
            until: matches!(node.kind(), NodeKind::Until | NodeKind::UntilPost),
            post: matches!(node.kind(), NodeKind::WhilePost | NodeKind::UntilPost),
        };
        self.synth_loop(node, head, node.child(1), &Type::Any, ctx)
    }

    pub(super) fn synth_for(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let (Some(target), Some(collection)) = (node.child(0), node.child(1)) else {
            return self.unsupported(node, ctx);
        };
        let coll = self.synth(collection, ctx, None);
        let elem = self.element_type(collection, &coll);
        let pair = self.synth_loop(node, LoopHead::Each { target }, node.child(2), &elem, &coll.ctx);
        // A `for` that finishes evaluates to its collection.
        if pair.ty.is_bot() {
            pair
        } else {
            let ty = Type::union(vec![coll.ty, pair.ty.without_nil()]);
            Pair::new(ty, pair.ctx)
        }
    }

    /// The element type `each` yields for a collection value.
    fn element_type(&mut self, node: Node<'a>, coll: &Pair) -> Type {
        match self.expand(&coll.ty) {
            Type::Instance(name, args) if name == "Hash" && args.len() == 2 => Type::Tuple(args),
            ty @ (Type::Instance(..) | Type::Tuple(_)) => {
                let elem = self.splat_element(&ty);
                if elem != ty {
                    return elem;
                }
                self.lookup(node, &ty, "each")
                    .and_then(|entry| entry.overloads.into_iter().find_map(|mt| mt.block))
                    .and_then(|bt| bt.func.params.positional_types().into_iter().next())
                    .unwrap_or(Type::Any)
            }
            _ => Type::Any,
        }
    }

    /// Type a loop in two passes: the first finds how the body changes
    /// the locals and is discarded, the second runs from the widened
    /// entry environment.
    fn synth_loop(&mut self, node: Node<'a>, head: LoopHead<'a>, body: Option<Node<'a>>, elem: &Type, ctx: &Context) -> Pair {
        let mut inner = ctx.clone();
        inner.break_context = Some(BreakContext {
            break_type: Type::Nil,
            next_type: None,
        });
        let inner = self.apply_annotations(node, &inner);

        let cp = self.typing.checkpoint();
        let first = self.loop_pass(head, body, elem, &inner);
        self.typing.rollback(cp);

        let entry = inner.with_env(inner.type_env.widen_from(&first.back));
        let pass = self.loop_pass(head, body, elem, &entry);

        let mut types = Vec::new();
        let mut envs = Vec::new();
        if let Some(exit) = pass.exit {
            types.push(Type::Nil);
            envs.push(exit);
        }
        for (ty, env) in pass.breaks {
            types.push(ty);
            envs.push(env);
        }
        if envs.is_empty() {
            return Pair::new(Type::Bot, ctx.with_env(pass.back));
        }
        Pair::new(Type::union(types), ctx.with_env(TypeEnv::join(&envs)))
    }

    fn loop_pass(&mut self, head: LoopHead<'a>, body: Option<Node<'a>>, elem: &Type, ctx: &Context) -> LoopPass {
        self.push_jumps();
        let (exit, end) = match head {
            LoopHead::Cond { cond, until, post: false } => {
                let result = self.synth_cond(cond, ctx);
                let (stay, leave) = if until { (result.falsy, result.truthy) } else { (result.truthy, result.falsy) };
                let pair = self.synth_body(body, &ctx.with_env(stay.env), None);
                let exit = (!leave.unreachable).then_some(leave.env);
                (exit, pair.ctx.type_env)
            }
            LoopHead::Cond { cond, until, post: true } => {
                let pair = self.synth_body(body, ctx, None);
                let result = self.synth_cond(cond, &pair.ctx);
                let (stay, leave) = if until { (result.falsy, result.truthy) } else { (result.truthy, result.falsy) };
                let exit = (!leave.unreachable).then_some(leave.env);
                (exit, stay.env)
            }
            LoopHead::Each { target } => {
                let bound = self.bind_target(target, ctx, elem);
                let pair = self.synth_body(body, &bound, None);
                (Some(ctx.type_env.widen_from(&pair.ctx.type_env)), pair.ctx.type_env)
            }
        };
        let frame = self.pop_jumps();
        let mut backs = vec![end];
        backs.extend(frame.nexts);
        LoopPass {
            exit,
            back: TypeEnv::join(&backs),
            breaks: frame.breaks,
        }
    }

    // ── Jumps ──────────────────────────────────────────────────────────

    pub(super) fn synth_jump(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        match node.kind() {
            NodeKind::Break => self.synth_break(node, ctx),
            NodeKind::Next => self.synth_next(node, ctx),
            NodeKind::Return => self.synth_return(node, ctx),
            NodeKind::Retry if self.rescue_depth == 0 => {
                self.error(node, TypeErrorKind::UnexpectedJump);
                Pair::new(Type::Bot, ctx.clone())
            }
            NodeKind::Redo if ctx.break_context.is_none() => {
                self.error(node, TypeErrorKind::UnexpectedJump);
                Pair::new(Type::Bot, ctx.clone())
            }
            _ => Pair::new(Type::Bot, ctx.clone()),
        }
    }

    /// The value of a jump: `nil` without one, a tuple for several.
    fn jump_value(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> (Option<Type>, Context) {
        let values: Vec<Node<'a>> = node.child_nodes().collect();
        match values.as_slice() {
            [] => (None, ctx.clone()),
            [value] => {
                let pair = self.synth(*value, ctx, hint);
                (Some(pair.ty), pair.ctx)
            }
            many => {
                let mut ctx = ctx.clone();
                let mut types = Vec::new();
                for value in many {
                    let pair = self.synth(*value, &ctx, None);
                    types.push(pair.ty);
                    ctx = pair.ctx;
                }
                (Some(Type::Tuple(types)), ctx)
            }
        }
    }

    fn synth_break(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let Some(target) = ctx.break_context.clone() else {
            self.error(node, TypeErrorKind::UnexpectedJump);
            let (_, ctx) = self.jump_value(node, ctx, None);
            return Pair::new(Type::Bot, ctx);
        };
        let (value, after) = self.jump_value(node, ctx, Some(&target.break_type));
        match &value {
            Some(ty) => {
                let result = self.relate(node, &after, ty, &target.break_type);
                if !result.holds {
                    self.error(
                        node,
                        TypeErrorKind::BreakTypeMismatch {
                            expected: target.break_type.clone(),
                            actual: ty.clone(),
                            trace: result.trace,
                        },
                    );
                }
            }
            None => {
                if !self.is_subtype(node, &after, &Type::Nil, &target.break_type) {
                    self.error(
                        node,
                        TypeErrorKind::ImplicitBreakValueMismatch {
                            expected: target.break_type.clone(),
                        },
                    );
                }
            }
        }
        if let Some(frame) = self.jumps.last_mut() {
            frame.breaks.push((value.unwrap_or(Type::Nil), after.type_env.clone()));
        }
        Pair::new(Type::Bot, after)
    }

    fn synth_next(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let Some(target) = ctx.break_context.clone() else {
            self.error(node, TypeErrorKind::UnexpectedJump);
            let (_, ctx) = self.jump_value(node, ctx, None);
            return Pair::new(Type::Bot, ctx);
        };
        let after = match &target.next_type {
            None => {
                if node.child_count() > 0 {
                    self.error(node, TypeErrorKind::UnexpectedJumpValue);
                }
                self.jump_value(node, ctx, None).1
            }
            Some(expected) => {
                let (value, after) = self.jump_value(node, ctx, Some(expected));
                let ty = value.unwrap_or(Type::Nil);
                if *expected != Type::Void {
                    let result = self.relate(node, &after, &ty, expected);
                    if !result.holds {
                        self.error(
                            node,
                            TypeErrorKind::BlockBodyTypeMismatch {
                                expected: expected.clone(),
                                actual: ty,
                                trace: result.trace,
                            },
                        );
                    }
                }
                after
            }
        };
        if let Some(frame) = self.jumps.last_mut() {
            frame.nexts.push(after.type_env.clone());
        }
        Pair::new(Type::Bot, after)
    }

    fn synth_return(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let expected = match (&ctx.block_context, &ctx.method_context) {
            (Some(block), _) if block.lambda => block.body_type.clone(),
            (_, Some(method)) => Some(method.return_type.clone()),
            _ => None,
        };
        let hint = expected.as_ref().filter(|t| **t != Type::Void);
        let (value, after) = self.jump_value(node, ctx, hint);
        if let Some(expected) = hint {
            let ty = value.unwrap_or(Type::Nil);
            let result = self.relate(node, &after, &ty, expected);
            if !result.holds {
                self.error(
                    node,
                    TypeErrorKind::ReturnTypeMismatch {
                        expected: expected.clone(),
                        actual: ty,
                        trace: result.trace,
                    },
                );
            }
        }
        Pair::new(Type::Bot, after)
    }
}

/// A condition result with `pivot` narrowed to `t` when truthy and `f`
/// when falsy.
fn narrowed(ty: Type, env: TypeEnv, pivot: Option<Pivot>, t: Type, f: Type) -> LogicResult {
    let (truthy_env, falsy_env) = match &pivot {
        Some(p) => (p.narrow(&env, t.clone()), p.narrow(&env, f.clone())),
        None => (env.clone(), env.clone()),
    };
    LogicResult {
        ty,
        env,
        truthy: Branch {
            env: truthy_env,
            unreachable: t.is_bot(),
        },
        falsy: Branch {
            env: falsy_env,
            unreachable: f.is_bot(),
        },
    }
}

/// The tests of `(when test... body)` and its body. A `when` with a single
/// slot holds a test and no body.
fn when_parts(when: Node<'_>) -> (Vec<Node<'_>>, Option<Node<'_>>) {
    let slots = when.children();
    let (tests, body) = match slots.len() {
        0 | 1 => (slots.len(), None),
        n => (n - 1, when.child(n - 1)),
    };
    ((0..tests).filter_map(|i| when.child(i)).collect(), body)
}

/// The literal a literal node denotes.
fn literal_of(node: Node<'_>) -> Option<Literal> {
    match node.kind() {
        NodeKind::Int => node.int(0).map(Literal::Int),
        NodeKind::Str => node.string(0).map(|s| Literal::Str(s.to_string())),
        NodeKind::Sym => node.symbol(0).map(|s| Literal::Sym(s.to_string())),
        NodeKind::True => Some(Literal::True),
        NodeKind::False => Some(Literal::False),
        _ => None,
    }
}

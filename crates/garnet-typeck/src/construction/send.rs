//! Sends, blocks, lambdas, `super`, `yield`, and the two comment forms
//! that attach to expressions: type applications and assertions.

use garnet_syntax::{Node, NodeKind};

use super::call::{Arg, CallArgs, CallBlock};
use super::literals::record_key;
use super::{Pair, TypeConstruction};
use crate::context::{BlockContext, BreakContext, Context};
use crate::error::TypeErrorKind;
use crate::logic::call_path;
use crate::method_type::{FunctionType, MethodType, Params, ProcType};
use crate::parse::parse_type_list;
use crate::ty::{RecordKey, Type};

impl<'a> TypeConstruction<'a> {
    pub(super) fn synth_send(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
    ) -> Pair {
        self.synth_call(node, ctx, hint, type_args, None)
    }

    /// A `send`/`csend`, optionally with a literal block.
    fn synth_call(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
        block: Option<CallBlock<'a>>,
    ) -> Pair {
        let Some(name) = node.symbol(1) else {
            return self.unsupported(node, ctx);
        };
        let receiver = node.child(0);
        let args = CallArgs::collect(node, 2);
        let recv = match receiver {
            Some(r) => self.synth(r, ctx, None),
            None => Pair::new(ctx.self_type.clone(), ctx.clone()),
        };

        if block.is_none() && args.block_pass.is_none() {
            if let Some(pair) = self.synth_record_access(&recv, name, &args) {
                return pair;
            }
        }

        let safe = node.is(NodeKind::Csend);
        let recv_ty = if safe { recv.ty.without_nil() } else { recv.ty.clone() };
        if safe && recv_ty.is_bot() {
            let ctx = self.synth_args_untyped(&args, block, &recv.ctx);
            return Pair::new(Type::Nil, ctx);
        }

        let (mut pair, pure) =
            self.dispatch_call(node, &recv.ctx, &recv_ty, receiver, name, &args, block, hint, type_args);

        if pure && !safe && args.is_empty() && block.is_none() {
            if let Some(path) = call_path(node) {
                match recv.ctx.type_env.pure_call(&path) {
                    Some(known) => pair.ty = known.clone(),
                    None => pair.ctx = pair.ctx.with_env(pair.ctx.type_env.set_pure_call(path, pair.ty.clone())),
                }
            }
        }
        if safe && recv_ty != recv.ty {
            pair.ty = Type::optional(pair.ty);
        }
        pair
    }

    /// `record[:key]` and `tuple[0]` with a literal index.
    fn synth_record_access(&mut self, recv: &Pair, name: &str, args: &CallArgs<'a>) -> Option<Pair> {
        if name != "[]" || args.positional.len() != 1 || args.keywords.is_some() {
            return None;
        }
        let Arg::Node(key_node) = args.positional[0] else {
            return None;
        };
        let key = record_key(key_node)?;
        let ty = match (self.expand(&recv.ty), &key) {
            (Type::Record(fields), _) => match fields.iter().find(|(k, _)| *k == key) {
                Some((_, t)) => t.clone(),
                None => {
                    let shown = match &key {
                        RecordKey::Sym(s) => format!(":{}", s),
                        RecordKey::Str(s) => format!("{:?}", s),
                        RecordKey::Int(i) => i.to_string(),
                    };
                    self.error(key_node, TypeErrorKind::UnknownRecordKey { key: shown });
                    Type::Any
                }
            },
            (Type::Tuple(elems), RecordKey::Int(i)) => {
                let index = if *i < 0 { elems.len() as i64 + i } else { *i };
                usize::try_from(index)
                    .ok()
                    .and_then(|i| elems.get(i).cloned())
                    .unwrap_or(Type::Nil)
            }
            _ => return None,
        };
        let key_pair = self.synth(key_node, &recv.ctx, Some(&key.key_type()));
        Some(Pair::new(ty, key_pair.ctx))
    }

    // ── Blocks ─────────────────────────────────────────────────────────

    pub(super) fn synth_block_call(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        hint: Option<&Type>,
        type_args: Option<&[Type]>,
    ) -> Pair {
        let Some(call) = node.child(0) else {
            return self.unsupported(node, ctx);
        };
        let is_lambda_call = call.is(NodeKind::Send)
            && call.child(0).is_none()
            && call.child_count() == 2
            && matches!(call.symbol(1), Some("lambda" | "proc"));
        let pair = match call.kind() {
            NodeKind::Lambda => return self.synth_lambda(node, call, ctx, hint),
            _ if is_lambda_call => return self.synth_lambda(node, call, ctx, hint),
            NodeKind::Send | NodeKind::Csend => {
                self.synth_call(call, ctx, hint, type_args, Some(CallBlock::Body(node)))
            }
            NodeKind::Super | NodeKind::Zsuper => self.synth_super_call(call, ctx, hint, Some(CallBlock::Body(node))),
            _ => {
                let pair = self.synth(call, ctx, None);
                let ctx = self.synth_untyped_block(node, &pair.ctx);
                Pair::new(Type::Any, ctx)
            }
        };
        self.typing.add_type(call.id(), pair.ty.clone());
        pair
    }

    /// `-> (x) { ... }` and `lambda { |x| ... }`: a proc typed from the
    /// expected proc type when there is one.
    fn synth_lambda(&mut self, node: Node<'a>, call: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let expected = hint.map(|h| self.expand(h)).and_then(|h| match h {
            Type::Proc(p) => Some(*p),
            _ => None,
        });
        let hinted = expected.as_ref().map(|p| p.func.params.clone()).unwrap_or_default();
        let params = lambda_params(node.child(1), &hinted);
        let ret_hint = expected.as_ref().map(|p| p.func.ret.clone());

        let mut inner = ctx.clone();
        inner.block_context = Some(BlockContext {
            body_type: ret_hint.clone(),
            lambda: true,
        });
        inner.break_context = Some(BreakContext {
            break_type: ret_hint.clone().unwrap_or(Type::Any),
            next_type: Some(ret_hint.clone().unwrap_or(Type::Any)),
        });
        if let Some(self_type) = expected.as_ref().and_then(|p| p.self_type.clone()) {
            inner.self_type = self_type;
        }
        let inner = self.apply_annotations(node, &inner);
        let body_type = inner.block_context.as_ref().and_then(|b| b.body_type.clone());
        let inner = self.bind_block_params(node, &params, &inner);

        self.push_jumps();
        let body_hint = body_type.as_ref().filter(|t| **t != Type::Void);
        let body = self.synth_body(node.child(2), &inner, body_hint);
        self.pop_jumps();

        let ret = match body_type {
            Some(expected) => {
                if expected != Type::Void && !body.ty.is_bot() {
                    let report_on = node.child(2).unwrap_or(node);
                    let result = self.relate(report_on, &body.ctx, &body.ty, &expected);
                    if !result.holds {
                        self.error(
                            report_on,
                            TypeErrorKind::BlockBodyTypeMismatch {
                                expected: expected.clone(),
                                actual: body.ty.clone(),
                                trace: result.trace,
                            },
                        );
                    }
                }
                expected
            }
            None if body.ty.is_bot() => Type::Any,
            None => body.ty,
        };
        let mut proc = ProcType::new(FunctionType::new(params, ret));
        proc.block = expected.and_then(|p| p.block);
        let ty = Type::Proc(Box::new(proc));
        self.typing.add_type(call.id(), ty.clone());
        Pair::new(ty, ctx.clone())
    }

    // ── super and yield ────────────────────────────────────────────────

    pub(super) fn synth_super(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        self.synth_super_call(node, ctx, hint, None)
    }

    fn synth_super_call(
        &mut self,
        node: Node<'a>,
        ctx: &Context,
        hint: Option<&Type>,
        block: Option<CallBlock<'a>>,
    ) -> Pair {
        let explicit = if node.is(NodeKind::Super) { Some(CallArgs::collect(node, 0)) } else { None };
        let untyped = |this: &mut Self, ctx: &Context| -> Pair {
            let ctx = match &explicit {
                Some(args) => this.synth_args_untyped(args, block, ctx),
                None => match block {
                    Some(CallBlock::Body(body)) => this.synth_untyped_block(body, ctx),
                    _ => ctx.clone(),
                },
            };
            Pair::new(Type::Any, ctx)
        };

        let Some(method) = ctx.method_context.clone() else {
            self.error(node, TypeErrorKind::UnexpectedSuper { method: None });
            return untyped(self, ctx);
        };
        let Some(super_ty) = self.super_receiver(ctx, method.singleton) else {
            return untyped(self, ctx);
        };
        let Some(entry) = self.lookup(node, &super_ty, &method.name) else {
            self.error(
                node,
                TypeErrorKind::UnexpectedSuper {
                    method: Some(method.name.clone()),
                },
            );
            return untyped(self, ctx);
        };

        // Without a declaration of its own the method's `super` is unchecked.
        let Some(own) = &method.method_type else {
            return untyped(self, ctx);
        };
        let args = explicit.clone().unwrap_or_else(|| forwarded_args(own));
        let block = match block {
            Some(b) => Some(b),
            None if node.is(NodeKind::Zsuper) && method.block_type().is_some() => Some(CallBlock::Forwarded),
            None => None,
        };
        let (call, pair) =
            self.resolve_overloads(node, ctx, &super_ty, &method.name, &entry.overloads, &args, block, hint, None);
        self.typing.add_call(node.id(), call);
        pair
    }

    /// The receiver `super` dispatches to, when the enclosing class has a
    /// declared superclass.
    fn super_receiver(&self, ctx: &Context, singleton: bool) -> Option<Type> {
        let module = ctx.module_context.as_ref()?;
        let name = module.name.as_ref()?;
        let env = self.builder.env();
        if env.is_module(name) {
            return None;
        }
        let parent = env.superclass(name)?;
        Some(if singleton || module.singleton_scope {
            Type::Singleton(parent.name)
        } else {
            Type::Instance(parent.name, parent.args)
        })
    }

    pub(super) fn synth_yield(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let args = CallArgs::collect(node, 0);
        let declared = ctx
            .method_context
            .as_ref()
            .map(|m| (m.method_type.is_some(), m.block_type().cloned()));
        match declared {
            Some((true, Some(bt))) => {
                let mt = MethodType::simple(bt.func.params.clone(), bt.func.ret.clone());
                let self_type = ctx.self_type.clone();
                let (_, pair) = self.resolve_overloads(node, ctx, &self_type, "yield", &[mt], &args, None, None, None);
                pair
            }
            Some((false, _)) => {
                let ctx = self.synth_args_untyped(&args, None, ctx);
                Pair::new(Type::Any, ctx)
            }
            _ => {
                self.error(node, TypeErrorKind::UnexpectedYield);
                let ctx = self.synth_args_untyped(&args, None, ctx);
                Pair::new(Type::Any, ctx)
            }
        }
    }

    // ── Comment forms ──────────────────────────────────────────────────

    /// `(type_app call "T, U")`: explicit type arguments for a generic call.
    pub(super) fn synth_type_app(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let Some(call) = node.child(0) else {
            return self.unsupported(node, ctx);
        };
        let text = node.string(1).unwrap_or_default();
        let types = match parse_type_list(text, &ctx.type_var_names()) {
            Ok(types) => {
                let checked: Option<Vec<Type>> = types.iter().map(|t| self.checked_type(node, ctx, t)).collect();
                checked
            }
            Err(err) => {
                self.error(
                    node,
                    TypeErrorKind::AnnotationSyntaxError {
                        message: err.to_string(),
                    },
                );
                None
            }
        };
        let Some(types) = types else {
            return self.synth(call, ctx, hint);
        };
        let pair = match call.kind() {
            NodeKind::Send | NodeKind::Csend => self.synth_send(call, ctx, hint, Some(&types)),
            NodeKind::Block | NodeKind::Numblock => self.synth_block_call(call, ctx, hint, Some(&types)),
            _ => return self.synth(call, ctx, hint),
        };
        self.typing.add_type(call.id(), pair.ty.clone());
        pair
    }

    /// `(assertion expr "Type")`: the expression typed as the asserted
    /// type, which must not be disjoint from its own.
    pub(super) fn synth_assertion(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let Some(expr) = node.child(0) else {
            return self.unsupported(node, ctx);
        };
        let asserted = node.string(1).and_then(|text| self.annotation_type(node, ctx, text));
        let Some(asserted) = asserted else {
            return self.synth(expr, ctx, None);
        };
        let pair = self.synth(expr, ctx, Some(&asserted));
        if !pair.ty.is_bot() && self.disjoint(ctx, &pair.ty, &asserted) {
            self.error(
                node,
                TypeErrorKind::FalseAssertion {
                    assertion_type: asserted.clone(),
                    node_type: pair.ty,
                },
            );
        }
        Pair::new(asserted, pair.ctx)
    }
}

/// The parameters of a lambda: its parameter nodes, typed from the
/// expected proc where it has them.
fn lambda_params(args: Option<Node<'_>>, hinted: &Params) -> Params {
    let mut out = Params::empty();
    let Some(args) = args else {
        return out;
    };
    let positional = hinted.positional_types();
    let mut index = 0;
    let mut next = || {
        let ty = positional.get(index).cloned().or_else(|| hinted.rest.clone()).unwrap_or(Type::Any);
        index += 1;
        ty
    };
    for arg in args.child_nodes() {
        let name = arg.symbol(0).unwrap_or_default().to_string();
        match arg.kind() {
            NodeKind::Arg | NodeKind::Procarg0 | NodeKind::Mlhs => out.required.push(next()),
            NodeKind::Optarg => out.optional.push(next()),
            NodeKind::Restarg => out.rest = Some(hinted.rest.clone().unwrap_or(Type::Any)),
            NodeKind::Kwarg => {
                let ty = hinted.keyword(&name).map(|(t, _)| t.clone()).unwrap_or(Type::Any);
                out.required_keywords.push((name, ty));
            }
            NodeKind::Kwoptarg => {
                let ty = hinted.keyword(&name).map(|(t, _)| t.clone()).unwrap_or(Type::Any);
                out.optional_keywords.push((name, ty));
            }
            NodeKind::Kwrestarg => out.rest_keywords = Some(hinted.rest_keywords.clone().unwrap_or(Type::Any)),
            _ => {}
        }
    }
    out
}

/// The arguments a bare `super` passes on: the method's own parameters.
fn forwarded_args(mt: &MethodType) -> CallArgs<'static> {
    let params = &mt.func.params;
    let positional = params
        .required
        .iter()
        .chain(&params.optional)
        .chain(&params.trailing)
        .cloned()
        .map(Arg::Typed)
        .collect();
    let typed_keywords = params
        .required_keywords
        .iter()
        .chain(&params.optional_keywords)
        .cloned()
        .collect();
    CallArgs {
        positional,
        keywords: None,
        typed_keywords,
        block_pass: None,
    }
}

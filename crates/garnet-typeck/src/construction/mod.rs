//! The tree walker.
//!
//! `TypeConstruction` walks a [`SyntaxTree`] once, threading a [`Context`]
//! through every node. Each `synth_*` function types one node kind and
//! returns the node's type together with the context that holds after it;
//! types, resolved calls and errors are recorded into the [`Typing`] as
//! the walk goes.
//!
//! An expression that never produces a value (`raise`, `return`, `break`)
//! has type `bot`; branch merges leave such paths out.

mod assign;
mod branch;
mod call;
mod defs;
mod literals;
mod masgn;
mod rescue;
mod send;

use garnet_syntax::{AnnotationKind, Node, NodeKind, SyntaxTree};
use rowan::TextSize;
use tracing::{debug, warn};

use crate::constraints::Constraints;
use crate::context::Context;
use crate::error::{TypeError, TypeErrorKind};
use crate::parse::parse_type_with_vars;
use crate::shape::{lookup_method, MethodEntry};
use crate::sig::{DefinitionBuilder, SigError};
use crate::subtyping::{Check, SubtypeResult};
use crate::ty::{FreshVars, Type, TypeName};
use crate::type_env::TypeEnv;
use crate::typing::Typing;

/// A node's type and the context after it.
#[derive(Clone, Debug)]
pub(crate) struct Pair {
    pub ty: Type,
    pub ctx: Context,
}

impl Pair {
    pub fn new(ty: Type, ctx: Context) -> Self {
        Pair { ty, ctx }
    }
}

/// Where the `break`s and `next`s of one loop or block went.
#[derive(Default)]
struct JumpFrame {
    breaks: Vec<(Type, TypeEnv)>,
    nexts: Vec<TypeEnv>,
}

pub struct TypeConstruction<'a> {
    builder: &'a DefinitionBuilder,
    tree: &'a SyntaxTree,
    typing: Typing,
    fresh: FreshVars,
    cursor: Option<TextSize>,
    jumps: Vec<JumpFrame>,
    rescue_depth: usize,
}

impl<'a> TypeConstruction<'a> {
    pub fn new(builder: &'a DefinitionBuilder, tree: &'a SyntaxTree, cursor: Option<TextSize>) -> Self {
        TypeConstruction {
            builder,
            tree,
            typing: Typing::new(),
            fresh: FreshVars::new(),
            cursor,
            jumps: Vec::new(),
            rescue_depth: 0,
        }
    }

    /// Type the whole tree from the top level.
    pub fn run(mut self) -> Typing {
        if let Some(root) = self.tree.root() {
            debug!(nodes = self.tree.len(), "checking tree");
            self.synth(root, &Context::toplevel(), None);
        }
        self.typing.fill_untyped(self.tree);
        self.typing
    }

    // ── Dispatch ───────────────────────────────────────────────────────

    /// Type `node` in `ctx`. `hint` is the type the surrounding code
    /// expects, used to pick literal types and to type lambdas and empty
    /// collections; it is never enforced here.
    pub(crate) fn synth(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let annotated;
        let ctx = if node.annotations().is_empty() || opens_scope(node.kind()) {
            ctx
        } else {
            annotated = self.apply_annotations(node, ctx);
            &annotated
        };
        if let Some(offset) = self.cursor {
            if node.range().contains_inclusive(offset) {
                self.typing.offer_cursor(node.range(), ctx);
            }
        }
        let pair = self.synth_node(node, ctx, hint);
        self.typing.add_type(node.id(), pair.ty.clone());
        pair
    }

    fn synth_node(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        match node.kind() {
            NodeKind::Int
            | NodeKind::Float
            | NodeKind::Str
            | NodeKind::Dstr
            | NodeKind::Xstr
            | NodeKind::Sym
            | NodeKind::Dsym
            | NodeKind::Regexp
            | NodeKind::Regopt
            | NodeKind::True
            | NodeKind::False
            | NodeKind::Nil
            | NodeKind::SelfNode
            | NodeKind::Irange
            | NodeKind::Erange
            | NodeKind::Defined => self.synth_literal(node, ctx, hint),
            NodeKind::Array => self.synth_array(node, ctx, hint),
            NodeKind::Hash | NodeKind::Kwargs => self.synth_hash(node, ctx, hint),
            NodeKind::Pair => self.synth_pair(node, ctx),
            NodeKind::Splat | NodeKind::Kwsplat | NodeKind::BlockPass => match node.child(0) {
                Some(inner) => self.synth(inner, ctx, hint),
                None => Pair::new(Type::Any, ctx.clone()),
            },
            NodeKind::Lvar | NodeKind::Ivar | NodeKind::Gvar | NodeKind::Cvar => self.synth_variable(node, ctx),
            NodeKind::Lvasgn | NodeKind::Ivasgn | NodeKind::Gvasgn | NodeKind::Cvasgn => self.synth_assignment(node, ctx),
            NodeKind::Const => self.synth_const(node, ctx),
            NodeKind::Casgn => self.synth_casgn(node, ctx),
            NodeKind::Cbase => Pair::new(Type::singleton("Object"), ctx.clone()),
            NodeKind::OpAsgn => self.synth_op_asgn(node, ctx),
            NodeKind::OrAsgn | NodeKind::AndAsgn => self.synth_logic_asgn(node, ctx),
            NodeKind::Masgn => self.synth_masgn(node, ctx),
            NodeKind::Send | NodeKind::Csend => self.synth_send(node, ctx, hint, None),
            NodeKind::Block | NodeKind::Numblock => self.synth_block_call(node, ctx, hint, None),
            NodeKind::Lambda => Pair::new(Type::instance("Proc"), ctx.clone()),
            NodeKind::Def => self.synth_def(node, ctx),
            NodeKind::Defs => self.synth_defs(node, ctx),
            NodeKind::Class | NodeKind::Module => self.synth_module(node, ctx),
            NodeKind::Sclass => self.synth_sclass(node, ctx),
            NodeKind::Begin | NodeKind::Kwbegin => self.synth_begin(node, ctx, hint),
            NodeKind::If => self.synth_if(node, ctx, hint),
            NodeKind::Case => self.synth_case(node, ctx, hint),
            NodeKind::While | NodeKind::Until | NodeKind::WhilePost | NodeKind::UntilPost => self.synth_while(node, ctx),
            NodeKind::For => self.synth_for(node, ctx),
            NodeKind::Break | NodeKind::Next | NodeKind::Redo | NodeKind::Retry | NodeKind::Return => {
                self.synth_jump(node, ctx)
            }
            NodeKind::And | NodeKind::Or => self.synth_and_or(node, ctx, hint),
            NodeKind::Rescue => self.synth_rescue(node, ctx, hint),
            NodeKind::Ensure => self.synth_ensure(node, ctx, hint),
            NodeKind::Super | NodeKind::Zsuper => self.synth_super(node, ctx, hint),
            NodeKind::Yield => self.synth_yield(node, ctx),
            NodeKind::Alias | NodeKind::Undef => {
                let mut ctx = ctx.clone();
                for child in node.child_nodes() {
                    ctx = self.synth(child, &ctx, None).ctx;
                }
                Pair::new(Type::Nil, ctx)
            }
            NodeKind::Assertion => self.synth_assertion(node, ctx),
            NodeKind::TypeApp => self.synth_type_app(node, ctx, hint),
            NodeKind::Mlhs
            | NodeKind::When
            | NodeKind::Resbody
            | NodeKind::Args
            | NodeKind::Arg
            | NodeKind::Optarg
            | NodeKind::Restarg
            | NodeKind::Kwarg
            | NodeKind::Kwoptarg
            | NodeKind::Kwrestarg
            | NodeKind::Blockarg
            | NodeKind::Procarg0 => self.unsupported(node, ctx),
        }
    }

    fn unsupported(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        self.error(
            node,
            TypeErrorKind::UnsupportedSyntax {
                kind: node.kind().name().to_string(),
            },
        );
        Pair::new(Type::Any, ctx.clone())
    }

    /// Type a statement sequence; the value is the last statement's.
    pub(crate) fn synth_begin(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let children: Vec<Node<'a>> = node.child_nodes().collect();
        let mut ctx = ctx.clone();
        let mut ty = Type::Nil;
        let mut diverged = false;
        for (i, child) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            let pair = self.synth(*child, &ctx, if last { hint } else { None });
            diverged |= pair.ty.is_bot();
            ty = pair.ty;
            ctx = pair.ctx;
        }
        if diverged {
            ty = Type::Bot;
        }
        Pair::new(ty, ctx)
    }

    /// Type an optional body; an absent one is `nil`.
    pub(crate) fn synth_body(&mut self, node: Option<Node<'a>>, ctx: &Context, hint: Option<&Type>) -> Pair {
        match node {
            Some(body) => self.synth(body, ctx, hint),
            None => Pair::new(Type::Nil, ctx.clone()),
        }
    }

    // ── Annotations ────────────────────────────────────────────────────

    /// The context with the `@type` annotations on `node` in force.
    pub(crate) fn apply_annotations(&mut self, node: Node<'a>, ctx: &Context) -> Context {
        let mut ctx = ctx.clone();
        for annotation in node.annotations() {
            match &annotation.kind {
                AnnotationKind::VarType { name, ty } => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        ctx.type_env = ctx.type_env.declare(name, ty);
                    }
                }
                AnnotationKind::IvarType { name, ty } => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        ctx.ivars.insert(name.clone(), ty);
                    }
                }
                AnnotationKind::ConstType { name, ty } => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        ctx.consts.insert(name.trim_start_matches("::").to_string(), ty);
                    }
                }
                AnnotationKind::SelfType(ty) => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        ctx.self_type = ty;
                    }
                }
                AnnotationKind::InstanceType(ty) => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        ctx.instance_type = ty;
                    }
                }
                AnnotationKind::ModuleType(ty) => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        ctx.module_type = ty;
                    }
                }
                AnnotationKind::ReturnType(ty) => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        if let Some(method) = ctx.method_context.as_mut() {
                            method.return_type = ty;
                        }
                    }
                }
                AnnotationKind::BlockType(ty) => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        if let Some(block) = ctx.block_context.as_mut() {
                            block.body_type = Some(ty);
                        }
                    }
                }
                AnnotationKind::BreakType(ty) => {
                    if let Some(ty) = self.annotation_type(node, &ctx, ty) {
                        if let Some(jump) = ctx.break_context.as_mut() {
                            jump.break_type = ty;
                        }
                    }
                }
                AnnotationKind::Implements(_) | AnnotationKind::Dynamic(_) => {}
            }
        }
        ctx
    }

    /// Parse and resolve a type written in an annotation or assertion.
    /// Failures are reported on `node` and give `None`.
    pub(crate) fn annotation_type(&mut self, node: Node<'a>, ctx: &Context, text: &str) -> Option<Type> {
        let ty = match parse_type_with_vars(text, &ctx.type_var_names()) {
            Ok(ty) => ty,
            Err(err) => {
                self.error(
                    node,
                    TypeErrorKind::AnnotationSyntaxError {
                        message: err.to_string(),
                    },
                );
                return None;
            }
        };
        self.checked_type(node, ctx, &ty)
    }

    /// `ty` resolved against the nesting and validated against the
    /// signature environment.
    pub(crate) fn checked_type(&mut self, node: Node<'a>, ctx: &Context, ty: &Type) -> Option<Type> {
        let ty = self.absolute_type(ty, &ctx.nesting);
        match self.builder.env().validate_type(&ty) {
            Ok(()) => Some(ty),
            Err(SigError::UnknownType(name)) => {
                self.error(node, TypeErrorKind::UnknownTypeName { name });
                None
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
        }
    }

    /// Resolve relative type names against the lexical nesting.
    pub(crate) fn absolute_type(&self, ty: &Type, nesting: &[TypeName]) -> Type {
        let env = self.builder.env();
        let resolve = |name: &TypeName, known: &dyn Fn(&str) -> bool| -> TypeName {
            nesting
                .iter()
                .map(|outer| format!("{}::{}", outer, name))
                .find(|candidate| known(candidate))
                .unwrap_or_else(|| name.clone())
        };
        match ty {
            Type::Instance(name, args) => Type::Instance(
                resolve(name, &|n| env.class(n).is_some()),
                args.iter().map(|a| self.absolute_type(a, nesting)).collect(),
            ),
            Type::Singleton(name) => Type::Singleton(resolve(name, &|n| env.class(n).is_some())),
            Type::Interface(name, args) => Type::Interface(
                resolve(name, &|n| env.interface(n).is_some()),
                args.iter().map(|a| self.absolute_type(a, nesting)).collect(),
            ),
            Type::Alias(name, args) => Type::Alias(
                resolve(name, &|n| env.alias(n).is_some()),
                args.iter().map(|a| self.absolute_type(a, nesting)).collect(),
            ),
            other => other.map_children(&mut |c| self.absolute_type(c, nesting)),
        }
    }

    // ── Recording ──────────────────────────────────────────────────────

    pub(crate) fn error(&mut self, node: Node<'_>, kind: TypeErrorKind) {
        debug!(code = kind.code(), node = ?node, "type error");
        self.typing.add_error(TypeError::new(node.id(), node.range(), kind));
    }

    pub(crate) fn sig_error(&mut self, node: Node<'_>, err: SigError) {
        warn!(%err, "signature environment error");
        self.error(
            node,
            TypeErrorKind::UnexpectedError {
                message: err.to_string(),
            },
        );
    }

    // ── Relations ──────────────────────────────────────────────────────

    fn checker(&self, ctx: &Context) -> Check<'a> {
        Check::new(self.builder)
            .with_self(ctx.self_subst())
            .with_var_bounds(ctx.var_bounds())
    }

    /// `sub <: sup` in `ctx`; signature failures are reported on `node`.
    pub(crate) fn relate(&mut self, node: Node<'_>, ctx: &Context, sub: &Type, sup: &Type) -> SubtypeResult {
        let mut check = self.checker(ctx);
        let result = check.check(sub, sup);
        for err in check.take_sig_errors() {
            self.sig_error(node, err);
        }
        result
    }

    /// `sub <: sup`, recording bounds on the unknowns of `constraints`.
    pub(crate) fn relate_with(
        &mut self,
        node: Node<'_>,
        ctx: &Context,
        constraints: &mut Constraints,
        sub: &Type,
        sup: &Type,
    ) -> SubtypeResult {
        let builder = self.builder;
        let mut check = Check::new(builder)
            .with_self(ctx.self_subst())
            .with_var_bounds(ctx.var_bounds())
            .with_constraints(constraints);
        let result = check.check(sub, sup);
        let errors = check.take_sig_errors();
        drop(check);
        for err in errors {
            self.sig_error(node, err);
        }
        result
    }

    pub(crate) fn is_subtype(&mut self, node: Node<'_>, ctx: &Context, sub: &Type, sup: &Type) -> bool {
        self.relate(node, ctx, sub, sup).holds
    }

    pub(crate) fn disjoint(&mut self, ctx: &Context, a: &Type, b: &Type) -> bool {
        self.checker(ctx).disjoint(a, b)
    }

    /// Run `f` with a checker for `ctx`.
    pub(crate) fn with_check<R>(&self, ctx: &Context, f: impl FnOnce(&mut Check<'a>) -> R) -> R {
        let mut check = self.checker(ctx);
        f(&mut check)
    }

    /// Look up `name` on `receiver`; signature failures are reported.
    pub(crate) fn lookup(&mut self, node: Node<'_>, receiver: &Type, name: &str) -> Option<MethodEntry> {
        match lookup_method(self.builder, receiver, name) {
            Ok(entry) => entry,
            Err(err) => {
                self.sig_error(node, err);
                None
            }
        }
    }

    /// `ty` with a head alias expanded, for structural inspection.
    pub(crate) fn expand(&self, ty: &Type) -> Type {
        self.builder.env().expand_alias_head(ty).unwrap_or_else(|_| ty.clone())
    }

    /// `ty` with `self`, `instance` and `class` resolved in `ctx`.
    pub(crate) fn resolve_self(&self, ctx: &Context, ty: &Type) -> Type {
        if ty.has_self_types() {
            ty.subst(&ctx.self_subst())
        } else {
            ty.clone()
        }
    }

    // ── Merging ────────────────────────────────────────────────────────

    /// Merge the outcomes of alternative branches: the union of the types
    /// that produce a value and the join of their environments.
    pub(crate) fn merge(&self, base: &Context, pairs: Vec<Pair>) -> Pair {
        let live: Vec<&Pair> = pairs.iter().filter(|p| !p.ty.is_bot()).collect();
        if live.is_empty() {
            let envs: Vec<TypeEnv> = pairs.iter().map(|p| p.ctx.type_env.clone()).collect();
            let env = if envs.is_empty() { base.type_env.clone() } else { TypeEnv::join(&envs) };
            return Pair::new(Type::Bot, base.with_env(env));
        }
        let ty = Type::union(live.iter().map(|p| p.ty.clone()).collect());
        let envs: Vec<TypeEnv> = live.iter().map(|p| p.ctx.type_env.clone()).collect();
        Pair::new(ty, base.with_env(TypeEnv::join(&envs)))
    }

    // ── Jumps ──────────────────────────────────────────────────────────

    fn push_jumps(&mut self) {
        self.jumps.push(JumpFrame::default());
    }

    fn pop_jumps(&mut self) -> JumpFrame {
        self.jumps.pop().unwrap_or_default()
    }
}

/// Kinds whose annotations apply to the scope they open, not to the
/// context they are evaluated in.
fn opens_scope(kind: NodeKind) -> bool {
    use NodeKind::*;
    matches!(
        kind,
        Def | Defs | Class | Module | Sclass | Block | Numblock | While | Until | WhilePost | UntilPost | For
    )
}

/// Whether the value of `node` is used by its parent.
pub(crate) fn value_used(node: Node<'_>) -> bool {
    use NodeKind::*;
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_last_child = || parent.child_nodes().last().map(|n| n.id()) == Some(node.id());
    let is_child = |index: usize| parent.child(index).map(|n| n.id()) == Some(node.id());
    match parent.kind() {
        Begin | Kwbegin => is_last_child() && value_used(parent),
        If => is_child(0) || value_used(parent),
        When => !is_last_child() || parent.parent().is_some_and(value_used),
        Case => is_child(0) || value_used(parent),
        While | Until | WhilePost | UntilPost => is_child(0),
        For => is_child(1),
        Class | Module | Sclass => false,
        Rescue | Ensure | Resbody => value_used(parent),
        _ => true,
    }
}

//! Method, class and module definitions.
//!
//! A `def` is checked against the method type its enclosing class
//! declares: parameters are bound from the declared parameter list and
//! the body must produce the declared return type. Class and module
//! bodies open a fresh scope whose `self` is the module object.

use garnet_syntax::{AnnotationKind, Node, NodeKind};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::assign::const_name;
use super::{Pair, TypeConstruction};
use crate::context::{Context, MethodContext, ModuleContext};
use crate::error::TypeErrorKind;
use crate::method_type::{BlockType, FunctionType, MethodType, Params};
use crate::sig::Definition;
use crate::ty::{Type, TypeName};
use crate::type_env::TypeEnv;

/// Where a method body is being defined.
struct MethodSite {
    singleton: bool,
    /// The declared overloads; empty when undeclared.
    overloads: Vec<MethodType>,
    ivars: FxHashMap<String, Type>,
}

impl<'a> TypeConstruction<'a> {
    // ── Methods ────────────────────────────────────────────────────────

    /// `(def :name (args ...) body)`
    pub(super) fn synth_def(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let Some(name) = node.symbol(0) else {
            return self.unsupported(node, ctx);
        };
        let singleton = ctx.module_context.as_ref().is_some_and(|m| m.singleton_scope);
        self.define_method(node, name, node.child(1), node.child(2), singleton, ctx);
        Pair::new(Type::symbol(), ctx.clone())
    }

    /// `(defs receiver :name (args ...) body)`; only `def self.m` is
    /// checked against a declaration.
    pub(super) fn synth_defs(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let (Some(receiver), Some(name)) = (node.child(0), node.symbol(1)) else {
            return self.unsupported(node, ctx);
        };
        let recv = self.synth(receiver, ctx, None);
        if receiver.is(NodeKind::SelfNode) {
            self.define_method(node, name, node.child(2), node.child(3), true, &recv.ctx);
        } else {
            let mut inner = self.method_scope(&recv.ctx, Type::Any, Type::Any);
            inner.method_context = Some(MethodContext {
                name: name.to_string(),
                method_type: None,
                return_type: Type::Any,
                singleton: true,
            });
            let inner = self.apply_annotations(node, &inner);
            let inner = self.bind_untyped_params(node.child(2), &inner);
            self.synth_body(node.child(3), &inner, None);
        }
        Pair::new(Type::symbol(), recv.ctx)
    }

    fn define_method(
        &mut self,
        node: Node<'a>,
        name: &str,
        args: Option<Node<'a>>,
        body: Option<Node<'a>>,
        singleton: bool,
        ctx: &Context,
    ) {
        let site = self.method_site(node, name, singleton, ctx);
        let method_type = merge_overloads(&site.overloads);
        debug!(method = name, singleton, declared = !site.overloads.is_empty(), "checking method body");

        let (self_type, instance_type) = match &ctx.module_context {
            Some(m) if singleton => (m.module_type.clone(), m.instance_type.clone()),
            Some(m) => (m.instance_type.clone(), m.instance_type.clone()),
            None => (Type::object(), Type::object()),
        };
        let mut inner = self.method_scope(ctx, self_type, instance_type);
        inner.ivars = site.ivars;
        if let Some(mt) = &method_type {
            inner
                .type_vars
                .extend(mt.type_params.iter().map(|p| (p.var(), p.upper_bound.clone())));
        }
        let declared_ret = match (&method_type, site.overloads.is_empty()) {
            (Some(mt), _) => mt.ret().clone(),
            (None, false) => Type::union(site.overloads.iter().map(|mt| mt.ret().clone()).collect()),
            (None, true) => Type::Any,
        };
        inner.method_context = Some(MethodContext {
            name: name.to_string(),
            method_type: method_type.clone(),
            return_type: declared_ret.clone(),
            singleton,
        });
        let inner = self.apply_annotations(node, &inner);
        let return_type = inner
            .method_context
            .as_ref()
            .map(|m| m.return_type.clone())
            .unwrap_or(Type::Any);

        if let Some(mt) = &method_type {
            if return_type != declared_ret && !self.is_subtype(node, &inner, &return_type, &declared_ret) {
                self.error(
                    node,
                    TypeErrorKind::MethodReturnTypeAnnotationMismatch {
                        method_type: mt.clone(),
                        annotation: return_type.clone(),
                    },
                );
            }
        }

        let inner = match &method_type {
            Some(mt) => self.bind_method_params(args, mt, &inner),
            None => self.bind_untyped_params(args, &inner),
        };

        let hint = (!matches!(return_type, Type::Void | Type::Any)).then_some(&return_type);
        let pair = self.synth_body(body, &inner, hint);
        if method_type.is_none() || matches!(return_type, Type::Void) || pair.ty.is_bot() {
            return;
        }
        let result = self.relate(node, &pair.ctx, &pair.ty, &return_type);
        if !result.holds {
            let trace = result.trace;
            let kind = if is_setter(name) {
                TypeErrorKind::SetterBodyTypeMismatch {
                    method: name.to_string(),
                    expected: return_type,
                    actual: pair.ty,
                    trace,
                }
            } else {
                TypeErrorKind::MethodBodyTypeMismatch {
                    method: name.to_string(),
                    expected: return_type,
                    actual: pair.ty,
                    trace,
                }
            };
            self.error(node, kind);
        }
    }

    /// Find the declaration of the method being defined and report
    /// definitions the signatures do not allow.
    fn method_site(&mut self, node: Node<'a>, name: &str, singleton: bool, ctx: &Context) -> MethodSite {
        let mut site = MethodSite {
            singleton,
            overloads: Vec::new(),
            ivars: FxHashMap::default(),
        };
        let module = match &ctx.module_context {
            Some(module) => module.clone(),
            None => {
                // Top-level methods become private methods of `Object`.
                if let Some(def) = self.definition(node, "Object", false) {
                    site.ivars = def.ivars.clone();
                    if let Some(method) = def.method(name) {
                        site.overloads = method.overloads.clone();
                    }
                }
                return site;
            }
        };
        let Some(type_name) = module.name.clone() else {
            return site;
        };
        if !module.declared {
            self.error(
                node,
                TypeErrorKind::MethodDefinitionInUndeclaredModule {
                    module: type_name,
                    method: name.to_string(),
                },
            );
            return site;
        }
        let Some(def) = self.definition(node, &type_name, site.singleton) else {
            return site;
        };
        site.ivars = def.ivars.clone();
        match def.method(name) {
            Some(method) => site.overloads = method.overloads.clone(),
            None if module.dynamic_methods.iter().any(|d| d == name) => {}
            None => self.error(
                node,
                TypeErrorKind::UndeclaredMethodDefinition {
                    type_name,
                    method: name.to_string(),
                },
            ),
        }
        site
    }

    fn definition(&mut self, node: Node<'a>, name: &str, singleton: bool) -> Option<std::sync::Arc<Definition>> {
        let built = if singleton {
            self.builder.build_singleton(name)
        } else {
            self.builder.build_instance(name)
        };
        match built {
            Ok(def) => Some(def),
            Err(err) => {
                self.sig_error(node, err);
                None
            }
        }
    }

    /// A fresh method or class body scope: no locals, no enclosing
    /// block, loop or method.
    fn method_scope(&self, ctx: &Context, self_type: Type, instance_type: Type) -> Context {
        Context {
            type_env: TypeEnv::new(),
            self_type,
            instance_type,
            method_context: None,
            block_context: None,
            break_context: None,
            ..ctx.clone()
        }
    }

    // ── Parameters ─────────────────────────────────────────────────────

    /// Bind the parameters of a declared method. Each mismatch kind is
    /// reported once per definition.
    fn bind_method_params(&mut self, args: Option<Node<'a>>, mt: &MethodType, ctx: &Context) -> Context {
        let mut ctx = ctx.clone();
        let Some(args) = args else {
            return ctx;
        };
        let params = &mt.func.params;
        let mut required = params.required.iter();
        let mut optional = params.optional.iter();
        let mut trailing = params.trailing.iter();
        let mut seen_rest = false;
        let mut seen_kwrest = false;
        let mut keywords_bound: Vec<&str> = Vec::new();
        let mut arity = false;
        let mut kind = false;
        let mut mismatch = false;

        for arg in args.child_nodes() {
            let ty = match arg.kind() {
                NodeKind::Arg | NodeKind::Mlhs => {
                    let next = if seen_rest { trailing.next() } else { required.next() };
                    match next {
                        Some(ty) => ty.clone(),
                        None => {
                            if optional.next().is_some() || (!seen_rest && params.rest.is_some()) {
                                kind = true;
                            } else {
                                arity = true;
                            }
                            Type::Any
                        }
                    }
                }
                NodeKind::Optarg => {
                    let ty = match optional.next() {
                        Some(ty) => ty.clone(),
                        None => {
                            if required.next().is_some() || params.rest.is_some() {
                                kind = true;
                            } else {
                                arity = true;
                            }
                            Type::Any
                        }
                    };
                    if let Some(default) = arg.child(1) {
                        let pair = self.synth(default, &ctx, Some(&ty));
                        ctx = pair.ctx;
                        if !ty.is_any() && !self.is_subtype(default, &ctx, &pair.ty, &ty) {
                            mismatch = true;
                        }
                    }
                    ty
                }
                NodeKind::Restarg => {
                    seen_rest = true;
                    match &params.rest {
                        Some(ty) => Type::array(ty.clone()),
                        None => {
                            if optional.next().is_some() {
                                kind = true;
                            } else {
                                arity = true;
                            }
                            Type::array(Type::Any)
                        }
                    }
                }
                NodeKind::Kwarg | NodeKind::Kwoptarg => {
                    let name = arg.symbol(0).unwrap_or_default();
                    keywords_bound.push(name);
                    let ty = match params.keyword(name) {
                        Some((ty, declared_required)) => {
                            if declared_required != arg.is(NodeKind::Kwarg) {
                                kind = true;
                            }
                            ty.clone()
                        }
                        None => match &params.rest_keywords {
                            Some(ty) => ty.clone(),
                            None => {
                                mismatch = true;
                                Type::Any
                            }
                        },
                    };
                    if let Some(default) = arg.child(1) {
                        let pair = self.synth(default, &ctx, Some(&ty));
                        ctx = pair.ctx;
                        if !ty.is_any() && !self.is_subtype(default, &ctx, &pair.ty, &ty) {
                            mismatch = true;
                        }
                    }
                    ty
                }
                NodeKind::Kwrestarg => {
                    seen_kwrest = true;
                    let value = match &params.rest_keywords {
                        Some(ty) => ty.clone(),
                        None => {
                            arity = true;
                            Type::Any
                        }
                    };
                    Type::hash(Type::symbol(), value)
                }
                NodeKind::Blockarg => match &mt.block {
                    Some(block) if block.required => block.to_proc(),
                    Some(block) => Type::optional(block.to_proc()),
                    None => Type::Nil,
                },
                _ => Type::Any,
            };
            ctx = if arg.is(NodeKind::Mlhs) {
                self.bind_param_pattern(arg, &ty, &ctx)
            } else {
                self.bind_param(arg, ty, &ctx)
            };
        }

        let positional_left = required.next().is_some() || trailing.next().is_some() || optional.next().is_some();
        let rest_left = params.rest.is_some() && !seen_rest;
        let keywords_left = params
            .required_keywords
            .iter()
            .chain(params.optional_keywords.iter())
            .any(|(name, _)| !keywords_bound.contains(&name.as_str()))
            && !seen_kwrest;
        let kwrest_left = params.rest_keywords.is_some() && !seen_kwrest;
        if positional_left || rest_left || keywords_left || kwrest_left {
            arity = true;
        }

        let flags = [
            (arity, TypeErrorKind::MethodArityMismatch { method_type: mt.clone() }),
            (kind, TypeErrorKind::DifferentMethodParameterKind { method_type: mt.clone() }),
            (mismatch, TypeErrorKind::MethodParameterMismatch { method_type: mt.clone() }),
        ];
        for (raised, error) in flags {
            if raised {
                self.error(args, error);
            }
        }
        self.typing.add_type(args.id(), Type::Nil);
        ctx
    }

    /// Bind the parameters of an undeclared method as `untyped`.
    fn bind_untyped_params(&mut self, args: Option<Node<'a>>, ctx: &Context) -> Context {
        let Some(args) = args else {
            return ctx.clone();
        };
        let mut ctx = ctx.clone();
        for arg in args.child_nodes() {
            let ty = match arg.kind() {
                NodeKind::Restarg => Type::array(Type::Any),
                NodeKind::Kwrestarg => Type::hash(Type::symbol(), Type::Any),
                _ => Type::Any,
            };
            if let (NodeKind::Optarg | NodeKind::Kwoptarg, Some(default)) = (arg.kind(), arg.child(1)) {
                ctx = self.synth(default, &ctx, None).ctx;
            }
            ctx = if arg.is(NodeKind::Mlhs) {
                self.bind_param_pattern(arg, &ty, &ctx)
            } else {
                self.bind_param(arg, ty, &ctx)
            };
        }
        self.typing.add_type(args.id(), Type::Nil);
        ctx
    }

    // ── Classes and modules ────────────────────────────────────────────

    /// `(class (const ..) superclass body)` and `(module (const ..) body)`.
    pub(super) fn synth_module(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let is_class = node.is(NodeKind::Class);
        let Some(name_node) = node.child(0) else {
            return self.unsupported(node, ctx);
        };
        let mut outer = ctx.clone();
        if is_class {
            if let Some(superclass) = node.child(1) {
                outer = self.synth(superclass, &outer, None).ctx;
            }
        }
        let body = node.child(if is_class { 2 } else { 1 });

        let name = self.module_name(name_node, &outer);
        let env = self.builder.env();
        let decl = name.as_ref().and_then(|n| env.class(n)).cloned();
        if let (Some(decl), Some(name)) = (&decl, &name) {
            if decl.is_module() == is_class {
                self.error(name_node, TypeErrorKind::ClassModuleMismatch { name: name.clone() });
            }
        }
        let (instance_type, module_type) = match (&decl, &name) {
            (Some(decl), Some(name)) => (decl.self_instance_type(), Type::singleton(name)),
            _ => (Type::Any, Type::Any),
        };
        self.typing.add_type(name_node.id(), module_type.clone());
        debug!(module = ?name, declared = decl.is_some(), "entering module body");

        let mut inner = self.method_scope(&outer, module_type.clone(), instance_type.clone());
        inner.module_type = module_type.clone();
        inner.ivars = FxHashMap::default();
        inner.cvars = FxHashMap::default();
        if let Some(name) = &name {
            inner.nesting.insert(0, name.clone());
        }
        if let Some(decl) = &decl {
            inner.type_vars = decl
                .type_params
                .iter()
                .map(|p| (p.var(), p.upper_bound.clone()))
                .collect();
            if let Some(def) = self.definition(node, &decl.name, true) {
                inner.ivars = def.ivars.clone();
            }
            if let Some(def) = self.definition(node, &decl.name, false) {
                inner.cvars = def.cvars.clone();
            }
        }
        inner.module_context = Some(ModuleContext {
            name: name.clone(),
            declared: decl.is_some(),
            instance_type,
            module_type,
            implements: None,
            dynamic_methods: Vec::new(),
            singleton_scope: false,
        });
        let mut inner = self.apply_annotations(node, &inner);
        self.apply_module_annotations(node, &mut inner);

        let pair = self.synth_body(body, &inner, None);
        if let Some(module) = &inner.module_context {
            self.check_implements(name_node, module, body);
        }
        let ty = if pair.ty.is_bot() { Type::Bot } else { pair.ty };
        Pair::new(ty, outer)
    }

    /// `(sclass (self) body)`: definitions inside are singleton methods.
    pub(super) fn synth_sclass(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let mut outer = ctx.clone();
        if let Some(target) = node.child(0) {
            outer = self.synth(target, &outer, None).ctx;
        }
        let mut inner = self.method_scope(&outer, ctx.module_type.clone(), ctx.instance_type.clone());
        if let Some(module) = inner.module_context.as_mut() {
            module.singleton_scope = true;
        }
        let inner = self.apply_annotations(node, &inner);
        let pair = self.synth_body(node.child(1), &inner, None);
        Pair::new(pair.ty, outer)
    }

    /// The absolute name a `class`/`module` statement opens.
    fn module_name(&mut self, name_node: Node<'a>, ctx: &Context) -> Option<TypeName> {
        let local = name_node.symbol(1)?;
        match name_node.child(0) {
            None => {
                let nested = ctx.nesting.first().map(|outer| format!("{}::{}", outer, local));
                let env = self.builder.env();
                match nested {
                    Some(nested) if env.class(&nested).is_some() || env.class(local).is_none() => Some(nested),
                    _ => Some(local.to_string()),
                }
            }
            Some(scope) if scope.is(NodeKind::Cbase) => Some(local.to_string()),
            Some(scope) if scope.is(NodeKind::Const) => {
                let (resolved, _) = self.resolve_const(scope, ctx);
                let outer = match resolved {
                    Some((outer, _)) => outer,
                    None => const_name(scope)?,
                };
                Some(format!("{}::{}", outer, local))
            }
            Some(_) => None,
        }
    }

    /// `@implements` and `@dynamic` on a class or module statement.
    fn apply_module_annotations(&mut self, node: Node<'a>, ctx: &mut Context) {
        for annotation in node.annotations() {
            match &annotation.kind {
                AnnotationKind::Implements(text) => {
                    let implements = match self.annotation_type(node, ctx, text) {
                        Some(Type::Instance(name, _)) => Some(name),
                        _ => None,
                    };
                    if let Some(module) = ctx.module_context.as_mut() {
                        module.implements = implements;
                    }
                }
                AnnotationKind::Dynamic(names) => {
                    let declared = ctx.module_context.as_ref().and_then(|m| m.name.clone());
                    if let Some(type_name) = declared {
                        for method in names {
                            if !self.declares_method(node, &type_name, method) {
                                self.error(
                                    node,
                                    TypeErrorKind::UnexpectedDynamicMethod {
                                        module: type_name.clone(),
                                        method: method.clone(),
                                    },
                                );
                            }
                        }
                    }
                    if let Some(module) = ctx.module_context.as_mut() {
                        module.dynamic_methods.extend(names.iter().cloned());
                    }
                }
                _ => {}
            }
        }
    }

    fn declares_method(&mut self, node: Node<'a>, type_name: &str, method: &str) -> bool {
        if self.builder.env().class(type_name).is_none() {
            return true;
        }
        [false, true]
            .into_iter()
            .filter_map(|singleton| self.definition(node, type_name, singleton))
            .any(|def| def.method(method).is_some())
    }

    /// With `@implements`, every method the implemented class declares
    /// itself must be defined in the body.
    fn check_implements(&mut self, name_node: Node<'a>, module: &ModuleContext, body: Option<Node<'a>>) {
        let Some(target) = &module.implements else {
            return;
        };
        let Some(decl) = self.builder.env().class(target) else {
            return;
        };
        let defined = body.map(defined_methods).unwrap_or_default();
        let mut missing: Vec<String> = decl
            .instance_methods
            .iter()
            .map(|m| m.name.clone())
            .chain(decl.singleton_methods.iter().map(|m| format!("self.{}", m.name)))
            .filter(|name| !defined.contains(name) && !module.dynamic_methods.contains(name))
            .collect();
        if missing.is_empty() {
            return;
        }
        missing.sort();
        self.error(
            name_node,
            TypeErrorKind::MethodDefinitionMissing {
                module: target.clone(),
                missing,
            },
        );
    }
}

/// Names of the methods a class body defines directly, singleton methods
/// prefixed with `self.`.
fn defined_methods(body: Node<'_>) -> Vec<String> {
    let statements: Vec<Node<'_>> = if body.is(NodeKind::Begin) {
        body.child_nodes().collect()
    } else {
        vec![body]
    };
    let mut names = Vec::new();
    for stmt in statements {
        match stmt.kind() {
            NodeKind::Def => names.extend(stmt.symbol(0).map(str::to_string)),
            NodeKind::Defs => names.extend(stmt.symbol(1).map(|n| format!("self.{}", n))),
            NodeKind::Sclass => {
                if let Some(inner) = stmt.child(1) {
                    names.extend(
                        defined_methods(inner)
                            .into_iter()
                            .map(|n| if n.starts_with("self.") { n } else { format!("self.{}", n) }),
                    );
                }
            }
            NodeKind::Send if stmt.child(0).is_none() => {
                let readers = matches!(stmt.symbol(1), Some("attr_reader" | "attr_accessor"));
                let writers = matches!(stmt.symbol(1), Some("attr_writer" | "attr_accessor"));
                for arg in stmt.child_nodes() {
                    if let (true, Some(attr)) = (arg.is(NodeKind::Sym), arg.symbol(0)) {
                        if readers {
                            names.push(attr.to_string());
                        }
                        if writers {
                            names.push(format!("{}=", attr));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    names
}

/// Setters are `name=` methods; comparison operators are not.
fn is_setter(name: &str) -> bool {
    name.ends_with('=') && !matches!(name, "==" | "!=" | "<=" | ">=" | "===")
}

/// The single method type a body with several overloads is checked
/// against: parameter and return types unioned slot by slot. Overloads
/// with different shapes or their own type parameters give `None`, and
/// the body is checked untyped.
fn merge_overloads(overloads: &[MethodType]) -> Option<MethodType> {
    let (first, rest) = overloads.split_first()?;
    if rest.is_empty() {
        return Some(first.clone());
    }
    if overloads.iter().any(|mt| !mt.type_params.is_empty()) {
        return None;
    }
    let shape = |p: &Params| {
        (
            p.required.len(),
            p.optional.len(),
            p.rest.is_some(),
            p.trailing.len(),
            p.required_keywords.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>(),
            p.optional_keywords.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>(),
            p.rest_keywords.is_some(),
        )
    };
    let first_shape = shape(&first.func.params);
    if rest.iter().any(|mt| shape(&mt.func.params) != first_shape) {
        return None;
    }

    let all: Vec<&Params> = overloads.iter().map(|mt| &mt.func.params).collect();
    let slot = |get: &dyn Fn(&Params) -> Option<Type>| -> Option<Type> {
        let types: Vec<Type> = all.iter().filter_map(|p| get(*p)).collect();
        (!types.is_empty()).then(|| Type::union(types))
    };
    let positional = |pick: fn(&Params) -> &Vec<Type>, len: usize| -> Vec<Type> {
        (0..len)
            .filter_map(|i| slot(&|p: &Params| pick(p).get(i).cloned()))
            .collect()
    };
    let keywords = |pick: fn(&Params) -> &Vec<(String, Type)>, names: &[String]| -> Vec<(String, Type)> {
        names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| slot(&|p: &Params| pick(p).get(i).map(|(_, t)| t.clone())).map(|t| (name.clone(), t)))
            .collect()
    };
    let params = Params {
        required: positional(|p| &p.required, first_shape.0),
        optional: positional(|p| &p.optional, first_shape.1),
        rest: slot(&|p: &Params| p.rest.clone()),
        trailing: positional(|p| &p.trailing, first_shape.3),
        required_keywords: keywords(|p| &p.required_keywords, &first_shape.4),
        optional_keywords: keywords(|p| &p.optional_keywords, &first_shape.5),
        rest_keywords: slot(&|p: &Params| p.rest_keywords.clone()),
    };
    let ret = Type::union(overloads.iter().map(|mt| mt.ret().clone()).collect());
    let block = overloads.iter().find_map(|mt| mt.block.clone()).map(|block| BlockType {
        required: overloads.iter().all(|mt| mt.block.as_ref().is_some_and(|b| b.required)),
        ..block
    });
    Some(MethodType {
        type_params: Vec::new(),
        func: FunctionType::new(params, ret),
        block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(required: Vec<Type>, ret: Type) -> MethodType {
        MethodType::simple(Params::positional(required), ret)
    }

    #[test]
    fn merges_same_shape_overloads() {
        let merged = merge_overloads(&[
            method(vec![Type::integer()], Type::string()),
            method(vec![Type::string()], Type::integer()),
        ])
        .expect("same shape merges");
        assert_eq!(
            merged.func.params.required,
            vec![Type::union(vec![Type::integer(), Type::string()])]
        );
        assert_eq!(merged.ret(), &Type::union(vec![Type::string(), Type::integer()]));
    }

    #[test]
    fn different_arity_does_not_merge() {
        let merged = merge_overloads(&[
            method(vec![], Type::Nil),
            method(vec![Type::integer()], Type::Nil),
        ]);
        assert!(merged.is_none());
    }

    #[test]
    fn setters_exclude_comparisons() {
        assert!(is_setter("name="));
        assert!(!is_setter("=="));
        assert!(!is_setter("<="));
        assert!(!is_setter("name"));
    }
}

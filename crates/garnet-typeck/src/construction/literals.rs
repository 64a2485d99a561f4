//! Literals and collection literals.

use garnet_syntax::{Node, NodeKind};

use super::{Pair, TypeConstruction};
use crate::context::Context;
use crate::error::TypeErrorKind;
use crate::ty::{Literal, RecordKey, Type};

impl<'a> TypeConstruction<'a> {
    pub(super) fn synth_literal(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let wants_literal = self.literal_expected(hint);
        let ty = match node.kind() {
            NodeKind::Int => match node.int(0) {
                Some(i) if wants_literal => Type::int_lit(i),
                _ => Type::integer(),
            },
            NodeKind::Float => Type::float(),
            NodeKind::Str => match node.string(0) {
                Some(s) if wants_literal => Type::str_lit(s),
                _ => Type::string(),
            },
            NodeKind::Sym => match node.symbol(0) {
                Some(s) if wants_literal => Type::sym_lit(s),
                _ => Type::symbol(),
            },
            NodeKind::True if wants_literal => Type::Literal(Literal::True),
            NodeKind::False if wants_literal => Type::Literal(Literal::False),
            NodeKind::True | NodeKind::False => Type::Bool,
            NodeKind::Nil => Type::Nil,
            NodeKind::SelfNode => ctx.self_type.clone(),
            NodeKind::Dstr | NodeKind::Xstr | NodeKind::Dsym | NodeKind::Regexp => {
                let mut inner = ctx.clone();
                for part in node.child_nodes() {
                    inner = self.synth(part, &inner, None).ctx;
                }
                let ty = match node.kind() {
                    NodeKind::Dsym => Type::symbol(),
                    NodeKind::Regexp => Type::regexp(),
                    _ => Type::string(),
                };
                return Pair::new(ty, inner);
            }
            NodeKind::Regopt => Type::Any,
            NodeKind::Irange | NodeKind::Erange => return self.synth_range(node, ctx),
            // The operand is never evaluated.
            NodeKind::Defined => Type::optional(Type::string()),
            _ => Type::Any,
        };
        Pair::new(ty, ctx.clone())
    }

    /// Whether the expected type asks for literal types.
    pub(crate) fn literal_expected(&self, hint: Option<&Type>) -> bool {
        hint.is_some_and(|h| {
            self.expand(h)
                .union_members()
                .iter()
                .any(|m| matches!(self.expand(m), Type::Literal(_)))
        })
    }

    fn synth_range(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let mut ctx = ctx.clone();
        let mut elems = Vec::new();
        for bound in node.child_nodes() {
            let pair = self.synth(bound, &ctx, None);
            if !pair.ty.is_nil() {
                elems.push(pair.ty.widen_literals());
            }
            ctx = pair.ctx;
        }
        let elem = if elems.is_empty() { Type::Any } else { Type::union(elems) };
        Pair::new(Type::range(elem), ctx)
    }

    // ── Arrays ─────────────────────────────────────────────────────────

    pub(super) fn synth_array(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let elems: Vec<Node<'a>> = node.child_nodes().collect();
        let hint = hint.map(|h| self.expand(h));

        if let Some(Type::Tuple(hints)) = &hint {
            if hints.len() == elems.len() && !elems.iter().any(|e| e.is(NodeKind::Splat)) {
                let mut ctx = ctx.clone();
                let mut types = Vec::with_capacity(elems.len());
                for (elem, h) in elems.iter().zip(hints) {
                    let pair = self.synth(*elem, &ctx, Some(h));
                    types.push(pair.ty);
                    ctx = pair.ctx;
                }
                return Pair::new(Type::Tuple(types), ctx);
            }
        }

        let elem_hint = hint.as_ref().and_then(|h| array_element(h));
        if elems.is_empty() {
            return match hint {
                Some(h) if elem_hint.is_some() => Pair::new(h, ctx.clone()),
                _ => {
                    self.error(node, TypeErrorKind::UnannotatedEmptyCollection);
                    Pair::new(Type::array(Type::Any), ctx.clone())
                }
            };
        }

        let mut ctx = ctx.clone();
        let mut types = Vec::with_capacity(elems.len());
        for elem in &elems {
            if elem.is(NodeKind::Splat) {
                let pair = self.synth(*elem, &ctx, None);
                types.push(self.splat_element(&pair.ty));
                ctx = pair.ctx;
            } else {
                let pair = self.synth(*elem, &ctx, elem_hint.as_ref());
                types.push(pair.ty);
                ctx = pair.ctx;
            }
        }

        if let Some(expected) = &elem_hint {
            if types.iter().all(|t| self.is_subtype(node, &ctx, t, expected)) {
                return Pair::new(Type::array(expected.clone()), ctx);
            }
        }
        let elem = Type::union(types);
        let elem = if self.literal_expected(elem_hint.as_ref()) { elem } else { elem.widen_literals() };
        Pair::new(Type::array(elem), ctx)
    }

    /// The element type contributed by `*value`.
    pub(crate) fn splat_element(&self, ty: &Type) -> Type {
        match self.expand(ty) {
            Type::Tuple(elems) => Type::union(elems),
            Type::Instance(name, args) if name == "Array" && args.len() == 1 => args[0].clone(),
            Type::Instance(name, args) if name == "Range" && args.len() == 1 => args[0].clone(),
            Type::Nil => Type::Bot,
            Type::Any => Type::Any,
            other => other,
        }
    }

    // ── Hashes ─────────────────────────────────────────────────────────

    pub(super) fn synth_hash(&mut self, node: Node<'a>, ctx: &Context, hint: Option<&Type>) -> Pair {
        let entries: Vec<Node<'a>> = node.child_nodes().collect();
        let hint = hint.map(|h| self.expand(h));

        if let Some(Type::Record(fields)) = &hint {
            if let Some(pair) = self.synth_record(&entries, ctx, fields) {
                return pair;
            }
        }

        let (key_hint, value_hint) = match &hint {
            Some(Type::Instance(name, args)) if name == "Hash" && args.len() == 2 => {
                (Some(args[0].clone()), Some(args[1].clone()))
            }
            _ => (None, None),
        };

        if entries.is_empty() {
            return match hint {
                Some(h) if key_hint.is_some() || matches!(h, Type::Record(_)) => Pair::new(h, ctx.clone()),
                _ => {
                    self.error(node, TypeErrorKind::UnannotatedEmptyCollection);
                    Pair::new(Type::hash(Type::Any, Type::Any), ctx.clone())
                }
            };
        }

        let mut ctx = ctx.clone();
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for entry in &entries {
            match entry.kind() {
                NodeKind::Pair => {
                    let (Some(k), Some(v)) = (entry.child(0), entry.child(1)) else {
                        continue;
                    };
                    let kp = self.synth(k, &ctx, key_hint.as_ref());
                    let vp = self.synth(v, &kp.ctx, value_hint.as_ref());
                    self.typing.add_type(entry.id(), Type::Tuple(vec![kp.ty.clone(), vp.ty.clone()]));
                    keys.push(kp.ty);
                    values.push(vp.ty);
                    ctx = vp.ctx;
                }
                _ => {
                    let pair = self.synth(*entry, &ctx, None);
                    match self.expand(&pair.ty) {
                        Type::Instance(name, args) if name == "Hash" && args.len() == 2 => {
                            keys.push(args[0].clone());
                            values.push(args[1].clone());
                        }
                        Type::Record(fields) => {
                            for (k, t) in fields {
                                keys.push(k.key_type());
                                values.push(t);
                            }
                        }
                        _ => {
                            keys.push(Type::Any);
                            values.push(Type::Any);
                        }
                    }
                    ctx = pair.ctx;
                }
            }
        }

        if let (Some(kh), Some(vh)) = (&key_hint, &value_hint) {
            let fits = keys.iter().all(|k| self.is_subtype(node, &ctx, k, kh))
                && values.iter().all(|v| self.is_subtype(node, &ctx, v, vh));
            if fits {
                return Pair::new(Type::hash(kh.clone(), vh.clone()), ctx);
            }
        }
        let key = Type::union(keys).widen_literals();
        let value = Type::union(values);
        let value = if self.literal_expected(value_hint.as_ref()) { value } else { value.widen_literals() };
        Pair::new(Type::hash(key, value), ctx)
    }

    /// A hash literal typed as a record, when every key is a literal.
    fn synth_record(&mut self, entries: &[Node<'a>], ctx: &Context, fields: &[(RecordKey, Type)]) -> Option<Pair> {
        let keys: Option<Vec<RecordKey>> = entries
            .iter()
            .map(|e| if e.is(NodeKind::Pair) { e.child(0).and_then(record_key) } else { None })
            .collect();
        let keys = keys?;
        let mut ctx = ctx.clone();
        let mut out = Vec::with_capacity(keys.len());
        for (entry, key) in entries.iter().zip(keys) {
            let (Some(k), Some(v)) = (entry.child(0), entry.child(1)) else {
                continue;
            };
            let field_hint = fields.iter().find(|(fk, _)| *fk == key).map(|(_, t)| t.clone());
            let kp = self.synth(k, &ctx, Some(&key.key_type()));
            let vp = self.synth(v, &kp.ctx, field_hint.as_ref());
            self.typing.add_type(entry.id(), Type::Tuple(vec![kp.ty, vp.ty.clone()]));
            out.push((key, vp.ty));
            ctx = vp.ctx;
        }
        Some(Pair::new(Type::Record(out), ctx))
    }

    pub(super) fn synth_pair(&mut self, node: Node<'a>, ctx: &Context) -> Pair {
        let mut ctx = ctx.clone();
        let mut types = Vec::new();
        for child in node.child_nodes() {
            let pair = self.synth(child, &ctx, None);
            types.push(pair.ty);
            ctx = pair.ctx;
        }
        Pair::new(Type::Tuple(types), ctx)
    }
}

/// The element type of an array-like expected type.
fn array_element(ty: &Type) -> Option<Type> {
    match ty {
        Type::Instance(name, args) if name == "Array" && args.len() == 1 => Some(args[0].clone()),
        _ => None,
    }
}

/// The record key a literal key node denotes.
pub(crate) fn record_key(node: Node<'_>) -> Option<RecordKey> {
    match node.kind() {
        NodeKind::Sym => node.symbol(0).map(|s| RecordKey::Sym(s.to_string())),
        NodeKind::Str => node.string(0).map(|s| RecordKey::Str(s.to_string())),
        NodeKind::Int => node.int(0).map(RecordKey::Int),
        _ => None,
    }
}

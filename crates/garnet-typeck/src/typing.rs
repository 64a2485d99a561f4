//! The result of checking one file.
//!
//! During the walk, overload resolution types the same argument nodes once
//! per candidate signature. `checkpoint`/`rollback`/`commit` keep the
//! attempts that are thrown away from leaking node types or errors.

use garnet_syntax::{NodeId, SyntaxTree};
use rowan::TextRange;
use rustc_hash::FxHashMap;

use crate::config::{DiagnosticConfig, Severity};
use crate::context::Context;
use crate::diagnostics::{render_diagnostic, DiagnosticOptions};
use crate::error::TypeError;
use crate::method_call::MethodCall;
use crate::ty::Type;

/// An error together with the severity a configuration gives it.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub error: TypeError,
    pub severity: Severity,
}

enum Undo {
    Type(NodeId, Option<Type>),
    Call(NodeId, Option<MethodCall>),
}

/// Opaque marker returned by [`Typing::checkpoint`].
#[derive(Debug)]
pub struct Checkpoint {
    undo_len: usize,
    errors_len: usize,
}

#[derive(Default)]
pub struct Typing {
    types: FxHashMap<NodeId, Type>,
    calls: FxHashMap<NodeId, MethodCall>,
    errors: Vec<TypeError>,
    cursor: Option<(TextRange, Context)>,
    undo: Vec<Undo>,
    depth: usize,
}

impl std::fmt::Debug for Typing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typing")
            .field("types", &self.types.len())
            .field("calls", &self.calls.len())
            .field("errors", &self.errors)
            .finish()
    }
}

impl Typing {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn call_of(&self, node: NodeId) -> Option<&MethodCall> {
        self.calls.get(&node)
    }

    /// Errors in the order they were found.
    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The context captured at the cursor position, if one was requested.
    pub fn cursor_context(&self) -> Option<&Context> {
        self.cursor.as_ref().map(|(_, ctx)| ctx)
    }

    /// Errors with their configured severity; ignored kinds are dropped.
    pub fn diagnostics(&self, config: &DiagnosticConfig) -> Vec<Diagnostic> {
        self.errors
            .iter()
            .filter_map(|error| match config.severity(error.code()) {
                Severity::Ignore => None,
                severity => Some(Diagnostic {
                    error: error.clone(),
                    severity,
                }),
            })
            .collect()
    }

    /// Render every error.
    pub fn render_errors(&self, source: &str, filename: &str, options: &DiagnosticOptions) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| render_diagnostic(e, source, filename, options, None))
            .collect()
    }

    // ── Recording ──────────────────────────────────────────────────────

    pub(crate) fn add_type(&mut self, node: NodeId, ty: Type) {
        let old = self.types.insert(node, ty);
        if self.depth > 0 {
            self.undo.push(Undo::Type(node, old));
        }
    }

    pub(crate) fn add_call(&mut self, node: NodeId, call: MethodCall) {
        let old = self.calls.insert(node, call);
        if self.depth > 0 {
            self.undo.push(Undo::Call(node, old));
        }
    }

    pub(crate) fn add_error(&mut self, error: TypeError) {
        self.errors.push(error);
    }

    pub(crate) fn errors_since(&self, checkpoint: &Checkpoint) -> &[TypeError] {
        &self.errors[checkpoint.errors_len..]
    }

    pub(crate) fn offer_cursor(&mut self, range: TextRange, ctx: &Context) {
        let replace = match &self.cursor {
            None => true,
            Some((current, _)) => current.contains_range(range),
        };
        if replace {
            self.cursor = Some((range, ctx.clone()));
        }
    }

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            undo_len: self.undo.len(),
            errors_len: self.errors.len(),
        }
    }

    /// Discard everything recorded since `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.undo.len() > checkpoint.undo_len {
            match self.undo.pop() {
                Some(Undo::Type(node, old)) => restore(&mut self.types, node, old),
                Some(Undo::Call(node, old)) => restore(&mut self.calls, node, old),
                None => break,
            }
        }
        self.errors.truncate(checkpoint.errors_len);
        self.depth -= 1;
    }

    /// Keep everything recorded since `checkpoint`.
    /// The undo entries stay while an outer checkpoint may still roll back.
    pub(crate) fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert!(self.undo.len() >= checkpoint.undo_len);
        self.depth -= 1;
        if self.depth == 0 {
            self.undo.clear();
        }
    }

    /// Give every reachable node without a type `untyped`.
    pub(crate) fn fill_untyped(&mut self, tree: &SyntaxTree) {
        for id in tree.reachable() {
            self.types.entry(id).or_insert(Type::Any);
        }
    }
}

fn restore<V>(map: &mut FxHashMap<NodeId, V>, node: NodeId, old: Option<V>) {
    match old {
        Some(v) => {
            map.insert(node, v);
        }
        None => {
            map.remove(&node);
        }
    }
}

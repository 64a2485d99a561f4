//! Node kinds of the consumed syntax tree.
//!
//! The names follow the canonical s-expression dump of the host parser
//! (`lvasgn`, `send`, `kwbegin`, ...). Child layouts are documented on the
//! variants whose shape is not obvious.

use std::fmt;

macro_rules! node_kinds {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, )*) => {
        /// The kind of a syntax node.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum NodeKind {
            $( $(#[$doc])* $variant, )*
        }

        impl NodeKind {
            /// Parse a kind from its dump name.
            pub fn from_name(name: &str) -> Option<NodeKind> {
                match name {
                    $( $name => Some(NodeKind::$variant), )*
                    _ => None,
                }
            }

            /// The dump name of this kind.
            pub fn name(self) -> &'static str {
                match self {
                    $( NodeKind::$variant => $name, )*
                }
            }
        }
    };
}

node_kinds! {
    Int => "int",
    Float => "float",
    Str => "str",
    /// Interpolated string: children are `str` and `begin` parts.
    Dstr => "dstr",
    Xstr => "xstr",
    Sym => "sym",
    Dsym => "dsym",
    /// `(regexp parts... (regopt flags...))`
    Regexp => "regexp",
    Regopt => "regopt",
    True => "true",
    False => "false",
    Nil => "nil",
    SelfNode => "self",
    Array => "array",
    Hash => "hash",
    /// `(pair key value)`
    Pair => "pair",
    /// Trailing keyword arguments of a call: children are `pair`/`kwsplat`.
    Kwargs => "kwargs",
    Kwsplat => "kwsplat",
    Splat => "splat",
    BlockPass => "block_pass",
    Irange => "irange",
    Erange => "erange",
    Lvar => "lvar",
    /// `(lvasgn :name value?)` -- value is absent inside `masgn`/`for`/`resbody`.
    Lvasgn => "lvasgn",
    Ivar => "ivar",
    Ivasgn => "ivasgn",
    Gvar => "gvar",
    Gvasgn => "gvasgn",
    Cvar => "cvar",
    Cvasgn => "cvasgn",
    /// `(const scope-or-nil :Name)`
    Const => "const",
    /// `(casgn scope-or-nil :Name value)`
    Casgn => "casgn",
    Cbase => "cbase",
    /// `(op_asgn target :op value)`
    OpAsgn => "op_asgn",
    OrAsgn => "or_asgn",
    AndAsgn => "and_asgn",
    /// `(masgn (mlhs targets...) value)`
    Masgn => "masgn",
    Mlhs => "mlhs",
    /// `(send receiver-or-nil :method args...)`
    Send => "send",
    Csend => "csend",
    /// `(block call (args ...) body)`
    Block => "block",
    /// `(numblock call max-param body)`
    Numblock => "numblock",
    Lambda => "lambda",
    Args => "args",
    Arg => "arg",
    Optarg => "optarg",
    Restarg => "restarg",
    Kwarg => "kwarg",
    Kwoptarg => "kwoptarg",
    Kwrestarg => "kwrestarg",
    Blockarg => "blockarg",
    Procarg0 => "procarg0",
    /// `(def :name (args ...) body)`
    Def => "def",
    /// `(defs receiver :name (args ...) body)`
    Defs => "defs",
    /// `(class (const ..) superclass-or-nil body)`
    Class => "class",
    /// `(module (const ..) body)`
    Module => "module",
    /// `(sclass (self) body)`
    Sclass => "sclass",
    Begin => "begin",
    Kwbegin => "kwbegin",
    /// `(if cond then-or-nil else-or-nil)`
    If => "if",
    /// `(case subject-or-nil (when ...)... else-or-nil)`
    Case => "case",
    /// `(when patterns... body)`
    When => "when",
    While => "while",
    Until => "until",
    WhilePost => "while_post",
    UntilPost => "until_post",
    /// `(for (lvasgn :x) collection body)`
    For => "for",
    Break => "break",
    Next => "next",
    Redo => "redo",
    Retry => "retry",
    Return => "return",
    And => "and",
    Or => "or",
    /// `(rescue body (resbody ...)... else-or-nil)`
    Rescue => "rescue",
    /// `(resbody (array classes...)-or-nil (lvasgn :e)-or-nil body)`
    Resbody => "resbody",
    /// `(ensure body ensure-body)`
    Ensure => "ensure",
    Super => "super",
    Zsuper => "zsuper",
    Yield => "yield",
    Defined => "defined?",
    Alias => "alias",
    Undef => "undef",
    /// `(assertion expr "Type")` -- a trailing `#: Type` comment.
    Assertion => "assertion",
    /// `(type_app call "T, U")` -- a trailing `#$ T, U` comment.
    TypeApp => "type_app",
}

impl NodeKind {
    /// Kinds that bind a target rather than evaluate a value when they
    /// appear without a value child.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            NodeKind::Lvasgn
                | NodeKind::Ivasgn
                | NodeKind::Gvasgn
                | NodeKind::Cvasgn
                | NodeKind::Casgn
        )
    }

    pub fn is_loop(self) -> bool {
        matches!(
            self,
            NodeKind::While
                | NodeKind::Until
                | NodeKind::WhilePost
                | NodeKind::UntilPost
                | NodeKind::For
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in ["lvasgn", "send", "while_post", "defined?", "type_app", "self"] {
            let kind = NodeKind::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
        }
        assert!(NodeKind::from_name("frobnicate").is_none());
    }

    #[test]
    fn classification() {
        assert!(NodeKind::Ivasgn.is_assignment());
        assert!(!NodeKind::Lvar.is_assignment());
        assert!(NodeKind::UntilPost.is_loop());
    }
}

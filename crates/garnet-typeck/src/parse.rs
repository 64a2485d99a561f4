//! Parser for the type-expression language used by annotations and by
//! environment construction.
//!
//! ```text
//! type   := inter ('|' inter)*
//! inter  := opt ('&' opt)*
//! opt    := primary '?'*
//! method := ('[' tparam, ... ']')? '(' params ')' block? '->' opt
//! ```
//!
//! Method return types are parsed at the `opt` level, so a union return
//! must be parenthesized: `() -> (Integer | String)`. This is what lets
//! overloads be separated by a bare `|`.

use thiserror::Error;

use crate::method_type::{BlockType, FunctionType, MethodType, Params, ProcType, TypeParam, Variance};
use crate::ty::{Literal, RecordKey, Type};

/// A type-expression parse failure at byte `offset` of the input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

// ── Lexer ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Str(String),
    Sym(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Pipe,
    Amp,
    Question,
    Star,
    StarStar,
    Colon,
    ColonColon,
    Arrow,
    FatArrow,
    Caret,
    Lt,
    Eof,
}

#[derive(Clone, Debug)]
struct Token {
    tok: Tok,
    offset: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    let bytes: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let err = |message: &str, offset: usize| ParseError {
        message: message.to_string(),
        offset,
    };
    while i < bytes.len() {
        let (off, c) = bytes[i];
        let peek = |n: usize| bytes.get(i + n).map(|&(_, c)| c);
        let single = |tok: Tok| Token { tok, offset: off };
        match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '(' => tokens.push(single(Tok::LParen)),
            ')' => tokens.push(single(Tok::RParen)),
            '[' => tokens.push(single(Tok::LBracket)),
            ']' => tokens.push(single(Tok::RBracket)),
            '{' => tokens.push(single(Tok::LBrace)),
            '}' => tokens.push(single(Tok::RBrace)),
            ',' => tokens.push(single(Tok::Comma)),
            '|' => tokens.push(single(Tok::Pipe)),
            '&' => tokens.push(single(Tok::Amp)),
            '?' => tokens.push(single(Tok::Question)),
            '^' => tokens.push(single(Tok::Caret)),
            '<' => tokens.push(single(Tok::Lt)),
            '*' => {
                if peek(1) == Some('*') {
                    tokens.push(single(Tok::StarStar));
                    i += 1;
                } else {
                    tokens.push(single(Tok::Star));
                }
            }
            '-' if peek(1) == Some('>') => {
                tokens.push(single(Tok::Arrow));
                i += 1;
            }
            '=' if peek(1) == Some('>') => {
                tokens.push(single(Tok::FatArrow));
                i += 1;
            }
            ':' => {
                if peek(1) == Some(':') {
                    tokens.push(single(Tok::ColonColon));
                    i += 1;
                } else if peek(1).is_some_and(is_ident_start) {
                    let start = i + 1;
                    let mut j = start;
                    while j < bytes.len() && (is_ident_char(bytes[j].1) || matches!(bytes[j].1, '?' | '!' | '=')) {
                        j += 1;
                    }
                    let name: String = bytes[start..j].iter().map(|&(_, c)| c).collect();
                    tokens.push(single(Tok::Sym(name)));
                    i = j;
                    continue;
                } else if peek(1) == Some('"') {
                    let (s, next) = lex_string(&bytes, i + 1)?;
                    tokens.push(single(Tok::Sym(s)));
                    i = next;
                    continue;
                } else {
                    tokens.push(single(Tok::Colon));
                }
            }
            '"' => {
                let (s, next) = lex_string(&bytes, i)?;
                tokens.push(single(Tok::Str(s)));
                i = next;
                continue;
            }
            c if c.is_ascii_digit() || (c == '-' && peek(1).is_some_and(|d| d.is_ascii_digit())) => {
                let mut j = i + 1;
                while j < bytes.len() && (bytes[j].1.is_ascii_digit() || bytes[j].1 == '_') {
                    j += 1;
                }
                let text: String = bytes[i..j].iter().map(|&(_, c)| c).filter(|&c| c != '_').collect();
                let value = text.parse::<i64>().map_err(|_| err("integer literal out of range", off))?;
                tokens.push(single(Tok::Int(value)));
                i = j;
                continue;
            }
            c if is_ident_start(c) => {
                let mut j = i + 1;
                while j < bytes.len() && is_ident_char(bytes[j].1) {
                    j += 1;
                }
                let name: String = bytes[i..j].iter().map(|&(_, c)| c).collect();
                tokens.push(single(Tok::Ident(name)));
                i = j;
                continue;
            }
            other => return Err(err(&format!("unexpected character `{}`", other), off)),
        }
        i += 1;
    }
    tokens.push(Token {
        tok: Tok::Eof,
        offset: src.len(),
    });
    Ok(tokens)
}

/// Lex a double-quoted string starting at `bytes[start] == '"'`.
fn lex_string(bytes: &[(usize, char)], start: usize) -> Result<(String, usize), ParseError> {
    let mut out = String::new();
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j].1 {
            '"' => return Ok((out, j + 1)),
            '\\' => {
                let escaped = bytes.get(j + 1).map(|&(_, c)| c).ok_or_else(|| ParseError {
                    message: "unterminated string".to_string(),
                    offset: bytes[start].0,
                })?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                j += 2;
            }
            c => {
                out.push(c);
                j += 1;
            }
        }
    }
    Err(ParseError {
        message: "unterminated string".to_string(),
        offset: bytes[start].0,
    })
}

// ── Parser ─────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Type variable names in scope, innermost last.
    vars: Vec<String>,
}

const KEYWORDS: &[&str] = &[
    "untyped", "void", "top", "bot", "nil", "bool", "self", "instance", "class", "true", "false", "singleton",
];

impl Parser {
    fn new(src: &str, vars: &[String]) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: lex(src)?,
            pos: 0,
            vars: vars.to_vec(),
        })
    }

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn peek_at(&self, n: usize) -> &Tok {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].tok
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<(), ParseError> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            offset: self.offset(),
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if *self.peek() == Tok::Eof {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn ident_is(&self, name: &str) -> bool {
        matches!(self.peek(), Tok::Ident(n) if n == name)
    }

    // ── Types ──────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let mut members = vec![self.parse_intersection()?];
        while self.eat(&Tok::Pipe) {
            members.push(self.parse_intersection()?);
        }
        Ok(if members.len() == 1 {
            members.pop().unwrap_or(Type::Bot)
        } else {
            Type::union(members)
        })
    }

    fn parse_intersection(&mut self) -> Result<Type, ParseError> {
        let mut members = vec![self.parse_optional()?];
        while self.eat(&Tok::Amp) {
            members.push(self.parse_optional()?);
        }
        Ok(if members.len() == 1 {
            members.pop().unwrap_or(Type::Top)
        } else {
            Type::intersection(members)
        })
    }

    fn parse_optional(&mut self) -> Result<Type, ParseError> {
        let mut ty = self.parse_primary()?;
        while self.eat(&Tok::Question) {
            ty = Type::optional(ty);
        }
        Ok(ty)
    }

    fn parse_primary(&mut self) -> Result<Type, ParseError> {
        match self.peek().clone() {
            Tok::LParen => {
                self.bump();
                let ty = self.parse_type()?;
                self.expect(Tok::RParen, "`)`")?;
                Ok(ty)
            }
            Tok::LBracket => {
                self.bump();
                let mut elems = Vec::new();
                if !self.eat(&Tok::RBracket) {
                    loop {
                        elems.push(self.parse_type()?);
                        if self.eat(&Tok::RBracket) {
                            break;
                        }
                        self.expect(Tok::Comma, "`,` or `]`")?;
                    }
                }
                Ok(Type::Tuple(elems))
            }
            Tok::LBrace => self.parse_record(),
            Tok::Caret => {
                self.bump();
                Ok(Type::Proc(Box::new(self.parse_proc_body()?)))
            }
            Tok::Int(i) => {
                self.bump();
                Ok(Type::Literal(Literal::Int(i)))
            }
            Tok::Str(s) => {
                self.bump();
                Ok(Type::Literal(Literal::Str(s)))
            }
            Tok::Sym(s) => {
                self.bump();
                Ok(Type::Literal(Literal::Sym(s)))
            }
            Tok::Ident(name) if KEYWORDS.contains(&name.as_str()) => {
                self.bump();
                Ok(match name.as_str() {
                    "untyped" => Type::Any,
                    "void" => Type::Void,
                    "top" => Type::Top,
                    "bot" => Type::Bot,
                    "nil" => Type::Nil,
                    "bool" => Type::Bool,
                    "self" => Type::SelfType,
                    "instance" => Type::InstanceType,
                    "class" => Type::ClassType,
                    "true" => Type::Literal(Literal::True),
                    "false" => Type::Literal(Literal::False),
                    _ => {
                        self.expect(Tok::LParen, "`(` after `singleton`")?;
                        let (name, _) = self.parse_name()?;
                        self.expect(Tok::RParen, "`)`")?;
                        Type::Singleton(name)
                    }
                })
            }
            Tok::Ident(_) | Tok::ColonColon => self.parse_named(),
            _ => Err(self.error("expected a type")),
        }
    }

    /// `::A::B` or `A::B`; returns the joined name and whether it was
    /// written with a leading `::` or namespace.
    fn parse_name(&mut self) -> Result<(String, bool), ParseError> {
        let qualified = self.eat(&Tok::ColonColon);
        let mut segments = Vec::new();
        loop {
            match self.bump() {
                Tok::Ident(seg) => segments.push(seg),
                _ => return Err(self.error("expected a name")),
            }
            if *self.peek() == Tok::ColonColon && matches!(self.peek_at(1), Tok::Ident(_)) {
                self.bump();
            } else {
                break;
            }
        }
        let qualified = qualified || segments.len() > 1;
        Ok((segments.join("::"), qualified))
    }

    fn parse_type_args(&mut self) -> Result<Vec<Type>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&Tok::LBracket) {
            loop {
                args.push(self.parse_type()?);
                if self.eat(&Tok::RBracket) {
                    break;
                }
                self.expect(Tok::Comma, "`,` or `]`")?;
            }
        }
        Ok(args)
    }

    fn parse_named(&mut self) -> Result<Type, ParseError> {
        let (name, qualified) = self.parse_name()?;
        if !qualified && self.vars.iter().any(|v| *v == name) {
            return Ok(Type::var(&name));
        }
        let args = self.parse_type_args()?;
        let last = name.rsplit("::").next().unwrap_or(&name);
        Ok(if last.starts_with('_') {
            Type::Interface(name, args)
        } else if last.starts_with(|c: char| c.is_ascii_lowercase()) {
            Type::Alias(name, args)
        } else {
            Type::Instance(name, args)
        })
    }

    fn parse_record(&mut self) -> Result<Type, ParseError> {
        self.expect(Tok::LBrace, "`{`")?;
        let mut fields = Vec::new();
        if self.eat(&Tok::RBrace) {
            return Ok(Type::Record(fields));
        }
        loop {
            let key = match (self.peek().clone(), self.peek_at(1).clone()) {
                (Tok::Ident(name), Tok::Colon) => {
                    self.bump();
                    self.bump();
                    RecordKey::Sym(name)
                }
                (Tok::Sym(name), Tok::FatArrow) => {
                    self.bump();
                    self.bump();
                    RecordKey::Sym(name)
                }
                (Tok::Str(s), Tok::FatArrow) => {
                    self.bump();
                    self.bump();
                    RecordKey::Str(s)
                }
                (Tok::Int(i), Tok::FatArrow) => {
                    self.bump();
                    self.bump();
                    RecordKey::Int(i)
                }
                _ => return Err(self.error("expected a record key")),
            };
            fields.push((key, self.parse_type()?));
            if self.eat(&Tok::RBrace) {
                break;
            }
            self.expect(Tok::Comma, "`,` or `}`")?;
        }
        Ok(Type::Record(fields))
    }

    // ── Functions ──────────────────────────────────────────────────────

    /// Skip an optional parameter name after a parameter type.
    fn skip_param_name(&mut self) {
        if let Tok::Ident(name) = self.peek() {
            if name.starts_with(|c: char| c.is_ascii_lowercase() || c == '_') && !KEYWORDS.contains(&name.as_str()) {
                self.bump();
            }
        }
    }

    fn parse_params(&mut self) -> Result<Params, ParseError> {
        self.expect(Tok::LParen, "`(`")?;
        let mut params = Params::default();
        if self.eat(&Tok::RParen) {
            return Ok(params);
        }
        loop {
            match (self.peek().clone(), self.peek_at(1).clone(), self.peek_at(2).clone()) {
                (Tok::Question, Tok::Ident(name), Tok::Colon) => {
                    self.bump();
                    self.bump();
                    self.bump();
                    let ty = self.parse_type()?;
                    self.skip_param_name();
                    params.optional_keywords.push((name, ty));
                }
                (Tok::Ident(name), Tok::Colon, _) => {
                    self.bump();
                    self.bump();
                    let ty = self.parse_type()?;
                    self.skip_param_name();
                    params.required_keywords.push((name, ty));
                }
                (Tok::Question, _, _) => {
                    self.bump();
                    let ty = self.parse_type()?;
                    self.skip_param_name();
                    if params.rest.is_some() || !params.trailing.is_empty() {
                        return Err(self.error("optional parameter after rest parameter"));
                    }
                    params.optional.push(ty);
                }
                (Tok::StarStar, _, _) => {
                    self.bump();
                    let ty = self.parse_type()?;
                    self.skip_param_name();
                    params.rest_keywords = Some(ty);
                }
                (Tok::Star, _, _) => {
                    self.bump();
                    let ty = self.parse_type()?;
                    self.skip_param_name();
                    if params.rest.is_some() {
                        return Err(self.error("duplicate rest parameter"));
                    }
                    params.rest = Some(ty);
                }
                _ => {
                    let ty = self.parse_type()?;
                    self.skip_param_name();
                    if params.rest.is_some() || !params.optional.is_empty() {
                        params.trailing.push(ty);
                    } else {
                        params.required.push(ty);
                    }
                }
            }
            if self.eat(&Tok::RParen) {
                break;
            }
            self.expect(Tok::Comma, "`,` or `)`")?;
        }
        Ok(params)
    }

    /// `[self: T]`
    fn parse_self_binding(&mut self) -> Result<Option<Type>, ParseError> {
        if *self.peek() == Tok::LBracket && matches!(self.peek_at(1), Tok::Ident(n) if n == "self") {
            self.bump();
            self.bump();
            self.expect(Tok::Colon, "`:`")?;
            let ty = self.parse_type()?;
            self.expect(Tok::RBracket, "`]`")?;
            Ok(Some(ty))
        } else {
            Ok(None)
        }
    }

    fn parse_block(&mut self) -> Result<Option<BlockType>, ParseError> {
        let required = match (self.peek(), self.peek_at(1)) {
            (Tok::Question, Tok::LBrace) => {
                self.bump();
                false
            }
            (Tok::LBrace, _) => true,
            _ => return Ok(None),
        };
        self.expect(Tok::LBrace, "`{`")?;
        let params = if *self.peek() == Tok::LParen {
            self.parse_params()?
        } else {
            Params::default()
        };
        let self_type = self.parse_self_binding()?;
        self.expect(Tok::Arrow, "`->`")?;
        let ret = self.parse_optional()?;
        self.expect(Tok::RBrace, "`}`")?;
        Ok(Some(BlockType {
            required,
            func: FunctionType::new(params, ret),
            self_type,
        }))
    }

    fn parse_proc_body(&mut self) -> Result<ProcType, ParseError> {
        let params = if *self.peek() == Tok::LParen {
            self.parse_params()?
        } else {
            Params::default()
        };
        let self_type = self.parse_self_binding()?;
        let block = self.parse_block()?;
        self.expect(Tok::Arrow, "`->`")?;
        let ret = self.parse_optional()?;
        Ok(ProcType {
            func: FunctionType::new(params, ret),
            block,
            self_type,
        })
    }

    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        let mut out = Vec::new();
        if !self.eat(&Tok::LBracket) {
            return Ok(out);
        }
        loop {
            let mut variance = Variance::Invariant;
            if self.ident_is("unchecked") && matches!(self.peek_at(1), Tok::Ident(_)) {
                self.bump();
            }
            if self.ident_is("out") && matches!(self.peek_at(1), Tok::Ident(_)) {
                self.bump();
                variance = Variance::Covariant;
            } else if self.ident_is("in") && matches!(self.peek_at(1), Tok::Ident(_)) {
                self.bump();
                variance = Variance::Contravariant;
            }
            let name = match self.bump() {
                Tok::Ident(name) => name,
                _ => return Err(self.error("expected a type parameter name")),
            };
            out.push(TypeParam {
                name,
                variance,
                upper_bound: None,
            });
            if self.eat(&Tok::Lt) {
                // Bounds may mention any parameter of the list.
                self.vars.extend(out.iter().map(|p| p.name.clone()));
                let bound = self.parse_type()?;
                if let Some(last) = out.last_mut() {
                    last.upper_bound = Some(bound);
                }
            }
            if self.eat(&Tok::RBracket) {
                break;
            }
            self.expect(Tok::Comma, "`,` or `]`")?;
        }
        Ok(out)
    }

    fn parse_method_type(&mut self) -> Result<MethodType, ParseError> {
        let outer = self.vars.len();
        let type_params = self.parse_type_params()?;
        self.vars.truncate(outer);
        self.vars.extend(type_params.iter().map(|p| p.name.clone()));
        let params = self.parse_params()?;
        let block = self.parse_block()?;
        self.expect(Tok::Arrow, "`->`")?;
        let ret = self.parse_optional()?;
        self.vars.truncate(outer);
        Ok(MethodType {
            type_params,
            func: FunctionType::new(params, ret),
            block,
        })
    }
}

// ── Entry points ───────────────────────────────────────────────────────

/// Parse a type with no type variables in scope.
pub fn parse_type(src: &str) -> Result<Type, ParseError> {
    parse_type_with_vars(src, &[])
}

/// Parse a type where the bare names in `vars` denote type variables.
pub fn parse_type_with_vars(src: &str, vars: &[String]) -> Result<Type, ParseError> {
    let mut p = Parser::new(src, vars)?;
    let ty = p.parse_type()?;
    p.expect_eof()?;
    Ok(ty)
}

/// Parse one method type.
pub fn parse_method_type(src: &str, vars: &[String]) -> Result<MethodType, ParseError> {
    let mut p = Parser::new(src, vars)?;
    let mt = p.parse_method_type()?;
    p.expect_eof()?;
    Ok(mt)
}

/// Parse `|`-separated overloads.
pub fn parse_overloads(src: &str, vars: &[String]) -> Result<Vec<MethodType>, ParseError> {
    let mut p = Parser::new(src, vars)?;
    let mut out = vec![p.parse_method_type()?];
    while p.eat(&Tok::Pipe) {
        out.push(p.parse_method_type()?);
    }
    p.expect_eof()?;
    Ok(out)
}

/// Parse a declaration header: `Name` or `Name[out T, U < Bound]`.
pub fn parse_decl_header(src: &str) -> Result<(String, Vec<TypeParam>), ParseError> {
    let mut p = Parser::new(src, &[])?;
    let (name, _) = p.parse_name()?;
    let params = p.parse_type_params()?;
    p.expect_eof()?;
    Ok((name, params))
}

/// Parse a comma-separated list of types (`#$ A, B` type applications).
pub fn parse_type_list(src: &str, vars: &[String]) -> Result<Vec<Type>, ParseError> {
    let mut p = Parser::new(src, vars)?;
    let mut out = vec![p.parse_type()?];
    while p.eat(&Tok::Comma) {
        out.push(p.parse_type()?);
    }
    p.expect_eof()?;
    Ok(out)
}

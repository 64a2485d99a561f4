//! Reader for the parser's canonical s-expression dump.
//!
//! ```text
//! (begin
//!   {@type var x: Integer?}
//!   (lvasgn :x (str "x")))
//! ```
//!
//! A `{...}` item attaches an annotation to the enclosing list's node.
//! Ranges recorded on nodes are byte ranges of the dump text.

use garnet_common::error::{ReadError, ReadErrorKind};
use rowan::{TextRange, TextSize};

use crate::annotation::{parse_annotation, Annotation};
use crate::kind::NodeKind;
use crate::tree::{Child, NodeId, SyntaxTree};

/// Read a whole tree. An empty (whitespace-only) input yields a tree
/// without a root.
pub fn read(src: &str) -> Result<SyntaxTree, ReadError> {
    let mut reader = Reader {
        src,
        pos: 0,
        tree: SyntaxTree::new(),
    };
    reader.skip_ws();
    if reader.at_end() {
        return Ok(reader.tree);
    }
    let start = reader.pos;
    match reader.read_item()? {
        Item::Child(Child::Node(root)) => reader.tree.set_root(root),
        Item::Child(Child::Nil) => {}
        _ => {
            return Err(ReadError::new(
                ReadErrorKind::UnexpectedCharacter(src[start..].chars().next().unwrap_or(' ')),
                reader.range(start, start + 1),
            ))
        }
    }
    reader.skip_ws();
    if !reader.at_end() {
        return Err(ReadError::new(
            ReadErrorKind::TrailingInput,
            reader.range(reader.pos, src.len()),
        ));
    }
    Ok(reader.tree)
}

enum Item {
    Child(Child),
    Annotation(Annotation),
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    tree: SyntaxTree,
}

impl<'a> Reader<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn range(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32))
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else if c == ';' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
            } else {
                break;
            }
        }
    }

    fn eof(&self) -> ReadError {
        ReadError::new(ReadErrorKind::UnexpectedEof, self.range(self.src.len(), self.src.len()))
    }

    fn read_item(&mut self) -> Result<Item, ReadError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            None => Err(self.eof()),
            Some('(') => self.read_list().map(|id| Item::Child(Child::Node(id))),
            Some(')') => Err(ReadError::new(
                ReadErrorKind::UnbalancedParen,
                self.range(start, start + 1),
            )),
            Some('{') => self.read_annotation().map(Item::Annotation),
            Some(':') => {
                self.bump();
                if self.peek() == Some('"') {
                    let s = self.read_string()?;
                    return Ok(Item::Child(Child::Symbol(s)));
                }
                let word = self.read_word();
                if word.is_empty() {
                    return Err(ReadError::new(
                        ReadErrorKind::UnexpectedCharacter(':'),
                        self.range(start, start + 1),
                    ));
                }
                Ok(Item::Child(Child::Symbol(word.to_string())))
            }
            Some('"') => self.read_string().map(|s| Item::Child(Child::Str(s))),
            Some(c) if c.is_ascii_digit() || c == '-' => self.read_number(),
            Some(_) => {
                let word = self.read_word();
                match word {
                    "nil" => Ok(Item::Child(Child::Nil)),
                    "" => {
                        let c = self.peek().unwrap_or(' ');
                        Err(ReadError::new(
                            ReadErrorKind::UnexpectedCharacter(c),
                            self.range(start, start + c.len_utf8()),
                        ))
                    }
                    other => Err(ReadError::new(
                        ReadErrorKind::UnknownNodeKind(other.to_string()),
                        self.range(start, self.pos),
                    )),
                }
            }
        }
    }

    fn read_word(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '{' | '}' | '"' | ';') {
                break;
            }
            self.pos += c.len_utf8();
        }
        &src[start..self.pos]
    }

    fn read_list(&mut self) -> Result<NodeId, ReadError> {
        let start = self.pos;
        self.bump();
        self.skip_ws();
        let head_start = self.pos;
        let head = self.read_word();
        let kind = NodeKind::from_name(head).ok_or_else(|| {
            ReadError::new(
                ReadErrorKind::UnknownNodeKind(head.to_string()),
                self.range(head_start, self.pos),
            )
        })?;
        let mut children = Vec::new();
        let mut annotations = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.eof()),
                Some(')') => {
                    self.bump();
                    break;
                }
                _ => match self.read_item()? {
                    Item::Child(child) => children.push(child),
                    Item::Annotation(a) => annotations.push(a),
                },
            }
        }
        let id = self.tree.alloc(kind, children, self.range(start, self.pos));
        for a in annotations {
            self.tree.annotate(id, a);
        }
        Ok(id)
    }

    fn read_annotation(&mut self) -> Result<Annotation, ReadError> {
        let start = self.pos;
        self.bump();
        let mut depth = 1;
        let text_start = self.pos;
        loop {
            match self.bump() {
                None => return Err(self.eof()),
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
            }
        }
        let text = &self.src[text_start..self.pos - 1];
        let range = self.range(start, self.pos);
        parse_annotation(text)
            .map(|kind| Annotation { kind, range })
            .map_err(|msg| ReadError::new(ReadErrorKind::InvalidAnnotation(msg), range))
    }

    fn read_string(&mut self) -> Result<String, ReadError> {
        self.bump();
        let mut out = String::new();
        loop {
            let esc_start = self.pos;
            match self.bump() {
                None => return Err(self.eof()),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some('#') => out.push('#'),
                    Some('0') => out.push('\0'),
                    Some(c) => {
                        return Err(ReadError::new(
                            ReadErrorKind::InvalidEscapeSequence(c),
                            self.range(esc_start, self.pos),
                        ))
                    }
                    None => return Err(self.eof()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn read_number(&mut self) -> Result<Item, ReadError> {
        let start = self.pos;
        let word = self.read_word();
        if let Ok(i) = word.replace('_', "").parse::<i64>() {
            return Ok(Item::Child(Child::Int(i)));
        }
        if word.parse::<f64>().is_ok() {
            return Ok(Item::Child(Child::Float(word.to_string())));
        }
        Err(ReadError::new(
            ReadErrorKind::InvalidNumberLiteral(word.to_string()),
            self.range(start, self.pos),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationKind;

    #[test]
    fn reads_nested_send() {
        let tree = read("(send (send (const nil :C) :new) :foo (str \"2\"))").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.kind(), NodeKind::Send);
        assert_eq!(root.symbol(1), Some("foo"));
        let recv = root.child(0).unwrap();
        assert_eq!(recv.symbol(1), Some("new"));
        assert_eq!(root.child(2).unwrap().string(0), Some("2"));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn attaches_annotations() {
        let tree = read("(begin {@type var x: Integer?} (lvasgn :x (str \"x\")))").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.child_count(), 1);
        match &root.annotations()[0].kind {
            AnnotationKind::VarType { name, ty } => {
                assert_eq!(name, "x");
                assert_eq!(ty, "Integer?");
            }
            other => panic!("unexpected annotation {:?}", other),
        }
    }

    #[test]
    fn annotation_with_record_braces() {
        let tree = read("(begin {@type var r: { a: Integer }} (nil))").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(
            root.annotations()[0].kind,
            AnnotationKind::VarType {
                name: "r".into(),
                ty: "{ a: Integer }".into()
            }
        );
    }

    #[test]
    fn numbers_and_symbols() {
        let tree = read("(send (int -3) :+ (float 1.5) (sym :\"a b\"))").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.child(0).unwrap().int(0), Some(-3));
        assert_eq!(root.child(2).unwrap().children()[0], Child::Float("1.5".into()));
        assert_eq!(root.child(3).unwrap().symbol(0), Some("a b"));
    }

    #[test]
    fn ranges_cover_lists() {
        let src = "(begin (int 1) (int 22))";
        let tree = read(src).unwrap();
        let second = tree.root().unwrap().child(1).unwrap();
        let r = second.range();
        assert_eq!(&src[usize::from(r.start())..usize::from(r.end())], "(int 22)");
    }

    #[test]
    fn errors() {
        assert_eq!(read("(frob 1)").unwrap_err().kind, ReadErrorKind::UnknownNodeKind("frob".into()));
        assert_eq!(read("(int 1").unwrap_err().kind, ReadErrorKind::UnexpectedEof);
        assert_eq!(read("(int 1) (int 2)").unwrap_err().kind, ReadErrorKind::TrailingInput);
        assert!(matches!(
            read("(begin {@bogus})").unwrap_err().kind,
            ReadErrorKind::InvalidAnnotation(_)
        ));
    }

    #[test]
    fn empty_input_has_no_root() {
        assert!(read("  \n").unwrap().root().is_none());
    }
}

//! Comment annotations attached to nodes.
//!
//! Type text is kept raw; the checker parses it with its own type parser so
//! that a malformed type is reported as a diagnostic on the annotated node
//! rather than failing the read.

use rowan::TextRange;

/// One `# @...` annotation line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// Range of the annotation text in the source.
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationKind {
    /// `@type var name: T`
    VarType { name: String, ty: String },
    /// `@type self: T`
    SelfType(String),
    /// `@type instance: T`
    InstanceType(String),
    /// `@type module: T`
    ModuleType(String),
    /// `@type ivar @name: T`
    IvarType { name: String, ty: String },
    /// `@type const Name: T`
    ConstType { name: String, ty: String },
    /// `@type return: T`
    ReturnType(String),
    /// `@type block: T`
    BlockType(String),
    /// `@type break: T`
    BreakType(String),
    /// `@implements Name[Args]`
    Implements(String),
    /// `@dynamic a, b`
    Dynamic(Vec<String>),
}

/// Parse one annotation line (with or without the leading `#`).
pub fn parse_annotation(text: &str) -> Result<AnnotationKind, String> {
    let text = text.trim().trim_start_matches('#').trim();
    if let Some(rest) = text.strip_prefix("@type") {
        let rest = rest.trim_start();
        let (head, ty) = split_colon(rest).ok_or_else(|| format!("missing `:` in `{text}`"))?;
        let mut words = head.split_whitespace();
        let kind = match (words.next(), words.next(), words.next()) {
            (Some("var"), Some(name), None) => AnnotationKind::VarType {
                name: name.to_string(),
                ty,
            },
            (Some("ivar"), Some(name), None) if name.starts_with('@') => AnnotationKind::IvarType {
                name: name.to_string(),
                ty,
            },
            (Some("const"), Some(name), None) => AnnotationKind::ConstType {
                name: name.to_string(),
                ty,
            },
            (Some("self"), None, None) => AnnotationKind::SelfType(ty),
            (Some("instance"), None, None) => AnnotationKind::InstanceType(ty),
            (Some("module"), None, None) => AnnotationKind::ModuleType(ty),
            (Some("return"), None, None) => AnnotationKind::ReturnType(ty),
            (Some("block"), None, None) => AnnotationKind::BlockType(ty),
            (Some("break"), None, None) => AnnotationKind::BreakType(ty),
            _ => return Err(format!("unknown @type form `{head}`")),
        };
        return Ok(kind);
    }
    if let Some(rest) = text.strip_prefix("@implements") {
        let name = rest.trim();
        if name.is_empty() {
            return Err("@implements needs a module name".to_string());
        }
        return Ok(AnnotationKind::Implements(name.to_string()));
    }
    if let Some(rest) = text.strip_prefix("@dynamic") {
        let names: Vec<String> = rest
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Err("@dynamic needs at least one method name".to_string());
        }
        return Ok(AnnotationKind::Dynamic(names));
    }
    Err(format!("not an annotation: `{text}`"))
}

/// Split `head: type` at the first colon that is not part of `::`.
fn split_colon(text: &str) -> Option<(&str, String)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            if bytes.get(i + 1) == Some(&b':') {
                i += 2;
                continue;
            }
            let ty = text[i + 1..].trim();
            if ty.is_empty() {
                return None;
            }
            return Some((text[..i].trim(), ty.to_string()));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_annotation() {
        assert_eq!(
            parse_annotation("# @type var x: Integer?"),
            Ok(AnnotationKind::VarType {
                name: "x".into(),
                ty: "Integer?".into()
            })
        );
    }

    #[test]
    fn namespaced_type_keeps_double_colon() {
        assert_eq!(
            parse_annotation("@type self: ::Foo::Bar"),
            Ok(AnnotationKind::SelfType("::Foo::Bar".into()))
        );
    }

    #[test]
    fn ivar_and_dynamic() {
        assert_eq!(
            parse_annotation("@type ivar @name: String"),
            Ok(AnnotationKind::IvarType {
                name: "@name".into(),
                ty: "String".into()
            })
        );
        assert_eq!(
            parse_annotation("@dynamic foo, bar"),
            Ok(AnnotationKind::Dynamic(vec!["foo".into(), "bar".into()]))
        );
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_annotation("@type var x").is_err());
        assert!(parse_annotation("@type weird x: T").is_err());
        assert!(parse_annotation("plain comment").is_err());
    }
}

//! SQL identifier escaping.
//!
//! Every identifier the crate infers (tables, columns, notification channels,
//! the column part of `ORDER BY`) is rendered quoted, so reserved words and
//! mixed-case names survive. Raw join/table text supplied by the caller is
//! never passed through here.
//!
//! # Example
//! ```ignore
//! use pgfluent::Ident;
//!
//! let t = Ident::parse("public.users")?;
//! assert_eq!(t.to_sql(), r#""public"."users""#);
//! # Ok::<(), pgfluent::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Bare identifier as written: must match `[A-Za-z_][A-Za-z0-9_$]*`.
    Bare(String),
    /// Identifier that was already quoted in the input.
    Quoted(String),
}

impl IdentPart {
    fn name(&self) -> &str {
        match self {
            IdentPart::Bare(s) | IdentPart::Quoted(s) => s,
        }
    }
}

/// A SQL identifier (column, table, or schema name).
///
/// Supports dotted notation (e.g., `schema.table.column`) and quoted identifiers
/// (e.g., `"CamelCase"."User"`). Rendering always quotes every part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Create a single-part identifier from an arbitrary name.
    pub fn quoted(name: &str) -> OrmResult<Self> {
        if name.is_empty() {
            return Err(OrmError::usage("Empty quoted identifier"));
        }
        if name.contains('\0') {
            return Err(OrmError::usage("Identifier cannot contain NUL character"));
        }
        Ok(Self {
            parts: vec![IdentPart::Quoted(name.to_string())],
        })
    }

    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table.column`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable".id`
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::usage("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::usage("Identifier cannot contain NUL character"));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            // Consume '.' between parts (but require there is a next part).
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::usage("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::usage(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            // Escaped quote: ""
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(OrmError::usage("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::usage("Empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return Err(OrmError::usage(format!(
                        "Invalid character in identifier '{s}': '{c}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::usage("Empty identifier segment"));
            }
            parts.push(IdentPart::Bare(name));
        }

        if parts.is_empty() {
            return Err(OrmError::usage("Empty identifier"));
        }

        Ok(Self { parts })
    }

    /// Render the identifier as SQL, quoting every part.
    pub fn to_sql(&self) -> String {
        let cap = self
            .parts
            .iter()
            .map(|p| p.name().len() + 3)
            .sum::<usize>();
        let mut out = String::with_capacity(cap);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            push_quoted(out, part.name());
        }
    }
}

fn push_quoted(out: &mut String, name: &str) {
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

/// Quote an identifier inferred from a model or supplied as a channel name.
///
/// Dotted names are quoted part by part. Anything that does not parse as an
/// identifier is quoted as a single opaque name.
pub fn escape_ident(name: &str) -> String {
    match Ident::parse(name) {
        Ok(ident) => ident.to_sql(),
        Err(_) => {
            let mut out = String::with_capacity(name.len() + 2);
            push_quoted(&mut out, name);
            out
        }
    }
}

/// Escape the identifier portion of every `ORDER BY` item.
///
/// `"counter desc, name"` becomes `"counter" desc, "name"`. Items whose
/// leading token is not a plain identifier (function calls, positional
/// numbers, expressions) are kept verbatim.
pub fn escape_order(expr: &str) -> String {
    expr.split(',')
        .map(|item| {
            let item = item.trim();
            let (head, tail) = match item.find(char::is_whitespace) {
                Some(pos) => (&item[..pos], &item[pos..]),
                None => (item, ""),
            };
            match Ident::parse(head) {
                Ok(ident) => format!("{}{}", ident.to_sql(), tail),
                Err(_) => item.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

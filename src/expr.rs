//! Expression objects and the parser interface used to inspect them.
//!
//! Expressions are opaque to the builders: criteria strings are shipped as
//! text and only document literals handed to `add` are parsed, to find out
//! whether they already carry an `_id`.

use std::any::Any;
use std::fmt;

use crate::error::{Error, Result};
use crate::value::{ObjectBridge, Value};

/// Expression object, tagged `"Expression"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
  text: String,
}

impl Expression {
  pub fn new(text: impl Into<String>) -> Self {
    Self { text: text.into() }
  }

  pub fn text(&self) -> &str {
    &self.text
  }
}

impl ObjectBridge for Expression {
  fn class_name(&self) -> &str {
    "Expression"
  }

  fn describe(&self) -> String {
    format!("<Expression:{}>", self.text)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Wraps `text` as an expression value.
pub fn expr(text: impl Into<String>) -> Value {
  Value::object(Expression::new(text))
}

/// Parsed expression, as far as the builders need to see into it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprAst {
  /// Object literal: top-level keys paired with their unparsed values.
  Object(Vec<(String, String)>),
  /// Anything else, kept verbatim.
  Opaque(String),
}

impl ExprAst {
  /// Top-level keys when the expression is an object literal.
  pub fn object_fields(&self) -> Option<Vec<&str>> {
    match self {
      ExprAst::Object(fields) => Some(fields.iter().map(|(k, _)| k.as_str()).collect()),
      ExprAst::Opaque(_) => None,
    }
  }

  pub fn has_field(&self, name: &str) -> bool {
    self.field(name).is_some()
  }

  /// Unparsed value of a top-level object field.
  pub fn field(&self, name: &str) -> Option<&str> {
    match self {
      ExprAst::Object(fields) => fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str()),
      ExprAst::Opaque(_) => None,
    }
  }

  pub fn unparse(&self) -> String {
    match self {
      ExprAst::Object(fields) => {
        let parts: Vec<String> = fields.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        format!("{{{}}}", parts.join(", "))
      }
      ExprAst::Opaque(text) => text.clone(),
    }
  }
}

impl fmt::Display for ExprAst {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.unparse())
  }
}

/// Parses expression text. Implementations must be shareable across builders.
pub trait ExpressionParser: fmt::Debug + Send + Sync {
  fn parse(&self, text: &str) -> Result<ExprAst>;
}

/// Minimal parser: understands object literals, treats everything else as
/// opaque.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralParser;

impl ExpressionParser for LiteralParser {
  fn parse(&self, text: &str) -> Result<ExprAst> {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix('{').and_then(|t| t.strip_suffix('}')) else {
      return Ok(ExprAst::Opaque(trimmed.to_string()));
    };

    let mut fields = Vec::new();
    for entry in split_top_level(body, ',')? {
      let entry = entry.trim();
      if entry.is_empty() {
        continue;
      }
      let mut parts = split_top_level(entry, ':')?.into_iter();
      let key = parts.next().unwrap_or_default();
      let rest: Vec<&str> = parts.collect();
      if rest.is_empty() {
        return Err(Error::Argument(format!(
          "Expression error: missing ':' after key in \"{}\"",
          entry
        )));
      }
      let key = unquote(key.trim());
      if key.is_empty() {
        return Err(Error::Argument("Expression error: empty object key".to_string()));
      }
      fields.push((key, rest.join(":").trim().to_string()));
    }
    Ok(ExprAst::Object(fields))
  }
}

/// Strips one level of matching quotes.
pub(crate) fn unquote(key: &str) -> String {
  for quote in ['"', '\'', '`'] {
    if key.len() >= 2 && key.starts_with(quote) && key.ends_with(quote) {
      return key[1..key.len() - 1].to_string();
    }
  }
  key.to_string()
}

/// Splits `text` on `sep` where it is not nested in brackets or quotes.
fn split_top_level(text: &str, sep: char) -> Result<Vec<&str>> {
  let mut parts = Vec::new();
  let mut depth = 0i32;
  let mut quote: Option<char> = None;
  let mut escaped = false;
  let mut start = 0;

  for (i, c) in text.char_indices() {
    if let Some(q) = quote {
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == q {
        quote = None;
      }
      continue;
    }
    match c {
      '"' | '\'' | '`' => quote = Some(c),
      '{' | '[' | '(' => depth += 1,
      '}' | ']' | ')' => {
        depth -= 1;
        if depth < 0 {
          return Err(Error::Argument(format!("Expression error: unbalanced '{}'", c)));
        }
      }
      c if c == sep && depth == 0 => {
        parts.push(&text[start..i]);
        start = i + c.len_utf8();
      }
      _ => {}
    }
  }
  if depth != 0 || quote.is_some() {
    return Err(Error::Argument("Expression error: unterminated expression".to_string()));
  }
  parts.push(&text[start..]);
  Ok(parts)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_object_literal_fields() {
    let ast = LiteralParser
      .parse(r#"{"_id": "abc", name: concat('a', 'b'), 'tags': [1, 2]}"#)
      .unwrap();
    assert_eq!(ast.object_fields(), Some(vec!["_id", "name", "tags"]));
    assert!(ast.has_field("_id"));
    assert_eq!(ast.field("_id"), Some(r#""abc""#));
    assert_eq!(ast.field("missing"), None);
  }

  #[test]
  fn test_nested_colons_stay_in_value() {
    let ast = LiteralParser.parse(r#"{"at": "12:30", sub: {a: 1}}"#).unwrap();
    assert_eq!(
      ast,
      ExprAst::Object(vec![
        ("at".into(), r#""12:30""#.into()),
        ("sub".into(), "{a: 1}".into()),
      ])
    );
    assert!(!ast.has_field("_id"));
  }

  #[test]
  fn test_non_object_is_opaque() {
    let ast = LiteralParser.parse(" age > 21 ").unwrap();
    assert_eq!(ast, ExprAst::Opaque("age > 21".into()));
    assert_eq!(ast.object_fields(), None);
  }

  #[test]
  fn test_malformed_literals() {
    assert!(LiteralParser.parse("{name 'x'}").is_err());
    assert!(LiteralParser.parse("{name: [1, 2}").is_err());
    assert!(LiteralParser.parse("{name: 'x}").is_err());
  }

  #[test]
  fn test_expression_object() {
    let value = expr("age + 1");
    assert_eq!(value.class_name(), Some("Expression"));
    assert_eq!(value.downcast::<Expression>().unwrap().text(), "age + 1");
  }
}

//! Typed search conditions.
//!
//! Criteria travel as expression strings. Callers can write them by hand or
//! build them with [`field`] and the combinators below:
//!
//! ```
//! use xdoc::criteria::{and, field, param};
//!
//! let cond = and(vec![field("age").gte(param("min")), field("name").starts_with("J")]);
//! assert_eq!(cond.compile(), "(age >= :min AND name LIKE 'J%')");
//! ```

use std::fmt;

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(serde_json::Value),
    /// Named placeholder, filled in through `bind`.
    Placeholder(String),
}

impl Operand {
    fn compile(&self) -> String {
        match self {
            Operand::Placeholder(name) => format!(":{}", name),
            Operand::Literal(serde_json::Value::String(s)) => quote(s),
            Operand::Literal(value) => value.to_string(),
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

macro_rules! literal_operand {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Literal(value.into())
                }
            }
        )+
    };
}

literal_operand!(bool, i32, i64, u64, f64, &str, String, serde_json::Value);

/// A named placeholder operand.
pub fn param(name: impl Into<String>) -> Placeholder {
    Placeholder(name.into())
}

/// Marker type so placeholders don't collide with string literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder(String);

impl From<Placeholder> for Operand {
    fn from(p: Placeholder) -> Self {
        Operand::Placeholder(p.0)
    }
}

/// Filter condition for queries
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Operand),
    Ne(String, Operand),
    Gt(String, Operand),
    Gte(String, Operand),
    Lt(String, Operand),
    Lte(String, Operand),
    In(String, Vec<Operand>),
    NotIn(String, Vec<Operand>),
    Like(String, String),
    IsNull(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Renders the condition as expression text.
    pub fn compile(&self) -> String {
        match self {
            Filter::Eq(field, value) => format!("{} == {}", field, value.compile()),
            Filter::Ne(field, value) => format!("{} != {}", field, value.compile()),
            Filter::Gt(field, value) => format!("{} > {}", field, value.compile()),
            Filter::Gte(field, value) => format!("{} >= {}", field, value.compile()),
            Filter::Lt(field, value) => format!("{} < {}", field, value.compile()),
            Filter::Lte(field, value) => format!("{} <= {}", field, value.compile()),
            Filter::In(field, values) => format!("{} IN ({})", field, list(values)),
            Filter::NotIn(field, values) => format!("{} NOT IN ({})", field, list(values)),
            Filter::Like(field, pattern) => format!("{} LIKE {}", field, quote(pattern)),
            Filter::IsNull(field, true) => format!("{} IS NULL", field),
            Filter::IsNull(field, false) => format!("{} IS NOT NULL", field),
            Filter::And(conditions) => join(conditions, " AND "),
            Filter::Or(conditions) => join(conditions, " OR "),
            Filter::Not(condition) => format!("NOT ({})", condition.compile()),
        }
    }
}

fn list(values: &[Operand]) -> String {
    values.iter().map(Operand::compile).collect::<Vec<_>>().join(", ")
}

fn join(conditions: &[Filter], sep: &str) -> String {
    let parts: Vec<String> = conditions.iter().map(|c| c.compile()).collect();
    format!("({})", parts.join(sep))
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compile())
    }
}

/// Field expression builder for fluent filter construction
pub struct Field {
    name: String,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn eq(self, value: impl Into<Operand>) -> Filter {
        Filter::Eq(self.name, value.into())
    }

    pub fn ne(self, value: impl Into<Operand>) -> Filter {
        Filter::Ne(self.name, value.into())
    }

    pub fn gt(self, value: impl Into<Operand>) -> Filter {
        Filter::Gt(self.name, value.into())
    }

    pub fn gte(self, value: impl Into<Operand>) -> Filter {
        Filter::Gte(self.name, value.into())
    }

    pub fn lt(self, value: impl Into<Operand>) -> Filter {
        Filter::Lt(self.name, value.into())
    }

    pub fn lte(self, value: impl Into<Operand>) -> Filter {
        Filter::Lte(self.name, value.into())
    }

    pub fn is_in(self, values: Vec<Operand>) -> Filter {
        Filter::In(self.name, values)
    }

    pub fn not_in(self, values: Vec<Operand>) -> Filter {
        Filter::NotIn(self.name, values)
    }

    pub fn contains(self, value: impl AsRef<str>) -> Filter {
        Filter::Like(self.name, format!("%{}%", value.as_ref()))
    }

    pub fn starts_with(self, value: impl AsRef<str>) -> Filter {
        Filter::Like(self.name, format!("{}%", value.as_ref()))
    }

    pub fn ends_with(self, value: impl AsRef<str>) -> Filter {
        Filter::Like(self.name, format!("%{}", value.as_ref()))
    }

    pub fn is_null(self) -> Filter {
        Filter::IsNull(self.name, true)
    }

    pub fn is_not_null(self) -> Filter {
        Filter::IsNull(self.name, false)
    }
}

/// Create a field expression
pub fn field(name: impl Into<String>) -> Field {
    Field::new(name)
}

/// Combine filters with AND
pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

/// Combine filters with OR
pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::Or(filters)
}

/// Negate a filter
pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}

/// Optional search condition handed to a statement factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCondition(Option<String>);

impl SearchCondition {
    /// Matches everything.
    pub fn all() -> Self {
        Self(None)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

impl From<&str> for SearchCondition {
    fn from(s: &str) -> Self {
        Self(Some(s.to_string()))
    }
}

impl From<String> for SearchCondition {
    fn from(s: String) -> Self {
        Self(Some(s))
    }
}

impl From<Option<&str>> for SearchCondition {
    fn from(s: Option<&str>) -> Self {
        Self(s.map(str::to_string))
    }
}

impl From<Filter> for SearchCondition {
    fn from(filter: Filter) -> Self {
        Self(Some(filter.compile()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_comparisons() {
        assert_eq!(field("age").gt(21).compile(), "age > 21");
        assert_eq!(field("name").eq("jack").compile(), "name == 'jack'");
        assert_eq!(field("score").lte(2.5).compile(), "score <= 2.5");
        assert_eq!(field("active").ne(true).compile(), "active != true");
    }

    #[test]
    fn test_string_literals_are_escaped() {
        assert_eq!(field("name").eq("O'Hara").compile(), r"name == 'O\'Hara'");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(field("age").gte(param("min")).compile(), "age >= :min");
        assert_eq!(field("name").eq(":min").compile(), "name == ':min'");
    }

    #[test]
    fn test_combinators() {
        let cond = or(vec![
            field("role").is_in(vec!["admin".into(), "mod".into()]),
            not(field("deleted_at").is_null()),
        ]);
        assert_eq!(
            cond.compile(),
            "(role IN ('admin', 'mod') OR NOT (deleted_at IS NULL))"
        );
    }

    #[test]
    fn test_like_helpers() {
        assert_eq!(field("email").ends_with(".com").compile(), "email LIKE '%.com'");
        assert_eq!(field("name").contains("ac").compile(), "name LIKE '%ac%'");
    }

    #[test]
    fn test_search_condition_sources() {
        assert_eq!(SearchCondition::from(None).as_deref(), None);
        assert_eq!(SearchCondition::from("a > 1").as_deref(), Some("a > 1"));
        assert_eq!(
            SearchCondition::from(field("a").lt(1)).into_inner(),
            Some("a < 1".to_string())
        );
    }
}

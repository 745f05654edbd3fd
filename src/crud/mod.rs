//! CRUD statement builders.
//!
//! Every builder holds a weak reference to the collection or table that
//! created it, a [`MethodChain`](crate::chain::MethodChain) deciding which
//! calls are legal next, and the clauses accumulated so far. `execute()`
//! compiles the clauses into a protocol message and sends it through the
//! owner's connection.
//!
//! When the owner is gone the builder gives up quietly: mutators still
//! advance the chain but leave the clauses alone, and `execute()` returns
//! `None`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use regex::Regex;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::protocol::{Args, Direction, Order, Target, WireValue};
use crate::session::Session;
use crate::value::Value;

pub mod add;
pub mod delete;
pub mod find;
pub mod index;
pub mod insert;
pub mod modify;
pub mod remove;
pub mod select;
pub mod update;

/// Collection or table a builder works on.
pub trait Owner: fmt::Debug + Send + Sync + 'static {
    fn name(&self) -> &str;
    fn schema_name(&self) -> &str;
    fn connection(&self) -> Arc<dyn Connection>;
    fn session(&self) -> Weak<Session>;

    fn target(&self) -> Target {
        Target {
            schema: self.schema_name().to_string(),
            name: self.name().to_string(),
        }
    }
}

/// State shared by all builders: the owner and the bound parameters.
#[derive(Debug)]
pub(crate) struct Statement<T: Owner> {
    owner: Weak<T>,
    args: Args,
}

impl<T: Owner> Statement<T> {
    pub(crate) fn new(owner: Weak<T>) -> Self {
        Self {
            owner,
            args: Args::new(),
        }
    }

    /// Resolves the owner, or `None` when it has been dropped.
    pub(crate) fn owner(&self) -> Option<Arc<T>> {
        let owner = self.owner.upgrade();
        if owner.is_none() {
            debug!("statement owner is gone, nothing to do");
        }
        owner
    }

    pub(crate) fn is_orphaned(&self) -> bool {
        self.owner.strong_count() == 0
    }

    /// Maps `value` and stores it under `name`. Re-binding overwrites.
    pub(crate) fn bind(
        &mut self,
        op: &str,
        name: &str,
        value: &Value,
        map: fn(&Value) -> Result<WireValue>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(Error::argument(op, "Placeholder name can not be empty"));
        }
        let wire = map(value).map_err(|e| e.in_operation(op))?;
        self.args.insert(name.to_string(), wire);
        Ok(())
    }

    pub(crate) fn args(&self) -> &Args {
        &self.args
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|`[^`]*`|:([A-Za-z_][A-Za-z0-9_]*)"#)
            .expect("placeholder pattern is valid")
    })
}

/// Named placeholders referenced by `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    placeholder_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Checks bound parameters against the placeholders of `criteria`.
pub(crate) fn check_bindings(op: &str, criteria: &[Option<&str>], args: &Args) -> Result<()> {
    let mut referenced = Vec::new();
    for text in criteria.iter().flatten() {
        for name in placeholders(text) {
            if !referenced.contains(&name) {
                referenced.push(name);
            }
        }
    }
    if let Some(unused) = args.keys().find(|name| !referenced.contains(*name)) {
        return Err(Error::argument(
            op,
            format!("Unable to bind value for unexisting placeholder: {}", unused),
        ));
    }
    let missing: Vec<&str> = referenced
        .iter()
        .filter(|name| !args.contains_key(*name))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(Error::argument(
            op,
            format!(
                "Missing value bindings for the next placeholders: {}",
                missing.join(", ")
            ),
        ));
    }
    Ok(())
}

/// Collects a string list, rejecting an empty one with `msg`.
pub(crate) fn non_empty<I, S>(op: &str, msg: &str, items: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: Vec<String> = items.into_iter().map(Into::into).collect();
    if items.is_empty() {
        return Err(Error::argument(op, msg));
    }
    Ok(items)
}

/// Parses sort criteria of the form `expr [ASC|DESC]`.
pub(crate) fn parse_orders(op: &str, items: &[String]) -> Result<Vec<Order>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item = item.trim();
            if item.is_empty() {
                return Err(Error::argument(
                    op,
                    format!("Element #{} is expected to be a non-empty sort criterion", i + 1),
                ));
            }
            let (expr, direction) = match item.rsplit_once(char::is_whitespace) {
                Some((expr, dir)) if dir.eq_ignore_ascii_case("desc") => (expr, Direction::Desc),
                Some((expr, dir)) if dir.eq_ignore_ascii_case("asc") => (expr, Direction::Asc),
                _ => (item, Direction::Asc),
            };
            Ok(Order {
                expr: expr.trim().to_string(),
                direction,
            })
        })
        .collect()
}

/// Helpers validating front-end arguments.
pub(crate) mod args {
    use super::*;

    pub(crate) fn check_count(op: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
        let n = args.len();
        if (min..=max).contains(&n) {
            return Ok(());
        }
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        Err(Error::argument(
            op,
            format!("Invalid number of arguments, expected {} but got {}", expected, n),
        ))
    }

    pub(crate) fn string(op: &str, args: &[Value], i: usize) -> Result<String> {
        match args.get(i) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(Error::argument(
                op,
                format!("Argument #{} is expected to be a string", i + 1),
            )),
        }
    }

    pub(crate) fn boolean(op: &str, args: &[Value], i: usize) -> Result<bool> {
        match args.get(i) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Int(v)) => Ok(*v != 0),
            Some(Value::UInt(v)) => Ok(*v != 0),
            _ => Err(Error::argument(
                op,
                format!("Argument #{} is expected to be a bool", i + 1),
            )),
        }
    }

    /// Non-negative integer, as taken by `limit`, `skip` and `offset`.
    pub(crate) fn count(op: &str, args: &[Value], i: usize) -> Result<u64> {
        match args.get(i) {
            Some(Value::UInt(v)) => Ok(*v),
            Some(Value::Int(v)) if *v >= 0 => Ok(*v as u64),
            _ => Err(Error::argument(
                op,
                format!("Argument #{} is expected to be an unsigned int", i + 1),
            )),
        }
    }

    /// Optional criteria: nothing, a string, or an expression object.
    pub(crate) fn criteria(op: &str, args: &[Value]) -> Result<Option<String>> {
        check_count(op, args, 0, 1)?;
        match args.first() {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(value) => match value.downcast::<crate::expr::Expression>() {
                Some(expr) => Ok(Some(expr.text().to_string())),
                None => Err(Error::argument(op, "Argument #1 is expected to be a string")),
            },
        }
    }

    /// Either a single array of strings or one or more string arguments.
    pub(crate) fn string_list(op: &str, args: &[Value]) -> Result<Vec<String>> {
        check_count(op, args, 1, usize::MAX)?;
        if let [Value::Array(items)] = args {
            return items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(Error::argument(
                        op,
                        format!("Element #{} is expected to be a string", i + 1),
                    )),
                })
                .collect();
        }
        args.iter()
            .enumerate()
            .map(|(i, arg)| match arg {
                Value::String(s) => Ok(s.clone()),
                _ => Err(Error::argument(
                    op,
                    format!(
                        "Argument #{} is expected to be a string or an array of strings",
                        i + 1
                    ),
                )),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(names: &[&str]) -> Args {
        names
            .iter()
            .map(|n| (n.to_string(), WireValue::Int(1)))
            .collect()
    }

    #[test]
    fn test_placeholders_skip_string_literals() {
        assert_eq!(
            placeholders("name = :name and at > '12:30' and x = \":fake\" and y < :max or z = :name"),
            vec!["name".to_string(), "max".to_string()]
        );
        assert!(placeholders("age > 21").is_empty());
    }

    #[test]
    fn test_bindings_must_match_placeholders() {
        let op = "CollectionFind.execute";
        assert!(check_bindings(op, &[Some("a = :x"), None], &bound(&["x"])).is_ok());
        assert!(check_bindings(op, &[None], &bound(&[])).is_ok());

        let err = check_bindings(op, &[Some("a = 1")], &bound(&["x"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CollectionFind.execute: Unable to bind value for unexisting placeholder: x"
        );

        let err = check_bindings(op, &[Some("a = :x"), Some("b > :y")], &bound(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CollectionFind.execute: Missing value bindings for the next placeholders: x, y"
        );
    }

    #[test]
    fn test_sort_directions() {
        let orders = parse_orders(
            "op",
            &["name".into(), "age DESC".into(), "  last asc ".into()],
        )
        .unwrap();
        assert_eq!(
            orders,
            vec![
                Order { expr: "name".into(), direction: Direction::Asc },
                Order { expr: "age".into(), direction: Direction::Desc },
                Order { expr: "last".into(), direction: Direction::Asc },
            ]
        );
        assert!(parse_orders("op", &["".into()]).unwrap_err().is_argument());
    }

    #[test]
    fn test_string_list_forms() {
        let op = "CollectionFind.fields";
        assert_eq!(
            args::string_list(op, &["a".into(), "b".into()]).unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            args::string_list(op, &[Value::Array(vec!["a".into()])]).unwrap(),
            vec!["a"]
        );
        assert!(args::string_list(op, &[Value::Array(vec![])]).unwrap().is_empty());

        let err = args::string_list(op, &[Value::Array(vec!["a".into(), Value::Int(5)])]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CollectionFind.fields: Element #2 is expected to be a string"
        );
        let err = args::string_list(op, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CollectionFind.fields: Invalid number of arguments, expected at least 1 but got 0"
        );
    }

    #[test]
    fn test_count_argument() {
        assert_eq!(args::count("op", &[Value::Int(4)], 0).unwrap(), 4);
        assert_eq!(args::count("op", &[Value::UInt(4)], 0).unwrap(), 4);
        assert!(args::count("op", &[Value::Int(-1)], 0).is_err());
        assert!(args::count("op", &[Value::Float(1.0)], 0).is_err());
    }
}

//! Dynamic values exchanged with the scripting front end.
//!
//! Every argument a builder receives and every value it hands back is a
//! [`Value`]. Objects that live on the Rust side (expressions, dates,
//! constants, builders, results) travel as [`Value::Object`] and are
//! dispatched on their class tag.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// Ordered map used by [`Value::Map`].
pub type Map = BTreeMap<String, Value>;

/// Handle to a Rust-side object exposed to the front end.
pub type ObjectRef = Arc<dyn ObjectBridge>;

/// A dynamically-typed value.
#[derive(Clone, Debug, Default)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Int(i64),
  UInt(u64),
  Float(f64),
  String(String),
  Array(Vec<Value>),
  Map(Map),
  /// Map shared by reference with the front end.
  MapRef(Arc<Map>),
  Object(ObjectRef),
  Function(FunctionRef),
}

/// Capability surface of an object living behind [`Value::Object`].
pub trait ObjectBridge: fmt::Debug + Send + Sync {
  /// Run-time class tag, e.g. `"Expression"` or `"Date"`.
  fn class_name(&self) -> &str;

  /// Canonical textual description.
  fn describe(&self) -> String {
    format!("<{}>", self.class_name())
  }

  /// Names currently callable through [`ObjectBridge::call`].
  fn members(&self) -> Vec<String> {
    Vec::new()
  }

  fn call(&self, name: &str, _args: &[Value]) -> Result<Value> {
    Err(Error::UnknownMember(name.to_string()))
  }

  /// JSON form used when the object is nested inside a document.
  fn to_json(&self) -> Option<serde_json::Value> {
    None
  }

  fn as_any(&self) -> &dyn Any;
}

/// Callable passed in from the front end.
#[derive(Clone)]
pub struct FunctionRef {
  pub name: String,
  func: Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>,
}

impl FunctionRef {
  pub fn new<F>(name: impl Into<String>, func: F) -> Self
  where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      func: Arc::new(func),
    }
  }

  pub fn invoke(&self, args: &[Value]) -> Result<Value> {
    (self.func)(args)
  }
}

impl fmt::Debug for FunctionRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<Function:{}>", self.name)
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::UInt(a), Value::UInt(b)) => a == b,
      (Value::Float(a), Value::Float(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Array(a), Value::Array(b)) => a == b,
      (Value::Map(a), Value::Map(b)) => a == b,
      (Value::MapRef(a), Value::MapRef(b)) => Arc::ptr_eq(a, b) || a == b,
      (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
      (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(&a.func, &b.func),
      _ => false,
    }
  }
}

impl Value {
  /// Kind name used in error messages.
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Null => "Null",
      Value::Bool(_) => "Bool",
      Value::Int(_) => "Integer",
      Value::UInt(_) => "UInteger",
      Value::Float(_) => "Float",
      Value::String(_) => "String",
      Value::Array(_) => "Array",
      Value::Map(_) => "Map",
      Value::MapRef(_) => "MapRef",
      Value::Object(_) => "Object",
      Value::Function(_) => "Function",
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&ObjectRef> {
    match self {
      Value::Object(obj) => Some(obj),
      _ => None,
    }
  }

  /// Returns the object's class tag when this is an object.
  pub fn class_name(&self) -> Option<&str> {
    self.as_object().map(|obj| obj.class_name())
  }

  /// Downcasts an object value to its concrete Rust type.
  pub fn downcast<T: 'static>(&self) -> Option<&T> {
    self.as_object().and_then(|obj| obj.as_any().downcast_ref::<T>())
  }

  /// Wraps a Rust-side object.
  pub fn object<T: ObjectBridge + 'static>(obj: T) -> Self {
    Value::Object(Arc::new(obj))
  }

  /// Human-readable description, as used in "Unsupported value" messages.
  pub fn describe(&self) -> String {
    match self {
      Value::Null => "null".to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Int(i) => i.to_string(),
      Value::UInt(u) => u.to_string(),
      Value::Float(f) => f.to_string(),
      Value::String(s) => format!("{:?}", s),
      Value::Object(obj) => obj.describe(),
      Value::Function(func) => format!("{:?}", func),
      Value::Array(_) | Value::Map(_) | Value::MapRef(_) => match self.to_json() {
        Ok(json) => json.to_string(),
        Err(_) => format!("<{}>", self.type_name()),
      },
    }
  }

  /// Serializes the value as JSON.
  ///
  /// Objects are only representable when they provide a JSON form (dates
  /// do, expressions and builders don't); functions never are.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    Ok(match self {
      Value::Null => Json::Null,
      Value::Bool(b) => Json::Bool(*b),
      Value::Int(i) => Json::from(*i),
      Value::UInt(u) => Json::from(*u),
      Value::Float(f) => serde_json::Number::from_f64(*f)
        .map(Json::Number)
        .ok_or_else(|| Error::Argument(format!("Unsupported value received: {}", f)))?,
      Value::String(s) => Json::String(s.clone()),
      Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect::<Result<_>>()?),
      Value::Map(map) => map_to_json(map)?,
      Value::MapRef(map) => map_to_json(map)?,
      Value::Object(obj) => obj
        .to_json()
        .ok_or_else(|| Error::Argument(format!("Unsupported value received: {}", obj.describe())))?,
      Value::Function(func) => {
        return Err(Error::Argument(format!("Unsupported value received: {:?}", func)))
      }
    })
  }

  /// Builds a value from JSON. Integers that fit `i64` become `Int`.
  pub fn from_json(json: serde_json::Value) -> Self {
    use serde_json::Value as Json;

    match json {
      Json::Null => Value::Null,
      Json::Bool(b) => Value::Bool(b),
      Json::Number(n) => {
        if let Some(i) = n.as_i64() {
          Value::Int(i)
        } else if let Some(u) = n.as_u64() {
          Value::UInt(u)
        } else {
          Value::Float(n.as_f64().unwrap_or(f64::NAN))
        }
      }
      Json::String(s) => Value::String(s),
      Json::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
      Json::Object(map) => Value::Map(map.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect()),
    }
  }
}

fn map_to_json(map: &Map) -> Result<serde_json::Value> {
  let mut out = serde_json::Map::new();
  for (key, value) in map {
    out.insert(key.clone(), value.to_json()?);
  }
  Ok(serde_json::Value::Object(out))
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(s) => write!(f, "{}", s),
      other => write!(f, "{}", other.describe()),
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self {
    Value::Int(i64::from(i))
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self {
    Value::Int(i)
  }
}

impl From<u64> for Value {
  fn from(u: u64) -> Self {
    Value::UInt(u)
  }
}

impl From<f64> for Value {
  fn from(f: f64) -> Self {
    Value::Float(f)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl From<Vec<Value>> for Value {
  fn from(items: Vec<Value>) -> Self {
    Value::Array(items)
  }
}

impl From<Map> for Value {
  fn from(map: Map) -> Self {
    Value::Map(map)
  }
}

impl From<serde_json::Value> for Value {
  fn from(json: serde_json::Value) -> Self {
    Value::from_json(json)
  }
}

/// Date object, tagged `"Date"`.
#[derive(Debug, Clone, PartialEq)]
pub struct DateValue(pub NaiveDateTime);

impl DateValue {
  pub fn new(at: NaiveDateTime) -> Self {
    Self(at)
  }
}

impl ObjectBridge for DateValue {
  fn class_name(&self) -> &str {
    "Date"
  }

  fn describe(&self) -> String {
    if self.0.and_utc().timestamp_subsec_micros() == 0 {
      self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
      self.0.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
  }

  fn to_json(&self) -> Option<serde_json::Value> {
    Some(serde_json::Value::String(self.describe()))
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use serde_json::json;

  fn date(h: u32, micros: u32) -> DateValue {
    let at = NaiveDate::from_ymd_opt(2024, 3, 9)
      .unwrap()
      .and_hms_micro_opt(h, 5, 7, micros)
      .unwrap();
    DateValue::new(at)
  }

  #[test]
  fn test_date_description() {
    assert_eq!(date(14, 0).describe(), "2024-03-09 14:05:07");
    assert_eq!(date(1, 250).describe(), "2024-03-09 01:05:07.000250");
  }

  #[test]
  fn test_json_round_trip_of_nested_map() {
    let source = json!({"name": "jack", "age": 17, "tags": ["a", null], "pos": {"x": 1.5}});
    let value = Value::from_json(source.clone());
    assert!(matches!(value, Value::Map(_)));
    assert_eq!(value.to_json().unwrap(), source);
  }

  #[test]
  fn test_dates_serialize_inside_documents() {
    let mut map = Map::new();
    map.insert("at".into(), Value::object(date(14, 0)));
    assert_eq!(Value::Map(map).to_json().unwrap(), json!({"at": "2024-03-09 14:05:07"}));
  }

  #[test]
  fn test_functions_do_not_serialize() {
    let func = Value::Function(FunctionRef::new("noop", |_| Ok(Value::Null)));
    let err = Value::Array(vec![func]).to_json().unwrap_err();
    assert!(err.to_string().starts_with("Unsupported value received"));
  }

  #[test]
  fn test_object_equality_is_identity() {
    let a = Value::object(date(1, 0));
    let b = Value::object(date(1, 0));
    assert_eq!(a, a.clone());
    assert_ne!(a, b);
  }
}

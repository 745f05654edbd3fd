//! Translation of dynamic values into wire values.
//!
//! Documents are schemaless JSON, so arrays and maps are accepted and
//! shipped as their JSON text. Table columns hold scalars only; containers
//! have nowhere to go and are rejected instead of being stringified.

use crate::error::{Error, Result};
use crate::expr::Expression;
use crate::protocol::WireValue;
use crate::value::Value;

/// Maps a value bound for a collection statement.
pub fn map_document_value(value: &Value) -> Result<WireValue> {
  match value {
    Value::Null => Err(Error::Argument("Invalid value".to_string())),
    Value::Array(_) => Ok(WireValue::Array(value.to_json()?.to_string())),
    Value::Map(_) => Ok(WireValue::Document(value.to_json()?.to_string())),
    Value::MapRef(_) | Value::Function(_) => Err(unsupported(value)),
    scalar => map_scalar(scalar),
  }
}

/// Maps a value bound for a table statement.
pub fn map_table_value(value: &Value) -> Result<WireValue> {
  match value {
    Value::Null => Ok(WireValue::Null),
    Value::Array(_) | Value::Map(_) | Value::MapRef(_) | Value::Function(_) => {
      Err(unsupported(value))
    }
    scalar => map_scalar(scalar),
  }
}

fn map_scalar(value: &Value) -> Result<WireValue> {
  Ok(match value {
    Value::Bool(b) => WireValue::Int(i64::from(*b)),
    Value::Int(i) => WireValue::Int(*i),
    Value::UInt(u) => match i64::try_from(*u) {
      Ok(i) => WireValue::Int(i),
      Err(_) => WireValue::UInt(*u),
    },
    Value::Float(f) => WireValue::Float(*f),
    Value::String(s) => WireValue::String(s.clone()),
    Value::Object(obj) => match obj.class_name() {
      "Expression" => {
        let text = obj
          .as_any()
          .downcast_ref::<Expression>()
          .map(Expression::text)
          .unwrap_or_default();
        if text.is_empty() {
          return Err(Error::Argument("Expressions can not be empty.".to_string()));
        }
        WireValue::Expression(text.to_string())
      }
      "Date" => WireValue::String(obj.describe()),
      _ => {
        return Err(Error::Argument(format!(
          "Unsupported value received: {}.",
          obj.describe()
        )))
      }
    },
    other => return Err(unsupported(other)),
  })
}

fn unsupported(value: &Value) -> Error {
  Error::Argument(format!("Unsupported value received: {}", value.describe()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::Constant;
  use crate::expr::expr;
  use crate::value::{DateValue, FunctionRef, Map};
  use chrono::NaiveDate;
  use serde_json::json;
  use std::sync::Arc;

  fn date() -> Value {
    let at = NaiveDate::from_ymd_opt(2020, 1, 2)
      .unwrap()
      .and_hms_opt(3, 4, 5)
      .unwrap();
    Value::object(DateValue::new(at))
  }

  fn sample_map() -> Map {
    let mut map = Map::new();
    map.insert("name".into(), Value::from("jack"));
    map.insert("age".into(), Value::Int(17));
    map
  }

  #[test]
  fn test_scalars_in_both_contexts() {
    for map in [map_document_value, map_table_value] {
      assert_eq!(map(&Value::Bool(true)).unwrap(), WireValue::Int(1));
      assert_eq!(map(&Value::Bool(false)).unwrap(), WireValue::Int(0));
      assert_eq!(map(&Value::Int(-4)).unwrap(), WireValue::Int(-4));
      assert_eq!(map(&Value::UInt(4)).unwrap(), WireValue::Int(4));
      assert_eq!(map(&Value::UInt(u64::MAX)).unwrap(), WireValue::UInt(u64::MAX));
      assert_eq!(map(&Value::Float(0.1)).unwrap(), WireValue::Float(0.1));
      assert_eq!(map(&Value::from("x")).unwrap(), WireValue::String("x".into()));
      assert_eq!(map(&expr("a + 1")).unwrap(), WireValue::Expression("a + 1".into()));
      assert_eq!(
        map(&date()).unwrap(),
        WireValue::String("2020-01-02 03:04:05".into())
      );
    }
  }

  #[test]
  fn test_null_handling_differs() {
    assert_eq!(
      map_document_value(&Value::Null).unwrap_err(),
      Error::Argument("Invalid value".into())
    );
    assert_eq!(map_table_value(&Value::Null).unwrap(), WireValue::Null);
  }

  #[test]
  fn test_containers_only_in_documents() {
    let doc = Value::Map(sample_map());
    let WireValue::Document(text) = map_document_value(&doc).unwrap() else {
      panic!("expected a document");
    };
    assert_eq!(
      serde_json::from_str::<serde_json::Value>(&text).unwrap(),
      json!({"name": "jack", "age": 17})
    );
    assert_eq!(
      map_document_value(&Value::Array(vec![Value::Int(1), Value::Null])).unwrap(),
      WireValue::Array("[1,null]".into())
    );

    for value in [doc, Value::Array(vec![]), Value::MapRef(Arc::new(sample_map()))] {
      assert!(map_table_value(&value).unwrap_err().is_argument());
    }
  }

  #[test]
  fn test_rejected_values() {
    let empty = map_document_value(&expr("")).unwrap_err();
    assert_eq!(empty, Error::Argument("Expressions can not be empty.".into()));

    let constant = Value::object(Constant::unique());
    assert_eq!(
      map_document_value(&constant).unwrap_err().to_string(),
      "Unsupported value received: <IndexType.Unique>."
    );

    let func = Value::Function(FunctionRef::new("cb", |_| Ok(Value::Null)));
    assert_eq!(
      map_document_value(&func).unwrap_err().to_string(),
      "Unsupported value received: <Function:cb>"
    );
    assert!(map_document_value(&Value::MapRef(Arc::new(Map::new()))).is_err());
  }

  #[test]
  fn test_nested_unsupported_values_fail_whole_document() {
    let mut map = sample_map();
    map.insert("cb".into(), Value::Function(FunctionRef::new("cb", |_| Ok(Value::Null))));
    assert!(map_document_value(&Value::Map(map)).unwrap_err().is_argument());
  }
}

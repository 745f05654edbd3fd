//! Data-Type and IndexType tags.
//!
//! The set of tags is closed, so it lives in static tables keyed by
//! `(group, id)`; nothing is cached or created lazily.

use std::any::Any;
use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::value::{ObjectBridge, Value};

pub const DATA_TYPE: &str = "DataType";
pub const INDEX_TYPE: &str = "IndexType";

static DATA_TYPES: &[(&str, &str)] = &[
  ("Bit", "BIT"),
  ("TinyInt", "TINYINT"),
  ("SmallInt", "SMALLINT"),
  ("MediumInt", "MEDIUMINT"),
  ("Int", "INT"),
  ("BigInt", "BIGINT"),
  ("Float", "FLOAT"),
  ("Decimal", "DECIMAL"),
  ("Double", "DOUBLE"),
  ("Json", "JSON"),
  ("String", "TEXT"),
  ("Bytes", "BLOB"),
  ("Time", "TIME"),
  ("Date", "DATE"),
  ("DateTime", "DATETIME"),
  ("Set", "SET"),
  ("Enum", "ENUM"),
  ("Geometry", "GEOMETRY"),
];

static INDEX_TYPES: &[(&str, &str)] = &[("Unique", "UNIQUE")];

type Entries = &'static [(&'static str, &'static str)];

fn lookup_group(group: &str) -> Option<(&'static str, Entries)> {
  match group {
    DATA_TYPE => Some((DATA_TYPE, DATA_TYPES)),
    INDEX_TYPE => Some((INDEX_TYPE, INDEX_TYPES)),
    _ => None,
  }
}

fn table(group: &str) -> Entries {
  lookup_group(group).map(|(_, entries)| entries).unwrap_or_default()
}

/// A tag object, tagged `"Constant"` on the dynamic side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
  group: &'static str,
  id: &'static str,
  data: Cow<'static, str>,
}

impl Constant {
  /// Looks up a tag by group and id.
  pub fn get(group: &str, id: &str) -> Result<Self> {
    let (group, entries) = lookup_group(group)
      .ok_or_else(|| Error::Logic(format!("Invalid constant group: {}", group)))?;
    entries
      .iter()
      .find(|(name, _)| *name == id)
      .map(|&(name, data)| Self {
        group,
        id: name,
        data: Cow::Borrowed(data),
      })
      .ok_or_else(|| Error::Logic(format!("Invalid constant {}.{}", group, id)))
  }

  pub fn data_type(id: &str) -> Result<Self> {
    Self::get(DATA_TYPE, id)
  }

  pub fn unique() -> Self {
    Self {
      group: INDEX_TYPE,
      id: "Unique",
      data: Cow::Borrowed("UNIQUE"),
    }
  }

  /// `DataType.Decimal` with explicit precision and optional scale.
  pub fn decimal(precision: i64, scale: Option<i64>) -> Result<Self> {
    const OP: &str = "DataType.Decimal";
    if !(1..=65).contains(&precision) {
      return Err(Error::argument(OP, "Precision must be between 1 and 65"));
    }
    let data = match scale {
      Some(scale) => {
        if !(0..=30).contains(&scale) {
          return Err(Error::argument(OP, "Scale must be between 0 and 30"));
        }
        if scale > precision {
          return Err(Error::argument(OP, "Scale can not be greater than precision"));
        }
        format!("DECIMAL({},{})", precision, scale)
      }
      None => format!("DECIMAL({})", precision),
    };
    Ok(Self {
      group: DATA_TYPE,
      id: "Decimal",
      data: Cow::Owned(data),
    })
  }

  pub fn group(&self) -> &str {
    self.group
  }

  pub fn id(&self) -> &str {
    self.id
  }

  /// Text sent over the wire for this tag.
  pub fn data(&self) -> &str {
    &self.data
  }
}

impl ObjectBridge for Constant {
  fn class_name(&self) -> &str {
    "Constant"
  }

  fn describe(&self) -> String {
    format!("<{}.{}>", self.group, self.id)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Exposes one constant group (e.g. `DataType`) to the front end.
#[derive(Debug, Clone)]
pub struct ConstantGroup {
  group: &'static str,
}

impl ConstantGroup {
  pub fn data_types() -> Self {
    Self { group: DATA_TYPE }
  }

  pub fn index_types() -> Self {
    Self { group: INDEX_TYPE }
  }
}

impl ObjectBridge for ConstantGroup {
  fn class_name(&self) -> &str {
    self.group
  }

  fn members(&self) -> Vec<String> {
    table(self.group)
      .iter()
      .map(|(id, _)| id.to_string())
      .collect()
  }

  fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
    if self.group == DATA_TYPE && name == "Decimal" && !args.is_empty() {
      let op = "DataType.Decimal";
      if args.len() > 2 {
        return Err(Error::argument(op, "Invalid number of arguments, expected 1 to 2"));
      }
      let int_at = |i: usize| match &args[i] {
        Value::Int(v) => Ok(*v),
        Value::UInt(v) => i64::try_from(*v).map_err(|_| Error::argument(op, "Value out of range")),
        other => Err(Error::argument(
          op,
          format!("Argument #{} is expected to be an integer, got {}", i + 1, other.type_name()),
        )),
      };
      let precision = int_at(0)?;
      let scale = if args.len() == 2 { Some(int_at(1)?) } else { None };
      return Ok(Value::object(Constant::decimal(precision, scale)?));
    }
    if table(self.group).iter().all(|(id, _)| *id != name) {
      return Err(Error::UnknownMember(name.to_string()));
    }
    Ok(Value::object(Constant::get(self.group, name)?))
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lookup() {
    let int = Constant::data_type("Int").unwrap();
    assert_eq!(int.group(), DATA_TYPE);
    assert_eq!(int.data(), "INT");
    assert_eq!(Constant::get(INDEX_TYPE, "Unique").unwrap(), Constant::unique());
  }

  #[test]
  fn test_unknown_constants_are_logic_errors() {
    assert!(matches!(Constant::data_type("Varchar"), Err(Error::Logic(_))));
    assert!(matches!(Constant::get("Color", "Red"), Err(Error::Logic(_))));
  }

  #[test]
  fn test_decimal_parameters() {
    assert_eq!(Constant::decimal(10, Some(2)).unwrap().data(), "DECIMAL(10,2)");
    assert_eq!(Constant::decimal(5, None).unwrap().data(), "DECIMAL(5)");
    assert!(Constant::decimal(0, None).unwrap_err().is_argument());
    assert!(Constant::decimal(66, None).unwrap_err().is_argument());
    assert!(Constant::decimal(10, Some(31)).unwrap_err().is_argument());
    assert!(Constant::decimal(4, Some(5)).unwrap_err().is_argument());
  }

  #[test]
  fn test_group_object() {
    let group = ConstantGroup::data_types();
    assert!(group.members().contains(&"Json".to_string()));
    let json = group.call("Json", &[]).unwrap();
    assert_eq!(json.downcast::<Constant>().unwrap().data(), "JSON");
    let dec = group.call("Decimal", &[Value::Int(8), Value::Int(3)]).unwrap();
    assert_eq!(dec.downcast::<Constant>().unwrap().data(), "DECIMAL(8,3)");
    assert!(matches!(group.call("Blob", &[]), Err(Error::UnknownMember(_))));
  }
}

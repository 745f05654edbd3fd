//! Results handed back by `execute()`.

use std::any::Any;
use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::connection::{Column, ResultData};
use crate::error::{Error, Result};
use crate::value::{ObjectBridge, Value};

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResult {
  data: ResultData,
  last_document_id: Option<String>,
}

impl StatementResult {
  pub fn new(data: ResultData) -> Self {
    Self {
      data,
      last_document_id: None,
    }
  }

  pub(crate) fn with_last_document_id(mut self, id: Option<String>) -> Self {
    self.last_document_id = id;
    self
  }

  pub fn affected_item_count(&self) -> u64 {
    self.data.affected_items
  }

  pub fn auto_increment_value(&self) -> Option<u64> {
    self.data.auto_increment
  }

  /// Id of the last document added by a collection `add`.
  pub fn last_document_id(&self) -> Option<&str> {
    self.last_document_id.as_deref()
  }

  pub fn generated_ids(&self) -> &[String] {
    &self.data.generated_ids
  }

  pub fn warnings(&self) -> &[String] {
    &self.data.warnings
  }
}

fn warnings_value(warnings: &[String]) -> Value {
  Value::Array(warnings.iter().map(|w| Value::from(w.as_str())).collect())
}

fn no_args(name: &str, args: &[Value]) -> Result<()> {
  if args.is_empty() {
    Ok(())
  } else {
    Err(Error::Argument(format!(
      "{}: Invalid number of arguments, expected 0 but got {}",
      name,
      args.len()
    )))
  }
}

impl ObjectBridge for StatementResult {
  fn class_name(&self) -> &str {
    "Result"
  }

  fn members(&self) -> Vec<String> {
    [
      "getAffectedItemCount",
      "getAutoIncrementValue",
      "getLastDocumentId",
      "getWarnings",
    ]
    .into_iter()
    .map(String::from)
    .collect()
  }

  fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
    let value = match name {
      "getAffectedItemCount" => Value::UInt(self.affected_item_count()),
      "getAutoIncrementValue" => self.auto_increment_value().map(Value::UInt).unwrap_or_default(),
      "getLastDocumentId" => self.last_document_id().map(Value::from).unwrap_or_default(),
      "getWarnings" => warnings_value(self.warnings()),
      _ => return Err(Error::UnknownMember(name.to_string())),
    };
    no_args(name, args)?;
    Ok(value)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Documents returned by a collection `find`.
#[derive(Debug)]
pub struct DocResult {
  documents: Mutex<VecDeque<serde_json::Value>>,
  warnings: Vec<String>,
}

impl DocResult {
  /// Takes the first column of every row as a JSON document.
  pub fn new(data: ResultData) -> Self {
    let documents = data
      .rows
      .into_iter()
      .filter_map(|row| row.into_iter().next())
      .collect();
    Self {
      documents: Mutex::new(documents),
      warnings: data.warnings,
    }
  }

  pub fn fetch_one(&self) -> Option<serde_json::Value> {
    self.documents.lock().pop_front()
  }

  pub fn fetch_all(&self) -> Vec<serde_json::Value> {
    self.documents.lock().drain(..).collect()
  }

  /// Documents not fetched yet.
  pub fn remaining(&self) -> usize {
    self.documents.lock().len()
  }

  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }
}

impl ObjectBridge for DocResult {
  fn class_name(&self) -> &str {
    "DocResult"
  }

  fn members(&self) -> Vec<String> {
    ["fetchOne", "fetchAll", "getWarnings"]
      .into_iter()
      .map(String::from)
      .collect()
  }

  fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
    no_args(name, args)?;
    Ok(match name {
      "fetchOne" => self.fetch_one().map(Value::from_json).unwrap_or_default(),
      "fetchAll" => Value::Array(self.fetch_all().into_iter().map(Value::from_json).collect()),
      "getWarnings" => warnings_value(self.warnings()),
      _ => return Err(Error::UnknownMember(name.to_string())),
    })
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Rows returned by a table `select`.
#[derive(Debug)]
pub struct RowResult {
  columns: Vec<Column>,
  rows: Mutex<VecDeque<Vec<serde_json::Value>>>,
  warnings: Vec<String>,
}

impl RowResult {
  pub fn new(data: ResultData) -> Self {
    Self {
      columns: data.columns,
      rows: Mutex::new(data.rows.into()),
      warnings: data.warnings,
    }
  }

  pub fn columns(&self) -> &[Column] {
    &self.columns
  }

  pub fn column_names(&self) -> Vec<&str> {
    self.columns.iter().map(|c| c.name.as_str()).collect()
  }

  pub fn fetch_one(&self) -> Option<Vec<serde_json::Value>> {
    self.rows.lock().pop_front()
  }

  pub fn fetch_all(&self) -> Vec<Vec<serde_json::Value>> {
    self.rows.lock().drain(..).collect()
  }

  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }
}

fn row_value(row: Vec<serde_json::Value>) -> Value {
  Value::Array(row.into_iter().map(Value::from_json).collect())
}

impl ObjectBridge for RowResult {
  fn class_name(&self) -> &str {
    "RowResult"
  }

  fn members(&self) -> Vec<String> {
    ["fetchOne", "fetchAll", "getColumnNames", "getWarnings"]
      .into_iter()
      .map(String::from)
      .collect()
  }

  fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
    no_args(name, args)?;
    Ok(match name {
      "fetchOne" => self.fetch_one().map(row_value).unwrap_or_default(),
      "fetchAll" => Value::Array(self.fetch_all().into_iter().map(row_value).collect()),
      "getColumnNames" => Value::Array(self.column_names().into_iter().map(Value::from).collect()),
      "getWarnings" => warnings_value(self.warnings()),
      _ => return Err(Error::UnknownMember(name.to_string())),
    })
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_doc_result_fetching() {
    let data = ResultData {
      rows: vec![vec![json!({"_id": "1"})], vec![json!({"_id": "2"})], vec![]],
      ..Default::default()
    };
    let docs = DocResult::new(data);
    assert_eq!(docs.remaining(), 2);
    assert_eq!(docs.fetch_one(), Some(json!({"_id": "1"})));
    assert_eq!(docs.fetch_all(), vec![json!({"_id": "2"})]);
    assert_eq!(docs.fetch_one(), None);
  }

  #[test]
  fn test_row_result_through_bridge() {
    let data = ResultData {
      columns: vec![Column {
        name: "age".into(),
        type_name: "INT".into(),
      }],
      rows: vec![vec![json!(17)]],
      ..Default::default()
    };
    let rows = RowResult::new(data);
    assert_eq!(
      rows.call("getColumnNames", &[]).unwrap(),
      Value::Array(vec!["age".into()])
    );
    assert_eq!(
      rows.call("fetchOne", &[]).unwrap(),
      Value::Array(vec![Value::Int(17)])
    );
    assert_eq!(rows.call("fetchOne", &[]).unwrap(), Value::Null);
    assert!(rows.call("fetchOne", &[Value::Int(1)]).is_err());
  }

  #[test]
  fn test_statement_result_members() {
    let result = StatementResult::new(ResultData {
      affected_items: 2,
      ..Default::default()
    })
    .with_last_document_id(Some("abc".into()));
    assert_eq!(result.call("getAffectedItemCount", &[]).unwrap(), Value::UInt(2));
    assert_eq!(result.call("getLastDocumentId", &[]).unwrap(), Value::from("abc"));
    assert_eq!(result.call("getAutoIncrementValue", &[]).unwrap(), Value::Null);
    assert!(matches!(result.call("next", &[]), Err(Error::UnknownMember(_))));
  }
}

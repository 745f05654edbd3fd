//! Wire message types for compiled CRUD statements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum encoded message size (16MB)
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Encoding formats
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Encoding {
  #[default]
  MessagePack = 0x01,
  Json = 0x02,
}

impl TryFrom<u8> for Encoding {
  type Error = ();
  fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
    match v {
      0x01 => Ok(Self::MessagePack),
      0x02 => Ok(Self::Json),
      _ => Err(()),
    }
  }
}

/// Value as transmitted to the data store.
///
/// `Array` and `Document` carry their JSON serialization verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum WireValue {
  Null,
  Bool(bool),
  Int(i64),
  UInt(u64),
  Float(f64),
  String(String),
  Expression(String),
  Array(String),
  Document(String),
}

/// Whether a statement targets a collection or a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataModel {
  Document,
  Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
  pub schema: String,
  pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Asc,
  Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub expr: String,
  pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
  pub row_count: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub offset: Option<u64>,
}

/// Named placeholder values.
pub type Args = BTreeMap<String, WireValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindMessage {
  pub target: Target,
  pub data_model: DataModel,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub criteria: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub projection: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub grouping: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub grouping_criteria: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub order: Vec<Order>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<Limit>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub args: Args,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertRow {
  pub fields: Vec<WireValue>,
  /// Id generated client-side for an expression document without `_id`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub generated_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertMessage {
  pub target: Target,
  pub data_model: DataModel,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub projection: Vec<String>,
  pub rows: Vec<InsertRow>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub args: Args,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
  Set,
  ItemSet,
  ItemRemove,
  ItemMerge,
  ArrayInsert,
  ArrayAppend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOperation {
  pub kind: UpdateKind,
  pub source: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<WireValue>,
}

impl UpdateOperation {
  /// Text of an expression value, if the operation carries one.
  pub fn expression(&self) -> Option<&str> {
    match &self.value {
      Some(WireValue::Expression(text)) => Some(text),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
  pub target: Target,
  pub data_model: DataModel,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub criteria: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub order: Vec<Order>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<Limit>,
  pub operations: Vec<UpdateOperation>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub args: Args,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteMessage {
  pub target: Target,
  pub data_model: DataModel,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub criteria: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub order: Vec<Order>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit: Option<Limit>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub args: Args,
}

/// Administrative command, e.g. index management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminMessage {
  pub command: String,
  pub args: Vec<WireValue>,
}

/// Client-to-server message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
  Find(FindMessage),
  Insert(InsertMessage),
  Update(UpdateMessage),
  Delete(DeleteMessage),
  Admin(AdminMessage),
}

impl ClientMessage {
  pub fn kind(&self) -> &'static str {
    match self {
      ClientMessage::Find(_) => "find",
      ClientMessage::Insert(_) => "insert",
      ClientMessage::Update(_) => "update",
      ClientMessage::Delete(_) => "delete",
      ClientMessage::Admin(_) => "admin",
    }
  }
}

/// Encodes a message for transports that carry bytes.
pub fn encode_message(msg: &ClientMessage, encoding: Encoding) -> Result<Vec<u8>> {
  let bytes = match encoding {
    Encoding::MessagePack => rmp_serde::to_vec_named(msg)?,
    Encoding::Json => serde_json::to_vec(msg)?,
  };
  if bytes.len() > MAX_MESSAGE_SIZE as usize {
    return Err(Error::Serialization(format!(
      "message of {} bytes exceeds the {} byte limit",
      bytes.len(),
      MAX_MESSAGE_SIZE
    )));
  }
  Ok(bytes)
}

pub fn decode_message(bytes: &[u8], encoding: Encoding) -> Result<ClientMessage> {
  Ok(match encoding {
    Encoding::MessagePack => rmp_serde::from_slice(bytes)?,
    Encoding::Json => serde_json::from_slice(bytes)?,
  })
}

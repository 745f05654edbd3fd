//! Sessions, schemas and the collections and tables builders work on.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::chain::{Chained, Outcome, Shared};
use crate::connection::Connection;
use crate::criteria::SearchCondition;
use crate::crud::add::CollectionAdd;
use crate::crud::delete::TableDelete;
use crate::crud::find::CollectionFind;
use crate::crud::index::{CollectionCreateIndex, CollectionDropIndex};
use crate::crud::insert::TableInsert;
use crate::crud::modify::CollectionModify;
use crate::crud::remove::CollectionRemove;
use crate::crud::select::TableSelect;
use crate::crud::update::TableUpdate;
use crate::crud::Owner;
use crate::error::{Error, Result};
use crate::expr::{ExpressionParser, LiteralParser};
use crate::protocol::{encode_message, ClientMessage, Encoding};
use crate::value::{ObjectBridge, Value};

/// Session options
#[derive(Clone)]
pub struct SessionOptions {
  pub default_schema: Option<String>,
  pub encoding: Encoding,
  pub parser: Arc<dyn ExpressionParser>,
}

impl SessionOptions {
  pub fn new() -> Self {
    Self {
      default_schema: None,
      encoding: Encoding::default(),
      parser: Arc::new(LiteralParser),
    }
  }

  pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
    self.default_schema = Some(schema.into());
    self
  }

  pub fn with_encoding(mut self, encoding: Encoding) -> Self {
    self.encoding = encoding;
    self
  }

  pub fn with_parser(mut self, parser: Arc<dyn ExpressionParser>) -> Self {
    self.parser = parser;
    self
  }
}

impl Default for SessionOptions {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for SessionOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SessionOptions")
      .field("default_schema", &self.default_schema)
      .field("encoding", &self.encoding)
      .field("parser", &self.parser)
      .finish()
  }
}

/// An open session over a connection.
///
/// The session owns the schemas it hands out, and each schema owns its
/// collections and tables. Builders only hold weak references, so they
/// stay usable for as long as the session is alive.
#[derive(Debug)]
pub struct Session {
  me: Weak<Session>,
  connection: Arc<dyn Connection>,
  options: SessionOptions,
  schemas: Mutex<HashMap<String, Arc<Schema>>>,
}

impl Session {
  pub fn open(connection: Arc<dyn Connection>, options: SessionOptions) -> Arc<Self> {
    connection.set_encoding(options.encoding);
    Arc::new_cyclic(|me| Self {
      me: me.clone(),
      connection,
      options,
      schemas: Mutex::new(HashMap::new()),
    })
  }

  /// Returns the schema called `name`, the same instance on every call.
  pub fn get_schema(&self, name: impl Into<String>) -> Arc<Schema> {
    let name = name.into();
    let mut schemas = self.schemas.lock();
    let schema = schemas.entry(name.clone()).or_insert_with(|| {
      Arc::new(Schema {
        name,
        session: self.me.clone(),
        connection: Arc::clone(&self.connection),
        parser: Arc::clone(&self.options.parser),
        collections: Mutex::new(HashMap::new()),
        tables: Mutex::new(HashMap::new()),
      })
    });
    Arc::clone(schema)
  }

  /// The schema named in [`SessionOptions::default_schema`], if any.
  pub fn default_schema(&self) -> Option<Arc<Schema>> {
    self
      .options
      .default_schema
      .clone()
      .map(|name| self.get_schema(name))
  }

  pub fn connection(&self) -> Arc<dyn Connection> {
    Arc::clone(&self.connection)
  }

  pub fn options(&self) -> &SessionOptions {
    &self.options
  }

  /// Encodes `msg` with the session's [`Encoding`].
  pub fn encode(&self, msg: &ClientMessage) -> Result<Vec<u8>> {
    encode_message(msg, self.options.encoding)
  }
}

#[derive(Debug)]
pub struct Schema {
  name: String,
  session: Weak<Session>,
  connection: Arc<dyn Connection>,
  parser: Arc<dyn ExpressionParser>,
  collections: Mutex<HashMap<String, Arc<Collection>>>,
  tables: Mutex<HashMap<String, Arc<Table>>>,
}

impl Schema {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn session(&self) -> Weak<Session> {
    self.session.clone()
  }

  pub fn get_collection(&self, name: impl Into<String>) -> Arc<Collection> {
    let name = name.into();
    let mut collections = self.collections.lock();
    let collection = collections.entry(name.clone()).or_insert_with(|| {
      Arc::new_cyclic(|me| Collection {
        me: me.clone(),
        name,
        schema: self.name.clone(),
        session: self.session.clone(),
        connection: Arc::clone(&self.connection),
        parser: Arc::clone(&self.parser),
      })
    });
    Arc::clone(collection)
  }

  pub fn get_table(&self, name: impl Into<String>) -> Arc<Table> {
    let name = name.into();
    let mut tables = self.tables.lock();
    let table = tables.entry(name.clone()).or_insert_with(|| {
      Arc::new_cyclic(|me| Table {
        me: me.clone(),
        name,
        schema: self.name.clone(),
        session: self.session.clone(),
        connection: Arc::clone(&self.connection),
      })
    });
    Arc::clone(table)
  }
}

/// A document collection.
#[derive(Debug)]
pub struct Collection {
  me: Weak<Collection>,
  name: String,
  schema: String,
  session: Weak<Session>,
  connection: Arc<dyn Connection>,
  parser: Arc<dyn ExpressionParser>,
}

impl Collection {
  pub fn find(&self, criteria: impl Into<SearchCondition>) -> Result<CollectionFind> {
    let mut find = CollectionFind::new(self.me.clone());
    find.find(criteria)?;
    Ok(find)
  }

  pub fn add(&self, documents: impl Into<Value>) -> Result<CollectionAdd> {
    let mut add = CollectionAdd::new(self.me.clone());
    add.add(documents)?;
    Ok(add)
  }

  pub fn modify(&self, criteria: impl Into<SearchCondition>) -> Result<CollectionModify> {
    let mut modify = CollectionModify::new(self.me.clone());
    modify.modify(criteria)?;
    Ok(modify)
  }

  pub fn remove(&self, criteria: impl Into<SearchCondition>) -> Result<CollectionRemove> {
    let mut remove = CollectionRemove::new(self.me.clone());
    remove.remove(criteria)?;
    Ok(remove)
  }

  pub fn create_index(&self, name: &str, unique: bool) -> Result<CollectionCreateIndex> {
    let mut create = CollectionCreateIndex::new(self.me.clone());
    create.create_index(name, unique)?;
    Ok(create)
  }

  pub fn drop_index(&self, name: &str) -> Result<CollectionDropIndex> {
    let mut drop = CollectionDropIndex::new(self.me.clone());
    drop.drop_index(name)?;
    Ok(drop)
  }

  pub fn parser(&self) -> Arc<dyn ExpressionParser> {
    Arc::clone(&self.parser)
  }
}

impl Owner for Collection {
  fn name(&self) -> &str {
    &self.name
  }

  fn schema_name(&self) -> &str {
    &self.schema
  }

  fn connection(&self) -> Arc<dyn Connection> {
    Arc::clone(&self.connection)
  }

  fn session(&self) -> Weak<Session> {
    self.session.clone()
  }
}

/// Starts a builder from the front end and runs its factory operation.
fn start<B: Chained>(mut builder: B, factory: &str, args: &[Value]) -> Result<Value> {
  match builder.invoke(factory, args)? {
    Outcome::Chain => Ok(Shared::new(builder).into_value()),
    Outcome::Return(value) => Ok(value),
  }
}

impl ObjectBridge for Collection {
  fn class_name(&self) -> &str {
    "Collection"
  }

  fn describe(&self) -> String {
    format!("<Collection:{}>", self.name)
  }

  fn members(&self) -> Vec<String> {
    ["find", "add", "modify", "remove", "createIndex", "dropIndex", "getName"]
      .into_iter()
      .map(String::from)
      .collect()
  }

  fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
    let me = self.me.clone();
    match name {
      "find" => start(CollectionFind::new(me), name, args),
      "add" => start(CollectionAdd::new(me), name, args),
      "modify" => start(CollectionModify::new(me), name, args),
      "remove" => start(CollectionRemove::new(me), name, args),
      "createIndex" => start(CollectionCreateIndex::new(me), name, args),
      "dropIndex" => start(CollectionDropIndex::new(me), name, args),
      "getName" => Ok(Value::from(self.name.as_str())),
      _ => Err(Error::UnknownMember(name.to_string())),
    }
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// A relational table.
#[derive(Debug)]
pub struct Table {
  me: Weak<Table>,
  name: String,
  schema: String,
  session: Weak<Session>,
  connection: Arc<dyn Connection>,
}

impl Table {
  pub fn select<I, S>(&self, columns: I) -> Result<TableSelect>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut select = TableSelect::new(self.me.clone());
    select.select(columns)?;
    Ok(select)
  }

  pub fn insert<I, S>(&self, columns: I) -> Result<TableInsert>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut insert = TableInsert::new(self.me.clone());
    insert.insert(columns)?;
    Ok(insert)
  }

  /// Inserts a single row given as column/value pairs.
  pub fn insert_row(&self, row: crate::value::Map) -> Result<TableInsert> {
    let mut insert = TableInsert::new(self.me.clone());
    insert.insert_row(row)?;
    Ok(insert)
  }

  pub fn update(&self) -> Result<TableUpdate> {
    let mut update = TableUpdate::new(self.me.clone());
    update.update()?;
    Ok(update)
  }

  pub fn delete(&self) -> Result<TableDelete> {
    let mut delete = TableDelete::new(self.me.clone());
    delete.delete()?;
    Ok(delete)
  }
}

impl Owner for Table {
  fn name(&self) -> &str {
    &self.name
  }

  fn schema_name(&self) -> &str {
    &self.schema
  }

  fn connection(&self) -> Arc<dyn Connection> {
    Arc::clone(&self.connection)
  }

  fn session(&self) -> Weak<Session> {
    self.session.clone()
  }
}

impl ObjectBridge for Table {
  fn class_name(&self) -> &str {
    "Table"
  }

  fn describe(&self) -> String {
    format!("<Table:{}>", self.name)
  }

  fn members(&self) -> Vec<String> {
    ["select", "insert", "update", "delete", "getName"]
      .into_iter()
      .map(String::from)
      .collect()
  }

  fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
    let me = self.me.clone();
    match name {
      "select" => start(TableSelect::new(me), name, args),
      "insert" => start(TableInsert::new(me), name, args),
      "update" => start(TableUpdate::new(me), name, args),
      "delete" => start(TableDelete::new(me), name, args),
      "getName" => Ok(Value::from(self.name.as_str())),
      _ => Err(Error::UnknownMember(name.to_string())),
    }
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

//! In-memory connection that records every message it is handed.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use xdoc::protocol::{
  AdminMessage, DeleteMessage, FindMessage, InsertMessage, UpdateMessage,
};
use xdoc::{
  ClientMessage, Collection, Connection, Encoding, Error, PendingResult, ResultData, Result,
  Session, SessionOptions, Table,
};

#[derive(Debug, Default)]
pub struct RecordingConnection {
  sent: Mutex<Vec<ClientMessage>>,
  reply: Mutex<Option<std::result::Result<ResultData, Error>>>,
  refuse: Mutex<Option<Error>>,
  encoding: Mutex<Option<Encoding>>,
}

impl RecordingConnection {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Result metadata delivered for every following message.
  pub fn reply_with(&self, data: ResultData) {
    *self.reply.lock() = Some(Ok(data));
  }

  /// Makes the pending result complete with `err`.
  pub fn fail_with(&self, err: Error) {
    *self.reply.lock() = Some(Err(err));
  }

  /// Makes sending itself fail with `err`.
  pub fn refuse_with(&self, err: Error) {
    *self.refuse.lock() = Some(err);
  }

  pub fn sent(&self) -> Vec<ClientMessage> {
    self.sent.lock().clone()
  }

  pub fn last(&self) -> Option<ClientMessage> {
    self.sent.lock().last().cloned()
  }

  /// Encoding announced by the session, if one was opened.
  pub fn encoding(&self) -> Option<Encoding> {
    *self.encoding.lock()
  }

  fn record(&self, msg: ClientMessage) -> Result<PendingResult> {
    if let Some(err) = self.refuse.lock().clone() {
      return Err(err);
    }
    self.sent.lock().push(msg);
    let reply = self.reply.lock().clone().unwrap_or_else(|| Ok(ResultData::default()));
    let (tx, pending) = PendingResult::channel();
    tx.complete(reply);
    Ok(pending)
  }
}

impl Connection for RecordingConnection {
  fn execute_find(&self, msg: FindMessage) -> Result<PendingResult> {
    self.record(ClientMessage::Find(msg))
  }

  fn execute_insert(&self, msg: InsertMessage) -> Result<PendingResult> {
    self.record(ClientMessage::Insert(msg))
  }

  fn execute_update(&self, msg: UpdateMessage) -> Result<PendingResult> {
    self.record(ClientMessage::Update(msg))
  }

  fn execute_delete(&self, msg: DeleteMessage) -> Result<PendingResult> {
    self.record(ClientMessage::Delete(msg))
  }

  fn execute_admin(&self, msg: AdminMessage) -> Result<PendingResult> {
    self.record(ClientMessage::Admin(msg))
  }

  fn set_encoding(&self, encoding: Encoding) {
    *self.encoding.lock() = Some(encoding);
  }
}

pub struct Fixture {
  pub conn: Arc<RecordingConnection>,
  pub session: Arc<Session>,
}

impl Fixture {
  pub fn new() -> Self {
    let conn = RecordingConnection::new();
    let session = Session::open(conn.clone(), SessionOptions::new().with_default_schema("test"));
    Self { conn, session }
  }

  pub fn collection(&self, name: &str) -> Arc<Collection> {
    self.session.get_schema("test").get_collection(name)
  }

  pub fn table(&self, name: &str) -> Arc<Table> {
    self.session.get_schema("test").get_table(name)
  }
}

pub fn map(entries: Vec<(&str, xdoc::Value)>) -> xdoc::Map {
  entries
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

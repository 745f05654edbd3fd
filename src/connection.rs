//! The connection interface builders send compiled statements through.
//!
//! Framing and transport live behind [`Connection`]; builders only need a
//! way to hand over a message and block until result metadata arrives.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::protocol::{
  AdminMessage, ClientMessage, DeleteMessage, Encoding, FindMessage, InsertMessage, UpdateMessage,
};

/// Column metadata of a row result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
  pub name: String,
  #[serde(rename = "type")]
  pub type_name: String,
}

/// Raw result as reported by the data store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
  #[serde(default)]
  pub affected_items: u64,
  #[serde(default)]
  pub auto_increment: Option<u64>,
  #[serde(default)]
  pub generated_ids: Vec<String>,
  #[serde(default)]
  pub warnings: Vec<String>,
  #[serde(default)]
  pub columns: Vec<Column>,
  #[serde(default)]
  pub rows: Vec<Vec<serde_json::Value>>,
}

/// Result handle returned by a [`Connection`] once a message was sent.
pub struct PendingResult {
  rx: oneshot::Receiver<Result<ResultData>>,
}

/// Completion side of a [`PendingResult`].
pub struct ResultSender {
  tx: oneshot::Sender<Result<ResultData>>,
}

impl PendingResult {
  /// Creates a result handle and the sender that completes it.
  pub fn channel() -> (ResultSender, PendingResult) {
    let (tx, rx) = oneshot::channel();
    (ResultSender { tx }, PendingResult { rx })
  }

  /// A result whose metadata is already available.
  pub fn ready(data: ResultData) -> Self {
    let (tx, rx) = Self::channel();
    tx.complete(Ok(data));
    rx
  }

  /// Blocks until the connection reports result metadata.
  ///
  /// Must not be called from within an async runtime.
  pub fn wait(self) -> Result<ResultData> {
    self.rx.blocking_recv().map_err(|_| Error::ChannelClosed)?
  }
}

impl ResultSender {
  pub fn complete(self, result: Result<ResultData>) {
    // The receiver may already be gone; nobody is waiting then.
    let _ = self.tx.send(result);
  }
}

impl fmt::Debug for PendingResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("PendingResult")
  }
}

/// Sends compiled statements. Implementations serialize concurrent sends.
pub trait Connection: fmt::Debug + Send + Sync {
  fn execute_find(&self, msg: FindMessage) -> Result<PendingResult>;
  fn execute_insert(&self, msg: InsertMessage) -> Result<PendingResult>;
  fn execute_update(&self, msg: UpdateMessage) -> Result<PendingResult>;
  fn execute_delete(&self, msg: DeleteMessage) -> Result<PendingResult>;
  fn execute_admin(&self, msg: AdminMessage) -> Result<PendingResult>;

  /// Called once by [`Session::open`](crate::Session::open) with the
  /// encoding byte-oriented transports should frame messages in.
  fn set_encoding(&self, _encoding: Encoding) {}

  /// Routes any message to its typed entry point.
  fn send(&self, msg: ClientMessage) -> Result<PendingResult> {
    match msg {
      ClientMessage::Find(m) => self.execute_find(m),
      ClientMessage::Insert(m) => self.execute_insert(m),
      ClientMessage::Update(m) => self.execute_update(m),
      ClientMessage::Delete(m) => self.execute_delete(m),
      ClientMessage::Admin(m) => self.execute_admin(m),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;

  #[test]
  fn test_ready_result() {
    let data = ResultData {
      affected_items: 3,
      ..Default::default()
    };
    assert_eq!(PendingResult::ready(data.clone()).wait().unwrap(), data);
  }

  #[test]
  fn test_wait_blocks_until_completed() {
    let (tx, pending) = PendingResult::channel();
    let worker = thread::spawn(move || {
      tx.complete(Ok(ResultData {
        affected_items: 1,
        ..Default::default()
      }))
    });
    assert_eq!(pending.wait().unwrap().affected_items, 1);
    worker.join().unwrap();
  }

  #[test]
  fn test_dropped_sender_closes_channel() {
    let (tx, pending) = PendingResult::channel();
    drop(tx);
    assert_eq!(pending.wait().unwrap_err(), Error::ChannelClosed);
  }

  #[test]
  fn test_server_error_is_delivered() {
    let (tx, pending) = PendingResult::channel();
    tx.complete(Err(Error::Server("Table 'x' doesn't exist".into())));
    assert!(matches!(pending.wait(), Err(Error::Server(_))));
  }
}

//! Basic example demonstrating the xdoc statement builders.
//!
//! The connection here only prints what it is handed; a real one would
//! encode the message and ship it to the store.

use std::sync::Arc;

use parking_lot::Mutex;
use xdoc::protocol::{
  encode_message, AdminMessage, DeleteMessage, FindMessage, InsertMessage, UpdateMessage,
};
use xdoc::{
  expr, ClientMessage, Connection, Encoding, Map, PendingResult, ResultData, Session,
  SessionOptions,
};

#[derive(Debug, Default)]
struct PrintingConnection {
  encoding: Mutex<Encoding>,
}

impl PrintingConnection {
  fn show(&self, msg: ClientMessage) -> xdoc::Result<PendingResult> {
    let encoding = *self.encoding.lock();
    let bytes = encode_message(&msg, encoding)?;
    match encoding {
      Encoding::Json => println!("-> {}", String::from_utf8_lossy(&bytes)),
      Encoding::MessagePack => println!("-> {} ({} bytes)", msg.kind(), bytes.len()),
    }
    Ok(PendingResult::ready(ResultData {
      affected_items: 1,
      ..Default::default()
    }))
  }
}

impl Connection for PrintingConnection {
  fn execute_find(&self, msg: FindMessage) -> xdoc::Result<PendingResult> {
    self.show(ClientMessage::Find(msg))
  }

  fn execute_insert(&self, msg: InsertMessage) -> xdoc::Result<PendingResult> {
    self.show(ClientMessage::Insert(msg))
  }

  fn execute_update(&self, msg: UpdateMessage) -> xdoc::Result<PendingResult> {
    self.show(ClientMessage::Update(msg))
  }

  fn execute_delete(&self, msg: DeleteMessage) -> xdoc::Result<PendingResult> {
    self.show(ClientMessage::Delete(msg))
  }

  fn execute_admin(&self, msg: AdminMessage) -> xdoc::Result<PendingResult> {
    self.show(ClientMessage::Admin(msg))
  }

  fn set_encoding(&self, encoding: Encoding) {
    *self.encoding.lock() = encoding;
  }
}

fn main() -> xdoc::Result<()> {
  let session = Session::open(
    Arc::new(PrintingConnection::default()),
    SessionOptions::new()
      .with_default_schema("app")
      .with_encoding(Encoding::Json),
  );
  let schema = session.get_schema("app");
  let users = schema.get_collection("users");

  // Insert a document
  let mut doc = Map::new();
  doc.insert("name".into(), "Alice".into());
  doc.insert("email".into(), "alice@example.com".into());
  doc.insert("active".into(), true.into());
  if let Some(result) = users.add(doc)?.execute()? {
    println!("Inserted document: {:?}", result.last_document_id());
  }

  // Query documents
  users
    .find("active = :active")?
    .fields(["name", "email"])?
    .sort(["name"])?
    .limit(10)?
    .bind("active", true)?
    .execute()?;

  // Update documents
  users
    .modify("name = 'Alice'")?
    .set("visits", expr("visits + 1"))?
    .unset(["legacy"])?
    .execute()?;

  // Same store, relational side
  let people = schema.get_table("people");
  people
    .insert(["name", "age"])?
    .values(vec!["Bob".into(), 42.into()])?
    .execute()?;
  people
    .select(["name"])?
    .r#where("age > :age")?
    .bind("age", 18)?
    .execute()?;

  // Clean up
  users.remove("active = false")?.execute()?;
  println!("Done!");
  Ok(())
}

//! xdoc: fluent CRUD statement builders for a document/relational store.
//!
//! Builders are created from a [`Collection`] or a [`Table`], accumulate
//! clauses through chained calls and compile them into a protocol message
//! on `execute()`. A method-chain governor decides which calls are legal at
//! every point; out-of-order calls fail with [`Error::ForbiddenOperation`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xdoc::{Connection, Session, SessionOptions};
//!
//! fn run(connection: Arc<dyn Connection>) -> xdoc::Result<()> {
//!   let session = Session::open(connection, SessionOptions::new());
//!   let users = session.get_schema("app").get_collection("users");
//!
//!   // Insert a document; an `_id` is generated for it
//!   let mut doc = xdoc::Map::new();
//!   doc.insert("name".into(), "Alice".into());
//!   let result = users.add(doc)?.execute()?;
//!   if let Some(result) = result {
//!     println!("added {:?}", result.last_document_id());
//!   }
//!
//!   // Query documents
//!   let docs = users
//!     .find("name = :name")?
//!     .fields(["name", "_id"])?
//!     .bind("name", "Alice")?
//!     .execute()?;
//!   if let Some(docs) = docs {
//!     println!("found: {:?}", docs.fetch_all());
//!   }
//!   Ok(())
//! }
//! ```

pub mod chain;
pub mod connection;
pub mod constants;
pub mod criteria;
pub mod crud;
mod error;
pub mod expr;
pub mod mapper;
pub mod protocol;
pub mod result;
pub mod session;
pub mod value;

pub use chain::{Chained, MethodChain, Outcome, Shared};
pub use connection::{Column, Connection, PendingResult, ResultData, ResultSender};
pub use constants::{Constant, ConstantGroup};
pub use crud::add::{new_document_id, CollectionAdd};
pub use crud::delete::TableDelete;
pub use crud::find::CollectionFind;
pub use crud::index::{CollectionCreateIndex, CollectionDropIndex};
pub use crud::insert::TableInsert;
pub use crud::modify::CollectionModify;
pub use crud::remove::CollectionRemove;
pub use crud::select::TableSelect;
pub use crud::update::TableUpdate;
pub use crud::Owner;
pub use error::{Error, Result};
pub use expr::{expr, ExprAst, Expression, ExpressionParser, LiteralParser};
pub use protocol::{ClientMessage, Encoding, WireValue, MAX_MESSAGE_SIZE};
pub use result::{DocResult, RowResult, StatementResult};
pub use session::{Collection, Schema, Session, SessionOptions, Table};
pub use value::{DateValue, FunctionRef, Map, ObjectBridge, Value};

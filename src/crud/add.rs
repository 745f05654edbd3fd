//! Collection `add`.

use std::sync::Weak;

use tracing::debug;
use uuid::Uuid;

use super::{args, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::error::{Error, Result};
use crate::expr::{unquote, Expression};
use crate::mapper::map_document_value;
use crate::protocol::{DataModel, InsertMessage, InsertRow, WireValue};
use crate::result::StatementResult;
use crate::session::Collection;
use crate::value::Value;

operations! {
    pub enum AddOp {
        Add => "add",
        Execute => "execute",
    }
}

static CHAIN: ChainTable<AddOp> = &[
    (AddOp::Add, &[INITIAL, "add"]),
    (AddOp::Execute, &["add"]),
];

/// New document id: a v4 UUID as 32 lowercase hex characters.
pub fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Inserts documents into a collection.
///
/// `add` can be repeated; every call appends to the pending documents.
/// Maps without an `_id` get a generated one.
#[derive(Debug)]
pub struct CollectionAdd {
    chain: MethodChain<AddOp>,
    stmt: Statement<Collection>,
    rows: Vec<InsertRow>,
    last_document_id: Option<String>,
}

impl CollectionAdd {
    pub fn new(owner: Weak<Collection>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            rows: Vec::new(),
            last_document_id: None,
        }
    }

    /// Appends one document, an expression, or an array of them.
    pub fn add(&mut self, documents: impl Into<Value>) -> Result<&mut Self> {
        const OP: &str = "CollectionAdd.add";
        self.chain.ensure(AddOp::Add)?;
        let Some(owner) = self.stmt.owner() else {
            self.chain.transition("add");
            return Ok(self);
        };

        let documents = documents.into();
        let mut rows = Vec::new();
        let mut last_id = None;
        if let Value::Array(items) = &documents {
            for (i, item) in items.iter().enumerate() {
                let (row, id) = prepare(&owner, item)
                    .map_err(|e| e.in_operation(OP))?
                    .ok_or_else(|| {
                        Error::argument(
                            OP,
                            format!(
                                "Element #{} is expected to be a document or a JSON expression",
                                i + 1
                            ),
                        )
                    })?;
                rows.push(row);
                last_id = Some(id);
            }
        } else {
            let (row, id) = prepare(&owner, &documents)
                .map_err(|e| e.in_operation(OP))?
                .ok_or_else(|| {
                    Error::argument(
                        OP,
                        "Argument #1 is expected to be either a document, a JSON expression or a list of documents",
                    )
                })?;
            rows.push(row);
            last_id = Some(id);
        }

        self.rows.extend(rows);
        if last_id.is_some() {
            self.last_document_id = last_id;
        }
        self.chain.transition("add");
        Ok(self)
    }

    /// Id of the last document processed so far.
    pub fn last_document_id(&self) -> Option<&str> {
        self.last_document_id.as_deref()
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        const OP: &str = "CollectionAdd.execute";
        self.chain.ensure(AddOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        if self.rows.is_empty() {
            return Err(Error::logic(OP, "No documents to add"));
        }
        let msg = InsertMessage {
            target: owner.target(),
            data_model: DataModel::Document,
            projection: Vec::new(),
            rows: self.rows.clone(),
            args: self.stmt.args().clone(),
        };
        debug!(collection = owner.name(), documents = msg.rows.len(), "sending add");
        let data = owner
            .connection()
            .execute_insert(msg)
            .and_then(|pending| pending.wait())
            .map_err(|e| e.in_operation(OP))?;
        Ok(Some(
            StatementResult::new(data).with_last_document_id(self.last_document_id.clone()),
        ))
    }
}

/// Turns one document into an insert row plus its id, or `None` when the
/// value is neither a map nor an expression.
fn prepare(owner: &Collection, doc: &Value) -> Result<Option<(InsertRow, String)>> {
    if let Value::Map(map) = doc {
        let mut map = map.clone();
        let id = match map.get("_id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_json()?.to_string(),
            None => {
                let id = new_document_id();
                map.insert("_id".to_string(), Value::String(id.clone()));
                id
            }
        };
        let row = InsertRow {
            fields: vec![map_document_value(&Value::Map(map))?],
            generated_id: None,
        };
        return Ok(Some((row, id)));
    }

    let Some(expression) = doc.downcast::<Expression>() else {
        return Ok(None);
    };
    let ast = owner.parser().parse(expression.text())?;
    let (id, generated_id) = match ast.field("_id") {
        Some(existing) => (unquote(existing), None),
        None => {
            let id = new_document_id();
            (id.clone(), Some(id))
        }
    };
    let row = InsertRow {
        fields: vec![WireValue::Expression(expression.text().to_string())],
        generated_id,
    };
    Ok(Some((row, id)))
}

impl Chained for CollectionAdd {
    type Op = AddOp;
    const CLASS: &'static str = "CollectionAdd";

    fn chain(&self) -> &MethodChain<AddOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: AddOp, args: &[Value]) -> Result<Outcome> {
        match op {
            AddOp::Add => {
                args::check_count("CollectionAdd.add", args, 1, 1)?;
                self.add(args[0].clone())?;
            }
            AddOp::Execute => {
                args::check_count("CollectionAdd.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

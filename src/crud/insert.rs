//! Table `insert`.

use std::sync::Weak;

use tracing::debug;

use super::{args, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::error::{Error, Result};
use crate::mapper::map_table_value;
use crate::protocol::{DataModel, InsertMessage, InsertRow, WireValue};
use crate::result::StatementResult;
use crate::session::Table;
use crate::value::{Map, Value};

operations! {
    pub enum InsertOp {
        Insert => "insert",
        Values => "values",
        Bind => "bind",
        Execute => "execute",
    }
}

static CHAIN: ChainTable<InsertOp> = &[
    (InsertOp::Insert, &[INITIAL]),
    (InsertOp::Values, &["insert", "values"]),
    (InsertOp::Bind, &["insert", "values", "bind"]),
    (InsertOp::Execute, &["insert", "values", "bind"]),
];

/// Inserts rows into a table.
///
/// The number of values per row is not checked against the column list;
/// the server rejects mismatches.
#[derive(Debug)]
pub struct TableInsert {
    chain: MethodChain<InsertOp>,
    stmt: Statement<Table>,
    columns: Vec<String>,
    rows: Vec<Vec<WireValue>>,
}

impl TableInsert {
    pub fn new(owner: Weak<Table>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Column-list form; rows follow through [`TableInsert::values`].
    pub fn insert<I, S>(&mut self, columns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain.ensure(InsertOp::Insert)?;
        if !self.stmt.is_orphaned() {
            self.columns = columns.into_iter().map(Into::into).collect();
        }
        self.chain.transition("insert");
        Ok(self)
    }

    /// Column-to-value form; the map supplies the columns and the first row.
    pub fn insert_row(&mut self, row: Map) -> Result<&mut Self> {
        const OP: &str = "TableInsert.insert";
        self.chain.ensure(InsertOp::Insert)?;
        if !self.stmt.is_orphaned() {
            let mut columns = Vec::with_capacity(row.len());
            let mut values = Vec::with_capacity(row.len());
            for (column, value) in &row {
                let wire = map_table_value(value).map_err(|e| {
                    Error::argument(OP, format!("Value for column '{}': {}", column, e))
                })?;
                columns.push(column.clone());
                values.push(wire);
            }
            self.columns = columns;
            self.rows.push(values);
        }
        self.chain.transition("insert");
        Ok(self)
    }

    /// Appends one row.
    pub fn values(&mut self, values: Vec<Value>) -> Result<&mut Self> {
        const OP: &str = "TableInsert.values";
        self.chain.ensure(InsertOp::Values)?;
        if !self.stmt.is_orphaned() {
            if values.is_empty() {
                return Err(Error::argument(
                    OP,
                    "Invalid number of arguments, expected at least 1 but got 0",
                ));
            }
            let row = values
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    map_table_value(value)
                        .map_err(|e| Error::argument(OP, format!("Argument #{}: {}", i + 1, e)))
                })
                .collect::<Result<Vec<_>>>()?;
            self.rows.push(row);
        }
        self.chain.transition("values");
        Ok(self)
    }

    /// Always fails: binding is not supported on `insert` yet.
    pub fn bind(&mut self, _name: &str, _value: impl Into<Value>) -> Result<&mut Self> {
        self.chain.ensure(InsertOp::Bind)?;
        Err(Error::logic("TableInsert.bind", "not yet implemented"))
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        const OP: &str = "TableInsert.execute";
        self.chain.ensure(InsertOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        if self.rows.is_empty() {
            return Err(Error::logic(OP, "No rows to insert"));
        }
        let msg = InsertMessage {
            target: owner.target(),
            data_model: DataModel::Table,
            projection: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|fields| InsertRow {
                    fields: fields.clone(),
                    generated_id: None,
                })
                .collect(),
            args: self.stmt.args().clone(),
        };
        debug!(table = owner.name(), rows = msg.rows.len(), "sending insert");
        let data = owner
            .connection()
            .execute_insert(msg)
            .and_then(|pending| pending.wait())
            .map_err(|e| e.in_operation(OP))?;
        Ok(Some(StatementResult::new(data)))
    }
}

impl Chained for TableInsert {
    type Op = InsertOp;
    const CLASS: &'static str = "TableInsert";

    fn chain(&self) -> &MethodChain<InsertOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: InsertOp, args: &[Value]) -> Result<Outcome> {
        const INSERT: &str = "TableInsert.insert";
        match op {
            InsertOp::Insert => match args {
                [] => {
                    self.insert(Vec::<String>::new())?;
                }
                [Value::Map(row)] => {
                    self.insert_row(row.clone())?;
                }
                [Value::MapRef(row)] => {
                    self.insert_row(Map::clone(row))?;
                }
                _ => {
                    self.insert(args::string_list(INSERT, args)?)?;
                }
            },
            InsertOp::Values => {
                args::check_count("TableInsert.values", args, 1, usize::MAX)?;
                self.values(args.to_vec())?;
            }
            InsertOp::Bind => {
                self.bind("", Value::Null)?;
            }
            InsertOp::Execute => {
                args::check_count("TableInsert.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

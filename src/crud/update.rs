//! Table `update`.

use std::sync::Weak;

use tracing::debug;

use super::{args, check_bindings, non_empty, parse_orders, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::error::{Error, Result};
use crate::mapper::map_table_value;
use crate::protocol::{DataModel, Limit, Order, UpdateKind, UpdateMessage, UpdateOperation};
use crate::result::StatementResult;
use crate::session::Table;
use crate::value::{Map, Value};

operations! {
    pub enum UpdateOp {
        Update => "update",
        Set => "set",
        Where => "where",
        OrderBy => "orderBy",
        Limit => "limit",
        Bind => "bind",
        Execute => "execute",
    }
}

static CHAIN: ChainTable<UpdateOp> = &[
    (UpdateOp::Update, &[INITIAL]),
    (UpdateOp::Set, &["update"]),
    (UpdateOp::Where, &["set"]),
    (UpdateOp::OrderBy, &["set", "where"]),
    (UpdateOp::Limit, &["set", "where", "orderBy"]),
    (UpdateOp::Bind, &["set", "where", "orderBy", "limit", "bind"]),
    (UpdateOp::Execute, &["set", "where", "orderBy", "limit", "bind"]),
];

/// Updates rows of a table.
#[derive(Debug)]
pub struct TableUpdate {
    chain: MethodChain<UpdateOp>,
    stmt: Statement<Table>,
    operations: Vec<UpdateOperation>,
    criteria: Option<String>,
    order: Vec<Order>,
    limit: Option<u64>,
}

impl TableUpdate {
    pub fn new(owner: Weak<Table>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            operations: Vec::new(),
            criteria: None,
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn update(&mut self) -> Result<&mut Self> {
        self.chain.ensure(UpdateOp::Update)?;
        self.chain.transition("update");
        Ok(self)
    }

    /// Column assignments. Expression values are sent as they are written.
    pub fn set(&mut self, values: Map) -> Result<&mut Self> {
        const OP: &str = "TableUpdate.set";
        self.chain.ensure(UpdateOp::Set)?;
        if !self.stmt.is_orphaned() {
            if values.is_empty() {
                return Err(Error::argument(OP, "Update values can not be empty"));
            }
            self.operations = values
                .iter()
                .map(|(column, value)| {
                    let value = map_table_value(value).map_err(|e| {
                        Error::argument(OP, format!("Value for column '{}': {}", column, e))
                    })?;
                    Ok(UpdateOperation {
                        kind: UpdateKind::Set,
                        source: column.clone(),
                        value: Some(value),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
        }
        self.chain.transition("set");
        Ok(self)
    }

    pub fn r#where(&mut self, condition: &str) -> Result<&mut Self> {
        self.chain.ensure(UpdateOp::Where)?;
        if !self.stmt.is_orphaned() {
            self.criteria = Some(condition.to_string());
        }
        self.chain.transition("where");
        Ok(self)
    }

    pub fn order_by<I, S>(&mut self, criteria: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        const OP: &str = "TableUpdate.orderBy";
        self.chain.ensure(UpdateOp::OrderBy)?;
        if !self.stmt.is_orphaned() {
            let criteria = non_empty(OP, "Order criteria can not be empty", criteria)?;
            self.order = parse_orders(OP, &criteria)?;
        }
        self.chain.transition("orderBy");
        Ok(self)
    }

    pub fn limit(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(UpdateOp::Limit)?;
        if !self.stmt.is_orphaned() {
            self.limit = Some(count);
        }
        self.chain.transition("limit");
        Ok(self)
    }

    /// Always fails: binding is not supported on `update` yet.
    pub fn bind(&mut self, _name: &str, _value: impl Into<Value>) -> Result<&mut Self> {
        self.chain.ensure(UpdateOp::Bind)?;
        Err(Error::logic("TableUpdate.bind", "not yet implemented"))
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        const OP: &str = "TableUpdate.execute";
        self.chain.ensure(UpdateOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        let mut sources = vec![self.criteria.as_deref()];
        sources.extend(self.operations.iter().map(UpdateOperation::expression));
        sources.extend(self.order.iter().map(|o| Some(o.expr.as_str())));
        check_bindings(OP, &sources, self.stmt.args())?;
        let msg = UpdateMessage {
            target: owner.target(),
            data_model: DataModel::Table,
            criteria: self.criteria.clone(),
            order: self.order.clone(),
            limit: self.limit.map(|row_count| Limit {
                row_count,
                offset: None,
            }),
            operations: self.operations.clone(),
            args: self.stmt.args().clone(),
        };
        debug!(table = owner.name(), columns = msg.operations.len(), "sending update");
        let data = owner
            .connection()
            .execute_update(msg)
            .and_then(|pending| pending.wait())
            .map_err(|e| e.in_operation(OP))?;
        Ok(Some(StatementResult::new(data)))
    }
}

impl Chained for TableUpdate {
    type Op = UpdateOp;
    const CLASS: &'static str = "TableUpdate";

    fn chain(&self) -> &MethodChain<UpdateOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: UpdateOp, args: &[Value]) -> Result<Outcome> {
        match op {
            UpdateOp::Update => {
                args::check_count("TableUpdate.update", args, 0, 0)?;
                self.update()?;
            }
            UpdateOp::Set => {
                const OP: &str = "TableUpdate.set";
                args::check_count(OP, args, 1, 1)?;
                match &args[0] {
                    Value::Map(values) => self.set(values.clone())?,
                    Value::MapRef(values) => self.set(Map::clone(values))?,
                    _ => return Err(Error::argument(OP, "Argument #1 is expected to be a map")),
                };
            }
            UpdateOp::Where => {
                args::check_count("TableUpdate.where", args, 1, 1)?;
                self.r#where(&args::string("TableUpdate.where", args, 0)?)?;
            }
            UpdateOp::OrderBy => {
                self.order_by(args::string_list("TableUpdate.orderBy", args)?)?;
            }
            UpdateOp::Limit => {
                args::check_count("TableUpdate.limit", args, 1, 1)?;
                self.limit(args::count("TableUpdate.limit", args, 0)?)?;
            }
            UpdateOp::Bind => {
                self.bind("", Value::Null)?;
            }
            UpdateOp::Execute => {
                args::check_count("TableUpdate.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

//! Table `delete`.

use std::sync::Weak;

use tracing::debug;

use super::{args, check_bindings, non_empty, parse_orders, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::error::Result;
use crate::mapper::map_table_value;
use crate::protocol::{DataModel, DeleteMessage, Limit, Order};
use crate::result::StatementResult;
use crate::session::Table;
use crate::value::Value;

operations! {
    pub enum DeleteOp {
        Delete => "delete",
        Where => "where",
        OrderBy => "orderBy",
        Limit => "limit",
        Bind => "bind",
        Execute => "execute",
    }
}

static CHAIN: ChainTable<DeleteOp> = &[
    (DeleteOp::Delete, &[INITIAL]),
    (DeleteOp::Where, &["delete"]),
    (DeleteOp::OrderBy, &["delete", "where"]),
    (DeleteOp::Limit, &["delete", "where", "orderBy"]),
    (DeleteOp::Bind, &["delete", "where", "orderBy", "limit", "bind"]),
    (DeleteOp::Execute, &["delete", "where", "orderBy", "limit", "bind"]),
];

/// Deletes rows from a table.
#[derive(Debug)]
pub struct TableDelete {
    chain: MethodChain<DeleteOp>,
    stmt: Statement<Table>,
    criteria: Option<String>,
    order: Vec<Order>,
    limit: Option<u64>,
}

impl TableDelete {
    pub fn new(owner: Weak<Table>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            criteria: None,
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn delete(&mut self) -> Result<&mut Self> {
        self.chain.ensure(DeleteOp::Delete)?;
        self.chain.transition("delete");
        Ok(self)
    }

    pub fn r#where(&mut self, condition: &str) -> Result<&mut Self> {
        self.chain.ensure(DeleteOp::Where)?;
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
        const OP: &str = "TableDelete.orderBy";
        self.chain.ensure(DeleteOp::OrderBy)?;
        if !self.stmt.is_orphaned() {
            let criteria = non_empty(OP, "Order criteria can not be empty", criteria)?;
            self.order = parse_orders(OP, &criteria)?;
        }
        self.chain.transition("orderBy");
        Ok(self)
    }

    pub fn limit(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(DeleteOp::Limit)?;
        if !self.stmt.is_orphaned() {
            self.limit = Some(count);
        }
        self.chain.transition("limit");
        Ok(self)
    }

    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.chain.ensure(DeleteOp::Bind)?;
        if !self.stmt.is_orphaned() {
            self.stmt
                .bind("TableDelete.bind", name, &value.into(), map_table_value)?;
        }
        self.chain.transition("bind");
        Ok(self)
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        const OP: &str = "TableDelete.execute";
        self.chain.ensure(DeleteOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        let mut sources = vec![self.criteria.as_deref()];
        sources.extend(self.order.iter().map(|o| Some(o.expr.as_str())));
        check_bindings(OP, &sources, self.stmt.args())?;
        let msg = DeleteMessage {
            target: owner.target(),
            data_model: DataModel::Table,
            criteria: self.criteria.clone(),
            order: self.order.clone(),
            limit: self.limit.map(|row_count| Limit {
                row_count,
                offset: None,
            }),
            args: self.stmt.args().clone(),
        };
        debug!(table = owner.name(), "sending delete");
        let data = owner
            .connection()
            .execute_delete(msg)
            .and_then(|pending| pending.wait())
            .map_err(|e| e.in_operation(OP))?;
        Ok(Some(StatementResult::new(data)))
    }
}

impl Chained for TableDelete {
    type Op = DeleteOp;
    const CLASS: &'static str = "TableDelete";

    fn chain(&self) -> &MethodChain<DeleteOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: DeleteOp, args: &[Value]) -> Result<Outcome> {
        match op {
            DeleteOp::Delete => {
                args::check_count("TableDelete.delete", args, 0, 0)?;
                self.delete()?;
            }
            DeleteOp::Where => {
                args::check_count("TableDelete.where", args, 1, 1)?;
                self.r#where(&args::string("TableDelete.where", args, 0)?)?;
            }
            DeleteOp::OrderBy => {
                self.order_by(args::string_list("TableDelete.orderBy", args)?)?;
            }
            DeleteOp::Limit => {
                args::check_count("TableDelete.limit", args, 1, 1)?;
                self.limit(args::count("TableDelete.limit", args, 0)?)?;
            }
            DeleteOp::Bind => {
                args::check_count("TableDelete.bind", args, 2, 2)?;
                let name = args::string("TableDelete.bind", args, 0)?;
                self.bind(&name, args[1].clone())?;
            }
            DeleteOp::Execute => {
                args::check_count("TableDelete.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

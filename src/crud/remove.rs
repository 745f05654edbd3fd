//! Collection `remove`.

use std::sync::Weak;

use tracing::debug;

use super::{args, check_bindings, non_empty, parse_orders, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::criteria::SearchCondition;
use crate::error::{Error, Result};
use crate::protocol::{DataModel, DeleteMessage, Limit, Order};
use crate::result::StatementResult;
use crate::session::Collection;
use crate::value::Value;

operations! {
    pub enum RemoveOp {
        Remove => "remove",
        OrderBy => "orderBy",
        Limit => "limit",
        Bind => "bind",
        Execute => "execute",
    }
}

static CHAIN: ChainTable<RemoveOp> = &[
    (RemoveOp::Remove, &[INITIAL]),
    (RemoveOp::OrderBy, &["remove"]),
    (RemoveOp::Limit, &["remove", "orderBy"]),
    (RemoveOp::Bind, &["remove", "orderBy", "limit", "bind"]),
    (RemoveOp::Execute, &["remove", "orderBy", "limit", "bind"]),
];

/// Deletes documents from a collection.
#[derive(Debug)]
pub struct CollectionRemove {
    chain: MethodChain<RemoveOp>,
    stmt: Statement<Collection>,
    criteria: Option<String>,
    order: Vec<Order>,
    limit: Option<u64>,
}

impl CollectionRemove {
    pub fn new(owner: Weak<Collection>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            criteria: None,
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn remove(&mut self, criteria: impl Into<SearchCondition>) -> Result<&mut Self> {
        self.chain.ensure(RemoveOp::Remove)?;
        if !self.stmt.is_orphaned() {
            self.criteria = criteria.into().into_inner();
        }
        self.chain.transition("remove");
        Ok(self)
    }

    pub fn order_by<I, S>(&mut self, criteria: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        const OP: &str = "CollectionRemove.orderBy";
        self.chain.ensure(RemoveOp::OrderBy)?;
        if !self.stmt.is_orphaned() {
            let criteria = non_empty(OP, "Order criteria can not be empty", criteria)?;
            self.order = parse_orders(OP, &criteria)?;
        }
        self.chain.transition("orderBy");
        Ok(self)
    }

    pub fn limit(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(RemoveOp::Limit)?;
        if !self.stmt.is_orphaned() {
            self.limit = Some(count);
        }
        self.chain.transition("limit");
        Ok(self)
    }

    /// Always fails: binding is not supported on `remove` yet.
    pub fn bind(&mut self, _name: &str, _value: impl Into<Value>) -> Result<&mut Self> {
        self.chain.ensure(RemoveOp::Bind)?;
        Err(Error::logic("CollectionRemove.bind", "not yet implemented"))
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        const OP: &str = "CollectionRemove.execute";
        self.chain.ensure(RemoveOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        let mut sources = vec![self.criteria.as_deref()];
        sources.extend(self.order.iter().map(|o| Some(o.expr.as_str())));
        check_bindings(OP, &sources, self.stmt.args())?;
        let msg = DeleteMessage {
            target: owner.target(),
            data_model: DataModel::Document,
            criteria: self.criteria.clone(),
            order: self.order.clone(),
            limit: self.limit.map(|row_count| Limit {
                row_count,
                offset: None,
            }),
            args: self.stmt.args().clone(),
        };
        debug!(collection = owner.name(), "sending remove");
        let data = owner
            .connection()
            .execute_delete(msg)
            .and_then(|pending| pending.wait())
            .map_err(|e| e.in_operation(OP))?;
        Ok(Some(StatementResult::new(data)))
    }
}

impl Chained for CollectionRemove {
    type Op = RemoveOp;
    const CLASS: &'static str = "CollectionRemove";

    fn chain(&self) -> &MethodChain<RemoveOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: RemoveOp, args: &[Value]) -> Result<Outcome> {
        match op {
            RemoveOp::Remove => {
                let criteria = args::criteria("CollectionRemove.remove", args)?;
                self.remove(SearchCondition::from(criteria.as_deref()))?;
            }
            RemoveOp::OrderBy => {
                self.order_by(args::string_list("CollectionRemove.orderBy", args)?)?;
            }
            RemoveOp::Limit => {
                args::check_count("CollectionRemove.limit", args, 1, 1)?;
                self.limit(args::count("CollectionRemove.limit", args, 0)?)?;
            }
            RemoveOp::Bind => {
                self.bind("", Value::Null)?;
            }
            RemoveOp::Execute => {
                args::check_count("CollectionRemove.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

//! Table `select`.

use std::sync::Weak;

use tracing::debug;

use super::{args, check_bindings, non_empty, parse_orders, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::error::Result;
use crate::mapper::map_table_value;
use crate::protocol::{DataModel, FindMessage, Limit, Order};
use crate::result::RowResult;
use crate::session::Table;
use crate::value::Value;

operations! {
    pub enum SelectOp {
        Select => "select",
        Where => "where",
        GroupBy => "groupBy",
        Having => "having",
        OrderBy => "orderBy",
        Limit => "limit",
        Offset => "offset",
        Bind => "bind",
        Execute => "execute",
    }
}

static CHAIN: ChainTable<SelectOp> = &[
    (SelectOp::Select, &[INITIAL]),
    (SelectOp::Where, &["select"]),
    (SelectOp::GroupBy, &["select", "where"]),
    (SelectOp::Having, &["groupBy"]),
    (SelectOp::OrderBy, &["select", "where", "groupBy", "having"]),
    (SelectOp::Limit, &["select", "where", "groupBy", "having", "orderBy"]),
    (SelectOp::Offset, &["limit"]),
    (
        SelectOp::Bind,
        &["select", "where", "groupBy", "having", "orderBy", "limit", "offset", "bind"],
    ),
    (
        SelectOp::Execute,
        &["select", "where", "groupBy", "having", "orderBy", "limit", "offset", "bind"],
    ),
];

/// Reads rows from a table. An empty column list selects every column.
#[derive(Debug)]
pub struct TableSelect {
    chain: MethodChain<SelectOp>,
    stmt: Statement<Table>,
    columns: Vec<String>,
    criteria: Option<String>,
    grouping: Vec<String>,
    grouping_criteria: Option<String>,
    order: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl TableSelect {
    pub fn new(owner: Weak<Table>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            columns: Vec::new(),
            criteria: None,
            grouping: Vec::new(),
            grouping_criteria: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select<I, S>(&mut self, columns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain.ensure(SelectOp::Select)?;
        if !self.stmt.is_orphaned() {
            self.columns = columns.into_iter().map(Into::into).collect();
        }
        self.chain.transition("select");
        Ok(self)
    }

    pub fn r#where(&mut self, condition: &str) -> Result<&mut Self> {
        self.chain.ensure(SelectOp::Where)?;
        if !self.stmt.is_orphaned() {
            self.criteria = Some(condition.to_string());
        }
        self.chain.transition("where");
        Ok(self)
    }

    pub fn group_by<I, S>(&mut self, columns: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain.ensure(SelectOp::GroupBy)?;
        if !self.stmt.is_orphaned() {
            self.grouping = non_empty(
                "TableSelect.groupBy",
                "Grouping criteria can not be empty",
                columns,
            )?;
        }
        self.chain.transition("groupBy");
        Ok(self)
    }

    pub fn having(&mut self, condition: &str) -> Result<&mut Self> {
        self.chain.ensure(SelectOp::Having)?;
        if !self.stmt.is_orphaned() {
            self.grouping_criteria = Some(condition.to_string());
        }
        self.chain.transition("having");
        Ok(self)
    }

    pub fn order_by<I, S>(&mut self, criteria: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        const OP: &str = "TableSelect.orderBy";
        self.chain.ensure(SelectOp::OrderBy)?;
        if !self.stmt.is_orphaned() {
            let criteria = non_empty(OP, "Order criteria can not be empty", criteria)?;
            self.order = parse_orders(OP, &criteria)?;
        }
        self.chain.transition("orderBy");
        Ok(self)
    }

    pub fn limit(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(SelectOp::Limit)?;
        if !self.stmt.is_orphaned() {
            self.limit = Some(count);
        }
        self.chain.transition("limit");
        Ok(self)
    }

    pub fn offset(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(SelectOp::Offset)?;
        if !self.stmt.is_orphaned() {
            self.offset = Some(count);
        }
        self.chain.transition("offset");
        Ok(self)
    }

    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.chain.ensure(SelectOp::Bind)?;
        if !self.stmt.is_orphaned() {
            self.stmt
                .bind("TableSelect.bind", name, &value.into(), map_table_value)?;
        }
        self.chain.transition("bind");
        Ok(self)
    }

    pub fn execute(&mut self) -> Result<Option<RowResult>> {
        const OP: &str = "TableSelect.execute";
        self.chain.ensure(SelectOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        let mut sources = vec![self.criteria.as_deref(), self.grouping_criteria.as_deref()];
        sources.extend(self.columns.iter().map(|c| Some(c.as_str())));
        sources.extend(self.order.iter().map(|o| Some(o.expr.as_str())));
        check_bindings(OP, &sources, self.stmt.args())?;
        let msg = FindMessage {
            target: owner.target(),
            data_model: DataModel::Table,
            criteria: self.criteria.clone(),
            projection: self.columns.clone(),
            grouping: self.grouping.clone(),
            grouping_criteria: self.grouping_criteria.clone(),
            order: self.order.clone(),
            limit: self.limit.map(|row_count| Limit {
                row_count,
                offset: self.offset,
            }),
            args: self.stmt.args().clone(),
        };
        debug!(table = owner.name(), columns = msg.projection.len(), "sending select");
        let data = owner
            .connection()
            .execute_find(msg)
            .and_then(|pending| pending.wait())
            .map_err(|e| e.in_operation(OP))?;
        Ok(Some(RowResult::new(data)))
    }
}

impl Chained for TableSelect {
    type Op = SelectOp;
    const CLASS: &'static str = "TableSelect";

    fn chain(&self) -> &MethodChain<SelectOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: SelectOp, args: &[Value]) -> Result<Outcome> {
        match op {
            SelectOp::Select => {
                let columns = if args.is_empty() {
                    Vec::new()
                } else {
                    args::string_list("TableSelect.select", args)?
                };
                self.select(columns)?;
            }
            SelectOp::Where => {
                args::check_count("TableSelect.where", args, 1, 1)?;
                self.r#where(&args::string("TableSelect.where", args, 0)?)?;
            }
            SelectOp::GroupBy => {
                self.group_by(args::string_list("TableSelect.groupBy", args)?)?;
            }
            SelectOp::Having => {
                args::check_count("TableSelect.having", args, 1, 1)?;
                self.having(&args::string("TableSelect.having", args, 0)?)?;
            }
            SelectOp::OrderBy => {
                self.order_by(args::string_list("TableSelect.orderBy", args)?)?;
            }
            SelectOp::Limit => {
                args::check_count("TableSelect.limit", args, 1, 1)?;
                self.limit(args::count("TableSelect.limit", args, 0)?)?;
            }
            SelectOp::Offset => {
                args::check_count("TableSelect.offset", args, 1, 1)?;
                self.offset(args::count("TableSelect.offset", args, 0)?)?;
            }
            SelectOp::Bind => {
                args::check_count("TableSelect.bind", args, 2, 2)?;
                let name = args::string("TableSelect.bind", args, 0)?;
                self.bind(&name, args[1].clone())?;
            }
            SelectOp::Execute => {
                args::check_count("TableSelect.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

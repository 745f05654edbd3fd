//! Collection `find`.

use std::sync::Weak;

use tracing::debug;

use super::{args, check_bindings, non_empty, parse_orders, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::criteria::SearchCondition;
use crate::error::Result;
use crate::mapper::map_document_value;
use crate::protocol::{DataModel, FindMessage, Limit, Order};
use crate::result::DocResult;
use crate::session::Collection;
use crate::value::Value;

operations! {
    pub enum FindOp {
        Find => "find",
        Fields => "fields",
        GroupBy => "groupBy",
        Having => "having",
        Sort => "sort",
        Limit => "limit",
        Skip => "skip",
        Bind => "bind",
        Execute => "execute",
    }
}

static CHAIN: ChainTable<FindOp> = &[
    (FindOp::Find, &[INITIAL]),
    (FindOp::Fields, &["find"]),
    (FindOp::GroupBy, &["find", "fields"]),
    (FindOp::Having, &["groupBy"]),
    (FindOp::Sort, &["find", "fields", "groupBy", "having"]),
    (FindOp::Limit, &["find", "fields", "groupBy", "having", "sort"]),
    (FindOp::Skip, &["limit"]),
    (
        FindOp::Bind,
        &["find", "fields", "groupBy", "having", "sort", "limit", "skip", "bind"],
    ),
    (
        FindOp::Execute,
        &["find", "fields", "groupBy", "having", "sort", "limit", "skip", "bind"],
    ),
];

/// Searches a collection for documents.
///
/// ```no_run
/// # fn run(coll: &xdoc::Collection) -> xdoc::Result<()> {
/// let docs = coll
///     .find("age > :min")?
///     .fields(["name", "age"])?
///     .sort(["age desc"])?
///     .limit(10)?
///     .bind("min", 21)?
///     .execute()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CollectionFind {
    chain: MethodChain<FindOp>,
    stmt: Statement<Collection>,
    criteria: Option<String>,
    projection: Vec<String>,
    grouping: Vec<String>,
    grouping_criteria: Option<String>,
    order: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl CollectionFind {
    pub fn new(owner: Weak<Collection>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            criteria: None,
            projection: Vec::new(),
            grouping: Vec::new(),
            grouping_criteria: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Sets the search condition. Called by [`Collection::find`].
    pub fn find(&mut self, criteria: impl Into<SearchCondition>) -> Result<&mut Self> {
        self.chain.ensure(FindOp::Find)?;
        if !self.stmt.is_orphaned() {
            self.criteria = criteria.into().into_inner();
        }
        self.chain.transition("find");
        Ok(self)
    }

    /// Restricts the fields of the returned documents.
    pub fn fields<I, S>(&mut self, fields: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain.ensure(FindOp::Fields)?;
        if !self.stmt.is_orphaned() {
            self.projection = non_empty(
                "CollectionFind.fields",
                "Field selection criteria can not be empty",
                fields,
            )?;
        }
        self.chain.transition("fields");
        Ok(self)
    }

    pub fn group_by<I, S>(&mut self, fields: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain.ensure(FindOp::GroupBy)?;
        if !self.stmt.is_orphaned() {
            self.grouping = non_empty(
                "CollectionFind.groupBy",
                "Grouping criteria can not be empty",
                fields,
            )?;
        }
        self.chain.transition("groupBy");
        Ok(self)
    }

    /// Filters groups; only valid right after [`CollectionFind::group_by`].
    pub fn having(&mut self, condition: &str) -> Result<&mut Self> {
        self.chain.ensure(FindOp::Having)?;
        if !self.stmt.is_orphaned() {
            self.grouping_criteria = Some(condition.to_string());
        }
        self.chain.transition("having");
        Ok(self)
    }

    /// Sort criteria, each `field [ASC|DESC]`.
    pub fn sort<I, S>(&mut self, criteria: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        const OP: &str = "CollectionFind.sort";
        self.chain.ensure(FindOp::Sort)?;
        if !self.stmt.is_orphaned() {
            let criteria = non_empty(OP, "Sort criteria can not be empty", criteria)?;
            self.order = parse_orders(OP, &criteria)?;
        }
        self.chain.transition("sort");
        Ok(self)
    }

    pub fn limit(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(FindOp::Limit)?;
        if !self.stmt.is_orphaned() {
            self.limit = Some(count);
        }
        self.chain.transition("limit");
        Ok(self)
    }

    /// Number of documents to skip; only valid after [`CollectionFind::limit`].
    pub fn skip(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(FindOp::Skip)?;
        if !self.stmt.is_orphaned() {
            self.offset = Some(count);
        }
        self.chain.transition("skip");
        Ok(self)
    }

    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.chain.ensure(FindOp::Bind)?;
        if !self.stmt.is_orphaned() {
            self.stmt
                .bind("CollectionFind.bind", name, &value.into(), map_document_value)?;
        }
        self.chain.transition("bind");
        Ok(self)
    }

    /// Sends the statement and waits for the result metadata.
    ///
    /// Returns `None` when the collection is gone.
    pub fn execute(&mut self) -> Result<Option<DocResult>> {
        self.chain.ensure(FindOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        self.run(&owner)
            .map(Some)
            .map_err(|e| e.in_operation("CollectionFind.execute"))
    }

    fn run(&self, owner: &Collection) -> Result<DocResult> {
        let msg = self.compile(owner)?;
        debug!(
            collection = owner.name(),
            criteria = msg.criteria.as_deref().unwrap_or(""),
            "sending find"
        );
        let data = owner.connection().execute_find(msg)?.wait()?;
        Ok(DocResult::new(data))
    }

    /// Every clause that may reference a placeholder.
    fn binding_sources(&self) -> Vec<Option<&str>> {
        let mut sources = vec![self.criteria.as_deref(), self.grouping_criteria.as_deref()];
        sources.extend(self.projection.iter().map(|p| Some(p.as_str())));
        sources.extend(self.order.iter().map(|o| Some(o.expr.as_str())));
        sources
    }

    fn compile(&self, owner: &Collection) -> Result<FindMessage> {
        check_bindings("CollectionFind.execute", &self.binding_sources(), self.stmt.args())?;
        Ok(FindMessage {
            target: owner.target(),
            data_model: DataModel::Document,
            criteria: self.criteria.clone(),
            projection: self.projection.clone(),
            grouping: self.grouping.clone(),
            grouping_criteria: self.grouping_criteria.clone(),
            order: self.order.clone(),
            limit: self.limit.map(|row_count| Limit {
                row_count,
                offset: self.offset,
            }),
            args: self.stmt.args().clone(),
        })
    }
}

impl Chained for CollectionFind {
    type Op = FindOp;
    const CLASS: &'static str = "CollectionFind";

    fn chain(&self) -> &MethodChain<FindOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: FindOp, args: &[Value]) -> Result<Outcome> {
        match op {
            FindOp::Find => {
                let criteria = args::criteria("CollectionFind.find", args)?;
                self.find(SearchCondition::from(criteria.as_deref()))?;
            }
            FindOp::Fields => {
                self.fields(args::string_list("CollectionFind.fields", args)?)?;
            }
            FindOp::GroupBy => {
                self.group_by(args::string_list("CollectionFind.groupBy", args)?)?;
            }
            FindOp::Having => {
                args::check_count("CollectionFind.having", args, 1, 1)?;
                self.having(&args::string("CollectionFind.having", args, 0)?)?;
            }
            FindOp::Sort => {
                self.sort(args::string_list("CollectionFind.sort", args)?)?;
            }
            FindOp::Limit => {
                args::check_count("CollectionFind.limit", args, 1, 1)?;
                self.limit(args::count("CollectionFind.limit", args, 0)?)?;
            }
            FindOp::Skip => {
                args::check_count("CollectionFind.skip", args, 1, 1)?;
                self.skip(args::count("CollectionFind.skip", args, 0)?)?;
            }
            FindOp::Bind => {
                args::check_count("CollectionFind.bind", args, 2, 2)?;
                let name = args::string("CollectionFind.bind", args, 0)?;
                self.bind(&name, args[1].clone())?;
            }
            FindOp::Execute => {
                args::check_count("CollectionFind.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

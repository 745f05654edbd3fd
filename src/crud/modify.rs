//! Collection `modify`.

use std::sync::Weak;

use tracing::debug;

use super::{args, check_bindings, non_empty, parse_orders, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Operation, Outcome, INITIAL};
use crate::criteria::SearchCondition;
use crate::error::{Error, Result};
use crate::mapper::map_document_value;
use crate::protocol::{
    DataModel, Limit, Order, UpdateKind, UpdateMessage, UpdateOperation, WireValue,
};
use crate::result::StatementResult;
use crate::session::Collection;
use crate::value::{Map, Value};

operations! {
    pub enum ModifyOp {
        Modify => "modify",
        Set => "set",
        Unset => "unset",
        Merge => "merge",
        ArrayInsert => "arrayInsert",
        ArrayAppend => "arrayAppend",
        ArrayDelete => "arrayDelete",
        Sort => "sort",
        Limit => "limit",
        Bind => "bind",
        Execute => "execute",
    }
}

const UPDATES: &[&str] = &["modify", "operation"];

static CHAIN: ChainTable<ModifyOp> = &[
    (ModifyOp::Modify, &[INITIAL]),
    (ModifyOp::Set, UPDATES),
    (ModifyOp::Unset, UPDATES),
    (ModifyOp::Merge, UPDATES),
    (ModifyOp::ArrayInsert, UPDATES),
    (ModifyOp::ArrayAppend, UPDATES),
    (ModifyOp::ArrayDelete, UPDATES),
    (ModifyOp::Sort, &["operation"]),
    (ModifyOp::Limit, &["operation", "sort"]),
    (ModifyOp::Bind, &["operation", "sort", "limit", "bind"]),
    (ModifyOp::Execute, &["operation", "sort", "limit", "bind"]),
];

/// Updates documents of a collection in place.
///
/// After `modify` any mix of update operations may follow, in any order.
/// They are applied by the server in the order they were added.
#[derive(Debug)]
pub struct CollectionModify {
    chain: MethodChain<ModifyOp>,
    stmt: Statement<Collection>,
    criteria: Option<String>,
    operations: Vec<UpdateOperation>,
    order: Vec<Order>,
    limit: Option<u64>,
}

impl CollectionModify {
    pub fn new(owner: Weak<Collection>) -> Self {
        Self {
            chain: MethodChain::from_table(CHAIN),
            stmt: Statement::new(owner),
            criteria: None,
            operations: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn modify(&mut self, criteria: impl Into<SearchCondition>) -> Result<&mut Self> {
        self.chain.ensure(ModifyOp::Modify)?;
        if !self.stmt.is_orphaned() {
            self.criteria = criteria.into().into_inner();
        }
        self.chain.transition("modify");
        Ok(self)
    }

    /// Sets `path` to `value`.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.push_valued(ModifyOp::Set, UpdateKind::ItemSet, path, value.into())
    }

    /// Removes every path in `paths`.
    pub fn unset<I, S>(&mut self, paths: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        const OP: &str = "CollectionModify.unset";
        self.chain.ensure(ModifyOp::Unset)?;
        if !self.stmt.is_orphaned() {
            let paths = non_empty(OP, "Field list can not be empty", paths)?;
            for path in paths {
                self.push(UpdateKind::ItemRemove, path, None);
            }
        }
        self.chain.transition("operation");
        Ok(self)
    }

    /// Merges `document` into the matched documents.
    pub fn merge(&mut self, document: Map) -> Result<&mut Self> {
        const OP: &str = "CollectionModify.merge";
        self.chain.ensure(ModifyOp::Merge)?;
        if !self.stmt.is_orphaned() {
            let value = map_document_value(&Value::Map(document)).map_err(|e| e.in_operation(OP))?;
            self.push(UpdateKind::ItemMerge, String::new(), Some(value));
        }
        self.chain.transition("operation");
        Ok(self)
    }

    /// Inserts `value` at the array position named by `path`, e.g. `tags[1]`.
    pub fn array_insert(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.push_valued(ModifyOp::ArrayInsert, UpdateKind::ArrayInsert, path, value.into())
    }

    pub fn array_append(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.push_valued(ModifyOp::ArrayAppend, UpdateKind::ArrayAppend, path, value.into())
    }

    /// Removes the array element at `path`.
    pub fn array_delete(&mut self, path: &str) -> Result<&mut Self> {
        self.chain.ensure(ModifyOp::ArrayDelete)?;
        if !self.stmt.is_orphaned() {
            self.push(UpdateKind::ItemRemove, path.to_string(), None);
        }
        self.chain.transition("operation");
        Ok(self)
    }

    pub fn sort<I, S>(&mut self, criteria: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        const OP: &str = "CollectionModify.sort";
        self.chain.ensure(ModifyOp::Sort)?;
        if !self.stmt.is_orphaned() {
            let criteria = non_empty(OP, "Sort criteria can not be empty", criteria)?;
            self.order = parse_orders(OP, &criteria)?;
        }
        self.chain.transition("sort");
        Ok(self)
    }

    pub fn limit(&mut self, count: u64) -> Result<&mut Self> {
        self.chain.ensure(ModifyOp::Limit)?;
        if !self.stmt.is_orphaned() {
            self.limit = Some(count);
        }
        self.chain.transition("limit");
        Ok(self)
    }

    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.chain.ensure(ModifyOp::Bind)?;
        if !self.stmt.is_orphaned() {
            self.stmt
                .bind("CollectionModify.bind", name, &value.into(), map_document_value)?;
        }
        self.chain.transition("bind");
        Ok(self)
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        const OP: &str = "CollectionModify.execute";
        self.chain.ensure(ModifyOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        let mut sources = vec![self.criteria.as_deref()];
        sources.extend(self.operations.iter().map(UpdateOperation::expression));
        sources.extend(self.order.iter().map(|o| Some(o.expr.as_str())));
        check_bindings(OP, &sources, self.stmt.args())?;
        let msg = UpdateMessage {
            target: owner.target(),
            data_model: DataModel::Document,
            criteria: self.criteria.clone(),
            order: self.order.clone(),
            limit: self.limit.map(|row_count| Limit {
                row_count,
                offset: None,
            }),
            operations: self.operations.clone(),
            args: self.stmt.args().clone(),
        };
        debug!(
            collection = owner.name(),
            operations = msg.operations.len(),
            "sending modify"
        );
        let data = owner
            .connection()
            .execute_update(msg)
            .and_then(|pending| pending.wait())
            .map_err(|e| e.in_operation(OP))?;
        Ok(Some(StatementResult::new(data)))
    }

    fn push(&mut self, kind: UpdateKind, source: String, value: Option<WireValue>) {
        self.operations.push(UpdateOperation { kind, source, value });
    }

    fn push_valued(
        &mut self,
        op: ModifyOp,
        kind: UpdateKind,
        path: &str,
        value: Value,
    ) -> Result<&mut Self> {
        self.chain.ensure(op)?;
        if !self.stmt.is_orphaned() {
            let name = format!("CollectionModify.{}", op.name());
            if path.is_empty() {
                return Err(Error::argument(&name, "Field path can not be empty"));
            }
            let value = map_document_value(&value).map_err(|e| e.in_operation(&name))?;
            self.push(kind, path.to_string(), Some(value));
        }
        self.chain.transition("operation");
        Ok(self)
    }

    /// `unset` from the front end: paths are pushed one by one, so a bad
    /// element leaves the earlier ones applied.
    fn unset_dynamic(&mut self, args: &[Value]) -> Result<()> {
        const OP: &str = "CollectionModify.unset";
        args::check_count(OP, args, 1, usize::MAX)?;
        let (items, noun) = match args {
            [Value::Array(items)] => (items.as_slice(), "Element"),
            _ => (args, "Argument"),
        };
        if items.is_empty() {
            return Err(Error::argument(OP, "Field list can not be empty"));
        }
        if self.stmt.is_orphaned() {
            self.chain.transition("operation");
            return Ok(());
        }
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(path) => self.push(UpdateKind::ItemRemove, path.clone(), None),
                _ => {
                    return Err(Error::argument(
                        OP,
                        format!("{} #{} is expected to be a string", noun, i + 1),
                    ))
                }
            }
        }
        self.chain.transition("operation");
        Ok(())
    }
}

impl Chained for CollectionModify {
    type Op = ModifyOp;
    const CLASS: &'static str = "CollectionModify";

    fn chain(&self) -> &MethodChain<ModifyOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: ModifyOp, args: &[Value]) -> Result<Outcome> {
        match op {
            ModifyOp::Modify => {
                let criteria = args::criteria("CollectionModify.modify", args)?;
                self.modify(SearchCondition::from(criteria.as_deref()))?;
            }
            ModifyOp::Set | ModifyOp::ArrayInsert | ModifyOp::ArrayAppend => {
                let name = format!("CollectionModify.{}", op.name());
                args::check_count(&name, args, 2, 2)?;
                let path = args::string(&name, args, 0)?;
                let kind = match op {
                    ModifyOp::Set => UpdateKind::ItemSet,
                    ModifyOp::ArrayInsert => UpdateKind::ArrayInsert,
                    _ => UpdateKind::ArrayAppend,
                };
                self.push_valued(op, kind, &path, args[1].clone())?;
            }
            ModifyOp::Unset => self.unset_dynamic(args)?,
            ModifyOp::Merge => {
                const OP: &str = "CollectionModify.merge";
                args::check_count(OP, args, 1, 1)?;
                match &args[0] {
                    Value::Map(map) => self.merge(map.clone())?,
                    Value::MapRef(map) => self.merge(Map::clone(map))?,
                    _ => return Err(Error::argument(OP, "Argument #1 is expected to be a map")),
                };
            }
            ModifyOp::ArrayDelete => {
                args::check_count("CollectionModify.arrayDelete", args, 1, 1)?;
                self.array_delete(&args::string("CollectionModify.arrayDelete", args, 0)?)?;
            }
            ModifyOp::Sort => {
                self.sort(args::string_list("CollectionModify.sort", args)?)?;
            }
            ModifyOp::Limit => {
                args::check_count("CollectionModify.limit", args, 1, 1)?;
                self.limit(args::count("CollectionModify.limit", args, 0)?)?;
            }
            ModifyOp::Bind => {
                args::check_count("CollectionModify.bind", args, 2, 2)?;
                let name = args::string("CollectionModify.bind", args, 0)?;
                self.bind(&name, args[1].clone())?;
            }
            ModifyOp::Execute => {
                args::check_count("CollectionModify.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

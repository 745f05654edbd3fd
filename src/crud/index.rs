//! Collection index management.
//!
//! Both builders collect an argument list and hand it to the connection as an
//! admin command instead of a CRUD message.

use std::sync::Weak;

use tracing::debug;

use super::{args, Owner, Statement};
use crate::chain::{operations, ChainTable, Chained, MethodChain, Outcome, INITIAL};
use crate::constants::{Constant, DATA_TYPE, INDEX_TYPE};
use crate::error::{Error, Result};
use crate::protocol::{AdminMessage, WireValue};
use crate::result::StatementResult;
use crate::session::Collection;
use crate::value::Value;

pub const CREATE_INDEX_COMMAND: &str = "create_collection_index";
pub const DROP_INDEX_COMMAND: &str = "drop_collection_index";

operations! {
    pub enum CreateIndexOp {
        CreateIndex => "createIndex",
        Field => "field",
        Execute => "execute",
    }
}

static CREATE_CHAIN: ChainTable<CreateIndexOp> = &[
    (CreateIndexOp::CreateIndex, &[INITIAL]),
    (CreateIndexOp::Field, &["createIndex", "field"]),
    (CreateIndexOp::Execute, &["field"]),
];

/// Sends an admin command and wraps the reply.
fn run_admin(
    owner: &Collection,
    op: &str,
    command: &str,
    args: Vec<WireValue>,
) -> Result<StatementResult> {
    debug!(collection = owner.name(), command, args = args.len(), "sending admin command");
    let msg = AdminMessage {
        command: command.to_string(),
        args,
    };
    owner
        .connection()
        .execute_admin(msg)
        .and_then(|pending| pending.wait())
        .map(StatementResult::new)
        .map_err(|e| e.in_operation(op))
}

/// Creates an index on a collection. At least one field is required.
///
/// Arguments are sent as
/// `[schema, collection, name, unique, (path, type, required)...]`.
#[derive(Debug)]
pub struct CollectionCreateIndex {
    chain: MethodChain<CreateIndexOp>,
    stmt: Statement<Collection>,
    args: Vec<WireValue>,
}

impl CollectionCreateIndex {
    pub fn new(owner: Weak<Collection>) -> Self {
        Self {
            chain: MethodChain::from_table(CREATE_CHAIN),
            stmt: Statement::new(owner),
            args: Vec::new(),
        }
    }

    pub fn create_index(&mut self, name: &str, unique: bool) -> Result<&mut Self> {
        self.chain.ensure(CreateIndexOp::CreateIndex)?;
        if let Some(owner) = self.stmt.owner() {
            if name.is_empty() {
                return Err(Error::argument(
                    "CollectionCreateIndex.createIndex",
                    "Index name can not be empty",
                ));
            }
            self.args = vec![
                WireValue::String(owner.schema_name().to_string()),
                WireValue::String(owner.name().to_string()),
                WireValue::String(name.to_string()),
                WireValue::Bool(unique),
            ];
        }
        self.chain.transition("createIndex");
        Ok(self)
    }

    /// Adds an indexed field. `data_type` must be a `DataType` constant.
    pub fn field(&mut self, path: &str, data_type: &Constant, required: bool) -> Result<&mut Self> {
        const OP: &str = "CollectionCreateIndex.field";
        self.chain.ensure(CreateIndexOp::Field)?;
        if !self.stmt.is_orphaned() {
            if data_type.group() != DATA_TYPE {
                return Err(Error::argument(
                    OP,
                    "Argument #2 is expected to be a DataType constant",
                ));
            }
            self.args.extend([
                WireValue::String(path.to_string()),
                WireValue::String(data_type.data().to_string()),
                WireValue::Bool(required),
            ]);
        }
        self.chain.transition("field");
        Ok(self)
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        self.chain.ensure(CreateIndexOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        run_admin(
            &owner,
            "CollectionCreateIndex.execute",
            CREATE_INDEX_COMMAND,
            self.args.clone(),
        )
        .map(Some)
    }
}

impl Chained for CollectionCreateIndex {
    type Op = CreateIndexOp;
    const CLASS: &'static str = "CollectionCreateIndex";

    fn chain(&self) -> &MethodChain<CreateIndexOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: CreateIndexOp, args: &[Value]) -> Result<Outcome> {
        match op {
            CreateIndexOp::CreateIndex => {
                const OP: &str = "CollectionCreateIndex.createIndex";
                args::check_count(OP, args, 1, 2)?;
                let name = args::string(OP, args, 0)?;
                let unique = match args.get(1) {
                    None => false,
                    Some(Value::Bool(unique)) => *unique,
                    Some(other) => match other.downcast::<Constant>() {
                        Some(c) if c.group() == INDEX_TYPE && c.id() == "Unique" => true,
                        _ => {
                            return Err(Error::argument(
                                OP,
                                "Argument #2 is expected to be a bool or IndexType.Unique",
                            ))
                        }
                    },
                };
                self.create_index(&name, unique)?;
            }
            CreateIndexOp::Field => {
                const OP: &str = "CollectionCreateIndex.field";
                args::check_count(OP, args, 3, 3)?;
                let path = args::string(OP, args, 0)?;
                let data_type = args[1].downcast::<Constant>().ok_or_else(|| {
                    Error::argument(OP, "Argument #2 is expected to be a DataType constant")
                })?;
                let required = args::boolean(OP, args, 2)?;
                self.field(&path, data_type, required)?;
            }
            CreateIndexOp::Execute => {
                args::check_count("CollectionCreateIndex.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

operations! {
    pub enum DropIndexOp {
        DropIndex => "dropIndex",
        Execute => "execute",
    }
}

static DROP_CHAIN: ChainTable<DropIndexOp> = &[
    (DropIndexOp::DropIndex, &[INITIAL]),
    (DropIndexOp::Execute, &["dropIndex"]),
];

/// Drops an index from a collection.
#[derive(Debug)]
pub struct CollectionDropIndex {
    chain: MethodChain<DropIndexOp>,
    stmt: Statement<Collection>,
    args: Vec<WireValue>,
}

impl CollectionDropIndex {
    pub fn new(owner: Weak<Collection>) -> Self {
        Self {
            chain: MethodChain::from_table(DROP_CHAIN),
            stmt: Statement::new(owner),
            args: Vec::new(),
        }
    }

    pub fn drop_index(&mut self, name: &str) -> Result<&mut Self> {
        self.chain.ensure(DropIndexOp::DropIndex)?;
        if let Some(owner) = self.stmt.owner() {
            self.args = vec![
                WireValue::String(owner.schema_name().to_string()),
                WireValue::String(owner.name().to_string()),
                WireValue::String(name.to_string()),
            ];
        }
        self.chain.transition("dropIndex");
        Ok(self)
    }

    pub fn execute(&mut self) -> Result<Option<StatementResult>> {
        self.chain.ensure(DropIndexOp::Execute)?;
        let Some(owner) = self.stmt.owner() else {
            return Ok(None);
        };
        run_admin(
            &owner,
            "CollectionDropIndex.execute",
            DROP_INDEX_COMMAND,
            self.args.clone(),
        )
        .map(Some)
    }
}

impl Chained for CollectionDropIndex {
    type Op = DropIndexOp;
    const CLASS: &'static str = "CollectionDropIndex";

    fn chain(&self) -> &MethodChain<DropIndexOp> {
        &self.chain
    }

    fn dispatch(&mut self, op: DropIndexOp, args: &[Value]) -> Result<Outcome> {
        match op {
            DropIndexOp::DropIndex => {
                const OP: &str = "CollectionDropIndex.dropIndex";
                args::check_count(OP, args, 1, 1)?;
                self.drop_index(&args::string(OP, args, 0)?)?;
            }
            DropIndexOp::Execute => {
                args::check_count("CollectionDropIndex.execute", args, 0, 0)?;
                let result = self.execute()?.map(Value::object).unwrap_or_default();
                return Ok(Outcome::Return(result));
            }
        }
        Ok(Outcome::Chain)
    }
}

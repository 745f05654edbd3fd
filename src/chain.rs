//! Method-chain governor.
//!
//! Each builder declares a table mapping every operation to the set of
//! states after which it may be called. Calling an operation moves the
//! builder to a new state, and the enabled set is recomputed from the table.
//! Predecessor sets are OR'd, so an operation can be reachable from several
//! points of the chain without listing every path.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::value::{ObjectBridge, Value};

/// State every builder starts in, before its factory call.
pub const INITIAL: &str = "";

/// Operation identifiers of one builder.
pub trait Operation: Copy + Eq + fmt::Debug + Send + 'static {
  const ALL: &'static [Self];

  fn name(self) -> &'static str;

  /// Position in [`Operation::ALL`]; doubles as the bit index.
  fn index(self) -> usize;

  fn from_name(name: &str) -> Option<Self> {
    Self::ALL.iter().copied().find(|op| op.name() == name)
  }
}

/// Declares an operation enum and its front-end names.
macro_rules! operations {
  ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    $vis enum $name {
      $($variant),+
    }

    impl $crate::chain::Operation for $name {
      const ALL: &'static [Self] = &[$($name::$variant),+];

      fn name(self) -> &'static str {
        match self {
          $($name::$variant => $text),+
        }
      }

      fn index(self) -> usize {
        self as usize
      }
    }
  };
}

pub(crate) use operations;

/// Legality table: operation and the states it may follow.
pub type ChainTable<O> = &'static [(O, &'static [&'static str])];

/// Tracks which operations of a builder are callable right now.
#[derive(Clone)]
pub struct MethodChain<O: Operation> {
  predecessors: Vec<Option<&'static [&'static str]>>,
  registered: u64,
  enabled: u64,
  state: &'static str,
  _op: std::marker::PhantomData<O>,
}

impl<O: Operation> MethodChain<O> {
  /// An empty chain in the initial state.
  pub fn new() -> Self {
    debug_assert!(O::ALL.len() <= 64, "operation set does not fit the bitset");
    Self {
      predecessors: vec![None; O::ALL.len()],
      registered: 0,
      enabled: 0,
      state: INITIAL,
      _op: std::marker::PhantomData,
    }
  }

  /// Registers every entry of `table` and evaluates the initial state.
  pub fn from_table(table: ChainTable<O>) -> Self {
    let mut chain = Self::new();
    for (op, states) in table {
      chain.register(*op, states);
    }
    chain
  }

  /// Declares that `op` becomes callable once any of `states` is reached.
  pub fn register(&mut self, op: O, states: &'static [&'static str]) {
    let bit = 1u64 << op.index();
    self.predecessors[op.index()] = Some(states);
    self.registered |= bit;
    if states.contains(&self.state) {
      self.enabled |= bit;
    } else {
      self.enabled &= !bit;
    }
  }

  /// Moves to `state` and recomputes the enabled set.
  pub fn transition(&mut self, state: &'static str) {
    self.state = state;
    self.enabled = 0;
    for (index, states) in self.predecessors.iter().enumerate() {
      if states.is_some_and(|states| states.contains(&state)) {
        self.enabled |= 1u64 << index;
      }
    }
  }

  pub fn state(&self) -> &'static str {
    self.state
  }

  pub fn is_registered(&self, op: O) -> bool {
    self.registered & (1u64 << op.index()) != 0
  }

  pub fn is_enabled(&self, op: O) -> bool {
    self.enabled & (1u64 << op.index()) != 0
  }

  /// Fails with `ForbiddenOperation` unless `op` is callable now.
  pub fn ensure(&self, op: O) -> Result<()> {
    if !self.is_registered(op) {
      return Err(Error::UnknownMember(op.name().to_string()));
    }
    if !self.is_enabled(op) {
      trace!(operation = op.name(), state = self.state, "operation rejected by chain");
      return Err(Error::ForbiddenOperation(op.name().to_string()));
    }
    Ok(())
  }

  /// Resolves a front-end member name to a callable operation.
  pub fn lookup(&self, name: &str) -> Result<O> {
    let op = O::from_name(name)
      .filter(|op| self.is_registered(*op))
      .ok_or_else(|| Error::UnknownMember(name.to_string()))?;
    self.ensure(op)?;
    Ok(op)
  }

  /// Names of the currently callable operations, in declaration order.
  pub fn members(&self) -> Vec<&'static str> {
    O::ALL
      .iter()
      .filter(|op| self.is_enabled(**op))
      .map(|op| op.name())
      .collect()
  }
}

impl<O: Operation> Default for MethodChain<O> {
  fn default() -> Self {
    Self::new()
  }
}

impl<O: Operation> fmt::Debug for MethodChain<O> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MethodChain")
      .field("state", &self.state)
      .field("enabled", &self.members())
      .finish()
  }
}

/// What a dynamic call hands back to the front end.
#[derive(Debug)]
pub enum Outcome {
  /// The builder itself, for further chaining.
  Chain,
  Return(Value),
}

/// A builder driven through its method chain.
pub trait Chained: fmt::Debug + Send + 'static {
  type Op: Operation;

  /// Class name shown to the front end, e.g. `"CollectionFind"`.
  const CLASS: &'static str;

  fn chain(&self) -> &MethodChain<Self::Op>;

  /// Runs `op` with front-end arguments. Only called for enabled operations.
  fn dispatch(&mut self, op: Self::Op, args: &[Value]) -> Result<Outcome>;

  /// Looks up `name`, checks legality and dispatches.
  fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Outcome> {
    let op = self.chain().lookup(name)?;
    self.dispatch(op, args)
  }

  fn members(&self) -> Vec<&'static str> {
    self.chain().members()
  }
}

/// Builder exposed to the front end. Clones share the same builder.
pub struct Shared<B>(Arc<Mutex<B>>);

impl<B: Chained> Shared<B> {
  pub fn new(builder: B) -> Self {
    Self(Arc::new(Mutex::new(builder)))
  }

  /// Runs `f` with exclusive access to the builder.
  pub fn with<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
    f(&mut self.0.lock())
  }

  pub fn same_as(&self, other: &Shared<B>) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  pub fn into_value(self) -> Value {
    Value::Object(Arc::new(self))
  }
}

impl<B> Clone for Shared<B> {
  fn clone(&self) -> Self {
    Self(Arc::clone(&self.0))
  }
}

impl<B: Chained> fmt::Debug for Shared<B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<{}>", B::CLASS)
  }
}

impl<B: Chained> ObjectBridge for Shared<B> {
  fn class_name(&self) -> &str {
    B::CLASS
  }

  fn members(&self) -> Vec<String> {
    self.0.lock().members().into_iter().map(String::from).collect()
  }

  fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
    let outcome = self.0.lock().invoke(name, args)?;
    Ok(match outcome {
      Outcome::Chain => self.clone().into_value(),
      Outcome::Return(value) => value,
    })
  }

  fn as_any(&self) -> &dyn std::any::Any {
    self
  }
}

//! Error types for the xdoc statement builders.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
  #[error("Unknown member: {0}")]
  UnknownMember(String),

  #[error("Forbidden usage of {0}")]
  ForbiddenOperation(String),

  #[error("{0}")]
  Argument(String),

  #[error("{0}")]
  Runtime(String),

  #[error("{0}")]
  Logic(String),

  #[error("Connection error: {0}")]
  Connection(String),

  #[error("Server error: {0}")]
  Server(String),

  #[error("Serialization error: {0}")]
  Serialization(String),

  #[error("Channel closed")]
  ChannelClosed,
}

impl Error {
  /// Builds an argument error prefixed with the operation that rejected it.
  pub fn argument(op: &str, msg: impl AsRef<str>) -> Self {
    Self::Argument(format!("{}: {}", op, msg.as_ref()))
  }

  pub fn logic(op: &str, msg: impl AsRef<str>) -> Self {
    Self::Logic(format!("{}: {}", op, msg.as_ref()))
  }

  /// Re-raises a failure coming out of statement compilation or dispatch
  /// under the name of the operation that was running.
  ///
  /// Argument and serialization problems stay argument errors; transport and
  /// server failures become runtime errors. Messages that already carry the
  /// prefix are left alone.
  pub fn in_operation(self, op: &str) -> Self {
    let prefix = format!("{}: ", op);
    let with_prefix = |msg: String| {
      if msg.starts_with(&prefix) {
        msg
      } else {
        format!("{}{}", prefix, msg)
      }
    };
    match self {
      Self::Argument(msg) => Self::Argument(with_prefix(msg)),
      Self::Serialization(msg) => Self::Argument(with_prefix(msg)),
      Self::Logic(msg) => Self::Logic(with_prefix(msg)),
      Self::Runtime(msg) => Self::Runtime(with_prefix(msg)),
      Self::UnknownMember(_) | Self::ForbiddenOperation(_) => self,
      other => Self::Runtime(with_prefix(other.to_string())),
    }
  }

  pub fn is_argument(&self) -> bool {
    matches!(self, Self::Argument(_))
  }
}

impl From<rmp_serde::encode::Error> for Error {
  fn from(e: rmp_serde::encode::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl From<rmp_serde::decode::Error> for Error {
  fn from(e: rmp_serde::decode::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_in_operation_prefixes_once() {
    let err = Error::argument("CollectionFind.limit", "bad").in_operation("CollectionFind.limit");
    assert_eq!(err.to_string(), "CollectionFind.limit: bad");
  }

  #[test]
  fn test_in_operation_reclassifies_transport_errors() {
    let err = Error::Connection("reset by peer".into()).in_operation("CollectionFind.execute");
    assert_eq!(
      err,
      Error::Runtime("CollectionFind.execute: Connection error: reset by peer".into())
    );

    let err = Error::Serialization("bad map key".into()).in_operation("TableInsert.execute");
    assert!(err.is_argument());
    assert_eq!(err.to_string(), "TableInsert.execute: bad map key");
  }

  #[test]
  fn test_governor_errors_keep_their_kind() {
    let err = Error::ForbiddenOperation("skip".into()).in_operation("CollectionFind.skip");
    assert_eq!(err, Error::ForbiddenOperation("skip".into()));
  }
}

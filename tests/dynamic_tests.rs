//! Builders driven by name, the way a scripting front end calls them.

mod common;

use common::{map, Fixture};
use xdoc::chain::Shared;
use xdoc::protocol::{UpdateKind, WireValue};
use xdoc::{
  expr, ClientMessage, CollectionFind, ConstantGroup, Error, ObjectBridge, Value,
};

fn call(target: &Value, name: &str, args: &[Value]) -> xdoc::Result<Value> {
  target.as_object().expect("an object").call(name, args)
}

#[test]
fn test_members_follow_the_chain() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let find = users.call("find", &["age > 1".into()]).unwrap();
  assert_eq!(find.class_name(), Some("CollectionFind"));
  let members = find.as_object().unwrap().members();
  assert_eq!(members, vec!["fields", "groupBy", "sort", "limit", "bind", "execute"]);

  call(&find, "limit", &[3.into()]).unwrap();
  assert_eq!(
    find.as_object().unwrap().members(),
    vec!["skip", "bind", "execute"]
  );
}

#[test]
fn test_chained_calls_return_the_same_builder() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let find = users.call("find", &[]).unwrap();
  let next = call(&find, "fields", &[Value::Array(vec!["a".into(), "b".into()])]).unwrap();

  let first = find.downcast::<Shared<CollectionFind>>().unwrap();
  let second = next.downcast::<Shared<CollectionFind>>().unwrap();
  assert!(first.same_as(second));
}

#[test]
fn test_unknown_and_forbidden_members() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let find = users.call("find", &[]).unwrap();
  assert_eq!(
    call(&find, "skip", &[1.into()]).unwrap_err(),
    Error::ForbiddenOperation("skip".into())
  );
  assert_eq!(
    call(&find, "rewind", &[]).unwrap_err(),
    Error::UnknownMember("rewind".into())
  );
  assert_eq!(
    users.call("truncate", &[]).unwrap_err(),
    Error::UnknownMember("truncate".into())
  );
}

#[test]
fn test_argument_validation() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let find = users.call("find", &[]).unwrap();
  let err = call(&find, "fields", &[Value::Array(vec!["a".into(), 2.into()])]).unwrap_err();
  assert_eq!(err.to_string(), "CollectionFind.fields: Element #2 is expected to be a string");

  let err = call(&find, "fields", &[Value::Array(vec![])]).unwrap_err();
  assert_eq!(
    err.to_string(),
    "CollectionFind.fields: Field selection criteria can not be empty"
  );

  let err = call(&find, "limit", &[(-1).into()]).unwrap_err();
  assert_eq!(
    err.to_string(),
    "CollectionFind.limit: Argument #1 is expected to be an unsigned int"
  );

  let err = users.call("find", &[5.into()]).unwrap_err();
  assert!(err.is_argument());
}

#[test]
fn test_execute_returns_result_objects() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let add = users
    .call("add", &[map(vec![("name", "jack".into())]).into()])
    .unwrap();
  let result = call(&add, "execute", &[]).unwrap();
  assert_eq!(result.class_name(), Some("Result"));

  let id = call(&result, "getLastDocumentId", &[]).unwrap();
  assert_eq!(id.as_str().map(str::len), Some(32));

  let find = users.call("find", &[]).unwrap();
  let docs = call(&find, "execute", &[]).unwrap();
  assert_eq!(docs.class_name(), Some("DocResult"));
  assert_eq!(call(&docs, "fetchAll", &[]).unwrap(), Value::Array(vec![]));
}

#[test]
fn test_unset_applies_paths_up_to_the_bad_one() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let modify = users.call("modify", &["true".into()]).unwrap();
  let err = call(
    &modify,
    "unset",
    &[Value::Array(vec!["a".into(), 5.into(), "b".into()])],
  )
  .unwrap_err();
  assert_eq!(err.to_string(), "CollectionModify.unset: Element #2 is expected to be a string");

  call(&modify, "set", &["x".into(), expr("x * 2")]).unwrap();
  call(&modify, "execute", &[]).unwrap();

  match fx.conn.last() {
    Some(ClientMessage::Update(update)) => {
      let ops: Vec<(UpdateKind, &str)> = update
        .operations
        .iter()
        .map(|op| (op.kind, op.source.as_str()))
        .collect();
      assert_eq!(ops, vec![(UpdateKind::ItemRemove, "a"), (UpdateKind::ItemSet, "x")]);
    }
    other => panic!("expected an update, got {:?}", other),
  }
}

#[test]
fn test_merge_takes_a_single_map() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let modify = users.call("modify", &[]).unwrap();
  let err = call(&modify, "merge", &["x".into()]).unwrap_err();
  assert_eq!(err.to_string(), "CollectionModify.merge: Argument #1 is expected to be a map");
  let err = call(&modify, "merge", &[]).unwrap_err();
  assert!(err.is_argument());
}

#[test]
fn test_remove_bind_through_front_end() {
  let fx = Fixture::new();
  let users = fx.collection("users");

  let remove = users.call("remove", &["a = :a".into()]).unwrap();
  let err = call(&remove, "bind", &["a".into(), 1.into()]).unwrap_err();
  assert!(matches!(err, Error::Logic(ref msg) if msg.ends_with("not yet implemented")));
}

#[test]
fn test_create_index_with_constants() {
  let fx = Fixture::new();
  let users = fx.collection("users");
  let unique = ConstantGroup::index_types().call("Unique", &[]).unwrap();
  let text = ConstantGroup::data_types().call("String", &[]).unwrap();

  let create = users.call("createIndex", &["by_name".into(), unique]).unwrap();
  let err = call(&create, "field", &["$.name".into(), text.clone()]).unwrap_err();
  assert_eq!(
    err.to_string(),
    "CollectionCreateIndex.field: Invalid number of arguments, expected 3 but got 2"
  );
  let err = call(&create, "field", &["$.name".into(), "TEXT".into(), true.into()]).unwrap_err();
  assert!(err.is_argument());

  call(&create, "field", &["$.name".into(), text, true.into()]).unwrap();
  call(&create, "execute", &[]).unwrap();

  match fx.conn.last() {
    Some(ClientMessage::Admin(admin)) => {
      assert_eq!(admin.args[3], WireValue::Bool(true));
      assert_eq!(admin.args[5], WireValue::String("TEXT".into()));
    }
    other => panic!("expected an admin command, got {:?}", other),
  }

  let err = users.call("createIndex", &["x".into(), "unique".into()]).unwrap_err();
  assert!(err.is_argument());
}

#[test]
fn test_table_builders_by_name() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let insert = people
    .call("insert", &[map(vec![("a", 1.into())]).into()])
    .unwrap();
  call(&insert, "values", &[2.into()]).unwrap();
  let result = call(&insert, "execute", &[]).unwrap();
  assert_eq!(result.class_name(), Some("Result"));

  let select = people.call("select", &["a".into(), "b".into()]).unwrap();
  call(&select, "where", &["a = :a".into()]).unwrap();
  call(&select, "bind", &["a".into(), Value::Null]).unwrap();
  let rows = call(&select, "execute", &[]).unwrap();
  assert_eq!(rows.class_name(), Some("RowResult"));

  let update = people.call("update", &[]).unwrap();
  assert_eq!(
    call(&update, "where", &["a = 1".into()]).unwrap_err(),
    Error::ForbiddenOperation("where".into())
  );
  assert!(people.call("update", &[1.into()]).unwrap_err().is_argument());
}

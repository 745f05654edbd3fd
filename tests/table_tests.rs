//! Table builders against a recording connection.

mod common;

use chrono::NaiveDate;
use common::{map, Fixture};
use serde_json::json;
use xdoc::protocol::{DataModel, Direction, Limit, UpdateKind, WireValue};
use xdoc::{expr, ClientMessage, Column, DateValue, Error, ResultData, Value};

#[test]
fn test_select_compiles_every_clause() {
  let fx = Fixture::new();
  fx.conn.reply_with(ResultData {
    columns: vec![
      Column { name: "name".into(), type_name: "TEXT".into() },
      Column { name: "age".into(), type_name: "INT".into() },
    ],
    rows: vec![vec![json!("jack"), json!(17)]],
    ..Default::default()
  });
  let people = fx.table("people");

  let rows = people
    .select(["name", "age"])
    .unwrap()
    .r#where("age > :min and nick = :nick")
    .unwrap()
    .group_by(["age"])
    .unwrap()
    .having("count(*) > 1")
    .unwrap()
    .order_by(["age desc"])
    .unwrap()
    .limit(5)
    .unwrap()
    .offset(2)
    .unwrap()
    .bind("min", 10)
    .unwrap()
    .bind("nick", Value::Null)
    .unwrap()
    .execute()
    .unwrap()
    .unwrap();

  assert_eq!(rows.column_names(), vec!["name", "age"]);
  assert_eq!(rows.fetch_one(), Some(vec![json!("jack"), json!(17)]));

  match fx.conn.last() {
    Some(ClientMessage::Find(find)) => {
      assert_eq!(find.data_model, DataModel::Table);
      assert_eq!(find.projection, vec!["name", "age"]);
      assert_eq!(find.grouping_criteria.as_deref(), Some("count(*) > 1"));
      assert_eq!(find.order[0].direction, Direction::Desc);
      assert_eq!(find.limit, Some(Limit { row_count: 5, offset: Some(2) }));
      assert_eq!(find.args.get("nick"), Some(&WireValue::Null));
      assert_eq!(find.args.get("min"), Some(&WireValue::Int(10)));
    }
    other => panic!("expected a find, got {:?}", other),
  }
}

#[test]
fn test_select_offset_requires_limit() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let mut select = people.select(Vec::<String>::new()).unwrap();
  assert_eq!(select.offset(1).unwrap_err(), Error::ForbiddenOperation("offset".into()));
  assert_eq!(select.having("x").unwrap_err(), Error::ForbiddenOperation("having".into()));
  select.limit(1).unwrap().offset(1).unwrap();
}

#[test]
fn test_select_bind_rejects_containers() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let mut select = people.select(["a"]).unwrap();
  let err = select.bind("a", Value::Array(vec![1.into()])).unwrap_err();
  assert_eq!(err.to_string(), "TableSelect.bind: Unsupported value received: [1]");
  let err = select.bind("a", map(vec![])).unwrap_err();
  assert!(err.is_argument());
}

#[test]
fn test_insert_values_count_is_not_checked() {
  let fx = Fixture::new();
  let people = fx.table("people");

  people
    .insert(["a", "b"])
    .unwrap()
    .values(vec![1.into(), 2.into()])
    .unwrap()
    .values(vec![3.into()])
    .unwrap()
    .execute()
    .unwrap();

  match fx.conn.last() {
    Some(ClientMessage::Insert(insert)) => {
      assert_eq!(insert.data_model, DataModel::Table);
      assert_eq!(insert.projection, vec!["a", "b"]);
      let rows: Vec<_> = insert.rows.iter().map(|r| r.fields.clone()).collect();
      assert_eq!(
        rows,
        vec![
          vec![WireValue::Int(1), WireValue::Int(2)],
          vec![WireValue::Int(3)],
        ]
      );
    }
    other => panic!("expected an insert, got {:?}", other),
  }
}

#[test]
fn test_insert_row_from_map() {
  let fx = Fixture::new();
  let people = fx.table("people");
  let born = NaiveDate::from_ymd_opt(2001, 2, 3)
    .unwrap()
    .and_hms_opt(4, 5, 6)
    .unwrap();

  people
    .insert_row(map(vec![
      ("name", "jack".into()),
      ("nick", Value::Null),
      ("born", Value::object(DateValue::new(born))),
      ("admin", true.into()),
    ]))
    .unwrap()
    .execute()
    .unwrap();

  match fx.conn.last() {
    Some(ClientMessage::Insert(insert)) => {
      assert_eq!(insert.projection, vec!["admin", "born", "name", "nick"]);
      assert_eq!(
        insert.rows[0].fields,
        vec![
          WireValue::Int(1),
          WireValue::String("2001-02-03 04:05:06".into()),
          WireValue::String("jack".into()),
          WireValue::Null,
        ]
      );
    }
    other => panic!("expected an insert, got {:?}", other),
  }
}

#[test]
fn test_insert_rejects_nested_values() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let err = people
    .insert_row(map(vec![("tags", Value::Array(vec!["a".into()]))]))
    .unwrap_err();
  assert_eq!(
    err.to_string(),
    r#"TableInsert.insert: Value for column 'tags': Unsupported value received: ["a"]"#
  );

  let mut insert = people.insert(["a"]).unwrap();
  let err = insert.values(vec![]).unwrap_err();
  assert!(err.is_argument());
  let err = insert.values(vec![1.into(), map(vec![]).into()]).unwrap_err();
  assert!(err.to_string().starts_with("TableInsert.values: Argument #2: "));
}

#[test]
fn test_insert_and_update_bind_are_not_implemented() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let err = people.insert(["a"]).unwrap().bind("x", 1).unwrap_err();
  assert_eq!(err, Error::Logic("TableInsert.bind: not yet implemented".into()));

  let err = people
    .update()
    .unwrap()
    .set(map(vec![("a", 1.into())]))
    .unwrap()
    .bind("x", 1)
    .unwrap_err();
  assert_eq!(err, Error::Logic("TableUpdate.bind: not yet implemented".into()));
}

#[test]
fn test_insert_without_rows() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let err = people.insert(["a"]).unwrap().execute().unwrap_err();
  assert!(matches!(err, Error::Logic(_)));
  assert!(fx.conn.sent().is_empty());
}

#[test]
fn test_update_uses_expressions_verbatim() {
  let fx = Fixture::new();
  let people = fx.table("people");

  people
    .update()
    .unwrap()
    .set(map(vec![("name", "jack".into()), ("visits", expr("visits + 1"))]))
    .unwrap()
    .r#where("id = 4")
    .unwrap()
    .order_by(["id"])
    .unwrap()
    .limit(1)
    .unwrap()
    .execute()
    .unwrap();

  match fx.conn.last() {
    Some(ClientMessage::Update(update)) => {
      assert_eq!(update.data_model, DataModel::Table);
      assert_eq!(update.criteria.as_deref(), Some("id = 4"));
      assert!(update.operations.iter().all(|op| op.kind == UpdateKind::Set));
      assert_eq!(update.operations[0].source, "name");
      assert_eq!(update.operations[0].value, Some(WireValue::String("jack".into())));
      assert_eq!(
        update.operations[1].value,
        Some(WireValue::Expression("visits + 1".into()))
      );
    }
    other => panic!("expected an update, got {:?}", other),
  }
}

#[test]
fn test_update_rejects_empty_expression() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let err = people
    .update()
    .unwrap()
    .set(map(vec![("a", expr(""))]))
    .unwrap_err();
  assert_eq!(
    err.to_string(),
    "TableUpdate.set: Value for column 'a': Expressions can not be empty."
  );
}

#[test]
fn test_select_binds_placeholders_in_columns() {
  let fx = Fixture::new();
  let people = fx.table("people");

  people
    .select(["name", "age * :factor"])
    .unwrap()
    .bind("factor", 2)
    .unwrap()
    .execute()
    .unwrap()
    .unwrap();

  match fx.conn.last() {
    Some(ClientMessage::Find(find)) => {
      assert_eq!(find.projection, vec!["name", "age * :factor"]);
      assert_eq!(find.args.get("factor"), Some(&WireValue::Int(2)));
    }
    other => panic!("expected a select, got {:?}", other),
  }
}

#[test]
fn test_update_requires_set_first() {
  let fx = Fixture::new();
  let people = fx.table("people");

  let mut update = people.update().unwrap();
  assert_eq!(update.r#where("a = 1").unwrap_err(), Error::ForbiddenOperation("where".into()));
  assert_eq!(update.execute().unwrap_err(), Error::ForbiddenOperation("execute".into()));
  assert!(update.set(map(vec![])).unwrap_err().is_argument());
}

#[test]
fn test_delete_binds_in_table_context() {
  let fx = Fixture::new();
  fx.conn.reply_with(ResultData {
    affected_items: 1,
    ..Default::default()
  });
  let people = fx.table("people");

  let result = people
    .delete()
    .unwrap()
    .r#where("id = :id")
    .unwrap()
    .order_by(["id"])
    .unwrap()
    .limit(1)
    .unwrap()
    .bind("id", 7)
    .unwrap()
    .execute()
    .unwrap()
    .unwrap();
  assert_eq!(result.affected_item_count(), 1);

  match fx.conn.last() {
    Some(ClientMessage::Delete(delete)) => {
      assert_eq!(delete.data_model, DataModel::Table);
      assert_eq!(delete.args.get("id"), Some(&WireValue::Int(7)));
    }
    other => panic!("expected a delete, got {:?}", other),
  }

  let err = people
    .delete()
    .unwrap()
    .bind("id", map(vec![]))
    .unwrap_err();
  assert!(err.is_argument());
}

#[test]
fn test_table_builders_give_up_when_table_is_gone() {
  let fx = Fixture::new();
  let people = fx.table("people");
  let mut delete = people.delete().unwrap();
  let mut insert = people.insert(["a"]).unwrap();
  drop(people);
  drop(fx.session);

  assert!(delete.r#where("a = 1").unwrap().execute().unwrap().is_none());
  assert!(insert.values(vec![]).unwrap().execute().unwrap().is_none());
  assert!(fx.conn.sent().is_empty());
}

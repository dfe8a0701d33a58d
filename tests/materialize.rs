mod common;

use common::{Employee, FakeExecutor, FakeSource, MSSQL_TYPES, employee_labels, employee_row};
use keel::{
    ChainError, DataSource, FilterOptions, Materialize, RowNames, RowOptions, Table, Value, args,
};
use uuid::Uuid;
use keel_sqlserver::SQL_SERVER;
use std::sync::Arc;

fn mssql() -> DataSource<FakeSource> {
    DataSource::new("test", &SQL_SERVER, FakeSource::new(MSSQL_TYPES))
}

fn one_employee() -> Table {
    Table::new(
        employee_labels(),
        vec![employee_row(7, "Ann", "Lee", Some("Boss"))],
    )
}

fn two_employees() -> Table {
    Table::new(
        employee_labels(),
        vec![
            employee_row(7, "Ann", "Lee", Some("Boss")),
            employee_row(8, "Bob", "Ray", None),
        ],
    )
}

fn no_employees() -> Table {
    Table::new(employee_labels(), Vec::new())
}

#[test]
fn to_object_builds_the_type_from_one_row() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(one_employee());
    let found = ds
        .get_by_key("Employee", 7)
        .unwrap()
        .to_object::<Employee>(RowOptions::default())
        .execute(&mut executor)
        .unwrap();
    assert_eq!(
        found,
        Some(Employee {
            employee_key: 7,
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            title: Some("Boss".into()),
        })
    );
    // The typed shape narrows the projection to the type's column mapping.
    assert!(executor.last_sql().contains("[FirstName]"));
    assert!(!executor.last_sql().contains("[CreatedDate]"));
}

#[test]
fn to_object_zero_rows_is_none_by_default() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(no_employees());
    let found = ds
        .get_by_key("Employee", 99)
        .unwrap()
        .to_object::<Employee>(RowOptions::default())
        .execute(&mut executor)
        .unwrap();
    assert_eq!(found, None);
}

#[test]
fn to_object_zero_rows_with_prevent_empty_is_missing_data() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(no_employees());
    let error = ds
        .get_by_key("Employee", 99)
        .unwrap()
        .to_object::<Employee>(RowOptions::default().prevent_empty_results())
        .execute(&mut executor)
        .unwrap_err();
    assert!(matches!(error, ChainError::MissingData { .. }));
}

#[test]
fn to_object_extra_rows_are_an_error_unless_discarded() {
    let ds = mssql();

    let mut executor = FakeExecutor::returning(two_employees());
    let error = ds
        .from("Employee")
        .unwrap()
        .to_object::<Employee>(RowOptions::default())
        .execute(&mut executor)
        .unwrap_err();
    assert!(matches!(error, ChainError::UnexpectedData { rows: 2, .. }));

    let mut executor = FakeExecutor::returning(two_employees());
    let first = ds
        .from("Employee")
        .unwrap()
        .to_object::<Employee>(RowOptions::default().discard_extra_rows())
        .execute(&mut executor)
        .unwrap();
    assert_eq!(first.unwrap().employee_key, 7);
}

#[test]
fn with_properties_narrows_the_requested_columns() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(one_employee());
    ds.get_by_key("Employee", 7)
        .unwrap()
        .to_object::<Employee>(RowOptions::default())
        .with_properties(&["FirstName", "LastName"])
        .execute(&mut executor)
        .unwrap();
    let sql = executor.last_sql();
    assert!(sql.contains("[FirstName]"));
    assert!(!sql.contains("[Title]"));
    // The key column always rides along.
    assert!(sql.contains("[EmployeeKey]"));
}

#[test]
fn except_properties_drops_the_named_columns() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(one_employee());
    ds.get_by_key("Employee", 7)
        .unwrap()
        .to_object::<Employee>(RowOptions::default())
        .except_properties(&["Title"])
        .execute(&mut executor)
        .unwrap();
    assert!(!executor.last_sql().contains("[Title]"));
}

#[test]
fn with_properties_rejects_a_column_the_type_does_not_map() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(one_employee());
    let error = ds
        .get_by_key("Employee", 7)
        .unwrap()
        .to_object::<Employee>(RowOptions::default())
        .with_properties(&["Salary"])
        .execute(&mut executor)
        .unwrap_err();
    assert!(matches!(error, ChainError::Mapping { .. }));
    // Nothing reached the backend.
    assert!(executor.captured.is_empty());
}

#[test]
fn to_collection_builds_every_row() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(two_employees());
    let all = ds
        .from("Employee")
        .unwrap()
        .to_collection::<Employee>()
        .execute(&mut executor)
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].first_name, "Bob");
    assert_eq!(all[1].title, None);
}

#[test]
fn to_row_hands_back_the_loose_row() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(one_employee());
    let row = ds
        .get_by_key("Employee", 7)
        .unwrap()
        .to_row(RowOptions::default())
        .execute(&mut executor)
        .unwrap()
        .unwrap();
    assert_eq!(row.get_as::<String>("LastName").unwrap(), "Lee");
}

#[test]
fn to_table_hands_back_the_full_result_set() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(two_employees());
    let table = ds
        .from("Employee")
        .unwrap()
        .to_table()
        .execute(&mut executor)
        .unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn to_value_of_reads_one_typed_column() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(one_employee());
    let key: i32 = ds
        .get_by_key("Employee", 7)
        .unwrap()
        .to_value_of("EmployeeKey")
        .execute(&mut executor)
        .unwrap();
    assert_eq!(key, 7);
}

#[test]
fn to_value_takes_the_first_column_of_a_raw_query() {
    let labels: RowNames = Arc::from(vec!["Count".to_string()]);
    let counts = Table::new(labels, vec![Box::new([Value::Int64(Some(42))]) as Box<[Value]>]);
    let ds = mssql();
    let mut executor = FakeExecutor::returning(counts);
    let count: i64 = ds
        .sql("SELECT COUNT(*) FROM [Employee]", args! {})
        .to_value()
        .execute(&mut executor)
        .unwrap();
    assert_eq!(count, 42);
}

#[test]
fn inserted_title_round_trips_through_a_reselect() {
    let ds = mssql();
    let title = Uuid::new_v4().to_string();

    let mut executor = FakeExecutor::affecting(1);
    ds.insert(
        "Employee",
        args! { "FirstName" => "Ann", "LastName" => "Lee", "Title" => title.as_str() },
    )
    .unwrap()
    .execute(&mut executor)
    .unwrap();
    let (_, parameters) = executor.captured.last().unwrap();
    let sent = parameters.iter().find(|p| p.name == "Title").unwrap();
    assert_eq!(sent.value, Value::Varchar(Some(title.clone())));

    let mut executor = FakeExecutor::returning(Table::new(
        employee_labels(),
        vec![employee_row(7, "Ann", "Lee", Some(&title))],
    ));
    let found = ds
        .from("Employee")
        .unwrap()
        .with_filter(args! { "Title" => title.as_str() }, FilterOptions::default())
        .to_object::<Employee>(RowOptions::default())
        .execute(&mut executor)
        .unwrap()
        .unwrap();
    assert_eq!(found.title.as_deref(), Some(title.as_str()));
    let (sql, parameters) = executor.captured.last().unwrap();
    assert!(sql.contains("WHERE [Title] = @Title"));
    assert_eq!(parameters[0].value, Value::Varchar(Some(title)));
}

#[test]
fn to_value_on_an_empty_result_is_missing_data() {
    let ds = mssql();
    let mut executor = FakeExecutor::returning(no_employees());
    let error = ds
        .get_by_key("Employee", 99)
        .unwrap()
        .to_value_of::<i32>("EmployeeKey")
        .execute(&mut executor)
        .unwrap_err();
    assert!(matches!(error, ChainError::MissingData { .. }));

    let mut executor = FakeExecutor::returning(no_employees());
    let none = ds
        .get_by_key("Employee", 99)
        .unwrap()
        .to_value_of::<i32>("EmployeeKey")
        .execute_or_null(&mut executor)
        .unwrap();
    assert_eq!(none, None);
}

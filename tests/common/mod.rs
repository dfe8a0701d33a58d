#![allow(dead_code)]

use keel::{
    ChainError, CommandText, Executor, FromRow, MetadataSource, ObjectName, RawColumn,
    RawTableOrView, Result, Row, RowNames, SqlParameter, Table, TableMapped, Value,
};
use log::LevelFilter;
use std::env;
use std::sync::Arc;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger.is_test(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Fixed catalog with an Employee table and a Sale table, parameterized on
/// native type spellings so one fixture serves every dialect.
pub struct FakeSource {
    objects: Vec<RawTableOrView>,
}

pub struct NativeTypes {
    pub int: &'static str,
    pub string: &'static str,
    pub timestamp: &'static str,
    pub boolean: &'static str,
}

pub const MSSQL_TYPES: NativeTypes = NativeTypes {
    int: "int",
    string: "nvarchar",
    timestamp: "datetime2",
    boolean: "bit",
};

pub const PG_TYPES: NativeTypes = NativeTypes {
    int: "int4",
    string: "varchar",
    timestamp: "timestamp",
    boolean: "bool",
};

pub const MYSQL_TYPES: NativeTypes = NativeTypes {
    int: "int",
    string: "varchar",
    timestamp: "datetime",
    boolean: "tinyint(1)",
};

pub const SQLITE_TYPES: NativeTypes = NativeTypes {
    int: "INTEGER",
    string: "TEXT",
    timestamp: "DATETIME",
    boolean: "BOOLEAN",
};

pub const ACCESS_TYPES: NativeTypes = NativeTypes {
    int: "INTEGER",
    string: "TEXT",
    timestamp: "DATETIME",
    boolean: "YESNO",
};

fn column(name: &str, native: &str, nullable: bool, pk: bool, identity: bool) -> RawColumn {
    RawColumn {
        name: name.to_string(),
        native_type: native.to_string(),
        is_nullable: nullable,
        is_primary_key: pk,
        is_identity: identity,
        max_length: None,
        precision: None,
        scale: None,
    }
}

impl FakeSource {
    pub fn new(types: NativeTypes) -> Self {
        let employee = RawTableOrView {
            name: ObjectName::new(None, "Employee"),
            is_table: true,
            columns: vec![
                column("EmployeeKey", types.int, false, true, true),
                column("FirstName", types.string, false, false, false),
                column("LastName", types.string, false, false, false),
                column("Title", types.string, true, false, false),
                column("CreatedDate", types.timestamp, true, false, false),
                column("UpdatedDate", types.timestamp, true, false, false),
                column("DeletedFlag", types.boolean, true, false, false),
            ],
        };
        let sale = RawTableOrView {
            name: ObjectName::new(None, "Sale"),
            is_table: true,
            columns: vec![
                column("SaleKey", types.int, false, true, true),
                column("EmployeeKey", types.int, false, false, false),
                column("Notes", types.string, true, false, false),
            ],
        };
        Self {
            objects: vec![employee, sale],
        }
    }
}

impl MetadataSource for FakeSource {
    fn fetch_object(&self, name: &ObjectName) -> Result<Option<RawTableOrView>> {
        Ok(self
            .objects
            .iter()
            .find(|o| o.name.name.eq_ignore_ascii_case(&name.name))
            .cloned())
    }

    fn list_objects(&self) -> Result<Vec<ObjectName>> {
        Ok(self.objects.iter().map(|o| o.name.clone()).collect())
    }
}

#[derive(Debug, PartialEq)]
pub struct Employee {
    pub employee_key: i32,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
}

impl FromRow for Employee {
    const COLUMNS: &'static [&'static str] = &["EmployeeKey", "FirstName", "LastName", "Title"];

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            employee_key: row.get_as("EmployeeKey")?,
            first_name: row.get_as("FirstName")?,
            last_name: row.get_as("LastName")?,
            title: row.get_opt("Title")?,
        })
    }
}

impl TableMapped for Employee {
    const TABLE: &'static str = "Employee";
}

pub fn employee_labels() -> RowNames {
    ["EmployeeKey", "FirstName", "LastName", "Title"]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .into()
}

pub fn employee_row(key: i32, first: &str, last: &str, title: Option<&str>) -> Box<[Value]> {
    Box::new([
        Value::Int32(Some(key)),
        Value::Varchar(Some(first.to_string())),
        Value::Varchar(Some(last.to_string())),
        Value::Varchar(title.map(Into::into)),
    ])
}

/// Scripted executor: hands back a preset result set or affected-row count
/// and records every command it sees.
pub struct FakeExecutor {
    result: Table,
    affected: u64,
    fail: Option<String>,
    pub captured: Vec<(String, Vec<SqlParameter>)>,
}

impl FakeExecutor {
    pub fn returning(result: Table) -> Self {
        Self {
            result,
            affected: 0,
            fail: None,
            captured: Vec::new(),
        }
    }

    pub fn affecting(affected: u64) -> Self {
        Self {
            result: Table::empty(Arc::from(Vec::<String>::new())),
            affected,
            fail: None,
            captured: Vec::new(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Table::empty(Arc::from(Vec::<String>::new())),
            affected: 0,
            fail: Some(message.to_string()),
            captured: Vec::new(),
        }
    }

    pub fn last_sql(&self) -> &str {
        self.captured
            .last()
            .map(|(sql, _)| sql.as_str())
            .unwrap_or("")
    }

    fn record(&mut self, command: &CommandText<'_>) -> Result<()> {
        self.captured
            .push((command.sql.to_string(), command.parameters.to_vec()));
        match &self.fail {
            Some(message) => Err(ChainError::Execution {
                operation: "execute",
                target: "fake".into(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Executor for FakeExecutor {
    fn query(&mut self, command: CommandText<'_>) -> Result<Table> {
        self.record(&command)?;
        Ok(self.result.clone())
    }

    fn execute(&mut self, command: CommandText<'_>) -> Result<u64> {
        self.record(&command)?;
        Ok(self.affected)
    }
}

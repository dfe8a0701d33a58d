use keel_core::{
    ChainError, CommandText, CommandType, Executor, MetadataSource, ObjectName, RawColumn,
    RawTableOrView, Result, Row, SqlParameter, Value,
};
use std::sync::Mutex;

/// Object existence and kind, from the schema table.
pub const KIND_SQL: &str = "SELECT type FROM sqlite_schema
WHERE name = @Name AND type IN ('table', 'view')";

/// Column descriptions through the pragma table-valued function.
pub const OBJECT_SQL: &str = "SELECT name AS column_name,
       type AS native_type,
       \"notnull\" = 0 AS is_nullable,
       pk > 0 AS is_primary_key
FROM pragma_table_info(@Name)
ORDER BY cid";

pub const LIST_SQL: &str = "SELECT name FROM sqlite_schema
WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
ORDER BY name";

fn flag(row: &Row, label: &str) -> bool {
    match row.get(label) {
        Some(Value::Boolean(Some(v))) => *v,
        Some(Value::Int64(Some(v))) => *v != 0,
        Some(Value::Int32(Some(v))) => *v != 0,
        _ => false,
    }
}

/// Catalog reader backed by any SQLite executor. SQLite has no schemas, so
/// qualified names only ever match their bare part.
pub struct SqliteCatalog<E> {
    executor: Mutex<E>,
}

impl<E: Executor> SqliteCatalog<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Mutex::new(executor),
        }
    }
}

impl<E: Executor + Send> MetadataSource for SqliteCatalog<E> {
    fn fetch_object(&self, name: &ObjectName) -> Result<Option<RawTableOrView>> {
        let parameters = [SqlParameter {
            name: "Name".into(),
            value: Value::Varchar(Some(name.name.clone())),
        }];
        let mut executor = self.executor.lock().map_err(poisoned)?;
        let kinds = executor.query(CommandText {
            sql: KIND_SQL,
            parameters: &parameters,
            command_type: CommandType::Text,
        })?;
        let Some(kind_row) = kinds.rows().first() else {
            return Ok(None);
        };
        let is_table = kind_row.get_as::<String>("type")? == "table";
        let table = executor.query(CommandText {
            sql: OBJECT_SQL,
            parameters: &parameters,
            command_type: CommandType::Text,
        })?;
        let mut columns = Vec::with_capacity(table.len());
        for row in table.rows() {
            let native_type: String = row.get_as("native_type")?;
            let is_primary_key = flag(row, "is_primary_key");
            // An INTEGER primary key is a rowid alias and auto-assigns.
            let is_identity =
                is_table && is_primary_key && native_type.eq_ignore_ascii_case("integer");
            columns.push(RawColumn {
                name: row.get_as("column_name")?,
                native_type,
                is_nullable: flag(row, "is_nullable"),
                is_primary_key,
                is_identity,
                max_length: None,
                precision: None,
                scale: None,
            });
        }
        Ok(Some(RawTableOrView {
            name: ObjectName::new(None, &name.name),
            is_table,
            columns,
        }))
    }

    fn list_objects(&self) -> Result<Vec<ObjectName>> {
        let mut executor = self.executor.lock().map_err(poisoned)?;
        let table = executor.query(CommandText {
            sql: LIST_SQL,
            parameters: &[],
            command_type: CommandType::Text,
        })?;
        table
            .rows()
            .iter()
            .map(|row| Ok(ObjectName::new(None, &row.get_as::<String>("name")?)))
            .collect()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ChainError {
    ChainError::Execution {
        operation: "metadata",
        target: "catalog".into(),
        message: "catalog executor lock poisoned".into(),
    }
}

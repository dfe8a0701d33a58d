use keel_core::{
    ChainError, CommandText, CommandType, Executor, MetadataSource, ObjectName, RawColumn,
    RawTableOrView, Result, Row, SqlParameter, Value,
};
use std::sync::Mutex;

/// Column description query against information_schema. `column_type` keeps
/// the display width so `tinyint(1)` can map to boolean.
pub const OBJECT_SQL: &str = "SELECT c.COLUMN_NAME AS column_name,
       c.COLUMN_TYPE AS native_type,
       c.IS_NULLABLE = 'YES' AS is_nullable,
       c.COLUMN_KEY = 'PRI' AS is_primary_key,
       c.EXTRA LIKE '%auto_increment%' AS is_identity,
       c.CHARACTER_MAXIMUM_LENGTH AS max_length,
       c.NUMERIC_PRECISION AS `precision`,
       c.NUMERIC_SCALE AS scale,
       t.TABLE_TYPE = 'BASE TABLE' AS is_table
FROM information_schema.COLUMNS c
JOIN information_schema.TABLES t
  ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
WHERE c.TABLE_SCHEMA = COALESCE(@Schema, DATABASE()) AND c.TABLE_NAME = @Name
ORDER BY c.ORDINAL_POSITION";

pub const LIST_SQL: &str = "SELECT TABLE_NAME AS table_name
FROM information_schema.TABLES
WHERE TABLE_SCHEMA = DATABASE()
ORDER BY TABLE_NAME";

fn flag(row: &Row, label: &str) -> bool {
    match row.get(label) {
        Some(Value::Boolean(Some(v))) => *v,
        Some(Value::Int16(Some(v))) => *v != 0,
        Some(Value::Int32(Some(v))) => *v != 0,
        Some(Value::Int64(Some(v))) => *v != 0,
        _ => false,
    }
}

/// Catalog reader backed by any MySQL executor. Unqualified names resolve
/// against the connection's current database.
pub struct MySqlCatalog<E> {
    executor: Mutex<E>,
}

impl<E: Executor> MySqlCatalog<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Mutex::new(executor),
        }
    }
}

impl<E: Executor + Send> MetadataSource for MySqlCatalog<E> {
    fn fetch_object(&self, name: &ObjectName) -> Result<Option<RawTableOrView>> {
        let parameters = [
            SqlParameter {
                name: "Schema".into(),
                value: match &name.schema {
                    Some(schema) => Value::Varchar(Some(schema.clone())),
                    None => Value::Varchar(None),
                },
            },
            SqlParameter {
                name: "Name".into(),
                value: Value::Varchar(Some(name.name.clone())),
            },
        ];
        let mut executor = self.executor.lock().map_err(poisoned)?;
        let table = executor.query(CommandText {
            sql: OBJECT_SQL,
            parameters: &parameters,
            command_type: CommandType::Text,
        })?;
        if table.is_empty() {
            return Ok(None);
        }
        let mut columns = Vec::with_capacity(table.len());
        let mut is_table = false;
        for row in table.rows() {
            is_table = flag(row, "is_table");
            columns.push(RawColumn {
                name: row.get_as("column_name")?,
                native_type: row.get_as("native_type")?,
                is_nullable: flag(row, "is_nullable"),
                is_primary_key: flag(row, "is_primary_key"),
                is_identity: flag(row, "is_identity"),
                max_length: row.get_opt::<i64>("max_length")?.map(|v| v.max(0) as u32),
                precision: row.get_opt::<i64>("precision")?.map(|v| v as u8),
                scale: row.get_opt::<i64>("scale")?.map(|v| v as u8),
            });
        }
        Ok(Some(RawTableOrView {
            name: name.clone(),
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
            .map(|row| Ok(ObjectName::new(None, &row.get_as::<String>("table_name")?)))
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

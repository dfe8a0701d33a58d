use keel_core::{
    ChainError, CommandText, CommandType, Executor, MetadataSource, ObjectName, RawColumn,
    RawTableOrView, Result, Row, SqlParameter, Value,
};
use std::sync::Mutex;

/// Column description query against information_schema plus pg_index for the
/// primary key flag.
pub const OBJECT_SQL: &str = "SELECT c.column_name,
       c.udt_name AS native_type,
       c.is_nullable = 'YES' AS is_nullable,
       c.is_identity = 'YES' OR c.column_default LIKE 'nextval(%' AS is_identity,
       c.character_maximum_length AS max_length,
       c.numeric_precision AS precision,
       c.numeric_scale AS scale,
       COALESCE(a.attnum IS NOT NULL, false) AS is_primary_key,
       t.table_type = 'BASE TABLE' AS is_table
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema AND t.table_name = c.table_name
LEFT JOIN pg_index i
  ON i.indrelid = format('%I.%I', c.table_schema, c.table_name)::regclass
 AND i.indisprimary
LEFT JOIN pg_attribute a
  ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) AND a.attname = c.column_name
WHERE c.table_schema = @Schema AND c.table_name = @Name
ORDER BY c.ordinal_position";

pub const LIST_SQL: &str = "SELECT table_schema, table_name
FROM information_schema.tables
WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
ORDER BY table_schema, table_name";

const DEFAULT_SCHEMA: &str = "public";

fn flag(row: &Row, label: &str) -> bool {
    matches!(row.get(label), Some(Value::Boolean(Some(true))))
}

/// Catalog reader backed by any PostgreSQL executor. Unqualified names are
/// resolved against `public`.
pub struct PostgresCatalog<E> {
    executor: Mutex<E>,
}

impl<E: Executor> PostgresCatalog<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Mutex::new(executor),
        }
    }
}

impl<E: Executor + Send> MetadataSource for PostgresCatalog<E> {
    fn fetch_object(&self, name: &ObjectName) -> Result<Option<RawTableOrView>> {
        let schema = name.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        let parameters = [
            SqlParameter {
                name: "Schema".into(),
                value: Value::Varchar(Some(schema.into())),
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
            name: ObjectName::new(Some(schema), &name.name),
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
            .map(|row| {
                let schema: String = row.get_as("table_schema")?;
                let name: String = row.get_as("table_name")?;
                Ok(ObjectName::new(Some(&schema), &name))
            })
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

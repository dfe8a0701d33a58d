use keel_core::{
    CommandText, CommandType, Executor, MetadataSource, ObjectName, RawColumn, RawTableOrView,
    Result, Row, SqlParameter, Value,
};
use std::sync::Mutex;

/// Column description query against the sys catalog views.
/// One row per column; flags come back as BIT.
pub const OBJECT_SQL: &str = "SELECT c.name AS column_name,
       t.name AS native_type,
       c.is_nullable,
       c.is_identity,
       c.max_length,
       c.precision,
       c.scale,
       CAST(CASE WHEN ic.column_id IS NOT NULL THEN 1 ELSE 0 END AS BIT) AS is_primary_key,
       CAST(CASE WHEN o.type = 'U' THEN 1 ELSE 0 END AS BIT) AS is_table
FROM sys.columns c
JOIN sys.objects o ON o.object_id = c.object_id
JOIN sys.schemas s ON s.schema_id = o.schema_id
JOIN sys.types t ON t.user_type_id = c.user_type_id
LEFT JOIN sys.indexes i ON i.object_id = o.object_id AND i.is_primary_key = 1
LEFT JOIN sys.index_columns ic ON ic.object_id = o.object_id
    AND ic.index_id = i.index_id AND ic.column_id = c.column_id
WHERE s.name = @Schema AND o.name = @Name AND o.type IN ('U', 'V')
ORDER BY c.column_id";

pub const LIST_SQL: &str = "SELECT s.name AS schema_name, o.name AS object_name
FROM sys.objects o
JOIN sys.schemas s ON s.schema_id = o.schema_id
WHERE o.type IN ('U', 'V')
ORDER BY s.name, o.name";

const DEFAULT_SCHEMA: &str = "dbo";

fn flag(row: &Row, label: &str) -> bool {
    match row.get(label) {
        Some(Value::Boolean(Some(v))) => *v,
        Some(Value::Int16(Some(v))) => *v != 0,
        Some(Value::Int32(Some(v))) => *v != 0,
        Some(Value::Int64(Some(v))) => *v != 0,
        _ => false,
    }
}

/// Catalog reader backed by any SQL Server executor. Unqualified names are
/// resolved against `dbo`, matching the server's own default.
pub struct SqlServerCatalog<E> {
    executor: Mutex<E>,
}

impl<E: Executor> SqlServerCatalog<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Mutex::new(executor),
        }
    }
}

impl<E: Executor + Send> MetadataSource for SqlServerCatalog<E> {
    fn fetch_object(&self, name: &ObjectName) -> Result<Option<RawTableOrView>> {
        let schema = name.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        let parameters = [
            SqlParameter {
                name: "Schema".into(),
                value: Value::Varchar(Some(schema.into())),
            },
            SqlParameter {
                name: "Name".into(),
                value: Value::Varchar(Some(name.name.clone().into())),
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
                max_length: row.get_opt::<i32>("max_length")?.map(|v| v.max(0) as u32),
                precision: row.get_opt::<i16>("precision")?.map(|v| v as u8),
                scale: row.get_opt::<i16>("scale")?.map(|v| v as u8),
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
                let schema: String = row.get_as("schema_name")?;
                let name: String = row.get_as("object_name")?;
                Ok(ObjectName::new(Some(&schema), &name))
            })
            .collect()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> keel_core::ChainError {
    keel_core::ChainError::Execution {
        operation: "metadata",
        target: "catalog".into(),
        message: "catalog executor lock poisoned".into(),
    }
}

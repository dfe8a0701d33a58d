use crate::Value;
use std::{fmt, sync::Arc};

/// A value injected into matching columns right before a command is rendered,
/// typically created/updated timestamps or user stamps. The closure runs once
/// per prepare.
#[derive(Clone)]
pub struct ColumnStamp {
    pub column: String,
    pub value: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl ColumnStamp {
    pub fn new(column: impl Into<String>, value: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self {
            column: column.into(),
            value: Arc::new(value),
        }
    }
}

impl fmt::Debug for ColumnStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnStamp")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Soft-delete convention: "deleted" rows carry `deleted_value` in `column`
/// and are filtered out of every read by an injected predicate; deletes can be
/// rewritten into updates that set the flag.
#[derive(Debug, Clone)]
pub struct SoftDeleteRule {
    pub column: String,
    pub deleted_value: Value,
}

impl SoftDeleteRule {
    pub fn new(column: impl Into<String>, deleted_value: impl crate::IntoValue) -> Self {
        Self {
            column: column.into(),
            deleted_value: deleted_value.into_value(),
        }
    }
}

/// Pre-execution value injection and soft-delete filtering consumed by the SQL
/// builder. The rules themselves are configuration; the core only applies
/// them.
#[derive(Debug, Clone, Default)]
pub struct AuditRules {
    pub(crate) insert_stamps: Vec<ColumnStamp>,
    pub(crate) update_stamps: Vec<ColumnStamp>,
    pub(crate) soft_delete: Option<SoftDeleteRule>,
}

impl AuditRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `column` with `value()` on every insert.
    pub fn stamp_on_insert(
        mut self,
        column: impl Into<String>,
        value: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.insert_stamps.push(ColumnStamp::new(column, value));
        self
    }

    /// Stamp `column` with `value()` on every update.
    pub fn stamp_on_update(
        mut self,
        column: impl Into<String>,
        value: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.update_stamps.push(ColumnStamp::new(column, value));
        self
    }

    pub fn with_soft_delete(mut self, rule: SoftDeleteRule) -> Self {
        self.soft_delete = Some(rule);
        self
    }

    pub fn soft_delete(&self) -> Option<&SoftDeleteRule> {
        self.soft_delete.as_ref()
    }
}

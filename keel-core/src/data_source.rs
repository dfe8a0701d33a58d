use crate::{
    Arguments, AuditRules, DeleteCommand, DeleteManyCommand, Dialect, ExecutionListener,
    InsertCommand, IntoValue, ListenerRegistry, MetadataCache, MetadataSource, ProcedureCall,
    Result, SourceContext, SqlCall, TableFunctionQuery, TableQuery, Tracked, UpdateCommand,
    UpdateSetCommand, UpsertCommand, Value,
};
use std::sync::Arc;

/// The root of a fluent chain: one backend's dialect, its metadata cache, the
/// audit rules applied to every write and the listeners notified of every
/// execution. Command builders borrow from it; nothing here talks to the
/// database except through the metadata source.
pub struct DataSource<S: MetadataSource> {
    name: String,
    metadata: MetadataCache<S>,
    audit: AuditRules,
    listeners: ListenerRegistry,
}

impl<S: MetadataSource> DataSource<S> {
    pub fn new(name: impl Into<String>, dialect: &'static dyn Dialect, source: S) -> Self {
        Self {
            name: name.into(),
            metadata: MetadataCache::new(source, dialect),
            audit: AuditRules::default(),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Schema tried when an unqualified name misses the cache and the catalog.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.metadata = self.metadata.with_default_schema(schema);
        self
    }

    pub fn with_audit_rules(mut self, audit: AuditRules) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ExecutionListener>) -> Self {
        self.listeners.register(listener);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.metadata.dialect()
    }

    pub fn metadata(&self) -> &MetadataCache<S> {
        &self.metadata
    }

    fn context(&self) -> SourceContext<'_> {
        SourceContext {
            data_source: &self.name,
            dialect: self.metadata.dialect(),
            audit: &self.audit,
            listeners: &self.listeners,
        }
    }

    /// Start a query against a table or view.
    pub fn from(&self, table: &str) -> Result<TableQuery<'_>> {
        Ok(TableQuery::new(
            self.context(),
            self.metadata.get_table_or_view(table)?,
        ))
    }

    /// Fetch by single-column primary key.
    pub fn get_by_key(&self, table: &str, key: impl IntoValue) -> Result<TableQuery<'_>> {
        self.get_by_keys(table, vec![key.into_value()])
    }

    /// Fetch by composite primary key; values in key-column order.
    pub fn get_by_keys(&self, table: &str, keys: Vec<Value>) -> Result<TableQuery<'_>> {
        Ok(TableQuery::by_keys(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            keys,
        ))
    }

    pub fn insert(&self, table: &str, values: Arguments) -> Result<InsertCommand<'_>> {
        Ok(InsertCommand::new(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            values,
        ))
    }

    pub fn update(&self, table: &str, values: Arguments) -> Result<UpdateCommand<'_>> {
        Ok(UpdateCommand::new(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            values,
        ))
    }

    /// Update only the fields mutated since the snapshot was taken.
    pub fn update_tracked(&self, table: &str, tracked: &Tracked) -> Result<UpdateCommand<'_>> {
        Ok(UpdateCommand::from_tracked(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            tracked,
        ))
    }

    pub fn upsert(&self, table: &str, values: Arguments) -> Result<UpsertCommand<'_>> {
        Ok(UpsertCommand::new(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            values,
        ))
    }

    /// Delete one row whose key columns appear in `args`.
    pub fn delete(&self, table: &str, args: Arguments) -> Result<DeleteCommand<'_>> {
        Ok(DeleteCommand::by_arguments(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            args,
        ))
    }

    pub fn delete_by_key(&self, table: &str, key: impl IntoValue) -> Result<DeleteCommand<'_>> {
        Ok(DeleteCommand::by_keys(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            vec![key.into_value()],
        ))
    }

    pub fn delete_with_filter(&self, table: &str) -> Result<DeleteManyCommand<'_>> {
        Ok(DeleteManyCommand::new(
            self.context(),
            self.metadata.get_table_or_view(table)?,
        ))
    }

    pub fn update_set(&self, table: &str, new_values: Arguments) -> Result<UpdateSetCommand<'_>> {
        Ok(UpdateSetCommand::new(
            self.context(),
            self.metadata.get_table_or_view(table)?,
            new_values,
        ))
    }

    pub fn procedure(&self, name: &str, args: Arguments) -> ProcedureCall<'_> {
        ProcedureCall::new(self.context(), name, args)
    }

    pub fn table_function(&self, name: &str, args: Arguments) -> TableFunctionQuery<'_> {
        TableFunctionQuery::new(self.context(), name, args)
    }

    /// Escape hatch: caller-authored SQL through the same execution pipeline.
    pub fn sql(&self, text: impl Into<String>, args: Arguments) -> SqlCall<'_> {
        SqlCall::new(self.context(), text, args)
    }
}

use crate::{
    Arguments, ChainError, ColumnStamp, Dialect, FilterOptions, IdentityInsertStyle, InsertOptions,
    LimitPlan, Result, ReturningStyle, SoftDeleteRule, TableOrViewMetadata, UpdateOptions,
    UpsertStyle, Value,
    util::separated_by,
};

/// The column set a materializer wants fetched.
#[derive(Debug, Clone, Copy)]
pub enum DesiredColumns<'a> {
    /// Every column of the table or view.
    All,
    /// No result set expected; the command only reports affected rows.
    None,
    /// An explicit projection. Primary key columns are added back even when
    /// the list omits them, so row identity is always retrievable.
    List(&'a [&'a str]),
}

/// One named parameter of a rendered command, in SQL appearance order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

/// One sort term of an ORDER BY list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortExpression {
    pub column: String,
    pub descending: bool,
}

impl SortExpression {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

impl From<&str> for SortExpression {
    fn from(column: &str) -> Self {
        SortExpression::asc(column)
    }
}

/// One column's participation state for a single render pass.
#[derive(Debug, Default, Clone)]
struct SqlBuilderEntry {
    use_for_select: bool,
    use_for_insert: bool,
    use_for_update: bool,
    is_key: bool,
    use_for_filter: bool,
    value: Option<Value>,
}

/// Per-invocation SQL assembler: a fresh entry per column, role flags set by
/// the `apply_*` methods, fragments rendered by the `render_*` methods.
/// Parameters are collected in the order their placeholders are written, so
/// positional dialects stay correct for free.
///
/// Never reused across prepares; command builders construct one per call.
pub struct SqlBuilder<'a> {
    table: &'a TableOrViewMetadata,
    dialect: &'a dyn Dialect,
    operation: &'static str,
    entries: Vec<SqlBuilderEntry>,
    parameters: Vec<SqlParameter>,
    filter_options: FilterOptions,
    // Column indexes in the order the filter supplied them, so the predicate
    // reads in the caller's order rather than the table's.
    filter_order: Vec<usize>,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(
        table: &'a TableOrViewMetadata,
        dialect: &'a dyn Dialect,
        operation: &'static str,
    ) -> Self {
        Self {
            table,
            dialect,
            operation,
            entries: vec![SqlBuilderEntry::default(); table.columns.len()],
            parameters: Vec::new(),
            filter_options: FilterOptions::default(),
            filter_order: Vec::new(),
        }
    }

    /// Guard against double-binding the same named parameter from two
    /// independently supplied argument sources. Names compare
    /// case-insensitively; the first collision fails the prepare.
    pub fn check_for_overlaps(
        first: &Arguments,
        second: &Arguments,
        context: &str,
    ) -> Result<()> {
        for name in first.names() {
            if second.contains(name) {
                return Err(ChainError::validation(format!(
                    "the parameter \"{}\" appears in both argument sources of {}; \
                     rename one side to avoid binding it twice",
                    name, context
                )));
            }
        }
        Ok(())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.table.columns.iter().position(|c| c.matches(name))
    }

    /// Assign insert values from an argument set. Identity columns are
    /// silently dropped unless `identity_insert` asks for an explicit value;
    /// argument names with no matching column are ignored (loose binding, as
    /// views and projections routinely carry extra fields).
    pub fn apply_insert_values(
        &mut self,
        args: &Arguments,
        options: InsertOptions,
    ) -> Result<()> {
        if options.identity_insert
            && self.dialect.identity_insert_style() == IdentityInsertStyle::Unsupported
        {
            return Err(ChainError::validation(format!(
                "{} does not support identity insert",
                self.dialect.name()
            )));
        }
        for (name, value) in args {
            let Some(index) = self.column_index(name) else {
                log::debug!("{}: no column matches argument \"{}\"", self.operation, name);
                continue;
            };
            if self.table.columns[index].is_identity && !options.identity_insert {
                continue;
            }
            let entry = &mut self.entries[index];
            entry.use_for_insert = true;
            entry.value = Some(value.clone());
        }
        if !self.entries.iter().any(|e| e.use_for_insert) {
            return Err(ChainError::validation(format!(
                "{}: no argument matched an insertable column of {}",
                self.operation, self.table.name
            )));
        }
        Ok(())
    }

    /// Assign update SET values and key-match values from one argument set.
    /// Keys default to the table's primary key; `use_key_attribute` switches
    /// to the caller-designated `key_columns`. Identity columns are never
    /// updated.
    pub fn apply_update_values(
        &mut self,
        args: &Arguments,
        options: UpdateOptions,
        key_columns: Option<&[String]>,
    ) -> Result<()> {
        let keys: Vec<usize> = if options.use_key_attribute {
            let Some(names) = key_columns else {
                return Err(ChainError::validation(format!(
                    "{}: use_key_attribute requires key columns to be designated",
                    self.operation
                )));
            };
            names
                .iter()
                .map(|name| {
                    self.column_index(name).ok_or_else(|| {
                        ChainError::validation(format!(
                            "{}: designated key \"{}\" is not a column of {}",
                            self.operation, name, self.table.name
                        ))
                    })
                })
                .collect::<Result<_>>()?
        } else {
            self.table
                .columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.is_primary_key)
                .map(|(i, _)| i)
                .collect()
        };
        if keys.is_empty() {
            return Err(ChainError::validation(format!(
                "{}: {} has no primary key to match rows on",
                self.operation, self.table.name
            )));
        }
        for (name, value) in args {
            let Some(index) = self.column_index(name) else {
                log::debug!("{}: no column matches argument \"{}\"", self.operation, name);
                continue;
            };
            let entry = &mut self.entries[index];
            if keys.contains(&index) {
                entry.is_key = true;
            } else if self.table.columns[index].is_identity {
                continue;
            } else {
                entry.use_for_update = true;
            }
            entry.value = Some(value.clone());
        }
        for index in keys {
            if !self.entries[index].is_key {
                return Err(ChainError::validation(format!(
                    "{}: missing a value for key column \"{}\"",
                    self.operation, self.table.columns[index].sql_name
                )));
            }
        }
        if !self.entries.iter().any(|e| e.use_for_update) {
            return Err(ChainError::validation(format!(
                "{}: nothing to update on {}",
                self.operation, self.table.name
            )));
        }
        Ok(())
    }

    /// Assign SET values without any key matching, for set-based updates whose
    /// row scope comes from a filter instead. Identity and primary key columns
    /// are never updated.
    pub fn apply_set_values(&mut self, args: &Arguments) -> Result<()> {
        for (name, value) in args {
            let Some(index) = self.column_index(name) else {
                log::debug!("{}: no column matches argument \"{}\"", self.operation, name);
                continue;
            };
            let column = &self.table.columns[index];
            if column.is_identity || column.is_primary_key {
                continue;
            }
            let entry = &mut self.entries[index];
            entry.use_for_update = true;
            entry.value = Some(value.clone());
        }
        if !self.entries.iter().any(|e| e.use_for_update) {
            return Err(ChainError::validation(format!(
                "{}: nothing to update on {}",
                self.operation, self.table.name
            )));
        }
        Ok(())
    }

    /// Bind values positionally against the table's primary key, for
    /// get-by-key and delete-by-key.
    pub fn apply_key_values(&mut self, keys: &[Value]) -> Result<()> {
        let pk: Vec<usize> = self
            .table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary_key)
            .map(|(i, _)| i)
            .collect();
        if pk.is_empty() {
            return Err(ChainError::validation(format!(
                "{}: {} has no primary key",
                self.operation, self.table.name
            )));
        }
        if pk.len() != keys.len() {
            return Err(ChainError::validation(format!(
                "{}: {} expects {} key values, got {}",
                self.operation,
                self.table.name,
                pk.len(),
                keys.len()
            )));
        }
        for (index, value) in pk.into_iter().zip(keys) {
            let entry = &mut self.entries[index];
            entry.is_key = true;
            entry.value = Some(value.clone());
        }
        Ok(())
    }

    /// Bind key-match values by name from an argument set; every primary key
    /// column must be present.
    pub fn apply_key_arguments(&mut self, args: &Arguments) -> Result<()> {
        let mut any = false;
        for (index, column) in self.table.columns.iter().enumerate() {
            if !column.is_primary_key {
                continue;
            }
            any = true;
            let value = args
                .get(&column.sql_name)
                .or_else(|| args.get(&column.rust_name))
                .ok_or_else(|| {
                    ChainError::validation(format!(
                        "{}: missing a value for key column \"{}\"",
                        self.operation, column.sql_name
                    ))
                })?;
            let entry = &mut self.entries[index];
            entry.is_key = true;
            entry.value = Some(value.clone());
        }
        if !any {
            return Err(ChainError::validation(format!(
                "{}: {} has no primary key",
                self.operation, self.table.name
            )));
        }
        Ok(())
    }

    /// Narrow the SELECT projection. Columns whose native type has no host
    /// mapping are excluded from `All` typed projections only when requested
    /// explicitly; an explicit request for one is a mapping error.
    pub fn apply_desired_columns(&mut self, desired: DesiredColumns<'_>) -> Result<()> {
        match desired {
            DesiredColumns::All => {
                for entry in &mut self.entries {
                    entry.use_for_select = true;
                }
            }
            DesiredColumns::None => {}
            DesiredColumns::List(names) => {
                for name in names {
                    let Some(index) = self.column_index(name) else {
                        return Err(ChainError::mapping(format!(
                            "{}: requested column \"{}\" does not exist on {}",
                            self.operation, name, self.table.name
                        )));
                    };
                    if self.table.columns[index].mapped_kind.is_none() {
                        return Err(ChainError::mapping(format!(
                            "{}: column \"{}\" has unmapped native type \"{}\" and is not \
                             available for typed materialization",
                            self.operation, name, self.table.columns[index].native_type
                        )));
                    }
                    self.entries[index].use_for_select = true;
                }
                // Row identity must always be retrievable.
                if self.entries.iter().any(|e| e.use_for_select) {
                    for (index, column) in self.table.columns.iter().enumerate() {
                        if column.is_primary_key {
                            self.entries[index].use_for_select = true;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Register an AND-joined equality filter. Unlike insert/update argument
    /// binding, a filter name with no matching column is an error; a silent
    /// skip would silently widen the match.
    pub fn apply_filter_value(&mut self, filter: &Arguments, options: FilterOptions) -> Result<()> {
        if filter.is_empty() {
            return Err(ChainError::validation(format!(
                "{}: the filter has no fields",
                self.operation
            )));
        }
        for (name, value) in filter {
            let Some(index) = self.column_index(name) else {
                return Err(ChainError::validation(format!(
                    "{}: filter references \"{}\" which is not a column of {}",
                    self.operation, name, self.table.name
                )));
            };
            let entry = &mut self.entries[index];
            if !entry.use_for_filter {
                self.filter_order.push(index);
            }
            entry.use_for_filter = true;
            entry.value = Some(value.clone());
        }
        self.filter_options = options;
        Ok(())
    }

    /// Inject audit stamp values, overriding anything the caller supplied for
    /// the same columns. Stamps naming columns the table does not have are
    /// skipped.
    pub fn apply_stamps(&mut self, stamps: &[ColumnStamp], for_insert: bool) {
        for stamp in stamps {
            let Some(index) = self.column_index(&stamp.column) else {
                continue;
            };
            let entry = &mut self.entries[index];
            if for_insert {
                entry.use_for_insert = true;
            } else {
                entry.use_for_update = true;
            }
            entry.value = Some((stamp.value)());
        }
    }

    fn push_parameter(&mut self, out: &mut String, name: &str, value: Value) {
        let unique = if self.parameters.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
            format!("{}_filter", name)
        } else {
            name.to_string()
        };
        self.dialect
            .write_parameter(out, &unique, self.parameters.len());
        self.parameters.push(SqlParameter {
            name: unique,
            value,
        });
    }

    /// `SELECT <projection>` with the dialect's prefix-style limit (TOP)
    /// spliced in when one applies.
    pub fn render_select_clause(&mut self, out: &mut String, limits: Option<&LimitPlan>) {
        out.push_str("SELECT ");
        if let Some(limits) = limits {
            self.dialect.write_limit_before_columns(out, limits);
        }
        let selected: Vec<&str> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.use_for_select)
            .map(|(i, _)| self.table.columns[i].quoted_sql_name.as_str())
            .collect();
        if selected.is_empty() {
            out.push('*');
        } else {
            separated_by(out, selected, |out, v| out.push_str(v), ", ");
        }
    }

    /// Full INSERT statement. Entries flagged for select become the
    /// RETURNING / OUTPUT list where the dialect has one.
    pub fn render_insert_statement(
        &mut self,
        out: &mut String,
        options: InsertOptions,
    ) -> Result<()> {
        self.render_insert_core(out, options, true)
    }

    fn render_insert_core(
        &mut self,
        out: &mut String,
        options: InsertOptions,
        with_returning: bool,
    ) -> Result<()> {
        let inserted: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.use_for_insert)
            .map(|(i, _)| i)
            .collect();
        debug_assert!(!inserted.is_empty(), "apply_insert_values validates this");
        out.push_str("INSERT INTO ");
        out.push_str(&self.table.quoted_name);
        out.push_str(" (");
        separated_by(
            out,
            &inserted,
            |out, i| out.push_str(&self.table.columns[*i].quoted_sql_name),
            ", ",
        );
        out.push(')');
        let returning: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.use_for_select)
            .map(|(i, _)| i)
            .collect();
        if with_returning
            && !returning.is_empty()
            && self.dialect.returning_style() == ReturningStyle::Output
        {
            out.push_str("\nOUTPUT ");
            separated_by(
                out,
                &returning,
                |out, i| {
                    out.push_str("Inserted.");
                    out.push_str(&self.table.columns[*i].quoted_sql_name);
                },
                ", ",
            );
        }
        if options.identity_insert
            && self.dialect.identity_insert_style() == IdentityInsertStyle::Overriding
        {
            out.push_str("\nOVERRIDING SYSTEM VALUE");
        }
        out.push_str("\nVALUES (");
        for (position, index) in inserted.iter().enumerate() {
            if position > 0 {
                out.push_str(", ");
            }
            let name = self.table.columns[*index].sql_name.clone();
            let value = self.entries[*index].value.clone().unwrap_or_default();
            self.push_parameter(out, &name, value);
        }
        out.push(')');
        if with_returning
            && !returning.is_empty()
            && self.dialect.returning_style() == ReturningStyle::Returning
        {
            out.push_str("\nRETURNING ");
            separated_by(
                out,
                &returning,
                |out, i| out.push_str(&self.table.columns[*i].quoted_sql_name),
                ", ",
            );
        }
        Ok(())
    }

    /// Insert-or-update in the dialect's native shape. The insert-flagged
    /// entries drive both halves: primary key columns become the match
    /// condition, the rest become the update assignments.
    pub fn render_upsert_statement(
        &mut self,
        out: &mut String,
        options: InsertOptions,
    ) -> Result<()> {
        let pk: Vec<usize> = self
            .table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary_key)
            .map(|(i, _)| i)
            .collect();
        if pk.is_empty() {
            return Err(ChainError::validation(format!(
                "{}: {} has no primary key to match on",
                self.operation, self.table.name
            )));
        }
        for index in &pk {
            if !self.entries[*index].use_for_insert {
                return Err(ChainError::validation(format!(
                    "{}: missing a value for key column \"{}\"",
                    self.operation, self.table.columns[*index].sql_name
                )));
            }
        }
        let inserted: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.use_for_insert)
            .map(|(i, _)| i)
            .collect();
        let updated: Vec<usize> = inserted
            .iter()
            .copied()
            .filter(|i| !pk.contains(i) && !self.table.columns[*i].is_identity)
            .collect();
        match self.dialect.upsert_style() {
            UpsertStyle::Unsupported => Err(ChainError::validation(format!(
                "{} does not support upsert",
                self.dialect.name()
            ))),
            UpsertStyle::OnConflict => {
                self.render_insert_core(out, options, false)?;
                out.push_str("\nON CONFLICT (");
                separated_by(
                    out,
                    &pk,
                    |out, i| out.push_str(&self.table.columns[*i].quoted_sql_name),
                    ", ",
                );
                out.push(')');
                if updated.is_empty() {
                    out.push_str(" DO NOTHING");
                } else {
                    out.push_str(" DO UPDATE SET ");
                    separated_by(
                        out,
                        &updated,
                        |out, i| {
                            let name = &self.table.columns[*i].quoted_sql_name;
                            out.push_str(name);
                            out.push_str(" = EXCLUDED.");
                            out.push_str(name);
                        },
                        ", ",
                    );
                }
                if self.selected_count() > 0
                    && self.dialect.returning_style() == ReturningStyle::Returning
                {
                    out.push_str("\nRETURNING ");
                    self.render_selected_columns(out, "");
                }
                Ok(())
            }
            UpsertStyle::OnDuplicateKey => {
                self.render_insert_core(out, options, false)?;
                out.push_str("\nON DUPLICATE KEY UPDATE ");
                if updated.is_empty() {
                    // The clause needs at least one assignment; a key
                    // self-assignment makes the duplicate case a no-op.
                    let name = &self.table.columns[pk[0]].quoted_sql_name;
                    out.push_str(name);
                    out.push_str(" = ");
                    out.push_str(name);
                } else {
                    separated_by(
                        out,
                        &updated,
                        |out, i| {
                            let name = &self.table.columns[*i].quoted_sql_name;
                            out.push_str(name);
                            out.push_str(" = VALUES(");
                            out.push_str(name);
                            out.push(')');
                        },
                        ", ",
                    );
                }
                Ok(())
            }
            UpsertStyle::Merge => {
                out.push_str("MERGE INTO ");
                out.push_str(&self.table.quoted_name);
                out.push_str(" AS target\nUSING (SELECT ");
                for (position, index) in inserted.iter().enumerate() {
                    if position > 0 {
                        out.push_str(", ");
                    }
                    let name = self.table.columns[*index].sql_name.clone();
                    let value = self.entries[*index].value.clone().unwrap_or_default();
                    self.push_parameter(out, &name, value);
                    out.push_str(" AS ");
                    out.push_str(&self.table.columns[*index].quoted_sql_name);
                }
                out.push_str(") AS source\nON ");
                separated_by(
                    out,
                    &pk,
                    |out, i| {
                        let name = &self.table.columns[*i].quoted_sql_name;
                        out.push_str("target.");
                        out.push_str(name);
                        out.push_str(" = source.");
                        out.push_str(name);
                    },
                    " AND ",
                );
                if !updated.is_empty() {
                    out.push_str("\nWHEN MATCHED THEN UPDATE SET ");
                    separated_by(
                        out,
                        &updated,
                        |out, i| {
                            let name = &self.table.columns[*i].quoted_sql_name;
                            out.push_str("target.");
                            out.push_str(name);
                            out.push_str(" = source.");
                            out.push_str(name);
                        },
                        ", ",
                    );
                }
                out.push_str("\nWHEN NOT MATCHED THEN INSERT (");
                separated_by(
                    out,
                    &inserted,
                    |out, i| out.push_str(&self.table.columns[*i].quoted_sql_name),
                    ", ",
                );
                out.push_str(") VALUES (");
                separated_by(
                    out,
                    &inserted,
                    |out, i| {
                        out.push_str("source.");
                        out.push_str(&self.table.columns[*i].quoted_sql_name);
                    },
                    ", ",
                );
                out.push(')');
                if self.selected_count() > 0
                    && self.dialect.returning_style() == ReturningStyle::Output
                {
                    out.push_str("\nOUTPUT ");
                    self.render_selected_columns(out, "Inserted.");
                }
                out.push(';');
                Ok(())
            }
        }
    }

    /// The select-flagged column list, optionally prefixed (`Inserted.` /
    /// `Deleted.` for OUTPUT clauses).
    pub fn render_selected_columns(&self, out: &mut String, prefix: &str) {
        let selected: Vec<&str> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.use_for_select)
            .map(|(i, _)| self.table.columns[i].quoted_sql_name.as_str())
            .collect();
        separated_by(
            out,
            selected,
            |out, name| {
                out.push_str(prefix);
                out.push_str(name);
            },
            ", ",
        );
    }

    /// `SET c = @c, ...` from the update-flagged entries.
    pub fn render_set_clause(&mut self, out: &mut String) -> Result<()> {
        let updated: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.use_for_update)
            .map(|(i, _)| i)
            .collect();
        if updated.is_empty() {
            return Err(ChainError::validation(format!(
                "{}: nothing to update on {}",
                self.operation, self.table.name
            )));
        }
        out.push_str("SET ");
        for (position, index) in updated.iter().enumerate() {
            if position > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.table.columns[*index].quoted_sql_name);
            out.push_str(" = ");
            let name = self.table.columns[*index].sql_name.clone();
            let value = self.entries[*index].value.clone().unwrap_or_default();
            self.push_parameter(out, &name, value);
        }
        Ok(())
    }

    /// Key-match predicate (no WHERE keyword), AND-joined.
    pub fn render_key_predicate(&mut self, out: &mut String) -> Result<()> {
        let keys: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_key)
            .map(|(i, _)| i)
            .collect();
        if keys.is_empty() {
            return Err(ChainError::validation(format!(
                "{}: no key values were supplied for {}",
                self.operation, self.table.name
            )));
        }
        for (position, index) in keys.iter().enumerate() {
            if position > 0 {
                out.push_str(" AND ");
            }
            out.push_str(&self.table.columns[*index].quoted_sql_name);
            out.push_str(" = ");
            let name = self.table.columns[*index].sql_name.clone();
            let value = self.entries[*index].value.clone().unwrap_or_default();
            self.push_parameter(out, &name, value);
        }
        Ok(())
    }

    /// Equality-filter predicate (no WHERE keyword). NULL filter values render
    /// as `IS NULL`; `ignore_case` wraps string comparisons in UPPER().
    pub fn render_filter_predicate(&mut self, out: &mut String) {
        let filtered = self.filter_order.clone();
        for (position, index) in filtered.iter().enumerate() {
            if position > 0 {
                out.push_str(" AND ");
            }
            let column = &self.table.columns[*index];
            let value = self.entries[*index].value.clone().unwrap_or_default();
            if value.is_null() {
                out.push_str(&column.quoted_sql_name);
                out.push_str(" IS NULL");
                continue;
            }
            let ignore_case =
                self.filter_options.ignore_case && matches!(value, Value::Varchar(..));
            if ignore_case {
                out.push_str("UPPER(");
                out.push_str(&column.quoted_sql_name);
                out.push_str(") = UPPER(");
            } else {
                out.push_str(&column.quoted_sql_name);
                out.push_str(" = ");
            }
            let name = column.sql_name.clone();
            self.push_parameter(out, &name, value);
            if ignore_case {
                out.push(')');
            }
        }
    }

    /// Soft-delete predicate (no WHERE keyword). Returns false when the table
    /// does not carry the rule's column.
    pub fn render_soft_delete_predicate(&self, out: &mut String, rule: &SoftDeleteRule) -> bool {
        let Some(column) = self.table.column(&rule.column) else {
            return false;
        };
        if column.is_nullable {
            out.push('(');
            out.push_str(&column.quoted_sql_name);
            out.push_str(" IS NULL OR ");
        }
        out.push_str(&column.quoted_sql_name);
        out.push_str(" <> ");
        self.dialect.write_value(out, &rule.deleted_value);
        if column.is_nullable {
            out.push(')');
        }
        true
    }

    /// `ORDER BY c1, c2 DESC`; a sort naming a non-column fails the prepare.
    pub fn render_order_by_clause(&mut self, out: &mut String, sorts: &[SortExpression]) -> Result<()> {
        if sorts.is_empty() {
            return Ok(());
        }
        out.push_str("\nORDER BY ");
        for (position, sort) in sorts.iter().enumerate() {
            if position > 0 {
                out.push_str(", ");
            }
            let Some(index) = self.column_index(&sort.column) else {
                return Err(ChainError::validation(format!(
                    "{}: sort references \"{}\" which is not a column of {}",
                    self.operation, sort.column, self.table.name
                )));
            };
            out.push_str(&self.table.columns[index].quoted_sql_name);
            if sort.descending {
                out.push_str(" DESC");
            }
        }
        Ok(())
    }

    /// Append parameters that belong to a caller-authored where-clause
    /// fragment. The fragment text is spliced verbatim by the command builder;
    /// only the values flow through here.
    pub fn append_where_clause_parameters(&mut self, args: &Arguments) -> Result<()> {
        for (name, value) in args {
            if self.parameters.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
                return Err(ChainError::validation(format!(
                    "{}: where-clause parameter \"{}\" collides with a generated parameter",
                    self.operation, name
                )));
            }
            self.parameters.push(SqlParameter {
                name: name.to_string(),
                value: value.clone(),
            });
        }
        Ok(())
    }

    /// `name(@a, @b)` for table-valued function FROM clauses.
    pub fn render_function_arguments(&mut self, out: &mut String, args: &Arguments) {
        out.push('(');
        let pairs: Vec<(String, Value)> = args
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        for (position, (name, value)) in pairs.into_iter().enumerate() {
            if position > 0 {
                out.push_str(", ");
            }
            self.push_parameter(out, &name, value);
        }
        out.push(')');
    }

    /// Number of columns flagged for SELECT.
    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.use_for_select).count()
    }

    pub fn table(&self) -> &TableOrViewMetadata {
        self.table
    }

    /// The accumulated parameter list, in placeholder order.
    pub fn into_parameters(self) -> Vec<SqlParameter> {
        self.parameters
    }

    pub fn write_table_sample(&self, out: &mut String, limits: &LimitPlan) {
        self.dialect.write_table_sample(out, limits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        GenericDialect, ObjectName, ValueKind,
        metadata::{ColumnMetadata, TableOrViewMetadata},
        args,
    };

    static DIALECT: GenericDialect = GenericDialect;

    fn column(name: &str, kind: Option<ValueKind>, pk: bool, identity: bool) -> ColumnMetadata {
        ColumnMetadata {
            sql_name: name.to_string(),
            rust_name: crate::util::to_snake_case(name),
            quoted_sql_name: format!("\"{}\"", name),
            is_nullable: !pk,
            is_primary_key: pk,
            is_identity: identity,
            native_type: "integer".into(),
            mapped_kind: kind,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    fn employee() -> TableOrViewMetadata {
        TableOrViewMetadata {
            name: ObjectName::parse("Employee"),
            is_table: true,
            quoted_name: "\"Employee\"".into(),
            columns: vec![
                column("EmployeeKey", Some(ValueKind::Int32), true, true),
                column("FirstName", Some(ValueKind::Varchar), false, false),
                column("LastName", Some(ValueKind::Varchar), false, false),
                column("Title", Some(ValueKind::Varchar), false, false),
            ],
        }
    }

    #[test]
    fn identity_column_is_dropped_from_insert_by_default() {
        let table = employee();
        let mut builder = SqlBuilder::new(&table, &DIALECT, "insert");
        builder
            .apply_insert_values(
                &args! { "EmployeeKey" => 9, "FirstName" => "A" },
                InsertOptions::default(),
            )
            .unwrap();
        let mut out = String::new();
        builder
            .render_insert_statement(&mut out, InsertOptions::default())
            .unwrap();
        assert_eq!(out, "INSERT INTO \"Employee\" (\"FirstName\")\nVALUES (@FirstName)");
    }

    #[test]
    fn identity_insert_keeps_the_identity_column() {
        let table = employee();
        let options = InsertOptions::default().identity_insert();
        let mut builder = SqlBuilder::new(&table, &DIALECT, "insert");
        builder
            .apply_insert_values(&args! { "EmployeeKey" => 9, "FirstName" => "A" }, options)
            .unwrap();
        let mut out = String::new();
        builder.render_insert_statement(&mut out, options).unwrap();
        assert_eq!(
            out,
            "INSERT INTO \"Employee\" (\"EmployeeKey\", \"FirstName\")\nVALUES (@EmployeeKey, @FirstName)"
        );
        let params = builder.into_parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "EmployeeKey");
    }

    #[test]
    fn primary_key_is_forced_into_narrowed_projections() {
        let table = employee();
        let mut builder = SqlBuilder::new(&table, &DIALECT, "from");
        builder
            .apply_desired_columns(DesiredColumns::List(&["FirstName"]))
            .unwrap();
        let mut out = String::new();
        builder.render_select_clause(&mut out, None);
        assert_eq!(out, "SELECT \"EmployeeKey\", \"FirstName\"");
    }

    #[test]
    fn null_filter_values_render_as_is_null() {
        let table = employee();
        let mut builder = SqlBuilder::new(&table, &DIALECT, "from");
        builder
            .apply_filter_value(
                &args! { "Title" => Option::<&str>::None, "FirstName" => "A" },
                FilterOptions::default(),
            )
            .unwrap();
        let mut out = String::new();
        builder.render_filter_predicate(&mut out);
        assert_eq!(out, "\"Title\" IS NULL AND \"FirstName\" = @FirstName");
        assert_eq!(builder.into_parameters().len(), 1);
    }

    #[test]
    fn ignore_case_wraps_string_comparisons() {
        let table = employee();
        let mut builder = SqlBuilder::new(&table, &DIALECT, "from");
        builder
            .apply_filter_value(
                &args! { "Title" => "boss" },
                FilterOptions::default().ignore_case(),
            )
            .unwrap();
        let mut out = String::new();
        builder.render_filter_predicate(&mut out);
        assert_eq!(out, "UPPER(\"Title\") = UPPER(@Title)");
    }

    #[test]
    fn overlapping_argument_sources_are_rejected() {
        let first = args! { "Title" => "A", "Salary" => 1 };
        let second = args! { "title" => "B" };
        let error = SqlBuilder::check_for_overlaps(&first, &second, "update_set").unwrap_err();
        assert!(matches!(error, ChainError::Validation { .. }));
        assert!(error.to_string().contains("Title"));
    }

    #[test]
    fn update_requires_a_set_entry_and_all_keys() {
        let table = employee();
        let mut builder = SqlBuilder::new(&table, &DIALECT, "update");
        // Key only, nothing to set.
        let error = builder
            .apply_update_values(
                &args! { "EmployeeKey" => 5 },
                UpdateOptions::default(),
                None,
            )
            .unwrap_err();
        assert!(error.to_string().contains("nothing to update"));

        let mut builder = SqlBuilder::new(&table, &DIALECT, "update");
        let error = builder
            .apply_update_values(&args! { "Title" => "X" }, UpdateOptions::default(), None)
            .unwrap_err();
        assert!(error.to_string().contains("EmployeeKey"));
    }

    #[test]
    fn unmapped_column_cannot_be_requested_for_typed_reads() {
        let mut table = employee();
        table.columns.push(column("Shape", None, false, false));
        let mut builder = SqlBuilder::new(&table, &DIALECT, "from");
        assert!(matches!(
            builder.apply_desired_columns(DesiredColumns::List(&["Shape"])),
            Err(ChainError::Mapping { .. })
        ));
    }
}

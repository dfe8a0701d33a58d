use crate::{ChainError, Dialect, Result, ValueKind, util::to_snake_case};
use dashmap::DashMap;
use std::{fmt, sync::Arc};

/// A schema-qualified table, view or routine name. Comparison is
/// case-insensitive, as object names are in every supported backend's default
/// collation.
#[derive(Debug, Clone, Eq)]
pub struct ObjectName {
    pub schema: Option<String>,
    pub name: String,
}

impl ObjectName {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(Into::into),
            name: name.into(),
        }
    }

    /// Parse `"schema.name"` or a bare `"name"`.
    pub fn parse(value: &str) -> Self {
        match value.split_once('.') {
            Some((schema, name)) => Self::new(Some(schema), name),
            None => Self::new(None, value),
        }
    }

    pub fn with_schema(&self, schema: &str) -> Self {
        Self::new(Some(schema), &self.name)
    }

    /// Canonical lowercase form used as a cache key.
    pub(crate) fn cache_key(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && match (&self.schema, &other.schema) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.{}", schema, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Column description as read from a backend catalog, before dialect-specific
/// interpretation.
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub name: String,
    pub native_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_identity: bool,
    pub max_length: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

/// Table or view description as read from a backend catalog.
#[derive(Debug, Clone)]
pub struct RawTableOrView {
    pub name: ObjectName,
    pub is_table: bool,
    pub columns: Vec<RawColumn>,
}

/// Immutable column metadata, owned by the metadata cache.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// Name as the database spells it.
    pub sql_name: String,
    /// Host-language spelling (snake_case of `sql_name`).
    pub rust_name: String,
    /// `sql_name` quoted for the owning dialect, ready to splice into SQL.
    pub quoted_sql_name: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_identity: bool,
    pub native_type: String,
    /// `None` when the native type has no safe host equivalent; such columns
    /// stay readable through rows but are excluded from typed projection
    /// defaults.
    pub mapped_kind: Option<ValueKind>,
    pub max_length: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl ColumnMetadata {
    /// Case-insensitive match against either the SQL or the host spelling.
    pub fn matches(&self, name: &str) -> bool {
        self.sql_name.eq_ignore_ascii_case(name) || self.rust_name.eq_ignore_ascii_case(name)
    }
}

/// Immutable table/view metadata. Created lazily on first reference, cached
/// for the lifetime of the cache, shared by `Arc`.
#[derive(Debug, Clone)]
pub struct TableOrViewMetadata {
    pub name: ObjectName,
    pub is_table: bool,
    pub columns: Vec<ColumnMetadata>,
    /// `name` quoted for the owning dialect.
    pub quoted_name: String,
}

impl TableOrViewMetadata {
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.matches(name))
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    /// Columns metadata guarantees are never NULL. Materializers use this to
    /// skip redundant null checks; it is an optimization, not a correctness
    /// requirement.
    pub fn non_nullable_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| !c.is_nullable)
    }

    pub fn identity_column(&self) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.is_identity)
    }
}

/// The catalog reader each backend supplies: one or more read-only queries
/// against the backend's information-schema equivalent. Connection handling
/// lives behind this seam, outside the core.
pub trait MetadataSource: Send + Sync {
    /// Fetch one object's description, `Ok(None)` when it does not exist.
    fn fetch_object(&self, name: &ObjectName) -> Result<Option<RawTableOrView>>;

    /// Enumerate every table and view visible to the connection.
    fn list_objects(&self) -> Result<Vec<ObjectName>>;
}

/// Maps a host type to its backing table so commands can be built from the
/// type alone. The explicit constants replace the original's
/// attribute-plus-namespace reflection scan.
pub trait TableMapped {
    const TABLE: &'static str;
    const SCHEMA: Option<&'static str> = None;
}

/// Per-data-source metadata cache.
///
/// Safe for concurrent read/populate: lookups are get-or-add keyed by object
/// name, so concurrent first use converges on one cached entry. Redundant
/// catalog queries can race, corrupted state cannot.
pub struct MetadataCache<S: MetadataSource> {
    source: S,
    dialect: &'static dyn Dialect,
    default_schema: Option<String>,
    objects: DashMap<String, Arc<TableOrViewMetadata>>,
}

impl<S: MetadataSource> MetadataCache<S> {
    pub fn new(source: S, dialect: &'static dyn Dialect) -> Self {
        Self {
            source,
            dialect,
            default_schema: None,
            objects: DashMap::new(),
        }
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Resolve a table or view by name, hitting the backend catalog on first
    /// use. An unqualified name that misses is retried under the default
    /// schema before being reported missing.
    pub fn get_table_or_view(&self, name: &str) -> Result<Arc<TableOrViewMetadata>> {
        let parsed = ObjectName::parse(name);
        if let Some(found) = self.objects.get(&parsed.cache_key()) {
            return Ok(found.clone());
        }
        let mut fetched = self.source.fetch_object(&parsed)?;
        if fetched.is_none()
            && parsed.schema.is_none()
            && let Some(schema) = &self.default_schema
        {
            fetched = self.source.fetch_object(&parsed.with_schema(schema))?;
        }
        let Some(raw) = fetched else {
            return Err(ChainError::MissingObject {
                operation: "get_table_or_view",
                name: name.into(),
            });
        };
        let loaded = Arc::new(self.interpret(raw));
        // Under a racing first use, first insert wins and the loser's work is
        // discarded.
        Ok(self
            .objects
            .entry(parsed.cache_key())
            .or_insert(loaded)
            .clone())
    }

    /// Resolve the backing table of a mapped type: explicit schema + table,
    /// falling back to the cache's default schema.
    pub fn get_table_or_view_for<T: TableMapped>(&self) -> Result<Arc<TableOrViewMetadata>> {
        let name = match T::SCHEMA {
            Some(schema) => format!("{}.{}", schema, T::TABLE),
            None => T::TABLE.to_string(),
        };
        self.get_table_or_view(&name)
    }

    /// Eagerly populate the cache from the backend catalog. Returns the
    /// number of objects loaded.
    pub fn preload(&self) -> Result<usize> {
        let names = self.source.list_objects()?;
        let count = names.len();
        for name in names {
            if let Some(raw) = self.source.fetch_object(&name)? {
                let key = name.cache_key();
                self.objects.entry(key).or_insert(Arc::new(self.interpret(raw)));
            }
        }
        Ok(count)
    }

    /// Drop every cached entry. The next lookup goes back to the catalog.
    pub fn reset(&self) {
        self.objects.clear();
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn interpret(&self, raw: RawTableOrView) -> TableOrViewMetadata {
        let mut quoted_name = String::new();
        if let Some(schema) = &raw.name.schema {
            self.dialect.write_identifier(&mut quoted_name, schema);
            quoted_name.push('.');
        }
        self.dialect.write_identifier(&mut quoted_name, &raw.name.name);
        let columns = raw
            .columns
            .into_iter()
            .map(|c| {
                let mapped_kind = self.dialect.map_native_type(&c.native_type);
                if mapped_kind.is_none() {
                    log::debug!(
                        "column {}.{} has unmapped native type \"{}\"",
                        raw.name,
                        c.name,
                        c.native_type
                    );
                }
                ColumnMetadata {
                    rust_name: to_snake_case(&c.name),
                    quoted_sql_name: self.dialect.quote_identifier(&c.name),
                    sql_name: c.name,
                    is_nullable: c.is_nullable,
                    is_primary_key: c.is_primary_key,
                    is_identity: c.is_identity,
                    native_type: c.native_type,
                    mapped_kind,
                    max_length: c.max_length,
                    precision: c.precision,
                    scale: c.scale,
                }
            })
            .collect();
        TableOrViewMetadata {
            name: raw.name,
            is_table: raw.is_table,
            columns,
            quoted_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GENERIC;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        fetches: AtomicUsize,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl MetadataSource for FakeSource {
        fn fetch_object(&self, name: &ObjectName) -> Result<Option<RawTableOrView>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !name.name.eq_ignore_ascii_case("Employee") {
                return Ok(None);
            }
            Ok(Some(RawTableOrView {
                name: name.clone(),
                is_table: true,
                columns: vec![
                    RawColumn {
                        name: "EmployeeKey".into(),
                        native_type: "integer".into(),
                        is_nullable: false,
                        is_primary_key: true,
                        is_identity: true,
                        max_length: None,
                        precision: None,
                        scale: None,
                    },
                    RawColumn {
                        name: "FirstName".into(),
                        native_type: "varchar".into(),
                        is_nullable: false,
                        is_primary_key: false,
                        is_identity: false,
                        max_length: Some(50),
                        precision: None,
                        scale: None,
                    },
                    RawColumn {
                        name: "Shape".into(),
                        native_type: "geometry".into(),
                        is_nullable: true,
                        is_primary_key: false,
                        is_identity: false,
                        max_length: None,
                        precision: None,
                        scale: None,
                    },
                ],
            }))
        }

        fn list_objects(&self) -> Result<Vec<ObjectName>> {
            Ok(vec![ObjectName::parse("Employee")])
        }
    }

    #[test]
    fn second_lookup_hits_the_cache() {
        let cache = MetadataCache::new(FakeSource::new(), &GENERIC);
        let a = cache.get_table_or_view("Employee").unwrap();
        let b = cache.get_table_or_view("employee").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_clears_cached_entries() {
        let cache = MetadataCache::new(FakeSource::new(), &GENERIC);
        cache.get_table_or_view("Employee").unwrap();
        cache.reset();
        cache.get_table_or_view("Employee").unwrap();
        assert_eq!(cache.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_object_is_reported_as_such() {
        let cache = MetadataCache::new(FakeSource::new(), &GENERIC);
        assert!(matches!(
            cache.get_table_or_view("Nope"),
            Err(ChainError::MissingObject { .. })
        ));
    }

    #[test]
    fn unknown_native_type_degrades_instead_of_failing() {
        let cache = MetadataCache::new(FakeSource::new(), &GENERIC);
        let table = cache.get_table_or_view("Employee").unwrap();
        let shape = table.column("Shape").unwrap();
        assert_eq!(shape.mapped_kind, None);
        assert_eq!(shape.native_type, "geometry");
    }

    #[test]
    fn snake_case_names_resolve_too() {
        let cache = MetadataCache::new(FakeSource::new(), &GENERIC);
        let table = cache.get_table_or_view("Employee").unwrap();
        assert!(table.column("first_name").is_some());
        assert_eq!(
            table.primary_key_columns().map(|c| &c.sql_name).collect::<Vec<_>>(),
            ["EmployeeKey"]
        );
        assert!(
            table
                .non_nullable_columns()
                .any(|c| c.sql_name == "EmployeeKey")
        );
    }

    #[test]
    fn mapped_type_resolves_through_schema_fallback() {
        struct Employee;
        impl TableMapped for Employee {
            const TABLE: &'static str = "Employee";
        }
        let cache = MetadataCache::new(FakeSource::new(), &GENERIC).with_default_schema("HR");
        let table = cache.get_table_or_view_for::<Employee>().unwrap();
        assert_eq!(table.name.name, "Employee");
    }
}

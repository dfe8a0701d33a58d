/// Behavior flags for single-row materializers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowOptions {
    /// Zero rows is an error instead of `None`.
    pub prevent_empty_results: bool,
    /// More than one row keeps the first instead of failing.
    pub discard_extra_rows: bool,
    /// Assert the constructor path: every column the target type lists must be
    /// present in the result set. This is the default behavior; the flag exists
    /// so the intent is explicit at call sites.
    pub infer_constructor: bool,
}

impl RowOptions {
    pub fn prevent_empty_results(mut self) -> Self {
        self.prevent_empty_results = true;
        self
    }

    pub fn discard_extra_rows(mut self) -> Self {
        self.discard_extra_rows = true;
        self
    }

    pub fn infer_constructor(mut self) -> Self {
        self.infer_constructor = true;
        self
    }
}

/// Behavior flags for insert commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOptions {
    /// Explicitly write the identity column instead of letting the backend
    /// generate it. Renders the backend's override directive where one exists.
    pub identity_insert: bool,
}

impl InsertOptions {
    pub fn identity_insert(mut self) -> Self {
        self.identity_insert = true;
        self
    }
}

/// Behavior flags for update commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Only write fields that differ from the change-tracking baseline.
    pub changed_properties_only: bool,
    /// Match rows on the caller-designated key fields instead of the table's
    /// primary key.
    pub use_key_attribute: bool,
    /// Return the row as it was before the update (supported by SQL Server's
    /// OUTPUT Deleted only).
    pub return_old_values: bool,
}

impl UpdateOptions {
    pub fn changed_properties_only(mut self) -> Self {
        self.changed_properties_only = true;
        self
    }

    pub fn use_key_attribute(mut self) -> Self {
        self.use_key_attribute = true;
        self
    }

    pub fn return_old_values(mut self) -> Self {
        self.return_old_values = true;
        self
    }
}

/// Behavior flags for equality filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Compare string columns case-insensitively (renders `UPPER(c) = UPPER(@p)`).
    pub ignore_case: bool,
}

impl FilterOptions {
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

/// Pagination / sampling strategy. Which subset is legal is backend-specific
/// and validated when the command is prepared, not when it is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LimitOption {
    /// Plain row-count limit.
    #[default]
    Rows,
    /// Row-count limit keeping peer rows of the last position (requires a sort).
    RowsWithTies,
    /// Percentage of the result.
    Percentage,
    /// Percentage keeping ties (requires a sort).
    PercentageWithTies,
    /// System page sampling, limit expressed in rows.
    TableSampleSystemRows,
    /// System page sampling, limit expressed as a percentage.
    TableSampleSystemPercentage,
}

impl LimitOption {
    pub fn is_sampling(self) -> bool {
        matches!(
            self,
            LimitOption::TableSampleSystemRows | LimitOption::TableSampleSystemPercentage
        )
    }

    pub fn requires_sort(self) -> bool {
        matches!(
            self,
            LimitOption::RowsWithTies | LimitOption::PercentageWithTies
        )
    }
}

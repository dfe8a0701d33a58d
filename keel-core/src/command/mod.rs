mod delete;
mod insert;
mod routine;
mod sql_call;
mod table_query;
mod update;
mod update_set;
mod upsert;

pub use delete::*;
pub use insert::*;
pub use routine::*;
pub use sql_call::*;
pub use table_query::*;
pub use update::*;
pub use update_set::*;
pub use upsert::*;

use crate::{AuditRules, Dialect, ListenerRegistry};

/// The slice of a data source a command builder needs: who renders the SQL,
/// which audit rules apply, and where lifecycle events go.
#[derive(Clone, Copy)]
pub struct SourceContext<'a> {
    pub data_source: &'a str,
    pub dialect: &'static dyn Dialect,
    pub audit: &'a AuditRules,
    pub listeners: &'a ListenerRegistry,
}

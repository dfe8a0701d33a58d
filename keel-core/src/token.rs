use crate::{ChainError, Result, Row, RowNames, SqlParameter, Table};
use futures::{Stream, StreamExt};
use std::{
    future::Future,
    pin::pin,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;

/// Whether the command text is a plain statement or a stored procedure name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Text,
    Procedure,
}

/// Borrowed view of an executable command handed to the backend adapter.
#[derive(Debug, Clone, Copy)]
pub struct CommandText<'a> {
    pub sql: &'a str,
    pub parameters: &'a [SqlParameter],
    pub command_type: CommandType,
}

/// The per-backend execution adapter. Implementations wrap a native client
/// library; the core never talks to a database directly.
pub trait Executor {
    /// Run the command and stream back its full result set.
    fn query(&mut self, command: CommandText<'_>) -> Result<Table>;

    /// Run the command and report the number of affected rows.
    fn execute(&mut self, command: CommandText<'_>) -> Result<u64>;
}

/// Asynchronous twin of [`Executor`]. Cancellation is cooperative: adapters
/// should give up promptly once the token trips, but the backend's own
/// cancellation semantics bound how fast the statement actually stops.
pub trait AsyncExecutor: Send {
    /// Run the command and stream back its rows as the backend produces them.
    fn fetch(
        &mut self,
        command: CommandText<'_>,
        cancellation: &CancellationToken,
    ) -> impl Stream<Item = Result<Row>> + Send;

    fn execute(
        &mut self,
        command: CommandText<'_>,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = Result<u64>> + Send;
}

/// Context handed to execution lifecycle listeners.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionEvent<'a> {
    pub data_source: &'a str,
    pub operation: &'static str,
    pub target: &'a str,
    pub sql: &'a str,
}

/// Observer of command execution. Events always come in matching pairs:
/// `started` followed by exactly one of `finished`, `error` or `canceled`, so
/// listeners can compute duration and outcome uniformly.
pub trait ExecutionListener: Send + Sync {
    fn started(&self, event: &ExecutionEvent<'_>) {
        let _ = event;
    }

    fn finished(&self, event: &ExecutionEvent<'_>, rows_affected: Option<u64>, elapsed: Duration) {
        let _ = (event, rows_affected, elapsed);
    }

    fn error(&self, event: &ExecutionEvent<'_>, error: &ChainError, elapsed: Duration) {
        let _ = (event, error, elapsed);
    }

    fn canceled(&self, event: &ExecutionEvent<'_>, elapsed: Duration) {
        let _ = (event, elapsed);
    }
}

/// Explicit per-data-source observer registry; listeners are registered at
/// construction and live as long as the data source.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn ExecutionListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn ExecutionListener>) {
        self.listeners.push(listener);
    }

    fn each(&self, f: impl Fn(&dyn ExecutionListener)) {
        for listener in &self.listeners {
            f(listener.as_ref());
        }
    }
}

/// An immutable, executable command: rendered SQL, its parameters and the
/// bookkeeping needed to raise lifecycle events. Produced by a command
/// builder's `prepare`, consumed once by execution. Owns everything it
/// carries, so a token outlives the builder that rendered it.
pub struct ExecutionToken {
    pub operation: &'static str,
    pub target: String,
    pub sql: String,
    pub parameters: Vec<SqlParameter>,
    pub command_type: CommandType,
    /// When set, a mismatch between this and the actual affected-row count is
    /// an error rather than a silent success.
    pub expected_row_count: Option<u64>,
    pub(crate) data_source: String,
    pub(crate) listeners: ListenerRegistry,
}

impl std::fmt::Debug for ExecutionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionToken")
            .field("operation", &self.operation)
            .field("target", &self.target)
            .field("sql", &self.sql)
            .field("parameters", &self.parameters)
            .field("command_type", &self.command_type)
            .field("expected_row_count", &self.expected_row_count)
            .field("data_source", &self.data_source)
            .finish_non_exhaustive()
    }
}

impl ExecutionToken {
    fn event(&self) -> ExecutionEvent<'_> {
        ExecutionEvent {
            data_source: &self.data_source,
            operation: self.operation,
            target: &self.target,
            sql: &self.sql,
        }
    }

    fn command(&self) -> CommandText<'_> {
        CommandText {
            sql: &self.sql,
            parameters: &self.parameters,
            command_type: self.command_type,
        }
    }

    fn check_row_count(&self, actual: u64) -> Result<u64> {
        match self.expected_row_count {
            Some(expected) if expected != actual => Err(ChainError::RowCountMismatch {
                operation: self.operation,
                target: self.target.clone(),
                expected,
                actual,
            }),
            _ => Ok(actual),
        }
    }

    fn finish<T>(
        &self,
        result: Result<T>,
        rows: impl Fn(&T) -> Option<u64>,
        started: Instant,
        cancellation: Option<&CancellationToken>,
    ) -> Result<T> {
        let event = self.event();
        let elapsed = started.elapsed();
        match result {
            Ok(value) => {
                let affected = rows(&value);
                self.listeners
                    .each(|l| l.finished(&event, affected, elapsed));
                Ok(value)
            }
            Err(error) => {
                if cancellation.is_some_and(|c| c.is_cancelled()) {
                    // A failure that coincides with a cancellation request is
                    // reported as a cancellation, not a backend fault.
                    self.listeners.each(|l| l.canceled(&event, elapsed));
                    log::debug!("{} on {} canceled", self.operation, self.target);
                    Err(ChainError::Canceled {
                        operation: self.operation,
                        target: self.target.clone(),
                    })
                } else {
                    self.listeners.each(|l| l.error(&event, &error, elapsed));
                    log::error!("{} on {} failed: {}", self.operation, self.target, error);
                    Err(error)
                }
            }
        }
    }

    /// Run and collect the command's result set.
    pub fn query<E: Executor>(&self, executor: &mut E) -> Result<Table> {
        let event = self.event();
        self.listeners.each(|l| l.started(&event));
        let started = Instant::now();
        let result = executor.query(self.command());
        self.finish(result, |_| None, started, None)
    }

    /// Run and report the affected-row count, verifying it against the
    /// expected count when one is attached.
    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        let event = self.event();
        self.listeners.each(|l| l.started(&event));
        let started = Instant::now();
        let result = executor
            .execute(self.command())
            .and_then(|actual| self.check_row_count(actual));
        self.finish(result, |v| Some(*v), started, None)
    }

    /// Drain the backend's row stream into a [`Table`].
    pub async fn query_async<E: AsyncExecutor>(
        &self,
        executor: &mut E,
        cancellation: &CancellationToken,
    ) -> Result<Table> {
        let event = self.event();
        self.listeners.each(|l| l.started(&event));
        let started = Instant::now();
        let result = async {
            let mut stream = pin!(executor.fetch(self.command(), cancellation));
            let mut labels: Option<RowNames> = None;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await {
                let row = row?;
                if labels.is_none() {
                    labels = Some(Arc::from(row.names().to_vec()));
                }
                rows.push(row);
            }
            Ok(Table::from_rows(
                labels.unwrap_or_else(|| Arc::from(Vec::<String>::new())),
                rows,
            ))
        }
        .await;
        self.finish(result, |_| None, started, Some(cancellation))
    }

    pub async fn execute_async<E: AsyncExecutor>(
        &self,
        executor: &mut E,
        cancellation: &CancellationToken,
    ) -> Result<u64> {
        let event = self.event();
        self.listeners.each(|l| l.started(&event));
        let started = Instant::now();
        let result = match executor.execute(self.command(), cancellation).await {
            Ok(actual) => self.check_row_count(actual),
            Err(error) => Err(error),
        };
        self.finish(result, |v| Some(*v), started, Some(cancellation))
    }
}

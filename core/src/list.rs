//! The todo list component: local state plus the load and create cycle.
//!
//! # Design
//! `TodoList` is plain data with no I/O: the items mirrored from the server
//! and the title the user is typing. `TodoView` drives it, sending requests
//! built by `TodoClient` through an injected `Transport`.
//!
//! The network call is the only suspension point of each operation. State
//! sits behind a mutex that is locked only between suspension points, so
//! mutations are serialized the way UI callbacks are on a single thread,
//! while `mount` and `submit` can still be in flight at the same time.
//!
//! Failures never escape: they are logged with `tracing` and broadcast to
//! anyone who called `subscribe_failures`.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::TimeZone;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::client::TodoClient;
use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{format_created_at, CreateTodo, Todo};

const FAILURE_CHANNEL_CAPACITY: usize = 32;

/// Client-side cache of the server's todo collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoList {
    items: Vec<Todo>,
    pending_title: String,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Todo] {
        &self.items
    }

    pub fn pending_title(&self) -> &str {
        &self.pending_title
    }

    pub fn set_pending_title(&mut self, title: impl Into<String>) {
        self.pending_title = title.into();
    }

    /// The trimmed pending title, or `None` when there is nothing to submit.
    pub fn submission(&self) -> Option<String> {
        let trimmed = self.pending_title.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Rows to display, in list order, with timestamps rendered in `tz`.
    pub fn rows<Tz>(&self, tz: &Tz) -> Vec<Row>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.items
            .iter()
            .map(|todo| Row {
                summary: todo.summary(),
                created_at: format_created_at(&todo.created_at, tz),
            })
            .collect()
    }

    fn replace_items(&mut self, items: Vec<Todo>) {
        self.items = items;
    }

    fn prepend(&mut self, todo: Todo) {
        self.items.insert(0, todo);
    }

    fn contains(&self, id: i64) -> bool {
        self.items.iter().any(|todo| todo.id == id)
    }
}

/// One rendered list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub summary: String,
    pub created_at: String,
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  作成日: {}", self.summary, self.created_at)
    }
}

/// Which component operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => f.write_str("load"),
            Operation::Create => f.write_str("create"),
        }
    }
}

/// A failed operation, as delivered to failure subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub operation: Operation,
    pub error: ApiError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The list was replaced with this many server items.
    Loaded(usize),
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server created the item with this id; it is now first in the list.
    Created(i64),
    /// The pending title was blank. No request was sent.
    Ignored,
    Failed,
    Cancelled,
}

#[derive(Debug, Default)]
struct ViewState {
    list: TodoList,
    loads_in_flight: usize,
    // Items created while at least one load was in flight, oldest first.
    created_during_load: Vec<Todo>,
}

/// A live todo list bound to a backend.
///
/// `teardown` abandons any request still in flight; its result is discarded
/// without touching state.
pub struct TodoView<T> {
    client: TodoClient,
    transport: T,
    state: Mutex<ViewState>,
    lifetime: CancellationToken,
    failures: broadcast::Sender<Failure>,
}

impl<T: Transport> TodoView<T> {
    pub fn new(client: TodoClient, transport: T) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            client,
            transport,
            state: Mutex::new(ViewState::default()),
            lifetime: CancellationToken::new(),
            failures,
        }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    /// Receive every future failure. Without subscribers failures are only
    /// logged.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<Failure> {
        self.failures.subscribe()
    }

    pub fn snapshot(&self) -> TodoList {
        self.state().list.clone()
    }

    pub fn items(&self) -> Vec<Todo> {
        self.state().list.items().to_vec()
    }

    pub fn pending_title(&self) -> String {
        self.state().list.pending_title().to_string()
    }

    pub fn set_pending_title(&self, title: impl Into<String>) {
        self.state().list.set_pending_title(title);
    }

    pub fn rows<Tz>(&self, tz: &Tz) -> Vec<Row>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.state().list.rows(tz)
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Abort in-flight requests. Later operations are no-ops.
    pub fn teardown(&self) {
        if !self.lifetime.is_cancelled() {
            tracing::debug!(base_url = self.client.base_url(), "tearing down todo view");
            self.lifetime.cancel();
        }
    }

    /// Fetch the whole collection and replace the local list with it.
    ///
    /// On any failure the list is left untouched.
    pub async fn mount(&self) -> LoadOutcome {
        if self.is_torn_down() {
            return LoadOutcome::Cancelled;
        }
        let request = self.client.build_list_todos();
        let _in_flight = LoadInFlight::enter(&self.state);

        let Some(response) = self.round_trip(request).await else {
            tracing::debug!("todo load abandoned by teardown");
            return LoadOutcome::Cancelled;
        };

        match response
            .map_err(ApiError::from)
            .and_then(|response| self.client.parse_list_todos(response))
        {
            Ok(items) => {
                let count = items.len();
                let mut state = self.state();
                state.list.replace_items(items);
                let created = state.created_during_load.clone();
                for todo in created {
                    if !state.list.contains(todo.id) {
                        tracing::debug!(id = todo.id, "keeping item created during load");
                        state.list.prepend(todo);
                    }
                }
                tracing::debug!(count, "todo list loaded");
                LoadOutcome::Loaded(count)
            }
            Err(error) => {
                self.report(Operation::Load, error);
                LoadOutcome::Failed
            }
        }
    }

    /// Create an item from the pending title.
    ///
    /// A blank title is a no-op. On success the server's copy goes to the
    /// front of the list and the pending title is cleared; on failure both
    /// stay as they were.
    pub async fn submit(&self) -> SubmitOutcome {
        if self.is_torn_down() {
            return SubmitOutcome::Cancelled;
        }
        let submission = self.state().list.submission();
        let Some(title) = submission else {
            return SubmitOutcome::Ignored;
        };

        let request = match self.client.build_create_todo(&CreateTodo { title }) {
            Ok(request) => request,
            Err(error) => {
                self.report(Operation::Create, error);
                return SubmitOutcome::Failed;
            }
        };

        let result = match self.round_trip(request).await {
            Some(response) => response
                .map_err(ApiError::from)
                .and_then(|response| self.client.parse_create_todo(response)),
            None => {
                tracing::debug!("todo creation abandoned by teardown");
                return SubmitOutcome::Cancelled;
            }
        };

        match result {
            Ok(todo) => {
                let id = todo.id;
                let mut state = self.state();
                if state.loads_in_flight > 0 {
                    state.created_during_load.push(todo.clone());
                }
                // A load that finished first may already hold the item.
                if !state.list.contains(id) {
                    state.list.prepend(todo);
                }
                state.list.set_pending_title(String::new());
                tracing::debug!(id, "todo created");
                SubmitOutcome::Created(id)
            }
            Err(error) => {
                self.report(Operation::Create, error);
                SubmitOutcome::Failed
            }
        }
    }

    /// `None` when the view was torn down before the transport answered.
    async fn round_trip(&self, request: HttpRequest) -> Option<Result<HttpResponse, TransportError>> {
        tracing::trace!(method = request.method.as_str(), path = %request.path, "sending request");
        tokio::select! {
            biased;
            _ = self.lifetime.cancelled() => None,
            response = self.transport.execute(request) => Some(response),
        }
    }

    fn report(&self, operation: Operation, error: ApiError) {
        tracing::error!(%operation, %error, "todo request failed");
        // No receivers is the default, log-only mode.
        let _ = self.failures.send(Failure { operation, error });
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.state)
    }
}

/// Counts a load as in flight until dropped, however the load ends.
struct LoadInFlight<'a> {
    state: &'a Mutex<ViewState>,
}

impl<'a> LoadInFlight<'a> {
    fn enter(state: &'a Mutex<ViewState>) -> Self {
        lock(state).loads_in_flight += 1;
        Self { state }
    }
}

impl Drop for LoadInFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.loads_in_flight -= 1;
        if state.loads_in_flight == 0 {
            state.created_during_load.clear();
        }
    }
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// Fallback for views that are never torn down explicitly.
impl<T> Drop for TodoView<T> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

//! Client core for the todo service.
//!
//! # Overview
//! `TodoClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `TodoView` is the
//! list component on top of it: it loads the collection once on mount,
//! creates items on submit, and mirrors the server's answers into a local
//! `TodoList`.
//!
//! # Design
//! - `TodoClient` is stateless and holds only `base_url`.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit.
//! - The network is reached only through the `Transport` trait, injected
//!   into `TodoView`; tests substitute a scripted fake.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod list;
pub mod transport;
pub mod types;

pub use client::TodoClient;
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use list::{Failure, LoadOutcome, Operation, Row, SubmitOutcome, TodoList, TodoView};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    format_created_at, BatchCreate, BatchCreateResult, CreateTodo, Message, Todo, UpdateTodo,
};

//! Dispatch pipeline: intake validation, the bounded queue, the worker pool
//! and the per-notification retry loop.

pub mod dispatcher;
pub mod queue;
pub mod retry;
pub mod validator;
pub mod worker;

pub use dispatcher::{DispatchError, DispatchReport, Dispatcher, IntakeSummary, Rejection};
pub use queue::{DispatchQueue, QueuedNotification};
pub use retry::{RetryController, RetryReport, resolve_max_retry};
pub use worker::WorkerPool;

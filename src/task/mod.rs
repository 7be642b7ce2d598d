// src/task/mod.rs

//! Tasks: the unit of work the scheduler drives.
//!
//! - [`state`] defines the monotonic lifecycle (`Wait` → … → `Ended`).
//! - [`context`] holds the user-facing `Task` trait and `TaskContext`.
//! - [`handle`] holds the shared header every thread can read through a
//!   `TaskHandle`.
//! - [`func`] wraps closures as tasks.

pub mod context;
pub mod func;
pub mod handle;
pub mod state;

pub(crate) use context::AnyTask;
pub use context::{Task, TaskContext};
pub use func::FuncTask;
pub use handle::{TaskHandle, TaskId};
pub use state::TaskState;

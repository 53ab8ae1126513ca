//! Client-side state for ToDoEase: a session copy of the backend's day-pinned tasks, the
//! per-day calendar aggregate and filtered view derived from it, and the remote-first
//! operations that keep all three consistent.

pub mod calendar;
pub mod commands;
pub mod config;
pub mod date;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod reorder;
pub mod state;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

pub use commands::{dispatch, Command, CommandResult};
pub use events::{StateListener, StatePayload};
pub use gateway::{GatewayError, RestGateway, TaskGateway};
pub use models::{Subtask, Task};
pub use reorder::{DragSession, ReorderTarget, RowBounds};
pub use store::TaskStore;

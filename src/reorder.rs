//! Drag-to-reorder over one rendered list.
//!
//! The candidate order is plain data (a sequence of ids) that only lives for the duration
//! of the gesture. On drop it is submitted and the whole collection is reloaded, so the
//! backend's order is what ends up on screen.

use serde::{Deserialize, Serialize};

use crate::gateway::TaskGateway;
use crate::models::TaskId;
use crate::state::SessionState;
use crate::store::TaskStore;
use crate::view::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReorderTarget {
    /// One column of the visible task list.
    Tasks(Column),
    /// The subtask list of one task.
    Subtasks(TaskId),
}

/// Where a rendered row currently sits, in pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowBounds {
    pub id: i64,
    pub top: f64,
    pub height: f64,
}

impl RowBounds {
    fn midpoint_offset(&self, pointer_y: f64) -> f64 {
        pointer_y - self.top - self.height / 2.0
    }
}

/// The row the dragged one should be inserted before: among the rows whose midpoint lies
/// below the pointer, the closest one. `None` means the end of the list.
pub fn insertion_point(pointer_y: f64, rows: &[RowBounds], dragged: i64) -> Option<i64> {
    rows.iter()
        .filter(|row| row.id != dragged)
        .map(|row| (row.id, row.midpoint_offset(pointer_y)))
        .filter(|(_, offset)| *offset < 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

#[derive(Debug, Clone)]
pub struct DragSession {
    target: ReorderTarget,
    dragged: i64,
    order: Vec<i64>,
}

impl DragSession {
    /// Starts a drag of `dragged` inside `target`. Returns `None` when the row is not part
    /// of that list, which keeps a drag from crossing columns.
    pub fn begin(state: &SessionState, target: ReorderTarget, dragged: i64) -> Option<Self> {
        let order = match target {
            ReorderTarget::Tasks(column) => state.column_ids(column),
            ReorderTarget::Subtasks(task_id) => {
                state.task(task_id)?.subtasks.iter().map(|s| s.id).collect()
            }
        };
        if !order.contains(&dragged) {
            log::debug!("reorder: row {dragged} is not in {target:?}");
            return None;
        }
        Some(Self {
            target,
            dragged,
            order,
        })
    }

    pub fn target(&self) -> ReorderTarget {
        self.target
    }

    pub fn dragged(&self) -> i64 {
        self.dragged
    }

    pub fn order(&self) -> &[i64] {
        &self.order
    }

    /// Moves the dragged row to follow the pointer. Rows from other lists are ignored.
    pub fn drag_over(&mut self, pointer_y: f64, rows: &[RowBounds]) {
        let siblings: Vec<RowBounds> = rows
            .iter()
            .filter(|row| self.order.contains(&row.id))
            .copied()
            .collect();
        let before = insertion_point(pointer_y, &siblings, self.dragged);

        self.order.retain(|id| *id != self.dragged);
        let index = before
            .and_then(|id| self.order.iter().position(|candidate| *candidate == id))
            .unwrap_or(self.order.len());
        self.order.insert(index, self.dragged);
    }

    /// Submits the order and reloads regardless of the outcome. Returns whether the
    /// backend accepted the order.
    pub async fn drop<G: TaskGateway>(self, store: &TaskStore<G>) -> bool {
        let submitted = match self.target {
            ReorderTarget::Tasks(_) => store.gateway().reorder_tasks(&self.order).await,
            ReorderTarget::Subtasks(task_id) => {
                store
                    .gateway()
                    .reorder_subtasks(task_id, &self.order)
                    .await
            }
        };
        let accepted = match submitted {
            Ok(()) => {
                log::debug!("reorder: {:?} saved {:?}", self.target, self.order);
                true
            }
            Err(err) => {
                log::warn!("reorder: {:?} failed: {err}", self.target);
                false
            }
        };
        if let Err(err) = store.load().await {
            log::debug!("reorder: reload after drop failed: {err}");
        }
        accepted
    }
}

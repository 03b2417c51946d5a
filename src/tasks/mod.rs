//! Background task primitives: progress channel, cancellation, slots

pub mod cancel;
pub mod slot;

pub use cancel::CancelToken;
pub use slot::{SlotBusy, TaskSlot};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::library::PlaylistRecord;

/// Free-text progress update with an optional aggregate position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMessage {
    pub text: String,
    /// 1-based `(position, total)` at the granularity of the task's outer
    /// unit of work
    pub position: Option<(usize, usize)>,
}

/// Terminal outcome of a task, delivered exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    PartialFailure,
    Cancelled,
    FatalError,
}

/// Events streamed from a running task back to its owner, in emission order
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Ordinary progress update
    Progress(ProgressMessage),
    /// Search hit: a public playlist, not yet part of the collection
    PlaylistFound { record: PlaylistRecord, cover: Bytes },
    /// A playlist was persisted into the collection
    PlaylistAdded { record: PlaylistRecord, cover: Bytes },
    /// Correction notice: the effective search username changed and the
    /// owner should reflect it
    UsernameUpdated(String),
    /// Terminal signal; nothing is delivered after it
    Finished(TaskOutcome),
}

/// Sending half of a task's event channel
#[derive(Clone)]
pub struct TaskSender(mpsc::Sender<TaskEvent>);

impl TaskSender {
    pub(crate) fn new(tx: mpsc::Sender<TaskEvent>) -> Self {
        Self(tx)
    }

    /// A closed receiver means the owner stopped listening; the task still
    /// runs to its own terminal state
    pub async fn send(&self, event: TaskEvent) {
        let _ = self.0.send(event).await;
    }

    pub async fn progress(&self, text: impl Into<String>, position: Option<(usize, usize)>) {
        self.send(TaskEvent::Progress(ProgressMessage {
            text: text.into(),
            position,
        }))
        .await;
    }
}

/// Everything a pipeline receives from its slot: the cancellation token and
/// the outbound event channel
pub struct TaskContext {
    pub cancel: CancelToken,
    pub events: TaskSender,
}

//! Single-task-at-a-time slot guard

use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{CancelToken, TaskContext, TaskEvent, TaskOutcome, TaskSender};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Start request rejected: the slot's current task has not yet delivered
/// its terminal signal
#[derive(Debug, Error, PartialEq, Eq)]
#[error("a {0} task is already running")]
pub struct SlotBusy(pub &'static str);

struct ActiveTask {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Exclusivity guard permitting at most one live task.
///
/// A start request while the slot is occupied is rejected, never queued.
/// Slots are independent of each other; keep one slot per operation kind.
pub struct TaskSlot {
    name: &'static str,
    active: Option<ActiveTask>,
}

impl TaskSlot {
    pub fn new(name: &'static str) -> Self {
        Self { name, active: None }
    }

    /// Whether the slot currently holds a live task
    pub fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Launch a task on this slot.
    ///
    /// On acceptance the factory receives a fresh cancellation token and a
    /// fresh event channel, and the task is spawned on the background
    /// runtime. The returned receiver yields events in emission order and
    /// ends with exactly one [`TaskEvent::Finished`], after which the slot
    /// is free again.
    pub fn start<F, Fut>(&mut self, factory: F) -> Result<mpsc::Receiver<TaskEvent>, SlotBusy>
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        if self.is_busy() {
            return Err(SlotBusy(self.name));
        }

        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task = factory(TaskContext {
            cancel: cancel.clone(),
            events: TaskSender::new(tx.clone()),
        });

        let name = self.name;
        let handle = tokio::spawn(async move {
            let outcome = task.await;
            debug!("{} task finished: {:?}", name, outcome);
            let _ = tx.send(TaskEvent::Finished(outcome)).await;
        });

        self.active = Some(ActiveTask { cancel, handle });
        Ok(rx)
    }

    /// Request cancellation of the slot's current task; a no-op when the
    /// slot is empty or already finished
    pub fn cancel(&self) {
        if let Some(task) = &self.active {
            if !task.handle.is_finished() {
                task.cancel.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn drain(mut rx: mpsc::Receiver<TaskEvent>) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    async fn wait_idle(slot: &TaskSlot) {
        for _ in 0..200 {
            if !slot.is_busy() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("slot did not go idle");
    }

    #[tokio::test]
    async fn test_start_rejected_while_busy() {
        let mut slot = TaskSlot::new("test");
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();

        let rx = slot
            .start(move |_ctx| async move {
                let _ = gate_rx.await;
                TaskOutcome::Success
            })
            .unwrap();

        assert!(slot.is_busy());
        assert_eq!(
            slot.start(|_ctx| async { TaskOutcome::Success }).unwrap_err(),
            SlotBusy("test")
        );

        gate_tx.send(()).unwrap();
        let events = drain(rx).await;
        assert!(matches!(
            events.last(),
            Some(TaskEvent::Finished(TaskOutcome::Success))
        ));
    }

    #[tokio::test]
    async fn test_terminal_signal_fires_exactly_once_and_last() {
        let mut slot = TaskSlot::new("test");
        let rx = slot
            .start(|ctx| async move {
                ctx.events.progress("one", None).await;
                ctx.events.progress("two", Some((2, 2))).await;
                TaskOutcome::PartialFailure
            })
            .unwrap();

        let events = drain(rx).await;
        let terminal_count = events
            .iter()
            .filter(|event| matches!(event, TaskEvent::Finished(_)))
            .count();
        assert_eq!(terminal_count, 1);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[2],
            TaskEvent::Finished(TaskOutcome::PartialFailure)
        ));
    }

    #[tokio::test]
    async fn test_cancel_sets_token_of_running_task() {
        let mut slot = TaskSlot::new("test");
        let rx = slot
            .start(|ctx| async move {
                loop {
                    if ctx.cancel.is_cancelled() {
                        return TaskOutcome::Cancelled;
                    }
                    tokio::task::yield_now().await;
                }
            })
            .unwrap();

        slot.cancel();
        let events = drain(rx).await;
        assert!(matches!(
            events.last(),
            Some(TaskEvent::Finished(TaskOutcome::Cancelled))
        ));
    }

    #[tokio::test]
    async fn test_cancel_on_idle_slot_is_noop() {
        let slot = TaskSlot::new("test");
        slot.cancel();
        assert!(!slot.is_busy());
    }

    #[tokio::test]
    async fn test_slot_reusable_after_terminal_signal() {
        let mut slot = TaskSlot::new("test");

        let rx = slot.start(|_ctx| async { TaskOutcome::Success }).unwrap();
        drain(rx).await;
        wait_idle(&slot).await;

        let rx = slot.start(|_ctx| async { TaskOutcome::Success }).unwrap();
        let events = drain(rx).await;
        assert!(matches!(
            events.last(),
            Some(TaskEvent::Finished(TaskOutcome::Success))
        ));
    }
}

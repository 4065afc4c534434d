//! Unbounded FIFO hand-off between the HTTP handlers and the pipeline worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

use crate::error::{DiffError, Result};
use crate::task::Task;

/// Create a connected sender/receiver pair.
pub fn task_queue() -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        TaskSender {
            tx,
            pending: Arc::clone(&pending),
        },
        TaskReceiver { rx, pending },
    )
}

/// Producer side. Cheap to clone; enqueueing never blocks.
#[derive(Clone)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<Task>,
    pending: Arc<AtomicUsize>,
}

impl TaskSender {
    /// Returns the number of tasks waiting after this one was added.
    pub fn enqueue(&self, task: Task) -> Result<usize> {
        // Count first so the consumer can never decrement below zero
        let waiting = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(DiffError::QueueClosed);
        }
        Ok(waiting)
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side. Exactly one exists, owned by the pipeline worker.
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<Task>,
    pending: Arc<AtomicUsize>,
}

impl TaskReceiver {
    /// Wait for the next task. Returns `None` once every sender is dropped
    /// and the queue is drained.
    pub async fn next(&mut self) -> Option<Task> {
        let task = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(task)
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::PushEvent;

    fn task(after: &str) -> Task {
        Task::new(PushEvent {
            before: "0000".to_string(),
            after: after.to_string(),
            clone_url: "https://example.org/repo.git".to_string(),
            html_url: "https://example.org/repo".to_string(),
        })
    }

    #[tokio::test]
    async fn dequeues_in_enqueue_order() {
        let (tx, mut rx) = task_queue();
        for i in 0..50 {
            tx.enqueue(task(&format!("{:04x}", i))).unwrap();
        }
        assert_eq!(rx.pending(), 50);

        for i in 0..50 {
            let next = rx.next().await.unwrap();
            assert_eq!(next.event.after, format!("{:04x}", i));
        }
        assert_eq!(tx.pending(), 0);
    }

    #[tokio::test]
    async fn concurrent_producers_preserve_global_order() {
        let (tx, mut rx) = task_queue();
        let enqueued = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for producer in 0..8 {
            let tx = tx.clone();
            let enqueued = Arc::clone(&enqueued);
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    let after = format!("{:02x}{:02x}", producer, i);
                    // Record and send under one lock so the log matches send order
                    let mut log = enqueued.lock().unwrap();
                    tx.enqueue(task(&after)).unwrap();
                    log.push(after);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(tx);

        let mut dequeued = Vec::new();
        while let Some(next) = rx.next().await {
            dequeued.push(next.event.after);
        }

        assert_eq!(dequeued.len(), 200);
        assert_eq!(dequeued, *enqueued.lock().unwrap());
    }

    #[tokio::test]
    async fn consumer_blocks_until_a_task_arrives() {
        let (tx, mut rx) = task_queue();

        let consumer = tokio::spawn(async move { rx.next().await.map(|t| t.event.after) });
        tokio::task::yield_now().await;
        assert!(!consumer.is_finished());

        tx.enqueue(task("abcd")).unwrap();
        assert_eq!(consumer.await.unwrap().as_deref(), Some("abcd"));
    }

    #[tokio::test]
    async fn enqueue_fails_once_consumer_is_gone() {
        let (tx, rx) = task_queue();
        drop(rx);

        assert!(tx.is_closed());
        assert!(matches!(tx.enqueue(task("abcd")), Err(DiffError::QueueClosed)));
        assert_eq!(tx.pending(), 0);
    }
}

//! Per-user ordering of background record writes.
//!
//! Jobs for the same user run one at a time, in the order they were
//! enqueued. Jobs for different users run concurrently. Ordering is fixed
//! at enqueue time (synchronously, on the caller's thread), not by whichever
//! spawned task the runtime happens to poll first.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use playtime_domain::UserId;

/// Completion signal of the most recently enqueued job for a user.
struct Tail {
    ticket: u64,
    done: oneshot::Receiver<()>,
}

/// Signals the next job and retires this job's tail when dropped, so a
/// panicking job neither stalls its user nor leaves a stale tail behind.
struct Completion {
    user_id: UserId,
    ticket: u64,
    done: Option<oneshot::Sender<()>>,
    tails: Arc<DashMap<UserId, Tail>>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
        let ticket = self.ticket;
        self.tails
            .remove_if(&self.user_id, |_, tail| tail.ticket == ticket);
    }
}

/// Keyed job queue for background storage work.
#[derive(Default)]
pub struct UserWriteQueue {
    tails: Arc<DashMap<UserId, Tail>>,
    next_ticket: AtomicU64,
    tracker: TaskTracker,
}

impl UserWriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `job` after every job previously enqueued for `user_id`.
    pub fn enqueue<F>(&self, user_id: UserId, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = oneshot::channel();
        let previous = self.tails.insert(
            user_id,
            Tail {
                ticket,
                done: done_rx,
            },
        );
        let completion = Completion {
            user_id,
            ticket,
            done: Some(done_tx),
            tails: Arc::clone(&self.tails),
        };

        self.tracker.spawn(async move {
            let _completion = completion;
            if let Some(previous) = previous {
                // Err: the previous job died without signalling. Run anyway.
                let _ = previous.done.await;
            }

            job.await;
        })
    }

    /// Users with at least one job queued or running.
    pub fn pending_users(&self) -> usize {
        self.tails.len()
    }

    /// Jobs spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait up to `timeout` for every job enqueued so far to finish.
    ///
    /// Returns `false` if jobs were still running when the timeout elapsed.
    /// Jobs may still be enqueued afterwards.
    pub async fn flush(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let idle = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        idle
    }
}

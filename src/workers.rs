//! A fixed-size pool of workers draining one shared queue.

use std::{collections::VecDeque, fmt::Display, future::Future, sync::Arc};

use futures::future::join_all;
use parking_lot::Mutex;

use crate::SyncError;

/// An item handed to a worker, together with its position in the stage.
#[derive(Debug)]
pub struct Claim<T> {
    /// 1-based id of the worker that claimed the item.
    pub worker: usize,
    /// 1-based number of the claim within the stage.
    pub index: usize,
    pub total: usize,
    pub item: T,
}

struct Queue<T> {
    pending: VecDeque<T>,
    claimed: usize,
    total: usize,
}

impl<T> Queue<T> {
    fn claim(&mut self, worker: usize) -> Option<Claim<T>> {
        let item = self.pending.pop_front()?;
        self.claimed += 1;
        Some(Claim {
            worker,
            index: self.claimed,
            total: self.total,
            item,
        })
    }
}

/// Runs `job` for every item on `workers` concurrent tasks and waits for all
/// of them to finish.
///
/// A worker stops at the first error of its own, siblings keep draining the
/// queue. Once every worker has exited the first error (in worker order) is
/// returned.
pub async fn run_pool<T, F, Fut>(
    stage: &'static str,
    workers: usize,
    items: impl IntoIterator<Item = T>,
    job: F,
) -> Result<(), SyncError>
where
    T: Display + Send + 'static,
    F: Fn(Claim<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SyncError>> + Send + 'static,
{
    let pending: VecDeque<T> = items.into_iter().collect();
    let total = pending.len();
    let queue = Arc::new(Mutex::new(Queue {
        pending,
        claimed: 0,
        total,
    }));
    let job = Arc::new(job);
    let pb = arkres_progress::stage_progress_bar(stage, total as u64);

    let handles = (1..=workers.max(1)).map(|worker| {
        let queue = queue.clone();
        let job = job.clone();
        let pb = pb.clone();
        tokio::spawn(async move {
            loop {
                let Some(claim) = queue.lock().claim(worker) else {
                    return Ok(());
                };
                let label = claim.item.to_string();
                if let Err(err) = job(claim).await {
                    tracing::error!("[Worker {worker}] Failed on {label}: {err}");
                    return Err(err);
                }
                pb.inc(1);
            }
        })
    });

    let mut first_error = None;
    for result in join_all(handles).await {
        let result = result.map_err(|source| SyncError::WorkerPanicked { stage, source });
        if let Err(err) = result.and_then(|outcome| outcome) {
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }

    match first_error {
        Some(err) => {
            arkres_progress::finish_stage(&pb, true, "failed");
            Err(err)
        }
        None => {
            arkres_progress::finish_stage(&pb, false, format!("{total} done"));
            Ok(())
        }
    }
}

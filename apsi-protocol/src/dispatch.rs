//! Work-distribution strategies.
//!
//! Every pass of an interaction is "run this task for each index in
//! `0..len`". A [`Strategy`] decides how those indices reach threads:
//!
//! - `Sequential`: the caller's thread walks the indices in order.
//! - `Unbounded`: one scoped thread per index.
//! - `BoundedQueue`: a fixed pool drains a pre-loaded, closed channel.
//! - `AtomicDispatch`: a fixed pool claims indices from a shared counter.
//! - `StaticPartition`: a fixed pool, each thread owning one contiguous range.
//!
//! Each call to [`Strategy::run`] joins all of its threads before returning,
//! which is the barrier between the server and client passes.
//!
//! The first failing task aborts the run: other workers stop picking up new
//! indices and the error is returned. A panicking worker turns into
//! `ApsiError::WorkerPanicked`.

use crate::error::{ApsiError, Result};
use crossbeam::channel;
use crossbeam::thread::ScopedJoinHandle;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// How the per-element work of a pass is scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Sequential,
    Unbounded,
    BoundedQueue { workers: usize },
    AtomicDispatch { workers: usize },
    StaticPartition { workers: usize },
}

impl Strategy {
    /// Short name used in logs and benchmark tables.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Unbounded => "unbounded",
            Strategy::BoundedQueue { .. } => "queue",
            Strategy::AtomicDispatch { .. } => "atomic",
            Strategy::StaticPartition { .. } => "partition",
        }
    }

    /// Size of the worker pool, for the bounded strategies.
    pub fn workers(&self) -> Option<usize> {
        match self {
            Strategy::Sequential | Strategy::Unbounded => None,
            Strategy::BoundedQueue { workers }
            | Strategy::AtomicDispatch { workers }
            | Strategy::StaticPartition { workers } => Some(*workers),
        }
    }

    /// The three bounded strategies with the same pool size.
    pub fn bounded(workers: usize) -> [Strategy; 3] {
        [
            Strategy::BoundedQueue { workers },
            Strategy::AtomicDispatch { workers },
            Strategy::StaticPartition { workers },
        ]
    }

    /// Reject a bounded strategy with an empty pool.
    pub fn validate(&self) -> Result<()> {
        match self.workers() {
            Some(0) => Err(ApsiError::InvalidWorkerCount),
            _ => Ok(()),
        }
    }

    /// Run `task` once for every index in `0..len`.
    ///
    /// Returns after every spawned worker has been joined.
    pub(crate) fn run<F>(&self, len: usize, task: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Sync,
    {
        self.validate()?;
        match *self {
            Strategy::Sequential => (0..len).try_for_each(&task),
            Strategy::Unbounded => run_unbounded(len, &task),
            Strategy::BoundedQueue { workers } => run_queue(len, workers, &task),
            Strategy::AtomicDispatch { workers } => run_atomic(len, workers, &task),
            Strategy::StaticPartition { workers } => run_partitioned(len, workers, &task),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.workers() {
            Some(workers) => write!(f, "{}({})", self.name(), workers),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Split `0..len` into `workers` contiguous ranges of `ceil(len / workers)`.
///
/// Trailing ranges are empty when there are more workers than indices.
pub fn partition(len: usize, workers: usize) -> impl Iterator<Item = Range<usize>> {
    let chunk = if workers == 0 { 0 } else { len.div_ceil(workers) };
    (0..workers).map(move |worker| {
        let start = (worker * chunk).min(len);
        let end = (start + chunk).min(len);
        start..end
    })
}

fn run_unbounded<F>(len: usize, task: &F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync,
{
    let abort = AtomicBool::new(false);
    let joined = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..len)
            .map(|index| {
                let abort = &abort;
                scope.spawn(move |_| guarded(abort, || task(index)))
            })
            .collect();
        join_all(handles)
    });
    finish(joined)
}

fn run_queue<F>(len: usize, workers: usize, task: &F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync,
{
    let (sender, receiver) = channel::unbounded();
    for index in 0..len {
        sender
            .send(index)
            .map_err(|e| ApsiError::QueueClosed(e.to_string()))?;
    }
    // Workers stop once the queue is drained.
    drop(sender);

    let abort = AtomicBool::new(false);
    let joined = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let receiver = receiver.clone();
                let abort = &abort;
                scope.spawn(move |_| -> Result<()> {
                    for index in receiver.iter() {
                        guarded(abort, || task(index))?;
                    }
                    Ok(())
                })
            })
            .collect();
        join_all(handles)
    });
    finish(joined)
}

fn run_atomic<F>(len: usize, workers: usize, task: &F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync,
{
    let next = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);
    let joined = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let next = &next;
                let abort = &abort;
                scope.spawn(move |_| -> Result<()> {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= len {
                            return Ok(());
                        }
                        guarded(abort, || task(index))?;
                    }
                })
            })
            .collect();
        join_all(handles)
    });
    finish(joined)
}

fn run_partitioned<F>(len: usize, workers: usize, task: &F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync,
{
    let abort = AtomicBool::new(false);
    let joined = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = partition(len, workers)
            .map(|range| {
                let abort = &abort;
                scope.spawn(move |_| -> Result<()> {
                    for index in range {
                        guarded(abort, || task(index))?;
                    }
                    Ok(())
                })
            })
            .collect();
        join_all(handles)
    });
    finish(joined)
}

/// Collapse a scope outcome; an unjoined panic aborts the run.
fn finish(joined: std::thread::Result<Result<()>>) -> Result<()> {
    joined.unwrap_or(Err(ApsiError::WorkerPanicked))
}

/// Join every worker, keeping the first failure.
fn join_all(handles: Vec<ScopedJoinHandle<'_, Result<()>>>) -> Result<()> {
    let mut outcome = Ok(());
    for handle in handles {
        let joined = handle.join().unwrap_or(Err(ApsiError::WorkerPanicked));
        if outcome.is_ok() {
            outcome = joined;
        }
    }
    outcome
}

/// Run one task unless the pass has already been aborted.
fn guarded(abort: &AtomicBool, work: impl FnOnce() -> Result<()>) -> Result<()> {
    if abort.load(Ordering::Relaxed) {
        return Ok(());
    }
    let _on_panic = AbortOnPanic(abort);
    let outcome = work();
    if outcome.is_err() {
        abort.store(true, Ordering::Relaxed);
    }
    outcome
}

struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

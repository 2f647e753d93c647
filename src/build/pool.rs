//! A fixed-size worker pool over a `Mutex`-guarded task queue plus a `Condvar`, with a
//! `shared_future`-equivalent result handle so multiple dependents can block on one task.
//!
//! `std::sync::mpsc` is not a fit here because `shared_future::get()` must be callable by more
//! than one dependent, so the result is instead stored in an `Arc<Mutex<Option<T>>>` paired with
//! a `Condvar` that both the worker and every waiter share.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::errors::CompileError;

struct Slot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

/// A clonable handle to a value produced by exactly one `ThreadPool::submit` task, blocking
/// until that task completes. Stands in for `std::shared_future`: dependent tasks call `get()`
/// on their dependencies' futures, blocking until resolved.
pub struct SharedFuture<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        SharedFuture { slot: self.slot.clone() }
    }
}

impl<T: Clone> SharedFuture<T> {
    fn new() -> (SharedFuture<T>, Arc<Slot<T>>) {
        let slot = Arc::new(Slot { value: Mutex::new(None), ready: Condvar::new() });
        (SharedFuture { slot: slot.clone() }, slot)
    }

    pub fn get(&self) -> T {
        let mut guard = self.slot.value.lock().unwrap();
        while guard.is_none() {
            guard = self.slot.ready.wait(guard).unwrap();
        }
        guard.clone().expect("checked by the wait loop above")
    }
}

fn resolve<T>(slot: &Slot<T>, value: T) {
    *slot.value.lock().unwrap() = Some(value);
    slot.ready.notify_all();
}

type Job = Box<dyn FnOnce() + Send>;

pub struct ThreadPool {
    workers: Vec<JoinHandle<()>>,
    queue: Arc<Mutex<VecDeque<Job>>>,
    condition: Arc<Condvar>,
    stop: Arc<AtomicBool>,
    in_progress: Arc<AtomicUsize>,
}

impl ThreadPool {
    pub fn new(num_threads: usize) -> ThreadPool {
        let queue: Arc<Mutex<VecDeque<Job>>> = Arc::new(Mutex::new(VecDeque::new()));
        let condition = Arc::new(Condvar::new());
        let stop = Arc::new(AtomicBool::new(false));
        let in_progress = Arc::new(AtomicUsize::new(0));

        let workers = (0..num_threads.max(1))
            .map(|_| {
                let queue = queue.clone();
                let condition = condition.clone();
                let stop = stop.clone();
                std::thread::spawn(move || worker_loop(queue, condition, stop))
            })
            .collect();

        ThreadPool { workers, queue, condition, stop, in_progress }
    }

    /// Enqueues a task and returns a future for its result. Fails loudly if the pool has already
    /// been asked to shut down.
    pub fn submit<T, F>(&self, task: F) -> Result<SharedFuture<T>, CompileError>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.stop.load(Ordering::SeqCst) {
            return Err(CompileError::io("cannot submit work: the build thread pool is shut down".to_string()));
        }
        let (future, slot) = SharedFuture::new();
        let in_progress = self.in_progress.clone();
        let condition = self.condition.clone();
        self.in_progress.fetch_add(1, Ordering::SeqCst);

        let job: Job = Box::new(move || {
            let result = task();
            resolve(&slot, result);
            in_progress.fetch_sub(1, Ordering::SeqCst);
            condition.notify_all();
        });

        self.queue.lock().unwrap().push_back(job);
        self.condition.notify_one();
        Ok(future)
    }

    /// Blocks until the queue is empty and the in-progress counter is zero.
    pub fn wait_all(&self) {
        let mut guard = self.queue.lock().unwrap();
        loop {
            if guard.is_empty() && self.in_progress.load(Ordering::SeqCst) == 0 {
                return;
            }
            guard = self.condition.wait(guard).unwrap();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.condition.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(queue: Arc<Mutex<VecDeque<Job>>>, condition: Arc<Condvar>, stop: Arc<AtomicBool>) {
    loop {
        let job = {
            let mut guard = queue.lock().unwrap();
            loop {
                if let Some(job) = guard.pop_front() {
                    break Some(job);
                }
                if stop.load(Ordering::SeqCst) {
                    break None;
                }
                guard = condition.wait(guard).unwrap();
            }
        };
        match job {
            Some(job) => job(),
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn runs_submitted_tasks_and_waits_for_completion() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicI32::new(0));
        let mut futures = Vec::new();
        for i in 0..8 {
            let counter = counter.clone();
            futures.push(
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    i * 2
                })
                .unwrap(),
            );
        }
        pool.wait_all();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        let sum: i32 = futures.iter().map(|f| f.get()).sum();
        assert_eq!(sum, (0..8).map(|i| i * 2).sum());
    }

    #[test]
    fn dependents_block_on_dependency_futures() {
        let pool = ThreadPool::new(2);
        let dep = pool.submit(|| 41).unwrap();
        let dep_clone = dep.clone();
        let dependent = pool.submit(move || dep_clone.get() + 1).unwrap();
        assert_eq!(dependent.get(), 42);
    }
}

//! Single serial worker queue.
//!
//! Jobs run one at a time, in the order they were dispatched, on one
//! dedicated worker thread. [`SerialQueue::drain`] closes the queue and
//! joins the worker once every job has run.

use anyhow::{Context, Result};
use colored::Colorize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct SerialQueue {
    label: String,
    sender: Option<mpsc::Sender<Job>>,
    worker: Option<thread::JoinHandle<usize>>,
}

impl SerialQueue {
    /// Start the worker thread.
    pub fn new(label: &str) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker_label = label.to_string();

        let worker = thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                let mut panicked = 0;
                for job in receiver {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        eprintln!(
                            "{} A job on queue '{}' panicked",
                            "Warning:".yellow(),
                            worker_label
                        );
                        panicked += 1;
                    }
                }
                panicked
            })
            .with_context(|| format!("Failed to start worker for queue '{}'", label))?;

        Ok(Self {
            label: label.to_string(),
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Append a job to the queue.
    pub fn dispatch<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .with_context(|| format!("Queue '{}' is closed", self.label))?;
        sender
            .send(Box::new(job))
            .map_err(|_| anyhow::anyhow!("Worker for queue '{}' has stopped", self.label))
    }

    /// Close the queue and wait for every dispatched job to finish.
    ///
    /// Returns the number of jobs that panicked.
    pub fn drain(mut self) -> Result<usize> {
        self.sender.take();
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| anyhow::anyhow!("Worker for queue '{}' crashed", self.label)),
            None => Ok(0),
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_jobs_run_in_dispatch_order() {
        let queue = SerialQueue::new("test").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20 {
            let seen = seen.clone();
            queue
                .dispatch(move || {
                    // Earlier jobs sleep longer; order must still hold.
                    thread::sleep(Duration::from_millis(20 - i));
                    seen.lock().unwrap().push(i);
                })
                .unwrap();
        }

        assert_eq!(queue.drain().unwrap(), 0);
        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_jobs_run_one_at_a_time() {
        let queue = SerialQueue::new("test").unwrap();
        let running = Arc::new(Mutex::new(0usize));
        let max_running = Arc::new(Mutex::new(0usize));

        for _ in 0..8 {
            let running = running.clone();
            let max_running = max_running.clone();
            queue
                .dispatch(move || {
                    {
                        let mut now = running.lock().unwrap();
                        *now += 1;
                        let mut max = max_running.lock().unwrap();
                        *max = (*max).max(*now);
                    }
                    thread::sleep(Duration::from_millis(2));
                    *running.lock().unwrap() -= 1;
                })
                .unwrap();
        }

        queue.drain().unwrap();
        assert_eq!(*max_running.lock().unwrap(), 1);
    }

    #[test]
    fn test_panicking_job_does_not_stop_the_queue() {
        let queue = SerialQueue::new("test").unwrap();
        let ran = Arc::new(Mutex::new(false));

        queue.dispatch(|| panic!("boom")).unwrap();
        let flag = ran.clone();
        queue.dispatch(move || *flag.lock().unwrap() = true).unwrap();

        assert_eq!(queue.drain().unwrap(), 1);
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn test_drain_on_empty_queue() {
        let queue = SerialQueue::new("empty").unwrap();
        assert_eq!(queue.label(), "empty");
        assert_eq!(queue.drain().unwrap(), 0);
    }
}

//! Background refresh and commit tasks.

use crate::error::IndexResult;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// How long [`Scheduler::shutdown`] waits for each task before detaching it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A named thread running `tick` every `interval` until cancelled.
///
/// Errors and panics raised by `tick` are logged and the schedule
/// continues.
#[derive(Debug)]
pub(crate) struct PeriodicTask {
    name: String,
    cancel: Sender<()>,
    finished: Receiver<()>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub(crate) fn spawn<F>(name: String, interval: Duration, mut tick: F) -> IndexResult<Self>
    where
        F: FnMut() -> IndexResult<()> + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();
        // Dropped when the thread exits, which disconnects `finished`.
        let (done, finished) = mpsc::channel::<()>();
        let task_name = name.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let _done = done;
            loop {
                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                match catch_unwind(AssertUnwindSafe(&mut tick)) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(task = %task_name, error = %e, "background task failed"),
                    Err(_) => warn!(task = %task_name, "background task panicked"),
                }
            }
            debug!(task = %task_name, "background task stopped");
        })?;

        Ok(Self {
            name,
            cancel,
            finished,
            handle,
        })
    }

    /// Thread name.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn cancel(&self) {
        // The thread may already be gone; nothing to do then.
        let _ = self.cancel.send(());
    }

    /// Waits up to `grace` for the thread, then detaches it.
    fn join(self, grace: Duration) {
        match self.finished.recv_timeout(grace) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(task = %self.name, "background task did not stop in time; detaching");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    warn!(task = %self.name, "background task thread panicked");
                }
            }
        }
    }
}

/// The periodic tasks owned by one index.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    pub(crate) fn push(&mut self, task: PeriodicTask) {
        self.tasks.push(task);
    }

    pub(crate) fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(PeriodicTask::name)
    }

    /// Cancels every task, then joins each with the grace period.
    pub(crate) fn shutdown(self, grace: Duration) {
        for task in &self.tasks {
            task.cancel();
        }
        for task in self.tasks {
            task.join(grace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn wait_for(counter: &AtomicUsize, at_least: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) < at_least {
            assert!(Instant::now() < deadline, "task did not run");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn runs_until_cancelled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = PeriodicTask::spawn("tick".into(), Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        wait_for(&runs, 3);

        let mut scheduler = Scheduler::default();
        scheduler.push(task);
        assert_eq!(scheduler.task_names().collect::<Vec<_>>(), vec!["tick"]);
        scheduler.shutdown(SHUTDOWN_GRACE);

        let after = runs.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(runs.load(Ordering::SeqCst), after);
    }

    #[test]
    fn survives_errors_and_panics() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = PeriodicTask::spawn("flaky".into(), Duration::from_millis(5), move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(IndexError::ManagerClosed),
                1 => panic!("boom"),
                _ => Ok(()),
            }
        })
        .unwrap();
        wait_for(&runs, 4);

        let mut scheduler = Scheduler::default();
        scheduler.push(task);
        scheduler.shutdown(SHUTDOWN_GRACE);
    }

    #[test]
    fn long_interval_stops_promptly() {
        let task =
            PeriodicTask::spawn("slow".into(), Duration::from_secs(3600), || Ok(())).unwrap();
        let mut scheduler = Scheduler::default();
        scheduler.push(task);

        let started = Instant::now();
        scheduler.shutdown(SHUTDOWN_GRACE);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Named repeating jobs. Each tick is delivered as the job name on the
/// receiver returned by [`Scheduler::new`]; the owner runs the work itself.
pub struct Scheduler {
    jobs: HashMap<&'static str, JoinHandle<()>>,
    tick_tx: mpsc::Sender<&'static str>,
}

impl Scheduler {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<&'static str>) {
        let (tick_tx, tick_rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                jobs: HashMap::new(),
                tick_tx,
            },
            tick_rx,
        )
    }

    /// First tick fires one `period` after registration. A tick is skipped
    /// while the previous one is still queued.
    pub fn register(&mut self, name: &'static str, period: Duration) -> Result<()> {
        if self.jobs.contains_key(name) {
            return Err(Error::DuplicateJob(name));
        }

        let tx = self.tick_tx.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match tx.try_send(name) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });

        debug!("Registered job '{}' every {:?}", name, period);
        self.jobs.insert(name, task);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn stop(&mut self, name: &str) -> bool {
        match self.jobs.remove(name) {
            Some(task) => {
                task.abort();
                debug!("Stopped job '{}'", name);
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (name, task) in self.jobs.drain() {
            task.abort();
            debug!("Stopped job '{}'", name);
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crate::error::MessageBusError;

/// A unit of delivery work queued on the worker.
pub type DeliveryJob = Box<dyn FnOnce() -> Result<(), MessageBusError> + Send + 'static>;

/// Statistics from a stopped delivery worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: usize,
    pub failed: usize,
}

/// Single background thread draining a FIFO queue of delivery jobs.
///
/// Jobs run strictly in submission order, one at a time. Stopping the
/// worker closes the queue, drains what was already submitted, and joins
/// the thread; submissions after that fail with
/// [`MessageBusError::BusUnavailable`] instead of hanging.
pub struct DeliveryWorker {
    job_tx: Mutex<Option<Sender<DeliveryJob>>>,
    handle: Mutex<Option<JoinHandle<DeliveryStats>>>,
}

impl DeliveryWorker {
    /// Spawn the worker thread.
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = channel::<DeliveryJob>();

        let handle = thread::spawn(move || {
            log::debug!("delivery worker started");
            let mut stats = DeliveryStats::default();

            while let Ok(job) = job_rx.recv() {
                match job() {
                    Ok(()) => stats.delivered += 1,
                    Err(e) => {
                        log::error!("async delivery failed: {}", e);
                        stats.failed += 1;
                    }
                }
            }

            log::debug!(
                "delivery worker stopped ({} delivered, {} failed)",
                stats.delivered,
                stats.failed
            );
            stats
        });

        Self {
            job_tx: Mutex::new(Some(job_tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queue a job for execution on the worker thread.
    pub fn submit(&self, job: DeliveryJob) -> Result<(), MessageBusError> {
        let job_tx = self
            .job_tx
            .lock()
            .map_err(|_| MessageBusError::LockPoisoned("submit"))?;

        match job_tx.as_ref() {
            Some(tx) => tx.send(job).map_err(|_| MessageBusError::BusUnavailable),
            None => Err(MessageBusError::BusUnavailable),
        }
    }

    pub fn is_running(&self) -> bool {
        self.job_tx
            .lock()
            .map(|tx| tx.is_some())
            .unwrap_or(false)
    }

    /// Close the queue, drain already-submitted jobs, and join the thread.
    ///
    /// Idempotent: the first call returns the worker's stats, later calls
    /// return `None`.
    pub fn stop(&self) -> Option<DeliveryStats> {
        // Dropping the sender disconnects the channel; the worker loop
        // finishes whatever was already queued and then exits.
        let tx = self.job_tx.lock().ok()?.take();
        drop(tx);

        let handle = self.handle.lock().ok()?.take()?;
        handle.join().ok()
    }
}

impl Drop for DeliveryWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

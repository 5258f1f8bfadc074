use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::{Pipeline, PipelineContext};
use crate::worker::job::{Job, JobResult};

/// How often a blocked [`WorkerPool::submit_unless`] re-checks its stop flag.
const SUBMIT_POLL: Duration = Duration::from_millis(100);

/// Fixed set of threads pulling jobs off a bounded queue.
///
/// Shutdown stops intake but lets the workers finish whatever is already
/// queued; [`WorkerPool::wait`] returns once the queue is empty.
pub struct WorkerPool {
    job_sender: Sender<Job>,
    result_receiver: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(pipeline: Arc<Pipeline>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (job_sender, job_receiver) = bounded::<Job>(worker_count * 2);
        // Unbounded so a worker never blocks on a caller that stopped reading.
        let (result_sender, result_receiver) = unbounded::<JobResult>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let worker_pipeline = Arc::clone(&pipeline);

            let handle = thread::spawn(move || {
                run_worker(worker_id, job_rx, result_tx, worker_pipeline);
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    /// Queues a job. Blocks while the queue is full.
    pub fn submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Like [`submit`](Self::submit), but gives up while the queue is full
    /// once `stop` is set. Returns false when the job was not queued.
    pub fn submit_unless(&self, job: Job, stop: &AtomicBool) -> Result<bool, WorkerError> {
        let mut job = job;
        loop {
            if self.is_shutdown() || stop.load(Ordering::Relaxed) {
                debug!("Dropping job {} for {:?}: stopping", job.id, job.source_path);
                return Ok(false);
            }

            match self.job_sender.send_timeout(job, SUBMIT_POLL) {
                Ok(()) => return Ok(true),
                Err(SendTimeoutError::Timeout(returned)) => job = returned,
                Err(SendTimeoutError::Disconnected(_)) => return Err(WorkerError::ChannelClosed),
            }
        }
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobResult> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Closes the queue, joins every worker, and hands back results nobody
    /// collected yet.
    pub fn wait(self) -> Vec<JobResult> {
        // Drop sender to signal workers to exit once the queue drains
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
        self.result_receiver.try_iter().collect()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<Job>,
    result_sender: Sender<JobResult>,
    pipeline: Arc<Pipeline>,
) {
    debug!("Worker {} started", worker_id);

    while let Ok(job) = job_receiver.recv() {
        debug!(
            "Worker {} processing job {} ({}): {:?}",
            worker_id, job.id, job.trigger, job.source_path
        );

        let (result, _ctx) = pipeline.run(PipelineContext::new(job));

        if let Err(e) = result_sender.send(result) {
            error!("Worker {} failed to send result: {}", worker_id, e);
            break;
        }
    }

    debug!("Worker {} stopped", worker_id);
}

//! Chunk preparation worker pool.
//!
//! Requests are pushed through a bounded channel to a fixed set of worker
//! threads. Finished runs come back through a second bounded channel and are
//! delivered on the thread that calls [`ChunkPrepPool::poll`]: successes
//! resolve the request's promise, failures invoke its error callback and
//! leave the promise unresolved.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Instant;

use chunkwire_config::PipelineConfig;
use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;

use crate::cached_chunk::CachedChunk;
use crate::compression::Compressor;
use crate::promise::Promise;
use crate::request::ChunkPrepRequest;
use crate::PrepError;

/// Called on the polling thread when a run fails.
pub type ErrorCallback = Box<dyn FnOnce(&PrepError) + Send + Sync>;

/// Lifecycle of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrepState {
    Created = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl PrepState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Caller-side view of one submitted request.
#[derive(Debug, Clone)]
pub struct PrepHandle {
    ticket: u64,
    promise: Promise<CachedChunk>,
    state: Arc<AtomicU8>,
}

impl PrepHandle {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn promise(&self) -> &Promise<CachedChunk> {
        &self.promise
    }

    pub fn state(&self) -> PrepState {
        PrepState::from_u8(self.state.load(Ordering::Acquire))
    }
}

struct PendingPrep {
    promise: Promise<CachedChunk>,
    state: Arc<AtomicU8>,
    on_error: Option<ErrorCallback>,
}

struct Job {
    ticket: u64,
    request: ChunkPrepRequest,
    state: Arc<AtomicU8>,
}

struct Completion {
    ticket: u64,
    result: Result<CachedChunk, PrepError>,
    elapsed_us: u64,
}

/// Runs chunk preparations on background threads.
pub struct ChunkPrepPool {
    job_sender: Sender<Job>,
    result_receiver: Receiver<Completion>,
    pending: DashMap<u64, PendingPrep>,
    in_flight: Arc<AtomicU64>,
    next_ticket: AtomicU64,
    worker_count: usize,
}

impl ChunkPrepPool {
    /// Spawns `thread_count` workers (at least one).
    ///
    /// - `max_in_flight`: queued requests beyond this are handed back.
    /// - `result_capacity`: finished runs buffered until [`poll`](Self::poll).
    pub fn new(
        thread_count: usize,
        max_in_flight: usize,
        result_capacity: usize,
        compressor: Arc<dyn Compressor>,
    ) -> Result<Self, PrepError> {
        let thread_count = thread_count.max(1);
        let (job_sender, job_receiver) = bounded::<Job>(max_in_flight.max(1));
        let (result_sender, result_receiver) = bounded::<Completion>(result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));

        for index in 0..thread_count {
            let receiver = job_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let compressor = Arc::clone(&compressor);

            std::thread::Builder::new()
                .name(format!("chunk-prep-{index}"))
                .spawn(move || {
                    tracing::debug!(worker = index, "Chunk prep worker started");
                    while let Ok(job) = receiver.recv() {
                        job.state.store(PrepState::Running as u8, Ordering::Release);
                        let start = Instant::now();
                        let result = panic::catch_unwind(AssertUnwindSafe(|| {
                            job.request.run(compressor.as_ref())
                        }))
                        .unwrap_or_else(|payload| Err(PrepError::Panicked(panic_message(&*payload))));

                        let completion = Completion {
                            ticket: job.ticket,
                            result,
                            elapsed_us: start.elapsed().as_micros() as u64,
                        };
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                        if sender.send(completion).is_err() {
                            break;
                        }
                    }
                    tracing::debug!(worker = index, "Chunk prep worker stopped");
                })
                .map_err(PrepError::Spawn)?;
        }

        tracing::info!(
            workers = thread_count,
            max_in_flight,
            compressor = compressor.name(),
            "Chunk prep pool started"
        );

        Ok(Self {
            job_sender,
            result_receiver,
            pending: DashMap::new(),
            in_flight,
            next_ticket: AtomicU64::new(0),
            worker_count: thread_count,
        })
    }

    /// Pool sized from configuration. Zero worker threads means all cores
    /// but two.
    pub fn from_config(config: &PipelineConfig, compressor: Arc<dyn Compressor>) -> Result<Self, PrepError> {
        let threads = match config.worker_threads {
            0 => num_cpus::get().saturating_sub(2).max(1),
            n => n,
        };
        Self::new(threads, config.max_in_flight, config.result_capacity, compressor)
    }

    /// Queues a request. Returns `Err(request)` when the queue is full.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, request: ChunkPrepRequest) -> Result<PrepHandle, ChunkPrepRequest> {
        self.enqueue(request, None)
    }

    /// Like [`submit`](Self::submit), with a callback run by [`poll`](Self::poll)
    /// if the preparation fails.
    #[allow(clippy::result_large_err)]
    pub fn submit_with_error(
        &self,
        request: ChunkPrepRequest,
        on_error: impl FnOnce(&PrepError) + Send + Sync + 'static,
    ) -> Result<PrepHandle, ChunkPrepRequest> {
        self.enqueue(request, Some(Box::new(on_error)))
    }

    #[allow(clippy::result_large_err)]
    fn enqueue(
        &self,
        request: ChunkPrepRequest,
        on_error: Option<ErrorCallback>,
    ) -> Result<PrepHandle, ChunkPrepRequest> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let handle = PrepHandle {
            ticket,
            promise: Promise::new(),
            state: Arc::new(AtomicU8::new(PrepState::Created as u8)),
        };
        self.pending.insert(
            ticket,
            PendingPrep {
                promise: handle.promise.clone(),
                state: Arc::clone(&handle.state),
                on_error,
            },
        );
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let job = Job {
            ticket,
            request,
            state: Arc::clone(&handle.state),
        };
        match self.job_sender.try_send(job) {
            Ok(()) => Ok(handle),
            Err(e) => {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                self.pending.remove(&ticket);
                Err(e.into_inner().request)
            }
        }
    }

    /// Delivers finished runs. Call regularly on the originating thread.
    /// Returns how many requests finished.
    pub fn poll(&self) -> usize {
        let mut finished = 0;
        while let Ok(completion) = self.result_receiver.try_recv() {
            let Some((_, pending)) = self.pending.remove(&completion.ticket) else {
                continue;
            };
            finished += 1;
            match completion.result {
                Ok(cached) => {
                    tracing::trace!(
                        ticket = completion.ticket,
                        sub_chunks = cached.sub_chunk_count(),
                        elapsed_us = completion.elapsed_us,
                        "Chunk prepared"
                    );
                    pending.state.store(PrepState::Completed as u8, Ordering::Release);
                    if let Err(err) = pending.promise.resolve(cached) {
                        tracing::error!(ticket = completion.ticket, error = %err, "Prepared chunk dropped");
                    }
                }
                Err(err) => {
                    tracing::warn!(ticket = completion.ticket, error = %err, "Chunk preparation failed");
                    pending.state.store(PrepState::Failed as u8, Ordering::Release);
                    if let Some(on_error) = pending.on_error {
                        on_error(&err);
                    }
                }
            }
        }
        finished
    }

    /// Requests queued or executing on a worker.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Requests submitted but not yet delivered by [`poll`](Self::poll).
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, ticket: u64) -> bool {
        self.pending.contains_key(&ticket)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

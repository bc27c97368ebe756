//! Background chunk jobs
//!
//! A job owns the chunk it works on for its whole run and hands it back in
//! its result, so the main thread and a worker never touch the same chunk
//! at once. The lifecycle state is still stored atomically on the chunk so
//! both sides can observe progress.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::core::block_def::BlockRegistry;
use crate::core::chunk::{Chunk, ChunkState};
use crate::error::ChunkFileError;
use crate::save::{self, ChunkStorage};
use crate::world::generator::{BlockPlacement, TerrainSource};

/// Shared read-only services every job may use.
pub struct JobContext {
    pub registry: Arc<BlockRegistry>,
    pub terrain: Arc<dyn TerrainSource>,
    pub storage: Arc<dyn ChunkStorage>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JobKind {
    Generate,
    Load,
    Save,
}

pub struct ChunkJob {
    pub kind: JobKind,
    pub chunk: Box<Chunk>,
    pub context: Arc<JobContext>,
}

pub enum JobResult {
    Generated {
        chunk: Box<Chunk>,
        overhang: Vec<BlockPlacement>,
    },
    Loaded {
        chunk: Box<Chunk>,
        outcome: Result<(), ChunkFileError>,
    },
    Saved {
        chunk: Box<Chunk>,
        outcome: Result<(), ChunkFileError>,
    },
}

impl JobResult {
    pub fn chunk(&self) -> &Chunk {
        match self {
            JobResult::Generated { chunk, .. }
            | JobResult::Loaded { chunk, .. }
            | JobResult::Saved { chunk, .. } => chunk,
        }
    }
}

impl ChunkJob {
    pub fn new(kind: JobKind, chunk: Box<Chunk>, context: Arc<JobContext>) -> Self {
        Self {
            kind,
            chunk,
            context,
        }
    }

    /// Run the job to completion. The dispatcher has already stored the
    /// matching in-progress state; the job stores the completion state.
    pub fn execute(self) -> JobResult {
        let ChunkJob {
            kind,
            mut chunk,
            context,
        } = self;

        match kind {
            JobKind::Generate => {
                let overhang = context.terrain.populate(&mut chunk, &context.registry);
                chunk.set_state(ChunkState::GenerateComplete);
                JobResult::Generated { chunk, overhang }
            }
            JobKind::Load => {
                let outcome = load_into(&mut chunk, &context);
                chunk.set_state(ChunkState::LoadComplete);
                JobResult::Loaded { chunk, outcome }
            }
            JobKind::Save => {
                let bytes = save::encode_chunk(chunk.blocks());
                let outcome = context
                    .storage
                    .write(chunk.coords(), &bytes)
                    .map_err(ChunkFileError::from);
                chunk.set_state(ChunkState::SaveComplete);
                JobResult::Saved { chunk, outcome }
            }
        }
    }
}

fn load_into(chunk: &mut Chunk, context: &JobContext) -> Result<(), ChunkFileError> {
    let bytes = context.storage.read(chunk.coords())?;
    let types = save::decode_chunk(&bytes)?;
    chunk.fill_from_types(&types, &context.registry);
    Ok(())
}

/// Accepts jobs and hands back finished ones without blocking the caller.
pub trait JobSystem {
    fn submit(&mut self, job: ChunkJob);
    fn poll_completed(&mut self) -> Option<JobResult>;
}

/// Runs each job on the calling thread at submit time.
#[derive(Default)]
pub struct InlineJobs {
    completed: VecDeque<JobResult>,
}

impl InlineJobs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobSystem for InlineJobs {
    fn submit(&mut self, job: ChunkJob) {
        self.completed.push_back(job.execute());
    }

    fn poll_completed(&mut self) -> Option<JobResult> {
        self.completed.pop_front()
    }
}

/// Fixed set of worker threads fed through crossbeam channels.
pub struct WorkerPool {
    job_tx: Option<Sender<ChunkJob>>,
    result_rx: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> std::io::Result<Self> {
        let worker_count = worker_count.max(1);
        let (job_tx, job_rx) = unbounded::<ChunkJob>();
        let (result_tx, result_rx) = unbounded::<JobResult>();

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let rx = job_rx.clone();
            let tx = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("chunk-job-{}", worker_id))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        if tx.send(job.execute()).is_err() {
                            // Pool dropped
                            break;
                        }
                    }
                })?;
            workers.push(handle);
        }

        tracing::info!("Started {} chunk job workers", worker_count);
        Ok(Self {
            job_tx: Some(job_tx),
            result_rx,
            workers,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl JobSystem for WorkerPool {
    fn submit(&mut self, job: ChunkJob) {
        if let Some(tx) = &self.job_tx
            && let Err(err) = tx.send(job)
        {
            tracing::error!("Chunk job queue closed, dropping {:?} job", err.0.kind);
        }
    }

    fn poll_completed(&mut self) -> Option<JobResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the job channel lets every worker finish its current job and exit
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Chunk job worker panicked");
            }
        }
        tracing::info!("Chunk job workers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BlockType;
    use crate::save::MemoryStorage;
    use crate::world::generator::FlatTerrain;
    use glam::{IVec2, IVec3};
    use std::time::{Duration, Instant};

    fn context() -> (Arc<JobContext>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::default());
        let context = Arc::new(JobContext {
            registry: Arc::new(BlockRegistry::standard()),
            terrain: Arc::new(FlatTerrain::new(10)),
            storage: storage.clone(),
        });
        (context, storage)
    }

    #[test]
    fn test_generate_marks_complete() {
        let (context, _) = context();
        let job = ChunkJob::new(JobKind::Generate, Box::new(Chunk::new(IVec2::new(2, -1))), context);
        let JobResult::Generated { chunk, overhang } = job.execute() else {
            panic!("expected a generate result");
        };
        assert_eq!(chunk.state(), ChunkState::GenerateComplete);
        assert_eq!(chunk.block_type_at(IVec3::new(0, 0, 9)), Some(BlockType::Grass));
        assert!(overhang.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let (context, storage) = context();
        let mut chunk = Box::new(Chunk::new(IVec2::new(1, 1)));
        chunk.set_generated_type(IVec3::new(3, 4, 5), BlockType::Glowstone, &context.registry);

        let saved = ChunkJob::new(JobKind::Save, chunk, context.clone()).execute();
        let JobResult::Saved { chunk, outcome } = saved else {
            panic!("expected a save result");
        };
        assert!(outcome.is_ok());
        assert_eq!(chunk.state(), ChunkState::SaveComplete);
        assert_eq!(storage.len(), 1);

        let fresh = Box::new(Chunk::new(IVec2::new(1, 1)));
        let JobResult::Loaded { chunk, outcome } =
            ChunkJob::new(JobKind::Load, fresh, context).execute()
        else {
            panic!("expected a load result");
        };
        assert!(outcome.is_ok());
        assert_eq!(chunk.state(), ChunkState::LoadComplete);
        assert_eq!(chunk.block_type_at(IVec3::new(3, 4, 5)), Some(BlockType::Glowstone));
        assert_eq!(chunk.block_type_at(IVec3::new(3, 4, 6)), Some(BlockType::Air));
    }

    #[test]
    fn test_load_reports_corrupt_file() {
        let (context, storage) = context();
        storage.write(IVec2::ZERO, b"GCHK\x01\x05\x05\x07\x00").unwrap();
        let job = ChunkJob::new(JobKind::Load, Box::new(Chunk::new(IVec2::ZERO)), context);
        let JobResult::Loaded { outcome, .. } = job.execute() else {
            panic!("expected a load result");
        };
        assert!(matches!(outcome, Err(ChunkFileError::Truncated { .. })));
    }

    #[test]
    fn test_inline_jobs_complete_in_order() {
        let (context, _) = context();
        let mut jobs = InlineJobs::new();
        for x in 0..3 {
            jobs.submit(ChunkJob::new(
                JobKind::Generate,
                Box::new(Chunk::new(IVec2::new(x, 0))),
                context.clone(),
            ));
        }
        let order: Vec<i32> = std::iter::from_fn(|| jobs.poll_completed())
            .map(|result| result.chunk().coords().x)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_worker_pool_runs_jobs() {
        let (context, _) = context();
        let mut pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.worker_count(), 2);
        for x in 0..4 {
            pool.submit(ChunkJob::new(
                JobKind::Generate,
                Box::new(Chunk::new(IVec2::new(x, 0))),
                context.clone(),
            ));
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut done = Vec::new();
        while done.len() < 4 && Instant::now() < deadline {
            match pool.poll_completed() {
                Some(result) => done.push(result.chunk().coords().x),
                None => std::thread::sleep(Duration::from_millis(1)),
            }
        }
        done.sort();
        assert_eq!(done, vec![0, 1, 2, 3]);
    }
}

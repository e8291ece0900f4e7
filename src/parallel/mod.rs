//! Batch aggregation over many container files
//!
//! Files run concurrently, each in its own task, so a panic inside one
//! file's processing turns into an error result for that file only. The
//! summary is folded by the single caller task as results arrive.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::processing::{FileResult, FileStatus, ProcessingEngine};

pub mod progress;

pub use progress::*;

/// Stops dispatch of new files once raised
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Accumulated outcome of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub optimized: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Files never dispatched because the run was cancelled
    pub cancelled: usize,
    pub total_original_bytes: u64,
    pub total_optimized_bytes: u64,
    pub bitmaps_changed: usize,
    pub processing_time: Duration,
}

impl BatchSummary {
    /// Fold one file result into the totals
    pub fn record(&mut self, result: &FileResult) {
        match result.status {
            FileStatus::Optimized => self.optimized += 1,
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Error => self.errors += 1,
        }
        self.total_original_bytes += result.original_size;
        self.total_optimized_bytes += result.optimized_size;
        self.bitmaps_changed += result.bitmaps_changed;
    }

    /// Files with a terminal status
    pub fn processed(&self) -> usize {
        self.optimized + self.skipped + self.errors
    }

    /// Get size reduction percentage
    pub fn reduction_percent(&self) -> f64 {
        if self.total_original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.total_optimized_bytes as f64 / self.total_original_bytes as f64) * 100.0
    }

    pub fn original_mb(&self) -> f64 {
        self.total_original_bytes as f64 / 1024.0 / 1024.0
    }

    pub fn optimized_mb(&self) -> f64 {
        self.total_optimized_bytes as f64 / 1024.0 / 1024.0
    }
}

/// Concurrent batch driver over a [`ProcessingEngine`]
pub struct BatchRunner {
    engine: Arc<ProcessingEngine>,
    workers: usize,
    progress_tracker: Arc<ProgressTracker>,
    cancellation: CancellationFlag,
}

impl BatchRunner {
    /// Create a runner; `None` workers uses the CPU count capped at 16
    pub fn new(engine: ProcessingEngine, workers: Option<usize>) -> Self {
        let workers = workers.unwrap_or_else(|| num_cpus::get().min(16)).max(1);

        info!("Initializing batch runner with {} concurrent workers", workers);

        Self {
            engine: Arc::new(engine),
            workers,
            progress_tracker: Arc::new(ProgressTracker::new()),
            cancellation: CancellationFlag::new(),
        }
    }

    /// Share an externally owned cancellation flag
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress_tracker)
    }

    /// Process every file into `output_dir`, calling `on_file` once per
    /// completed file in completion order.
    pub async fn run_batch<F>(
        &self,
        files: Vec<PathBuf>,
        max_edge: u32,
        output_dir: &Path,
        mut on_file: F,
    ) -> BatchSummary
    where
        F: FnMut(&FileResult),
    {
        let start_time = Instant::now();
        let mut summary = BatchSummary {
            total_files: files.len(),
            ..Default::default()
        };

        info!("Starting batch of {} files (max edge {})", files.len(), max_edge);
        self.progress_tracker.start(files.len() as u64);

        let cancellation = self.cancellation.clone();
        let mut results = stream::iter(files)
            .take_while(move |_| futures::future::ready(!cancellation.is_cancelled()))
            .map(|path| self.dispatch(path, max_edge, output_dir))
            .buffer_unordered(self.workers);

        while let Some(result) = results.next().await {
            summary.record(&result);
            self.progress_tracker.complete_file(&result);
            on_file(&result);
        }

        summary.cancelled = summary.total_files - summary.processed();
        summary.processing_time = start_time.elapsed();
        if summary.cancelled > 0 {
            info!("Batch cancelled, {} files not dispatched", summary.cancelled);
        }
        self.progress_tracker.complete_batch();

        summary
    }

    fn dispatch(
        &self,
        path: PathBuf,
        max_edge: u32,
        output_dir: &Path,
    ) -> impl std::future::Future<Output = FileResult> {
        let engine = Arc::clone(&self.engine);
        let output_dir = output_dir.to_path_buf();
        let task_path = path.clone();
        let task_output = output_dir.clone();

        self.progress_tracker.start_file(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string(),
        );

        let handle = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.process_file(&task_path, max_edge, &task_output).await }
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Worker for {:?} failed: {}", path, e);
                    engine.copy_through_quietly(&path, &output_dir).await;
                    let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
                    FileResult::error(path, format!("worker task failed: {}", e), size)
                }
            }
        }
    }
}

//! Progress tracking for batch runs

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::processing::{FileResult, FileStatus};

/// Thread-safe progress tracker shared by the batch workers
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
    sender: broadcast::Sender<ProgressUpdate>,
    start_time: Mutex<Option<Instant>>,

    // Atomic counters for high-frequency updates
    optimized: AtomicUsize,
    skipped: AtomicUsize,
    errors: AtomicUsize,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
}

/// Current progress state
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub total_files: u64,
    pub optimized_files: usize,
    pub skipped_files: usize,
    pub error_files: usize,
    pub current_file: Option<String>,
    pub elapsed_time: Duration,
    pub estimated_remaining: Option<Duration>,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub files_per_second: f64,
    pub completion_percentage: f64,
}

/// Progress update event
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    Started {
        total_files: u64,
    },
    FileStarted {
        filename: String,
    },
    FileCompleted {
        filename: String,
        status: FileStatus,
        original_size: u64,
        optimized_size: u64,
        processing_time: Duration,
    },
    BatchCompleted {
        final_state: ProgressState,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);

        Self {
            state: Mutex::new(ProgressState::new()),
            sender,
            start_time: Mutex::new(None),
            optimized: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
        }
    }

    /// Start tracking progress for a batch
    pub fn start(&self, total_files: u64) {
        *lock(&self.start_time) = Some(Instant::now());
        *lock(&self.state) = ProgressState {
            total_files,
            ..ProgressState::new()
        };

        self.optimized.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.bytes_in.store(0, Ordering::Relaxed);
        self.bytes_out.store(0, Ordering::Relaxed);

        let _ = self.sender.send(ProgressUpdate::Started { total_files });

        debug!("Started progress tracking for {} files", total_files);
    }

    /// Mark a file as dispatched
    pub fn start_file(&self, filename: String) {
        lock(&self.state).current_file = Some(filename.clone());
        debug!("Started processing file: {}", filename);

        let _ = self.sender.send(ProgressUpdate::FileStarted { filename });
    }

    /// Record a finished file
    pub fn complete_file(&self, result: &FileResult) {
        let counter = match result.status {
            FileStatus::Optimized => &self.optimized,
            FileStatus::Skipped => &self.skipped,
            FileStatus::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(result.original_size, Ordering::Relaxed);
        self.bytes_out.fetch_add(result.optimized_size, Ordering::Relaxed);

        let filename = result.file_name();
        {
            let mut state = lock(&self.state);
            if state.current_file.as_deref() == Some(filename.as_str()) {
                state.current_file = None;
            }
        }
        self.update_state();

        let _ = self.sender.send(ProgressUpdate::FileCompleted {
            filename: filename.clone(),
            status: result.status,
            original_size: result.original_size,
            optimized_size: result.optimized_size,
            processing_time: result.processing_time,
        });

        debug!("Completed processing file: {} ({:?})", filename, result.status);
    }

    /// Update calculated state fields
    fn update_state(&self) {
        let Some(start_time) = *lock(&self.start_time) else {
            return;
        };

        let elapsed = start_time.elapsed();
        let optimized = self.optimized.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);

        let mut state = lock(&self.state);
        state.optimized_files = optimized;
        state.skipped_files = skipped;
        state.error_files = errors;
        state.elapsed_time = elapsed;
        state.bytes_in = self.bytes_in.load(Ordering::Relaxed);
        state.bytes_out = self.bytes_out.load(Ordering::Relaxed);

        let total_processed = optimized + skipped + errors;
        if state.total_files > 0 {
            state.completion_percentage = (total_processed as f64 / state.total_files as f64) * 100.0;
        }

        if elapsed.as_secs_f64() > 0.0 {
            state.files_per_second = total_processed as f64 / elapsed.as_secs_f64();

            if total_processed > 0 && state.total_files > total_processed as u64 {
                let remaining_files = state.total_files - total_processed as u64;
                let avg_time_per_file = elapsed.as_secs_f64() / total_processed as f64;
                state.estimated_remaining = Some(Duration::from_secs_f64(remaining_files as f64 * avg_time_per_file));
            } else {
                state.estimated_remaining = None;
            }
        }
    }

    /// Get current progress state
    pub fn get_state(&self) -> ProgressState {
        self.update_state();
        lock(&self.state).clone()
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    /// Mark batch as completed
    pub fn complete_batch(&self) {
        let final_state = self.get_state();

        let _ = self.sender.send(ProgressUpdate::BatchCompleted {
            final_state: final_state.clone(),
        });

        info!(
            "Batch completed: {} optimized, {} skipped, {} errors in {:.2}s",
            final_state.optimized_files,
            final_state.skipped_files,
            final_state.error_files,
            final_state.elapsed_time.as_secs_f64()
        );
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    fn new() -> Self {
        Self {
            total_files: 0,
            optimized_files: 0,
            skipped_files: 0,
            error_files: 0,
            current_file: None,
            elapsed_time: Duration::from_secs(0),
            estimated_remaining: None,
            bytes_in: 0,
            bytes_out: 0,
            files_per_second: 0.0,
            completion_percentage: 0.0,
        }
    }

    /// Files with a terminal status so far
    pub fn processed_files(&self) -> usize {
        self.optimized_files + self.skipped_files + self.error_files
    }

    /// Get human-readable completion status
    pub fn status_text(&self) -> String {
        if let Some(current) = &self.current_file {
            format!("Processing: {} ({}/{})", current, self.processed_files() + 1, self.total_files)
        } else if self.completion_percentage >= 100.0 {
            "Completed".to_string()
        } else {
            format!("{}/{} files processed", self.processed_files(), self.total_files)
        }
    }

    /// Get estimated time remaining as human-readable string
    pub fn eta_text(&self) -> String {
        match self.estimated_remaining {
            Some(duration) => {
                let seconds = duration.as_secs();
                if seconds < 60 {
                    format!("{}s", seconds)
                } else if seconds < 3600 {
                    format!("{}m {}s", seconds / 60, seconds % 60)
                } else {
                    format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
                }
            }
            None => "Unknown".to_string(),
        }
    }

    /// Get processing speed as human-readable string
    pub fn speed_text(&self) -> String {
        if self.files_per_second >= 1.0 {
            format!("{:.1} files/sec", self.files_per_second)
        } else if self.files_per_second > 0.0 {
            format!("{:.1} sec/file", 1.0 / self.files_per_second)
        } else {
            "Unknown".to_string()
        }
    }
}

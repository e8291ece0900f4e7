//! Container round-trip coordination
//!
//! [`ProcessingEngine::process_file`] drives one container file through
//! load, inventory, screening, extraction, per-bitmap conversion, rebuild and
//! emission. Whatever happens, the output directory ends up with exactly one
//! file for the input and the caller gets exactly one [`FileResult`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{ErrorContext, Result, TexSlimError};

pub mod container;
pub mod converter;
pub mod dds;
pub mod header;
pub mod plan;
pub mod workspace;

pub use container::{AssetContainer, BitmapEntry, ContainerFormat, ContainerRegistry};
pub use converter::{BitmapConverter, ConversionOutcome, TexconvConverter};
pub use header::{inspect, inspect_file, BitmapDescriptor, CompressionTag};
pub use plan::{plan, ResizePlan, TargetFormat};
pub use workspace::WorkArea;

/// Reason reported when a container holds no bitmaps
pub const REASON_NO_TEXTURES: &str = "no textures";
/// Reason reported when every bitmap already fits
pub const REASON_ALREADY_OPTIMIZED: &str = "already optimized";
/// Reason reported for files no container kind handles
pub const REASON_UNSUPPORTED: &str = "unsupported format";

/// Terminal status of one input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Optimized,
    Skipped,
    Error,
}

/// Outcome for one input file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub input_path: PathBuf,
    pub status: FileStatus,
    /// Present iff the status is skipped or error
    pub reason: Option<String>,
    pub original_size: u64,
    pub optimized_size: u64,
    pub bitmaps_changed: usize,
    pub bitmaps_total: usize,
    pub processing_time: Duration,
}

impl FileResult {
    /// Rebuilt container written to the output
    pub fn optimized(
        input_path: PathBuf,
        original_size: u64,
        optimized_size: u64,
        bitmaps_changed: usize,
        bitmaps_total: usize,
    ) -> Self {
        Self {
            input_path,
            status: FileStatus::Optimized,
            reason: None,
            original_size,
            optimized_size,
            bitmaps_changed,
            bitmaps_total,
            processing_time: Duration::ZERO,
        }
    }

    /// Original copied through unchanged
    pub fn skipped<S: Into<String>>(input_path: PathBuf, reason: S, size: u64) -> Self {
        Self::unchanged(input_path, FileStatus::Skipped, reason.into(), size)
    }

    /// Processing failed; the original was copied through where possible
    pub fn error<S: Into<String>>(input_path: PathBuf, reason: S, size: u64) -> Self {
        Self::unchanged(input_path, FileStatus::Error, reason.into(), size)
    }

    fn unchanged(input_path: PathBuf, status: FileStatus, reason: String, size: u64) -> Self {
        Self {
            input_path,
            status,
            reason: Some(reason),
            original_size: size,
            optimized_size: size,
            bitmaps_changed: 0,
            bitmaps_total: 0,
            processing_time: Duration::ZERO,
        }
    }

    fn with_bitmaps_total(mut self, total: usize) -> Self {
        self.bitmaps_total = total;
        self
    }

    /// File name for status lines
    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }

    /// Size reduction percentage for this file
    pub fn size_reduction(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.optimized_size as f64 / self.original_size as f64) * 100.0
    }
}

/// Per-bitmap row of a scan
#[derive(Debug, Clone, Serialize)]
pub struct BitmapReport {
    pub descriptor: BitmapDescriptor,
    pub needs_optimization: bool,
    pub plan: ResizePlan,
}

/// Read-only inventory of one container file
#[derive(Debug, Clone, Serialize)]
pub struct FileInventory {
    pub input_path: PathBuf,
    pub kind: String,
    pub size_bytes: u64,
    pub bitmaps: Vec<BitmapReport>,
}

impl FileInventory {
    pub fn needs_optimization(&self) -> bool {
        self.bitmaps.iter().any(|b| b.needs_optimization)
    }
}

/// Engine settings that do not change per file
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Concurrent converter processes per file
    pub bitmap_workers: usize,
    /// Parent directory for work areas (None = system temp dir)
    pub work_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bitmap_workers: 4,
            work_root: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BitmapOutcome {
    Fits,
    Resized,
    Failed,
    Uninspectable,
}

#[derive(Debug, Default)]
struct Attempt {
    original_size: u64,
    emitted: bool,
}

/// Container round-trip coordinator
#[derive(Clone)]
pub struct ProcessingEngine {
    registry: Arc<ContainerRegistry>,
    converter: Arc<dyn BitmapConverter>,
    config: EngineConfig,
}

impl ProcessingEngine {
    /// Create an engine with the built-in container kinds
    pub fn new(converter: Arc<dyn BitmapConverter>) -> Self {
        Self {
            registry: Arc::new(ContainerRegistry::with_defaults()),
            converter,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine running texconv as configured
    pub fn from_config(config: &Config) -> Self {
        let converter = TexconvConverter::from_config(&config.converter);
        Self::new(Arc::new(converter)).with_config(EngineConfig {
            bitmap_workers: config.processing.bitmap_workers,
            work_root: config.processing.work_dir.clone(),
        })
    }

    pub fn with_registry(mut self, registry: ContainerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    /// Optimize one container file into `output_dir`.
    ///
    /// Never fails: every fault becomes an error result, and the original is
    /// copied through unless a rebuilt file was already written.
    pub async fn process_file(&self, input_path: &Path, max_edge: u32, output_dir: &Path) -> FileResult {
        let start = Instant::now();
        debug!("Processing file: {:?} -> {:?}", input_path, output_dir);

        let mut attempt = Attempt::default();
        let mut result = match self.round_trip(input_path, max_edge, output_dir, &mut attempt).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Failed to optimize {:?}: {}", input_path, e);
                } else {
                    error!("Failed to optimize {:?}: {}", input_path, e);
                }
                if !attempt.emitted {
                    self.copy_through_quietly(input_path, output_dir).await;
                }
                FileResult::error(input_path.to_path_buf(), e.user_message(), attempt.original_size)
            }
        };

        result.processing_time = start.elapsed();
        result
    }

    async fn round_trip(
        &self,
        input_path: &Path,
        max_edge: u32,
        output_dir: &Path,
        attempt: &mut Attempt,
    ) -> Result<FileResult> {
        let output_path = output_path_for(input_path, output_dir)?;
        tokio::fs::create_dir_all(output_dir)
            .await
            .with_file_context(output_dir.to_path_buf())?;

        let original = tokio::fs::read(input_path)
            .await
            .with_file_context(input_path.to_path_buf())?;
        attempt.original_size = original.len() as u64;
        let size = attempt.original_size;
        let input = input_path.to_path_buf();

        let Some(format) = self.registry.for_path(input_path) else {
            self.copy_through(input_path, &output_path, attempt).await?;
            return Ok(FileResult::skipped(input, REASON_UNSUPPORTED, size));
        };

        // Load
        let loaded = {
            let format = Arc::clone(&format);
            tokio::task::spawn_blocking(move || format.load(&original))
                .await
                .map_err(join_error)?
        };
        let container = match loaded {
            Ok(container) => container,
            Err(e) => {
                let message = match e {
                    TexSlimError::LoadError { message } => message,
                    other => other.to_string(),
                };
                warn!("Could not load {:?} as {}: {}", input_path, format.kind(), message);
                self.copy_through(input_path, &output_path, attempt).await?;
                return Ok(FileResult::error(input, format!("load failed: {}", message), size));
            }
        };
        let identity = container.name().to_string();

        // Inventory and screen, before any export when the structure allows it
        let structural = container.bitmaps();
        if let Some(entries) = &structural {
            let readable = entries.iter().filter_map(|entry| entry.as_ref().ok());
            if let Some(reason) = screen(entries.len(), readable, max_edge) {
                self.copy_through(input_path, &output_path, attempt).await?;
                return Ok(FileResult::skipped(input, reason, size).with_bitmaps_total(entries.len()));
            }
        }

        // Extract
        let stem = file_stem(input_path);
        let area = WorkArea::create(self.config.work_root.as_deref(), &stem)?;
        let text = {
            let format = Arc::clone(&format);
            let dir = area.path().to_path_buf();
            tokio::task::spawn_blocking(move || format.export_intermediate(container.as_ref(), &dir))
                .await
                .map_err(join_error)??
        };
        let intermediate_path = area.join(format!("{}.{}", stem, format.intermediate_extension()));
        tokio::fs::write(&intermediate_path, text)
            .await
            .with_file_context(intermediate_path.clone())?;

        let bitmap_files = area.files_with_extension(format.bitmap_extension()).await?;
        if structural.is_none() {
            let mut descriptors = Vec::with_capacity(bitmap_files.len());
            for path in &bitmap_files {
                if let Ok(descriptor) = header::inspect_file(path).await {
                    descriptors.push(descriptor);
                }
            }
            if let Some(reason) = screen(bitmap_files.len(), descriptors.iter(), max_edge) {
                self.copy_through(input_path, &output_path, attempt).await?;
                return Ok(FileResult::skipped(input, reason, size).with_bitmaps_total(bitmap_files.len()));
            }
        }
        let bitmaps_total = structural.as_ref().map_or(bitmap_files.len(), Vec::len);

        // Resize
        let outcomes = self.resize_bitmaps(&bitmap_files, max_edge, area.path()).await;
        let changed = outcomes.iter().filter(|o| **o == BitmapOutcome::Resized).count();
        let failed = outcomes.iter().filter(|o| **o == BitmapOutcome::Failed).count();
        let uninspectable = outcomes.iter().filter(|o| **o == BitmapOutcome::Uninspectable).count();
        debug!(
            "{:?}: {} resized, {} failed, {} unreadable, {} already fit",
            input_path,
            changed,
            failed,
            uninspectable,
            outcomes.len() - changed - failed - uninspectable
        );

        if changed == 0 {
            self.copy_through(input_path, &output_path, attempt).await?;
            return Ok(FileResult::error(
                input,
                format!("no textures could be resized ({} failed, {} unreadable)", failed, uninspectable),
                size,
            )
            .with_bitmaps_total(bitmaps_total));
        }

        // Rebuild from the description on disk, which may have been edited
        let text = tokio::fs::read_to_string(&intermediate_path)
            .await
            .with_file_context(intermediate_path.clone())?;
        let bytes = {
            let format = Arc::clone(&format);
            let dir = area.path().to_path_buf();
            tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
                let mut rebuilt = format.import_intermediate(&text, &dir)?;
                rebuilt.set_name(identity);
                format.save(rebuilt.as_ref())
            })
            .await
            .map_err(join_error)??
        };

        // Serialize and emit
        tokio::fs::write(&output_path, &bytes)
            .await
            .with_file_context(output_path.clone())?;
        attempt.emitted = true;
        drop(area);

        Ok(FileResult::optimized(
            input,
            size,
            bytes.len() as u64,
            changed,
            bitmaps_total,
        ))
    }

    async fn resize_bitmaps(&self, files: &[PathBuf], max_edge: u32, work_dir: &Path) -> Vec<BitmapOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.bitmap_workers.max(1)));

        let tasks = files.iter().map(|path| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return BitmapOutcome::Failed,
                };
                self.resize_one(path, max_edge, work_dir).await
            }
        });

        futures::future::join_all(tasks).await
    }

    async fn resize_one(&self, path: &Path, max_edge: u32, work_dir: &Path) -> BitmapOutcome {
        let descriptor = match header::inspect_file(path).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Leaving {:?} unresized: {}", path, e);
                return BitmapOutcome::Uninspectable;
            }
        };

        let plan = plan::plan(&descriptor, max_edge);
        if !plan.needed {
            return BitmapOutcome::Fits;
        }

        debug!("Resizing {} {} ({})", descriptor.name, plan.describe(), plan.target_format);
        let outcome = self.converter.convert(path, &plan, work_dir).await;
        match outcome.into_result(path, self.converter.timeout()) {
            Ok(()) => BitmapOutcome::Resized,
            Err(e) => {
                warn!("Converter failed on {}: {}", descriptor.name, e);
                BitmapOutcome::Failed
            }
        }
    }

    /// List the bitmaps of one container file without writing anything
    pub async fn analyze_file(&self, input_path: &Path, max_edge: u32) -> Result<FileInventory> {
        let format = self.registry.for_path(input_path).ok_or_else(|| {
            TexSlimError::invalid_parameters(format!("{}: {}", REASON_UNSUPPORTED, input_path.display()))
        })?;
        let original = tokio::fs::read(input_path)
            .await
            .with_file_context(input_path.to_path_buf())?;
        let size_bytes = original.len() as u64;

        let container = {
            let format = Arc::clone(&format);
            tokio::task::spawn_blocking(move || format.load(&original))
                .await
                .map_err(join_error)??
        };

        let descriptors = match container.bitmaps() {
            Some(entries) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(descriptor) => Some(descriptor),
                    Err(e) => {
                        warn!("Unreadable bitmap in {:?}: {}", input_path, e);
                        None
                    }
                })
                .collect(),
            None => {
                let area = WorkArea::create(self.config.work_root.as_deref(), &file_stem(input_path))?;
                let dir = area.path().to_path_buf();
                let export_format = Arc::clone(&format);
                tokio::task::spawn_blocking(move || export_format.export_intermediate(container.as_ref(), &dir))
                    .await
                    .map_err(join_error)??;

                let mut descriptors = Vec::new();
                for path in area.files_with_extension(format.bitmap_extension()).await? {
                    match header::inspect_file(&path).await {
                        Ok(descriptor) => descriptors.push(descriptor),
                        Err(e) => warn!("Unreadable bitmap {:?}: {}", path, e),
                    }
                }
                descriptors
            }
        };

        let bitmaps = descriptors
            .into_iter()
            .map(|descriptor| {
                let plan = plan::plan(&descriptor, max_edge);
                BitmapReport {
                    needs_optimization: plan.needed,
                    descriptor,
                    plan,
                }
            })
            .collect();

        Ok(FileInventory {
            input_path: input_path.to_path_buf(),
            kind: format.kind().to_string(),
            size_bytes,
            bitmaps,
        })
    }

    async fn copy_through(&self, input_path: &Path, output_path: &Path, attempt: &mut Attempt) -> Result<()> {
        copy_unchanged(input_path, output_path).await?;
        attempt.emitted = true;
        Ok(())
    }

    /// Best-effort copy used after a fault; failures are only logged
    pub(crate) async fn copy_through_quietly(&self, input_path: &Path, output_dir: &Path) {
        let copied = match output_path_for(input_path, output_dir) {
            Ok(output_path) => copy_unchanged(input_path, &output_path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = copied {
            error!("Could not copy {:?} through to {:?}: {}", input_path, output_dir, e);
        }
    }
}

impl std::fmt::Debug for ProcessingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// `Some(reason)` when nothing needs work.
///
/// `total` counts every bitmap, `readable` only those with a parsed header;
/// unreadable bitmaps count as fitting.
fn screen<'a, I>(total: usize, mut readable: I, max_edge: u32) -> Option<&'static str>
where
    I: Iterator<Item = &'a BitmapDescriptor>,
{
    if total == 0 {
        return Some(REASON_NO_TEXTURES);
    }
    if readable.any(|b| b.exceeds(max_edge)) {
        None
    } else {
        Some(REASON_ALREADY_OPTIMIZED)
    }
}

fn output_path_for(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_name = input_path.file_name().ok_or_else(|| {
        TexSlimError::invalid_parameters(format!("{:?} has no file name", input_path))
    })?;
    Ok(output_dir.join(file_name))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "container".to_string())
}

async fn copy_unchanged(input_path: &Path, output_path: &Path) -> Result<()> {
    if same_file(input_path, output_path).await {
        debug!("Output {:?} is the input, leaving it in place", output_path);
        return Ok(());
    }
    tokio::fs::copy(input_path, output_path)
        .await
        .with_file_context(output_path.to_path_buf())?;
    Ok(())
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn join_error(e: tokio::task::JoinError) -> TexSlimError {
    TexSlimError::system(format!("Task join error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::header::synthesize_header;
    use async_trait::async_trait;

    /// Rewrites the header to the planned size and halves the payload
    struct ShrinkingConverter;

    #[async_trait]
    impl BitmapConverter for ShrinkingConverter {
        async fn convert(&self, bitmap_path: &Path, plan: &ResizePlan, _work_dir: &Path) -> ConversionOutcome {
            let bytes = std::fs::read(bitmap_path).unwrap();
            let mut out = synthesize_header(
                plan.target_width,
                plan.target_height,
                plan.target_mip_count,
                CompressionTag::DXT5,
            )
            .to_vec();
            out.extend_from_slice(&bytes[header::HEADER_SIZE..header::HEADER_SIZE + (bytes.len() - header::HEADER_SIZE) / 4]);
            std::fs::write(bitmap_path, out).unwrap();
            ConversionOutcome::Success
        }
    }

    struct FailingConverter;

    #[async_trait]
    impl BitmapConverter for FailingConverter {
        async fn convert(&self, _: &Path, _: &ResizePlan, _: &Path) -> ConversionOutcome {
            ConversionOutcome::ToolFailure {
                exit_code: Some(1),
                timed_out: false,
                detail: String::new(),
            }
        }
    }

    fn dds(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = synthesize_header(width, height, 1, CompressionTag::DXT5).to_vec();
        bytes.extend(std::iter::repeat(0x5A).take(4096));
        bytes
    }

    fn engine(converter: Arc<dyn BitmapConverter>, work_root: &Path) -> ProcessingEngine {
        ProcessingEngine::new(converter).with_config(EngineConfig {
            bitmap_workers: 2,
            work_root: Some(work_root.to_path_buf()),
        })
    }

    #[tokio::test]
    async fn test_oversized_dds_is_optimized() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in").join("wall.dds");
        std::fs::create_dir_all(input.parent().unwrap()).unwrap();
        std::fs::write(&input, dds(2048, 2048)).unwrap();
        let work = dir.path().join("work");

        let result = engine(Arc::new(ShrinkingConverter), &work)
            .process_file(&input, 512, &dir.path().join("out"))
            .await;

        assert_eq!(result.status, FileStatus::Optimized, "{:?}", result.reason);
        assert_eq!(result.reason, None);
        assert_eq!(result.bitmaps_changed, 1);
        assert_eq!(result.bitmaps_total, 1);
        assert!(result.optimized_size < result.original_size);

        let written = std::fs::read(dir.path().join("out").join("wall.dds")).unwrap();
        let descriptor = inspect(&written).unwrap();
        assert_eq!(descriptor.dimensions(), "512x512");
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fitting_dds_is_copied_verbatim() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("small.dds");
        std::fs::write(&input, dds(256, 256)).unwrap();

        let result = engine(Arc::new(ShrinkingConverter), dir.path())
            .process_file(&input, 512, &dir.path().join("out"))
            .await;

        assert_eq!(result.status, FileStatus::Skipped);
        assert_eq!(result.reason.as_deref(), Some(REASON_ALREADY_OPTIMIZED));
        assert_eq!(std::fs::read(dir.path().join("out").join("small.dds")).unwrap(), dds(256, 256));
    }

    #[tokio::test]
    async fn test_unloadable_file_is_error_and_copied() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("broken.dds");
        std::fs::write(&input, b"garbage").unwrap();

        let result = engine(Arc::new(ShrinkingConverter), dir.path())
            .process_file(&input, 512, &dir.path().join("out"))
            .await;

        assert_eq!(result.status, FileStatus::Error);
        assert!(result.reason.as_deref().unwrap().starts_with("load failed: "));
        assert_eq!(std::fs::read(dir.path().join("out").join("broken.dds")).unwrap(), b"garbage");
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("readme.txt");
        std::fs::write(&input, b"hello").unwrap();

        let result = engine(Arc::new(ShrinkingConverter), dir.path())
            .process_file(&input, 512, &dir.path().join("out"))
            .await;

        assert_eq!(result.status, FileStatus::Skipped);
        assert_eq!(result.reason.as_deref(), Some(REASON_UNSUPPORTED));
        assert!(dir.path().join("out").join("readme.txt").is_file());
    }

    #[tokio::test]
    async fn test_all_conversions_failing_keeps_original() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("wall.dds");
        std::fs::write(&input, dds(1024, 1024)).unwrap();

        let result = engine(Arc::new(FailingConverter), dir.path())
            .process_file(&input, 512, &dir.path().join("out"))
            .await;

        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.bitmaps_changed, 0);
        assert_eq!(std::fs::read(dir.path().join("out").join("wall.dds")).unwrap(), dds(1024, 1024));
    }

    #[tokio::test]
    async fn test_missing_input_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = engine(Arc::new(ShrinkingConverter), dir.path())
            .process_file(&dir.path().join("ghost.dds"), 512, &dir.path().join("out"))
            .await;

        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.original_size, 0);
    }

    #[tokio::test]
    async fn test_analyze_reports_plan() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("wall.dds");
        std::fs::write(&input, dds(1000, 600)).unwrap();

        let inventory = engine(Arc::new(ShrinkingConverter), dir.path())
            .analyze_file(&input, 512)
            .await
            .unwrap();

        assert_eq!(inventory.kind, "dds");
        assert!(inventory.needs_optimization());
        assert_eq!(inventory.bitmaps[0].plan.target_width, 512);
        assert_eq!(inventory.bitmaps[0].plan.target_height, 512);
    }

    #[test]
    fn test_screen_counts_unreadable_bitmaps() {
        let small = inspect(&dds(64, 64)).unwrap();
        let big = inspect(&dds(1024, 64)).unwrap();

        assert_eq!(screen(0, std::iter::empty::<&BitmapDescriptor>(), 512), Some(REASON_NO_TEXTURES));
        assert_eq!(screen(1, std::iter::empty::<&BitmapDescriptor>(), 512), Some(REASON_ALREADY_OPTIMIZED));
        assert_eq!(screen(2, [&small].into_iter(), 512), Some(REASON_ALREADY_OPTIMIZED));
        assert_eq!(screen(2, [&small, &big].into_iter(), 512), None);
    }

    #[test]
    fn test_result_reduction() {
        let result = FileResult::optimized(PathBuf::from("a.ytd"), 1000, 250, 2, 3);
        assert!((result.size_reduction() - 75.0).abs() < f64::EPSILON);
        assert_eq!((result.bitmaps_changed, result.bitmaps_total), (2, 3));
        assert_eq!(FileResult::skipped(PathBuf::from("b.ytd"), "x", 0).size_reduction(), 0.0);
    }
}

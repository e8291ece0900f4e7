//! texslim - Texture budget enforcement for game asset containers
//!
//! Walks container files, finds embedded block-compressed bitmaps whose
//! longest edge exceeds a limit, shrinks them with an external converter and
//! writes rebuilt containers to an output directory. Files that need no work
//! (or cannot be processed) are copied through unchanged, so the output
//! directory always mirrors the input set.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//! use texslim::{BatchRunner, ProcessingEngine, TexconvConverter};
//!
//! # async fn run() {
//! let converter = TexconvConverter::new("texconv.exe");
//! let engine = ProcessingEngine::new(Arc::new(converter));
//! let runner = BatchRunner::new(engine, None);
//!
//! let files = vec![PathBuf::from("stream/props.dds")];
//! let summary = runner
//!     .run_batch(files, 512, Path::new("optimized"), |result| {
//!         println!("{}: {:?}", result.file_name(), result.status);
//!     })
//!     .await;
//!
//! println!("Saved {:.1}%", summary.reduction_percent());
//! # }
//! ```
//!
//! Other container kinds plug in through [`processing::ContainerFormat`] and
//! [`processing::ContainerRegistry::register`].

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{Config, Profiles, TextureProfile};
pub use error::{ErrorContext, InspectionError, Result, TexSlimError};
pub use parallel::{BatchRunner, BatchSummary, CancellationFlag};
pub use processing::{
    BitmapConverter, BitmapDescriptor, ConversionOutcome, FileResult, FileStatus, ProcessingEngine,
    ResizePlan, TargetFormat, TexconvConverter,
};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from `RUST_LOG`, defaulting to `info`
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install_subscriber(filter, false);
}

/// Validate the configuration and initialize logging from it
pub fn init_with_config(config: &Config) -> Result<()> {
    config.validate()?;
    init_logging(&config.logging.level, config.logging.json_format);
    Ok(())
}

/// Initialize logging at an explicit level.
///
/// Log lines go to stderr so machine-readable stdout stays clean. Only the
/// first call in a process has any effect.
pub fn init_logging(level: &str, json: bool) {
    install_subscriber(EnvFilter::new(level), json);
}

fn install_subscriber(filter: EnvFilter, json: bool) {
    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish()).is_ok()
    } else {
        tracing::subscriber::set_global_default(builder.finish()).is_ok()
    };

    if installed {
        info!("texslim v{} initialized", VERSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init() {
        // Should not fail on multiple calls
        init();
        init_logging("debug", true);
    }

    #[test]
    fn test_init_with_config_validates() {
        let mut config = Config::default();
        assert!(init_with_config(&config).is_ok());

        config.processing.workers = 0;
        assert!(init_with_config(&config).is_err());
    }
}

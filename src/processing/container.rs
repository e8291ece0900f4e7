//! Seam to the external asset container library
//!
//! Every container kind is reached through a [`ContainerFormat`] adapter.
//! The engine only needs four things from an adapter: load and save bytes,
//! and convert to and from an intermediate textual description whose
//! bitmaps live as separate files in a working directory.

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{InspectionError, Result};
use crate::processing::dds::DdsFormat;
use crate::processing::header::BitmapDescriptor;

/// One listed bitmap; unreadable headers still occupy a slot
pub type BitmapEntry = std::result::Result<BitmapDescriptor, InspectionError>;

/// One loaded container, owned by a single coordinator invocation
pub trait AssetContainer: Send + 'static {
    /// Identity stored inside the container
    fn name(&self) -> &str;

    /// Replace the identity
    fn set_name(&mut self, name: String);

    /// Every bitmap listed directly by the container structure, including
    /// those whose header cannot be read.
    ///
    /// Kinds that can only reveal their bitmaps by exporting return `None`.
    fn bitmaps(&self) -> Option<Vec<BitmapEntry>> {
        None
    }

    /// Downcasting hook for the owning [`ContainerFormat`]
    fn as_any(&self) -> &dyn Any;
}

/// Adapter for one container kind
pub trait ContainerFormat: Send + Sync {
    /// Short kind name used in logs
    fn kind(&self) -> &str;

    /// Lower-case file extensions handled by this kind
    fn extensions(&self) -> &[&'static str];

    /// Extension of the intermediate description file
    fn intermediate_extension(&self) -> &str {
        "xml"
    }

    /// Extension of the bitmap files written by an export
    fn bitmap_extension(&self) -> &str {
        "dds"
    }

    /// Parse container bytes
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn AssetContainer>>;

    /// Serialize a container produced by this adapter
    fn save(&self, container: &dyn AssetContainer) -> Result<Vec<u8>>;

    /// Write one bitmap file per embedded bitmap into `work_dir` and return
    /// the intermediate description
    fn export_intermediate(&self, container: &dyn AssetContainer, work_dir: &Path) -> Result<String>;

    /// Rebuild a container from an intermediate description and the bitmap
    /// files in `work_dir`
    fn import_intermediate(&self, text: &str, work_dir: &Path) -> Result<Box<dyn AssetContainer>>;
}

/// Container kinds by file extension
#[derive(Clone, Default)]
pub struct ContainerRegistry {
    formats: HashMap<String, Arc<dyn ContainerFormat>>,
}

impl ContainerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in kinds
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DdsFormat));
        registry
    }

    /// Register a kind for all of its extensions, replacing earlier ones
    pub fn register(&mut self, format: Arc<dyn ContainerFormat>) -> &mut Self {
        for extension in format.extensions() {
            self.formats
                .insert(extension.to_ascii_lowercase(), Arc::clone(&format));
        }
        self
    }

    /// Adapter for a path, by extension
    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn ContainerFormat>> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.formats.get(&extension).cloned()
    }

    /// Whether an extension (without dot) is handled
    pub fn supports_extension(&self, extension: &str) -> bool {
        self.formats.contains_key(&extension.to_ascii_lowercase())
    }

    /// All handled extensions, sorted
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.formats.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl std::fmt::Debug for ContainerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_handle_dds() {
        let registry = ContainerRegistry::with_defaults();
        assert!(registry.supports_extension("dds"));
        assert!(registry.supports_extension("DDS"));
        assert!(registry.for_path(Path::new("stream/wall.DDS")).is_some());
        assert!(registry.for_path(Path::new("notes.txt")).is_none());
        assert!(registry.for_path(Path::new("no_extension")).is_none());
    }

    #[test]
    fn test_extensions_sorted() {
        let registry = ContainerRegistry::with_defaults();
        assert_eq!(registry.extensions(), vec!["dds".to_string()]);
        assert!(ContainerRegistry::new().extensions().is_empty());
    }
}

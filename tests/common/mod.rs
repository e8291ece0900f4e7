//! Shared fixtures: an in-memory texture dictionary kind and a fake converter

#![allow(dead_code)]

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use texslim::error::{ErrorContext, Result, TexSlimError};
use texslim::processing::header::{inspect_named, synthesize_header, HEADER_SIZE};
use texslim::processing::{
    AssetContainer, BitmapConverter, BitmapEntry, CompressionTag, ContainerFormat, ContainerRegistry,
    ConversionOutcome, EngineConfig, ProcessingEngine, ResizePlan,
};

/// Header plus a recognisable payload
pub fn dds_bytes(width: u32, height: u32, tag: CompressionTag, payload: usize) -> Vec<u8> {
    let mut bytes = synthesize_header(width, height, 1, tag).to_vec();
    bytes.extend((0..payload).map(|i| (i % 251) as u8));
    bytes
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Serialized form of a dictionary file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryFile {
    pub name: String,
    pub textures: Vec<Entry>,
}

impl DictionaryFile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, name: &str, data: Vec<u8>) -> Self {
        self.textures.push(Entry {
            name: name.to_string(),
            data,
        });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap()
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        std::fs::write(path, self.to_bytes()).unwrap();
        path.to_path_buf()
    }
}

#[derive(Debug)]
struct Dictionary {
    file: DictionaryFile,
    structural: bool,
}

impl AssetContainer for Dictionary {
    fn name(&self) -> &str {
        &self.file.name
    }

    fn set_name(&mut self, name: String) {
        self.file.name = name;
    }

    fn bitmaps(&self) -> Option<Vec<BitmapEntry>> {
        if !self.structural {
            return None;
        }
        Some(
            self.file
                .textures
                .iter()
                .map(|t| inspect_named(&t.name, &t.data))
                .collect(),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Intermediate description; deliberately drops the container name
#[derive(Serialize, Deserialize)]
struct Manifest {
    textures: Vec<String>,
}

/// Dictionary container kind.
///
/// `structural` kinds list their bitmaps directly; the others only reveal
/// them through an export, like drawables with embedded textures.
pub struct DictionaryFormat {
    extension: &'static str,
    structural: bool,
}

impl DictionaryFormat {
    pub fn structural() -> Self {
        Self {
            extension: "ytd",
            structural: true,
        }
    }

    pub fn embedded() -> Self {
        Self {
            extension: "ydr",
            structural: false,
        }
    }
}

impl ContainerFormat for DictionaryFormat {
    fn kind(&self) -> &str {
        self.extension
    }

    fn extensions(&self) -> &[&'static str] {
        if self.structural {
            &["ytd"]
        } else {
            &["ydr"]
        }
    }

    fn intermediate_extension(&self) -> &str {
        "json"
    }

    fn load(&self, bytes: &[u8]) -> Result<Box<dyn AssetContainer>> {
        let file: DictionaryFile =
            serde_json::from_slice(bytes).map_err(|e| TexSlimError::load(e.to_string()))?;
        Ok(Box::new(Dictionary {
            file,
            structural: self.structural,
        }))
    }

    fn save(&self, container: &dyn AssetContainer) -> Result<Vec<u8>> {
        let dictionary = container
            .as_any()
            .downcast_ref::<Dictionary>()
            .ok_or_else(|| TexSlimError::container("not a dictionary"))?;
        Ok(dictionary.file.to_bytes())
    }

    fn export_intermediate(&self, container: &dyn AssetContainer, work_dir: &Path) -> Result<String> {
        let dictionary = container
            .as_any()
            .downcast_ref::<Dictionary>()
            .ok_or_else(|| TexSlimError::container("not a dictionary"))?;

        let mut textures = Vec::new();
        for texture in &dictionary.file.textures {
            let file_name = format!("{}.dds", texture.name);
            let path = work_dir.join(&file_name);
            std::fs::write(&path, &texture.data).with_file_context(path)?;
            textures.push(file_name);
        }
        serde_json::to_string(&Manifest { textures }).map_err(|e| TexSlimError::container(e.to_string()))
    }

    fn import_intermediate(&self, text: &str, work_dir: &Path) -> Result<Box<dyn AssetContainer>> {
        let manifest: Manifest =
            serde_json::from_str(text).map_err(|e| TexSlimError::container(e.to_string()))?;
        let mut file = DictionaryFile::new("");
        for file_name in manifest.textures {
            let path = work_dir.join(&file_name);
            let data = std::fs::read(&path).with_file_context(path)?;
            let name = file_name.trim_end_matches(".dds").to_string();
            file.textures.push(Entry { name, data });
        }
        Ok(Box::new(Dictionary {
            file,
            structural: self.structural,
        }))
    }
}

/// Rewrites headers to the planned size and quarters the payload.
/// Bitmaps whose file name contains "fail" exit with code 1.
#[derive(Default)]
pub struct FakeConverter {
    pub calls: AtomicUsize,
}

impl FakeConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BitmapConverter for FakeConverter {
    async fn convert(&self, bitmap_path: &Path, plan: &ResizePlan, _work_dir: &Path) -> ConversionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let name = bitmap_path.file_name().unwrap().to_string_lossy();
        if name.contains("fail") {
            return ConversionOutcome::ToolFailure {
                exit_code: Some(1),
                timed_out: false,
                detail: "simulated failure".to_string(),
            };
        }

        let bytes = match tokio::fs::read(bitmap_path).await {
            Ok(bytes) => bytes,
            Err(e) => return ConversionOutcome::ProcessError(e.to_string()),
        };
        let payload = &bytes[HEADER_SIZE..];
        let tag = match plan.target_format {
            texslim::TargetFormat::Bc1Unorm => CompressionTag::DXT1,
            texslim::TargetFormat::Bc3Unorm => CompressionTag::DXT5,
        };
        let mut out = synthesize_header(plan.target_width, plan.target_height, plan.target_mip_count, tag).to_vec();
        out.extend_from_slice(&payload[..payload.len() / 4]);
        match tokio::fs::write(bitmap_path, out).await {
            Ok(()) => ConversionOutcome::Success,
            Err(e) => ConversionOutcome::ProcessError(e.to_string()),
        }
    }
}

/// Registry with the built-in kinds plus both dictionary variants
pub fn registry() -> ContainerRegistry {
    let mut registry = ContainerRegistry::with_defaults();
    registry
        .register(Arc::new(DictionaryFormat::structural()))
        .register(Arc::new(DictionaryFormat::embedded()));
    registry
}

pub fn engine(converter: Arc<FakeConverter>, work_root: &Path) -> ProcessingEngine {
    ProcessingEngine::new(converter)
        .with_registry(registry())
        .with_config(EngineConfig {
            bitmap_workers: 2,
            work_root: Some(work_root.to_path_buf()),
        })
}

//! Standalone bitmap files as a container kind
//!
//! A loose `.dds` file is treated as a container holding exactly one bitmap.
//! Its intermediate description is a small TOML manifest naming the
//! exported bitmap file.

use std::any::Any;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, Result, TexSlimError};
use crate::processing::container::{AssetContainer, BitmapEntry, ContainerFormat};
use crate::processing::header::{inspect_named, BitmapDescriptor};

const FALLBACK_NAME: &str = "texture";

/// Loaded standalone bitmap
#[derive(Debug, Clone)]
pub struct DdsTexture {
    name: String,
    data: Vec<u8>,
    descriptor: BitmapDescriptor,
}

impl AssetContainer for DdsTexture {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.descriptor.name = name.clone();
        self.name = name;
    }

    fn bitmaps(&self) -> Option<Vec<BitmapEntry>> {
        Some(vec![Ok(self.descriptor.clone())])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DdsManifest {
    name: String,
    bitmap: String,
}

/// Built-in kind for `.dds` files
#[derive(Debug, Clone, Copy, Default)]
pub struct DdsFormat;

impl DdsFormat {
    fn downcast<'a>(&self, container: &'a dyn AssetContainer) -> Result<&'a DdsTexture> {
        container
            .as_any()
            .downcast_ref::<DdsTexture>()
            .ok_or_else(|| TexSlimError::container("container was not loaded as a standalone bitmap"))
    }

    fn parse(&self, name: String, bytes: Vec<u8>) -> Result<DdsTexture> {
        let descriptor =
            inspect_named(&name, &bytes).map_err(|e| TexSlimError::load(e.to_string()))?;
        Ok(DdsTexture {
            name,
            data: bytes,
            descriptor,
        })
    }
}

fn file_stem_for(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

impl ContainerFormat for DdsFormat {
    fn kind(&self) -> &str {
        "dds"
    }

    fn extensions(&self) -> &[&'static str] {
        &["dds"]
    }

    fn intermediate_extension(&self) -> &str {
        "toml"
    }

    fn load(&self, bytes: &[u8]) -> Result<Box<dyn AssetContainer>> {
        Ok(Box::new(self.parse(String::new(), bytes.to_vec())?))
    }

    fn save(&self, container: &dyn AssetContainer) -> Result<Vec<u8>> {
        Ok(self.downcast(container)?.data.clone())
    }

    fn export_intermediate(&self, container: &dyn AssetContainer, work_dir: &Path) -> Result<String> {
        let texture = self.downcast(container)?;
        let bitmap = format!("{}.{}", file_stem_for(&texture.name), self.bitmap_extension());
        let path = work_dir.join(&bitmap);
        std::fs::write(&path, &texture.data).with_file_context(path)?;

        toml::to_string(&DdsManifest {
            name: texture.name.clone(),
            bitmap,
        })
        .map_err(|e| TexSlimError::container(format!("manifest serialization failed: {}", e)))
    }

    fn import_intermediate(&self, text: &str, work_dir: &Path) -> Result<Box<dyn AssetContainer>> {
        let manifest: DdsManifest = toml::from_str(text)?;
        if manifest.bitmap.contains(['/', '\\']) {
            return Err(TexSlimError::container(format!(
                "manifest bitmap '{}' must be a plain file name",
                manifest.bitmap
            )));
        }

        let path = work_dir.join(&manifest.bitmap);
        let bytes = std::fs::read(&path).with_file_context(path)?;
        let texture = self
            .parse(manifest.name, bytes)
            .map_err(|e| TexSlimError::container(format!("rebuilt bitmap is invalid: {}", e)))?;
        Ok(Box::new(texture))
    }
}

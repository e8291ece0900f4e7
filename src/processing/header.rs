//! Bitmap header inspection
//!
//! Reads the fixed 128-byte header that prefixes every extracted bitmap.
//! Only the geometry, mip count and compression tag are interpreted; the
//! pixel payload after the header is never touched.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::error::{ErrorContext, InspectionError, Result};

/// Size of the fixed header prefix
pub const HEADER_SIZE: usize = 0x80;

/// `"DDS "` read as a little-endian `u32`
pub const BITMAP_MAGIC: u32 = 0x2053_4444;

pub(crate) const HEIGHT_OFFSET: usize = 0x0C;
pub(crate) const WIDTH_OFFSET: usize = 0x10;
pub(crate) const MIP_COUNT_OFFSET: usize = 0x1C;
pub(crate) const FOURCC_OFFSET: usize = 0x54;

/// Four-character compression code stored in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct CompressionTag(pub u32);

impl CompressionTag {
    pub const DXT1: Self = Self(0x3154_5844);
    pub const DXT3: Self = Self(0x3354_5844);
    pub const DXT5: Self = Self(0x3554_5844);
    pub const DX10: Self = Self(0x3031_5844);

    /// Raw little-endian value
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CompressionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_le_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            write!(f, "{}", String::from_utf8_lossy(&bytes))
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

impl From<CompressionTag> for String {
    fn from(tag: CompressionTag) -> Self {
        tag.to_string()
    }
}

/// Read-only view over one bitmap's header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BitmapDescriptor {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub compression_tag: CompressionTag,
    pub mip_levels: u32,
    pub byte_size: u64,
}

impl BitmapDescriptor {
    /// Whether either edge is larger than `max_edge`
    pub fn exceeds(&self, max_edge: u32) -> bool {
        self.width > max_edge || self.height > max_edge
    }

    /// Human readable `WxH`
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Parse a header from the start of `bytes`.
///
/// The descriptor is unnamed; use [`inspect_named`] when the bitmap's name
/// is known.
pub fn inspect(bytes: &[u8]) -> std::result::Result<BitmapDescriptor, InspectionError> {
    inspect_named("", bytes)
}

/// Parse a header and attach `name` to the resulting descriptor
pub fn inspect_named(
    name: &str,
    bytes: &[u8],
) -> std::result::Result<BitmapDescriptor, InspectionError> {
    if bytes.len() < HEADER_SIZE {
        return Err(InspectionError::TruncatedHeader {
            len: bytes.len(),
            required: HEADER_SIZE,
        });
    }

    let magic = read_u32(bytes, 0);
    if magic != BITMAP_MAGIC {
        return Err(InspectionError::BadMagic { found: magic });
    }

    let height = read_u32(bytes, HEIGHT_OFFSET);
    let width = read_u32(bytes, WIDTH_OFFSET);
    if width == 0 || height == 0 {
        return Err(InspectionError::ZeroDimension { width, height });
    }

    Ok(BitmapDescriptor {
        name: name.to_string(),
        width,
        height,
        compression_tag: CompressionTag(read_u32(bytes, FOURCC_OFFSET)),
        mip_levels: read_u32(bytes, MIP_COUNT_OFFSET).max(1),
        byte_size: bytes.len() as u64,
    })
}

/// Inspect a bitmap file on disk, reading only its header.
///
/// The descriptor is named after the file stem and sized after the file.
pub async fn inspect_file(path: &Path) -> Result<BitmapDescriptor> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_file_context(path.to_path_buf())?;
    let byte_size = file
        .metadata()
        .await
        .with_file_context(path.to_path_buf())?
        .len();

    let mut header = Vec::with_capacity(HEADER_SIZE);
    (&mut file)
        .take(HEADER_SIZE as u64)
        .read_to_end(&mut header)
        .await
        .with_file_context(path.to_path_buf())?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut descriptor = inspect_named(&name, &header)?;
    descriptor.byte_size = byte_size;
    Ok(descriptor)
}

/// Builds a minimal 128-byte header with the given geometry.
///
/// Fields other than magic, size, dimensions, mip count and tag are zero.
pub fn synthesize_header(
    width: u32,
    height: u32,
    mip_levels: u32,
    tag: CompressionTag,
) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&BITMAP_MAGIC.to_le_bytes());
    header[4..8].copy_from_slice(&124u32.to_le_bytes());
    header[HEIGHT_OFFSET..HEIGHT_OFFSET + 4].copy_from_slice(&height.to_le_bytes());
    header[WIDTH_OFFSET..WIDTH_OFFSET + 4].copy_from_slice(&width.to_le_bytes());
    header[MIP_COUNT_OFFSET..MIP_COUNT_OFFSET + 4].copy_from_slice(&mip_levels.to_le_bytes());
    header[FOURCC_OFFSET..FOURCC_OFFSET + 4].copy_from_slice(&tag.0.to_le_bytes());
    header
}

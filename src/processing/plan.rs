//! Target geometry and format selection for oversized bitmaps

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::processing::header::{BitmapDescriptor, CompressionTag};

/// Hard ceiling on the generated mip chain
pub const MAX_MIP_LEVELS: u32 = 10;

/// Smallest edge a block-compressed target may have
pub const MIN_TARGET_EDGE: u32 = 4;

/// Largest power of two a `u32` edge can hold
pub const MAX_TARGET_EDGE: u32 = 1 << 31;

/// Block compression format handed to the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetFormat {
    /// 1-bit alpha
    #[serde(rename = "BC1_UNORM")]
    Bc1Unorm,
    /// Interpolated alpha
    #[serde(rename = "BC3_UNORM")]
    Bc3Unorm,
}

impl TargetFormat {
    /// Pick the target format for a source compression tag.
    ///
    /// Only `DXT1` maps to BC1. Every other tag, including uncompressed or
    /// DX10 layouts, falls back to BC3 until the container library confirms
    /// a better mapping.
    pub fn for_tag(tag: CompressionTag) -> Self {
        if tag == CompressionTag::DXT1 {
            return Self::Bc1Unorm;
        }
        if tag != CompressionTag::DXT3 && tag != CompressionTag::DXT5 {
            debug!("Unmapped compression tag {}, using BC3_UNORM", tag);
        }
        Self::Bc3Unorm
    }

    /// Converter spelling of the format
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bc1Unorm => "BC1_UNORM",
            Self::Bc3Unorm => "BC3_UNORM",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resize decision for one bitmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResizePlan {
    pub source_width: u32,
    pub source_height: u32,
    pub target_width: u32,
    pub target_height: u32,
    pub target_format: TargetFormat,
    pub target_mip_count: u32,
    pub needed: bool,
}

impl ResizePlan {
    /// `WxH -> WxH` for log lines
    pub fn describe(&self) -> String {
        format!(
            "{}x{} -> {}x{}",
            self.source_width, self.source_height, self.target_width, self.target_height
        )
    }
}

/// Compute the resize plan for `descriptor` under `max_edge`.
///
/// Bitmaps that already fit are returned unchanged with `needed == false`.
/// Otherwise the bitmap is scaled by the ratio that brings its longest edge
/// down to `max_edge`, and each edge is rounded up to a power of two. If the
/// rounded edge would exceed a non-power-of-two `max_edge` it drops to the
/// power of two below instead.
pub fn plan(descriptor: &BitmapDescriptor, max_edge: u32) -> ResizePlan {
    let target_format = TargetFormat::for_tag(descriptor.compression_tag);
    let (width, height) = (descriptor.width, descriptor.height);

    if !descriptor.exceeds(max_edge) {
        return ResizePlan {
            source_width: width,
            source_height: height,
            target_width: width,
            target_height: height,
            target_format,
            target_mip_count: descriptor.mip_levels,
            needed: false,
        };
    }

    let limit = max_edge.clamp(MIN_TARGET_EDGE, MAX_TARGET_EDGE);
    let ratio = (f64::from(max_edge) / f64::from(width))
        .min(f64::from(max_edge) / f64::from(height));

    let target_width = power_of_two_edge(scaled_edge(width, ratio, limit), limit);
    let target_height = power_of_two_edge(scaled_edge(height, ratio, limit), limit);
    let target_mip_count = mip_count(target_width, target_height);

    ResizePlan {
        source_width: width,
        source_height: height,
        target_width,
        target_height,
        target_format,
        target_mip_count,
        needed: true,
    }
}

fn scaled_edge(edge: u32, ratio: f64, limit: u32) -> u32 {
    // Truncate first so float noise like 512.0000001 never rounds up a power
    let raw = (f64::from(edge) * ratio) as u32;
    raw.clamp(MIN_TARGET_EDGE, limit)
}

fn power_of_two_edge(raw: u32, limit: u32) -> u32 {
    let ceiling = raw.next_power_of_two();
    if ceiling <= limit {
        ceiling
    } else {
        (ceiling / 2).max(MIN_TARGET_EDGE)
    }
}

/// Mip levels for a power-of-two target, capped at [`MAX_MIP_LEVELS`]
pub fn mip_count(target_width: u32, target_height: u32) -> u32 {
    let smallest = target_width.min(target_height).max(1);
    (smallest.ilog2() + 1).min(MAX_MIP_LEVELS)
}

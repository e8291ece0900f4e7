//! Size profiles for common texture budgets

use serde::{Deserialize, Serialize};
use crate::config::validate_max_edge;
use crate::error::Result;

/// A size profile fixes the longest permitted bitmap edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureProfile {
    /// Longest permitted edge in pixels
    pub max_edge: u32,

    /// Short human-readable description
    #[serde(default)]
    pub description: String,
}

impl TextureProfile {
    /// Create a new profile with the given limit
    pub fn new(max_edge: u32) -> Self {
        Self {
            max_edge,
            description: String::new(),
        }
    }

    /// Set the description
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Validate the profile configuration
    pub fn validate(&self) -> Result<()> {
        validate_max_edge(self.max_edge)
    }
}

/// Predefined size profiles
pub struct Profiles;

impl Profiles {
    /// Distant props and clutter
    pub fn tiny() -> TextureProfile {
        TextureProfile::new(128).description("Very small, distant props")
    }

    pub fn low() -> TextureProfile {
        TextureProfile::new(256).description("Low detail, small file size")
    }

    /// Default budget for streamed assets
    pub fn medium() -> TextureProfile {
        TextureProfile::new(512).description("Balanced quality and size")
    }

    pub fn high() -> TextureProfile {
        TextureProfile::new(1024).description("High detail vehicles and peds")
    }

    pub fn ultra() -> TextureProfile {
        TextureProfile::new(2048).description("Only trims extreme textures")
    }

    /// Get all predefined profiles
    pub fn all() -> std::collections::HashMap<String, TextureProfile> {
        let mut profiles = std::collections::HashMap::new();
        profiles.insert("tiny".to_string(), Self::tiny());
        profiles.insert("low".to_string(), Self::low());
        profiles.insert("medium".to_string(), Self::medium());
        profiles.insert("high".to_string(), Self::high());
        profiles.insert("ultra".to_string(), Self::ultra());
        profiles
    }
}

//! Aggregate limits configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Per-user aggregate limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum alarm profiles per user
    #[serde(default = "default_max_profiles")]
    pub max_profiles: usize,
}

impl LimitsConfig {
    /// Validate limits configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_profiles == 0 || self.max_profiles > 100 {
            return Err(ValidationError::InvalidProfileLimit);
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_profiles: default_max_profiles(),
        }
    }
}

fn default_max_profiles() -> usize {
    10
}

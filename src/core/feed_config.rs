use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{core::error::ManagerError, model::pagination::PaginationMode};

/// Per-feed pagination settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Fixed page length of every feed instance built from this config
    pub page_size: usize,
    /// Result counts below this prefer client-side pagination
    pub client_mode_threshold: usize,
    pub validation: ValidationConfig,
}

/// Thresholds used by the state validator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub large_dataset_warn_threshold: usize,
    pub large_dataset_error_threshold: usize,
    /// Client mode over fewer held items than this is reported as inefficient
    pub inefficient_client_mode_below: usize,
    pub validation_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 15,
            client_mode_threshold: 100,
            validation: ValidationConfig::default(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            large_dataset_warn_threshold: 1_000,
            large_dataset_error_threshold: 5_000,
            inefficient_client_mode_below: 5,
            validation_timeout_ms: 250,
        }
    }
}

impl ValidationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

impl FeedConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Reject settings no feed can run with
    pub fn check(&self) -> Result<(), ManagerError> {
        if self.page_size == 0 {
            return Err(ManagerError::InvalidConfig {
                reason: "page_size must be positive".to_string(),
            });
        }
        if self.validation.large_dataset_warn_threshold
            > self.validation.large_dataset_error_threshold
        {
            return Err(ManagerError::InvalidConfig {
                reason: format!(
                    "large_dataset_warn_threshold ({}) exceeds large_dataset_error_threshold ({})",
                    self.validation.large_dataset_warn_threshold,
                    self.validation.large_dataset_error_threshold
                ),
            });
        }
        Ok(())
    }

    /// Mode heuristic: small known result sets are held and sliced locally
    pub fn preferred_mode(&self, known_result_count: Option<usize>) -> PaginationMode {
        match known_result_count {
            Some(count) if count < self.client_mode_threshold => PaginationMode::Client,
            _ => PaginationMode::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;

    #[rstest]
    #[case(None, PaginationMode::Server)]
    #[case(Some(0), PaginationMode::Client)]
    #[case(Some(99), PaginationMode::Client)]
    #[case(Some(100), PaginationMode::Server)]
    fn test_preferred_mode(#[case] count: Option<usize>, #[case] expected: PaginationMode) {
        assert_eq!(FeedConfig::default().preferred_mode(count), expected);
    }

    #[test]
    fn test_check() {
        assert!(FeedConfig::default().check().is_ok());
        assert!(FeedConfig::default().with_page_size(0).check().is_err());

        let mut config = FeedConfig::default();
        config.validation.large_dataset_warn_threshold = 10_000;
        assert!(matches!(
            config.check(),
            Err(ManagerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_partial_json5_uses_defaults() -> Result<(), json5::Error> {
        let config: FeedConfig = json5::from_str("{ page_size: 20, validation: { validation_timeout_ms: 50 } }")?;
        assert_eq!(config.page_size, 20);
        assert_eq!(config.client_mode_threshold, 100);
        assert_eq!(config.validation.timeout(), Duration::from_millis(50));
        assert_eq!(config.validation.large_dataset_warn_threshold, 1_000);

        Ok(())
    }
}

//! Dispatch engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::models::Priority;

/// Configuration for a [`DispatchCoordinator`](crate::DispatchCoordinator).
///
/// # Examples
///
/// ```
/// use u_dispense::DispatchConfig;
///
/// let config = DispatchConfig::default()
///     .with_lanes(["stat", "urgent", "routine"])
///     .with_max_commit_retries(5)
///     .with_skip_expired_lots(true);
/// assert_eq!(config.lane_count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Lane names, most urgent first. The lane count K is their number.
    pub lanes: Vec<String>,

    /// How many times a conflicting item commit is re-allocated against
    /// fresh lots before the dispense fails.
    pub max_commit_retries: usize,

    /// Whether lots at or past expiry are excluded from allocation.
    ///
    /// Off by default: every lot with stock is eligible.
    pub skip_expired_lots: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            lanes: Priority::ALL.iter().map(|p| p.label().to_string()).collect(),
            max_commit_retries: 3,
            skip_expired_lots: false,
        }
    }
}

impl DispatchConfig {
    /// Replaces the lane names.
    pub fn with_lanes<I, S>(mut self, lanes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lanes = lanes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the commit retry budget.
    pub fn with_max_commit_retries(mut self, retries: usize) -> Self {
        self.max_commit_retries = retries;
        self
    }

    /// Sets the expired-lot policy.
    pub fn with_skip_expired_lots(mut self, skip: bool) -> Self {
        self.skip_expired_lots = skip;
        self
    }

    /// Number of priority lanes (K).
    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Name of a lane, if it exists.
    pub fn lane_name(&self, priority_class: usize) -> Option<&str> {
        self.lanes.get(priority_class).map(String::as_str)
    }

    /// Checks the configuration is usable.
    ///
    /// # Errors
    /// `InvalidConfig` if there are no lanes.
    pub fn validate(&self) -> Result<()> {
        if self.lanes.is_empty() {
            return Err(DispatchError::InvalidConfig {
                reason: "at least one priority lane is required".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lanes() {
        let config = DispatchConfig::default();
        assert_eq!(config.lane_count(), 4);
        assert_eq!(config.lane_name(0), Some("emergency"));
        assert_eq!(config.lane_name(3), Some("low"));
        assert_eq!(config.lane_name(4), None);
        assert!(!config.skip_expired_lots);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_lanes_rejected() {
        let config = DispatchConfig::default().with_lanes(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(DispatchError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = DispatchConfig::default().with_max_commit_retries(9);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DispatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

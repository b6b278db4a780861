//! Repair configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RepairError, Result};

/// Default lower bound of the request window.
pub const DEFAULT_T_MIN: Duration = Duration::from_secs(30);

/// Default upper bound of the request and response windows.
pub const DEFAULT_T_MAX: Duration = Duration::from_secs(120);

/// Default capacity of each repair buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// One response group per this many participants.
pub const PARTICIPANTS_PER_RESPONSE_GROUP: u64 = 128;

/// Configuration for SDS-R repair.
///
/// Serializes with durations as integer milliseconds:
///
/// ```json
/// {"tMin": 30000, "tMax": 120000, "numResponseGroups": 1, "bufferSize": 1000, "enabled": true}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepairConfig {
    /// Minimum wait before requesting a missing message.
    #[serde(with = "duration_millis")]
    pub t_min: Duration,
    /// Maximum wait; bounds both request and response scheduling.
    #[serde(with = "duration_millis")]
    pub t_max: Duration,
    /// Number of response groups. 0 is treated as 1.
    pub num_response_groups: u64,
    /// Capacity of each repair buffer. 0 disables buffering.
    pub buffer_size: usize,
    /// When false, every repair operation is a no-op.
    pub enabled: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            t_min: DEFAULT_T_MIN,
            t_max: DEFAULT_T_MAX,
            num_response_groups: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            enabled: true,
        }
    }
}

impl RepairConfig {
    /// Check that the request window is non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.t_max <= self.t_min {
            return Err(RepairError::InvalidConfig(format!(
                "t_max ({}ms) must be greater than t_min ({}ms)",
                self.t_max.as_millis(),
                self.t_min.as_millis()
            )));
        }
        Ok(())
    }

    /// `t_min` in milliseconds.
    pub fn t_min_millis(&self) -> u64 {
        duration_to_millis(self.t_min)
    }

    /// `t_max` in milliseconds.
    pub fn t_max_millis(&self) -> u64 {
        duration_to_millis(self.t_max)
    }

    /// Response group count with 0 normalised to 1.
    pub fn effective_response_groups(&self) -> u64 {
        self.num_response_groups.max(1)
    }
}

fn duration_to_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(super::duration_to_millis(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RepairConfig::default();
        assert_eq!(config.t_min_millis(), 30_000);
        assert_eq!(config.t_max_millis(), 120_000);
        assert_eq!(config.num_response_groups, 1);
        assert_eq!(config.buffer_size, 1000);
        assert!(config.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_window() {
        let config = RepairConfig {
            t_min: Duration::from_secs(10),
            t_max: Duration::from_secs(10),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RepairError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_groups_normalised() {
        let config = RepairConfig {
            num_response_groups: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_response_groups(), 1);
    }

    #[test]
    fn test_json_millis() {
        let config: RepairConfig =
            serde_json::from_str(r#"{"tMin": 1000, "tMax": 5000, "bufferSize": 0}"#).unwrap();
        assert_eq!(config.t_min, Duration::from_secs(1));
        assert_eq!(config.t_max, Duration::from_secs(5));
        assert_eq!(config.buffer_size, 0);
        assert!(config.enabled);

        let json = serde_json::to_value(RepairConfig::default()).unwrap();
        assert_eq!(json["tMin"], 30_000);
        assert_eq!(json["numResponseGroups"], 1);
    }
}

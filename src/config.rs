//! Reward-program configuration.

use crate::error::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Sixty days.
const DEFAULT_SCALING_TIME: u64 = 60 * 24 * 3600;

/// Early-exit penalty curve.
///
/// A lot held for `t < time` earns `base * floor / ceiling` plus a linear
/// share of the remaining `(ceiling - floor) / ceiling` proportional to
/// `t / time`; at `t >= time` it earns the full base reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardScaling {
    /// Payout fraction numerator at zero age.
    pub floor: u64,
    /// Payout fraction denominator (and numerator at full age).
    pub ceiling: u64,
    /// Age in seconds at which the full reward is earned.
    pub time: u64,
}

impl Default for RewardScaling {
    fn default() -> Self {
        Self {
            floor: 33,
            ceiling: 100,
            time: DEFAULT_SCALING_TIME,
        }
    }
}

impl RewardScaling {
    /// Rejects `floor > ceiling` and `time == 0`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.floor > self.ceiling || self.time == 0 {
            return Err(Error::InvalidScaling);
        }
        Ok(())
    }
}

/// Tunables of one reward program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AludelConfig {
    /// Penalty curve applied at unstake.
    pub reward_scaling: RewardScaling,
    /// Maximum live stake lots per vault.
    pub max_stakes_per_vault: usize,
    /// Maximum registered bonus tokens.
    pub max_bonus_tokens: usize,
    /// Shares minted per raw reward unit when no shares are outstanding.
    pub base_shares_per_unit: u128,
}

impl Default for AludelConfig {
    fn default() -> Self {
        Self {
            reward_scaling: RewardScaling::default(),
            max_stakes_per_vault: 30,
            max_bonus_tokens: 50,
            base_shares_per_unit: 1_000_000,
        }
    }
}

impl AludelConfig {
    /// Load from JSON; missing file -> defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Self =
            serde_json::from_slice(&bytes).map_err(|e| ConfigError::Decode(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Persist to JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(self).map_err(|e| ConfigError::Decode(e.to_string()))?;
        fs::write(path, data).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Checks every tunable.
    pub fn validate(&self) -> Result<(), Error> {
        self.reward_scaling.validate()?;
        if self.max_stakes_per_vault == 0 {
            return Err(Error::InvalidConfig("max_stakes_per_vault must be positive"));
        }
        if self.base_shares_per_unit == 0 {
            return Err(Error::InvalidConfig("base_shares_per_unit must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AludelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reward_scaling.floor, 33);
        assert_eq!(config.max_stakes_per_vault, 30);
    }

    #[test]
    fn test_rejects_inverted_scaling() {
        let scaling = RewardScaling {
            floor: 101,
            ceiling: 100,
            time: 1,
        };
        assert_eq!(scaling.validate(), Err(Error::InvalidScaling));
        let zero_time = RewardScaling {
            time: 0,
            ..RewardScaling::default()
        };
        assert_eq!(zero_time.validate(), Err(Error::InvalidScaling));
        let no_stakes = AludelConfig {
            max_stakes_per_vault: 0,
            ..AludelConfig::default()
        };
        assert!(matches!(no_stakes.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_missing_file_yields_defaults_and_roundtrips() {
        let dir = std::env::temp_dir().join(format!("aludel-config-{}", std::process::id()));
        let path = dir.join("aludel.json");
        let _ = fs::remove_file(&path);
        assert_eq!(AludelConfig::load(&path).unwrap(), AludelConfig::default());

        let custom = AludelConfig {
            max_stakes_per_vault: 5,
            ..AludelConfig::default()
        };
        custom.save(&path).unwrap();
        assert_eq!(AludelConfig::load(&path).unwrap(), custom);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AludelConfig = serde_json::from_str(r#"{"max_bonus_tokens": 3}"#).unwrap();
        assert_eq!(config.max_bonus_tokens, 3);
        assert_eq!(config.reward_scaling, RewardScaling::default());
    }
}

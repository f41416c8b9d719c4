//! Coordinator configuration with documented constants
//!
//! Every tunable number used by combat groups and the attack manager lives
//! here. The configuration is built once, validated, and shared with each
//! component at construction; nothing reads it from global state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::unit_data::{UnitCategory, UnitRoles};
use crate::core::error::{CoordinatorError, Result};

/// Maximum number of members per combat group, by group kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSizeConfig {
    /// Ground and hover assault groups
    pub default: usize,
    /// Dedicated anti-air groups (anti-air but not anti-surface)
    pub anti_air: usize,
    /// Mobile artillery groups
    pub artillery: usize,
    /// Air combat groups (and every group in air-only mode)
    pub air: usize,
    /// Surface ship groups
    pub naval: usize,
    /// Submarine groups
    pub submarine: usize,
}

impl Default for GroupSizeConfig {
    fn default() -> Self {
        Self {
            default: 12,
            anti_air: 4,
            artillery: 4,
            air: 4,
            naval: 4,
            submarine: 4,
        }
    }
}

/// Tick-count rate limits on outbound commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Ticks since an attack's last order before it may be checked for failure
    pub failure_check_interval: u64,
    /// Ticks since an attack's last order before it may move to the next sector
    pub continuation_interval: u64,
    /// Ticks after a group order during which idle notifications are ignored
    pub idle_command_cooldown: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            failure_check_interval: 30,
            continuation_interval: 60,
            idle_command_cooldown: 10,
        }
    }
}

/// Decision thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Per-unit combat power above which a group smaller than
    /// `min_members_for_attack` may still join attacks
    pub min_combat_power_for_solo_attack: f32,
    /// Member count at which a group always has sufficient attack power
    pub min_members_for_attack: usize,
    /// Squared distance within which a member counts as staged
    pub max_squared_dist_to_rally_point: f32,
    /// Attacker combat power above which losses trigger an air support request
    pub min_air_support_efficiency: f32,
    /// Spotted enemy air units above which attacks take anti-air escort
    pub air_threat_spotted: f32,
    /// Recent attacks by air above which attacks take anti-air escort
    pub air_threat_recent_attacks: f32,
    /// Multiplicative decay of group task importance per tick
    pub importance_decay: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_combat_power_for_solo_attack: 2.5,
            min_members_for_attack: 3,
            // (16 tiles * 8 elmos)^2
            max_squared_dist_to_rally_point: 16_384.0,
            min_air_support_efficiency: 2.5,
            air_threat_spotted: 0.2,
            air_threat_recent_attacks: 0.9,
            importance_decay: 0.97,
        }
    }
}

/// Task importance attached to each kind of group order
///
/// A group only answers a defence request whose importance exceeds the
/// (decayed) importance of its current task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceConfig {
    pub attack: f32,
    /// Added to the attack importance when the order reaches the group
    pub attack_bonus: f32,
    pub retreat: f32,
    pub rally: f32,
    pub return_to_rally: f32,
    pub escort: f32,
    pub bombing: f32,
    pub air_raid: f32,
    pub patrol: f32,
}

impl Default for ImportanceConfig {
    fn default() -> Self {
        Self {
            attack: 110.0,
            attack_bonus: 8.0,
            retreat: 105.0,
            rally: 90.0,
            return_to_rally: 100.0,
            escort: 110.0,
            bombing: 110.0,
            air_raid: 110.0,
            patrol: 110.0,
        }
    }
}

/// Complete coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of attack slots (maximum concurrent attacks)
    pub max_attacks: usize,
    /// Game variant where every combat unit flies
    pub air_only_mode: bool,
    /// Seed for escort target selection
    pub seed: u64,
    pub group_sizes: GroupSizeConfig,
    pub timing: TimingConfig,
    pub thresholds: ThresholdConfig,
    pub importance: ImportanceConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_attacks: 4,
            air_only_mode: false,
            seed: 42,
            group_sizes: GroupSizeConfig::default(),
            timing: TimingConfig::default(),
            thresholds: ThresholdConfig::default(),
            importance: ImportanceConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CoordinatorConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_attacks == 0 {
            return Err(CoordinatorError::InvalidConfig(
                "max_attacks must be at least 1".into(),
            ));
        }

        let sizes = &self.group_sizes;
        let all_sizes = [
            sizes.default,
            sizes.anti_air,
            sizes.artillery,
            sizes.air,
            sizes.naval,
            sizes.submarine,
        ];
        if all_sizes.iter().any(|&size| size == 0) {
            return Err(CoordinatorError::InvalidConfig(
                "group sizes must be at least 1".into(),
            ));
        }

        let decay = self.thresholds.importance_decay;
        if !(0.0..=1.0).contains(&decay) {
            return Err(CoordinatorError::InvalidConfig(format!(
                "importance_decay ({}) must lie in [0, 1]",
                decay
            )));
        }

        if self.thresholds.max_squared_dist_to_rally_point <= 0.0 {
            return Err(CoordinatorError::InvalidConfig(
                "max_squared_dist_to_rally_point must be positive".into(),
            ));
        }

        if self.timing.continuation_interval < self.timing.failure_check_interval {
            return Err(CoordinatorError::InvalidConfig(format!(
                "continuation_interval ({}) should be >= failure_check_interval ({})",
                self.timing.continuation_interval, self.timing.failure_check_interval
            )));
        }

        Ok(())
    }

    /// Group capacity for units of the given category and roles
    pub fn group_capacity(&self, category: UnitCategory, roles: UnitRoles) -> usize {
        let sizes = &self.group_sizes;

        if self.air_only_mode {
            return sizes.air;
        }

        if roles.is_anti_air() && !roles.is_anti_surface() {
            return sizes.anti_air;
        }

        match category {
            UnitCategory::MobileArtillery => sizes.artillery,
            UnitCategory::AirCombat => sizes.air,
            UnitCategory::SeaCombat => sizes.naval,
            UnitCategory::SubmarineCombat => sizes.submarine,
            _ => sizes.default,
        }
    }
}

//! Unit status, threat and air support collaborators

use crate::combat::target_type::TargetType;
use crate::combat::unit_data::UnitCategory;
use crate::core::types::{Position, UnitId, UnitTypeId};

/// Live unit lookup. Both queries return `None` for dead or unknown units.
pub trait UnitTracker {
    fn unit_type(&self, unit: UnitId) -> Option<UnitTypeId>;
    fn position(&self, unit: UnitId) -> Option<Position>;
}

/// Enemy threat estimates
pub trait ThreatTracker {
    /// Highest number of enemy combat units of a target type spotted at once
    fn max_spotted_combat_units(&self, target_type: TargetType) -> f32;

    /// Recent attacks on own units by enemies of a target type
    fn recent_attacks_by(&self, target_type: TargetType) -> f32;
}

/// Air force manager receiving retaliation hints
pub trait AirSupport {
    fn check_target(&mut self, attacker: UnitId, category: UnitCategory, health: f32);
}

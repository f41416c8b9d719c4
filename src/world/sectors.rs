//! Map partitioning and target selection collaborators

use serde::{Deserialize, Serialize};

use crate::combat::target_type::{MobileTargetTypeValues, TargetTypeVector};
use crate::combat::unit_data::MovementType;
use crate::core::types::{ContinentId, Position, SectorId};
use crate::groups::RallyPointLedger;

/// Sector catalog of the map
pub trait SectorMap {
    fn number_of_continents(&self) -> usize;

    /// Sector containing `position`, `None` when off the map
    fn sector_of(&self, position: Position) -> Option<SectorId>;

    fn continent_of(&self, sector: SectorId) -> Option<ContinentId>;

    /// Where attackers of `sector` should be sent
    fn attack_position(&self, sector: SectorId) -> Position;

    /// No enemy opposition left in the sector
    fn is_cleared(&self, sector: SectorId) -> bool;

    /// Sector has become part of the own base
    fn is_within_base(&self, _sector: SectorId) -> bool {
        false
    }

    /// Whether an attack with the given power is still worth keeping up
    fn is_attack_viable(&self, _sector: SectorId, _power: &TargetTypeVector) -> bool {
        true
    }
}

/// State of a running attack, handed to the selector when its target is cleared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackProgress {
    pub current_target: Option<SectorId>,
    /// Combat power of the attack's combat groups
    pub combat_power: TargetTypeVector,
    pub groups_of_target_type: MobileTargetTypeValues,
    /// Continent of the first continent-bound combat group, if any
    pub continent: Option<ContinentId>,
}

/// Chooses where attacks go
pub trait SectorSelector {
    /// Pick a target for a new attack. `per_continent` is indexed by continent.
    fn select_target_sector(
        &self,
        global: &TargetTypeVector,
        per_continent: &[TargetTypeVector],
        group_counts: &MobileTargetTypeValues,
    ) -> Option<SectorId>;

    /// Next sector once the current target has been cleared, `None` ends the attack
    fn sector_to_continue_attack(&self, progress: &AttackProgress) -> Option<SectorId>;
}

/// Places staging positions for combat groups
pub trait RallyPointProvider {
    fn determine_rally_point(
        &self,
        movement: MovementType,
        continent: Option<ContinentId>,
        ledger: &RallyPointLedger,
    ) -> Option<Position>;
}

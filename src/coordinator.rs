//! Combat coordinator - entry point for the host simulation
//!
//! Receives unit lifecycle notifications and the periodic tick, and keeps
//! groups, rally reservations and attacks consistent with each other.

use std::sync::Arc;

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attack::{Attack, AttackManager, AttackStats};
use crate::combat::target_type::TargetType;
use crate::core::config::CoordinatorConfig;
use crate::core::error::{CoordinatorError, Result};
use crate::core::types::{AttackSlot, ContinentId, GroupId, Position, Tick, UnitId, UnitTypeId};
use crate::groups::{
    group_continent, CombatGroup, GroupRoster, GroupState, IdleResponse, RallyPointLedger,
};
use crate::world::{CommandContext, UnitTracker};

/// Serializable view of one group
#[derive(Debug, Clone, Serialize)]
pub struct GroupSnapshot {
    pub id: GroupId,
    pub unit_type: UnitTypeId,
    pub name: String,
    pub continent: Option<ContinentId>,
    pub members: usize,
    pub capacity: usize,
    pub state: GroupState,
    pub importance: f32,
    pub attack: Option<AttackSlot>,
    pub rally_point: Option<Position>,
}

impl From<&CombatGroup> for GroupSnapshot {
    fn from(group: &CombatGroup) -> Self {
        Self {
            id: group.id(),
            unit_type: group.unit_type(),
            name: group.name().to_string(),
            continent: group.continent(),
            members: group.len(),
            capacity: group.capacity(),
            state: group.state(),
            importance: group.importance(),
            attack: group.attack(),
            rally_point: group.rally_point(),
        }
    }
}

/// Serializable view of the whole coordinator
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorSnapshot {
    pub tick: Tick,
    pub groups: Vec<GroupSnapshot>,
    pub attacks: Vec<Attack>,
    pub stats: AttackStats,
}

/// Owns all combat groups and the attack manager of one player
pub struct CombatCoordinator {
    config: Arc<CoordinatorConfig>,
    roster: GroupRoster,
    rally_points: RallyPointLedger,
    attacks: AttackManager,
}

impl CombatCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let config = Arc::new(config);
        Self {
            roster: GroupRoster::new(),
            rally_points: RallyPointLedger::new(),
            attacks: AttackManager::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn roster(&self) -> &GroupRoster {
        &self.roster
    }

    pub fn group(&self, id: GroupId) -> Option<&CombatGroup> {
        self.roster.get(id)
    }

    pub fn attack_manager(&self) -> &AttackManager {
        &self.attacks
    }

    pub fn rally_points(&self) -> &RallyPointLedger {
        &self.rally_points
    }

    /// Put a new combat unit into the first group that admits it, creating one if needed
    pub fn add_unit(
        &mut self,
        unit: UnitId,
        unit_type: UnitTypeId,
        continent: Option<ContinentId>,
        ctx: &mut CommandContext<'_>,
    ) -> Result<GroupId> {
        let unit_data = ctx.unit_data;
        let properties = unit_data
            .properties(unit_type)
            .ok_or(CoordinatorError::UnknownUnitType(unit_type))?;

        if !properties.category.is_combat() {
            return Err(CoordinatorError::NotACombatUnit(unit_type));
        }

        if let Some(group) = self.roster.group_of(unit) {
            warn!("{} is already a member of {}", unit, group);
            return Err(CoordinatorError::UnitAlreadyGrouped { unit, group });
        }

        let continent = group_continent(properties.movement, continent);

        for id in self.roster.groups_with_identity(unit_type, continent) {
            let admitted = self
                .roster
                .get_mut(id)
                .is_some_and(|group| group.add_unit(unit, unit_type, continent, ctx));
            if admitted {
                self.roster.index_unit(unit, id);
                return Ok(id);
            }
        }

        let id = self
            .roster
            .create_group(unit_type, continent, properties, self.config.clone());
        let Some(group) = self.roster.get_mut(id) else {
            return Err(CoordinatorError::UnknownGroup(id));
        };

        group.get_new_rally_point(&mut self.rally_points, ctx);
        info!(
            "Creating new {} - max size: {}, unit type: {}, continent: {:?}",
            id,
            group.capacity(),
            group.name(),
            group.continent()
        );

        if !group.add_unit(unit, unit_type, continent, ctx) {
            self.dissolve_group(id);
            return Err(CoordinatorError::AdmissionRejected { unit, group: id });
        }

        self.roster.index_unit(unit, id);
        Ok(id)
    }

    /// A unit was destroyed or transferred. Empty groups are dissolved.
    pub fn remove_unit(
        &mut self,
        unit: UnitId,
        attacker: Option<UnitId>,
        ctx: &mut CommandContext<'_>,
    ) -> Result<()> {
        let Some(id) = self.roster.group_of(unit) else {
            warn!("Cannot remove {}: not in any combat group", unit);
            return Err(CoordinatorError::UnitNotGrouped(unit));
        };
        let group = self
            .roster
            .get_mut(id)
            .ok_or(CoordinatorError::UnknownGroup(id))?;

        let outcome = group.remove_unit(unit, attacker, ctx)?;
        self.roster.unindex_unit(unit);

        if let Some(slot) = outcome.released_attack {
            self.attacks.detach_group(slot, id);
        }

        if outcome.emptied {
            self.dissolve_group(id);
        }

        Ok(())
    }

    fn dissolve_group(&mut self, id: GroupId) {
        if let Some(mut group) = self.roster.dissolve(id) {
            if let Some(slot) = group.detach() {
                self.attacks.detach_group(slot, id);
            }
            group.release_rally_point(&mut self.rally_points);
            debug!("Dissolved {} of {}", id, group.name());
        }
    }

    /// A unit has finished its orders
    pub fn unit_idle(&mut self, unit: UnitId, ctx: &mut CommandContext<'_>) -> Result<()> {
        let Some(id) = self.roster.group_of(unit) else {
            warn!("Ignoring idle {}: not in any combat group", unit);
            return Err(CoordinatorError::UnitNotGrouped(unit));
        };
        let group = self
            .roster
            .get_mut(id)
            .ok_or(CoordinatorError::UnknownGroup(id))?;

        match group.unit_idle(unit, ctx) {
            IdleResponse::None => {}
            IdleResponse::AttackTargetReached(slot) => {
                self.attacks.on_target_reached(slot, &mut self.roster, ctx);
            }
            IdleResponse::EscortIdle(slot) => {
                self.attacks.escort(slot, id, &mut self.roster, ctx);
            }
        }

        Ok(())
    }

    /// Periodic tick: decay group importance, then run the attack manager
    pub fn update(&mut self, ctx: &mut CommandContext<'_>) {
        for group in self.roster.iter_mut() {
            group.update();
        }

        self.attacks.update(&mut self.roster, ctx);
    }

    /// Re-check every group's rally point (e.g. after the base expanded)
    pub fn refresh_rally_points(&mut self, ctx: &mut CommandContext<'_>) {
        for group in self.roster.iter_mut() {
            group.update_rally_point(&mut self.rally_points, ctx);
        }
    }

    /// Stop an attack and send its groups home
    pub fn abort_attack(&mut self, slot: AttackSlot, ctx: &mut CommandContext<'_>) -> bool {
        self.attacks.abort_attack(slot, &mut self.roster, ctx)
    }

    /// Score every group as responder to an enemy at `position`, best first.
    /// Groups rating zero are left out.
    pub fn defence_ratings(
        &self,
        attacker_target_type: TargetType,
        position: Position,
        importance: f32,
        continent: Option<ContinentId>,
        units: &dyn UnitTracker,
    ) -> Vec<(GroupId, f32)> {
        let mut ratings: Vec<(GroupId, f32)> = self
            .roster
            .iter()
            .map(|group| {
                let rating = group.defence_rating(
                    attacker_target_type,
                    position,
                    importance,
                    continent,
                    units,
                );
                (group.id(), rating)
            })
            .filter(|&(_, rating)| rating > 0.0)
            .collect();

        ratings.sort_by_key(|&(id, rating)| (std::cmp::Reverse(OrderedFloat(rating)), id));
        ratings
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut CombatGroup> {
        self.roster
            .get_mut(id)
            .ok_or(CoordinatorError::UnknownGroup(id))
    }

    pub fn defend(
        &mut self,
        id: GroupId,
        unit: UnitId,
        enemy_position: Option<Position>,
        importance: f32,
        ctx: &mut CommandContext<'_>,
    ) -> Result<()> {
        self.group_mut(id)?.defend(unit, enemy_position, importance, ctx);
        Ok(())
    }

    pub fn retreat(
        &mut self,
        id: GroupId,
        position: Position,
        ctx: &mut CommandContext<'_>,
    ) -> Result<()> {
        self.group_mut(id)?.retreat(position, ctx);
        Ok(())
    }

    pub fn bomb_target(
        &mut self,
        id: GroupId,
        position: Position,
        ctx: &mut CommandContext<'_>,
    ) -> Result<()> {
        self.group_mut(id)?.bomb_target(position, ctx);
        Ok(())
    }

    pub fn air_raid_unit(
        &mut self,
        id: GroupId,
        target: UnitId,
        ctx: &mut CommandContext<'_>,
    ) -> Result<()> {
        self.group_mut(id)?.air_raid_unit(target, ctx);
        Ok(())
    }

    pub fn defend_air_space(
        &mut self,
        id: GroupId,
        position: Position,
        ctx: &mut CommandContext<'_>,
    ) -> Result<()> {
        self.group_mut(id)?.defend_air_space(position, ctx);
        Ok(())
    }

    pub fn target_unit_killed(&mut self, id: GroupId, ctx: &mut CommandContext<'_>) -> Result<()> {
        self.group_mut(id)?.target_unit_killed(ctx);
        Ok(())
    }

    pub fn snapshot(&self, tick: Tick) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            tick,
            groups: self.roster.iter().map(GroupSnapshot::from).collect(),
            attacks: self.attacks.attacks().cloned().collect(),
            stats: self.attacks.stats(),
        }
    }
}

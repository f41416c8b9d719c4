//! A committed strike against one sector at a time

use serde::Serialize;

use crate::combat::power::accumulate_combat_power;
use crate::combat::target_type::{MobileTargetTypeValues, TargetTypeVector};
use crate::core::types::{AttackSlot, GroupId, SectorId, Tick};
use crate::groups::{CombatGroup, GroupRoster};
use crate::world::{AttackProgress, CommandContext, SectorMap};

/// Groups taking part in an attack and its current target.
///
/// The attack only stores group ids; each group stores the attack's slot.
/// Both sides are always changed together.
#[derive(Debug, Clone, Serialize)]
pub struct Attack {
    slot: AttackSlot,
    combat_groups: Vec<GroupId>,
    anti_air_groups: Vec<GroupId>,
    target: Option<SectorId>,
    last_order_tick: Tick,
}

impl Attack {
    pub fn new(slot: AttackSlot, tick: Tick) -> Self {
        Self {
            slot,
            combat_groups: Vec::new(),
            anti_air_groups: Vec::new(),
            target: None,
            last_order_tick: tick,
        }
    }

    pub fn slot(&self) -> AttackSlot {
        self.slot
    }

    pub fn target(&self) -> Option<SectorId> {
        self.target
    }

    pub fn last_order_tick(&self) -> Tick {
        self.last_order_tick
    }

    pub fn combat_groups(&self) -> &[GroupId] {
        &self.combat_groups
    }

    pub fn anti_air_groups(&self) -> &[GroupId] {
        &self.anti_air_groups
    }

    /// All participating groups, combat groups first
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.combat_groups
            .iter()
            .chain(self.anti_air_groups.iter())
            .copied()
    }

    pub fn contains(&self, group: GroupId) -> bool {
        self.groups().any(|id| id == group)
    }

    pub fn is_empty(&self) -> bool {
        self.combat_groups.is_empty() && self.anti_air_groups.is_empty()
    }

    /// Attach a group: assault groups fight, pure anti-air groups escort.
    ///
    /// Fails for groups already in an attack and for groups with neither role.
    pub fn add_group(&mut self, group: &mut CombatGroup) -> bool {
        if group.attack().is_some() {
            return false;
        }

        let roles = group.roles();
        if roles.is_assault() {
            self.combat_groups.push(group.id());
        } else if roles.is_anti_air() {
            self.anti_air_groups.push(group.id());
        } else {
            return false;
        }

        group.attach(self.slot);
        true
    }

    /// Forget a group whose own back-reference has already been cleared
    pub fn remove_group(&mut self, group: GroupId) -> bool {
        let before = self.combat_groups.len() + self.anti_air_groups.len();
        self.combat_groups.retain(|&id| id != group);
        self.anti_air_groups.retain(|&id| id != group);
        before != self.combat_groups.len() + self.anti_air_groups.len()
    }

    /// No opposition left at the target (an attack without target counts as done)
    pub fn has_target_been_cleared(&self, sectors: &dyn SectorMap) -> bool {
        self.target.map_or(true, |sector| sectors.is_cleared(sector))
    }

    pub fn progress(&self, roster: &GroupRoster) -> AttackProgress {
        let groups: Vec<&CombatGroup> = self
            .combat_groups
            .iter()
            .filter_map(|&id| roster.get(id))
            .collect();

        let mut combat_power = TargetTypeVector::new();
        let mut groups_of_target_type = MobileTargetTypeValues::new();
        accumulate_combat_power(
            groups.iter().copied(),
            &mut combat_power,
            &mut groups_of_target_type,
        );

        AttackProgress {
            current_target: self.target,
            combat_power,
            groups_of_target_type,
            continent: groups.iter().find_map(|group| group.continent()),
        }
    }

    /// Out of combat groups or members, or no longer able to make headway
    pub fn check_if_failed(&self, roster: &GroupRoster, sectors: &dyn SectorMap) -> bool {
        if self.combat_groups.is_empty() {
            return true;
        }

        let members: usize = self
            .combat_groups
            .iter()
            .filter_map(|&id| roster.get(id))
            .map(CombatGroup::len)
            .sum();
        if members == 0 {
            return true;
        }

        match self.target {
            Some(sector) => !sectors.is_attack_viable(sector, &self.progress(roster).combat_power),
            None => false,
        }
    }

    /// Order every group towards `sector`
    pub fn attack_sector(
        &mut self,
        sector: SectorId,
        importance: f32,
        roster: &mut GroupRoster,
        ctx: &mut CommandContext<'_>,
    ) {
        let ids: Vec<GroupId> = self.groups().collect();
        for id in ids {
            if let Some(group) = roster.get_mut(id) {
                group.attack_sector(sector, importance, ctx);
            }
        }

        self.target = Some(sector);
        self.last_order_tick = ctx.tick;
    }

    /// Detach every group and send it back to its rally point
    pub fn stop_attack(&mut self, roster: &mut GroupRoster, ctx: &mut CommandContext<'_>) {
        let ids: Vec<GroupId> = self.groups().collect();
        for id in ids {
            if let Some(group) = roster.get_mut(id) {
                group.stand_down(ctx);
            }
        }

        self.combat_groups.clear();
        self.anti_air_groups.clear();
        self.last_order_tick = ctx.tick;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::combat::unit_data::UnitDataProvider;
    use crate::core::config::CoordinatorConfig;
    use crate::core::types::{ContinentId, Position};
    use crate::groups::{GroupState, RallyPointLedger};
    use crate::sandbox::SandboxWorld;

    fn add_staged_group(
        world: &mut SandboxWorld,
        roster: &mut GroupRoster,
        unit_type: crate::core::types::UnitTypeId,
        members: usize,
    ) -> GroupId {
        let properties = world
            .catalog
            .properties(unit_type)
            .expect("unit type should be in the catalog")
            .clone();
        let id = roster.create_group(
            unit_type,
            Some(ContinentId(0)),
            &properties,
            Arc::new(CoordinatorConfig::default()),
        );
        let mut ledger = RallyPointLedger::new();
        let group = roster.get_mut(id).expect("group was just created");
        group.get_new_rally_point(&mut ledger, &mut world.context());
        let rally_point = group.rally_point().unwrap_or(Position::ZERO);
        for _ in 0..members {
            let unit = world.spawn_unit(unit_type, rally_point);
            assert!(group.add_unit(unit, unit_type, Some(ContinentId(0)), &mut world.context()));
        }
        id
    }

    #[test]
    fn test_groups_are_sorted_by_role() {
        let mut world = SandboxWorld::test_world();
        let mut roster = GroupRoster::new();
        let tanks = add_staged_group(&mut world, &mut roster, SandboxWorld::TANK, 3);
        let flak = add_staged_group(&mut world, &mut roster, SandboxWorld::FLAK, 1);
        let artillery = add_staged_group(&mut world, &mut roster, SandboxWorld::ARTILLERY, 2);

        let mut attack = Attack::new(AttackSlot(0), 0);
        for id in [tanks, flak, artillery] {
            let group = roster.get_mut(id).expect("group exists");
            attack.add_group(group);
        }

        assert_eq!(attack.combat_groups(), &[tanks]);
        assert_eq!(attack.anti_air_groups(), &[flak]);
        assert_eq!(roster.get(tanks).and_then(|g| g.attack()), Some(AttackSlot(0)));
        assert_eq!(roster.get(artillery).and_then(|g| g.attack()), None);
    }

    #[test]
    fn test_group_joins_at_most_one_attack() {
        let mut world = SandboxWorld::test_world();
        let mut roster = GroupRoster::new();
        let tanks = add_staged_group(&mut world, &mut roster, SandboxWorld::TANK, 3);

        let mut first = Attack::new(AttackSlot(0), 0);
        let mut second = Attack::new(AttackSlot(1), 0);
        let group = roster.get_mut(tanks).expect("group exists");
        assert!(first.add_group(group));
        assert!(!second.add_group(group));
        assert!(second.is_empty());
    }

    #[test]
    fn test_failure_criteria() {
        let mut world = SandboxWorld::test_world();
        let mut roster = GroupRoster::new();
        let tanks = add_staged_group(&mut world, &mut roster, SandboxWorld::TANK, 3);
        let target = world.map.enemy_sectors()[0];

        let mut attack = Attack::new(AttackSlot(0), 0);
        assert!(attack.check_if_failed(&roster, &world.map));

        attack.add_group(roster.get_mut(tanks).expect("group exists"));
        attack.attack_sector(target, 110.0, &mut roster, &mut world.context());
        assert!(!attack.check_if_failed(&roster, &world.map));

        // the sandbox map only keeps attacks with some power vs. static targets
        world.map.set_enemy_buildings(target, 1000);
        assert!(attack.check_if_failed(&roster, &world.map));
    }

    #[test]
    fn test_attack_sector_orders_every_group() {
        let mut world = SandboxWorld::test_world();
        let mut roster = GroupRoster::new();
        let tanks = add_staged_group(&mut world, &mut roster, SandboxWorld::TANK, 3);
        let flak = add_staged_group(&mut world, &mut roster, SandboxWorld::FLAK, 1);
        let target = world.map.enemy_sectors()[0];

        world.tick = 77;
        let mut attack = Attack::new(AttackSlot(0), 0);
        for id in [tanks, flak] {
            attack.add_group(roster.get_mut(id).expect("group exists"));
        }
        attack.attack_sector(target, 110.0, &mut roster, &mut world.context());

        assert_eq!(attack.target(), Some(target));
        assert_eq!(attack.last_order_tick(), 77);
        for id in [tanks, flak] {
            let group = roster.get(id).expect("group exists");
            assert_eq!(group.state(), GroupState::Attacking { sector: Some(target) });
            assert_eq!(group.importance(), 118.0);
        }
    }

    #[test]
    fn test_stop_attack_detaches_both_sides() {
        let mut world = SandboxWorld::test_world();
        let mut roster = GroupRoster::new();
        let tanks = add_staged_group(&mut world, &mut roster, SandboxWorld::TANK, 3);
        let target = world.map.enemy_sectors()[0];

        let mut attack = Attack::new(AttackSlot(3), 0);
        attack.add_group(roster.get_mut(tanks).expect("group exists"));
        attack.attack_sector(target, 110.0, &mut roster, &mut world.context());
        attack.stop_attack(&mut roster, &mut world.context());

        let group = roster.get(tanks).expect("group exists");
        assert!(attack.is_empty());
        assert_eq!(group.attack(), None);
        assert_eq!(group.state(), GroupState::Idle);
    }

    #[test]
    fn test_progress_reports_continent_and_power() {
        let mut world = SandboxWorld::test_world();
        let mut roster = GroupRoster::new();
        let tanks = add_staged_group(&mut world, &mut roster, SandboxWorld::TANK, 3);

        let mut attack = Attack::new(AttackSlot(0), 0);
        attack.add_group(roster.get_mut(tanks).expect("group exists"));
        let progress = attack.progress(&roster);

        assert_eq!(progress.continent, Some(ContinentId(0)));
        assert_eq!(progress.current_target, None);
        assert_eq!(progress.groups_of_target_type.total(), 1.0);
        assert!(progress.combat_power.total() > 0.0);
        assert!(attack.has_target_been_cleared(&world.map));
    }
}

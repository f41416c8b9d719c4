//! Combat group: homogeneous units staged and commanded together

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use crate::combat::target_type::{TargetType, TargetTypeVector};
use crate::combat::unit_data::{MovementType, UnitCategory, UnitRoles, UnitTypeProperties};
use crate::core::config::CoordinatorConfig;
use crate::core::error::{CoordinatorError, Result};
use crate::core::types::{
    AttackSlot, ContinentId, GroupId, Position, SectorId, Tick, UnitId, UnitTypeId,
};
use crate::groups::rally::RallyPointLedger;
use crate::groups::state::GroupState;
use crate::world::{Command, CommandContext, UnitTask, UnitTracker};

/// Continent a unit of the given movement type is bound to.
///
/// Units that can cross between continents form region-unbound groups.
pub fn group_continent(
    movement: MovementType,
    continent: Option<ContinentId>,
) -> Option<ContinentId> {
    if movement.can_move_to_other_continents() {
        None
    } else {
        continent
    }
}

/// What the attack manager has to do after a member went idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleResponse {
    None,
    /// An assault member idles in the attack's target sector
    AttackTargetReached(AttackSlot),
    /// An escort member idles; its protégé may be gone
    EscortIdle(AttackSlot),
}

/// Result of removing a member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalOutcome {
    /// The group has no members left
    pub emptied: bool,
    /// Attack the group was detached from; the caller must drop the group from it
    pub released_attack: Option<AttackSlot>,
}

/// A pool of units of one type on one continent
#[derive(Debug, Clone)]
pub struct CombatGroup {
    id: GroupId,
    unit_type: UnitTypeId,
    name: String,
    continent: Option<ContinentId>,
    category: UnitCategory,
    movement: MovementType,
    roles: UnitRoles,
    target_type: TargetType,
    /// Combat power of a single member
    unit_power: TargetTypeVector,
    max_speed: f32,
    capacity: usize,
    members: Vec<UnitId>,
    rally_point: Option<Position>,
    rally_sector: Option<SectorId>,
    state: GroupState,
    importance: f32,
    attack: Option<AttackSlot>,
    last_command_tick: Option<Tick>,
    target_position: Option<Position>,
    config: Arc<CoordinatorConfig>,
}

impl CombatGroup {
    /// Create an empty group. Capacity is fixed here from category and roles.
    pub fn new(
        id: GroupId,
        unit_type: UnitTypeId,
        continent: Option<ContinentId>,
        properties: &UnitTypeProperties,
        config: Arc<CoordinatorConfig>,
    ) -> Self {
        let capacity = config.group_capacity(properties.category, properties.roles);

        Self {
            id,
            unit_type,
            name: properties.name.clone(),
            continent: group_continent(properties.movement, continent),
            category: properties.category,
            movement: properties.movement,
            roles: properties.roles,
            target_type: properties.target_type,
            unit_power: properties.combat_power,
            max_speed: properties.max_speed,
            capacity,
            members: Vec::with_capacity(capacity),
            rally_point: None,
            rally_sector: None,
            state: GroupState::Idle,
            importance: 0.0,
            attack: None,
            last_command_tick: None,
            target_position: None,
            config,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn unit_type(&self) -> UnitTypeId {
        self.unit_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` for groups that can move between continents
    pub fn continent(&self) -> Option<ContinentId> {
        self.continent
    }

    pub fn category(&self) -> UnitCategory {
        self.category
    }

    pub fn movement(&self) -> MovementType {
        self.movement
    }

    pub fn roles(&self) -> UnitRoles {
        self.roles
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn members(&self) -> &[UnitId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.members.contains(&unit)
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn importance(&self) -> f32 {
        self.importance
    }

    pub fn attack(&self) -> Option<AttackSlot> {
        self.attack
    }

    pub fn rally_point(&self) -> Option<Position> {
        self.rally_point
    }

    pub fn rally_sector(&self) -> Option<SectorId> {
        self.rally_sector
    }

    pub fn last_command_tick(&self) -> Option<Tick> {
        self.last_command_tick
    }

    pub fn target_position(&self) -> Option<Position> {
        self.target_position
    }

    /// Total power of all members against `target_type`
    pub fn combat_power_vs(&self, target_type: TargetType) -> f32 {
        self.members.len() as f32 * self.unit_power.get(target_type)
    }

    pub(crate) fn attach(&mut self, slot: AttackSlot) {
        self.attack = Some(slot);
    }

    pub(crate) fn detach(&mut self) -> Option<AttackSlot> {
        self.attack.take()
    }

    /// Try to admit a unit; admitted units are sent to the rally point
    pub fn add_unit(
        &mut self,
        unit: UnitId,
        unit_type: UnitTypeId,
        continent: Option<ContinentId>,
        ctx: &mut CommandContext<'_>,
    ) -> bool {
        let admissible = unit_type == self.unit_type
            && group_continent(self.movement, continent) == self.continent
            && self.members.len() < self.capacity
            && self.attack.is_none()
            && !self.state.blocks_admission()
            && !self.members.contains(&unit);

        if !admissible {
            return false;
        }

        self.members.push(unit);

        if let Some(rally_point) = self.rally_point {
            // aircraft queue up so they arrive in formation
            let command = Command::Move {
                to: rally_point,
                queued: self.category == UnitCategory::AirCombat,
            };
            ctx.orders.give_order(unit, &command, "CombatGroup::add_unit");
        }

        true
    }

    /// Remove a member, optionally naming the enemy unit that destroyed it
    pub fn remove_unit(
        &mut self,
        unit: UnitId,
        attacker: Option<UnitId>,
        ctx: &mut CommandContext<'_>,
    ) -> Result<RemovalOutcome> {
        let Some(index) = self.members.iter().position(|&member| member == unit) else {
            let unit_data = ctx.unit_data;
            match ctx.units.unit_type(unit).and_then(|t| unit_data.properties(t)) {
                Some(properties) => warn!(
                    "Failed to remove {} ({}) from {} of {}",
                    unit, properties.name, self.id, self.name
                ),
                None => warn!(
                    "Failed to remove {} of unknown type from {} of {}",
                    unit, self.id, self.name
                ),
            }
            return Err(CoordinatorError::UnitNotInGroup {
                unit,
                group: self.id,
            });
        };

        self.members.remove(index);

        let mut outcome = RemovalOutcome {
            emptied: false,
            released_attack: None,
        };

        if self.members.is_empty() {
            self.state = GroupState::Idle;
            outcome.emptied = true;
            outcome.released_attack = self.attack.take();
        } else if let Some(attacker) = attacker {
            self.request_retaliation(attacker, ctx);
        }

        Ok(outcome)
    }

    /// Ask for air support against an attacker strong enough to be worth it
    fn request_retaliation(&self, attacker: UnitId, ctx: &mut CommandContext<'_>) {
        if self.config.air_only_mode {
            return;
        }

        let unit_data = ctx.unit_data;
        let Some(properties) = ctx.units.unit_type(attacker).and_then(|t| unit_data.properties(t))
        else {
            return;
        };

        let threshold = self.config.thresholds.min_air_support_efficiency;
        let power = &properties.combat_power;

        let worth_retaliating = match properties.category {
            UnitCategory::StaticDefence => true,
            UnitCategory::GroundCombat | UnitCategory::HoverCombat => {
                power.get(TargetType::Surface) > threshold
            }
            UnitCategory::SeaCombat => power.get(TargetType::Floater) > threshold,
            _ => false,
        };

        if worth_retaliating {
            debug!(
                "{} lost a unit to {} ({}), requesting air support",
                self.id, attacker, properties.name
            );
            ctx.air_support
                .check_target(attacker, properties.category, properties.health);
        }
    }

    /// Send a command to every member and record tick and importance
    fn give_order_to_group(
        &mut self,
        command: Command,
        importance: f32,
        task: UnitTask,
        issuer: &'static str,
        ctx: &mut CommandContext<'_>,
    ) {
        self.last_command_tick = Some(ctx.tick);
        self.importance = importance;

        for &unit in &self.members {
            ctx.orders.give_order(unit, &command, issuer);
            ctx.orders.set_unit_task(unit, task);
        }
    }

    /// Per-tick maintenance: decay task importance
    pub fn update(&mut self) {
        self.importance *= self.config.thresholds.importance_decay;
    }

    /// Position of the most recently added member
    pub fn group_position(&self, units: &dyn UnitTracker) -> Option<Position> {
        self.members.last().and_then(|&unit| units.position(unit))
    }

    /// Every member is close enough to the rally point
    pub fn is_entire_group_at_rally_point(&self, units: &dyn UnitTracker) -> bool {
        let Some(rally_point) = self.rally_point else {
            return false;
        };
        let max_squared_dist = self.config.thresholds.max_squared_dist_to_rally_point;

        !self.members.is_empty()
            && self.members.iter().all(|&unit| {
                units
                    .position(unit)
                    .is_some_and(|position| {
                        position.distance_squared(rally_point) < max_squared_dist
                    })
            })
    }

    /// Enough members, or strong enough members, to attack on its own
    pub fn sufficient_attack_power(&self) -> bool {
        if self.members.len() >= self.config.thresholds.min_members_for_attack {
            return true;
        }

        let relevant_axis = if self.roles.is_anti_air() {
            Some(TargetType::Air)
        } else {
            match self.target_type {
                TargetType::Surface | TargetType::Floater | TargetType::Submerged => {
                    Some(self.target_type)
                }
                TargetType::Static | TargetType::Air => None,
            }
        };

        relevant_axis.is_some_and(|axis| {
            self.unit_power.get(axis) > self.config.thresholds.min_combat_power_for_solo_attack
        })
    }

    /// Staged, unattached, and either a capable assault group or a pure anti-air group
    pub fn is_available_for_attack(&self, units: &dyn UnitTracker) -> bool {
        if self.attack.is_some() || !self.is_entire_group_at_rally_point(units) {
            return false;
        }

        if self.roles.is_assault() {
            self.sufficient_attack_power()
        } else {
            self.roles.is_anti_air()
        }
    }

    /// Suitability as a responder to an attack at `position`; 0 means unsuitable.
    ///
    /// Closer and faster groups score higher.
    pub fn defence_rating(
        &self,
        attacker_target_type: TargetType,
        position: Position,
        importance: f32,
        continent: Option<ContinentId>,
        units: &dyn UnitTracker,
    ) -> f32 {
        let reachable = self.continent.is_none() || self.continent == continent;
        let available = self.state.is_unassigned() || self.importance < importance;

        if !reachable || !available || !self.roles.can_fight(attacker_target_type) {
            return 0.0;
        }

        match self.group_position(units) {
            Some(group_position) => self.max_speed / (1.0 + group_position.distance(position)),
            None => 0.0,
        }
    }

    /// Air groups fly home after their target died
    pub fn target_unit_killed(&mut self, ctx: &mut CommandContext<'_>) {
        if self.config.air_only_mode || self.category != UnitCategory::AirCombat {
            return;
        }

        if let Some(rally_point) = self.rally_point {
            self.give_order_to_group(
                Command::move_to(rally_point),
                self.config.importance.rally,
                UnitTask::Moving,
                "CombatGroup::target_unit_killed",
                ctx,
            );
        }
    }

    /// Fight towards the attack position of `sector`
    pub fn attack_sector(
        &mut self,
        sector: SectorId,
        importance: f32,
        ctx: &mut CommandContext<'_>,
    ) {
        let attack_position = ctx.sectors.attack_position(sector);

        self.give_order_to_group(
            Command::Fight {
                to: attack_position,
            },
            importance + self.config.importance.attack_bonus,
            UnitTask::Attacking,
            "CombatGroup::attack_sector",
            ctx,
        );

        self.target_position = Some(attack_position);
        self.state = GroupState::Attacking {
            sector: Some(sector),
        };
    }

    /// Respond to an attack on `unit`: fight at the enemy position when known,
    /// otherwise guard the threatened unit
    pub fn defend(
        &mut self,
        unit: UnitId,
        enemy_position: Option<Position>,
        importance: f32,
        ctx: &mut CommandContext<'_>,
    ) {
        match enemy_position {
            Some(position) => {
                self.give_order_to_group(
                    Command::Fight { to: position },
                    importance,
                    UnitTask::Defending,
                    "CombatGroup::defend",
                    ctx,
                );
                self.target_position = Some(position);
                self.state = GroupState::Defending {
                    sector: ctx.sectors.sector_of(position),
                };
            }
            None => {
                self.give_order_to_group(
                    Command::Guard { unit },
                    importance,
                    UnitTask::Guarding,
                    "CombatGroup::defend",
                    ctx,
                );
                let position = ctx.units.position(unit);
                self.target_position = position;
                self.state = GroupState::Guarding {
                    sector: position.and_then(|p| ctx.sectors.sector_of(p)),
                };
            }
        }
    }

    /// Guard a unit of another group (anti-air escort)
    pub fn guard_unit(&mut self, unit: UnitId, importance: f32, ctx: &mut CommandContext<'_>) {
        self.give_order_to_group(
            Command::Guard { unit },
            importance,
            UnitTask::Guarding,
            "CombatGroup::guard_unit",
            ctx,
        );
        let position = ctx.units.position(unit);
        self.target_position = position;
        self.state = GroupState::Guarding {
            sector: position.and_then(|p| ctx.sectors.sector_of(p)),
        };
    }

    pub fn retreat(&mut self, position: Position, ctx: &mut CommandContext<'_>) {
        self.give_order_to_group(
            Command::move_to(position),
            self.config.importance.retreat,
            UnitTask::Moving,
            "CombatGroup::retreat",
            ctx,
        );
        self.target_position = Some(position);
        self.state = GroupState::Retreating {
            sector: ctx.sectors.sector_of(position),
        };
    }

    pub fn bomb_target(&mut self, position: Position, ctx: &mut CommandContext<'_>) {
        self.give_order_to_group(
            Command::Attack { at: position },
            self.config.importance.bombing,
            UnitTask::Attacking,
            "CombatGroup::bomb_target",
            ctx,
        );
        self.target_position = Some(position);
        self.state = GroupState::Bombing {
            sector: ctx.sectors.sector_of(position),
        };
    }

    pub fn air_raid_unit(&mut self, target: UnitId, ctx: &mut CommandContext<'_>) {
        self.give_order_to_group(
            Command::AttackUnit { unit: target },
            self.config.importance.air_raid,
            UnitTask::Attacking,
            "CombatGroup::air_raid_unit",
            ctx,
        );
        let position = ctx.units.position(target);
        self.target_position = position;
        self.state = GroupState::Attacking {
            sector: position.and_then(|p| ctx.sectors.sector_of(p)),
        };
    }

    pub fn defend_air_space(&mut self, position: Position, ctx: &mut CommandContext<'_>) {
        self.give_order_to_group(
            Command::Patrol { to: position },
            self.config.importance.patrol,
            UnitTask::Attacking,
            "CombatGroup::defend_air_space",
            ctx,
        );
        self.target_position = Some(position);
        self.state = GroupState::Patrolling;
    }

    /// Detach from an aborted attack and return to the rally point
    pub(crate) fn stand_down(&mut self, ctx: &mut CommandContext<'_>) {
        self.attack = None;
        self.state = GroupState::Idle;
        self.target_position = None;

        if let Some(rally_point) = self.rally_point {
            self.give_order_to_group(
                Command::move_to(rally_point),
                self.config.importance.return_to_rally,
                UnitTask::Moving,
                "CombatGroup::stand_down",
                ctx,
            );
        }
    }

    /// A member has run out of orders
    pub fn unit_idle(&mut self, unit: UnitId, ctx: &mut CommandContext<'_>) -> IdleResponse {
        if let Some(last) = self.last_command_tick {
            if ctx.ticks_since(last) < self.config.timing.idle_command_cooldown {
                return IdleResponse::None;
            }
        }

        if self.category == UnitCategory::AirCombat
            && !self.state.is_unassigned()
            && !self.config.air_only_mode
        {
            if let Some(rally_point) = self.rally_point {
                self.give_order_to_group(
                    Command::move_to(rally_point),
                    self.config.importance.return_to_rally,
                    UnitTask::Moving,
                    "CombatGroup::unit_idle",
                    ctx,
                );
            }
            self.state = GroupState::Idle;
            return IdleResponse::None;
        }

        let unit_sector = ctx
            .units
            .position(unit)
            .and_then(|position| ctx.sectors.sector_of(position));
        let target_sector = self.state.target_sector();

        if let Some(slot) = self.attack {
            if target_sector.is_none() || target_sector == unit_sector {
                if self.roles.is_assault() {
                    return IdleResponse::AttackTargetReached(slot);
                } else if self.roles.is_anti_air() {
                    return IdleResponse::EscortIdle(slot);
                }
            } else if let Some(sector) = target_sector.filter(|_| self.roles.is_assault()) {
                // straggler: send it on towards the target
                let command = Command::Fight {
                    to: ctx.sectors.attack_position(sector),
                };
                ctx.orders.give_order(unit, &command, "CombatGroup::unit_idle");
                ctx.orders.set_unit_task(unit, UnitTask::Attacking);
            }
            return IdleResponse::None;
        }

        if let Some(next) = self.state.settle_on_idle(unit_sector) {
            debug!("{} {} -> {}", self.id, self.state.label(), next.label());
            self.state = next;
        }

        IdleResponse::None
    }

    /// Uniformly chosen member
    pub fn random_unit(&self, rng: &mut impl Rng) -> Option<UnitId> {
        if self.members.is_empty() {
            None
        } else {
            Some(self.members[rng.gen_range(0..self.members.len())])
        }
    }

    /// Re-acquire a rally point if there is none or the base has grown over it
    pub fn update_rally_point(
        &mut self,
        ledger: &mut RallyPointLedger,
        ctx: &mut CommandContext<'_>,
    ) {
        let needs_new = match (self.rally_point, self.rally_sector) {
            (None, _) => true,
            (Some(_), Some(sector)) => ctx.sectors.is_within_base(sector),
            (Some(_), None) => false,
        };

        if needs_new {
            self.get_new_rally_point(ledger, ctx);
        }
    }

    /// Replace the rally point. Unassigned groups are sent to the new one.
    pub fn get_new_rally_point(
        &mut self,
        ledger: &mut RallyPointLedger,
        ctx: &mut CommandContext<'_>,
    ) -> bool {
        self.release_rally_point(ledger);

        let Some(rally_point) =
            ctx.rally_points
                .determine_rally_point(self.movement, self.continent, ledger)
        else {
            warn!(
                "Failed to determine rally point for {} of {}",
                self.id, self.name
            );
            return false;
        };

        let sector = ctx.sectors.sector_of(rally_point);
        if let Some(sector) = sector {
            ledger.reserve(sector);
        }
        self.rally_point = Some(rally_point);
        self.rally_sector = sector;

        if self.state.is_unassigned() && !self.members.is_empty() {
            self.give_order_to_group(
                Command::move_to(rally_point),
                self.config.importance.rally,
                UnitTask::HeadingToRallyPoint,
                "CombatGroup::get_new_rally_point",
                ctx,
            );
            self.state = GroupState::HeadingToRallyPoint { sector };
        }

        true
    }

    /// Drop the rally point and its reservation
    pub fn release_rally_point(&mut self, ledger: &mut RallyPointLedger) {
        if let Some(sector) = self.rally_sector.take() {
            ledger.release(sector);
        }
        self.rally_point = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::combat::unit_data::UnitDataProvider;
    use crate::sandbox::SandboxWorld;
    use crate::world::SectorMap;

    /// Group with `members` units already standing on its rally point
    pub(crate) fn create_test_group(
        world: &mut SandboxWorld,
        unit_type: UnitTypeId,
        continent: Option<ContinentId>,
        members: usize,
    ) -> CombatGroup {
        create_test_group_with_config(
            world,
            unit_type,
            continent,
            members,
            Arc::new(CoordinatorConfig::default()),
        )
    }

    pub(crate) fn create_test_group_with_config(
        world: &mut SandboxWorld,
        unit_type: UnitTypeId,
        continent: Option<ContinentId>,
        members: usize,
        config: Arc<CoordinatorConfig>,
    ) -> CombatGroup {
        let properties = world
            .catalog
            .properties(unit_type)
            .expect("unit type should be in the catalog")
            .clone();
        let mut group = CombatGroup::new(GroupId(0), unit_type, continent, &properties, config);

        let mut ledger = RallyPointLedger::new();
        group.get_new_rally_point(&mut ledger, &mut world.context());
        let rally_point = group.rally_point().unwrap_or(Position::ZERO);

        for _ in 0..members {
            let unit = world.spawn_unit(unit_type, rally_point);
            assert!(group.add_unit(unit, unit_type, continent, &mut world.context()));
        }
        group
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::FLAK, Some(ContinentId(0)), 4);
        assert_eq!(group.capacity(), 4);

        let extra = world.spawn_unit(SandboxWorld::FLAK, Position::ZERO);
        assert!(!group.add_unit(
            extra,
            SandboxWorld::FLAK,
            Some(ContinentId(0)),
            &mut world.context(),
        ));
        assert_eq!(group.len(), 4);
    }

    #[test]
    fn test_admission_requires_matching_identity() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);

        let other_type = world.spawn_unit(SandboxWorld::RIFLEMAN, Position::ZERO);
        assert!(!group.add_unit(
            other_type,
            SandboxWorld::RIFLEMAN,
            Some(ContinentId(0)),
            &mut world.context(),
        ));

        let other_continent = world.spawn_unit(SandboxWorld::TANK, Position::ZERO);
        assert!(!group.add_unit(
            other_continent,
            SandboxWorld::TANK,
            Some(ContinentId(1)),
            &mut world.context(),
        ));

        let duplicate = group.members()[0];
        assert!(!group.add_unit(
            duplicate,
            SandboxWorld::TANK,
            Some(ContinentId(0)),
            &mut world.context(),
        ));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_no_admission_while_attached_or_attacking() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let unit = world.spawn_unit(SandboxWorld::TANK, Position::ZERO);

        group.attach(AttackSlot(0));
        assert!(!group.add_unit(
            unit,
            SandboxWorld::TANK,
            Some(ContinentId(0)),
            &mut world.context(),
        ));
        group.detach();

        group.attack_sector(SectorId(3), 110.0, &mut world.context());
        assert!(!group.add_unit(
            unit,
            SandboxWorld::TANK,
            Some(ContinentId(0)),
            &mut world.context(),
        ));
    }

    #[test]
    fn test_admitted_unit_moves_to_rally_point() {
        let mut world = SandboxWorld::test_world();
        let group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let rally_point = group.rally_point().expect("group should have a rally point");

        let order = world
            .orders
            .last_order_for(group.members()[0])
            .expect("unit should have been ordered");
        assert_eq!(
            order.command,
            Command::Move {
                to: rally_point,
                queued: false
            }
        );
    }

    #[test]
    fn test_aircraft_moves_are_queued() {
        let mut world = SandboxWorld::test_world();
        let group = create_test_group(&mut world, SandboxWorld::BOMBER, Some(ContinentId(0)), 1);
        assert_eq!(group.continent(), None);

        let order = world
            .orders
            .last_order_for(group.members()[0])
            .expect("unit should have been ordered");
        assert!(matches!(order.command, Command::Move { queued: true, .. }));
    }

    #[test]
    fn test_admission_without_rally_point_sends_no_order() {
        let mut world = SandboxWorld::without_rally_points();
        let group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 2);

        assert_eq!(group.rally_point(), None);
        assert_eq!(group.len(), 2);
        assert!(world.orders.issued().is_empty());
        assert!(!group.is_available_for_attack(&world.units));
    }

    #[test]
    fn test_removing_non_member_is_an_error() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 2);
        let stranger = world.spawn_unit(SandboxWorld::TANK, Position::ZERO);

        let result = group.remove_unit(stranger, None, &mut world.context());
        assert!(matches!(
            result,
            Err(CoordinatorError::UnitNotInGroup { unit, .. }) if unit == stranger
        ));
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_removing_last_member_resets_and_releases_attack() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        group.attach(AttackSlot(2));
        group.attack_sector(SectorId(3), 110.0, &mut world.context());

        let member = group.members()[0];
        let outcome = group
            .remove_unit(member, None, &mut world.context())
            .expect("member should be removable");

        assert!(outcome.emptied);
        assert_eq!(outcome.released_attack, Some(AttackSlot(2)));
        assert_eq!(group.attack(), None);
        assert_eq!(group.state(), GroupState::Idle);
    }

    #[test]
    fn test_strong_attacker_triggers_air_support() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 3);
        let tower = world.spawn_unit(SandboxWorld::TOWER, Position::ZERO);
        let heavy = world.spawn_unit(SandboxWorld::HEAVY_TANK, Position::ZERO);
        let rifleman = world.spawn_unit(SandboxWorld::RIFLEMAN, Position::ZERO);

        let members = group.members().to_vec();
        group.remove_unit(members[0], Some(rifleman), &mut world.context()).expect("member");
        assert!(world.air_support.requests().is_empty());

        group.remove_unit(members[1], Some(tower), &mut world.context()).expect("member");
        group.remove_unit(members[2], Some(heavy), &mut world.context()).expect("member");

        // the last removal emptied the group: no hint
        let requests = world.air_support.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].attacker, tower);
        assert_eq!(requests[0].category, UnitCategory::StaticDefence);
    }

    #[test]
    fn test_heavy_ground_attacker_triggers_air_support() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 2);
        let heavy = world.spawn_unit(SandboxWorld::HEAVY_TANK, Position::ZERO);

        let member = group.members()[0];
        group.remove_unit(member, Some(heavy), &mut world.context()).expect("member");
        assert_eq!(world.air_support.requests().len(), 1);
    }

    #[test]
    fn test_no_air_support_in_air_only_mode() {
        let mut world = SandboxWorld::test_world();
        let config = Arc::new(CoordinatorConfig {
            air_only_mode: true,
            ..CoordinatorConfig::default()
        });
        let mut group = create_test_group_with_config(
            &mut world,
            SandboxWorld::BOMBER,
            None,
            2,
            config,
        );
        let tower = world.spawn_unit(SandboxWorld::TOWER, Position::ZERO);

        let member = group.members()[0];
        group.remove_unit(member, Some(tower), &mut world.context()).expect("member");
        assert!(world.air_support.requests().is_empty());
    }

    #[test]
    fn test_sufficient_attack_power() {
        let mut world = SandboxWorld::test_world();

        let two_tanks = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 2);
        assert!(!two_tanks.sufficient_attack_power());

        let three_tanks = create_test_group(
            &mut world,
            SandboxWorld::TANK,
            Some(ContinentId(0)),
            3,
        );
        assert!(three_tanks.sufficient_attack_power());

        let heavy = create_test_group(
            &mut world,
            SandboxWorld::HEAVY_TANK,
            Some(ContinentId(0)),
            1,
        );
        assert!(heavy.sufficient_attack_power());

        let flak = create_test_group(&mut world, SandboxWorld::FLAK, Some(ContinentId(0)), 1);
        assert!(flak.sufficient_attack_power());
    }

    #[test]
    fn test_availability_requires_staging() {
        let mut world = SandboxWorld::test_world();
        let group = create_test_group(
            &mut world,
            SandboxWorld::HEAVY_TANK,
            Some(ContinentId(0)),
            1,
        );

        assert!(group.is_available_for_attack(&world.units));
        assert!(group.is_available_for_attack(&world.units));

        let member = group.members()[0];
        world.units.teleport(member, Position::new(2000.0, 900.0));
        assert!(!group.is_available_for_attack(&world.units));
        assert!(!group.is_available_for_attack(&world.units));
    }

    #[test]
    fn test_availability_by_role() {
        let mut world = SandboxWorld::test_world();

        let mut tanks = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 3);
        assert!(tanks.is_available_for_attack(&world.units));
        tanks.attach(AttackSlot(0));
        assert!(!tanks.is_available_for_attack(&world.units));

        let weak = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        assert!(!weak.is_available_for_attack(&world.units));

        let flak = create_test_group(&mut world, SandboxWorld::FLAK, Some(ContinentId(0)), 1);
        assert!(flak.is_available_for_attack(&world.units));

        let artillery = create_test_group(
            &mut world,
            SandboxWorld::ARTILLERY,
            Some(ContinentId(0)),
            4,
        );
        assert!(!artillery.is_available_for_attack(&world.units));
    }

    #[test]
    fn test_defence_rating_prefers_close_groups() {
        let mut world = SandboxWorld::test_world();
        let group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let here = group
            .group_position(&world.units)
            .expect("member position should be known");

        let near = group.defence_rating(
            TargetType::Surface,
            here,
            50.0,
            Some(ContinentId(0)),
            &world.units,
        );
        let far = group.defence_rating(
            TargetType::Surface,
            here + Position::new(500.0, 0.0),
            50.0,
            Some(ContinentId(0)),
            &world.units,
        );
        assert!(near > far);
        assert!(far > 0.0);
        assert_eq!(near, 1.5);
    }

    #[test]
    fn test_defence_rating_zero_when_unsuitable() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let here = Position::new(100.0, 100.0);

        // wrong continent
        assert_eq!(
            group.defence_rating(
                TargetType::Surface,
                here,
                50.0,
                Some(ContinentId(1)),
                &world.units,
            ),
            0.0
        );
        // tanks cannot shoot aircraft
        assert_eq!(
            group.defence_rating(TargetType::Air, here, 50.0, Some(ContinentId(0)), &world.units),
            0.0
        );

        // busy with a more important task
        group.retreat(here, &mut world.context());
        assert_eq!(
            group.defence_rating(
                TargetType::Surface,
                here,
                100.0,
                Some(ContinentId(0)),
                &world.units,
            ),
            0.0
        );
        let rating = group.defence_rating(
            TargetType::Surface,
            here,
            110.0,
            Some(ContinentId(0)),
            &world.units,
        );
        assert!(rating > 0.0);
    }

    #[test]
    fn test_importance_decays_each_update() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let here = Position::new(100.0, 100.0);

        group.retreat(here, &mut world.context());
        assert_eq!(group.importance(), 105.0);

        for _ in 0..3 {
            group.update();
        }
        let expected = 105.0 * 0.97 * 0.97 * 0.97;
        assert!((group.importance() - expected).abs() < 1e-3);

        for _ in 0..100 {
            group.update();
        }
        let rating = group.defence_rating(
            TargetType::Surface,
            here,
            10.0,
            Some(ContinentId(0)),
            &world.units,
        );
        assert!(rating > 0.0);
    }

    #[test]
    fn test_idle_notifications_ignored_right_after_an_order() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let member = group.members()[0];
        let destination = world.units.position_of(member).expect("member position");

        world.tick = 100;
        group.retreat(destination, &mut world.context());

        world.tick = 105;
        group.unit_idle(member, &mut world.context());
        assert!(matches!(group.state(), GroupState::Retreating { .. }));

        world.tick = 110;
        group.unit_idle(member, &mut world.context());
        assert_eq!(group.state(), GroupState::Idle);
    }

    #[test]
    fn test_retreat_does_not_settle_elsewhere() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let member = group.members()[0];

        group.retreat(Position::new(1800.0, 200.0), &mut world.context());
        world.tick = 50;
        group.unit_idle(member, &mut world.context());
        assert!(matches!(group.state(), GroupState::Retreating { .. }));
    }

    #[test]
    fn test_idle_aircraft_return_to_rally_point() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::BOMBER, None, 2);
        let rally_point = group.rally_point().expect("rally point");
        let member = group.members()[0];

        group.bomb_target(Position::new(1500.0, 300.0), &mut world.context());
        assert!(matches!(group.state(), GroupState::Bombing { .. }));

        world.tick = 40;
        assert_eq!(group.unit_idle(member, &mut world.context()), IdleResponse::None);
        assert_eq!(group.state(), GroupState::Idle);
        assert_eq!(
            world.orders.last_order_for(member).map(|o| o.command),
            Some(Command::move_to(rally_point))
        );
    }

    #[test]
    fn test_attached_idle_reports_to_attack() {
        let mut world = SandboxWorld::test_world();
        let mut tanks = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 3);
        let mut flak = create_test_group(&mut world, SandboxWorld::FLAK, Some(ContinentId(0)), 1);
        let member = tanks.members()[0];
        let sector = world
            .map
            .sector_of(world.units.position_of(member).expect("member position"))
            .expect("member stands on the map");

        tanks.attach(AttackSlot(1));
        tanks.attack_sector(sector, 110.0, &mut world.context());
        flak.attach(AttackSlot(1));
        flak.attack_sector(sector, 110.0, &mut world.context());

        world.tick = 30;
        assert_eq!(
            tanks.unit_idle(member, &mut world.context()),
            IdleResponse::AttackTargetReached(AttackSlot(1))
        );
        let escort = flak.members()[0];
        assert_eq!(
            flak.unit_idle(escort, &mut world.context()),
            IdleResponse::EscortIdle(AttackSlot(1))
        );
    }

    #[test]
    fn test_idle_straggler_is_sent_on_to_target() {
        let mut world = SandboxWorld::test_world();
        let mut tanks = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 3);
        let member = tanks.members()[1];
        let far_sector = world
            .map
            .sector_of(Position::new(1900.0, 100.0))
            .expect("position is on the map");

        tanks.attach(AttackSlot(0));
        tanks.attack_sector(far_sector, 110.0, &mut world.context());
        let orders_before = world.orders.issued().len();

        world.tick = 30;
        assert_eq!(tanks.unit_idle(member, &mut world.context()), IdleResponse::None);

        let issued = world.orders.issued();
        assert_eq!(issued.len(), orders_before + 1);
        assert_eq!(issued[orders_before].unit, member);
        assert_eq!(
            issued[orders_before].command,
            Command::Fight {
                to: world.map.attack_position(far_sector)
            }
        );
        assert_eq!(world.orders.task_of(member), Some(UnitTask::Attacking));
    }

    #[test]
    fn test_defend_fights_or_guards() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 2);
        let protege = world.spawn_unit(SandboxWorld::RIFLEMAN, Position::new(300.0, 300.0));

        group.defend(protege, Some(Position::new(600.0, 300.0)), 120.0, &mut world.context());
        assert!(matches!(group.state(), GroupState::Defending { sector: Some(_) }));
        assert_eq!(group.importance(), 120.0);

        group.defend(protege, None, 120.0, &mut world.context());
        assert!(matches!(group.state(), GroupState::Guarding { sector: Some(_) }));
        assert_eq!(
            world.orders.last_order_for(group.members()[0]).map(|o| o.command),
            Some(Command::Guard { unit: protege })
        );
    }

    #[test]
    fn test_air_orders() {
        let mut world = SandboxWorld::test_world();
        let mut fighters = create_test_group(&mut world, SandboxWorld::FIGHTER, None, 2);
        let rally_point = fighters.rally_point().expect("rally point");

        fighters.defend_air_space(Position::new(400.0, 400.0), &mut world.context());
        assert_eq!(fighters.state(), GroupState::Patrolling);

        let target = world.spawn_unit(SandboxWorld::BOMBER, Position::new(900.0, 400.0));
        fighters.air_raid_unit(target, &mut world.context());
        assert!(matches!(fighters.state(), GroupState::Attacking { sector: Some(_) }));

        fighters.target_unit_killed(&mut world.context());
        assert_eq!(
            world.orders.last_order_for(fighters.members()[1]).map(|o| o.command),
            Some(Command::move_to(rally_point))
        );
    }

    #[test]
    fn test_new_rally_point_updates_ledger() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 2);
        let mut ledger = RallyPointLedger::new();

        assert!(group.get_new_rally_point(&mut ledger, &mut world.context()));
        let first = group.rally_sector().expect("rally sector");
        assert_eq!(ledger.usage(first), 1);
        assert!(matches!(group.state(), GroupState::HeadingToRallyPoint { .. }));

        assert!(group.get_new_rally_point(&mut ledger, &mut world.context()));
        assert_eq!(ledger.total(), 1);

        group.release_rally_point(&mut ledger);
        assert_eq!(ledger.total(), 0);
        assert_eq!(group.rally_point(), None);
    }

    #[test]
    fn test_rally_point_failure_leaves_group_unstaged() {
        let mut world = SandboxWorld::without_rally_points();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let mut ledger = RallyPointLedger::new();

        assert!(!group.get_new_rally_point(&mut ledger, &mut world.context()));
        assert_eq!(group.rally_point(), None);
        assert_eq!(ledger.total(), 0);
    }

    #[test]
    fn test_rally_point_moves_out_of_grown_base() {
        let mut world = SandboxWorld::test_world();
        let mut group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 1);
        let mut ledger = RallyPointLedger::new();
        group.get_new_rally_point(&mut ledger, &mut world.context());
        let old = group.rally_sector().expect("rally sector");

        group.update_rally_point(&mut ledger, &mut world.context());
        assert_eq!(group.rally_sector(), Some(old));

        world.map.set_within_base(old, true);
        group.update_rally_point(&mut ledger, &mut world.context());
        let new = group.rally_sector().expect("rally sector");
        assert_ne!(new, old);
        assert_eq!(ledger.usage(old), 0);
        assert_eq!(ledger.usage(new), 1);
    }

    #[test]
    fn test_random_unit_is_a_member() {
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;

        let mut world = SandboxWorld::test_world();
        let group = create_test_group(&mut world, SandboxWorld::TANK, Some(ContinentId(0)), 5);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..20 {
            let unit = group.random_unit(&mut rng).expect("group has members");
            assert!(group.contains(unit));
        }
    }
}

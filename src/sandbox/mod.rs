//! Deterministic skirmish sandbox
//!
//! A small grid world implementing every collaborator trait, used by the
//! runner binary and the tests.

pub mod map;
pub mod units;

pub use map::{GridMap, SectorInfo, POWER_PER_BUILDING};
pub use units::{
    AirSupportLog, IssuedOrder, OrderLog, SandboxThreats, SandboxUnit, SandboxUnits,
    SupportRequest,
};

use ahash::AHashMap;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::combat::target_type::TargetType;
use crate::combat::unit_data::{UnitCatalog, UnitDataProvider};
use crate::core::error::Result;
use crate::core::types::{Position, SectorId, Tick, UnitId, UnitTypeId};
use crate::world::{Command, CommandContext, SectorMap};

const SKIRMISH_CATALOG: &str = include_str!("../../data/units/skirmish.toml");

/// Chance per point of static power that an engaged unit razes a building each tick
const RAZE_CHANCE_PER_POWER: f32 = 0.02;
/// Chance per enemy building that an engaged unit is lost each tick
const LOSS_CHANCE_PER_BUILDING: f32 = 0.002;
const MAX_LOSS_CHANCE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Casualty {
    pub unit: UnitId,
    pub attacker: Option<UnitId>,
}

/// Outcome of one round of fighting at enemy bases
#[derive(Debug, Clone, Default, Serialize)]
pub struct SkirmishReport {
    pub buildings_destroyed: u32,
    pub cleared: Vec<SectorId>,
    /// Still alive in the unit table; the caller removes them
    pub losses: Vec<Casualty>,
}

pub struct SandboxWorld {
    pub tick: Tick,
    pub map: GridMap,
    pub catalog: UnitCatalog,
    pub units: SandboxUnits,
    pub threats: SandboxThreats,
    pub orders: OrderLog,
    pub air_support: AirSupportLog,
    defenders: AHashMap<SectorId, UnitId>,
}

impl SandboxWorld {
    pub const RIFLEMAN: UnitTypeId = UnitTypeId(1);
    pub const TANK: UnitTypeId = UnitTypeId(2);
    pub const HEAVY_TANK: UnitTypeId = UnitTypeId(3);
    pub const FLAK: UnitTypeId = UnitTypeId(4);
    pub const HOVERCRAFT: UnitTypeId = UnitTypeId(5);
    pub const DESTROYER: UnitTypeId = UnitTypeId(6);
    pub const SUBMARINE: UnitTypeId = UnitTypeId(7);
    pub const FIGHTER: UnitTypeId = UnitTypeId(8);
    pub const BOMBER: UnitTypeId = UnitTypeId(9);
    pub const ARTILLERY: UnitTypeId = UnitTypeId(10);
    pub const TOWER: UnitTypeId = UnitTypeId(11);
    pub const CONSTRUCTOR: UnitTypeId = UnitTypeId(12);

    pub fn new(map: GridMap, catalog: UnitCatalog) -> Self {
        Self {
            tick: 0,
            map,
            catalog,
            units: SandboxUnits::new(),
            threats: SandboxThreats::new(),
            orders: OrderLog::new(),
            air_support: AirSupportLog::new(),
            defenders: AHashMap::new(),
        }
    }

    /// Built-in catalog matching the unit type constants
    pub fn skirmish_catalog() -> Result<UnitCatalog> {
        UnitCatalog::from_toml_str(SKIRMISH_CATALOG)
    }

    fn builtin_catalog() -> UnitCatalog {
        Self::skirmish_catalog().unwrap_or_else(|err| {
            warn!("Built-in skirmish catalog is broken: {}", err);
            UnitCatalog::new()
        })
    }

    /// 8x4 grid, two continents, one enemy base with 3 buildings in sector 6
    pub fn test_world() -> Self {
        let mut world = Self::new(GridMap::new(8, 4, 2, 256.0), Self::builtin_catalog());
        let target = world.map.sector_at(6, 0);
        world.place_enemy_base(target, 3);
        world
    }

    /// Single-column grid with no staging sectors
    pub fn without_rally_points() -> Self {
        Self::new(GridMap::new(1, 4, 2, 256.0), Self::builtin_catalog())
    }

    pub fn context(&mut self) -> CommandContext<'_> {
        CommandContext {
            tick: self.tick,
            sectors: &self.map,
            selector: &self.map,
            rally_points: &self.map,
            unit_data: &self.catalog,
            units: &self.units,
            threats: &self.threats,
            orders: &mut self.orders,
            air_support: &mut self.air_support,
        }
    }

    pub fn spawn_unit(&mut self, unit_type: UnitTypeId, position: Position) -> UnitId {
        let speed = self
            .catalog
            .properties(unit_type)
            .map_or(0.0, |properties| properties.max_speed);
        self.units.spawn(unit_type, position, speed, false)
    }

    /// Enemy buildings in `sector`, guarded by a hostile tower
    pub fn place_enemy_base(&mut self, sector: SectorId, buildings: u32) {
        self.map.set_enemy_buildings(sector, buildings);
        if !self.defenders.contains_key(&sector) {
            let position = self.map.attack_position(sector);
            let defender = self.units.spawn(Self::TOWER, position, 0.0, true);
            self.defenders.insert(sector, defender);
        }
    }

    pub fn defender_of(&self, sector: SectorId) -> Option<UnitId> {
        self.defenders.get(&sector).copied()
    }

    /// Turn issued orders into movement
    pub fn apply_orders(&mut self) {
        for order in self.orders.take_pending() {
            let destination = match order.command {
                Command::Move { to, .. } | Command::Fight { to } | Command::Patrol { to } => {
                    Some(to)
                }
                Command::Attack { at } => Some(at),
                Command::Guard { unit } | Command::AttackUnit { unit } => {
                    self.units.position_of(unit)
                }
            };
            if let Some(destination) = destination {
                self.units.set_destination(order.unit, destination);
            }
        }
    }

    /// Apply orders, move units and advance the clock; returns friendly units that went idle
    pub fn advance(&mut self) -> Vec<UnitId> {
        self.apply_orders();
        let arrived = self.units.step();
        self.tick += 1;
        arrived
            .into_iter()
            .filter(|&unit| self.units.get(unit).is_some_and(|u| !u.hostile))
            .collect()
    }

    /// Friendly units standing in enemy sectors raze buildings and take losses
    pub fn resolve_skirmishes(&mut self, rng: &mut impl Rng) -> SkirmishReport {
        let engaged: Vec<(UnitId, SectorId, f32)> = self
            .units
            .iter()
            .filter(|(_, unit)| !unit.hostile)
            .filter_map(|(id, unit)| {
                let sector = self.map.sector_of(unit.position)?;
                if self.map.enemy_buildings(sector) == 0 {
                    return None;
                }
                let power = self
                    .catalog
                    .properties(unit.unit_type)
                    .map_or(0.0, |p| p.combat_power.get(TargetType::Static));
                Some((id, sector, power))
            })
            .collect();

        let mut report = SkirmishReport::default();
        for (unit, sector, power) in engaged {
            let buildings = self.map.enemy_buildings(sector);
            if buildings == 0 {
                continue;
            }

            let loss_chance = (buildings as f32 * LOSS_CHANCE_PER_BUILDING).min(MAX_LOSS_CHANCE);
            if rng.gen::<f32>() < loss_chance {
                report.losses.push(Casualty {
                    unit,
                    attacker: self.defender_of(sector),
                });
                continue;
            }

            if rng.gen::<f32>() < power * RAZE_CHANCE_PER_POWER
                && self.map.destroy_building(sector)
            {
                report.buildings_destroyed += 1;
                if self.map.is_cleared(sector) {
                    debug!("Sector {} cleared at tick {}", sector, self.tick);
                    if let Some(defender) = self.defenders.remove(&sector) {
                        self.units.kill(defender);
                    }
                    report.cleared.push(sector);
                }
            }
        }
        report
    }
}

//! Grid map with enemy bases, target selection and rally point placement

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::combat::power::available_power;
use crate::combat::target_type::{MobileTargetTypeValues, TargetType, TargetTypeVector};
use crate::combat::unit_data::MovementType;
use crate::core::types::{ContinentId, Position, SectorId};
use crate::groups::RallyPointLedger;
use crate::world::{AttackProgress, RallyPointProvider, SectorMap, SectorSelector};

/// Power vs. static targets an attack needs per enemy building to stay viable
pub const POWER_PER_BUILDING: f32 = 0.25;

#[derive(Debug, Clone, Serialize)]
pub struct SectorInfo {
    pub id: SectorId,
    pub column: u32,
    pub row: u32,
    pub continent: ContinentId,
    pub enemy_buildings: u32,
    pub within_base: bool,
}

/// Rectangular grid of square sectors.
///
/// Column 0 is the own base; groups stage in column 1. Continents are
/// horizontal bands of rows.
#[derive(Debug, Clone)]
pub struct GridMap {
    columns: u32,
    rows: u32,
    continents: u32,
    sector_size: f32,
    sectors: Vec<SectorInfo>,
}

impl GridMap {
    pub fn new(columns: u32, rows: u32, continents: u32, sector_size: f32) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let continents = continents.clamp(1, rows);

        let sectors = (0..rows)
            .flat_map(|row| (0..columns).map(move |column| (column, row)))
            .map(|(column, row)| SectorInfo {
                id: SectorId(row * columns + column),
                column,
                row,
                continent: ContinentId(row * continents / rows),
                enemy_buildings: 0,
                within_base: column == 0,
            })
            .collect();

        Self {
            columns,
            rows,
            continents,
            sector_size,
            sectors,
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn sector_size(&self) -> f32 {
        self.sector_size
    }

    pub fn sector_at(&self, column: u32, row: u32) -> SectorId {
        SectorId(row.min(self.rows - 1) * self.columns + column.min(self.columns - 1))
    }

    pub fn sector(&self, sector: SectorId) -> Option<&SectorInfo> {
        self.sectors.get(sector.0 as usize)
    }

    pub fn sectors(&self) -> impl Iterator<Item = &SectorInfo> {
        self.sectors.iter()
    }

    pub fn center(&self, sector: &SectorInfo) -> Position {
        Position::new(
            (sector.column as f32 + 0.5) * self.sector_size,
            (sector.row as f32 + 0.5) * self.sector_size,
        )
    }

    /// Centre of the first base sector
    pub fn base_position(&self) -> Position {
        self.center(&self.sectors[0])
    }

    pub fn set_enemy_buildings(&mut self, sector: SectorId, buildings: u32) {
        if let Some(info) = self.sectors.get_mut(sector.0 as usize) {
            info.enemy_buildings = buildings;
        }
    }

    pub fn enemy_buildings(&self, sector: SectorId) -> u32 {
        self.sector(sector).map_or(0, |info| info.enemy_buildings)
    }

    /// Destroy one building; returns whether there was one
    pub fn destroy_building(&mut self, sector: SectorId) -> bool {
        match self.sectors.get_mut(sector.0 as usize) {
            Some(info) if info.enemy_buildings > 0 => {
                info.enemy_buildings -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn set_within_base(&mut self, sector: SectorId, within_base: bool) {
        if let Some(info) = self.sectors.get_mut(sector.0 as usize) {
            info.within_base = within_base;
        }
    }

    /// Sectors with enemy buildings, by id
    pub fn enemy_sectors(&self) -> Vec<SectorId> {
        self.sectors
            .iter()
            .filter(|info| info.enemy_buildings > 0)
            .map(|info| info.id)
            .collect()
    }

    fn viable(&self, info: &SectorInfo, power: &TargetTypeVector) -> bool {
        power.get(TargetType::Static) >= info.enemy_buildings as f32 * POWER_PER_BUILDING
    }
}

impl SectorMap for GridMap {
    fn number_of_continents(&self) -> usize {
        self.continents as usize
    }

    fn sector_of(&self, position: Position) -> Option<SectorId> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let column = (position.x / self.sector_size) as u32;
        let row = (position.y / self.sector_size) as u32;
        (column < self.columns && row < self.rows).then(|| SectorId(row * self.columns + column))
    }

    fn continent_of(&self, sector: SectorId) -> Option<ContinentId> {
        self.sector(sector).map(|info| info.continent)
    }

    fn attack_position(&self, sector: SectorId) -> Position {
        self.sector(sector)
            .map_or(Position::ZERO, |info| self.center(info))
    }

    fn is_cleared(&self, sector: SectorId) -> bool {
        self.enemy_buildings(sector) == 0
    }

    fn is_within_base(&self, sector: SectorId) -> bool {
        self.sector(sector).is_some_and(|info| info.within_base)
    }

    fn is_attack_viable(&self, sector: SectorId, power: &TargetTypeVector) -> bool {
        self.sector(sector)
            .map_or(true, |info| self.viable(info, power))
    }
}

impl SectorSelector for GridMap {
    /// Closest enemy sector (by column) the available power can take on
    fn select_target_sector(
        &self,
        global: &TargetTypeVector,
        per_continent: &[TargetTypeVector],
        _group_counts: &MobileTargetTypeValues,
    ) -> Option<SectorId> {
        self.sectors
            .iter()
            .filter(|info| info.enemy_buildings > 0 && !info.within_base)
            .filter_map(|info| {
                let power = available_power(global, per_continent, info.continent.index());
                if power.get(TargetType::Static) <= 0.0 || !self.viable(info, &power) {
                    return None;
                }
                let score = 1.0 / (1.0 + info.column as f32);
                Some((OrderedFloat(score), Reverse(info.id)))
            })
            .max()
            .map(|(_, Reverse(id))| id)
    }

    /// Nearest other enemy sector on the attack's continent
    fn sector_to_continue_attack(&self, progress: &AttackProgress) -> Option<SectorId> {
        if progress.combat_power.get(TargetType::Static) <= 0.0 {
            return None;
        }

        let from = progress
            .current_target
            .and_then(|sector| self.sector(sector))
            .map_or_else(|| self.base_position(), |info| self.center(info));

        self.sectors
            .iter()
            .filter(|info| info.enemy_buildings > 0 && !info.within_base)
            .filter(|info| Some(info.id) != progress.current_target)
            .filter(|info| progress.continent.map_or(true, |c| c == info.continent))
            .filter(|info| self.viable(info, &progress.combat_power))
            .min_by_key(|info| (OrderedFloat(self.center(info).distance(from)), info.id))
            .map(|info| info.id)
    }
}

impl RallyPointProvider for GridMap {
    /// Least used staging sector next to the base
    fn determine_rally_point(
        &self,
        movement: MovementType,
        continent: Option<ContinentId>,
        ledger: &RallyPointLedger,
    ) -> Option<Position> {
        if movement == MovementType::Static {
            return None;
        }

        self.sectors
            .iter()
            .filter(|info| info.column == 1 && !info.within_base)
            .filter(|info| continent.map_or(true, |c| c == info.continent))
            .min_by_key(|info| (ledger.usage(info.id), info.id))
            .map(|info| self.center(info))
    }
}

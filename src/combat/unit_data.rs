//! Per-unit-type static data
//!
//! Category, movement, roles and combat power of each unit type are
//! precomputed elsewhere (build tree analysis, learned statistics) and
//! consumed here read-only.

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::combat::target_type::{TargetType, TargetTypeVector};
use crate::core::error::Result;
use crate::core::types::UnitTypeId;

/// Broad category of a unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    StaticDefence,
    GroundCombat,
    HoverCombat,
    SeaCombat,
    SubmarineCombat,
    AirCombat,
    MobileArtillery,
    Other,
}

impl UnitCategory {
    /// Mobile combat units are pooled into combat groups
    pub fn is_combat(self) -> bool {
        matches!(
            self,
            UnitCategory::GroundCombat
                | UnitCategory::HoverCombat
                | UnitCategory::SeaCombat
                | UnitCategory::SubmarineCombat
                | UnitCategory::AirCombat
                | UnitCategory::MobileArtillery
        )
    }

    /// Categories whose groups take part in attacks, in selection order
    pub const ATTACK_CATEGORIES: [UnitCategory; 4] = [
        UnitCategory::GroundCombat,
        UnitCategory::HoverCombat,
        UnitCategory::SeaCombat,
        UnitCategory::SubmarineCombat,
    ];
}

/// How a unit type moves across the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Ground,
    Hover,
    Sea,
    Submarine,
    Air,
    Static,
}

impl MovementType {
    /// Hovercraft and aircraft are not bound to a single continent
    pub fn can_move_to_other_continents(self) -> bool {
        matches!(self, MovementType::Hover | MovementType::Air)
    }
}

bitflags! {
    /// What a unit type is built and able to do
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct UnitRoles: u16 {
        const ASSAULT        = 1 << 0;
        const ANTI_AIR       = 1 << 1;
        const ANTI_SURFACE   = 1 << 2;
        const ANTI_SHIP      = 1 << 3;
        const ANTI_SUBMERGED = 1 << 4;
        const ANTI_STATIC    = 1 << 5;
        const ARTILLERY      = 1 << 6;
    }
}

impl UnitRoles {
    pub fn is_assault(self) -> bool {
        self.contains(UnitRoles::ASSAULT)
    }

    pub fn is_anti_air(self) -> bool {
        self.contains(UnitRoles::ANTI_AIR)
    }

    pub fn is_anti_surface(self) -> bool {
        self.contains(UnitRoles::ANTI_SURFACE)
    }

    /// Whether the unit type has weapons able to engage the given target type
    pub fn can_fight(self, target_type: TargetType) -> bool {
        let required = match target_type {
            TargetType::Static => UnitRoles::ANTI_STATIC,
            TargetType::Surface => UnitRoles::ANTI_SURFACE,
            TargetType::Floater => UnitRoles::ANTI_SHIP,
            TargetType::Submerged => UnitRoles::ANTI_SUBMERGED,
            TargetType::Air => UnitRoles::ANTI_AIR,
        };
        self.contains(required)
    }
}

/// Static data of one unit type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTypeProperties {
    pub name: String,
    pub category: UnitCategory,
    pub movement: MovementType,
    pub roles: UnitRoles,
    /// Combat power of a single unit against each target type
    pub combat_power: TargetTypeVector,
    /// How enemies classify this unit
    pub target_type: TargetType,
    pub max_speed: f32,
    pub max_range: f32,
    pub health: f32,
}

/// Source of per-unit-type static data
pub trait UnitDataProvider {
    fn properties(&self, unit_type: UnitTypeId) -> Option<&UnitTypeProperties>;
}

/// In-memory unit type table, loadable from TOML
///
/// ```toml
/// [[unit]]
/// id = 1
/// name = "Rifleman"
/// category = "ground_combat"
/// movement = "ground"
/// roles = "ASSAULT | ANTI_SURFACE"
/// combat_power = { static = 1.0, surface = 2.0 }
/// target_type = "surface"
/// max_speed = 2.0
/// max_range = 350.0
/// health = 300.0
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    types: AHashMap<UnitTypeId, UnitTypeProperties>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    unit: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: u32,
    name: String,
    category: UnitCategory,
    movement: MovementType,
    roles: UnitRoles,
    #[serde(default)]
    combat_power: TargetTypeVector,
    target_type: TargetType,
    max_speed: f32,
    #[serde(default)]
    max_range: f32,
    #[serde(default)]
    health: f32,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit_type: UnitTypeId, properties: UnitTypeProperties) {
        self.types.insert(unit_type, properties);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All unit type ids, sorted
    pub fn unit_types(&self) -> Vec<UnitTypeId> {
        let mut ids: Vec<UnitTypeId> = self.types.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        let mut catalog = Self::new();
        for entry in file.unit {
            catalog.insert(
                UnitTypeId(entry.id),
                UnitTypeProperties {
                    name: entry.name,
                    category: entry.category,
                    movement: entry.movement,
                    roles: entry.roles,
                    combat_power: entry.combat_power,
                    target_type: entry.target_type,
                    max_speed: entry.max_speed,
                    max_range: entry.max_range,
                    health: entry.health,
                },
            );
        }
        Ok(catalog)
    }

    /// Load from `path`, e.g. `data/units/skirmish.toml`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}

impl UnitDataProvider for UnitCatalog {
    fn properties(&self, unit_type: UnitTypeId) -> Option<&UnitTypeProperties> {
        self.types.get(&unit_type)
    }
}

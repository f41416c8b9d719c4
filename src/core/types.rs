//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Simulation tick counter (one host frame)
pub type Tick = u64;

/// Map position on the ground plane
pub type Position = glam::Vec2;

/// Handle of a live unit in the host simulation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "unit#{}", _0)]
pub struct UnitId(pub u32);

/// Identifier of a unit definition (all units built from the same blueprint)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "type#{}", _0)]
pub struct UnitTypeId(pub u32);

/// Connected movement region (land mass or body of water)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "continent#{}", _0)]
pub struct ContinentId(pub u32);

impl ContinentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Map sector: the unit of targeting for attacks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "sector#{}", _0)]
pub struct SectorId(pub u32);

/// Identifier of a combat group. Ids are handed out in creation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "group#{}", _0)]
pub struct GroupId(pub u32);

/// Index of an attack slot in the attack manager
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "attack#{}", _0)]
pub struct AttackSlot(pub usize);

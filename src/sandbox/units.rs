//! Sandbox unit table, threat estimates and recording collaborators

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::Serialize;

use crate::combat::target_type::TargetType;
use crate::combat::unit_data::UnitCategory;
use crate::core::types::{Position, UnitId, UnitTypeId};
use crate::world::{AirSupport, Command, OrderSink, ThreatTracker, UnitTask, UnitTracker};

/// Distance covered per tick for each point of `max_speed`
pub const SPEED_SCALE: f32 = 8.0;

#[derive(Debug, Clone, Serialize)]
pub struct SandboxUnit {
    pub unit_type: UnitTypeId,
    pub position: Position,
    pub destination: Option<Position>,
    pub speed: f32,
    pub hostile: bool,
}

/// Live units by id. Ids are never reused.
#[derive(Debug, Clone, Default)]
pub struct SandboxUnits {
    units: BTreeMap<UnitId, SandboxUnit>,
    next_id: u32,
}

impl SandboxUnits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(
        &mut self,
        unit_type: UnitTypeId,
        position: Position,
        speed: f32,
        hostile: bool,
    ) -> UnitId {
        self.next_id += 1;
        let id = UnitId(self.next_id);
        self.units.insert(
            id,
            SandboxUnit {
                unit_type,
                position,
                destination: None,
                speed,
                hostile,
            },
        );
        id
    }

    pub fn get(&self, unit: UnitId) -> Option<&SandboxUnit> {
        self.units.get(&unit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &SandboxUnit)> {
        self.units.iter().map(|(&id, unit)| (id, unit))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn position_of(&self, unit: UnitId) -> Option<Position> {
        self.units.get(&unit).map(|u| u.position)
    }

    /// Place a unit without moving it there; clears its destination
    pub fn teleport(&mut self, unit: UnitId, position: Position) {
        if let Some(u) = self.units.get_mut(&unit) {
            u.position = position;
            u.destination = None;
        }
    }

    pub fn set_destination(&mut self, unit: UnitId, destination: Position) {
        if let Some(u) = self.units.get_mut(&unit) {
            u.destination = Some(destination);
        }
    }

    pub fn kill(&mut self, unit: UnitId) -> Option<SandboxUnit> {
        self.units.remove(&unit)
    }

    /// Move every unit towards its destination; returns units that arrived
    pub fn step(&mut self) -> Vec<UnitId> {
        let mut arrived = Vec::new();
        for (&id, unit) in self.units.iter_mut() {
            let Some(destination) = unit.destination else {
                continue;
            };
            let stride = unit.speed * SPEED_SCALE;
            let offset = destination - unit.position;
            if offset.length() <= stride {
                unit.position = destination;
                unit.destination = None;
                arrived.push(id);
            } else if stride > 0.0 {
                unit.position += offset.normalize() * stride;
            }
        }
        arrived
    }
}

impl UnitTracker for SandboxUnits {
    fn unit_type(&self, unit: UnitId) -> Option<UnitTypeId> {
        self.units.get(&unit).map(|u| u.unit_type)
    }

    fn position(&self, unit: UnitId) -> Option<Position> {
        self.position_of(unit)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SandboxThreats {
    max_spotted: AHashMap<TargetType, f32>,
    recent_attacks: AHashMap<TargetType, f32>,
}

impl SandboxThreats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_max_spotted(&mut self, target_type: TargetType, value: f32) {
        self.max_spotted.insert(target_type, value.max(0.0));
    }

    pub fn set_recent_attacks(&mut self, target_type: TargetType, value: f32) {
        self.recent_attacks.insert(target_type, value.max(0.0));
    }
}

impl ThreatTracker for SandboxThreats {
    fn max_spotted_combat_units(&self, target_type: TargetType) -> f32 {
        self.max_spotted.get(&target_type).copied().unwrap_or(0.0)
    }

    fn recent_attacks_by(&self, target_type: TargetType) -> f32 {
        self.recent_attacks.get(&target_type).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IssuedOrder {
    pub unit: UnitId,
    pub command: Command,
    pub issuer: &'static str,
}

/// Records every order and the latest task per unit
#[derive(Debug, Clone, Default)]
pub struct OrderLog {
    issued: Vec<IssuedOrder>,
    tasks: AHashMap<UnitId, UnitTask>,
    applied: usize,
}

impl OrderLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> &[IssuedOrder] {
        &self.issued
    }

    pub fn last_order_for(&self, unit: UnitId) -> Option<&IssuedOrder> {
        self.issued.iter().rev().find(|order| order.unit == unit)
    }

    pub fn task_of(&self, unit: UnitId) -> Option<UnitTask> {
        self.tasks.get(&unit).copied()
    }

    /// Orders not yet handed out by a previous call
    pub fn take_pending(&mut self) -> Vec<IssuedOrder> {
        let pending = self.issued[self.applied..].to_vec();
        self.applied = self.issued.len();
        pending
    }
}

impl OrderSink for OrderLog {
    fn give_order(&mut self, unit: UnitId, command: &Command, issuer: &'static str) {
        self.issued.push(IssuedOrder {
            unit,
            command: *command,
            issuer,
        });
    }

    fn set_unit_task(&mut self, unit: UnitId, task: UnitTask) {
        self.tasks.insert(unit, task);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupportRequest {
    pub attacker: UnitId,
    pub category: UnitCategory,
    pub health: f32,
}

#[derive(Debug, Clone, Default)]
pub struct AirSupportLog {
    requests: Vec<SupportRequest>,
}

impl AirSupportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[SupportRequest] {
        &self.requests
    }
}

impl AirSupport for AirSupportLog {
    fn check_target(&mut self, attacker: UnitId, category: UnitCategory, health: f32) {
        self.requests.push(SupportRequest {
            attacker,
            category,
            health,
        });
    }
}

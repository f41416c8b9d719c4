//! Outbound unit commands

use serde::{Deserialize, Serialize};

use crate::core::types::{Position, UnitId};

/// Command sent to a single unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Move; queued moves are appended to the unit's current orders
    Move { to: Position, queued: bool },
    /// Move while engaging anything on the way
    Fight { to: Position },
    Guard { unit: UnitId },
    /// Attack a ground position
    Attack { at: Position },
    AttackUnit { unit: UnitId },
    Patrol { to: Position },
}

impl Command {
    pub fn move_to(to: Position) -> Self {
        Command::Move { to, queued: false }
    }
}

/// Task tag recorded for each unit receiving a group order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitTask {
    Moving,
    HeadingToRallyPoint,
    Attacking,
    Defending,
    Guarding,
}

/// Downstream command dispatch
pub trait OrderSink {
    /// `issuer` labels the call site for diagnostics
    fn give_order(&mut self, unit: UnitId, command: &Command, issuer: &'static str);

    fn set_unit_task(&mut self, unit: UnitId, task: UnitTask);
}

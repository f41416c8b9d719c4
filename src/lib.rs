//! Attack Coordinator - combat groups and attack coordination for RTS AI players
//!
//! Combat units are pooled into groups of one unit type; groups are committed
//! to attacks against enemy sectors and pulled back when an attack fails.
//! Everything outside this crate (map analysis, unit tracking, threat
//! estimation and command dispatch) is reached through the traits in [`world`].

pub mod attack;
pub mod combat;
pub mod coordinator;
pub mod core;
pub mod groups;
pub mod sandbox;
pub mod world;

pub use attack::{Attack, AttackManager, AttackStats};
pub use coordinator::{CombatCoordinator, CoordinatorSnapshot, GroupSnapshot};
pub use core::{CoordinatorConfig, CoordinatorError, Result};
pub use groups::{CombatGroup, GroupRoster, GroupState};
pub use world::CommandContext;

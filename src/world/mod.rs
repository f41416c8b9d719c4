//! Collaborators the coordinator talks to
//!
//! Map analysis, unit bookkeeping, threat estimation and command dispatch
//! all live outside this crate. They are reached through the traits below,
//! bundled per call into a [`CommandContext`].

pub mod orders;
pub mod sectors;
pub mod units;

pub use orders::{Command, OrderSink, UnitTask};
pub use sectors::{AttackProgress, RallyPointProvider, SectorMap, SectorSelector};
pub use units::{AirSupport, ThreatTracker, UnitTracker};

use crate::combat::unit_data::UnitDataProvider;
use crate::core::types::Tick;

/// Everything an operation may query or command, for the current tick
pub struct CommandContext<'a> {
    pub tick: Tick,
    pub sectors: &'a dyn SectorMap,
    pub selector: &'a dyn SectorSelector,
    pub rally_points: &'a dyn RallyPointProvider,
    pub unit_data: &'a dyn UnitDataProvider,
    pub units: &'a dyn UnitTracker,
    pub threats: &'a dyn ThreatTracker,
    pub orders: &'a mut dyn OrderSink,
    pub air_support: &'a mut dyn AirSupport,
}

impl CommandContext<'_> {
    /// Ticks elapsed since `since`; zero if `since` lies in the future
    pub fn ticks_since(&self, since: Tick) -> Tick {
        self.tick.saturating_sub(since)
    }
}

//! Combat groups and their bookkeeping

pub mod group;
pub mod rally;
pub mod roster;
pub mod state;

pub use group::{group_continent, CombatGroup, IdleResponse, RemovalOutcome};
pub use rally::RallyPointLedger;
pub use roster::GroupRoster;
pub use state::GroupState;

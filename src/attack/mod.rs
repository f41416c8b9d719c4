//! Attacks and the manager running them

pub mod attack;
pub mod manager;

pub use attack::Attack;
pub use manager::{AttackManager, AttackStats};

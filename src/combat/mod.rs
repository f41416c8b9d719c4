//! Unit type data and combat power bookkeeping

pub mod power;
pub mod target_type;
pub mod unit_data;

pub use power::{accumulate_combat_power, available_power, PowerAssessment};
pub use target_type::{MobileTargetType, MobileTargetTypeValues, TargetType, TargetTypeVector};
pub use unit_data::{
    MovementType, UnitCatalog, UnitCategory, UnitDataProvider, UnitRoles, UnitTypeProperties,
};

use thiserror::Error;

use crate::core::types::{GroupId, UnitId, UnitTypeId};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("{unit} is not a member of {group}")]
    UnitNotInGroup { unit: UnitId, group: GroupId },

    #[error("{unit} is already a member of {group}")]
    UnitAlreadyGrouped { unit: UnitId, group: GroupId },

    #[error("{0} does not belong to any combat group")]
    UnitNotGrouped(UnitId),

    #[error("No static data for {0}")]
    UnknownUnitType(UnitTypeId),

    #[error("{0} is not a combat unit type")]
    NotACombatUnit(UnitTypeId),

    #[error("Combat group not found: {0}")]
    UnknownGroup(GroupId),

    #[error("{unit} was rejected by newly created {group}")]
    AdmissionRejected { unit: UnitId, group: GroupId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

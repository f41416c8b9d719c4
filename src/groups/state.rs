//! Behavioral state of a combat group

use serde::{Deserialize, Serialize};

use crate::core::types::SectorId;

/// What a group is currently doing.
///
/// States with a sector remember where the group was sent; `None` means the
/// destination lies outside every known sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GroupState {
    #[default]
    Idle,
    HeadingToRallyPoint {
        sector: Option<SectorId>,
    },
    Attacking {
        sector: Option<SectorId>,
    },
    Bombing {
        sector: Option<SectorId>,
    },
    Defending {
        sector: Option<SectorId>,
    },
    Guarding {
        sector: Option<SectorId>,
    },
    Retreating {
        sector: Option<SectorId>,
    },
    Patrolling,
}

impl GroupState {
    /// Sector the group was ordered to
    pub fn target_sector(&self) -> Option<SectorId> {
        match *self {
            GroupState::HeadingToRallyPoint { sector }
            | GroupState::Attacking { sector }
            | GroupState::Bombing { sector }
            | GroupState::Defending { sector }
            | GroupState::Guarding { sector }
            | GroupState::Retreating { sector } => sector,
            GroupState::Idle | GroupState::Patrolling => None,
        }
    }

    /// Not busy with any task; staging does not count as a task
    pub fn is_unassigned(&self) -> bool {
        matches!(
            self,
            GroupState::Idle | GroupState::HeadingToRallyPoint { .. }
        )
    }

    /// Groups in these states take no new members
    pub fn blocks_admission(&self) -> bool {
        matches!(
            self,
            GroupState::Attacking { .. } | GroupState::Bombing { .. }
        )
    }

    /// Transition taken when a member reports idle in `unit_sector`.
    ///
    /// Staging, defending, guarding and retreating groups fall back to idle
    /// once a member idles inside their destination sector (or when they had
    /// none). Attacks are resolved by the attack manager instead.
    pub fn settle_on_idle(&self, unit_sector: Option<SectorId>) -> Option<GroupState> {
        match *self {
            GroupState::HeadingToRallyPoint { sector }
            | GroupState::Defending { sector }
            | GroupState::Guarding { sector }
            | GroupState::Retreating { sector } => {
                if sector.is_none() || sector == unit_sector {
                    Some(GroupState::Idle)
                } else {
                    None
                }
            }
            GroupState::Idle
            | GroupState::Attacking { .. }
            | GroupState::Bombing { .. }
            | GroupState::Patrolling => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupState::Idle => "idle",
            GroupState::HeadingToRallyPoint { .. } => "heading to rally point",
            GroupState::Attacking { .. } => "attacking",
            GroupState::Bombing { .. } => "bombing",
            GroupState::Defending { .. } => "defending",
            GroupState::Guarding { .. } => "guarding",
            GroupState::Retreating { .. } => "retreating",
            GroupState::Patrolling => "patrolling",
        }
    }
}

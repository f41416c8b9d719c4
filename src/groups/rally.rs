//! Rally point reservations per sector

use ahash::AHashMap;
use tracing::warn;

use crate::core::types::SectorId;

/// How many groups stage in each sector
#[derive(Debug, Clone, Default)]
pub struct RallyPointLedger {
    usage: AHashMap<SectorId, u32>,
}

impl RallyPointLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, sector: SectorId) {
        *self.usage.entry(sector).or_insert(0) += 1;
    }

    pub fn release(&mut self, sector: SectorId) {
        match self.usage.get_mut(&sector) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.usage.remove(&sector);
            }
            None => warn!("Released rally point in {} without a reservation", sector),
        }
    }

    pub fn usage(&self, sector: SectorId) -> u32 {
        self.usage.get(&sector).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.usage.values().sum()
    }
}

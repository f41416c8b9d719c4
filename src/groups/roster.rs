//! All combat groups of one player

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;

use crate::combat::unit_data::{UnitCategory, UnitTypeProperties};
use crate::core::config::CoordinatorConfig;
use crate::core::types::{ContinentId, GroupId, UnitId, UnitTypeId};
use crate::groups::group::CombatGroup;

/// Group arena keyed by id, plus a unit → group index.
///
/// Ids increase monotonically, so iteration follows creation order.
#[derive(Debug, Clone, Default)]
pub struct GroupRoster {
    groups: BTreeMap<GroupId, CombatGroup>,
    unit_index: AHashMap<UnitId, GroupId>,
    next_id: u32,
}

impl GroupRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty group and return its id
    pub fn create_group(
        &mut self,
        unit_type: UnitTypeId,
        continent: Option<ContinentId>,
        properties: &UnitTypeProperties,
        config: Arc<CoordinatorConfig>,
    ) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;
        self.groups
            .insert(id, CombatGroup::new(id, unit_type, continent, properties, config));
        id
    }

    /// Remove a group from the roster, dropping index entries of any remaining members
    pub fn dissolve(&mut self, id: GroupId) -> Option<CombatGroup> {
        let group = self.groups.remove(&id)?;
        for unit in group.members() {
            self.unit_index.remove(unit);
        }
        Some(group)
    }

    pub fn get(&self, id: GroupId) -> Option<&CombatGroup> {
        self.groups.get(&id)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut CombatGroup> {
        self.groups.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatGroup> {
        self.groups.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CombatGroup> {
        self.groups.values_mut()
    }

    pub fn ids(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups of one category, in creation order
    pub fn groups_of_category(&self, category: UnitCategory) -> impl Iterator<Item = &CombatGroup> {
        self.groups
            .values()
            .filter(move |group| group.category() == category)
    }

    /// Ids of groups with the given identity, in creation order
    pub fn groups_with_identity(
        &self,
        unit_type: UnitTypeId,
        continent: Option<ContinentId>,
    ) -> Vec<GroupId> {
        self.groups
            .values()
            .filter(|group| group.unit_type() == unit_type && group.continent() == continent)
            .map(|group| group.id())
            .collect()
    }

    pub fn group_of(&self, unit: UnitId) -> Option<GroupId> {
        self.unit_index.get(&unit).copied()
    }

    pub(crate) fn index_unit(&mut self, unit: UnitId, group: GroupId) {
        self.unit_index.insert(unit, group);
    }

    pub(crate) fn unindex_unit(&mut self, unit: UnitId) {
        self.unit_index.remove(&unit);
    }

    /// Number of grouped units
    pub fn unit_count(&self) -> usize {
        self.unit_index.len()
    }
}

//! Attack manager - launches, continues and aborts attacks
//!
//! Owns a fixed number of attack slots. Every tick each running attack is
//! checked for failure and for a cleared target; a free slot is used for at
//! most one launch attempt.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attack::attack::Attack;
use crate::combat::power::PowerAssessment;
use crate::combat::target_type::TargetType;
use crate::combat::unit_data::UnitCategory;
use crate::core::config::CoordinatorConfig;
use crate::core::types::{AttackSlot, GroupId, UnitId};
use crate::groups::{CombatGroup, GroupRoster};
use crate::world::CommandContext;

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackStats {
    pub launched: u32,
    pub continued: u32,
    pub aborted: u32,
}

/// Groups found available for a new attack, bucketed by role and region
#[derive(Debug, Default)]
struct AvailableGroups {
    assault_global: Vec<GroupId>,
    anti_air_global: Vec<GroupId>,
    assault_on_continent: Vec<Vec<GroupId>>,
    anti_air_on_continent: Vec<Vec<GroupId>>,
}

impl AvailableGroups {
    fn new(continents: usize) -> Self {
        Self {
            assault_on_continent: vec![Vec::new(); continents],
            anti_air_on_continent: vec![Vec::new(); continents],
            ..Self::default()
        }
    }

    fn insert(&mut self, group: &CombatGroup) {
        let assault = group.roles().is_assault();
        if !assault && !group.roles().is_anti_air() {
            return;
        }

        let bucket = match group.continent() {
            None if assault => &mut self.assault_global,
            None => &mut self.anti_air_global,
            Some(continent) => {
                let buckets = if assault {
                    &mut self.assault_on_continent
                } else {
                    &mut self.anti_air_on_continent
                };
                match buckets.get_mut(continent.index()) {
                    Some(bucket) => bucket,
                    None => {
                        warn!(
                            "{} is bound to unknown {}, skipping",
                            group.id(),
                            continent
                        );
                        return;
                    }
                }
            }
        };
        bucket.push(group.id());
    }

    fn assault_count(&self) -> usize {
        self.assault_global.len()
            + self
                .assault_on_continent
                .iter()
                .map(Vec::len)
                .sum::<usize>()
    }
}

/// First `max` ids of `preferred`, then of `fallback`
fn select_groups(max: usize, preferred: &[GroupId], fallback: &[GroupId]) -> Vec<GroupId> {
    preferred
        .iter()
        .chain(fallback.iter())
        .take(max)
        .copied()
        .collect()
}

pub struct AttackManager {
    config: Arc<CoordinatorConfig>,
    slots: Vec<Option<Attack>>,
    rng: ChaCha8Rng,
    stats: AttackStats,
}

impl AttackManager {
    pub fn new(config: Arc<CoordinatorConfig>) -> Self {
        Self {
            slots: (0..config.max_attacks).map(|_| None).collect(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            stats: AttackStats::default(),
            config,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_attacks(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn attack(&self, slot: AttackSlot) -> Option<&Attack> {
        self.slots.get(slot.0).and_then(Option::as_ref)
    }

    pub fn attacks(&self) -> impl Iterator<Item = &Attack> {
        self.slots.iter().flatten()
    }

    pub fn stats(&self) -> AttackStats {
        self.stats
    }

    /// Evaluate every slot, then try one launch into the last free slot
    pub fn update(&mut self, roster: &mut GroupRoster, ctx: &mut CommandContext<'_>) {
        let mut available_slot = None;

        for index in 0..self.slots.len() {
            let slot = AttackSlot(index);

            if self.slots[index].is_some() && !self.abort_attack_if_failed(slot, roster, ctx) {
                let cleared = self.slots[index]
                    .as_ref()
                    .is_some_and(|attack| attack.has_target_been_cleared(ctx.sectors));
                if cleared {
                    self.attack_next_sector_or_abort(slot, roster, ctx);
                }
            }

            if self.slots[index].is_none() {
                available_slot = Some(slot);
            }
        }

        if let Some(slot) = available_slot {
            self.try_to_launch_attack(slot, roster, ctx);
        }
    }

    /// Abort a stalled attack. Returns whether the slot was freed.
    fn abort_attack_if_failed(
        &mut self,
        slot: AttackSlot,
        roster: &mut GroupRoster,
        ctx: &mut CommandContext<'_>,
    ) -> bool {
        let Some(attack) = self.attack(slot) else {
            return false;
        };

        // prevent command overflow
        if ctx.ticks_since(attack.last_order_tick()) < self.config.timing.failure_check_interval {
            return false;
        }

        if attack.check_if_failed(roster, ctx.sectors) {
            debug!("{} failed", slot);
            self.abort_attack(slot, roster, ctx);
            true
        } else {
            false
        }
    }

    /// Move on to the next sector once the target is cleared, or give up
    pub fn attack_next_sector_or_abort(
        &mut self,
        slot: AttackSlot,
        roster: &mut GroupRoster,
        ctx: &mut CommandContext<'_>,
    ) {
        let Some(attack) = self.slots.get_mut(slot.0).and_then(Option::as_mut) else {
            return;
        };

        // prevent command overflow
        if ctx.ticks_since(attack.last_order_tick()) < self.config.timing.continuation_interval {
            return;
        }

        let progress = attack.progress(roster);
        match ctx.selector.sector_to_continue_attack(&progress) {
            Some(next) => {
                debug!(
                    "{} continues from {:?} to {}",
                    slot, progress.current_target, next
                );
                attack.attack_sector(next, self.config.importance.attack, roster, ctx);
                self.stats.continued += 1;
            }
            None => {
                // the slot was occupied above, so the abort always happens
                self.abort_attack(slot, roster, ctx);
            }
        }
    }

    /// A member of an assault group idles in the target sector
    pub fn on_target_reached(
        &mut self,
        slot: AttackSlot,
        roster: &mut GroupRoster,
        ctx: &mut CommandContext<'_>,
    ) {
        let cleared = self
            .attack(slot)
            .is_some_and(|attack| attack.has_target_been_cleared(ctx.sectors));

        if cleared {
            debug!("Combat group of {} idle - checking for next sector", slot);
            self.attack_next_sector_or_abort(slot, roster, ctx);
        }
    }

    /// Re-assign an idle escort to a live unit of the attack's first combat group
    pub fn escort(
        &mut self,
        slot: AttackSlot,
        escort: GroupId,
        roster: &mut GroupRoster,
        ctx: &mut CommandContext<'_>,
    ) {
        let Some(attack) = self.attack(slot) else {
            return;
        };

        let Some(&first) = attack.combat_groups().first() else {
            self.abort_attack(slot, roster, ctx);
            return;
        };

        let Some(protege) = self.pick_protege(first, roster, ctx) else {
            debug!("No live unit left to escort in {}", slot);
            return;
        };

        if let Some(group) = roster.get_mut(escort) {
            group.guard_unit(protege, self.config.importance.escort, ctx);
        }
    }

    /// Random member of `group`, re-validated; falls back to the first live member
    fn pick_protege(
        &mut self,
        group: GroupId,
        roster: &GroupRoster,
        ctx: &CommandContext<'_>,
    ) -> Option<UnitId> {
        let group = roster.get(group)?;
        let alive = |unit: &UnitId| ctx.units.position(*unit).is_some();

        group
            .random_unit(&mut self.rng)
            .filter(alive)
            .or_else(|| group.members().iter().copied().find(alive))
    }

    /// Drop a group whose back-reference was cleared on its side
    pub fn detach_group(&mut self, slot: AttackSlot, group: GroupId) {
        if let Some(attack) = self.slots.get_mut(slot.0).and_then(Option::as_mut) {
            if attack.remove_group(group) {
                debug!("{} left {}", group, slot);
            }
        }
    }

    /// Stop the attack, detach all its groups and free the slot
    pub fn abort_attack(
        &mut self,
        slot: AttackSlot,
        roster: &mut GroupRoster,
        ctx: &mut CommandContext<'_>,
    ) -> bool {
        let Some(mut attack) = self.slots.get_mut(slot.0).and_then(Option::take) else {
            return false;
        };

        attack.stop_attack(roster, ctx);
        self.stats.aborted += 1;
        info!("Aborted {} on {:?}", slot, attack.target());
        true
    }

    fn try_to_launch_attack(
        &mut self,
        slot: AttackSlot,
        roster: &mut GroupRoster,
        ctx: &mut CommandContext<'_>,
    ) {
        let mut available = AvailableGroups::new(ctx.sectors.number_of_continents());
        for category in UnitCategory::ATTACK_CATEGORIES {
            for group in roster.groups_of_category(category) {
                if group.is_available_for_attack(ctx.units) {
                    available.insert(group);
                }
            }
        }

        // no partial attacks
        if available.assault_count() == 0 {
            return;
        }

        let assessment = {
            let resolve = |ids: &[GroupId]| -> Vec<&CombatGroup> {
                ids.iter().filter_map(|&id| roster.get(id)).collect()
            };
            let global = resolve(&available.assault_global);
            let per_continent: Vec<Vec<&CombatGroup>> = available
                .assault_on_continent
                .iter()
                .map(|ids| resolve(ids))
                .collect();
            PowerAssessment::assess(&global, &per_continent)
        };

        let Some(target) = ctx.selector.select_target_sector(
            &assessment.global,
            &assessment.per_continent,
            &assessment.group_counts,
        ) else {
            debug!("No target sector for {} available assault groups", available.assault_count());
            return;
        };

        let continent = ctx.sectors.continent_of(target).map(|c| c.index());
        let on_continent = |buckets: &[Vec<GroupId>]| -> Vec<GroupId> {
            continent
                .and_then(|c| buckets.get(c))
                .cloned()
                .unwrap_or_default()
        };

        let mut attack = Attack::new(slot, ctx.tick);

        let assault_groups = on_continent(&available.assault_on_continent)
            .into_iter()
            .chain(available.assault_global.iter().copied());
        for id in assault_groups {
            if let Some(group) = roster.get_mut(id) {
                attack.add_group(group);
            }
        }

        if attack.combat_groups().is_empty() {
            debug!("No assault group can reach {}", target);
            return;
        }

        let air_threat = ctx.threats.max_spotted_combat_units(TargetType::Air)
            > self.config.thresholds.air_threat_spotted
            || ctx.threats.recent_attacks_by(TargetType::Air)
                > self.config.thresholds.air_threat_recent_attacks;

        if air_threat {
            let escorts = select_groups(
                1,
                &on_continent(&available.anti_air_on_continent),
                &available.anti_air_global,
            );
            for id in escorts {
                if let Some(group) = roster.get_mut(id) {
                    attack.add_group(group);
                }
            }
        }

        attack.attack_sector(target, self.config.importance.attack, roster, ctx);

        let power = continent.map_or(assessment.global, |c| assessment.available_on(c));
        info!(
            "Launched {} on {} with {} combat and {} anti-air groups ({:.1} static power)",
            slot,
            target,
            attack.combat_groups().len(),
            attack.anti_air_groups().len(),
            power.get(TargetType::Static)
        );
        self.stats.launched += 1;
        self.slots[slot.0] = Some(attack);
    }
}

//! Aggregation of group combat power per target type
//!
//! Stateless: the attack manager feeds it the groups it found available and
//! gets back the vectors handed to the sector selector.

use crate::combat::target_type::{MobileTargetTypeValues, TargetType, TargetTypeVector};
use crate::combat::unit_data::UnitCategory;
use crate::groups::CombatGroup;

/// Add the combat power of `groups` to `power` and count them per mobile target type.
///
/// Power vs. static targets is always added. The mobile axes depend on the
/// movement domain of the group: ground units add surface power, hovercraft
/// add surface and floater power, ships and submarines add floater and
/// submerged power. Air power is never part of an attack assessment.
pub fn accumulate_combat_power<'a>(
    groups: impl IntoIterator<Item = &'a CombatGroup>,
    power: &mut TargetTypeVector,
    group_counts: &mut MobileTargetTypeValues,
) {
    for group in groups {
        group_counts.add_for_target_type(group.target_type(), 1.0);

        power.add(TargetType::Static, group.combat_power_vs(TargetType::Static));

        match group.category() {
            UnitCategory::GroundCombat => {
                power.add(TargetType::Surface, group.combat_power_vs(TargetType::Surface));
            }
            UnitCategory::HoverCombat => {
                power.add(TargetType::Surface, group.combat_power_vs(TargetType::Surface));
                power.add(TargetType::Floater, group.combat_power_vs(TargetType::Floater));
            }
            UnitCategory::SeaCombat | UnitCategory::SubmarineCombat => {
                power.add(TargetType::Floater, group.combat_power_vs(TargetType::Floater));
                power.add(
                    TargetType::Submerged,
                    group.combat_power_vs(TargetType::Submerged),
                );
            }
            _ => {}
        }
    }
}

/// Combat power of a set of available assault groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerAssessment {
    /// Groups able to move between continents
    pub global: TargetTypeVector,
    /// Continent-bound groups, indexed by continent
    pub per_continent: Vec<TargetTypeVector>,
    /// Number of assessed groups per mobile target type (all buckets)
    pub group_counts: MobileTargetTypeValues,
}

impl PowerAssessment {
    /// Assess global and per-continent buckets independently
    pub fn assess(global: &[&CombatGroup], per_continent: &[Vec<&CombatGroup>]) -> Self {
        let mut assessment = PowerAssessment {
            per_continent: vec![TargetTypeVector::new(); per_continent.len()],
            ..PowerAssessment::default()
        };

        accumulate_combat_power(
            global.iter().copied(),
            &mut assessment.global,
            &mut assessment.group_counts,
        );

        for (continent, groups) in per_continent.iter().enumerate() {
            accumulate_combat_power(
                groups.iter().copied(),
                &mut assessment.per_continent[continent],
                &mut assessment.group_counts,
            );
        }

        assessment
    }

    /// Power available on a continent, counting groups that can reach it from anywhere
    pub fn available_on(&self, continent: usize) -> TargetTypeVector {
        available_power(&self.global, &self.per_continent, continent)
    }
}

/// Global power plus the power bound to `continent` (none for unknown continents)
pub fn available_power(
    global: &TargetTypeVector,
    per_continent: &[TargetTypeVector],
    continent: usize,
) -> TargetTypeVector {
    let mut power = *global;
    if let Some(local) = per_continent.get(continent) {
        power.add_vector(local);
    }
    power
}

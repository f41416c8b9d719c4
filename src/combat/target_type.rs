//! Target type classification and per-target-type value vectors
//!
//! Combat power and threat levels are always accounted per target type:
//! static structures, surface units, floating ships, submerged units, and
//! aircraft.

use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Abstract threat classification of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Static,
    Surface,
    Floater,
    Submerged,
    Air,
}

impl TargetType {
    pub const ALL: [TargetType; 5] = [
        TargetType::Static,
        TargetType::Surface,
        TargetType::Floater,
        TargetType::Submerged,
        TargetType::Air,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The mobile counterpart, `None` for static targets
    pub fn mobile(self) -> Option<MobileTargetType> {
        match self {
            TargetType::Static => None,
            TargetType::Surface => Some(MobileTargetType::Surface),
            TargetType::Floater => Some(MobileTargetType::Floater),
            TargetType::Submerged => Some(MobileTargetType::Submerged),
            TargetType::Air => Some(MobileTargetType::Air),
        }
    }
}

/// Target types of units that can move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobileTargetType {
    Surface,
    Floater,
    Submerged,
    Air,
}

impl MobileTargetType {
    pub const ALL: [MobileTargetType; 4] = [
        MobileTargetType::Surface,
        MobileTargetType::Floater,
        MobileTargetType::Submerged,
        MobileTargetType::Air,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<MobileTargetType> for TargetType {
    fn from(value: MobileTargetType) -> Self {
        match value {
            MobileTargetType::Surface => TargetType::Surface,
            MobileTargetType::Floater => TargetType::Floater,
            MobileTargetType::Submerged => TargetType::Submerged,
            MobileTargetType::Air => TargetType::Air,
        }
    }
}

/// Keeps only finite, positive contributions
fn contribution(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// One non-negative value per target type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TargetTypeTable", into = "TargetTypeTable")]
pub struct TargetTypeVector([f32; 5]);

impl TargetTypeVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(static_: f32, surface: f32, floater: f32, submerged: f32, air: f32) -> Self {
        let mut vector = Self::default();
        vector.add(TargetType::Static, static_);
        vector.add(TargetType::Surface, surface);
        vector.add(TargetType::Floater, floater);
        vector.add(TargetType::Submerged, submerged);
        vector.add(TargetType::Air, air);
        vector
    }

    pub fn get(&self, target_type: TargetType) -> f32 {
        self.0[target_type.index()]
    }

    /// Add a contribution; negative or non-finite values are ignored
    pub fn add(&mut self, target_type: TargetType, value: f32) {
        self.0[target_type.index()] += contribution(value);
    }

    pub fn add_vector(&mut self, other: &TargetTypeVector) {
        for target_type in TargetType::ALL {
            self.add(target_type, other.get(target_type));
        }
    }

    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&value| value == 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetType, f32)> + '_ {
        TargetType::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

impl Index<TargetType> for TargetTypeVector {
    type Output = f32;

    fn index(&self, index: TargetType) -> &f32 {
        &self.0[index.index()]
    }
}

/// Named-field form used for (de)serialization
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct TargetTypeTable {
    #[serde(rename = "static")]
    static_: f32,
    surface: f32,
    floater: f32,
    submerged: f32,
    air: f32,
}

impl From<TargetTypeTable> for TargetTypeVector {
    fn from(table: TargetTypeTable) -> Self {
        TargetTypeVector::from_values(
            table.static_,
            table.surface,
            table.floater,
            table.submerged,
            table.air,
        )
    }
}

impl From<TargetTypeVector> for TargetTypeTable {
    fn from(vector: TargetTypeVector) -> Self {
        TargetTypeTable {
            static_: vector.get(TargetType::Static),
            surface: vector.get(TargetType::Surface),
            floater: vector.get(TargetType::Floater),
            submerged: vector.get(TargetType::Submerged),
            air: vector.get(TargetType::Air),
        }
    }
}

/// One non-negative value per mobile target type (used for group counts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileTargetTypeValues([f32; 4]);

impl MobileTargetTypeValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, target_type: MobileTargetType) -> f32 {
        self.0[target_type.index()]
    }

    pub fn add(&mut self, target_type: MobileTargetType, value: f32) {
        self.0[target_type.index()] += contribution(value);
    }

    /// Add to the mobile counterpart of `target_type`; static targets are ignored
    pub fn add_for_target_type(&mut self, target_type: TargetType, value: f32) {
        if let Some(mobile) = target_type.mobile() {
            self.add(mobile, value);
        }
    }

    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }
}

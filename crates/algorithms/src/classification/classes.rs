//! Land-cover class scheme of the Mekong delta study

use covermap_core::{ClassLabel, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thematic classes mapped by the study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LandCoverClass {
    Aquaculture = 0,
    Water = 1,
    Vegetation = 2,
}

impl LandCoverClass {
    pub const ALL: [LandCoverClass; 3] = [Self::Aquaculture, Self::Water, Self::Vegetation];

    pub fn label(self) -> ClassLabel {
        self as ClassLabel
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Aquaculture => "aquaculture",
            Self::Water => "water",
            Self::Vegetation => "vegetation",
        }
    }

    /// Labels of all classes, ascending
    pub fn labels() -> Vec<ClassLabel> {
        Self::ALL.iter().map(|c| c.label()).collect()
    }
}

impl TryFrom<ClassLabel> for LandCoverClass {
    type Error = Error;

    fn try_from(label: ClassLabel) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.label() == label)
            .ok_or(Error::UnknownLabel(label))
    }
}

impl fmt::Display for LandCoverClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Road surface classification and rolling resistance.

use serde::{Deserialize, Serialize};

/// Road surface reported by the map-matching service.
///
/// `Unknown` defers to the rider's baseline Crr; everything else carries a
/// measured rolling-resistance coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Unknown,
    Asphalt,
    Concrete,
    WoodOrMetal,
    PavingStones,
    Cycleway,
    Compacted,
    Gravel,
}

impl Surface {
    /// Decode the wire surface id used by the columnar course payload.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Surface::Asphalt,
            2 => Surface::Concrete,
            3 => Surface::WoodOrMetal,
            4 => Surface::PavingStones,
            5 => Surface::Cycleway,
            6 => Surface::Compacted,
            7 => Surface::Gravel,
            _ => Surface::Unknown,
        }
    }

    /// Rolling-resistance coefficient for this surface, or `None` when the
    /// rider's baseline should apply.
    pub fn crr(self) -> Option<f64> {
        match self {
            Surface::Unknown => None,
            Surface::Asphalt => Some(0.004570),
            Surface::Concrete => Some(0.003427),
            Surface::WoodOrMetal => Some(0.005713),
            Surface::PavingStones => Some(0.005713),
            Surface::Cycleway => Some(0.005713),
            Surface::Compacted => Some(0.007998),
            Surface::Gravel => Some(0.015000),
        }
    }
}

//! Drivetrain efficiency model.
//!
//! Groupsets differ measurably in drivetrain loss, and a chain transmits
//! power more efficiently under higher load. Base efficiencies sit in
//! [0.940, 0.965]; the power correction follows a logarithmic fit over the
//! 50–400 W band where the effect was measured.

use serde::{Deserialize, Serialize};

/// Base efficiency applied when no drivetrain is specified.
pub const DEFAULT_BASE_EFFICIENCY: f64 = 0.962;

/// Known groupsets, keyed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Drivetrain {
    #[serde(rename = "duraAce")]
    DuraAce,
    #[serde(rename = "ultegra")]
    Ultegra,
    #[serde(rename = "105")]
    Shimano105,
    #[serde(rename = "tiagra")]
    Tiagra,
    #[serde(rename = "sora")]
    Sora,
    #[serde(rename = "claris")]
    Claris,
    #[serde(rename = "sis")]
    Sis,
    #[serde(rename = "redAxs")]
    RedAxs,
    #[serde(rename = "forceAxs")]
    ForceAxs,
    #[serde(rename = "rival")]
    Rival,
    #[serde(rename = "apex")]
    Apex,
    #[serde(rename = "superRecord")]
    SuperRecord,
    #[serde(rename = "Record")]
    Record,
    #[serde(rename = "Chorus")]
    Chorus,
    #[serde(rename = "Potenza")]
    Potenza,
    #[serde(rename = "Athena")]
    Athena,
    #[serde(rename = "Veloce")]
    Veloce,
    #[serde(rename = "Centaur")]
    Centaur,
    #[serde(rename = "kForce")]
    KForce,
}

impl Drivetrain {
    /// Base efficiency of the groupset.
    pub fn base_efficiency(self) -> f64 {
        match self {
            Drivetrain::DuraAce | Drivetrain::RedAxs | Drivetrain::SuperRecord => 0.965,
            Drivetrain::Ultegra | Drivetrain::ForceAxs | Drivetrain::Record | Drivetrain::KForce => {
                0.963
            }
            Drivetrain::Shimano105
            | Drivetrain::Rival
            | Drivetrain::Chorus
            | Drivetrain::Potenza => 0.960,
            Drivetrain::Tiagra | Drivetrain::Apex | Drivetrain::Athena => 0.955,
            Drivetrain::Sora | Drivetrain::Veloce => 0.950,
            Drivetrain::Claris | Drivetrain::Centaur => 0.945,
            Drivetrain::Sis => 0.940,
        }
    }
}

/// Power-dependent efficiency for a base efficiency.
///
/// `η(P) = (2.1246·ln(clamp(P, 50, 400)) − 11.5 + 100·η_base) / 100`
pub fn efficiency_at(base: f64, power_w: f64) -> f64 {
    let p = power_w.clamp(50.0, 400.0);
    (2.1246 * p.ln() - 11.5 + 100.0 * base) / 100.0
}

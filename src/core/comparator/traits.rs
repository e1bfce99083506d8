//! Similarity decision policies.

use serde::{Deserialize, Serialize};

/// dHash distance at or below which two images are identical
pub const IDENTICAL_DISTANCE: u32 = 0;
/// Largest dHash distance that only needs weak grayscale confirmation
pub const NEAR_DISTANCE: u32 = 10;
/// Largest dHash distance that can still be similar
pub const MAX_DISTANCE: u32 = 20;
/// Grayscale similarity a near match must exceed
pub const NEAR_GRAYSCALE: f64 = 0.5;
/// Grayscale similarity a far match must exceed
pub const FAR_GRAYSCALE: f64 = 0.825;

/// Outcome of the cascade, naming the branch that decided it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// dHash distance within the identical bound; nothing else computed
    Identical { distance: u32 },
    /// Small distance confirmed by grayscale similarity
    NearMatch { distance: u32, grayscale: f64 },
    /// Larger distance confirmed by strong grayscale similarity
    FarMatch { distance: u32, grayscale: f64 },
    /// dHash distance beyond the cut-off; nothing else computed
    TooDistant { distance: u32 },
    /// Within range but grayscale similarity too low
    Dissimilar { distance: u32, grayscale: f64 },
}

impl Verdict {
    /// Check if this verdict marks the pair as similar
    pub fn is_similar(&self) -> bool {
        matches!(
            self,
            Verdict::Identical { .. } | Verdict::NearMatch { .. } | Verdict::FarMatch { .. }
        )
    }

    /// dHash distance that started the cascade
    pub fn distance(&self) -> u32 {
        match *self {
            Verdict::Identical { distance }
            | Verdict::NearMatch { distance, .. }
            | Verdict::FarMatch { distance, .. }
            | Verdict::TooDistant { distance }
            | Verdict::Dissimilar { distance, .. } => distance,
        }
    }

    /// Grayscale similarity, if the cascade got far enough to compute it
    pub fn grayscale(&self) -> Option<f64> {
        match *self {
            Verdict::NearMatch { grayscale, .. }
            | Verdict::FarMatch { grayscale, .. }
            | Verdict::Dissimilar { grayscale, .. } => Some(grayscale),
            Verdict::Identical { .. } | Verdict::TooDistant { .. } => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Identical { .. } => write!(f, "Identical"),
            Verdict::NearMatch { .. } => write!(f, "Near Match"),
            Verdict::FarMatch { .. } => write!(f, "Far Match"),
            Verdict::TooDistant { .. } => write!(f, "Too Distant"),
            Verdict::Dissimilar { .. } => write!(f, "Dissimilar"),
        }
    }
}

/// Policy trait for deciding whether two images are similar
pub trait SimilarityPolicy: Send + Sync {
    /// Decide from the dHash distance.
    ///
    /// `grayscale` is only called when the distance alone cannot settle it.
    fn decide(&self, dhash_distance: u32, grayscale: &dyn Fn() -> f64) -> Verdict;

    /// Human-readable description of the policy
    fn description(&self) -> String;
}

/// Cut-offs used by [`CascadePolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeThresholds {
    pub identical_distance: u32,
    pub near_distance: u32,
    pub max_distance: u32,
    pub near_grayscale: f64,
    pub far_grayscale: f64,
}

impl Default for CascadeThresholds {
    fn default() -> Self {
        Self {
            identical_distance: IDENTICAL_DISTANCE,
            near_distance: NEAR_DISTANCE,
            max_distance: MAX_DISTANCE,
            near_grayscale: NEAR_GRAYSCALE,
            far_grayscale: FAR_GRAYSCALE,
        }
    }
}

impl CascadeThresholds {
    /// Check the thresholds are ordered and in range
    pub fn validate(&self) -> Result<(), String> {
        if self.identical_distance > self.near_distance {
            return Err(format!(
                "identical distance {} exceeds near distance {}",
                self.identical_distance, self.near_distance
            ));
        }
        if self.near_distance > self.max_distance {
            return Err(format!(
                "near distance {} exceeds max distance {}",
                self.near_distance, self.max_distance
            ));
        }
        for (name, value) in [
            ("near grayscale", self.near_grayscale),
            ("far grayscale", self.far_grayscale),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} threshold {value} is outside [0, 1]"));
            }
        }
        Ok(())
    }
}

/// dHash first, grayscale histogram only to confirm borderline pairs
#[derive(Debug, Clone, Default)]
pub struct CascadePolicy {
    thresholds: CascadeThresholds,
}

impl CascadePolicy {
    pub fn new(thresholds: CascadeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &CascadeThresholds {
        &self.thresholds
    }
}

impl SimilarityPolicy for CascadePolicy {
    fn decide(&self, distance: u32, grayscale: &dyn Fn() -> f64) -> Verdict {
        let t = &self.thresholds;

        if distance <= t.identical_distance {
            return Verdict::Identical { distance };
        }
        if distance > t.max_distance {
            return Verdict::TooDistant { distance };
        }

        let grayscale = grayscale();
        if distance <= t.near_distance && grayscale > t.near_grayscale {
            Verdict::NearMatch { distance, grayscale }
        } else if distance > t.near_distance && grayscale > t.far_grayscale {
            Verdict::FarMatch { distance, grayscale }
        } else {
            Verdict::Dissimilar { distance, grayscale }
        }
    }

    fn description(&self) -> String {
        let t = &self.thresholds;
        format!(
            "Cascade: dHash <= {} identical, > {} rejected, <= {} needs grayscale > {}, otherwise grayscale > {}",
            t.identical_distance, t.max_distance, t.near_distance, t.near_grayscale, t.far_grayscale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn decide(distance: u32, grayscale: f64) -> Verdict {
        CascadePolicy::default().decide(distance, &|| grayscale)
    }

    #[test]
    fn zero_distance_is_identical() {
        let verdict = decide(0, 0.0);
        assert_eq!(verdict, Verdict::Identical { distance: 0 });
        assert!(verdict.is_similar());
    }

    #[test]
    fn distance_above_twenty_is_rejected() {
        assert_eq!(decide(21, 1.0), Verdict::TooDistant { distance: 21 });
        assert!(!decide(21, 1.0).is_similar());
    }

    #[test]
    fn near_boundary_requires_grayscale_above_half() {
        assert!(!decide(10, 0.5).is_similar());
        assert!(decide(10, 0.51).is_similar());
        assert!(matches!(decide(10, 0.51), Verdict::NearMatch { .. }));
    }

    #[test]
    fn far_range_requires_strong_grayscale() {
        assert!(decide(15, 0.826).is_similar());
        assert!(matches!(decide(15, 0.826), Verdict::FarMatch { .. }));
        assert!(!decide(15, 0.8).is_similar());
        assert!(decide(20, 0.83).is_similar());
    }

    #[test]
    fn grayscale_is_not_computed_when_distance_decides() {
        let calls = Cell::new(0);
        let policy = CascadePolicy::default();
        let grayscale = || {
            calls.set(calls.get() + 1);
            1.0
        };

        policy.decide(0, &grayscale);
        policy.decide(21, &grayscale);
        assert_eq!(calls.get(), 0);

        policy.decide(5, &grayscale);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn verdict_exposes_grayscale_only_when_computed() {
        assert_eq!(decide(0, 0.9).grayscale(), None);
        assert_eq!(decide(12, 0.9).grayscale(), Some(0.9));
        assert_eq!(decide(12, 0.9).distance(), 12);
    }

    #[test]
    fn default_thresholds_are_valid() {
        assert!(CascadeThresholds::default().validate().is_ok());
    }

    #[test]
    fn misordered_thresholds_are_rejected() {
        let thresholds = CascadeThresholds {
            near_distance: 25,
            ..CascadeThresholds::default()
        };
        assert!(thresholds.validate().is_err());

        let thresholds = CascadeThresholds {
            far_grayscale: 1.5,
            ..CascadeThresholds::default()
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn verdict_display() {
        assert_eq!(decide(0, 0.0).to_string(), "Identical");
        assert_eq!(decide(30, 0.0).to_string(), "Too Distant");
    }
}

// Model tier selection.
//
// Strongly leaning text (little Center mass) goes to the higher-capability
// model; text that is already mostly centered gets the cheaper one.

use serde::Serialize;

use crate::bias::BiasDistribution;

/// Below this Center probability the advanced tier is used.
pub const CENTER_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Standard,
    Advanced,
}

impl ModelTier {
    pub fn select(bias: &BiasDistribution) -> Self {
        if bias.center < CENTER_THRESHOLD {
            ModelTier::Advanced
        } else {
            ModelTier::Standard
        }
    }
}

/// Concrete model names behind each tier.
#[derive(Debug, Clone)]
pub struct TierModels {
    pub standard: String,
    pub advanced: String,
}

impl TierModels {
    pub fn new(standard: impl Into<String>, advanced: impl Into<String>) -> Self {
        Self {
            standard: standard.into(),
            advanced: advanced.into(),
        }
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.standard,
            ModelTier::Advanced => &self.advanced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_center(center: f64) -> BiasDistribution {
        let side = (1.0 - center) / 2.0;
        BiasDistribution {
            left: side,
            center,
            right: side,
        }
    }

    #[test]
    fn test_low_center_selects_advanced() {
        assert_eq!(ModelTier::select(&with_center(0.1)), ModelTier::Advanced);
        assert_eq!(ModelTier::select(&with_center(0.29)), ModelTier::Advanced);
    }

    #[test]
    fn test_threshold_and_above_selects_standard() {
        assert_eq!(ModelTier::select(&with_center(0.3)), ModelTier::Standard);
        assert_eq!(ModelTier::select(&with_center(0.9)), ModelTier::Standard);
    }

    #[test]
    fn test_model_for() {
        let models = TierModels::new("cheap", "smart");
        assert_eq!(models.model_for(ModelTier::Standard), "cheap");
        assert_eq!(models.model_for(ModelTier::Advanced), "smart");
    }
}

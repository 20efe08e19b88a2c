// Bias classifier trait — the swap-ready abstraction.
//
// The default implementation runs a political-bias BERT model locally via
// ONNX. Tests and alternative backends only need `classify`.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Political-leaning categories, in the order the classifier emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiasLabel {
    Left,
    Center,
    Right,
}

impl BiasLabel {
    pub const ALL: [BiasLabel; 3] = [BiasLabel::Left, BiasLabel::Center, BiasLabel::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            BiasLabel::Left => "Left",
            BiasLabel::Center => "Center",
            BiasLabel::Right => "Right",
        }
    }
}

impl fmt::Display for BiasLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Probability mass per bias category. Serializes as
/// `{"Left": .., "Center": .., "Right": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasDistribution {
    #[serde(rename = "Left")]
    pub left: f64,
    #[serde(rename = "Center")]
    pub center: f64,
    #[serde(rename = "Right")]
    pub right: f64,
}

impl BiasDistribution {
    /// Build from raw probabilities, rescaled so they sum to 1.
    /// Negative or non-finite inputs are treated as zero; an all-zero input
    /// becomes the uniform distribution.
    pub fn new(left: f64, center: f64, right: f64) -> Self {
        let clean = |p: f64| if p.is_finite() && p > 0.0 { p } else { 0.0 };
        let (l, c, r) = (clean(left), clean(center), clean(right));
        let total = l + c + r;
        if total <= f64::EPSILON {
            let third = 1.0 / 3.0;
            return Self {
                left: third,
                center: third,
                right: third,
            };
        }
        Self {
            left: l / total,
            center: c / total,
            right: r / total,
        }
    }

    /// Softmax over the three classifier logits (Left, Center, Right).
    pub fn from_logits(logits: &[f32]) -> Result<Self> {
        if logits.len() != BiasLabel::ALL.len() {
            anyhow::bail!(
                "Expected {} logits from the bias classifier, got {}",
                BiasLabel::ALL.len(),
                logits.len()
            );
        }
        let probs = softmax(logits);
        Ok(Self::new(probs[0], probs[1], probs[2]))
    }

    pub fn probability(&self, label: BiasLabel) -> f64 {
        match label {
            BiasLabel::Left => self.left,
            BiasLabel::Center => self.center,
            BiasLabel::Right => self.right,
        }
    }

    /// The category with the most probability mass (ties go to the earlier label).
    pub fn dominant(&self) -> BiasLabel {
        let mut best = BiasLabel::Left;
        for label in BiasLabel::ALL {
            if self.probability(label) > self.probability(best) {
                best = label;
            }
        }
        best
    }

    pub fn entries(&self) -> [(BiasLabel, f64); 3] {
        BiasLabel::ALL.map(|label| (label, self.probability(label)))
    }
}

impl fmt::Display for BiasDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Left: {:.3}, Center: {:.3}, Right: {:.3}",
            self.left, self.center, self.right
        )
    }
}

/// Numerically stable softmax (shifts by the max logit before exponentiating).
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Trait for classifying the political lean of a text.
#[async_trait]
pub trait BiasClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<BiasDistribution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(d: &BiasDistribution) -> f64 {
        d.left + d.center + d.right
    }

    #[test]
    fn test_from_logits_sums_to_one() {
        for logits in [[0.0, 0.0, 0.0], [2.5, -1.0, 0.3], [80.0, -80.0, 0.0]] {
            let d = BiasDistribution::from_logits(&logits).unwrap();
            assert!((sum(&d) - 1.0).abs() < 1e-9, "sum was {}", sum(&d));
            assert!(d.entries().iter().all(|(_, p)| *p >= 0.0));
        }
    }

    #[test]
    fn test_from_logits_equal_is_uniform() {
        let d = BiasDistribution::from_logits(&[1.0, 1.0, 1.0]).unwrap();
        for (_, p) in d.entries() {
            assert!((p - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_from_logits_wrong_arity() {
        assert!(BiasDistribution::from_logits(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_new_normalizes_and_clamps() {
        let d = BiasDistribution::new(2.0, 1.0, 1.0);
        assert!((d.left - 0.5).abs() < 1e-12);
        let d = BiasDistribution::new(-1.0, f64::NAN, 1.0);
        assert_eq!(d.right, 1.0);
        let d = BiasDistribution::new(0.0, 0.0, 0.0);
        assert!((sum(&d) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dominant() {
        assert_eq!(
            BiasDistribution::new(0.1, 0.2, 0.7).dominant(),
            BiasLabel::Right
        );
        assert_eq!(
            BiasDistribution::new(0.2, 0.6, 0.2).dominant(),
            BiasLabel::Center
        );
    }

    #[test]
    fn test_serializes_with_label_keys() {
        let json = serde_json::to_value(BiasDistribution::new(0.2, 0.5, 0.3)).unwrap();
        assert!(json.get("Left").is_some());
        assert!(json.get("Center").is_some());
        assert!(json.get("Right").is_some());
    }

    #[test]
    fn test_display_for_prompts() {
        let s = BiasDistribution::new(0.25, 0.5, 0.25).to_string();
        assert_eq!(s, "Left: 0.250, Center: 0.500, Right: 0.250");
    }
}

//! Interpretation of the raw model score

use serde::{Deserialize, Serialize};

/// Fixed decision boundary. Scores strictly above it select `above_threshold`.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Cell classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Uninfected,
    Parasitized,
}

impl Label {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Uninfected => "Uninfected",
            Label::Parasitized => "Parasitized",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw classifier score in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    /// Accepts finite values in [0, 1] only
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Which label the score stands for.
///
/// The classifier's class-index convention comes from training, so the
/// mapping is configurable rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy {
    /// Label chosen when the score is strictly above the threshold
    pub above_threshold: Label,
    /// Label chosen otherwise
    pub otherwise: Label,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            above_threshold: Label::Uninfected,
            otherwise: Label::Parasitized,
        }
    }
}

impl LabelPolicy {
    /// Create a policy; the two labels must differ
    pub fn new(above_threshold: Label, otherwise: Label) -> Option<Self> {
        let policy = Self {
            above_threshold,
            otherwise,
        };
        policy.is_valid().then_some(policy)
    }

    pub fn is_valid(&self) -> bool {
        self.above_threshold != self.otherwise
    }

    /// Map a score to a label and the probability of that label
    pub fn interpret(&self, probability: Probability) -> ClassificationResult {
        let p = probability.value();
        if p > DECISION_THRESHOLD {
            ClassificationResult {
                label: self.above_threshold,
                confidence: p,
            }
        } else {
            ClassificationResult {
                label: self.otherwise,
                confidence: 1.0 - p,
            }
        }
    }
}

/// Interpret a score with the default mapping (> 0.5 is Uninfected)
pub fn interpret(probability: Probability) -> ClassificationResult {
    LabelPolicy::default().interpret(probability)
}

/// Labeled prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Probability of `label`, in [0.5, 1.0]
    pub confidence: f64,
}

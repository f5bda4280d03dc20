use std::path::Path;

use anyhow::Result;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::data_handling::{DecisionThreshold, Label};
use crate::stats::TrainingHistory;

/// Options controlling a single call to [`BinaryClassifier::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainOptions {
    /// Fraction of the training data, taken from its end, held out for
    /// per-epoch validation.
    pub validation_fraction: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Seed of the per-epoch batch shuffle.
    pub seed: u64,
    /// Cutoff used for the per-epoch accuracy figures.
    pub threshold: DecisionThreshold,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            validation_fraction: 0.1,
            epochs: 5,
            batch_size: 128,
            seed: 42,
            threshold: DecisionThreshold::default(),
        }
    }
}

/// Number of leading samples kept for training when the last
/// `validation_fraction` of `n` samples is held out: `floor(n * (1 - v))`.
pub fn validation_split_at(n: usize, validation_fraction: f64) -> usize {
    (n as f64 * (1.0 - validation_fraction)).floor() as usize
}

/// Loss and accuracy of a fitted classifier on a labeled set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

/// Contract of a binary image classifier.
///
/// Inputs are normalized `(n, height, width, channels)` batches. Scores are
/// probabilities of `Label::Tumor` in `[0, 1]`; turning them into labels is
/// left to [`DecisionThreshold`](crate::data_handling::DecisionThreshold).
pub trait BinaryClassifier {
    /// Train on `x` / `y` and keep the fitted state.
    fn fit(&mut self, x: &Array4<f32>, y: &[Label], options: &TrainOptions)
        -> Result<TrainingHistory>;

    /// One score per sample.
    fn predict(&self, x: &Array4<f32>) -> Result<Vec<f32>>;

    /// Loss and accuracy on `x` / `y`, labels assigned with `threshold`.
    fn evaluate(&self, x: &Array4<f32>, y: &[Label], threshold: DecisionThreshold)
        -> Result<Evaluation>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(&mut self, path: &Path) -> Result<()>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}

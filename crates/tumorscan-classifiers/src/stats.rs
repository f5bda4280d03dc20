use serde::{Deserialize, Serialize};

use crate::data_handling::{DecisionThreshold, Label};

/// Represents a single phase of training: either Training or Validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingPhase {
    Train,
    Validation,
}

/// Metric tracked per epoch in a [`TrainingHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMetric {
    Loss,
    Accuracy,
}

/// Stores epoch-level metrics for training and validation in a Struct of Arrays layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<usize>,
    pub phases: Vec<TrainingPhase>,
    pub losses: Vec<f32>,
    pub accuracies: Vec<f32>,
}

impl TrainingHistory {
    pub fn record(&mut self, epoch: usize, phase: TrainingPhase, loss: f32, accuracy: f32) {
        self.epochs.push(epoch);
        self.phases.push(phase);
        self.losses.push(loss);
        self.accuracies.push(accuracy);
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Number of distinct epochs recorded.
    pub fn num_epochs(&self) -> usize {
        let mut epochs = self.epochs.clone();
        epochs.sort_unstable();
        epochs.dedup();
        epochs.len()
    }

    /// `(epoch, value)` pairs of one metric for one phase, in recording order.
    pub fn series(&self, phase: TrainingPhase, metric: HistoryMetric) -> Vec<(usize, f32)> {
        (0..self.epochs.len())
            .filter(|&i| self.phases[i] == phase)
            .map(|i| {
                let value = match metric {
                    HistoryMetric::Loss => self.losses[i],
                    HistoryMetric::Accuracy => self.accuracies[i],
                };
                (self.epochs[i], value)
            })
            .collect()
    }

    /// Last recorded value of a metric for a phase.
    pub fn last(&self, phase: TrainingPhase, metric: HistoryMetric) -> Option<f32> {
        self.series(phase, metric).last().map(|(_, v)| *v)
    }
}

/// Utility functions for evaluating binary predictions.
pub struct Metrics;

impl Metrics {
    /// Fraction of scores whose thresholded class equals the label.
    pub fn binary_accuracy(scores: &[f32], labels: &[Label], threshold: DecisionThreshold) -> f32 {
        if scores.is_empty() {
            return 0.0;
        }
        let correct = scores
            .iter()
            .zip(labels)
            .filter(|&(s, l)| threshold.classify(*s) == *l)
            .count();
        correct as f32 / scores.len() as f32
    }

    /// Fraction of predicted labels equal to the true labels.
    pub fn label_accuracy(y_true: &[Label], y_pred: &[Label]) -> f32 {
        if y_true.is_empty() {
            return 0.0;
        }
        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
        correct as f32 / y_true.len() as f32
    }

    /// Mean binary cross-entropy of probability scores, with scores clipped
    /// away from 0 and 1.
    pub fn binary_cross_entropy(scores: &[f32], labels: &[Label]) -> f32 {
        const EPS: f32 = 1e-7;
        if scores.is_empty() {
            return 0.0;
        }
        let total: f32 = scores
            .iter()
            .zip(labels)
            .map(|(&s, &l)| {
                let p = s.clamp(EPS, 1.0 - EPS);
                let t = l.as_f32();
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum();
        total / scores.len() as f32
    }
}

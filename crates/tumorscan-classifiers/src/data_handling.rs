//! Data structures for labeled image datasets.
//!
//! This module defines `ImageSample`, `Label` and `Dataset`, and contains the
//! assembler that stacks loaded samples into one batch array plus the seeded
//! train/test splitter.
use std::fmt;

use anyhow::Result;
use ndarray::{stack, Array3, Array4, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Binary class of a sample. The discriminant is the numeric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    NoTumor = 0,
    Tumor = 1,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::NoTumor, Label::Tumor];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_f32(self) -> f32 {
        self as u8 as f32
    }

    /// Name of the corpus subdirectory holding samples of this class.
    pub fn class_dir(self) -> &'static str {
        match self {
            Label::NoTumor => "no",
            Label::Tumor => "yes",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Label::NoTumor => "No Tumor",
            Label::Tumor => "Tumor",
        }
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::NoTumor),
            1 => Ok(Label::Tumor),
            _ => Err(format!("Label must be 0 or 1, got {}", value)),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Score cutoff separating the two classes: scores strictly above the
/// threshold are `Label::Tumor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThreshold(pub f32);

impl DecisionThreshold {
    pub fn classify(&self, score: f32) -> Label {
        if score > self.0 {
            Label::Tumor
        } else {
            Label::NoTumor
        }
    }

    pub fn classify_all(&self, scores: &[f32]) -> Vec<Label> {
        scores.iter().map(|&s| self.classify(s)).collect()
    }
}

impl Default for DecisionThreshold {
    fn default() -> Self {
        DecisionThreshold(0.5)
    }
}

/// A decoded, resized `height x width x 3` pixel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    pixels: Array3<u8>,
}

impl ImageSample {
    /// Wrap a pixel grid, rejecting anything that is not 3-channel.
    pub fn new(pixels: Array3<u8>) -> Result<Self> {
        let (h, w, c) = pixels.dim();
        if c != 3 {
            return Err(DatasetError::Shape {
                expected: (h, w, 3),
                found: (h, w, c),
            }
            .into());
        }
        Ok(Self { pixels })
    }

    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.pixels.dim()
    }

    pub fn into_array(self) -> Array3<u8> {
        self.pixels
    }
}

/// Samples stacked into an `(n, height, width, 3)` array with positionally
/// paired labels. Frozen once assembled.
#[derive(Debug, Clone)]
pub struct Dataset {
    samples: Array4<u8>,
    labels: Vec<Label>,
}

impl Dataset {
    /// Stack loader output into a dataset.
    ///
    /// Fails with `DatasetError::EmptyDataset` on zero pairs and with
    /// `DatasetError::Shape` if the samples are not all the same size.
    pub fn assemble(pairs: Vec<(ImageSample, Label)>) -> Result<Self> {
        let Some((first, _)) = pairs.first() else {
            return Err(DatasetError::EmptyDataset.into());
        };
        let expected = first.shape();

        if let Some((bad, _)) = pairs.iter().find(|(s, _)| s.shape() != expected) {
            return Err(DatasetError::Shape {
                expected,
                found: bad.shape(),
            }
            .into());
        }

        let views: Vec<ArrayView3<u8>> = pairs.iter().map(|(s, _)| s.pixels()).collect();
        let samples = stack(Axis(0), &views)?;
        let labels: Vec<Label> = pairs.iter().map(|(_, l)| *l).collect();

        log::info!("Dataset Length: {}", samples.len_of(Axis(0)));
        log::info!("Label Length: {}", labels.len());

        Self::from_parts(samples, labels)
    }

    /// Build a dataset from an already stacked array.
    pub fn from_parts(samples: Array4<u8>, labels: Vec<Label>) -> Result<Self> {
        let n = samples.len_of(Axis(0));
        if n != labels.len() {
            return Err(DatasetError::LengthMismatch {
                samples: n,
                labels: labels.len(),
            }
            .into());
        }
        if n == 0 {
            return Err(DatasetError::EmptyDataset.into());
        }
        Ok(Self { samples, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn samples(&self) -> &Array4<u8> {
        &self.samples
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// `(height, width, channels)` shared by every sample.
    pub fn sample_shape(&self) -> (usize, usize, usize) {
        let (_, h, w, c) = self.samples.dim();
        (h, w, c)
    }

    /// Number of samples per class, `[no tumor, tumor]`.
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for label in &self.labels {
            counts[label.as_u8() as usize] += 1;
        }
        counts
    }

    /// Partition into train and test subsets, see [`partition_indices`].
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<Split> {
        let (train_idx, test_idx) = partition_indices(self.len(), test_fraction, seed)?;

        let x_train = self.samples.select(Axis(0), &train_idx);
        let x_test = self.samples.select(Axis(0), &test_idx);
        let y_train = train_idx.iter().map(|&i| self.labels[i]).collect();
        let y_test = test_idx.iter().map(|&i| self.labels[i]).collect();

        log::info!(
            "Train-Test Split: {} training / {} test samples (test fraction {}, seed {})",
            train_idx.len(),
            test_idx.len(),
            test_fraction,
            seed
        );

        Ok(Split {
            x_train,
            x_test,
            y_train,
            y_test,
            train_idx,
            test_idx,
        })
    }
}

/// Train/test partition of a `Dataset`. The index vectors record which rows of
/// the source dataset each subset was gathered from, in gathered order.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Array4<u8>,
    pub x_test: Array4<u8>,
    pub y_train: Vec<Label>,
    pub y_test: Vec<Label>,
    pub train_idx: Vec<usize>,
    pub test_idx: Vec<usize>,
}

/// Number of held-out samples for `n` samples and fraction `f`: `round(f * n)`.
pub fn test_count(n: usize, test_fraction: f64) -> usize {
    (test_fraction * n as f64).round() as usize
}

/// Deterministically shuffle `0..n` with a seeded `StdRng` and cut it into
/// `(train_idx, test_idx)`. The first `round(f * n)` shuffled indices form the
/// test set.
pub fn partition_indices(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(DatasetError::InvalidFraction(test_fraction).into());
    }
    if n == 0 {
        return Err(DatasetError::EmptyDataset.into());
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = test_count(n, test_fraction);
    let train_idx = indices.split_off(n_test);
    Ok((train_idx, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_conversions() {
        assert_eq!(Label::try_from(0u8).unwrap(), Label::NoTumor);
        assert_eq!(Label::try_from(1u8).unwrap(), Label::Tumor);
        assert!(Label::try_from(2u8).is_err());
        assert_eq!(Label::Tumor.as_f32(), 1.0);
        assert_eq!(Label::NoTumor.class_dir(), "no");
        assert_eq!(Label::Tumor.class_dir(), "yes");
        assert_eq!(Label::Tumor.to_string(), "1");
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let t = DecisionThreshold::default();
        assert_eq!(t.classify(0.73), Label::Tumor);
        assert_eq!(t.classify(0.42), Label::NoTumor);
        assert_eq!(t.classify(0.5), Label::NoTumor);
        assert_eq!(
            t.classify_all(&[0.9, 0.1]),
            vec![Label::Tumor, Label::NoTumor]
        );
    }

    #[test]
    fn test_count_rounds() {
        assert_eq!(test_count(5, 0.2), 1);
        assert_eq!(test_count(10, 0.25), 3);
        assert_eq!(test_count(1, 0.2), 0);
        assert_eq!(test_count(253, 0.2), 51);
    }

    #[test]
    fn test_count_rounds_half_up_at_exact_boundaries() {
        assert_eq!(test_count(10, 0.35), 4);
        assert_eq!(test_count(10, 0.45), 5);

        let (train, test) = partition_indices(10, 0.35, 42).unwrap();
        assert_eq!(test.len(), 4);
        assert_eq!(train.len(), 6);
    }

    #[test]
    fn partition_rejects_bad_fraction() {
        assert!(partition_indices(10, 1.0, 42).is_err());
        assert!(partition_indices(10, -0.1, 42).is_err());
        assert!(partition_indices(0, 0.2, 42).is_err());
    }
}

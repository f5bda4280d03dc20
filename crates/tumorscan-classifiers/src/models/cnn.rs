//! Convolutional tumor classifier built on Candle.
//!
//! Architecture (channels-first internally, `(n, h, w, c)` at the API):
//!
//! ```text
//! Conv2d(k x k, filters) -> ReLU -> MaxPool(p x p) -> Flatten
//!   -> Linear(hidden_units) -> ReLU -> Dropout
//!   -> Linear(wide_units) -> ReLU -> Linear(1) -> sigmoid
//! ```
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{
    conv2d, linear, AdamW, Conv2d, Conv2dConfig, Dropout, Linear, Module, Optimizer, ParamsAdamW,
    VarBuilder, VarMap,
};
use log::info;
use ndarray::{Array4, ArrayBase, Axis, Data, Ix4};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tqdm::tqdm;

use crate::config::CnnConfig;
use crate::data_handling::{DecisionThreshold, Label};
use crate::error::DatasetError;
use crate::models::classifier_trait::{
    validation_split_at, BinaryClassifier, Evaluation, TrainOptions,
};
use crate::stats::{Metrics, TrainingHistory, TrainingPhase};

const PREDICT_BATCH_SIZE: usize = 128;

pub struct CnnClassifier {
    config: CnnConfig,
    input_shape: (usize, usize, usize),
    pooled_shape: (usize, usize),
    varmap: VarMap,
    device: Device,
    conv: Conv2d,
    hidden: Linear,
    dropout: Dropout,
    wide: Linear,
    head: Linear,
    fitted: bool,
}

impl CnnClassifier {
    /// Build an untrained classifier for `(height, width, channels)` inputs.
    pub fn new(config: CnnConfig, input_shape: (usize, usize, usize), device: Device) -> Result<Self> {
        let (height, width, channels) = input_shape;
        let k = config.kernel_size;
        let p = config.pool_size;
        if k == 0 || p == 0 {
            return Err(anyhow!("Kernel and pool sizes must be positive"));
        }
        if k > height || k > width {
            return Err(anyhow!(
                "Kernel size {} does not fit {}x{} inputs",
                k,
                height,
                width
            ));
        }
        let pooled_shape = ((height - k + 1) / p, (width - k + 1) / p);
        if pooled_shape.0 == 0 || pooled_shape.1 == 0 {
            return Err(anyhow!(
                "Pool size {} is larger than the {}x{} convolution output",
                p,
                height - k + 1,
                width - k + 1
            ));
        }
        if !(0.0..1.0).contains(&config.dropout) {
            return Err(anyhow!("Dropout must lie in [0, 1), got {}", config.dropout));
        }

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let conv = conv2d(
            channels,
            config.filters,
            k,
            Conv2dConfig::default(),
            vb.pp("conv"),
        )?;
        let flat = config.filters * pooled_shape.0 * pooled_shape.1;
        let hidden = linear(flat, config.hidden_units, vb.pp("hidden"))?;
        let wide = linear(config.hidden_units, config.wide_units, vb.pp("wide"))?;
        let head = linear(config.wide_units, 1, vb.pp("head"))?;
        let dropout = Dropout::new(config.dropout);

        Ok(Self {
            config,
            input_shape,
            pooled_shape,
            varmap,
            device,
            conv,
            hidden,
            dropout,
            wide,
            head,
            fitted: false,
        })
    }

    pub fn config(&self) -> &CnnConfig {
        &self.config
    }

    pub fn input_shape(&self) -> (usize, usize, usize) {
        self.input_shape
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Total number of trainable scalars.
    pub fn num_parameters(&self) -> usize {
        self.varmap.all_vars().iter().map(|v| v.elem_count()).sum()
    }

    /// Layer table with output shapes and parameter counts.
    pub fn model_summary(&self) -> String {
        let (h, w, c) = self.input_shape;
        let cfg = &self.config;
        let k = cfg.kernel_size;
        let (ph, pw) = self.pooled_shape;
        let flat = cfg.filters * ph * pw;

        let rows: Vec<(&str, String, usize)> = vec![
            (
                "conv2d",
                format!("(None, {}, {}, {})", h - k + 1, w - k + 1, cfg.filters),
                c * cfg.filters * k * k + cfg.filters,
            ),
            (
                "max_pooling2d",
                format!("(None, {}, {}, {})", ph, pw, cfg.filters),
                0,
            ),
            ("flatten", format!("(None, {})", flat), 0),
            (
                "dense",
                format!("(None, {})", cfg.hidden_units),
                flat * cfg.hidden_units + cfg.hidden_units,
            ),
            ("dropout", format!("(None, {})", cfg.hidden_units), 0),
            (
                "dense_1",
                format!("(None, {})", cfg.wide_units),
                cfg.hidden_units * cfg.wide_units + cfg.wide_units,
            ),
            ("dense_2", "(None, 1)".to_string(), cfg.wide_units + 1),
        ];

        let mut out = String::new();
        let _ = writeln!(out, "{:<16} {:<22} {:>12}", "Layer", "Output Shape", "Param #");
        let _ = writeln!(out, "{}", "=".repeat(52));
        for (layer, shape, params) in &rows {
            let _ = writeln!(out, "{:<16} {:<22} {:>12}", layer, shape, params);
        }
        let _ = writeln!(out, "{}", "=".repeat(52));
        let total: usize = rows.iter().map(|(_, _, p)| p).sum();
        let _ = write!(out, "Total params: {}", total);
        out
    }

    fn to_tensor<S>(&self, x: &ArrayBase<S, Ix4>) -> Result<Tensor>
    where
        S: Data<Elem = f32>,
    {
        let (n, h, w, c) = x.dim();
        if (h, w, c) != self.input_shape {
            return Err(DatasetError::Shape {
                expected: self.input_shape,
                found: (h, w, c),
            }
            .into());
        }
        let data: Vec<f32> = x.iter().copied().collect();
        let tensor = Tensor::from_vec(data, (n, h, w, c), &self.device)?
            .permute((0, 3, 1, 2))?
            .contiguous()?;
        Ok(tensor)
    }

    fn targets(&self, labels: &[Label]) -> Result<Tensor> {
        let values: Vec<f32> = labels.iter().map(|l| l.as_f32()).collect();
        Ok(Tensor::from_vec(values, (labels.len(), 1), &self.device)?)
    }

    /// Raw logits of a channels-first batch.
    fn forward_t(&self, x: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let x = self
            .conv
            .forward(x)?
            .relu()?
            .max_pool2d(self.config.pool_size)?
            .flatten_from(1)?;
        let x = self.hidden.forward(&x)?.relu()?;
        let x = self.dropout.forward(&x, train)?;
        let x = self.wide.forward(&x)?.relu()?;
        self.head.forward(&x)
    }

    fn scores<S>(&self, x: &ArrayBase<S, Ix4>) -> Result<Vec<f32>>
    where
        S: Data<Elem = f32>,
    {
        let mut scores = Vec::with_capacity(x.len_of(Axis(0)));
        for chunk in x.axis_chunks_iter(Axis(0), PREDICT_BATCH_SIZE) {
            let input = self.to_tensor(&chunk)?;
            let logits = self.forward_t(&input, false)?;
            let batch: Vec<f32> = candle_nn::ops::sigmoid(&logits)?.flatten_all()?.to_vec1()?;
            scores.extend(batch);
        }
        Ok(scores)
    }
}

/// Mean binary cross-entropy computed from logits as
/// `max(x, 0) - x * t + ln(1 + exp(-|x|))`, which stays finite for
/// saturated outputs.
pub fn bce_with_logits(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let softplus = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    ((logits.relu()? - (logits * targets)?)? + softplus)?.mean_all()
}

impl BinaryClassifier for CnnClassifier {
    fn fit(
        &mut self,
        x: &Array4<f32>,
        y: &[Label],
        options: &TrainOptions,
    ) -> Result<TrainingHistory> {
        let n = x.len_of(Axis(0));
        if n != y.len() {
            return Err(DatasetError::LengthMismatch {
                samples: n,
                labels: y.len(),
            }
            .into());
        }
        if n == 0 {
            return Err(DatasetError::EmptyDataset.into());
        }
        if options.batch_size == 0 {
            return Err(anyhow!("Batch size must be positive"));
        }
        if !(0.0..1.0).contains(&options.validation_fraction) {
            return Err(DatasetError::InvalidFraction(options.validation_fraction).into());
        }

        // Validation data is the tail of the training set, cut before shuffling.
        let split_at = validation_split_at(n, options.validation_fraction);
        if split_at == 0 {
            return Err(anyhow!(
                "Validation fraction {} leaves no training samples out of {}",
                options.validation_fraction,
                n
            ));
        }
        let x_val = x.slice(ndarray::s![split_at.., .., .., ..]);
        let y_val = &y[split_at..];
        let mut train_idx: Vec<usize> = (0..split_at).collect();
        let num_batches = split_at.div_ceil(options.batch_size);

        info!(
            "Training {} model on {} samples ({} batches), validating on {}, for {} epochs",
            self.name(),
            split_at,
            num_batches,
            y_val.len(),
            options.epochs
        );

        let params = ParamsAdamW {
            lr: self.config.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let mut opt = AdamW::new(self.varmap.all_vars(), params)?;
        let mut rng = StdRng::seed_from_u64(options.seed);
        let threshold = options.threshold;
        let mut history = TrainingHistory::default();

        for epoch in 0..options.epochs {
            train_idx.shuffle(&mut rng);
            let mut total_loss = 0.0f32;
            let mut correct = 0usize;

            let description = format!("Epoch {}/{}", epoch + 1, options.epochs);
            for batch_idx in tqdm(train_idx.chunks(options.batch_size)).desc(Some(description)) {
                let input = self.to_tensor(&x.select(Axis(0), batch_idx))?;
                let labels: Vec<Label> = batch_idx.iter().map(|&i| y[i]).collect();
                let targets = self.targets(&labels)?;

                let logits = self.forward_t(&input, true)?;
                let loss = bce_with_logits(&logits, &targets)?;
                opt.backward_step(&loss)
                    .with_context(|| format!("Optimizer step failed in epoch {}", epoch + 1))?;

                total_loss += loss.to_vec0::<f32>()? * batch_idx.len() as f32;
                let batch_scores: Vec<f32> =
                    candle_nn::ops::sigmoid(&logits)?.flatten_all()?.to_vec1()?;
                correct += batch_scores
                    .iter()
                    .zip(&labels)
                    .filter(|&(s, l)| threshold.classify(*s) == *l)
                    .count();
            }

            let train_loss = total_loss / split_at as f32;
            let train_acc = correct as f32 / split_at as f32;
            history.record(epoch, TrainingPhase::Train, train_loss, train_acc);

            if y_val.is_empty() {
                info!(
                    "Epoch {}/{} - loss: {:.4} - accuracy: {:.4}",
                    epoch + 1,
                    options.epochs,
                    train_loss,
                    train_acc
                );
            } else {
                let val_scores = self.scores(&x_val)?;
                let val_loss = Metrics::binary_cross_entropy(&val_scores, y_val);
                let val_acc = Metrics::binary_accuracy(&val_scores, y_val, threshold);
                history.record(epoch, TrainingPhase::Validation, val_loss, val_acc);
                info!(
                    "Epoch {}/{} - loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
                    epoch + 1,
                    options.epochs,
                    train_loss,
                    train_acc,
                    val_loss,
                    val_acc
                );
            }
        }

        self.fitted = true;
        Ok(history)
    }

    fn predict(&self, x: &Array4<f32>) -> Result<Vec<f32>> {
        if !self.fitted {
            return Err(anyhow!("Model has not been trained or loaded"));
        }
        self.scores(x)
    }

    fn evaluate(
        &self,
        x: &Array4<f32>,
        y: &[Label],
        threshold: DecisionThreshold,
    ) -> Result<Evaluation> {
        let n = x.len_of(Axis(0));
        if n != y.len() {
            return Err(DatasetError::LengthMismatch {
                samples: n,
                labels: y.len(),
            }
            .into());
        }
        let scores = self.predict(x)?;
        Ok(Evaluation {
            loss: Metrics::binary_cross_entropy(&scores, y),
            accuracy: Metrics::binary_accuracy(&scores, y, threshold),
        })
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.varmap
            .save(path)
            .with_context(|| format!("Failed to save model weights to {:?}", path))?;
        info!("Model weights saved to {:?}", path);
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.varmap
            .load(path)
            .with_context(|| format!("Failed to load model weights from {:?}", path))?;
        self.fitted = true;
        info!("Model weights loaded from {:?}", path);
        Ok(())
    }

    fn name(&self) -> &str {
        "cnn"
    }
}

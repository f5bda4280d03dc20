use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tumorscan_classifiers::config::{ChannelOrder, CnnConfig, DecodePolicy, ResizeFilter};
use tumorscan_classifiers::data_handling::DecisionThreshold;
use tumorscan_classifiers::io::{ExtensionFilter, LoaderConfig};
use tumorscan_classifiers::models::TrainOptions;

/// Everything a training run needs: where the corpus lives, where outputs
/// go, how images are decoded, and the training hyper-parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PipelineConfig {
    pub version: String,
    pub data_dir: String,
    pub output_dir: String,
    pub accuracy_plot: String,
    pub loss_plot: String,
    pub model_file: String,
    pub report_file: String,
    pub image_width: u32,
    pub image_height: u32,
    pub extension: String,
    pub decode_policy: DecodePolicy,
    pub channel_order: ChannelOrder,
    pub resize_filter: ResizeFilter,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_fraction: f64,
    pub decision_threshold: f32,
    pub device: String,
    pub model: CnnConfig,
    /// Images classified with the freshly trained model at the end of a run.
    pub sample_predictions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            version: clap::crate_version!().to_string(),
            data_dir: String::from("brain_tumor_dataset"),
            output_dir: String::from("."),
            accuracy_plot: String::from("accuracy_plot.html"),
            loss_plot: String::from("loss_plot.html"),
            model_file: String::from("model.safetensors"),
            report_file: String::from("tumorscan_report.html"),
            image_width: 128,
            image_height: 128,
            extension: String::from(".jpg"),
            decode_policy: DecodePolicy::default(),
            channel_order: ChannelOrder::default(),
            resize_filter: ResizeFilter::default(),
            test_fraction: 0.2,
            split_seed: 42,
            epochs: 5,
            batch_size: 128,
            validation_fraction: 0.1,
            decision_threshold: 0.5,
            device: String::from("cpu"),
            model: CnnConfig::default(),
            sample_predictions: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file field by field. Missing or invalid fields
    /// fall back to their defaults with a warning.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let partial: serde_json::Value = serde_json::from_str(&config_json)
            .with_context(|| format!("Config file is not valid JSON: {:?}", config_path))?;
        let mut config = PipelineConfig::default();

        macro_rules! load_or_default {
            ($field:ident) => {
                if let Some(val) = partial.get(stringify!($field)) {
                    if let Ok(parsed) = serde_json::from_value(val.clone()) {
                        config.$field = parsed;
                    } else {
                        log::warn!(
                            "Config Invalid value for '{}', using default: {:?}",
                            stringify!($field),
                            config.$field
                        );
                    }
                } else {
                    log::warn!(
                        "Config Missing field '{}', using default: {:?}",
                        stringify!($field),
                        config.$field
                    );
                }
            };
        }

        load_or_default!(data_dir);
        load_or_default!(output_dir);
        load_or_default!(accuracy_plot);
        load_or_default!(loss_plot);
        load_or_default!(model_file);
        load_or_default!(report_file);
        load_or_default!(image_width);
        load_or_default!(image_height);
        load_or_default!(extension);
        load_or_default!(decode_policy);
        load_or_default!(channel_order);
        load_or_default!(resize_filter);
        load_or_default!(test_fraction);
        load_or_default!(split_seed);
        load_or_default!(epochs);
        load_or_default!(batch_size);
        load_or_default!(validation_fraction);
        load_or_default!(decision_threshold);
        load_or_default!(device);
        load_or_default!(model);
        load_or_default!(sample_predictions);

        Ok(config)
    }

    /// Load `config_path` and apply the `train` subcommand overrides.
    pub fn from_arguments(config_path: &PathBuf, matches: &ArgMatches) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        // Apply CLI overrides
        if let Some(data_dir) = matches.get_one::<String>("data_dir") {
            config.data_dir = data_dir.clone();
        }
        if let Some(output_dir) = matches.get_one::<String>("output_dir") {
            config.output_dir = output_dir.clone();
        }
        if let Some(epochs) = matches.get_one::<usize>("epochs") {
            config.epochs = *epochs;
        }
        if let Some(batch_size) = matches.get_one::<usize>("batch_size") {
            config.batch_size = *batch_size;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            anyhow::bail!(
                "Image size must be positive, got {}x{}",
                self.image_width,
                self.image_height
            );
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            anyhow::bail!("test_fraction must lie in [0, 1), got {}", self.test_fraction);
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            anyhow::bail!(
                "validation_fraction must lie in [0, 1), got {}",
                self.validation_fraction
            );
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            anyhow::bail!(
                "decision_threshold must lie in [0, 1], got {}",
                self.decision_threshold
            );
        }
        if self.extension.is_empty() {
            anyhow::bail!("extension must not be empty");
        }
        Ok(())
    }

    /// Resolve a file name relative to `output_dir`.
    pub fn output_path(&self, file: &str) -> PathBuf {
        Path::new(&self.output_dir).join(file)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            width: self.image_width,
            height: self.image_height,
            filter: ExtensionFilter::new(&self.extension),
            decode_policy: self.decode_policy,
            channel_order: self.channel_order,
            resize_filter: self.resize_filter,
        }
    }

    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            validation_fraction: self.validation_fraction,
            epochs: self.epochs,
            batch_size: self.batch_size,
            seed: self.split_seed,
            threshold: self.threshold(),
        }
    }

    pub fn threshold(&self) -> DecisionThreshold {
        DecisionThreshold(self.decision_threshold)
    }

    /// `(height, width, channels)` of every sample fed to the model.
    pub fn input_shape(&self) -> (usize, usize, usize) {
        (self.image_height as usize, self.image_width as usize, 3)
    }
}

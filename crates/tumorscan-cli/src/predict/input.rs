use anyhow::Result;
use clap::ArgMatches;
use std::path::PathBuf;

use crate::train::input::PipelineConfig;
use crate::util::validate_file_exists;

/// Arguments of the `predict` subcommand. Loader settings and the model
/// architecture come from the same configuration used for training.
#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub pipeline: PipelineConfig,
    pub model_path: PathBuf,
    pub images: Vec<PathBuf>,
    pub output_file: Option<PathBuf>,
}

impl PredictConfig {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let pipeline = match matches.get_one::<PathBuf>("config") {
            Some(config_path) => PipelineConfig::load(config_path)?,
            None => {
                log::warn!("No config file provided, using default loader and model settings");
                PipelineConfig::default()
            }
        };
        pipeline.validate()?;

        let model_path = matches
            .get_one::<PathBuf>("model_path")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("A model file is required (--model)"))?;
        validate_file_exists(&model_path)?;

        let images: Vec<PathBuf> = matches
            .get_many::<PathBuf>("images")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        if images.is_empty() {
            anyhow::bail!("At least one image is required");
        }
        for image in &images {
            validate_file_exists(image)?;
        }

        Ok(Self {
            pipeline,
            model_path,
            images,
            output_file: matches.get_one::<PathBuf>("output_file").cloned(),
        })
    }
}

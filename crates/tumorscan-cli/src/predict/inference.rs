use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ndarray::{stack, ArrayView3, Axis};
use serde::Serialize;

use tumorscan_classifiers::data_handling::{DecisionThreshold, Label};
use tumorscan_classifiers::io::{load_image, LoaderConfig};
use tumorscan_classifiers::models::utils::get_device;
use tumorscan_classifiers::models::{BinaryClassifier, CnnClassifier};
use tumorscan_classifiers::preprocessing::normalize_batch;

use crate::predict::input::PredictConfig;
use crate::predict::output::write_predictions;

/// Verdict for a single image file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePrediction {
    pub path: PathBuf,
    pub score: f32,
    pub label: Label,
}

impl ImagePrediction {
    pub fn verdict(&self) -> &'static str {
        match self.label {
            Label::Tumor => "Tumor Detected",
            Label::NoTumor => "No Tumor",
        }
    }
}

/// Decode, normalize and classify a list of image files with a fitted model.
///
/// Images go through the same loader settings and per-sample normalization
/// as the training corpus.
pub fn predict_images<M, P>(
    model: &M,
    paths: &[P],
    loader: &LoaderConfig,
    threshold: DecisionThreshold,
) -> Result<Vec<ImagePrediction>>
where
    M: BinaryClassifier + ?Sized,
    P: AsRef<Path>,
{
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let samples = paths
        .iter()
        .map(|p| load_image(p, loader))
        .collect::<Result<Vec<_>>>()?;
    let views: Vec<ArrayView3<u8>> = samples.iter().map(|s| s.pixels()).collect();
    let batch = stack(Axis(0), &views)?;
    let x = normalize_batch(&batch);

    let scores = model.predict(&x)?;
    let predictions: Vec<ImagePrediction> = paths
        .iter()
        .zip(scores)
        .map(|(path, score)| ImagePrediction {
            path: path.as_ref().to_path_buf(),
            score,
            label: threshold.classify(score),
        })
        .collect();

    for p in &predictions {
        log::info!("{:?}: {} (score {:.4})", p.path, p.verdict(), p.score);
    }
    Ok(predictions)
}

/// Load saved weights and classify every requested image.
pub fn run_prediction(config: &PredictConfig) -> Result<Vec<ImagePrediction>> {
    let pipeline = &config.pipeline;
    let device = get_device(&pipeline.device)?;
    let mut model = CnnClassifier::new(pipeline.model.clone(), pipeline.input_shape(), device)?;
    model
        .load(&config.model_path)
        .with_context(|| format!("Failed to load model: {:?}", config.model_path))?;

    let start_time = Instant::now();
    let predictions = predict_images(
        &model,
        &config.images,
        &pipeline.loader_config(),
        pipeline.threshold(),
    )?;
    log::info!(
        "Classified {} images in {:?}",
        predictions.len(),
        start_time.elapsed()
    );

    for p in &predictions {
        println!("{}\t{}\t{:.4}", p.path.display(), p.verdict(), p.score);
    }

    if let Some(output_file) = &config.output_file {
        write_predictions(&predictions, output_file)?;
        log::info!("Predictions saved to: {:?}", output_file);
    }

    Ok(predictions)
}

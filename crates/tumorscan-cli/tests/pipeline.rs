//! End-to-end runs of the training and prediction pipeline on a tiny
//! synthetic corpus.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tumorscan_classifiers::config::CnnConfig;
use tumorscan_classifiers::stats::{HistoryMetric, TrainingPhase};
use tumorscan_cli::predict::inference::run_prediction;
use tumorscan_cli::predict::input::PredictConfig;
use tumorscan_cli::train::input::PipelineConfig;
use tumorscan_cli::train::trainer::{run_training, CONFIG_DUMP_FILE};

fn make_corpus(root: &Path, n_no: usize, n_yes: usize) {
    for (class, count, shade) in [("no", n_no, 30u8), ("yes", n_yes, 210u8)] {
        let class_dir = root.join(class);
        fs::create_dir_all(&class_dir).unwrap();
        for i in 0..count {
            RgbImage::from_fn(24, 24, |x, y| Rgb([shade, (x * 8) as u8, (y * 8) as u8]))
                .save(class_dir.join(format!("scan_{}.jpg", i)))
                .unwrap();
        }
        // Not part of the corpus
        RgbImage::new(4, 4).save(class_dir.join("ignored.png")).unwrap();
    }
}

fn tiny_config(data_dir: &Path, output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: data_dir.to_string_lossy().into_owned(),
        output_dir: output_dir.to_string_lossy().into_owned(),
        image_width: 16,
        image_height: 16,
        epochs: 2,
        batch_size: 2,
        model: CnnConfig::new(2, 3, 2, 8, 0.5, 8, 1e-3),
        ..PipelineConfig::default()
    }
}

#[test]
fn training_run_writes_all_outputs() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    make_corpus(data.path(), 3, 2);

    let mut config = tiny_config(data.path(), out.path());
    let sample = data.path().join("yes").join("scan_0.jpg");
    config.sample_predictions = vec![sample.to_string_lossy().into_owned()];

    let outcome = run_training(&config).unwrap();
    assert_eq!(outcome.train_size, 4);
    assert_eq!(outcome.test_size, 1);
    assert_eq!(outcome.report.support(), 1);
    assert!((0.0..=1.0).contains(&outcome.evaluation.accuracy));
    assert_eq!(
        outcome
            .history
            .series(TrainingPhase::Train, HistoryMetric::Accuracy)
            .len(),
        2
    );

    assert_eq!(outcome.sample_predictions.len(), 1);
    let p = &outcome.sample_predictions[0];
    assert!((0.0..=1.0).contains(&p.score));
    assert!(p.verdict() == "Tumor Detected" || p.verdict() == "No Tumor");

    for file in [
        "model.safetensors",
        "accuracy_plot.html",
        "loss_plot.html",
        "tumorscan_report.html",
        CONFIG_DUMP_FILE,
    ] {
        assert!(out.path().join(file).exists(), "missing output {}", file);
    }
    assert_eq!(outcome.model_path, out.path().join("model.safetensors"));

    let report = fs::read_to_string(out.path().join("tumorscan_report.html")).unwrap();
    assert!(report.contains("Classification Report"));
    assert!(report.contains("weighted avg"));

    let dumped = PipelineConfig::load(&out.path().join(CONFIG_DUMP_FILE)).unwrap();
    assert_eq!(dumped, config);
}

#[test]
fn saved_model_classifies_new_images() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    make_corpus(data.path(), 3, 3);

    let config = tiny_config(data.path(), out.path());
    let outcome = run_training(&config).unwrap();

    let images: Vec<PathBuf> = vec![
        data.path().join("no").join("scan_1.jpg"),
        data.path().join("yes").join("scan_2.jpg"),
    ];
    let output_file = out.path().join("predictions.tsv");
    let request = PredictConfig {
        pipeline: config,
        model_path: outcome.model_path,
        images: images.clone(),
        output_file: Some(output_file.clone()),
    };

    let predictions = run_prediction(&request).unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0].path, images[0]);

    let written = fs::read_to_string(&output_file).unwrap();
    assert_eq!(written.lines().count(), 3);
    assert!(written.starts_with("path\tscore\tlabel"));
}

#[test]
fn empty_test_split_is_an_error() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    make_corpus(data.path(), 2, 1);

    let mut config = tiny_config(data.path(), out.path());
    config.test_fraction = 0.1;
    let err = run_training(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("Test set is empty"));
}

#[test]
fn logged_accuracy_matches_report_for_custom_threshold() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    make_corpus(data.path(), 5, 5);

    let mut config = tiny_config(data.path(), out.path());
    config.decision_threshold = 1.0;
    let outcome = run_training(&config).unwrap();
    assert_eq!(outcome.test_size, 2);
    assert!((outcome.evaluation.accuracy - outcome.report.accuracy).abs() < 1e-6);
}

#[test]
fn corpus_without_matching_files_is_an_error() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    make_corpus(data.path(), 0, 0);

    let config = tiny_config(data.path(), out.path());
    assert!(run_training(&config).is_err());
}

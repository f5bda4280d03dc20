use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use maud::{html, PreEscaped};
use tumorscan_classifiers::data_handling::Dataset;
use tumorscan_classifiers::io::load_corpus;
use tumorscan_classifiers::models::utils::get_device;
use tumorscan_classifiers::models::{BinaryClassifier, CnnClassifier, Evaluation};
use tumorscan_classifiers::preprocessing::{normalize_batch, NORMALIZATION_AXIS};
use tumorscan_classifiers::report::{plot_accuracy, plot_loss, ClassificationReport};
use tumorscan_classifiers::stats::TrainingHistory;

use crate::predict::inference::{predict_images, ImagePrediction};
use crate::report::{Report, ReportSection};
use crate::util::{write_bytes_to_file, write_plot_html};
use input::PipelineConfig;

use super::input;

/// File name of the resolved configuration written next to the other outputs.
pub const CONFIG_DUMP_FILE: &str = "tumorscan_config.json";

/// Results of a completed training run.
#[derive(Debug)]
pub struct TrainingOutcome {
    pub train_size: usize,
    pub test_size: usize,
    pub history: TrainingHistory,
    pub evaluation: Evaluation,
    pub report: ClassificationReport,
    pub sample_predictions: Vec<ImagePrediction>,
    pub model_path: PathBuf,
}

pub fn run_training(config: &PipelineConfig) -> Result<TrainingOutcome> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory: {}", config.output_dir))?;

    // Load and assemble the corpus
    let loader = config.loader_config();
    let corpus = load_corpus(&config.data_dir, &loader)
        .with_context(|| format!("Failed to load image corpus from {}", config.data_dir))?;
    let dataset = Dataset::assemble(corpus.pairs)?;
    let [n_no, n_yes] = dataset.class_counts();
    log::info!(
        "Loaded {} images ({} no tumor, {} tumor)",
        dataset.len(),
        n_no,
        n_yes
    );

    let split = dataset.split(config.test_fraction, config.split_seed)?;
    if split.y_train.is_empty() {
        anyhow::bail!("Training set is empty after the split; add images or lower test_fraction");
    }
    if split.y_test.is_empty() {
        anyhow::bail!(
            "Test set is empty after the split of {} images; add images or raise test_fraction",
            dataset.len()
        );
    }

    // Train and test batches are normalized independently, sample by sample.
    let x_train = normalize_batch(&split.x_train);
    let x_test = normalize_batch(&split.x_test);
    log::info!(
        "Normalized {} training and {} test samples along axis {}",
        split.y_train.len(),
        split.y_test.len(),
        NORMALIZATION_AXIS.index()
    );

    let device = get_device(&config.device)?;
    log::trace!("Building model on device: {:?}", device);
    let mut model = CnnClassifier::new(config.model.clone(), dataset.sample_shape(), device)?;
    log::info!("Model summary:\n{}", model.model_summary());

    let start_time = std::time::Instant::now();
    log::info!("Training started");
    let history = model
        .fit(&x_train, &split.y_train, &config.train_options())
        .with_context(|| "Training failed: an error occurred during the model training process")?;
    log::info!("Training completed in {:?}", start_time.elapsed());

    let accuracy_plot = plot_accuracy(&history);
    let loss_plot = plot_loss(&history);
    write_plot_html(&accuracy_plot, config.output_path(&config.accuracy_plot))?;
    write_plot_html(&loss_plot, config.output_path(&config.loss_plot))?;

    let threshold = config.threshold();
    let evaluation = model.evaluate(&x_test, &split.y_test, threshold)?;
    log::info!("Accuracy: {:.2}%", evaluation.accuracy * 100.0);

    let scores = model.predict(&x_test)?;
    let y_pred = threshold.classify_all(&scores);
    let report = ClassificationReport::new(&split.y_test, &y_pred);
    log::info!("Classification report:\n{}", report);

    let model_path = config.output_path(&config.model_file);
    model.save(&model_path)?;

    let sample_predictions =
        predict_images(&model, &config.sample_predictions, &loader, threshold)
            .context("Failed to classify sample images")?;

    // Generate report
    let mut html_report = Report::new("TumorScan", &config.version, "TumorScan Training Report");

    /* Section 1: Overview */
    {
        let mut overview_section = ReportSection::new("Overview");
        overview_section.add_content(html! {
            p {
                "Trained on " (split.y_train.len()) " images and evaluated on "
                (split.y_test.len()) " held-out images (" (n_no) " no tumor, "
                (n_yes) " tumor in total)."
            }
            table {
                tr { th { "Metric" } th { "Value" } }
                tr { td { "Test loss" } td { (format!("{:.4}", evaluation.loss)) } }
                tr { td { "Test accuracy" } td { (format!("{:.2}%", evaluation.accuracy * 100.0)) } }
                tr { td { "Epochs" } td { (history.num_epochs()) } }
            }
        });
        overview_section.add_plot(accuracy_plot);
        overview_section.add_plot(loss_plot);
        html_report.add_section(overview_section);
    }

    /* Section 2: Classification report */
    {
        let mut report_section = ReportSection::new("Classification Report");
        report_section.add_content(html! {
            table {
                tr {
                    th { "" } th { "precision" } th { "recall" } th { "f1-score" } th { "support" }
                }
                @for (label, m) in &report.classes {
                    tr {
                        td { (label.description()) }
                        td { (format!("{:.2}", m.precision)) }
                        td { (format!("{:.2}", m.recall)) }
                        td { (format!("{:.2}", m.f1)) }
                        td { (m.support) }
                    }
                }
                tr {
                    td { "accuracy" } td { "" } td { "" }
                    td { (format!("{:.2}", report.accuracy)) }
                    td { (report.support()) }
                }
                @for (name, m) in [("macro avg", &report.macro_avg), ("weighted avg", &report.weighted_avg)] {
                    tr {
                        td { (name) }
                        td { (format!("{:.2}", m.precision)) }
                        td { (format!("{:.2}", m.recall)) }
                        td { (format!("{:.2}", m.f1)) }
                        td { (m.support) }
                    }
                }
            }
        });
        if !sample_predictions.is_empty() {
            report_section.add_content(html! {
                h3 { "Sample predictions" }
                table {
                    tr { th { "Image" } th { "Score" } th { "Verdict" } }
                    @for p in &sample_predictions {
                        tr {
                            td { (p.path.display().to_string()) }
                            td { (format!("{:.4}", p.score)) }
                            td { (p.verdict()) }
                        }
                    }
                }
            });
        }
        html_report.add_section(report_section);
    }

    /* Section 3: Configuration */
    {
        let mut config_section = ReportSection::new("Configuration");
        config_section.add_content(html! {
            style {
                ".code-container {
                    background-color: #f5f5f5;
                    padding: 10px;
                    border-radius: 5px;
                    overflow-x: auto;
                    font-family: monospace;
                    white-space: pre-wrap;
                }"
            }
            div class="code-container" {
                pre {
                    code { (PreEscaped(serde_json::to_string_pretty(&config)?)) }
                }
            }
        });
        html_report.add_section(config_section);
    }

    html_report.save_to_file(config.output_path(&config.report_file))?;

    // Save configuration to JSON file
    let bytes = serde_json::to_vec_pretty(&config)?;
    write_bytes_to_file(config.output_path(CONFIG_DUMP_FILE), &bytes)?;

    Ok(TrainingOutcome {
        train_size: split.y_train.len(),
        test_size: split.y_test.len(),
        history,
        evaluation,
        report,
        sample_predictions,
        model_path,
    })
}

//! Reporting helpers: training curves and the classification report.
pub mod classification;
pub mod plots;

pub use classification::{ClassMetrics, ClassificationReport};
pub use plots::{plot_accuracy, plot_loss};

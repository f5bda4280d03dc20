use plotly::common::{Anchor, Mode};
use plotly::layout::{Axis, Layout, Legend};
use plotly::{Plot, Scatter};

use crate::stats::{HistoryMetric, TrainingHistory, TrainingPhase};

fn history_trace(
    history: &TrainingHistory,
    phase: TrainingPhase,
    metric: HistoryMetric,
    name: &str,
) -> Option<Box<Scatter<f64, f64>>> {
    let series = history.series(phase, metric);
    if series.is_empty() {
        return None;
    }
    let (x, y): (Vec<f64>, Vec<f64>) = series
        .iter()
        .map(|(epoch, value)| (*epoch as f64, *value as f64))
        .unzip();
    Some(Scatter::new(x, y).mode(Mode::LinesMarkers).name(name))
}

/// Plot training and validation accuracy per epoch on a `[0, 1]` axis.
pub fn plot_accuracy(history: &TrainingHistory) -> Plot {
    let mut plot = Plot::new();
    for (phase, name) in [
        (TrainingPhase::Train, "accuracy"),
        (TrainingPhase::Validation, "val_accuracy"),
    ] {
        if let Some(trace) = history_trace(history, phase, HistoryMetric::Accuracy, name) {
            plot.add_trace(trace);
        }
    }

    plot.set_layout(
        Layout::new()
            .title("Accuracy")
            .x_axis(Axis::new().title("Epoch"))
            .y_axis(Axis::new().title("Accuracy").range(vec![0.0, 1.0]))
            .legend(
                Legend::new()
                    .x(1.0)
                    .y(0.0)
                    .x_anchor(Anchor::Right)
                    .y_anchor(Anchor::Bottom),
            ),
    );

    plot
}

/// Plot training and validation loss per epoch.
pub fn plot_loss(history: &TrainingHistory) -> Plot {
    let mut plot = Plot::new();
    for (phase, name) in [
        (TrainingPhase::Train, "loss"),
        (TrainingPhase::Validation, "val_loss"),
    ] {
        if let Some(trace) = history_trace(history, phase, HistoryMetric::Loss, name) {
            plot.add_trace(trace);
        }
    }

    plot.set_layout(
        Layout::new()
            .title("Loss")
            .x_axis(Axis::new().title("Epoch"))
            .y_axis(Axis::new().title("Loss"))
            .legend(
                Legend::new()
                    .x(1.0)
                    .y(1.0)
                    .x_anchor(Anchor::Right)
                    .y_anchor(Anchor::Top),
            ),
    );

    plot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> TrainingHistory {
        let mut h = TrainingHistory::default();
        h.record(0, TrainingPhase::Train, 0.69, 0.55);
        h.record(0, TrainingPhase::Validation, 0.70, 0.50);
        h.record(1, TrainingPhase::Train, 0.52, 0.71);
        h.record(1, TrainingPhase::Validation, 0.61, 0.64);
        h
    }

    #[test]
    fn accuracy_plot_has_both_curves() {
        let html = plot_accuracy(&history()).to_html();
        assert!(html.contains("val_accuracy"));
        assert!(html.contains("\"accuracy\""));
    }

    #[test]
    fn loss_plot_skips_missing_validation() {
        let mut h = TrainingHistory::default();
        h.record(0, TrainingPhase::Train, 0.69, 0.55);
        let html = plot_loss(&h).to_html();
        assert!(html.contains("\"loss\""));
        assert!(!html.contains("val_loss"));
    }
}

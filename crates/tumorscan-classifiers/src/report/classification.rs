use std::fmt;

use serde::Serialize;

use crate::data_handling::Label;

/// Precision, recall, F1 and support of one class (or one average row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

/// Per-class metrics of a binary prediction, with accuracy and macro /
/// support-weighted averages. Undefined ratios (zero denominators) are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<(Label, ClassMetrics)>,
    pub accuracy: f32,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

impl ClassificationReport {
    /// Build the report from true and predicted labels.
    ///
    /// # Panics
    ///
    /// Panics if `y_true` and `y_pred` have different lengths.
    pub fn new(y_true: &[Label], y_pred: &[Label]) -> Self {
        assert_eq!(
            y_true.len(),
            y_pred.len(),
            "True and predicted labels must have the same length"
        );

        let total = y_true.len();
        let classes: Vec<(Label, ClassMetrics)> = Label::ALL
            .iter()
            .map(|&class| {
                let mut tp = 0;
                let mut fp = 0;
                let mut fn_ = 0;
                for (&t, &p) in y_true.iter().zip(y_pred) {
                    match (t == class, p == class) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                (
                    class,
                    ClassMetrics {
                        precision,
                        recall,
                        f1,
                        support: tp + fn_,
                    },
                )
            })
            .collect();

        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
        let accuracy = ratio(correct, total);

        let n_classes = classes.len() as f32;
        let macro_avg = ClassMetrics {
            precision: classes.iter().map(|(_, m)| m.precision).sum::<f32>() / n_classes,
            recall: classes.iter().map(|(_, m)| m.recall).sum::<f32>() / n_classes,
            f1: classes.iter().map(|(_, m)| m.f1).sum::<f32>() / n_classes,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f32| -> f32 {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|(_, m)| f(m) * m.support as f32)
                .sum::<f32>()
                / total as f32
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn class(&self, label: Label) -> Option<&ClassMetrics> {
        self.classes
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, m)| m)
    }

    pub fn support(&self) -> usize {
        self.macro_avg.support
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, m.precision, m.recall, m.f1, m.support
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, metrics) in &self.classes {
            write_row(f, &label.to_string(), metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Label::{NoTumor as N, Tumor as T};

    #[test]
    fn report_matches_hand_computed_values() {
        let y_true = [T, T, T, N, N];
        let y_pred = [T, T, N, N, T];
        let report = ClassificationReport::new(&y_true, &y_pred);

        let tumor = report.class(T).unwrap();
        assert!((tumor.precision - 2.0 / 3.0).abs() < 1e-6);
        assert!((tumor.recall - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(tumor.support, 3);

        let no = report.class(N).unwrap();
        assert!((no.precision - 0.5).abs() < 1e-6);
        assert!((no.recall - 0.5).abs() < 1e-6);
        assert_eq!(no.support, 2);

        assert!((report.accuracy - 0.6).abs() < 1e-6);
        assert!((report.macro_avg.f1 - (2.0 / 3.0 + 0.5) / 2.0).abs() < 1e-6);
        let weighted_f1 = (2.0 / 3.0 * 3.0 + 0.5 * 2.0) / 5.0;
        assert!((report.weighted_avg.f1 - weighted_f1).abs() < 1e-6);
    }

    #[test]
    fn missing_predictions_give_zero_precision() {
        let report = ClassificationReport::new(&[T, N], &[N, N]);
        let tumor = report.class(T).unwrap();
        assert_eq!(tumor.precision, 0.0);
        assert_eq!(tumor.recall, 0.0);
        assert_eq!(tumor.f1, 0.0);
    }

    #[test]
    fn display_has_all_rows() {
        let report = ClassificationReport::new(&[T, N, T], &[T, N, N]);
        let text = report.to_string();
        for needle in ["precision", "recall", "f1-score", "support", "accuracy", "macro avg", "weighted avg"] {
            assert!(text.contains(needle), "missing '{}' in\n{}", needle, text);
        }
    }
}

pub mod classifier_trait;
pub mod cnn;
pub mod utils;

pub use classifier_trait::{validation_split_at, BinaryClassifier, Evaluation, TrainOptions};
pub use cnn::CnnClassifier;

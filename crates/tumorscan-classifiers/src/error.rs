use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Failures raised while building a dataset from an image corpus.
#[derive(Debug)]
pub enum DatasetError {
    /// The corpus root or one of its class directories does not exist.
    MissingDirectory(PathBuf),
    /// No file under the corpus root passed the extension filter.
    EmptyCorpus(PathBuf),
    /// The assembler (or splitter) was handed zero samples.
    EmptyDataset,
    /// An image file could not be decoded.
    Decode { path: PathBuf, message: String },
    /// A sample does not have the expected `(height, width, channels)` shape.
    Shape {
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },
    /// Samples and labels are not the same length.
    LengthMismatch { samples: usize, labels: usize },
    /// A fraction parameter outside of `[0, 1)`.
    InvalidFraction(f64),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DatasetError::MissingDirectory(path) => {
                write!(f, "Directory does not exist: {}", path.display())
            }
            DatasetError::EmptyCorpus(path) => write!(
                f,
                "No usable image files found under {}",
                path.display()
            ),
            DatasetError::EmptyDataset => write!(f, "Dataset contains no samples"),
            DatasetError::Decode { path, message } => {
                write!(f, "Failed to decode image {}: {}", path.display(), message)
            }
            DatasetError::Shape { expected, found } => write!(
                f,
                "Sample shape {:?} does not match expected shape {:?}",
                found, expected
            ),
            DatasetError::LengthMismatch { samples, labels } => write!(
                f,
                "Samples and labels must have equal length ({} samples, {} labels)",
                samples, labels
            ),
            DatasetError::InvalidFraction(value) => {
                write!(f, "Fraction must lie in [0, 1), got {}", value)
            }
        }
    }
}

impl Error for DatasetError {}

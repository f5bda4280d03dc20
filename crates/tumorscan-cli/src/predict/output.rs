use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::predict::inference::ImagePrediction;
use crate::util::ensure_parent_dir;

/// Write predictions to a CSV or TSV file based on file extension.
pub fn write_predictions<P: AsRef<Path>>(predictions: &[ImagePrediction], output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("csv");
    let delimiter = match extension {
        "tsv" => '\t',
        _ => ',',
    };

    ensure_parent_dir(path)?;
    let file =
        File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(BufWriter::new(file));

    writer.write_record(["path", "score", "label"])?;
    for p in predictions {
        writer.write_record(&[
            p.path.display().to_string(),
            format!("{:.6}", p.score),
            p.label.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tumorscan_classifiers::data_handling::Label;

    fn predictions() -> Vec<ImagePrediction> {
        vec![
            ImagePrediction {
                path: PathBuf::from("scans/a.jpg"),
                score: 0.73,
                label: Label::Tumor,
            },
            ImagePrediction {
                path: PathBuf::from("scans/b.jpg"),
                score: 0.42,
                label: Label::NoTumor,
            },
        ]
    }

    #[test]
    fn tsv_extension_uses_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        write_predictions(&predictions(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("path\tscore\tlabel"));
        assert_eq!(lines.next(), Some("scans/a.jpg\t0.730000\t1"));
        assert_eq!(lines.next(), Some("scans/b.jpg\t0.420000\t0"));
    }

    #[test]
    fn other_extensions_use_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        write_predictions(&predictions(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("path,score,label\n"));
    }
}

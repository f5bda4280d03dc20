//! Integration tests for reading labeled image corpora from disk.

use std::fs;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use tumorscan_classifiers::config::{ChannelOrder, DecodePolicy, ResizeFilter};
use tumorscan_classifiers::data_handling::Label;
use tumorscan_classifiers::error::DatasetError;
use tumorscan_classifiers::io::{list_class_files, load_corpus, load_image, ExtensionFilter, LoaderConfig};

fn write_image(path: &Path, color: [u8; 3]) {
    RgbImage::from_pixel(16, 16, Rgb(color)).save(path).unwrap();
}

fn make_corpus(root: &Path, no: &[&str], yes: &[&str]) {
    for (dir, names, color) in [("no", no, [20, 20, 20]), ("yes", yes, [220, 220, 220])] {
        let class_dir = root.join(dir);
        fs::create_dir_all(&class_dir).unwrap();
        for name in names {
            write_image(&class_dir.join(name), color);
        }
    }
}

// ---------------------------------------------------------------------------
// Extension filter
// ---------------------------------------------------------------------------

#[test]
fn only_jpg_files_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["a.jpg", "b.png", "c.jpeg"], &["d.jpg"]);

    let corpus = load_corpus(dir.path(), &LoaderConfig::default()).unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.skipped_extension, 2);
    assert_eq!(corpus.failed_decode, 0);

    let listing = list_class_files(dir.path(), Label::NoTumor, &ExtensionFilter::default()).unwrap();
    assert_eq!(listing.files.len(), 1);
    assert!(listing.files[0].ends_with("a.jpg"));
    assert_eq!(listing.skipped, 2);
}

#[test]
fn subdirectories_are_not_samples() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["a.jpg"], &["b.jpg"]);
    fs::create_dir(dir.path().join("yes").join("nested.jpg")).unwrap();

    let corpus = load_corpus(dir.path(), &LoaderConfig::default()).unwrap();
    assert_eq!(corpus.len(), 2);
}

// ---------------------------------------------------------------------------
// Labels and shapes
// ---------------------------------------------------------------------------

#[test]
fn labels_follow_source_directory() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["n2.jpg", "n1.jpg", "n3.jpg"], &["y1.jpg", "y2.jpg"]);

    let corpus = load_corpus(dir.path(), &LoaderConfig::default()).unwrap();
    let labels: Vec<Label> = corpus.pairs.iter().map(|(_, l)| *l).collect();
    assert_eq!(
        labels,
        vec![
            Label::NoTumor,
            Label::NoTumor,
            Label::NoTumor,
            Label::Tumor,
            Label::Tumor
        ]
    );
    for (sample, _) in &corpus.pairs {
        assert_eq!(sample.shape(), (128, 128, 3));
    }
}

#[test]
fn custom_resolution_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["a.jpg"], &["b.jpg"]);

    let config = LoaderConfig {
        width: 32,
        height: 24,
        ..LoaderConfig::default()
    };
    let corpus = load_corpus(dir.path(), &config).unwrap();
    assert_eq!(corpus.pairs[0].0.shape(), (24, 32, 3));
}

#[test]
fn bgr_order_swaps_red_and_blue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("red.png");
    write_image(&path, [255, 0, 0]);

    let mut config = LoaderConfig {
        width: 4,
        height: 4,
        resize_filter: ResizeFilter::Nearest,
        ..LoaderConfig::default()
    };

    config.channel_order = ChannelOrder::Bgr;
    let bgr = load_image(&path, &config).unwrap();
    assert_eq!(bgr.pixels()[[0, 0, 0]], 0);
    assert_eq!(bgr.pixels()[[0, 0, 2]], 255);

    config.channel_order = ChannelOrder::Rgb;
    let rgb = load_image(&path, &config).unwrap();
    assert_eq!(rgb.pixels()[[0, 0, 0]], 255);
    assert_eq!(rgb.pixels()[[0, 0, 2]], 0);
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn missing_class_directory_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("no")).unwrap();
    write_image(&dir.path().join("no").join("a.jpg"), [0, 0, 0]);

    let err = load_corpus(dir.path(), &LoaderConfig::default()).unwrap_err();
    match err.downcast_ref::<DatasetError>() {
        Some(DatasetError::MissingDirectory(path)) => assert!(path.ends_with("yes")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn missing_root_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_corpus(dir.path().join("absent"), &LoaderConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DatasetError>(),
        Some(DatasetError::MissingDirectory(_))
    ));
}

#[test]
fn corpus_without_jpg_files_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["a.png"], &["b.jpeg"]);

    let err = load_corpus(dir.path(), &LoaderConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DatasetError>(),
        Some(DatasetError::EmptyCorpus(_))
    ));
}

#[test]
fn undecodable_file_fails_by_default() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["a.jpg"], &["b.jpg"]);
    fs::write(dir.path().join("yes").join("broken.jpg"), b"not an image").unwrap();

    let err = load_corpus(dir.path(), &LoaderConfig::default()).unwrap_err();
    match err.downcast_ref::<DatasetError>() {
        Some(DatasetError::Decode { path, .. }) => assert!(path.ends_with("broken.jpg")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn png_content_with_jpg_name_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["a.jpg"], &[]);
    let disguised = dir.path().join("yes").join("scan.jpg");
    RgbImage::from_pixel(16, 16, Rgb([200, 10, 60]))
        .save_with_format(&disguised, ImageFormat::Png)
        .unwrap();

    let config = LoaderConfig {
        width: 8,
        height: 8,
        channel_order: ChannelOrder::Rgb,
        resize_filter: ResizeFilter::Nearest,
        ..LoaderConfig::default()
    };
    let sample = load_image(&disguised, &config).unwrap();
    assert_eq!(sample.shape(), (8, 8, 3));
    let px = sample.pixels();
    assert_eq!((px[[0, 0, 0]], px[[0, 0, 1]], px[[0, 0, 2]]), (200, 10, 60));

    let corpus = load_corpus(dir.path(), &LoaderConfig::default()).unwrap();
    assert_eq!(corpus.len(), 2);
}

#[test]
fn undecodable_file_is_counted_under_skip_policy() {
    let dir = tempfile::tempdir().unwrap();
    make_corpus(dir.path(), &["a.jpg"], &["b.jpg"]);
    fs::write(dir.path().join("yes").join("broken.jpg"), b"not an image").unwrap();

    let config = LoaderConfig {
        decode_policy: DecodePolicy::Skip,
        ..LoaderConfig::default()
    };
    let corpus = load_corpus(dir.path(), &config).unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.failed_decode, 1);
}

//! Image corpus reader.
//!
//! A corpus is a root directory with one subdirectory per class (`no` and
//! `yes`). Every file whose name ends with the configured suffix is decoded,
//! resized to the target resolution and tagged with the label of the
//! directory it came from.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ndarray::Array3;
use tqdm::tqdm;

use crate::config::{ChannelOrder, DecodePolicy, ResizeFilter};
use crate::data_handling::{ImageSample, Label};
use crate::error::DatasetError;

/// File name filter deciding which directory entries are part of the corpus.
///
/// The match is a literal, case-sensitive suffix check on the file name, so
/// with the default `.jpg` suffix `scan.jpeg` and `scan.JPG` are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    suffix: String,
}

impl ExtensionFilter {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        file_name.ends_with(&self.suffix)
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(".jpg")
    }
}

/// Configuration for reading an image corpus.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    pub filter: ExtensionFilter,
    pub decode_policy: DecodePolicy,
    pub channel_order: ChannelOrder,
    pub resize_filter: ResizeFilter,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            filter: ExtensionFilter::default(),
            decode_policy: DecodePolicy::default(),
            channel_order: ChannelOrder::default(),
            resize_filter: ResizeFilter::default(),
        }
    }
}

/// Accepted files of one class directory plus the number of entries the
/// extension filter rejected.
#[derive(Debug, Clone)]
pub struct ClassListing {
    pub label: Label,
    pub files: Vec<PathBuf>,
    pub skipped: usize,
}

/// Loader output: `(sample, label)` pairs in emission order.
#[derive(Debug)]
pub struct LoadedCorpus {
    pub pairs: Vec<(ImageSample, Label)>,
    /// Entries rejected by the extension filter.
    pub skipped_extension: usize,
    /// Files that failed to decode under `DecodePolicy::Skip`.
    pub failed_decode: usize,
}

impl LoadedCorpus {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// List the files of `root/<class_dir>` accepted by `filter`, sorted by name.
pub fn list_class_files<P: AsRef<Path>>(
    root: P,
    label: Label,
    filter: &ExtensionFilter,
) -> Result<ClassListing> {
    let class_dir = root.as_ref().join(label.class_dir());
    if !class_dir.is_dir() {
        return Err(DatasetError::MissingDirectory(class_dir).into());
    }

    let mut files = Vec::new();
    let mut skipped = 0;
    let entries = std::fs::read_dir(&class_dir)
        .with_context(|| format!("Failed to read directory: {:?}", class_dir))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {:?}", class_dir))?;
        let name = entry.file_name();
        let path = entry.path();
        if filter.accepts(&name.to_string_lossy()) && path.is_file() {
            files.push(path);
        } else {
            log::debug!("Skipping {:?}: does not match '{}'", path, filter.suffix());
            skipped += 1;
        }
    }

    files.sort();
    Ok(ClassListing {
        label,
        files,
        skipped,
    })
}

/// Decode one image file and bring it to the configured resolution and
/// channel order.
///
/// The format is sniffed from the file content; the extension is only a
/// fallback when the content is not recognized.
pub fn load_image<P: AsRef<Path>>(path: P, config: &LoaderConfig) -> Result<ImageSample> {
    let path = path.as_ref();
    let decode_error = |message: String| DatasetError::Decode {
        path: path.to_path_buf(),
        message,
    };
    let decoded = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_error(e.to_string()))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))?;

    let mut rgb = image::imageops::resize(
        &decoded.to_rgb8(),
        config.width,
        config.height,
        config.resize_filter.filter_type(),
    );

    if config.channel_order == ChannelOrder::Bgr {
        for pixel in rgb.pixels_mut() {
            pixel.0.swap(0, 2);
        }
    }

    let (width, height) = rgb.dimensions();
    if (width, height) != (config.width, config.height) {
        return Err(DatasetError::Shape {
            expected: (config.height as usize, config.width as usize, 3),
            found: (height as usize, width as usize, 3),
        }
        .into());
    }

    let pixels = Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw())?;
    ImageSample::new(pixels)
}

/// Read every accepted image under `root/no` and `root/yes`.
///
/// Samples from `no` are emitted first, then `yes`, each sorted by file name.
pub fn load_corpus<P: AsRef<Path>>(root: P, config: &LoaderConfig) -> Result<LoadedCorpus> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(DatasetError::MissingDirectory(root.to_path_buf()).into());
    }

    let listings = Label::ALL
        .iter()
        .map(|&label| list_class_files(root, label, &config.filter))
        .collect::<Result<Vec<ClassListing>>>()?;

    for listing in &listings {
        log::info!(
            "The length of {} images is {}",
            listing.label.description(),
            listing.files.len()
        );
        if listing.files.is_empty() {
            log::warn!(
                "No '{}' files found in class directory '{}'",
                config.filter.suffix(),
                listing.label.class_dir()
            );
        }
    }

    let total: usize = listings.iter().map(|l| l.files.len()).sum();
    if total == 0 {
        return Err(DatasetError::EmptyCorpus(root.to_path_buf()).into());
    }

    let mut pairs = Vec::with_capacity(total);
    let mut failed_decode = 0;
    let skipped_extension = listings.iter().map(|l| l.skipped).sum();

    for listing in &listings {
        for path in tqdm(listing.files.iter()).desc(Some(listing.label.description())) {
            match load_image(path, config) {
                Ok(sample) => pairs.push((sample, listing.label)),
                Err(e) if config.decode_policy == DecodePolicy::Skip => {
                    log::warn!("Skipping {:?}: {:#}", path, e);
                    failed_decode += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    if failed_decode > 0 {
        log::warn!(
            "{} of {} image files could not be decoded and were skipped",
            failed_decode,
            total
        );
    }
    if pairs.is_empty() {
        return Err(DatasetError::EmptyCorpus(root.to_path_buf()).into());
    }

    log::debug!(
        "Loaded {} samples ({} entries skipped by extension filter)",
        pairs.len(),
        skipped_extension
    );

    Ok(LoadedCorpus {
        pairs,
        skipped_extension,
        failed_decode,
    })
}

//! IO utilities for loading labeled image corpora from disk.

pub mod image_corpus;

pub use image_corpus::{
    list_class_files, load_corpus, load_image, ClassListing, ExtensionFilter, LoadedCorpus,
    LoaderConfig,
};

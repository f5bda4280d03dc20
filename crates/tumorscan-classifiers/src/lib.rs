//! tumorscan-classifiers: building blocks for binary tumor detection on
//! brain MRI images.
//!
//! The crate reads a two-class image corpus (`no/` and `yes/` directories),
//! assembles it into an ndarray batch, splits it with a seeded shuffle,
//! normalizes samples, and trains a small convolutional network on Candle.
//! Reporting helpers produce a classification report and training curves.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod stats;

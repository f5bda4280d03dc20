use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Hyper-parameters of the convolutional classifier.
///
/// The defaults reproduce the reference architecture: one 3x3 convolution
/// with 32 filters, 2x2 max pooling, then dense layers of 256 and 512 units
/// with dropout in between and a single sigmoid output.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CnnConfig {
    pub filters: usize,
    pub kernel_size: usize,
    pub pool_size: usize,
    pub hidden_units: usize,
    pub dropout: f32,
    pub wide_units: usize,
    pub learning_rate: f64,
}

impl CnnConfig {
    pub fn new(
        filters: usize,
        kernel_size: usize,
        pool_size: usize,
        hidden_units: usize,
        dropout: f32,
        wide_units: usize,
        learning_rate: f64,
    ) -> Self {
        Self {
            filters,
            kernel_size,
            pool_size,
            hidden_units,
            dropout,
            wide_units,
            learning_rate,
        }
    }
}

impl Default for CnnConfig {
    fn default() -> Self {
        Self {
            filters: 32,
            kernel_size: 3,
            pool_size: 2,
            hidden_units: 256,
            dropout: 0.5,
            wide_units: 512,
            learning_rate: 1e-3,
        }
    }
}

/// What the loader does with a file that passed the extension filter but
/// cannot be decoded.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Abort the whole run on the first undecodable file.
    #[default]
    Fail,
    /// Log a warning, skip the file and report the total at the end.
    Skip,
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(DecodePolicy::Fail),
            "skip" => Ok(DecodePolicy::Skip),
            _ => Err(format!("Unknown decode policy: {}. Expected 'fail' or 'skip'", s)),
        }
    }
}

/// Channel layout of decoded pixels.
///
/// `Bgr` mirrors the OpenCV-style reader the corpus was originally prepared
/// with, where channels were never swapped back to RGB. Training and
/// prediction must use the same order.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOrder {
    Rgb,
    #[default]
    Bgr,
}

impl FromStr for ChannelOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rgb" => Ok(ChannelOrder::Rgb),
            "bgr" => Ok(ChannelOrder::Bgr),
            _ => Err(format!("Unknown channel order: {}. Expected 'rgb' or 'bgr'", s)),
        }
    }
}

/// Resampling filter used to bring every image to the target resolution.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
    Lanczos3,
}

impl ResizeFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl FromStr for ResizeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(ResizeFilter::Nearest),
            "bilinear" => Ok(ResizeFilter::Bilinear),
            "bicubic" => Ok(ResizeFilter::Bicubic),
            "lanczos3" => Ok(ResizeFilter::Lanczos3),
            _ => Err(format!(
                "Unknown resize filter: {}. Expected one of nearest, bilinear, bicubic, lanczos3",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnn_config_defaults_match_reference_architecture() {
        let cfg = CnnConfig::default();
        assert_eq!(cfg.filters, 32);
        assert_eq!(cfg.kernel_size, 3);
        assert_eq!(cfg.pool_size, 2);
        assert_eq!(cfg.hidden_units, 256);
        assert_eq!(cfg.wide_units, 512);
        assert!((cfg.dropout - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("SKIP".parse::<DecodePolicy>().unwrap(), DecodePolicy::Skip);
        assert_eq!("Rgb".parse::<ChannelOrder>().unwrap(), ChannelOrder::Rgb);
        assert_eq!(
            "lanczos3".parse::<ResizeFilter>().unwrap(),
            ResizeFilter::Lanczos3
        );
        assert!("median".parse::<ResizeFilter>().is_err());
    }

    #[test]
    fn partial_cnn_config_fills_defaults() {
        let cfg: CnnConfig = serde_json::from_str(r#"{"filters": 4}"#).unwrap();
        assert_eq!(cfg.filters, 4);
        assert_eq!(cfg.hidden_units, 256);
    }
}

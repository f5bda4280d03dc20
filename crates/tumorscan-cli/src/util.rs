use anyhow::{Context, Result};
use plotly::Plot;
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

pub fn write_bytes_to_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write file: {:?}", path))?;
    Ok(())
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    Ok(())
}

/// Write a plot as a standalone HTML page.
pub fn write_plot_html<P: AsRef<Path>>(plot: &Plot, path: P) -> Result<()> {
    let path = path.as_ref();
    write_bytes_to_file(path, plot.to_html().as_bytes())?;
    log::info!("Plot saved to: {:?}", path);
    Ok(())
}

/// Check that `path` exists and names a regular file.
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("Not a regular file: {}", path.display());
    }
    Ok(())
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use shared::config::check::Config;

/// Writes the default configuration into `dir` as `streamcheck.yaml` or
/// `streamcheck.json`.
///
/// # Errors
/// Returns an error if the format is unsupported or if writing the file fails.
pub fn generate_config(format: &str, dir: &Path) -> Result<PathBuf> {
    let config = Config::with_defaults();
    let (file_name, serialized) = match format {
        "yaml" | "yml" => (
            "streamcheck.yaml",
            serde_yml::to_string(&config).context("failed to serialize configuration")?,
        ),
        "json" => (
            "streamcheck.json",
            serde_json::to_string_pretty(&config).context("failed to serialize configuration")?,
        ),
        other => bail!("Unsupported format '{other}'. Use 'yaml' or 'json'."),
    };

    let path = dir.join(file_name);
    fs::write(&path, serialized)
        .with_context(|| format!("failed to write configuration to {}", path.display()))?;

    println!("Configuration file '{}' generated successfully.", path.display());
    Ok(path)
}

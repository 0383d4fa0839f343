pub mod diagnose;
pub mod fit;
pub mod prepare;

use anyhow::{Context, Result};

use herit_core::model::ModelSpec;

/// Read a model specification from a JSON file.
pub fn read_model_config(path: &str) -> Result<ModelSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model config {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid model config {}", path))
}

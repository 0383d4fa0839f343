//! Posterior serialization and deserialization.
//!
//! Uses bincode for fast, compact binary serialization.
//! Format: magic bytes (HRTP) + version (u32) + bincode payload.
//! Optional JSON sidecar for human inspection.

use anyhow::{bail, Context, Result};
use std::path::Path;

use super::posterior::Posterior;

/// Save a posterior to a binary file (.herit.posterior).
pub fn save_posterior(posterior: &Posterior, path: &Path) -> Result<()> {
    let encoded = bincode::serialize(posterior)?;
    std::fs::write(path, &encoded)
        .with_context(|| format!("Failed to write posterior: {}", path.display()))?;
    Ok(())
}

/// Load a posterior from a binary file (.herit.posterior).
pub fn load_posterior(path: &Path) -> Result<Posterior> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read posterior: {}", path.display()))?;
    if data.len() < 4 || data[..4] != Posterior::MAGIC {
        bail!(
            "Invalid posterior file {}: expected magic bytes {:?}",
            path.display(),
            Posterior::MAGIC
        );
    }
    let posterior: Posterior = bincode::deserialize(&data)
        .with_context(|| format!("Corrupt posterior file: {}", path.display()))?;

    if posterior.version > Posterior::VERSION {
        bail!(
            "Posterior file version {} is newer than supported version {}",
            posterior.version,
            Posterior::VERSION
        );
    }

    Ok(posterior)
}

/// Save a JSON sidecar for debugging (.herit.posterior.json).
pub fn save_posterior_json(posterior: &Posterior, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(posterior)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::spec::ModelSpec;
    use herit_data::chains::ChainSet;

    fn posterior() -> Posterior {
        let sol = ChainSet::new(vec![("(Intercept)".into(), vec![0.8, 0.82, 0.79])]).unwrap();
        let vcv = ChainSet::new(vec![
            ("animal".into(), vec![0.01, 0.02, 0.015]),
            ("units".into(), vec![0.03, 0.02, 0.025]),
        ])
        .unwrap();
        Posterior::new(ModelSpec::default(), sol, vcv, Some(-41.2))
            .unwrap()
            .with_data_sizes(3, 5)
    }

    #[test]
    fn test_save_load_roundtrip() {
        let post = posterior();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.herit.posterior");

        save_posterior(&post, &path).unwrap();
        let loaded = load_posterior(&path).unwrap();

        assert_eq!(loaded, post);
        assert_eq!(loaded.additive().unwrap(), &[0.01, 0.02, 0.015]);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.herit.posterior");
        std::fs::write(&path, b"not a posterior").unwrap();
        assert!(load_posterior(&path).is_err());
    }

    #[test]
    fn test_json_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.herit.posterior.json");
        save_posterior_json(&posterior(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"dic\": -41.2"));
        assert!(text.contains("\"gaussian\""));
    }
}

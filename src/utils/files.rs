//! YAML and JSON persistence helpers

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Read a YAML document into `T`
pub fn read_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Write `data` as YAML, creating parent directories
pub fn write_yaml_file<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    ensure_parent(path)?;
    let yaml = serde_yaml::to_string(data)?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Persist a serializable object as pretty JSON
pub fn save_object<T: Serialize>(path: &Path, obj: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(obj)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load an object saved by [`save_object`]
pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).map_err(|e| {
        PipelineError::DataError(format!("Cannot read object {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Cluster id encoded in a model file name, e.g. `model_cluster3.json` -> 3
pub fn get_cluster(model_path: &Path) -> Result<usize> {
    let stem = model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| PipelineError::DataError(format!("Invalid model path {}", model_path.display())))?;

    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    digits.parse().map_err(|_| {
        PipelineError::DataError(format!("No cluster id in model file name {}", model_path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_get_cluster() {
        assert_eq!(get_cluster(&PathBuf::from("/a/b/model_cluster0.json")).unwrap(), 0);
        assert_eq!(get_cluster(&PathBuf::from("model_cluster12.json")).unwrap(), 12);
        assert!(get_cluster(&PathBuf::from("model.json")).is_err());
    }

    #[test]
    fn test_yaml_roundtrip_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("report.yaml");
        let mut data = BTreeMap::new();
        data.insert("model_path".to_string(), "x.json".to_string());

        write_yaml_file(&path, &data).unwrap();
        let back: BTreeMap<String, String> = read_yaml_file(&path).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_load_missing_object() {
        let dir = TempDir::new().unwrap();
        let res: Result<Vec<f64>> = load_object(&dir.path().join("missing.json"));
        assert!(matches!(res, Err(PipelineError::DataError(_))));
    }
}

//! Data ingestion: fetch the raw dataset into the run's raw data directory

use crate::config::DataIngestionConfig;
use crate::entity::DataIngestionArtifact;
use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        info!("Data ingestion started");
        Self { config }
    }

    /// The source as an http(s) URL, if it is one
    fn remote_source(&self) -> Option<Url> {
        Url::parse(&self.config.dataset_source)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
    }

    fn local_source(&self) -> PathBuf {
        let source = PathBuf::from(&self.config.dataset_source);
        if source.is_absolute() {
            source
        } else {
            self.config.root_dir.join(source)
        }
    }

    /// Download `url` into `dest`
    pub fn download_data(&self, url: &Url, dest: &Path) -> Result<()> {
        info!(url = %url, dest = %dest.display(), dataset = %self.config.dataset_name, "Downloading dataset");

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;
        let response = client.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::DownloadError(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response.bytes()?;
        fs::write(dest, &bytes)?;
        debug!(bytes = bytes.len(), "Download completed");
        Ok(())
    }

    /// Copy a local dataset file into `dest`
    pub fn copy_data(&self, source: &Path, dest: &Path) -> Result<()> {
        if !source.is_file() {
            return Err(PipelineError::DataError(format!(
                "Dataset source {} does not exist",
                source.display()
            )));
        }
        info!(source = %source.display(), dest = %dest.display(), "Copying dataset");
        fs::copy(source, dest)?;
        Ok(())
    }

    pub fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        let raw_data_dir = &self.config.raw_data_dir;
        fs::create_dir_all(raw_data_dir)?;
        let train_file_path = raw_data_dir.join(&self.config.dataset_file_name);

        match self.remote_source() {
            Some(url) => self.download_data(&url, &train_file_path)?,
            None => self.copy_data(&self.local_source(), &train_file_path)?,
        }

        if fs::metadata(&train_file_path)?.len() == 0 {
            return Err(PipelineError::DataError(format!(
                "Ingested file {} is empty",
                train_file_path.display()
            )));
        }

        let artifact = DataIngestionArtifact {
            train_file_path,
            is_ingested: true,
            message: "Data ingestion completed successfully".to_string(),
        };
        info!(path = %artifact.train_file_path.display(), "Data ingestion completed");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: &Path, source: &str) -> DataIngestionConfig {
        DataIngestionConfig {
            dataset_name: "concrete".to_string(),
            dataset_source: source.to_string(),
            dataset_file_name: "concrete.csv".to_string(),
            raw_data_dir: root.join("artifact").join("raw_data"),
            root_dir: root.to_path_buf(),
        }
    }

    #[test]
    fn test_copies_relative_local_source() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data").join("source.csv"), "a,b\n1,2\n").unwrap();

        let artifact = DataIngestion::new(config(dir.path(), "data/source.csv"))
            .initiate_data_ingestion()
            .unwrap();
        assert!(artifact.is_ingested);
        assert_eq!(artifact.train_file_path, dir.path().join("artifact").join("raw_data").join("concrete.csv"));
        assert_eq!(fs::read_to_string(&artifact.train_file_path).unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = DataIngestion::new(config(dir.path(), "data/none.csv"))
            .initiate_data_ingestion()
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }

    #[test]
    fn test_empty_source_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.csv"), "").unwrap();
        let err = DataIngestion::new(config(dir.path(), "empty.csv"))
            .initiate_data_ingestion()
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }

    #[test]
    fn test_url_detection() {
        let dir = TempDir::new().unwrap();
        assert!(DataIngestion::new(config(dir.path(), "https://example.com/c.csv")).remote_source().is_some());
        assert!(DataIngestion::new(config(dir.path(), "data/c.csv")).remote_source().is_none());
        assert!(DataIngestion::new(config(dir.path(), "/abs/c.csv")).remote_source().is_none());
    }
}

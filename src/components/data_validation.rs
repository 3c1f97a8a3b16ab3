//! Data validation: the ingested file must exist and match the schema

use crate::config::{DataValidationConfig, DatasetSchema, SchemaDType};
use crate::entity::{DataIngestionArtifact, DataValidationArtifact};
use crate::error::{PipelineError, Result};
use crate::utils::read_csv;
use tracing::{debug, info};

pub struct DataValidation {
    config: DataValidationConfig,
    data_ingestion_artifact: DataIngestionArtifact,
}

impl DataValidation {
    pub fn new(config: DataValidationConfig, data_ingestion_artifact: DataIngestionArtifact) -> Self {
        info!("Data validation started");
        Self {
            config,
            data_ingestion_artifact,
        }
    }

    pub fn is_input_file_exists(&self) -> Result<()> {
        let path = &self.data_ingestion_artifact.train_file_path;
        let exists = path.is_file();
        info!(path = %path.display(), exists, "Checked input file");
        if !exists {
            return Err(PipelineError::ValidationError("Input file not available".to_string()));
        }
        Ok(())
    }

    /// Column count, names (sorted, whitespace-trimmed) and dtypes must all
    /// agree with the schema
    pub fn validate_dataset_schema(&self) -> Result<()> {
        info!(schema = %self.config.schema_file_path.display(), "Reading schema file");
        let schema = DatasetSchema::from_file(&self.config.schema_file_path)?;
        let df = read_csv(&self.data_ingestion_artifact.train_file_path)?;

        if schema.columns.len() != df.width() {
            return Err(PipelineError::ValidationError(format!(
                "No. of columns not matching: schema has {}, data has {}",
                schema.columns.len(),
                df.width()
            )));
        }

        let mut data_columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        data_columns.sort();
        debug!(columns = ?data_columns, "Data columns");

        for (data_col, (schema_col, dtype_name)) in data_columns.iter().zip(schema.columns.iter()) {
            if data_col.trim() != schema_col.trim() {
                return Err(PipelineError::ValidationError(format!(
                    "Schema column {} not same as data column {}",
                    schema_col, data_col
                )));
            }
            let expected = SchemaDType::parse(dtype_name)?;
            let actual = df.column(data_col)?.dtype().clone();
            if !expected.accepts(&actual) {
                return Err(PipelineError::ValidationError(format!(
                    "Schema column {}: {} not same as data column {}: {}",
                    schema_col, dtype_name, data_col, actual
                )));
            }
        }

        info!("Validated columns and types");
        Ok(())
    }

    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        self.is_input_file_exists()?;
        self.validate_dataset_schema()?;

        let artifact = DataValidationArtifact {
            schema_file_path: self.config.schema_file_path.clone(),
            is_validated: true,
            message: "Data Validation Performed Successfully".to_string(),
        };
        info!(?artifact, "Data validation completed");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SCHEMA: &str = "columns:\n  age: int64\n  cement: float64\n  strength: float64\ntarget_column: strength\n";

    fn validation(dir: &Path, csv: &str) -> DataValidation {
        let schema_path = dir.join("schema.yaml");
        fs::write(&schema_path, SCHEMA).unwrap();
        let data_path = dir.join("data.csv");
        fs::write(&data_path, csv).unwrap();
        DataValidation::new(
            DataValidationConfig { schema_file_path: schema_path },
            DataIngestionArtifact {
                train_file_path: data_path,
                is_ingested: true,
                message: String::new(),
            },
        )
    }

    #[test]
    fn test_valid_dataset() {
        let dir = TempDir::new().unwrap();
        let artifact = validation(dir.path(), "cement,age,strength\n540.0,28,79.99\n332.5,270,40.27\n")
            .initiate_data_validation()
            .unwrap();
        assert!(artifact.is_validated);
        assert_eq!(artifact.message, "Data Validation Performed Successfully");
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let v = validation(dir.path(), "");
        fs::remove_file(dir.path().join("data.csv")).unwrap();
        let err = v.initiate_data_validation().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Input file not available");
    }

    #[test]
    fn test_column_count_mismatch() {
        let dir = TempDir::new().unwrap();
        let err = validation(dir.path(), "cement,strength\n540.0,79.99\n")
            .validate_dataset_schema()
            .unwrap_err();
        assert!(err.to_string().contains("No. of columns not matching"));
    }

    #[test]
    fn test_column_name_mismatch() {
        let dir = TempDir::new().unwrap();
        let err = validation(dir.path(), "cement,slump,strength\n540.0,28,79.99\n")
            .validate_dataset_schema()
            .unwrap_err();
        assert!(err.to_string().contains("not same as data column"));
    }

    #[test]
    fn test_dtype_mismatch() {
        let dir = TempDir::new().unwrap();
        let err = validation(dir.path(), "cement,age,strength\n540.0,28.5,79.99\n")
            .validate_dataset_schema()
            .unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError(_)));
    }
}

//! Data transformation: fit the feature pipeline, label clusters and write the
//! transformed training set

use crate::config::{DataTransformationConfig, DatasetSchema, CLUSTER_COLUMN_NAME};
use crate::entity::{DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact};
use crate::error::{PipelineError, Result};
use crate::preprocessing::FeaturePipeline;
use crate::utils::{array2_to_columns, columns_to_array2, conform_to_schema, read_csv, write_csv};
use polars::prelude::*;
use tracing::info;

pub struct DataTransformation {
    config: DataTransformationConfig,
    data_ingestion_artifact: DataIngestionArtifact,
    data_validation_artifact: DataValidationArtifact,
}

impl DataTransformation {
    pub fn new(
        config: DataTransformationConfig,
        data_ingestion_artifact: DataIngestionArtifact,
        data_validation_artifact: DataValidationArtifact,
    ) -> Self {
        info!("Data transformation started");
        Self {
            config,
            data_ingestion_artifact,
            data_validation_artifact,
        }
    }

    pub fn get_data_transformer_object(&self, feature_columns: Vec<String>) -> FeaturePipeline {
        FeaturePipeline::new(feature_columns, &self.config)
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        let schema = DatasetSchema::from_file(&self.data_validation_artifact.schema_file_path)?;
        let train_file_path = &self.data_ingestion_artifact.train_file_path;
        let train_df = conform_to_schema(&read_csv(train_file_path)?, &schema)?;

        let feature_columns = schema.feature_columns();
        if feature_columns.is_empty() {
            return Err(PipelineError::PreprocessingError(
                "Schema declares no numeric feature columns".to_string(),
            ));
        }
        info!(features = ?feature_columns, rows = train_df.height(), "Applying preprocessing object on training data");

        let x = columns_to_array2(&train_df, &feature_columns)?;
        let mut preprocessing_obj = self.get_data_transformer_object(feature_columns.clone());
        let (transformed, clusters) = preprocessing_obj.fit_transform(&x)?;

        let mut columns = array2_to_columns(&transformed, &feature_columns)?;
        let labels: Vec<i64> = clusters.iter().map(|&c| c as i64).collect();
        columns.push(Column::new(CLUSTER_COLUMN_NAME.into(), labels));
        columns.push(train_df.column(&schema.target_column)?.clone());
        let mut transformed_df = DataFrame::new(columns)?;

        let file_name = train_file_path.file_name().ok_or_else(|| {
            PipelineError::DataError(format!("Invalid train file path {}", train_file_path.display()))
        })?;
        let transformed_train_file_path = self.config.transformed_train_dir.join(file_name);
        write_csv(&mut transformed_df, &transformed_train_file_path)?;
        info!(path = %transformed_train_file_path.display(), "Saved transformed training data");

        let preprocessed_object_file_path = self.config.preprocessed_object_file_path.clone();
        preprocessing_obj.save(&preprocessed_object_file_path)?;
        info!(path = %preprocessed_object_file_path.display(), "Saved preprocessing object");

        Ok(DataTransformationArtifact {
            transformed_train_file_path,
            preprocessed_object_file_path,
            is_transformed: true,
            message: "Data transformation successful".to_string(),
        })
    }
}

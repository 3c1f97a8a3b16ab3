//! Dataset schema (`schema.yaml`)

use crate::error::{PipelineError, Result};
use crate::utils::read_yaml_file;
use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Column dtypes declared in the schema file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDType {
    /// Any float or integer column
    Float,
    /// Integer columns only
    Int,
    Bool,
    /// String / categorical column
    Category,
}

impl SchemaDType {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "float" | "float32" | "float64" => Ok(Self::Float),
            "int" | "int32" | "int64" => Ok(Self::Int),
            "bool" => Ok(Self::Bool),
            "category" | "object" | "str" | "string" => Ok(Self::Category),
            other => Err(PipelineError::ConfigError(format!(
                "Unsupported schema dtype '{}'",
                other
            ))),
        }
    }

    /// Whether a loaded column dtype conforms to this schema dtype
    pub fn accepts(&self, dtype: &DataType) -> bool {
        match self {
            Self::Float => dtype.is_float() || dtype.is_integer(),
            Self::Int => dtype.is_integer(),
            Self::Bool => matches!(dtype, DataType::Boolean),
            Self::Category => matches!(dtype, DataType::String | DataType::Categorical(..)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Category)
    }
}

/// Expected layout of the ingested dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Column name to dtype name, kept in sorted order
    pub columns: BTreeMap<String, String>,
    pub target_column: String,
}

impl DatasetSchema {
    pub fn from_file(path: &Path) -> Result<Self> {
        let schema: Self = read_yaml_file(path)?;
        schema.check()?;
        Ok(schema)
    }

    fn check(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(PipelineError::ConfigError("Schema declares no columns".to_string()));
        }
        if !self.columns.contains_key(&self.target_column) {
            return Err(PipelineError::ConfigError(format!(
                "Target column '{}' is not declared in the schema",
                self.target_column
            )));
        }
        for dtype in self.columns.values() {
            SchemaDType::parse(dtype)?;
        }
        Ok(())
    }

    pub fn dtype_of(&self, column: &str) -> Result<SchemaDType> {
        let name = self
            .columns
            .get(column)
            .ok_or_else(|| PipelineError::FeatureNotFound(column.to_string()))?;
        SchemaDType::parse(name)
    }

    /// Numeric, non-target columns in sorted order
    pub fn feature_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(name, _)| **name != self.target_column)
            .filter(|(_, dtype)| SchemaDType::parse(dtype).map(|d| d.is_numeric()).unwrap_or(false))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every schema column with the target moved last
    pub fn ordered_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = self
            .columns
            .keys()
            .filter(|name| **name != self.target_column)
            .cloned()
            .collect();
        cols.push(self.target_column.clone());
        cols
    }
}

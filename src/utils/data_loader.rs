//! CSV loading and matrix extraction

use crate::config::DatasetSchema;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Read a CSV file with a header row, inferring dtypes over the whole file
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| PipelineError::DataError(e.to_string()))
}

/// Write a DataFrame to CSV, creating parent directories
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| PipelineError::DataError(e.to_string()))
}

/// Extract one column as f64, nulls become NaN
pub fn column_to_array1(df: &DataFrame, col_name: &str) -> Result<Array1<f64>> {
    let column = df
        .column(col_name)
        .map_err(|_| PipelineError::FeatureNotFound(col_name.to_string()))?;
    let as_f64 = column.cast(&DataType::Float64)?;
    Ok(as_f64
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Extract named columns into a row-major `Array2<f64>`, nulls become NaN
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Array1<f64>> = col_names
        .iter()
        .map(|name| column_to_array1(df, name))
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

/// Build a DataFrame from a feature matrix and its column names
pub fn array2_to_columns(x: &Array2<f64>, col_names: &[String]) -> Result<Vec<Column>> {
    if x.ncols() != col_names.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} columns", col_names.len()),
            actual: format!("{} columns", x.ncols()),
        });
    }
    Ok(col_names
        .iter()
        .enumerate()
        .map(|(j, name)| Column::new(name.as_str().into(), x.column(j).to_vec()))
        .collect())
}

/// Read the dataset at `file_path` and check it against the schema.
///
/// Every schema column must be present with a compatible dtype and no extra
/// columns are allowed. Columns come back in schema order with the target
/// column last.
pub fn load_data(file_path: &Path, schema_file_path: &Path) -> Result<DataFrame> {
    let schema = DatasetSchema::from_file(schema_file_path)?;
    let df = read_csv(file_path)?;
    conform_to_schema(&df, &schema)
}

pub fn conform_to_schema(df: &DataFrame, schema: &DatasetSchema) -> Result<DataFrame> {
    for name in df.get_column_names() {
        if !schema.columns.contains_key(name.as_str()) {
            return Err(PipelineError::ValidationError(format!(
                "Column {} is not in the schema",
                name
            )));
        }
    }

    for name in schema.columns.keys() {
        let column = df
            .column(name)
            .map_err(|_| PipelineError::FeatureNotFound(name.clone()))?;
        let dtype = schema.dtype_of(name)?;
        if !dtype.accepts(column.dtype()) {
            return Err(PipelineError::ValidationError(format!(
                "Column {} has dtype {} which does not match schema dtype {:?}",
                name,
                column.dtype(),
                dtype
            )));
        }
    }

    let ordered = schema.ordered_columns();
    debug!(columns = ?ordered, rows = df.height(), "Loaded data against schema");
    Ok(df.select(ordered)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn schema() -> DatasetSchema {
        let mut columns = BTreeMap::new();
        columns.insert("cement".to_string(), "float64".to_string());
        columns.insert("age".to_string(), "int64".to_string());
        columns.insert("strength".to_string(), "float64".to_string());
        DatasetSchema { columns, target_column: "strength".to_string() }
    }

    #[test]
    fn test_columns_to_array2_nulls_are_nan() {
        let df = df!(
            "a" => &[Some(1.0), None, Some(3.0)],
            "b" => &[4i64, 5, 6]
        )
        .unwrap();
        let x = columns_to_array2(&df, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(x.dim(), (3, 2));
        assert!(x[[1, 0]].is_nan());
        assert_eq!(x[[2, 1]], 6.0);
    }

    #[test]
    fn test_conform_orders_target_last() {
        let df = df!(
            "strength" => &[10.0, 20.0],
            "cement" => &[300.0, 400.0],
            "age" => &[28i64, 7]
        )
        .unwrap();
        let out = conform_to_schema(&df, &schema()).unwrap();
        let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["age", "cement", "strength"]);
    }

    #[test]
    fn test_conform_rejects_extra_and_bad_dtype() {
        let extra = df!(
            "strength" => &[10.0],
            "cement" => &[300.0],
            "age" => &[28i64],
            "slump" => &[1.0]
        )
        .unwrap();
        assert!(conform_to_schema(&extra, &schema()).is_err());

        let bad = df!(
            "strength" => &[10.0],
            "cement" => &[300.0],
            "age" => &[28.5]
        )
        .unwrap();
        assert!(conform_to_schema(&bad, &schema()).is_err());
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("data.csv");
        let mut df = df!("cement" => &[1.5, 2.5], "age" => &[3i64, 4]).unwrap();
        write_csv(&mut df, &path).unwrap();
        let back = read_csv(&path).unwrap();
        assert_eq!(back.shape(), (2, 2));
    }
}

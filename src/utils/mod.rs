//! Utility functions shared by the pipeline stages

pub mod data_loader;
mod files;

pub use data_loader::{
    array2_to_columns, column_to_array1, columns_to_array2, conform_to_schema, load_data,
    read_csv, write_csv,
};
pub use files::{get_cluster, load_object, read_yaml_file, save_object, write_yaml_file};

//! Hyperparameter values and search grids

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value as written in `model.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// Hyperparameter name to value
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Hyperparameter name to candidate values
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Every combination of the grid, with the last key varying fastest.
///
/// An empty grid yields a single empty combination.
pub fn expand_grid(grid: &ParamGrid) -> Result<Vec<ParamSet>> {
    let mut combos: Vec<ParamSet> = vec![ParamSet::new()];

    for (name, values) in grid {
        if values.is_empty() {
            return Err(PipelineError::InvalidParameter {
                name: name.clone(),
                value: "[]".to_string(),
                reason: "search grid entry has no candidate values".to_string(),
            });
        }
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut extended = combo.clone();
                extended.insert(name.clone(), value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }

    Ok(combos)
}

/// Render a parameter set as `{a: 1, b: x}`
pub fn format_params(params: &ParamSet) -> String {
    let inner: Vec<String> = params.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    format!("{{{}}}", inner.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_yaml_values() {
        let values: Vec<ParamValue> = serde_yaml::from_str("[null, true, 3, 0.5, sqrt]").unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Null,
                ParamValue::Bool(true),
                ParamValue::Int(3),
                ParamValue::Float(0.5),
                ParamValue::String("sqrt".to_string()),
            ]
        );
    }

    #[test]
    fn test_expand_grid_order() {
        let mut grid = ParamGrid::new();
        grid.insert("alpha".to_string(), vec![ParamValue::Float(0.1), ParamValue::Float(1.0)]);
        grid.insert("fit_intercept".to_string(), vec![ParamValue::Bool(true), ParamValue::Bool(false)]);

        let combos = expand_grid(&grid).unwrap();
        assert_eq!(combos.len(), 4);
        assert_eq!(combos[0]["alpha"], ParamValue::Float(0.1));
        assert_eq!(combos[0]["fit_intercept"], ParamValue::Bool(true));
        assert_eq!(combos[1]["fit_intercept"], ParamValue::Bool(false));
        assert_eq!(combos[2]["alpha"], ParamValue::Float(1.0));
    }

    #[test]
    fn test_empty_grid_single_combo() {
        let combos = expand_grid(&ParamGrid::new()).unwrap();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        let mut grid = ParamGrid::new();
        grid.insert("alpha".to_string(), vec![]);
        assert!(expand_grid(&grid).is_err());
    }
}

//! Feature schema handling: the ordered column list fixed at training time
//! and construction of dense feature rows from sparse request fields.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EarlywarnError, Result};

/// Ordered set of feature columns the model was trained on.
///
/// The schema is loaded once at startup from the columns artifact (a JSON
/// array of strings) and never mutated while serving. Column order defines
/// the layout of every [`FeatureRow`] fed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from an ordered column list.
    ///
    /// Rejects empty schemas, empty column names, and duplicate columns:
    /// a duplicate would make the name-to-position mapping ambiguous.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(EarlywarnError::Schema(
                "schema must contain at least one column".to_string(),
            ));
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if name.is_empty() {
                return Err(EarlywarnError::Schema(format!(
                    "column {i} has an empty name"
                )));
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(EarlywarnError::Schema(format!(
                    "duplicate column name: {name}"
                )));
            }
        }
        Ok(Self { columns, index })
    }

    /// Load a schema from a JSON array-of-strings artifact.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let schema: FeatureSchema = serde_json::from_str(&raw)?;
        Ok(schema)
    }

    /// Write the schema as a JSON array-of-strings artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    /// Number of columns in the schema.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in schema order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Column name at a position.
    pub fn name(&self, position: usize) -> Option<&str> {
        self.columns.get(position).map(String::as_str)
    }

    /// Build a dense row: every schema column starts at 0.0, then the
    /// given (name, value) pairs overwrite their columns.
    ///
    /// Pairs naming a column outside the schema are ignored with a warning
    /// rather than rejected, so callers can pass a superset of fields.
    pub fn build_row(&self, values: &[(&str, f64)]) -> FeatureRow {
        let mut row = Array1::zeros(self.columns.len());
        for (name, value) in values {
            match self.position(name) {
                Some(i) => row[i] = *value,
                None => warn!(column = *name, "ignoring value for unknown column"),
            }
        }
        FeatureRow { values: row }
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = EarlywarnError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

/// A dense feature vector laid out in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Array1<f64>,
}

impl FeatureRow {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<f64> {
        self.values.get(position).copied()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn as_slice(&self) -> &[f64] {
        // An owned 1-D array is always contiguous.
        self.values.as_slice().expect("feature row storage is contiguous")
    }
}

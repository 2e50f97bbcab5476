//! Initial conditions and parameter values.
//!
//! A preset value can be given in any of the forms a definition file allows: a scalar
//! (broadcast to the whole field), a flat list, a nested list, or values keyed by sector
//! label. Labelled entries which are not listed default to `0.0`.

use crate::errors::{ChimesError, ChimesResult};
use crate::tensor::{Shape, Tensor};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetValue {
    Scalar(f64),
    List(Vec<f64>),
    Nested(Vec<Vec<f64>>),
    Labelled(BTreeMap<String, f64>),
    LabelledMatrix(BTreeMap<String, BTreeMap<String, f64>>),
}

fn label_index(field: &str, labels: &[String], label: &str) -> ChimesResult<usize> {
    labels.iter().position(|l| l == label).ok_or_else(|| {
        ChimesError::preset(
            field,
            format!("unknown sector label '{}', expected one of {:?}", label, labels),
        )
    })
}

impl PresetValue {
    /// Convert the value into a tensor of the given shape.
    ///
    /// `labels` contains the sector labels of each axis of `shape`, and is only consulted for
    /// labelled values.
    pub fn to_tensor(&self, field: &str, shape: Shape, labels: &[&[String]]) -> ChimesResult<Tensor> {
        let mismatch = |form: &str| {
            ChimesError::preset(field, format!("{} cannot initialise a {} field", form, shape))
        };

        match (self, shape) {
            (PresetValue::Scalar(value), shape) => Ok(Tensor::filled(shape, *value)),
            (PresetValue::List(values), Shape::Scalar) if values.len() == 1 => {
                Ok(Tensor::Scalar(values[0]))
            }
            (PresetValue::List(values), Shape::Vector(n)) => {
                if values.len() != n {
                    return Err(ChimesError::preset(
                        field,
                        format!("expected {} values, got {}", n, values.len()),
                    ));
                }
                Ok(Tensor::Vector(Array1::from(values.clone())))
            }
            (PresetValue::Nested(rows), Shape::Matrix(r, c)) => {
                if rows.len() != r || rows.iter().any(|row| row.len() != c) {
                    return Err(ChimesError::preset(
                        field,
                        format!("expected {} rows of {} values", r, c),
                    ));
                }
                let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                Array2::from_shape_vec((r, c), flat)
                    .map(Tensor::Matrix)
                    .map_err(|e| ChimesError::preset(field, e.to_string()))
            }
            (PresetValue::Labelled(entries), Shape::Vector(n)) => {
                let axis = labels.first().copied().unwrap_or(&[]);
                let mut values = Array1::zeros(n);
                for (label, value) in entries {
                    values[label_index(field, axis, label)?] = *value;
                }
                Ok(Tensor::Vector(values))
            }
            (PresetValue::LabelledMatrix(entries), Shape::Matrix(r, c)) => {
                let (rows, cols) = match labels {
                    [rows, cols] => (*rows, *cols),
                    _ => return Err(mismatch("a labelled table")),
                };
                let mut values = Array2::zeros((r, c));
                for (row_label, row) in entries {
                    let i = label_index(field, rows, row_label)?;
                    for (col_label, value) in row {
                        values[[i, label_index(field, cols, col_label)?]] = *value;
                    }
                }
                Ok(Tensor::Matrix(values))
            }
            (PresetValue::List(_), _) => Err(mismatch("a list")),
            (PresetValue::Nested(_), _) => Err(mismatch("a nested list")),
            (PresetValue::Labelled(_), _) => Err(mismatch("a labelled table")),
            (PresetValue::LabelledMatrix(_), _) => Err(mismatch("a nested labelled table")),
        }
    }
}

impl From<f64> for PresetValue {
    fn from(value: f64) -> Self {
        PresetValue::Scalar(value)
    }
}

impl From<Vec<f64>> for PresetValue {
    fn from(value: Vec<f64>) -> Self {
        PresetValue::List(value)
    }
}

impl From<Vec<Vec<f64>>> for PresetValue {
    fn from(value: Vec<Vec<f64>>) -> Self {
        PresetValue::Nested(value)
    }
}

impl<const N: usize> From<[f64; N]> for PresetValue {
    fn from(value: [f64; N]) -> Self {
        PresetValue::List(value.to_vec())
    }
}

impl<const R: usize, const C: usize> From<[[f64; C]; R]> for PresetValue {
    fn from(value: [[f64; C]; R]) -> Self {
        PresetValue::Nested(value.iter().map(|row| row.to_vec()).collect())
    }
}

/// Overrides for the initial values of differential fields and the values of parameters.
///
/// Fields not listed keep the default from their definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preset {
    values: BTreeMap<String, PresetValue>,
}

impl Preset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<PresetValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PresetValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PresetValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PresetValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every value of `other` into this preset, replacing existing entries.
    pub fn extend(&mut self, other: &Preset) {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn from_toml_str(text: &str) -> ChimesResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

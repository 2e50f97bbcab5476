//! Retained results of a simulation run.

use crate::model::Model;
use crate::state::SimulationState;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// The value of every field at each retained time point.
///
/// Columns are stored per field so that the history of one field is a contiguous slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    names: Vec<String>,
    times: Vec<f64>,
    time_indices: Vec<usize>,
    values: Vec<Vec<Tensor>>,
}

impl TimeSeries {
    pub fn new(model: &Model) -> Self {
        Self {
            names: model.names().map(String::from).collect(),
            times: vec![],
            time_indices: vec![],
            values: vec![vec![]; model.len()],
        }
    }

    /// Append a snapshot of `state`.
    pub fn record(&mut self, state: &SimulationState) {
        self.times.push(state.time());
        self.time_indices.push(state.time_index());
        for (column, value) in self.values.iter_mut().zip(state.values()) {
            column.push(value.clone());
        }
    }

    /// Retained time values
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Step index of each retained time
    pub fn time_indices(&self) -> &[usize] {
        &self.time_indices
    }

    /// Number of retained time points
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Every retained value of a field
    pub fn get(&self, name: &str) -> Option<&[Tensor]> {
        let i = self.names.iter().position(|n| n == name)?;
        Some(&self.values[i])
    }

    /// The history of a scalar field. `None` if the field is unknown or not a scalar.
    pub fn scalar(&self, name: &str) -> Option<Vec<f64>> {
        self.get(name)?.iter().map(Tensor::as_scalar).collect()
    }

    pub fn at(&self, name: &str, index: usize) -> Option<&Tensor> {
        self.get(name)?.get(index)
    }

    /// The last retained value of a field
    pub fn last(&self, name: &str) -> Option<&Tensor> {
        self.get(name)?.last()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.times.last().copied()
    }
}

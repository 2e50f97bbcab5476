//! The state of a running simulation.

use crate::errors::{ChimesError, ChimesResult};
use crate::field::Kind;
use crate::model::Model;
use crate::preset::Preset;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// The value of every field at one point in time.
///
/// Values are stored by registry position of the model that created the state. Statevars are
/// always consistent with the other fields: they are evaluated when the state is created and
/// after every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    time: f64,
    time_index: usize,
    values: Vec<Tensor>,
}

impl SimulationState {
    /// Create the initial state of a simulation.
    ///
    /// Differential fields and parameters take their value from `preset`, falling back to the
    /// default in their definition. Fails with a `Preset` error if the preset names a field
    /// which does not exist or is a statevar, or holds a value which does not fit the field.
    pub fn new(model: &Model, preset: &Preset, t_start: f64) -> ChimesResult<Self> {
        for (name, _) in preset.iter() {
            match model.field(name).map(|f| f.kind()) {
                None => {
                    return Err(ChimesError::preset(name, "not a field of the model"));
                }
                Some(Kind::Statevar) => {
                    return Err(ChimesError::preset(
                        name,
                        "statevars are computed and cannot be preset",
                    ));
                }
                Some(_) => {}
            }
        }

        let mut values = Vec::with_capacity(model.len());
        for (position, field) in model.registry().fields().iter().enumerate() {
            let shape = model.layout_at(position).shape;
            let value = match preset.get(field.name()).or_else(|| field.default_value()) {
                Some(value) => value.to_tensor(field.name(), shape, &model.axis_labels(position))?,
                None => Tensor::zeros(shape),
            };
            values.push(value);
        }
        model.evaluate_statevars(&mut values)?;

        Ok(Self {
            time: t_start,
            time_index: 0,
            values,
        })
    }

    pub(crate) fn from_parts(time: f64, time_index: usize, values: Vec<Tensor>) -> Self {
        Self {
            time,
            time_index,
            values,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of steps taken since the state was created
    pub fn time_index(&self) -> usize {
        self.time_index
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Values by registry position
    pub fn values(&self) -> &[Tensor] {
        &self.values
    }

    /// The value of a field, looked up by name through the model that created this state.
    ///
    /// Returns `None` if the name is unknown or the state holds no value at its position.
    pub fn get(&self, model: &Model, name: &str) -> Option<&Tensor> {
        model.position(name).and_then(|i| self.values.get(i))
    }

    /// Fails with a `Preset` error unless this state holds one value of the resolved shape for
    /// every field of `model`, as a state created from `model` does.
    pub fn check_compatible(&self, model: &Model) -> ChimesResult<()> {
        if self.values.len() != model.len() {
            return Err(ChimesError::preset(
                "state",
                format!(
                    "holds {} values but the model has {} fields",
                    self.values.len(),
                    model.len()
                ),
            ));
        }
        for (position, value) in self.values.iter().enumerate() {
            let shape = model.layout_at(position).shape;
            if value.shape() != shape {
                return Err(ChimesError::preset(
                    model.registry().fields()[position].name(),
                    format!("state holds {} but the field is {}", value.shape(), shape),
                ));
            }
        }
        Ok(())
    }

    /// Fails with `NumericDivergence` naming the first field, in declaration order, holding a
    /// NaN or infinite value.
    ///
    /// The state must be compatible with `model`, see [`SimulationState::check_compatible`].
    pub fn check_finite(&self, model: &Model) -> ChimesResult<()> {
        self.check_compatible(model)?;
        match self.values.iter().position(|value| !value.is_finite()) {
            None => Ok(()),
            Some(position) => Err(ChimesError::NumericDivergence {
                field: model.registry().fields()[position].name().to_string(),
                time_index: self.time_index,
                time: self.time,
            }),
        }
    }
}

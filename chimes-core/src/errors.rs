use thiserror::Error;

/// Error type for model construction and simulation.
///
/// `Definition`, `CyclicDependency` and `Shape` are raised while a model is built and are
/// unrecoverable for that model. `NumericDivergence` is raised while stepping and is reported
/// alongside the partial results of a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChimesError {
    #[error("Invalid definition for field '{field}': {reason}")]
    Definition { field: String, reason: String },

    #[error("Cyclic dependency between statevar fields: {}", .fields.join(" -> "))]
    CyclicDependency { fields: Vec<String> },

    #[error("Shape error for field '{field}': {reason}")]
    Shape { field: String, reason: String },

    #[error("Non-finite value in field '{field}' at time index {time_index} (t={time})")]
    NumericDivergence {
        field: String,
        time_index: usize,
        time: f64,
    },

    #[error("Invalid preset value for '{field}': {reason}")]
    Preset { field: String, reason: String },

    #[error("Could not parse expression '{input}' at position {position}: {message}")]
    Parse {
        input: String,
        position: usize,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ChimesError {
    pub(crate) fn definition(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ChimesError::Definition {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ChimesError::Shape {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn preset(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ChimesError::Preset {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors raised while building a model.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            ChimesError::Definition { .. }
                | ChimesError::CyclicDependency { .. }
                | ChimesError::Shape { .. }
        )
    }
}

impl From<toml::de::Error> for ChimesError {
    fn from(value: toml::de::Error) -> Self {
        ChimesError::Config(value.to_string())
    }
}

/// Convenience type for `Result<T, ChimesError>`.
pub type ChimesResult<T> = Result<T, ChimesError>;
